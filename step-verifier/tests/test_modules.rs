// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

use clap::Parser;
use embed::session::Session;
use step_verifier::command::AppError;
use step_verifier::conf::{SolverConf, SolverType};
use step_verifier::verify::{FailureType, QueryError, VerifyError};
use step_verifier::App;

fn run(args: &[&str]) -> Result<String, AppError> {
    let app = App::try_parse_from(std::iter::once("step-verifier").chain(args.iter().copied()))
        .expect("could not parse arguments");
    let mut out = vec![];
    app.run(&mut out)?;
    Ok(String::from_utf8(out).expect("non-utf8 output"))
}

fn have_z3() -> bool {
    if Session::with_solver(SolverConf::new(SolverType::Z3).cmd()).is_ok() {
        return true;
    }
    eprintln!("could not find z3, skipping test");
    false
}

#[test]
fn print_module() {
    let out = run(&["print", "tests/modules/leader.json"]).unwrap();
    insta::assert_snapshot!(out.trim_end(), @r###"
    sort node
    function leader: (node) -> bool
    init forall m:node. !leader(m)
    conjecture forall n:node, m:node. leader(n) & leader(m) -> n = m
    action elect {
      local n:node {
        assume forall m:node. !leader(m);
        leader(n) := true
      }
    }
    "###);
}

#[test]
fn smt_encoding() {
    let out = run(&["smt", "tests/modules/leader.json"]).unwrap();
    insta::assert_snapshot!(out.trim_end(), @r###"
    (declare-sort node 0)
    (declare-fun leader@0 (node) Bool)
    (declare-fun n@1 () node)
    (declare-fun leader@3 (node) Bool)
    ;; transition
    (assert (and (forall ((m@2 node)) (not (leader@0 m@2))) (forall ((arg@4 node)) (= (leader@3 arg@4) (ite (= arg@4 n@1) true (leader@0 arg@4))))))
    "###);
}

#[test]
fn missing_file() {
    let err = run(&["print", "tests/modules/does_not_exist.json"]).unwrap_err();
    assert!(matches!(err, AppError::Read { .. }), "{err}");
}

#[test]
fn check_guarded_election() {
    if !have_z3() {
        return;
    }
    let out = run(&["check", "tests/modules/leader.json"]).unwrap();
    assert_eq!(out, "verifies!\n");
}

#[test]
fn check_unguarded_election() {
    if !have_z3() {
        return;
    }
    let err = run(&["check", "tests/modules/leader_unguarded.json"]).unwrap_err();
    let AppError::Verify(VerifyError::Failed(fails)) = err else {
        panic!("expected verification failure, got {err}");
    };
    assert_eq!(fails.fails.len(), 1);
    let fail = &fails.fails[0];
    assert_eq!(fail.index, 0);
    assert_eq!(fail.reason, FailureType::NotInductive);
    assert!(matches!(fail.error, QueryError::Sat(_)));
}
