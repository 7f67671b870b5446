// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Manage a running SMT process.
//!
//! This is a low-level generic API for SMT-LIB solvers; the solver-specific
//! parts are captured by the [`SolverCmd`] passed to launch the solver.

use std::{
    ffi::{OsStr, OsString},
    io::{self, BufRead, BufReader, ErrorKind, Write},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use thiserror::Error;

use crate::conf::SolverCmd;
use crate::sexp::{self, app, atom_s, Sexp};

/// SmtProc wraps an instance of a solver process.
#[derive(Debug)]
pub struct SmtProc {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// SatResp is a solver's response to a `(check-sat)` command.
///
/// For unknown it also returns the reason the solver provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResp {
    /// The query is satisfiable.
    Sat,
    /// The query is unsatisfiable (and thus negated assertions are valid).
    Unsat,
    /// Unknown whether the query is sat or unsat. The reason is the one given
    /// by (get-info :reason-unknown).
    Unknown(String),
}

/// An error from trying to call the solver
#[derive(Error, Debug)]
pub enum SolverError {
    /// I/O went wrong
    #[error("some I/O went wrong: {0}")]
    Io(#[from] io::Error),
    /// Solver returned an `(error ...)` response or exited
    #[error("solver returned an error:\n{0}")]
    UnexpectedClose(String),
    /// Solver returned something that is not SMT-LIB
    #[error("could not parse solver response:\n{0}")]
    UnparseableResponse(String),
}

type Result<T> = std::result::Result<T, SolverError>;

impl Drop for SmtProc {
    fn drop(&mut self) {
        _ = writeln!(self.stdin, "(exit)");
        _ = self.stdin.flush();
        _ = self.child.kill();
        _ = self.child.wait();
    }
}

impl SmtProc {
    /// A marker for determining end of solver response.
    const DONE: &'static str = "<<DONE>>";

    /// Create a new SMT process by running a solver and sending it the
    /// startup options of `cmd`.
    pub fn new(cmd: SolverCmd) -> Result<Self> {
        let mut child = Command::new(OsStr::new(&cmd.cmd))
            .args(cmd.args.iter().map(OsString::from))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            _ = child.kill();
            return Err(SolverError::UnexpectedClose(format!(
                "could not connect to {}",
                cmd.cmdline()
            )));
        };
        let mut proc = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };
        log::debug!("launched solver: {}", cmd.cmdline());
        for (option, val) in &cmd.options {
            proc.send(&app(
                "set-option",
                [atom_s(format!(":{option}")), atom_s(val)],
            ))?;
        }
        Ok(proc)
    }

    /// Low-level API to send the solver a command as an s-expression. This
    /// should only be used for commands that do not require a response.
    pub fn send(&mut self, data: &Sexp) -> Result<()> {
        match writeln!(self.stdin, "{data}") {
            Ok(()) => Ok(()),
            // the solver exited; its reason will show up with the next response
            Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Low-level mechanism to get a response. Note that this needs to be issued
    /// after each query that returns a response, since it sends a marker and
    /// waits for the solver to reach that marker.
    fn get_response(&mut self) -> Result<String> {
        writeln!(self.stdin, r#"(echo "{}")"#, Self::DONE)?;
        self.stdin.flush()?;
        // buf accumulates the entire response, which is read line-by-line
        // looking for the DONE marker.
        let mut buf = String::new();
        loop {
            let last_end = buf.len();
            let n = self.stdout.read_line(&mut buf)?;
            if n == 0 {
                return Err(SolverError::UnexpectedClose(Self::parse_error(&buf)));
            }
            let last_line = buf[last_end..last_end + n].trim_end();
            // Z3 doesn't put quotes and CVC does (quotes do follow SMT-LIB)
            if last_line == Self::DONE || last_line == format!("\"{}\"", Self::DONE) {
                return Ok(buf[..last_end].trim_end().to_string());
            }
        }
    }

    fn send_with_reply(&mut self, data: &Sexp) -> Result<Sexp> {
        self.send(data)?;
        let resp = self.get_response()?;
        sexp::parse(&resp).map_err(|_| SolverError::UnparseableResponse(resp))
    }

    /// Parse an error message returned as an s-expression.
    fn parse_error(resp: &str) -> String {
        // Z3 returns check-sat errors as:
        // (error "error msg")
        // sat
        //
        // so the response is a sequence of sexps with an error among them.
        let error = sexp::parse_many(resp).ok().and_then(|sexps| {
            sexps.iter().find_map(|s| match s.app() {
                Some(("error", [msg])) => msg.atom_s().map(|m| m.to_string()),
                _ => None,
            })
        });
        match error {
            Some(msg) => msg,
            None if resp.is_empty() => "solver exited without a response".to_string(),
            None => resp.to_string(),
        }
    }

    /// Get some attribute using the SMT get-info command.
    pub fn get_info(&mut self, attribute: &str) -> Result<Sexp> {
        let resp = self.send_with_reply(&app("get-info", [atom_s(attribute)]))?;
        match resp.list() {
            Some([key, value]) if *key == atom_s(attribute) => Ok(value.clone()),
            _ => Err(SolverError::UnparseableResponse(resp.to_string())),
        }
    }

    /// Send the solver `(check-sat)`. For unknown gets a reason, but does not
    /// call `(get-model)` for sat.
    pub fn check_sat(&mut self) -> Result<SatResp> {
        self.send(&app("check-sat", []))?;
        let resp = self.get_response()?;
        match resp.as_str() {
            "sat" => Ok(SatResp::Sat),
            "unsat" => Ok(SatResp::Unsat),
            "unknown" => {
                let reason = self.get_info(":reason-unknown")?;
                Ok(SatResp::Unknown(reason.to_string()))
            }
            _ => Err(SolverError::UnexpectedClose(Self::parse_error(&resp))),
        }
    }

    /// Get a model (following a sat reply) as an s-expression.
    pub fn get_model(&mut self) -> Result<Sexp> {
        self.send_with_reply(&app("get-model", []))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        conf::{CvcConf, Z3Conf},
        path::solver_path,
        proc::{SatResp, SmtProc},
        sexp::{app, atom_s, parse},
    };
    use eyre::Context;

    fn z3() -> Option<SmtProc> {
        match SmtProc::new(Z3Conf::new(&solver_path("z3")).done()) {
            Ok(proc) => Some(proc),
            Err(_) => {
                eprintln!("could not find z3, skipping test");
                None
            }
        }
    }

    #[test]
    fn test_check_sat_z3() {
        let Some(mut solver) = z3() else { return };
        let response = solver.check_sat().wrap_err("could not check-sat").unwrap();
        assert!(
            matches!(response, SatResp::Sat),
            "should be sat, got {response:?}"
        );
    }

    #[test]
    fn test_unsat_z3() {
        let Some(mut solver) = z3() else { return };
        solver
            .send(&app("declare-const", [atom_s("a"), atom_s("Bool")]))
            .unwrap();
        solver.send(&parse("(assert (and a (not a)))").unwrap()).unwrap();
        let response = solver.check_sat().wrap_err("could not check-sat").unwrap();
        insta::assert_debug_snapshot!(response, @"Unsat");
    }

    #[test]
    fn test_z3_ill_formed() {
        let Some(mut solver) = z3() else { return };
        // unbound symbol
        solver.send(&parse("(assert p)").unwrap()).unwrap();
        assert!(solver.check_sat().is_err());
    }

    #[test]
    fn test_cvc5_singleton_or() {
        let cvc5 = CvcConf::new_cvc5(&solver_path("cvc5")).done();
        let Ok(mut solver) = SmtProc::new(cvc5) else {
            eprintln!("could not find cvc5, skipping test");
            return;
        };
        solver
            .send(&parse("(assert (and (or true) (and false)))").unwrap())
            .unwrap();
        let response = solver.check_sat().wrap_err("could not check-sat").unwrap();
        insta::assert_debug_snapshot!(response, @"Unsat");
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(
            SmtProc::parse_error("(error \"line 1: unknown constant p\")\nsat"),
            "line 1: unknown constant p"
        );
        assert_eq!(SmtProc::parse_error(""), "solver exited without a response");
    }
}
