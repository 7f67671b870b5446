// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Check that each conjecture of a module is an inductive invariant: it holds
//! initially and every step preserves it, assuming all conjectures hold
//! before the step.

use std::fmt;

use embed::error::EmbedError;
use embed::induction::{InductionContext, InitContext};
use embed::session::{Session, SessionError};
use logic::printer;
use logic::syntax::Module;
use rayon::prelude::*;
use serde::Serialize;
use smtlib::expr;
use smtlib::proc::{SatResp, SolverError};
use thiserror::Error;

use crate::conf::SolverConf;

/// Ways that a conjecture can fail to be verified.
#[derive(Debug, Copy, Clone, Serialize, PartialEq, Eq)]
pub enum FailureType {
    /// The conjecture was not implied by the initial condition
    InitInv,
    /// The conjecture was not preserved by a step
    NotInductive,
}

/// Results from the solver that aren't Unsat.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum QueryError {
    /// The solver returned Sat, with its model
    Sat(String),
    /// The solver returned Unknown
    Unknown(String),
}

/// A conjecture that could not be verified.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssertionFailure {
    /// Index of the conjecture in the module
    pub index: usize,
    /// The conjecture, rendered
    pub conjecture: String,
    /// The reason for the error
    pub reason: FailureType,
    /// The symptom of the error
    pub error: QueryError,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.reason {
            FailureType::InitInv => "init does not imply conjecture",
            FailureType::NotInductive => "conjecture is not inductive",
        };
        writeln!(f, "{msg}: {}", self.conjecture)?;
        match &self.error {
            QueryError::Sat(model) => write!(f, "counter example:\n{model}"),
            QueryError::Unknown(reason) => write!(f, "smt solver returned unknown: {reason}"),
        }
    }
}

/// Every failed conjecture.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SolveError {
    /// List of failures
    pub fails: Vec<AssertionFailure>,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} verification failures", self.fails.len())
    }
}

/// An error that prevented a query from being answered.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The module could not be compiled
    #[error(transparent)]
    Embed(#[from] EmbedError),
    /// The solver could not be launched
    #[error(transparent)]
    Launch(#[from] SolverError),
    /// The solver failed during a query
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Some conjectures do not verify
    #[error("{0}")]
    Failed(SolveError),
}

type QueryResult = Result<(), QueryError>;

/// Check `session` for satisfiability, turning a non-unsat answer into a
/// query error.
fn check_unsat(session: &mut Session) -> Result<QueryResult, SessionError> {
    match session.check_sat()? {
        SatResp::Unsat => Ok(Ok(())),
        SatResp::Sat => {
            let model = session.get_model()?;
            Ok(Err(QueryError::Sat(model.to_string())))
        }
        SatResp::Unknown(reason) => Ok(Err(QueryError::Unknown(reason))),
    }
}

fn initiation(conf: &SolverConf, m: &Module, index: usize) -> Result<QueryResult, VerifyError> {
    let init = InitContext::new(conf.session()?, m)?;
    let conj = init.e.value_to_expr(&m.conjectures[index])?;
    let mut session = init.ctx.session();
    session.comment_with(|| {
        format!("init implies: {}", printer::value(&m.conjectures[index]))
    });
    session.assert(expr::not(conj));
    let res = check_unsat(&mut session)?;
    conf.save(&session);
    Ok(res)
}

fn consecution(conf: &SolverConf, m: &Module, index: usize) -> Result<QueryResult, VerifyError> {
    let ind = InductionContext::new(conf.session()?, m)?;
    let pre = m
        .conjectures
        .iter()
        .map(|v| ind.e1.value_to_expr(v))
        .collect::<Result<Vec<_>, _>>()?;
    let post = ind.e2.value_to_expr(&m.conjectures[index])?;
    let mut session = ind.ctx.session();
    session.comment_with(|| format!("inductive: {}", printer::value(&m.conjectures[index])));
    for c in pre {
        session.assert(c);
    }
    session.assert(expr::not(post));
    let res = check_unsat(&mut session)?;
    conf.save(&session);
    Ok(res)
}

/// Verify that every conjecture of `m` is initially true and preserved by
/// every step, running one solver per query in parallel.
pub fn verify_module(conf: &SolverConf, m: &Module) -> Result<(), VerifyError> {
    let queries = (0..m.conjectures.len())
        .flat_map(|i| [(i, FailureType::InitInv), (i, FailureType::NotInductive)])
        .collect::<Vec<_>>();
    log::info!("checking {} queries", queries.len());
    let results = queries
        .into_par_iter()
        .map(|(index, reason)| -> Result<Option<AssertionFailure>, VerifyError> {
            let res = match reason {
                FailureType::InitInv => initiation(conf, m, index)?,
                FailureType::NotInductive => consecution(conf, m, index)?,
            };
            Ok(res.err().map(|error| AssertionFailure {
                index,
                conjecture: printer::value(&m.conjectures[index]),
                reason,
                error,
            }))
        })
        .collect::<Result<Vec<_>, VerifyError>>()?;
    let fails = results.into_iter().flatten().collect::<Vec<_>>();
    if !fails.is_empty() {
        return Err(VerifyError::Failed(SolveError { fails }));
    }
    Ok(())
}
