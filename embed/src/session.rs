// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A solver session: the SMT-LIB script built up by compilation, optionally
//! mirrored to a running solver.
//!
//! Compilation only declares symbols and adds assertions, so it never waits
//! on the solver. Consumers of the compiled constraints decide when to call
//! [`Session::check_sat`].

use std::collections::hash_map::DefaultHasher;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use smtlib::conf::SolverCmd;
use smtlib::expr;
use smtlib::proc::{SatResp, SmtProc, SolverError};
use smtlib::sexp::{app, atom_i, atom_s, Sexp};
use thiserror::Error;

/// A function symbol declared in a session.
///
/// Declared names are unique within their session, so two declarations from
/// the same session are the same symbol exactly when their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncDecl {
    name: String,
    domain: Vec<Sexp>,
    range: Sexp,
}

impl FuncDecl {
    /// The declared SMT name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument sorts.
    pub fn domain(&self) -> &[Sexp] {
        &self.domain
    }

    /// Result sort.
    pub fn range(&self) -> &Sexp {
        &self.range
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.domain.len()
    }

    /// Apply this symbol. A nullary symbol is referenced by its bare name.
    pub fn apply(&self, args: Vec<Sexp>) -> Sexp {
        if args.is_empty() {
            atom_s(&self.name)
        } else {
            app(&self.name, args)
        }
    }
}

/// An error from a solver query.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The solver failed.
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// The session only records a script.
    #[error("no solver is attached to this session")]
    Detached,
}

/// A solver session.
#[derive(Debug, Default)]
pub struct Session {
    proc: Option<SmtProc>,
    script: Vec<Sexp>,
    next_id: usize,
    // first failure sending to the solver, reported by the next query
    send_error: Option<SolverError>,
}

impl Session {
    /// A session that only records its script.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that also sends every command to a newly launched solver.
    pub fn with_solver(cmd: SolverCmd) -> Result<Self, SolverError> {
        Ok(Session {
            proc: Some(SmtProc::new(cmd)?),
            ..Self::default()
        })
    }

    fn emit(&mut self, command: Sexp) {
        log::trace!("smt: {command}");
        if let Some(proc) = &mut self.proc {
            if let Err(err) = proc.send(&command) {
                self.send_error.get_or_insert(err);
            }
        }
        self.script.push(command);
    }

    /// A name derived from `base` that has not been handed out by this
    /// session before.
    pub fn fresh_name(&mut self, base: &str) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("{base}@{id}")
    }

    /// Declare an uninterpreted sort, returning its SMT sort.
    pub fn declare_sort(&mut self, name: &str) -> Sexp {
        self.emit(expr::declare_sort(name));
        atom_s(name)
    }

    /// Declare a fresh function symbol named after `base`.
    pub fn declare_fun(&mut self, base: &str, domain: Vec<Sexp>, range: Sexp) -> Arc<FuncDecl> {
        let decl = FuncDecl {
            name: self.fresh_name(base),
            domain,
            range,
        };
        self.emit(expr::declare_fun(&decl.name, &decl.domain, &decl.range));
        Arc::new(decl)
    }

    /// Add an assertion.
    pub fn assert(&mut self, e: Sexp) {
        self.emit(expr::assert(e));
    }

    /// Add a comment to the script. The comment is not sent to the solver.
    pub fn comment_with<F>(&mut self, comment: F)
    where
        F: FnOnce() -> String,
    {
        self.script.push(Sexp::Comment(comment()));
    }

    /// Open an assertion scope.
    pub fn push(&mut self) {
        self.emit(app("push", [atom_i(1)]));
    }

    /// Discard the assertions of the innermost scope.
    pub fn pop(&mut self) {
        self.emit(app("pop", [atom_i(1)]));
    }

    /// Check satisfiability of the current assertions.
    pub fn check_sat(&mut self) -> Result<SatResp, SessionError> {
        if let Some(err) = self.send_error.take() {
            return Err(err.into());
        }
        let proc = self.proc.as_mut().ok_or(SessionError::Detached)?;
        self.script.push(app("check-sat", []));
        let resp = proc.check_sat()?;
        log::debug!("check-sat: {resp:?}");
        Ok(resp)
    }

    /// Get the solver's model following a sat response.
    pub fn get_model(&mut self) -> Result<Sexp, SessionError> {
        let proc = self.proc.as_mut().ok_or(SessionError::Detached)?;
        Ok(proc.get_model()?)
    }

    /// Every command issued so far, in order.
    pub fn script(&self) -> &[Sexp] {
        &self.script
    }

    /// The script as SMT-LIB text, one command per line.
    pub fn render(&self) -> String {
        self.script
            .iter()
            .map(|s| match s {
                Sexp::Comment(c) => format!(";; {c}"),
                _ => s.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Save the script to a file in `dir` named by a hash of its contents.
    /// Returns the path of the saved file.
    pub fn save_script(&self, dir: &Path) -> io::Result<PathBuf> {
        let contents = self.render();
        let mut hash_state = DefaultHasher::new();
        contents.hash(&mut hash_state);
        let hash = format!("{:016x}", hash_state.finish());
        let dest = dir.join(format!("query-{}.smt2", &hash[..8]));
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&dest)?;
        writeln!(&mut f, "{contents}")?;
        Ok(dest)
    }
}
