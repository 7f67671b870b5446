// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The solver session and SMT sorts shared by everything compiled for one
//! module.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use logic::syntax::{Module, Sort};
use smtlib::sexp::{atom_s, Sexp};

use crate::error::EmbedError;
use crate::session::Session;

/// The session and sort table for a module.
///
/// Embeddings hold this behind an `Arc`; the session is locked only for the
/// duration of a single declaration or assertion.
#[derive(Debug)]
pub struct BackgroundContext {
    sorts: HashMap<String, Sexp>,
    session: Mutex<Session>,
}

impl BackgroundContext {
    /// Declare every uninterpreted sort of `module` in `session`.
    pub fn new(mut session: Session, module: &Module) -> Result<Self, EmbedError> {
        let mut sorts = HashMap::new();
        for name in &module.sorts {
            if sorts.contains_key(name) {
                return Err(EmbedError::RedeclaredSort(name.clone()));
            }
            let sort = session.declare_sort(name);
            sorts.insert(name.clone(), sort);
        }
        log::debug!("declared {} sorts", sorts.len());
        Ok(BackgroundContext {
            sorts,
            session: Mutex::new(session),
        })
    }

    /// The SMT sort of a declared uninterpreted sort.
    pub fn get_uninterpreted_sort(&self, name: &str) -> Result<Sexp, EmbedError> {
        self.sorts
            .get(name)
            .cloned()
            .ok_or_else(|| EmbedError::UnknownSort(name.to_string()))
    }

    /// The SMT sort of a value sort. Function sorts are not value sorts.
    pub fn get_sort(&self, sort: &Sort) -> Result<Sexp, EmbedError> {
        match sort {
            Sort::Bool => Ok(atom_s("Bool")),
            Sort::Uninterpreted(name) => self.get_uninterpreted_sort(name),
            Sort::Function(..) => Err(EmbedError::FunctionSort(sort.clone())),
        }
    }

    /// Lock the session.
    pub fn session(&self) -> MutexGuard<'_, Session> {
        // a panic while holding the lock leaves the script intact
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts() {
        let module = Module {
            sorts: vec!["node".to_string(), "id".to_string()],
            ..Default::default()
        };
        let ctx = BackgroundContext::new(Session::new(), &module).unwrap();
        assert_eq!(ctx.get_sort(&Sort::Bool), Ok(atom_s("Bool")));
        assert_eq!(ctx.get_sort(&Sort::uninterpreted("id")), Ok(atom_s("id")));
        assert_eq!(
            ctx.get_sort(&Sort::uninterpreted("epoch")),
            Err(EmbedError::UnknownSort("epoch".to_string()))
        );
        let f = Sort::function([Sort::uninterpreted("node")], Sort::Bool);
        assert_eq!(ctx.get_sort(&f), Err(EmbedError::FunctionSort(f.clone())));
        assert_eq!(ctx.session().script().len(), 2);
    }

    #[test]
    fn test_redeclared_sort() {
        let module = Module {
            sorts: vec!["node".to_string(), "node".to_string()],
            ..Default::default()
        };
        assert_eq!(
            BackgroundContext::new(Session::new(), &module).unwrap_err(),
            EmbedError::RedeclaredSort("node".to_string())
        );
    }
}
