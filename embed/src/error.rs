// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Errors raised while compiling a module to SMT.

use logic::iden::Iden;
use logic::syntax::Sort;
use thiserror::Error;

/// Whether an error is the fault of the input or of this crate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The module is malformed: something it refers to does not exist, or a
    /// construct is used where it cannot be compiled.
    MalformedInput,
    /// An internal invariant was broken.
    Invariant,
}

/// An error encountered while compiling values or actions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbedError {
    /// The module referred to an uninterpreted sort that was not declared.
    #[error("sort {0} was not declared")]
    UnknownSort(String),
    /// An uninterpreted sort was declared multiple times.
    #[error("sort {0} was declared multiple times")]
    RedeclaredSort(String),
    /// A value, binder, or local constant had a function sort.
    #[error("function sort {0} cannot be the sort of a value")]
    FunctionSort(Sort),
    /// A variable was not bound by an enclosing quantifier or assignment.
    #[error("unbound variable {0}")]
    UnboundVariable(Iden),
    /// A constant was not bound by an enclosing local action.
    #[error("unbound constant {0}")]
    UnboundConstant(Iden),
    /// A function symbol is not in the embedding.
    #[error("unknown function {0}")]
    UnknownFunction(Iden),
    /// Something other than a function symbol was applied.
    #[error("{0} was called but it is not a function symbol")]
    Uncallable(String),
    /// A function was applied to the wrong number of arguments.
    #[allow(missing_docs)]
    #[error("function {function_name} expected {expected} args but found {found} args")]
    ExpectedButFoundArity {
        function_name: Iden,
        expected: usize,
        found: usize,
    },
    /// The left side of an assignment was not an application of a function
    /// symbol.
    #[error("cannot assign to {0}")]
    BadAssignTarget(String),
    /// The construct has no SMT translation.
    #[error("{0} cannot be compiled to SMT")]
    Unsupported(String),
    /// An internal invariant was broken.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EmbedError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbedError::Internal(_) => ErrorKind::Invariant,
            _ => ErrorKind::MalformedInput,
        }
    }
}
