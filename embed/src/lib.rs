// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Symbolic execution of transition-system modules into SMT.
//!
//! A [`context::BackgroundContext`] owns the solver session and the SMT sorts
//! of a module. A [`embedding::ModelEmbedding`] maps each function symbol of
//! the module to its current SMT symbol, and compiles formulas under that
//! mapping. [`action::apply_action`] executes an action symbolically: it
//! returns the embedding of the post-state together with a guard constraint
//! relating pre- and post-state symbols. The contexts in [`induction`] set up
//! the queries used to check that conjectures are inductive.

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod action;
pub mod context;
pub mod embedding;
pub mod error;
pub mod induction;
pub mod session;
