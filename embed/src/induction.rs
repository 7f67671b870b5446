// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Solver contexts prepared for the standard verification queries.
//!
//! Each context declares a module's sorts and symbols in a session and
//! asserts the formulas describing one kind of state (or pair of states).
//! Callers add the query's own assertions and check satisfiability.

use std::sync::Arc;

use logic::syntax::{Module, ValueRef};
use smtlib::expr;

use crate::action::apply_action;
use crate::context::BackgroundContext;
use crate::embedding::{Env, ModelEmbedding};
use crate::error::EmbedError;
use crate::session::Session;

fn embed_module(
    session: Session,
    module: &Module,
) -> Result<(Arc<BackgroundContext>, Arc<ModelEmbedding>), EmbedError> {
    let ctx = Arc::new(BackgroundContext::new(session, module)?);
    let e = ModelEmbedding::make_embedding(&ctx, module)?;
    Ok((ctx, e))
}

/// Compile every formula of `vs` under `e`, then assert them under a comment.
fn assert_all(e: &ModelEmbedding, what: &str, vs: &[ValueRef]) -> Result<(), EmbedError> {
    if vs.is_empty() {
        return Ok(());
    }
    let compiled = vs
        .iter()
        .map(|v| e.value_to_expr(v))
        .collect::<Result<Vec<_>, _>>()?;
    let mut session = e.ctx.session();
    session.comment_with(|| what.to_string());
    for c in compiled {
        session.assert(c);
    }
    Ok(())
}

/// A state `e1`, a successor state `e2` reached by one step of the module,
/// and the module's axioms in `e1`.
///
/// Assert a conjecture under `e1` and its negation under `e2` to check
/// consecution.
#[derive(Debug, Clone)]
pub struct InductionContext {
    #[allow(missing_docs)]
    pub ctx: Arc<BackgroundContext>,
    /// The pre-state
    pub e1: Arc<ModelEmbedding>,
    /// The post-state
    pub e2: Arc<ModelEmbedding>,
}

impl InductionContext {
    /// Declare `module` in `session` and assert its transition relation and
    /// axioms.
    pub fn new(session: Session, module: &Module) -> Result<Self, EmbedError> {
        let (ctx, e1) = embed_module(session, module)?;
        let step = apply_action(&e1, &module.step(), &Env::new())?;
        {
            let mut session = ctx.session();
            session.comment_with(|| "transition".to_string());
            session.assert(step.constraint);
        }
        assert_all(&e1, "axioms", &module.axioms)?;
        log::debug!(
            "induction context over {} actions, {} axioms",
            module.actions.len(),
            module.axioms.len()
        );
        Ok(InductionContext {
            ctx,
            e1,
            e2: step.e,
        })
    }
}

/// An initial state: the module's axioms and inits.
#[derive(Debug, Clone)]
pub struct InitContext {
    #[allow(missing_docs)]
    pub ctx: Arc<BackgroundContext>,
    #[allow(missing_docs)]
    pub e: Arc<ModelEmbedding>,
}

impl InitContext {
    /// Declare `module` in `session` and assert its axioms and inits.
    pub fn new(session: Session, module: &Module) -> Result<Self, EmbedError> {
        let (ctx, e) = embed_module(session, module)?;
        assert_all(&e, "axioms", &module.axioms)?;
        assert_all(&e, "inits", &module.inits)?;
        Ok(InitContext { ctx, e })
    }
}

/// A state satisfying the axioms and violating some conjecture.
#[derive(Debug, Clone)]
pub struct ConjectureContext {
    #[allow(missing_docs)]
    pub ctx: Arc<BackgroundContext>,
    #[allow(missing_docs)]
    pub e: Arc<ModelEmbedding>,
}

impl ConjectureContext {
    /// Declare `module` in `session` and assert its axioms and the negated
    /// conjunction of its conjectures.
    pub fn new(session: Session, module: &Module) -> Result<Self, EmbedError> {
        let (ctx, e) = embed_module(session, module)?;
        assert_all(&e, "axioms", &module.axioms)?;
        let conjectures = module
            .conjectures
            .iter()
            .map(|v| e.value_to_expr(v))
            .collect::<Result<Vec<_>, _>>()?;
        {
            let mut session = ctx.session();
            session.comment_with(|| "some conjecture fails".to_string());
            session.assert(expr::not(expr::and(conjectures)));
        }
        Ok(ConjectureContext { ctx, e })
    }
}

/// A state satisfying the axioms, for checking candidate invariants.
#[derive(Debug, Clone)]
pub struct InvariantsContext {
    #[allow(missing_docs)]
    pub ctx: Arc<BackgroundContext>,
    #[allow(missing_docs)]
    pub e: Arc<ModelEmbedding>,
}

impl InvariantsContext {
    /// Declare `module` in `session` and assert its axioms.
    pub fn new(session: Session, module: &Module) -> Result<Self, EmbedError> {
        let (ctx, e) = embed_module(session, module)?;
        assert_all(&e, "axioms", &module.axioms)?;
        Ok(InvariantsContext { ctx, e })
    }
}
