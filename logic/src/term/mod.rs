// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Utilities for manipulating [`crate::syntax::Value`]s.

use std::sync::Arc;

use crate::syntax::{Value, ValueRef, VarDecl};

pub mod normalize;
pub mod subst;

/// Rebuild a value by applying `f` to each immediate child. Binders are kept
/// and only the body is mapped. Leaves are shared, not copied.
pub fn map_children<F>(v: &ValueRef, mut f: F) -> ValueRef
where
    F: FnMut(&ValueRef) -> ValueRef,
{
    match &**v {
        Value::Forall(decls, body) => Arc::new(Value::Forall(decls.clone(), f(body))),
        Value::Exists(decls, body) => Arc::new(Value::Exists(decls.clone(), f(body))),
        Value::NearlyForall(decls, body) => Arc::new(Value::NearlyForall(decls.clone(), f(body))),
        Value::Const(..) | Value::Var(..) | Value::TemplateHole => v.clone(),
        Value::Not(x) => Arc::new(Value::Not(f(x))),
        Value::Implies(l, r) => Arc::new(Value::Implies(f(l), f(r))),
        Value::Eq(l, r) => Arc::new(Value::Eq(f(l), f(r))),
        Value::Apply(func, args) => {
            let func = f(func);
            Arc::new(Value::Apply(func, args.iter().map(&mut f).collect()))
        }
        Value::And(vs) => Arc::new(Value::And(vs.iter().map(&mut f).collect())),
        Value::Or(vs) => Arc::new(Value::Or(vs.iter().map(&mut f).collect())),
    }
}

/// The declarations and body of a quantifier, or `None` for other values.
pub fn binder_parts(v: &Value) -> Option<(&[VarDecl], &ValueRef)> {
    match v {
        Value::Forall(decls, body) | Value::Exists(decls, body) | Value::NearlyForall(decls, body) => {
            Some((decls, body))
        }
        _ => None,
    }
}

/// Build a quantifier of the same kind as `like` over new declarations and body.
///
/// Panics if `like` is not a quantifier.
pub fn rebind(like: &Value, decls: Vec<VarDecl>, body: ValueRef) -> ValueRef {
    Arc::new(match like {
        Value::Forall(..) => Value::Forall(decls, body),
        Value::Exists(..) => Value::Exists(decls, body),
        Value::NearlyForall(..) => Value::NearlyForall(decls, body),
        _ => panic!("rebind called on a non-quantifier"),
    })
}
