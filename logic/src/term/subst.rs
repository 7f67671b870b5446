// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Substitution of variables and queries about the variables of a value.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::iden::Iden;
use crate::syntax::{Value, ValueRef, VarDecl};
use crate::term::{binder_parts, map_children, rebind};

/// Substitute `e` for the free occurrences of the variable `x` in `v`.
///
/// Binders in `v` that would capture a free variable of `e` are renamed to
/// fresh names first.
pub fn subst(v: &ValueRef, x: Iden, e: &ValueRef) -> ValueRef {
    subst_rec(v, x, e, &free_vars(e))
}

fn subst_rec(v: &ValueRef, x: Iden, e: &ValueRef, e_free: &BTreeSet<Iden>) -> ValueRef {
    match &**v {
        Value::Var(name, _) if *name == x => e.clone(),
        Value::Forall(decls, body) | Value::Exists(decls, body) | Value::NearlyForall(decls, body) => {
            if decls.iter().any(|d| d.name == x) {
                return v.clone();
            }
            let mut renaming = BTreeMap::new();
            let decls = decls
                .iter()
                .map(|d| {
                    if e_free.contains(&d.name) {
                        let fresh = Iden::fresh(d.name.as_str());
                        renaming.insert(d.name, fresh);
                        VarDecl {
                            name: fresh,
                            sort: d.sort.clone(),
                        }
                    } else {
                        d.clone()
                    }
                })
                .collect();
            let body = rename_vars(body, &renaming);
            rebind(v, decls, subst_rec(&body, x, e, e_free))
        }
        _ => map_children(v, |c| subst_rec(c, x, e, e_free)),
    }
}

/// Simultaneously rename free variables according to `renaming`.
///
/// Renaming does not avoid capture: the new names must not be bound inside
/// `v`. This holds whenever `v` has had its variables uniquified.
pub fn rename_vars(v: &ValueRef, renaming: &BTreeMap<Iden, Iden>) -> ValueRef {
    if renaming.is_empty() {
        return v.clone();
    }
    match &**v {
        Value::Var(name, sort) => match renaming.get(name) {
            Some(new) => Arc::new(Value::Var(*new, sort.clone())),
            None => v.clone(),
        },
        Value::Forall(decls, body) | Value::Exists(decls, body) | Value::NearlyForall(decls, body) => {
            let mut inner = renaming.clone();
            for d in decls {
                inner.remove(&d.name);
            }
            rebind(v, decls.clone(), rename_vars(body, &inner))
        }
        _ => map_children(v, |c| rename_vars(c, renaming)),
    }
}

/// The variables that occur free in `v`.
pub fn free_vars(v: &Value) -> BTreeSet<Iden> {
    fn go(v: &Value, bound: &im::HashSet<Iden>, out: &mut BTreeSet<Iden>) {
        match v {
            Value::Var(name, _) => {
                if !bound.contains(name) {
                    out.insert(*name);
                }
            }
            _ => match binder_parts(v) {
                Some((decls, body)) => {
                    let mut bound = bound.clone();
                    bound.extend(decls.iter().map(|d| d.name));
                    go(body, &bound, out)
                }
                None => v.children().into_iter().for_each(|c| go(c, bound, out)),
            },
        }
    }
    let mut out = BTreeSet::new();
    go(v, &im::HashSet::new(), &mut out);
    out
}

/// Add to `out` every variable name used in `v`, whether it occurs as a
/// variable or is declared by a binder.
pub fn used_vars(v: &Value, out: &mut BTreeSet<Iden>) {
    match v {
        Value::Var(name, _) => {
            out.insert(*name);
        }
        _ => {
            if let Some((decls, _)) = binder_parts(v) {
                out.extend(decls.iter().map(|d| d.name));
            }
            for c in v.children() {
                used_vars(c, out);
            }
        }
    }
}

/// Variable occurrences in `v`, left to right, without repetition.
pub fn var_occurrences(v: &Value) -> Vec<Iden> {
    fn go(v: &Value, out: &mut Vec<Iden>) {
        match v {
            Value::Var(name, _) => {
                if !out.contains(name) {
                    out.push(*name);
                }
            }
            _ => v.children().into_iter().for_each(|c| go(c, out)),
        }
    }
    let mut out = vec![];
    go(v, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Sort;

    fn node() -> Sort {
        Sort::uninterpreted("node")
    }

    fn r() -> ValueRef {
        Value::constant("r", Sort::function([node(), node()], Sort::Bool))
    }

    #[test]
    fn test_subst_free_only() {
        let x = Value::var("x", node());
        let y = Value::var("y", node());
        let z = Value::var("z", node());
        // r(x, y) & forall x. r(x, y)
        let v = Value::and([
            Value::apply(r(), [x.clone(), y.clone()]),
            Value::forall(
                [VarDecl::new("x", node())],
                Value::apply(r(), [x.clone(), y.clone()]),
            ),
        ]);
        let out = subst(&v, Iden::new("x"), &z);
        insta::assert_display_snapshot!(out, @"r(z, y) & (forall x:node. r(x, y))");
    }

    #[test]
    fn test_subst_avoids_capture() {
        let x = Value::var("x", node());
        let y = Value::var("y", node());
        // forall x. r(x, y), substituting x for y
        let v = Value::forall([VarDecl::new("x", node())], Value::apply(r(), [x.clone(), y]));
        let out = subst(&v, Iden::new("y"), &x);
        let Value::Forall(decls, body) = &*out else {
            panic!("expected forall, got {out}");
        };
        let bound = decls[0].name;
        assert_ne!(bound, Iden::new("x"));
        assert_eq!(
            *body,
            Value::apply(r(), [Arc::new(Value::Var(bound, node())), x])
        );
        assert_eq!(free_vars(&out), BTreeSet::from([Iden::new("x")]));
    }

    #[test]
    fn test_used_vars() {
        let v = Value::exists(
            [VarDecl::new("a", node()), VarDecl::new("unused", node())],
            Value::apply(r(), [Value::var("a", node()), Value::var("b", node())]),
        );
        let mut used = BTreeSet::new();
        used_vars(&v, &mut used);
        assert_eq!(
            used,
            ["a", "b", "unused"]
                .into_iter()
                .map(Iden::new)
                .collect::<BTreeSet<_>>()
        );
        assert_eq!(free_vars(&v), BTreeSet::from([Iden::new("b")]));
        assert_eq!(var_occurrences(&v), vec![Iden::new("a"), Iden::new("b")]);
    }
}
