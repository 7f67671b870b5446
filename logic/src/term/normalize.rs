// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Negation and the normal forms used to compare formulas up to renaming of
//! bound variables and reordering of symmetric structure.
//!
//! [`totally_normalize`] is the composition of the individual passes:
//! uniquify the bound variables, normalize the boolean structure, break
//! symmetries between bound variables, and finally rename every binder by its
//! position.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use itertools::Itertools;

use crate::iden::Iden;
use crate::syntax::{Sort, Value, ValueRef, VarDecl};
use crate::term::subst::{rename_vars, var_occurrences};
use crate::term::{map_children, rebind};

/// Push a negation one level into `v`.
///
/// Quantifiers are dualized, `And` and `Or` follow De Morgan, an implication
/// becomes a conjunction, and a double negation cancels. `NearlyForall` has no
/// dual and is wrapped in `Not`.
pub fn negate(v: &ValueRef) -> ValueRef {
    match &**v {
        Value::Forall(decls, body) => Arc::new(Value::Exists(decls.clone(), negate(body))),
        Value::Exists(decls, body) => Arc::new(Value::Forall(decls.clone(), negate(body))),
        Value::Not(x) => x.clone(),
        Value::Implies(l, r) => Arc::new(Value::And(vec![l.clone(), negate(r)])),
        Value::And(vs) => Arc::new(Value::Or(vs.iter().map(negate).collect())),
        Value::Or(vs) => Arc::new(Value::And(vs.iter().map(negate).collect())),
        Value::NearlyForall(..)
        | Value::Const(..)
        | Value::Var(..)
        | Value::Apply(..)
        | Value::Eq(..)
        | Value::TemplateHole => Arc::new(Value::Not(v.clone())),
    }
}

/// Rename every bound variable to a globally fresh name. Free variables are
/// renamed according to `renaming` (and otherwise kept).
pub fn uniquify_vars(v: &ValueRef, renaming: &BTreeMap<Iden, Iden>) -> ValueRef {
    match &**v {
        Value::Var(name, sort) => match renaming.get(name) {
            Some(new) => Arc::new(Value::Var(*new, sort.clone())),
            None => v.clone(),
        },
        Value::Forall(decls, body) | Value::Exists(decls, body) | Value::NearlyForall(decls, body) => {
            let mut inner = renaming.clone();
            let decls = decls
                .iter()
                .map(|d| {
                    let fresh = Iden::fresh(d.name.as_str());
                    inner.insert(d.name, fresh);
                    VarDecl {
                        name: fresh,
                        sort: d.sort.clone(),
                    }
                })
                .collect();
            rebind(v, decls, uniquify_vars(body, &inner))
        }
        _ => map_children(v, |c| uniquify_vars(c, renaming)),
    }
}

/// The name given to the bound variable at binding depth `n`.
fn indexed_name(n: usize) -> Iden {
    Iden::new(&format!("_{n}"))
}

/// Rename every bound variable by its binding depth: the outermost variable
/// becomes `_0`, the next `_1`, and so on. Free variables are renamed
/// according to `renaming`; numbering starts after them.
pub fn indexify_vars(v: &ValueRef, renaming: &BTreeMap<Iden, Iden>) -> ValueRef {
    fn go(v: &ValueRef, renaming: &BTreeMap<Iden, Iden>, next: usize) -> ValueRef {
        match &**v {
            Value::Var(name, sort) => match renaming.get(name) {
                Some(new) => Arc::new(Value::Var(*new, sort.clone())),
                None => v.clone(),
            },
            Value::Forall(decls, body)
            | Value::Exists(decls, body)
            | Value::NearlyForall(decls, body) => {
                let mut inner = renaming.clone();
                let decls = decls
                    .iter()
                    .enumerate()
                    .map(|(i, d)| {
                        let name = indexed_name(next + i);
                        inner.insert(d.name, name);
                        VarDecl {
                            name,
                            sort: d.sort.clone(),
                        }
                    })
                    .collect_vec();
                let next = next + decls.len();
                rebind(v, decls, go(body, &inner, next))
            }
            _ => map_children(v, |c| go(c, renaming, next)),
        }
    }
    go(v, renaming, renaming.len())
}

fn flatten_sorted(vs: &[ValueRef], conjunction: bool) -> Vec<ValueRef> {
    let mut out = vec![];
    for v in vs.iter().map(structurally_normalize_unique) {
        let nested = match (&*v, conjunction) {
            (Value::And(inner), true) | (Value::Or(inner), false) => Some(inner.clone()),
            _ => None,
        };
        match nested {
            Some(inner) => out.extend(inner),
            None => out.push(v),
        }
    }
    out.sort();
    out.dedup();
    out
}

/// Normalize the boolean structure of a value whose bound variables are
/// already unique (see [`uniquify_vars`]).
///
/// Nested quantifiers of the same kind are merged, implications become
/// disjunctions, double negations cancel, conjunctions and disjunctions are
/// flattened, sorted, and deduplicated, and equalities are oriented.
pub fn structurally_normalize_unique(v: &ValueRef) -> ValueRef {
    match &**v {
        Value::Forall(decls, body) | Value::Exists(decls, body) => {
            let body = structurally_normalize_unique(body);
            if decls.is_empty() {
                return body;
            }
            let merged = match (&**v, &*body) {
                (Value::Forall(..), Value::Forall(inner, inner_body))
                | (Value::Exists(..), Value::Exists(inner, inner_body)) => Some((
                    decls.iter().chain(inner).cloned().collect(),
                    inner_body.clone(),
                )),
                _ => None,
            };
            match merged {
                Some((decls, inner_body)) => rebind(v, decls, inner_body),
                None => rebind(v, decls.clone(), body),
            }
        }
        Value::NearlyForall(decls, body) => {
            let body = structurally_normalize_unique(body);
            if decls.is_empty() {
                return body;
            }
            rebind(v, decls.clone(), body)
        }
        Value::Not(x) => Value::not(structurally_normalize_unique(x)),
        Value::Implies(l, r) => {
            structurally_normalize_unique(&Arc::new(Value::Or(vec![Value::not(l.clone()), r.clone()])))
        }
        Value::Eq(l, r) => {
            let l = structurally_normalize_unique(l);
            let r = structurally_normalize_unique(r);
            if r < l {
                Value::eq(r, l)
            } else {
                Value::eq(l, r)
            }
        }
        Value::And(vs) => Value::and(flatten_sorted(vs, true)),
        Value::Or(vs) => Value::or(flatten_sorted(vs, false)),
        _ => map_children(v, structurally_normalize_unique),
    }
}

/// Uniquify the bound variables of `v` and normalize its boolean structure.
pub fn structurally_normalize(v: &ValueRef) -> ValueRef {
    structurally_normalize_unique(&uniquify_vars(v, &BTreeMap::new()))
}

/// The bound variables in scope during symmetry normalization. Any two of
/// them with the same sort are interchangeable.
#[derive(Clone, Debug, Default)]
pub struct ScopeState {
    bound: im::OrdMap<Iden, Sort>,
}

impl ScopeState {
    /// A scope with the given variables bound.
    pub fn with_decls(&self, decls: &[VarDecl]) -> Self {
        let mut bound = self.bound.clone();
        for d in decls {
            bound.insert(d.name, d.sort.clone());
        }
        ScopeState { bound }
    }

    /// Whether `name` is bound in this scope.
    pub fn is_bound(&self, name: Iden) -> bool {
        self.bound.contains_key(&name)
    }
}

/// The shape of `v` with its interchangeable variables erased: bound variables
/// in scope (other than those in `vars_used`) become a placeholder for their
/// sort, and variables bound inside `v` are numbered by depth.
fn symmetry_key(v: &ValueRef, ss: &ScopeState, vars_used: &BTreeSet<Iden>) -> ValueRef {
    let placeholders = ss
        .bound
        .iter()
        .filter(|(name, _)| !vars_used.contains(name))
        .map(|(name, sort)| (*name, Iden::new(&format!("?{sort}"))))
        .collect::<BTreeMap<_, _>>();
    indexify_vars(&rename_vars(v, &placeholders), &BTreeMap::new())
}

fn symmetric_cmp(
    a: &ValueRef,
    b: &ValueRef,
    ss: &ScopeState,
    vars_used: &BTreeSet<Iden>,
) -> Ordering {
    symmetry_key(a, ss, vars_used)
        .cmp(&symmetry_key(b, ss, vars_used))
        .then_with(|| a.cmp(b))
}

/// Choose names for a block of declarations so that, within each sort, the
/// variables are named in order of first occurrence in `body`.
fn canonical_renaming(
    decls: &[VarDecl],
    body: &Value,
    vars_used: &BTreeSet<Iden>,
) -> BTreeMap<Iden, Iden> {
    let occurrences = var_occurrences(body);
    let mut renaming = BTreeMap::new();
    let by_sort = decls
        .iter()
        .filter(|d| !vars_used.contains(&d.name))
        .into_group_map_by(|d| d.sort.clone());
    for group in by_sort.values() {
        let targets = group.iter().map(|d| d.name).collect_vec();
        let order = occurrences
            .iter()
            .filter(|name| targets.contains(name))
            .chain(targets.iter().filter(|name| !occurrences.contains(name)));
        for (old, new) in order.zip(&targets) {
            if old != new {
                renaming.insert(*old, *new);
            }
        }
    }
    renaming
}

fn symmetries_rec(
    v: &ValueRef,
    ss: &ScopeState,
    vars_used: &BTreeSet<Iden>,
    rename_binders: bool,
) -> ValueRef {
    match &**v {
        Value::Forall(decls, body) | Value::Exists(decls, body) | Value::NearlyForall(decls, body) => {
            let ss = ss.with_decls(decls);
            let body = symmetries_rec(body, &ss, vars_used, rename_binders);
            if !rename_binders {
                return rebind(v, decls.clone(), body);
            }
            let renaming = canonical_renaming(decls, &body, vars_used);
            let body = if renaming.is_empty() {
                body
            } else {
                symmetries_rec(&rename_vars(&body, &renaming), &ss, vars_used, false)
            };
            rebind(v, decls.clone(), body)
        }
        Value::And(vs) | Value::Or(vs) => {
            let mut vs = vs
                .iter()
                .map(|c| symmetries_rec(c, ss, vars_used, rename_binders))
                .collect_vec();
            vs.sort_by(|a, b| symmetric_cmp(a, b, ss, vars_used));
            Arc::new(match &**v {
                Value::And(_) => Value::And(vs),
                _ => Value::Or(vs),
            })
        }
        Value::Eq(l, r) => {
            let l = symmetries_rec(l, ss, vars_used, rename_binders);
            let r = symmetries_rec(r, ss, vars_used, rename_binders);
            if symmetric_cmp(&r, &l, ss, vars_used) == Ordering::Less {
                Value::eq(r, l)
            } else {
                Value::eq(l, r)
            }
        }
        _ => map_children(v, |c| symmetries_rec(c, ss, vars_used, rename_binders)),
    }
}

/// Break the symmetry between interchangeable bound variables.
///
/// Conjuncts, disjuncts, and the sides of equalities are ordered by their
/// shape with interchangeable variables erased, and then the variables of
/// each quantifier block are renamed so that, within a sort, they are named
/// in order of first occurrence. Variables in `vars_used` are treated as
/// fixed. The input must have unique bound variables.
pub fn normalize_symmetries(
    v: &ValueRef,
    ss: &ScopeState,
    vars_used: &BTreeSet<Iden>,
) -> ValueRef {
    symmetries_rec(v, ss, vars_used, true)
}

/// The full normal form: two formulas that differ only by renaming of bound
/// variables, by the order of conjuncts and disjuncts, or by a permutation of
/// interchangeable bound variables normalize to the same value.
pub fn totally_normalize(v: &ValueRef) -> ValueRef {
    let v = structurally_normalize(v);
    let v = normalize_symmetries(&v, &ScopeState::default(), &BTreeSet::new());
    indexify_vars(&v, &BTreeMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Sort {
        Sort::uninterpreted("node")
    }

    fn rel(name: &str, arity: usize) -> ValueRef {
        Value::constant(name, Sort::function(vec![node(); arity], Sort::Bool))
    }

    fn app(name: &str, args: &[&str]) -> ValueRef {
        Value::apply(
            rel(name, args.len()),
            args.iter().map(|a| Value::var(a, node())),
        )
    }

    fn decls(names: &[&str]) -> Vec<VarDecl> {
        names.iter().map(|n| VarDecl::new(n, node())).collect()
    }

    #[test]
    fn test_negate() {
        let p = Value::constant("p", Sort::Bool);
        let q = Value::constant("q", Sort::Bool);
        let v = Value::forall(decls(&["x"]), Value::implies(app("r", &["x"]), Value::and([p.clone(), q])));
        insta::assert_display_snapshot!(negate(&v), @"exists x:node. r(x) & (!p | !q)");
        assert_eq!(negate(&Value::not(p.clone())), p);
        assert_eq!(negate(&Value::true_()), Value::false_());
        let nf = Value::nearly_forall(decls(&["x"]), app("r", &["x"]));
        assert_eq!(negate(&nf), Arc::new(Value::Not(nf.clone())));
    }

    #[test]
    fn test_structural() {
        let a = app("a", &[]);
        let b = app("b", &[]);
        let v = Value::and([b.clone(), Value::and([a.clone(), b.clone()]), Value::implies(a.clone(), b.clone())]);
        insta::assert_display_snapshot!(structurally_normalize(&v), @"a() & b() & (!a() | b())");
        let v = Value::forall(decls(&["x"]), Value::forall(decls(&["y"]), app("r", &["x", "y"])));
        let Value::Forall(merged, _) = &*structurally_normalize(&v) else {
            panic!("expected a single forall");
        };
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_indexify() {
        let v = Value::forall(
            decls(&["x"]),
            Value::and([
                Value::exists(decls(&["y", "z"]), app("r", &["x", "y"])),
                Value::exists(decls(&["w"]), app("r", &["w", "x"])),
            ]),
        );
        insta::assert_display_snapshot!(
            indexify_vars(&v, &BTreeMap::new()),
            @"forall _0:node. (exists _1:node, _2:node. r(_0, _1)) & (exists _1:node. r(_1, _0))"
        );
    }

    #[test]
    fn test_alpha_equivalent() {
        let v1 = Value::forall(decls(&["x"]), app("p", &["x"]));
        let v2 = Value::forall(decls(&["y"]), app("p", &["y"]));
        assert_eq!(totally_normalize(&v1), totally_normalize(&v2));
    }

    #[test]
    fn test_symmetric_variables() {
        let v1 = Value::forall(decls(&["a", "b"]), Value::and([app("r", &["a"]), app("s", &["b"])]));
        let v2 = Value::forall(decls(&["a", "b"]), Value::and([app("r", &["b"]), app("s", &["a"])]));
        let v3 = Value::forall(decls(&["a", "b"]), Value::and([app("s", &["a"]), app("r", &["b"])]));
        let n1 = totally_normalize(&v1);
        assert_eq!(n1, totally_normalize(&v2));
        assert_eq!(n1, totally_normalize(&v3));
        insta::assert_display_snapshot!(n1, @"forall _0:node, _1:node. r(_0) & s(_1)");
    }

    #[test]
    fn test_symmetric_equalities() {
        let x = Value::var("x", node());
        let y = Value::var("y", node());
        let v1 = Value::forall(decls(&["x", "y"]), Value::eq(x.clone(), y.clone()));
        let v2 = Value::forall(decls(&["x", "y"]), Value::eq(y, x));
        assert_eq!(totally_normalize(&v1), totally_normalize(&v2));
    }

    #[test]
    fn test_distinct_stay_distinct() {
        let v1 = Value::forall(decls(&["a", "b"]), app("r", &["a", "b"]));
        let v2 = Value::forall(decls(&["a"]), app("r", &["a", "a"]));
        assert_ne!(totally_normalize(&v1), totally_normalize(&v2));
        let v3 = Value::exists(decls(&["a", "b"]), app("r", &["a", "b"]));
        assert_ne!(totally_normalize(&v1), totally_normalize(&v3));
    }

    #[test]
    fn test_fixed_vars_not_renamed() {
        let v = Value::forall(decls(&["a", "b"]), app("r", &["b", "a"]));
        let v = uniquify_vars(&v, &BTreeMap::new());
        let Value::Forall(ds, _) = &*v else {
            panic!("expected forall");
        };
        let fixed: BTreeSet<Iden> = ds.iter().map(|d| d.name).collect();
        assert_eq!(normalize_symmetries(&v, &ScopeState::default(), &fixed), v);
    }
}
