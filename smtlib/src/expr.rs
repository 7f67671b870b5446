// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Builders for SMT-LIB terms and commands.
//!
//! The boolean connectives simplify their degenerate forms: an empty `and` is
//! `true`, an empty `or` is `false`, a single conjunct or disjunct stands for
//! itself, and a quantifier without binders is just its body. Solvers differ
//! in whether they accept the degenerate forms, so they are never emitted.

use crate::sexp::{app, atom_i, atom_s, sexp_l, Sexp};

/// The constant `true`.
pub fn true_() -> Sexp {
    atom_s("true")
}

/// The constant `false`.
pub fn false_() -> Sexp {
    atom_s("false")
}

/// `(= lhs rhs)`
pub fn eq(lhs: Sexp, rhs: Sexp) -> Sexp {
    app("=", [lhs, rhs])
}

/// `(not e)`, cancelling a double negation.
pub fn not(e: Sexp) -> Sexp {
    if let Some(("not", [inner])) = e.app() {
        return inner.clone();
    }
    app("not", [e])
}

fn nary<I>(op: &str, unit: Sexp, args: I) -> Sexp
where
    I: IntoIterator<Item = Sexp>,
{
    let mut args: Vec<Sexp> = args.into_iter().collect();
    match args.len() {
        0 => unit,
        1 => args.swap_remove(0),
        _ => app(op, args),
    }
}

/// Conjunction of `args`.
pub fn and<I>(args: I) -> Sexp
where
    I: IntoIterator<Item = Sexp>,
{
    nary("and", true_(), args)
}

/// Disjunction of `args`.
pub fn or<I>(args: I) -> Sexp
where
    I: IntoIterator<Item = Sexp>,
{
    nary("or", false_(), args)
}

/// `(ite cond then else)`
pub fn ite(cond: Sexp, then: Sexp, else_: Sexp) -> Sexp {
    app("ite", [cond, then, else_])
}

fn quantify(quantifier: &str, binders: Vec<(String, Sexp)>, body: Sexp) -> Sexp {
    if binders.is_empty() {
        return body;
    }
    let binders = binders
        .into_iter()
        .map(|(name, sort)| sexp_l([atom_s(name), sort]));
    app(quantifier, [sexp_l(binders), body])
}

/// `(forall ((x s) ...) body)`
pub fn forall(binders: Vec<(String, Sexp)>, body: Sexp) -> Sexp {
    quantify("forall", binders, body)
}

/// `(exists ((x s) ...) body)`
pub fn exists(binders: Vec<(String, Sexp)>, body: Sexp) -> Sexp {
    quantify("exists", binders, body)
}

/// `(declare-sort name 0)`
pub fn declare_sort(name: &str) -> Sexp {
    app("declare-sort", [atom_s(name), atom_i(0)])
}

/// `(declare-fun name (domain...) range)`
pub fn declare_fun(name: &str, domain: &[Sexp], range: &Sexp) -> Sexp {
    app(
        "declare-fun",
        [atom_s(name), sexp_l(domain.to_vec()), range.clone()],
    )
}

/// `(assert e)`
pub fn assert(e: Sexp) -> Sexp {
    app("assert", [e])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_connectives() {
        let p = atom_s("p");
        assert_eq!(and(Vec::new()), true_());
        assert_eq!(or(Vec::new()), false_());
        assert_eq!(and([p.clone()]), p);
        assert_eq!(not(not(p.clone())), p);
        assert_eq!(forall(vec![], p.clone()), p);
    }

    #[test]
    fn test_printing() {
        let x = atom_s("x");
        let e = forall(
            vec![("x".to_string(), atom_s("node"))],
            eq(
                app("leader@1", [x.clone()]),
                ite(
                    and([eq(x.clone(), atom_s("n@0")), true_()]),
                    true_(),
                    app("leader@0", [x]),
                ),
            ),
        );
        insta::assert_display_snapshot!(e, @"(forall ((x node)) (= (leader@1 x) (ite (and (= x n@0) true) true (leader@0 x))))");
        insta::assert_display_snapshot!(declare_fun("leader@0", &[atom_s("node")], &atom_s("Bool")), @"(declare-fun leader@0 (node) Bool)");
        insta::assert_display_snapshot!(declare_sort("node"), @"(declare-sort node 0)");
    }
}
