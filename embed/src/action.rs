// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Symbolic execution of actions.
//!
//! Executing an action from a pre-state embedding yields the embedding of the
//! post-state and a guard: a formula over the pre- and post-state symbols that
//! holds exactly for the pairs of states the action relates. Functions the
//! action does not assign keep their pre-state symbol, so they need no frame
//! condition.

use std::sync::Arc;

use logic::syntax::{Action, Value, ValueRef};
use smtlib::expr;
use smtlib::sexp::{atom_s, Sexp};

use crate::embedding::{Env, ModelEmbedding};
use crate::error::EmbedError;
use crate::session::FuncDecl;

/// The result of executing an action.
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// Embedding of the post-state
    pub e: Arc<ModelEmbedding>,
    /// Constraint relating the pre-state to the post-state
    pub constraint: Sexp,
}

/// Execute `action` symbolically from the pre-state `e`, with the local
/// constants `consts` in scope.
pub fn apply_action(
    e: &Arc<ModelEmbedding>,
    action: &Action,
    consts: &Env,
) -> Result<ActionResult, EmbedError> {
    match action {
        Action::Local { args, body } => {
            let mut consts = consts.clone();
            for arg in args {
                let sort = e.ctx.get_sort(&arg.sort)?;
                let decl = e.ctx.session().declare_fun(arg.name.as_str(), vec![], sort);
                consts.insert(arg.name, decl.apply(vec![]));
            }
            apply_action(e, body, &consts)
        }
        Action::Sequence(actions) => {
            let mut cur = e.clone();
            let mut parts = vec![];
            for a in actions {
                let res = apply_action(&cur, a, consts)?;
                parts.push(res.constraint);
                cur = res.e;
            }
            Ok(ActionResult {
                e: cur,
                constraint: expr::and(parts),
            })
        }
        Action::Assume(body) => Ok(ActionResult {
            e: e.clone(),
            constraint: e.value_to_expr_consts(body, consts)?,
        }),
        Action::Choice(branches) => apply_choice(e, branches, consts),
        Action::Assign { left, right } => apply_assign(e, left, right, consts),
        Action::If {
            condition,
            then_body,
        } => apply_action(e, &if_else(condition, then_body, None), consts),
        Action::IfElse {
            condition,
            then_body,
            else_body,
        } => apply_action(e, &if_else(condition, then_body, Some(else_body)), consts),
    }
}

/// A conditional as a choice between two guarded branches.
fn if_else(condition: &ValueRef, then_body: &Action, else_body: Option<&Action>) -> Action {
    let mut else_branch = vec![Action::Assume(Value::not(condition.clone()))];
    else_branch.extend(else_body.cloned());
    Action::Choice(vec![
        Action::Sequence(vec![Action::Assume(condition.clone()), then_body.clone()]),
        Action::Sequence(else_branch),
    ])
}

/// `forall args. a(args) = b(args)` for two symbols of the same signature.
fn funcs_equal(e: &ModelEmbedding, a: &FuncDecl, b: &FuncDecl) -> Sexp {
    let binders: Vec<(String, Sexp)> = {
        let mut session = e.ctx.session();
        a.domain()
            .iter()
            .map(|sort| (session.fresh_name("arg"), sort.clone()))
            .collect()
    };
    let args: Vec<Sexp> = binders.iter().map(|(name, _)| atom_s(name)).collect();
    expr::forall(binders, expr::eq(a.apply(args.clone()), b.apply(args)))
}

fn apply_choice(
    e: &Arc<ModelEmbedding>,
    branches: &[Action],
    consts: &Env,
) -> Result<ActionResult, EmbedError> {
    // no branch can be taken
    if branches.is_empty() {
        return Ok(ActionResult {
            e: e.clone(),
            constraint: expr::false_(),
        });
    }
    let results = branches
        .iter()
        .map(|b| apply_action(e, b, consts))
        .collect::<Result<Vec<_>, _>>()?;

    // Every branch must leave each function at one shared post-state symbol:
    // the symbol of the first branch that changed it. Branches that end at a
    // different symbol equate theirs with the shared one.
    let mut mapping = e.mapping().clone();
    let mut equalities: Vec<Vec<Sexp>> = vec![vec![]; results.len()];
    for (name, orig) in e.mapping() {
        let symbols = results
            .iter()
            .map(|r| r.e.get_func(*name).cloned())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| EmbedError::Internal(format!("a branch lost the symbol for {name}")))?;
        let Some(canonical) = symbols.iter().find(|s| *s != orig).cloned() else {
            continue;
        };
        for (i, symbol) in symbols.iter().enumerate() {
            if *symbol != canonical {
                equalities[i].push(funcs_equal(e, symbol, &canonical));
            }
        }
        mapping.insert(*name, canonical);
    }

    let parts = results
        .into_iter()
        .zip(equalities)
        .map(|(r, mut eqs)| {
            if eqs.is_empty() {
                r.constraint
            } else {
                eqs.push(r.constraint);
                expr::and(eqs)
            }
        })
        .collect::<Vec<_>>();
    Ok(ActionResult {
        e: Arc::new(ModelEmbedding::new(e.ctx.clone(), mapping)),
        constraint: expr::or(parts),
    })
}

fn apply_assign(
    e: &Arc<ModelEmbedding>,
    left: &ValueRef,
    right: &ValueRef,
    consts: &Env,
) -> Result<ActionResult, EmbedError> {
    let (name, args) = match &**left {
        Value::Apply(func, args) => match &**func {
            Value::Const(name, _) => (*name, args),
            _ => return Err(EmbedError::BadAssignTarget(left.to_string())),
        },
        _ => return Err(EmbedError::BadAssignTarget(left.to_string())),
    };
    let orig = e.get_func(name)?.clone();
    if orig.arity() != args.len() {
        return Err(EmbedError::ExpectedButFoundArity {
            function_name: name,
            expected: orig.arity(),
            found: args.len(),
        });
    }
    let new = e
        .ctx
        .session()
        .declare_fun(name.as_str(), orig.domain().to_vec(), orig.range().clone());

    // The first occurrence of a variable argument binds a parameter of the
    // update. Any other argument, including a repeated variable, is a
    // wildcard parameter that the update only applies to when it equals the
    // argument's value.
    let mut vars = Env::new();
    let mut bound = vec![];
    for arg in args {
        match &**arg {
            Value::Var(v, _) if !vars.contains_key(v) => {
                let name = e.ctx.session().fresh_name(v.as_str());
                vars.insert(*v, atom_s(&name));
                bound.push(Some(name));
            }
            _ => bound.push(None),
        }
    }
    let mut binders = vec![];
    let mut params = vec![];
    let mut conditions = vec![];
    for ((arg, sort), param) in args.iter().zip(orig.domain()).zip(bound) {
        let param = match param {
            Some(param) => param,
            None => {
                let wildcard = e.ctx.session().fresh_name("arg");
                let value = e.value_to_expr_env(arg, consts, &vars)?;
                conditions.push(expr::eq(atom_s(&wildcard), value));
                wildcard
            }
        };
        params.push(atom_s(&param));
        binders.push((param, sort.clone()));
    }

    let right = e.value_to_expr_env(right, consts, &vars)?;
    let updated = if conditions.is_empty() {
        right
    } else {
        expr::ite(expr::and(conditions), right, orig.apply(params.clone()))
    };
    let constraint = expr::forall(binders, expr::eq(new.apply(params), updated));
    log::debug!("assign {name}: {} becomes {}", orig.name(), new.name());
    Ok(ActionResult {
        e: Arc::new(e.with_func(name, new)),
        constraint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BackgroundContext;
    use crate::session::Session;
    use logic::iden::Iden;
    use logic::syntax::{Module, Sort, VarDecl};
    use smtlib::conf::Z3Conf;
    use smtlib::path::solver_path;
    use smtlib::proc::SatResp;

    fn node() -> Sort {
        Sort::uninterpreted("node")
    }

    fn rel_sort() -> Sort {
        Sort::function([node()], Sort::Bool)
    }

    /// `name()` for a nullary function of sort `sort`
    fn nullary(name: &str, sort: Sort) -> ValueRef {
        Value::apply(Value::constant(name, sort), Vec::<ValueRef>::new())
    }

    fn module() -> Module {
        Module {
            sorts: vec!["node".to_string()],
            functions: vec![
                VarDecl::new("r", rel_sort()),
                VarDecl::new("x", node()),
                VarDecl::new("a", node()),
                VarDecl::new("b", node()),
                VarDecl::new("p", Sort::Bool),
                VarDecl::new("q", Sort::Bool),
            ],
            ..Default::default()
        }
    }

    fn setup(session: Session) -> Arc<ModelEmbedding> {
        let m = module();
        let ctx = Arc::new(BackgroundContext::new(session, &m).unwrap());
        ModelEmbedding::make_embedding(&ctx, &m).unwrap()
    }

    fn z3_session() -> Option<Session> {
        match Session::with_solver(Z3Conf::new(&solver_path("z3")).done()) {
            Ok(session) => Some(session),
            Err(_) => {
                eprintln!("could not find z3, skipping test");
                None
            }
        }
    }

    fn assign(left: ValueRef, right: ValueRef) -> Action {
        Action::Assign { left, right }
    }

    fn func<'a>(e: &'a ModelEmbedding, name: &str) -> &'a Arc<FuncDecl> {
        e.get_func(Iden::new(name)).unwrap()
    }

    #[test]
    fn test_assign_pointwise() {
        let e = setup(Session::new());
        // r(n) := n = a, for every n
        let n = Value::var("n", node());
        let a = assign(
            Value::apply(Value::constant("r", rel_sort()), [n.clone()]),
            Value::eq(n, nullary("a", node())),
        );
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        insta::assert_display_snapshot!(res.constraint, @"(forall ((n@7 node)) (= (r@6 n@7) (= n@7 a@2)))");
        assert_eq!(func(&res.e, "r").name(), "r@6");
        assert_eq!(func(&res.e, "x"), func(&e, "x"));
    }

    #[test]
    fn test_assign_parameter_named_like_symbol() {
        let e = setup(Session::new());
        // r(x@1) := x@1 = x, where the function x is embedded as x@1
        let v = Value::var("x@1", node());
        let a = assign(
            Value::apply(Value::constant("r", rel_sort()), [v.clone()]),
            Value::eq(v, nullary("x", node())),
        );
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        assert_eq!(func(&e, "x").name(), "x@1");
        insta::assert_display_snapshot!(res.constraint, @"(forall ((x@1@7 node)) (= (r@6 x@1@7) (= x@1@7 x@1)))");
    }

    #[test]
    fn test_assign_wildcards() {
        let e = setup(Session::new());
        let n = Value::var("n", node());
        // r(a) := p
        let a = assign(
            Value::apply(Value::constant("r", rel_sort()), [nullary("a", node())]),
            nullary("p", Sort::Bool),
        );
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        insta::assert_display_snapshot!(res.constraint, @"(forall ((arg@7 node)) (= (r@6 arg@7) (ite (= arg@7 a@2) p@4 (r@0 arg@7))))");

        // a binary relation updated on its diagonal: s(n, n) := true
        let s_sort = Sort::function([node(), node()], Sort::Bool);
        let m = Module {
            sorts: vec!["node".to_string()],
            functions: vec![VarDecl::new("s", s_sort.clone())],
            ..Default::default()
        };
        let ctx = Arc::new(BackgroundContext::new(Session::new(), &m).unwrap());
        let e = ModelEmbedding::make_embedding(&ctx, &m).unwrap();
        let a = assign(
            Value::apply(Value::constant("s", s_sort), [n.clone(), n]),
            Value::true_(),
        );
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        insta::assert_display_snapshot!(res.constraint, @"(forall ((n@2 node) (arg@3 node)) (= (s@1 n@2 arg@3) (ite (= arg@3 n@2) true (s@0 n@2 arg@3))))");
    }

    #[test]
    fn test_assign_nullary() {
        let e = setup(Session::new());
        let a = assign(nullary("x", node()), nullary("a", node()));
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        insta::assert_display_snapshot!(res.constraint, @"(= x@6 a@2)");
    }

    #[test]
    fn test_local() {
        let e = setup(Session::new());
        let c = Value::constant("c", node());
        let a = Action::Local {
            args: vec![VarDecl::new("c", node())],
            body: Box::new(Action::Assume(Value::eq(c, nullary("x", node())))),
        };
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        insta::assert_display_snapshot!(res.constraint, @"(= c@6 x@1)");
        assert_eq!(res.e.mapping(), e.mapping());
    }

    #[test]
    fn test_bad_assign() {
        let e = setup(Session::new());
        let a = assign(Value::var("n", node()), Value::true_());
        let err = apply_action(&e, &a, &Env::new()).unwrap_err();
        assert_eq!(err, EmbedError::BadAssignTarget("n".to_string()));
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedInput);
    }

    #[test]
    fn test_sequence_composes() {
        let first = assign(nullary("x", node()), nullary("a", node()));
        let second = assign(nullary("x", node()), nullary("b", node()));

        let e = setup(Session::new());
        let seq = Action::Sequence(vec![first.clone(), second.clone()]);
        let composed = apply_action(&e, &seq, &Env::new()).unwrap();

        let e = setup(Session::new());
        let r1 = apply_action(&e, &first, &Env::new()).unwrap();
        let r2 = apply_action(&r1.e, &second, &Env::new()).unwrap();

        assert_eq!(composed.constraint, expr::and([r1.constraint, r2.constraint]));
        assert_eq!(composed.e.mapping(), r2.e.mapping());
        let empty = apply_action(&e, &Action::Sequence(vec![]), &Env::new()).unwrap();
        assert_eq!(empty.constraint, expr::true_());
    }

    #[test]
    fn test_if_else_structure() {
        let e = setup(Session::new());
        let cond = nullary("p", Sort::Bool);
        let a = Action::IfElse {
            condition: cond.clone(),
            then_body: Box::new(Action::Assume(nullary("q", Sort::Bool))),
            else_body: Box::new(Action::Assume(Value::not(nullary("q", Sort::Bool)))),
        };
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        insta::assert_display_snapshot!(res.constraint, @"(or (and p@4 q@5) (and (not p@4) (not q@5)))");

        let a = Action::If {
            condition: cond,
            then_body: Box::new(Action::Assume(nullary("q", Sort::Bool))),
        };
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        insta::assert_display_snapshot!(res.constraint, @"(or (and p@4 q@5) (not p@4))");
    }

    #[test]
    fn test_choice_shared_symbol() {
        let e = setup(Session::new());
        let a = Action::Choice(vec![
            assign(nullary("x", node()), nullary("a", node())),
            assign(nullary("x", node()), nullary("b", node())),
            Action::Assume(nullary("p", Sort::Bool)),
        ]);
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        // the first branch's symbol x@6 is shared; the others equate with it
        assert_eq!(func(&res.e, "x").name(), "x@6");
        insta::assert_display_snapshot!(res.constraint, @"(or (= x@6 a@2) (and (= x@7 x@6) (= x@7 b@3)) (and (= x@1 x@6) p@4))");
        assert_eq!(func(&res.e, "r"), func(&e, "r"));

        let none = apply_action(&e, &Action::Choice(vec![]), &Env::new()).unwrap();
        assert_eq!(none.constraint, expr::false_());
    }

    #[test]
    fn test_assign_frame() {
        let Some(session) = z3_session() else { return };
        let e = setup(session);
        // local c. assume c != a; r(c) := true
        let c = Value::constant("c", node());
        let a = Action::Local {
            args: vec![VarDecl::new("c", node())],
            body: Box::new(Action::Sequence(vec![
                Action::Assume(Value::not(Value::eq(c.clone(), nullary("a", node())))),
                assign(Value::apply(Value::constant("r", rel_sort()), [c]), Value::true_()),
            ])),
        };
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        let r_at_a = |e: &ModelEmbedding| {
            let a = func(e, "a").apply(vec![]);
            func(e, "r").apply(vec![a])
        };
        let mut session = e.ctx.session();
        session.assert(res.constraint);
        // the update leaves r(a) alone
        session.assert(expr::not(expr::eq(r_at_a(res.e.as_ref()), r_at_a(e.as_ref()))));
        assert_eq!(session.check_sat().unwrap(), SatResp::Unsat);
    }

    #[test]
    fn test_choice_semantics() {
        let Some(session) = z3_session() else { return };
        let e = setup(session);
        // x := a, or leave x alone
        let a = Action::Choice(vec![
            assign(nullary("x", node()), nullary("a", node())),
            Action::Sequence(vec![]),
        ]);
        let res = apply_action(&e, &a, &Env::new()).unwrap();
        let x_post = func(&res.e, "x").apply(vec![]);
        let x_pre = func(&e, "x").apply(vec![]);
        let a_sym = func(&e, "a").apply(vec![]);

        let mut session = e.ctx.session();
        session.assert(res.constraint);
        session.push();
        session.assert(expr::not(expr::or([
            expr::eq(x_post.clone(), a_sym.clone()),
            expr::eq(x_post.clone(), x_pre.clone()),
        ])));
        assert_eq!(session.check_sat().unwrap(), SatResp::Unsat);
        session.pop();
        // the branch that does nothing is still possible
        session.assert(expr::not(expr::eq(x_pre.clone(), a_sym)));
        session.assert(expr::eq(x_post, x_pre));
        assert_eq!(session.check_sat().unwrap(), SatResp::Sat);
    }
}
