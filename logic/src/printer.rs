// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Human-readable rendering of sorts, values, actions, and modules.

use std::fmt;

use crate::syntax::*;

fn precedence(v: &Value) -> usize {
    match v {
        Value::Forall(..) | Value::Exists(..) | Value::NearlyForall(..) => 0,
        Value::Implies(..) => 10,
        Value::Or(vs) if !vs.is_empty() => 40,
        Value::And(vs) if !vs.is_empty() => 50,
        Value::Eq(..) => 60,
        Value::Not(..) => 70,
        Value::Or(_)
        | Value::And(_)
        | Value::Const(..)
        | Value::Var(..)
        | Value::Apply(..)
        | Value::TemplateHole => 1000,
    }
}

fn parens(add_parens: bool, s: String) -> String {
    if add_parens {
        format!("({s})")
    } else {
        s
    }
}

fn decl(d: &VarDecl) -> String {
    format!("{}:{}", d.name, sort(&d.sort))
}

/// Render a sort.
pub fn sort(s: &Sort) -> String {
    match s {
        Sort::Bool => "bool".to_string(),
        Sort::Uninterpreted(name) => name.clone(),
        Sort::Function(domain, range) => {
            let domain = domain.iter().map(sort).collect::<Vec<_>>().join(", ");
            format!("({domain}) -> {}", sort(range))
        }
    }
}

/// Render a value with as few parentheses as possible.
pub fn value(v: &Value) -> String {
    // handling of precedence is based on
    // https://stackoverflow.com/questions/6277747/pretty-print-expression-with-as-few-parentheses-as-possible
    match v {
        Value::And(vs) if vs.is_empty() => "true".to_string(),
        Value::Or(vs) if vs.is_empty() => "false".to_string(),
        Value::Const(name, _) | Value::Var(name, _) => name.to_string(),
        Value::TemplateHole => "_".to_string(),
        Value::Apply(func, args) => format!(
            "{}({})",
            value(func),
            args.iter().map(|a| value(a)).collect::<Vec<_>>().join(", ")
        ),
        Value::Not(arg) => {
            let arg = parens(precedence(v) > precedence(arg), value(arg));
            format!("!{arg}")
        }
        Value::Implies(lhs, rhs) | Value::Eq(lhs, rhs) => {
            // implication is right associative; equality is not associative
            let use_left_paren = precedence(v) >= precedence(lhs);
            let use_right_paren = precedence(v) > precedence(rhs)
                || (precedence(v) == precedence(rhs) && matches!(v, Value::Eq(..)));
            let left = parens(use_left_paren, value(lhs));
            let right = parens(use_right_paren, value(rhs));
            let op = if matches!(v, Value::Eq(..)) { "=" } else { "->" };
            format!("{left} {op} {right}")
        }
        Value::And(vs) | Value::Or(vs) => {
            let args = vs
                .iter()
                .map(|arg| parens(precedence(v) > precedence(arg), value(arg)))
                .collect::<Vec<_>>();
            let op = if matches!(v, Value::And(_)) { "&" } else { "|" };
            args.join(&format!(" {op} "))
        }
        Value::Forall(decls, body) | Value::Exists(decls, body) | Value::NearlyForall(decls, body) => {
            let quantifier = match v {
                Value::Forall(..) => "forall",
                Value::Exists(..) => "exists",
                _ => "nearlyforall",
            };
            let decls = decls.iter().map(decl).collect::<Vec<_>>().join(", ");
            format!("{quantifier} {decls}. {}", value(body))
        }
    }
}

fn indented(indent: usize, s: &str) -> String {
    format!("{}{s}", "  ".repeat(indent))
}

fn block(indent: usize, a: &Action) -> String {
    format!("{{\n{}\n{}}}", action(indent + 1, a), "  ".repeat(indent))
}

fn action(indent: usize, a: &Action) -> String {
    match a {
        Action::Local { args, body } => {
            let args = args.iter().map(decl).collect::<Vec<_>>().join(", ");
            indented(indent, &format!("local {args} {}", block(indent, body)))
        }
        Action::Sequence(actions) if actions.is_empty() => indented(indent, "skip"),
        Action::Sequence(actions) => actions
            .iter()
            .map(|a| action(indent, a))
            .collect::<Vec<_>>()
            .join(";\n"),
        Action::Choice(actions) if actions.is_empty() => indented(indent, "choice {}"),
        Action::Choice(actions) => {
            let branches = actions
                .iter()
                .map(|a| block(indent, a))
                .collect::<Vec<_>>()
                .join(" or ");
            indented(indent, &format!("choice {branches}"))
        }
        Action::Assume(v) => indented(indent, &format!("assume {}", value(v))),
        Action::Assign { left, right } => {
            indented(indent, &format!("{} := {}", value(left), value(right)))
        }
        Action::If {
            condition,
            then_body,
        } => indented(
            indent,
            &format!("if {} {}", value(condition), block(indent, then_body)),
        ),
        Action::IfElse {
            condition,
            then_body,
            else_body,
        } => indented(
            indent,
            &format!(
                "if {} {} else {}",
                value(condition),
                block(indent, then_body),
                block(indent, else_body)
            ),
        ),
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", sort(self))
    }
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", decl(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", value(self))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", action(0, self))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.sorts {
            writeln!(f, "sort {s}")?;
        }
        for func in &self.functions {
            writeln!(f, "function {}: {}", func.name, sort(&func.sort))?;
        }
        for (kind, vs) in [
            ("axiom", &self.axioms),
            ("init", &self.inits),
            ("conjecture", &self.conjectures),
            ("template", &self.templates),
        ] {
            for v in vs {
                writeln!(f, "{kind} {}", value(v))?;
            }
        }
        for (i, a) in self.actions.iter().enumerate() {
            let name = match self.action_names.get(i) {
                Some(name) => name.clone(),
                None => format!("action{i}"),
            };
            writeln!(f, "action {name} {}", block(0, a))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Sort {
        Sort::uninterpreted("node")
    }

    fn leader() -> ValueRef {
        Value::constant("leader", Sort::function([node()], Sort::Bool))
    }

    #[test]
    fn test_printer_basic() {
        let a = Value::constant("a", Sort::Bool);
        let b = Value::constant("b", Sort::Bool);
        let c = Value::constant("c", Sort::Bool);
        let e = Value::or([Value::and([a.clone(), b.clone()]), c.clone()]);
        insta::assert_display_snapshot!(e, @"a & b | c");
        let e = Value::and([Value::or([a.clone(), b.clone()]), c.clone()]);
        insta::assert_display_snapshot!(e, @"(a | b) & c");
        let e = Value::implies(Value::implies(a.clone(), b.clone()), c.clone());
        insta::assert_display_snapshot!(e, @"(a -> b) -> c");
        let e = Value::implies(a.clone(), Value::implies(b, c));
        insta::assert_display_snapshot!(e, @"a -> b -> c");
        insta::assert_display_snapshot!(Value::not(Value::and([a.clone(), a])), @"!(a & a)");
        insta::assert_display_snapshot!(Value::true_(), @"true");
        insta::assert_display_snapshot!(Value::false_(), @"false");
    }

    #[test]
    fn test_printer_quantifiers() {
        let n = Value::var("n", node());
        let m = Value::var("m", node());
        let e = Value::forall(
            [VarDecl::new("n", node()), VarDecl::new("m", node())],
            Value::implies(
                Value::and([
                    Value::apply(leader(), [n.clone()]),
                    Value::apply(leader(), [m.clone()]),
                ]),
                Value::eq(n, m),
            ),
        );
        insta::assert_display_snapshot!(e, @"forall n:node, m:node. leader(n) & leader(m) -> n = m");
    }

    #[test]
    fn test_printer_actions() {
        let n = Value::constant("n", node());
        let a = Action::Local {
            args: vec![VarDecl::new("n", node())],
            body: Box::new(Action::Sequence(vec![
                Action::Assume(Value::not(Value::apply(leader(), [n.clone()]))),
                Action::Assign {
                    left: Value::apply(leader(), [n]),
                    right: Value::true_(),
                },
            ])),
        };
        insta::assert_display_snapshot!(a, @r###"
        local n:node {
          assume !leader(n);
          leader(n) := true
        }
        "###);
    }

    #[test]
    fn test_printer_sorts() {
        insta::assert_display_snapshot!(Sort::function([node(), node()], Sort::Bool), @"(node, node) -> bool");
    }
}
