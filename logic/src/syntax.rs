// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The AST for values (formulas and terms), actions, and modules.

use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::iden::Iden;

/// A Sort represents a collection of values: the built-in boolean sort, a
/// named uninterpreted sort, or the sort of a function symbol.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Uninterpreted sort identified by its name
    Uninterpreted(String),
    /// Sort of a function symbol, from its domain to its range
    Function(Vec<Sort>, Box<Sort>),
}

impl Sort {
    /// Smart constructor for uninterpreted sort that takes &str
    pub fn uninterpreted(name: &str) -> Self {
        Self::Uninterpreted(name.to_string())
    }

    /// Smart constructor for function sorts
    pub fn function<I>(domain: I, range: Sort) -> Self
    where
        I: IntoIterator<Item = Sort>,
    {
        Self::Function(domain.into_iter().collect(), Box::new(range))
    }

    /// The domain of this sort viewed as a function sort. Non-function sorts
    /// are nullary, so their domain is empty.
    pub fn domain_as_function(&self) -> &[Sort] {
        match self {
            Sort::Function(domain, _) => domain,
            _ => &[],
        }
    }

    /// The range of this sort viewed as a function sort. Non-function sorts
    /// are their own range.
    pub fn range_as_function(&self) -> &Sort {
        match self {
            Sort::Function(_, range) => range,
            _ => self,
        }
    }
}

impl From<&str> for Sort {
    fn from(value: &str) -> Self {
        Self::uninterpreted(value)
    }
}

impl From<&Sort> for Sort {
    fn from(value: &Self) -> Self {
        value.clone()
    }
}

/// A variable declaration: a name and a sort (used for quantifiers, local
/// actions, and function declarations).
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarDecl {
    /// Declared name
    pub name: Iden,
    /// Sort of the declared name
    pub sort: Sort,
}

impl VarDecl {
    /// Smart constructor for a VarDecl that takes arguments by reference.
    pub fn new<T>(name: &str, sort: T) -> Self
    where
        T: Into<Sort>,
    {
        VarDecl {
            name: Iden::new(name),
            sort: sort.into(),
        }
    }
}

/// Values are shared immutably; rewriting builds new trees that share
/// unchanged subtrees with the old ones.
pub type ValueRef = Arc<Value>;

/// A first-order formula or term.
///
/// The variants are declared in ascending [`Value::kind_id`] order, so the
/// derived ordering compares kinds first and then structure.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    /// Universal quantification over the declared variables.
    Forall(Vec<VarDecl>, ValueRef),
    /// Existential quantification over the declared variables.
    Exists(Vec<VarDecl>, ValueRef),
    /// A universal-like block whose variables are analyzed as one group.
    NearlyForall(Vec<VarDecl>, ValueRef),
    /// A reference to a constant (typically a function symbol or the
    /// parameter of a local action).
    Const(Iden, Sort),
    /// Boolean negation
    Not(ValueRef),
    /// Implication
    Implies(ValueRef, ValueRef),
    /// Application of a function (always a [`Value::Const`]) to arguments
    Apply(ValueRef, Vec<ValueRef>),
    /// Conjunction (empty is true)
    And(Vec<ValueRef>),
    /// Disjunction (empty is false)
    Or(Vec<ValueRef>),
    /// A placeholder used by template-based search
    TemplateHole,
    /// A reference to a bound variable
    Var(Iden, Sort),
    /// Equality
    Eq(ValueRef, ValueRef),
}

/// Smart constructors for Value. Each returns a shared [`ValueRef`].
impl Value {
    /// Smart constructor for Var
    pub fn var<T: Into<Sort>>(name: &str, sort: T) -> ValueRef {
        Arc::new(Value::Var(Iden::new(name), sort.into()))
    }

    /// Smart constructor for Const
    pub fn constant<T: Into<Sort>>(name: &str, sort: T) -> ValueRef {
        Arc::new(Value::Const(Iden::new(name), sort.into()))
    }

    /// Smart constructor for Apply
    pub fn apply<I>(func: ValueRef, args: I) -> ValueRef
    where
        I: IntoIterator<Item = ValueRef>,
    {
        Arc::new(Value::Apply(func, args.into_iter().collect()))
    }

    /// Smart constructor for Eq
    pub fn eq(lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        Arc::new(Value::Eq(lhs, rhs))
    }

    /// Smart constructor for Implies
    pub fn implies(lhs: ValueRef, rhs: ValueRef) -> ValueRef {
        Arc::new(Value::Implies(lhs, rhs))
    }

    /// Smart constructor for Not. Double negation is collapsed.
    pub fn not(v: ValueRef) -> ValueRef {
        match &*v {
            Value::Not(inner) => inner.clone(),
            _ => Arc::new(Value::Not(v)),
        }
    }

    /// Smart constructor for And. A single conjunct is returned as-is.
    pub fn and<I>(vs: I) -> ValueRef
    where
        I: IntoIterator<Item = ValueRef>,
    {
        let mut vs = vs.into_iter().collect_vec();
        if vs.len() == 1 {
            return vs.swap_remove(0);
        }
        Arc::new(Value::And(vs))
    }

    /// Smart constructor for Or. A single disjunct is returned as-is.
    pub fn or<I>(vs: I) -> ValueRef
    where
        I: IntoIterator<Item = ValueRef>,
    {
        let mut vs = vs.into_iter().collect_vec();
        if vs.len() == 1 {
            return vs.swap_remove(0);
        }
        Arc::new(Value::Or(vs))
    }

    /// The empty conjunction.
    pub fn true_() -> ValueRef {
        Arc::new(Value::And(vec![]))
    }

    /// The empty disjunction.
    pub fn false_() -> ValueRef {
        Arc::new(Value::Or(vec![]))
    }

    /// Smart constructor for Forall
    pub fn forall<I>(decls: I, body: ValueRef) -> ValueRef
    where
        I: IntoIterator<Item = VarDecl>,
    {
        Arc::new(Value::Forall(decls.into_iter().collect(), body))
    }

    /// Smart constructor for Exists
    pub fn exists<I>(decls: I, body: ValueRef) -> ValueRef
    where
        I: IntoIterator<Item = VarDecl>,
    {
        Arc::new(Value::Exists(decls.into_iter().collect(), body))
    }

    /// Smart constructor for NearlyForall
    pub fn nearly_forall<I>(decls: I, body: ValueRef) -> ValueRef
    where
        I: IntoIterator<Item = VarDecl>,
    {
        Arc::new(Value::NearlyForall(decls.into_iter().collect(), body))
    }
}

impl Value {
    /// A stable numeric tag for each kind of value.
    pub fn kind_id(&self) -> u32 {
        match self {
            Value::Forall(..) => 1,
            Value::Exists(..) => 2,
            Value::NearlyForall(..) => 3,
            Value::Const(..) => 4,
            Value::Not(..) => 6,
            Value::Implies(..) => 7,
            Value::Apply(..) => 8,
            Value::And(..) => 9,
            Value::Or(..) => 10,
            Value::TemplateHole => 11,
            Value::Var(..) => 50,
            Value::Eq(..) => 100,
        }
    }

    /// The immediate children of this value, in order.
    pub fn children(&self) -> Vec<&ValueRef> {
        match self {
            Value::Forall(_, body) | Value::Exists(_, body) | Value::NearlyForall(_, body) => {
                vec![body]
            }
            Value::Not(v) => vec![v],
            Value::Implies(l, r) | Value::Eq(l, r) => vec![l, r],
            Value::Apply(func, args) => std::iter::once(func).chain(args).collect(),
            Value::And(vs) | Value::Or(vs) => vs.iter().collect(),
            Value::Const(..) | Value::Var(..) | Value::TemplateHole => vec![],
        }
    }

    /// The number of nodes in this value.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }
}

/// A state-changing action.
#[derive(PartialEq, Eq, Clone, Debug, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Run the body with fresh, unconstrained local constants in scope.
    #[allow(missing_docs)]
    Local { args: Vec<VarDecl>, body: Box<Action> },
    /// Run the actions one after another.
    Sequence(Vec<Action>),
    /// Nondeterministically run one of the actions.
    Choice(Vec<Action>),
    /// Block unless the formula holds.
    Assume(ValueRef),
    /// Pointwise update of a function. The left side is an application of a
    /// function symbol to argument patterns.
    #[allow(missing_docs)]
    Assign { left: ValueRef, right: ValueRef },
    /// Run the body if the condition holds; otherwise do nothing.
    #[allow(missing_docs)]
    If { condition: ValueRef, then_body: Box<Action> },
    /// Run one of two bodies depending on the condition.
    #[allow(missing_docs)]
    IfElse {
        condition: ValueRef,
        then_body: Box<Action>,
        else_body: Box<Action>,
    },
}

/// A transition system: sorts, function symbols, and the formulas and
/// actions over them.
#[derive(PartialEq, Eq, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Module {
    /// Names of uninterpreted sorts
    pub sorts: Vec<String>,
    /// Function symbols. A declaration with a non-function sort is a nullary
    /// function.
    pub functions: Vec<VarDecl>,
    /// Formulas that hold in every state
    pub axioms: Vec<ValueRef>,
    /// Formulas describing the initial states
    pub inits: Vec<ValueRef>,
    /// Candidate invariants
    pub conjectures: Vec<ValueRef>,
    /// Templates for invariant search
    #[serde(default)]
    pub templates: Vec<ValueRef>,
    /// The named actions; a step runs exactly one of them
    pub actions: Vec<Action>,
    /// Names of the actions, parallel to `actions` (may be empty)
    #[serde(default)]
    pub action_names: Vec<String>,
}

impl Module {
    /// Load a module from its JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize this module as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Look up a function declaration by name.
    pub fn function(&self, name: Iden) -> Option<&VarDecl> {
        self.functions.iter().find(|decl| decl.name == name)
    }

    /// The step relation: nondeterministic choice among all actions.
    pub fn step(&self) -> Action {
        Action::Choice(self.actions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order() {
        let none: Vec<VarDecl> = vec![];
        let vs = [
            Value::forall(none.clone(), Value::true_()),
            Value::exists(none.clone(), Value::true_()),
            Value::nearly_forall(none, Value::true_()),
            Value::constant("c", "node"),
            Value::not(Value::constant("p", Sort::Bool)),
            Value::implies(Value::true_(), Value::true_()),
            Value::apply(Value::constant("f", Sort::Bool), Vec::<ValueRef>::new()),
            Value::true_(),
            Value::false_(),
            Arc::new(Value::TemplateHole),
            Value::var("x", "node"),
            Value::eq(Value::var("x", "node"), Value::var("y", "node")),
        ];
        for (a, b) in vs.iter().tuple_windows() {
            assert!(a.kind_id() < b.kind_id());
            assert!(a < b, "{a:?} should be ordered before {b:?}");
        }
    }

    #[test]
    fn test_smart_constructors() {
        let p = Value::constant("p", Sort::Bool);
        assert_eq!(Value::not(Value::not(p.clone())), p);
        assert_eq!(Value::and([p.clone()]), p);
        assert_eq!(Value::or([p.clone()]), p);
        assert_eq!(*Value::true_(), Value::And(vec![]));
        assert_eq!(*Value::false_(), Value::Or(vec![]));
    }

    #[test]
    fn test_function_sort_views() {
        let s = Sort::function([Sort::uninterpreted("node")], Sort::Bool);
        assert_eq!(s.domain_as_function(), &[Sort::uninterpreted("node")]);
        assert_eq!(s.range_as_function(), &Sort::Bool);
        let node = Sort::uninterpreted("node");
        assert!(node.domain_as_function().is_empty());
        assert_eq!(node.range_as_function(), &node);
    }

    #[test]
    fn test_module_json() {
        let json = r#"{
            "sorts": ["node"],
            "functions": [
                {"name": "leader", "sort": {"Function": [[{"Uninterpreted": "node"}], "Bool"]}}
            ],
            "axioms": [],
            "inits": [
                {"Forall": [
                    [{"name": "n", "sort": {"Uninterpreted": "node"}}],
                    {"Not": {"Apply": [
                        {"Const": ["leader", {"Function": [[{"Uninterpreted": "node"}], "Bool"]}]},
                        [{"Var": ["n", {"Uninterpreted": "node"}]}]
                    ]}}
                ]}
            ],
            "conjectures": [],
            "actions": []
        }"#;
        let m = Module::from_json(json).unwrap();
        assert_eq!(m.sorts, vec!["node".to_string()]);
        assert_eq!(m.functions[0].name.as_str(), "leader");
        assert!(m.templates.is_empty());
        assert_eq!(Module::from_json(&m.to_json().unwrap()).unwrap(), m);
    }
}
