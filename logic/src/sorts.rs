// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Check that a module is well formed and well sorted.
//!
//! The main entry point is [`Module::check`]. Compilation to SMT assumes its
//! input passed this check; anything it still rejects is reported as a
//! malformed module rather than a crash.

use im::HashMap;
use thiserror::Error;

use crate::iden::Iden;
use crate::syntax::*;

/// An error encountered during sort checking
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    /// The module referred to an uninterpreted sort that was not declared.
    #[error("sort {0} was not declared")]
    UnknownSort(String),
    /// An uninterpreted sort was declared multiple times.
    #[error("sort {0} was declared multiple times")]
    RedeclaredSort(String),
    /// A function symbol was declared multiple times.
    #[error("function {0} was declared multiple times")]
    RedeclaredFunction(Iden),
    /// A variable was used outside the scope of any binder for it.
    #[error("unbound variable {0}")]
    UnboundVariable(Iden),
    /// A constant was neither a function symbol nor a local action parameter.
    #[error("unknown constant {0}")]
    UnknownConstant(Iden),
    /// A function symbol was referenced without being applied.
    #[error("function {0} is referenced but not applied")]
    Unapplied(Iden),
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
    /// The sort of a value did not match its context.
    #[error("expected {expected} but found {found} in {context}")]
    #[allow(missing_docs)]
    ExpectedButFoundSorts {
        expected: Sort,
        found: Sort,
        context: String,
    },
    /// A binder or local was declared with a function sort.
    #[error("{0} cannot have a function sort")]
    FunctionSortedVariable(Iden),
    /// The left side of an assignment was not an application of a function
    /// symbol.
    #[error("cannot assign to {0}")]
    BadAssignTarget(String),
}

struct Checker<'a> {
    module: &'a Module,
    functions: HashMap<Iden, Sort>,
}

impl<'a> Checker<'a> {
    fn check_sort(&self, sort: &Sort) -> Result<(), SortError> {
        match sort {
            Sort::Bool => Ok(()),
            Sort::Uninterpreted(name) => {
                if self.module.sorts.contains(name) {
                    Ok(())
                } else {
                    Err(SortError::UnknownSort(name.clone()))
                }
            }
            Sort::Function(domain, range) => {
                for s in domain {
                    self.check_sort(s)?;
                }
                self.check_sort(range)
            }
        }
    }

    fn check_binder(&self, decl: &VarDecl) -> Result<(), SortError> {
        if matches!(decl.sort, Sort::Function(..)) {
            return Err(SortError::FunctionSortedVariable(decl.name));
        }
        self.check_sort(&decl.sort)
    }

    fn expect(&self, expected: &Sort, found: Sort, v: &Value) -> Result<(), SortError> {
        if *expected == found {
            Ok(())
        } else {
            Err(SortError::ExpectedButFoundSorts {
                expected: expected.clone(),
                found,
                context: v.to_string(),
            })
        }
    }

    fn sort_of(
        &self,
        v: &Value,
        consts: &HashMap<Iden, Sort>,
        vars: &HashMap<Iden, Sort>,
    ) -> Result<Sort, SortError> {
        match v {
            Value::Forall(decls, body)
            | Value::Exists(decls, body)
            | Value::NearlyForall(decls, body) => {
                let mut vars = vars.clone();
                for decl in decls {
                    self.check_binder(decl)?;
                    vars.insert(decl.name, decl.sort.clone());
                }
                let sort = self.sort_of(body, consts, &vars)?;
                self.expect(&Sort::Bool, sort, body)?;
                Ok(Sort::Bool)
            }
            Value::Var(name, sort) => match vars.get(name) {
                Some(bound) => {
                    self.expect(bound, sort.clone(), v)?;
                    Ok(sort.clone())
                }
                None => Err(SortError::UnboundVariable(*name)),
            },
            Value::Const(name, sort) => {
                if let Some(local) = consts.get(name) {
                    self.expect(local, sort.clone(), v)?;
                    Ok(sort.clone())
                } else if self.functions.contains_key(name) {
                    Err(SortError::Unapplied(*name))
                } else {
                    Err(SortError::UnknownConstant(*name))
                }
            }
            Value::Apply(func, args) => {
                let Value::Const(name, sort) = &**func else {
                    return Err(SortError::Uncallable(func.to_string()));
                };
                let declared = self
                    .functions
                    .get(name)
                    .ok_or(SortError::UnknownConstant(*name))?;
                self.expect(declared, sort.clone(), func)?;
                let domain = declared.domain_as_function();
                if domain.len() != args.len() {
                    return Err(SortError::ExpectedButFoundArity {
                        function_name: *name,
                        expected: domain.len(),
                        found: args.len(),
                    });
                }
                for (arg, expected) in args.iter().zip(domain) {
                    let found = self.sort_of(arg, consts, vars)?;
                    self.expect(expected, found, arg)?;
                }
                Ok(declared.range_as_function().clone())
            }
            Value::Eq(lhs, rhs) => {
                let l = self.sort_of(lhs, consts, vars)?;
                let r = self.sort_of(rhs, consts, vars)?;
                self.expect(&l, r, v)?;
                Ok(Sort::Bool)
            }
            Value::Not(_) | Value::Implies(..) | Value::And(_) | Value::Or(_) => {
                for child in v.children() {
                    let sort = self.sort_of(child, consts, vars)?;
                    self.expect(&Sort::Bool, sort, child)?;
                }
                Ok(Sort::Bool)
            }
            Value::TemplateHole => Ok(Sort::Bool),
        }
    }

    fn check_formula(&self, v: &Value, consts: &HashMap<Iden, Sort>) -> Result<(), SortError> {
        let sort = self.sort_of(v, consts, &HashMap::new())?;
        self.expect(&Sort::Bool, sort, v)
    }

    fn check_action(&self, a: &Action, consts: &HashMap<Iden, Sort>) -> Result<(), SortError> {
        match a {
            Action::Local { args, body } => {
                let mut consts = consts.clone();
                for arg in args {
                    self.check_binder(arg)?;
                    consts.insert(arg.name, arg.sort.clone());
                }
                self.check_action(body, &consts)
            }
            Action::Sequence(actions) | Action::Choice(actions) => actions
                .iter()
                .try_for_each(|a| self.check_action(a, consts)),
            Action::Assume(v) => self.check_formula(v, consts),
            Action::Assign { left, right } => {
                let Value::Apply(func, args) = &**left else {
                    return Err(SortError::BadAssignTarget(left.to_string()));
                };
                if !matches!(&**func, Value::Const(name, _) if self.functions.contains_key(name)) {
                    return Err(SortError::BadAssignTarget(left.to_string()));
                }
                // variables in argument position bind the pointwise update
                let mut vars = HashMap::new();
                for arg in args {
                    if let Value::Var(name, sort) = &**arg {
                        self.check_binder(&VarDecl {
                            name: *name,
                            sort: sort.clone(),
                        })?;
                        vars.entry(*name).or_insert_with(|| sort.clone());
                    }
                }
                let range = self.sort_of(left, consts, &vars)?;
                let found = self.sort_of(right, consts, &vars)?;
                self.expect(&range, found, right)
            }
            Action::If {
                condition,
                then_body,
            } => {
                self.check_formula(condition, consts)?;
                self.check_action(then_body, consts)
            }
            Action::IfElse {
                condition,
                then_body,
                else_body,
            } => {
                self.check_formula(condition, consts)?;
                self.check_action(then_body, consts)?;
                self.check_action(else_body, consts)
            }
        }
    }
}

impl Module {
    /// Check that every sort is declared once, every function symbol is
    /// declared once over declared sorts, and every formula and action is well
    /// sorted with all variables and constants in scope.
    pub fn check(&self) -> Result<(), SortError> {
        for (i, s) in self.sorts.iter().enumerate() {
            if self.sorts[..i].contains(s) {
                return Err(SortError::RedeclaredSort(s.clone()));
            }
        }
        let mut checker = Checker {
            module: self,
            functions: HashMap::new(),
        };
        for func in &self.functions {
            checker.check_sort(&func.sort)?;
            if checker
                .functions
                .insert(func.name, func.sort.clone())
                .is_some()
            {
                return Err(SortError::RedeclaredFunction(func.name));
            }
        }
        let no_consts = HashMap::new();
        for v in self.axioms.iter().chain(&self.inits).chain(&self.conjectures) {
            checker.check_formula(v, &no_consts)?;
        }
        for a in &self.actions {
            checker.check_action(a, &no_consts)?;
        }
        log::debug!(
            "checked module with {} sorts, {} functions, {} actions",
            self.sorts.len(),
            self.functions.len(),
            self.actions.len()
        );
        Ok(())
    }
}
