// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Embeddings of a module's function symbols into SMT, and compilation of
//! values under an embedding.

use std::sync::Arc;

use itertools::Itertools;
use logic::iden::Iden;
use logic::syntax::{Module, Value, ValueRef, VarDecl};
use smtlib::expr;
use smtlib::sexp::{atom_s, Sexp};

use crate::context::BackgroundContext;
use crate::error::EmbedError;
use crate::session::FuncDecl;

/// An environment mapping names to SMT expressions, used both for the local
/// constants of actions and for bound variables.
pub type Env = im::HashMap<Iden, Sexp>;

/// A mapping from each function symbol of a module to the SMT symbol that
/// currently represents it. Symbolic execution produces a new embedding per
/// state; embeddings share structure and are never mutated.
#[derive(Debug, Clone)]
pub struct ModelEmbedding {
    /// The context the symbols were declared in
    pub ctx: Arc<BackgroundContext>,
    mapping: im::OrdMap<Iden, Arc<FuncDecl>>,
}

impl ModelEmbedding {
    /// An embedding with the given mapping.
    pub fn new(ctx: Arc<BackgroundContext>, mapping: im::OrdMap<Iden, Arc<FuncDecl>>) -> Self {
        ModelEmbedding { ctx, mapping }
    }

    /// Declare a fresh SMT symbol for every function of `module`.
    pub fn make_embedding(
        ctx: &Arc<BackgroundContext>,
        module: &Module,
    ) -> Result<Arc<Self>, EmbedError> {
        let mut mapping = im::OrdMap::new();
        for func in &module.functions {
            let domain = func
                .sort
                .domain_as_function()
                .iter()
                .map(|s| ctx.get_sort(s))
                .collect::<Result<Vec<_>, _>>()?;
            let range = ctx.get_sort(func.sort.range_as_function())?;
            let decl = ctx
                .session()
                .declare_fun(func.name.as_str(), domain, range);
            mapping.insert(func.name, decl);
        }
        log::debug!("embedded {} functions", mapping.len());
        Ok(Arc::new(ModelEmbedding::new(ctx.clone(), mapping)))
    }

    /// The SMT symbol for the function `name`.
    pub fn get_func(&self, name: Iden) -> Result<&Arc<FuncDecl>, EmbedError> {
        self.mapping
            .get(&name)
            .ok_or(EmbedError::UnknownFunction(name))
    }

    /// The mapping, ordered by function name.
    pub fn mapping(&self) -> &im::OrdMap<Iden, Arc<FuncDecl>> {
        &self.mapping
    }

    /// This embedding with `name` mapped to `decl`.
    pub fn with_func(&self, name: Iden, decl: Arc<FuncDecl>) -> Self {
        ModelEmbedding {
            ctx: self.ctx.clone(),
            mapping: self.mapping.update(name, decl),
        }
    }

    /// Compile a closed formula.
    pub fn value_to_expr(&self, v: &Value) -> Result<Sexp, EmbedError> {
        self.value_to_expr_env(v, &Env::new(), &Env::new())
    }

    /// Compile a formula that may refer to the local constants `consts`.
    pub fn value_to_expr_consts(&self, v: &Value, consts: &Env) -> Result<Sexp, EmbedError> {
        self.value_to_expr_env(v, consts, &Env::new())
    }

    /// Compile a value that may refer to the local constants `consts` and the
    /// free variables `vars`.
    pub fn value_to_expr_env(
        &self,
        v: &Value,
        consts: &Env,
        vars: &Env,
    ) -> Result<Sexp, EmbedError> {
        let rec = |v: &ValueRef| self.value_to_expr_env(v, consts, vars);
        match v {
            Value::Forall(decls, body) => {
                let (binders, vars) = self.bind(decls, vars)?;
                Ok(expr::forall(
                    binders,
                    self.value_to_expr_env(body, consts, &vars)?,
                ))
            }
            Value::Exists(decls, body) => {
                let (binders, vars) = self.bind(decls, vars)?;
                Ok(expr::exists(
                    binders,
                    self.value_to_expr_env(body, consts, &vars)?,
                ))
            }
            Value::Var(name, _) => vars
                .get(name)
                .cloned()
                .ok_or(EmbedError::UnboundVariable(*name)),
            Value::Const(name, _) => consts
                .get(name)
                .cloned()
                .ok_or(EmbedError::UnboundConstant(*name)),
            Value::Eq(lhs, rhs) => Ok(expr::eq(rec(lhs)?, rec(rhs)?)),
            Value::Not(x) => Ok(expr::not(rec(x)?)),
            Value::Implies(lhs, rhs) => Ok(expr::or([expr::not(rec(lhs)?), rec(rhs)?])),
            Value::Apply(func, args) => {
                let Value::Const(name, _) = &**func else {
                    return Err(EmbedError::Uncallable(func.to_string()));
                };
                let decl = self.get_func(*name)?;
                if decl.arity() != args.len() {
                    return Err(EmbedError::ExpectedButFoundArity {
                        function_name: *name,
                        expected: decl.arity(),
                        found: args.len(),
                    });
                }
                let args = args.iter().map(|a| rec(a)).collect::<Result<Vec<_>, _>>()?;
                Ok(decl.apply(args))
            }
            Value::And(vs) => Ok(expr::and(
                vs.iter().map(|v| rec(v)).collect::<Result<Vec<_>, _>>()?,
            )),
            Value::Or(vs) => Ok(expr::or(
                vs.iter().map(|v| rec(v)).collect::<Result<Vec<_>, _>>()?,
            )),
            Value::NearlyForall(..) => Err(EmbedError::Unsupported("nearlyforall".to_string())),
            Value::TemplateHole => Err(EmbedError::Unsupported("a template hole".to_string())),
        }
    }

    /// SMT binders for `decls`, and `vars` extended with them. Every binder
    /// gets a fresh solver name, so it cannot capture a declared symbol.
    fn bind(&self, decls: &[VarDecl], vars: &Env) -> Result<(Vec<(String, Sexp)>, Env), EmbedError> {
        let mut vars = vars.clone();
        let mut binders = vec![];
        for decl in decls {
            let sort = self.ctx.get_sort(&decl.sort)?;
            let name = self.ctx.session().fresh_name(decl.name.as_str());
            vars.insert(decl.name, atom_s(&name));
            binders.push((name, sort));
        }
        Ok((binders, vars))
    }

    /// A human-readable listing of the mapping, one function per line.
    pub fn dump(&self) -> String {
        self.mapping
            .iter()
            .map(|(name, decl)| format!("{name} -> {}", decl.name()))
            .join("\n")
    }
}
