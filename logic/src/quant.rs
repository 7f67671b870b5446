// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Analysis of the quantifier prefix of a formula.
//!
//! A [`TopQuantifierDesc`] describes the top-level `forall`/`nearlyforall`
//! prefix of a formula and can group it into ranges, rebuild the prefix around
//! a new body, and weigh it per sort. A [`TopAlternatingQuantifierDesc`] does
//! the same for an alternating `forall`/`exists` prefix.

use std::sync::Arc;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::syntax::{Sort, Value, ValueRef, VarDecl};

/// An error encountered while analyzing a quantifier prefix
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantError {
    /// Prefix ranges are only formed over uninterpreted sorts.
    #[error("quantified variable {0} does not have an uninterpreted sort")]
    NotUninterpreted(VarDecl),
    /// Two universal ranges of the same sort are separated by another range
    /// within one block.
    #[error("sort {0} is universally quantified in two separate ranges of one block")]
    SplitSort(Sort),
    /// An alternating prefix cannot contain `nearlyforall`.
    #[error("nearlyforall cannot appear in an alternating quantifier prefix")]
    NearlyForallInAlternation,
}

/// The kind of a quantifier in a prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[allow(missing_docs)]
pub enum QType {
    Forall,
    Exists,
    NearlyForall,
}

impl QType {
    fn of(v: &Value) -> Option<(QType, &[VarDecl], &ValueRef)> {
        match v {
            Value::Forall(decls, body) => Some((QType::Forall, decls.as_slice(), body)),
            Value::Exists(decls, body) => Some((QType::Exists, decls.as_slice(), body)),
            Value::NearlyForall(decls, body) => Some((QType::NearlyForall, decls.as_slice(), body)),
            _ => None,
        }
    }

    fn wrap(self, decls: Vec<VarDecl>, body: ValueRef) -> ValueRef {
        Arc::new(match self {
            QType::Forall => Value::Forall(decls, body),
            QType::Exists => Value::Exists(decls, body),
            QType::NearlyForall => Value::NearlyForall(decls, body),
        })
    }
}

/// A run of consecutive prefix variables sharing a quantifier kind.
///
/// `start..end` are positions in the flattened declaration list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct QRange {
    pub start: usize,
    pub end: usize,
    pub qtype: QType,
    pub decls: Vec<VarDecl>,
}

/// A [`QRange`] whose variables also share an uninterpreted sort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct QSRange {
    pub start: usize,
    pub end: usize,
    pub qtype: QType,
    pub decls: Vec<VarDecl>,
    pub sort: Sort,
}

/// Split `segments` into ranges whose variables share a kind and a sort.
/// Each `NearlyForall` segment ends its range.
fn group_by_sort(segments: &[(QType, Vec<VarDecl>)]) -> Result<Vec<QSRange>, QuantError> {
    let mut ranges: Vec<QSRange> = vec![];
    let mut current: Option<QSRange> = None;
    let mut idx = 0;
    for (qtype, decls) in segments {
        for decl in decls {
            if let Some(cur) = current.take() {
                if cur.qtype == *qtype && cur.sort == decl.sort {
                    current = Some(cur);
                } else {
                    ranges.push(cur);
                }
            }
            let cur = current.get_or_insert_with(|| QSRange {
                start: idx,
                end: idx,
                qtype: *qtype,
                decls: vec![],
                sort: decl.sort.clone(),
            });
            cur.decls.push(decl.clone());
            cur.end = idx + 1;
            idx += 1;
        }
        if *qtype == QType::NearlyForall {
            ranges.extend(current.take());
        }
    }
    ranges.extend(current);

    // within a block of one kind, a sort may only be universally quantified
    // in a single range
    let mut seen: Vec<&Sort> = vec![];
    for (i, range) in ranges.iter().enumerate() {
        if i > 0 && range.qtype != ranges[i - 1].qtype {
            seen.clear();
        }
        if !matches!(range.sort, Sort::Uninterpreted(_)) {
            return Err(QuantError::NotUninterpreted(range.decls[0].clone()));
        }
        if range.qtype == QType::Forall && seen.contains(&&range.sort) {
            return Err(QuantError::SplitSort(range.sort.clone()));
        }
        seen.push(&range.sort);
    }
    Ok(ranges)
}

/// The top-level `forall`/`nearlyforall` prefix of a formula.
///
/// Each `forall` variable is its own segment; a `nearlyforall` block is a
/// single segment that is never split up or merged with its neighbors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopQuantifierDesc {
    segments: Vec<(QType, Vec<VarDecl>)>,
}

impl TopQuantifierDesc {
    /// Describe the prefix of `v`. A value without a prefix has an empty
    /// description.
    pub fn new(v: &Value) -> Self {
        Self::split(v).0
    }

    /// Describe the prefix of `v` and return the body under it.
    pub fn split(v: &Value) -> (Self, ValueRef) {
        let mut segments = vec![];
        let mut body = None;
        let mut cur = v;
        loop {
            match QType::of(cur) {
                Some((QType::Forall, decls, inner)) => {
                    segments.extend(decls.iter().map(|d| (QType::Forall, vec![d.clone()])));
                    body = Some(inner);
                    cur = inner.as_ref();
                }
                Some((QType::NearlyForall, decls, inner)) => {
                    segments.push((QType::NearlyForall, decls.to_vec()));
                    body = Some(inner);
                    cur = inner.as_ref();
                }
                _ => break,
            }
        }
        let body = match body {
            Some(body) => body.clone(),
            None => Arc::new(v.clone()),
        };
        (TopQuantifierDesc { segments }, body)
    }

    /// All declarations of the prefix, outermost first.
    pub fn decls(&self) -> Vec<VarDecl> {
        self.segments
            .iter()
            .flat_map(|(_, decls)| decls.iter().cloned())
            .collect()
    }

    /// The prefix as ranges: maximal runs of `forall` variables, and each
    /// `nearlyforall` block on its own.
    pub fn with_foralls_grouped(&self) -> Vec<QRange> {
        let mut ranges: Vec<QRange> = vec![];
        let mut idx = 0;
        for (qtype, decls) in &self.segments {
            let start = idx;
            idx += decls.len();
            match ranges.last_mut() {
                Some(last) if *qtype == QType::Forall && last.qtype == QType::Forall => {
                    last.decls.extend(decls.iter().cloned());
                    last.end = idx;
                }
                _ => ranges.push(QRange {
                    start,
                    end: idx,
                    qtype: *qtype,
                    decls: decls.clone(),
                }),
            }
        }
        ranges
    }

    /// The prefix as ranges of one kind and one uninterpreted sort.
    ///
    /// Fails if a variable has a non-uninterpreted sort, or if one sort is
    /// universally quantified in two ranges separated by another range of the
    /// same kind.
    pub fn grouped_by_sort(&self) -> Result<Vec<QSRange>, QuantError> {
        group_by_sort(&self.segments)
    }

    /// Rebuild the prefix around `body`. The ranges of
    /// [`TopQuantifierDesc::with_foralls_grouped`] become the quantifiers,
    /// outermost first.
    pub fn with_body(&self, body: ValueRef) -> ValueRef {
        self.with_foralls_grouped()
            .into_iter()
            .rev()
            .fold(body, |body, range| range.qtype.wrap(range.decls, body))
    }

    /// The number of prefix variables of sort `sort`, where a `nearlyforall`
    /// variable counts twice.
    pub fn weighted_sort_count(&self, sort: &str) -> usize {
        self.segments
            .iter()
            .map(|(qtype, decls)| {
                let weight = if *qtype == QType::NearlyForall { 2 } else { 1 };
                weight
                    * decls
                        .iter()
                        .filter(|d| matches!(&d.sort, Sort::Uninterpreted(s) if s == sort))
                        .count()
            })
            .sum()
    }
}

/// One block of an alternating prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alternation {
    /// Either [`QType::Forall`] or [`QType::Exists`]
    pub qtype: QType,
    /// The variables bound by this block, outermost first
    pub decls: Vec<VarDecl>,
}

/// The top-level alternating `forall`/`exists` prefix of a formula, as blocks
/// of consecutive quantifiers of one kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopAlternatingQuantifierDesc {
    alternations: Vec<Alternation>,
}

impl TopAlternatingQuantifierDesc {
    /// Describe the prefix of `v`. Fails if the prefix contains a
    /// `nearlyforall`.
    pub fn new(v: &Value) -> Result<Self, QuantError> {
        let mut alternations: Vec<Alternation> = vec![];
        let mut cur = v;
        while let Some((qtype, decls, body)) = QType::of(cur) {
            if qtype == QType::NearlyForall {
                return Err(QuantError::NearlyForallInAlternation);
            }
            match alternations.last_mut() {
                Some(last) if last.qtype == qtype => last.decls.extend(decls.iter().cloned()),
                _ => alternations.push(Alternation {
                    qtype,
                    decls: decls.to_vec(),
                }),
            }
            cur = body.as_ref();
        }
        Ok(TopAlternatingQuantifierDesc { alternations })
    }

    /// The blocks of the prefix, outermost first.
    pub fn alternations(&self) -> &[Alternation] {
        &self.alternations
    }

    /// Strip the top-level `forall`/`exists` quantifiers from `v`.
    pub fn get_body(v: &ValueRef) -> ValueRef {
        match &**v {
            Value::Forall(_, body) | Value::Exists(_, body) => Self::get_body(body),
            _ => v.clone(),
        }
    }

    /// Rebuild the prefix around `body`, one quantifier per block.
    pub fn with_body(&self, body: ValueRef) -> ValueRef {
        self.alternations
            .iter()
            .rev()
            .fold(body, |body, alt| alt.qtype.wrap(alt.decls.clone(), body))
    }

    /// The prefix as ranges of one kind and one uninterpreted sort, with the
    /// same restrictions as [`TopQuantifierDesc::grouped_by_sort`].
    pub fn grouped_by_sort(&self) -> Result<Vec<QSRange>, QuantError> {
        let segments = self
            .alternations
            .iter()
            .map(|alt| (alt.qtype, alt.decls.clone()))
            .collect_vec();
        group_by_sort(&segments)
    }
}
