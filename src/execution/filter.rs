//! WHERE: one comparison applied to each match.
//!
//! Nothing here is fatal. A predicate that cannot be evaluated drops the
//! match, and the reason is returned so the evaluator can trace it.

use std::cmp::Ordering;

use crate::model::Value;
use crate::query::ast::{CompareOp, ComparisonExpr, Operand};

use super::{Match, Params};

/// Why a match was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("variable `{0}` is not bound")]
    Unbound(String),

    #[error("attribute `{0}` is missing")]
    MissingAttribute(String),

    #[error("parameter `{0}` was not supplied")]
    MissingParameter(String),

    #[error("cannot apply {op} to {left} and {right}")]
    Incomparable {
        op: CompareOp,
        left: &'static str,
        right: &'static str,
    },

    #[error("comparison is false")]
    False,
}

/// Resolve the right-hand side: literal as written, parameter from `params`.
pub fn resolve_operand(operand: &Operand, params: &Params) -> Result<Value, Rejection> {
    match operand {
        Operand::Literal(v) => Ok(v.clone()),
        Operand::Parameter(name) => params
            .get(name)
            .cloned()
            .ok_or_else(|| Rejection::MissingParameter(name.clone())),
    }
}

/// Apply `op` to two already coerced values.
pub fn apply(op: CompareOp, actual: &Value, expected: &Value) -> Result<bool, Rejection> {
    let incomparable = || Rejection::Incomparable {
        op,
        left: actual.type_name(),
        right: expected.type_name(),
    };
    let ordering = || actual.compare(expected).ok_or_else(incomparable);

    Ok(match op {
        CompareOp::Eq | CompareOp::Near => actual.loose_eq(expected),
        CompareOp::Neq => !actual.loose_eq(expected),
        CompareOp::Lt => ordering()? == Ordering::Less,
        CompareOp::Gt => ordering()? == Ordering::Greater,
        CompareOp::Lte => ordering()? != Ordering::Greater,
        CompareOp::Gte => ordering()? != Ordering::Less,
        CompareOp::In => expected.contains(actual).ok_or_else(incomparable)?,
        CompareOp::NotIn => !expected.contains(actual).ok_or_else(incomparable)?,
    })
}

/// `Ok(())` if the match satisfies the comparison.
pub fn evaluate_where(cmp: &ComparisonExpr, m: &Match<'_>, params: &Params) -> Result<(), Rejection> {
    let element = m
        .get(&cmp.variable)
        .ok_or_else(|| Rejection::Unbound(cmp.variable.clone()))?;
    let actual = element
        .get(&cmp.attribute)
        .ok_or_else(|| Rejection::MissingAttribute(cmp.attribute.clone()))?;

    let expected = resolve_operand(&cmp.value, params)?.coerce_numeric();
    let actual = actual.coerce_like(&expected);

    if apply(cmp.operator, &actual, &expected)? {
        Ok(())
    } else {
        Err(Rejection::False)
    }
}
