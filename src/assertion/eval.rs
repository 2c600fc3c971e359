//! Assertion evaluation over `serde_json::Value`.
//!
//! The scope starts with a single `result` binding; quantifiers extend it
//! per element. Failures here are evaluation errors (unknown names, bad
//! indices, type mismatches) and are reported apart from plain false
//! outcomes, which the caller turns into assertion failures.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{BinaryOp, Expr, Quant, Segment};
use crate::errors::RunbookError;
use crate::expand::Expander;
use crate::value;

/// Evaluation state threaded through one assertion check.
pub struct EvalContext<'a> {
    /// Original spec text, quoted in error messages.
    pub spec: &'a str,
    pub expander: &'a Expander<'a>,
    pub scope: im::HashMap<String, Value>,
}

pub fn eval(expr: &Expr, ctx: &EvalContext) -> Result<Value, RunbookError> {
    match expr {
        // string literals may carry $/? tokens
        Expr::Literal(Value::String(text)) => Ok(Value::String(ctx.expander.splice(text)?)),
        Expr::Literal(other) => Ok(other.clone()),
        Expr::VarRef(name) => Ok(coerce_scalar(ctx.expander.lookup(name)?)),
        Expr::Path { root, segments } => {
            let mut current = ctx.scope.get(root).cloned().ok_or_else(|| {
                RunbookError::assertion_eval(ctx.spec, format!("unknown name '{root}'"))
            })?;
            for segment in segments {
                current = access(current, segment, ctx)?;
            }
            Ok(current)
        }
        Expr::Not(inner) => Ok(Value::Bool(!value::is_truthy(&eval(inner, ctx)?))),
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => {
            if !value::is_truthy(&eval(lhs, ctx)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(value::is_truthy(&eval(rhs, ctx)?)))
        }
        Expr::Binary {
            op: BinaryOp::Or,
            lhs,
            rhs,
        } => {
            if value::is_truthy(&eval(lhs, ctx)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(value::is_truthy(&eval(rhs, ctx)?)))
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            compare(*op, &l, &r, ctx)
        }
        Expr::Quantifier {
            kind,
            predicate,
            binding,
            iterable,
        } => eval_quantifier(*kind, predicate, binding, iterable, ctx),
    }
}

// ============================================================================
// OPERATORS
// ============================================================================

fn compare(op: BinaryOp, l: &Value, r: &Value, ctx: &EvalContext) -> Result<Value, RunbookError> {
    let outcome = match op {
        BinaryOp::Eq => value::values_equal(l, r),
        BinaryOp::Ne => !value::values_equal(l, r),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => order(op, l, r, ctx)?,
        BinaryOp::In => contains(l, r, ctx)?,
        BinaryOp::NotIn => !contains(l, r, ctx)?,
        // and/or short-circuit in eval; this arm only fires for nested
        // pre-evaluated operands
        BinaryOp::And => value::is_truthy(l) && value::is_truthy(r),
        BinaryOp::Or => value::is_truthy(l) || value::is_truthy(r),
    };
    Ok(Value::Bool(outcome))
}

fn order(op: BinaryOp, l: &Value, r: &Value, ctx: &EvalContext) -> Result<bool, RunbookError> {
    let ordering = match (l, r) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return Err(RunbookError::assertion_eval(
            ctx.spec,
            format!(
                "cannot order {} and {} with '{}'",
                value::type_name(l),
                value::type_name(r),
                op.symbol()
            ),
        ));
    };
    Ok(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn contains(needle: &Value, haystack: &Value, ctx: &EvalContext) -> Result<bool, RunbookError> {
    match haystack {
        Value::Array(items) => Ok(items.iter().any(|item| value::values_equal(needle, item))),
        Value::String(text) => match needle {
            Value::String(sub) => Ok(text.contains(sub.as_str())),
            other => Err(RunbookError::assertion_eval(
                ctx.spec,
                format!("cannot search a string for {}", value::type_name(other)),
            )),
        },
        Value::Object(map) => match needle {
            Value::String(key) => Ok(map.contains_key(key)),
            other => Err(RunbookError::assertion_eval(
                ctx.spec,
                format!(
                    "object membership needs a string key, got {}",
                    value::type_name(other)
                ),
            )),
        },
        other => Err(RunbookError::assertion_eval(
            ctx.spec,
            format!("cannot test membership in {}", value::type_name(other)),
        )),
    }
}

// ============================================================================
// ACCESS AND ITERATION
// ============================================================================

fn access(current: Value, segment: &Segment, ctx: &EvalContext) -> Result<Value, RunbookError> {
    match segment {
        Segment::Field(name) | Segment::Key(name) => match current {
            // missing members read as null, the lenient mapping view
            Value::Object(mut map) => Ok(map.remove(name).unwrap_or(Value::Null)),
            other => Err(RunbookError::assertion_eval(
                ctx.spec,
                format!(
                    "cannot access '{name}' of {}",
                    value::type_name(&other)
                ),
            )),
        },
        Segment::Index(i) => match current {
            Value::Array(mut items) => {
                let len = items.len() as i64;
                let idx = if *i < 0 { i + len } else { *i };
                if idx < 0 || idx >= len {
                    return Err(RunbookError::assertion_eval(
                        ctx.spec,
                        format!("index {i} out of bounds for array of {len}"),
                    ));
                }
                Ok(items.swap_remove(idx as usize))
            }
            other => Err(RunbookError::assertion_eval(
                ctx.spec,
                format!("cannot index {}", value::type_name(&other)),
            )),
        },
    }
}

fn eval_quantifier(
    kind: Quant,
    predicate: &Expr,
    binding: &str,
    iterable: &Expr,
    ctx: &EvalContext,
) -> Result<Value, RunbookError> {
    let elements: Vec<Value> = match eval(iterable, ctx)? {
        Value::Array(items) => items,
        Value::Object(map) => map.keys().map(|k| Value::String(k.clone())).collect(),
        Value::String(text) => text.chars().map(|c| Value::String(c.to_string())).collect(),
        other => {
            return Err(RunbookError::assertion_eval(
                ctx.spec,
                format!("cannot iterate over {}", value::type_name(&other)),
            ))
        }
    };
    for element in elements {
        let child = EvalContext {
            spec: ctx.spec,
            expander: ctx.expander,
            scope: ctx.scope.update(binding.to_string(), element),
        };
        let holds = value::is_truthy(&eval(predicate, &child)?);
        match kind {
            Quant::All if !holds => return Ok(Value::Bool(false)),
            Quant::Any if holds => return Ok(Value::Bool(true)),
            _ => {}
        }
    }
    // all([]) is true, any([]) is false
    Ok(Value::Bool(matches!(kind, Quant::All)))
}

/// Mirrors textual substitution: a variable whose string value reads as a
/// number, boolean or null compares as that scalar.
fn coerce_scalar(value: Value) -> Value {
    let Value::String(text) = &value else {
        return value;
    };
    match text.as_str() {
        "true" | "True" => return Value::Bool(true),
        "false" | "False" => return Value::Bool(false),
        "null" | "None" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    value
}
