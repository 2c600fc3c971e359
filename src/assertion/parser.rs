//! Assertion parser: converts assertion text into [`Expr`] trees.
//!
//! Purely syntactic. Name resolution and type checking happen at
//! evaluation time, against the run's actual result.

use pest::error::{Error, ErrorVariant, InputLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use serde_json::Value;

use super::ast::{BinaryOp, Expr, Quant, Segment};
use crate::errors::RunbookError;

#[derive(Parser)]
#[grammar = "assertion/grammar.pest"]
struct AssertionParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses the evaluable form of an assertion (after any `all`/`any` sugar
/// rewrite). Errors carry a span into `evaluable`.
pub fn parse(evaluable: &str) -> Result<Expr, RunbookError> {
    let pairs = AssertionParser::parse(Rule::assertion, evaluable)
        .map_err(|e| convert_parse_error(evaluable, e))?;
    let assertion = pairs.peek().unwrap(); // pest guarantees the assertion rule exists
    let expr = assertion
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .unwrap(); // grammar guarantees one expr before EOI
    build_expr(expr, evaluable)
}

// ============================================================================
// EXPRESSION BUILDERS
// ============================================================================

fn build_expr(pair: Pair<Rule>, evaluable: &str) -> Result<Expr, RunbookError> {
    match pair.as_rule() {
        Rule::expr | Rule::operand | Rule::literal => {
            let inner = pair.into_inner().next().unwrap(); // grammar guarantees inner exists
            build_expr(inner, evaluable)
        }
        Rule::or_expr => build_chain(pair, BinaryOp::Or, evaluable),
        Rule::and_expr => build_chain(pair, BinaryOp::And, evaluable),
        Rule::not_expr => {
            let inner = pair.into_inner().next().unwrap(); // grammar guarantees inner exists
            match inner.as_rule() {
                Rule::not_expr => Ok(Expr::Not(Box::new(build_expr(inner, evaluable)?))),
                _ => build_expr(inner, evaluable),
            }
        }
        Rule::comparison => build_comparison(pair, evaluable),
        Rule::quantifier => build_quantifier(pair, evaluable),
        Rule::var_ref => Ok(Expr::VarRef(pair.as_str()[1..].to_string())),
        Rule::path => build_path(pair, evaluable),
        Rule::number => build_number(pair, evaluable),
        Rule::string => Ok(Expr::Literal(Value::String(unquote(pair.as_str())))),
        Rule::boolean => Ok(Expr::Literal(Value::Bool(matches!(
            pair.as_str(),
            "true" | "True"
        )))),
        Rule::null => Ok(Expr::Literal(Value::Null)),
        other => {
            let span = span_of(&pair);
            Err(RunbookError::assertion_syntax(
                evaluable,
                format!("unexpected {other:?} node"),
                span,
            ))
        }
    }
}

fn build_chain(pair: Pair<Rule>, op: BinaryOp, evaluable: &str) -> Result<Expr, RunbookError> {
    let mut inner = pair.into_inner();
    let first = inner.next().unwrap(); // grammar guarantees at least one operand
    let mut expr = build_expr(first, evaluable)?;
    for next in inner {
        expr = Expr::Binary {
            op,
            lhs: Box::new(expr),
            rhs: Box::new(build_expr(next, evaluable)?),
        };
    }
    Ok(expr)
}

fn build_comparison(pair: Pair<Rule>, evaluable: &str) -> Result<Expr, RunbookError> {
    let mut inner = pair.into_inner();
    let lhs = build_expr(inner.next().unwrap(), evaluable)?; // grammar guarantees the left operand
    match inner.next() {
        None => Ok(lhs),
        Some(op_pair) => {
            let op = comparison_op(op_pair);
            let rhs = build_expr(inner.next().unwrap(), evaluable)?; // grammar pairs every operator with an operand
            Ok(Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
        }
    }
}

fn comparison_op(pair: Pair<Rule>) -> BinaryOp {
    let inner = pair.into_inner().next().unwrap(); // comp_op wraps exactly one operator rule
    match inner.as_rule() {
        Rule::op_eq => BinaryOp::Eq,
        Rule::op_ne => BinaryOp::Ne,
        Rule::op_le => BinaryOp::Le,
        Rule::op_ge => BinaryOp::Ge,
        Rule::op_lt => BinaryOp::Lt,
        Rule::op_gt => BinaryOp::Gt,
        Rule::op_in => BinaryOp::In,
        _ => BinaryOp::NotIn,
    }
}

fn build_quantifier(pair: Pair<Rule>, evaluable: &str) -> Result<Expr, RunbookError> {
    let mut inner = pair.into_inner();
    let kind = match inner.next().unwrap().as_str() {
        // grammar guarantees quant_kind
        "all" => Quant::All,
        _ => Quant::Any,
    };
    let predicate = build_expr(inner.next().unwrap(), evaluable)?; // grammar guarantees the predicate
    let binding = inner.next().unwrap().as_str().to_string(); // grammar guarantees the binding
    let iterable = build_expr(inner.next().unwrap(), evaluable)?; // grammar guarantees the iterable
    Ok(Expr::Quantifier {
        kind,
        predicate: Box::new(predicate),
        binding,
        iterable: Box::new(iterable),
    })
}

fn build_path(pair: Pair<Rule>, evaluable: &str) -> Result<Expr, RunbookError> {
    let mut inner = pair.into_inner();
    let root = inner.next().unwrap().as_str().to_string(); // grammar guarantees the root ident
    let mut segments = Vec::new();
    for seg in inner {
        let part = seg.into_inner().next().unwrap(); // segment wraps exactly one accessor
        match part.as_rule() {
            Rule::field => segments.push(Segment::Field(part.as_str().to_string())),
            Rule::index => {
                let text = part.as_str();
                let value = text.parse::<i64>().map_err(|_| {
                    RunbookError::assertion_syntax(
                        evaluable,
                        format!("index '{text}' out of range"),
                        span_of(&part),
                    )
                })?;
                segments.push(Segment::Index(value));
            }
            _ => segments.push(Segment::Key(unquote(part.as_str()))),
        }
    }
    Ok(Expr::Path { root, segments })
}

fn build_number(pair: Pair<Rule>, evaluable: &str) -> Result<Expr, RunbookError> {
    let text = pair.as_str();
    let number = if !text.contains(['.', 'e', 'E']) {
        text.parse::<i64>().ok().map(serde_json::Number::from)
    } else {
        None
    }
    .or_else(|| text.parse::<f64>().ok().and_then(serde_json::Number::from_f64));
    match number {
        Some(n) => Ok(Expr::Literal(Value::Number(n))),
        None => Err(RunbookError::assertion_syntax(
            evaluable,
            format!("number '{text}' out of range"),
            span_of(&pair),
        )),
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn unquote(text: &str) -> String {
    // grammar guarantees surrounding quotes
    text[1..text.len() - 1].to_string()
}

fn span_of(pair: &Pair<Rule>) -> (usize, usize) {
    let span = pair.as_span();
    (span.start(), span.end() - span.start())
}

fn convert_parse_error(evaluable: &str, err: Error<Rule>) -> RunbookError {
    let (start, len) = match err.location {
        InputLocation::Pos(p) => (p, 0),
        InputLocation::Span((s, e)) => (s, e.saturating_sub(s)),
    };
    let start = start.min(evaluable.len());
    let len = len.min(evaluable.len() - start).max(usize::from(evaluable.len() > start));
    let message = match err.variant {
        ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            let expected: Vec<String> = positives.iter().map(|r| format!("{r:?}")).collect();
            format!("expected {}", expected.join(" | "))
        }
        _ => "unexpected syntax".to_string(),
    };
    RunbookError::assertion_syntax(evaluable, message, (start, len))
}
