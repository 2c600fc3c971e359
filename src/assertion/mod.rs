//! # Assertion System
//!
//! An assertion is a one-line textual spec, compiled at load time into a
//! small expression language and evaluated after each execution against the
//! binding `result`. The language covers comparisons, `and`/`or`/`not`,
//! membership (`in`, `not in`) and `all(..)`/`any(..)` comprehensions;
//! there are no calls and no arbitrary code execution.
//!
//! Two spellings of quantifiers are accepted: the explicit
//! `all( x > 0 for x in result )` and the sugar form `all x > 0 for x in
//! result`, where a leading `all`/`any` token wraps the remainder in
//! parentheses before compilation.
//!
//! A false outcome reports `'<spec>' failed for result=<raw>`, keeping the
//! spec text verbatim. Anything that breaks *during* evaluation (unknown
//! name, bad index, mixed-type ordering) is a different failure class and
//! is reported with a cause trace instead.

mod ast;
mod eval;
mod parser;

pub use ast::{BinaryOp, Expr, Quant, Segment};

use serde_json::Value;

use crate::errors::RunbookError;
use crate::expand::Expander;
use crate::value;

/// A compiled assertion, keeping its textual spec verbatim for
/// serialization and messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    spec: String,
    expr: Expr,
}

impl Assertion {
    /// Compiles `spec`, applying the `all`/`any` sugar rewrite first.
    /// Syntax problems are load-time configuration errors.
    pub fn new(spec: &str) -> Result<Self, RunbookError> {
        let evaluable = rewrite_sugar(spec);
        let expr = parser::parse(&evaluable)?;
        Ok(Self {
            spec: spec.to_string(),
            expr,
        })
    }

    /// The original textual spec.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Evaluates against `result`; `Ok(())` when the outcome is truthy.
    pub fn check(&self, result: &Value, expander: &Expander) -> Result<(), RunbookError> {
        let ctx = eval::EvalContext {
            spec: &self.spec,
            expander,
            scope: im::HashMap::new().update("result".to_string(), result.clone()),
        };
        let outcome = eval::eval(&self.expr, &ctx)?;
        if value::is_truthy(&outcome) {
            return Ok(());
        }
        Err(RunbookError::AssertionFailed {
            spec: self.spec.clone(),
            result: value::to_display(result),
        })
    }
}

/// When the first whitespace-delimited token is `all` or `any`, the rest of
/// the spec becomes that quantifier's parenthesised body.
fn rewrite_sugar(spec: &str) -> String {
    match spec.split_once(char::is_whitespace) {
        Some((kw @ ("all" | "any"), rest)) => format!("{kw}( {rest} )"),
        _ => spec.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::hooks::HookRegistry;

    fn assert_on(spec: &str, result: Value) -> Result<(), RunbookError> {
        let vars = serde_json::Map::new();
        let registry = HookRegistry::new();
        let expander = Expander::new(&vars, &registry);
        Assertion::new(spec)
            .expect("spec should compile")
            .check(&result, &expander)
    }

    #[test]
    fn false_outcomes_quote_spec_and_result() {
        let err = assert_on("result == False", json!(true)).unwrap_err();
        assert_eq!(err.to_string(), "'result == False' failed for result=true");

        let err = assert_on("result == 5", json!(4)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("result == 5"));
        assert!(message.contains("result=4"));
    }

    #[test]
    fn bare_result_uses_truthiness() {
        assert!(assert_on("result", json!([1])).is_ok());
        assert!(assert_on("result", json!([])).is_err());
        assert!(assert_on("not result", json!("")).is_ok());
    }

    #[test]
    fn paths_reach_into_nested_output() {
        let out = json!({"status": "ok", "code": 0, "items": [1, 2, 3]});
        assert!(assert_on("result.status == 'ok' and result.code == 0", out.clone()).is_ok());
        assert!(assert_on("result.items[-1] == 3", out.clone()).is_ok());
        assert!(assert_on("result.items[0] < result.items[1]", out).is_ok());
    }

    #[test]
    fn missing_members_read_as_null() {
        assert!(assert_on("result.missing == null", json!({"a": 1})).is_ok());
        assert!(assert_on("result.missing == None", json!({"a": 1})).is_ok());
    }

    #[test]
    fn membership_covers_arrays_strings_and_keys() {
        assert!(assert_on("5 in result", json!([4, 5, 6])).is_ok());
        assert!(assert_on("'err' in result.log", json!({"log": "an err happened"})).is_ok());
        assert!(assert_on("'k' in result", json!({"k": 1})).is_ok());
        assert!(assert_on("'x' not in result", json!(["y"])).is_ok());
    }

    #[test]
    fn sugar_and_explicit_quantifiers_agree() {
        for spec in ["all x > 0 for x in result", "all( x > 0 for x in result )"] {
            assert!(assert_on(spec, json!([1, 2, 3])).is_ok(), "{spec}");
            assert!(assert_on(spec, json!([1, -2])).is_err(), "{spec}");
        }
        // empty iterables: all holds, any does not
        assert!(assert_on("all x > 0 for x in result", json!([])).is_ok());
        assert!(assert_on("any x > 0 for x in result", json!([])).is_err());
    }

    #[test]
    fn variables_resolve_inside_assertions() {
        let mut vars = serde_json::Map::new();
        vars.insert("THRESHOLD".to_string(), json!("5"));
        vars.insert("GREETING".to_string(), json!("hello"));
        let registry = HookRegistry::new();
        let expander = Expander::new(&vars, &registry);

        let at_least = Assertion::new("result >= $THRESHOLD").unwrap();
        assert!(at_least.check(&json!(7), &expander).is_ok());
        assert!(at_least.check(&json!(3), &expander).is_err());

        let greets = Assertion::new("result == '$GREETING world'").unwrap();
        assert!(greets.check(&json!("hello world"), &expander).is_ok());
    }

    #[test]
    fn evaluation_errors_are_not_assertion_failures() {
        let err = assert_on("result < 'x'", json!(3)).unwrap_err();
        assert!(!err.is_assertion_failure());
        assert!(matches!(err, RunbookError::AssertionEval { .. }));

        let err = assert_on("resul == 5", json!(5)).unwrap_err();
        assert!(err.to_string().contains("unknown name 'resul'"));
    }

    #[test]
    fn bad_syntax_is_a_config_error() {
        let err = Assertion::new("result ===== ").unwrap_err();
        assert_eq!(
            err.category(),
            crate::errors::ErrorCategory::Config
        );
    }

    #[test]
    fn spec_text_survives_compilation_verbatim() {
        let spec = "all x > 0 for x in result";
        let assertion = Assertion::new(spec).unwrap();
        assert_eq!(assertion.spec(), spec);
    }
}
