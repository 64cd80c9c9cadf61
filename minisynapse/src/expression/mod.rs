//! Boolean predicate language for filter mediators.
//!
//! Predicates are deliberately small: comparisons and membership tests over a
//! fixed set of context fields, combined with `and`/`or`/`not`. The only name
//! in scope is `ctx`; there is no function call syntax and no access to
//! anything outside the message being mediated.
//!
//! ```text
//! ctx.method == 'POST' and 'X-Tenant' in ctx.headers
//! ctx.properties['score'] >= 0.5 or not (ctx.path matches '^/internal/')
//! ```
//!
//! Parsing happens once, when a definition is loaded. Evaluation can still
//! fail at runtime, e.g. when a predicate reads a property that was never set.

mod eval;
mod lexer;
mod parser;

pub use parser::{CompareOp, Expr, Field, MAX_NESTING};

use crate::context::MessageContext;
use crate::errors::ExpressionError;

/// A parsed, reusable predicate.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Parses a predicate.
    ///
    /// # Errors
    ///
    /// Returns a parse-phase [`ExpressionError`] for syntax errors, unknown
    /// names, unknown context fields and invalid `matches` patterns.
    pub fn parse(source: impl Into<String>) -> Result<Self, ExpressionError> {
        let source = source.into();
        let expr = parser::parse(&source)?;
        Ok(Self { source, expr })
    }

    /// The original expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed syntax tree.
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluates the predicate to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an eval-phase [`ExpressionError`] when a referenced header or
    /// property is missing or operand types do not support an operator.
    pub fn value(&self, ctx: &MessageContext) -> Result<serde_json::Value, ExpressionError> {
        eval::evaluate(&self.expr, ctx).map_err(|message| ExpressionError::eval(&self.source, message))
    }

    /// Evaluates the predicate and applies truthiness.
    ///
    /// # Errors
    ///
    /// See [`Predicate::value`].
    pub fn evaluate(&self, ctx: &MessageContext) -> Result<bool, ExpressionError> {
        self.value(ctx).map(|v| eval::is_truthy(&v))
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Headers;
    use crate::errors::ExpressionPhase;
    use serde_json::json;

    fn ctx(method: &str, path: &str) -> MessageContext {
        let mut headers = Headers::new();
        headers.insert("X-Tenant".to_string(), "acme".to_string());
        MessageContext::new(method, path, headers, b"hello world".to_vec())
    }

    fn eval(source: &str, ctx: &MessageContext) -> bool {
        Predicate::parse(source).unwrap().evaluate(ctx).unwrap()
    }

    #[test]
    fn test_literals() {
        let c = ctx("GET", "/");
        assert!(eval("True", &c));
        assert!(!eval("False", &c));
        assert!(!eval("None", &c));
        assert!(eval("1", &c));
        assert!(!eval("''", &c));
    }

    #[test]
    fn test_method_and_path() {
        let post = ctx("POST", "/orders?id=1");
        let get = ctx("GET", "/orders");

        assert!(eval("ctx.method == 'POST'", &post));
        assert!(!eval("ctx.method == 'POST'", &get));
        assert!(eval("'id=1' in ctx.path", &post));
        assert!(eval("ctx.path matches '^/orders'", &get));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let c = ctx("GET", "/");
        assert!(eval("ctx.headers['x-tenant'] == 'acme'", &c));
        assert!(eval("'x-tenant' in ctx.headers", &c));
        assert!(eval("'authorization' not in ctx.headers", &c));
    }

    #[test]
    fn test_body_and_status() {
        let mut c = ctx("POST", "/");
        assert!(eval("'world' in ctx.body", &c));
        assert!(eval("ctx.status == 200", &c));

        c.set_response(503, b"busy".to_vec(), None);
        assert!(eval("ctx.status >= 500 and ctx.response_body == 'busy'", &c));
    }

    #[test]
    fn test_properties() {
        let mut c = ctx("GET", "/");
        c.set_property("score", json!(0.75));
        c.set_property("tags", json!(["vip", "beta"]));

        assert!(eval("ctx.properties['score'] > 0.5", &c));
        assert!(eval("'vip' in ctx.properties['tags']", &c));
        assert!(eval("'score' in ctx.properties", &c));
        assert!(eval("'missing' not in ctx.properties", &c));
    }

    #[test]
    fn test_short_circuit_guards_missing_property() {
        let c = ctx("GET", "/");
        assert!(!eval("'k' in ctx.properties and ctx.properties['k'] == 1", &c));
        assert!(eval("True or ctx.properties['k']", &c));
    }

    #[test]
    fn test_missing_property_is_eval_error() {
        let c = ctx("GET", "/");
        let err = Predicate::parse("ctx.properties['nope'] == 1")
            .unwrap()
            .evaluate(&c)
            .unwrap_err();

        assert_eq!(err.phase, ExpressionPhase::Eval);
        assert!(err.message.contains("nope"));
        assert_eq!(err.expression, "ctx.properties['nope'] == 1");
    }

    #[test]
    fn test_type_mismatch_is_eval_error() {
        let c = ctx("GET", "/");
        assert!(Predicate::parse("ctx.method > 3").unwrap().evaluate(&c).is_err());
    }

    #[test]
    fn test_same_context_same_answer() {
        let predicate = Predicate::parse("ctx.method == 'POST' and 'acme' == ctx.headers['X-Tenant']").unwrap();
        let a = ctx("POST", "/a");
        let b = ctx("POST", "/a");

        for _ in 0..3 {
            assert_eq!(predicate.evaluate(&a).unwrap(), predicate.evaluate(&b).unwrap());
        }
    }

    #[test]
    fn test_display_is_source() {
        let p = Predicate::parse("ctx.method == 'GET'").unwrap();
        assert_eq!(p.to_string(), "ctx.method == 'GET'");
        assert_eq!(p.source(), "ctx.method == 'GET'");
    }
}
