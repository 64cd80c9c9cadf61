//! Evaluation of parsed predicates against a message context.

use super::parser::{CompareOp, Expr, Field};
use crate::context::{Headers, MessageContext};
use serde_json::Value;
use std::cmp::Ordering;

/// Evaluates an expression to a JSON value.
///
/// Errors carry a plain message; the caller attaches the expression text.
pub(crate) fn evaluate(expr: &Expr, ctx: &MessageContext) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(field) => read_field(field, ctx),
        Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&evaluate(inner, ctx)?))),
        Expr::And(left, right) => {
            if !is_truthy(&evaluate(left, ctx)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(is_truthy(&evaluate(right, ctx)?)))
        }
        Expr::Or(left, right) => {
            if is_truthy(&evaluate(left, ctx)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(is_truthy(&evaluate(right, ctx)?)))
        }
        Expr::Compare(op, left, right) => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
        Expr::In {
            needle,
            haystack,
            negated,
        } => {
            let needle = evaluate(needle, ctx)?;
            let found = match haystack.as_ref() {
                // Header maps are matched case-insensitively, like lookups.
                Expr::Field(Field::Headers) => header_key_present(ctx.headers(), &needle)?,
                Expr::Field(Field::ResponseHeaders) => {
                    header_key_present(ctx.response_headers(), &needle)?
                }
                other => contains(&evaluate(other, ctx)?, &needle)?,
            };
            Ok(Value::Bool(found != *negated))
        }
        Expr::Matches(subject, regex) => match evaluate(subject, ctx)? {
            Value::String(s) => Ok(Value::Bool(regex.is_match(&s))),
            other => Err(format!(
                "'matches' expects a string, got {}",
                type_name(&other)
            )),
        },
    }
}

/// Truthiness: null, false, zero, empty strings and empty collections are
/// false; everything else is true.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn read_field(field: &Field, ctx: &MessageContext) -> Result<Value, String> {
    match field {
        Field::Method => Ok(Value::String(ctx.method().to_string())),
        Field::Path => Ok(Value::String(ctx.path().to_string())),
        Field::Body => Ok(Value::String(ctx.body_text())),
        Field::Status => Ok(Value::from(ctx.response_status())),
        Field::ResponseBody => Ok(Value::String(
            String::from_utf8_lossy(ctx.response_body()).into_owned(),
        )),
        Field::Headers => Ok(headers_value(ctx.headers())),
        Field::ResponseHeaders => Ok(headers_value(ctx.response_headers())),
        Field::Header(name) => ctx
            .header(name)
            .map(|v| Value::String(v.to_string()))
            .ok_or_else(|| format!("header '{name}' is not present")),
        Field::ResponseHeader(name) => ctx
            .response_header(name)
            .map(|v| Value::String(v.to_string()))
            .ok_or_else(|| format!("response header '{name}' is not present")),
        Field::Properties => Ok(Value::Object(
            ctx.properties()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )),
        Field::Property(key) => ctx
            .property(key)
            .cloned()
            .ok_or_else(|| format!("property '{key}' is not set")),
    }
}

fn headers_value(headers: &Headers) -> Value {
    Value::Object(
        headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn header_key_present(headers: &Headers, needle: &Value) -> Result<bool, String> {
    match needle {
        Value::String(name) => Ok(headers.keys().any(|k| k.eq_ignore_ascii_case(name))),
        other => Err(format!(
            "header names are strings, got {}",
            type_name(other)
        )),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, String> {
    match op {
        CompareOp::Eq => return Ok(values_equal(left, right)),
        CompareOp::Ne => return Ok(!values_equal(left, right)),
        _ => {}
    }

    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b)
                .ok_or_else(|| "numbers are not comparable".to_string())?
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            return Err(format!(
                "'{}' not supported between {} and {}",
                op.symbol(),
                type_name(left),
                type_name(right)
            ))
        }
    };

    Ok(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Eq | CompareOp::Ne => unreachable!("handled above"),
    })
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        // 200 == 200.0
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, String> {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => Ok(h.contains(n.as_str())),
        (Value::Array(items), n) => Ok(items.iter().any(|item| values_equal(item, n))),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        (h, n) => Err(format!(
            "'in' not supported between {} and {}",
            type_name(n),
            type_name(h)
        )),
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
