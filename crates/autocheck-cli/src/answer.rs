//! Turning command-line text and JSON fields into checkable values.

use serde_json::Value as Json;
use tracing::debug;

use autocheck_core::Value;
use autocheck_expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    Numeric,
    Symbolic,
}

/// Empty input and `...` are a missing answer; integers and floats are
/// numbers; anything else is text, or an expression for symbolic checks.
/// Text that fails to parse as an expression stays text, which the
/// simplifier then rejects.
pub fn parse_text(text: &str, how: Interpretation) -> Value {
    let text = text.trim();
    if text.is_empty() || text == "..." {
        return Value::Missing;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    if is_float_literal(text) {
        if let Ok(x) = text.parse::<f64>() {
            return Value::Float(x);
        }
    }
    match how {
        Interpretation::Numeric => Value::Text(text.to_string()),
        Interpretation::Symbolic => match Expr::parse(text) {
            Ok(expr) => expr.into(),
            Err(e) => {
                debug!("'{text}' is not an expression: {e}");
                Value::Text(text.to_string())
            }
        },
    }
}

/// Digits, sign, point and exponent only: `inf` and `nan` stay names.
fn is_float_literal(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

/// JSON strings go through [`parse_text`]; other JSON keeps its shape.
pub fn parse_json(value: Json, how: Interpretation) -> Value {
    match value {
        Json::String(s) => parse_text(&s, how),
        other => other.into(),
    }
}
