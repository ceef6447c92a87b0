use crate::error::BoxError;
use crate::value::Value;

/// Decides whether two symbolic answers denote the same expression.
///
/// Implementations may fail on inputs they cannot handle (plain text,
/// boolean expressions, malformed input); the session captures the error and
/// reports it as a failed check.
pub trait Simplifier {
    fn equivalent(&self, expected: &Value, answer: &Value) -> Result<bool, BoxError>;
}
