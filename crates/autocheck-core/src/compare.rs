use crate::error::{BoxError, CheckError};
use crate::simplify::Simplifier;
use crate::value::Value;

pub const DEFAULT_ABSOLUTE_TOLERANCE: f64 = 0.0;
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-6;

fn operand_error(op: &'static str, answer: &Value, expected: &Value) -> CheckError {
    CheckError::UnsupportedOperand {
        op,
        lhs: answer.type_name().to_string(),
        rhs: expected.type_name().to_string(),
    }
}

/// `|answer - expected| <= tolerance`. Integers are subtracted exactly.
pub fn absolute(expected: &Value, answer: &Value, tolerance: f64) -> Result<bool, CheckError> {
    if let (Value::Int(a), Value::Int(e)) = (answer, expected) {
        let diff = (i128::from(*a) - i128::from(*e)).unsigned_abs();
        return Ok(diff as f64 <= tolerance);
    }
    match (answer.as_f64(), expected.as_f64()) {
        (Some(a), Some(e)) => Ok((a - e).abs() <= tolerance),
        _ => Err(operand_error("-", answer, expected)),
    }
}

/// `|answer / expected - 1| <= tolerance`. Undefined for a zero expectation.
pub fn relative(expected: &Value, answer: &Value, tolerance: f64) -> Result<bool, CheckError> {
    match (answer.as_f64(), expected.as_f64()) {
        (Some(_), Some(e)) if e == 0.0 => Err(CheckError::DivisionByZero),
        (Some(a), Some(e)) => Ok((a / e - 1.0).abs() <= tolerance),
        _ => Err(operand_error("/", answer, expected)),
    }
}

/// Symbolic equivalence through the session's simplifier.
pub fn symbolic(
    simplifier: Option<&dyn Simplifier>,
    expected: &Value,
    answer: &Value,
) -> Result<bool, BoxError> {
    let simplifier = simplifier.ok_or(CheckError::NoSimplifier)?;
    simplifier.equivalent(expected, answer)
}
