use thiserror::Error;

/// Error type for user-supplied code: check functions, callbacks, simplifiers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("unsupported operand type(s) for {op}: '{lhs}' and '{rhs}'")]
    UnsupportedOperand {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("no simplification engine is configured for symbolic checks")]
    NoSimplifier,
}
