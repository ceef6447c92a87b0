use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("invalid character '{ch}' at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("{name}() takes {expected} argument(s) ({found} given)")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("symbol '{0}' has no value")]
    UnboundSymbol(String),

    #[error("unsupported operand type(s) for {op}: '{lhs}' and '{rhs}'")]
    UnsupportedOperand {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("expression is nested more than {0} levels deep")]
    TooDeep(usize),

    #[error("could not evaluate the expressions at enough sample points")]
    NoSamplePoints,
}

pub type ExprResult<T> = Result<T, ExprError>;
