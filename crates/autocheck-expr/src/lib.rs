pub mod error;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod simplify;

pub use error::{ExprError, ExprResult};
pub use expr::{sym, Expr};
pub use simplify::SamplingSimplifier;
