pub mod attempts;
pub mod capture;
pub mod check;
pub mod compare;
pub mod error;
pub mod feedback;
pub mod result;
pub mod session;
pub mod simplify;
pub mod tracker;
pub mod value;

pub use attempts::AttemptCache;
pub use capture::{capture, Captured};
pub use check::{Callback, Callbacks, CheckFunction, CheckOptions};
pub use error::{BoxError, CheckError};
pub use result::{Category, CheckResult, Judgement, Outcome, ProblemRef};
pub use session::{Session, SessionSettings};
pub use simplify::Simplifier;
pub use tracker::Tracker;
pub use value::{Symbolic, Value};
