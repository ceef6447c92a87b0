use crate::error::BoxError;
use crate::result::{CheckResult, Judgement, ProblemRef};
use crate::value::Value;

// ---------------------------------------------------------------------------
// CheckFunction
// ---------------------------------------------------------------------------

/// A user-defined check: inspects the answer and reports whether it passed
/// together with the expected answer.
pub trait CheckFunction {
    fn check(&self, answer: &Value) -> Result<Judgement, BoxError>;
}

impl<F, E> CheckFunction for F
where
    F: Fn(&Value) -> Result<Judgement, E>,
    E: Into<BoxError>,
{
    fn check(&self, answer: &Value) -> Result<Judgement, BoxError> {
        self(answer).map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

pub type Callback<'a> = Box<dyn FnMut(&CheckResult) -> Result<(), BoxError> + 'a>;

/// Optional hooks run after feedback has been printed, one per category.
#[derive(Default)]
pub struct Callbacks<'a> {
    pub on_correct: Option<Callback<'a>>,
    pub on_incorrect: Option<Callback<'a>>,
    pub on_failure: Option<Callback<'a>>,
}

// ---------------------------------------------------------------------------
// CheckOptions
// ---------------------------------------------------------------------------

/// Per-call options shared by every check entry point.
pub struct CheckOptions<'a> {
    pub problem: ProblemRef,
    /// Overrides the session default when set.
    pub show_answer: Option<bool>,
    pub callbacks: Callbacks<'a>,
    pub enable_tracking: bool,
}

impl Default for CheckOptions<'_> {
    fn default() -> Self {
        Self {
            problem: ProblemRef::default(),
            show_answer: None,
            callbacks: Callbacks::default(),
            enable_tracking: true,
        }
    }
}

impl<'a> CheckOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_problem(problem: ProblemRef) -> Self {
        Self {
            problem,
            ..Self::default()
        }
    }

    pub fn show_answer(mut self, show: bool) -> Self {
        self.show_answer = Some(show);
        self
    }

    pub fn without_tracking(mut self) -> Self {
        self.enable_tracking = false;
        self
    }

    pub fn on_correct(
        mut self,
        f: impl FnMut(&CheckResult) -> Result<(), BoxError> + 'a,
    ) -> Self {
        self.callbacks.on_correct = Some(Box::new(f));
        self
    }

    pub fn on_incorrect(
        mut self,
        f: impl FnMut(&CheckResult) -> Result<(), BoxError> + 'a,
    ) -> Self {
        self.callbacks.on_incorrect = Some(Box::new(f));
        self
    }

    pub fn on_failure(
        mut self,
        f: impl FnMut(&CheckResult) -> Result<(), BoxError> + 'a,
    ) -> Self {
        self.callbacks.on_failure = Some(Box::new(f));
        self
    }
}
