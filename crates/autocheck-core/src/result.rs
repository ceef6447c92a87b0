use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;

use crate::value::Value;

// ---------------------------------------------------------------------------
// ProblemRef
// ---------------------------------------------------------------------------

/// Identifiers of the question being checked. All optional.
///
/// `name` keys the attempt history; the others are passed through to the
/// tracker unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRef {
    pub name: Option<String>,
    pub course: Option<String>,
    pub lp: Option<String>,
    pub workbook: Option<String>,
}

impl ProblemRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_course(mut self, course: impl Into<String>) -> Self {
        self.course = Some(course.into());
        self
    }

    pub fn with_lp(mut self, lp: impl Into<String>) -> Self {
        self.lp = Some(lp.into());
        self
    }

    pub fn with_workbook(mut self, workbook: impl Into<String>) -> Self {
        self.workbook = Some(workbook.into());
        self
    }

    /// Tracking needs both a problem name and a course.
    pub fn is_trackable(&self) -> bool {
        self.name.is_some() && self.course.is_some()
    }

    /// Key into the attempt cache. Unnamed problems share one history.
    pub fn cache_key(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    /// `unique` is false when the same answer text was already rejected.
    Incorrect { unique: bool },
    /// The answer could not be checked; `error` is a single diagnostic line.
    Failure { error: String },
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Correct)
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Correct => Category::Correct,
            Self::Incorrect { .. } => Category::Incorrect,
            Self::Failure { .. } => Category::Failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Correct,
    Incorrect,
    Failure,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => write!(f, "correct"),
            Self::Incorrect => write!(f, "incorrect"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// Judgement
// ---------------------------------------------------------------------------

/// What a custom check function reports for an answer.
#[derive(Debug, Clone)]
pub struct Judgement {
    pub passed: bool,
    pub expected: Value,
    /// Extra fields forwarded to the tracker.
    pub extra: Map<String, Json>,
}

impl Judgement {
    pub fn new(passed: bool, expected: impl Into<Value>) -> Self {
        Self {
            passed,
            expected: expected.into(),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// CheckResult
// ---------------------------------------------------------------------------

/// A checked answer as it flows through the result processor.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub problem: ProblemRef,
    pub answer: Value,
    pub expected: Option<Value>,
    pub outcome: Outcome,
    pub extra: Map<String, Json>,
}

impl CheckResult {
    pub fn new(answer: Value, expected: Option<Value>, outcome: Outcome) -> Self {
        Self {
            problem: ProblemRef::default(),
            answer,
            expected,
            outcome,
            extra: Map::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { error } => Some(error),
            _ => None,
        }
    }

    pub fn unique(&self) -> Option<bool> {
        match self.outcome {
            Outcome::Incorrect { unique } => Some(unique),
            _ => None,
        }
    }

    /// Flat JSON record sent to the tracker.
    pub fn to_payload(&self) -> Json {
        let record = Payload {
            problem: &self.problem,
            passed: self.passed(),
            answer: &self.answer,
            expected: self.expected.as_ref(),
            error: self.error(),
            unique: self.unique(),
            extra: &self.extra,
        };
        serde_json::to_value(record).unwrap_or(Json::Null)
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    #[serde(flatten)]
    problem: &'a ProblemRef,
    passed: bool,
    answer: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unique: Option<bool>,
    #[serde(flatten)]
    extra: &'a Map<String, Json>,
}
