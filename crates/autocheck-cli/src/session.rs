//! `autocheck session`: one check request per JSON line on stdin.
//!
//! ```text
//! {"check": "absolute", "expected": 123, "answer": "123.1", "tolerance": 0.5, "name": "q1"}
//! {"check": "symbolic", "expected": "n*(n - 1)/2", "answer": "(n**2 - n)/2"}
//! {"check": "track", "vars": {"x": 1}, "name": "q1", "course": "cs114"}
//! ```
//!
//! All lines share one session, so repeated answers and the reveal threshold
//! carry over from line to line.

use std::io::{BufRead, Write};

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{error, info, warn};

use autocheck_core::{Category, CheckOptions, ProblemRef, Session};
use autocheck_tracker::SharedCellLog;

use crate::answer::{parse_json, Interpretation};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Absolute,
    Relative,
    Symbolic,
    Track,
}

#[derive(Debug, Deserialize)]
pub struct Request {
    pub check: CheckKind,
    #[serde(default)]
    pub expected: Json,
    #[serde(default)]
    pub answer: Json,
    pub tolerance: Option<f64>,
    pub name: Option<String>,
    pub course: Option<String>,
    /// Learning path; numbers are accepted and kept as text.
    pub lp: Option<Json>,
    pub workbook: Option<String>,
    pub show_answer: Option<bool>,
    #[serde(default)]
    pub no_track: bool,
    /// Variables forwarded by `track` requests.
    #[serde(default)]
    pub vars: Json,
}

impl Request {
    fn problem(&self) -> ProblemRef {
        ProblemRef {
            name: self.name.clone(),
            course: self.course.clone(),
            lp: self.lp.as_ref().map(|lp| match lp {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            }),
            workbook: self.workbook.clone(),
        }
    }

    fn options(&self) -> CheckOptions<'static> {
        let mut options = CheckOptions::for_problem(self.problem());
        options.show_answer = self.show_answer;
        if self.no_track {
            options = options.without_tracking();
        }
        options
    }
}

/// Counts per outcome, plus lines that could not be read as requests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub correct: usize,
    pub incorrect: usize,
    pub failure: usize,
    pub tracked: usize,
    pub invalid: usize,
}

/// Run every request from `input`, writing feedback to `out`.
///
/// Each request line becomes an input cell in `cells` and its feedback the
/// matching output, so a tracker sees the session the way it sees a notebook.
pub fn run<R: BufRead, W: Write>(
    input: R,
    out: &mut W,
    session: &mut Session<Vec<u8>>,
    cells: &SharedCellLog,
) -> Result<Summary> {
    let mut summary = Summary::default();

    for (index, line) in input.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("stdin read error: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let count = cells.lock().push_input(line);
        match serde_json::from_str::<Request>(line) {
            Ok(request) => handle(session, request, &mut summary),
            Err(e) => {
                warn!("line {}: invalid request: {e}", index + 1);
                summary.invalid += 1;
                writeln!(session.output_mut(), "⚠️ invalid request on line {}: {e}", index + 1)?;
            }
        }

        let feedback = std::mem::take(session.output_mut());
        out.write_all(&feedback)?;
        out.flush()?;
        if !feedback.is_empty() {
            cells
                .lock()
                .set_output(count, String::from_utf8_lossy(&feedback).into_owned());
        }
    }

    info!(
        correct = summary.correct,
        incorrect = summary.incorrect,
        failure = summary.failure,
        invalid = summary.invalid,
        "session finished"
    );
    Ok(summary)
}

fn handle(session: &mut Session<Vec<u8>>, request: Request, summary: &mut Summary) {
    let options = request.options();
    let result = match request.check {
        CheckKind::Track => {
            session.track(request.vars, &options.problem);
            summary.tracked += 1;
            return;
        }
        CheckKind::Absolute => session.check_absolute(
            parse_json(request.expected, Interpretation::Numeric),
            parse_json(request.answer, Interpretation::Numeric),
            request.tolerance,
            options,
        ),
        CheckKind::Relative => session.check_relative(
            parse_json(request.expected, Interpretation::Numeric),
            parse_json(request.answer, Interpretation::Numeric),
            request.tolerance,
            options,
        ),
        CheckKind::Symbolic => session.check_symbolic(
            parse_json(request.expected, Interpretation::Symbolic),
            parse_json(request.answer, Interpretation::Symbolic),
            options,
        ),
    };
    match result.outcome.category() {
        Category::Correct => summary.correct += 1,
        Category::Incorrect => summary.incorrect += 1,
        Category::Failure => summary.failure += 1,
    }
}
