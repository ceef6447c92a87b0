//! The result processor and the public check entry points.

use std::io::{self, Write};

use serde_json::{json, Value as Json};
use tracing::{debug, warn};

use crate::attempts::AttemptCache;
use crate::capture::{capture, Captured};
use crate::check::{CheckFunction, CheckOptions};
use crate::compare;
use crate::feedback;
use crate::result::{Category, CheckResult, Outcome, ProblemRef};
use crate::simplify::Simplifier;
use crate::tracker::Tracker;
use crate::value::Value;

/// Session-wide defaults, normally read from configuration at startup.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Distinct incorrect answers required before the expected one is shown.
    pub reveal_after: usize,
    pub show_answer: bool,
    pub absolute_tolerance: f64,
    pub relative_tolerance: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reveal_after: 2,
            show_answer: false,
            absolute_tolerance: compare::DEFAULT_ABSOLUTE_TOLERANCE,
            relative_tolerance: compare::DEFAULT_RELATIVE_TOLERANCE,
        }
    }
}

/// One learner's checking session: owns the attempt history, the feedback
/// writer and the optional simplifier and tracker.
pub struct Session<W: Write = io::Stdout> {
    out: W,
    attempts: AttemptCache,
    settings: SessionSettings,
    simplifier: Option<Box<dyn Simplifier>>,
    tracker: Option<Box<dyn Tracker>>,
}

impl Session<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Session<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            attempts: AttemptCache::new(),
            settings: SessionSettings::default(),
            simplifier: None,
            tracker: None,
        }
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_simplifier(mut self, simplifier: impl Simplifier + 'static) -> Self {
        self.simplifier = Some(Box::new(simplifier));
        self
    }

    pub fn with_tracker(mut self, tracker: impl Tracker + 'static) -> Self {
        self.tracker = Some(Box::new(tracker));
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn attempts(&self) -> &AttemptCache {
        &self.attempts
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    // --- Entry points ---

    /// Check an answer with a user-defined function.
    pub fn check_function(
        &mut self,
        function: &dyn CheckFunction,
        answer: impl Into<Value>,
        options: CheckOptions<'_>,
    ) -> CheckResult {
        let answer = answer.into();
        let result = match capture(|| function.check(&answer)) {
            Ok(judgement) => {
                let mut result = CheckResult::new(
                    answer,
                    Some(judgement.expected),
                    unchecked_outcome(judgement.passed),
                );
                result.extra = judgement.extra;
                result
            }
            Err(captured) => CheckResult::new(answer, None, failure(captured)),
        };
        self.process_result(result, options)
    }

    /// Check that two symbolic expressions are equivalent.
    pub fn check_symbolic(
        &mut self,
        expected: impl Into<Value>,
        answer: impl Into<Value>,
        options: CheckOptions<'_>,
    ) -> CheckResult {
        let (expected, answer) = (expected.into(), answer.into());
        let simplifier = self.simplifier.as_deref();
        let verdict = capture(|| compare::symbolic(simplifier, &expected, &answer));
        self.process_verdict(expected, answer, verdict, options)
    }

    /// `|answer - expected| <= tolerance`; the default tolerance demands equality.
    pub fn check_absolute(
        &mut self,
        expected: impl Into<Value>,
        answer: impl Into<Value>,
        tolerance: Option<f64>,
        options: CheckOptions<'_>,
    ) -> CheckResult {
        let (expected, answer) = (expected.into(), answer.into());
        let tolerance = tolerance.unwrap_or(self.settings.absolute_tolerance);
        let verdict = capture(|| compare::absolute(&expected, &answer, tolerance));
        self.process_verdict(expected, answer, verdict, options)
    }

    /// `|answer / expected - 1| <= tolerance`.
    pub fn check_relative(
        &mut self,
        expected: impl Into<Value>,
        answer: impl Into<Value>,
        tolerance: Option<f64>,
        options: CheckOptions<'_>,
    ) -> CheckResult {
        let (expected, answer) = (expected.into(), answer.into());
        let tolerance = tolerance.unwrap_or(self.settings.relative_tolerance);
        let verdict = capture(|| compare::relative(&expected, &answer, tolerance));
        self.process_verdict(expected, answer, verdict, options)
    }

    /// Forward arbitrary variables to the tracker without checking anything.
    /// Does nothing unless the problem has a name and a course.
    pub fn track(&mut self, vars: Json, problem: &ProblemRef) {
        if !problem.is_trackable() {
            return;
        }
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        tracker.process_new_cells();
        tracker.process_check_result(json!({
            "name": problem.name,
            "course": problem.course,
            "lp": problem.lp,
            "workbook": problem.workbook,
            "track_vars": vars,
        }));
    }

    // --- Result processing ---

    fn process_verdict(
        &mut self,
        expected: Value,
        answer: Value,
        verdict: Result<bool, Captured>,
        options: CheckOptions<'_>,
    ) -> CheckResult {
        let outcome = match verdict {
            Ok(passed) => unchecked_outcome(passed),
            Err(captured) => failure(captured),
        };
        self.process_result(CheckResult::new(answer, Some(expected), outcome), options)
    }

    /// Categorize a raw result, update the attempt history, print feedback,
    /// run the matching callback and report to the tracker. Never fails.
    pub fn process_result(
        &mut self,
        mut result: CheckResult,
        options: CheckOptions<'_>,
    ) -> CheckResult {
        let CheckOptions {
            problem,
            show_answer,
            mut callbacks,
            enable_tracking,
        } = options;

        let tracking = enable_tracking && problem.is_trackable() && self.tracker.is_some();
        if tracking {
            if let Some(tracker) = self.tracker.as_mut() {
                tracker.process_new_cells();
            }
        }
        result.problem = problem;
        let show_answer = show_answer.unwrap_or(self.settings.show_answer);

        let text = match result.outcome {
            Outcome::Failure { .. } => feedback::render_failure_result(&result),
            Outcome::Correct => feedback::render_correct(),
            Outcome::Incorrect { .. } => {
                let key = result.problem.cache_key().to_string();
                let prior = self.attempts.distinct_attempts(&key);
                let unique = self.attempts.record_attempt(&key, &result.answer);
                result.outcome = Outcome::Incorrect { unique };
                if unique {
                    let reveal = show_answer && prior >= self.settings.reveal_after;
                    feedback::render_incorrect(&result.answer, result.expected.as_ref(), reveal)
                } else {
                    feedback::render_repeated()
                }
            }
        };
        self.emit(&text);

        let category = result.outcome.category();
        let callback = match category {
            Category::Correct => callbacks.on_correct.as_mut(),
            Category::Incorrect => callbacks.on_incorrect.as_mut(),
            Category::Failure => callbacks.on_failure.as_mut(),
        };
        if let Some(callback) = callback {
            if let Err(captured) = capture(|| callback(&result)) {
                self.emit(&format!("{captured}\n"));
            }
        }

        debug!(
            problem = result.problem.cache_key(),
            %category,
            "check processed"
        );

        if tracking {
            if let Some(tracker) = self.tracker.as_mut() {
                tracker.process_check_result(result.to_payload());
            }
        }
        result
    }

    fn emit(&mut self, text: &str) {
        let written = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            warn!("failed to write feedback: {e}");
        }
    }
}

/// Outcome before the attempt history is consulted.
fn unchecked_outcome(passed: bool) -> Outcome {
    if passed {
        Outcome::Correct
    } else {
        Outcome::Incorrect { unique: true }
    }
}

fn failure(captured: Captured) -> Outcome {
    Outcome::Failure {
        error: captured.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::result::Judgement;
    use std::cell::RefCell;
    use std::rc::Rc;

    const CORRECT: &str = "✅ Success!\n";

    fn incorrect(answer: &str) -> String {
        format!(
            "❌ This answer is incorrect.\nI got this input\n\n{answer}\n\n\
             but was expecting something else. Please try again.\n"
        )
    }

    fn session() -> Session<Vec<u8>> {
        Session::new(Vec::new())
    }

    fn take_output(session: &mut Session<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(session.output_mut())).unwrap()
    }

    #[derive(Default)]
    struct Recorded {
        cells: usize,
        results: Vec<Json>,
    }

    #[derive(Clone, Default)]
    struct RecordingTracker(Rc<RefCell<Recorded>>);

    impl Tracker for RecordingTracker {
        fn process_new_cells(&mut self) {
            self.0.borrow_mut().cells += 1;
        }

        fn process_check_result(&mut self, result: Json) {
            self.0.borrow_mut().results.push(result);
        }
    }

    /// Whitespace-insensitive text comparison, enough to drive the plumbing.
    struct TextSimplifier;

    impl Simplifier for TextSimplifier {
        fn equivalent(&self, expected: &Value, answer: &Value) -> Result<bool, BoxError> {
            let strip = |v: &Value| v.to_string().replace(' ', "");
            match answer {
                Value::Text(_) => Ok(strip(expected) == strip(answer)),
                other => Err(format!("cannot simplify {}", other.type_name()).into()),
            }
        }
    }

    fn sentence_check(answer: &Value) -> Result<Judgement, BoxError> {
        let expected = "the cat sat on the mat";
        let passed = matches!(answer, Value::Text(s) if s == expected);
        Ok(Judgement::new(passed, expected))
    }

    #[test]
    fn test_check_function() {
        let mut s = session();
        let r = s.check_function(&sentence_check, "the cat sat on the mat", CheckOptions::new());
        assert!(r.passed());
        assert_eq!(take_output(&mut s), CORRECT);

        let r = s.check_function(&sentence_check, "the mat sat on the cat", CheckOptions::new());
        assert_eq!(r.unique(), Some(true));
        assert_eq!(take_output(&mut s), incorrect("the mat sat on the cat"));
    }

    #[test]
    fn test_check_function_error_keeps_last_line() {
        let mut s = session();
        let check = |_: &Value| -> Result<Judgement, BoxError> {
            Err("while parsing the answer\nValueError: could not convert 'abc'".into())
        };
        let r = s.check_function(&check, "abc", CheckOptions::new());
        assert_eq!(r.error(), Some("ValueError: could not convert 'abc'"));
        assert!(r.expected.is_none());
        let out = take_output(&mut s);
        assert!(out.starts_with(
            "ValueError: could not convert 'abc'\n\
             ⚠️ I could not check the answer because there was an error.\n"
        ));
        assert!(!out.contains("while parsing"));
    }

    #[test]
    fn test_check_function_panic_is_failure() {
        let mut s = session();
        let check = |answer: &Value| -> Result<Judgement, BoxError> {
            let items = match answer {
                Value::List(items) => items,
                _ => panic!("expected a list of vowels"),
            };
            Ok(Judgement::new(items.len() == 5, vec!["A", "E", "I", "O", "U"]))
        };
        let r = s.check_function(&check, 42, CheckOptions::new());
        assert_eq!(r.error(), Some("expected a list of vowels"));
    }

    #[test]
    fn test_check_function_extra_fields_reach_tracker() {
        let tracker = RecordingTracker::default();
        let mut s = session().with_tracker(tracker.clone());
        let check = |answer: &Value| -> Result<Judgement, BoxError> {
            Ok(Judgement::new(answer.to_string() == "5", 5).with_extra("hint_level", 2))
        };
        let problem = ProblemRef::named("p").with_course("cs114");
        s.check_function(&check, 5, CheckOptions::for_problem(problem));
        let recorded = tracker.0.borrow();
        assert_eq!(recorded.results[0]["hint_level"], json!(2));
        assert_eq!(recorded.results[0]["expected"], json!(5));
    }

    #[test]
    fn test_check_absolute_numeric() {
        let mut s = session();
        s.check_absolute(123, 123.1, Some(0.5), CheckOptions::new());
        assert_eq!(take_output(&mut s), CORRECT);
        s.check_absolute(123, 124, Some(0.5), CheckOptions::new());
        assert_eq!(take_output(&mut s), incorrect("124"));
    }

    #[test]
    fn test_check_relative_numeric() {
        let mut s = session();
        s.check_relative(1, 1.01, Some(0.05), CheckOptions::new());
        assert_eq!(take_output(&mut s), CORRECT);
        s.check_relative(1, 1.1, Some(0.05), CheckOptions::new());
        assert_eq!(take_output(&mut s), incorrect("1.1"));
    }

    #[test]
    fn test_default_tolerances_come_from_settings() {
        let settings = SessionSettings {
            absolute_tolerance: 0.1,
            ..SessionSettings::default()
        };
        let mut s = session().with_settings(settings);
        assert!(s.check_absolute(1.0, 1.05, None, CheckOptions::new()).passed());
        assert!(!s.check_relative(1.0, 1.05, None, CheckOptions::new()).passed());
    }

    #[test]
    fn test_check_symbolic_uses_simplifier() {
        let mut s = session().with_simplifier(TextSimplifier);
        assert!(s.check_symbolic("x + 1", "x+1", CheckOptions::new()).passed());
        let r = s.check_symbolic("x + 1", 3, CheckOptions::new());
        assert_eq!(r.error(), Some("cannot simplify int"));
    }

    #[test]
    fn test_check_symbolic_without_simplifier_fails() {
        let mut s = session();
        let r = s.check_symbolic("x", "x", CheckOptions::new());
        assert_eq!(r.outcome.category(), Category::Failure);
    }

    #[test]
    fn test_repeated_correct_is_idempotent() {
        let mut s = session();
        for _ in 0..3 {
            s.check_absolute(10, 10, None, CheckOptions::for_problem(ProblemRef::named("p")));
            assert_eq!(take_output(&mut s), CORRECT);
        }
        assert_eq!(s.attempts().distinct_attempts("p"), 0);
    }

    #[test]
    fn test_repeated_incorrect_answer() {
        let mut s = session();
        let opts = || CheckOptions::for_problem(ProblemRef::named("p"));
        assert_eq!(s.check_absolute(10, 11, None, opts()).unique(), Some(true));
        take_output(&mut s);
        let other = CheckOptions::for_problem(ProblemRef::named("q"));
        assert_eq!(s.check_absolute(10, 12, None, other).unique(), Some(true));
        take_output(&mut s);
        assert_eq!(s.check_absolute(10, 11, None, opts()).unique(), Some(false));
        assert_eq!(
            take_output(&mut s),
            "😕 It looks like you tried that answer before. Please try again.\n"
        );
    }

    #[test]
    fn test_reveal_after_two_distinct_attempts() {
        let mut s = session();
        let opts = || CheckOptions::for_problem(ProblemRef::named("reveal")).show_answer(true);

        s.check_absolute(10, 1, None, opts());
        assert_eq!(take_output(&mut s), incorrect("1"));
        // a repeat does not count toward the threshold
        s.check_absolute(10, 1, None, opts());
        take_output(&mut s);
        s.check_absolute(10, 2, None, opts());
        assert_eq!(take_output(&mut s), incorrect("2"));
        s.check_absolute(10, 3, None, opts());
        assert_eq!(
            take_output(&mut s),
            "❌ This answer is incorrect.\nI got this input\n\n3\n\n\
             but was expecting this\n\n10\n\nPlease try again.\n"
        );
    }

    #[test]
    fn test_no_reveal_without_show_answer() {
        let mut s = session();
        for answer in 1..=4 {
            s.check_absolute(10, answer, None, CheckOptions::for_problem(ProblemRef::named("p")));
            assert_eq!(take_output(&mut s), incorrect(&answer.to_string()));
        }
    }

    #[test]
    fn test_missing_answer_hint() {
        let mut s = session();
        let r = s.check_absolute(10, Value::Missing, None, CheckOptions::new());
        assert_eq!(r.outcome.category(), Category::Failure);
        assert_eq!(
            take_output(&mut s),
            "unsupported operand type(s) for -: 'Missing' and 'int'\n\
             ⚠️ I could not check the answer because there was an error.\n\
             I got this input\n\n...\n\n\
             ⚠️ HINT: It looks like you didn't enter an answer.\n"
        );
    }

    #[test]
    fn test_callback_with_error_is_reported() {
        let mut s = session();
        let opts = CheckOptions::new().on_correct(|_| Err("I made a whoopsie".into()));
        let r = s.check_absolute(1, 1, None, opts);
        assert!(r.passed());
        assert_eq!(take_output(&mut s), format!("{CORRECT}I made a whoopsie\n"));
    }

    #[test]
    fn test_callback_panic_is_reported() {
        let mut s = session();
        let opts = CheckOptions::new().on_incorrect(|_| panic!("callback exploded"));
        let r = s.check_absolute(1, 2, None, opts);
        assert_eq!(r.unique(), Some(true));
        assert!(take_output(&mut s).ends_with("callback exploded\n"));
    }

    #[test]
    fn test_callback_matches_category() {
        let mut s = session();
        let seen = RefCell::new(Vec::new());
        let opts = CheckOptions::new()
            .on_correct(|r| {
                seen.borrow_mut().push(format!("correct {}", r.answer));
                Ok(())
            })
            .on_incorrect(|r| {
                seen.borrow_mut().push(format!("incorrect {}", r.answer));
                Ok(())
            })
            .on_failure(|r| {
                seen.borrow_mut().push(format!("failure {}", r.answer));
                Ok(())
            });
        s.check_absolute(1, "one", None, opts);
        assert_eq!(seen.borrow().as_slice(), ["failure one"]);
    }

    #[test]
    fn test_course_and_problem_identifiers() {
        let tracker = RecordingTracker::default();
        let mut s = session().with_tracker(tracker.clone());
        let problem = ProblemRef::named("test_problem")
            .with_course("cs114")
            .with_lp("1")
            .with_workbook("pcw");
        s.check_absolute(10, 10, None, CheckOptions::for_problem(problem));
        let recorded = tracker.0.borrow();
        assert_eq!(recorded.cells, 1);
        assert_eq!(
            recorded.results,
            vec![json!({
                "name": "test_problem", "course": "cs114", "lp": "1", "workbook": "pcw",
                "passed": true, "answer": 10, "expected": 10
            })]
        );
    }

    #[test]
    fn test_tracking_requires_name_and_course() {
        let tracker = RecordingTracker::default();
        let mut s = session().with_tracker(tracker.clone());
        s.check_absolute(10, 10, None, CheckOptions::for_problem(ProblemRef::named("p")));
        s.check_absolute(
            10,
            10,
            None,
            CheckOptions::for_problem(ProblemRef::named("p").with_course("c")).without_tracking(),
        );
        let recorded = tracker.0.borrow();
        assert_eq!(recorded.cells, 0);
        assert!(recorded.results.is_empty());
    }

    #[test]
    fn test_incorrect_payload_carries_unique() {
        let tracker = RecordingTracker::default();
        let mut s = session().with_tracker(tracker.clone());
        let opts = || CheckOptions::for_problem(ProblemRef::named("p").with_course("c"));
        s.check_absolute(10, 11, None, opts());
        s.check_absolute(10, 11, None, opts());
        let recorded = tracker.0.borrow();
        assert_eq!(recorded.results[0]["unique"], json!(true));
        assert_eq!(recorded.results[1]["unique"], json!(false));
        assert_eq!(recorded.results[1]["passed"], json!(false));
    }

    #[test]
    fn test_track_vars() {
        let tracker = RecordingTracker::default();
        let mut s = session().with_tracker(tracker.clone());
        let problem = ProblemRef::named("test_problem")
            .with_course("cs114")
            .with_lp("1")
            .with_workbook("pcw");
        s.track(json!({"test": "vars", "0": 1}), &problem);
        let recorded = tracker.0.borrow();
        assert_eq!(
            recorded.results,
            vec![json!({
                "name": "test_problem", "course": "cs114", "lp": "1", "workbook": "pcw",
                "track_vars": {"test": "vars", "0": 1}
            })]
        );
        assert!(s.output().is_empty());
    }

    #[test]
    fn test_track_without_course_does_nothing() {
        let tracker = RecordingTracker::default();
        let mut s = session().with_tracker(tracker.clone());
        s.track(json!({"x": 1}), &ProblemRef::named("p"));
        assert_eq!(tracker.0.borrow().cells, 0);
        assert!(tracker.0.borrow().results.is_empty());
    }
}
