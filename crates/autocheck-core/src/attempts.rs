use std::collections::HashMap;

use crate::value::Value;

/// Incorrect answers seen so far, per problem, in the order they arrived.
///
/// Answers are compared by their text, so `0.5` and `1/2` count as two
/// different attempts.
#[derive(Debug, Default)]
pub struct AttemptCache {
    attempts: HashMap<String, Vec<String>>,
}

impl AttemptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an incorrect answer. Returns `true` the first time this answer
    /// text is seen for `problem`, `false` (and leaves the cache untouched)
    /// afterwards.
    pub fn record_attempt(&mut self, problem: &str, answer: &Value) -> bool {
        let text = answer.to_string();
        let seen = self.attempts.entry(problem.to_string()).or_default();
        if seen.contains(&text) {
            false
        } else {
            seen.push(text);
            true
        }
    }

    /// Number of distinct incorrect answers recorded for `problem`.
    pub fn distinct_attempts(&self, problem: &str) -> usize {
        self.attempts.get(problem).map_or(0, Vec::len)
    }

    pub fn attempts(&self, problem: &str) -> &[String] {
        self.attempts.get(problem).map_or(&[], Vec::as_slice)
    }
}
