//! Student-facing feedback text. The banners are part of the contract.

use crate::result::CheckResult;
use crate::value::Value;

pub const CORRECT_BANNER: &str = "✅ Success!";
pub const INCORRECT_BANNER: &str = "❌ This answer is incorrect.";
pub const REPEATED_BANNER: &str = "😕 It looks like you tried that answer before. Please try again.";
pub const FAILURE_BANNER: &str = "⚠️ I could not check the answer because there was an error.";
pub const MISSING_HINT: &str = "⚠️ HINT: It looks like you didn't enter an answer.";
pub const POWER_HINT: &str =
    "⚠️ HINT: It looks like you need to use ** to raise to a power (and not ^).";

/// Expression heads produced when `^` or `~` was typed instead of `**`.
const POWER_CONFUSION_HEADS: [&str; 2] = ["Xor", "Not"];

pub fn render_correct() -> String {
    format!("{CORRECT_BANNER}\n")
}

/// Feedback for a first-time incorrect answer. `reveal` prints the expected
/// value instead of the generic message.
pub fn render_incorrect(answer: &Value, expected: Option<&Value>, reveal: bool) -> String {
    let mut out = format!("{INCORRECT_BANNER}\nI got this input\n\n{answer}\n");
    match expected {
        Some(expected) if reveal => {
            out.push_str(&format!(
                "\nbut was expecting this\n\n{expected}\n\nPlease try again.\n"
            ));
        }
        _ => out.push_str("\nbut was expecting something else. Please try again.\n"),
    }
    out
}

pub fn render_repeated() -> String {
    format!("{REPEATED_BANNER}\n")
}

/// Failure banner, the answer as received, and a hint when one applies.
pub fn render_failure(answer: &Value) -> String {
    let mut out = format!("{FAILURE_BANNER}\nI got this input\n\n{answer}\n\n");
    if let Some(hint) = failure_hint(answer) {
        out.push_str(hint);
        out.push('\n');
    }
    out
}

pub fn failure_hint(answer: &Value) -> Option<&'static str> {
    if answer.is_missing() {
        Some(MISSING_HINT)
    } else if POWER_CONFUSION_HEADS.contains(&answer.type_name()) {
        Some(POWER_HINT)
    } else {
        None
    }
}

/// Full feedback for a failed check: the diagnostic line first.
pub fn render_failure_result(result: &CheckResult) -> String {
    let mut out = String::new();
    if let Some(error) = result.error() {
        out.push_str(error);
        out.push('\n');
    }
    out.push_str(&render_failure(&result.answer));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::fmt;

    #[derive(Debug)]
    struct Xor;

    impl fmt::Display for Xor {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "n ^ (n + 2)")
        }
    }

    impl crate::Symbolic for Xor {
        fn type_name(&self) -> &str {
            "Xor"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_correct_output() {
        assert_eq!(render_correct(), "✅ Success!\n");
    }

    #[test]
    fn test_incorrect_output() {
        let out = render_incorrect(&Value::Int(124), Some(&Value::Int(123)), false);
        assert_eq!(
            out,
            "❌ This answer is incorrect.\nI got this input\n\n124\n\n\
             but was expecting something else. Please try again.\n"
        );
    }

    #[test]
    fn test_incorrect_output_with_reveal() {
        let out = render_incorrect(&Value::Int(124), Some(&Value::Int(123)), true);
        assert_eq!(
            out,
            "❌ This answer is incorrect.\nI got this input\n\n124\n\n\
             but was expecting this\n\n123\n\nPlease try again.\n"
        );
    }

    #[test]
    fn test_reveal_without_expected_is_generic() {
        let out = render_incorrect(&Value::Int(1), None, true);
        assert!(out.ends_with("but was expecting something else. Please try again.\n"));
    }

    #[test]
    fn test_empty_answer_output() {
        assert_eq!(
            render_failure(&Value::Missing),
            "⚠️ I could not check the answer because there was an error.\n\
             I got this input\n\n...\n\n\
             ⚠️ HINT: It looks like you didn't enter an answer.\n"
        );
    }

    #[test]
    fn test_xor_output() {
        assert_eq!(
            render_failure(&Value::symbolic(Xor)),
            "⚠️ I could not check the answer because there was an error.\n\
             I got this input\n\nn ^ (n + 2)\n\n\
             ⚠️ HINT: It looks like you need to use ** to raise to a power (and not ^).\n"
        );
    }

    #[test]
    fn test_failure_without_hint() {
        let out = render_failure(&Value::Text("abc".into()));
        assert!(out.ends_with("abc\n\n"));
        assert_eq!(failure_hint(&Value::Int(3)), None);
    }
}
