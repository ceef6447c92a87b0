//! Turn errors and panics from checks and callbacks into one-line diagnostics.
//!
//! Students only ever see the last line of a diagnostic. Panics raised inside
//! [`capture`] are caught and the default panic report is silenced for the
//! current thread while the closure runs.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// A captured error, reduced to its final diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub message: String,
}

impl fmt::Display for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

thread_local! {
    static CAPTURING: Cell<usize> = const { Cell::new(0) };
}

static HOOK: Once = Once::new();

fn install_quiet_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(Cell::get) == 0 {
                previous(info);
            }
        }));
    });
}

struct CaptureGuard;

impl CaptureGuard {
    fn enter() -> Self {
        CAPTURING.with(|c| c.set(c.get() + 1));
        Self
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURING.with(|c| c.set(c.get().saturating_sub(1)));
    }
}

/// Run `f`, returning its value or the last line of whatever went wrong.
pub fn capture<T, E, F>(f: F) -> Result<T, Captured>
where
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    install_quiet_hook();
    let outcome = {
        let _guard = CaptureGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(f))
    };
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Captured {
            message: last_line(&e.to_string()),
        }),
        Err(payload) => Err(Captured {
            message: last_line(&panic_message(payload.as_ref())),
        }),
    }
}

/// Last non-empty line of a (possibly multi-line) description.
pub fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "check panicked".to_string()
    }
}
