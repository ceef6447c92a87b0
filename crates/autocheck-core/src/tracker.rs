use serde_json::Value as Json;

/// Best-effort reporting channel for check outcomes.
///
/// Calls must return promptly: delivery happens elsewhere and failures are
/// never surfaced to the caller.
pub trait Tracker {
    /// Report notebook cells entered since the previous call.
    fn process_new_cells(&mut self);

    /// Report one finalized check (or a `track` call's variables).
    fn process_check_result(&mut self, result: Json);
}
