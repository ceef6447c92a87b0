use std::collections::BTreeSet;
use std::time::Duration;

use autocheck_core::Tracker;
use chrono::Utc;
use serde_json::{json, Map, Value as Json};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::cells::CellHistory;
use crate::delivery::{Delivery, StatsSnapshot};
use crate::error::TrackerError;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, UreqTransport};

#[derive(Debug, Clone)]
pub struct TrackingSettings {
    /// Base URL of the tracking server.
    pub url: String,
    pub queue_capacity: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000".into(),
            queue_capacity: 64,
            timeout: Duration::from_millis(5000),
            retry: RetryPolicy::default(),
        }
    }
}

/// Reports cells and check results for one session to the tracking server.
///
/// Every event is queued for the background worker; reporting never blocks
/// and never fails. Delivery problems surface only in the log.
pub struct NotebookTracker {
    id: Ulid,
    history: Box<dyn CellHistory>,
    seen_inputs: usize,
    seen_outputs: BTreeSet<u64>,
    delivery: Delivery,
    reconciled: StatsSnapshot,
}

impl NotebookTracker {
    /// Tracker posting over HTTP.
    pub fn connect(
        settings: &TrackingSettings,
        history: impl CellHistory + 'static,
    ) -> Result<Self, TrackerError> {
        let transport = UreqTransport::new(settings.timeout);
        Self::with_transport(settings, history, transport)
    }

    /// Start the delivery worker and announce the platform.
    pub fn with_transport(
        settings: &TrackingSettings,
        history: impl CellHistory + 'static,
        transport: impl Transport + 'static,
    ) -> Result<Self, TrackerError> {
        let id = Ulid::new();
        let post_url = format!("{}/hologram/{id}", settings.url.trim_end_matches('/'));
        let delivery = Delivery::start(
            post_url.clone(),
            settings.queue_capacity,
            settings.retry.clone(),
            Box::new(transport),
        )?;
        info!("tracking session {id} to {post_url}");

        let mut tracker = Self {
            id,
            history: Box::new(history),
            seen_inputs: 0,
            seen_outputs: BTreeSet::new(),
            delivery,
            reconciled: StatsSnapshot::default(),
        };
        tracker.track_platform();
        Ok(tracker)
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Stop accepting events and wait for the queue to drain.
    pub fn shutdown(mut self) -> StatsSnapshot {
        let stats = self.delivery.shutdown();
        debug!(
            sent = stats.sent,
            failed = stats.failed,
            dropped = stats.dropped,
            "tracker shut down"
        );
        stats
    }

    fn envelope(&self) -> Map<String, Json> {
        let mut payload = Map::new();
        payload.insert("id".into(), json!(self.id.to_string()));
        payload.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
        payload
    }

    fn send(&mut self, payload: Map<String, Json>) {
        self.reconcile();
        self.delivery.enqueue(Json::Object(payload));
    }

    fn track_platform(&mut self) {
        let mut payload = self.envelope();
        payload.insert(
            "platform".into(),
            json!({
                "os": std::env::consts::OS,
                "arch": std::env::consts::ARCH,
                "family": std::env::consts::FAMILY,
                "version": env!("CARGO_PKG_VERSION"),
            }),
        );
        self.send(payload);
    }

    /// Log delivery failures and drops since the previous reconcile.
    fn reconcile(&mut self) {
        let now = self.delivery.stats();
        let failed = now.failed - self.reconciled.failed;
        let dropped = now.dropped - self.reconciled.dropped;
        if failed > 0 {
            warn!("{failed} tracking event(s) could not be delivered");
        }
        if dropped > 0 {
            warn!("{dropped} tracking event(s) dropped by a full queue");
        }
        self.reconciled = now;
    }
}

impl Tracker for NotebookTracker {
    fn process_new_cells(&mut self) {
        let inputs = self.history.inputs();
        let new_inputs: Vec<String> = inputs.get(self.seen_inputs..).unwrap_or_default().to_vec();
        self.seen_inputs = self.seen_inputs.max(inputs.len());

        let mut new_outputs = Map::new();
        for (count, output) in self.history.outputs() {
            if self.seen_outputs.insert(count) {
                new_outputs.insert(count.to_string(), output);
            }
        }

        if new_inputs.is_empty() && new_outputs.is_empty() {
            return;
        }
        debug!(
            inputs = new_inputs.len(),
            outputs = new_outputs.len(),
            "reporting new cells"
        );
        let mut payload = self.envelope();
        payload.insert("inputs".into(), json!(new_inputs));
        payload.insert("outputs".into(), Json::Object(new_outputs));
        self.send(payload);
    }

    fn process_check_result(&mut self, result: Json) {
        let mut payload = self.envelope();
        payload.insert("check_result".into(), result);
        self.send(payload);
    }
}
