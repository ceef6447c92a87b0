//! Background delivery: a bounded channel drained by one worker thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::error::{TrackerError, TransportError};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

const HTTP_OK: u16 = 200;

#[derive(Debug, Default)]
pub struct DeliveryStats {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl DeliveryStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

pub struct Delivery {
    sender: Option<SyncSender<Json>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<DeliveryStats>,
}

impl Delivery {
    /// Spawn the worker. Payloads are posted to `url` in enqueue order.
    pub fn start(
        url: String,
        capacity: usize,
        policy: RetryPolicy,
        transport: Box<dyn Transport>,
    ) -> Result<Self, TrackerError> {
        let (sender, receiver) = mpsc::sync_channel::<Json>(capacity);
        let stats = Arc::new(DeliveryStats::default());
        let worker_stats = Arc::clone(&stats);

        let worker = thread::Builder::new()
            .name("autocheck-delivery".into())
            .spawn(move || {
                for payload in receiver {
                    deliver(transport.as_ref(), &url, &payload, &policy, &worker_stats);
                }
                debug!("delivery worker stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            stats,
        })
    }

    /// Queue a payload without blocking. A full queue drops it.
    pub fn enqueue(&self, payload: Json) -> bool {
        let Some(sender) = &self.sender else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        match sender.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("tracking queue full, event dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("delivery worker gone, event dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the queue and wait for queued payloads to be delivered.
    pub fn shutdown(&mut self) -> StatsSnapshot {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("delivery worker panicked");
            }
        }
        self.stats()
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn deliver(
    transport: &dyn Transport,
    url: &str,
    payload: &Json,
    policy: &RetryPolicy,
    stats: &DeliveryStats,
) {
    let result = policy.run(|| match transport.post(url, payload)? {
        HTTP_OK => Ok(()),
        status => Err(TransportError::Status(status)),
    });
    match result {
        Ok(()) => {
            stats.sent.fetch_add(1, Ordering::Relaxed);
            debug!("delivered event to {url}");
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!("giving up on event for {url}: {e}");
        }
    }
}
