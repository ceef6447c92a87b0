pub mod cells;
pub mod delivery;
pub mod error;
pub mod retry;
pub mod tracker;
pub mod transport;

pub use cells::{CellHistory, CellLog, SharedCellLog};
pub use delivery::{Delivery, DeliveryStats, StatsSnapshot};
pub use error::{TrackerError, TransportError};
pub use retry::RetryPolicy;
pub use tracker::{NotebookTracker, TrackingSettings};
pub use transport::{Transport, UreqTransport};
