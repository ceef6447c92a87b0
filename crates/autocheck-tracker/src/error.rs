use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server answered with status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to start the delivery worker: {0}")]
    Spawn(#[from] std::io::Error),
}
