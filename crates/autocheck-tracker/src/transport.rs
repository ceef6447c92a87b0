use std::time::Duration;

use serde_json::Value as Json;

use crate::error::TransportError;

/// Posts one JSON payload and reports the HTTP status.
pub trait Transport: Send {
    fn post(&self, url: &str, payload: &Json) -> Result<u16, TransportError>;
}

/// Blocking HTTP transport.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn post(&self, url: &str, payload: &Json) -> Result<u16, TransportError> {
        match self.agent.post(url).send_json(payload) {
            Ok(response) => Ok(response.status()),
            // non-2xx is a status, not a transport failure
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(e) => Err(TransportError::Request(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unreachable_host_is_request_error() {
        let transport = UreqTransport::new(Duration::from_millis(200));
        // port 9 (discard) on localhost is closed on any sane test machine
        let err = transport
            .post("http://127.0.0.1:9/hologram/x", &json!({}))
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
