//! HTTP transport to the host's local automation endpoint.
//!
//! The host exposes a single `POST /mcp` endpoint taking a JSON-RPC request
//! body (a `204 No Content` reply means "notification, nothing to relay")
//! and a `GET /health` endpoint reporting instance identity.
//!
//! Two timeouts apply to a capability invocation: a short liveness probe
//! against `/health`, then the call itself under a much longer deadline.
//! The call deadline must exceed the host's own worst-case internal timeout
//! (its UI thread can block for a long time), otherwise a host-side slow
//! success would be misreported here as a failure.

use std::time::Duration;

use serde::Deserialize;
use ureq::Agent;
use ureq::http::StatusCode;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::resolve::Endpoint;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const CALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection refused/reset or other socket-level failure. The endpoint
    /// is gone; the session should demote to disconnected.
    #[error("host endpoint unreachable: {0}")]
    Unreachable(String),

    /// The host accepted the probe connection but did not answer in time;
    /// its UI thread is likely blocked.
    #[error("host did not answer the liveness probe within {0:?}")]
    ProbeTimeout(Duration),

    /// The host was reachable but the call did not finish in time. Distinct
    /// from unreachable: the host may be slow, not dead, so the connection
    /// state is kept.
    #[error("host did not answer within {0:?}")]
    Timeout(Duration),

    /// The host answered with something that is not a JSON-RPC response.
    #[error("invalid response from host: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Timeouts keep the connection; everything else demotes it.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ProbeTimeout(_))
    }
}

/// Host workspace state reported by `GET /health`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostHealth {
    pub pid: u32,
    pub port: u16,
    #[serde(default)]
    pub solution_loaded: bool,
}

/// Seam between the relay loop and the network, mockable in tests.
pub trait HostTransport {
    fn probe(&self, endpoint: Endpoint) -> Result<HostHealth, TransportError>;

    /// Forward one JSON-RPC request. `Ok(None)` means the host signalled
    /// "no content" (notification-style call, nothing to write back).
    fn forward(
        &self,
        endpoint: Endpoint,
        request: &JsonRpcRequest,
    ) -> Result<Option<JsonRpcResponse>, TransportError>;
}

pub struct HttpTransport {
    call_agent: Agent,
    probe_agent: Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            call_agent: agent_with_timeout(CALL_TIMEOUT),
            probe_agent: agent_with_timeout(PROBE_TIMEOUT),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn agent_with_timeout(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .new_agent()
}

impl HostTransport for HttpTransport {
    fn probe(&self, endpoint: Endpoint) -> Result<HostHealth, TransportError> {
        let url = format!("http://127.0.0.1:{}/health", endpoint.port);
        let mut response = self
            .probe_agent
            .get(&url)
            .call()
            .map_err(|e| classify(e, TransportError::ProbeTimeout(PROBE_TIMEOUT)))?;
        if !response.status().is_success() {
            return Err(TransportError::Protocol(format!(
                "health check returned status {}",
                response.status()
            )));
        }
        response
            .body_mut()
            .read_json::<HostHealth>()
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }

    fn forward(
        &self,
        endpoint: Endpoint,
        request: &JsonRpcRequest,
    ) -> Result<Option<JsonRpcResponse>, TransportError> {
        let url = format!("http://127.0.0.1:{}/mcp", endpoint.port);
        tracing::debug!(method = %request.method, port = endpoint.port, "forwarding to host");
        let mut response = self
            .call_agent
            .post(&url)
            .send_json(request)
            .map_err(|e| classify(e, TransportError::Timeout(CALL_TIMEOUT)))?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TransportError::Protocol(format!(
                "host returned status {}",
                response.status()
            )));
        }
        response
            .body_mut()
            .read_json::<JsonRpcResponse>()
            .map(Some)
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }
}

fn classify(err: ureq::Error, on_timeout: TransportError) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => on_timeout,
        other => TransportError::Unreachable(other.to_string()),
    }
}
