//! Per-relay connection state, threaded explicitly through the relay loop.
//!
//! At most one endpoint is current at any time; the loop never forwards
//! while the endpoint is being replaced, so switching is atomic from its
//! perspective. Reconnection is lazy: nothing polls in the background, a
//! re-resolve happens only right before a forward while disconnected.

use std::path::PathBuf;
use std::time::Duration;

use crate::registry::Registry;
use crate::resolve::{self, Endpoint, Selector};

/// Resolve attempts when first establishing a connection. After these the
/// relay reports offline instead of polling.
const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Disconnected,
    Connected(Endpoint),
}

impl Connection {
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            Self::Connected(endpoint) => Some(*endpoint),
            Self::Disconnected => None,
        }
    }
}

/// Everything one relay process knows about its target host.
pub struct RelaySession {
    pub selector: Selector,
    pub cwd: PathBuf,
    /// Solution descriptors discovered by the auto walk, kept for the
    /// disambiguation hint in locally-answered `initialize` responses.
    pub candidates: Vec<PathBuf>,
    pub connection: Connection,
}

impl RelaySession {
    pub fn new(selector: Selector, cwd: PathBuf) -> Self {
        Self {
            selector,
            cwd,
            candidates: Vec::new(),
            connection: Connection::Disconnected,
        }
    }

    /// Establish the initial connection with a bounded number of resolve
    /// attempts. Leaves the session disconnected when all attempts fail.
    pub fn connect(&mut self, registry: &Registry) -> Option<Endpoint> {
        for attempt in 1..=CONNECT_ATTEMPTS {
            if let Some(endpoint) = self.resolve_once(registry) {
                return Some(endpoint);
            }
            if attempt < CONNECT_ATTEMPTS {
                std::thread::sleep(CONNECT_RETRY_DELAY);
            }
        }
        tracing::info!(
            attempts = CONNECT_ATTEMPTS,
            "no reachable host instance found, starting offline"
        );
        None
    }

    /// Exactly one immediate re-resolve, used after a transport failure or
    /// before forwarding while disconnected. A failed attempt leaves the
    /// state unchanged (still disconnected).
    pub fn reconnect(&mut self, registry: &Registry) -> Option<Endpoint> {
        self.resolve_once(registry)
    }

    pub fn disconnect(&mut self) {
        if let Connection::Connected(endpoint) = self.connection {
            tracing::info!(pid = endpoint.pid, port = endpoint.port, "host endpoint lost");
        }
        self.connection = Connection::Disconnected;
    }

    fn resolve_once(&mut self, registry: &Registry) -> Option<Endpoint> {
        let resolution = resolve::resolve(registry, &self.selector, &self.cwd);
        self.candidates = resolution.candidates;
        if let Some(endpoint) = resolution.endpoint {
            tracing::debug!(pid = endpoint.pid, port = endpoint.port, "resolved host endpoint");
            self.connection = Connection::Connected(endpoint);
            Some(endpoint)
        } else {
            None
        }
    }
}
