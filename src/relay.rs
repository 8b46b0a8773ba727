//! The client-facing relay loop.
//!
//! Reads one newline-delimited JSON-RPC message from the client, fully
//! resolves a response (which may include one outbound call to the host),
//! writes it, then reads the next message. Request N+1 is not read until
//! request N's response (or the decision not to respond) is committed, so
//! responses are always in order and no locking is needed.
//!
//! Invariant: exactly one response line per request bearing an id, zero
//! lines for notifications and for unparseable input.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::ToolCache;
use crate::error::Result;
use crate::installs;
use crate::protocol::{
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
    ServerCapabilities, ServerInfo, ToolsCallResult, ToolsCapability,
};
use crate::registry::Registry;
use crate::session::RelaySession;
use crate::transport::{HostTransport, TransportError};

pub struct Relay<T: HostTransport> {
    pub(crate) registry: Registry,
    pub(crate) session: RelaySession,
    transport: T,
    cache: ToolCache,
    shutdown: Arc<AtomicBool>,
    detect_installs: fn() -> Vec<String>,
}

/// What one forwarding attempt produced.
enum Forward {
    Replied(JsonRpcResponse),
    /// Host signalled "no content" (notification-style call).
    NoContent,
    /// Host reachable but slow; connection state is kept.
    Timeout(TransportError),
    /// No endpoint, or the transport failed; the session has already been
    /// demoted and given its one immediate re-resolve.
    Offline,
}

impl<T: HostTransport> Relay<T> {
    pub fn new(
        registry: Registry,
        session: RelaySession,
        transport: T,
        cache: ToolCache,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            registry,
            session,
            transport,
            cache,
            shutdown,
            detect_installs: installs::detect_installs,
        }
    }

    #[cfg(test)]
    fn with_installs(mut self, detect: fn() -> Vec<String>) -> Self {
        self.detect_installs = detect;
        self
    }

    /// Run until EOF on `input` or a shutdown signal.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        for line in input.lines() {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("shutdown requested, closing relay loop");
                break;
            }
            let line = line?;
            let Some(response) = self.handle_line(&line) else {
                continue;
            };
            let json = serde_json::to_string(&response)?;
            writeln!(output, "{json}")?;
            output.flush()?;
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(request) => request,
            Err(e) => {
                // Dropped rather than answered: a corrupt line must not
                // desynchronize the stream framing.
                tracing::debug!(error = %e, "dropping unparseable input line");
                return None;
            }
        };
        self.dispatch(request)
    }

    fn dispatch(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // A message without an id never gets a response line, whatever its
        // method: acknowledgements are expected, anything else is dropped.
        if request.is_notification() {
            match request.method.as_str() {
                "initialized" | "notifications/initialized" | "cancelled"
                | "notifications/cancelled" => {}
                _ => tracing::debug!(method = %request.method, "dropping unknown notification"),
            }
            return None;
        }
        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request)),
            // Acknowledgement-only methods emit nothing even with an id.
            "initialized" | "notifications/initialized" | "cancelled"
            | "notifications/cancelled" => None,
            "ping" => Some(JsonRpcResponse::success(request.id, serde_json::json!({}))),
            "tools/list" => Some(self.handle_tools_list(request)),
            "tools/call" => Some(self.handle_tools_call(request)),
            _ => Some(self.handle_passthrough(request)),
        }
    }

    /// Always answered locally, never forwarded, regardless of connection
    /// state.
    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "vsrelay".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            instructions: Some(self.instructions()),
        };
        JsonRpcResponse::success(request.id, serde_json::to_value(result).unwrap())
    }

    fn instructions(&self) -> String {
        let mut text = String::from(
            "vsrelay bridges this session to a running Visual Studio instance. \
             The advertised tools operate on the solution that instance has open \
             (building, debugging, breakpoints, editing, UI inspection).",
        );
        let cached = self.cache.count();
        if cached > 0 {
            text.push_str(&format!(
                " The last connected host advertised {cached} tools; call tools/list \
                 for the current set."
            ));
        }
        if self.session.candidates.len() > 1 {
            let listing = self
                .session
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("; ");
            text.push_str(&format!(
                " Multiple solutions were found near the working directory: {listing}. \
                 If tools act on the wrong instance, restart the relay with \
                 --solution <path> to pin one."
            ));
        }
        text
    }

    fn handle_tools_list(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match self.forward(&request) {
            Forward::Replied(response) => response,
            // An empty list when no cache exists means "nothing known",
            // which callers can distinguish from an authoritative answer.
            _ => {
                let snapshot = self
                    .cache
                    .read()
                    .unwrap_or_else(|| serde_json::json!({"tools": []}));
                JsonRpcResponse::success(id, snapshot)
            }
        }
    }

    fn handle_tools_call(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        // Lazy reconnect: one attempt, only now that a forward is needed.
        if self.session.connection.endpoint().is_none()
            && self.session.reconnect(&self.registry).is_none()
        {
            return self.offline_call_error(id);
        }
        let Some(endpoint) = self.session.connection.endpoint() else {
            return self.offline_call_error(id);
        };

        // Liveness probe under a short deadline before committing to the
        // long call deadline; a blocked IDE answers neither.
        if let Err(e) = self.transport.probe(endpoint) {
            if e.is_timeout() {
                return tool_error_response(
                    id,
                    format!("The Visual Studio host is running but unresponsive: {e}. The IDE may be busy with a modal operation; retry once it settles."),
                );
            }
            self.session.disconnect();
            let _ = self.session.reconnect(&self.registry);
            return self.offline_call_error(id);
        }

        match self.transport.forward(endpoint, &request) {
            Ok(Some(response)) => response,
            Ok(None) => JsonRpcResponse::success(id, serde_json::json!({})),
            Err(e) if e.is_timeout() => tool_error_response(
                id,
                format!("The tool call did not complete: {e}. The host stayed reachable, so the operation may still finish inside the IDE."),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "tools/call forward failed");
                self.session.disconnect();
                let _ = self.session.reconnect(&self.registry);
                self.offline_call_error(id)
            }
        }
    }

    fn handle_passthrough(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let method = request.method.clone();
        match self.forward(&request) {
            Forward::Replied(response) => response,
            Forward::NoContent => JsonRpcResponse::success(id, serde_json::json!({})),
            Forward::Timeout(e) => JsonRpcResponse::error(
                id,
                JsonRpcError {
                    code: -32603,
                    message: format!("Internal error: {e}"),
                    data: None,
                },
            ),
            Forward::Offline => JsonRpcResponse::error(
                id,
                JsonRpcError::method_not_found(&format!(
                    "{method} (no Visual Studio host is reachable to handle it)"
                )),
            ),
        }
    }

    /// One outbound call per inbound request. On a transport failure the
    /// session is demoted and re-resolved exactly once, then we give up and
    /// let the caller substitute an offline answer.
    fn forward(&mut self, request: &JsonRpcRequest) -> Forward {
        let Some(endpoint) = self.session.connection.endpoint() else {
            return Forward::Offline;
        };
        match self.transport.forward(endpoint, request) {
            Ok(Some(response)) => Forward::Replied(response),
            Ok(None) => Forward::NoContent,
            Err(e) if e.is_timeout() => Forward::Timeout(e),
            Err(e) => {
                tracing::warn!(method = %request.method, error = %e, "forward failed");
                self.session.disconnect();
                let _ = self.session.reconnect(&self.registry);
                Forward::Offline
            }
        }
    }

    fn offline_call_error(&self, id: Option<crate::protocol::JsonRpcId>) -> JsonRpcResponse {
        let mut text = String::from(
            "No running Visual Studio instance with the automation host could be reached.",
        );
        let installs = (self.detect_installs)();
        if installs.is_empty() {
            text.push_str(" No Visual Studio installations were detected on this machine.");
        } else {
            text.push_str("\nDetected Visual Studio installations:");
            for install in &installs {
                text.push_str("\n- ");
                text.push_str(install);
            }
        }
        text.push_str(
            "\nDo not guess which installation to launch. Ask the user to open the \
             solution in Visual Studio and retry once the host is running.",
        );
        tool_error_response(id, text)
    }
}

/// A tool-result error (`isError: true`) carried in a successful JSON-RPC
/// response. This tells the client "the operation failed" as a recoverable
/// condition, distinct from a protocol-level error.
fn tool_error_response(
    id: Option<crate::protocol::JsonRpcId>,
    text: String,
) -> JsonRpcResponse {
    let result = ToolsCallResult::error(text);
    JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{Endpoint, Selector};
    use crate::transport::HostHealth;
    use std::cell::RefCell;
    use std::collections::{HashSet, VecDeque};
    use std::io::Cursor;
    use tempfile::TempDir;

    type ForwardResult = std::result::Result<Option<JsonRpcResponse>, TransportError>;
    type ProbeResult = std::result::Result<HostHealth, TransportError>;

    /// Transport that replays scripted outcomes and records every call.
    #[derive(Default)]
    struct ScriptedTransport {
        forwards: RefCell<VecDeque<ForwardResult>>,
        probes: RefCell<VecDeque<ProbeResult>>,
        forwarded_to: RefCell<Vec<Endpoint>>,
    }

    impl ScriptedTransport {
        fn push_forward(&self, result: ForwardResult) {
            self.forwards.borrow_mut().push_back(result);
        }

        fn push_probe(&self, result: ProbeResult) {
            self.probes.borrow_mut().push_back(result);
        }
    }

    impl HostTransport for &ScriptedTransport {
        fn probe(&self, endpoint: Endpoint) -> ProbeResult {
            self.probes.borrow_mut().pop_front().unwrap_or(Ok(HostHealth {
                pid: endpoint.pid,
                port: endpoint.port,
                solution_loaded: true,
            }))
        }

        fn forward(&self, endpoint: Endpoint, _request: &JsonRpcRequest) -> ForwardResult {
            self.forwarded_to.borrow_mut().push(endpoint);
            self.forwards
                .borrow_mut()
                .pop_front()
                .expect("unexpected forward to host")
        }
    }

    struct Fixture {
        dir: TempDir,
        transport: ScriptedTransport,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                transport: ScriptedTransport::default(),
            }
        }

        fn registry(&self, live: &[u32]) -> Registry {
            let live: HashSet<u32> = live.iter().copied().collect();
            Registry::with_probe(
                self.dir.path().join("registry"),
                Box::new(move |pid| live.contains(&pid)),
            )
        }

        fn relay(&self, live: &[u32]) -> Relay<&ScriptedTransport> {
            let registry = self.registry(live);
            let cwd = self.dir.path().join("cwd");
            std::fs::create_dir_all(&cwd).unwrap();
            let mut session = RelaySession::new(Selector::Auto, cwd);
            session.reconnect(&registry);
            Relay::new(
                registry,
                session,
                &self.transport,
                ToolCache::in_dir(&self.dir.path().join("registry")),
                Arc::new(AtomicBool::new(false)),
            )
            .with_installs(Vec::new)
        }
    }

    fn run_lines(relay: &mut Relay<&ScriptedTransport>, input: &str) -> Vec<serde_json::Value> {
        let mut output = Vec::new();
        relay.run(Cursor::new(input.to_string()), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn one_response_per_id_zero_for_notifications_and_garbage() {
        let fixture = Fixture::new();
        let mut relay = fixture.relay(&[]);
        let input = "\
            {\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\
            this is not json\n\
            {\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\
            {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let responses = run_lines(&mut relay, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
    }

    #[test]
    fn initialize_and_ping_succeed_while_disconnected() {
        let fixture = Fixture::new();
        let mut relay = fixture.relay(&[]);
        assert!(relay.session.connection.endpoint().is_none());

        let input = "\
            {\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n\
            {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let responses = run_lines(&mut relay, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(
            responses[0]["result"]["serverInfo"]["name"],
            "vsrelay"
        );
        assert!(responses[0]["error"].is_null());
        assert!(responses[1]["error"].is_null());
    }

    #[test]
    fn initialize_mentions_other_solution_candidates() {
        let fixture = Fixture::new();
        let cwd = fixture.dir.path().join("cwd");
        std::fs::create_dir_all(&cwd).unwrap();
        std::fs::write(cwd.join("A.sln"), "").unwrap();
        std::fs::write(cwd.join("B.sln"), "").unwrap();

        let registry = fixture.registry(&[200]);
        registry
            .publish(200, 9200, cwd.join("B.sln").to_str().unwrap())
            .unwrap();

        let mut relay = fixture.relay(&[200]);
        // Auto-resolve picked B's instance.
        assert_eq!(
            relay.session.connection.endpoint(),
            Some(Endpoint {
                pid: 200,
                port: 9200
            })
        );

        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
        );
        let instructions = responses[0]["result"]["instructions"].as_str().unwrap();
        assert!(instructions.contains("A.sln"));
    }

    #[test]
    fn tools_list_forwards_when_connected() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();
        fixture.transport.push_forward(Ok(Some(JsonRpcResponse::success(
            Some(crate::protocol::JsonRpcId::Number(1)),
            serde_json::json!({"tools": [{"name": "build_solution"}]}),
        ))));

        let mut relay = fixture.relay(&[100]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
        );
        assert_eq!(responses[0]["result"]["tools"][0]["name"], "build_solution");
    }

    #[test]
    fn tools_list_offline_answers_from_cache() {
        let fixture = Fixture::new();
        let cache_dir = fixture.dir.path().join("registry");
        ToolCache::in_dir(&cache_dir).write(&[serde_json::json!({"name": "build_solution"})]);

        let mut relay = fixture.relay(&[]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
        );
        assert_eq!(responses[0]["result"]["tools"][0]["name"], "build_solution");
    }

    #[test]
    fn tools_list_offline_without_cache_is_empty_list() {
        let fixture = Fixture::new();
        let mut relay = fixture.relay(&[]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n",
        );
        assert_eq!(responses[0]["result"]["tools"].as_array().unwrap().len(), 0);
        assert!(responses[0]["error"].is_null());
    }

    #[test]
    fn host_death_mid_session_demotes_and_returns_tool_error() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();
        fixture
            .transport
            .push_forward(Err(TransportError::Unreachable("connection refused".into())));

        let mut relay = fixture.relay(&[100]);
        assert!(relay.session.connection.endpoint().is_some());

        // The record is still on disk but the reconnect probe now reports
        // the pid dead, so re-resolve finds nothing.
        relay.registry = fixture.registry(&[]);

        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"tools/call\",\"params\":{\"name\":\"build_solution\"}}\n",
        );
        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("could be reached")
        );
        assert!(relay.session.connection.endpoint().is_none());
    }

    #[test]
    fn host_restart_on_new_port_recovers_without_relay_restart() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();

        let mut relay = fixture.relay(&[100]);

        // Old host dies: first call fails, demotes, and the one re-resolve
        // picks up the restarted host's fresh record.
        relay.registry = fixture.registry(&[101]);
        relay.registry.publish(101, 9101, "").unwrap();
        fixture
            .transport
            .push_forward(Err(TransportError::Unreachable("connection reset".into())));
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"x\"}}\n",
        );
        assert_eq!(responses[0]["result"]["isError"], true);
        assert_eq!(
            relay.session.connection.endpoint(),
            Some(Endpoint {
                pid: 101,
                port: 9101
            })
        );

        // Next call goes straight to the new port and succeeds.
        fixture.transport.push_forward(Ok(Some(JsonRpcResponse::success(
            Some(crate::protocol::JsonRpcId::Number(2)),
            serde_json::json!({"content": [{"type": "text", "text": "ok"}]}),
        ))));
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"x\"}}\n",
        );
        assert!(responses[0]["result"]["isError"].is_null());
        assert_eq!(
            fixture.transport.forwarded_to.borrow().last(),
            Some(&Endpoint {
                pid: 101,
                port: 9101
            })
        );
    }

    #[test]
    fn offline_call_error_enumerates_detected_installs() {
        let fixture = Fixture::new();
        let mut relay = fixture
            .relay(&[])
            .with_installs(|| vec!["Visual Studio 2022 Community (C:\\VS)".to_string()]);

        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"x\"}}\n",
        );
        let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Visual Studio 2022 Community"));
        assert!(text.contains("Do not guess"));
    }

    #[test]
    fn call_timeout_keeps_connection_and_names_the_timeout() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();
        fixture
            .transport
            .push_forward(Err(TransportError::Timeout(std::time::Duration::from_secs(
                120,
            ))));

        let mut relay = fixture.relay(&[100]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"x\"}}\n",
        );
        let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("did not complete"));
        // A slow host is not a dead host.
        assert!(relay.session.connection.endpoint().is_some());
    }

    #[test]
    fn probe_timeout_reports_unresponsive_host() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();
        fixture
            .transport
            .push_probe(Err(TransportError::ProbeTimeout(
                std::time::Duration::from_secs(5),
            )));

        let mut relay = fixture.relay(&[100]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"x\"}}\n",
        );
        let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("unresponsive"));
        assert!(relay.session.connection.endpoint().is_some());
    }

    #[test]
    fn unknown_method_with_id_while_offline_is_method_not_found() {
        let fixture = Fixture::new();
        let mut relay = fixture.relay(&[]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"resources/list\"}\n",
        );
        assert_eq!(responses[0]["error"]["code"], -32601);
        assert!(
            responses[0]["error"]["message"]
                .as_str()
                .unwrap()
                .contains("no Visual Studio host")
        );
    }

    #[test]
    fn unknown_method_forwards_when_connected() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();
        fixture.transport.push_forward(Ok(Some(JsonRpcResponse::success(
            Some(crate::protocol::JsonRpcId::Number(1)),
            serde_json::json!({"resources": []}),
        ))));

        let mut relay = fixture.relay(&[100]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"resources/list\"}\n",
        );
        assert!(responses[0]["result"]["resources"].is_array());
    }

    #[test]
    fn id_less_known_methods_emit_no_response_line() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();

        let mut relay = fixture.relay(&[100]);
        let input = "\
            {\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n\
            {\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"params\":{}}\n\
            {\"jsonrpc\":\"2.0\",\"method\":\"tools/list\"}\n\
            {\"jsonrpc\":\"2.0\",\"method\":\"tools/call\",\"params\":{\"name\":\"x\"}}\n";
        let responses = run_lines(&mut relay, input);
        assert!(responses.is_empty());
        // Nothing was forwarded either: notifications are dropped, not relayed.
        assert!(fixture.transport.forwarded_to.borrow().is_empty());
    }

    #[test]
    fn unknown_notification_is_dropped_even_when_connected() {
        let fixture = Fixture::new();
        let registry = fixture.registry(&[100]);
        registry.publish(100, 9100, "").unwrap();

        let mut relay = fixture.relay(&[100]);
        let responses = run_lines(
            &mut relay,
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n",
        );
        assert!(responses.is_empty());
        assert!(fixture.transport.forwarded_to.borrow().is_empty());
    }

    #[test]
    fn shutdown_flag_stops_reading_between_requests() {
        let fixture = Fixture::new();
        let shutdown = Arc::new(AtomicBool::new(true));
        let registry = fixture.registry(&[]);
        let cwd = fixture.dir.path().to_path_buf();
        let mut relay = Relay::new(
            registry,
            RelaySession::new(Selector::Auto, cwd),
            &fixture.transport,
            ToolCache::in_dir(fixture.dir.path()),
            shutdown,
        );

        let mut output = Vec::new();
        relay
            .run(
                Cursor::new("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n"),
                &mut output,
            )
            .unwrap();
        assert!(output.is_empty());
    }
}
