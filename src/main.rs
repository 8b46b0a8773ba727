mod cache;
mod error;
mod installs;
mod protocol;
mod registry;
mod relay;
mod resolve;
mod session;
mod transport;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing_subscriber::EnvFilter;

use cache::ToolCache;
use registry::Registry;
use relay::Relay;
use resolve::Selector;
use session::RelaySession;
use transport::HttpTransport;

/// Bridge a stdio MCP client to a running Visual Studio automation host.
///
/// Speaks newline-delimited JSON-RPC on stdin/stdout and forwards tool
/// calls to the host instance resolved from the registry. Without selector
/// flags the target is derived from solution files near the working
/// directory.
#[derive(Debug, Parser)]
#[command(name = "vsrelay", version)]
struct Args {
    /// Target the host with this process id.
    #[arg(long)]
    pid: Option<u32>,

    /// Target the host that has this solution open.
    #[arg(long, value_name = "PATH")]
    solution: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr only; stdout carries the protocol stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    // First signal: mark shutdown, then exit promptly. An outbound call in
    // flight is abandoned rather than awaited.
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))?;
        signal_hook::flag::register_conditional_shutdown(signal, 0, Arc::clone(&shutdown))?;
    }

    let dir = Registry::default_dir()?;
    let registry = Registry::open(dir.clone());
    let cache = ToolCache::in_dir(&dir);

    let selector = Selector::from_args(args.pid, args.solution);
    let cwd = std::env::current_dir()?;
    let mut session = RelaySession::new(selector, cwd);
    match session.connect(&registry) {
        Some(endpoint) => {
            tracing::info!(pid = endpoint.pid, port = endpoint.port, "connected to host");
        }
        None => {
            // Not fatal: the relay still serves initialize/ping/tools-list
            // from local state and reconnects lazily on demand.
            tracing::warn!("no running Visual Studio host found; starting in offline mode");
        }
    }

    let mut relay = Relay::new(registry, session, HttpTransport::new(), cache, shutdown);
    let stdin = io::stdin();
    let stdout = io::stdout();
    relay.run(stdin.lock(), stdout.lock())?;
    Ok(())
}
