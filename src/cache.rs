//! Offline snapshot of the host's advertised tool list.
//!
//! The host rewrites this file whenever it (re)computes its capability set;
//! the relay only reads it, to answer `tools/list` while no host is
//! reachable and to personalize the local `initialize` instructions.

use std::fs;
use std::path::{Path, PathBuf};

const CACHE_FILE: &str = "tools-cache.json";

pub struct ToolCache {
    path: PathBuf,
}

impl ToolCache {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(CACHE_FILE),
        }
    }

    /// Best-effort persist of `{"tools": [...]}`. A failed write must never
    /// propagate to the host's registration path.
    pub fn write(&self, tools: &[serde_json::Value]) {
        let snapshot = serde_json::json!({ "tools": tools });
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, snapshot.to_string())
        };
        if let Err(e) = write() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write tool cache");
        }
    }

    /// The raw `{"tools": [...]}` snapshot, if one was ever persisted.
    pub fn read(&self) -> Option<serde_json::Value> {
        let content = fs::read_to_string(&self.path).ok()?;
        let snapshot: serde_json::Value = serde_json::from_str(&content).ok()?;
        snapshot.get("tools")?.as_array()?;
        Some(snapshot)
    }

    pub fn count(&self) -> usize {
        self.read()
            .and_then(|s| s.get("tools").and_then(|t| t.as_array().map(Vec::len)))
            .unwrap_or(0)
    }
}
