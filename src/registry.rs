//! File-based directory of running Visual Studio host instances.
//!
//! Each host publishes one record file to a well-known per-user directory so
//! that relays can discover it. Records are named `instance-<pid>.json` and
//! contain `{"port": <u16>, "sln": <string>}`. Older hosts wrote a bare
//! decimal port number; readers accept both formats.
//!
//! Stale records (owning process no longer exists) are deleted
//! opportunistically whenever the registry is read. Deleting an
//! already-deleted record is a no-op, so multiple relays can garbage-collect
//! concurrently without coordination.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

use crate::error::{RelayError, Result};

const FILE_PREFIX: &str = "instance-";
const FILE_SUFFIX: &str = ".json";

/// One live host instance, as read back from its record file.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub pid: u32,
    pub port: u16,
    /// Absolute path of the solution the host has open; empty when none.
    pub solution_path: String,
    /// Last modification time of the record file, used for
    /// most-recent-activity ordering.
    pub modified: SystemTime,
}

/// On-disk record body. Legacy records are a bare decimal integer instead.
#[derive(Debug, Serialize, Deserialize)]
struct RecordFile {
    port: u16,
    #[serde(default)]
    sln: String,
}

/// Liveness check for a record's owning process.
pub type ProcessProbe = Box<dyn Fn(u32) -> bool + Send>;

fn system_probe() -> ProcessProbe {
    Box::new(|pid| {
        // Per-pid refresh rather than a full process scan.
        let mut sys = System::new();
        sys.refresh_process(Pid::from_u32(pid))
    })
}

pub struct Registry {
    dir: PathBuf,
    probe: ProcessProbe,
}

impl Registry {
    /// The well-known registry directory for this user.
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|d| d.join("vsrelay"))
            .ok_or(RelayError::NoDataDir)
    }

    pub fn open(dir: PathBuf) -> Self {
        Self {
            dir,
            probe: system_probe(),
        }
    }

    /// Registry with an injected liveness probe, for tests.
    #[cfg(test)]
    pub fn with_probe(dir: PathBuf, probe: ProcessProbe) -> Self {
        Self { dir, probe }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, pid: u32) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{pid}{FILE_SUFFIX}"))
    }

    /// Idempotently (over)write the record for `pid`, creating the registry
    /// directory if needed.
    pub fn publish(&self, pid: u32, port: u16, solution_path: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let body = serde_json::to_string(&RecordFile {
            port,
            sln: solution_path.to_string(),
        })?;
        fs::write(self.record_path(pid), body)?;
        Ok(())
    }

    /// Rewrite only the solution path of an existing record, preserving the
    /// port. No-op when the record is missing.
    pub fn update_solution_path(&self, pid: u32, solution_path: &str) -> Result<()> {
        let path = self.record_path(pid);
        let Ok(content) = fs::read_to_string(&path) else {
            return Ok(());
        };
        let Some(existing) = parse_record(&content) else {
            return Ok(());
        };
        let body = serde_json::to_string(&RecordFile {
            port: existing.port,
            sln: solution_path.to_string(),
        })?;
        fs::write(path, body)?;
        Ok(())
    }

    /// Best-effort delete. Registry cleanup must never crash a shutdown
    /// path, so failures are swallowed.
    pub fn unpublish(&self, pid: u32) {
        if let Err(e) = fs::remove_file(self.record_path(pid)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(pid, error = %e, "failed to remove instance record");
            }
        }
    }

    /// Look up a single record by pid. A record whose process is dead is
    /// removed and reported as absent.
    pub fn get(&self, pid: u32) -> Option<InstanceRecord> {
        let path = self.record_path(pid);
        let content = fs::read_to_string(&path).ok()?;
        if !(self.probe)(pid) {
            self.unpublish(pid);
            return None;
        }
        let record = parse_record(&content)?;
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Some(InstanceRecord {
            pid,
            port: record.port,
            solution_path: record.sln,
            modified,
        })
    }

    /// Every record whose owning process is still alive, most recently
    /// modified first. Records of dead processes are deleted as a side
    /// effect; unreadable files are skipped, never fatal.
    pub fn list_all(&self) -> Vec<InstanceRecord> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(pid) = pid_from_file_name(&name.to_string_lossy()) else {
                continue;
            };
            if !(self.probe)(pid) {
                self.unpublish(pid);
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let Some(record) = parse_record(&content) else {
                tracing::debug!(pid, "skipping unparseable instance record");
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            records.push(InstanceRecord {
                pid,
                port: record.port,
                solution_path: record.sln,
                modified,
            });
        }

        records.sort_by(|a, b| b.modified.cmp(&a.modified));
        records
    }
}

fn pid_from_file_name(name: &str) -> Option<u32> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

/// Parse a record body: either the JSON object form or the legacy bare
/// integer form (port only, no solution path).
fn parse_record(content: &str) -> Option<RecordFile> {
    let trimmed = content.trim();
    if let Ok(port) = trimmed.parse::<u16>() {
        return Some(RecordFile {
            port,
            sln: String::new(),
        });
    }
    serde_json::from_str(trimmed).ok()
}
