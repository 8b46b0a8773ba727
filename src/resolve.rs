//! Picks which host instance a relay should target.
//!
//! Resolution combines the registry (who is running) with selector hints
//! from the command line and, in auto mode, an upward walk from the working
//! directory looking for `.sln` solution descriptors.

use std::path::{Path, PathBuf};

use crate::registry::{InstanceRecord, Registry};

/// Ancestor levels scanned by the auto walk. The walk also stops at the
/// filesystem root; the cap guards against pathological mount layouts.
const MAX_WALK_LEVELS: usize = 24;

/// How the relay was asked to pick a host instance.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Explicit host process id; when a solution path is also given the
    /// record must match it too.
    Pid {
        pid: u32,
        solution: Option<PathBuf>,
    },
    /// Explicit solution path.
    Solution(PathBuf),
    /// Derive the target from the working directory.
    Auto,
}

impl Selector {
    pub fn from_args(pid: Option<u32>, solution: Option<PathBuf>) -> Self {
        match (pid, solution) {
            (Some(pid), solution) => Self::Pid { pid, solution },
            (None, Some(path)) => Self::Solution(path),
            (None, None) => Self::Auto,
        }
    }
}

/// A reachable host transport address. The host only listens on loopback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub pid: u32,
    pub port: u16,
}

impl From<&InstanceRecord> for Endpoint {
    fn from(record: &InstanceRecord) -> Self {
        Self {
            pid: record.pid,
            port: record.port,
        }
    }
}

/// Resolver outcome. `candidates` holds every solution descriptor the auto
/// walk discovered, kept for disambiguation hints even when resolution
/// succeeded or failed.
#[derive(Debug, Default)]
pub struct Resolution {
    pub endpoint: Option<Endpoint>,
    pub candidates: Vec<PathBuf>,
}

pub fn resolve(registry: &Registry, selector: &Selector, cwd: &Path) -> Resolution {
    match selector {
        Selector::Pid { pid, solution } => {
            let Some(record) = registry.get(*pid) else {
                return Resolution::default();
            };
            if let Some(solution) = solution {
                if !paths_match(Path::new(&record.solution_path), solution) {
                    tracing::warn!(
                        pid,
                        requested = %solution.display(),
                        open = %record.solution_path,
                        "host process has a different solution open"
                    );
                    return Resolution::default();
                }
            }
            Resolution {
                endpoint: Some(Endpoint::from(&record)),
                candidates: Vec::new(),
            }
        }
        Selector::Solution(path) => Resolution {
            endpoint: find_by_solution(&registry.list_all(), path),
            candidates: Vec::new(),
        },
        Selector::Auto => {
            let candidates = collect_solution_candidates(cwd);
            let records = registry.list_all();
            if candidates.is_empty() {
                // No descriptors anywhere on the walk: any live instance,
                // most recent first.
                return Resolution {
                    endpoint: records.first().map(Endpoint::from),
                    candidates,
                };
            }
            let endpoint = candidates
                .iter()
                .find_map(|candidate| find_by_solution(&records, candidate));
            Resolution {
                endpoint,
                candidates,
            }
        }
    }
}

/// First live record (most-recent-activity order) with this solution open.
fn find_by_solution(records: &[InstanceRecord], solution: &Path) -> Option<Endpoint> {
    records
        .iter()
        .find(|r| !r.solution_path.is_empty() && paths_match(Path::new(&r.solution_path), solution))
        .map(Endpoint::from)
}

/// Walk upward from `cwd`, collecting every `.sln` file at every ancestor
/// level (not just the nearest level that has one), in discovery order.
pub fn collect_solution_candidates(cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for dir in cwd.ancestors().take(MAX_WALK_LEVELS) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        let mut level: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("sln"))
            })
            .collect();
        level.sort();
        candidates.extend(level);
    }
    candidates
}

/// Case-insensitive comparison of normalized absolute paths. Solution paths
/// originate on a case-insensitive filesystem, so `C:\App.sln` and
/// `c:\app.sln` are the same solution.
fn paths_match(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut s = absolute.to_string_lossy().to_lowercase();
    while s.len() > 1 && (s.ends_with('/') || s.ends_with('\\')) {
        s.pop();
    }
    s
}
