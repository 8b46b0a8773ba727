//! Detects Visual Studio installations on the machine.
//!
//! Used only to enrich the offline `tools/call` error so the client can
//! tell the human which IDEs exist without the relay guessing which one to
//! launch. Pure directory scanning against the standard
//! `Program Files\Microsoft Visual Studio\<release>\<edition>` layout;
//! nothing is ever launched.

use std::path::{Path, PathBuf};

pub fn detect_installs() -> Vec<String> {
    scan_roots(&default_roots())
}

fn default_roots() -> Vec<PathBuf> {
    ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(|dir| PathBuf::from(dir).join("Microsoft Visual Studio"))
        .collect()
}

fn scan_roots(roots: &[PathBuf]) -> Vec<String> {
    let mut installs = Vec::new();
    for root in roots {
        let Ok(releases) = std::fs::read_dir(root) else {
            continue;
        };
        for release in releases.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
            let Ok(editions) = std::fs::read_dir(&release) else {
                continue;
            };
            for edition in editions.flatten().map(|e| e.path()).filter(|p| p.is_dir()) {
                if edition.join("Common7").join("IDE").join("devenv.exe").is_file() {
                    installs.push(describe(&release, &edition));
                }
            }
        }
    }
    installs.sort();
    installs
}

fn describe(release: &Path, edition: &Path) -> String {
    let release = release.file_name().unwrap_or_default().to_string_lossy();
    let edition_name = edition.file_name().unwrap_or_default().to_string_lossy();
    format!("Visual Studio {release} {edition_name} ({})", edition.display())
}
