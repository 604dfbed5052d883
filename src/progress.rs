//! On-disk progress inspection and file statistics.

use crate::catalog::Phase;
use crate::manager::{PhaseStatus, SUMMARY_FILE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size with two decimals, 1024 per step.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}

/// Regular files under `dir` and their total size. Missing dirs count as empty.
pub fn count_files_and_size(dir: &Path) -> (usize, u64) {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .fold((0, 0), |(count, size), entry| {
            let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
            (count + 1, size + len)
        })
}

/// Files under `dir` whose extension is one of `extensions` (case-insensitive).
pub fn count_files_with_extensions(dir: &Path, extensions: &[&str]) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        })
        .count()
}

/// Rule counts written to `rules_statistics.json` by the rules phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStatistics {
    pub yara_files: usize,
    pub sigma_files: usize,
    pub total_files: usize,
}

impl RuleStatistics {
    pub fn count(yara_dir: &Path, sigma_dir: &Path) -> Self {
        let yara_files = count_files_with_extensions(yara_dir, &["yar", "yara"]);
        let sigma_files = count_files_with_extensions(sigma_dir, &["yml", "yaml"]);
        Self {
            yara_files,
            sigma_files,
            total_files: yara_files + sigma_files,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseProgress {
    pub phase: Phase,
    /// `None` when the phase directory does not exist yet.
    pub files: Option<usize>,
    pub bytes: u64,
}

impl PhaseProgress {
    pub fn started(&self) -> bool {
        self.files.is_some()
    }
}

/// The parts of `download_summary.json` shown by progress inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastRun {
    pub download_date: DateTime<Utc>,
    #[serde(default)]
    pub total_elapsed_seconds: f64,
    #[serde(default)]
    pub disk_usage_gb: f64,
    #[serde(default)]
    pub phases: Vec<LastRunPhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastRunPhase {
    pub phase: u8,
    pub name: String,
    pub status: PhaseStatus,
}

impl LastRun {
    pub fn successful_phases(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Success)
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub base_dir: PathBuf,
    pub exists: bool,
    pub phases: Vec<PhaseProgress>,
    pub total_files: usize,
    pub total_bytes: u64,
    pub last_run: Option<LastRun>,
}

/// Inspect what has been downloaded under `base_dir`.
pub fn inspect(base_dir: &Path) -> ProgressReport {
    let exists = base_dir.is_dir();
    let phases: Vec<PhaseProgress> = Phase::ALL
        .into_iter()
        .map(|phase| {
            let dir = base_dir.join(phase.dir_name());
            if dir.is_dir() {
                let (files, bytes) = count_files_and_size(&dir);
                PhaseProgress {
                    phase,
                    files: Some(files),
                    bytes,
                }
            } else {
                PhaseProgress {
                    phase,
                    files: None,
                    bytes: 0,
                }
            }
        })
        .collect();

    ProgressReport {
        base_dir: base_dir.to_path_buf(),
        exists,
        total_files: phases.iter().filter_map(|p| p.files).sum(),
        total_bytes: phases.iter().map(|p| p.bytes).sum(),
        last_run: read_last_summary(base_dir),
        phases,
    }
}

fn read_last_summary(base_dir: &Path) -> Option<LastRun> {
    let path = base_dir.join(SUMMARY_FILE);
    let bytes = std::fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read download summary");
            None
        }
    }
}
