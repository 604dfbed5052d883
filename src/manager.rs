use crate::acquire::{AcquireStatus, RepoAcquirer};
use crate::catalog::{Phase, RepoGroup, RepoSpec, SIGMA_RULES_DIR, YARA_RULES_DIR};
use crate::config::Config;
use crate::downloader::{CveDownloader, CveRunReport};
use crate::error::Result;
use crate::progress::{RuleStatistics, count_files_and_size};
use crate::sources::CveSource;
use crate::store::{FileStore, write_json_file};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub const SUMMARY_FILE: &str = "download_summary.json";
pub const RULES_STATISTICS_FILE: &str = "rules_statistics.json";
/// Phrase the operator must type before live malware is downloaded.
pub const LIVE_MALWARE_PHRASE: &str = "I UNDERSTAND THE RISKS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Success,
    Failed,
}

/// Result of acquiring one catalog repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoOutcome {
    pub name: String,
    pub url: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub live_malware: bool,
}

impl RepoOutcome {
    fn new(group: &RepoGroup, spec: &RepoSpec, success: bool, message: String) -> Self {
        Self {
            name: spec.name.to_string(),
            url: spec.url.to_string(),
            success,
            message,
            live_malware: group.live_malware,
        }
    }
}

/// Contents of `phase<N>_results.json` for repository phases.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoPhaseResults {
    #[serde(flatten)]
    pub groups: BTreeMap<&'static str, Vec<RepoOutcome>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<RuleStatistics>,
    pub errors: Vec<String>,
}

impl RepoPhaseResults {
    pub fn succeeded(&self) -> usize {
        self.groups.values().flatten().filter(|o| o.success).count()
    }

    pub fn attempted(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PhaseResults {
    Repos(RepoPhaseResults),
    Cve(CveRunReport),
}

impl PhaseResults {
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Repos(results) => &results.errors,
            Self::Cve(report) => &report.errors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub name: &'static str,
    pub status: PhaseStatus,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<PhaseResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhaseReport {
    pub fn is_success(&self) -> bool {
        self.status == PhaseStatus::Success
    }
}

/// Contents of `download_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub download_date: DateTime<Utc>,
    pub total_elapsed_seconds: f64,
    pub phases: Vec<PhaseReport>,
    pub base_directory: PathBuf,
    pub disk_usage_gb: f64,
}

impl RunSummary {
    pub fn successful_phases(&self) -> usize {
        self.phases.iter().filter(|p| p.is_success()).count()
    }

    /// Phase failures first, then per-item errors, in phase order.
    pub fn errors(&self) -> Vec<&str> {
        let mut errors = Vec::new();
        for phase in &self.phases {
            if let Some(e) = &phase.error {
                errors.push(e.as_str());
            }
            if let Some(results) = &phase.results {
                errors.extend(results.errors().iter().map(String::as_str));
            }
        }
        errors
    }

    /// Measure disk usage under the base directory and write the summary there.
    pub async fn save(&mut self) -> Result<PathBuf> {
        let (_, bytes) = count_files_and_size(&self.base_directory);
        self.disk_usage_gb = round2(bytes as f64 / 1024f64.powi(3));

        let path = self.base_directory.join(SUMMARY_FILE);
        write_json_file(&path, self).await?;
        info!(path = %path.display(), "Saved download summary");
        Ok(path)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Runs the download phases in order against one base directory.
pub struct HarvestManager {
    config: Config,
    acquirer: Arc<dyn RepoAcquirer>,
    cve_source: Arc<dyn CveSource>,
    live_malware_confirmed: bool,
}

impl HarvestManager {
    pub fn new(
        config: Config,
        acquirer: Arc<dyn RepoAcquirer>,
        cve_source: Arc<dyn CveSource>,
    ) -> Self {
        Self {
            config,
            acquirer,
            cve_source,
            live_malware_confirmed: false,
        }
    }

    /// Record that the operator typed [`LIVE_MALWARE_PHRASE`].
    pub fn with_live_malware_confirmed(mut self, confirmed: bool) -> Self {
        self.live_malware_confirmed = confirmed;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn live_malware_allowed(&self) -> bool {
        !self.config.skip_malware && self.live_malware_confirmed
    }

    pub async fn run_all(&self) -> RunSummary {
        self.run_phases(&Phase::ALL).await
    }

    /// Run `phases` in the given order. A failed phase never stops the run.
    pub async fn run_phases(&self, phases: &[Phase]) -> RunSummary {
        let started = Instant::now();
        let mut reports = Vec::with_capacity(phases.len());

        for &phase in phases {
            reports.push(self.run_phase(phase).await);
        }

        let base_directory =
            std::path::absolute(&self.config.base_dir).unwrap_or_else(|_| self.config.base_dir.clone());

        RunSummary {
            download_date: Utc::now(),
            total_elapsed_seconds: round2(started.elapsed().as_secs_f64()),
            phases: reports,
            base_directory,
            disk_usage_gb: 0.0,
        }
    }

    pub async fn run_phase(&self, phase: Phase) -> PhaseReport {
        info!(phase = phase.number(), name = phase.name(), "Starting phase");
        let started = Instant::now();

        let result = match phase {
            Phase::CveDatabase => self.run_cve_phase().await.map(PhaseResults::Cve),
            _ => self.run_repo_phase(phase).await.map(PhaseResults::Repos),
        };
        let elapsed_seconds = round2(started.elapsed().as_secs_f64());

        match result {
            Ok(results) => {
                info!(
                    phase = phase.number(),
                    elapsed_seconds,
                    errors = results.errors().len(),
                    "Phase finished"
                );
                PhaseReport {
                    phase,
                    name: phase.name(),
                    status: PhaseStatus::Success,
                    elapsed_seconds,
                    results: Some(results),
                    error: None,
                }
            }
            Err(e) => {
                let message = format!("Phase {} failed: {e}", phase.number());
                error!(phase = phase.number(), error = %e, "Phase failed");
                PhaseReport {
                    phase,
                    name: phase.name(),
                    status: PhaseStatus::Failed,
                    elapsed_seconds,
                    results: None,
                    error: Some(message),
                }
            }
        }
    }

    async fn run_cve_phase(&self) -> Result<CveRunReport> {
        let dir = self.config.cve_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let downloader = CveDownloader::new(self.cve_source.clone(), Arc::new(FileStore::new(&dir)));
        let recent_days = (self.config.recent_days > 0).then_some(self.config.recent_days);
        let report = downloader.run(&self.config.cve_years, recent_days).await;

        let stats = report.save(&dir).await?;
        info!(total_cves = stats.total_cves, files = stats.files, "CVE statistics saved");
        Ok(report)
    }

    async fn run_repo_phase(&self, phase: Phase) -> Result<RepoPhaseResults> {
        let phase_dir = self.config.base_dir.join(phase.dir_name());
        let mut results = RepoPhaseResults::default();

        for group in phase.groups() {
            let group_dir = phase_dir.join(group.dir);
            tokio::fs::create_dir_all(&group_dir).await?;

            if group.live_malware && !self.live_malware_allowed() {
                warn!(group = group.label, "Skipping live malware samples");
                results.skipped.extend(group.repos.iter().map(|r| r.name.to_string()));
                continue;
            }

            for spec in group.repos {
                let target = group_dir.join(spec.name);
                let outcome = match self
                    .acquirer
                    .ensure_local_copy(spec.url, &target, self.config.update)
                    .await
                {
                    Ok(status) => {
                        if status != AcquireStatus::AlreadyExists {
                            info!(repo = spec.name, ?status, "Repository ready");
                        }
                        RepoOutcome::new(group, spec, true, status.message(spec.name))
                    }
                    Err(e) => {
                        warn!(repo = spec.name, url = spec.url, error = %e, "Repository failed");
                        results.errors.push(format!("{} {}: {e}", group.label, spec.name));
                        RepoOutcome::new(group, spec, false, e.to_string())
                    }
                };
                results.groups.entry(group.key).or_default().push(outcome);
            }
        }

        if phase == Phase::YaraSigma {
            let stats = RuleStatistics::count(
                &phase_dir.join(YARA_RULES_DIR),
                &phase_dir.join(SIGMA_RULES_DIR),
            );
            write_json_file(&phase_dir.join(RULES_STATISTICS_FILE), &stats).await?;
            info!(yara = stats.yara_files, sigma = stats.sigma_files, "Rule statistics saved");
            results.statistics = Some(stats);
        }

        write_json_file(&phase_dir.join(phase.results_file()), &results).await?;
        Ok(results)
    }
}
