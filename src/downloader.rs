//! Year-partitioned CVE downloader.
//!
//! Drives a [`CveSource`] once per partition and persists each result through a
//! [`PartitionStore`]. A partition moves `NotStarted -> Fetching -> Saved | Failed`;
//! throttling keeps it in `Fetching`. An existing partition is treated as done
//! without re-validation, so forcing a re-fetch means deleting its file.

use crate::aggregator::{CveStatistics, StatisticsAggregator};
use crate::error::Result;
use crate::models::{PartitionFile, PartitionOutcome, PartitionReport, PartitionSelector};
use crate::sources::CveSource;
use crate::store::{PartitionStore, write_json_file};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const STATISTICS_FILE: &str = "cve_statistics.json";
pub const RESULTS_FILE: &str = "phase4_results.json";

pub struct CveDownloader {
    source: Arc<dyn CveSource>,
    store: Arc<dyn PartitionStore>,
}

impl CveDownloader {
    pub fn new(source: Arc<dyn CveSource>, store: Arc<dyn PartitionStore>) -> Self {
        Self { source, store }
    }

    /// Download every CVE published in `year`.
    pub async fn download_year(&self, year: i32) -> Result<PartitionOutcome> {
        self.download(PartitionSelector::Year { year }).await
    }

    /// Download every CVE modified in the last `days` days.
    pub async fn download_recently_modified(&self, days: i64) -> Result<PartitionOutcome> {
        self.download(PartitionSelector::RecentlyModified { recent_days: days })
            .await
    }

    /// Fetch and save one partition unless it is already stored.
    ///
    /// Never returns [`PartitionOutcome::Failed`]; failures come back as `Err`
    /// and nothing is written for them.
    pub async fn download(&self, selector: PartitionSelector) -> Result<PartitionOutcome> {
        let key = selector.key();
        let file = self.store.location(&key);

        match self.store.existing_count(&key).await {
            Ok(Some(cve_count)) => {
                info!(partition = %selector, file = %file, cve_count, "Partition already exists, skipping");
                return Ok(PartitionOutcome::AlreadyExists(PartitionReport {
                    selector,
                    file,
                    cve_count,
                }));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(partition = %selector, file = %file, error = %e, "Existing partition is unreadable, downloading again");
            }
        }

        let window = selector.window(Utc::now())?;
        info!(
            partition = %selector,
            start = %window.start_param(),
            end = %window.end_param(),
            source = self.source.name(),
            "Downloading CVE partition"
        );

        let records = self.source.fetch_all(&window).await?;
        let partition = PartitionFile::new(&selector, &window, records, Utc::now());
        self.store.save(&key, &partition).await?;

        info!(partition = %selector, cve_count = partition.total_cves, "Partition saved");
        Ok(PartitionOutcome::Downloaded(PartitionReport {
            selector,
            file,
            cve_count: partition.total_cves,
        }))
    }

    /// Download each year in order, then the rolling window when `recent_days`
    /// is set. A failed partition is recorded and the run moves on.
    pub async fn run(&self, years: &[i32], recent_days: Option<i64>) -> CveRunReport {
        let mut report = CveRunReport::new(self.source.uses_credential());

        let selectors = years
            .iter()
            .map(|&year| PartitionSelector::Year { year })
            .chain(recent_days.map(|days| PartitionSelector::RecentlyModified { recent_days: days }));

        for selector in selectors {
            let result = self.download(selector).await;
            report.record(selector, result);
        }

        report
    }
}

/// Per-partition results of a [`CveDownloader::run`].
#[derive(Debug, Clone, Serialize)]
pub struct CveRunReport {
    pub api_key_used: bool,
    /// CVEs across year partitions that are on disk.
    pub total_cves: usize,
    #[serde(rename = "cve_files")]
    pub partitions: Vec<PartitionOutcome>,
    pub errors: Vec<String>,
}

impl CveRunReport {
    pub fn new(api_key_used: bool) -> Self {
        Self {
            api_key_used,
            total_cves: 0,
            partitions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record(&mut self, selector: PartitionSelector, result: Result<PartitionOutcome>) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("Error downloading CVEs for {selector}: {e}");
                error!(partition = %selector, error = %e, "Partition failed");
                self.errors.push(message);
                PartitionOutcome::Failed {
                    selector,
                    error: e.to_string(),
                }
            }
        };

        if let (Some(_), Some(count)) = (outcome.selector().year(), outcome.cve_count()) {
            self.total_cves += count;
        }
        self.partitions.push(outcome);
    }

    pub fn failed(&self) -> impl Iterator<Item = &PartitionOutcome> {
        self.partitions.iter().filter(|o| o.is_failed())
    }

    pub fn statistics(&self) -> CveStatistics {
        StatisticsAggregator::aggregate(&self.partitions, Utc::now())
    }

    /// Write `cve_statistics.json` and `phase4_results.json` into `dir`.
    pub async fn save(&self, dir: &Path) -> Result<CveStatistics> {
        let stats = self.statistics();
        write_json_file(&dir.join(STATISTICS_FILE), &stats).await?;
        write_json_file(&dir.join(RESULTS_FILE), self).await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use crate::models::{CveRecord, DateField, DateWindow};
    use crate::store::FileStore;
    use async_trait::async_trait;
    use chrono::Datelike;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns `per_window` records for every window, failing for one year.
    struct ScriptedSource {
        per_window: usize,
        fail_year: Option<i32>,
        calls: Mutex<Vec<DateWindow>>,
    }

    impl ScriptedSource {
        fn new(per_window: usize, fail_year: Option<i32>) -> Self {
            Self {
                per_window,
                fail_year,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<DateWindow> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CveSource for ScriptedSource {
        async fn fetch_all(&self, window: &DateWindow) -> Result<Vec<CveRecord>> {
            self.calls.lock().unwrap().push(window.clone());
            if window.field == DateField::Published && Some(window.start.year()) == self.fail_year
            {
                return Err(HarvestError::source_fetch("scripted", "HTTP 500"));
            }
            Ok((0..self.per_window)
                .map(|i| CveRecord::new(json!({ "cve": { "id": format!("CVE-{}-{i}", window.start.year()) } })))
                .collect())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl PartitionStore for ReadOnlyStore {
        async fn existing_count(&self, _key: &str) -> Result<Option<usize>> {
            Ok(None)
        }

        async fn save(&self, _key: &str, _partition: &PartitionFile) -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn location(&self, key: &str) -> String {
            format!("{key}.json")
        }
    }

    #[tokio::test]
    async fn test_second_download_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(3, None));
        let downloader = CveDownloader::new(source.clone(), Arc::new(FileStore::new(dir.path())));

        let first = downloader.download_year(2024).await.unwrap();
        assert!(matches!(first, PartitionOutcome::Downloaded(_)));
        assert_eq!(first.cve_count(), Some(3));

        let second = downloader.download_year(2024).await.unwrap();
        assert!(matches!(second, PartitionOutcome::AlreadyExists(_)));
        assert_eq!(second.cve_count(), Some(3));

        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_partition_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cve_2023.json"), "truncated{").unwrap();

        let source = Arc::new(ScriptedSource::new(2, None));
        let downloader = CveDownloader::new(source.clone(), Arc::new(FileStore::new(dir.path())));

        let outcome = downloader.download_year(2023).await.unwrap();
        assert!(matches!(outcome, PartitionOutcome::Downloaded(_)));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_window_uses_last_modified() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(1, None));
        let downloader = CveDownloader::new(source.clone(), Arc::new(FileStore::new(dir.path())));

        let outcome = downloader.download_recently_modified(30).await.unwrap();
        assert_eq!(outcome.report().unwrap().file, "cve_recent_modified.json");

        let calls = source.calls();
        assert_eq!(calls[0].field, DateField::LastModified);
        assert_eq!((calls[0].end - calls[0].start).num_days(), 30);

        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("cve_recent_modified.json")).unwrap())
                .unwrap();
        assert_eq!(saved["date_range"], "30 days");
    }

    #[tokio::test]
    async fn test_failed_year_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(2, Some(2024)));
        let downloader = CveDownloader::new(source.clone(), Arc::new(FileStore::new(dir.path())));

        let report = downloader.run(&[2023, 2024, 2025], None).await;

        assert_eq!(report.partitions.len(), 3);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("2024"));
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.total_cves, 4);

        assert!(dir.path().join("cve_2023.json").exists());
        assert!(!dir.path().join("cve_2024.json").exists());
        assert!(dir.path().join("cve_2025.json").exists());
    }

    #[tokio::test]
    async fn test_save_failure_is_recorded() {
        let source = Arc::new(ScriptedSource::new(1, None));
        let downloader = CveDownloader::new(source, Arc::new(ReadOnlyStore));

        let report = downloader.run(&[2022], Some(120)).await;
        assert_eq!(report.partitions.len(), 2);
        assert_eq!(report.errors.len(), 2);
        assert!(report.partitions.iter().all(PartitionOutcome::is_failed));
    }

    #[tokio::test]
    async fn test_run_writes_reports() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(2, None));
        let downloader = CveDownloader::new(source, Arc::new(FileStore::new(dir.path())));

        let report = downloader.run(&[2024, 2025], Some(120)).await;
        let stats = report.save(dir.path()).await.unwrap();

        assert_eq!(stats.total_cves, 4);
        assert_eq!(stats.files, 3);
        assert_eq!(report.total_cves, 4);

        let results: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(RESULTS_FILE)).unwrap()).unwrap();
        assert_eq!(results["api_key_used"], false);
        assert_eq!(results["cve_files"].as_array().unwrap().len(), 3);
        assert_eq!(results["cve_files"][0]["status"], "success");
        assert!(dir.path().join(STATISTICS_FILE).exists());
    }
}
