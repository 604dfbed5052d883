//! Aggregate statistics over a CVE download run.

use crate::models::PartitionOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary written next to the partition files as `cve_statistics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveStatistics {
    /// CVEs across year partitions. The rolling window overlaps the years
    /// and is left out.
    pub total_cves: usize,
    /// Partitions available on disk after the run, rolling window included.
    pub files: usize,
    pub by_year: BTreeMap<i32, usize>,
    pub generated_at: DateTime<Utc>,
}

pub struct StatisticsAggregator;

impl StatisticsAggregator {
    pub fn aggregate(outcomes: &[PartitionOutcome], generated_at: DateTime<Utc>) -> CveStatistics {
        let mut by_year = BTreeMap::new();
        let mut files = 0;

        for report in outcomes.iter().filter_map(PartitionOutcome::report) {
            files += 1;
            if let Some(year) = report.selector.year() {
                by_year.insert(year, report.cve_count);
            }
        }

        CveStatistics {
            total_cves: by_year.values().sum(),
            files,
            by_year,
            generated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PartitionReport, PartitionSelector};

    fn report(selector: PartitionSelector, cve_count: usize) -> PartitionReport {
        PartitionReport {
            file: format!("{}.json", selector.key()),
            selector,
            cve_count,
        }
    }

    #[test]
    fn test_aggregate_counts_years_only() {
        let outcomes = vec![
            PartitionOutcome::AlreadyExists(report(PartitionSelector::Year { year: 2024 }, 100)),
            PartitionOutcome::Downloaded(report(PartitionSelector::Year { year: 2025 }, 40)),
            PartitionOutcome::Downloaded(report(
                PartitionSelector::RecentlyModified { recent_days: 120 },
                75,
            )),
        ];

        let stats = StatisticsAggregator::aggregate(&outcomes, Utc::now());
        assert_eq!(stats.total_cves, 140);
        assert_eq!(stats.files, 3);
        assert_eq!(stats.by_year.get(&2024), Some(&100));
        assert_eq!(stats.by_year.get(&2025), Some(&40));
    }

    #[test]
    fn test_failed_partitions_are_skipped() {
        let outcomes = vec![
            PartitionOutcome::Downloaded(report(PartitionSelector::Year { year: 2023 }, 5)),
            PartitionOutcome::Failed {
                selector: PartitionSelector::Year { year: 2024 },
                error: "HTTP error".to_string(),
            },
        ];

        let stats = StatisticsAggregator::aggregate(&outcomes, Utc::now());
        assert_eq!(stats.total_cves, 5);
        assert_eq!(stats.files, 1);
        assert!(!stats.by_year.contains_key(&2024));
    }

    #[test]
    fn test_statistics_json_shape() {
        let stats = StatisticsAggregator::aggregate(
            &[PartitionOutcome::Downloaded(report(PartitionSelector::Year { year: 2024 }, 2))],
            Utc::now(),
        );
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["by_year"]["2024"], 2);
        assert_eq!(value["files"], 1);
    }
}
