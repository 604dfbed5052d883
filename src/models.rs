//! Core data models for CVE partitions.
//!
//! A partition is the unit of download and persistence: every record the NVD
//! API returns for one date predicate, written to a single file.

use crate::error::{HarvestError, Result};
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp format NVD expects for date-range parameters.
pub const NVD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// One vulnerability entry exactly as the API returned it.
///
/// The payload is kept opaque so partition files preserve every field the
/// server sent; only the identifier is ever inspected, for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CveRecord(serde_json::Value);

impl CveRecord {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The CVE identifier, when the payload has the usual `cve.id` shape.
    pub fn id(&self) -> Option<&str> {
        self.0.get("cve")?.get("id")?.as_str()
    }
}

/// Which timestamp of a CVE a [`DateWindow`] filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Published,
    LastModified,
}

impl DateField {
    /// Query parameter names for the window's start and end.
    pub fn param_names(self) -> (&'static str, &'static str) {
        match self {
            Self::Published => ("pubStartDate", "pubEndDate"),
            Self::LastModified => ("lastModStartDate", "lastModEndDate"),
        }
    }
}

/// A closed date range over one CVE timestamp field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub field: DateField,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// `[year-01-01T00:00:00.000, year-12-31T23:59:59.999]` on the publication date.
    pub fn publication_year(year: i32) -> Result<Self> {
        let invalid = || HarvestError::config(format!("year {year} is out of range"));

        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
            .ok_or_else(invalid)?
            .and_utc();
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .ok_or_else(invalid)?
            .and_utc();

        Ok(Self {
            field: DateField::Published,
            start,
            end,
        })
    }

    /// `[now - days, now]` on the last-modified date, truncated to whole seconds.
    pub fn last_modified_within(days: i64, now: DateTime<Utc>) -> Result<Self> {
        let end = now.trunc_subsecs(0);
        let start = Duration::try_days(days)
            .filter(|_| days >= 0)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(|| HarvestError::config(format!("{days} days is not a valid window")))?;

        Ok(Self {
            field: DateField::LastModified,
            start,
            end,
        })
    }

    pub fn start_param(&self) -> String {
        self.start.format(NVD_DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(NVD_DATE_FORMAT).to_string()
    }

    /// The two date query pairs for this window.
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        let (start_name, end_name) = self.field.param_names();
        [(start_name, self.start_param()), (end_name, self.end_param())]
    }
}

/// Identifies a partition: a publication year or a rolling modification window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionSelector {
    Year { year: i32 },
    RecentlyModified { recent_days: i64 },
}

impl PartitionSelector {
    /// Storage key; also the partition's file stem.
    pub fn key(&self) -> String {
        match self {
            Self::Year { year } => format!("cve_{year}"),
            Self::RecentlyModified { .. } => "cve_recent_modified".to_string(),
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            Self::Year { year } => Some(*year),
            Self::RecentlyModified { .. } => None,
        }
    }

    /// The date predicate for this selector, anchored at `now` for rolling windows.
    pub fn window(&self, now: DateTime<Utc>) -> Result<DateWindow> {
        match self {
            Self::Year { year } => DateWindow::publication_year(*year),
            Self::RecentlyModified { recent_days } => {
                DateWindow::last_modified_within(*recent_days, now)
            }
        }
    }
}

impl fmt::Display for PartitionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year { year } => write!(f, "year {year}"),
            Self::RecentlyModified { recent_days } => {
                write!(f, "recent modifications (last {recent_days} days)")
            }
        }
    }
}

/// Selector description stored at the top of a partition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorMetadata {
    Year {
        year: i32,
    },
    Window {
        date_range: String,
        start_date: String,
        end_date: String,
    },
}

impl SelectorMetadata {
    pub fn describe(selector: &PartitionSelector, window: &DateWindow) -> Self {
        match selector {
            PartitionSelector::Year { year } => Self::Year { year: *year },
            PartitionSelector::RecentlyModified { recent_days } => Self::Window {
                date_range: format!("{recent_days} days"),
                start_date: window.start_param(),
                end_date: window.end_param(),
            },
        }
    }
}

/// The durable form of a fully retrieved partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionFile {
    #[serde(flatten)]
    pub selector: SelectorMetadata,
    pub total_cves: usize,
    pub downloaded_at: DateTime<Utc>,
    pub vulnerabilities: Vec<CveRecord>,
}

impl PartitionFile {
    pub fn new(
        selector: &PartitionSelector,
        window: &DateWindow,
        vulnerabilities: Vec<CveRecord>,
        downloaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            selector: SelectorMetadata::describe(selector, window),
            total_cves: vulnerabilities.len(),
            downloaded_at,
            vulnerabilities,
        }
    }
}

/// A partition that is available on disk after a download attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionReport {
    #[serde(flatten)]
    pub selector: PartitionSelector,
    pub file: String,
    pub cve_count: usize,
}

/// Result of one partition within a multi-partition run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionOutcome {
    /// Fetched from the API and saved during this run.
    #[serde(rename = "success")]
    Downloaded(PartitionReport),
    /// A file was already present; its records were counted, not fetched.
    AlreadyExists(PartitionReport),
    Failed {
        #[serde(flatten)]
        selector: PartitionSelector,
        error: String,
    },
}

impl PartitionOutcome {
    pub fn selector(&self) -> &PartitionSelector {
        match self {
            Self::Downloaded(report) | Self::AlreadyExists(report) => &report.selector,
            Self::Failed { selector, .. } => selector,
        }
    }

    pub fn report(&self) -> Option<&PartitionReport> {
        match self {
            Self::Downloaded(report) | Self::AlreadyExists(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }

    pub fn cve_count(&self) -> Option<usize> {
        self.report().map(|r| r.cve_count)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
