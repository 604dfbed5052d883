use crate::catalog::Phase;
use crate::error::{HarvestError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_DIR: &str = "./cybersecurity_datasets";
pub const DEFAULT_CVE_YEARS: [i32; 2] = [2024, 2025];
pub const DEFAULT_RECENT_DAYS: i64 = 120;
/// NVD rejects last-modified ranges longer than 120 days.
pub const MAX_RECENT_DAYS: i64 = 120;
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    /// NVD credential. Its presence alone selects the faster request pacing.
    pub nvd_api_key: Option<String>,
    pub base_dir: PathBuf,
    pub update: bool,
    pub skip_malware: bool,
    pub log_to_file: bool,
    pub log_dir: PathBuf,
    pub cve_years: Vec<i32>,
    pub recent_days: i64,
    pub clone_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nvd_api_key: None,
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            update: false,
            skip_malware: false,
            log_to_file: false,
            log_dir: PathBuf::from("./logs"),
            cve_years: DEFAULT_CVE_YEARS.to_vec(),
            recent_days: DEFAULT_RECENT_DAYS,
            clone_timeout: Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.nvd_api_key = lookup("NVD_API_KEY").filter(|k| !k.trim().is_empty());

        if let Some(dir) = lookup("CYBERSET_BASE_DIR") {
            config.base_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("CYBERSET_LOG_TO_FILE") {
            config.log_to_file = parse_bool("CYBERSET_LOG_TO_FILE", &flag)?;
        }
        if let Some(dir) = lookup("CYBERSET_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(years) = lookup("CYBERSET_CVE_YEARS") {
            config.cve_years = parse_years(&years)?;
        }
        if let Some(days) = lookup("CYBERSET_RECENT_DAYS") {
            let parsed: i64 = days.trim().parse().map_err(|_| {
                HarvestError::config(format!("CYBERSET_RECENT_DAYS is not a number: {days}"))
            })?;
            if !(0..=MAX_RECENT_DAYS).contains(&parsed) {
                return Err(HarvestError::config(format!(
                    "CYBERSET_RECENT_DAYS must be between 0 and {MAX_RECENT_DAYS}, got {parsed}"
                )));
            }
            config.recent_days = parsed;
        }
        if let Some(secs) = lookup("CYBERSET_CLONE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                HarvestError::config(format!(
                    "CYBERSET_CLONE_TIMEOUT_SECS is not a number: {secs}"
                ))
            })?;
            config.clone_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn cve_dir(&self) -> PathBuf {
        self.base_dir.join(Phase::CveDatabase.dir_name())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(HarvestError::config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

pub fn parse_years(value: &str) -> Result<Vec<i32>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| HarvestError::config(format!("invalid CVE year '{part}'")))
        })
        .collect()
}
