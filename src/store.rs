use crate::error::Result;
use crate::models::PartitionFile;
use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Durable storage for completed partitions.
///
/// Presence of a partition is the only completeness signal the downloader
/// consults; nothing here validates freshness or record counts.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Number of records in the stored partition, `None` when nothing is stored.
    ///
    /// Errors when something is stored but cannot be read.
    async fn existing_count(&self, key: &str) -> Result<Option<usize>>;

    /// Persist a partition as a single unit.
    async fn save(&self, key: &str, partition: &PartitionFile) -> Result<()>;

    /// Human-readable location of `key` (file name for file stores).
    fn location(&self, key: &str) -> String;
}

/// Stores each partition as `<dir>/<key>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

/// Write `value` as pretty JSON, creating parent directories as needed.
pub async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[derive(Deserialize)]
struct CountOnly {
    #[serde(default)]
    vulnerabilities: Vec<IgnoredAny>,
}

#[async_trait]
impl PartitionStore for FileStore {
    async fn existing_count(&self, key: &str) -> Result<Option<usize>> {
        let path = self.path_for(key);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path).await?;
        let parsed: CountOnly = serde_json::from_slice(&bytes)?;
        debug!(path = %path.display(), count = parsed.vulnerabilities.len(), "Read existing partition");
        Ok(Some(parsed.vulnerabilities.len()))
    }

    #[instrument(skip(self, partition), fields(count = partition.vulnerabilities.len()))]
    async fn save(&self, key: &str, partition: &PartitionFile) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let json = serde_json::to_vec_pretty(partition)?;

        // Rename last so an interrupted write never looks like a finished partition.
        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(path = %path.display(), "Saved partition");
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("{key}.json")
    }
}
