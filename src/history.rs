use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::models::ItemRecord;
use crate::utils::error::Result;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Bounded list of observed title changes kept in a JSON file.
///
/// Persistence is best-effort: unreadable or corrupt files load as an empty
/// history and write failures are only logged.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.history_file, config.history_limit)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents, oldest first.
    pub fn load(&self) -> Vec<ItemRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("⚠️ Could not read history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                match discarded_entries(&raw) {
                    Some(count) => warn!(
                        "⚠️ History file {} has invalid records, discarding {} entries: {}",
                        self.path.display(),
                        count,
                        e
                    ),
                    None => warn!(
                        "⚠️ History file {} is corrupt, starting a new one: {}",
                        self.path.display(),
                        e
                    ),
                }
                Vec::new()
            }
        }
    }

    pub fn append(&self, record: &ItemRecord) {
        match self.try_append(record) {
            Ok(len) => info!("💾 History saved ({} records)", len),
            Err(e) => warn!("⚠️ Failed to save history {}: {}", self.path.display(), e),
        }
    }

    fn try_append(&self, record: &ItemRecord) -> Result<usize> {
        let mut records = self.load();
        records.push(record.clone());
        if records.len() > self.limit {
            let excess = records.len() - self.limit;
            records.drain(..excess);
        }

        let json = serde_json::to_string_pretty(&records)?;
        self.write_replacing(&json)?;
        Ok(records.len())
    }

    /// Write to a sibling file, then rename it over the target so readers
    /// never see a half-written history.
    fn write_replacing(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, contents)?;
        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Number of entries in `raw` when it is a JSON array at all.
fn discarded_entries(raw: &str) -> Option<usize> {
    serde_json::from_str::<Vec<serde_json::Value>>(raw)
        .ok()
        .map(|entries| entries.len())
}
