use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Fetch log entry (JSONL)
// ---------------------------------------------------------------------------

/// A single entry in the fetch log (`~/.clusterboard/fetch-log.jsonl`).
///
/// One line per backend call. Read back by `clusterboard health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: String,
    /// Backend path, e.g. `"/api/faq/clusters/"`.
    pub endpoint: String,
    #[serde(default = "default_true")]
    pub success: bool,
    pub latency_ms: u64,
    /// Number of records decoded, when the call returned a collection.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl FetchLogEntry {
    pub fn success(endpoint: &str, latency_ms: u64, records: Option<usize>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            endpoint: endpoint.to_string(),
            success: true,
            latency_ms,
            records,
            error: None,
        }
    }

    pub fn failure(endpoint: &str, latency_ms: u64, error: &anyhow::Error) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            endpoint: endpoint.to_string(),
            success: false,
            latency_ms,
            records: None,
            error: Some(format!("{error:#}")),
        }
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

// ---------------------------------------------------------------------------
// Fetch log
// ---------------------------------------------------------------------------

/// Append-only JSONL log of backend calls.
///
/// Best-effort: write failures are swallowed so logging can never break a
/// fetch. A disabled log (or one without a resolvable path) is a no-op.
#[derive(Debug, Clone, Default)]
pub struct FetchLog {
    path: Option<PathBuf>,
}

impl FetchLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Build from the `[logging]` section. An empty `path` means the default
    /// location under the home directory.
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let path = if config.path.trim().is_empty() {
            default_log_path()
        } else {
            Some(PathBuf::from(config.path.trim()))
        };
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, entry: &FetchLogEntry) {
        let _ = self.append(entry);
    }

    fn append(&self, entry: &FetchLogEntry) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }

    /// Read every entry. Malformed lines are skipped; a missing file reads
    /// as empty.
    pub fn read_all(&self) -> Vec<FetchLogEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };

        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<FetchLogEntry>(&line).ok())
            .collect()
    }

    /// Entries from the last `days` days, or all when `days` is `None`.
    pub fn read_since_days(&self, days: Option<u32>) -> Vec<FetchLogEntry> {
        let entries = self.read_all();

        let Some(days) = days else {
            return entries;
        };

        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        entries
            .into_iter()
            .filter(|e| e.parsed_timestamp().is_some_and(|t| t >= cutoff))
            .collect()
    }
}

/// Default fetch log location.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".clusterboard").join("fetch-log.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
