use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const HISTORY_FILE_NAME: &str = "history.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub query: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(query: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            query: query.into(),
            timestamp,
        }
    }

    #[must_use]
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("{} — {}", self.display_time(), self.query)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct History {
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records `query` at the front. Only the newest entry is checked for a
    /// duplicate; a match just has its timestamp refreshed.
    pub fn append(&mut self, query: &str, max_len: usize, now: DateTime<Utc>) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }

        if let Some(newest) = self.entries.first_mut() {
            if newest.query == query {
                newest.timestamp = now;
                return true;
            }
        }

        self.entries.insert(0, HistoryEntry::new(query, now));
        self.truncate(max_len);
        true
    }

    pub fn truncate(&mut self, max_len: usize) {
        self.entries.truncate(max_len);
    }

    pub fn delete(&mut self, index: usize) -> Option<HistoryEntry> {
        if index >= self.entries.len() {
            return None;
        }
        Some(self.entries.remove(index))
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create history directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize history: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write history file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn in_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(HISTORY_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<History, HistoryError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(History::new()),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<History>(&raw) {
            Ok(history) => Ok(history),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "history file corrupt, starting empty");
                Ok(History::new())
            }
        }
    }

    pub fn save(&self, history: &History) -> Result<(), HistoryError> {
        if let Some(parent_dir) = self.path.parent() {
            fs::create_dir_all(parent_dir).map_err(|source| HistoryError::CreateDir {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let rendered = serde_json::to_string_pretty(history)
            .map_err(|source| HistoryError::Serialize { source })?;

        fs::write(&self.path, rendered).map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source,
        })?;
        restrict_permissions(&self.path).map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use super::{FileHistoryStore, History};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0)
            .single()
            .expect("valid timestamp")
    }

    fn queries(history: &History) -> Vec<&str> {
        history
            .entries()
            .iter()
            .map(|entry| entry.query.as_str())
            .collect()
    }

    #[test]
    fn consecutive_duplicate_only_refreshes_timestamp() {
        let mut history = History::new();
        history.append("select 1", 200, at(0));
        history.append("  select 1\n", 200, at(30));

        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].query, "select 1");
        assert_eq!(history.entries()[0].timestamp, at(30));
    }

    #[test]
    fn non_consecutive_duplicates_are_kept() {
        let mut history = History::new();
        history.append("select 1", 200, at(0));
        history.append("select 2", 200, at(1));
        history.append("select 1", 200, at(2));

        assert_eq!(queries(&history), vec!["select 1", "select 2", "select 1"]);
    }

    #[test]
    fn blank_queries_are_ignored() {
        let mut history = History::new();
        assert!(!history.append("   \n\t", 200, at(0)));
        assert!(history.is_empty());
    }

    #[test]
    fn eviction_drops_oldest_entries_beyond_max_len() {
        let max_len = 10;
        let mut history = History::new();
        for index in 0..max_len + 5 {
            history.append(&format!("select {index}"), max_len, at(index as i64));
        }

        assert_eq!(history.len(), max_len);
        assert_eq!(history.entries()[0].query, "select 14");
        assert_eq!(history.entries()[max_len - 1].query, "select 5");
    }

    #[test]
    fn delete_removes_only_the_given_index() {
        let mut history = History::new();
        history.append("a", 200, at(0));
        history.append("b", 200, at(1));
        history.append("c", 200, at(2));

        let removed = history.delete(1).expect("entry should exist");
        assert_eq!(removed.query, "b");
        assert_eq!(queries(&history), vec!["c", "a"]);
        assert!(history.delete(5).is_none());
    }

    #[test]
    fn missing_history_file_loads_empty() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = FileHistoryStore::in_dir(temp_dir.path());

        let history = store.load().expect("missing file is not an error");
        assert!(history.is_empty());
    }

    #[test]
    fn save_and_load_round_trip_preserves_order() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = FileHistoryStore::in_dir(&temp_dir.path().join("nested").join("dbx"));

        let mut history = History::new();
        history.append("select 1", 200, at(0));
        history.append("select\n  2", 200, at(0) + Duration::milliseconds(1_500));
        store.save(&history).expect("save should create parent dirs");

        let reloaded = store.load().expect("reload should succeed");
        assert_eq!(reloaded, history);
        assert_eq!(queries(&reloaded), vec!["select\n  2", "select 1"]);
    }

    #[test]
    fn saved_file_uses_entries_document_shape() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = FileHistoryStore::in_dir(temp_dir.path());
        let mut history = History::new();
        history.append("select 1", 200, at(0));
        store.save(&history).expect("save should succeed");

        let raw = fs::read_to_string(store.path()).expect("history should be readable");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("invalid json");
        assert_eq!(parsed["entries"][0]["query"], "select 1");
        assert!(parsed["entries"][0]["timestamp"]
            .as_str()
            .is_some_and(|stamp| stamp.starts_with("2023-11-14T22:13:20")));
    }

    #[test]
    fn corrupt_history_file_loads_empty() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = FileHistoryStore::in_dir(temp_dir.path());
        fs::write(store.path(), "[[[ definitely not history").expect("failed to seed file");

        let history = store.load().expect("corruption is not an error");
        assert!(history.is_empty());
    }

    #[test]
    fn truncate_keeps_newest_entries() {
        let mut history = History::new();
        for index in 0..5 {
            history.append(&format!("select {index}"), 10, at(index));
        }

        history.truncate(3);

        assert_eq!(queries(&history), ["select 4", "select 3", "select 2"]);
        history.truncate(10);
        assert_eq!(history.len(), 3);
    }
}
