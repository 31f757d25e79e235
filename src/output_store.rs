//! JSON file mapping a slot key (`"HH:MM"`) to the decimal output amount of the
//! swap that ran in that slot.

use crate::error::DispatchError;
use alloy::primitives::U256;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub type OutputRecord = BTreeMap<String, String>;

pub const DEFAULT_OUTPUT_KEYS: [&str; 2] = ["12:00", "19:00"];

pub fn default_outputs() -> OutputRecord {
    DEFAULT_OUTPUT_KEYS
        .iter()
        .map(|key| (key.to_string(), "0".to_string()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    path: PathBuf,
}

impl OutputStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current record. A missing file or malformed content is replaced by the
    /// default; any other I/O failure is returned and the file is left alone.
    pub fn read(&self) -> Result<OutputRecord, DispatchError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("📁 No output store at {}, initialising", self.path.display());
                return self.reset();
            }
            // Not UTF-8: treat like any other malformed content.
            Err(e) if e.kind() == ErrorKind::InvalidData => String::new(),
            Err(e) => return Err(store_error(&self.path, e)),
        };

        match serde_json::from_str::<OutputRecord>(&content) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(
                    "⚠️ Output store {} is malformed ({}), resetting to defaults",
                    self.path.display(),
                    e
                );
                self.reset()
            }
        }
    }

    /// Replaces the whole file through a sibling temp file and a rename.
    pub fn write(&self, record: &OutputRecord) -> Result<(), DispatchError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| store_error(&self.path, e))?;
        }

        let json = serde_json::to_string_pretty(record).map_err(|e| DispatchError::Store(e.to_string()))?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).map_err(|e| store_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| store_error(&self.path, e))?;
        Ok(())
    }

    pub fn record(&self, key: &str, amount: U256) -> Result<(), DispatchError> {
        let mut record = self.read()?;
        record.insert(key.to_string(), amount.to_string());
        self.write(&record)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, DispatchError> {
        Ok(self.read()?.remove(key))
    }

    fn reset(&self) -> Result<OutputRecord, DispatchError> {
        let record = default_outputs();
        self.write(&record)?;
        Ok(record)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn store_error(path: &Path, e: std::io::Error) -> DispatchError {
    DispatchError::Store(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> OutputStore {
        OutputStore::new(dir.path().join("data").join("swap_outputs.json"))
    }

    #[test]
    fn test_missing_file_initialises_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let record = store.read().unwrap();

        assert_eq!(record, default_outputs());
        assert!(store.path().exists());
        let on_disk: OutputRecord =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.get("12:00").map(String::as_str), Some("0"));
        assert_eq!(on_disk.get("19:00").map(String::as_str), Some("0"));
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert_eq!(store.read().unwrap(), default_outputs());
        assert_eq!(store.read().unwrap(), default_outputs());
    }

    #[test]
    fn test_record_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.record("19:00", U256::from(500u64)).unwrap();
        store.record("12:00", U256::from(42u64)).unwrap();
        store.record("19:00", U256::from(501u64)).unwrap();

        assert_eq!(store.get("12:00").unwrap().as_deref(), Some("42"));
        assert_eq!(store.get("19:00").unwrap().as_deref(), Some("501"));
        assert_eq!(store.get("20:00").unwrap(), None);
        assert!(!dir.path().join("data").join("swap_outputs.json.tmp").exists());
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let record: OutputRecord = [
            ("06:45".to_string(), "123456789".to_string()),
            ("23:59".to_string(), "0".to_string()),
            ("evening".to_string(), "42".to_string()),
        ]
        .into_iter()
        .collect();

        store.write(&record).unwrap();
        let read_back = store.read().unwrap();

        assert_eq!(read_back, record);
        assert!(!read_back.contains_key("12:00"));
        assert!(!read_back.contains_key("19:00"));

        store.write(&OutputRecord::new()).unwrap();
        assert_eq!(store.read().unwrap(), OutputRecord::new());
    }

    #[test]
    fn test_unreadable_store_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as a string.
        let store = OutputStore::new(dir.path().to_path_buf());

        assert!(matches!(store.read(), Err(DispatchError::Store(_))));
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_non_utf8_store_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), [0xff, 0xfe, 0x00]).unwrap();

        assert_eq!(store.read().unwrap(), default_outputs());
    }

    #[test]
    fn test_large_amounts_survive_as_decimal_strings() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let amount = U256::from(10u64).pow(U256::from(30u64));

        store.record("12:00", amount).unwrap();

        assert_eq!(
            store.get("12:00").unwrap().as_deref(),
            Some("1000000000000000000000000000000")
        );
    }
}
