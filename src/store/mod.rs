//! JSON hero-record store
//!
//! One pretty-printed JSON object per hero under a single directory. Records
//! are handled as open JSON maps so fields this crate does not own survive a
//! read-modify-write cycle untouched, in their original key order.

pub mod writer;

pub use writer::{HeroDatasetWriter, WriteSummary};

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub type HeroRecord = serde_json::Map<String, serde_json::Value>;

/// Renamed heroes: (local record name, API display name), lowercase
const NAME_ALIASES: &[(&str, &str)] = &[("outworld devourer", "outworld destroyer")];

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    InvalidRecord(PathBuf),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Serialization(e) => write!(f, "Serialization error: {}", e),
            StoreError::InvalidRecord(path) => {
                write!(f, "Not a hero record (expected a JSON object): {}", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {}

pub struct HeroStore {
    /// Lowercase record name -> file
    index: BTreeMap<String, PathBuf>,
}

impl HeroStore {
    /// Scan `dir` for `*.json` records and index them by their `name` field.
    ///
    /// Unreadable files and files without a name are skipped with a warning.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let mut index = BTreeMap::new();

        for path in list_json_files(&dir)? {
            let record = match read_record(&path) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("⚠️  Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let Some(name) = record.get("name").and_then(|n| n.as_str()) else {
                log::warn!("⚠️  Skipping {}: no name field", path.display());
                continue;
            };

            let key = name.to_lowercase();
            if index.contains_key(&key) {
                log::warn!("⚠️  Duplicate record for '{}' in {}, ignoring", name, path.display());
                continue;
            }
            index.insert(key, path);
        }

        log::debug!("Indexed {} hero records in {}", index.len(), dir.display());
        Ok(Self { index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Find the record file for a hero name, case-insensitively, following
    /// rename aliases in both directions.
    pub fn locate(&self, name: &str) -> Option<&Path> {
        let key = name.to_lowercase();
        if let Some(path) = self.index.get(&key) {
            return Some(path);
        }

        NAME_ALIASES
            .iter()
            .find_map(|(local, remote)| {
                if key == *remote {
                    self.index.get(*local)
                } else if key == *local {
                    self.index.get(*remote)
                } else {
                    None
                }
            })
            .map(PathBuf::as_path)
    }

    pub fn load(&self, path: &Path) -> Result<HeroRecord, StoreError> {
        read_record(path)
    }

    /// Replace a record atomically (temp file in the same directory + rename)
    pub fn save(&self, path: &Path, record: &HeroRecord) -> Result<(), StoreError> {
        write_json_atomic(path, record)
    }

    /// Every indexed record, in file-name order
    pub fn load_all(&self) -> Result<Vec<HeroRecord>, StoreError> {
        let mut paths: Vec<&PathBuf> = self.index.values().collect();
        paths.sort();
        paths.into_iter().map(|p| read_record(p)).collect()
    }
}

fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_record(path: &Path) -> Result<HeroRecord, StoreError> {
    let data = fs::read_to_string(path)?;
    match serde_json::from_str::<serde_json::Value>(&data)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidRecord(path.to_path_buf())),
    }
}

/// Pretty JSON with two-space indent, written via temp file + rename
pub fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)?;
    let json = serde_json::to_string_pretty(value)?;
    temp_file.write_all(json.as_bytes())?;
    temp_file.write_all(b"\n")?;
    temp_file.flush()?;

    temp_file.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
