// File cache of session datasets, one JSON Lines file per session

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_jsonlines::JsonLinesReader;

use crate::errors::GridReplayError;
use crate::writer::write_session_records;

use super::{Session, SessionKey, SessionRecord, SessionSource};

const DATASET_EXTENSION: &str = "jsonl";

/// Directory of cached session datasets.
///
/// Each session lives in `<cache_dir>/<cache_name>.jsonl`. The first line of a dataset is
/// expected to be its `Event` record, which is how sessions are listed without parsing
/// whole files.
#[derive(Clone, Debug)]
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    /// Open a cache directory, creating it if needed
    pub fn new(cache_dir: PathBuf) -> Result<Self, GridReplayError> {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).map_err(|e| GridReplayError::CacheIOError {
                operation: format!("create cache directory {:?}", cache_dir),
                source: e,
            })?;
        }
        Ok(Self { cache_dir })
    }

    /// Open the cache in the platform cache directory
    pub fn new_default() -> Result<Self, GridReplayError> {
        Self::new(Self::default_cache_path()?)
    }

    pub fn default_cache_path() -> Result<PathBuf, GridReplayError> {
        let cache_dir = dirs::cache_dir().ok_or(GridReplayError::NoCacheDir)?;
        Ok(cache_dir.join("gridreplay"))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn file_path_for(&self, key: &SessionKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", key.cache_name(), DATASET_EXTENSION))
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.file_path_for(key).exists()
    }

    /// Load a cached session
    pub fn load(&self, key: &SessionKey) -> Result<Session, GridReplayError> {
        let path = self.file_path_for(key);
        if !path.exists() {
            return Err(GridReplayError::SessionNotFound {
                session: key.to_string(),
            });
        }
        let (file_key, records) = read_records(&path, &key.to_string())?;
        if let Some(file_key) = file_key {
            if &file_key != key {
                warn!(
                    "Dataset {:?} declares session {} but was requested as {}",
                    path, file_key, key
                );
            }
        }
        Session::from_records(key.clone(), records)
    }

    /// Load a dataset from an arbitrary file. The file must start with an `Event` record.
    pub fn load_file(path: &Path) -> Result<Session, GridReplayError> {
        let label = format!("{:?}", path);
        let (key, records) = read_records(path, &label)?;
        let key = key.ok_or_else(|| GridReplayError::SessionLoadError {
            session: label,
            reason: "dataset does not start with an Event record".to_string(),
        })?;
        Session::from_records(key, records)
    }

    /// Store a session, replacing any previous dataset for the same key.
    ///
    /// The dataset is written to a temporary file and moved into place, so a reader
    /// never sees a partially written session.
    pub fn save(&self, session: &Session) -> Result<(), GridReplayError> {
        let file_path = self.file_path_for(&session.key);
        let temp_path = file_path.with_extension(format!("{}.tmp", DATASET_EXTENSION));

        let records = session.to_records();
        if let Err(e) = write_session_records(&temp_path, &records) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &file_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            GridReplayError::CacheIOError {
                operation: format!("move {:?} into place", file_path),
                source: e,
            }
        })?;
        info!("Cached {} at {:?}", session.key, file_path);
        Ok(())
    }

    /// Remove a cached session. Returns whether anything was removed.
    pub fn remove(&self, key: &SessionKey) -> Result<bool, GridReplayError> {
        let path = self.file_path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| GridReplayError::CacheIOError {
            operation: format!("remove {:?}", path),
            source: e,
        })?;
        Ok(true)
    }

    /// Sessions in the cache, identified by the `Event` record on their first line
    pub fn list_available_sessions(&self) -> Result<Vec<SessionKey>, GridReplayError> {
        let entries = fs::read_dir(&self.cache_dir).map_err(|e| GridReplayError::CacheIOError {
            operation: format!("read cache directory {:?}", self.cache_dir),
            source: e,
        })?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DATASET_EXTENSION) {
                continue;
            }
            match read_event_key(&path) {
                Some(key) => keys.push(key),
                None => debug!("Skipping {:?}: no Event record on the first line", path),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl SessionSource for FileCache {
    fn load(&mut self, key: &SessionKey) -> Result<Session, GridReplayError> {
        FileCache::load(self, key)
    }

    fn available_sessions(&self) -> Result<Vec<SessionKey>, GridReplayError> {
        self.list_available_sessions()
    }
}

fn read_records(
    path: &Path,
    label: &str,
) -> Result<(Option<SessionKey>, Vec<SessionRecord>), GridReplayError> {
    let lines = serde_jsonlines::json_lines::<SessionRecord, _>(path).map_err(|e| {
        GridReplayError::CacheIOError {
            operation: format!("open {:?}", path),
            source: e,
        }
    })?;

    let mut key = None;
    let mut records = Vec::new();
    for (line_no, record) in lines.enumerate() {
        let record = record.map_err(|e| GridReplayError::SessionParseError {
            session: label.to_string(),
            line: line_no + 1,
            source: e,
        })?;
        if let SessionRecord::Event(event) = &record {
            key.get_or_insert_with(|| event.key.clone());
        }
        records.push(record);
    }
    Ok((key, records))
}

fn read_event_key(path: &Path) -> Option<SessionKey> {
    let file = File::open(path).ok()?;
    let mut reader = JsonLinesReader::new(BufReader::new(file));

    match reader.read::<SessionRecord>().ok()?? {
        SessionRecord::Event(event) => Some(event.key),
        _ => None,
    }
}
