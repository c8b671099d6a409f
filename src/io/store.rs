use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::model::forest::Forest;
use crate::model::task::Task;
use crate::ops::task_ops::forest_from_tasks;

/// Key the forest is stored under unless configured otherwise
pub const TASKS_KEY: &str = "TASK_TREE";

/// Error type for the persistence adapter
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("stored tasks under {key} are unreadable: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("could not serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A string key-value store, the only thing persistence needs.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`, written atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        atomic_write(&path, value.as_bytes()).map_err(|source| StoreError::Io { path, source })
    }
}

/// In-process store, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load the forest stored under `key`.
///
/// A missing key is an empty forest. A value that is not a JSON array of
/// tasks, or that repeats an id, is reported as `Corrupt` and left in place.
pub fn load_forest(store: &impl KvStore, key: &str) -> Result<Forest, StoreError> {
    let Some(raw) = store.get(key)? else {
        tracing::debug!(key, "no stored tasks, starting empty");
        return Ok(Forest::new());
    };
    let forest = parse_forest(&raw).map_err(|reason| StoreError::Corrupt {
        key: key.to_string(),
        reason,
    })?;
    tracing::debug!(key, tasks = forest.len(), "loaded tasks");
    Ok(forest)
}

/// Replace the value under `key` with the whole forest as compact JSON.
pub fn save_forest(store: &mut impl KvStore, key: &str, forest: &Forest) -> Result<(), StoreError> {
    let json = serialize_forest(forest)?;
    store.set(key, &json)?;
    tracing::debug!(key, tasks = forest.len(), "saved tasks");
    Ok(())
}

/// Compact JSON array of root tasks, the persisted shape
pub fn serialize_forest(forest: &Forest) -> Result<String, serde_json::Error> {
    serde_json::to_string(&forest.to_tasks())
}

/// Parse a JSON array of root tasks into a forest. Every id must be
/// non-empty and every title non-blank.
pub fn parse_forest(json: &str) -> Result<Forest, String> {
    let tasks: Vec<Task> = serde_json::from_str(json).map_err(|e| e.to_string())?;
    check_fields(&tasks)?;
    forest_from_tasks(tasks).map_err(|e| e.to_string())
}

fn check_fields(tasks: &[Task]) -> Result<(), String> {
    let mut stack: Vec<&Task> = tasks.iter().collect();
    while let Some(task) = stack.pop() {
        if task.id.as_str().is_empty() {
            return Err(format!("task '{}' has an empty id", task.title));
        }
        if task.title.trim().is_empty() {
            return Err(format!("task {} has a blank title", task.id));
        }
        stack.extend(task.children.iter());
    }
    Ok(())
}
