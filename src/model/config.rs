use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration from `config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the store. Defaults to the XDG data directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Key the forest is stored under
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            dir: None,
            key: default_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory exports are written to. Defaults to the current directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_export_file")]
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            dir: None,
            file_name: default_export_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// A `tracing` filter directive, e.g. `info` or `tasktree=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_key() -> String {
    "TASK_TREE".to_string()
}

fn default_export_file() -> String {
    "tasks.json".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}
