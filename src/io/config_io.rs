use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for reading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// `$XDG_CONFIG_HOME/tasktree/config.toml`, falling back to `~/.config`
pub fn config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
        .join("tasktree")
        .join("config.toml")
}

/// `$XDG_DATA_HOME/tasktree`, falling back to `~/.local/share`
pub fn default_data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share").join("tasktree")
}

fn xdg_dir(var: &str, home_fallback: &str) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(home_fallback))
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read the config at `path`. A missing file yields defaults; a malformed
/// one is an error rather than being silently ignored.
pub fn read_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the config from the default location
pub fn read_config() -> Result<Config, ConfigError> {
    read_config_from(&config_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_from(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.storage.key, "TASK_TREE");
    }

    #[test]
    fn reads_values_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[storage]
key = "WORK"

[export]
file_name = "work.json"
"#,
        )
        .unwrap();
        let config = read_config_from(&path).unwrap();
        assert_eq!(config.storage.key, "WORK");
        assert_eq!(config.export.file_name, "work.json");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[storage\nkey = ").unwrap();
        let err = read_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
