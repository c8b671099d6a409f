use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Header written at the top of a new recovery log.
const FILE_HEADER: &str = "\
<!-- tasktree recovery log: task forests that could not be saved.
     Each entry holds the full JSON that was about to be written.
     View with: tt recovery
     Safe to delete once you have what you need. -->

---
";

/// A forest snapshot that failed to reach the store
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub fields: Vec<(String, String)>,
    /// The JSON that could not be written
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(description: impl Into<String>, body: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            description: description.into(),
            fields: Vec::new(),
            body: body.into(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```json\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }
}

pub fn recovery_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Append an entry to the recovery log. Failures are logged, not returned:
/// this runs while another error is already being reported.
pub fn log_recovery(data_dir: &Path, entry: RecoveryEntry) -> Option<PathBuf> {
    let path = recovery_log_path(data_dir);
    match append_entry(&path, &entry) {
        Ok(()) => {
            tracing::warn!(
                path = %path.display(),
                "{} (snapshot kept in recovery log)",
                entry.description
            );
            Some(path)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "could not write recovery log");
            None
        }
    }
}

/// Second home for the recovery log, used when the data dir itself rejects
/// writes.
pub fn fallback_recovery_dir() -> PathBuf {
    std::env::temp_dir().join("tasktree")
}

/// Append to the log in `data_dir`, or to the one in `fallback` if that fails.
pub fn log_recovery_or_fallback(
    data_dir: &Path,
    fallback: &Path,
    entry: RecoveryEntry,
) -> Option<PathBuf> {
    log_recovery(data_dir, entry.clone()).or_else(|| log_recovery(fallback, entry))
}

/// Full text of the recovery log, if there is one
pub fn read_recovery_log(data_dir: &Path) -> Option<String> {
    fs::read_to_string(recovery_log_path(data_dir))
        .ok()
        .filter(|s| !s.is_empty())
}

fn append_entry(path: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let needs_header = fs::metadata(path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}
