use std::io::Write;
use std::path::PathBuf;

use crate::io::recovery::atomic_write;
use crate::model::forest::Forest;

/// File name used when none is configured
pub const DEFAULT_EXPORT_FILE: &str = "tasks.json";

/// Error type for the export adapter
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("there are no tasks to export")]
    EmptyForest,
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Somewhere an export document can be delivered
pub trait ExportSink {
    /// Deliver the document. Returns the file written, if the sink writes one.
    fn deliver(&mut self, file_name: &str, contents: &[u8]) -> Result<Option<PathBuf>, ExportError>;
}

/// Writes the export into a directory, atomically
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSink { dir: dir.into() }
    }
}

impl ExportSink for FileSink {
    fn deliver(
        &mut self,
        file_name: &str,
        contents: &[u8],
    ) -> Result<Option<PathBuf>, ExportError> {
        let path = self.dir.join(file_name);
        atomic_write(&path, contents).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(path))
    }
}

/// Streams the export to any writer (stdout in the CLI)
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExportSink for WriterSink<W> {
    fn deliver(
        &mut self,
        file_name: &str,
        contents: &[u8],
    ) -> Result<Option<PathBuf>, ExportError> {
        let io_err = |source| ExportError::Io {
            path: PathBuf::from(file_name),
            source,
        };
        self.writer.write_all(contents).map_err(io_err)?;
        self.writer.write_all(b"\n").map_err(io_err)?;
        self.writer.flush().map_err(io_err)?;
        Ok(None)
    }
}

/// The whole forest as UTF-8 JSON indented by two spaces, same shape as the
/// store. An empty forest is refused rather than exported as `[]`.
pub fn export_json(forest: &Forest) -> Result<String, ExportError> {
    if forest.is_empty() {
        return Err(ExportError::EmptyForest);
    }
    Ok(serde_json::to_string_pretty(&forest.to_tasks())?)
}

/// Render the forest and hand it to `sink` under `file_name`.
pub fn export_forest(
    forest: &Forest,
    file_name: &str,
    sink: &mut impl ExportSink,
) -> Result<Option<PathBuf>, ExportError> {
    let json = export_json(forest)?;
    let written = sink.deliver(file_name, json.as_bytes())?;
    tracing::info!(tasks = forest.len(), file_name, "exported tasks");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::parse_forest;
    use crate::model::task::{Task, TaskId};
    use crate::ops::task_ops::forest_from_tasks;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Forest {
        forest_from_tasks(vec![
            Task::new(TaskId::from("a"), "A").with_child(Task::new(TaskId::from("b"), "B")),
        ])
        .unwrap()
    }

    #[test]
    fn empty_forest_is_rejected() {
        assert!(matches!(
            export_json(&Forest::new()),
            Err(ExportError::EmptyForest)
        ));
        let mut sink = WriterSink::new(Vec::new());
        assert!(export_forest(&Forest::new(), DEFAULT_EXPORT_FILE, &mut sink).is_err());
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn export_is_two_space_indented() {
        let json = export_json(&sample()).unwrap();
        let expected = r#"[
  {
    "id": "a",
    "title": "A",
    "description": "",
    "completed": false,
    "children": [
      {
        "id": "b",
        "title": "B",
        "description": "",
        "completed": false,
        "children": []
      }
    ]
  }
]"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn export_parses_back_to_same_forest() {
        let forest = sample();
        let json = export_json(&forest).unwrap();
        assert_eq!(parse_forest(&json).unwrap(), forest);
    }

    #[test]
    fn file_sink_writes_named_file() {
        let tmp = TempDir::new().unwrap();
        let mut sink = FileSink::new(tmp.path());
        let written = export_forest(&sample(), "out.json", &mut sink).unwrap();
        let path = written.unwrap();
        assert_eq!(path, tmp.path().join("out.json"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("[\n  {"));
    }

    #[test]
    fn file_sink_reports_io_failure() {
        let tmp = TempDir::new().unwrap();
        let mut sink = FileSink::new(tmp.path().join("no/such/dir"));
        let err = export_forest(&sample(), "out.json", &mut sink).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    #[test]
    fn writer_sink_streams_document() {
        let mut sink = WriterSink::new(Vec::new());
        let written = export_forest(&sample(), DEFAULT_EXPORT_FILE, &mut sink).unwrap();
        assert!(written.is_none());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.ends_with("]\n"));
    }
}
