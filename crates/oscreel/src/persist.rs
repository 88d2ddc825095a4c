//! Session persistence
//!
//! The recorded log is written exactly once, at shutdown, as a JSON array
//! of `{time, address, data}` objects in recording order. Replay reads the
//! same shape back.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::session::RecordedEvent;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize session for {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Where a session ends up.
#[derive(Debug, Clone)]
pub struct PersistenceSink {
    path: PathBuf,
}

impl PersistenceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `events` as pretty JSON. Returns the number written.
    pub fn flush(&self, events: &[RecordedEvent]) -> Result<usize, PersistError> {
        let file = File::create(&self.path).map_err(|source| PersistError::Create {
            path: self.path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, events).map_err(|source| {
            PersistError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|source| PersistError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!("Saved {} messages to {}", events.len(), self.path.display());
        Ok(events.len())
    }
}

/// Read a persisted session.
pub fn load(path: &Path) -> Result<Vec<RecordedEvent>, PersistError> {
    let contents = std::fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| PersistError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
