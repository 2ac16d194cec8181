//! Append-only transcript file.
//!
//! Every completed turn is written as one labeled entry (`user: ...` or
//! `agent: ...`).  The file is opened, written, flushed, and closed for each
//! turn, so an abrupt exit never leaves a half-written turn behind a buffered
//! handle.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::observability::SINK_WRITE_ERRORS;
use crate::types::Turn;

/// Appends turns to a text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSink {
    path: PathBuf,
}

impl TranscriptSink {
    /// Creates a sink for `path`.  Nothing is touched until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file turns are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `turn` as a labeled entry.
    ///
    /// The file is created if it does not exist.  Existing content is never
    /// truncated.
    pub fn write_turn(&self, turn: &Turn) -> Result<()> {
        self.append(turn).inspect_err(|err| {
            SINK_WRITE_ERRORS.click();
            tracing::warn!(path = %self.path.display(), error = %err, "transcript write failed");
        })
    }

    fn append(&self, turn: &Turn) -> Result<()> {
        let display = self.path.display().to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| Error::output_write("cannot open transcript file", &display, err))?;
        writeln!(file, "{turn}")
            .and_then(|()| file.flush())
            .map_err(|err| Error::output_write("cannot write transcript file", &display, err))
    }
}
