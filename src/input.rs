//! Reading user turns from a line-oriented stream.
//!
//! Two conventions are supported.  In [`InputMode::Line`] every non-blank line
//! is a turn.  In [`InputMode::Block`] consecutive lines are gathered until a
//! blank line, which lets a user paste multi-line text as one turn.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::error::{Error, Result};

/// How lines are grouped into user turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Lines accumulate until a blank line ends the turn.
    #[default]
    Block,

    /// Each line is its own turn.
    Line,
}

/// Reads one user turn at a time.
///
/// Blank turns are never produced: a blank line with nothing pending is
/// skipped in either mode.
pub struct TurnReader<R> {
    reader: R,
    mode: InputMode,
}

impl TurnReader<BufReader<Stdin>> {
    /// Reads turns from standard input.
    pub fn stdin(mode: InputMode) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), mode)
    }
}

impl<R: AsyncBufRead + Unpin> TurnReader<R> {
    /// Wraps `reader`, grouping lines according to `mode`.
    pub fn new(reader: R, mode: InputMode) -> Self {
        Self { reader, mode }
    }

    /// The grouping convention in use.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Reads the next turn, or `None` once the stream is exhausted.
    ///
    /// In block mode a final block that is not followed by a blank line is
    /// still returned at end of stream.
    pub async fn next_turn(&mut self) -> Result<Option<String>> {
        let mut pending: Vec<String> = Vec::new();
        loop {
            let mut buf = Vec::new();
            let read = self
                .reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|err| Error::input_read("failed to read user input", err))?;
            if read == 0 {
                return Ok(join(pending));
            }
            // Invalid UTF-8 is replaced, not fatal.
            let buf = String::from_utf8_lossy(&buf);
            let line = strip_line_ending(&buf);
            if line.trim().is_empty() {
                if pending.is_empty() {
                    continue;
                }
                return Ok(join(pending));
            }
            match self.mode {
                InputMode::Line => return Ok(Some(line.to_string())),
                InputMode::Block => pending.push(line.to_string()),
            }
        }
    }
}

fn join(lines: Vec<String>) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
