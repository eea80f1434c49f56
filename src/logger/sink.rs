//! Output sinks.
//!
//! A sink receives fully rendered lines and writes each one to the standard
//! or the error stream. One `write` call must land as one contiguous write.

use std::fmt;
use std::io::{self, Write};

use parking_lot::Mutex;

/// Destination stream for a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Standard,
    Error,
}

impl Stream {
    pub fn as_str(&self) -> &str {
        match self {
            Stream::Standard => "stdout",
            Stream::Error => "stderr",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for rendered lines. `line` already ends with a newline.
pub trait Sink: Send + Sync {
    fn write(&self, stream: Stream, line: &str) -> io::Result<()>;
}

/// Writes to the process's stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn write(&self, stream: Stream, line: &str) -> io::Result<()> {
        match stream {
            Stream::Standard => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.flush()
            }
            Stream::Error => {
                let mut err = io::stderr().lock();
                err.write_all(line.as_bytes())?;
                err.flush()
            }
        }
    }
}

/// Keeps every written line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Stream, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written to `stream`, in write order.
    pub fn lines(&self, stream: Stream) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn stdout(&self) -> Vec<String> {
        self.lines(Stream::Standard)
    }

    pub fn stderr(&self) -> Vec<String> {
        self.lines(Stream::Error)
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&self, stream: Stream, line: &str) -> io::Result<()> {
        self.lines.lock().push((stream, line.to_string()));
        Ok(())
    }
}
