use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::trace;

use crate::LineInfo;

/// A line-oriented consumer, fed one stripped physical line at a time.
pub trait LineSink {
    fn parse(&mut self, line: &LineInfo) -> anyhow::Result<()>;

    /// Called once after the last line of a top-level read.
    fn parse_end(&mut self) -> anyhow::Result<()>;
}

/// Feed every line of `path` to `sink`, without calling [`LineSink::parse_end`]. Used for
/// includes, where the enclosing read finishes the parse.
pub fn read_lines<S: LineSink + ?Sized>(sink: &mut S, path: &Path) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("Could not open '{}'", path.display()))?;
    let source: Arc<str> = Arc::from(path.display().to_string());
    trace!("reading {source}");

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Could not read '{}'", path.display()))?;
        sink.parse(&LineInfo::new(source.clone(), idx + 1, line.trim()))?;
    }

    Ok(())
}

pub fn read_file<S: LineSink + ?Sized>(sink: &mut S, path: &Path) -> anyhow::Result<()> {
    read_lines(sink, path)?;
    sink.parse_end()
}

/// Like [`read_file`], but over an in-memory buffer named `source`.
pub fn read_str<S: LineSink + ?Sized>(sink: &mut S, source: &str, text: &str) -> anyhow::Result<()> {
    let source: Arc<str> = Arc::from(source);
    for (idx, line) in text.lines().enumerate() {
        sink.parse(&LineInfo::new(source.clone(), idx + 1, line.trim()))?;
    }
    sink.parse_end()
}
