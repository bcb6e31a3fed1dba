use std::fmt;
use std::sync::Arc;

/// Provenance of one physical line: the file it came from, its 1-based number, and its
/// (stripped) text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInfo {
    source: Arc<str>,
    line_no: usize,
    text: String,
}

impl LineInfo {
    pub fn new<S: Into<Arc<str>>, T: Into<String>>(source: S, line_no: usize, text: T) -> Self {
        LineInfo {
            source: source.into(),
            line_no,
            text: text.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_no(&self) -> usize {
        self.line_no
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the cached text without touching the source or line number.
    pub fn set_text<T: Into<String>>(&mut self, text: T) {
        self.text = text.into();
    }
}

impl fmt::Display for LineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line_no)
    }
}
