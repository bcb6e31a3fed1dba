//! Line-oriented parsers for the four globforge file formats.
//!
//! Every parser is a [`LineSink`](globforge_util::LineSink): it is fed one stripped line at a
//! time and keeps an explicit stack of open blocks. Lines starting with `;` or `#` are
//! comments and lines starting with `:` are directives. Anything else is either a `key value`
//! parameter of the innermost block or, in manifests, an entry under the current label.

use once_cell::sync::Lazy;
use regex::Regex;

use globforge_util::LineInfo;

use crate::errors::{ParseError, ParseErrorKind};

pub mod config;
pub mod definition;
pub mod manifest;
pub mod project;

pub use config::ConfigParser;
pub use definition::DefinitionParser;
pub use manifest::ManifestParser;
pub use project::ProjectParser;

#[cfg(test)]
mod tests;

pub(crate) static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[;#].*$").unwrap());
pub(crate) static BLOCK_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^end$").unwrap());
pub(crate) static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());
pub(crate) static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z0-9_]+)[ \t]+(.+)$").unwrap());
pub(crate) static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^include[ \t]+(.+)$").unwrap());

/// How a line should be handled.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineKind<'a> {
    Blank,
    Comment,
    /// Directive text with the leading `:` and whitespace removed.
    Directive(&'a str),
    Other(&'a str),
}

pub(crate) fn classify(text: &str) -> LineKind<'_> {
    if text.is_empty() {
        LineKind::Blank
    } else if COMMENT_RE.is_match(text) {
        LineKind::Comment
    } else if let Some(rest) = text.strip_prefix(':') {
        LineKind::Directive(rest.trim_start())
    } else {
        LineKind::Other(text)
    }
}

/// Opening line of a block, for "unterminated block" reports.
pub(crate) fn unterminated(line: &LineInfo, start: &LineInfo) -> ParseError {
    ParseError::new(line, ParseErrorKind::Unterminated(start.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classify_lines() {
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(classify("; note"), LineKind::Comment);
        assert_eq!(classify("#"), LineKind::Comment);
        assert_eq!(classify(":  end"), LineKind::Directive("end"));
        assert_eq!(classify("type BOOL"), LineKind::Other("type BOOL"));
    }
}
