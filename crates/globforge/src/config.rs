use std::path::{Path, PathBuf};

use globforge_settings::Settings;
use globforge_util::LineInfo;
use indexmap::IndexMap;
use tracing::error;

use crate::errors::{BuildError, ParseError, ParseResult};

/// The values of one layer config file, with the comment block documenting each.
#[derive(Debug, Default)]
pub struct Config {
    filename: PathBuf,
    err_fatal: bool,
    settings: Settings,
    comments: IndexMap<String, String>,
    lines: IndexMap<String, LineInfo>,
    errors: Vec<ParseError>,
}

impl Config {
    /// With `err_fatal` unset, failures are logged and collected instead of returned.
    pub fn new<P: Into<PathBuf>>(filename: P, err_fatal: bool) -> Self {
        Config {
            filename: filename.into(),
            err_fatal,
            ..Default::default()
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn add_value(&mut self, line: &LineInfo, ident: &str, value: &str) -> ParseResult<()> {
        if self.settings.has_key(ident) {
            let first = self.lines.get(ident).map(ToString::to_string).unwrap_or_default();
            self.log_error(ParseError::new(
                line,
                BuildError::DuplicateValue(format!("{ident} (first set at {first})")),
            ))?;
        }
        if let Err(err) = self.settings.set(ident, value) {
            return self.log_error(ParseError::new(line, err));
        }
        self.lines.insert(ident.to_string(), line.clone());
        Ok(())
    }

    pub fn set_comment(&mut self, ident: &str, text: String) {
        self.comments.insert(ident.to_string(), text);
    }

    /// Documentation attached to `ident`, or an empty string.
    pub fn comment(&self, ident: &str) -> &str {
        self.comments.get(ident).map(String::as_str).unwrap_or_default()
    }

    /// Where `ident` was set.
    pub fn line(&self, ident: &str) -> Option<&LineInfo> {
        self.lines.get(ident)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Errors collected in non-fatal mode.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn log_error(&mut self, err: ParseError) -> ParseResult<()> {
        if self.err_fatal {
            return Err(err);
        }
        error!("{err}");
        self.errors.push(err);
        Ok(())
    }
}
