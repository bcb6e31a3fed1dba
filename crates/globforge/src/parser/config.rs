use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use globforge_util::{LineInfo, LineSink, Matcher};

use crate::config::Config;
use crate::errors::{ParseError, ParseErrorKind};

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[;#][ \t]*(.*)$").unwrap());
static SETTING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z0-9_]+)[ \t]*=[ \t]*(.+)$").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[*\-+#][ \t](.+)$").unwrap());

/// Parses `KEY=value` layer config files into a [`Config`].
///
/// A run of comment lines directly above a setting becomes its documentation; a blank line
/// discards the pending comments.
#[derive(Debug)]
pub struct ConfigParser<'c> {
    config: &'c mut Config,
    comment_block: Vec<String>,
}

impl<'c> ConfigParser<'c> {
    pub fn new(config: &'c mut Config) -> Self {
        ConfigParser {
            config,
            comment_block: vec![],
        }
    }

    /// Join the pending comment lines. Bullets and paragraph breaks start new lines, and runs
    /// of empty lines collapse into one.
    fn format_comments(&self) -> String {
        let mut out = String::new();
        let mut last = "";

        for text in &self.comment_block {
            let text = text.as_str();
            let sep = if out.is_empty() {
                ""
            } else if Matcher::new(last).is_fullmatch(&BULLET_RE) {
                "\n"
            } else if last.is_empty() != text.is_empty() {
                "\n"
            } else if last.is_empty() && text.is_empty() {
                continue;
            } else {
                " "
            };
            trace!(sep, text, "comment");
            out.push_str(sep);
            out.push_str(text);
            last = text;
        }

        out
    }
}

impl LineSink for ConfigParser<'_> {
    fn parse(&mut self, line: &LineInfo) -> anyhow::Result<()> {
        let text = line.text();
        debug!("PARSE: {text}");

        let mut m = Matcher::new(text);
        if text.is_empty() {
            if !self.comment_block.is_empty() {
                debug!("COMMENT_CLEAR");
                self.comment_block.clear();
            }
        } else if m.is_fullmatch(&COMMENT_RE) {
            let content = m.group(1).trim_end();
            debug!("COMMENT += '{content}'");
            self.comment_block.push(content.to_string());
        } else if m.is_fullmatch(&SETTING_RE) {
            let (ident, value) = (m.group(1), m.group(2).trim_end());
            debug!("ADD {ident} = {value}");
            self.config.add_value(line, ident, value)?;
            if !self.comment_block.is_empty() {
                let comment = self.format_comments();
                self.config.set_comment(ident, comment);
                self.comment_block.clear();
            }
        } else {
            return Err(ParseError::new(line, ParseErrorKind::BadGrammar).into());
        }

        Ok(())
    }

    fn parse_end(&mut self) -> anyhow::Result<()> {
        self.comment_block.clear();
        Ok(())
    }
}
