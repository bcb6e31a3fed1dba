use std::ops::BitOr;

use derive_more::Display;
use tracing::trace;

use crate::errors::{LexerError, LexerResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParserFlags(u8);

impl ParserFlags {
    pub const NONE: ParserFlags = ParserFlags(0);
    /// Allow nested boundary pairs.
    pub const MULTI_LEVEL: ParserFlags = ParserFlags(1 << 0);
    /// Trace every step of the state machine.
    pub const DEBUG: ParserFlags = ParserFlags(1 << 1);

    pub fn contains(self, other: ParserFlags) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for ParserFlags {
    type Output = ParserFlags;

    fn bitor(self, rhs: ParserFlags) -> ParserFlags {
        ParserFlags(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum ParseStatus {
    #[default]
    #[display("INCOMPLETE")]
    Incomplete,
    #[display("FINISHED")]
    Finished,
    #[display("ERROR")]
    Error,
}

/// Buffers shared by every [`StatefulParser`]: text not yet consumed, text already matched,
/// and the overall status.
#[derive(Debug, Default)]
pub struct ParserCore {
    flags: ParserFlags,
    status: ParseStatus,
    error: Option<LexerError>,
    pub(crate) text: String,
    parsed: String,
    last_parsed: String,
}

impl ParserCore {
    pub fn new(flags: ParserFlags) -> Self {
        ParserCore {
            flags,
            ..Default::default()
        }
    }

    pub fn flags(&self) -> ParserFlags {
        self.flags
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn append_parsed(&mut self, text: &str) {
        self.last_parsed.clear();
        self.last_parsed.push_str(text);
        self.parsed.push_str(text);
    }

    pub fn complete(&mut self) {
        self.status = ParseStatus::Finished;
    }

    /// Mark the parse as failed and hand the error back for propagation.
    pub fn fail(&mut self, err: LexerError) -> LexerError {
        if self.flags.contains(ParserFlags::DEBUG) {
            trace!(error = %err, remaining = %self.text, "parse failed");
        }
        self.status = ParseStatus::Error;
        self.error = Some(err.clone());
        err
    }
}

/// Incremental text parser driven in a "parse until stable" loop.
///
/// Implementors only handle [`StatefulParser::on_text`]; the provided [`StatefulParser::parse`]
/// appends new input and keeps calling it while it makes progress.
pub trait StatefulParser {
    fn core(&self) -> &ParserCore;
    fn core_mut(&mut self) -> &mut ParserCore;

    /// Consume as much pending text as the current state allows.
    fn on_text(&mut self) -> LexerResult<()>;

    fn status(&self) -> ParseStatus {
        self.core().status
    }

    fn error(&self) -> Option<&LexerError> {
        self.core().error.as_ref()
    }

    fn parsed_text(&self) -> &str {
        &self.core().parsed
    }

    fn last_parsed_text(&self) -> &str {
        &self.core().last_parsed
    }

    fn remaining_text(&self) -> &str {
        &self.core().text
    }

    fn is_flag_set(&self, flag: ParserFlags) -> bool {
        self.core().flags.contains(flag)
    }

    fn parse(&mut self, text: &str) -> LexerResult<ParseStatus> {
        match self.status() {
            ParseStatus::Error => {
                let err = self
                    .error()
                    .cloned()
                    .unwrap_or_else(|| LexerError::UnexpectedText(text.to_string()));
                return Err(err);
            }
            ParseStatus::Finished if !text.is_empty() => {
                self.core_mut().text.push_str(text);
                return Err(self.core_mut().fail(LexerError::DataAfterFinish));
            }
            _ => {}
        }

        self.core_mut().text.push_str(text);

        loop {
            let before = self.core().text.len();
            if self.is_flag_set(ParserFlags::DEBUG) {
                trace!(text = %self.core().text, parsed = %self.core().parsed, "on_text");
            }

            self.on_text()?;

            if self.status() != ParseStatus::Incomplete {
                break;
            }

            let core = self.core_mut();
            if core.text.len() == before {
                // No progress: whatever is left belongs to the parsed span
                if !core.text.is_empty() {
                    let rest = std::mem::take(&mut core.text);
                    core.append_parsed(&rest);
                }
                break;
            }
        }

        Ok(self.status())
    }
}
