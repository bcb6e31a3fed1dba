use tracing::trace;

use crate::errors::{LexerError, LexerResult};
use crate::stateful::{ParserCore, ParserFlags, StatefulParser};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BoundState {
    LBound,
    RBound,
    Done,
}

/// Extracts the text between a left and right boundary character, e.g. the inside of a
/// parenthesized expression or a quoted string.
///
/// String literals are opaque: boundary characters inside them do not count. When the
/// boundary itself is a string delimiter, the first unescaped occurrence closes the span.
/// Only the outermost pair of boundaries is stripped; nested pairs (with
/// [`ParserFlags::MULTI_LEVEL`]) are kept verbatim.
#[derive(Debug)]
pub struct BoundedParser {
    core: ParserCore,
    lbound: char,
    rbound: char,
    string_delims: String,
    escape: char,
    string_is_bound: bool,
    state: BoundState,
    level: usize,
    string_char: Option<char>,
    escaped: bool,
}

impl BoundedParser {
    pub const DEFAULT_STRING_DELIMS: &'static str = "\"'";
    pub const DEFAULT_ESCAPE: char = '\\';

    pub fn new(lbound: char, rbound: char, flags: ParserFlags) -> Self {
        BoundedParser {
            core: ParserCore::new(flags),
            lbound,
            rbound,
            string_delims: Self::DEFAULT_STRING_DELIMS.to_string(),
            escape: Self::DEFAULT_ESCAPE,
            string_is_bound: Self::DEFAULT_STRING_DELIMS.contains(lbound),
            state: BoundState::LBound,
            level: 0,
            string_char: None,
            escaped: false,
        }
    }

    /// A parser for text wrapped in the same character on both sides, like `'...'`.
    pub fn quoted(delim: char, flags: ParserFlags) -> Self {
        Self::new(delim, delim, flags)
    }

    pub fn with_string_delims<S: Into<String>>(mut self, delims: S, escape: char) -> Self {
        self.string_delims = delims.into();
        self.string_is_bound = self.string_delims.contains(self.lbound);
        self.escape = escape;
        self
    }

    pub fn is_multi_level(&self) -> bool {
        self.is_flag_set(ParserFlags::MULTI_LEVEL)
    }

    /// Whether the opening boundary has been consumed.
    pub fn has_lbound(&self) -> bool {
        self.state != BoundState::LBound
    }

    fn close_level(&mut self, c: char, parsed: &mut String) {
        self.level -= 1;
        if self.level == 0 {
            self.state = BoundState::Done;
        } else {
            parsed.push(c);
        }
    }

    fn on_rbound_char(&mut self, c: char, parsed: &mut String) -> LexerResult<()> {
        if self.escaped {
            self.escaped = false;
            parsed.push(c);
            return Ok(());
        }

        if self.string_is_bound {
            if c == self.escape {
                self.escaped = true;
                parsed.push(c);
            } else if c == self.rbound {
                self.close_level(c, parsed);
            } else {
                parsed.push(c);
            }
            return Ok(());
        }

        if let Some(quote) = self.string_char {
            if c == self.escape {
                self.escaped = true;
            } else if c == quote {
                self.string_char = None;
            }
            parsed.push(c);
            return Ok(());
        }

        if self.string_delims.contains(c) {
            self.string_char = Some(c);
            parsed.push(c);
        } else if c == self.lbound {
            if !self.is_multi_level() {
                return Err(LexerError::UnexpectedBoundary(c));
            }
            self.level += 1;
            parsed.push(c);
        } else if c == self.rbound {
            self.close_level(c, parsed);
        } else {
            parsed.push(c);
        }

        Ok(())
    }
}

impl StatefulParser for BoundedParser {
    fn core(&self) -> &ParserCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ParserCore {
        &mut self.core
    }

    fn on_text(&mut self) -> LexerResult<()> {
        if self.state == BoundState::Done {
            self.core.complete();
            return Ok(());
        }

        let text = self.core.take_text();
        let mut parsed = String::new();
        let mut consumed = text.len();
        let mut failure = None;

        for (idx, c) in text.char_indices() {
            let step = match self.state {
                BoundState::Done => {
                    consumed = idx;
                    break;
                }
                BoundState::LBound => {
                    if c == self.lbound {
                        self.level = 1;
                        self.state = BoundState::RBound;
                        Ok(())
                    } else if c == self.rbound {
                        Err(LexerError::UnexpectedBoundary(c))
                    } else if text[idx..].contains(self.lbound) {
                        Err(LexerError::UnexpectedTextBefore(self.lbound))
                    } else {
                        Err(LexerError::UnexpectedText(text[idx..].to_string()))
                    }
                }
                BoundState::RBound => self.on_rbound_char(c, &mut parsed),
            };

            if let Err(err) = step {
                consumed = idx;
                failure = Some(err);
                break;
            }
        }

        if self.is_flag_set(ParserFlags::DEBUG) {
            trace!(state = ?self.state, level = self.level, %parsed, "bounded step");
        }

        self.core.append_parsed(&parsed);
        self.core.set_text(text[consumed..].to_string());

        match failure {
            Some(err) => Err(self.core.fail(err)),
            None => Ok(()),
        }
    }
}
