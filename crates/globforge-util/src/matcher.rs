use regex::{Captures, Regex};

/// Pairs a piece of text with the captures of the last regex tried against it.
///
/// Patterns passed to [`Matcher::is_fullmatch`] are expected to be anchored (`^...$`); the
/// match is additionally checked to cover the whole text.
pub struct Matcher<'t> {
    text: &'t str,
    captures: Option<Captures<'t>>,
}

impl<'t> Matcher<'t> {
    pub fn new(text: &'t str) -> Self {
        Matcher {
            text,
            captures: None,
        }
    }

    pub fn text(&self) -> &'t str {
        self.text
    }

    pub fn is_fullmatch(&mut self, re: &Regex) -> bool {
        self.captures = re.captures(self.text).filter(|c| {
            let m = c.get(0).map(|m| m.range());
            m == Some(0..self.text.len())
        });
        self.captures.is_some()
    }

    /// Partial match anywhere in the text.
    pub fn is_match(&mut self, re: &Regex) -> bool {
        self.captures = re.captures(self.text);
        self.captures.is_some()
    }

    pub fn found(&self) -> bool {
        self.captures.is_some()
    }

    pub fn get(&self, group: usize) -> Option<&'t str> {
        self.captures
            .as_ref()
            .and_then(|c| c.get(group))
            .map(|m| m.as_str())
    }

    /// Like [`Matcher::get`], but a missing group reads as the empty string.
    pub fn group(&self, group: usize) -> &'t str {
        self.get(group).unwrap_or_default()
    }
}
