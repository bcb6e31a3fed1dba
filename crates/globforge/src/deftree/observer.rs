use std::fmt::Write;

use globforge_settings::Settings;
use tracing::debug;

use super::Param;
use crate::errors::BuildError;

/// Receives events while a tree is walked. Every method defaults to doing nothing.
pub trait ScopeObserver<P = Param> {
    fn on_def_begin(&mut self, _filename: &str) {}

    fn on_scope_begin(&mut self, _name: &str, _description: Option<&str>) {}

    fn on_param(&mut self, _param: &P) {}

    fn on_scope_end(&mut self) {}
}

/// Renders a tree as an indented outline.
#[derive(Debug, Default)]
pub struct PrintObserver {
    level: usize,
    out: String,
}

impl PrintObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }

    fn line<T: std::fmt::Display>(&mut self, text: T) {
        let _ = writeln!(self.out, "{}{}", "  ".repeat(self.level), text);
    }
}

impl<P: std::fmt::Display> ScopeObserver<P> for PrintObserver {
    fn on_def_begin(&mut self, filename: &str) {
        self.line(format_args!("File: '{filename}'"));
    }

    fn on_scope_begin(&mut self, name: &str, description: Option<&str>) {
        self.line(format_args!("{name}:"));
        self.level += 1;
        if let Some(description) = description {
            self.line("<description>={");
            self.level += 1;
            for text in description.split('\n') {
                self.line(text);
            }
            self.level -= 1;
            self.line("}");
        }
    }

    fn on_param(&mut self, param: &P) {
        self.line(param);
    }

    fn on_scope_end(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

/// A parameter paired with its configured value.
#[derive(Clone, Debug, PartialEq)]
pub struct RelevantParam {
    pub param: Param,
    pub value: String,
}

/// Collects each parameter with its value in the given settings. A parameter without a
/// value is an error, reported for the first one found.
#[derive(Debug)]
pub struct RelevantParamMatcher<'s> {
    settings: &'s Settings,
    out: Vec<RelevantParam>,
    undefined: Option<String>,
}

impl<'s> RelevantParamMatcher<'s> {
    pub fn new(settings: &'s Settings) -> Self {
        RelevantParamMatcher {
            settings,
            out: vec![],
            undefined: None,
        }
    }

    pub fn params(&self) -> &[RelevantParam] {
        &self.out
    }

    pub fn into_params(self) -> Result<Vec<RelevantParam>, BuildError> {
        match self.undefined {
            Some(id) => Err(BuildError::UndefinedValue(id)),
            None => Ok(self.out),
        }
    }
}

impl<P: AsRef<Param>> ScopeObserver<P> for RelevantParamMatcher<'_> {
    fn on_param(&mut self, param: &P) {
        let param = param.as_ref();
        match self.settings.get_value(&param.id) {
            Some(value) => self.out.push(RelevantParam {
                param: param.clone(),
                value: value.to_string(),
            }),
            None => {
                debug!("Undefined value {}", param);
                if self.undefined.is_none() {
                    self.undefined = Some(param.id.clone());
                }
            }
        }
    }
}
