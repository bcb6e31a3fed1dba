use std::path::{Path, PathBuf};

use derive_more::Display;
use globforge_lexer::{BoundedParser, ParseStatus, ParserFlags, StatefulParser};
use globforge_settings::Settings;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{Level, debug};

use globforge_util::path::{abs_path, parent_dir, relative_to};
use globforge_util::{LineInfo, LineSink, Matcher, read_lines};

use super::{LineKind, PARAM_RE, classify, unterminated};
use crate::errors::{ParseError, ParseErrorKind, ParseResult};
use crate::generators::{Generator, GeneratorRegistry};
use crate::manifest::{FILE_LABELS, Manifest, ManifestConfig, PATH_LABELS, all_labels, is_label};

static IF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^if(.*)$").unwrap());
static ELIF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^elif(.*)$").unwrap());
static ELSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^else$").unwrap());
static END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^end$").unwrap());
static CONFIG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^config$").unwrap());
static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^include[ \t]+(.+)$").unwrap());
static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^([a-z_]+)$").unwrap());

const GLOB_CHARS: &[char] = &['*', '?', '['];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
enum CondState {
    /// No branch taken yet.
    #[display("NOT_MET")]
    NotMet,
    /// The current branch is taken.
    #[display("MET")]
    Met,
    /// An earlier branch was taken; the rest are skipped.
    #[display("SATISFIED")]
    Satisfied,
}

#[derive(Debug, Default)]
struct ConfigBlock {
    definition: Option<String>,
    formatter: Option<String>,
    generators: Vec<Box<dyn Generator>>,
}

#[derive(Debug)]
enum FrameKind {
    Top,
    Condition {
        state: CondState,
        /// Parser for an expression still being read.
        expr: Option<BoundedParser>,
    },
    Config(ConfigBlock),
}

#[derive(Debug)]
struct Frame {
    start: Option<LineInfo>,
    label: Option<String>,
    /// Label in effect when the block opened, restored on each branch change.
    init_label: Option<String>,
    kind: FrameKind,
}

impl Frame {
    fn is_met(&self) -> bool {
        match &self.kind {
            FrameKind::Condition { state, .. } => *state == CondState::Met,
            _ => true,
        }
    }
}

/// Parses package manifests, keeping entries whose enclosing conditions hold for `settings`.
///
/// With file validation off, entries are not checked against the filesystem and included
/// manifests are recorded under `aux_files` instead of being read.
#[derive(Debug)]
pub struct ManifestParser<'a> {
    manifest: &'a mut Manifest,
    settings: &'a Settings,
    generators: &'a GeneratorRegistry,
    validate_files: bool,
    /// Directory relative includes are resolved against.
    include_root: PathBuf,
    stack: Vec<Frame>,
    last_line: Option<LineInfo>,
}

impl<'a> ManifestParser<'a> {
    pub fn new(
        manifest: &'a mut Manifest,
        settings: &'a Settings,
        generators: &'a GeneratorRegistry,
        validate_files: bool,
    ) -> Self {
        for label in all_labels() {
            manifest.add_type(label);
        }
        let include_root = parent_dir(manifest.filename());
        ManifestParser {
            manifest,
            settings,
            generators,
            validate_files,
            include_root,
            stack: vec![Frame {
                start: None,
                label: None,
                init_label: None,
                kind: FrameKind::Top,
            }],
            last_line: None,
        }
    }

    fn current(&mut self) -> &mut Frame {
        let idx = self.stack.len() - 1;
        &mut self.stack[idx]
    }

    fn is_condition_met(&self) -> bool {
        self.stack.iter().all(Frame::is_met)
    }

    fn paren_parser() -> BoundedParser {
        let mut flags = ParserFlags::MULTI_LEVEL;
        if tracing::enabled!(Level::TRACE) {
            flags = flags | ParserFlags::DEBUG;
        }
        BoundedParser::new('(', ')', flags)
    }

    /// Feed text to the pending condition expression, evaluating it once complete. Returns
    /// false when there is no pending expression.
    fn feed_expression(&mut self, line: &LineInfo, text: &str) -> ParseResult<bool> {
        let settings = self.settings;
        let FrameKind::Condition { state, expr } = &mut self.current().kind else {
            return Ok(false);
        };
        let Some(parser) = expr.as_mut() else {
            return Ok(false);
        };

        // Physical lines of one expression are joined with a space
        let status = if parser.has_lbound() && !text.is_empty() {
            parser.parse(&format!(" {text}"))
        } else {
            parser.parse(text)
        };
        match status {
            Ok(ParseStatus::Finished) => {}
            Ok(_) => return Ok(true),
            Err(err) => {
                debug!("expression: {err}");
                return Err(ParseError::new(line, ParseErrorKind::MalformedCondition));
            }
        }

        if !parser.remaining_text().trim().is_empty() {
            return Err(ParseError::new(line, ParseErrorKind::TextAfterExpression));
        }

        let text = parser.parsed_text().to_string();
        *expr = None;

        // Branches after a taken one are syntax checked only
        if *state == CondState::Satisfied {
            debug!("COND EXPR: '{text}' skipped");
            return Ok(true);
        }

        let result = settings
            .evaluate(&text)
            .map_err(|err| ParseError::new(line, err))?;
        debug!("COND EXPR: '{text}' = {result}");

        if result {
            *state = CondState::Met;
        }
        Ok(true)
    }

    fn parse_directive(&mut self, line: &LineInfo, text: &str) -> anyhow::Result<()> {
        let in_config = matches!(self.current().kind, FrameKind::Config(_));
        let mut m = Matcher::new(text);

        if m.is_fullmatch(&END_RE) {
            debug!("END");
            self.block_end(line)?;
            return Ok(());
        }
        if in_config {
            let keyword = text.split_whitespace().next().unwrap_or(text);
            return Err(ParseError::new(line, ParseErrorKind::NotAllowed(keyword.to_string())).into());
        }

        if m.is_fullmatch(&IF_RE) {
            debug!("IF: {}", m.group(1));
            self.condition_if(line, m.group(1).trim_start())?;
        } else if m.is_fullmatch(&ELIF_RE) {
            debug!("ELIF: {}", m.group(1));
            self.condition_elif(line, m.group(1).trim_start())?;
        } else if m.is_fullmatch(&ELSE_RE) {
            debug!("ELSE");
            self.condition_else(line)?;
        } else if m.is_fullmatch(&CONFIG_RE) {
            debug!("CONFIG");
            self.push(line, FrameKind::Config(ConfigBlock::default()));
        } else if m.is_fullmatch(&INCLUDE_RE) {
            debug!("INCLUDE: {}", m.group(1));
            self.include(line, m.group(1).trim())?;
        } else if m.is_fullmatch(&LABEL_RE) {
            let label = m.group(1).to_ascii_lowercase();
            debug!("LABEL: {label}");
            if !is_label(&label) {
                return Err(ParseError::new(line, ParseErrorKind::InvalidLabel(label)).into());
            }
            self.current().label = Some(label);
        } else {
            return Err(ParseError::new(line, ParseErrorKind::BadDirective).into());
        }

        Ok(())
    }

    fn push(&mut self, line: &LineInfo, kind: FrameKind) {
        let label = self.current().label.clone();
        self.stack.push(Frame {
            start: Some(line.clone()),
            init_label: label.clone(),
            label,
            kind,
        });
    }

    fn condition_if(&mut self, line: &LineInfo, text: &str) -> ParseResult<()> {
        self.push(line, FrameKind::Condition {
            state: CondState::NotMet,
            expr: Some(Self::paren_parser()),
        });
        self.feed_expression(line, text)?;
        Ok(())
    }

    /// Close the current branch of a condition block: a taken branch locks out the rest, and
    /// the label reverts to the one the block started with.
    fn branch_change(&mut self, line: &LineInfo, directive: &'static str) -> ParseResult<()> {
        let frame = self.current();
        let FrameKind::Condition { state, expr } = &mut frame.kind else {
            return Err(ParseError::new(line, ParseErrorKind::OutsideCondition(directive)));
        };
        if expr.is_some() {
            return Err(ParseError::new(line, ParseErrorKind::ExpectedEndOfExpression));
        }
        if *state == CondState::Met {
            *state = CondState::Satisfied;
        }
        if frame.label != frame.init_label {
            debug!("LABEL: {:?}", frame.init_label);
            frame.label = frame.init_label.clone();
        }
        Ok(())
    }

    fn condition_elif(&mut self, line: &LineInfo, text: &str) -> ParseResult<()> {
        self.branch_change(line, "elif")?;
        if let FrameKind::Condition { expr, .. } = &mut self.current().kind {
            *expr = Some(Self::paren_parser());
        }
        self.feed_expression(line, text)?;
        Ok(())
    }

    fn condition_else(&mut self, line: &LineInfo) -> ParseResult<()> {
        self.branch_change(line, "else")?;
        if let FrameKind::Condition { state, .. } = &mut self.current().kind {
            if *state == CondState::NotMet {
                *state = CondState::Met;
            }
        }
        Ok(())
    }

    fn block_end(&mut self, line: &LineInfo) -> ParseResult<()> {
        if self.stack.len() < 2 {
            return Err(ParseError::new(line, ParseErrorKind::UnexpectedEnd));
        }
        let met = self.is_condition_met();
        let Some(frame) = self.stack.pop() else {
            return Err(ParseError::new(line, ParseErrorKind::UnexpectedEnd));
        };

        if let FrameKind::Config(config) = frame.kind {
            let Some(definition) = config.definition else {
                return Err(ParseError::new(line, ParseErrorKind::MissingField {
                    block: "config",
                    field: "definition",
                }));
            };
            if met {
                debug!("ADD_CONFIG: {definition}");
                self.manifest.add_config(ManifestConfig {
                    definition: PathBuf::from(definition),
                    formatter: config.formatter,
                    generators: config.generators,
                });
            } else {
                debug!("SKIP_CONFIG: {definition}");
            }
        }
        Ok(())
    }

    fn config_param(&mut self, line: &LineInfo, name: &str, value: &str) -> ParseResult<()> {
        let generators = self.generators;
        let FrameKind::Config(config) = &mut self.current().kind else {
            return Err(ParseError::new(line, ParseErrorKind::BadGrammar));
        };

        match name {
            "definition" => {
                if config.definition.is_some() {
                    return Err(ParseError::new(line, ParseErrorKind::Redefinition("definition")));
                }
                config.definition = Some(value.to_string());
            }
            "formatter" => config.formatter = Some(value.to_string()),
            "generate" => {
                let Some((format, filename)) = value.split_once(char::is_whitespace) else {
                    return Err(ParseError::new(line, ParseErrorKind::BadGrammar));
                };
                let generator = generators
                    .create(format, PathBuf::from(filename.trim()), config.formatter.clone())
                    .ok_or_else(|| ParseError::new(line, ParseErrorKind::UnknownGenerator(format.to_string())))?;
                config.generators.push(generator);
            }
            _ => {
                return Err(ParseError::new(line, ParseErrorKind::InvalidParameter(name.to_string())));
            }
        }
        Ok(())
    }

    fn include(&mut self, line: &LineInfo, filename: &str) -> anyhow::Result<()> {
        if !self.is_condition_met() {
            debug!("SKIP_INCLUDE: {filename}");
            return Ok(());
        }
        if !self.validate_files {
            self.manifest
                .add_entry("aux_files", filename)
                .map_err(|err| ParseError::new(line, err))?;
            return Ok(());
        }

        let path = abs_path(filename, &self.include_root);
        let saved = std::mem::replace(&mut self.include_root, parent_dir(&path));
        let result = read_lines(self, &path);
        self.include_root = saved;
        result
    }

    /// Check an entry against the filesystem, expanding file globs. Returns the entries to add.
    fn validate_entry(&self, line: &LineInfo, label: &str, entry: &str) -> ParseResult<Vec<String>> {
        let root = self.manifest.root();
        let fail = |kind| Err(ParseError::new(line, kind));

        if FILE_LABELS.contains(&label) {
            if entry.contains(GLOB_CHARS) {
                return expand_glob(root, entry).map_err(|kind| ParseError::new(line, kind));
            }
            if !root.join(entry).is_file() {
                return fail(ParseErrorKind::NotAFile(entry.to_string()));
            }
        } else if PATH_LABELS.contains(&label) && !root.join(entry).is_dir() {
            return fail(ParseErrorKind::NotADirectory(entry.to_string()));
        }
        Ok(vec![entry.to_string()])
    }

    fn parse_entry(&mut self, line: &LineInfo, entry: &str) -> ParseResult<()> {
        let Some(label) = self.current().label.clone() else {
            return Err(ParseError::new(line, ParseErrorKind::MissingLabel));
        };

        if !self.is_condition_met() {
            debug!("SKIP_ENTRY: {entry}");
            return Ok(());
        }

        let entries = if self.validate_files {
            self.validate_entry(line, &label, entry)?
        } else {
            vec![entry.to_string()]
        };
        for entry in entries {
            debug!("ADD_ENTRY: {entry}");
            self.manifest
                .add_entry(&label, &entry)
                .map_err(|err| ParseError::new(line, err))?;
        }
        Ok(())
    }
}

/// Files under `root` matching `pattern`, relative to `root`.
fn expand_glob(root: &Path, pattern: &str) -> Result<Vec<String>, ParseErrorKind> {
    let full = root.join(pattern);
    let paths =
        glob::glob(&full.to_string_lossy()).map_err(|_| ParseErrorKind::BadPattern(pattern.to_string()))?;

    let mut out = vec![];
    for path in paths.filter_map(Result::ok) {
        if !path.is_file() {
            return Err(ParseErrorKind::NotAFile(path.display().to_string()));
        }
        out.push(relative_to(&path, root).to_string_lossy().into_owned());
    }
    if out.is_empty() {
        return Err(ParseErrorKind::NoMatches(pattern.to_string()));
    }
    Ok(out)
}

impl LineSink for ManifestParser<'_> {
    fn parse(&mut self, line: &LineInfo) -> anyhow::Result<()> {
        let text = line.text();
        debug!("PARSE: {text}");
        self.last_line = Some(line.clone());

        if self.feed_expression(line, text)? {
            return Ok(());
        }

        match classify(text) {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::Directive(directive) => self.parse_directive(line, directive)?,
            LineKind::Other(text) => {
                if matches!(self.current().kind, FrameKind::Config(_)) {
                    let mut m = Matcher::new(text);
                    if !m.is_fullmatch(&PARAM_RE) {
                        return Err(ParseError::new(line, ParseErrorKind::BadGrammar).into());
                    }
                    self.config_param(line, m.group(1), m.group(2).trim_end())?;
                } else {
                    self.parse_entry(line, text)?;
                }
            }
        }
        Ok(())
    }

    fn parse_end(&mut self) -> anyhow::Result<()> {
        let Some(frame) = self.stack.last() else {
            return Ok(());
        };
        let Some(start) = &frame.start else {
            return Ok(());
        };

        let at = self.last_line.clone().unwrap_or_else(|| start.clone());
        if matches!(frame.kind, FrameKind::Condition { expr: Some(_), .. }) {
            return Err(ParseError::new(&at, ParseErrorKind::ExpectedEndOfExpression).into());
        }
        Err(unterminated(&at, start).into())
    }
}
