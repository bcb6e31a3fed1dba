use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use globforge_util::{LineInfo, LineSink, Matcher};

use super::{BLOCK_END_RE, IDENTIFIER_RE, LineKind, PARAM_RE, classify, unterminated};
use crate::errors::{ParseError, ParseErrorKind, ParseResult};
use crate::importer::{Action, ExternalDependency, ImporterRegistry};
use crate::project::{Package, Project, RootKind};

static PROJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^project[ \t]+([a-zA-Z0-9_]+)$").unwrap());
static LAYER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^layer[ \t]+([a-zA-Z0-9_]+)$").unwrap());
static DEPENDENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^dependency[ \t]+([a-zA-Z0-9_]+)$").unwrap());
static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^package[ \t]+(.+)$").unwrap());
static EXT_PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ext_package[ \t]+([a-zA-Z0-9_]+)[ \t]+(.+)$").unwrap());
static LCL_PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^lcl_package[ \t]+([a-zA-Z0-9_]+)[ \t]+(.+)$").unwrap());

#[derive(Debug, Default)]
struct LayerBlock {
    name: String,
    variants: Vec<String>,
    prefix: Option<String>,
    suffix: Option<String>,
}

#[derive(Debug)]
enum Block {
    Top,
    Project { name: String },
    Layer(LayerBlock),
    Dependency {
        name: String,
        actions: Vec<Box<dyn Action>>,
    },
}

#[derive(Debug)]
struct Frame {
    start: Option<LineInfo>,
    block: Block,
}

/// Parses a project file into a [`Project`].
///
/// Dependency action lines are resolved through `importers`. An action name the registry does
/// not know is an error unless [`ProjectParser::allow_unknown_actions`] is set, in which case it
/// is skipped with a warning.
#[derive(Debug)]
pub struct ProjectParser<'p> {
    project: &'p mut Project,
    importers: &'p ImporterRegistry,
    strict: bool,
    stack: Vec<Frame>,
    last_line: Option<LineInfo>,
}

impl<'p> ProjectParser<'p> {
    pub fn new(project: &'p mut Project, importers: &'p ImporterRegistry) -> Self {
        ProjectParser {
            project,
            importers,
            strict: true,
            stack: vec![Frame {
                start: None,
                block: Block::Top,
            }],
            last_line: None,
        }
    }

    pub fn allow_unknown_actions(mut self) -> Self {
        self.strict = false;
        self
    }

    fn current(&mut self) -> &mut Frame {
        let idx = self.stack.len() - 1;
        &mut self.stack[idx]
    }

    fn in_project(&self) -> bool {
        matches!(self.stack.last().map(|f| &f.block), Some(Block::Project { .. }))
    }

    /// Fail unless the innermost block is the project.
    fn require_project(&self, line: &LineInfo, directive: &str) -> ParseResult<()> {
        if !self.in_project() {
            return Err(ParseError::new(line, ParseErrorKind::NotAllowed(directive.to_string())));
        }
        Ok(())
    }

    fn push(&mut self, line: &LineInfo, block: Block) {
        self.stack.push(Frame {
            start: Some(line.clone()),
            block,
        });
    }

    fn parse_directive(&mut self, line: &LineInfo, text: &str) -> ParseResult<()> {
        let mut m = Matcher::new(text);

        if m.is_fullmatch(&LAYER_RE) {
            debug!("LAYER: {}", m.group(1));
            self.require_project(line, "layer")?;
            self.push(line, Block::Layer(LayerBlock {
                name: m.group(1).to_string(),
                ..Default::default()
            }));
        } else if m.is_fullmatch(&DEPENDENCY_RE) {
            debug!("DEPENDENCY: {}", m.group(1));
            self.require_project(line, "dependency")?;
            self.push(line, Block::Dependency {
                name: m.group(1).to_string(),
                actions: vec![],
            });
        } else if m.is_fullmatch(&PROJECT_RE) {
            debug!("PROJECT: {}", m.group(1));
            if !matches!(self.current().block, Block::Top) {
                return Err(ParseError::new(line, ParseErrorKind::NotAllowed("project".into())));
            }
            if self.project.name().is_some() {
                return Err(ParseError::new(line, ParseErrorKind::MultipleProjects));
            }
            self.push(line, Block::Project {
                name: m.group(1).to_string(),
            });
        } else if m.is_fullmatch(&PACKAGE_RE) {
            debug!("PACKAGE: {}", m.group(1));
            self.require_project(line, "package")?;
            self.add_package(m.group(1), RootKind::Source, RootKind::Source, None);
        } else if m.is_fullmatch(&EXT_PACKAGE_RE) {
            debug!("EXTERNAL PACKAGE: {} @ DEP:{}", m.group(1), m.group(2));
            self.require_project(line, "ext_package")?;
            self.add_package(m.group(2), RootKind::Dependency, RootKind::Source, Some(m.group(1)));
        } else if m.is_fullmatch(&LCL_PACKAGE_RE) {
            debug!("LOCAL PACKAGE: {} @ SRC:{}", m.group(1), m.group(2));
            self.require_project(line, "lcl_package")?;
            self.add_package(m.group(2), RootKind::Source, RootKind::Dependency, Some(m.group(1)));
        } else if m.is_fullmatch(&BLOCK_END_RE) {
            debug!("END");
            self.block_end(line)?;
        } else {
            return Err(ParseError::new(line, ParseErrorKind::BadDirective));
        }

        Ok(())
    }

    fn add_package(&mut self, filename: &str, file_root: RootKind, module_root: RootKind, module_id: Option<&str>) {
        self.project.add_package(Package {
            filename: filename.trim_end().to_string(),
            file_root,
            module_root,
            module_id: module_id.map(str::to_string),
        });
    }

    fn block_end(&mut self, line: &LineInfo) -> ParseResult<()> {
        if self.stack.len() < 2 {
            return Err(ParseError::new(line, ParseErrorKind::UnexpectedEnd));
        }
        let Some(frame) = self.stack.pop() else {
            return Err(ParseError::new(line, ParseErrorKind::UnexpectedEnd));
        };
        let fail = |kind: ParseErrorKind| ParseError::new(line, kind);

        match frame.block {
            Block::Project { name } => {
                self.project.set_name(&name).map_err(|e| fail(e.into()))?;
            }
            Block::Layer(layer) => {
                if layer.variants.is_empty() {
                    return Err(fail(ParseErrorKind::MissingField {
                        block: "layer",
                        field: "variant",
                    }));
                }
                let prefix = layer.prefix.unwrap_or_else(|| format!("{}_", layer.name));
                let suffix = layer.suffix.as_deref().unwrap_or(".cfg");

                self.project.add_layer(&layer.name).map_err(|e| fail(e.into()))?;
                for variant in &layer.variants {
                    let filename = format!("{prefix}{variant}{suffix}");
                    debug!("  {}.{variant} = {filename}", layer.name);
                    self.project
                        .add_variant(&layer.name, variant, &filename)
                        .map_err(|e| fail(e.into()))?;
                }
            }
            Block::Dependency { name, actions } => {
                if actions.is_empty() {
                    return Err(fail(ParseErrorKind::MissingField {
                        block: "dependency",
                        field: "action",
                    }));
                }
                self.project
                    .add_dependency(ExternalDependency::new(name, actions))
                    .map_err(|e| fail(e.into()))?;
            }
            Block::Top => return Err(fail(ParseErrorKind::UnexpectedEnd)),
        }
        Ok(())
    }

    fn process_param(&mut self, line: &LineInfo, name: &str, value: &str) -> ParseResult<()> {
        let importers = self.importers;
        let strict = self.strict;
        let fail = |kind: ParseErrorKind| ParseError::new(line, kind);

        match &mut self.current().block {
            Block::Top => Err(fail(ParseErrorKind::NotAllowed(name.to_string()))),
            Block::Project { .. } => Err(fail(ParseErrorKind::ProjectParameters)),
            Block::Layer(layer) => {
                let (field, slot) = match name {
                    "variant" => {
                        if !IDENTIFIER_RE.is_match(value) {
                            return Err(fail(ParseErrorKind::InvalidIdentifier));
                        }
                        layer.variants.push(value.to_string());
                        return Ok(());
                    }
                    "prefix" => ("prefix", &mut layer.prefix),
                    "suffix" => ("suffix", &mut layer.suffix),
                    _ => return Err(fail(ParseErrorKind::InvalidParameter(name.to_string()))),
                };
                if slot.is_some() {
                    return Err(fail(ParseErrorKind::Redefinition(field)));
                }
                *slot = Some(value.to_string());
                Ok(())
            }
            Block::Dependency { name: dependency, actions } => {
                match importers.create(name, value) {
                    Some(action) => actions.push(action),
                    None if strict => {
                        return Err(fail(ParseErrorKind::UnknownAction {
                            action: name.to_string(),
                            dependency: dependency.clone(),
                        }));
                    }
                    None => warn!("{line}: Unknown action '{name}' for dependency {dependency}, skipped"),
                }
                Ok(())
            }
        }
    }
}

impl LineSink for ProjectParser<'_> {
    fn parse(&mut self, line: &LineInfo) -> anyhow::Result<()> {
        debug!("PARSE: {}", line.text());
        self.last_line = Some(line.clone());

        match classify(line.text()) {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::Directive(text) => self.parse_directive(line, text)?,
            LineKind::Other(text) => {
                let mut m = Matcher::new(text);
                if !m.is_fullmatch(&PARAM_RE) {
                    return Err(ParseError::new(line, ParseErrorKind::BadGrammar).into());
                }
                self.process_param(line, m.group(1), m.group(2).trim_end())?;
            }
        }
        Ok(())
    }

    fn parse_end(&mut self) -> anyhow::Result<()> {
        if let Some(Frame {
            start: Some(start), ..
        }) = self.stack.last()
        {
            let at = self.last_line.clone().unwrap_or_else(|| start.clone());
            return Err(unterminated(&at, start).into());
        }
        Ok(())
    }
}
