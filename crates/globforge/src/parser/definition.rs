use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use globforge_util::path::{abs_path, parent_dir};
use globforge_util::{LineInfo, LineSink, Matcher, read_lines};

use super::{BLOCK_END_RE, INCLUDE_RE, LineKind, PARAM_RE, classify, unterminated};
use crate::deftree::{Choice, DefTree, EnumMetadata, Param, ParamType, ParamValue};
use crate::errors::{ParseError, ParseErrorKind, ParseResult};

static CONFIG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^config(?:_([bsif]))?[ \t]+([a-zA-Z0-9_]+)$").unwrap());
static MENU_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^menu[ \t]+([a-zA-Z0-9_ /\-]+)$").unwrap());

/// Resolve a menu path against the enclosing scope path. Scope paths always end in `/`.
fn resolve_scope(parent: &str, path: &str) -> String {
    let path = path.trim();
    let mut out = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{parent}{path}")
    };
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}

#[derive(Debug, Default)]
struct ConfigBlock {
    id: String,
    title: Option<String>,
    ptype: Option<ParamType>,
    description: Option<String>,
    default: Option<ParamValue>,
    menu: Option<String>,
    count: Option<String>,
    choices: Vec<Choice>,
}

impl ConfigBlock {
    fn set_unique(slot: &mut Option<String>, field: &'static str, value: &str) -> Result<(), ParseErrorKind> {
        if slot.is_some() {
            return Err(ParseErrorKind::Redefinition(field));
        }
        *slot = Some(value.to_string());
        Ok(())
    }

    fn process_param(&mut self, name: &str, value: &str) -> Result<(), ParseErrorKind> {
        match name {
            "title" => Self::set_unique(&mut self.title, "title", value),
            "description" => Self::set_unique(&mut self.description, "description", value),
            "menu" => Self::set_unique(&mut self.menu, "menu", value),
            "count" => Self::set_unique(&mut self.count, "count", value),
            "choice" => {
                let (id, text) = match value.split_once(char::is_whitespace) {
                    Some((id, text)) => (id, text.trim().to_string()),
                    None => (value, format!("\"{value}\"")),
                };
                self.choices.push(Choice {
                    id: id.to_string(),
                    text,
                });
                Ok(())
            }
            "type" => {
                if self.ptype.is_some() {
                    return Err(ParseErrorKind::Redefinition("type"));
                }
                let ptype = ParamType::validate_type(value)
                    .ok_or_else(|| ParseErrorKind::InvalidType(value.to_string()))?;
                self.ptype = Some(ptype);
                Ok(())
            }
            "default" => {
                if self.default.is_some() {
                    return Err(ParseErrorKind::Redefinition("default"));
                }
                let ptype = self.ptype.ok_or(ParseErrorKind::DefaultBeforeType)?;
                let default = ptype.validate_value(value).ok_or_else(|| ParseErrorKind::InvalidValue {
                    value: value.to_string(),
                    ty: ptype.to_string(),
                })?;
                self.default = Some(default);
                Ok(())
            }
            _ => Err(ParseErrorKind::InvalidParameter(name.to_string())),
        }
    }

    /// Check the block is complete and turn it into a parameter.
    fn finish(self) -> Result<Param, ParseErrorKind> {
        let ptype = self.ptype.ok_or_else(|| ParseErrorKind::MissingType(self.id.clone()))?;

        let mut param = Param::new(self.id, ptype);
        param.title = self.title.unwrap_or_default();
        param.description = self.description.unwrap_or_default();
        param.default = self.default;

        if ptype == ParamType::Enum {
            let Some(first) = self.choices.first() else {
                return Err(ParseErrorKind::MissingChoices(param.id));
            };
            match &param.default {
                None => param.default = Some(ParamValue::Enum(first.id.clone())),
                Some(ParamValue::Enum(id)) if !self.choices.iter().any(|c| &c.id == id) => {
                    return Err(ParseErrorKind::InvalidChoice(id.clone()));
                }
                _ => {}
            }
            param.metadata = Some(EnumMetadata {
                count: self.count,
                choices: self.choices,
            });
        }

        Ok(param)
    }
}

#[derive(Debug)]
enum Block {
    Top,
    Menu { description: Option<String> },
    Config(ConfigBlock),
}

#[derive(Debug)]
struct Frame {
    start: Option<LineInfo>,
    /// Scope for the contents of this block, ending in `/`.
    scope_path: String,
    block: Block,
}

/// Parses parameter definition files into a [`DefTree`].
#[derive(Debug)]
pub struct DefinitionParser<'t> {
    tree: &'t mut DefTree,
    /// Directory relative includes are resolved against.
    root: PathBuf,
    stack: Vec<Frame>,
    last_line: Option<LineInfo>,
}

impl<'t> DefinitionParser<'t> {
    pub fn new(tree: &'t mut DefTree) -> Self {
        let root = parent_dir(tree.filename());
        DefinitionParser {
            tree,
            root,
            stack: vec![Frame {
                start: None,
                scope_path: "/".to_string(),
                block: Block::Top,
            }],
            last_line: None,
        }
    }

    fn current(&mut self) -> &mut Frame {
        let idx = self.stack.len() - 1;
        &mut self.stack[idx]
    }

    fn can_open_block(&self) -> bool {
        matches!(
            self.stack.last().map(|f| &f.block),
            Some(Block::Top | Block::Menu { .. })
        )
    }

    fn parse_directive(&mut self, line: &LineInfo, text: &str) -> anyhow::Result<()> {
        let mut m = Matcher::new(text);

        if m.is_fullmatch(&CONFIG_RE) {
            let quick = m.get(1);
            debug!("CONFIG({}): {}", quick.unwrap_or_default(), m.group(2));
            self.config_start(line, quick, m.group(2))?;
        } else if m.is_fullmatch(&MENU_RE) {
            debug!("MENU: {}", m.group(1));
            self.menu_start(line, m.group(1))?;
        } else if m.is_fullmatch(&BLOCK_END_RE) {
            debug!("END");
            self.block_end(line)?;
        } else if m.is_fullmatch(&INCLUDE_RE) {
            debug!("INCLUDE: {}", m.group(1));
            self.include(m.group(1))?;
        } else {
            return Err(ParseError::new(line, ParseErrorKind::BadDirective).into());
        }

        Ok(())
    }

    fn config_start(&mut self, line: &LineInfo, quick: Option<&str>, id: &str) -> ParseResult<()> {
        if !self.can_open_block() {
            return Err(ParseError::new(line, ParseErrorKind::NotAllowed("config".into())));
        }

        let ptype = match quick {
            Some("b") => Some(ParamType::Bool),
            Some("s") => Some(ParamType::String),
            Some("i") => Some(ParamType::Int),
            Some("f") => Some(ParamType::Float),
            _ => None,
        };

        let scope_path = self.current().scope_path.clone();
        self.stack.push(Frame {
            start: Some(line.clone()),
            scope_path,
            block: Block::Config(ConfigBlock {
                id: id.to_string(),
                ptype,
                ..Default::default()
            }),
        });

        // Quick forms are complete on one line
        if quick.is_some() {
            self.block_end(line)?;
        }
        Ok(())
    }

    fn menu_start(&mut self, line: &LineInfo, name: &str) -> ParseResult<()> {
        if !self.can_open_block() {
            return Err(ParseError::new(line, ParseErrorKind::NotAllowed("menu".into())));
        }

        let scope_path = resolve_scope(&self.current().scope_path, name);
        debug!("  {scope_path}");
        self.stack.push(Frame {
            start: Some(line.clone()),
            scope_path,
            block: Block::Menu { description: None },
        });
        Ok(())
    }

    fn block_end(&mut self, line: &LineInfo) -> ParseResult<()> {
        if self.stack.len() < 2 {
            return Err(ParseError::new(line, ParseErrorKind::UnexpectedEnd));
        }
        let Some(frame) = self.stack.pop() else {
            return Err(ParseError::new(line, ParseErrorKind::UnexpectedEnd));
        };

        match frame.block {
            Block::Config(config) => {
                let scope_path = match &config.menu {
                    Some(menu) => resolve_scope(&frame.scope_path, menu),
                    None => frame.scope_path,
                };
                debug!("  {} @ {scope_path}", config.id);
                let param = config.finish().map_err(|kind| ParseError::new(line, kind))?;
                self.tree.get_scope(&scope_path).add_param(param);
            }
            Block::Menu { description } => {
                if let Some(description) = description {
                    self.tree.get_scope(&frame.scope_path).set_description(description);
                }
            }
            Block::Top => return Err(ParseError::new(line, ParseErrorKind::UnexpectedEnd)),
        }
        Ok(())
    }

    fn process_param(&mut self, line: &LineInfo, name: &str, value: &str) -> ParseResult<()> {
        let result = match &mut self.current().block {
            Block::Config(config) => config.process_param(name, value),
            Block::Menu { description } => match name {
                "description" => ConfigBlock::set_unique(description, "description", value),
                _ => Err(ParseErrorKind::InvalidParameter(name.to_string())),
            },
            Block::Top => Err(ParseErrorKind::NotAllowed(name.to_string())),
        };
        result.map_err(|kind| ParseError::new(line, kind))
    }

    /// Parse another file in place, with its directory as the include root.
    fn include(&mut self, filename: &str) -> anyhow::Result<()> {
        let path = abs_path(filename.trim(), &self.root);
        let saved = std::mem::replace(&mut self.root, parent_dir(&path));
        let result = read_lines(self, &path);
        self.root = saved;
        result
    }
}

impl LineSink for DefinitionParser<'_> {
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
