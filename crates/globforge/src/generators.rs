//! Output generators, selected by a case-insensitive format name.
//!
//! A [`GeneratorRegistry`] maps format names to constructors. Build one with
//! [`GeneratorRegistry::with_defaults`] and [`register`](GeneratorRegistry::register) any
//! project-specific formats before handing it to the manifest parser.

use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;
use tracing::debug;

use crate::GlobforgeResult;
use crate::deftree::{ParamType, RelevantParam};
use crate::errors::BuildError;

pub trait Generator: fmt::Debug {
    /// The registered format name.
    fn format(&self) -> &'static str;

    fn filename(&self) -> &Path;

    fn set_filename(&mut self, filename: PathBuf);

    /// Script which formats the output, for generators that run one.
    fn formatter(&self) -> Option<&str> {
        None
    }

    fn generate(&self, params: &[RelevantParam]) -> GlobforgeResult<()>;
}

pub type GeneratorCtor = fn(PathBuf, Option<String>) -> Box<dyn Generator>;

#[derive(Clone)]
pub struct GeneratorRegistry {
    ctors: IndexMap<String, GeneratorCtor>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ctors.keys()).finish()
    }
}

impl GeneratorRegistry {
    pub fn empty() -> Self {
        GeneratorRegistry {
            ctors: IndexMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("c", CGenerator::boxed);
        registry.register("java", JavaGenerator::boxed);
        registry.register("custom", CustomGenerator::boxed);
        registry
    }

    /// Register (or replace) the constructor for `format`.
    pub fn register(&mut self, format: &str, ctor: GeneratorCtor) {
        self.ctors.insert(format.to_ascii_lowercase(), ctor);
    }

    pub fn create(
        &self,
        format: &str,
        filename: PathBuf,
        formatter: Option<String>,
    ) -> Option<Box<dyn Generator>> {
        let ctor = self.ctors.get(&format.to_ascii_lowercase())?;
        Some(ctor(filename, formatter))
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn write_output(path: &Path, text: &str) -> GlobforgeResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create '{}'", parent.display()))?;
    }
    debug!("writing {}", path.display());
    fs::write(path, text).with_context(|| format!("Could not write '{}'", path.display()))
}

/// Upper-case identifier derived from a file name, e.g. `cfg/foo.h` -> `FOO_H`.
fn guard_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn quote_string(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn bool_value(value: &str) -> bool {
    value.eq_ignore_ascii_case("TRUE") || value == "1"
}

/// C header with one `#define` per value.
#[derive(Debug)]
pub struct CGenerator {
    filename: PathBuf,
}

impl CGenerator {
    pub fn boxed(filename: PathBuf, _formatter: Option<String>) -> Box<dyn Generator> {
        Box::new(CGenerator { filename })
    }

    pub fn render(&self, params: &[RelevantParam]) -> String {
        let guard = guard_name(&self.filename);
        let mut out = String::new();
        let _ = writeln!(out, "/* Generated by globforge. Do not edit. */");
        let _ = writeln!(out, "#ifndef {guard}");
        let _ = writeln!(out, "#define {guard}");
        let _ = writeln!(out);

        for RelevantParam { param, value } in params {
            for (id, ordinal) in param.implicit_values() {
                let _ = writeln!(out, "#define {id} {ordinal}");
            }
            let value = match param.ptype {
                ParamType::Bool => (if bool_value(value) { "1" } else { "0" }).to_string(),
                ParamType::String => quote_string(value),
                ParamType::Int | ParamType::Float | ParamType::Enum => value.clone(),
            };
            let _ = writeln!(out, "#define {} {value}", param.id);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "#endif /* {guard} */");
        out
    }
}

impl Generator for CGenerator {
    fn format(&self) -> &'static str {
        "c"
    }

    fn filename(&self) -> &Path {
        &self.filename
    }

    fn set_filename(&mut self, filename: PathBuf) {
        self.filename = filename;
    }

    fn generate(&self, params: &[RelevantParam]) -> GlobforgeResult<()> {
        write_output(&self.filename, &self.render(params))
    }
}

/// Java class of `public static final` constants, named after the output file.
#[derive(Debug)]
pub struct JavaGenerator {
    filename: PathBuf,
}

impl JavaGenerator {
    pub fn boxed(filename: PathBuf, _formatter: Option<String>) -> Box<dyn Generator> {
        Box::new(JavaGenerator { filename })
    }

    pub fn render(&self, params: &[RelevantParam]) -> String {
        let class = self
            .filename
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Config".to_string());

        let mut out = String::new();
        let _ = writeln!(out, "// Generated by globforge. Do not edit.");
        let _ = writeln!(out, "public final class {class} {{");
        let _ = writeln!(out, "    private {class}() {{}}");
        let _ = writeln!(out);

        for RelevantParam { param, value } in params {
            for (id, ordinal) in param.implicit_values() {
                let _ = writeln!(out, "    public static final int {id} = {ordinal};");
            }
            let (ty, value) = match param.ptype {
                ParamType::Bool => ("boolean", bool_value(value).to_string()),
                ParamType::String => ("String", quote_string(value)),
                ParamType::Int => ("long", format!("{value}L")),
                ParamType::Float => ("double", value.clone()),
                ParamType::Enum => ("int", value.clone()),
            };
            let _ = writeln!(out, "    public static final {ty} {} = {value};", param.id);
        }

        let _ = writeln!(out, "}}");
        out
    }
}

impl Generator for JavaGenerator {
    fn format(&self) -> &'static str {
        "java"
    }

    fn filename(&self) -> &Path {
        &self.filename
    }

    fn set_filename(&mut self, filename: PathBuf) {
        self.filename = filename;
    }

    fn generate(&self, params: &[RelevantParam]) -> GlobforgeResult<()> {
        write_output(&self.filename, &self.render(params))
    }
}

/// Output produced by an external formatter script. Running the script is up to the build
/// callbacks, so [`Generator::generate`] always fails.
#[derive(Debug)]
pub struct CustomGenerator {
    filename: PathBuf,
    formatter: Option<String>,
}

impl CustomGenerator {
    pub fn boxed(filename: PathBuf, formatter: Option<String>) -> Box<dyn Generator> {
        Box::new(CustomGenerator { filename, formatter })
    }
}

impl Generator for CustomGenerator {
    fn format(&self) -> &'static str {
        "custom"
    }

    fn filename(&self) -> &Path {
        &self.filename
    }

    fn set_filename(&mut self, filename: PathBuf) {
        self.filename = filename;
    }

    fn formatter(&self) -> Option<&str> {
        self.formatter.as_deref()
    }

    fn generate(&self, _params: &[RelevantParam]) -> GlobforgeResult<()> {
        Err(BuildError::UnhandledGenerator(self.format().to_string()).into())
    }
}
