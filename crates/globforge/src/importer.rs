//! External dependency setup: an ordered pipeline of actions per dependency.
//!
//! Each action reads and updates an [`ActionChain`]: `dest` names the file to work on, `url`
//! fetches it, `sha256` checks it and `extract` switches to its unpacked copy. Actions are looked up by name in an
//! [`ImporterRegistry`].

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::GlobforgeResult;
use crate::errors::BuildError;
use globforge_util::path::abs_path;

/// Directory, relative to a dependency's output directory, where archives are unpacked.
pub const EXTRACT_DIR: &str = "extract";

/// State passed between the actions of one dependency.
#[derive(Debug)]
pub struct ActionChain {
    pub out_dir: PathBuf,
    /// The file or directory produced by the previous action.
    pub path: Option<PathBuf>,
}

impl ActionChain {
    pub fn new<P: Into<PathBuf>>(out_dir: P) -> Self {
        ActionChain {
            out_dir: out_dir.into(),
            path: None,
        }
    }

    fn require_path(&self, action: &str) -> Result<&Path, BuildError> {
        self.path
            .as_deref()
            .ok_or_else(|| BuildError::MissingDestination(action.to_string()))
    }
}

pub trait Action: fmt::Debug {
    fn name(&self) -> &'static str;

    fn arg(&self) -> &str;

    fn run(&self, chain: &mut ActionChain) -> GlobforgeResult<()>;
}

pub type ActionCtor = fn(String) -> Box<dyn Action>;

#[derive(Clone)]
pub struct ImporterRegistry {
    ctors: IndexMap<String, ActionCtor>,
}

impl fmt::Debug for ImporterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ctors.keys()).finish()
    }
}

impl ImporterRegistry {
    pub fn empty() -> Self {
        ImporterRegistry {
            ctors: IndexMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("dest", |arg| Box::new(DestAction { arg }) as Box<dyn Action>);
        registry.register("url", |arg| Box::new(UrlAction { arg }) as Box<dyn Action>);
        registry.register("sha256", |arg| Box::new(Sha256Action { arg }) as Box<dyn Action>);
        registry.register("extract", |arg| Box::new(ExtractAction { arg }) as Box<dyn Action>);
        registry
    }

    pub fn register(&mut self, name: &str, ctor: ActionCtor) {
        self.ctors.insert(name.to_string(), ctor);
    }

    pub fn create(&self, name: &str, arg: &str) -> Option<Box<dyn Action>> {
        let ctor = self.ctors.get(name)?;
        Some(ctor(arg.to_string()))
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Names the file the following actions work on.
#[derive(Debug)]
pub struct DestAction {
    arg: String,
}

impl Action for DestAction {
    fn name(&self) -> &'static str {
        "dest"
    }

    fn arg(&self) -> &str {
        &self.arg
    }

    fn run(&self, chain: &mut ActionChain) -> GlobforgeResult<()> {
        chain.path = Some(abs_path(&self.arg, &chain.out_dir));
        Ok(())
    }
}

/// Downloads to the chain path, unless it is already there.
#[derive(Debug)]
pub struct UrlAction {
    arg: String,
}

impl UrlAction {
    fn default_name(&self) -> &str {
        self.arg
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("download")
    }
}

impl Action for UrlAction {
    fn name(&self) -> &'static str {
        "url"
    }

    fn arg(&self) -> &str {
        &self.arg
    }

    fn run(&self, chain: &mut ActionChain) -> GlobforgeResult<()> {
        let target = match &chain.path {
            Some(path) => path.clone(),
            None => chain.out_dir.join(self.default_name()),
        };

        if target.exists() {
            info!("  {} already downloaded", target.display());
        } else {
            info!("  Downloading {}", self.arg);
            let response = ureq::get(&self.arg)
                .call()
                .with_context(|| format!("Could not download '{}'", self.arg))?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create '{}'", parent.display()))?;
            }
            let mut file = File::create(&target)
                .with_context(|| format!("Could not create '{}'", target.display()))?;
            io::copy(&mut response.into_reader(), &mut file)
                .with_context(|| format!("Could not write '{}'", target.display()))?;
        }

        chain.path = Some(target);
        Ok(())
    }
}

pub fn sha256_file(path: &Path) -> GlobforgeResult<String> {
    let mut file = File::open(path).with_context(|| format!("Could not open '{}'", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("Could not read '{}'", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verifies the digest of the chain file.
#[derive(Debug)]
pub struct Sha256Action {
    arg: String,
}

impl Action for Sha256Action {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn arg(&self) -> &str {
        &self.arg
    }

    fn run(&self, chain: &mut ActionChain) -> GlobforgeResult<()> {
        let path = chain.require_path(self.name())?;
        let actual = sha256_file(path)?;
        debug!("sha256 {} = {actual}", path.display());
        if !actual.eq_ignore_ascii_case(self.arg.trim()) {
            return Err(BuildError::ChecksumMismatch {
                file: path.display().to_string(),
                expected: self.arg.trim().to_ascii_lowercase(),
                actual,
            }
            .into());
        }
        Ok(())
    }
}

/// Moves the chain on to the unpacked archive in [`EXTRACT_DIR`], which must already exist.
#[derive(Debug)]
pub struct ExtractAction {
    /// Leading path text dropped from every archive member.
    arg: String,
}

impl Action for ExtractAction {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn arg(&self) -> &str {
        &self.arg
    }

    fn run(&self, chain: &mut ActionChain) -> GlobforgeResult<()> {
        let archive = chain.require_path(self.name())?.to_path_buf();
        let target = chain.out_dir.join(EXTRACT_DIR);
        if !target.is_dir() {
            return Err(BuildError::CannotExtract(archive.display().to_string()).into());
        }
        info!("  {} already extracted", target.display());
        chain.path = Some(target);
        Ok(())
    }
}

#[derive(Debug)]
pub struct ExternalDependency {
    name: String,
    actions: Vec<Box<dyn Action>>,
}

impl ExternalDependency {
    pub fn new<S: Into<String>>(name: S, actions: Vec<Box<dyn Action>>) -> Self {
        ExternalDependency {
            name: name.into(),
            actions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }

    /// Run every action in order inside `out_dir`.
    pub fn setup(&self, out_dir: &Path) -> GlobforgeResult<()> {
        let mut chain = ActionChain::new(out_dir);
        for action in &self.actions {
            debug!("{}: {} {}", self.name, action.name(), action.arg());
            action
                .run(&mut chain)
                .with_context(|| format!("Dependency {} failed at '{}'", self.name, action.name()))?;
        }
        Ok(())
    }
}

impl fmt::Display for ExternalDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.actions.iter().map(|a| a.name()).collect();
        write!(f, "{}: {}", self.name, names.join(","))
    }
}
