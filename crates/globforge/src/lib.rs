//! Parsers and build orchestration for globforge projects.
//!
//! A project file names layers of `KEY=value` config files and a list of package manifests.
//! Manifests list source files under labels, optionally gated by conditions over the merged
//! settings, and point at definition files whose parameters are fed to code generators.

pub mod builder;
pub mod config;
pub mod deftree;
pub mod errors;
pub mod generators;
pub mod importer;
pub mod manifest;
pub mod parser;
pub mod project;

pub use builder::{BuildCallbacks, BuildMetadata, Builder, NoCallbacks};
pub use errors::{BuildError, ErrorCategory, ParseError, ParseErrorKind};

pub type GlobforgeResult<T> = anyhow::Result<T>;
