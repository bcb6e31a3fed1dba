use std::path::{Path, PathBuf};

use derive_more::Display;
use indexmap::IndexMap;
use tracing::error;

use crate::errors::BuildError;
use crate::importer::ExternalDependency;

/// Where a package's files are found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum RootKind {
    /// Relative to the project (or manifest) directory.
    #[display("SOURCE")]
    Source,
    /// Inside a dependency's output directory.
    #[display("DEPENDENCY")]
    Dependency,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    pub filename: String,
    /// Where the manifest file itself lives.
    pub file_root: RootKind,
    /// Where the manifest's entries are resolved.
    pub module_root: RootKind,
    pub module_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    /// Layer config file, relative to the project directory.
    pub filename: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub variants: Vec<Variant>,
}

/// A buildable project: layered configuration, packages and external dependencies.
///
/// Layers are listed lowest priority first. Exactly one variant of each layer is active in a
/// build.
#[derive(Debug, Default)]
pub struct Project {
    filename: PathBuf,
    err_fatal: bool,
    name: Option<String>,
    layers: Vec<Layer>,
    packages: Vec<Package>,
    dependencies: IndexMap<String, ExternalDependency>,
    errors: Vec<BuildError>,
}

impl Project {
    /// With `err_fatal` unset, failures are logged and collected instead of returned.
    pub fn new<P: Into<PathBuf>>(filename: P, err_fatal: bool) -> Self {
        Project {
            filename: filename.into(),
            err_fatal,
            ..Default::default()
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Directory the project file lives in; relative paths are resolved from here.
    pub fn dir(&self) -> PathBuf {
        globforge_util::path::parent_dir(&self.filename)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), BuildError> {
        if let Some(current) = &self.name {
            return self.log_error(BuildError::ProjectRedefined(current.clone()));
        }
        self.name = Some(name.to_string());
        Ok(())
    }

    pub fn add_layer(&mut self, name: &str) -> Result<(), BuildError> {
        if self.layer(name).is_some() {
            return self.log_error(BuildError::DuplicateLayer(name.to_string()));
        }
        self.layers.push(Layer {
            name: name.to_string(),
            variants: vec![],
        });
        Ok(())
    }

    pub fn add_variant(&mut self, layer: &str, variant: &str, filename: &str) -> Result<(), BuildError> {
        let Some(idx) = self.layers.iter().position(|l| l.name == layer) else {
            return self.log_error(BuildError::UnknownLayer(layer.to_string()));
        };
        if self.layers[idx].variants.iter().any(|v| v.name == variant) {
            return self.log_error(BuildError::DuplicateVariant {
                layer: layer.to_string(),
                variant: variant.to_string(),
            });
        }
        self.layers[idx].variants.push(Variant {
            name: variant.to_string(),
            filename: filename.to_string(),
        });
        Ok(())
    }

    pub fn add_package(&mut self, package: Package) {
        self.packages.push(package);
    }

    pub fn add_dependency(&mut self, dependency: ExternalDependency) -> Result<(), BuildError> {
        if self.dependencies.contains_key(dependency.name()) {
            return self.log_error(BuildError::DuplicateDependency(dependency.name().to_string()));
        }
        self.dependencies.insert(dependency.name().to_string(), dependency);
        Ok(())
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    pub fn variant_names(&self, layer: &str) -> Vec<&str> {
        self.layer(layer)
            .map(|l| l.variants.iter().map(|v| v.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Look up a variant of a layer.
    pub fn target(&self, layer: &str, variant: &str) -> Result<&Variant, BuildError> {
        let found = self
            .layer(layer)
            .ok_or_else(|| BuildError::UnknownLayer(layer.to_string()))?;
        found
            .variants
            .iter()
            .find(|v| v.name == variant)
            .ok_or_else(|| BuildError::UnknownVariant {
                layer: layer.to_string(),
                variant: variant.to_string(),
            })
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &ExternalDependency> {
        self.dependencies.values()
    }

    pub fn dependency(&self, name: &str) -> Option<&ExternalDependency> {
        self.dependencies.get(name)
    }

    /// Errors collected in non-fatal mode.
    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    fn log_error(&mut self, err: BuildError) -> Result<(), BuildError> {
        if self.err_fatal {
            return Err(err);
        }
        error!("{err}");
        self.errors.push(err);
        Ok(())
    }
}
