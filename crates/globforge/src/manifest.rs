use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::errors::BuildError;
use crate::generators::Generator;

/// Labels whose entries are files, expanded by glob and made absolute.
pub const FILE_LABELS: &[&str] = &["aux_files", "sources"];

/// Labels whose entries are directories.
pub const PATH_LABELS: &[&str] = &["prv_includes", "pub_includes"];

/// Labels whose entries are passed through untouched.
pub const RAW_LABELS: &[&str] = &["prv_defines", "pub_defines"];

/// Labels aggregated across every package of a project.
pub const PUBLIC_LABELS: &[&str] = &["pub_includes", "pub_defines"];

pub fn all_labels() -> impl Iterator<Item = &'static str> {
    FILE_LABELS
        .iter()
        .chain(PATH_LABELS)
        .chain(RAW_LABELS)
        .copied()
}

pub fn is_label(name: &str) -> bool {
    all_labels().any(|l| l == name)
}

/// A definition file and the generators run over it.
#[derive(Debug)]
pub struct ManifestConfig {
    pub definition: PathBuf,
    pub formatter: Option<String>,
    pub generators: Vec<Box<dyn Generator>>,
}

/// File lists and generator configs for one package.
#[derive(Debug)]
pub struct Manifest {
    filename: PathBuf,
    root: PathBuf,
    tables: IndexMap<String, Vec<String>>,
    configs: Vec<ManifestConfig>,
}

impl Manifest {
    /// Create a manifest whose entries are relative to `root`, or to the manifest's own
    /// directory when no root is given.
    pub fn new<P: Into<PathBuf>>(filename: P, root: Option<PathBuf>) -> Self {
        let filename = filename.into();
        let root = root.unwrap_or_else(|| globforge_util::path::parent_dir(&filename));
        Manifest {
            filename,
            root,
            tables: IndexMap::new(),
            configs: vec![],
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Declare a table. Entries can only be added to declared tables.
    pub fn add_type(&mut self, label: &str) {
        self.tables.entry(label.to_string()).or_default();
    }

    pub fn add_entry(&mut self, label: &str, entry: &str) -> Result<(), BuildError> {
        let table = self
            .tables
            .get_mut(label)
            .ok_or_else(|| BuildError::UnknownLabel(label.to_string()))?;
        if !entry.is_empty() {
            table.push(entry.to_string());
        }
        Ok(())
    }

    pub fn add_config(&mut self, config: ManifestConfig) {
        self.configs.push(config);
    }

    pub fn entries(&self, label: &str) -> &[String] {
        self.tables.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn entries_mut(&mut self, label: &str) -> Option<&mut Vec<String>> {
        self.tables.get_mut(label)
    }

    pub fn tables(&self) -> &IndexMap<String, Vec<String>> {
        &self.tables
    }

    pub fn configs(&self) -> &[ManifestConfig] {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> &mut [ManifestConfig] {
        &mut self.configs
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File: {}", self.filename.display())?;
        for (label, entries) in &self.tables {
            write!(f, "\n{label}:")?;
            for entry in entries {
                write!(f, "\n  {entry}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tables() {
        let mut manifest = Manifest::new("pkg/lib.gman", None);
        assert_eq!(manifest.root(), Path::new("pkg"));

        manifest.add_type("sources");
        manifest.add_type("pub_defines");
        manifest.add_entry("sources", "a.c").unwrap();
        manifest.add_entry("sources", "").unwrap();
        manifest.add_entry("pub_defines", "X=1").unwrap();
        assert_eq!(
            manifest.add_entry("bogus", "x").unwrap_err(),
            BuildError::UnknownLabel("bogus".into())
        );

        assert_eq!(manifest.entries("sources"), &["a.c".to_string()]);
        assert!(manifest.entries("bogus").is_empty());
        assert_eq!(
            manifest.to_string(),
            "File: pkg/lib.gman\nsources:\n  a.c\npub_defines:\n  X=1"
        );
    }

    #[test]
    fn labels() {
        assert_eq!(all_labels().count(), 6);
        assert!(is_label("prv_includes"));
        assert!(!is_label("includes"));
        assert!(PUBLIC_LABELS.iter().all(|l| is_label(l)));
    }
}
