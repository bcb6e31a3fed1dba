//! Ties the parsers together: a project file selects layer configs, which give the settings
//! under which every package manifest is read and every configured generator is run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globforge_settings::Settings;
use globforge_util::path::{abs_path, parent_dir, relative_to};
use globforge_util::{Matcher, read_file};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{Level, debug, enabled, info, trace};

use crate::GlobforgeResult;
use crate::config::Config;
use crate::deftree::{DefTree, RelevantParam};
use crate::errors::BuildError;
use crate::generators::{Generator, GeneratorRegistry};
use crate::importer::ImporterRegistry;
use crate::manifest::{FILE_LABELS, Manifest, PUBLIC_LABELS};
use crate::parser::{ConfigParser, DefinitionParser, ManifestParser, ProjectParser};
use crate::project::{Project, RootKind, Variant};

static SELECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^=]+)=(.+)$").unwrap());

/// What a build produced, handed to every [`BuildCallbacks`] hook.
#[derive(Debug, Default)]
pub struct BuildMetadata {
    pub prj_dir: PathBuf,
    pub out_dir: PathBuf,
    /// The layer configs merged in layer order.
    pub settings: Settings,
    /// Entries of the public labels, gathered from every package.
    pub public: IndexMap<String, Vec<String>>,
}

/// Hooks into [`Builder::build_project`]. Every hook defaults to doing nothing.
pub trait BuildCallbacks {
    /// Settings are merged; no package has been read yet.
    fn prebuild(&mut self, _metadata: &BuildMetadata) -> GlobforgeResult<()> {
        Ok(())
    }

    /// Offered each generator before it runs. Return `true` when the hook produced the output
    /// itself.
    fn generator(
        &mut self,
        _metadata: &BuildMetadata,
        _generator: &dyn Generator,
        _params: &[RelevantParam],
    ) -> GlobforgeResult<bool> {
        Ok(false)
    }

    /// Every package has been read and every generator has run.
    fn postprocess(&mut self, _metadata: &BuildMetadata) -> GlobforgeResult<()> {
        Ok(())
    }

    /// One call per package, with its non-public tables. `name` is the manifest path relative
    /// to the project directory, without extension.
    fn target(
        &mut self,
        _metadata: &BuildMetadata,
        _name: &str,
        _tables: &IndexMap<String, Vec<String>>,
    ) -> GlobforgeResult<()> {
        Ok(())
    }

    fn postbuild(&mut self, _metadata: &BuildMetadata) -> GlobforgeResult<()> {
        Ok(())
    }
}

/// Callbacks that do nothing.
#[derive(Debug, Default)]
pub struct NoCallbacks;

impl BuildCallbacks for NoCallbacks {}

#[derive(Debug, Default)]
pub struct Builder {
    generators: GeneratorRegistry,
    importers: ImporterRegistry,
}

impl Builder {
    pub fn new(generators: GeneratorRegistry, importers: ImporterRegistry) -> Self {
        Builder {
            generators,
            importers,
        }
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    pub fn importers(&self) -> &ImporterRegistry {
        &self.importers
    }

    pub fn build_config(&self, file: &Path) -> GlobforgeResult<Config> {
        let mut config = Config::new(file, true);
        read_file(&mut ConfigParser::new(&mut config), file)?;
        Ok(config)
    }

    pub fn build_definition(&self, file: &Path) -> GlobforgeResult<DefTree> {
        let mut tree = DefTree::new(file);
        read_file(&mut DefinitionParser::new(&mut tree), file)?;
        Ok(tree)
    }

    /// Read a manifest under `settings`, checking its entries against the filesystem relative
    /// to `pkg_root`.
    pub fn build_manifest(&self, file: &Path, settings: &Settings, pkg_root: &Path) -> GlobforgeResult<Manifest> {
        let mut manifest = Manifest::new(file, Some(pkg_root.to_path_buf()));
        read_file(
            &mut ManifestParser::new(&mut manifest, settings, &self.generators, true),
            file,
        )?;
        Ok(manifest)
    }

    pub fn load_project(&self, file: &Path) -> GlobforgeResult<Project> {
        let mut project = Project::new(file, true);
        read_file(&mut ProjectParser::new(&mut project, &self.importers), file)?;
        Ok(project)
    }

    /// Pick one variant per layer from `LAYER=VARIANT` selections, in layer order. Layers with
    /// a single variant need no selection.
    pub fn select_variants<'p, S: AsRef<str>>(
        &self,
        project: &'p Project,
        selections: &[S],
    ) -> GlobforgeResult<Vec<(&'p str, &'p Variant)>> {
        let mut selected: IndexMap<String, &Variant> = IndexMap::new();

        for selection in selections {
            let selection = selection.as_ref();
            let mut m = Matcher::new(selection);
            if !m.is_fullmatch(&SELECTION_RE) {
                return Err(BuildError::MalformedSetting(selection.to_string()).into());
            }
            let (layer, variant) = (m.group(1).trim(), m.group(2).trim());
            if selected.contains_key(layer) {
                return Err(BuildError::ConflictingSetting(selection.to_string()).into());
            }
            info!("  {layer}: {variant}");
            selected.insert(layer.to_string(), project.target(layer, variant)?);
        }

        let mut out = vec![];
        for layer in project.layers() {
            let variant = match selected.get(layer.name.as_str()) {
                Some(variant) => *variant,
                None => match layer.variants.as_slice() {
                    [only] => {
                        debug!("  **Default selected for layer {}**", layer.name);
                        info!("  {}: {}", layer.name, only.name);
                        only
                    }
                    _ => return Err(BuildError::MissingVariant(layer.name.clone()).into()),
                },
            };
            out.push((layer.name.as_str(), variant));
        }
        Ok(out)
    }

    /// Merge the selected layer configs, lowest layer first.
    pub fn project_settings<S: AsRef<str>>(&self, project: &Project, selections: &[S]) -> GlobforgeResult<Settings> {
        let prj_dir = project.dir();
        info!("Build configuration:");
        let variants = self.select_variants(project, selections)?;

        info!("Generating settings in layer order:");
        let mut settings = Settings::new();
        for (layer, variant) in variants {
            let file = abs_path(&variant.filename, &prj_dir);
            info!("  {layer}: {}", file.display());
            let config = self.build_config(&file)?;
            settings.extend(config.settings());
        }
        Ok(settings)
    }

    pub fn build_project<S: AsRef<str>>(
        &self,
        file: &Path,
        out_dir: &Path,
        selections: &[S],
        callbacks: &mut dyn BuildCallbacks,
    ) -> GlobforgeResult<BuildMetadata> {
        let cwd = std::env::current_dir().context("Could not read the working directory")?;
        let file = abs_path(file, &cwd);
        let project = self.load_project(&file)?;
        info!("Project: {}", project.name().unwrap_or_default());

        let prj_dir = project.dir();
        info!("PrjDir: {}", prj_dir.display());
        let out_dir = abs_path(out_dir, &cwd);
        info!("OutDir: {}", out_dir.display());
        fs::create_dir_all(&out_dir).with_context(|| format!("Could not create '{}'", out_dir.display()))?;

        for dependency in project.dependencies() {
            info!("Checking dependency {}...", dependency.name());
            let dep_out_dir = out_dir.join(dependency.name());
            fs::create_dir_all(&dep_out_dir)
                .with_context(|| format!("Could not create '{}'", dep_out_dir.display()))?;
            dependency.setup(&dep_out_dir)?;
        }

        let settings = self.project_settings(&project, selections)?;

        let mut metadata = BuildMetadata {
            prj_dir: prj_dir.clone(),
            out_dir: out_dir.clone(),
            settings,
            public: PUBLIC_LABELS.iter().map(|l| (l.to_string(), vec![])).collect(),
        };
        callbacks.prebuild(&metadata)?;

        info!("Processing packages...");
        let mut manifests = vec![];
        for pkg in project.packages() {
            let dep_dir = || out_dir.join(pkg.module_id.as_deref().unwrap_or_default());
            let pkg_file = match pkg.file_root {
                RootKind::Source => abs_path(&pkg.filename, &prj_dir),
                RootKind::Dependency => abs_path(&pkg.filename, dep_dir()),
            };
            let pkg_dir = parent_dir(&pkg_file);
            let pkg_root = match pkg.module_root {
                RootKind::Source => pkg_dir.clone(),
                RootKind::Dependency => dep_dir(),
            };
            info!("  {}", pkg_file.display());

            let mut manifest = self.build_manifest(&pkg_file, &metadata.settings, &pkg_root)?;
            for label in FILE_LABELS {
                if let Some(entries) = manifest.entries_mut(label) {
                    for entry in entries.iter_mut() {
                        *entry = abs_path(&*entry, &pkg_root).display().to_string();
                    }
                }
            }
            for label in PUBLIC_LABELS {
                let entries = manifest.entries(label).to_vec();
                metadata.public.entry(label.to_string()).or_default().extend(entries);
            }
            if enabled!(Level::TRACE) {
                for (label, entries) in manifest.tables() {
                    trace!("    {label}:");
                    for entry in entries {
                        trace!("      {entry}");
                    }
                }
            }

            self.run_generators(&mut manifest, &pkg_dir, &metadata, callbacks)?;
            manifests.push(manifest);
        }

        callbacks.postprocess(&metadata)?;

        for manifest in &manifests {
            let tables: IndexMap<String, Vec<String>> = manifest
                .tables()
                .iter()
                .filter(|(label, _)| !PUBLIC_LABELS.contains(&label.as_str()))
                .map(|(label, entries)| (label.clone(), entries.clone()))
                .collect();
            let name = relative_to(manifest.filename(), &prj_dir).with_extension("");
            callbacks.target(&metadata, &name.display().to_string(), &tables)?;
        }

        callbacks.postbuild(&metadata)?;
        Ok(metadata)
    }

    /// Build each config's definition and feed its relevant params to its generators. Outputs
    /// land in the same place under `out_dir` as they are declared under the package.
    fn run_generators(
        &self,
        manifest: &mut Manifest,
        pkg_dir: &Path,
        metadata: &BuildMetadata,
        callbacks: &mut dyn BuildCallbacks,
    ) -> GlobforgeResult<()> {
        for config in manifest.configs_mut() {
            let definition = abs_path(&config.definition, pkg_dir);
            info!("    Parsing {}", definition.display());
            let tree = self.build_definition(&definition)?;
            let params = tree
                .get_relevant_params(&metadata.settings)
                .with_context(|| format!("In '{}'", definition.display()))?;
            config.definition = definition;

            for generator in config.generators.iter_mut() {
                let declared = abs_path(generator.filename(), pkg_dir);
                let out_file = abs_path(relative_to(&declared, pkg_dir), &metadata.out_dir);
                if !out_file.starts_with(&metadata.out_dir) {
                    let name = generator.filename().display().to_string();
                    return Err(BuildError::OutputOutsideOutDir(name).into());
                }
                info!("      Generating {}", out_file.display());
                generator.set_filename(out_file);

                if let Some(formatter) = generator.formatter() {
                    info!("      Executing {}", abs_path(formatter, pkg_dir).display());
                }
                if callbacks.generator(metadata, &**generator, &params)? {
                    continue;
                }
                generator.generate(&params)?;
            }
        }
        Ok(())
    }
}
