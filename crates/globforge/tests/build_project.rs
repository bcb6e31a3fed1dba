use std::fs;
use std::path::Path;

use globforge::deftree::RelevantParam;
use globforge::errors::{ErrorCategory, categorize};
use globforge::generators::{Generator, GeneratorRegistry};
use globforge::importer::ImporterRegistry;
use globforge::{BuildCallbacks, BuildError, BuildMetadata, Builder, GlobforgeResult, NoCallbacks};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const PROJECT: &str = r#"
:project Demo
    :layer base
        variant all
    :end
    :layer board
        variant alpha
        variant beta
    :end
    :package pkg/foo.gman
:end
"#;

const MANIFEST: &str = r#"
:sources
    src/main.c
:if(BOARD=2)
    src/beta.c
:end
:pub_includes
    include
:pub_defines
    FOO_BOARD
:config
    definition foo.gdef
    generate c gen/foo_cfg.h
:end
"#;

const DEFINITION: &str = r#"
:config_b LOG
:config MODE
    type ENUM
    choice FAST
    choice SLOW
:end
"#;

fn project_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("pkg/src")).unwrap();
    fs::create_dir_all(root.join("pkg/include")).unwrap();

    let files = [
        ("demo.gfp", PROJECT),
        ("base_all.cfg", "; Logging on by default\nLOG=TRUE\nMODE=FAST\n"),
        ("board_alpha.cfg", "BOARD=1\n"),
        ("board_beta.cfg", "BOARD=2\nLOG=FALSE\n"),
        ("pkg/foo.gman", MANIFEST),
        ("pkg/foo.gdef", DEFINITION),
        ("pkg/src/main.c", ""),
        ("pkg/src/beta.c", ""),
    ];
    for (name, text) in files {
        fs::write(root.join(name), text).unwrap();
    }
    dir
}

fn builder() -> Builder {
    Builder::new(GeneratorRegistry::with_defaults(), ImporterRegistry::with_defaults())
}

fn abs(root: &Path, rel: &str) -> String {
    root.join(rel).display().to_string()
}

/// Records every hook call.
#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    targets: IndexMap<String, IndexMap<String, Vec<String>>>,
    handle_generators: bool,
}

impl BuildCallbacks for Recorder {
    fn prebuild(&mut self, metadata: &BuildMetadata) -> GlobforgeResult<()> {
        let board = metadata.settings.get_value("BOARD").unwrap_or_default();
        self.calls.push(format!("prebuild BOARD={board}"));
        Ok(())
    }

    fn generator(
        &mut self,
        _metadata: &BuildMetadata,
        generator: &dyn Generator,
        params: &[RelevantParam],
    ) -> GlobforgeResult<bool> {
        let ids: Vec<_> = params.iter().map(|p| p.param.id.as_str()).collect();
        self.calls.push(format!("generator {} {}", generator.format(), ids.join(",")));
        Ok(self.handle_generators)
    }

    fn postprocess(&mut self, _metadata: &BuildMetadata) -> GlobforgeResult<()> {
        self.calls.push("postprocess".into());
        Ok(())
    }

    fn target(
        &mut self,
        _metadata: &BuildMetadata,
        name: &str,
        tables: &IndexMap<String, Vec<String>>,
    ) -> GlobforgeResult<()> {
        self.calls.push(format!("target {name}"));
        self.targets.insert(name.to_string(), tables.clone());
        Ok(())
    }

    fn postbuild(&mut self, _metadata: &BuildMetadata) -> GlobforgeResult<()> {
        self.calls.push("postbuild".into());
        Ok(())
    }
}

#[test_log::test]
fn builds_selected_variant() {
    let dir = project_dir();
    let root = dir.path();
    let out_dir = root.join("out");

    let mut recorder = Recorder::default();
    let metadata = builder()
        .build_project(&root.join("demo.gfp"), &out_dir, &["board=beta"], &mut recorder)
        .unwrap();

    assert_eq!(recorder.calls, vec![
        "prebuild BOARD=2",
        "generator c LOG,MODE",
        "postprocess",
        "target pkg/foo",
        "postbuild",
    ]);

    assert_eq!(metadata.prj_dir, root);
    assert_eq!(metadata.settings.get_value("LOG"), Some("FALSE"));
    assert_eq!(metadata.public["pub_includes"], vec!["include"]);
    assert_eq!(metadata.public["pub_defines"], vec!["FOO_BOARD"]);

    let tables = &recorder.targets["pkg/foo"];
    assert!(!tables.contains_key("pub_includes"));
    assert_eq!(tables["sources"], vec![abs(root, "pkg/src/main.c"), abs(root, "pkg/src/beta.c")]);

    let header = fs::read_to_string(out_dir.join("gen/foo_cfg.h")).unwrap();
    let defines: Vec<_> = header.lines().filter(|l| l.starts_with("#define ")).collect();
    assert_eq!(defines, vec![
        "#define FOO_CFG_H",
        "#define LOG 0",
        "#define FAST 0",
        "#define SLOW 1",
        "#define MODE FAST",
    ]);
}

#[test]
fn single_variant_layers_need_no_selection() {
    let dir = project_dir();
    let builder = builder();
    let project = builder.load_project(&dir.path().join("demo.gfp")).unwrap();

    let settings = builder.project_settings(&project, &["board = alpha"]).unwrap();
    assert_eq!(settings.get_value("BOARD"), Some("1"));
    assert_eq!(settings.get_value("LOG"), Some("TRUE"));

    let names: Vec<_> = builder
        .select_variants(&project, &["board=alpha"])
        .unwrap()
        .into_iter()
        .map(|(layer, variant)| format!("{layer}={}", variant.name))
        .collect();
    assert_eq!(names, vec!["base=all", "board=alpha"]);
}

#[test]
fn bad_selections() {
    let dir = project_dir();
    let builder = builder();
    let project = builder.load_project(&dir.path().join("demo.gfp")).unwrap();

    let cases: [(&[&str], BuildError); 4] = [
        (&[], BuildError::MissingVariant("board".into())),
        (&["board"], BuildError::MalformedSetting("board".into())),
        (&["board=alpha", "board=beta"], BuildError::ConflictingSetting("board=beta".into())),
        (&["board=gamma"], BuildError::UnknownVariant {
            layer: "board".into(),
            variant: "gamma".into(),
        }),
    ];
    for (selections, expected) in cases {
        let err = builder.project_settings(&project, selections).unwrap_err();
        assert_eq!(categorize(&err), ErrorCategory::Input);
        assert_eq!(err.downcast::<BuildError>().unwrap(), expected);
    }
}

#[test]
fn handled_generators_write_nothing() {
    let dir = project_dir();
    let out_dir = dir.path().join("out");

    let mut recorder = Recorder {
        handle_generators: true,
        ..Default::default()
    };
    builder()
        .build_project(&dir.path().join("demo.gfp"), &out_dir, &["board=alpha"], &mut recorder)
        .unwrap();
    assert!(!out_dir.join("gen/foo_cfg.h").exists());
    assert_eq!(recorder.targets["pkg/foo"]["sources"], vec![abs(dir.path(), "pkg/src/main.c")]);
}

#[test]
fn missing_source_fails_the_build() {
    let dir = project_dir();
    fs::remove_file(dir.path().join("pkg/src/beta.c")).unwrap();

    let err = builder()
        .build_project(
            &dir.path().join("demo.gfp"),
            &dir.path().join("out"),
            &["board=beta"],
            &mut NoCallbacks,
        )
        .unwrap_err();
    assert!(format!("{err:#}").ends_with("'src/beta.c' is not a file"), "{err:#}");
    assert_eq!(categorize(&err), ErrorCategory::Build);
}

#[test]
fn undefined_values_fail_the_build() {
    let dir = project_dir();
    fs::write(dir.path().join("pkg/foo.gdef"), format!("{DEFINITION}:config_i UNUSED\n")).unwrap();

    let err = builder()
        .build_project(
            &dir.path().join("demo.gfp"),
            &dir.path().join("out"),
            &["board=alpha"],
            &mut NoCallbacks,
        )
        .unwrap_err();
    assert_eq!(categorize(&err), ErrorCategory::Build);
    assert_eq!(
        err.root_cause().downcast_ref::<BuildError>(),
        Some(&BuildError::UndefinedValue("UNUSED".into()))
    );
    assert!(!dir.path().join("out/gen/foo_cfg.h").exists());
}

#[test]
fn generated_files_stay_under_the_output_directory() {
    let dir = project_dir();
    let manifest = MANIFEST.replace("gen/foo_cfg.h", "../escape.h");
    fs::write(dir.path().join("pkg/foo.gman"), manifest).unwrap();

    let err = builder()
        .build_project(
            &dir.path().join("demo.gfp"),
            &dir.path().join("out"),
            &["board=alpha"],
            &mut NoCallbacks,
        )
        .unwrap_err();
    assert_eq!(
        err.downcast::<BuildError>().unwrap(),
        BuildError::OutputOutsideOutDir("../escape.h".into())
    );
    assert!(!dir.path().join("escape.h").exists());
}
