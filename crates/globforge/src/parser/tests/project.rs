use globforge_util::read_str;
use pretty_assertions::assert_eq;

use crate::errors::{BuildError, ParseError, ParseErrorKind};
use crate::importer::ImporterRegistry;
use crate::parser::ProjectParser;
use crate::project::{Package, Project, RootKind};

fn parse(text: &str) -> anyhow::Result<Project> {
    let importers = ImporterRegistry::with_defaults();
    let mut project = Project::new("test.gfp", true);
    read_str(&mut ProjectParser::new(&mut project, &importers), "test.gfp", text)?;
    Ok(project)
}

fn kind(err: anyhow::Error) -> ParseErrorKind {
    err.downcast::<ParseError>().unwrap().kind
}

/// `(name, arg)` of every action of a dependency.
fn actions(project: &Project, name: &str) -> Vec<(String, String)> {
    project
        .dependency(name)
        .unwrap()
        .actions()
        .iter()
        .map(|a| (a.name().to_string(), a.arg().to_string()))
        .collect()
}

#[test]
fn empty_project() {
    let project = parse(
        r#"
; This is a comment
# This is also a comment
   ; This comment is indented
:project MyProject
:end
"#,
    )
    .unwrap();
    assert_eq!(project.name(), Some("MyProject"));
    assert!(project.layers().is_empty());
    assert!(project.packages().is_empty());
    assert_eq!(project.dependencies().count(), 0);
}

#[test]
fn name_whitespace() {
    let project = parse(":project \tMy_Project \n:end").unwrap();
    assert_eq!(project.name(), Some("My_Project"));
}

#[test_log::test]
fn dependencies() {
    let project = parse(
        r#"
:project DepTest
    :dependency FOO
        dest chu.zip
        url https://foohub.com/foo_man/FOO/master/chu.zip
        extract chu/
    :end
    :ext_package FOO extract/chu.gman
    :dependency BAR
        dest bar.bin
        url https://foohub.com/foo_man/FOO/master/bar.bin
    :end
    :lcl_package BAR external/BAR.gman
:end
"#,
    )
    .unwrap();

    assert_eq!(project.name(), Some("DepTest"));
    assert_eq!(project.packages(), &[
        Package {
            filename: "extract/chu.gman".into(),
            file_root: RootKind::Dependency,
            module_root: RootKind::Source,
            module_id: Some("FOO".into()),
        },
        Package {
            filename: "external/BAR.gman".into(),
            file_root: RootKind::Source,
            module_root: RootKind::Dependency,
            module_id: Some("BAR".into()),
        },
    ]);

    let names: Vec<_> = project.dependencies().map(|d| d.name()).collect();
    assert_eq!(names, vec!["FOO", "BAR"]);
    assert_eq!(actions(&project, "FOO"), vec![
        ("dest".to_string(), "chu.zip".to_string()),
        ("url".to_string(), "https://foohub.com/foo_man/FOO/master/chu.zip".to_string()),
        ("extract".to_string(), "chu/".to_string()),
    ]);
    assert_eq!(actions(&project, "BAR"), vec![
        ("dest".to_string(), "bar.bin".to_string()),
        ("url".to_string(), "https://foohub.com/foo_man/FOO/master/bar.bin".to_string()),
    ]);
    assert_eq!(project.dependency("BAR").unwrap().to_string(), "BAR: dest,url");
}

#[test]
fn layers() {
    let project = parse(
        r#"
:project Breakfast
    :layer cereal
        variant SugarFlakes
    :end
    :layer fruit
        variant Apple
        variant Banana
        variant Pear
        suffix .yum
    :end
    :layer drink
        prefix ../liquids/
        variant Apple
        variant Orange
        variant Cow
        suffix _Juice.txt
    :end
:end
"#,
    )
    .unwrap();

    assert_eq!(project.layer_names().collect::<Vec<_>>(), vec!["cereal", "fruit", "drink"]);
    assert_eq!(project.variant_names("fruit"), vec!["Apple", "Banana", "Pear"]);

    let filenames: Vec<_> = project
        .layers()
        .iter()
        .flat_map(|l| l.variants.iter().map(|v| v.filename.as_str()))
        .collect();
    assert_eq!(filenames, vec![
        "cereal_SugarFlakes.cfg",
        "fruit_Apple.yum",
        "fruit_Banana.yum",
        "fruit_Pear.yum",
        "../liquids/Apple_Juice.txt",
        "../liquids/Orange_Juice.txt",
        "../liquids/Cow_Juice.txt",
    ]);
}

#[test]
fn default_layer_filenames() {
    let project = parse(":project P\n:layer L\nvariant one\nvariant two\n:end\n:end").unwrap();
    assert_eq!(project.target("L", "one").unwrap().filename, "L_one.cfg");
    assert_eq!(project.target("L", "two").unwrap().filename, "L_two.cfg");
}

#[test]
fn packages() {
    let project = parse(":project MyProject\n    :package package1.gman\n    :package ./package2.mfg\n:end").unwrap();
    let filenames: Vec<_> = project.packages().iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(filenames, vec!["package1.gman", "./package2.mfg"]);
    assert!(project.packages().iter().all(|p| {
        p.file_root == RootKind::Source && p.module_root == RootKind::Source && p.module_id.is_none()
    }));
}

#[test]
fn unknown_actions() {
    let text = ":project P\n:dependency D\ndest d.zip\nunzip d.zip\n:end\n:end";
    assert_eq!(kind(parse(text).unwrap_err()), ParseErrorKind::UnknownAction {
        action: "unzip".into(),
        dependency: "D".into(),
    });

    let importers = ImporterRegistry::with_defaults();
    let mut project = Project::new("test.gfp", true);
    let mut parser = ProjectParser::new(&mut project, &importers).allow_unknown_actions();
    read_str(&mut parser, "test.gfp", text).unwrap();
    assert_eq!(actions(&project, "D"), vec![("dest".to_string(), "d.zip".to_string())]);
}

#[test]
fn errors() {
    let cases = [
        (":project A\n:end\n:project B\n:end", ParseErrorKind::MultipleProjects),
        (":project A\nname B\n:end", ParseErrorKind::ProjectParameters),
        (":layer L\n:end", ParseErrorKind::NotAllowed("layer".into())),
        (":package p.gman", ParseErrorKind::NotAllowed("package".into())),
        (":project A\n:layer L\n:package p.gman\n:end\n:end", ParseErrorKind::NotAllowed("package".into())),
        (":project A\n:project B\n:end\n:end", ParseErrorKind::NotAllowed("project".into())),
        (":project A\n:layer L\nvariant not-valid\n:end\n:end", ParseErrorKind::InvalidIdentifier),
        (":project A\n:layer L\nvariant x\nsuffix .a\nsuffix .b\n:end\n:end", ParseErrorKind::Redefinition("suffix")),
        (":project A\n:layer L\nvariant x\ncolor red\n:end\n:end", ParseErrorKind::InvalidParameter("color".into())),
        (":project A\n:layer L\n:end\n:end", ParseErrorKind::MissingField {
            block: "layer",
            field: "variant",
        }),
        (":project A\n:dependency D\n:end\n:end", ParseErrorKind::MissingField {
            block: "dependency",
            field: "action",
        }),
        (":project A\n:layer L\nvariant x\n:end\n:layer L\nvariant y\n:end\n:end", ParseErrorKind::Build(
            BuildError::DuplicateLayer("L".into()),
        )),
        (":project A\n:layer L\nvariant x\nvariant x\n:end\n:end", ParseErrorKind::Build(
            BuildError::DuplicateVariant {
                layer: "L".into(),
                variant: "x".into(),
            },
        )),
        (":end", ParseErrorKind::UnexpectedEnd),
        (":project 1 2", ParseErrorKind::BadDirective),
    ];
    for (text, expected) in cases {
        assert_eq!(kind(parse(text).unwrap_err()), expected, "{text}");
    }
}

#[test]
fn unterminated_project() {
    let err = parse(":project A\n:layer L\nvariant x\n").unwrap_err();
    assert_eq!(err.to_string(), "test.gfp:3: Unterminated block started at test.gfp:2");
}
