use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use globforge::deftree::{DefForest, ForestParam, PrintObserver, by_name, by_text};
use globforge::errors::{ErrorCategory, categorize};
use globforge::generators::GeneratorRegistry;
use globforge::importer::ImporterRegistry;
use globforge::{Builder, GlobforgeResult, NoCallbacks};
use globforge_settings::Settings;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Build configuration and package manifests for globforge projects
#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// More output; repeat for more detail
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    Build(Build),
    Settings(ShowSettings),
    Defs(ShowDefs),
    Manifest(ShowManifest),
}

/// Build a project: set up dependencies, read every package and run the generators
#[derive(Parser)]
struct Build {
    project: PathBuf,

    #[clap(short, long)]
    out_dir: PathBuf,

    /// Variant selections, as LAYER=VARIANT
    selections: Vec<String>,
}

/// Print the settings a project resolves to
#[derive(Parser)]
struct ShowSettings {
    project: PathBuf,

    /// Variant selections, as LAYER=VARIANT
    selections: Vec<String>,
}

/// Print definition files, or the parameters relevant to the given configs
#[derive(Parser)]
struct ShowDefs {
    #[clap(required = true)]
    definitions: Vec<PathBuf>,

    /// Config files, merged in order
    #[clap(short, long)]
    config: Vec<PathBuf>,
}

/// Print the label lists of a manifest under the given configs
#[derive(Parser)]
struct ShowManifest {
    manifest: PathBuf,

    /// Config files, merged in order
    #[clap(short, long)]
    config: Vec<PathBuf>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn merge_configs(builder: &Builder, files: &[PathBuf]) -> GlobforgeResult<Settings> {
    let mut settings = Settings::new();
    for file in files {
        settings.extend(builder.build_config(file)?.settings());
    }
    Ok(settings)
}

fn run(opts: Opts) -> GlobforgeResult<()> {
    let builder = Builder::new(GeneratorRegistry::with_defaults(), ImporterRegistry::with_defaults());

    match opts.subcmd {
        SubCommand::Build(args) => {
            let metadata = builder.build_project(&args.project, &args.out_dir, &args.selections, &mut NoCallbacks)?;
            for (label, entries) in &metadata.public {
                println!("{label}:");
                for entry in entries {
                    println!("  {entry}");
                }
            }
        }
        SubCommand::Settings(args) => {
            let project = builder.load_project(&args.project)?;
            let settings = builder.project_settings(&project, &args.selections)?;
            for (key, value) in settings.iter() {
                println!("{key}={value}");
            }
        }
        SubCommand::Defs(args) => {
            let settings = merge_configs(&builder, &args.config)?;
            let mut forest = DefForest::new();
            for file in &args.definitions {
                let tree = builder.build_definition(file)?;
                if !args.config.is_empty() {
                    for relevant in tree.get_relevant_params(&settings)? {
                        println!("{}={}", relevant.param.id, relevant.value);
                    }
                }
                forest.add_tree(&tree);
            }
            if args.config.is_empty() {
                let mut printer = PrintObserver::new();
                forest.walk_sorted(&mut printer, Some(&by_name::<ForestParam>), Some(&by_text::<ForestParam>));
                print!("{}", printer.output());
            }
        }
        SubCommand::Manifest(args) => {
            let settings = merge_configs(&builder, &args.config)?;
            let root = globforge_util::path::parent_dir(&args.manifest);
            let manifest = builder.build_manifest(&args.manifest, &settings, &root)?;
            println!("{manifest}");
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            match categorize(&err) {
                ErrorCategory::Input => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}
