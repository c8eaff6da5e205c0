//! Version Graph CLI
//!
//! Inspects the version graph and context link tables an engine
//! configuration describes.
//!
//! Usage:
//!   atom-versions --config atom-patch.toml graph > versions.dot
//!   atom-versions --dir versions/ path --classname Widget --from 1 --to 3
//!   atom-versions --dir versions/ contexts
//!   atom-versions check

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atom_patch::{Catalog, EngineConfig, VersionId};

#[derive(Parser)]
#[command(name = "atom-versions")]
#[command(about = "Inspect atom version graphs and context link tables")]
struct Cli {
    /// Configuration file (defaults to atom-patch.toml and friends)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory of TOML/JSON version fragments, used instead of --config
    #[arg(short, long, conflicts_with = "config")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the version graph in GraphViz DOT format
    Graph {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the patch path between two versions
    Path {
        #[arg(long)]
        classname: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Target classname, when the path crosses a rename link
        #[arg(long)]
        to_classname: Option<String>,
    },

    /// Print every context version and its link table
    Contexts {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load the configuration and summarize the version graph
    Check,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load(cli: &Cli) -> anyhow::Result<EngineConfig> {
    match &cli.dir {
        Some(dir) => EngineConfig::load_directory(dir)
            .with_context(|| format!("loading version fragments from {}", dir.display())),
        None => EngineConfig::load_from(cli.config.as_deref()).context("loading configuration"),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load(&cli)?;
    let catalog = Catalog::from_config(&config)?;
    let versions = catalog.versions();

    match cli.command {
        Command::Graph { output } => {
            let dot = versions.graph().to_dot();
            match output {
                Some(path) => {
                    std::fs::write(&path, dot)?;
                    eprintln!("Exported DOT to: {}", path.display());
                }
                None => print!("{}", dot),
            }
        }
        Command::Path {
            classname,
            from,
            to,
            to_classname,
        } => {
            let origin = VersionId::new(&classname, from);
            let target = VersionId::new(to_classname.unwrap_or(classname), to);
            let path = versions.compute_path(&origin, &target)?;

            if path.is_empty() {
                println!("{} is already at the target version", origin);
            }
            for (step, key) in path.iter().enumerate() {
                let rename = if key.is_rename() { " (rename)" } else { "" };
                println!("{:>3}. {}{}", step + 1, key, rename);
            }
        }
        Command::Contexts { format } => {
            let all: Vec<_> = versions
                .contexts()
                .iter()
                .flat_map(|context| versions.context_versions(context))
                .collect();

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&all)?),
                "text" => {
                    for cv in &all {
                        println!("{}/{}", cv.context, cv.name);
                        for id in cv.classes.values() {
                            println!("    {}", id);
                        }
                    }
                }
                other => anyhow::bail!("invalid format '{}', use 'text' or 'json'", other),
            }
        }
        Command::Check => {
            let graph = versions.graph();
            println!(
                "{} classes, {} versions, {} edges, {} contexts, {} creators",
                graph.classnames().len(),
                graph.node_count(),
                graph.edge_count(),
                versions.contexts().len(),
                catalog.creators().len()
            );
            for key in graph.edges() {
                println!("    {}", key);
            }
        }
    }

    Ok(())
}
