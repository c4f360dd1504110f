//! OpenAPI IR CLI
//!
//! Converts OpenAPI documents into the intermediate representation and
//! inspects their dependency graph.
//!
//! Usage:
//!   openapi-ir ir petstore.json -o petstore.ir.json
//!   openapi-ir ir specs/ -o out/
//!   openapi-ir graph petstore.json --order declarations
//!   openapi-ir deps petstore.json "#/components/schemas/Pet"
//!   openapi-ir config --write openapi-ir.toml

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use openapi_ir::config::OutputFormat;
use openapi_ir::graph::{find_cycles, match_pointer_to_group, ordered_pointers, WalkOrder};
use openapi_ir::pointer::normalize_pointer;
use openapi_ir::{build_graph, parse_spec, IrConfig, SpecVersion};

#[derive(Parser)]
#[command(name = "openapi-ir")]
#[command(about = "Convert OpenAPI documents into a version-independent IR")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document, or every document in a directory
    Ir {
        /// OpenAPI JSON file or directory
        input: PathBuf,

        /// Output file (or directory when the input is a directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the walk order and cycles of a document
    Graph {
        input: PathBuf,

        /// Override the configured walk order
        #[arg(long)]
        order: Option<WalkOrder>,
    },

    /// Print the dependencies of one pointer
    Deps {
        input: PathBuf,

        /// JSON Pointer, with or without the leading `#`
        pointer: String,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to this file
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match IrConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &IrConfig) -> Result<()> {
    match command {
        Commands::Ir { input, output } => {
            if input.is_dir() {
                convert_directory(&input, output.as_deref(), config)
            } else {
                let spec = read_document(&input)?;
                let json = render(&parse_spec(&spec)?, config.output.format)?;
                match output {
                    Some(path) => {
                        std::fs::write(&path, json)?;
                        println!("✅ IR written to {:?}", path);
                    }
                    None => println!("{}", json),
                }
                Ok(())
            }
        }

        Commands::Graph { input, order } => {
            let spec = read_document(&input)?;
            let graph = build_graph(&spec);

            let mut options = config.walk_options();
            if let Some(order) = order {
                options.order = order;
            }

            println!("📊 {} nodes, {} references", graph.node_count(), graph.edge_count());
            println!();
            println!("📋 {} order:", options.order);
            for pointer in ordered_pointers(&graph, &options) {
                if let Some(kind) = match_pointer_to_group(pointer) {
                    println!("  {:<12} {}", kind.as_str(), pointer);
                }
            }

            let cycles = find_cycles(&graph);
            println!();
            if cycles.is_empty() {
                println!("✅ No reference cycles");
            } else {
                println!("🔄 {} cycle(s):", cycles.len());
                for cycle in &cycles {
                    let marker = if cycle.is_self_referential { " (self)" } else { "" };
                    println!("  [{}]{} {}", cycle.id, marker, cycle.members.join(" -> "));
                }
            }
            Ok(())
        }

        Commands::Deps { input, pointer } => {
            let spec = read_document(&input)?;
            let graph = build_graph(&spec);
            let pointer = normalize_pointer(&pointer);
            if !graph.contains(&pointer) {
                bail!("Pointer not found: {}", pointer);
            }

            print_set("Direct", graph.node_dependencies.get(&pointer));
            print_set("Subtree", graph.subtree_dependencies.get(&pointer));
            print_set("Transitive", graph.transitive_dependencies.get(&pointer));
            Ok(())
        }

        Commands::Config { write } => {
            let toml = config.to_toml()?;
            if let Some(path) = write {
                config.save(&path)?;
                println!("✅ Config written to {:?}", path);
            } else {
                print!("{}", toml);
            }
            Ok(())
        }
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    })
}

fn print_set(label: &str, set: Option<&BTreeSet<String>>) {
    let set = set.map(|s| s.iter().collect::<Vec<_>>()).unwrap_or_default();
    println!("{} ({}):", label, set.len());
    for pointer in set {
        println!("  {}", pointer);
    }
}

/// Convert every `*.json` OpenAPI document under `input`.
///
/// Results land next to the source as `<stem>.ir.json`, or flat in
/// `output` when given. Files that are not OpenAPI documents are skipped.
fn convert_directory(input: &Path, output: Option<&Path>, config: &IrConfig) -> Result<()> {
    if let Some(dir) = output {
        std::fs::create_dir_all(dir)?;
    }

    println!("📂 Converting documents in {:?}", input);
    let mut converted = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !name.ends_with(".json") || name.ends_with(".ir.json") {
            continue;
        }

        let spec = read_document(path)?;
        if let Err(e) = SpecVersion::detect(&spec) {
            warn!(path = %path.display(), error = %e, "Skipping");
            skipped += 1;
            continue;
        }

        let stem = name.trim_end_matches(".json");
        let target = match output {
            Some(dir) => dir.join(format!("{}.ir.json", stem)),
            None => path.with_file_name(format!("{}.ir.json", stem)),
        };
        let model = parse_spec(&spec).with_context(|| format!("Failed to convert {:?}", path))?;
        std::fs::write(&target, render(&model, config.output.format)?)?;
        info!(source = %path.display(), target = %target.display(), "Converted");
        println!("  📦 {}", target.display());
        converted += 1;
    }

    println!();
    println!("✅ Converted {} document(s), skipped {}", converted, skipped);
    Ok(())
}
