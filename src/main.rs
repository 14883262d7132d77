//! Command line front end: load an architecture, rewrite it, optionally build it.

use rustytree::config::BuildConfig;
use rustytree::network::Network;
use rustytree::serialization::{load_architecture, save_architecture};
use rustytree::transform::{
    add_hyperparameters, remove_node, remove_nodes_with_kind, remove_parent, remove_parents, remove_subtree,
};
use rustytree::tree::{NodeKind, OptionValue, Options, Tree};

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Аргументы командной строки
#[derive(Parser, Debug)]
#[command(author, version, about = "RustyTree: rewrite and build tree-structured networks", long_about = None)]
struct Args {
    /// Architecture JSON file
    architecture: PathBuf,

    /// Build configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Promote this node to the root, dropping its ancestors
    #[arg(long)]
    root: Option<String>,

    /// Replace these subtrees with identity nodes
    #[arg(long = "remove-subtree")]
    remove_subtree: Vec<String>,

    /// Splice out these nodes
    #[arg(long = "remove-node")]
    remove_node: Vec<String>,

    /// Splice out every node of this kind (e.g. `dropout`)
    #[arg(long = "remove-kind")]
    remove_kind: Vec<NodeKind>,

    /// Replace the parents of these nodes with the nodes themselves
    #[arg(long = "remove-parent")]
    remove_parent: Vec<String>,

    /// Tree-wide default, `name=<json value>`; repeatable
    #[arg(long = "default", value_parser = parse_default)]
    defaults: Vec<(String, OptionValue)>,

    /// Resolve hyperparameters and compile the network
    #[arg(short, long)]
    build: bool,

    /// Write the rewritten architecture here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_default(arg: &str) -> Result<(String, OptionValue), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))?;
    // bare words are taken as strings
    let json = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    let value = OptionValue::from_json(&json).ok_or_else(|| format!("unsupported value '{}'", raw))?;
    Ok((name.to_string(), value))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let tree = load_architecture(&args.architecture)?;
    info!(path = %args.architecture.display(), nodes = tree.len(), "architecture loaded");

    let tree = rewrite(tree, &args)?;
    println!("{}", tree);

    if let Some(path) = &args.output {
        save_architecture(path, &tree)?;
        info!(path = %path.display(), "architecture saved");
    }

    if args.build {
        let config = match &args.config {
            Some(path) => BuildConfig::from_json_file(path)?,
            None => BuildConfig::default(),
        };
        let network = Network::build(tree, &config)?;
        for op in network.execution_order() {
            let options: Vec<String> = op
                .hyperparameters
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            println!("{:<24} {:<20} {}", op.name, op.kind, options.join(", "));
        }
        println!("inputs: {:?}", network.inputs().keys().collect::<Vec<_>>());
    }
    Ok(())
}

/// Applies the requested rewrites: root promotion first, then removals, then defaults.
fn rewrite(mut tree: Tree, args: &Args) -> Result<Tree, Box<dyn std::error::Error>> {
    if let Some(name) = &args.root {
        tree = remove_parents(&tree, name)?;
    }
    if !args.remove_subtree.is_empty() {
        tree = remove_subtree(&tree, &args.remove_subtree)?;
    }
    if !args.remove_node.is_empty() {
        tree = remove_node(&tree, &args.remove_node)?;
    }
    for kind in &args.remove_kind {
        tree = remove_nodes_with_kind(&tree, *kind)?;
    }
    if !args.remove_parent.is_empty() {
        tree = remove_parent(&tree, &args.remove_parent)?;
    }
    if !args.defaults.is_empty() {
        let options: Options = args.defaults.iter().cloned().collect();
        tree = add_hyperparameters(&tree, "cli_defaults", options)?;
    }
    Ok(tree)
}
