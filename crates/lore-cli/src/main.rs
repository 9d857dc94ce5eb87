//! Lore CLI - community detection for narrative knowledge graphs.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::str::FromStr;
use tracing::Level;

use crate::commands::detect::DetectArgs;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "lore")]
#[command(author, version, about = "Lore - hierarchical community detection for story worlds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new lore project
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Detect communities in a graph file
    Detect {
        /// Graph JSON file: {"nodes": [...], "edges": [...]}
        graph: String,

        /// Namespace for the communities (default: file name)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Drop detected clusters smaller than this
        #[arg(long)]
        min_size: Option<usize>,

        /// Maximum clustering levels
        #[arg(long)]
        max_level: Option<usize>,

        /// Resolution (higher = more, smaller communities)
        #[arg(short, long)]
        resolution: Option<f64>,

        /// Shuffle seed for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,

        /// Do not seed communities from faction folders
        #[arg(long)]
        no_seed_folders: bool,
    },

    /// Show community statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show entities that belong to several communities
    Bridges {
        /// Number of bridges to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Show the communities of an entity
    Entity {
        /// Entity id
        id: String,
    },

    /// Show a community's ancestor chain
    Hierarchy {
        /// Community id or exact name
        community: String,
    },

    /// Show relationships between communities
    Relations {
        /// Graph JSON file the edges are read from
        graph: String,

        /// Number of relationships to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Export the community snapshot
    Export {
        /// Output file path
        output: String,
    },

    /// Replace the communities with a snapshot
    Import {
        /// Snapshot file path
        input: String,
    },
}

fn init_logging(verbose: bool, level: &str) {
    let level = if verbose {
        Level::DEBUG
    } else {
        Level::from_str(level).unwrap_or(Level::WARN)
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// `init` writes a fresh lore.toml, so a broken one only stops the other commands.
fn config_for(command: &Commands, loaded: Result<Config>) -> Result<Config> {
    match command {
        Commands::Init { .. } => Ok(loaded.unwrap_or_default()),
        _ => loaded,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config_for(&cli.command, Config::load())?;
    init_logging(cli.verbose, &config.logging.level);

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Detect {
            graph,
            namespace,
            min_size,
            max_level,
            resolution,
            seed,
            no_seed_folders,
        } => commands::detect::run(
            DetectArgs {
                graph,
                namespace,
                min_size,
                max_level,
                resolution,
                seed,
                no_seed_folders,
            },
            &config,
            cli.verbose,
        ),
        Commands::Stats { json } => commands::stats::run(json),
        Commands::Bridges { top } => commands::explore::bridges(top),
        Commands::Entity { id } => commands::explore::entity(&id),
        Commands::Hierarchy { community } => commands::explore::hierarchy(&community),
        Commands::Relations { graph, top } => commands::explore::relations(&graph, top),
        Commands::Export { output } => commands::export::export(&output),
        Commands::Import { input } => commands::export::import(&input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;

    fn broken_config() -> Result<Config> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[detection\nmin_size = ").unwrap();
        Config::load_from(&path)
    }

    #[test]
    fn init_ignores_a_broken_config() {
        let config = config_for(&Commands::Init { path: None }, broken_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn other_commands_report_a_broken_config() {
        assert!(config_for(&Commands::Stats { json: false }, broken_config()).is_err());
    }

    #[test]
    fn cli_parses_detect_flags() {
        let cli = Cli::try_parse_from(["lore", "detect", "world.json", "--seed", "3", "--no-seed-folders"]).unwrap();
        match cli.command {
            Commands::Detect { graph, seed, no_seed_folders, .. } => {
                assert_eq!(graph, "world.json");
                assert_eq!(seed, Some(3));
                assert!(no_seed_folders);
            }
            _ => panic!("expected detect"),
        }
    }
}
