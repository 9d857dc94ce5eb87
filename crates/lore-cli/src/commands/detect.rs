//! Detect communities in a graph file.

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lore::prelude::*;
use std::path::Path;
use std::time::Duration;

use super::{read_graph, save_index, type_label};
use crate::config::Config;

/// Command-line overrides for one detection run.
pub struct DetectArgs {
    pub graph: String,
    pub namespace: Option<String>,
    pub min_size: Option<usize>,
    pub max_level: Option<usize>,
    pub resolution: Option<f64>,
    pub seed: Option<u64>,
    pub no_seed_folders: bool,
}

impl DetectArgs {
    fn apply(&self, mut options: DetectOptions) -> DetectOptions {
        if let Some(min_size) = self.min_size {
            options.min_size = min_size;
        }
        if let Some(max_level) = self.max_level {
            options.max_level = max_level;
        }
        if let Some(resolution) = self.resolution {
            options.resolution = resolution;
        }
        if self.seed.is_some() {
            options.seed = self.seed;
        }
        if self.no_seed_folders {
            options.seed_from_folders = false;
        }
        options
    }
}

pub fn run(args: DetectArgs, config: &Config, verbose: bool) -> Result<()> {
    let path = Path::new(&args.graph);
    let input = read_graph(path)?;
    let namespace = args.namespace.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "default".to_string())
    });
    let options = args.apply(config.detect_options());

    println!(
        "{} Detecting communities in {} nodes, {} edges...",
        "→".blue(),
        input.nodes.len().to_string().cyan(),
        input.edges.len().to_string().cyan()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("clustering {}", namespace));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let detection = detect_with_report(&input.nodes, &input.edges, &namespace, &options);
    spinner.finish_and_clear();
    let Detection { communities, report } = detection?;

    let index = CommunityIndex::from_communities(communities);
    let saved = save_index(&index, &namespace)?;

    println!();
    println!(
        "  {:<6} {} {:>6}  {}",
        "LEVEL".dimmed(),
        format!("{:<14}", "TYPE").dimmed(),
        "SIZE".dimmed(),
        "NAME".dimmed()
    );
    for community in index.get_all_communities() {
        let marker = if community.is_seeded() { "*" } else { " " };
        println!(
            "  {:<6} {} {:>6}  {}{}",
            community.level,
            type_label(community.community_type),
            community.size(),
            community.name.white().bold(),
            marker.yellow()
        );
        if verbose && !community.description.is_empty() {
            println!("  {:<6} {}", "", community.description.dimmed());
        }
    }

    println!();
    println!("{} Detection complete!", "✓".green().bold());
    println!("  Communities: {}", index.len().to_string().cyan());
    println!(
        "  Seeded:      {} ({} expanded by detection)",
        report.seeded.to_string().cyan(),
        report.expanded
    );
    println!("  Detected:    {} ({} new)", report.detected.to_string().cyan(), report.created);
    println!("  Modularity:  {:.4}", report.modularity);
    println!("  Levels:      {}  Passes: {}", report.levels, report.passes);
    println!("  Saved to:    {}", saved.display().to_string().dimmed());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DetectArgs {
        DetectArgs {
            graph: "graph.json".into(),
            namespace: None,
            min_size: None,
            max_level: None,
            resolution: None,
            seed: None,
            no_seed_folders: false,
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        config.detection.seed = Some(1);
        config.detection.min_size = 5;

        let overridden = DetectArgs {
            min_size: Some(2),
            resolution: Some(0.5),
            no_seed_folders: true,
            ..args()
        }
        .apply(config.detect_options());

        assert_eq!(overridden.min_size, 2);
        assert_eq!(overridden.resolution, 0.5);
        assert_eq!(overridden.seed, Some(1));
        assert!(!overridden.seed_from_folders);
    }

    #[test]
    fn no_flags_keep_config() {
        let config = Config::default();
        let options = args().apply(config.detect_options());
        assert_eq!(options.min_size, 3);
        assert!(options.seed_from_folders);
        assert!(options.seed.is_none());
    }
}
