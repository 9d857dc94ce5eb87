//! Initialize a new lore project.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE, DATA_DIR};

pub fn run(path: Option<String>) -> Result<()> {
    let base_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    println!("{} Initializing lore project...", "→".blue());

    // Create .lore directory
    let lore_dir = base_path.join(DATA_DIR);
    std::fs::create_dir_all(&lore_dir)
        .with_context(|| format!("Failed to create {}", lore_dir.display()))?;
    println!("  {} Created {}", "✓".green(), lore_dir.display());

    // Create default config
    let config_path = base_path.join(CONFIG_FILE);
    if !config_path.exists() {
        Config::default().save(&config_path)?;
        println!("  {} Created {}", "✓".green(), config_path.display());
    } else {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
    }

    // Keep snapshots out of version control
    let gitignore_path = lore_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "communities.json\n")
            .with_context(|| format!("Failed to write {}", gitignore_path.display()))?;
        println!("  {} Created {}", "✓".green(), gitignore_path.display());
    }

    println!();
    println!("{} Lore project initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  {} lore detect <graph.json>", "1.".blue());
    println!("  {} lore stats", "2.".blue());
    println!("  {} lore bridges", "3.".blue());

    Ok(())
}
