//! Export and import community snapshots.

use anyhow::{Context, Result};
use colored::Colorize;
use lore::runtime::snapshot;
use std::path::Path;

use super::{load_snapshot, read_snapshot, save_index};

pub fn export(output: &str) -> Result<()> {
    println!("{} Loading communities...", "→".blue());
    let stored = load_snapshot()?;
    let meta = stored.metadata();
    let index = stored.into_index();

    let json = snapshot::encode(&index, &meta.namespace)?;
    let output_path = Path::new(output);
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!("{} Exported to {}", "✓".green().bold(), output_path.display());
    println!("  Communities: {}", meta.community_count.to_string().cyan());
    println!("  Entities:    {}", meta.entity_count.to_string().cyan());

    Ok(())
}

pub fn import(input: &str) -> Result<()> {
    let input_path = Path::new(input);
    println!("{} Reading {}...", "→".blue(), input_path.display());
    let incoming = read_snapshot(input_path)?;
    let meta = incoming.metadata();
    let index = incoming.into_index();

    let saved = save_index(&index, &meta.namespace)?;

    println!("{} Imported {} communities", "✓".green().bold(), index.len().to_string().cyan());
    println!("  Namespace: {}", meta.namespace.cyan());
    println!("  Saved to:  {}", saved.display().to_string().dimmed());

    Ok(())
}
