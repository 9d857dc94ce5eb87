//! Show community statistics.

use anyhow::Result;
use colored::Colorize;

use super::{load_snapshot, type_label};

pub fn run(json: bool) -> Result<()> {
    let snapshot = load_snapshot()?;
    let meta = snapshot.metadata();
    let index = snapshot.into_index();
    let stats = index.get_stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "Lore Community Statistics".white().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();

    println!("{}", "Snapshot".blue().bold());
    println!("  Namespace:         {}", meta.namespace.cyan());
    println!("  Exported at:       {}", meta.exported_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Entities covered:  {}", meta.entity_count.to_string().cyan());
    println!();

    println!("{}", "Communities".blue().bold());
    println!("  Total:             {}", stats.total_communities.to_string().cyan());
    println!("  Average size:      {:.2}", stats.average_size);
    println!("  Bridge nodes:      {}", stats.bridge_node_count.to_string().green());
    println!();

    println!("{}", "By Type".blue().bold());
    for (community_type, count) in &stats.by_type {
        println!("  {} {}", type_label(*community_type), count.to_string().cyan());
    }
    println!();

    println!("{}", "By Level".blue().bold());
    for (level, count) in &stats.by_level {
        println!("  Level {:<12} {}", level, count.to_string().cyan());
    }

    println!();
    println!("{}", "═".repeat(40).dimmed());

    Ok(())
}
