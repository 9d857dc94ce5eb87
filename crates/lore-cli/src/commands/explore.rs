//! Explore the stored communities.

use anyhow::{bail, Result};
use colored::Colorize;
use lore::prelude::*;
use std::path::Path;

use super::{load_snapshot, read_graph, type_label};

fn load_index() -> Result<CommunityIndex> {
    Ok(load_snapshot()?.into_index())
}

/// Community name for display, falling back to the id.
fn name_of(index: &CommunityIndex, id: &CommunityId) -> String {
    index
        .get_community(id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.to_string())
}

pub fn bridges(top: usize) -> Result<()> {
    let index = load_index()?;
    let bridges = index.get_bridge_nodes_detailed();

    println!(
        "{} Top {} bridge entities (of {}):",
        "→".blue(),
        top.min(bridges.len()).to_string().cyan(),
        bridges.len()
    );
    println!();

    for (i, bridge) in bridges.iter().take(top).enumerate() {
        let rank = format!("{}.", i + 1);
        println!(
            "  {} {} {}",
            rank.blue(),
            bridge.entity_id.white().bold(),
            format!("({} communities)", bridge.communities.len()).dimmed()
        );
        for community in &bridge.communities {
            println!(
                "      {} {} {}",
                type_label(community.community_type),
                community.name,
                format!("L{}", community.level).dimmed()
            );
        }
    }

    Ok(())
}

pub fn entity(entity_id: &str) -> Result<()> {
    let index = load_index()?;
    let communities = index.get_node_communities(entity_id);
    if communities.is_empty() {
        println!("{} {} belongs to no community", "•".yellow(), entity_id.white().bold());
        return Ok(());
    }

    let primary = index.get_primary_community(entity_id).map(|c| c.id);
    println!(
        "{} {} belongs to {} communities:",
        "→".blue(),
        entity_id.white().bold(),
        communities.len().to_string().cyan()
    );
    println!();
    for community in communities {
        let marker = if Some(community.id) == primary { "primary" } else { "" };
        println!(
            "  {} {} {} {}",
            type_label(community.community_type),
            community.name.white().bold(),
            format!("L{} · {} members", community.level, community.size()).dimmed(),
            marker.green()
        );
    }

    Ok(())
}

pub fn hierarchy(community: &str) -> Result<()> {
    let index = load_index()?;
    let id = match community.parse::<CommunityId>() {
        Ok(id) => id,
        Err(_) => {
            let matches: Vec<&Community> = index
                .get_all_communities()
                .into_iter()
                .filter(|c| c.name == community)
                .collect();
            match matches.as_slice() {
                [single] => single.id,
                [] => bail!("No community named {}", community.cyan()),
                _ => bail!("{} communities are named {}; use an id", matches.len(), community.cyan()),
            }
        }
    };

    let chain = index.get_community_hierarchy(&id);
    if chain.is_empty() {
        bail!("Community not found: {}", id);
    }

    println!("{} Hierarchy:", "→".blue());
    println!();
    for (depth, c) in chain.iter().enumerate() {
        println!(
            "  {}{} {} {}",
            "  ".repeat(depth),
            if depth == 0 { "•" } else { "└─" },
            c.name.white().bold(),
            format!("[{}] {}", c.community_type, c.id).dimmed()
        );
    }

    let children = index.get_children(&id);
    if !children.is_empty() {
        println!();
        println!("  Children:");
        for child in children {
            println!("    {} {}", "-".dimmed(), child.name);
        }
    }

    Ok(())
}

pub fn relations(graph: &str, top: usize) -> Result<()> {
    let index = load_index()?;
    let input = read_graph(Path::new(graph))?;
    let relationships = index.get_community_relationships(&input.edges);

    println!(
        "{} Top {} community relationships:",
        "→".blue(),
        top.min(relationships.len()).to_string().cyan()
    );
    println!();

    for (i, rel) in relationships.iter().take(top).enumerate() {
        let rank = format!("{}.", i + 1);
        let types: Vec<&str> = rel.relation_types.iter().map(String::as_str).collect();
        println!(
            "  {} {} {} {}",
            rank.blue(),
            name_of(&index, &rel.community_a).white().bold(),
            "↔".dimmed(),
            name_of(&index, &rel.community_b).white().bold()
        );
        println!(
            "      {} edges, weight {:.2}: {}",
            rel.edge_count.to_string().cyan(),
            rel.total_weight,
            types.join(", ").dimmed()
        );
    }

    Ok(())
}
