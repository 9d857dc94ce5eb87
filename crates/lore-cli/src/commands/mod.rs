//! CLI command implementations.

pub mod detect;
pub mod explore;
pub mod export;
pub mod init;
pub mod stats;

use anyhow::{bail, Context, Result};
use colored::{ColoredString, Colorize};
use lore::prelude::*;
use lore::runtime::snapshot;
use std::path::{Path, PathBuf};

use crate::config::{communities_path, data_dir};

/// Read a `{"nodes": [...], "edges": [...]}` graph file.
pub fn read_graph(path: &Path) -> Result<GraphInput> {
    if !path.exists() {
        bail!("Graph file does not exist: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse graph: {}", path.display()))
}

/// Load the stored community snapshot.
pub fn load_snapshot() -> Result<IndexSnapshot> {
    let path = communities_path()?;
    if !path.exists() {
        bail!("No communities found. Run {} first.", "lore detect".cyan());
    }
    read_snapshot(&path)
}

pub fn read_snapshot(path: &Path) -> Result<IndexSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    snapshot::decode(&json).with_context(|| format!("Invalid snapshot: {}", path.display()))
}

/// Write the index to `.lore/communities.json`.
pub fn save_index(index: &CommunityIndex, namespace: &str) -> Result<PathBuf> {
    let data = data_dir()?;
    if !data.exists() {
        std::fs::create_dir_all(&data)
            .with_context(|| format!("Failed to create {}", data.display()))?;
    }
    let path = communities_path()?;
    std::fs::write(&path, snapshot::encode(index, namespace)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Community type, colored for tables.
pub fn type_label(community_type: CommunityType) -> ColoredString {
    let label = format!("{:<14}", community_type.as_str());
    match community_type {
        CommunityType::Faction => label.red(),
        CommunityType::Family => label.green(),
        CommunityType::LocationGroup => label.blue(),
        CommunityType::Profession => label.yellow(),
        CommunityType::Custom => label.dimmed(),
    }
}
