//! Snapshot codec: the community index as versioned JSON.
//!
//! The payload is the index export wrapped in a small envelope so a host can
//! persist it anywhere and detect snapshots written by an incompatible
//! version. Reading and writing the bytes is the host's job.

use crate::index::CommunityIndex;
use chrono::{DateTime, Utc};
use lore_core::error::{LoreError, Result};
use lore_core::types::Community;
use serde::{Deserialize, Serialize};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable snapshot of a community index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    /// Label of the graph the communities were detected on.
    pub namespace: String,
    pub exported_at: DateTime<Utc>,
    pub communities: Vec<Community>,
}

/// Summary of a snapshot, for listing without rebuilding an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMetadata {
    pub namespace: String,
    pub exported_at: DateTime<Utc>,
    pub community_count: usize,
    pub entity_count: usize,
}

impl IndexSnapshot {
    pub fn capture(index: &CommunityIndex, namespace: &str) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            namespace: namespace.to_string(),
            exported_at: Utc::now(),
            communities: index.export(),
        }
    }

    pub fn metadata(&self) -> SnapshotMetadata {
        let entities: std::collections::BTreeSet<&str> = self
            .communities
            .iter()
            .flat_map(|c| c.entity_ids.iter().map(String::as_str))
            .collect();
        SnapshotMetadata {
            namespace: self.namespace.clone(),
            exported_at: self.exported_at,
            community_count: self.communities.len(),
            entity_count: entities.len(),
        }
    }

    /// Rebuild an index from the snapshot.
    pub fn into_index(self) -> CommunityIndex {
        CommunityIndex::from_communities(self.communities)
    }
}

/// Encode the index as pretty-printed JSON.
pub fn encode(index: &CommunityIndex, namespace: &str) -> Result<String> {
    Ok(serde_json::to_string_pretty(&IndexSnapshot::capture(index, namespace))?)
}

/// Decode and version-check a snapshot.
pub fn decode(json: &str) -> Result<IndexSnapshot> {
    let snapshot: IndexSnapshot = serde_json::from_str(json)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(LoreError::SnapshotVersion {
            expected: SNAPSHOT_VERSION,
            found: snapshot.version,
        });
    }
    Ok(snapshot)
}
