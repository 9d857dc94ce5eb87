//! # Lore
//!
//! Hierarchical community detection over narrative knowledge graphs.
//!
//! Lore takes the entities and typed relationships extracted from a body of
//! text (characters, locations, factions, items...) and groups them into
//! nested, possibly overlapping communities: factions, families, location
//! groups and professional guilds.
//!
//! ## Quick Start
//!
//! ```rust
//! use lore::prelude::*;
//!
//! let nodes: Vec<EntityNode> = ["a", "b", "c", "d"]
//!     .iter()
//!     .map(|id| EntityNode::entity(*id, kind::CHARACTER))
//!     .collect();
//! let edges = vec![
//!     RelationEdge::new("a", "b", "CHILD_OF"),
//!     RelationEdge::new("b", "c", "SIBLING_OF"),
//!     RelationEdge::new("c", "d", "SPOUSE_OF"),
//! ];
//!
//! let options = DetectOptions::default().with_seed(7);
//! let communities = detect_communities(&nodes, &edges, "my-story", &options).unwrap();
//!
//! let index = CommunityIndex::from_communities(communities);
//! for community in index.get_all_communities() {
//!     println!("{} ({}): {}", community.name, community.community_type, community.description);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`lore_core`] - Data model, weighted entity graph and the Louvain clusterer
//! - [`lore_runtime`] - Folder seeding, merging, classification, the community index
//!   and snapshots
//!
//! ## Pipeline
//!
//! | Stage | What It Does |
//! |-------|--------------|
//! | Graph | Entity-only weighted graph, relation-type boosts, confidence scaling |
//! | Seed | One community per faction container, nested into a hierarchy |
//! | Cluster | Multi-level Louvain modularity optimization |
//! | Merge | Fold detected clusters into seeds they overlap (Jaccard > 0.7) |
//! | Classify | FAMILY, FACTION, LOCATION_GROUP, PROFESSION or CUSTOM |
//! | Index | By-id, by-entity and by-level lookups, bridges, hierarchy, stats |
//!
//! ## Persistence
//!
//! The core performs no I/O. Hosts persist the index through a snapshot string:
//!
//! ```rust
//! use lore::prelude::*;
//! use lore::runtime::snapshot;
//!
//! let mut index = CommunityIndex::new();
//! index.create_community("Thieves Guild", "my-story", CommunityType::Faction, ["a", "b", "c"]);
//!
//! let json = snapshot::encode(&index, "my-story").unwrap();
//! let restored = snapshot::decode(&json).unwrap().into_index();
//! assert_eq!(restored.len(), 1);
//! ```

// Re-export all subcrates
pub use lore_core as core;
pub use lore_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use lore::prelude::*;
/// ```
pub mod prelude {
    pub use lore_runtime::prelude::*;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
