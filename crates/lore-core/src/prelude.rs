//! Lore Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use lore_core::prelude::*;
//! ```

// Re-export commonly used types
pub use crate::types::{
    attr, kind,
    Community, CommunityId, CommunityType,
    EntityId, EntityNode, GraphInput, RelationEdge,
};

// Re-export the graph builder
pub use crate::graph::{EntityGraph, TypeBoosts};

// Re-export the clusterer
pub use crate::louvain::{
    compute_modularity, louvain_communities, louvain_with_rng,
    DetectedCommunity, LouvainConfig, LouvainResult,
};

// Re-export error types
pub use crate::error::{LoreError, Result};
