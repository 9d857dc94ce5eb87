//! # Lore Core
//!
//! Core types and algorithms for hierarchical community detection over
//! narrative knowledge graphs.
//!
//! The crate is intentionally free of I/O. It provides:
//!
//! - **Types** - entity nodes, typed relationship edges, and the `Community` record
//! - **Graph** - the weighted, undirected entity graph built from raw input
//! - **Louvain** - seeded multi-level modularity optimization with coarsening
//! - **Error** - the shared `LoreError` type
//!
//! ## Quick Start
//!
//! ```rust
//! use lore_core::prelude::*;
//!
//! let nodes = vec![
//!     EntityNode::entity("aria", kind::CHARACTER),
//!     EntityNode::entity("bram", kind::CHARACTER),
//! ];
//! let edges = vec![RelationEdge::new("aria", "bram", "SIBLING_OF")];
//!
//! let graph = EntityGraph::build(&nodes, &edges);
//! assert_eq!(graph.node_count(), 2);
//! assert!(graph.weight_between("aria", "bram") > 0.0);
//! ```

pub mod types;
pub mod graph;
pub mod louvain;
pub mod error;
pub mod prelude;
