//! # Lore Runtime
//!
//! Everything between the clusterer and the host: seeding communities from
//! the containment tree, merging them with detected clusters, typing and
//! describing the result, and serving it from a queryable index.
//!
//! ```rust
//! use lore_runtime::prelude::*;
//!
//! let nodes = vec![
//!     EntityNode::container("guild", kind::FACTION).with_name("Thieves Guild"),
//!     EntityNode::entity("a", kind::CHARACTER).in_container("guild"),
//!     EntityNode::entity("b", kind::CHARACTER).in_container("guild"),
//!     EntityNode::entity("c", kind::CHARACTER).in_container("guild"),
//! ];
//!
//! let communities = detect_communities(&nodes, &[], "story", &DetectOptions::default()).unwrap();
//! let index = CommunityIndex::from_communities(communities);
//! assert_eq!(index.get_node_communities("a")[0].name, "Thieves Guild");
//! ```

pub mod classifier;
pub mod community;
pub mod index;
pub mod merger;
pub mod prelude;
pub mod seeder;
pub mod snapshot;
