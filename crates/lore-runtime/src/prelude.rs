//! Lore Runtime Prelude: convenient imports for common usage.
//!
//! ```rust
//! use lore_runtime::prelude::*;
//! ```

// Re-export the pipeline
pub use crate::community::{
    detect_communities, detect_with_report, DetectOptions, Detection, DetectionReport,
};

// Re-export pipeline stages
pub use crate::classifier::{
    classify_community, describe_community, ClassifierRules, CommunityClassifier,
};
pub use crate::merger::{jaccard, CommunityMerger, MergeConfig, MergeOutcome};
pub use crate::seeder::{HierarchySeeder, SeederConfig};

// Re-export the index
pub use crate::index::{
    BridgeNode, CommunityIndex, CommunityRelationship, CommunityStats, CommunitySummary,
    CommunityUpdate,
};

// Re-export snapshots
pub use crate::snapshot::{IndexSnapshot, SnapshotMetadata, SNAPSHOT_VERSION};

// Re-export from core
pub use lore_core::prelude::*;
