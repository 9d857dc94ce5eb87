//! Community detection pipeline.
//!
//! Raw nodes and edges go in, a typed, named and described community list
//! comes out:
//!
//! ```text
//! nodes, edges ─> EntityGraph ─> Louvain ──┐
//!        └──────> HierarchySeeder ─────────┴─> CommunityMerger ─> classify, name
//! ```
//!
//! The run is synchronous and CPU-bound. Hosts with a latency budget should
//! call it off their main thread.

use crate::classifier::{ClassifierRules, CommunityClassifier};
use crate::merger::{CommunityMerger, MergeConfig, DETECTED_NAME};
use crate::seeder::{HierarchySeeder, SeederConfig};
use lore_core::error::{LoreError, Result};
use lore_core::graph::{EntityGraph, TypeBoosts};
use lore_core::louvain::{louvain_communities, LouvainConfig};
use lore_core::types::{Community, EntityId, EntityNode, RelationEdge};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Options for [`detect_communities`].
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Detected clusters smaller than this are dropped.
    pub min_size: usize,
    pub max_level: usize,
    pub resolution: f64,
    /// Seed communities from container nodes.
    pub seed_from_folders: bool,
    /// Shuffle seed for the clusterer; entropy when `None`.
    pub seed: Option<u64>,
    pub boosts: TypeBoosts,
    pub seeding: SeederConfig,
    pub merging: MergeConfig,
    pub classification: ClassifierRules,
}

impl Default for DetectOptions {
    fn default() -> Self {
        let louvain = LouvainConfig::default();
        Self {
            min_size: louvain.min_size,
            max_level: louvain.max_level,
            resolution: louvain.resolution,
            seed_from_folders: true,
            seed: None,
            boosts: TypeBoosts::default(),
            seeding: SeederConfig::default(),
            merging: MergeConfig::default(),
            classification: ClassifierRules::default(),
        }
    }
}

impl DetectOptions {
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_seed_from_folders(mut self, enabled: bool) -> Self {
        self.seed_from_folders = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seeding(mut self, seeding: SeederConfig) -> Self {
        self.seeding = seeding;
        self
    }

    pub fn with_classification(mut self, rules: ClassifierRules) -> Self {
        self.classification = rules;
        self
    }

    pub fn louvain_config(&self) -> LouvainConfig {
        LouvainConfig {
            resolution: self.resolution,
            min_size: self.min_size,
            max_level: self.max_level,
            seed: self.seed,
            ..LouvainConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.louvain_config().validate()?;
        let ratios = [
            ("overlap_threshold", self.merging.overlap_threshold),
            ("family_edge_ratio", self.classification.family_edge_ratio),
            ("profession_ratio", self.classification.profession_ratio),
        ];
        for (field, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(LoreError::invalid_option(field, value, "must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

/// What a detection run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionReport {
    /// Entity nodes in the clustering graph.
    pub entities: usize,
    /// Distinct weighted edges in the clustering graph.
    pub edges: usize,
    pub modularity: f64,
    pub levels: usize,
    pub passes: usize,
    pub seeded: usize,
    pub detected: usize,
    pub expanded: usize,
    pub created: usize,
    /// Communities dropped for having no members.
    pub dropped: usize,
}

/// Communities plus the run report.
#[derive(Debug, Clone)]
pub struct Detection {
    pub communities: Vec<Community>,
    pub report: DetectionReport,
}

/// Detect communities in a graph.
///
/// Empty input yields an empty list. Fails only on invalid options.
pub fn detect_communities(
    nodes: &[EntityNode],
    edges: &[RelationEdge],
    namespace: &str,
    options: &DetectOptions,
) -> Result<Vec<Community>> {
    detect_with_report(nodes, edges, namespace, options).map(|d| d.communities)
}

/// [`detect_communities`] plus a [`DetectionReport`].
pub fn detect_with_report(
    nodes: &[EntityNode],
    edges: &[RelationEdge],
    namespace: &str,
    options: &DetectOptions,
) -> Result<Detection> {
    options.validate()?;

    let graph = EntityGraph::build_with(nodes, edges, &options.boosts);
    let seeds = if options.seed_from_folders {
        HierarchySeeder::with_config(options.seeding.clone()).seed(nodes, namespace)
    } else {
        Vec::new()
    };
    let seeded = seeds.len();

    let louvain = louvain_communities(&graph, &options.louvain_config());
    let detected = louvain.communities.len();
    let outcome =
        CommunityMerger::with_config(options.merging.clone()).merge(seeds, louvain.communities, namespace);

    let classifier =
        CommunityClassifier::new(nodes, edges).with_rules(options.classification.clone());
    let mut communities = Vec::with_capacity(outcome.communities.len());
    let mut dropped = 0;

    for mut community in outcome.communities {
        if community.entity_ids.is_empty() {
            debug!(community = %community.name, "dropping empty community");
            dropped += 1;
            continue;
        }
        if community.leader_id.is_none() {
            community.leader_id = central_member(&graph, &community.entity_ids);
        }
        community.community_type = classifier.classify(&community);
        community.description = classifier.describe(&community);
        if !community.is_seeded() {
            community.name = match community.leader_id.as_deref() {
                Some(leader) => {
                    let leader = classifier.node(leader).map_or(leader, |n| n.display_name());
                    format!("{} {}", leader, community.community_type.noun())
                }
                None => DETECTED_NAME.to_string(),
            };
        }
        communities.push(community);
    }

    communities.sort_by(presentation_order);

    let report = DetectionReport {
        entities: graph.node_count(),
        edges: graph.edge_count(),
        modularity: louvain.modularity,
        levels: louvain.levels,
        passes: louvain.passes,
        seeded,
        detected,
        expanded: outcome.expanded,
        created: outcome.created,
        dropped,
    };
    info!(
        namespace,
        communities = communities.len(),
        seeded,
        detected,
        expanded = report.expanded,
        modularity = report.modularity,
        "community detection finished"
    );

    Ok(Detection {
        communities,
        report,
    })
}

/// Member with the highest weighted degree; the lowest id wins ties.
fn central_member(graph: &EntityGraph, members: &BTreeSet<EntityId>) -> Option<EntityId> {
    let mut best: Option<(&EntityId, f64)> = None;
    for member in members {
        let degree = graph.weighted_degree(member);
        if best.map_or(true, |(_, top)| degree > top) {
            best = Some((member, degree));
        }
    }
    best.map(|(id, _)| id.clone())
}

/// Seeds first, then by level, then larger communities first.
fn presentation_order(a: &Community, b: &Community) -> Ordering {
    b.is_seeded()
        .cmp(&a.is_seeded())
        .then_with(|| a.level.cmp(&b.level))
        .then_with(|| b.size().cmp(&a.size()))
        .then_with(|| a.entity_ids.iter().next().cmp(&b.entity_ids.iter().next()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_core::types::{attr, kind, CommunityType};

    fn character(id: &str) -> EntityNode {
        EntityNode::entity(id, kind::CHARACTER)
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let communities = detect_communities(&[], &[], "story", &DetectOptions::default()).unwrap();
        assert!(communities.is_empty());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let bad = DetectOptions::default().with_resolution(0.0);
        assert!(matches!(
            detect_communities(&[], &[], "story", &bad),
            Err(LoreError::InvalidOption { .. })
        ));
        let bad = DetectOptions::default().with_min_size(0);
        assert!(bad.validate().is_err());
        let mut bad = DetectOptions::default();
        bad.merging.overlap_threshold = 1.5;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn kinship_chain_becomes_named_family() {
        let nodes = vec![
            character("a").with_name("Aria"),
            character("b"),
            character("c"),
            character("d"),
        ];
        let edges = vec![
            RelationEdge::new("a", "b", "CHILD_OF"),
            RelationEdge::new("b", "c", "SIBLING_OF"),
            RelationEdge::new("c", "d", "SPOUSE_OF"),
        ];
        let options = DetectOptions::default().with_seed(3);
        let detection = detect_with_report(&nodes, &edges, "story", &options).unwrap();

        assert_eq!(detection.communities.len(), 1);
        let family = &detection.communities[0];
        assert_eq!(family.size(), 4);
        assert_eq!(family.community_type, CommunityType::Family);
        assert!(family.flag(attr::DETECTED));
        // b and c both have degree 5.0; b sorts first.
        assert_eq!(family.leader_id.as_deref(), Some("b"));
        assert_eq!(family.name, "b family");
        assert_eq!(family.description, "A family containing 4 characters");

        assert_eq!(detection.report.entities, 4);
        assert_eq!(detection.report.edges, 3);
        assert_eq!(detection.report.created, 1);
    }

    #[test]
    fn central_member_prefers_degree_then_id() {
        let nodes: Vec<EntityNode> = ["a", "b", "c"].iter().map(|id| character(id)).collect();
        let edges = vec![
            RelationEdge::new("a", "b", "KNOWS"),
            RelationEdge::new("b", "c", "KNOWS"),
        ];
        let graph = EntityGraph::build(&nodes, &edges);
        let members: BTreeSet<EntityId> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(central_member(&graph, &members).as_deref(), Some("b"));

        let pair: BTreeSet<EntityId> = ["c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(central_member(&graph, &pair).as_deref(), Some("a"));
    }

    #[test]
    fn seeds_come_first() {
        let nodes = vec![
            EntityNode::container("guild", kind::FACTION).with_name("Thieves Guild"),
            character("a").in_container("guild"),
            character("b").in_container("guild"),
            character("c").in_container("guild"),
            character("x"),
            character("y"),
            character("z"),
        ];
        let edges = vec![
            RelationEdge::new("x", "y", "KNOWS"),
            RelationEdge::new("y", "z", "KNOWS"),
            RelationEdge::new("z", "x", "KNOWS"),
        ];
        let communities =
            detect_communities(&nodes, &edges, "story", &DetectOptions::default().with_seed(1)).unwrap();

        assert_eq!(communities.len(), 2);
        assert!(communities[0].is_seeded());
        assert_eq!(communities[0].name, "Thieves Guild");
        assert_eq!(communities[0].community_type, CommunityType::Faction);
        assert!(!communities[1].is_seeded());
        assert!(communities[1].contains("x"));
    }

    #[test]
    fn folder_seeding_can_be_disabled() {
        let nodes = vec![
            EntityNode::container("guild", kind::FACTION),
            character("a").in_container("guild"),
        ];
        let options = DetectOptions::default().with_seed_from_folders(false);
        assert!(detect_communities(&nodes, &[], "story", &options).unwrap().is_empty());
    }
}
