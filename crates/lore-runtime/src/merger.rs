//! Reconcile seeded communities with detected ones.
//!
//! Seeds are authoritative. A detected cluster whose Jaccard overlap with its
//! best-matching seed exceeds the threshold is folded into that seed; any
//! other cluster becomes a community of its own.

use lore_core::louvain::DetectedCommunity;
use lore_core::types::{attr, Community, CommunityId, CommunityType, EntityId};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// Placeholder name for detected communities until the pipeline names them.
pub const DETECTED_NAME: &str = "Detected community";

#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Overlap a detected cluster must strictly exceed to join a seed.
    pub overlap_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.7,
        }
    }
}

impl MergeConfig {
    pub fn with_overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }
}

/// Merged community list plus what happened to the detected clusters.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Seeds first (in input order), then newly created communities.
    pub communities: Vec<Community>,
    /// Detected clusters folded into a seed.
    pub expanded: usize,
    /// Detected clusters that became new communities.
    pub created: usize,
}

/// |a ∩ b| / |a ∪ b|; 0.0 when both are empty.
pub fn jaccard(a: &BTreeSet<EntityId>, b: &BTreeSet<EntityId>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommunityMerger {
    config: MergeConfig,
}

impl CommunityMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Fold `detected` into `seeds`.
    ///
    /// Overlap is always measured against the seeds as they came in, so the
    /// outcome does not depend on the order of the detected clusters.
    pub fn merge(
        &self,
        seeds: Vec<Community>,
        detected: Vec<DetectedCommunity>,
        namespace: &str,
    ) -> MergeOutcome {
        let original: Vec<BTreeSet<EntityId>> =
            seeds.iter().map(|s| s.entity_ids.clone()).collect();
        let position: HashMap<CommunityId, usize> =
            seeds.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let mut communities = seeds;
        let seed_count = communities.len();
        let mut expanded = 0;
        let mut created = 0;

        for cluster in detected {
            let best = original
                .iter()
                .enumerate()
                .map(|(i, members)| (i, jaccard(members, &cluster.members)))
                .fold(None, |best: Option<(usize, f64)>, (i, overlap)| match best {
                    Some((_, top)) if overlap <= top => best,
                    _ => Some((i, overlap)),
                });

            match best {
                Some((i, overlap)) if overlap > self.config.overlap_threshold => {
                    trace!(seed = %communities[i].name, overlap, "detected cluster folded into seed");
                    // An outer seed holds everything its nested seeds hold
                    let mut cursor = Some(i);
                    let mut visited = HashSet::new();
                    while let Some(at) = cursor.filter(|at| visited.insert(*at)) {
                        let seed = &mut communities[at];
                        seed.entity_ids.extend(cluster.members.iter().cloned());
                        seed.set_attribute(attr::EXPANDED_FROM_DETECTION, true);
                        seed.touch();
                        cursor = seed
                            .parent_community_id
                            .and_then(|p| position.get(&p).copied());
                    }
                    expanded += 1;
                }
                _ => {
                    communities.push(from_detection(cluster, namespace));
                    created += 1;
                }
            }
        }

        debug!(seeds = seed_count, expanded, created, "merged detected communities");
        MergeOutcome {
            communities,
            expanded,
            created,
        }
    }
}

/// Fresh, unparented community for a cluster that matched no seed.
fn from_detection(cluster: DetectedCommunity, namespace: &str) -> Community {
    let mut community = Community::new(DETECTED_NAME, namespace, CommunityType::Custom)
        .with_level(cluster.level)
        .with_members(cluster.members);
    community.id = cluster.id;
    community.set_attribute(attr::DETECTED, true);
    community.set_attribute(attr::DETECTION_LEVEL, cluster.level);
    community
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<EntityId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn detected(seed: u64, level: u32, ids: &[&str]) -> DetectedCommunity {
        DetectedCommunity {
            id: CommunityId::from_seed(seed),
            level,
            members: set(ids),
        }
    }

    fn seed(name: &str, ids: &[&str]) -> Community {
        let mut c = Community::new(name, "story", CommunityType::Faction).with_members(ids.iter().copied());
        c.backing_node_id = Some(name.to_lowercase());
        c
    }

    #[test]
    fn jaccard_values() {
        assert_eq!(jaccard(&set(&["a", "b", "c"]), &set(&["a", "b", "c", "d"])), 0.75);
        assert_eq!(jaccard(&set(&["a"]), &set(&["b"])), 0.0);
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn high_overlap_expands_seed() {
        let outcome = CommunityMerger::new().merge(
            vec![seed("Guild", &["a", "b", "c", "d"])],
            vec![detected(1, 0, &["a", "b", "c"])],
            "story",
        );
        assert_eq!(outcome.communities.len(), 1);
        assert_eq!(outcome.expanded, 1);
        assert_eq!(outcome.created, 0);
        let guild = &outcome.communities[0];
        assert_eq!(guild.size(), 4);
        assert!(guild.flag(attr::EXPANDED_FROM_DETECTION));
    }

    #[test]
    fn expansion_adds_new_members() {
        // 4 shared of 5 total: 0.8
        let outcome = CommunityMerger::new().merge(
            vec![seed("Guild", &["a", "b", "c", "d"])],
            vec![detected(1, 1, &["a", "b", "c", "d", "e"])],
            "story",
        );
        assert_eq!(outcome.communities[0].size(), 5);
        assert!(outcome.communities[0].contains("e"));
    }

    #[test]
    fn expanding_a_nested_seed_grows_its_ancestors() {
        let empire = seed("Empire", &["emperor", "l1", "l2", "l3"]);
        let mut legion = seed("Legion", &["l1", "l2", "l3"]);
        legion.parent_community_id = Some(empire.id);
        legion.level = 1;

        // 3 of 4 with the legion (0.75), 3 of 5 with the empire (0.6)
        let outcome = CommunityMerger::new().merge(
            vec![empire, legion],
            vec![detected(1, 0, &["l1", "l2", "l3", "recruit"])],
            "story",
        );
        assert_eq!(outcome.expanded, 1);
        assert_eq!(outcome.communities.len(), 2);
        let (empire, legion) = (&outcome.communities[0], &outcome.communities[1]);
        assert!(legion.contains("recruit"));
        assert!(empire.contains("recruit"));
        assert!(empire.entity_ids.is_superset(&legion.entity_ids));
    }

    #[test]
    fn threshold_is_strict() {
        // 7 shared of 10 total: exactly 0.7
        let seed_members = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let outcome = CommunityMerger::new().merge(
            vec![seed("Guild", &seed_members)],
            vec![detected(1, 0, &seed_members[..7])],
            "story",
        );
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.communities.len(), 2);
    }

    #[test]
    fn unmatched_cluster_becomes_detected_community() {
        let outcome = CommunityMerger::new().merge(
            Vec::new(),
            vec![detected(9, 2, &["x", "y", "z"])],
            "story",
        );
        assert_eq!(outcome.created, 1);
        let c = &outcome.communities[0];
        assert_eq!(c.id, CommunityId::from_seed(9));
        assert_eq!(c.level, 2);
        assert_eq!(c.community_type, CommunityType::Custom);
        assert!(c.parent_community_id.is_none());
        assert!(c.backing_node_id.is_none());
        assert!(c.flag(attr::DETECTED));
        assert_eq!(c.attributes.get(attr::DETECTION_LEVEL), Some(&serde_json::json!(2)));
    }

    #[test]
    fn first_seed_wins_ties() {
        let outcome = CommunityMerger::new().merge(
            vec![
                seed("First", &["a", "b", "c", "d"]),
                seed("Second", &["a", "b", "c", "e"]),
            ],
            vec![detected(1, 0, &["a", "b", "c"])],
            "story",
        );
        assert!(outcome.communities[0].flag(attr::EXPANDED_FROM_DETECTION));
        assert!(!outcome.communities[1].flag(attr::EXPANDED_FROM_DETECTION));
    }

    #[test]
    fn no_member_is_lost() {
        let seeds = vec![seed("Guild", &["a", "b", "c", "d"])];
        let clusters = vec![
            detected(1, 0, &["a", "b", "c"]),
            detected(2, 0, &["x", "y", "z"]),
            detected(3, 1, &["a", "b", "c", "d", "x", "y", "z"]),
        ];
        let mut expected: BTreeSet<EntityId> = set(&["a", "b", "c", "d"]);
        for c in &clusters {
            expected.extend(c.members.iter().cloned());
        }

        let outcome = CommunityMerger::new().merge(seeds, clusters, "story");
        let merged: BTreeSet<EntityId> = outcome
            .communities
            .iter()
            .flat_map(|c| c.entity_ids.iter().cloned())
            .collect();
        assert!(merged.is_superset(&expected));
    }
}
