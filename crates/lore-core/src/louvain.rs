//! Louvain community detection over the entity graph.
//!
//! A greedy, multi-level modularity optimization:
//!
//! 1. **Local Moving**: visit nodes in a shuffled order and move each one to the
//!    neighbouring community with the best modularity gain
//! 2. **Aggregation**: collapse every community into a super-node (internal
//!    weight becomes a self-loop) and repeat on the coarser graph
//!
//! Every level's partition is mapped back to the original entities and
//! reported, so the result holds nested communities across levels
//! (level 0 = finest). A group is reported at the first level it appears.
//!
//! Weights follow the adjacency-map convention: each undirected edge shows up
//! in both directions, the total graph weight is the sum of all adjacency
//! entries and `m2` is twice that total.
//!
//! Reference: Blondel et al. (2008) "Fast unfolding of communities in large networks"

use crate::error::{LoreError, Result};
use crate::graph::EntityGraph;
use crate::types::{CommunityId, EntityId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, trace};

/// Minimum gain improvement for a move to count.
const GAIN_EPSILON: f64 = 1e-10;

/// Louvain configuration.
#[derive(Debug, Clone)]
pub struct LouvainConfig {
    /// Resolution parameter (higher = more, smaller communities).
    pub resolution: f64,
    /// Communities smaller than this are discarded.
    pub min_size: usize,
    /// Maximum number of coarsening levels.
    pub max_level: usize,
    /// Maximum local-moving passes per level.
    pub max_passes: usize,
    /// Shuffle seed for reproducibility; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            min_size: 3,
            max_level: 5,
            max_passes: 100,
            seed: None,
        }
    }
}

impl LouvainConfig {
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(LoreError::invalid_option(
                "resolution",
                self.resolution,
                "must be a positive number",
            ));
        }
        if self.min_size == 0 {
            return Err(LoreError::invalid_option("min_size", 0, "must be at least 1"));
        }
        if self.max_level == 0 {
            return Err(LoreError::invalid_option("max_level", 0, "must be at least 1"));
        }
        if self.max_passes == 0 {
            return Err(LoreError::invalid_option("max_passes", 0, "must be at least 1"));
        }
        Ok(())
    }
}

/// A community found by the clusterer, before any seeding or classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedCommunity {
    pub id: CommunityId,
    /// Detection level (0 = first pass, finest).
    pub level: u32,
    pub members: BTreeSet<EntityId>,
}

/// Result of Louvain community detection.
#[derive(Debug, Clone)]
pub struct LouvainResult {
    /// Communities of at least `min_size` members, across all levels.
    pub communities: Vec<DetectedCommunity>,
    /// Modularity of the coarsest extracted partition.
    pub modularity: f64,
    /// Number of levels run.
    pub levels: usize,
    /// Local-moving passes summed over all levels.
    pub passes: usize,
}

impl LouvainResult {
    fn empty() -> Self {
        Self {
            communities: Vec::new(),
            modularity: 0.0,
            levels: 0,
            passes: 0,
        }
    }

    /// Communities detected at one level.
    pub fn at_level(&self, level: u32) -> impl Iterator<Item = &DetectedCommunity> + '_ {
        self.communities.iter().filter(move |c| c.level == level)
    }
}

/// Graph representation optimized for Louvain.
#[derive(Debug, Clone)]
struct LouvainGraph {
    /// Adjacency list without self entries: node_idx -> [(neighbor_idx, weight)].
    adj: Vec<Vec<(usize, f64)>>,
    /// Self-loop weight (internal weight of aggregated nodes).
    self_loop: Vec<f64>,
    /// Weighted degree: self-loop plus incident weights.
    degree: Vec<f64>,
    /// Sum of all adjacency entries (both directions) and self-loops.
    total_weight: f64,
}

impl LouvainGraph {
    /// Create from undirected edges listed once each.
    fn from_edges(node_count: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];
        let mut self_loop = vec![0.0; node_count];

        for &(from, to, weight) in edges {
            if from == to {
                self_loop[from] += weight;
            } else {
                adj[from].push((to, weight));
                adj[to].push((from, weight));
            }
        }

        Self::with_links(adj, self_loop)
    }

    fn with_links(adj: Vec<Vec<(usize, f64)>>, self_loop: Vec<f64>) -> Self {
        let degree: Vec<f64> = adj
            .iter()
            .zip(&self_loop)
            .map(|(links, own)| own + links.iter().map(|(_, w)| w).sum::<f64>())
            .collect();
        let total_weight = degree.iter().sum();

        Self {
            adj,
            self_loop,
            degree,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    /// Modularity of a partition (community index per node).
    fn modularity(&self, partition: &[usize], resolution: f64) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }

        let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
        let mut total: BTreeMap<usize, f64> = BTreeMap::new();

        for (i, links) in self.adj.iter().enumerate() {
            let ci = partition[i];
            *total.entry(ci).or_insert(0.0) += self.degree[i];
            *internal.entry(ci).or_insert(0.0) += self.self_loop[i];
            for &(j, weight) in links {
                if partition[j] == ci {
                    *internal.entry(ci).or_insert(0.0) += weight;
                }
            }
        }

        // Q = Σc [ in_c / 2m - γ (tot_c / 2m)^2 ]
        let m2 = self.total_weight;
        total
            .iter()
            .map(|(c, tot)| {
                let inside = internal.get(c).copied().unwrap_or(0.0);
                inside / m2 - resolution * (tot / m2).powi(2)
            })
            .sum()
    }

    /// Phase 1: local moving. Returns the community label of each node and
    /// the number of passes run.
    fn local_moving<R: Rng + ?Sized>(
        &self,
        resolution: f64,
        max_passes: usize,
        rng: &mut R,
    ) -> (Vec<usize>, usize) {
        let n = self.len();
        let mut community: Vec<usize> = (0..n).collect();

        if self.total_weight <= 0.0 {
            return (community, 0);
        }

        let m2 = 2.0 * self.total_weight;
        let mut sum_in: Vec<f64> = self.self_loop.clone();
        let mut sum_tot: Vec<f64> = self.degree.clone();
        let mut order: Vec<usize> = (0..n).collect();
        let mut passes = 0;

        while passes < max_passes {
            passes += 1;
            order.shuffle(rng);
            let mut moves = 0;

            for &node in &order {
                let current = community[node];
                let node_degree = self.degree[node];

                // Weight shared with each neighbouring community
                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for &(j, weight) in &self.adj[node] {
                    *links.entry(community[j]).or_insert(0.0) += weight;
                }
                let weight_to_current = links.get(&current).copied().unwrap_or(0.0);

                // Take the node out; its own community becomes the baseline
                sum_tot[current] -= node_degree;
                sum_in[current] -= 2.0 * weight_to_current + self.self_loop[node];

                let mut best = current;
                let mut best_gain = modularity_gain(
                    sum_in[current],
                    sum_tot[current],
                    node_degree,
                    weight_to_current,
                    m2,
                    resolution,
                );

                for (&candidate, &weight) in &links {
                    if candidate == current {
                        continue;
                    }
                    let gain = modularity_gain(
                        sum_in[candidate],
                        sum_tot[candidate],
                        node_degree,
                        weight,
                        m2,
                        resolution,
                    );
                    if gain > best_gain + GAIN_EPSILON {
                        best_gain = gain;
                        best = candidate;
                    }
                }

                if best != current && best_gain <= GAIN_EPSILON {
                    best = current;
                }

                let weight_to_best = links.get(&best).copied().unwrap_or(0.0);
                sum_tot[best] += node_degree;
                sum_in[best] += 2.0 * weight_to_best + self.self_loop[node];

                if best != current {
                    community[node] = best;
                    moves += 1;
                }
            }

            trace!(pass = passes, moves, "local moving pass");
            if moves == 0 {
                break;
            }
        }

        (community, passes)
    }

    /// Phase 2: collapse each community into a super-node.
    fn aggregate(&self, partition: &[usize], community_count: usize) -> Self {
        let mut self_loop = vec![0.0; community_count];
        let mut links: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); community_count];

        for (i, neighbors) in self.adj.iter().enumerate() {
            let ci = partition[i];
            self_loop[ci] += self.self_loop[i];
            for &(j, weight) in neighbors {
                let cj = partition[j];
                if ci == cj {
                    self_loop[ci] += weight;
                } else {
                    *links[ci].entry(cj).or_insert(0.0) += weight;
                }
            }
        }

        let adj = links
            .into_iter()
            .map(|row| row.into_iter().collect())
            .collect();
        Self::with_links(adj, self_loop)
    }
}

/// Modularity gain of moving a node into a community.
///
/// `sum_in`/`sum_tot` describe the target community without the node;
/// `weight_to` is the weight between the node and that community.
fn modularity_gain(
    sum_in: f64,
    sum_tot: f64,
    node_degree: f64,
    weight_to: f64,
    m2: f64,
    resolution: f64,
) -> f64 {
    let after = (sum_in + 2.0 * weight_to) / m2 - resolution * ((sum_tot + node_degree) / m2).powi(2);
    let before = sum_in / m2
        - resolution * (sum_tot / m2).powi(2)
        - resolution * (node_degree / m2).powi(2);
    after - before
}

/// Renumber community labels contiguously, in order of first appearance.
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    let mut next_id = 0;

    let renumbered = labels
        .iter()
        .map(|&label| {
            *mapping.entry(label).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            })
        })
        .collect();

    (renumbered, next_id)
}

/// Run Louvain on the entity graph, seeding the shuffle from the config.
pub fn louvain_communities(graph: &EntityGraph, config: &LouvainConfig) -> LouvainResult {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    louvain_with_rng(graph, config, &mut rng)
}

/// Run Louvain with an injected random source for the visitation order.
pub fn louvain_with_rng<R: Rng + ?Sized>(
    graph: &EntityGraph,
    config: &LouvainConfig,
    rng: &mut R,
) -> LouvainResult {
    let ids: Vec<EntityId> = graph.node_ids().map(str::to_string).collect();
    if ids.is_empty() {
        return LouvainResult::empty();
    }

    let base = LouvainGraph::from_edges(ids.len(), &graph.indexed_edges());
    let mut level_graph = base.clone();

    // Original node -> super-node of the current level
    let mut node_map: Vec<usize> = (0..ids.len()).collect();
    let mut extracted: Vec<usize> = node_map.clone();
    let mut seen: HashSet<BTreeSet<EntityId>> = HashSet::new();
    let mut result = LouvainResult::empty();

    for level in 0..config.max_level {
        let (labels, passes) = level_graph.local_moving(config.resolution, config.max_passes, rng);
        result.passes += passes;
        result.levels += 1;

        let (partition, count) = renumber(&labels);
        let merged = count < level_graph.len();
        let original: Vec<usize> = node_map.iter().map(|&s| partition[s]).collect();

        // A later level that merged nothing repeats the previous partition
        if merged || level == 0 {
            let mut groups: Vec<BTreeSet<EntityId>> = vec![BTreeSet::new(); count];
            for (orig, &c) in original.iter().enumerate() {
                groups[c].insert(ids[orig].clone());
            }

            for members in groups {
                if members.len() < config.min_size {
                    trace!(level, size = members.len(), "community below min size dropped");
                    continue;
                }
                // Super-nodes left alone by this level were reported already
                if !seen.insert(members.clone()) {
                    continue;
                }
                result.communities.push(DetectedCommunity {
                    id: CommunityId::new(),
                    level: level as u32,
                    members,
                });
            }
            extracted = original.clone();
        }

        debug!(
            level,
            nodes = level_graph.len(),
            communities = count,
            passes,
            "louvain level complete"
        );

        if !merged || count == 1 {
            break;
        }

        level_graph = level_graph.aggregate(&partition, count);
        node_map = original;
    }

    result.modularity = base.modularity(&extracted, config.resolution);
    result
}

/// Compute modularity of a given partition.
///
/// # Arguments
/// * `node_count` - Number of nodes
/// * `edges` - Undirected edges as (from_idx, to_idx, weight), each listed once
/// * `partition` - Community assignment for each node (indexed by node index)
/// * `resolution` - Resolution parameter (1.0 for classic modularity)
pub fn compute_modularity(
    node_count: usize,
    edges: &[(usize, usize, f64)],
    partition: &[usize],
    resolution: f64,
) -> f64 {
    if node_count == 0 || edges.is_empty() || partition.len() < node_count {
        return 0.0;
    }
    LouvainGraph::from_edges(node_count, edges).modularity(partition, resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{kind, EntityNode, RelationEdge};
    use std::collections::HashMap;

    fn graph_of(ids: &[&str], edges: &[(&str, &str, f64)]) -> EntityGraph {
        let nodes: Vec<EntityNode> = ids
            .iter()
            .map(|id| EntityNode::entity(*id, kind::CHARACTER))
            .collect();
        let edges: Vec<RelationEdge> = edges
            .iter()
            .map(|(a, b, w)| RelationEdge::new(*a, *b, "KNOWS").with_weight(*w))
            .collect();
        EntityGraph::build(&nodes, &edges)
    }

    fn config(min_size: usize) -> LouvainConfig {
        LouvainConfig::default().with_min_size(min_size).with_seed(42)
    }

    fn sorted_groups(result: &LouvainResult, level: u32) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = result
            .at_level(level)
            .map(|c| c.members.iter().cloned().collect())
            .collect();
        groups.sort();
        groups
    }

    #[test]
    fn empty_graph() {
        let result = louvain_communities(&EntityGraph::new(), &config(1));
        assert!(result.communities.is_empty());
        assert_eq!(result.modularity, 0.0);
        assert_eq!(result.levels, 0);
    }

    #[test]
    fn isolated_nodes_stay_apart() {
        let graph = graph_of(&["a", "b"], &[]);
        let result = louvain_communities(&graph, &config(1));
        // Each node in its own community, reported once
        assert_eq!(result.communities.len(), 2);
        assert!(result.communities.iter().all(|c| c.level == 0 && c.members.len() == 1));
    }

    #[test]
    fn two_connected_nodes() {
        let graph = graph_of(&["a", "b"], &[("a", "b", 1.0)]);
        let result = louvain_communities(&graph, &config(2));
        assert_eq!(result.communities.len(), 1);
        assert_eq!(result.communities[0].members.len(), 2);
    }

    #[test]
    fn triangle() {
        let graph = graph_of(
            &["a", "b", "c"],
            &[("a", "b", 1.0), ("b", "c", 1.0), ("a", "c", 1.0)],
        );
        let result = louvain_communities(&graph, &config(3));
        assert_eq!(result.communities.len(), 1);
        assert_eq!(result.communities[0].members.len(), 3);
    }

    #[test]
    fn two_triangles_weakly_connected() {
        let graph = graph_of(
            &["a", "b", "c", "x", "y", "z"],
            &[
                // Triangle 1
                ("a", "b", 1.0),
                ("b", "c", 1.0),
                ("a", "c", 1.0),
                // Triangle 2
                ("x", "y", 1.0),
                ("y", "z", 1.0),
                ("x", "z", 1.0),
                // Weak bridge
                ("c", "x", 0.1),
            ],
        );
        let result = louvain_communities(&graph, &config(3));

        assert_eq!(
            sorted_groups(&result, 0),
            vec![vec!["a", "b", "c"], vec!["x", "y", "z"]]
        );
        assert_eq!(result.communities.len(), 2);
        assert!(result.modularity > 0.0, "modularity = {}", result.modularity);
    }

    #[test]
    fn karate_club_style() {
        // Two complete groups of four with one sparse link between them
        let ids = ["a0", "a1", "a2", "a3", "b0", "b1", "b2", "b3"];
        let mut edges = Vec::new();
        for group in [&ids[..4], &ids[4..]] {
            for i in 0..group.len() {
                for j in (i + 1)..group.len() {
                    edges.push((group[i], group[j], 1.0));
                }
            }
        }
        edges.push(("a3", "b0", 0.2));

        let graph = graph_of(&ids, &edges);
        let result = louvain_communities(&graph, &config(3));

        assert_eq!(result.communities.len(), 2, "found {:?}", result.communities);
        assert!(
            result.modularity > 0.3,
            "modularity {} should be > 0.3",
            result.modularity
        );
    }

    #[test]
    fn weighted_edges() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b", 5.0), ("c", "d", 5.0), ("b", "c", 0.1)],
        );
        let result = louvain_communities(&graph, &config(2));

        let membership: HashMap<&str, CommunityId> = result
            .communities
            .iter()
            .flat_map(|c| c.members.iter().map(move |m| (m.as_str(), c.id)))
            .collect();
        assert_eq!(result.communities.len(), 2);
        assert_eq!(membership["a"], membership["b"], "a and b should be together");
        assert_eq!(membership["c"], membership["d"], "c and d should be together");
    }

    #[test]
    fn chain_collapses_on_second_level() {
        // Four equal links in a path: pairs first, then the whole chain
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b", 2.5), ("b", "c", 2.5), ("c", "d", 2.5)],
        );
        let result = louvain_communities(&graph, &config(3));

        assert_eq!(result.communities.len(), 1);
        let community = &result.communities[0];
        assert_eq!(community.level, 1);
        assert_eq!(community.members.len(), 4);
    }

    #[test]
    fn unchanged_groups_are_not_reported_twice() {
        // The chain merges on level 1; the triangle is already whole on level 0
        let graph = graph_of(
            &["a", "b", "c", "p", "q", "r", "s"],
            &[
                ("a", "b", 1.0),
                ("b", "c", 1.0),
                ("a", "c", 1.0),
                ("p", "q", 2.5),
                ("q", "r", 2.5),
                ("r", "s", 2.5),
            ],
        );

        for seed in 0..20 {
            let result = louvain_communities(&graph, &config(3).with_seed(seed));
            assert_eq!(sorted_groups(&result, 0), vec![vec!["a", "b", "c"]]);
            assert_eq!(sorted_groups(&result, 1), vec![vec!["p", "q", "r", "s"]]);
            assert_eq!(result.communities.len(), 2, "seed {}: {:?}", seed, result.communities);
        }
    }

    #[test]
    fn min_size_drops_small_clusters() {
        let graph = graph_of(
            &["a", "b", "c", "d", "e"],
            &[
                ("a", "b", 1.0),
                ("b", "c", 1.0),
                ("a", "c", 1.0),
                ("d", "e", 1.0),
            ],
        );
        let result = louvain_communities(&graph, &config(3));
        assert!(result.communities.iter().all(|c| c.members.len() >= 3));
        assert!(result
            .communities
            .iter()
            .all(|c| !c.members.contains("d") && !c.members.contains("e")));
    }

    #[test]
    fn max_level_one_reports_only_first_pass() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b", 2.5), ("b", "c", 2.5), ("c", "d", 2.5)],
        );
        let result = louvain_communities(&graph, &config(2).with_max_level(1));
        assert_eq!(result.levels, 1);
        assert!(result.communities.iter().all(|c| c.level == 0));
    }

    #[test]
    fn same_seed_same_partition() {
        let ids: Vec<String> = (0..12).map(|i| format!("n{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut edges = Vec::new();
        for i in 0..12 {
            for j in (i + 1)..12 {
                if i / 4 == j / 4 || (i + j) % 5 == 0 {
                    edges.push((id_refs[i], id_refs[j], if i / 4 == j / 4 { 1.0 } else { 0.3 }));
                }
            }
        }
        let graph = graph_of(&id_refs, &edges);

        let first = louvain_communities(&graph, &config(2));
        let second = louvain_communities(&graph, &config(2));
        let members = |r: &LouvainResult| -> Vec<(u32, BTreeSet<EntityId>)> {
            let mut v: Vec<_> = r.communities.iter().map(|c| (c.level, c.members.clone())).collect();
            v.sort();
            v
        };
        assert_eq!(members(&first), members(&second));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(LouvainConfig::default().validate().is_ok());
        assert!(LouvainConfig::default().with_resolution(0.0).validate().is_err());
        assert!(LouvainConfig::default().with_min_size(0).validate().is_err());
        assert!(LouvainConfig::default().with_max_level(0).validate().is_err());
    }

    #[test]
    fn gain_prefers_stronger_links() {
        let weak = modularity_gain(0.0, 4.0, 2.0, 0.5, 20.0, 1.0);
        let strong = modularity_gain(0.0, 4.0, 2.0, 2.0, 20.0, 1.0);
        assert!(strong > weak);
    }

    #[test]
    fn modularity_calculation() {
        // 4 nodes in 2 pairs, each pair is a community
        let edges = vec![(0, 1, 1.0), (2, 3, 1.0)];
        let q = compute_modularity(4, &edges, &[0, 0, 1, 1], 1.0);
        // Q = 2 * (1/2 - (2/4)^2) = 0.5
        assert!((q - 0.5).abs() < 0.01, "modularity = {}, expected ~0.5", q);
    }

    #[test]
    fn modularity_all_one_community() {
        let edges = vec![(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)];
        let q = compute_modularity(3, &edges, &[0, 0, 0], 1.0);
        assert!(q.abs() < 0.01, "modularity = {}, expected ~0", q);
    }

    #[test]
    fn renumber_is_contiguous() {
        let (labels, count) = renumber(&[7, 7, 3, 9, 3]);
        assert_eq!(labels, vec![0, 0, 1, 2, 1]);
        assert_eq!(count, 3);
    }
}
