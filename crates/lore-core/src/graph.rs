//! Weighted entity graph: the clustering input.
//!
//! Built from the raw node/edge lists handed over by the host. Only genuine
//! entity nodes participate; organizational containers are left out. Edge
//! weights are scaled by a relation-type boost and by extraction confidence,
//! and parallel edges between the same pair accumulate additively.
//!
//! Backed by petgraph's undirected `Graph` with a HashMap index for O(1)
//! lookup by entity id.

use crate::types::{EntityId, EntityNode, RelationEdge};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Default relation-type multipliers. Kinship and ownership relations bind
/// entities more tightly than incidental ones.
const DEFAULT_TYPE_BOOSTS: &[(&str, f64)] = &[
    ("PARENT_OF", 2.5),
    ("CHILD_OF", 2.5),
    ("SIBLING_OF", 2.5),
    ("SPOUSE_OF", 2.5),
    ("MARRIED_TO", 2.5),
    ("MEMBER_OF", 2.0),
    ("LEADS", 2.0),
    ("RELATED_TO", 1.5),
    ("SERVES", 1.5),
    ("ALLIED_WITH", 1.5),
    ("OWNS", 1.2),
    ("LOCATED_IN", 1.2),
    ("LIVES_IN", 1.2),
];

/// Relation-type lookup table. Unlisted types get 1.0.
#[derive(Debug, Clone)]
pub struct TypeBoosts {
    table: HashMap<String, f64>,
}

impl TypeBoosts {
    /// An empty table: every relation type weighs 1.0.
    pub fn none() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn with_boost(mut self, relation_type: &str, multiplier: f64) -> Self {
        self.table
            .insert(relation_type.to_ascii_uppercase(), multiplier);
        self
    }

    /// Multiplier for a relation type (case-insensitive).
    pub fn boost(&self, relation_type: &str) -> f64 {
        self.table
            .get(&relation_type.to_ascii_uppercase())
            .copied()
            .unwrap_or(1.0)
    }
}

impl Default for TypeBoosts {
    fn default() -> Self {
        DEFAULT_TYPE_BOOSTS
            .iter()
            .fold(Self::none(), |boosts, &(ty, m)| boosts.with_boost(ty, m))
    }
}

/// Undirected weighted graph over entity ids.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    graph: UnGraph<EntityId, f64>,
    /// Map from entity id to petgraph's internal index.
    node_index: HashMap<EntityId, NodeIndex>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            node_index: HashMap::new(),
        }
    }

    /// Build with the default relation-type boosts.
    pub fn build(nodes: &[EntityNode], edges: &[RelationEdge]) -> Self {
        Self::build_with(nodes, edges, &TypeBoosts::default())
    }

    /// Build from raw input. Edges touching a missing or container node are
    /// silently dropped, as are self-edges and edges that weigh nothing.
    pub fn build_with(nodes: &[EntityNode], edges: &[RelationEdge], boosts: &TypeBoosts) -> Self {
        let mut graph = Self::new();

        for node in nodes.iter().filter(|n| n.is_entity_node) {
            graph.add_entity(&node.id);
        }

        let mut dropped = 0usize;
        for edge in edges {
            let confidence = edge.confidence.clamp(0.0, 1.0);
            let weight = edge.weight * boosts.boost(&edge.relation_type) * confidence;
            if !graph.add_weight(&edge.source_id, &edge.target_id, weight) {
                trace!(
                    source = %edge.source_id,
                    target = %edge.target_id,
                    relation = %edge.relation_type,
                    "edge dropped"
                );
                dropped += 1;
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dropped,
            "entity graph built"
        );
        graph
    }

    /// Register an entity. Returns false if it was already present.
    pub fn add_entity(&mut self, id: &str) -> bool {
        if self.node_index.contains_key(id) {
            return false;
        }
        let idx = self.graph.add_node(id.to_string());
        self.node_index.insert(id.to_string(), idx);
        true
    }

    /// Add weight between two known entities, accumulating onto an existing
    /// edge. Returns false (and changes nothing) if the edge is not usable.
    pub fn add_weight(&mut self, a: &str, b: &str, weight: f64) -> bool {
        if a == b || !weight.is_finite() || weight <= 0.0 {
            return false;
        }
        let (Some(&a_idx), Some(&b_idx)) = (self.node_index.get(a), self.node_index.get(b)) else {
            return false;
        };

        if let Some(edge_idx) = self.graph.find_edge(a_idx, b_idx) {
            self.graph[edge_idx] += weight;
        } else {
            self.graph.add_edge(a_idx, b_idx, weight);
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Entity ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_indices().map(move |idx| self.graph[idx].as_str())
    }

    /// Neighbors of an entity with the aggregated edge weight.
    pub fn neighbors(&self, id: &str) -> Vec<(&str, f64)> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };

        self.graph
            .edges(idx)
            .map(|edge| {
                let other = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                (self.graph[other].as_str(), *edge.weight())
            })
            .collect()
    }

    /// Aggregated weight between two entities, 0.0 when unconnected.
    pub fn weight_between(&self, a: &str, b: &str) -> f64 {
        let (Some(&a_idx), Some(&b_idx)) = (self.node_index.get(a), self.node_index.get(b)) else {
            return 0.0;
        };
        self.graph
            .find_edge(a_idx, b_idx)
            .map(|e| self.graph[e])
            .unwrap_or(0.0)
    }

    /// Sum of incident edge weights.
    pub fn weighted_degree(&self, id: &str) -> f64 {
        self.neighbors(id).iter().map(|(_, w)| w).sum()
    }

    /// Sum of edge weights, each undirected edge counted once.
    pub fn total_weight(&self) -> f64 {
        self.graph.edge_weights().sum()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adjacency map view: entity -> neighbor -> weight, both directions present.
    pub fn adjacency(&self) -> BTreeMap<EntityId, BTreeMap<EntityId, f64>> {
        self.node_ids()
            .map(|id| {
                let row = self
                    .neighbors(id)
                    .into_iter()
                    .map(|(n, w)| (n.to_string(), w))
                    .collect();
                (id.to_string(), row)
            })
            .collect()
    }

    /// Edges as `(from_idx, to_idx, weight)`, indices matching `node_ids()` order.
    pub fn indexed_edges(&self) -> Vec<(usize, usize, f64)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
            .collect()
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::kind;

    fn characters(ids: &[&str]) -> Vec<EntityNode> {
        ids.iter()
            .map(|id| EntityNode::entity(*id, kind::CHARACTER))
            .collect()
    }

    #[test]
    fn empty_input_builds_empty_graph() {
        let graph = EntityGraph::build(&[], &[]);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.adjacency().is_empty());
    }

    #[test]
    fn applies_boost_and_confidence() {
        let nodes = characters(&["a", "b"]);
        let edges = vec![RelationEdge::new("a", "b", "child_of")
            .with_weight(2.0)
            .with_confidence(0.5)];
        let graph = EntityGraph::build(&nodes, &edges);
        assert!((graph.weight_between("a", "b") - 2.5).abs() < 1e-12);
        assert!((graph.weight_between("b", "a") - 2.5).abs() < 1e-12);
    }

    #[test]
    fn unlisted_type_weighs_one() {
        let boosts = TypeBoosts::default();
        assert_eq!(boosts.boost("KNOWS"), 1.0);
        assert_eq!(boosts.boost("Sibling_Of"), 2.5);
    }

    #[test]
    fn parallel_edges_accumulate() {
        let nodes = characters(&["a", "b"]);
        let edges = vec![
            RelationEdge::new("a", "b", "KNOWS"),
            RelationEdge::new("b", "a", "KNOWS").with_weight(0.5),
        ];
        let graph = EntityGraph::build(&nodes, &edges);
        assert_eq!(graph.edge_count(), 1);
        assert!((graph.weight_between("a", "b") - 1.5).abs() < 1e-12);
        assert!((graph.total_weight() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn containers_and_missing_nodes_are_excluded() {
        let mut nodes = characters(&["a", "b"]);
        nodes.push(EntityNode::container("guild", kind::FACTION));
        let edges = vec![
            RelationEdge::new("a", "guild", "MEMBER_OF"),
            RelationEdge::new("a", "ghost", "KNOWS"),
            RelationEdge::new("a", "a", "KNOWS"),
            RelationEdge::new("a", "b", "KNOWS"),
        ];
        let graph = EntityGraph::build(&nodes, &edges);
        assert!(!graph.contains("guild"));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors("a"), vec![("b", 1.0)]);
    }

    #[test]
    fn zero_confidence_edge_is_dropped() {
        let nodes = characters(&["a", "b"]);
        let edges = vec![RelationEdge::new("a", "b", "KNOWS").with_confidence(0.0)];
        let graph = EntityGraph::build(&nodes, &edges);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.weighted_degree("a"), 0.0);
    }

    #[test]
    fn indexed_edges_follow_node_order() {
        let nodes = characters(&["x", "y", "z"]);
        let edges = vec![RelationEdge::new("z", "y", "KNOWS")];
        let graph = EntityGraph::build(&nodes, &edges);
        let ids: Vec<&str> = graph.node_ids().collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        let indexed = graph.indexed_edges();
        assert_eq!(indexed.len(), 1);
        let (a, b, _) = indexed[0];
        let mut pair = [ids[a], ids[b]];
        pair.sort();
        assert_eq!(pair, ["y", "z"]);
    }
}
