//! Seed communities from the host's own containment tree.
//!
//! Every container of a seed kind (FACTION by default) becomes a community
//! holding all entity nodes found beneath it, however deep. A second pass
//! links nested seeds into a parent/child hierarchy by walking each backing
//! container's ancestor chain.
//!
//! The node list is indexed once into an arena (id -> position, id -> child
//! positions), so the ancestor walks are plain pointer chasing.

use lore_core::types::{attr, Community, CommunityType, EntityId, EntityNode};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Subtype keywords that mark a member as the group's leader.
pub const DEFAULT_LEADER_KEYWORDS: &[&str] = &[
    "leader",
    "king",
    "queen",
    "lord",
    "lady",
    "chief",
    "captain",
    "commander",
    "boss",
    "head",
    "master",
    "ruler",
    "elder",
    "patriarch",
    "matriarch",
];

/// Container kind -> community type of the seed it produces.
const CONTAINER_TYPES: &[(&str, CommunityType)] = &[
    ("FACTION", CommunityType::Faction),
    ("FAMILY", CommunityType::Family),
    ("HOUSE", CommunityType::Family),
    ("REGION", CommunityType::LocationGroup),
    ("LOCATION", CommunityType::LocationGroup),
    ("GUILD", CommunityType::Profession),
    ("PROFESSION", CommunityType::Profession),
];

/// Community type for a seed backed by a container of this kind.
pub fn container_community_type(container_kind: &str) -> CommunityType {
    CONTAINER_TYPES
        .iter()
        .find(|(kind, _)| kind.eq_ignore_ascii_case(container_kind))
        .map(|(_, ty)| *ty)
        .unwrap_or_default()
}

/// Seeder configuration.
#[derive(Debug, Clone)]
pub struct SeederConfig {
    /// Container kinds that yield a seed community (case-insensitive).
    pub seed_kinds: Vec<String>,
    /// Leadership keywords matched against member subtypes.
    pub leader_keywords: Vec<String>,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            seed_kinds: vec!["FACTION".to_string()],
            leader_keywords: DEFAULT_LEADER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl SeederConfig {
    pub fn with_seed_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_leader_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leader_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    fn is_seed_kind(&self, kind: &str) -> bool {
        self.seed_kinds.iter().any(|k| k.eq_ignore_ascii_case(kind))
    }

    /// Whether a subtype label contains any leadership keyword.
    pub fn is_leader_subtype(&self, subtype: &str) -> bool {
        let subtype = subtype.to_lowercase();
        self.leader_keywords
            .iter()
            .any(|k| !k.is_empty() && subtype.contains(&k.to_lowercase()))
    }
}

/// Node lookup built once per seeding run.
struct NodeArena<'a> {
    nodes: &'a [EntityNode],
    by_id: HashMap<&'a str, usize>,
    children: HashMap<&'a str, Vec<usize>>,
}

impl<'a> NodeArena<'a> {
    fn new(nodes: &'a [EntityNode]) -> Self {
        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();

        for (i, node) in nodes.iter().enumerate() {
            // First record wins on duplicate ids.
            if by_id.contains_key(node.id.as_str()) {
                continue;
            }
            by_id.insert(node.id.as_str(), i);
            if let Some(parent) = node.parent_container_id.as_deref() {
                children.entry(parent).or_default().push(i);
            }
        }

        Self { nodes, by_id, children }
    }

    fn get(&self, id: &str) -> Option<&'a EntityNode> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    fn children(&self, id: &str) -> impl Iterator<Item = &'a EntityNode> + '_ {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.nodes[i])
    }

    /// Entity nodes beneath a container, breadth-first in discovery order.
    fn descendant_entities(&self, root: &str) -> Vec<&'a EntityNode> {
        let mut members = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue = VecDeque::from([root]);
        seen.insert(root);

        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                if !seen.insert(child.id.as_str()) {
                    continue;
                }
                if child.is_entity_node {
                    members.push(child);
                } else {
                    queue.push_back(child.id.as_str());
                }
            }
        }
        members
    }
}

/// Builds seed communities from container nodes.
#[derive(Debug, Clone, Default)]
pub struct HierarchySeeder {
    config: SeederConfig,
}

impl HierarchySeeder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SeederConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeederConfig {
        &self.config
    }

    /// One community per seed-kind container with at least one entity
    /// beneath it, linked into a hierarchy.
    pub fn seed(&self, nodes: &[EntityNode], namespace: &str) -> Vec<Community> {
        let arena = NodeArena::new(nodes);
        let mut seeds = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for container in nodes
            .iter()
            .filter(|n| !n.is_entity_node && self.config.is_seed_kind(&n.entity_kind))
        {
            if !seen.insert(container.id.as_str()) {
                continue;
            }

            let members = arena.descendant_entities(&container.id);
            if members.is_empty() {
                debug!(container = %container.id, "container has no entities, not seeded");
                continue;
            }

            let mut community = Community::new(
                container.display_name(),
                namespace,
                container_community_type(&container.entity_kind),
            )
            .with_members(members.iter().map(|m| m.id.clone()));
            community.backing_node_id = Some(container.id.clone());
            community.entity_kind_of_backing = Some(container.entity_kind.clone());
            community.leader_id = self.pick_leader(&members);
            community.set_attribute(attr::SEEDED, true);
            seeds.push(community);
        }

        link_hierarchy(&arena, &mut seeds);
        debug!(seeds = seeds.len(), "seeded communities from containers");
        seeds
    }

    /// First member whose subtype names a leadership role, else the first
    /// member discovered.
    fn pick_leader(&self, members: &[&EntityNode]) -> Option<EntityId> {
        members
            .iter()
            .find(|m| {
                m.entity_subtype
                    .as_deref()
                    .is_some_and(|s| self.config.is_leader_subtype(s))
            })
            .or_else(|| members.first())
            .map(|m| m.id.clone())
    }
}

/// Resolve each seed's parent (nearest ancestor container that backs another
/// seed) and derive levels from the parent chain.
fn link_hierarchy(arena: &NodeArena<'_>, seeds: &mut [Community]) {
    let backing: HashMap<&str, usize> = seeds
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.backing_node_id.as_deref().map(|b| (b, i)))
        .collect();

    let mut parent: Vec<Option<usize>> = seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let mut visited: HashSet<&str> = HashSet::new();
            let mut cursor = seed
                .backing_node_id
                .as_deref()
                .and_then(|b| arena.get(b))
                .and_then(|n| n.parent_container_id.as_deref());

            while let Some(ancestor) = cursor {
                if !visited.insert(ancestor) {
                    break;
                }
                if let Some(&p) = backing.get(ancestor) {
                    return (p != i).then_some(p);
                }
                cursor = arena.get(ancestor).and_then(|n| n.parent_container_id.as_deref());
            }
            None
        })
        .collect();

    // A containment loop could make two seeds each other's ancestor; cut it
    // at the first member reached.
    for i in 0..parent.len() {
        let mut seen = HashSet::from([i]);
        let mut cursor = parent[i];
        while let Some(p) = cursor {
            if !seen.insert(p) {
                if p == i {
                    warn!(community = %seeds[i].name, "containment cycle, seed kept as root");
                    parent[i] = None;
                }
                break;
            }
            cursor = parent[p];
        }
    }

    for i in 0..seeds.len() {
        let mut level = 0u32;
        let mut cursor = parent[i];
        while let Some(p) = cursor {
            level += 1;
            cursor = parent[p];
        }
        seeds[i].level = level;
    }

    for (child, p) in parent.iter().enumerate() {
        if let Some(p) = *p {
            let child_id = seeds[child].id;
            let parent_id = seeds[p].id;
            seeds[child].parent_community_id = Some(parent_id);
            seeds[p].child_community_ids.push(child_id);
        }
    }
}
