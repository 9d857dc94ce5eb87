//! In-memory community store with three indices.
//!
//! - by id: the communities themselves
//! - by entity: which communities an entity belongs to (bridge queries)
//! - by level: which communities live at a hierarchy depth
//!
//! Queries never fail: unknown ids give `None` or an empty list. Mutations
//! report an unknown id by returning `false`. The index has no interior
//! locking; wrap it yourself if it has to be shared.

use lore_core::error::{LoreError, Result};
use lore_core::types::{Community, CommunityId, CommunityType, EntityId, RelationEdge};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Compact view of a community, used in bridge reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunitySummary {
    pub id: CommunityId,
    pub name: String,
    pub community_type: CommunityType,
    pub level: u32,
}

impl From<&Community> for CommunitySummary {
    fn from(c: &Community) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            community_type: c.community_type,
            level: c.level,
        }
    }
}

/// An entity that belongs to more than one community.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeNode {
    pub entity_id: EntityId,
    pub communities: Vec<CommunitySummary>,
}

/// Aggregated edges between two communities. `community_a < community_b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityRelationship {
    pub community_a: CommunityId,
    pub community_b: CommunityId,
    pub edge_count: usize,
    pub total_weight: f64,
    pub relation_types: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityStats {
    pub total_communities: usize,
    pub by_type: BTreeMap<CommunityType, usize>,
    pub by_level: BTreeMap<u32, usize>,
    pub average_size: f64,
    pub bridge_node_count: usize,
}

/// Partial update for [`CommunityIndex::update_community`]. `None` leaves a
/// field alone. Attributes are merged; a JSON `null` removes the key.
#[derive(Debug, Clone, Default)]
pub struct CommunityUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub leader_id: Option<Option<EntityId>>,
    pub community_type: Option<CommunityType>,
    pub namespace: Option<String>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl CommunityUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn leader(mut self, leader: Option<EntityId>) -> Self {
        self.leader_id = Some(leader);
        self
    }

    pub fn community_type(mut self, community_type: CommunityType) -> Self {
        self.community_type = Some(community_type);
        self
    }

    pub fn attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommunityIndex {
    communities: HashMap<CommunityId, Community>,
    by_entity: HashMap<EntityId, HashSet<CommunityId>>,
    by_level: BTreeMap<u32, HashSet<CommunityId>>,
}

fn index_community(
    by_entity: &mut HashMap<EntityId, HashSet<CommunityId>>,
    by_level: &mut BTreeMap<u32, HashSet<CommunityId>>,
    community: &Community,
) {
    for entity in &community.entity_ids {
        by_entity.entry(entity.clone()).or_default().insert(community.id);
    }
    by_level.entry(community.level).or_default().insert(community.id);
}

fn unindex_community(
    by_entity: &mut HashMap<EntityId, HashSet<CommunityId>>,
    by_level: &mut BTreeMap<u32, HashSet<CommunityId>>,
    community: &Community,
) {
    for entity in &community.entity_ids {
        unindex_member(by_entity, entity, community.id);
    }
    move_level(by_level, community.id, Some(community.level), None);
}

fn unindex_member(
    by_entity: &mut HashMap<EntityId, HashSet<CommunityId>>,
    entity: &str,
    id: CommunityId,
) {
    if let Some(set) = by_entity.get_mut(entity) {
        set.remove(&id);
        if set.is_empty() {
            by_entity.remove(entity);
        }
    }
}

fn move_level(
    by_level: &mut BTreeMap<u32, HashSet<CommunityId>>,
    id: CommunityId,
    from: Option<u32>,
    to: Option<u32>,
) {
    if let Some(from) = from {
        if let Some(set) = by_level.get_mut(&from) {
            set.remove(&id);
            if set.is_empty() {
                by_level.remove(&from);
            }
        }
    }
    if let Some(to) = to {
        by_level.entry(to).or_default().insert(id);
    }
}

/// Stable presentation order: level, then name, then id.
fn sorted<'a>(communities: impl Iterator<Item = &'a Community>) -> Vec<&'a Community> {
    let mut list: Vec<&Community> = communities.collect();
    list.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    list
}

impl CommunityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index holding `communities`; empty ones are skipped.
    pub fn from_communities(communities: impl IntoIterator<Item = Community>) -> Self {
        let mut index = Self::new();
        index.load_communities(communities);
        index
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    pub fn clear(&mut self) {
        self.communities.clear();
        self.by_entity.clear();
        self.by_level.clear();
    }

    // ---- insertion ----

    /// Store a community, replacing any community with the same id.
    /// Returns false (and stores nothing) for an empty community.
    ///
    /// If its parent is already stored, the parent's child list is updated.
    pub fn add_community(&mut self, community: Community) -> bool {
        if community.entity_ids.is_empty() {
            warn!(community = %community.id, "refusing to store an empty community");
            return false;
        }

        if let Some(old) = self.communities.remove(&community.id) {
            unindex_community(&mut self.by_entity, &mut self.by_level, &old);
            if old.parent_community_id != community.parent_community_id {
                if let Some(previous) = old
                    .parent_community_id
                    .and_then(|p| self.communities.get_mut(&p))
                {
                    previous.child_community_ids.retain(|c| *c != community.id);
                }
            }
        }
        index_community(&mut self.by_entity, &mut self.by_level, &community);

        if let Some(parent) = community
            .parent_community_id
            .and_then(|p| self.communities.get_mut(&p))
        {
            if !parent.child_community_ids.contains(&community.id) {
                parent.child_community_ids.push(community.id);
            }
        }

        self.communities.insert(community.id, community);
        true
    }

    /// Replace the whole index contents.
    pub fn load_communities(&mut self, communities: impl IntoIterator<Item = Community>) {
        self.clear();
        for community in communities {
            self.add_community(community);
        }
        debug!(communities = self.len(), "community index loaded");
    }

    /// Create and store a new root community. `None` when `members` is empty.
    pub fn create_community<I, S>(
        &mut self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        community_type: CommunityType,
        members: I,
    ) -> Option<CommunityId>
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        let community = Community::new(name, namespace, community_type).with_members(members);
        let id = community.id;
        self.add_community(community).then_some(id)
    }

    // ---- queries ----

    pub fn get_community(&self, id: &CommunityId) -> Option<&Community> {
        self.communities.get(id)
    }

    pub fn get_all_communities(&self) -> Vec<&Community> {
        sorted(self.communities.values())
    }

    pub fn get_communities_in_namespace(&self, namespace: &str) -> Vec<&Community> {
        sorted(self.communities.values().filter(|c| c.namespace == namespace))
    }

    pub fn get_node_communities(&self, entity_id: &str) -> Vec<&Community> {
        let Some(ids) = self.by_entity.get(entity_id) else {
            return Vec::new();
        };
        sorted(ids.iter().filter_map(|id| self.communities.get(id)))
    }

    /// Most specific community of an entity.
    ///
    /// A community that is an ancestor of another community holding the entity
    /// is never primary, so nested seeds resolve to the innermost one. The
    /// remaining candidates rank by lowest level, then smallest, then lowest id.
    pub fn get_primary_community(&self, entity_id: &str) -> Option<&Community> {
        let candidates: Vec<&Community> = self
            .by_entity
            .get(entity_id)?
            .iter()
            .filter_map(|id| self.communities.get(id))
            .collect();

        let ancestors: HashSet<CommunityId> = candidates
            .iter()
            .flat_map(|c| {
                let chain = self.get_community_hierarchy(&c.id);
                let depth = chain.len().saturating_sub(1);
                chain.into_iter().take(depth).map(|a| a.id)
            })
            .collect();

        let rank = |a: &&Community, b: &&Community| {
            a.level
                .cmp(&b.level)
                .then_with(|| a.size().cmp(&b.size()))
                .then_with(|| a.id.cmp(&b.id))
        };

        candidates
            .iter()
            .copied()
            .filter(|c| !ancestors.contains(&c.id))
            .min_by(rank)
            // Only reachable through a parent cycle
            .or_else(|| candidates.iter().copied().min_by(rank))
    }

    pub fn get_communities_at_level(&self, level: u32) -> Vec<&Community> {
        let Some(ids) = self.by_level.get(&level) else {
            return Vec::new();
        };
        sorted(ids.iter().filter_map(|id| self.communities.get(id)))
    }

    pub fn get_communities_by_type(&self, community_type: CommunityType) -> Vec<&Community> {
        sorted(
            self.communities
                .values()
                .filter(|c| c.community_type == community_type),
        )
    }

    pub fn get_children(&self, id: &CommunityId) -> Vec<&Community> {
        let Some(community) = self.communities.get(id) else {
            return Vec::new();
        };
        community
            .child_community_ids
            .iter()
            .filter_map(|child| self.communities.get(child))
            .collect()
    }

    /// Ancestor chain from the root down to `id` itself.
    pub fn get_community_hierarchy(&self, id: &CommunityId) -> Vec<&Community> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = self.communities.get(id);

        while let Some(community) = cursor {
            if !visited.insert(community.id) {
                warn!(community = %community.id, "hierarchy cycle while walking ancestors");
                break;
            }
            chain.push(community);
            cursor = community
                .parent_community_id
                .and_then(|p| self.communities.get(&p));
        }

        chain.reverse();
        chain
    }

    /// Members shared by two communities, sorted.
    pub fn get_overlap(&self, a: &CommunityId, b: &CommunityId) -> Vec<EntityId> {
        match (self.communities.get(a), self.communities.get(b)) {
            (Some(a), Some(b)) => a.entity_ids.intersection(&b.entity_ids).cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Entities in more than one community, with their community ids sorted.
    pub fn get_bridge_nodes(&self) -> BTreeMap<EntityId, Vec<CommunityId>> {
        self.by_entity
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(entity, ids)| {
                let mut ids: Vec<CommunityId> = ids.iter().copied().collect();
                ids.sort();
                (entity.clone(), ids)
            })
            .collect()
    }

    /// Bridge nodes with community metadata, most memberships first.
    pub fn get_bridge_nodes_detailed(&self) -> Vec<BridgeNode> {
        let mut bridges: Vec<BridgeNode> = self
            .get_bridge_nodes()
            .into_iter()
            .map(|(entity_id, ids)| BridgeNode {
                communities: sorted(ids.iter().filter_map(|id| self.communities.get(id)))
                    .into_iter()
                    .map(CommunitySummary::from)
                    .collect(),
                entity_id,
            })
            .collect();
        bridges.sort_by(|a, b| {
            b.communities
                .len()
                .cmp(&a.communities.len())
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        bridges
    }

    /// Aggregate the edges that connect members of two different communities.
    ///
    /// An edge counts once per community pair, whichever direction it runs,
    /// and never for a pair where one community holds both endpoints.
    /// Sorted by edge count, then total weight, both descending.
    pub fn get_community_relationships(&self, edges: &[RelationEdge]) -> Vec<CommunityRelationship> {
        let mut pairs: BTreeMap<(CommunityId, CommunityId), CommunityRelationship> = BTreeMap::new();

        for edge in edges {
            if edge.source_id == edge.target_id {
                continue;
            }
            let (Some(from), Some(to)) = (
                self.by_entity.get(&edge.source_id),
                self.by_entity.get(&edge.target_id),
            ) else {
                continue;
            };

            // Skip pairs where the edge is internal to either side (nesting).
            let mut touched = BTreeSet::new();
            for &a in from {
                for &b in to {
                    if a != b && !to.contains(&a) && !from.contains(&b) {
                        touched.insert(if a < b { (a, b) } else { (b, a) });
                    }
                }
            }

            for (a, b) in touched {
                let record = pairs.entry((a, b)).or_insert_with(|| CommunityRelationship {
                    community_a: a,
                    community_b: b,
                    edge_count: 0,
                    total_weight: 0.0,
                    relation_types: BTreeSet::new(),
                });
                record.edge_count += 1;
                record.total_weight += edge.weight;
                record.relation_types.insert(edge.relation_type.clone());
            }
        }

        let mut relationships: Vec<CommunityRelationship> = pairs.into_values().collect();
        relationships.sort_by(|x, y| {
            y.edge_count
                .cmp(&x.edge_count)
                .then_with(|| y.total_weight.total_cmp(&x.total_weight))
        });
        relationships
    }

    pub fn get_stats(&self) -> CommunityStats {
        let mut by_type = BTreeMap::new();
        let mut total_members = 0usize;
        for community in self.communities.values() {
            *by_type.entry(community.community_type).or_insert(0) += 1;
            total_members += community.size();
        }

        CommunityStats {
            total_communities: self.communities.len(),
            by_type,
            by_level: self
                .by_level
                .iter()
                .map(|(level, ids)| (*level, ids.len()))
                .collect(),
            average_size: if self.communities.is_empty() {
                0.0
            } else {
                total_members as f64 / self.communities.len() as f64
            },
            bridge_node_count: self.by_entity.values().filter(|ids| ids.len() > 1).count(),
        }
    }

    // ---- mutation ----

    /// Add a member. False only when the community is unknown.
    pub fn add_entity_to_community(&mut self, id: &CommunityId, entity_id: &str) -> bool {
        let Some(community) = self.communities.get_mut(id) else {
            return false;
        };
        if community.entity_ids.insert(entity_id.to_string()) {
            self.by_entity
                .entry(entity_id.to_string())
                .or_default()
                .insert(*id);
            community.touch();
        }
        true
    }

    /// Remove a member. False only when the community is unknown.
    ///
    /// Removing the last member deletes the community.
    pub fn remove_entity_from_community(&mut self, id: &CommunityId, entity_id: &str) -> bool {
        let Some(community) = self.communities.get_mut(id) else {
            return false;
        };
        if community.entity_ids.remove(entity_id) {
            unindex_member(&mut self.by_entity, entity_id, *id);
            community.touch();
            if community.entity_ids.is_empty() {
                debug!(community = %id, "last member removed, deleting community");
                self.delete_community(id);
            }
        }
        true
    }

    pub fn update_community(&mut self, id: &CommunityId, update: CommunityUpdate) -> bool {
        let Some(community) = self.communities.get_mut(id) else {
            return false;
        };

        if let Some(name) = update.name {
            community.name = name;
        }
        if let Some(description) = update.description {
            community.description = description;
        }
        if let Some(leader) = update.leader_id {
            community.leader_id = leader;
        }
        if let Some(community_type) = update.community_type {
            community.community_type = community_type;
        }
        if let Some(namespace) = update.namespace {
            community.namespace = namespace;
        }
        for (key, value) in update.attributes {
            if value.is_null() {
                community.attributes.remove(&key);
            } else {
                community.attributes.insert(key, value);
            }
        }
        community.touch();
        true
    }

    /// Remove a community. Its children become roots (their level is kept)
    /// and it is detached from its parent.
    pub fn delete_community(&mut self, id: &CommunityId) -> bool {
        let Some(community) = self.communities.remove(id) else {
            return false;
        };
        unindex_community(&mut self.by_entity, &mut self.by_level, &community);

        for child_id in &community.child_community_ids {
            if let Some(child) = self.communities.get_mut(child_id) {
                if child.parent_community_id == Some(*id) {
                    child.parent_community_id = None;
                    child.touch();
                }
            }
        }
        if let Some(parent) = community
            .parent_community_id
            .and_then(|p| self.communities.get_mut(&p))
        {
            parent.child_community_ids.retain(|c| c != id);
            parent.touch();
        }
        true
    }

    /// [`try_set_parent`](Self::try_set_parent), reporting failure as `false`.
    pub fn set_parent(&mut self, child: &CommunityId, parent: Option<CommunityId>) -> bool {
        match self.try_set_parent(child, parent) {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "re-parenting rejected");
                false
            }
        }
    }

    /// Move `child` under `parent` (or detach it with `None`).
    ///
    /// The moved subtree is re-levelled so every child sits one level below
    /// its parent. Detaching keeps the current levels. Fails if either id is
    /// unknown or `parent` is `child` or one of its descendants.
    pub fn try_set_parent(&mut self, child: &CommunityId, parent: Option<CommunityId>) -> Result<()> {
        let old_parent = self
            .communities
            .get(child)
            .ok_or(LoreError::CommunityNotFound(*child))?
            .parent_community_id;

        let new_level = match parent {
            Some(p) => {
                let level = self
                    .communities
                    .get(&p)
                    .ok_or(LoreError::CommunityNotFound(p))?
                    .level;
                if p == *child || self.is_ancestor(child, &p) {
                    return Err(LoreError::HierarchyCycle { child: *child, parent: p });
                }
                Some(level + 1)
            }
            None => None,
        };

        if let Some(old) = old_parent.and_then(|p| self.communities.get_mut(&p)) {
            old.child_community_ids.retain(|c| c != child);
        }
        if let Some(new) = parent.and_then(|p| self.communities.get_mut(&p)) {
            if !new.child_community_ids.contains(child) {
                new.child_community_ids.push(*child);
            }
        }
        if let Some(community) = self.communities.get_mut(child) {
            community.parent_community_id = parent;
            community.touch();
        }

        if let Some(level) = new_level {
            self.relevel_subtree(*child, level);
        }
        Ok(())
    }

    /// Whether `ancestor` appears on the parent chain above `id`.
    fn is_ancestor(&self, ancestor: &CommunityId, id: &CommunityId) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = self.communities.get(id).and_then(|c| c.parent_community_id);
        while let Some(current) = cursor {
            if current == *ancestor {
                return true;
            }
            if !visited.insert(current) {
                return false;
            }
            cursor = self
                .communities
                .get(&current)
                .and_then(|c| c.parent_community_id);
        }
        false
    }

    fn relevel_subtree(&mut self, root: CommunityId, level: u32) {
        let mut stack = vec![(root, level)];
        let mut visited = HashSet::new();

        while let Some((id, level)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(community) = self.communities.get_mut(&id) else {
                continue;
            };
            if community.level != level {
                move_level(&mut self.by_level, id, Some(community.level), Some(level));
                community.level = level;
                community.touch();
            }
            stack.extend(community.child_community_ids.iter().map(|c| (*c, level + 1)));
        }
    }

    // ---- persistence payload ----

    /// Every stored community, in presentation order.
    pub fn export(&self) -> Vec<Community> {
        self.get_all_communities().into_iter().cloned().collect()
    }

    /// Replace the contents with `communities` and rebuild every index.
    pub fn import(&mut self, communities: Vec<Community>) {
        self.load_communities(communities);
    }
}
