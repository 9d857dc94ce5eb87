//! Shared types used across all lore crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Identifier of an entity or container node, as assigned by the host application.
pub type EntityId = String;

/// Well-known entity kinds. Kinds are free-form strings compared case-insensitively.
pub mod kind {
    pub const CHARACTER: &str = "CHARACTER";
    /// Non-player / background character.
    pub const NPC: &str = "NPC";
    pub const LOCATION: &str = "LOCATION";
    pub const FACTION: &str = "FACTION";
    pub const ITEM: &str = "ITEM";
    pub const EVENT: &str = "EVENT";
    /// Kind reported for members that are missing from the node set.
    pub const UNKNOWN: &str = "UNKNOWN";

    /// Case-insensitive kind comparison.
    pub fn matches(kind: &str, expected: &str) -> bool {
        kind.eq_ignore_ascii_case(expected)
    }
}

/// Well-known keys of the `Community::attributes` bag.
pub mod attr {
    pub const SEEDED: &str = "seeded";
    pub const DETECTED: &str = "detected";
    pub const DETECTION_LEVEL: &str = "detectionLevel";
    pub const EXPANDED_FROM_DETECTION: &str = "expandedFromDetection";
}

/// Unique identifier for a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(pub Uuid);

impl CommunityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id (for testing).
    pub fn from_seed(seed: u64) -> Self {
        Self(Uuid::from_u128(seed as u128))
    }
}

impl Default for CommunityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommunityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CommunityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A node record supplied by the extraction/storage layer.
///
/// Entity nodes (`is_entity_node == true`) are the things that get clustered.
/// Container nodes are organizational folders that may hold entities and
/// other containers through `parent_container_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityNode {
    pub id: EntityId,
    /// Display name; falls back to the id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_entity_node: bool,
    pub entity_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_container_id: Option<EntityId>,
}

impl EntityNode {
    /// A genuine graph entity.
    pub fn entity(id: impl Into<EntityId>, entity_kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            is_entity_node: true,
            entity_kind: entity_kind.into(),
            entity_subtype: None,
            parent_container_id: None,
        }
    }

    /// An organizational container (folder).
    pub fn container(id: impl Into<EntityId>, entity_kind: impl Into<String>) -> Self {
        Self {
            is_entity_node: false,
            ..Self::entity(id, entity_kind)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.entity_subtype = Some(subtype.into());
        self
    }

    pub fn in_container(mut self, parent: impl Into<EntityId>) -> Self {
        self.parent_container_id = Some(parent.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_kind(&self, expected: &str) -> bool {
        kind::matches(&self.entity_kind, expected)
    }
}

fn default_weight() -> f64 {
    1.0
}

fn default_confidence() -> f64 {
    1.0
}

/// A typed relationship between two nodes. Treated as undirected for clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEdge {
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub relation_type: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Extraction confidence in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl RelationEdge {
    pub fn new(
        source_id: impl Into<EntityId>,
        target_id: impl Into<EntityId>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            weight: default_weight(),
            confidence: default_confidence(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// The raw graph handed over by the host: nodes plus typed edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphInput {
    #[serde(default)]
    pub nodes: Vec<EntityNode>,
    #[serde(default)]
    pub edges: Vec<RelationEdge>,
}

/// Semantic type of a community.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunityType {
    Faction,
    Family,
    LocationGroup,
    Profession,
    #[default]
    Custom,
}

impl CommunityType {
    /// Human-readable noun used in names and descriptions.
    pub fn noun(&self) -> &'static str {
        match self {
            CommunityType::Faction => "faction",
            CommunityType::Family => "family",
            CommunityType::LocationGroup => "location group",
            CommunityType::Profession => "professional group",
            CommunityType::Custom => "community",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityType::Faction => "FACTION",
            CommunityType::Family => "FAMILY",
            CommunityType::LocationGroup => "LOCATION_GROUP",
            CommunityType::Profession => "PROFESSION",
            CommunityType::Custom => "CUSTOM",
        }
    }
}

impl std::fmt::Display for CommunityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group of entities: a faction, a family, a cluster of places...
///
/// Hierarchy invariant: when `parent_community_id` is `P`, then `P.child_community_ids`
/// contains this id and `level == P.level + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Container node this community was seeded from.
    #[serde(default)]
    pub backing_node_id: Option<EntityId>,
    #[serde(default)]
    pub entity_kind_of_backing: Option<String>,
    #[serde(default)]
    pub parent_community_id: Option<CommunityId>,
    #[serde(default)]
    pub child_community_ids: Vec<CommunityId>,
    #[serde(default)]
    pub level: u32,
    pub entity_ids: BTreeSet<EntityId>,
    #[serde(default)]
    pub leader_id: Option<EntityId>,
    #[serde(default)]
    pub community_type: CommunityType,
    pub namespace: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Community {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        community_type: CommunityType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CommunityId::new(),
            name: name.into(),
            description: String::new(),
            backing_node_id: None,
            entity_kind_of_backing: None,
            parent_community_id: None,
            child_community_ids: Vec::new(),
            level: 0,
            entity_ids: BTreeSet::new(),
            leader_id: None,
            community_type,
            namespace: namespace.into(),
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        self.entity_ids.extend(members.into_iter().map(Into::into));
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn size(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entity_ids.contains(entity_id)
    }

    /// Whether this community came from an explicit container.
    pub fn is_seeded(&self) -> bool {
        self.backing_node_id.is_some()
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Boolean attribute lookup; anything but `true` reads as false.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.attributes.get(key), Some(serde_json::Value::Bool(true)))
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
