//! Semantic typing and descriptions for communities.
//!
//! Decision order, first match wins:
//!
//! 1. Seeded communities that already carry a non-CUSTOM type keep it.
//! 2. All members are characters: FAMILY when kinship edges make up more than
//!    `family_edge_ratio` of the intra-community edges, FACTION otherwise.
//! 3. All members are locations: LOCATION_GROUP.
//! 4. NPCs make up more than `profession_ratio` of the members: PROFESSION.
//! 5. CUSTOM.
//!
//! Both classification and description are pure: they only read the
//! community, the node set and the edge list.

use lore_core::types::{kind, Community, CommunityType, EntityId, EntityNode, RelationEdge};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Relation-type fragments that mark a kinship edge (substring match).
pub const DEFAULT_KINSHIP_RELATIONS: &[&str] =
    &["CHILD_OF", "PARENT_OF", "SIBLING_OF", "SPOUSE_OF", "RELATED_TO"];

#[derive(Debug, Clone)]
pub struct ClassifierRules {
    pub kinship_relations: Vec<String>,
    /// Share of kinship edges a family must strictly exceed.
    pub family_edge_ratio: f64,
    /// Share of NPC members a professional group must strictly exceed.
    pub profession_ratio: f64,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            kinship_relations: DEFAULT_KINSHIP_RELATIONS.iter().map(|r| r.to_string()).collect(),
            family_edge_ratio: 0.5,
            profession_ratio: 0.6,
        }
    }
}

impl ClassifierRules {
    pub fn with_kinship_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinship_relations = relations.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_kinship(&self, relation_type: &str) -> bool {
        let relation_type = relation_type.to_ascii_uppercase();
        self.kinship_relations
            .iter()
            .any(|k| !k.is_empty() && relation_type.contains(&k.to_ascii_uppercase()))
    }
}

/// Classifies communities against one graph.
pub struct CommunityClassifier<'a> {
    rules: ClassifierRules,
    nodes: HashMap<&'a str, &'a EntityNode>,
    edges: &'a [RelationEdge],
}

impl<'a> CommunityClassifier<'a> {
    pub fn new(nodes: &'a [EntityNode], edges: &'a [RelationEdge]) -> Self {
        let mut lookup = HashMap::with_capacity(nodes.len());
        for node in nodes {
            lookup.entry(node.id.as_str()).or_insert(node);
        }
        Self {
            rules: ClassifierRules::default(),
            nodes: lookup,
            edges,
        }
    }

    pub fn with_rules(mut self, rules: ClassifierRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn node(&self, id: &str) -> Option<&'a EntityNode> {
        self.nodes.get(id).copied()
    }

    /// Member counts per entity kind (upper-cased), most common first, ties
    /// by kind name. Members missing from the node set count as UNKNOWN.
    pub fn kind_counts(&self, members: &BTreeSet<EntityId>) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for member in members {
            let kind = self
                .node(member)
                .map(|n| n.entity_kind.to_ascii_uppercase())
                .unwrap_or_else(|| kind::UNKNOWN.to_string());
            *counts.entry(kind).or_insert(0) += 1;
        }

        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// (kinship edges, all edges) with both endpoints inside the member set.
    fn intra_edges(&self, members: &BTreeSet<EntityId>) -> (usize, usize) {
        self.edges
            .iter()
            .filter(|e| {
                e.source_id != e.target_id
                    && members.contains(&e.source_id)
                    && members.contains(&e.target_id)
            })
            .fold((0, 0), |(kin, total), e| {
                (kin + usize::from(self.rules.is_kinship(&e.relation_type)), total + 1)
            })
    }

    pub fn classify(&self, community: &Community) -> CommunityType {
        if community.is_seeded() && community.community_type != CommunityType::Custom {
            return community.community_type;
        }

        let members = &community.entity_ids;
        let counts = self.kind_counts(members);
        let Some((dominant, dominant_count)) = counts.first() else {
            return CommunityType::Custom;
        };
        let uniform = *dominant_count == members.len();

        if uniform && kind::matches(dominant, kind::CHARACTER) {
            let (kin, total) = self.intra_edges(members);
            if total > 0 && kin as f64 > total as f64 * self.rules.family_edge_ratio {
                return CommunityType::Family;
            }
            return CommunityType::Faction;
        }

        if uniform && kind::matches(dominant, kind::LOCATION) {
            return CommunityType::LocationGroup;
        }

        let npcs = counts
            .iter()
            .find(|(k, _)| kind::matches(k, kind::NPC))
            .map(|(_, n)| *n)
            .unwrap_or(0);
        if npcs as f64 > members.len() as f64 * self.rules.profession_ratio {
            return CommunityType::Profession;
        }

        CommunityType::Custom
    }

    /// "A faction containing 3 characters, 2 locations".
    pub fn describe(&self, community: &Community) -> String {
        let counts = self.kind_counts(&community.entity_ids);
        if counts.is_empty() {
            return format!("An empty {}", community.community_type.noun());
        }

        let parts: Vec<String> = counts
            .iter()
            .map(|(kind, n)| {
                let label = kind.to_lowercase().replace('_', " ");
                if *n == 1 {
                    format!("1 {}", label)
                } else {
                    format!("{} {}", n, plural(&label))
                }
            })
            .collect();
        format!(
            "A {} containing {}",
            community.community_type.noun(),
            parts.join(", ")
        )
    }
}

fn plural(word: &str) -> String {
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// Classify one community with the given rules.
pub fn classify_community(
    community: &Community,
    nodes: &[EntityNode],
    edges: &[RelationEdge],
    rules: &ClassifierRules,
) -> CommunityType {
    CommunityClassifier::new(nodes, edges)
        .with_rules(rules.clone())
        .classify(community)
}

/// Describe one community from its member kinds.
pub fn describe_community(community: &Community, nodes: &[EntityNode]) -> String {
    CommunityClassifier::new(nodes, &[]).describe(community)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn characters(ids: &[&str]) -> Vec<EntityNode> {
        ids.iter().map(|id| EntityNode::entity(*id, kind::CHARACTER)).collect()
    }

    fn detected(ids: &[&str]) -> Community {
        Community::new("c", "story", CommunityType::Custom).with_members(ids.iter().copied())
    }

    #[test]
    fn kinship_chain_is_family() {
        let nodes = characters(&["a", "b", "c", "d"]);
        let edges = vec![
            RelationEdge::new("a", "b", "CHILD_OF"),
            RelationEdge::new("b", "c", "SIBLING_OF"),
            RelationEdge::new("c", "d", "SPOUSE_OF"),
        ];
        let community = detected(&["a", "b", "c", "d"]);
        let ty = classify_community(&community, &nodes, &edges, &ClassifierRules::default());
        assert_eq!(ty, CommunityType::Family);
    }

    #[test]
    fn half_kinship_is_not_enough() {
        let nodes = characters(&["a", "b", "c"]);
        let edges = vec![
            RelationEdge::new("a", "b", "parent_of"),
            RelationEdge::new("b", "c", "ALLY_OF"),
        ];
        let ty = classify_community(&detected(&["a", "b", "c"]), &nodes, &edges, &ClassifierRules::default());
        assert_eq!(ty, CommunityType::Faction);
    }

    #[test]
    fn characters_without_edges_are_faction() {
        let nodes = characters(&["a", "b", "c"]);
        let ty = classify_community(&detected(&["a", "b", "c"]), &nodes, &[], &ClassifierRules::default());
        assert_eq!(ty, CommunityType::Faction);
    }

    #[test]
    fn edges_leaving_the_community_are_ignored() {
        let mut nodes = characters(&["a", "b", "c"]);
        nodes.push(EntityNode::entity("outsider", kind::CHARACTER));
        let edges = vec![
            RelationEdge::new("a", "b", "ALLY_OF"),
            RelationEdge::new("a", "outsider", "CHILD_OF"),
            RelationEdge::new("b", "outsider", "CHILD_OF"),
        ];
        let ty = classify_community(&detected(&["a", "b", "c"]), &nodes, &edges, &ClassifierRules::default());
        assert_eq!(ty, CommunityType::Faction);
    }

    #[test]
    fn all_locations_form_location_group() {
        let nodes: Vec<EntityNode> = ["inn", "docks", "market"]
            .iter()
            .map(|id| EntityNode::entity(*id, "location"))
            .collect();
        let ty = classify_community(&detected(&["inn", "docks", "market"]), &nodes, &[], &ClassifierRules::default());
        assert_eq!(ty, CommunityType::LocationGroup);
    }

    #[test]
    fn npc_majority_is_profession() {
        let nodes = vec![
            EntityNode::entity("smith", kind::NPC),
            EntityNode::entity("tanner", kind::NPC),
            EntityNode::entity("cooper", kind::NPC),
            EntityNode::entity("forge", kind::LOCATION),
        ];
        let community = detected(&["smith", "tanner", "cooper", "forge"]);
        let ty = classify_community(&community, &nodes, &[], &ClassifierRules::default());
        assert_eq!(ty, CommunityType::Profession);
    }

    #[test]
    fn mixed_bag_is_custom() {
        let nodes = vec![
            EntityNode::entity("hero", kind::CHARACTER),
            EntityNode::entity("sword", kind::ITEM),
            EntityNode::entity("cave", kind::LOCATION),
        ];
        let ty = classify_community(&detected(&["hero", "sword", "cave"]), &nodes, &[], &ClassifierRules::default());
        assert_eq!(ty, CommunityType::Custom);
    }

    #[test]
    fn seeded_type_is_kept() {
        let nodes = characters(&["a", "b"]);
        let edges = vec![RelationEdge::new("a", "b", "SIBLING_OF")];
        let mut seed = Community::new("Guild", "story", CommunityType::Faction).with_members(["a", "b"]);
        seed.backing_node_id = Some("guild".into());
        let ty = classify_community(&seed, &nodes, &edges, &ClassifierRules::default());
        assert_eq!(ty, CommunityType::Faction);
    }

    #[test]
    fn classification_is_repeatable() {
        let nodes = characters(&["a", "b", "c"]);
        let edges = vec![RelationEdge::new("a", "b", "RELATED_TO")];
        let community = detected(&["a", "b", "c"]);
        let classifier = CommunityClassifier::new(&nodes, &edges);
        assert_eq!(classifier.classify(&community), classifier.classify(&community));
    }

    #[test]
    fn description_counts_kinds() {
        let nodes = vec![
            EntityNode::entity("a", kind::CHARACTER),
            EntityNode::entity("b", kind::CHARACTER),
            EntityNode::entity("c", kind::CHARACTER),
            EntityNode::entity("inn", kind::LOCATION),
            EntityNode::entity("docks", kind::LOCATION),
            EntityNode::entity("key", kind::ITEM),
        ];
        let mut community = detected(&["a", "b", "c", "inn", "docks", "key"]);
        community.community_type = CommunityType::Faction;
        assert_eq!(
            describe_community(&community, &nodes),
            "A faction containing 3 characters, 2 locations, 1 item"
        );
    }

    #[test]
    fn unknown_members_are_reported() {
        let community = detected(&["ghost"]);
        assert_eq!(
            describe_community(&community, &[]),
            "A community containing 1 unknown"
        );
    }
}
