use crate::note::{Note, NoteId, Snapshot};
use serde::{Deserialize, Serialize};

/// Display tier of a node. Serialized as `"hub"` / `"normal"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeTier {
    Hub,
    Normal,
}

impl NodeTier {
    /// Fill color the graph canvas uses for this tier.
    pub fn color(&self) -> &'static str {
        match self {
            NodeTier::Hub => "hsl(280, 70%, 60%)",
            NodeTier::Normal => "hsl(175, 80%, 50%)",
        }
    }
}

/// Sizing and tiering knobs. The defaults give `weight = 5 + 2 * degree` and
/// mark a node as a hub once it has more than two backlinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStyle {
    pub base_weight: u32,
    pub weight_per_link: u32,
    /// A node is a hub when its backlink count is strictly greater than this
    pub hub_backlink_threshold: usize,
}

impl Default for GraphStyle {
    fn default() -> Self {
        Self {
            base_weight: 5,
            weight_per_link: 2,
            hub_backlink_threshold: 2,
        }
    }
}

impl GraphStyle {
    pub fn weight(&self, note: &Note) -> u32 {
        let degree = u32::try_from(note.degree()).unwrap_or(u32::MAX);
        self.base_weight
            .saturating_add(self.weight_per_link.saturating_mul(degree))
    }

    pub fn tier(&self, note: &Note) -> NodeTier {
        if note.backlinks.len() > self.hub_backlink_threshold {
            NodeTier::Hub
        } else {
            NodeTier::Normal
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NoteId,
    pub label: String,
    pub weight: u32,
    pub tier: NodeTier,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NoteId,
    pub target: NoteId,
}

/// Visualization-ready node/edge structure derived from a consistent snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphView {
    pub fn node(&self, id: &NoteId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == *id)
    }
}

/// Project a snapshot into a graph view with the default style.
pub fn project(snapshot: &Snapshot) -> GraphView {
    project_with_style(snapshot, &GraphStyle::default())
}

/// One node per note, one edge per entry of each note's `forward_links`.
///
/// Pure; the snapshot is expected to come out of a completed recompute pass, so
/// forward links are already deduplicated and no multi-edges arise.
pub fn project_with_style(snapshot: &Snapshot, style: &GraphStyle) -> GraphView {
    let nodes = snapshot
        .iter()
        .map(|note| {
            let tier = style.tier(note);
            GraphNode {
                id: note.id.clone(),
                label: note.title.clone(),
                weight: style.weight(note),
                tier,
                color: tier.color().to_string(),
            }
        })
        .collect();

    let edges = snapshot
        .iter()
        .flat_map(|note| {
            note.forward_links.iter().map(move |target| GraphEdge {
                source: note.id.clone(),
                target: target.clone(),
            })
        })
        .collect();

    GraphView { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_graph::recompute_links;
    use crate::note::test_support::{ids, note};

    #[test]
    fn hub_weight_counts_both_directions() {
        // 3 backlinks + 1 forward link
        let mut x = note("x", "X", "");
        x.backlinks = ids(&["a", "b", "c"]);
        x.forward_links = ids(&["a"]);
        let view = project(&Snapshot::new(vec![x]));

        let node = &view.nodes[0];
        assert_eq!(node.weight, 13);
        assert_eq!(node.tier, NodeTier::Hub);
        assert_eq!(node.color, "hsl(280, 70%, 60%)");
        assert_eq!(node.label, "X");
    }

    #[test]
    fn two_backlinks_is_not_a_hub() {
        let mut x = note("x", "X", "");
        x.backlinks = ids(&["a", "b"]);
        let view = project(&Snapshot::new(vec![x]));
        assert_eq!(view.nodes[0].tier, NodeTier::Normal);
        assert_eq!(view.nodes[0].weight, 9);
        assert_eq!(view.nodes[0].color, "hsl(175, 80%, 50%)");
    }

    #[test]
    fn isolated_note_gets_base_weight() {
        let view = project(&Snapshot::new(vec![note("x", "X", "")]));
        assert_eq!(view.nodes[0].weight, 5);
        assert!(view.edges.is_empty());
    }

    #[test]
    fn one_edge_per_forward_link() {
        let s = recompute_links(&Snapshot::new(vec![
            note("a", "Alpha", "[[Beta]] [[beta]] [[Alpha]]"),
            note("b", "Beta", "[[Alpha]]"),
        ]));
        let view = project(&s);

        let pairs: Vec<(&str, &str)> = view
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "b"), ("a", "a"), ("b", "a")]);
        assert_eq!(view.nodes.len(), 2);
        // Alpha: backlinks {a, b}, forward {b, a}
        assert_eq!(view.node(&NoteId::from("a")).unwrap().weight, 13);
    }

    #[test]
    fn custom_style_changes_formula() {
        let mut x = note("x", "X", "");
        x.backlinks = ids(&["a"]);
        let style = GraphStyle {
            base_weight: 1,
            weight_per_link: 10,
            hub_backlink_threshold: 0,
        };
        let view = project_with_style(&Snapshot::new(vec![x]), &style);
        assert_eq!(view.nodes[0].weight, 11);
        assert_eq!(view.nodes[0].tier, NodeTier::Hub);
    }

    #[test]
    fn projection_is_deterministic() {
        let s = recompute_links(&Snapshot::new(vec![
            note("a", "Alpha", "[[Beta]]"),
            note("b", "Beta", "[[Alpha]]"),
        ]));
        assert_eq!(project(&s), project(&s));
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&NodeTier::Hub).unwrap();
        assert_eq!(json, "\"hub\"");
        let json = serde_json::to_string(&NodeTier::Normal).unwrap();
        assert_eq!(json, "\"normal\"");
    }
}
