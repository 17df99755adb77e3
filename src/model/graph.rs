//! In-memory graph snapshot. The evaluator reads nothing else.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::attributes::matches_text;
use super::{AttributeMap, Edge, EdgeId, Node, NodeId};

/// Ordered collections of nodes and edges.
///
/// Ids are caller-assigned and expected to be unique; duplicates are stored
/// but lookups by id resolve to the first inserted element. Incident-edge
/// lists follow global edge insertion order, so walking a node's incident
/// edges visits them in the same order as scanning [`Graph::edges`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphData", into = "GraphData")]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<NodeId, usize>,
    edge_index: HashMap<EdgeId, usize>,
    /// node id → indices into `edges` touching that node
    incident: HashMap<NodeId, Vec<usize>>,
}

/// Serialized form: just the two collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphData {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl From<GraphData> for Graph {
    fn from(data: GraphData) -> Self {
        Graph::from_parts(data.nodes, data.edges)
    }
}

impl From<Graph> for GraphData {
    fn from(graph: Graph) -> Self {
        GraphData { nodes: graph.nodes, edges: graph.edges }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: impl IntoIterator<Item = Node>, edges: impl IntoIterator<Item = Edge>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert_node(node);
        }
        for edge in edges {
            graph.insert_edge(edge);
        }
        graph
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        node_type: impl Into<String>,
        attributes: AttributeMap,
    ) -> &Node {
        let node = Node { id: id.into(), node_type: Some(node_type.into()), attributes };
        self.insert_node(node)
    }

    pub fn add_edge(
        &mut self,
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        edge_type: impl Into<String>,
        attributes: AttributeMap,
    ) -> &Edge {
        let mut edge = Edge::new(id, source, target, edge_type);
        edge.attributes = attributes;
        self.insert_edge(edge)
    }

    pub fn insert_node(&mut self, node: Node) -> &Node {
        let idx = self.nodes.len();
        self.node_index.entry(node.id).or_insert(idx);
        self.nodes.push(node);
        &self.nodes[idx]
    }

    /// Edges may reference nodes that are not (yet) in the graph; such
    /// edges are never traversed.
    pub fn insert_edge(&mut self, edge: Edge) -> &Edge {
        let idx = self.edges.len();
        self.edge_index.entry(edge.id).or_insert(idx);
        self.incident.entry(edge.source).or_default().push(idx);
        if edge.target != edge.source {
            self.incident.entry(edge.target).or_default().push(idx);
        }
        self.edges.push(edge);
        &self.edges[idx]
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_index.get(&id).map(|&idx| &self.edges[idx])
    }

    /// Edges with `id` as source or target, in edge insertion order.
    pub fn incident_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.incident
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.edges[idx])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    // ========================================================================
    // Lookup helpers (exact, case-sensitive; the query language has its own
    // case-insensitive matching)
    // ========================================================================

    pub fn find_nodes(&self, node_type: Option<&str>, attributes: &AttributeMap) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| node_type.is_none_or(|t| n.node_type.as_deref() == Some(t)))
            .filter(|n| attributes.iter().all(|(k, v)| n.attributes.get(k) == Some(v)))
            .collect()
    }

    pub fn find_edges(&self, source: Option<NodeId>, edge_type: Option<&str>) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| edge_type.is_none_or(|t| e.edge_type.as_deref() == Some(t)))
            .filter(|e| source.is_none_or(|s| e.source == s))
            .collect()
    }

    /// Nodes whose type (case-insensitive) and attributes (by text form)
    /// satisfy a pattern slot.
    pub(crate) fn nodes_matching<'g>(
        &'g self,
        type_label: Option<&'g str>,
        required: &'g AttributeMap,
    ) -> impl Iterator<Item = &'g Node> {
        self.nodes.iter().filter(move |n| {
            type_label.is_none_or(|t| n.has_type(t)) && matches_text(&n.attributes, required)
        })
    }
}
