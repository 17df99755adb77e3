//! # Graph Store Trait
//!
//! The contract between glite and whatever persists graph data. A store
//! holds four collections (nodes, edges, node attributes, edge attributes)
//! and hands the evaluator a [`Graph`] snapshot built from them.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory, for testing/embedding |

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::{Error, Result};

pub use memory::MemoryStore;

// ============================================================================
// Store Configuration
// ============================================================================

/// Configuration shared by all stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    schema: String,
}

impl StoreConfig {
    /// `schema` namespaces the store's collections and must not be blank.
    pub fn new(schema: impl Into<String>) -> Result<Self> {
        let schema = schema.into();
        if schema.trim().is_empty() {
            return Err(Error::InvalidConfig("schema name must be a non-empty string".into()));
        }
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { schema: "public".into() }
    }
}

// ============================================================================
// Records
// ============================================================================

/// The four collections a store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Edge,
    NodeAttribute,
    EdgeAttribute,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Node => "node",
            EntityKind::Edge => "edge",
            EntityKind::NodeAttribute => "node_attr",
            EntityKind::EdgeAttribute => "edge_attr",
        })
    }
}

/// Attribute row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttrId(pub u64);

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub label: String,
    pub node_type: String,
}

/// The label doubles as the edge's type once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub label: String,
    pub source: NodeId,
    pub target: NodeId,
}

/// Key/value row attached to a node or an edge. Values are stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub id: AttrId,
    pub owner: u64,
    pub key: String,
    pub value: String,
}

/// A row from any collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record")]
pub enum Record {
    Node(NodeRecord),
    Edge(EdgeRecord),
    NodeAttribute(AttributeRecord),
    EdgeAttribute(AttributeRecord),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Node(_) => EntityKind::Node,
            Record::Edge(_) => EntityKind::Edge,
            Record::NodeAttribute(_) => EntityKind::NodeAttribute,
            Record::EdgeAttribute(_) => EntityKind::EdgeAttribute,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Record::Node(r) => r.id.0,
            Record::Edge(r) => r.id.0,
            Record::NodeAttribute(r) | Record::EdgeAttribute(r) => r.id.0,
        }
    }
}

// ============================================================================
// Confirmation
// ============================================================================

/// Explicit go-ahead for destructive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    /// `yes` in any case confirms; anything else declines.
    pub fn from_input(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("yes") {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }

    pub fn is_confirmed(self) -> bool {
        self == Confirmation::Confirmed
    }
}

// ============================================================================
// GraphStore Trait
// ============================================================================

/// The storage contract.
///
/// Writes are upserts: inserting a row identical to an existing one returns
/// the existing id. Deletes and drops only act on
/// [`Confirmation::Confirmed`] and cascade to dependent rows.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    fn config(&self) -> &StoreConfig;

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a node, or return the id of the node with the same label and type.
    async fn upsert_node(&self, label: &str, node_type: &str) -> Result<NodeId>;

    /// Insert an edge, or return the id of the identical edge.
    /// Both endpoints must exist.
    async fn upsert_edge(&self, label: &str, source: NodeId, target: NodeId) -> Result<EdgeId>;

    async fn set_node_attribute(&self, node: NodeId, key: &str, value: &str) -> Result<AttrId>;

    async fn set_edge_attribute(&self, edge: EdgeId, key: &str, value: &str) -> Result<AttrId>;

    // ========================================================================
    // Reads (ordered by id)
    // ========================================================================

    async fn read_nodes(&self) -> Result<Vec<NodeRecord>>;

    async fn read_edges(&self) -> Result<Vec<EdgeRecord>>;

    async fn read_node_attributes(&self) -> Result<Vec<AttributeRecord>>;

    async fn read_edge_attributes(&self) -> Result<Vec<AttributeRecord>>;

    async fn read_by_id(&self, kind: EntityKind, id: u64) -> Result<Option<Record>>;

    /// First row (lowest id) with the given label. Attribute rows have no
    /// label and are matched on their key.
    async fn read_by_label(&self, kind: EntityKind, label: &str) -> Result<Option<Record>>;

    // ========================================================================
    // Deletes
    // ========================================================================

    /// Returns `true` if a row was removed.
    async fn delete_by_id(&self, kind: EntityKind, id: u64, confirm: Confirmation) -> Result<bool>;

    /// Empty a collection. Returns `true` if the drop went ahead.
    async fn drop_collection(&self, kind: EntityKind, confirm: Confirmation) -> Result<bool>;

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Load the whole store as an in-memory graph.
    async fn snapshot(&self) -> Result<Graph> {
        let nodes = self.read_nodes().await?;
        let edges = self.read_edges().await?;
        let node_attrs = self.read_node_attributes().await?;
        let edge_attrs = self.read_edge_attributes().await?;
        Ok(load_graph(&nodes, &edges, &node_attrs, &edge_attrs))
    }
}

/// Assemble a [`Graph`] from store rows.
///
/// Node type comes from the node row and the row's label becomes a `label`
/// attribute unless one was stored explicitly. Edge type is the edge label.
/// Attribute values load as [`Value::Text`].
pub fn load_graph(
    nodes: &[NodeRecord],
    edges: &[EdgeRecord],
    node_attrs: &[AttributeRecord],
    edge_attrs: &[AttributeRecord],
) -> Graph {
    let mut by_node = group_by_owner(node_attrs);
    let mut by_edge = group_by_owner(edge_attrs);

    let mut graph = Graph::new();
    for record in nodes {
        let mut attributes = by_node.remove(&record.id.0).unwrap_or_default();
        attributes
            .entry("label".to_string())
            .or_insert_with(|| Value::Text(record.label.clone()));
        graph.insert_node(Node {
            id: record.id,
            node_type: Some(record.node_type.clone()),
            attributes,
        });
    }
    for record in edges {
        let mut edge = Edge::new(record.id, record.source, record.target, record.label.clone());
        edge.attributes = by_edge.remove(&record.id.0).unwrap_or_default();
        graph.insert_edge(edge);
    }
    graph
}

fn group_by_owner(rows: &[AttributeRecord]) -> HashMap<u64, AttributeMap> {
    let mut grouped: HashMap<u64, AttributeMap> = HashMap::new();
    for row in rows {
        // rows arrive in id order, so the latest write for a key wins
        grouped
            .entry(row.owner)
            .or_default()
            .insert(row.key.clone(), Value::Text(row.value.clone()));
    }
    grouped
}
