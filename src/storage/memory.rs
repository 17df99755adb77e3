//! In-memory graph store.
//!
//! This is the reference implementation of `GraphStore`. All four
//! collections sit behind one `RwLock`, so a cascading delete is applied
//! atomically. Upserts go through hash indexes keyed on the identifying
//! columns of each collection.
//!
//! Use this store for:
//! - Testing the query front end and the evaluator
//! - Embedding glite in applications that don't need persistence

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::model::*;
use crate::{Error, Result};
use super::{
    AttrId, AttributeRecord, Confirmation, EdgeRecord, EntityKind, GraphStore, NodeRecord, Record,
    StoreConfig,
};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory graph storage. Cloning shares the underlying data.
#[derive(Clone)]
pub struct MemoryStore {
    config: StoreConfig,
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    tables: RwLock<Tables>,
    next_node_id: AtomicU64,
    next_edge_id: AtomicU64,
    next_node_attr_id: AtomicU64,
    next_edge_attr_id: AtomicU64,
}

type AttrKey = (u64, String, String);

#[derive(Default)]
struct Tables {
    nodes: BTreeMap<NodeId, NodeRecord>,
    edges: BTreeMap<EdgeId, EdgeRecord>,
    node_attrs: BTreeMap<AttrId, AttributeRecord>,
    edge_attrs: BTreeMap<AttrId, AttributeRecord>,
    /// (label, type) → node
    node_keys: HashMap<(String, String), NodeId>,
    /// (label, source, target) → edge
    edge_keys: HashMap<(String, NodeId, NodeId), EdgeId>,
    node_attr_keys: HashMap<AttrKey, AttrId>,
    edge_attr_keys: HashMap<AttrKey, AttrId>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            inner: Arc::new(MemoryInner {
                tables: RwLock::new(Tables::default()),
                next_node_id: AtomicU64::new(1),
                next_edge_id: AtomicU64::new(1),
                next_node_attr_id: AtomicU64::new(1),
                next_edge_attr_id: AtomicU64::new(1),
            }),
        }
    }

    fn next_attr_id(&self, kind: EntityKind) -> AttrId {
        let counter = match kind {
            EntityKind::EdgeAttribute => &self.inner.next_edge_attr_id,
            _ => &self.inner.next_node_attr_id,
        };
        AttrId(counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.inner.tables.read();
        f.debug_struct("MemoryStore")
            .field("schema", &self.config.schema())
            .field("nodes", &tables.nodes.len())
            .field("edges", &tables.edges.len())
            .finish()
    }
}

// ============================================================================
// Table maintenance
// ============================================================================

impl Tables {
    fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(record) = self.nodes.remove(&id) else {
            return false;
        };
        self.node_keys.remove(&(record.label, record.node_type));

        let touching: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.source == id || e.target == id)
            .map(|e| e.id)
            .collect();
        for edge in touching {
            self.remove_edge(edge);
        }
        remove_owned(&mut self.node_attrs, &mut self.node_attr_keys, id.0);
        true
    }

    fn remove_edge(&mut self, id: EdgeId) -> bool {
        let Some(record) = self.edges.remove(&id) else {
            return false;
        };
        self.edge_keys.remove(&(record.label, record.source, record.target));
        remove_owned(&mut self.edge_attrs, &mut self.edge_attr_keys, id.0);
        true
    }

    fn remove_attr(&mut self, kind: EntityKind, id: AttrId) -> bool {
        let (rows, keys) = match kind {
            EntityKind::EdgeAttribute => (&mut self.edge_attrs, &mut self.edge_attr_keys),
            _ => (&mut self.node_attrs, &mut self.node_attr_keys),
        };
        match rows.remove(&id) {
            Some(row) => {
                keys.remove(&(row.owner, row.key, row.value));
                true
            }
            None => false,
        }
    }

    fn clear(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Node => *self = Tables::default(),
            EntityKind::Edge => {
                self.edges.clear();
                self.edge_keys.clear();
                self.edge_attrs.clear();
                self.edge_attr_keys.clear();
            }
            EntityKind::NodeAttribute => {
                self.node_attrs.clear();
                self.node_attr_keys.clear();
            }
            EntityKind::EdgeAttribute => {
                self.edge_attrs.clear();
                self.edge_attr_keys.clear();
            }
        }
    }

    fn attrs(&self, kind: EntityKind) -> &BTreeMap<AttrId, AttributeRecord> {
        match kind {
            EntityKind::EdgeAttribute => &self.edge_attrs,
            _ => &self.node_attrs,
        }
    }
}

fn remove_owned(
    rows: &mut BTreeMap<AttrId, AttributeRecord>,
    keys: &mut HashMap<AttrKey, AttrId>,
    owner: u64,
) {
    rows.retain(|_, row| {
        if row.owner == owner {
            keys.remove(&(row.owner, row.key.clone(), row.value.clone()));
            false
        } else {
            true
        }
    });
}

fn wrap_attr(kind: EntityKind, row: AttributeRecord) -> Record {
    match kind {
        EntityKind::EdgeAttribute => Record::EdgeAttribute(row),
        _ => Record::NodeAttribute(row),
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

#[async_trait]
impl GraphStore for MemoryStore {
    fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ========================================================================
    // Writes
    // ========================================================================

    async fn upsert_node(&self, label: &str, node_type: &str) -> Result<NodeId> {
        let mut tables = self.inner.tables.write();
        let key = (label.to_string(), node_type.to_string());
        if let Some(&id) = tables.node_keys.get(&key) {
            debug!(schema = self.config.schema(), %id, label, "node already exists");
            return Ok(id);
        }

        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        tables.nodes.insert(id, NodeRecord {
            id,
            label: label.to_string(),
            node_type: node_type.to_string(),
        });
        tables.node_keys.insert(key, id);
        debug!(schema = self.config.schema(), %id, label, node_type, "node created");
        Ok(id)
    }

    async fn upsert_edge(&self, label: &str, source: NodeId, target: NodeId) -> Result<EdgeId> {
        let mut tables = self.inner.tables.write();
        for endpoint in [source, target] {
            if !tables.nodes.contains_key(&endpoint) {
                return Err(Error::StorageError(format!(
                    "edge '{label}' references unknown node {endpoint}"
                )));
            }
        }

        let key = (label.to_string(), source, target);
        if let Some(&id) = tables.edge_keys.get(&key) {
            debug!(schema = self.config.schema(), %id, label, "edge already exists");
            return Ok(id);
        }

        let id = EdgeId(self.inner.next_edge_id.fetch_add(1, Ordering::Relaxed));
        tables.edges.insert(id, EdgeRecord { id, label: label.to_string(), source, target });
        tables.edge_keys.insert(key, id);
        debug!(schema = self.config.schema(), %id, label, %source, %target, "edge created");
        Ok(id)
    }

    async fn set_node_attribute(&self, node: NodeId, key: &str, value: &str) -> Result<AttrId> {
        let mut tables = self.inner.tables.write();
        if !tables.nodes.contains_key(&node) {
            return Err(Error::NotFound(format!("Node {node}")));
        }
        let lookup = (node.0, key.to_string(), value.to_string());
        if let Some(&id) = tables.node_attr_keys.get(&lookup) {
            return Ok(id);
        }

        let id = self.next_attr_id(EntityKind::NodeAttribute);
        tables.node_attrs.insert(id, AttributeRecord {
            id,
            owner: node.0,
            key: key.to_string(),
            value: value.to_string(),
        });
        tables.node_attr_keys.insert(lookup, id);
        debug!(schema = self.config.schema(), %id, %node, key, "node attribute set");
        Ok(id)
    }

    async fn set_edge_attribute(&self, edge: EdgeId, key: &str, value: &str) -> Result<AttrId> {
        let mut tables = self.inner.tables.write();
        if !tables.edges.contains_key(&edge) {
            return Err(Error::NotFound(format!("Edge {edge}")));
        }
        let lookup = (edge.0, key.to_string(), value.to_string());
        if let Some(&id) = tables.edge_attr_keys.get(&lookup) {
            return Ok(id);
        }

        let id = self.next_attr_id(EntityKind::EdgeAttribute);
        tables.edge_attrs.insert(id, AttributeRecord {
            id,
            owner: edge.0,
            key: key.to_string(),
            value: value.to_string(),
        });
        tables.edge_attr_keys.insert(lookup, id);
        debug!(schema = self.config.schema(), %id, %edge, key, "edge attribute set");
        Ok(id)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn read_nodes(&self) -> Result<Vec<NodeRecord>> {
        Ok(self.inner.tables.read().nodes.values().cloned().collect())
    }

    async fn read_edges(&self) -> Result<Vec<EdgeRecord>> {
        Ok(self.inner.tables.read().edges.values().cloned().collect())
    }

    async fn read_node_attributes(&self) -> Result<Vec<AttributeRecord>> {
        Ok(self.inner.tables.read().node_attrs.values().cloned().collect())
    }

    async fn read_edge_attributes(&self) -> Result<Vec<AttributeRecord>> {
        Ok(self.inner.tables.read().edge_attrs.values().cloned().collect())
    }

    async fn read_by_id(&self, kind: EntityKind, id: u64) -> Result<Option<Record>> {
        let tables = self.inner.tables.read();
        let record = match kind {
            EntityKind::Node => tables.nodes.get(&NodeId(id)).cloned().map(Record::Node),
            EntityKind::Edge => tables.edges.get(&EdgeId(id)).cloned().map(Record::Edge),
            EntityKind::NodeAttribute | EntityKind::EdgeAttribute => {
                tables.attrs(kind).get(&AttrId(id)).cloned().map(|row| wrap_attr(kind, row))
            }
        };
        if record.is_none() {
            debug!(schema = self.config.schema(), %kind, id, "no record with id");
        }
        Ok(record)
    }

    async fn read_by_label(&self, kind: EntityKind, label: &str) -> Result<Option<Record>> {
        let tables = self.inner.tables.read();
        let record = match kind {
            EntityKind::Node => tables
                .nodes
                .values()
                .find(|n| n.label == label)
                .cloned()
                .map(Record::Node),
            EntityKind::Edge => tables
                .edges
                .values()
                .find(|e| e.label == label)
                .cloned()
                .map(Record::Edge),
            EntityKind::NodeAttribute | EntityKind::EdgeAttribute => tables
                .attrs(kind)
                .values()
                .find(|a| a.key == label)
                .cloned()
                .map(|row| wrap_attr(kind, row)),
        };
        Ok(record)
    }

    // ========================================================================
    // Deletes
    // ========================================================================

    async fn delete_by_id(&self, kind: EntityKind, id: u64, confirm: Confirmation) -> Result<bool> {
        if !confirm.is_confirmed() {
            info!(schema = self.config.schema(), %kind, id, "delete declined; nothing removed");
            return Ok(false);
        }

        let mut tables = self.inner.tables.write();
        let removed = match kind {
            EntityKind::Node => tables.remove_node(NodeId(id)),
            EntityKind::Edge => tables.remove_edge(EdgeId(id)),
            EntityKind::NodeAttribute | EntityKind::EdgeAttribute => {
                tables.remove_attr(kind, AttrId(id))
            }
        };
        info!(schema = self.config.schema(), %kind, id, removed, "delete");
        Ok(removed)
    }

    async fn drop_collection(&self, kind: EntityKind, confirm: Confirmation) -> Result<bool> {
        if !confirm.is_confirmed() {
            info!(schema = self.config.schema(), %kind, "drop declined; collection kept");
            return Ok(false);
        }

        self.inner.tables.write().clear(kind);
        info!(schema = self.config.schema(), %kind, "collection dropped");
        Ok(true)
    }
}
