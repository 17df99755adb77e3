//! JSON export / import of graph snapshots.
//!
//! ```text
//! Graph / GraphStore → export_json() → {"nodes": [...], "edges": [...]}
//!   → import_json() → Graph
//! ```
//!
//! Values keep their type tags, so an exported graph imports unchanged.

use std::io::{Read, Write};

use tracing::debug;

use crate::model::Graph;
use crate::storage::GraphStore;
use crate::Result;

/// Write a graph as pretty-printed JSON.
pub fn export_json(graph: &Graph, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, graph)?;
    writeln!(writer)?;
    debug!(nodes = graph.node_count(), edges = graph.edge_count(), "graph exported");
    Ok(())
}

/// Read a graph written by [`export_json`].
pub fn import_json(reader: &mut dyn Read) -> Result<Graph> {
    let graph: Graph = serde_json::from_reader(reader)?;
    debug!(nodes = graph.node_count(), edges = graph.edge_count(), "graph imported");
    Ok(graph)
}

/// Snapshot a store and export it.
pub async fn export_store_json<S: GraphStore>(store: &S, writer: &mut (dyn Write + Send)) -> Result<()> {
    let graph = store.snapshot().await?;
    export_json(&graph, writer)
}
