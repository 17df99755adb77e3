//! # glite: path-pattern queries over a property graph
//!
//! A small declarative query language evaluated against an in-memory
//! property graph.
//!
//! ## Design Principles
//!
//! 1. **Parser owns nothing**: query text → AST is a pure function
//! 2. **Clean DTOs**: `Node`, `Edge`, `Value` cross all boundaries
//! 3. **Snapshot evaluation**: the evaluator reads a borrowed `Graph` and never mutates it
//! 4. **Trait-first storage**: `GraphStore` is the contract between the engine and persistence
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glite::{Database, Params, StoreConfig, GraphStore};
//!
//! # async fn example() -> glite::Result<()> {
//! let db = Database::open_memory(StoreConfig::new("demo")?);
//! let alice = db.store().upsert_node("alice", "Person").await?;
//! let bob = db.store().upsert_node("bob", "Person").await?;
//! db.store().upsert_edge("KNOWS", alice, bob).await?;
//!
//! let rows = db.execute(
//!     "MATCH (a:Person)-[:KNOWS]->(b) RETURN a.label, b.label AS friend",
//!     &Params::new(),
//! ).await?;
//!
//! for row in &rows {
//!     println!("{}", row.get::<String>("friend")?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! text → query::lexer → query::parser → PathPattern
//!      → execution::matcher → execution::filter → execution::project → rows
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod query;
pub mod execution;
pub mod storage;
pub mod export;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{attribute_map, AttributeMap, Edge, EdgeId, Graph, Node, NodeId, Value};

// ============================================================================
// Re-exports: Query + Execution
// ============================================================================

pub use query::{parse, PathPattern};
pub use execution::{evaluate, EvalConfig, Evaluator, Field, FromField, Params, ResultRow};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{
    AttrId, AttributeRecord, Confirmation, EdgeRecord, EntityKind, GraphStore, MemoryStore,
    NodeRecord, Record, StoreConfig,
};

// ============================================================================
// Top-level Database handle
// ============================================================================

/// The primary entry point. A `Database` wraps a store and runs queries
/// against a fresh snapshot of it.
pub struct Database<S: GraphStore> {
    store: S,
}

impl<S: GraphStore> Database<S> {
    /// Create a Database over the given store.
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    /// Run a query with default (silent) evaluation.
    pub async fn execute(&self, query: &str, params: &Params) -> Result<Vec<ResultRow>> {
        self.execute_with(query, params, EvalConfig::default()).await
    }

    /// Run a query with an explicit evaluator configuration.
    pub async fn execute_with(
        &self,
        query: &str,
        params: &Params,
        config: EvalConfig,
    ) -> Result<Vec<ResultRow>> {
        // Phase 1: Parse (fails fast, before touching the store)
        let pattern = query::parse(query)?;

        // Phase 2: Snapshot
        let graph = self.store.snapshot().await?;

        // Phase 3: Evaluate
        Evaluator::with_config(&graph, config).evaluate(&pattern, params)
    }

    /// Access the underlying store for writes and raw reads.
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// In-memory database for testing and embedding.
impl Database<MemoryStore> {
    pub fn open_memory(config: StoreConfig) -> Self {
        Self::with_store(MemoryStore::new(config))
    }
}

/// Parse and evaluate a query against a graph in one call.
pub fn query(text: &str, graph: &Graph, params: &Params) -> Result<Vec<ResultRow>> {
    let pattern = query::parse(text)?;
    evaluate(&pattern, graph, params)
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Lex error at position {position}: {message}")]
    LexError { position: usize, message: String },

    #[error("Syntax error at position {position} (token {token_index}): expected {expected}, found {found}")]
    SyntaxError {
        expected: String,
        found: String,
        position: usize,
        token_index: usize,
    },

    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    #[error("Invalid arguments to {function}: {message}")]
    InvalidArguments { function: String, message: String },

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
