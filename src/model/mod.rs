//! # Property Graph Model
//!
//! Plain DTOs shared by the evaluator, the store and callers.
//! Pure data: no I/O, no async.

pub mod attributes;
pub mod edge;
pub mod graph;
pub mod node;
pub mod value;

pub use attributes::{attribute_map, AttributeMap};
pub use edge::{Edge, EdgeId};
pub use graph::Graph;
pub use node::{Node, NodeId};
pub use value::Value;
