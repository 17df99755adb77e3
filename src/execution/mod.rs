//! Query evaluation engine.
//!
//! Executes a parsed [`PathPattern`] against a [`Graph`] snapshot:
//! path matching → WHERE filtering → projection / aggregation.
//! Synchronous and side-effect free apart from optional `tracing` events.

pub mod filter;
pub mod matcher;
pub mod project;

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::model::*;
use crate::query::ast::PathPattern;
use crate::{Error, Result};

pub use matcher::{Bindings, Element, Match, PathMatcher};

/// Parameters substituted for `${name}` references in WHERE.
pub type Params = HashMap<String, Value>;

// ============================================================================
// Configuration
// ============================================================================

/// Evaluator configuration.
///
/// Logging goes through `tracing`. With `trace` off (the default) the
/// evaluator emits no per-match events at all. `dispatch` injects a
/// subscriber for the duration of one evaluation, so a caller can capture
/// traces without installing a global subscriber.
#[derive(Debug, Clone, Default)]
pub struct EvalConfig {
    pub trace: bool,
    pub dispatch: Option<tracing::Dispatch>,
}

impl EvalConfig {
    /// Trace into the given subscriber.
    pub fn traced(dispatch: tracing::Dispatch) -> Self {
        Self { trace: true, dispatch: Some(dispatch) }
    }
}

// ============================================================================
// Result rows
// ============================================================================

/// One output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Node(Node),
    Edge(Edge),
    Value(Value),
    /// Selected attribute absent on the bound element.
    Null,
}

impl Field {
    pub fn type_name(&self) -> &'static str {
        match self {
            Field::Node(_) => "NODE",
            Field::Edge(_) => "EDGE",
            Field::Value(v) => v.type_name(),
            Field::Null => "NULL",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }
}

impl From<Value> for Field {
    fn from(v: Value) -> Self { Field::Value(v) }
}

/// A single row in the result set: output keys in projection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    fields: Vec<(String, Field)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, field: Field) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((key, field)),
        }
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    /// Get a typed value from the row.
    pub fn get<T: FromField>(&self, key: &str) -> Result<T> {
        let field = self.field(key)
            .ok_or_else(|| Error::NotFound(format!("Column '{key}'")))?;
        T::from_field(field)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON object with scalars rendered as plain JSON values.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Field::Node(n) => n.serialize(serializer),
            Field::Edge(e) => e.serialize(serializer),
            Field::Value(Value::Int(i)) => serializer.serialize_i64(*i),
            Field::Value(Value::Float(f)) => serializer.serialize_f64(*f),
            Field::Value(Value::Text(s)) => serializer.serialize_str(s),
            Field::Null => serializer.serialize_unit(),
        }
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, field) in &self.fields {
            map.serialize_entry(key, field)?;
        }
        map.end()
    }
}

/// Convert from a result field to concrete types.
pub trait FromField: Sized {
    fn from_field(field: &Field) -> Result<Self>;
}

fn type_error(expected: &str, field: &Field) -> Error {
    Error::TypeError {
        expected: expected.into(),
        got: field.type_name().into(),
    }
}

impl FromField for Field {
    fn from_field(field: &Field) -> Result<Self> {
        Ok(field.clone())
    }
}

impl FromField for Node {
    fn from_field(field: &Field) -> Result<Self> {
        match field {
            Field::Node(n) => Ok(n.clone()),
            _ => Err(type_error("Node", field)),
        }
    }
}

impl FromField for Edge {
    fn from_field(field: &Field) -> Result<Self> {
        match field {
            Field::Edge(e) => Ok(e.clone()),
            _ => Err(type_error("Edge", field)),
        }
    }
}

impl FromField for Value {
    fn from_field(field: &Field) -> Result<Self> {
        match field {
            Field::Value(v) => Ok(v.clone()),
            _ => Err(type_error("Value", field)),
        }
    }
}

impl FromField for String {
    fn from_field(field: &Field) -> Result<Self> {
        match field {
            Field::Value(Value::Text(s)) => Ok(s.clone()),
            _ => Err(type_error("Text", field)),
        }
    }
}

impl FromField for i64 {
    fn from_field(field: &Field) -> Result<Self> {
        match field {
            Field::Value(v) => v.as_int().ok_or_else(|| type_error("Integer", field)),
            _ => Err(type_error("Integer", field)),
        }
    }
}

impl FromField for f64 {
    fn from_field(field: &Field) -> Result<Self> {
        match field {
            Field::Value(v) => v.as_float().ok_or_else(|| type_error("Float", field)),
            _ => Err(type_error("Float", field)),
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates queries against one borrowed graph snapshot.
///
/// The shared borrow is the concurrency contract: the graph cannot be
/// mutated while an evaluator exists.
#[derive(Debug, Clone)]
pub struct Evaluator<'g> {
    graph: &'g Graph,
    config: EvalConfig,
}

impl<'g> Evaluator<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self::with_config(graph, EvalConfig::default())
    }

    pub fn with_config(graph: &'g Graph, config: EvalConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run a query: match, filter, project.
    ///
    /// Only an unsupported or mis-called function fails; everything the
    /// data cannot satisfy just produces fewer rows.
    pub fn evaluate(&self, pattern: &PathPattern, params: &Params) -> Result<Vec<ResultRow>> {
        match &self.config.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || self.run(pattern, params)),
            None => self.run(pattern, params),
        }
    }

    /// All matches of the path pattern, before WHERE.
    pub fn matches<'p>(&self, pattern: &'p PathPattern) -> Vec<Match<'p>>
    where
        'g: 'p,
    {
        PathMatcher::new(self.graph, &pattern.expr)
            .traced(self.config.trace)
            .find_all()
    }

    fn run(&self, pattern: &PathPattern, params: &Params) -> Result<Vec<ResultRow>> {
        let trace = self.config.trace;
        let mut matches = self.matches(pattern);
        let found = matches.len();

        if let Some(cmp) = &pattern.where_clause {
            matches.retain(|m| match filter::evaluate_where(cmp, m, params) {
                Ok(()) => true,
                Err(reason) => {
                    if trace {
                        debug!(bindings = %m, %reason, "match rejected by WHERE");
                    }
                    false
                }
            });
        }

        let rows = match &pattern.return_clause {
            Some(clause) => project::project(&matches, clause)?,
            None => matches.iter().map(Bindings::to_row).collect(),
        };

        if trace {
            debug!(matches = found, kept = matches.len(), rows = rows.len(), "evaluation finished");
        }
        Ok(rows)
    }
}

/// Evaluate a parsed query with default configuration.
pub fn evaluate(pattern: &PathPattern, graph: &Graph, params: &Params) -> Result<Vec<ResultRow>> {
    Evaluator::new(graph).evaluate(pattern, params)
}
