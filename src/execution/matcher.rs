//! Path matching: enumerate every assignment of graph elements to the
//! slots of a [`PathPatternExpr`].
//!
//! Depth-first over an explicit stack, so deep patterns cannot overflow
//! the call stack. Each frame owns its bindings; branching clones them,
//! which keeps sibling branches from seeing each other's assignments.

use std::fmt;

use smallvec::{smallvec, SmallVec};
use tracing::trace;

use crate::model::*;
use crate::model::attributes::matches_text;
use crate::query::ast::{EdgeDirection, EdgePattern, ElementFiller, NodePattern, PathPatternExpr};

use super::{Field, ResultRow};

/// A matched graph element.
#[derive(Debug, Clone, Copy)]
pub enum Element<'a> {
    Node(&'a Node),
    Edge(&'a Edge),
}

impl<'a> Element<'a> {
    /// Same kind and same id.
    pub fn same_as(&self, other: &Element<'_>) -> bool {
        match (self, other) {
            (Element::Node(a), Element::Node(b)) => a.id == b.id,
            (Element::Edge(a), Element::Edge(b)) => a.id == b.id,
            _ => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        match *self {
            Element::Node(n) => n.get(key),
            Element::Edge(e) => e.get(key),
        }
    }

    pub fn as_node(&self) -> Option<&'a Node> {
        match *self {
            Element::Node(n) => Some(n),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&'a Edge> {
        match *self {
            Element::Edge(e) => Some(e),
            Element::Node(_) => None,
        }
    }

    pub fn to_field(&self) -> Field {
        match *self {
            Element::Node(n) => Field::Node(n.clone()),
            Element::Edge(e) => Field::Edge(e.clone()),
        }
    }
}

/// Variable → element, in binding order.
#[derive(Debug, Clone, Default)]
pub struct Bindings<'a> {
    entries: SmallVec<[(&'a str, Element<'a>); 4]>,
}

/// One complete match of a path pattern.
pub type Match<'a> = Bindings<'a>;

impl<'a> Bindings<'a> {
    pub fn get(&self, variable: &str) -> Option<Element<'a>> {
        self.entries.iter().find(|(v, _)| *v == variable).map(|(_, e)| *e)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Element<'a>)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind `variable` to `element`.
    ///
    /// Returns `false` if the variable is already bound to a different
    /// element (or to an element of the other kind); rebinding to the same
    /// element is a no-op. Anonymous slots always succeed.
    pub fn bind(&mut self, variable: Option<&'a str>, element: Element<'a>) -> bool {
        let Some(variable) = variable else { return true };
        match self.get(variable) {
            Some(bound) => bound.same_as(&element),
            None => {
                self.entries.push((variable, element));
                true
            }
        }
    }

    /// Every binding as a row, keyed by variable name.
    pub fn to_row(&self) -> ResultRow {
        let mut row = ResultRow::new();
        for (variable, element) in &self.entries {
            row.insert(*variable, element.to_field());
        }
        row
    }
}

/// `a=node:1 r=edge:7`, in binding order.
impl fmt::Display for Bindings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (variable, element)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match element {
                Element::Node(n) => write!(f, "{variable}=node:{}", n.id)?,
                Element::Edge(e) => write!(f, "{variable}=edge:{}", e.id)?,
            }
        }
        Ok(())
    }
}

/// Does a node satisfy a node slot's type and attribute constraints?
pub fn node_matches(node: &Node, filler: &ElementFiller) -> bool {
    filler.type_label.as_deref().is_none_or(|t| node.has_type(t))
        && matches_text(&node.attributes, &filler.properties)
}

/// Does an edge satisfy an edge slot's type and attribute constraints?
pub fn edge_matches(edge: &Edge, filler: &ElementFiller) -> bool {
    filler.type_label.as_deref().is_none_or(|t| edge.has_type(t))
        && matches_text(&edge.attributes, &filler.properties)
}

/// The far end of `edge` when leaving `from` in `direction`, if the edge
/// can be traversed that way at all.
fn far_end(edge: &Edge, from: NodeId, direction: EdgeDirection) -> Option<NodeId> {
    match direction {
        EdgeDirection::Right => (edge.source == from).then_some(edge.target),
        EdgeDirection::Left => (edge.target == from).then_some(edge.source),
        EdgeDirection::Undirected => edge.other_end(from),
    }
}

struct Frame<'a> {
    /// Index of the node slot `current` occupies.
    position: usize,
    current: &'a Node,
    bindings: Bindings<'a>,
    /// Nodes already on this path; a node appears at most once.
    path: SmallVec<[NodeId; 8]>,
}

/// Enumerates matches of one path pattern over one graph.
pub struct PathMatcher<'a> {
    graph: &'a Graph,
    expr: &'a PathPatternExpr,
    trace: bool,
}

impl<'a> PathMatcher<'a> {
    pub fn new(graph: &'a Graph, expr: &'a PathPatternExpr) -> Self {
        Self { graph, expr, trace: false }
    }

    /// Emit a `trace` event per expansion step.
    pub fn traced(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// All matches, grouped by start node in node order, then in
    /// depth-first order following each node's incident-edge order.
    pub fn find_all(&self) -> Vec<Match<'a>> {
        let (graph, expr) = (self.graph, self.expr);
        let Some(first) = expr.nodes.first() else {
            return Vec::new();
        };
        if expr.edges.len() + 1 != expr.nodes.len() {
            return Vec::new();
        }

        let mut out = Vec::new();
        let starts: Vec<&'a Node> = graph
            .nodes_matching(first.filler.type_label.as_deref(), &first.filler.properties)
            .collect();
        if self.trace {
            trace!(candidates = ?starts.iter().map(|n| n.id.0).collect::<Vec<_>>(), "start candidates");
        }

        for start in starts {
            let mut bindings = Bindings::default();
            bindings.bind(first.filler.variable.as_deref(), Element::Node(start));
            let mut stack = vec![Frame {
                position: 0,
                current: start,
                bindings,
                path: smallvec![start.id],
            }];

            while let Some(frame) = stack.pop() {
                if frame.position + 1 == expr.nodes.len() {
                    if self.trace {
                        trace!(bindings = %frame.bindings, "match found");
                    }
                    out.push(frame.bindings);
                    continue;
                }
                let children = self.expand(&frame);
                // reversed so the first candidate is popped first
                stack.extend(children.into_iter().rev());
            }
        }
        out
    }

    fn expand(&self, frame: &Frame<'a>) -> Vec<Frame<'a>> {
        let (graph, expr) = (self.graph, self.expr);
        let (Some(edge_pattern), Some(next_pattern)) =
            (expr.edges.get(frame.position), expr.nodes.get(frame.position + 1))
        else {
            return Vec::new();
        };
        let from = frame.current.id;

        let mut children = Vec::new();
        for edge in graph.incident_edges(from) {
            let Some(far) = far_end(edge, from, edge_pattern.direction) else { continue };
            if !edge_matches(edge, &edge_pattern.filler) {
                continue;
            }
            let Some(next) = graph.node(far) else { continue };
            if frame.path.contains(&next.id) || !node_matches(next, &next_pattern.filler) {
                continue;
            }

            let mut bindings = frame.bindings.clone();
            if !bindings.bind(edge_pattern.filler.variable.as_deref(), Element::Edge(edge))
                || !bindings.bind(next_pattern.filler.variable.as_deref(), Element::Node(next))
            {
                continue;
            }

            let mut path = frame.path.clone();
            path.push(next.id);
            children.push(Frame { position: frame.position + 1, current: next, bindings, path });
        }

        if self.trace {
            trace!(node = %from, step = frame.position, candidates = children.len(), "expanded");
        }
        children
    }
}
