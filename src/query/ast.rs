//! Query AST (Abstract Syntax Tree)
//!
//! These types represent one parsed query. They are pure data:
//! no behavior beyond small accessors, no graph references.

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

use crate::model::Value;

/// A complete query: `MATCH <path> [WHERE <comparison>] [RETURN ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub expr: PathPatternExpr,
    pub where_clause: Option<ComparisonExpr>,
    pub return_clause: Option<ReturnClause>,
}

/// Alternating node and edge patterns: `(a)-[r]->(b)-[s]-(c)`.
///
/// Always holds exactly one more node than edges.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPatternExpr {
    pub nodes: Vec<NodePattern>,
    pub edges: Vec<EdgePattern>,
}

impl PathPatternExpr {
    /// Every variable declared in the path, in pattern order, duplicates kept.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        let first = self.nodes.first().into_iter().map(|n| &n.filler);
        let rest = self
            .edges
            .iter()
            .zip(self.nodes.iter().skip(1))
            .flat_map(|(e, n)| [&e.filler, &n.filler]);
        first.chain(rest).filter_map(|f| f.variable.as_deref())
    }
}

/// Node pattern: `(alias:Type {key: value})`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub filler: ElementFiller,
}

/// Edge pattern: `-[alias:Type {key: value}]->`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgePattern {
    pub filler: ElementFiller,
    pub direction: EdgeDirection,
}

/// What a node or edge slot constrains: binding variable, type and attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementFiller {
    pub variable: Option<String>,
    /// Compared case-insensitively against the element's type.
    pub type_label: Option<String>,
    /// Required attributes, compared by their text form.
    pub properties: HashMap<String, Value>,
}

/// Edge pattern direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    /// `<-[...]-`
    Left,
    /// `-[...]->`
    Right,
    /// `-[...]-`
    #[default]
    Undirected,
}

/// WHERE predicate: `var.attr OP value`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExpr {
    pub variable: String,
    pub attribute: String,
    pub operator: CompareOp,
    pub value: Operand,
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// String, number, or bare identifier (kept as text).
    Literal(Value),
    /// `${name}`, resolved from the caller's parameters at evaluation time.
    Parameter(String),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    /// Alias of `Eq`.
    Near,
    In,
    NotIn,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Lte => "<=",
            CompareOp::Gte => ">=",
            CompareOp::Near => "NEAR",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT_IN",
        })
    }
}

/// RETURN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    pub distinct: bool,
    pub items: Vec<Projection>,
}

/// One entry of a RETURN clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Item(ReturnItem),
    Function(FunctionExpr),
}

/// `var`, `var.attr`, optionally `AS alias`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub variable: String,
    pub attribute: Option<String>,
    pub alias: Option<String>,
}

impl ReturnItem {
    /// Output column: alias, else `var.attr`, else `var`.
    pub fn key(&self) -> String {
        match (&self.alias, &self.attribute) {
            (Some(alias), _) => alias.clone(),
            (None, Some(attr)) => format!("{}.{}", self.variable, attr),
            (None, None) => self.variable.clone(),
        }
    }
}

/// Function call in RETURN: `COUNT(*)`, `COUNT(a) AS n`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    /// Upper-cased at parse time.
    pub name: String,
    pub args: SmallVec<[FunctionArg; 1]>,
    pub alias: Option<String>,
}

impl FunctionExpr {
    /// Output column: alias, else `NAME(arg, ...)`.
    pub fn key(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, args.join(", "))
    }
}

/// Function argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionArg {
    Star,
    Variable(String),
}

impl fmt::Display for FunctionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionArg::Star => f.write_str("*"),
            FunctionArg::Variable(v) => f.write_str(v),
        }
    }
}
