//! End-to-end tests for the full query pipeline.
//!
//! Each test exercises: lex -> parse -> match -> filter -> project against an
//! in-memory `Graph`, through `glite::query()`.

use glite::{attribute_map, AttributeMap, Error, Field, Graph, Node, NodeId, Params, Value};
use pretty_assertions::assert_eq;

/// Alice -[:KNOWS]-> Bob.
fn people() -> Graph {
    let mut g = Graph::new();
    g.add_node(1, "Person", attribute_map([("name", "Alice")]));
    g.add_node(2, "Person", attribute_map([("name", "Bob")]));
    g.add_edge(10, 1, 2, "KNOWS", AttributeMap::new());
    g
}

// ============================================================================
// 1. Traverse one edge, project attributes
// ============================================================================

#[test]
fn test_single_hop_projection() {
    let g = people();
    let rows = glite::query(
        "MATCH (a:Person)-[r:KNOWS]->(b:Person) RETURN a.name, b.name",
        &g,
        &Params::new(),
    )
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["a.name", "b.name"]);
    assert_eq!(rows[0].get::<String>("a.name").unwrap(), "Alice");
    assert_eq!(rows[0].get::<String>("b.name").unwrap(), "Bob");
    assert_eq!(
        rows[0].to_json().unwrap(),
        serde_json::json!({"a.name": "Alice", "b.name": "Bob"})
    );
}

// ============================================================================
// 2. WHERE selects a node; whole element returned
// ============================================================================

#[test]
fn test_where_returns_whole_node() {
    let g = people();
    let rows = glite::query("MATCH (a:Person) WHERE a.name = 'Bob' RETURN a", &g, &Params::new()).unwrap();

    assert_eq!(rows.len(), 1);
    let node: Node = rows[0].get("a").unwrap();
    assert_eq!(node.id, NodeId(2));
    assert_eq!(node.get("name"), Some(&Value::from("Bob")));
}

// ============================================================================
// 3. COUNT(*) alone collapses to one row
// ============================================================================

#[test]
fn test_count_star() {
    let g = people();
    let rows = glite::query("MATCH (a:Person) RETURN COUNT(*)", &g, &Params::new()).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<i64>("COUNT(*)").unwrap(), 2);
}

// ============================================================================
// 4. Unsatisfiable pattern is empty, not an error
// ============================================================================

#[test]
fn test_missing_type_yields_no_rows() {
    let g = people();
    let rows = glite::query("MATCH (c:Company) RETURN c", &g, &Params::new()).unwrap();
    assert!(rows.is_empty());

    let rows = glite::query("MATCH (a:Person)-[:KNOWS]->(c:Company) RETURN c", &g, &Params::new()).unwrap();
    assert!(rows.is_empty());
}

// ============================================================================
// 5. Malformed query fails fast with position and token kind
// ============================================================================

#[test]
fn test_missing_rparen_is_syntax_error() {
    let g = people();
    let err = glite::query("MATCH (a RETURN a", &g, &Params::new()).unwrap_err();

    match &err {
        Error::SyntaxError { expected, found, position, .. } => {
            assert_eq!(expected, "RPAREN");
            assert_eq!(found, "RETURN");
            assert_eq!(*position, 9);
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
    assert!(err.to_string().contains("RPAREN"));
}

#[test]
fn test_unknown_character_is_lex_error() {
    let err = glite::query("MATCH (a) RETURN a#", &people(), &Params::new()).unwrap_err();
    assert!(matches!(err, Error::LexError { position: 18, .. }));
}

// ============================================================================
// 6. Keywords are case-insensitive; types too
// ============================================================================

#[test]
fn test_lowercase_keywords_and_types() {
    let g = people();
    let rows = glite::query("match (a:person) where a.name = 'Alice' return a.name as who", &g, &Params::new()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<String>("who").unwrap(), "Alice");
}

// ============================================================================
// 7. No RETURN: every binding comes back
// ============================================================================

#[test]
fn test_without_return_yields_bindings() {
    let g = people();
    let rows = glite::query("MATCH (a)-[r]->(b)", &g, &Params::new()).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["a", "r", "b"]);
    assert!(matches!(rows[0].field("r"), Some(Field::Edge(e)) if e.id.0 == 10));
}

// ============================================================================
// 8. Inline attribute constraints compare by text
// ============================================================================

#[test]
fn test_inline_attributes() {
    let mut g = people();
    g.add_node(3, "Person", attribute_map([("name", Value::from("Cy")), ("age", Value::Int(41))]));

    let rows = glite::query("MATCH (p {age: '41'}) RETURN p.name", &g, &Params::new()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<String>("p.name").unwrap(), "Cy");

    let rows = glite::query("MATCH (p:Person {name: \"Alice\", age: 41}) RETURN p", &g, &Params::new()).unwrap();
    assert!(rows.is_empty());
}
