//! RETURN: projection, aggregation and DISTINCT.

use crate::model::Value;
use crate::query::ast::{FunctionArg, FunctionExpr, Projection, ReturnClause, ReturnItem};
use crate::{Error, Result};

use super::{Field, Match, ResultRow};

/// Evaluate a function over the full set of surviving matches.
pub fn aggregate(function: &FunctionExpr, matches: &[Match<'_>]) -> Result<Value> {
    match function.name.as_str() {
        "COUNT" => match function.args.as_slice() {
            [FunctionArg::Star] => Ok(count(matches.len())),
            [FunctionArg::Variable(var)] => {
                Ok(count(matches.iter().filter(|m| m.contains(var)).count()))
            }
            args => Err(Error::InvalidArguments {
                function: function.name.clone(),
                message: format!("expected `*` or a single variable, got {} arguments", args.len()),
            }),
        },
        other => Err(Error::UnsupportedFunction(other.to_string())),
    }
}

fn count(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// One item of one row. `None` when the variable is unbound.
fn project_item(item: &ReturnItem, m: &Match<'_>) -> Option<Field> {
    let element = m.get(&item.variable)?;
    Some(match &item.attribute {
        None => element.to_field(),
        Some(attr) => element.get(attr).cloned().map_or(Field::Null, Field::Value),
    })
}

/// Build output rows for a RETURN clause.
///
/// Functions are computed once, up front. A clause whose only item is a
/// function yields a single row; otherwise there is one row per match and
/// function results are repeated in each.
pub fn project(matches: &[Match<'_>], clause: &ReturnClause) -> Result<Vec<ResultRow>> {
    let aggregates = clause
        .items
        .iter()
        .map(|item| match item {
            Projection::Function(f) => aggregate(f, matches).map(Some),
            Projection::Item(_) => Ok(None),
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = if let [Projection::Function(f)] = clause.items.as_slice() {
        let mut row = ResultRow::new();
        if let Some(Some(value)) = aggregates.first() {
            row.insert(f.key(), Field::Value(value.clone()));
        }
        vec![row]
    } else {
        matches
            .iter()
            .map(|m| {
                let mut row = ResultRow::new();
                for (item, agg) in clause.items.iter().zip(&aggregates) {
                    match (item, agg) {
                        (Projection::Function(f), Some(value)) => {
                            row.insert(f.key(), Field::Value(value.clone()));
                        }
                        (Projection::Item(item), _) => {
                            if let Some(field) = project_item(item, m) {
                                row.insert(item.key(), field);
                            }
                        }
                        (Projection::Function(_), None) => {}
                    }
                }
                row
            })
            .collect()
    };

    Ok(if clause.distinct { distinct(rows) } else { rows })
}

/// Drop rows equal to an earlier row; first occurrences keep their order.
///
/// Quadratic in the row count: rows may hold floats and are compared, not hashed.
pub fn distinct(rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let mut out: Vec<ResultRow> = Vec::with_capacity(rows.len());
    for row in rows {
        if !out.contains(&row) {
            out.push(row);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::PathMatcher;
    use crate::model::*;
    use crate::query::parse;
    use pretty_assertions::assert_eq;

    fn graph() -> Graph {
        let mut g = Graph::new();
        g.add_node(1, "Person", attribute_map([("name", "Ann"), ("city", "Oslo")]));
        g.add_node(2, "Person", attribute_map([("name", "Ben"), ("city", "Oslo")]));
        g.add_node(3, "Person", attribute_map([("name", "Cy")]));
        g
    }

    fn run(query: &str) -> Result<Vec<ResultRow>> {
        let g = graph();
        let q = parse(query).unwrap();
        let matches = PathMatcher::new(&g, &q.expr).find_all();
        project(&matches, q.return_clause.as_ref().unwrap())
    }

    #[test]
    fn test_pure_aggregation_is_one_row() {
        let rows = run("MATCH (p) RETURN COUNT(*) AS n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<i64>("n").unwrap(), 3);
    }

    #[test]
    fn test_count_is_broadcast_next_to_items() {
        let rows = run("MATCH (p) RETURN p.name, COUNT(p)").unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.keys().collect::<Vec<_>>(), vec!["p.name", "COUNT(p)"]);
            assert_eq!(row.get::<i64>("COUNT(p)").unwrap(), 3);
        }
    }

    #[test]
    fn test_count_unbound_variable_is_zero() {
        let rows = run("MATCH (p) RETURN COUNT(q)").unwrap();
        assert_eq!(rows[0].get::<i64>("COUNT(q)").unwrap(), 0);
    }

    #[test]
    fn test_missing_attribute_is_null_and_unbound_is_skipped() {
        let rows = run("MATCH (p) RETURN p.city, q").unwrap();
        assert_eq!(rows[2].field("p.city"), Some(&Field::Null));
        assert!(!rows[0].contains_key("q"));
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let rows = run("MATCH (p) RETURN DISTINCT p.city AS c").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<String>("c").unwrap(), "Oslo");
        assert!(rows[1].field("c").is_some_and(Field::is_null));
    }

    #[test]
    fn test_function_errors() {
        assert!(matches!(run("MATCH (p) RETURN SUM(p)"), Err(Error::UnsupportedFunction(f)) if f == "SUM"));
        assert!(matches!(run("MATCH (p) RETURN COUNT()"), Err(Error::InvalidArguments { .. })));
        assert!(matches!(run("MATCH (p) RETURN COUNT(p, p)"), Err(Error::InvalidArguments { .. })));
    }

    #[test]
    fn test_empty_matches_pure_aggregation() {
        let matches: Vec<Match<'_>> = Vec::new();
        let q = parse("MATCH (p) RETURN count(*)").unwrap();
        let rows = project(&matches, q.return_clause.as_ref().unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<i64>("COUNT(*)").unwrap(), 0);
    }
}
