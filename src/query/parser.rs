//! Query recursive descent parser.
//!
//! Parses token streams into a [`PathPattern`]. Grammar:
//!
//! ```text
//! PathPattern     := "MATCH" PathPatternExpr ("WHERE" ComparisonExpr)? ReturnClause?
//! PathPatternExpr := NodePattern (EdgePattern NodePattern)*
//! NodePattern     := "(" ElementFiller ")"
//! EdgePattern     := "<-" "[" ElementFiller "]" "-"
//!                  | "-" "[" ElementFiller "]" "->"?
//! ElementFiller   := IDENT? (":" IDENT)? ("{" (IDENT ":" Literal ("," IDENT ":" Literal)*)? "}")?
//! ComparisonExpr  := IDENT "." IDENT CompareOp (PARAM | IDENT | NUMBER | STRING)
//! ReturnClause    := "RETURN" "DISTINCT"? ReturnItem ("," ReturnItem)*
//! ReturnItem      := FunctionExpr | IDENT ("." IDENT)? ("AS" IDENT)?
//! FunctionExpr    := IDENT "(" ( "*" | IDENT ("," IDENT)* )? ")" ("AS" IDENT)?
//! ```
//!
//! Single forward cursor, one token of extra lookahead (to tell `COUNT(` from
//! a variable). No error recovery: the first mismatch is the result.

use std::collections::HashMap;

use smallvec::SmallVec;

use super::ast::*;
use super::lexer::{Token, TokenKind};
use crate::model::Value;
use crate::{Error, Result};

/// Parser state: wraps a token slice with cursor.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens.get(self.pos + offset).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'t Token> {
        if self.at(kind) {
            if let Some(tok) = self.advance() {
                return Ok(tok);
            }
        }
        Err(self.error(kind.name()))
    }

    fn expect_ident(&mut self) -> Result<String> {
        Ok(self.expect(TokenKind::Identifier)?.text.clone())
    }

    fn error(&self, expected: &str) -> Error {
        let (found, position) = match self.peek() {
            Some(tok) => (tok.kind.name(), tok.span.start),
            None => (
                TokenKind::Eof.name(),
                self.tokens.last().map_or(0, |t| t.span.end),
            ),
        };
        Error::SyntaxError {
            expected: expected.to_string(),
            found: found.to_string(),
            position,
            token_index: self.pos,
        }
    }
}

/// Parse a token stream into a query AST.
///
/// The stream may or may not end with an `Eof` token; anything left over
/// after the query is a syntax error.
pub fn parse_path_pattern(tokens: &[Token]) -> Result<PathPattern> {
    let mut p = Parser::new(tokens);

    p.expect(TokenKind::Match)?;
    let expr = parse_path_pattern_expr(&mut p)?;

    let where_clause = if p.eat(TokenKind::Where) {
        Some(parse_comparison_expr(&mut p)?)
    } else {
        None
    };

    let return_clause = if p.at(TokenKind::Return) {
        Some(parse_return_clause(&mut p)?)
    } else {
        None
    };

    if p.peek().is_some() && !p.at(TokenKind::Eof) {
        return Err(p.error(TokenKind::Eof.name()));
    }

    Ok(PathPattern { expr, where_clause, return_clause })
}

// ============================================================================
// Pattern parsing
// ============================================================================

fn parse_path_pattern_expr(p: &mut Parser) -> Result<PathPatternExpr> {
    let mut nodes = vec![parse_node_pattern(p)?];
    let mut edges = Vec::new();

    while p.at(TokenKind::Dash) || p.at(TokenKind::LeftArrow) {
        edges.push(parse_edge_pattern(p)?);
        nodes.push(parse_node_pattern(p)?);
    }

    Ok(PathPatternExpr { nodes, edges })
}

fn parse_node_pattern(p: &mut Parser) -> Result<NodePattern> {
    p.expect(TokenKind::LParen)?;
    let filler = parse_element_filler(p)?;
    p.expect(TokenKind::RParen)?;
    Ok(NodePattern { filler })
}

fn parse_edge_pattern(p: &mut Parser) -> Result<EdgePattern> {
    // <-[...]-
    if p.eat(TokenKind::LeftArrow) {
        let filler = parse_bracketed_filler(p)?;
        p.expect(TokenKind::Dash)?;
        return Ok(EdgePattern { filler, direction: EdgeDirection::Left });
    }

    // -[...]-> or -[...]-
    p.expect(TokenKind::Dash)?;
    let filler = parse_bracketed_filler(p)?;
    let direction = if p.eat(TokenKind::Arrow) {
        EdgeDirection::Right
    } else {
        EdgeDirection::Undirected
    };
    Ok(EdgePattern { filler, direction })
}

fn parse_bracketed_filler(p: &mut Parser) -> Result<ElementFiller> {
    p.expect(TokenKind::LBracket)?;
    let filler = parse_element_filler(p)?;
    p.expect(TokenKind::RBracket)?;
    Ok(filler)
}

fn parse_element_filler(p: &mut Parser) -> Result<ElementFiller> {
    let variable = if p.at(TokenKind::Identifier) {
        Some(p.expect_ident()?)
    } else {
        None
    };

    let type_label = if p.eat(TokenKind::Colon) {
        Some(p.expect_ident()?)
    } else {
        None
    };

    let mut properties = HashMap::new();
    if p.eat(TokenKind::LBrace) {
        if !p.at(TokenKind::RBrace) {
            loop {
                let key = p.expect_ident()?;
                p.expect(TokenKind::Colon)?;
                let value = parse_property_literal(p)?;
                properties.insert(key, value);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        p.expect(TokenKind::RBrace)?;
    }

    Ok(ElementFiller { variable, type_label, properties })
}

fn parse_property_literal(p: &mut Parser) -> Result<Value> {
    match p.peek_kind() {
        TokenKind::String | TokenKind::Number | TokenKind::Identifier => {
            let tok = p.advance().ok_or_else(|| p.error("literal"))?;
            Ok(match literal_value(tok) {
                // pattern attributes match on text form, so an overflowing
                // integer keeps its digits
                Value::Float(_) if is_integer_text(&tok.text) => Value::Text(tok.text.clone()),
                value => value,
            })
        }
        _ => Err(p.error("STRING, NUMBER or IDENT")),
    }
}

// ============================================================================
// WHERE
// ============================================================================

fn parse_comparison_expr(p: &mut Parser) -> Result<ComparisonExpr> {
    let variable = p.expect_ident()?;
    p.expect(TokenKind::Dot)?;
    let attribute = p.expect_ident()?;

    let operator = match p.peek_kind() {
        TokenKind::Eq => CompareOp::Eq,
        TokenKind::Neq => CompareOp::Neq,
        TokenKind::Lt => CompareOp::Lt,
        TokenKind::Gt => CompareOp::Gt,
        TokenKind::Lte => CompareOp::Lte,
        TokenKind::Gte => CompareOp::Gte,
        TokenKind::Near => CompareOp::Near,
        TokenKind::In => CompareOp::In,
        TokenKind::NotIn => CompareOp::NotIn,
        _ => return Err(p.error("comparison operator")),
    };
    p.advance();

    let value = match p.peek_kind() {
        TokenKind::Parameter => {
            let tok = p.expect(TokenKind::Parameter)?;
            Operand::Parameter(parameter_name(&tok.text).to_string())
        }
        TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
            let tok = p.advance().ok_or_else(|| p.error("literal"))?;
            Operand::Literal(literal_value(tok))
        }
        _ => return Err(p.error("PARAM, IDENT, NUMBER or STRING")),
    };

    Ok(ComparisonExpr { variable, attribute, operator, value })
}

// ============================================================================
// RETURN
// ============================================================================

fn parse_return_clause(p: &mut Parser) -> Result<ReturnClause> {
    p.expect(TokenKind::Return)?;
    let distinct = p.eat(TokenKind::Distinct);

    let mut items = vec![parse_projection(p)?];
    while p.eat(TokenKind::Comma) {
        items.push(parse_projection(p)?);
    }

    Ok(ReturnClause { distinct, items })
}

fn parse_projection(p: &mut Parser) -> Result<Projection> {
    if p.at(TokenKind::Identifier) && p.peek_kind_at(1) == TokenKind::LParen {
        return Ok(Projection::Function(parse_function_expr(p)?));
    }

    let variable = p.expect_ident()?;
    let attribute = if p.eat(TokenKind::Dot) {
        Some(p.expect_ident()?)
    } else {
        None
    };
    let alias = parse_alias(p)?;

    Ok(Projection::Item(ReturnItem { variable, attribute, alias }))
}

fn parse_function_expr(p: &mut Parser) -> Result<FunctionExpr> {
    let name = p.expect_ident()?.to_uppercase();
    p.expect(TokenKind::LParen)?;

    let mut args = SmallVec::new();
    if p.eat(TokenKind::Star) {
        args.push(FunctionArg::Star);
    } else if p.at(TokenKind::Identifier) {
        args.push(FunctionArg::Variable(p.expect_ident()?));
        while p.eat(TokenKind::Comma) {
            args.push(FunctionArg::Variable(p.expect_ident()?));
        }
    }
    p.expect(TokenKind::RParen)?;
    let alias = parse_alias(p)?;

    Ok(FunctionExpr { name, args, alias })
}

fn parse_alias(p: &mut Parser) -> Result<Option<String>> {
    if p.eat(TokenKind::As) {
        Ok(Some(p.expect_ident()?))
    } else {
        Ok(None)
    }
}

// ============================================================================
// Literals
// ============================================================================

/// Literal token → value. Digits-only numbers are integers (falling back to
/// float on overflow), other numbers are floats, strings lose their quotes.
fn literal_value(tok: &Token) -> Value {
    match tok.kind {
        TokenKind::Number => {
            if is_integer_text(&tok.text) {
                if let Ok(i) = tok.text.parse::<i64>() {
                    return Value::Int(i);
                }
            }
            tok.text.parse::<f64>().map_or_else(|_| Value::Text(tok.text.clone()), Value::Float)
        }
        TokenKind::String => Value::Text(strip_quotes(&tok.text).to_string()),
        _ => Value::Text(tok.text.clone()),
    }
}

fn is_integer_text(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Strip surrounding quote characters; both kinds, either end.
fn strip_quotes(text: &str) -> &str {
    text.trim_matches('"').trim_matches('\'')
}

/// `${name}` → `name`.
fn parameter_name(text: &str) -> &str {
    text.strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(text)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse(query: &str) -> Result<PathPattern> {
        let tokens = tokenize(query)?;
        parse_path_pattern(&tokens)
    }

    #[test]
    fn test_single_node() {
        let q = parse("MATCH (n:Person) RETURN n").unwrap();
        assert_eq!(q.expr.nodes.len(), 1);
        assert!(q.expr.edges.is_empty());
        assert_eq!(q.expr.nodes[0].filler.variable.as_deref(), Some("n"));
        assert_eq!(q.expr.nodes[0].filler.type_label.as_deref(), Some("Person"));
        assert!(q.where_clause.is_none());
        assert_eq!(q.return_clause.unwrap().items.len(), 1);
    }

    #[test]
    fn test_empty_node_pattern() {
        let q = parse("MATCH ()").unwrap();
        assert_eq!(q.expr.nodes[0].filler, ElementFiller::default());
        assert!(q.return_clause.is_none());
    }

    #[test]
    fn test_edge_directions() {
        let q = parse("MATCH (a)-[r:KNOWS]->(b)<-[s]-(c)-[t]-(d)").unwrap();
        let dirs: Vec<_> = q.expr.edges.iter().map(|e| e.direction).collect();
        assert_eq!(dirs, vec![EdgeDirection::Right, EdgeDirection::Left, EdgeDirection::Undirected]);
        assert_eq!(q.expr.nodes.len(), 4);
        assert_eq!(q.expr.edges[0].filler.type_label.as_deref(), Some("KNOWS"));
        let vars: Vec<_> = q.expr.variables().collect();
        assert_eq!(vars, vec!["a", "r", "b", "s", "c", "t", "d"]);
    }

    #[test]
    fn test_properties() {
        let q = parse("MATCH (n:Person {name: \"Ada\", age: 3, score: 1.5, kind: human})").unwrap();
        let props = &q.expr.nodes[0].filler.properties;
        assert_eq!(props.get("name"), Some(&Value::Text("Ada".into())));
        assert_eq!(props.get("age"), Some(&Value::Int(3)));
        assert_eq!(props.get("score"), Some(&Value::Float(1.5)));
        assert_eq!(props.get("kind"), Some(&Value::Text("human".into())));
    }

    #[test]
    fn test_empty_property_map() {
        let q = parse("MATCH (n {})").unwrap();
        assert!(q.expr.nodes[0].filler.properties.is_empty());
    }

    #[test]
    fn test_where_literal_and_parameter() {
        let q = parse("MATCH (a) WHERE a.age >= 30").unwrap();
        let w = q.where_clause.unwrap();
        assert_eq!(w.variable, "a");
        assert_eq!(w.attribute, "age");
        assert_eq!(w.operator, CompareOp::Gte);
        assert_eq!(w.value, Operand::Literal(Value::Int(30)));

        let q = parse("MATCH (a) WHERE a.name NEAR ${who}").unwrap();
        let w = q.where_clause.unwrap();
        assert_eq!(w.operator, CompareOp::Near);
        assert_eq!(w.value, Operand::Parameter("who".into()));
    }

    #[test]
    fn test_where_operators() {
        for (src, op) in [
            ("=", CompareOp::Eq),
            ("!=", CompareOp::Neq),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
            ("<=", CompareOp::Lte),
            ("in", CompareOp::In),
            ("NOT_IN", CompareOp::NotIn),
        ] {
            let q = parse(&format!("MATCH (a) WHERE a.x {src} 'v'")).unwrap();
            assert_eq!(q.where_clause.unwrap().operator, op, "operator {src}");
        }
    }

    #[test]
    fn test_string_quote_stripping() {
        let q = parse("MATCH (a) WHERE a.name = 'Bob'").unwrap();
        assert_eq!(q.where_clause.unwrap().value, Operand::Literal(Value::Text("Bob".into())));
        assert_eq!(strip_quotes("\"'mixed'\""), "mixed");
    }

    #[test]
    fn test_number_literals() {
        let tok = |text: &str| Token {
            kind: TokenKind::Number,
            span: crate::query::lexer::Span { start: 0, end: text.len() },
            text: text.into(),
        };
        assert_eq!(literal_value(&tok("7")), Value::Int(7));
        assert_eq!(literal_value(&tok("7.25")), Value::Float(7.25));
        assert_eq!(literal_value(&tok("99999999999999999999")), Value::Float(1e20));
    }

    #[test]
    fn test_overflowing_pattern_integer_keeps_digits() {
        let q = parse("MATCH (n {big: 100000000000000000000, small: 12})").unwrap();
        let props = &q.expr.nodes[0].filler.properties;
        assert_eq!(props.get("big"), Some(&Value::Text("100000000000000000000".into())));
        assert_eq!(props.get("small"), Some(&Value::Int(12)));
    }

    #[test]
    fn test_return_items() {
        let q = parse("MATCH (a)-[r]->(b) RETURN DISTINCT a, a.name AS who, COUNT(*), count(b) AS n").unwrap();
        let rc = q.return_clause.unwrap();
        assert!(rc.distinct);
        assert_eq!(rc.items, vec![
            Projection::Item(ReturnItem { variable: "a".into(), attribute: None, alias: None }),
            Projection::Item(ReturnItem {
                variable: "a".into(),
                attribute: Some("name".into()),
                alias: Some("who".into()),
            }),
            Projection::Function(FunctionExpr {
                name: "COUNT".into(),
                args: SmallVec::from_vec(vec![FunctionArg::Star]),
                alias: None,
            }),
            Projection::Function(FunctionExpr {
                name: "COUNT".into(),
                args: SmallVec::from_vec(vec![FunctionArg::Variable("b".into())]),
                alias: Some("n".into()),
            }),
        ]);
    }

    #[test]
    fn test_projection_keys() {
        let q = parse("MATCH (a) RETURN a, a.name, a.age AS years, COUNT(*), sum(a, b)").unwrap();
        let keys: Vec<String> = q
            .return_clause
            .unwrap()
            .items
            .iter()
            .map(|item| match item {
                Projection::Item(i) => i.key(),
                Projection::Function(f) => f.key(),
            })
            .collect();
        assert_eq!(keys, vec!["a", "a.name", "years", "COUNT(*)", "SUM(a, b)"]);
    }

    #[test]
    fn test_missing_rparen() {
        match parse("MATCH (a RETURN a") {
            Err(Error::SyntaxError { expected, found, position, token_index }) => {
                assert_eq!(expected, "RPAREN");
                assert_eq!(found, "RETURN");
                assert_eq!(position, 9);
                assert_eq!(token_index, 3);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_match() {
        let err = parse("(a) RETURN a").unwrap_err();
        assert!(err.to_string().contains("MATCH"), "{err}");
    }

    #[test]
    fn test_left_edge_requires_trailing_dash() {
        let err = parse("MATCH (a)<-[r]->(b)").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { ref expected, .. } if expected == "DASH"));
    }

    #[test]
    fn test_edge_requires_brackets() {
        let err = parse("MATCH (a)-->(b)").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { ref expected, .. } if expected == "LBRACK"));
    }

    #[test]
    fn test_missing_operator() {
        let err = parse("MATCH (a) WHERE a.x 'v'").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { ref expected, .. } if expected == "comparison operator"));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse("MATCH (a) RETURN a a").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { ref expected, .. } if expected == "EOF"));
    }

    #[test]
    fn test_parse_without_eof_token() {
        let mut tokens = tokenize("MATCH (a) RETURN a").unwrap();
        tokens.pop();
        assert!(parse_path_pattern(&tokens).is_ok());

        tokens.truncate(2);
        match parse_path_pattern(&tokens) {
            Err(Error::SyntaxError { found, .. }) => assert_eq!(found, "EOF"),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_deterministic() {
        let q = "MATCH (a:Person {name: 'x'})-[r:KNOWS]->(b) WHERE b.age < 3 RETURN a.name, COUNT(r)";
        assert_eq!(parse(q).unwrap(), parse(q).unwrap());
    }
}
