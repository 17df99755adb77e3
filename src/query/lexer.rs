//! Query lexer. Tokenizes a query string.
//!
//! Matching is first-match-wins over ordered tables: keywords are looked up
//! before a word falls back to an identifier, and multi-character operators
//! are tried before their single-character prefixes.

use std::fmt;

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// The lexeme exactly as written (string literals keep their quotes).
    pub text: String,
}

/// Source span (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Match, Return, Distinct, As, Where, In, NotIn, Near,

    // Literals
    Number, String,

    // Identifiers and parameters
    Identifier,
    Parameter,  // ${name}

    // Punctuation
    LParen, RParen, LBracket, RBracket, LBrace, RBrace,
    Colon, Comma, Dot, Star,
    LeftArrow,  // <-
    Arrow,      // ->
    Dash,       // -

    // Operators
    Eq, Neq, Lt, Lte, Gt, Gte,

    Eof,
}

impl TokenKind {
    /// Upper-case name used in diagnostics (`RPAREN`, `IDENT`, ...).
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Match => "MATCH",
            TokenKind::Return => "RETURN",
            TokenKind::Distinct => "DISTINCT",
            TokenKind::As => "AS",
            TokenKind::Where => "WHERE",
            TokenKind::In => "IN",
            TokenKind::NotIn => "NOT_IN",
            TokenKind::Near => "NEAR",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Identifier => "IDENT",
            TokenKind::Parameter => "PARAM",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBracket => "LBRACK",
            TokenKind::RBracket => "RBRACK",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Colon => "COLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::Star => "STAR",
            TokenKind::LeftArrow => "ARROW_LEFT",
            TokenKind::Arrow => "ARROW_RIGHT",
            TokenKind::Dash => "DASH",
            TokenKind::Eq => "EQ",
            TokenKind::Neq => "NEQ",
            TokenKind::Lt => "LT",
            TokenKind::Lte => "LTE",
            TokenKind::Gt => "GT",
            TokenKind::Gte => "GTE",
            TokenKind::Eof => "EOF",
        }
    }

    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|&(_, kind)| kind == self)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reserved words, matched case-insensitively against a whole word.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("NOT_IN", TokenKind::NotIn),
    ("MATCH", TokenKind::Match),
    ("RETURN", TokenKind::Return),
    ("DISTINCT", TokenKind::Distinct),
    ("AS", TokenKind::As),
    ("WHERE", TokenKind::Where),
    ("IN", TokenKind::In),
    ("NEAR", TokenKind::Near),
];

/// Operators and punctuation. Order matters: two-character lexemes first.
const SYMBOLS: &[(&str, TokenKind)] = &[
    ("<-", TokenKind::LeftArrow),
    ("->", TokenKind::Arrow),
    ("!=", TokenKind::Neq),
    ("<=", TokenKind::Lte),
    (">=", TokenKind::Gte),
    ("=", TokenKind::Eq),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("-", TokenKind::Dash),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    ("*", TokenKind::Star),
];

/// Lazy token stream over a query string.
///
/// Yields one token per lexical unit and never yields `Eof`; iteration ends
/// at the end of input or right after the first error. Cloning or calling
/// [`Lexer::reset`] restarts the stream.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0, done: false }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Rewind to the start of the input.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.done = false;
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn emit(&mut self, kind: TokenKind, len: usize) -> Token {
        let start = self.pos;
        self.pos += len;
        Token {
            kind,
            span: Span { start, end: self.pos },
            text: self.input[start..self.pos].to_string(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        let rest = self.rest();
        let Some(ch) = rest.chars().next() else {
            return Ok(None);
        };

        let token = match ch {
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(),
            c if c.is_ascii_digit() => self.lex_number(),
            '\'' | '"' => self.lex_string(ch)?,
            '$' => self.lex_parameter()?,
            _ => match SYMBOLS.iter().find(|(sym, _)| rest.starts_with(sym)) {
                Some(&(sym, kind)) => self.emit(kind, sym.len()),
                None => {
                    return Err(Error::LexError {
                        position: self.pos,
                        message: format!("Unexpected character: '{ch}'"),
                    });
                }
            },
        };
        Ok(Some(token))
    }

    fn lex_word(&mut self) -> Token {
        let len = ident_len(self.rest());
        let word = &self.rest()[..len];
        let kind = KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
            .map_or(TokenKind::Identifier, |&(_, kind)| kind);
        self.emit(kind, len)
    }

    fn lex_number(&mut self) -> Token {
        let rest = self.rest().as_bytes();
        let mut len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        // Only take the '.' when a fractional digit follows; "1." is NUMBER DOT.
        if rest.get(len) == Some(&b'.') && rest.get(len + 1).is_some_and(u8::is_ascii_digit) {
            len += 1;
            len += rest[len..].iter().take_while(|b| b.is_ascii_digit()).count();
        }
        self.emit(TokenKind::Number, len)
    }

    fn lex_string(&mut self, quote: char) -> Result<Token> {
        match self.rest()[1..].find(quote) {
            Some(close) => Ok(self.emit(TokenKind::String, close + 2)),
            None => Err(Error::LexError {
                position: self.pos,
                message: "Unterminated string literal".into(),
            }),
        }
    }

    fn lex_parameter(&mut self) -> Result<Token> {
        let rest = self.rest();
        let malformed = || Error::LexError {
            position: self.pos,
            message: "Malformed parameter reference, expected ${name}".into(),
        };
        let body = rest.strip_prefix("${").ok_or_else(malformed)?;
        let name_len = ident_len(body);
        if name_len == 0 || !body[name_len..].starts_with('}') {
            return Err(malformed());
        }
        Ok(self.emit(TokenKind::Parameter, name_len + 3))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Length of the identifier at the start of `s` (`[A-Za-z_][A-Za-z0-9_]*`).
fn ident_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => bytes
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count(),
        _ => 0,
    }
}

/// Tokenize a query string. The result always ends with an `Eof` token.
///
/// The first lexing error aborts tokenization; no partial stream is returned.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Lexer::new(input).collect::<Result<Vec<_>>>()?;
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_match() {
        assert_eq!(kinds("MATCH (n:Person) RETURN n"), vec![
            TokenKind::Match,
            TokenKind::LParen,
            TokenKind::Identifier, // n
            TokenKind::Colon,
            TokenKind::Identifier, // Person
            TokenKind::RParen,
            TokenKind::Return,
            TokenKind::Identifier, // n
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_edge_arrows() {
        assert_eq!(kinds("(a)-[:KNOWS]->(b)<-[r]-(c)"), vec![
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::Dash,
            TokenKind::LBracket,
            TokenKind::Colon,
            TokenKind::Identifier,
            TokenKind::RBracket,
            TokenKind::Arrow,
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::LeftArrow,
            TokenKind::LBracket,
            TokenKind::Identifier,
            TokenKind::RBracket,
            TokenKind::Dash,
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_multi_char_operators_win() {
        assert_eq!(kinds("!= <= >= = < >"), vec![
            TokenKind::Neq,
            TokenKind::Lte,
            TokenKind::Gte,
            TokenKind::Eq,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(kinds("match return Distinct as wHeRe in not_in near"), vec![
            TokenKind::Match,
            TokenKind::Return,
            TokenKind::Distinct,
            TokenKind::As,
            TokenKind::Where,
            TokenKind::In,
            TokenKind::NotIn,
            TokenKind::Near,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let tokens = tokenize("returned matches inside").unwrap();
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Identifier));
        assert_eq!(tokens[0].text, "returned");
    }

    #[test]
    fn test_string_literal_keeps_quotes() {
        let tokens = tokenize("'hello world' \"it's\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "'hello world'");
        assert_eq!(tokens[1].text, "\"it's\"");
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("42 3.14 7.").unwrap();
        assert_eq!(tokens[0].text, "42");
        assert_eq!(tokens[1].text, "3.14");
        assert_eq!(tokens[2].text, "7");
        assert_eq!(tokens[3].kind, TokenKind::Dot);
    }

    #[test]
    fn test_parameter() {
        let tokens = tokenize("${min_age}").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Parameter);
        assert_eq!(tokens[0].text, "${min_age}");
        assert_eq!(tokens[0].span, Span { start: 0, end: 10 });
    }

    #[test]
    fn test_malformed_parameter() {
        assert!(matches!(tokenize("$name"), Err(Error::LexError { position: 0, .. })));
        assert!(matches!(tokenize("${name"), Err(Error::LexError { .. })));
        assert!(matches!(tokenize("${}"), Err(Error::LexError { .. })));
    }

    #[test]
    fn test_unexpected_character_position() {
        match tokenize("MATCH (a) # x") {
            Err(Error::LexError { position, .. }) => assert_eq!(position, 10),
            other => panic!("expected lex error, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(tokenize("WHERE a.name = 'Bob"), Err(Error::LexError { position: 15, .. })));
    }

    #[test]
    fn test_lexer_is_lazy_and_stops_after_error() {
        let mut lexer = Lexer::new("( # )");
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::LParen);
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_lexer_restart() {
        let mut lexer = Lexer::new("(a)");
        let first: Vec<_> = lexer.by_ref().map(|t| t.unwrap().kind).collect();
        lexer.reset();
        let second: Vec<_> = lexer.map(|t| t.unwrap().kind).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
