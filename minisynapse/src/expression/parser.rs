//! Recursive-descent parser for filter predicates.
//!
//! ```text
//! expr       := or
//! or         := and (("or" | "||") and)*
//! and        := not (("and" | "&&") not)*
//! not        := ("not" | "!") not | comparison
//! comparison := operand (cmp operand | ["not"] "in" operand | "matches" STRING)?
//! operand    := literal | field | "(" expr ")"
//! ```
//!
//! Parentheses, negations and chained `and`/`or` operators together may nest
//! at most [`MAX_NESTING`] levels deep, which bounds the depth of the tree.

use super::lexer::{tokenize, Token, TokenKind};
use crate::errors::ExpressionError;
use regex::Regex;

/// Deepest nesting a predicate may use.
pub const MAX_NESTING: usize = 64;

/// A context-derived value a predicate may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// `ctx.method`
    Method,
    /// `ctx.path`
    Path,
    /// `ctx.body`, decoded as UTF-8.
    Body,
    /// `ctx.status`, the current outbound status.
    Status,
    /// `ctx.response_body`, decoded as UTF-8.
    ResponseBody,
    /// `ctx.headers`, the whole inbound header map.
    Headers,
    /// `ctx.headers['name']`, case-insensitive.
    Header(String),
    /// `ctx.properties`, the whole scratch-pad.
    Properties,
    /// `ctx.properties['key']`
    Property(String),
    /// `ctx.response_headers`
    ResponseHeaders,
    /// `ctx.response_headers['name']`, case-insensitive.
    ResponseHeader(String),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The operator as written in source.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Parsed predicate syntax tree.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A literal value.
    Literal(serde_json::Value),
    /// A context field.
    Field(Field),
    /// Logical negation.
    Not(Box<Expr>),
    /// Short-circuit conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction.
    Or(Box<Expr>, Box<Expr>),
    /// Binary comparison.
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// Membership test: substring, array element or map key.
    In {
        /// The value searched for.
        needle: Box<Expr>,
        /// The value searched in.
        haystack: Box<Expr>,
        /// `not in`
        negated: bool,
    },
    /// Regular-expression search against a string operand.
    Matches(Box<Expr>, Regex),
}

pub(crate) fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };

    if parser.tokens.is_empty() {
        return Err(ExpressionError::parse(source, 0, "empty expression"));
    }

    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(ExpressionError::parse(
            source,
            token.pos,
            format!("unexpected {}", describe(&token.kind)),
        ));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_keyword(&self, offset: usize, keyword: &str) -> bool {
        matches!(
            self.tokens.get(self.pos + offset).map(|t| &t.kind),
            Some(TokenKind::Ident(name)) if name == keyword
        )
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn end_pos(&self) -> usize {
        self.source.len()
    }

    fn error_here(&self, message: impl Into<String>) -> ExpressionError {
        let pos = self.peek().map_or_else(|| self.end_pos(), |t| t.pos);
        ExpressionError::parse(self.source, pos, message)
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error_here(format!(
                "expression nested too deeply (limit {MAX_NESTING})"
            )));
        }
        Ok(())
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ExpressionError> {
        match self.peek_kind() {
            Some(k) if k == kind => self.advance().ok_or_else(|| self.error_here("unexpected end")),
            Some(other) => {
                let message = format!("expected {}, found {}", describe(kind), describe(other));
                Err(self.error_here(message))
            }
            None => Err(self.error_here(format!(
                "expected {}, found end of expression",
                describe(kind)
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;
        let mut chained = 0;
        while matches!(self.peek_kind(), Some(TokenKind::OrOr)) || self.peek_keyword(0, "or") {
            self.advance();
            self.descend()?;
            chained += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_not()?;
        let mut chained = 0;
        while matches!(self.peek_kind(), Some(TokenKind::AndAnd)) || self.peek_keyword(0, "and") {
            self.advance();
            self.descend()?;
            chained += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek_kind(), Some(TokenKind::Bang)) || self.peek_keyword(0, "not") {
            self.advance();
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.parse_operand()?;

        let op = match self.peek_kind() {
            Some(TokenKind::EqEq) => Some(CompareOp::Eq),
            Some(TokenKind::NotEq) => Some(CompareOp::Ne),
            Some(TokenKind::Lt) => Some(CompareOp::Lt),
            Some(TokenKind::Le) => Some(CompareOp::Le),
            Some(TokenKind::Gt) => Some(CompareOp::Gt),
            Some(TokenKind::Ge) => Some(CompareOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_operand()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }

        if self.peek_keyword(0, "in") {
            self.advance();
            let haystack = self.parse_operand()?;
            return Ok(Expr::In {
                needle: Box::new(left),
                haystack: Box::new(haystack),
                negated: false,
            });
        }

        if self.peek_keyword(0, "not") && self.peek_keyword(1, "in") {
            self.advance();
            self.advance();
            let haystack = self.parse_operand()?;
            return Ok(Expr::In {
                needle: Box::new(left),
                haystack: Box::new(haystack),
                negated: true,
            });
        }

        if self.peek_keyword(0, "matches") {
            self.advance();
            let pos = self.peek().map_or_else(|| self.end_pos(), |t| t.pos);
            let pattern = match self.advance().map(|t| t.kind) {
                Some(TokenKind::Str(pattern)) => pattern,
                _ => {
                    return Err(ExpressionError::parse(
                        self.source,
                        pos,
                        "'matches' requires a string literal pattern",
                    ))
                }
            };
            let regex = Regex::new(&pattern).map_err(|e| {
                ExpressionError::parse(self.source, pos, format!("invalid pattern: {e}"))
            })?;
            return Ok(Expr::Matches(Box::new(left), regex));
        }

        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<Expr, ExpressionError> {
        let Some(token) = self.advance() else {
            return Err(self.error_here("unexpected end of expression"));
        };

        match token.kind {
            TokenKind::Str(s) => Ok(Expr::Literal(serde_json::Value::String(s))),
            TokenKind::Number(n) => Ok(Expr::Literal(serde_json::Value::Number(n))),
            TokenKind::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" | "True" => Ok(Expr::Literal(serde_json::Value::Bool(true))),
                "false" | "False" => Ok(Expr::Literal(serde_json::Value::Bool(false))),
                "null" | "None" => Ok(Expr::Literal(serde_json::Value::Null)),
                "ctx" => self.parse_field(),
                other => Err(ExpressionError::parse(
                    self.source,
                    token.pos,
                    format!("unknown name '{other}' (only 'ctx' is in scope)"),
                )),
            },
            other => Err(ExpressionError::parse(
                self.source,
                token.pos,
                format!("unexpected {}", describe(&other)),
            )),
        }
    }

    fn parse_field(&mut self) -> Result<Expr, ExpressionError> {
        self.expect(&TokenKind::Dot)?;
        let token = self.advance().ok_or_else(|| self.error_here("expected field name after 'ctx.'"))?;
        let TokenKind::Ident(name) = token.kind else {
            return Err(ExpressionError::parse(
                self.source,
                token.pos,
                "expected field name after 'ctx.'",
            ));
        };

        let field = match name.as_str() {
            "method" => Field::Method,
            "path" => Field::Path,
            "body" => Field::Body,
            "status" | "response_status" => Field::Status,
            "response_body" => Field::ResponseBody,
            "headers" => match self.parse_subscript()? {
                Some(key) => Field::Header(key),
                None => Field::Headers,
            },
            "properties" => match self.parse_subscript()? {
                Some(key) => Field::Property(key),
                None => Field::Properties,
            },
            "response_headers" => match self.parse_subscript()? {
                Some(key) => Field::ResponseHeader(key),
                None => Field::ResponseHeaders,
            },
            other => {
                return Err(ExpressionError::parse(
                    self.source,
                    token.pos,
                    format!("unknown context field '{other}'"),
                ))
            }
        };

        Ok(Expr::Field(field))
    }

    fn parse_subscript(&mut self) -> Result<Option<String>, ExpressionError> {
        if !matches!(self.peek_kind(), Some(TokenKind::LBracket)) {
            return Ok(None);
        }
        self.advance();
        let key = match self.advance() {
            Some(Token {
                kind: TokenKind::Str(key),
                ..
            }) => key,
            Some(token) => {
                return Err(ExpressionError::parse(
                    self.source,
                    token.pos,
                    "subscript key must be a string literal",
                ))
            }
            None => return Err(self.error_here("unexpected end of expression")),
        };
        self.expect(&TokenKind::RBracket)?;
        Ok(Some(key))
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("'{name}'"),
        TokenKind::Str(s) => format!("string '{s}'"),
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Dot => "'.'".to_string(),
        TokenKind::EqEq => "'=='".to_string(),
        TokenKind::NotEq => "'!='".to_string(),
        TokenKind::Lt => "'<'".to_string(),
        TokenKind::Le => "'<='".to_string(),
        TokenKind::Gt => "'>'".to_string(),
        TokenKind::Ge => "'>='".to_string(),
        TokenKind::AndAnd => "'&&'".to_string(),
        TokenKind::OrOr => "'||'".to_string(),
        TokenKind::Bang => "'!'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comparison() {
        let expr = parse("ctx.method == 'POST'").unwrap();
        match expr {
            Expr::Compare(CompareOp::Eq, left, right) => {
                assert!(matches!(*left, Expr::Field(Field::Method)));
                assert!(matches!(*right, Expr::Literal(serde_json::Value::String(ref s)) if s == "POST"));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = parse("true or false and false").unwrap();
        assert!(matches!(expr, Expr::Or(_, ref right) if matches!(**right, Expr::And(_, _))));
    }

    #[test]
    fn test_symbolic_and_keyword_operators() {
        assert!(matches!(parse("!true").unwrap(), Expr::Not(_)));
        assert!(matches!(parse("not true").unwrap(), Expr::Not(_)));
        assert!(matches!(parse("true && true").unwrap(), Expr::And(_, _)));
        assert!(matches!(parse("true || true").unwrap(), Expr::Or(_, _)));
    }

    #[test]
    fn test_subscripts() {
        assert!(matches!(
            parse("ctx.headers['X-Tenant']").unwrap(),
            Expr::Field(Field::Header(ref k)) if k == "X-Tenant"
        ));
        assert!(matches!(
            parse("ctx.properties[\"score\"]").unwrap(),
            Expr::Field(Field::Property(ref k)) if k == "score"
        ));
        assert!(matches!(parse("ctx.headers").unwrap(), Expr::Field(Field::Headers)));
    }

    #[test]
    fn test_membership() {
        assert!(matches!(
            parse("'x' not in ctx.properties").unwrap(),
            Expr::In { negated: true, .. }
        ));
        assert!(matches!(
            parse("'/api' in ctx.path").unwrap(),
            Expr::In { negated: false, .. }
        ));
    }

    #[test]
    fn test_matches_requires_literal() {
        assert!(matches!(parse("ctx.path matches '^/api/'").unwrap(), Expr::Matches(_, _)));
        assert!(parse("ctx.path matches ctx.method").is_err());
        assert!(parse("ctx.path matches '('").is_err());
    }

    #[test]
    fn test_rejects_unknown_names() {
        let err = parse("__import__('os')").unwrap_err();
        assert!(err.message.contains("only 'ctx' is in scope"));

        let err = parse("ctx.secret == 1").unwrap_err();
        assert!(err.message.contains("unknown context field"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse("").is_err());
        assert!(parse("ctx.method ==").is_err());
        assert!(parse("(true").is_err());
        assert!(parse("true true").is_err());
        assert!(parse("ctx.headers[1]").is_err());
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = MAX_NESTING - 1;
        let source = format!("{}true{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse(&source).is_ok());
        assert!(parse(&format!("{}true", "not ".repeat(MAX_NESTING))).is_ok());
        assert!(parse(&format!("{}true", "not ".repeat(MAX_NESTING + 1))).is_err());
    }

    #[test]
    fn test_rejects_excessive_nesting() {
        let depth = 200_000;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let err = parse(&source).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
        assert_eq!(err.position, Some(MAX_NESTING + 1));

        let err = parse(&format!("{}true", "! ".repeat(depth))).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
    }

    #[test]
    fn test_rejects_overlong_operator_chains() {
        let long = vec!["true"; 10_000].join(" and ");
        assert!(parse(&long).unwrap_err().message.contains("nested too deeply"));

        let short = vec!["true"; 10].join(" or ");
        assert!(parse(&short).is_ok());
    }
}
