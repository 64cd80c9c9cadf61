//! Tokenizer for filter predicates.

use crate::errors::ExpressionError;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Number(serde_json::Number),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let two = bytes.get(i + 1).copied();
        let kind = match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'.' => TokenKind::Dot,
            b'=' if two == Some(b'=') => {
                i += 1;
                TokenKind::EqEq
            }
            b'!' if two == Some(b'=') => {
                i += 1;
                TokenKind::NotEq
            }
            b'!' => TokenKind::Bang,
            b'<' if two == Some(b'=') => {
                i += 1;
                TokenKind::Le
            }
            b'<' => TokenKind::Lt,
            b'>' if two == Some(b'=') => {
                i += 1;
                TokenKind::Ge
            }
            b'>' => TokenKind::Gt,
            b'&' if two == Some(b'&') => {
                i += 1;
                TokenKind::AndAnd
            }
            b'|' if two == Some(b'|') => {
                i += 1;
                TokenKind::OrOr
            }
            b'\'' | b'"' => {
                let (text, end) = lex_string(source, i)?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    pos: start,
                });
                i = end;
                continue;
            }
            b'0'..=b'9' => {
                let (number, end) = lex_number(source, i)?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    pos: start,
                });
                i = end;
                continue;
            }
            b'-' if two.is_some_and(|d| d.is_ascii_digit()) => {
                let (number, end) = lex_number(source, i)?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    pos: start,
                });
                i = end;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = i + 1;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                    end += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(source[i..end].to_string()),
                    pos: start,
                });
                i = end;
                continue;
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                return Err(ExpressionError::parse(
                    source,
                    i,
                    format!("unexpected character '{ch}'"),
                ));
            }
        };

        tokens.push(Token { kind, pos: start });
        i += 1;
    }

    Ok(tokens)
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), ExpressionError> {
    let mut chars = source[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(ExpressionError::parse(source, start, "expected string")),
    };

    let mut out = String::new();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                let escaped = match chars.next() {
                    Some((_, 'n')) => '\n',
                    Some((_, 't')) => '\t',
                    Some((_, 'r')) => '\r',
                    Some((_, other)) => other,
                    None => break,
                };
                out.push(escaped);
            }
            c if c == quote => return Ok((out, start + offset + c.len_utf8())),
            c => out.push(c),
        }
    }

    Err(ExpressionError::parse(source, start, "unterminated string literal"))
}

fn lex_number(source: &str, start: usize) -> Result<(serde_json::Number, usize), ExpressionError> {
    let bytes = source.as_bytes();
    let mut end = start;
    if bytes[end] == b'-' {
        end += 1;
    }
    let mut is_float = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !is_float && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) => {
                is_float = true;
                end += 1;
            }
            _ => break,
        }
    }

    let text = &source[start..end];
    let number = if is_float {
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
    } else {
        // Integers beyond i64 widen to u64, then to f64.
        text.parse::<i64>()
            .map(serde_json::Number::from)
            .or_else(|_| text.parse::<u64>().map(serde_json::Number::from))
            .ok()
            .or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .and_then(serde_json::Number::from_f64)
            })
    };

    number
        .map(|n| (n, end))
        .ok_or_else(|| ExpressionError::parse(source, start, format!("invalid number '{text}'")))
}
