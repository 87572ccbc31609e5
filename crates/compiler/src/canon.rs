//! Canonical prototypes and their digests
//!
//! The canonical prototype string is the single hashing input that keeps
//! call identifiers stable across independent builds of either image. Its
//! exact byte layout is load-bearing: any drift changes every digest and
//! with it every identifier already burned into shipped binaries.
//!
//! Format: `<return-type> <name> ( <type> <param>, ... ) ` — single
//! spaces, space-padded parentheses, trailing space, and `void` as the
//! sole entry for an empty parameter list.

use crate::decl::Declaration;
use crate::error::Error;
use sha2::{Digest, Sha256};

/// Render a declaration as its canonical prototype string.
///
/// Pure: identical declarations always render identically, regardless of
/// how the source spelled whitespace or pointer placement.
pub fn canonical_prototype(decl: &Declaration) -> String {
    let args = if decl.parameters.is_empty() {
        "void".to_string()
    } else {
        decl.parameters
            .iter()
            .map(|p| {
                if p.name.is_empty() {
                    // unnamed parameters (a lone `void`) render bare
                    normalize_type(&p.type_name)
                } else {
                    format!("{} {}", normalize_type(&p.type_name), p.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{} {} ( {} ) ",
        normalize_type(&decl.return_type),
        decl.name,
        args
    )
}

/// SHA-256 digest of a canonical prototype.
pub fn prototype_digest(prototype: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(prototype.as_bytes());
    hasher.finalize().into()
}

/// Normalize a type descriptor: collapse whitespace runs and detach `*`
/// so that `unsigned  char*` and `unsigned char *` render identically.
pub fn normalize_type(raw: &str) -> String {
    raw.replace('*', " * ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a parameter length annotation expression.
///
/// Accepts the shapes the boundary annotations use in practice: integer
/// constants, identifiers, `sizeof`, unary and binary operators, and
/// parenthesized combinations. Anything else aborts the run; silently
/// accepting a layout the two images might disagree on is worse than
/// refusing to generate.
pub fn render_length_expr(expr: &str) -> Result<String, Error> {
    let tokens = tokenize(expr)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let rendered = parser.expr(expr)?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::UnsupportedExpression(expr.to_string()));
    }
    Ok(rendered)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Op(String),
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '~' | '!' => {
                chars.next();
                tokens.push(Token::Op(c.to_string()));
            }
            '<' | '>' => {
                chars.next();
                // only the shift operators are meaningful in a length
                if chars.peek() == Some(&c) {
                    chars.next();
                    tokens.push(Token::Op(format!("{}{}", c, c)));
                } else {
                    return Err(Error::UnsupportedExpression(expr.to_string()));
                }
            }
            _ if c.is_ascii_digit() => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(num));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(Error::UnsupportedExpression(expr.to_string())),
        }
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self, source: &str) -> Result<String, Error> {
        let mut rendered = self.unary(source)?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = op.clone();
            self.pos += 1;
            let rhs = self.unary(source)?;
            rendered = format!("{} {} {}", rendered, op, rhs);
        }
        Ok(rendered)
    }

    fn unary(&mut self, source: &str) -> Result<String, Error> {
        if let Some(Token::Op(op)) = self.peek() {
            if op == "+" || op == "-" || op == "~" || op == "!" {
                let op = op.clone();
                self.pos += 1;
                let operand = self.unary(source)?;
                return Ok(format!("{}{}", op, operand));
            }
        }
        self.primary(source)
    }

    fn primary(&mut self, source: &str) -> Result<String, Error> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if name == "sizeof" {
                    // sizeof always takes a parenthesized operand
                    if self.peek() != Some(&Token::Open) {
                        return Err(Error::UnsupportedExpression(source.to_string()));
                    }
                    self.pos += 1;
                    let inner = self.expr(source)?;
                    if self.peek() != Some(&Token::Close) {
                        return Err(Error::UnsupportedExpression(source.to_string()));
                    }
                    self.pos += 1;
                    Ok(format!("sizeof({})", inner))
                } else if self.peek() == Some(&Token::Open) {
                    // arbitrary function calls cannot be proven stable
                    Err(Error::UnsupportedExpression(source.to_string()))
                } else {
                    Ok(name)
                }
            }
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.expr(source)?;
                if self.peek() != Some(&Token::Close) {
                    return Err(Error::UnsupportedExpression(source.to_string()));
                }
                self.pos += 1;
                Ok(format!("({})", inner))
            }
            _ => Err(Error::UnsupportedExpression(source.to_string())),
        }
    }
}
