//! Dot-path parsing.
//!
//! A dot path addresses a value inside a record: tokens separated by `.`,
//! where a token is an identifier (double-quoted when it contains blanks
//! or special characters, with backslash escapes) or a non-negative array
//! index. Whitespace between tokens is tolerated.

use crate::error::{Error, ErrorKind, Result};

/// Upper bound on the number of path nodes.
pub const MAX_PATH_NODES: usize = 256;

/// One resolved path step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotNode {
    /// Property name lookup in an object.
    Key(String),
    /// Element lookup in an array or column.
    Index(u64),
}

/// A parsed dot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotPath {
    nodes: Vec<DotNode>,
}

#[derive(Debug, PartialEq)]
enum Token {
    Dot,
    Key(String),
    Index(u64),
    Unknown,
    Eof,
}

struct Lexer<'s> {
    rest: &'s [u8],
}

impl Lexer<'_> {
    fn next_token(&mut self) -> Result<Token> {
        while let [b' ' | b'\t' | b'\r' | b'\n', tail @ ..] = self.rest {
            self.rest = tail;
        }
        let Some(&c) = self.rest.first() else {
            return Ok(Token::Eof);
        };
        match c {
            b'.' => {
                self.rest = &self.rest[1..];
                Ok(Token::Dot)
            }
            b'"' => self.quoted_key(),
            c if c.is_ascii_digit() => {
                let mut len = 0;
                while len < self.rest.len() && self.rest[len].is_ascii_digit() {
                    len += 1;
                }
                let text = std::str::from_utf8(&self.rest[..len])
                    .map_err(|_| Error::new(ErrorKind::ParseUnknownToken, "non-ascii index"))?;
                let value = text.parse::<u64>().map_err(|_| {
                    Error::new(ErrorKind::ParseUnknownToken, format!("index {text} overflows"))
                })?;
                self.rest = &self.rest[len..];
                Ok(Token::Index(value))
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut len = 0;
                while len < self.rest.len()
                    && (self.rest[len].is_ascii_alphanumeric() || self.rest[len] == b'_')
                {
                    len += 1;
                }
                let key = String::from_utf8_lossy(&self.rest[..len]).into_owned();
                self.rest = &self.rest[len..];
                Ok(Token::Key(key))
            }
            _ => Ok(Token::Unknown),
        }
    }

    fn quoted_key(&mut self) -> Result<Token> {
        // self.rest[0] == '"'
        let mut out = String::new();
        let mut i = 1;
        let mut escaped = false;
        while i < self.rest.len() {
            let c = self.rest[i];
            if escaped {
                out.push(c as char);
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == b'"' {
                self.rest = &self.rest[i + 1..];
                return Ok(Token::Key(out));
            } else {
                out.push(c as char);
            }
            i += 1;
        }
        Err(Error::new(
            ErrorKind::ParseUnknownToken,
            "unterminated quoted key",
        ))
    }
}

impl DotPath {
    /// Parses `input` into a path.
    pub fn parse(input: &str) -> Result<Self> {
        let mut lexer = Lexer {
            rest: input.as_bytes(),
        };
        let mut nodes = Vec::new();

        let mut token = lexer.next_token()?;
        loop {
            match token {
                Token::Key(key) => nodes.push(DotNode::Key(key)),
                Token::Index(i) => nodes.push(DotNode::Index(i)),
                Token::Eof if nodes.is_empty() => break,
                Token::Unknown => {
                    return Err(Error::new(
                        ErrorKind::ParseUnknownToken,
                        "token is neither key nor index",
                    ));
                }
                _ => {
                    return Err(Error::new(
                        ErrorKind::ParseEntryExpected,
                        "expected key or index",
                    ));
                }
            }
            if nodes.len() > MAX_PATH_NODES {
                return Err(Error::out_of_bounds(format!(
                    "dot path exceeds {MAX_PATH_NODES} nodes"
                )));
            }
            match lexer.next_token()? {
                Token::Eof => break,
                Token::Dot => {}
                _ => {
                    return Err(Error::new(
                        ErrorKind::ParseDotExpected,
                        "expected '.' between path entries",
                    ));
                }
            }
            token = lexer.next_token()?;
        }
        Ok(Self { nodes })
    }

    /// The resolved path steps.
    pub fn nodes(&self) -> &[DotNode] {
        &self.nodes
    }

    /// Number of path steps.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
