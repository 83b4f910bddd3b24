use std::fmt;

use tracing::trace;

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::Token;
use crate::registry::Registry;

/// How deep `if`/`for` blocks may nest before parsing gives up.
pub const MAX_NESTING: usize = 128;

/// A marker that ends the block currently being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    Else,
    EndIf,
    EndFor,
}

impl Closer {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "else" => Some(Closer::Else),
            "endif" => Some(Closer::EndIf),
            "endfor" => Some(Closer::EndFor),
            _ => None,
        }
    }
}

impl fmt::Display for Closer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Closer::Else => "else",
            Closer::EndIf => "endif",
            Closer::EndFor => "endfor",
        })
    }
}

/// Recursive-descent parser over a token slice.
///
/// Each `if`/`for` parses its own body by recursing into [`Parser::parse_body`],
/// which stops at the first closing marker it cannot consume itself. Nested
/// blocks are therefore closed before their parent sees another marker, and
/// the `else`/`endif`/`endfor` a block ends on always belongs to it.
pub struct Parser<'a> {
    tokens: &'a [Token],
    cursor: usize,
    depth: usize,
    registry: &'a Registry,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], registry: &'a Registry) -> Self {
        Self {
            tokens,
            cursor: 0,
            depth: 0,
            registry,
        }
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    /// Parse a nested block body one level deeper than the current one.
    fn parse_nested(&mut self) -> Result<(NodeList, Option<Closer>), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let body = self.parse_body();
        self.depth -= 1;
        body
    }

    pub fn parse(&mut self) -> Result<NodeList, ParseError> {
        match self.parse_body()? {
            (nodes, None) => Ok(nodes),
            (_, Some(closer)) => Err(ParseError::UnexpectedMarker(closer.to_string())),
        }
    }

    /// Parse nodes up to (and including) the next closing marker that is not
    /// claimed by a nested block, or to the end of input.
    fn parse_body(&mut self) -> Result<(NodeList, Option<Closer>), ParseError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.consume() {
            match token {
                Token::Text(s) => nodes.push(Node::Text(s.clone())),
                Token::Expression(inner) => nodes.push(Node::Expr(parse_expression(inner)?)),
                Token::Statement(inner) => {
                    let (keyword, rest) = split_marker(inner)?;
                    trace!(keyword = %keyword, pos = self.cursor - 1, "statement marker");

                    if let Some(closer) = Closer::from_keyword(&keyword) {
                        return Ok((nodes, Some(closer)));
                    }
                    let node = if keyword == "if" {
                        self.parse_if(rest)?
                    } else if keyword == "for" {
                        self.parse_for(inner.trim())?
                    } else {
                        self.parse_statement(keyword, rest)?
                    };
                    nodes.push(node);
                }
            }
        }
        Ok((nodes, None))
    }

    fn parse_if(&mut self, condition: &str) -> Result<Node, ParseError> {
        let condition = parse_expression(condition)?;

        let (consequent, closer) = self.parse_nested()?;
        let alternate = match closer {
            Some(Closer::EndIf) => Vec::new(),
            Some(Closer::Else) => match self.parse_nested()? {
                (alternate, Some(Closer::EndIf)) => alternate,
                (_, Some(other)) => return Err(ParseError::UnexpectedMarker(other.to_string())),
                (_, None) => return Err(ParseError::UnmatchedIf),
            },
            Some(Closer::EndFor) | None => return Err(ParseError::UnmatchedIf),
        };

        Ok(Node::If {
            condition,
            consequent: Box::new(Node::branch(consequent)),
            alternate: Box::new(Node::branch(alternate)),
        })
    }

    fn parse_for(&mut self, clause: &str) -> Result<Node, ParseError> {
        let pieces: Vec<&str> = clause.split_whitespace().collect();
        let (loop_var, iterable_var) = match pieces.as_slice() {
            [_, target, keyword, iterable] if keyword.eq_ignore_ascii_case("in") => {
                (target.to_string(), iterable.to_string())
            }
            _ => {
                return Err(ParseError::MalformedFor {
                    clause: clause.to_string(),
                })
            }
        };

        let body = match self.parse_nested()? {
            (body, Some(Closer::EndFor)) => body,
            (_, Some(other)) => return Err(ParseError::UnexpectedMarker(other.to_string())),
            (_, None) => return Err(ParseError::UnmatchedFor),
        };

        Ok(Node::For {
            loop_var,
            iterable_var,
            body: Box::new(Node::branch(body)),
        })
    }

    fn parse_statement(&mut self, name: String, rest: &str) -> Result<Node, ParseError> {
        if !self.registry.contains(&name) {
            return Err(ParseError::UnknownStatement(name));
        }
        let args = rest
            .split_whitespace()
            .map(parse_operand)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::Statement { name, args })
    }
}

/// Split a marker's inner text into its lowercased keyword and the rest.
fn split_marker(inner: &str) -> Result<(String, &str), ParseError> {
    let trimmed = inner.trim_start();
    let end = trimmed
        .find(char::is_whitespace)
        .unwrap_or(trimmed.len());
    if end == 0 {
        return Err(ParseError::EmptyStatement);
    }
    Ok((trimmed[..end].to_ascii_lowercase(), &trimmed[end..]))
}

pub fn parse_operand(piece: &str) -> Result<Operand, ParseError> {
    if !piece.is_empty() && piece.bytes().all(|b| b.is_ascii_digit()) {
        piece
            .parse()
            .map(Operand::Int)
            .map_err(|_| ParseError::IntegerOutOfRange(piece.to_string()))
    } else {
        Ok(Operand::Name(piece.to_string()))
    }
}

/// Parse the inside of `{{ … }}` (or an `if` condition) into an expression
/// of one, two or three whitespace-separated parts.
pub fn parse_expression(inner: &str) -> Result<Expression, ParseError> {
    let pieces: Vec<&str> = inner.split_whitespace().collect();
    match pieces.as_slice() {
        [] => Err(ParseError::EmptyExpression),
        [operand] => Ok(Expression::Operand(parse_operand(operand)?)),
        [op, operand] => Ok(Expression::Unary {
            op: op.to_string(),
            operand: parse_operand(operand)?,
        }),
        [left, op, right] => Ok(Expression::Binary {
            left: parse_operand(left)?,
            op: op.to_string(),
            right: parse_operand(right)?,
        }),
        _ => Err(ParseError::TooManyOperands(inner.trim().to_string())),
    }
}

/// Build the node tree for a token sequence.
pub fn parse(tokens: &[Token], registry: &Registry) -> Result<NodeList, ParseError> {
    Parser::new(tokens, registry).parse()
}
