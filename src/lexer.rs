use std::fmt;

use crate::error::LexError;

pub const EXPRESSION_START: &str = "{{";
pub const EXPRESSION_END: &str = "}}";
pub const STATEMENT_START: &str = "{%";
pub const STATEMENT_END: &str = "%}";

/// A classified fragment of the template source.
///
/// Delimited tokens keep only the text between their delimiters; `Display`
/// puts the delimiters back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Expression(String),
    Statement(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::Expression(inner) => write!(f, "{EXPRESSION_START}{inner}{EXPRESSION_END}"),
            Token::Statement(inner) => write!(f, "{STATEMENT_START}{inner}{STATEMENT_END}"),
        }
    }
}

#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    pub fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        let rest = self.remaining();
        if rest.is_empty() {
            return None;
        }

        // Earliest opener of either kind.
        let next_tag = rest
            .find(STATEMENT_START)
            .into_iter()
            .chain(rest.find(EXPRESSION_START))
            .min();

        match next_tag {
            Some(0) => Some(self.delimited()),
            Some(idx) => {
                let text = rest[..idx].to_string();
                self.advance(idx);
                Some(Ok(Token::Text(text)))
            }
            None => {
                let text = rest.to_string();
                self.advance(rest.len());
                Some(Ok(Token::Text(text)))
            }
        }
    }

    /// Consume a `{{ … }}` or `{% … %}` tag starting at the cursor, up to
    /// the first closer of the same kind.
    fn delimited(&mut self) -> Result<Token, LexError> {
        let rest = self.remaining();
        let (open, close) = if rest.starts_with(STATEMENT_START) {
            (STATEMENT_START, STATEMENT_END)
        } else {
            (EXPRESSION_START, EXPRESSION_END)
        };

        let body = &rest[open.len()..];
        let Some(end) = body.find(close) else {
            let offset = self.cursor;
            // Nothing after an unterminated opener can be tokenized.
            self.advance(rest.len());
            return Err(LexError::Unterminated {
                delimiter: open,
                offset,
            });
        };

        let inner = body[..end].to_string();
        self.advance(open.len() + end + close.len());

        Ok(if open == STATEMENT_START {
            Token::Statement(inner)
        } else {
            Token::Expression(inner)
        })
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Split template text into tokens. Empty text fragments are never
/// produced, so an empty branch shows up as two adjacent markers.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(text).collect()
}
