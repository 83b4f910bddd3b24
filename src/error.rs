use thiserror::Error;

/// Top-level error returned by the public API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("LexError: {0}")]
    LexError(LexError),
    #[error("ParseError: {0}")]
    ParseError(ParseError),
    #[error("EvalError: {0}")]
    EvalError(EvalError),
    #[error("unable to read template: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid data model: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("unterminated `{delimiter}` starting at byte {offset}")]
    Unterminated {
        delimiter: &'static str,
        offset: usize,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty expression")]
    EmptyExpression,
    #[error("empty statement")]
    EmptyStatement,
    #[error("expression `{0}` has more than three parts, nested expressions are not supported")]
    TooManyOperands(String),
    #[error("integer literal `{0}` is out of range")]
    IntegerOutOfRange(String),
    #[error("malformed for clause `{clause}`, expected `for <name> in <name>`")]
    MalformedFor { clause: String },
    #[error("unmatched if")]
    UnmatchedIf,
    #[error("unmatched for")]
    UnmatchedFor,
    #[error("unexpected `{0}` marker")]
    UnexpectedMarker(String),
    #[error("unknown statement `{0}`")]
    UnknownStatement(String),
    #[error("blocks nested more than {0} deep")]
    NestingTooDeep(usize),
}

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("`{0}` is not iterable")]
    NotIterable(String),
    #[error("no handler registered for `{0}`")]
    UnregisteredDirective(String),
    #[error("`{0}` was called with arguments it does not accept")]
    UnexpectedArguments(String),
    #[error("cannot apply `{op}` to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("cannot apply unary `{op}` to {operand}")]
    InvalidUnary { op: String, operand: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0}")]
    IntegerOverflow(&'static str),
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("{0} has no length")]
    NoLength(&'static str),
}

macro_rules! impl_from_error {
    ($($error:tt),+) => {$(
        impl From<$error> for Error {
            fn from(e: $error) -> Self {
                Error::$error(e)
            }
        }
    )+};
}

impl_from_error!(LexError, ParseError, EvalError);
