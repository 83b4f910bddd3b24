//! templet: a small compiler for text templates.
//!
//! A template is literal text mixed with two kinds of tags:
//!
//! - `{{ expr }}` interpolates an expression: a literal or variable, a unary
//!   operation (`{{ - x }}`) or a single binary operation
//!   (`{{ 12 - apple_count }}`). Parts are separated by whitespace.
//! - `{% … %}` markers drive control flow: `if <expr>` / `else` / `endif`,
//!   `for <name> in <name>` / `endfor`, and named directives such as
//!   `extends` or `len`.
//!
//! Compilation runs in three steps:
//!
//! 1. [`lexer`] splits the text into text, expression and statement tokens.
//! 2. [`parser`] builds a node tree, matching nested `if` and `for` blocks.
//! 3. [`eval`] walks the tree against a [`DataModel`], dispatching every
//!    directive through a [`Registry`].
//!
//! The first two steps run once in [`compile`]; the resulting
//! [`CompiledTemplate`] can be rendered any number of times.
//!
//! ```
//! use templet::{compile, DataModel, Value};
//!
//! let template = compile("{% for f in friends %}{{f}},{% endfor %}").unwrap();
//! let mut data = DataModel::from([(
//!     "friends".to_string(),
//!     Value::from(vec!["Billy", "John"]),
//! )]);
//! assert_eq!(template.render(&mut data).unwrap(), "Billy,John,");
//! ```
//!
//! Not supported:
//! - Compound expressions, precedence or parentheses.
//! - Template inheritance: `extends` is accepted and renders nothing.
//! - Numeric literals other than non-negative integers.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod registry;
pub mod value;

pub use ast::{Expression, Node, NodeList, Operand};
pub use error::{Error, EvalError, LexError, ParseError};
pub use eval::Evaluator;
pub use lexer::{tokenize, Token};
pub use parser::parse;
pub use registry::{Arguments, Directive, Registry};
pub use value::{data_model_from_json, DataModel, Value};

/// A parsed template together with the registry it was parsed against.
#[derive(Clone)]
pub struct CompiledTemplate {
    nodes: NodeList,
    registry: Arc<Registry>,
}

impl CompiledTemplate {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render against `data_model`. Loop variables are bound in it while a
    /// loop runs and restored afterwards.
    pub fn render(&self, data_model: &mut DataModel) -> Result<String, Error> {
        Ok(Evaluator::new(&self.registry).render(&self.nodes, data_model)?)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

/// Compile with the built-in directives.
pub fn compile(text: &str) -> Result<CompiledTemplate, Error> {
    compile_with(text, Arc::new(Registry::default()))
}

/// Compile against a custom set of directives.
pub fn compile_with(text: &str, registry: Arc<Registry>) -> Result<CompiledTemplate, Error> {
    let tokens = tokenize(text)?;
    let nodes = parse(&tokens, &registry)?;
    debug!(tokens = tokens.len(), nodes = nodes.len(), "compiled template");
    Ok(CompiledTemplate { nodes, registry })
}

/// Compile and render in one go.
pub fn render(text: &str, data_model: &mut DataModel) -> Result<String, Error> {
    compile(text)?.render(data_model)
}

/// Template source that is compiled on first render and reused afterwards.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    registry: Arc<Registry>,
    compiled: Option<CompiledTemplate>,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_registry(source, Arc::new(Registry::default()))
    }

    pub fn with_registry(source: impl Into<String>, registry: Arc<Registry>) -> Self {
        Self {
            source: source.into(),
            registry,
            compiled: None,
        }
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, Error> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Ok(Self::new(source))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compile if this has not happened yet and return the cached result.
    pub fn compiled(&mut self) -> Result<&CompiledTemplate, Error> {
        let compiled = match self.compiled.take() {
            Some(compiled) => compiled,
            None => {
                debug!(len = self.source.len(), "compiling template on first use");
                compile_with(&self.source, Arc::clone(&self.registry))?
            }
        };
        Ok(self.compiled.insert(compiled))
    }

    pub fn render(&mut self, data_model: &mut DataModel) -> Result<String, Error> {
        self.compiled()?.render(data_model)
    }

    /// Render with no variables bound, so every name renders as itself.
    pub fn render_empty(&mut self) -> Result<String, Error> {
        self.render(&mut DataModel::new())
    }
}
