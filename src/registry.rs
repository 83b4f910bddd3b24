//! Name → directive table consulted by both the parser (to accept a
//! statement marker) and the evaluator (to run it).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::ast::{Expression, Node, Operand};
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::value::{DataModel, Value};

/// What a directive receives from the node that invoked it.
#[derive(Debug, Clone, Copy)]
pub enum Arguments<'a> {
    Conditional {
        condition: &'a Expression,
        consequent: &'a Node,
        alternate: &'a Node,
    },
    Loop {
        loop_var: &'a str,
        iterable_var: &'a str,
        body: &'a Node,
    },
    Positional(&'a [Operand]),
}

pub trait Directive: Send + Sync {
    fn evaluate(
        &self,
        args: Arguments<'_>,
        evaluator: &Evaluator<'_>,
        data_model: &mut DataModel,
    ) -> Result<String, EvalError>;
}

impl<F> Directive for F
where
    F: Fn(Arguments<'_>, &Evaluator<'_>, &mut DataModel) -> Result<String, EvalError>
        + Send
        + Sync,
{
    fn evaluate(
        &self,
        args: Arguments<'_>,
        evaluator: &Evaluator<'_>,
        data_model: &mut DataModel,
    ) -> Result<String, EvalError> {
        self(args, evaluator, data_model)
    }
}

#[derive(Clone)]
pub struct Registry {
    directives: HashMap<String, Arc<dyn Directive>>,
}

impl Registry {
    /// A registry with no directives at all, not even `if` and `for`.
    pub fn new() -> Self {
        Self {
            directives: HashMap::new(),
        }
    }

    /// Register (or replace) a directive. Names are matched
    /// case-insensitively.
    pub fn register(&mut self, name: &str, directive: impl Directive + 'static) -> &mut Self {
        self.directives
            .insert(name.to_ascii_lowercase(), Arc::new(directive));
        self
    }

    pub fn register_fn<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Arguments<'_>, &Evaluator<'_>, &mut DataModel) -> Result<String, EvalError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, f)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Directive> {
        self.directives
            .get(&name.to_ascii_lowercase())
            .map(|directive| directive.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.directives.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Registry {
    /// The built-in directives: `if`, `for`, `extends` and `len`.
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register("if", If)
            .register("for", For)
            .register("extends", Extends)
            .register("len", Len);
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("directives", &self.names())
            .finish()
    }
}

pub struct If;

impl Directive for If {
    fn evaluate(
        &self,
        args: Arguments<'_>,
        evaluator: &Evaluator<'_>,
        data_model: &mut DataModel,
    ) -> Result<String, EvalError> {
        let Arguments::Conditional {
            condition,
            consequent,
            alternate,
        } = args
        else {
            return Err(EvalError::UnexpectedArguments("if".to_string()));
        };

        if evaluator.eval_expression(condition, data_model)?.is_truthy() {
            evaluator.eval_node(consequent, data_model)
        } else {
            evaluator.eval_node(alternate, data_model)
        }
    }
}

pub struct For;

impl Directive for For {
    fn evaluate(
        &self,
        args: Arguments<'_>,
        evaluator: &Evaluator<'_>,
        data_model: &mut DataModel,
    ) -> Result<String, EvalError> {
        let Arguments::Loop {
            loop_var,
            iterable_var,
            body,
        } = args
        else {
            return Err(EvalError::UnexpectedArguments("for".to_string()));
        };

        let items = match data_model.get(iterable_var) {
            Some(Value::Seq(items)) => items.clone(),
            _ => return Err(EvalError::NotIterable(iterable_var.to_string())),
        };

        // The loop variable shadows any outer binding until the loop ends.
        let shadowed = data_model.remove(loop_var);

        let output: Result<String, EvalError> = items
            .into_iter()
            .enumerate()
            .try_fold(String::new(), |mut output, (index, item)| {
                trace!(loop_var, index, "for iteration");
                data_model.insert(loop_var.to_string(), item);
                output.push_str(&evaluator.eval_node(body, data_model)?);
                Ok(output)
            });

        match shadowed {
            Some(previous) => {
                data_model.insert(loop_var.to_string(), previous);
            }
            None => {
                data_model.remove(loop_var);
            }
        }

        output
    }
}

/// Template inheritance is declared but renders nothing.
pub struct Extends;

impl Directive for Extends {
    fn evaluate(
        &self,
        _args: Arguments<'_>,
        _evaluator: &Evaluator<'_>,
        _data_model: &mut DataModel,
    ) -> Result<String, EvalError> {
        Ok(String::new())
    }
}

/// `{% len items %}` renders the number of elements (or characters) bound
/// to `items`.
pub struct Len;

impl Directive for Len {
    fn evaluate(
        &self,
        args: Arguments<'_>,
        _evaluator: &Evaluator<'_>,
        data_model: &mut DataModel,
    ) -> Result<String, EvalError> {
        let Arguments::Positional([Operand::Name(name)]) = args else {
            return Err(EvalError::UnexpectedArguments("len".to_string()));
        };

        match data_model.get(name) {
            Some(Value::Seq(items)) => Ok(items.len().to_string()),
            Some(Value::Str(s)) => Ok(s.chars().count().to_string()),
            Some(other) => Err(EvalError::NoLength(other.type_name())),
            None => Err(EvalError::UndefinedVariable(name.clone())),
        }
    }
}
