use tracing::trace;

use crate::ast::{Expression, Node, Operand};
use crate::error::EvalError;
use crate::ops::{evaluate_binary, evaluate_unary, BinaryOp, UnaryOp};
use crate::registry::{Arguments, Registry};
use crate::value::{DataModel, Value};

/// Walks a parsed template, dispatching directives through a registry.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r Registry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn render(&self, nodes: &[Node], data_model: &mut DataModel) -> Result<String, EvalError> {
        let mut output = String::new();
        for node in nodes {
            output.push_str(&self.eval_node(node, data_model)?);
        }
        Ok(output)
    }

    pub fn eval_node(&self, node: &Node, data_model: &mut DataModel) -> Result<String, EvalError> {
        match node {
            Node::Text(s) => Ok(s.clone()),
            Node::Block(nodes) => self.render(nodes, data_model),
            Node::Expr(expr) => Ok(self.eval_expression(expr, data_model)?.to_string()),
            Node::If {
                condition,
                consequent,
                alternate,
            } => self.dispatch(
                "if",
                Arguments::Conditional {
                    condition,
                    consequent,
                    alternate,
                },
                data_model,
            ),
            Node::For {
                loop_var,
                iterable_var,
                body,
            } => self.dispatch(
                "for",
                Arguments::Loop {
                    loop_var,
                    iterable_var,
                    body,
                },
                data_model,
            ),
            Node::Statement { name, args } => {
                self.dispatch(name, Arguments::Positional(args), data_model)
            }
        }
    }

    fn dispatch(
        &self,
        name: &str,
        args: Arguments<'_>,
        data_model: &mut DataModel,
    ) -> Result<String, EvalError> {
        let directive = self
            .registry
            .get(name)
            .ok_or_else(|| EvalError::UnregisteredDirective(name.to_string()))?;
        trace!(name, "dispatch directive");
        directive.evaluate(args, self, data_model)
    }

    /// Evaluate an interpolation to a value; it is only turned into text
    /// when written to the output.
    pub fn eval_expression(
        &self,
        expr: &Expression,
        data_model: &DataModel,
    ) -> Result<Value, EvalError> {
        match expr {
            Expression::Operand(operand) => Ok(resolve(operand, data_model)),
            Expression::Unary { op, operand } => {
                let op: UnaryOp = op.parse()?;
                evaluate_unary(resolve(operand, data_model), op)
            }
            Expression::Binary { left, op, right } => {
                let op: BinaryOp = op.parse()?;
                evaluate_binary(resolve(left, data_model), resolve(right, data_model), op)
            }
        }
    }
}

/// Look an operand up in the data model. Unbound names stand for
/// themselves, with one pair of surrounding quotes removed.
pub fn resolve(operand: &Operand, data_model: &DataModel) -> Value {
    match operand {
        Operand::Int(n) => Value::Int(*n),
        Operand::Name(name) => match data_model.get(name) {
            Some(value) => value.clone(),
            None => Value::Str(unquote(name).to_string()),
        },
    }
}

fn unquote(token: &str) -> &str {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(s: &str) -> Operand {
        Operand::Name(s.to_string())
    }

    fn model() -> DataModel {
        DataModel::from([
            ("name".to_string(), Value::from("Eva")),
            ("age".to_string(), Value::Int(23)),
            ("apple_count".to_string(), Value::Int(5)),
            (
                "friends".to_string(),
                Value::from(vec!["Billy", "John", "Emily"]),
            ),
        ])
    }

    #[test]
    fn interpolations_over_a_data_model() {
        let registry = Registry::default();
        let evaluator = Evaluator::new(&registry);
        let nodes = vec![
            Node::Text("Hello ".into()),
            Node::Expr(Expression::Operand(name("name"))),
            Node::Text(", what a fine age, ".into()),
            Node::Expr(Expression::Operand(name("age"))),
            Node::Text(", to be baking apple pies. You need ".into()),
            Node::Expr(Expression::Binary {
                left: Operand::Int(12),
                op: "-".into(),
                right: name("apple_count"),
            }),
            Node::Text(" more apples until you have a round dozen.".into()),
        ];

        assert_eq!(
            evaluator.render(&nodes, &mut model()).unwrap(),
            "Hello Eva, what a fine age, 23, to be baking apple pies. You need 7 more apples until you have a round dozen."
        );
    }

    #[test]
    fn unbound_names_are_literal_tokens() {
        let data_model = model();
        assert_eq!(resolve(&name("stranger"), &data_model), Value::from("stranger"));
        assert_eq!(resolve(&name("\"Superman\""), &data_model), Value::from("Superman"));
        assert_eq!(resolve(&name("'x'"), &data_model), Value::from("x"));
        assert_eq!(resolve(&name("\""), &data_model), Value::from("\""));
        assert_eq!(resolve(&Operand::Int(4), &data_model), Value::Int(4));
    }

    #[test]
    fn unary_negation() {
        let registry = Registry::default();
        let evaluator = Evaluator::new(&registry);
        let expr = Expression::Unary {
            op: "-".into(),
            operand: name("age"),
        };
        assert_eq!(evaluator.eval_expression(&expr, &model()), Ok(Value::Int(-23)));
    }

    #[test]
    fn unknown_operator() {
        let registry = Registry::default();
        let evaluator = Evaluator::new(&registry);
        let expr = Expression::Binary {
            left: Operand::Int(1),
            op: "<>".into(),
            right: Operand::Int(2),
        };
        assert_eq!(
            evaluator.eval_expression(&expr, &model()),
            Err(EvalError::UnknownOperator("<>".into()))
        );
    }

    #[test]
    fn if_picks_a_branch() {
        let registry = Registry::default();
        let evaluator = Evaluator::new(&registry);
        let node = Node::If {
            condition: Expression::Binary {
                left: name("age"),
                op: ">=".into(),
                right: Operand::Int(18),
            },
            consequent: Box::new(Node::Text("old enough".into())),
            alternate: Box::new(Node::Text("not old enough".into())),
        };

        let mut data_model = model();
        assert_eq!(evaluator.eval_node(&node, &mut data_model).unwrap(), "old enough");
        data_model.insert("age".into(), Value::Int(17));
        assert_eq!(
            evaluator.eval_node(&node, &mut data_model).unwrap(),
            "not old enough"
        );
    }

    #[test]
    fn for_restores_shadowed_binding() {
        let registry = Registry::default();
        let evaluator = Evaluator::new(&registry);
        let node = Node::For {
            loop_var: "name".into(),
            iterable_var: "friends".into(),
            body: Box::new(Node::Expr(Expression::Operand(name("name")))),
        };

        let mut data_model = model();
        assert_eq!(
            evaluator.eval_node(&node, &mut data_model).unwrap(),
            "BillyJohnEmily"
        );
        assert_eq!(data_model["name"], Value::from("Eva"));
    }

    #[test]
    fn for_removes_fresh_binding_even_on_error() {
        let registry = Registry::default();
        let evaluator = Evaluator::new(&registry);
        let node = Node::For {
            loop_var: "friend".into(),
            iterable_var: "friends".into(),
            body: Box::new(Node::Expr(Expression::Binary {
                left: name("friend"),
                op: "-".into(),
                right: Operand::Int(1),
            })),
        };

        let mut data_model = model();
        assert!(matches!(
            evaluator.eval_node(&node, &mut data_model),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert!(!data_model.contains_key("friend"));
    }

    #[test]
    fn for_over_non_sequence() {
        let registry = Registry::default();
        let evaluator = Evaluator::new(&registry);
        let node = Node::For {
            loop_var: "x".into(),
            iterable_var: "age".into(),
            body: Box::new(Node::Text(String::new())),
        };
        assert_eq!(
            evaluator.eval_node(&node, &mut model()),
            Err(EvalError::NotIterable("age".into()))
        );
    }

    #[test]
    fn unregistered_directive() {
        let registry = Registry::new();
        let evaluator = Evaluator::new(&registry);
        let node = Node::Statement {
            name: "extends".into(),
            args: vec![name("base")],
        };
        assert_eq!(
            evaluator.eval_node(&node, &mut model()),
            Err(EvalError::UnregisteredDirective("extends".into()))
        );
    }
}
