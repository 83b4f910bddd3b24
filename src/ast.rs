use std::fmt;

/// A single operand: an integer literal or a name looked up at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Int(i64),
    Name(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(n) => write!(f, "{n}"),
            Operand::Name(name) => f.write_str(name),
        }
    }
}

/// At most one operation over at most two operands; operator symbols are
/// kept as written and resolved by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Operand(Operand),
    Unary {
        op: String,
        operand: Operand,
    },
    Binary {
        left: Operand,
        op: String,
        right: Operand,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Expr(Expression),
    If {
        condition: Expression,
        consequent: Box<Node>,
        alternate: Box<Node>, // Text("") when there is no else
    },
    For {
        loop_var: String,
        iterable_var: String,
        body: Box<Node>,
    },
    Statement {
        name: String,
        args: Vec<Operand>,
    },
    Block(Vec<Node>),
}

impl Node {
    /// Collapse a parsed branch: no nodes become `Text("")`, a single node
    /// is stored as itself, anything longer becomes a `Block`.
    pub fn branch(mut nodes: Vec<Node>) -> Node {
        match nodes.len() {
            0 => Node::Text(String::new()),
            1 => nodes.remove(0),
            _ => Node::Block(nodes),
        }
    }
}

pub type NodeList = Vec<Node>;
