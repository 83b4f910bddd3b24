//! Operator tables for interpolated expressions.
//!
//! Symbols are resolved when an expression is evaluated, so a template with
//! an unknown operator still compiles and fails at render time.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::EvalError;
use crate::value::Value;

pub type EvalResult = Result<Value, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Gt,
    Lt,
    GtEq,
    LtEq,
    Eq,
    NotEq,
    In,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::GtEq => ">=",
            BinaryOp::LtEq => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::In => "in",
        }
    }
}

impl FromStr for BinaryOp {
    type Err = EvalError;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        Ok(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "^" => BinaryOp::Pow,
            ">" => BinaryOp::Gt,
            "<" => BinaryOp::Lt,
            ">=" => BinaryOp::GtEq,
            "<=" => BinaryOp::LtEq,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "in" => BinaryOp::In,
            other => return Err(EvalError::UnknownOperator(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

impl FromStr for UnaryOp {
    type Err = EvalError;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        match symbol {
            "-" => Ok(UnaryOp::Neg),
            other => Err(EvalError::UnknownOperator(other.to_string())),
        }
    }
}

#[cold]
fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.symbol().to_string(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

pub fn evaluate_unary(value: Value, op: UnaryOp) -> EvalResult {
    match (&value, op) {
        (Value::Int(n), UnaryOp::Neg) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(EvalError::IntegerOverflow("negation")),
        (Value::Float(x), UnaryOp::Neg) => Ok(Value::Float(-x)),
        _ => Err(EvalError::InvalidUnary {
            op: "-".to_string(),
            operand: value.type_name(),
        }),
    }
}

pub fn evaluate_binary(left: Value, right: Value, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loosely_equal(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!loosely_equal(&left, &right))),
        BinaryOp::Gt | BinaryOp::Lt | BinaryOp::GtEq | BinaryOp::LtEq => {
            let ordering = compare(&left, &right).ok_or_else(|| mismatch(op, &left, &right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::GtEq => ordering != Ordering::Less,
                _ => ordering != Ordering::Greater,
            }))
        }
        BinaryOp::In => contains(&right, &left).ok_or_else(|| mismatch(op, &left, &right)),
        BinaryOp::Div | BinaryOp::Pow => eval_float_only(&left, &right, op),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Mod => {
            eval_arith(left, right, op)
        }
    }
}

/// Equality across kinds: integers and floats compare numerically, any
/// other pair of different kinds is unequal.
fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            left.as_float() == right.as_float()
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.as_float()?.partial_cmp(&right.as_float()?),
    }
}

fn contains(haystack: &Value, needle: &Value) -> Option<Value> {
    match (haystack, needle) {
        (Value::Seq(items), _) => Some(Value::Bool(
            items.iter().any(|item| loosely_equal(item, needle)),
        )),
        (Value::Str(s), Value::Str(sub)) => Some(Value::Bool(s.contains(sub.as_str()))),
        _ => None,
    }
}

fn eval_float_only(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        return Err(mismatch(op, left, right));
    };
    match op {
        BinaryOp::Div if b == 0.0 => Err(EvalError::DivisionByZero),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        _ => Ok(Value::Float(a.powf(b))),
    }
}

fn eval_arith(left: Value, right: Value, op: BinaryOp) -> EvalResult {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_int_arith(a, b, op),
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => Ok(Value::Str(a + &b)),
        (Value::Seq(mut a), Value::Seq(b)) if op == BinaryOp::Add => {
            a.extend(b);
            Ok(Value::Seq(a))
        }
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) if op == BinaryOp::Mul => {
            // Negative counts repeat zero times.
            let times = usize::try_from(n.max(0))
                .ok()
                .and_then(|times| s.len().checked_mul(times).map(|len| (times, len)));
            let (times, len) = times.ok_or(EvalError::IntegerOverflow("repetition"))?;
            let mut repeated = String::new();
            if len > 0 {
                repeated
                    .try_reserve_exact(len)
                    .map_err(|_| EvalError::IntegerOverflow("repetition"))?;
                for _ in 0..times {
                    repeated.push_str(&s);
                }
            }
            Ok(Value::Str(repeated))
        }
        (left, right) => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => eval_float_arith(a, b, op),
            _ => Err(mismatch(op, &left, &right)),
        },
    }
}

fn eval_int_arith(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    let (result, op_name) = match op {
        BinaryOp::Add => (a.checked_add(b), "addition"),
        BinaryOp::Sub => (a.checked_sub(b), "subtraction"),
        BinaryOp::Mul => (a.checked_mul(b), "multiplication"),
        _ if b == 0 => return Err(EvalError::DivisionByZero),
        _ => (a.checked_rem(b), "remainder"),
    };
    result.map(Value::Int).ok_or(EvalError::IntegerOverflow(op_name))
}

fn eval_float_arith(a: f64, b: f64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        _ if b == 0.0 => Err(EvalError::DivisionByZero),
        _ => Ok(Value::Float(a % b)),
    }
}
