use std::collections::HashMap;
use std::fmt;

use serde::de::Error as _;
use serde::Serialize;

use crate::error::Error;

/// Variable bindings a template is rendered against.
pub type DataModel = HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Seq(Vec<Value>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Seq(items) => !items.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Seq(_) => "sequence",
        }
    }

    pub(crate) fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            // Integral floats keep a fractional digit so `2 ^ 3` reads `8.0`.
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => {
                write!(f, "{x:.1}")
            }
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = serde_json::Error;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::String(s) => Ok(Value::Str(s)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| serde_json::Error::custom(format!("unsupported number {n}"))),
            },
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Seq),
            serde_json::Value::Null => Err(serde_json::Error::custom("null has no template value")),
            serde_json::Value::Object(_) => {
                Err(serde_json::Error::custom("nested objects have no template value"))
            }
        }
    }
}

/// Build a data model from a JSON object such as `{"name": "Eva", "age": 23}`.
pub fn data_model_from_json(json: &str) -> Result<DataModel, Error> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    let model = map
        .into_iter()
        .map(|(key, value)| Value::try_from(value).map(|value| (key, value)))
        .collect::<Result<DataModel, _>>()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::Float(8.0).to_string(), "8.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Float(1e16).to_string(), "10000000000000000.0");
        assert_eq!(Value::Float(-3.0).to_string(), "-3.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::from("Eva").to_string(), "Eva");
        assert_eq!(Value::from(vec!["Billy", "John"]).to_string(), "[Billy, John]");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(3).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Seq(vec![]).is_truthy());
        assert!(Value::from(vec![1]).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
    }

    #[test]
    fn data_model_from_json_object() {
        let model = data_model_from_json(
            r#"{"name": "Eva", "age": 23, "ratio": 0.5, "adult": true, "friends": ["Billy", "John"]}"#,
        )
        .unwrap();

        assert_eq!(model["name"], Value::from("Eva"));
        assert_eq!(model["age"], Value::Int(23));
        assert_eq!(model["ratio"], Value::Float(0.5));
        assert_eq!(model["adult"], Value::Bool(true));
        assert_eq!(model["friends"], Value::from(vec!["Billy", "John"]));
    }

    #[test]
    fn data_model_from_json_rejects_null_and_non_objects() {
        assert!(matches!(
            data_model_from_json(r#"{"x": null}"#),
            Err(Error::Json(_))
        ));
        assert!(data_model_from_json(r#"{"x": {"y": 1}}"#).is_err());
        assert!(data_model_from_json("[1, 2]").is_err());
    }

    #[test]
    fn serializes_untagged() {
        let value = Value::from(vec![Value::Int(1), Value::from("a"), Value::Bool(false)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,"a",false]"#);
    }
}
