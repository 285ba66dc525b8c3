//! Values bound to template parameters and stored in option maps.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{GenError, GenResult};

/// Marker substituted for [`Value::Omit`]. Any output line containing it is
/// dropped when the output buffer is finalized.
pub const OMIT_TAG: &str = "REMOVE_LINE_TAG";

/// A value that can be bound to a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// Drop every output line this value is substituted into.
    Omit,
}

impl Value {
    /// Build a structured value from any serializable type.
    ///
    /// Struct fields become object fields, `None`/`null` becomes [`Value::Omit`]
    /// and sequences become lists.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> GenResult<Self> {
        Ok(Self::from(serde_json::to_value(value)?))
    }

    pub fn is_omit(&self) -> bool {
        matches!(self, Value::Omit)
    }

    /// Look up a field path (already split on `.`) inside this value.
    pub fn lookup<'a, I>(&self, path: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self;
        for segment in path {
            match current {
                Value::Object(fields) => current = fields.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Render the value as the text that replaces a placeholder.
    pub fn render(&self, path: &str) -> GenResult<String> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Omit => Ok(OMIT_TAG.to_string()),
            Value::List(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    rendered.push(item.render(path)?);
                }
                Ok(rendered.join(";"))
            }
            Value::Object(_) => Err(GenError::NotScalar(path.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render("") {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<object>"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Omit,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
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

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Omit)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Object(fields)
    }
}
