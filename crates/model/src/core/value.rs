use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single decoded cell of a source result row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    /// Raw cell content that could not be decoded as UTF-8.
    Bytes(Vec<u8>),
    Null,
}

impl Value {
    /// Numeric view of the value. Only numeric variants qualify; strings are
    /// not parsed, so `"42"` and `"N/A"` both yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(_)
            | Value::Boolean(_)
            | Value::Timestamp(_)
            | Value::Bytes(_)
            | Value::Null => None,
        }
    }

    /// Textual view of the value, `None` for nulls and undecodable bytes.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Uint(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
            Value::Boolean(v) => Some(v.to_string()),
            Value::Timestamp(v) => Some(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Bytes(_) => None,
            Value::Null => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "long",
            Value::Uint(_) => "unsignedLong",
            Value::Float(_) => "double",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "dateTime",
            Value::Bytes(_) => "bytes",
            Value::Null => "null",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Option<Value>,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        FieldValue {
            name: name.into(),
            value: Some(value),
        }
    }
}
