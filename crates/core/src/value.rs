//! Domain value types for prismkv
//!
//! This module defines:
//! - Value: the unified domain type every raw driver reply converts into
//!
//! `Value` is the homogeneous element type of ordered batch results
//! (`Pipeline::sync_all`, `Transaction::exec`). Typed entry points convert
//! to narrower domain types (`Option<String>`, `i64`, ...) instead; `Value`
//! exists so a mixed batch can be returned as one collection.
//!
//! ## Type Rules
//!
//! - No implicit coercions: `Int(1) != Float(1.0)`, `Binary(b"x") != Text("x")`
//! - Float equality is IEEE-754: `NaN != NaN`, `-0.0 == 0.0`
//! - `Nil` is the canonical absence value, produced wherever the driver
//!   reported "no value"

use serde::{Deserialize, Serialize};

/// Canonical domain value for all client surfaces.
///
/// Every raw driver reply shape has exactly one `Value` rendering. The
/// `Okay` variant captures status replies (`+OK` and friends) that carry no
/// payload, so a batch of writes still yields one entry per operation.
///
/// ## Type Equality
///
/// Different variants are never equal, even when they "look" the same:
/// - `Int(1) != Float(1.0)`
/// - `Binary(b"hello") != Text("hello")`
///
/// Float equality follows IEEE-754 semantics:
/// - `NaN != NaN`
/// - `-0.0 == 0.0`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value (missing key, empty reply)
    Nil,
    /// Status reply with no payload (`+OK` and friends)
    Okay,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Binary(Vec<u8>),
    /// Ordered collection of values
    List(Vec<Value>),
    /// Unordered collection of values (driver iteration order preserved)
    Set(Vec<Value>),
    /// Field/value pairs (driver iteration order preserved)
    Map(Vec<(Value, Value)>),
}

// Custom PartialEq for IEEE-754 float semantics; derive would forbid f64.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Okay, Value::Okay) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Different variants are never equal
            _ => false,
        }
    }
}

impl Value {
    /// Get the variant name as a static string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Okay => "Okay",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Text(_) => "Text",
            Value::Binary(_) => "Binary",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
        }
    }

    /// Check if this is the absence value.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get as bool if this is a Bool value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a Text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as byte slice if this is a Binary value.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get as value slice if this is a List value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Nil,
        }
    }
}
