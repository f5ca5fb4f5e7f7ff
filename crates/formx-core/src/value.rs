//! Tagged values for the data tree
//!
//! [`Value`] is the single value type flowing through the engine: plain
//! scalars, plus `List`/`Record` for the nested data tree. Lists and
//! records are reference-counted so store snapshots are structurally
//! shared; writes copy only the spine they touch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A value in the data tree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Absent / null value
    Null,

    /// Boolean value
    Bool(bool),

    /// Numeric value (all numbers stored as f64)
    Number(f64),

    /// Text value
    Text(String),

    /// Repeatable list (row-group rows, or any array in the tree)
    List(Arc<Vec<Value>>),

    /// Nested record (the tree root, and each row of a row-group)
    Record(Arc<BTreeMap<String, Value>>),
}

impl Value {
    /// Create a record value from key/value pairs
    pub fn record<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Create a list value
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the record field with the given key, if this is a record
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(map) => map.get(key),
            _ => None,
        }
    }

    /// Get the list item at the given index, if this is a list
    pub fn item(&self, index: usize) -> Option<&Value> {
        match self {
            Value::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Coerce to a number for arithmetic
    ///
    /// Null, non-finite numbers, non-numeric text, lists and records all
    /// coerce to 0 -- invalid numeric input is never an error. Text that
    /// fully parses as a finite number (after trimming) yields that number.
    pub fn coerce_number(&self) -> f64 {
        match self {
            Value::Number(n) if n.is_finite() => *n,
            Value::Number(_) => 0.0,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => 0.0,
            },
            Value::Null | Value::List(_) | Value::Record(_) => 0.0,
        }
    }

    /// Whether the value can be meaningfully coerced to a number
    ///
    /// Drives loose equality: two sides that are both numeric-coercible
    /// compare as numbers, so `"50" == 50` holds.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Number(n) => n.is_finite(),
            Value::Bool(_) => true,
            Value::Text(s) => s.trim().parse::<f64>().map_or(false, f64::is_finite),
            _ => false,
        }
    }

    /// Truthiness for logical operators and IF conditions
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.is_finite() && *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(_) | Value::Record(_) => true,
        }
    }

    /// Loose equality for the `==` / `!=` operators
    ///
    /// Numeric-coercible values compare numerically (a numeric string
    /// equals its number); otherwise values compare within their own kind.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return self.coerce_number() == other.coerce_number();
        }
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }

    /// Dirty-check equality with relative epsilon tolerance on numbers
    ///
    /// Near-equal floats count as unchanged so a cascade cannot oscillate
    /// on representation error. Non-numbers compare strictly.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a == b {
                    return true;
                }
                (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
            }
            _ => self == other,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Record(map) => write!(f, "{{{} fields}}", map.len()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
