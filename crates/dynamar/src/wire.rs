// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! The universal wire-value model.
//!
//! Every converter built by this crate produces or consumes a [`WireValue`]:
//! the closed null/bool/number/string/bytes/list/map data model that external
//! wire formats (JSON text, YAML text, ...) read and write. Wire values are
//! immutable once produced and compare structurally; map key order is
//! preserved for output stability but does not participate in equality.

use indexmap::IndexMap;

/// Order-preserving string-keyed map of wire values.
pub type WireMap = IndexMap<String, WireValue>;

/// A universal wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<WireValue>),
    Map(WireMap),
}

impl WireValue {
    /// Short variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as int.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as list.
    pub fn as_list(&self) -> Option<&[WireValue]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as map.
    pub fn as_map(&self) -> Option<&WireMap> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Build a map value from key/value pairs.
    pub fn map<K: Into<String>, I: IntoIterator<Item = (K, WireValue)>>(entries: I) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_equality_ignores_order() {
        let a = WireValue::map([("x", WireValue::Int(1)), ("y", WireValue::Int(2))]);
        let b = WireValue::map([("y", WireValue::Int(2)), ("x", WireValue::Int(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(WireValue::Int(3).as_int(), Some(3));
        assert_eq!(WireValue::Int(3).as_float(), None);
        assert_eq!(WireValue::Str("a".into()).as_str(), Some("a"));
        assert!(WireValue::Null.is_null());
        assert_eq!(WireValue::Bool(true).kind(), "bool");
    }
}
