// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Native dynamic value model.
//!
//! Rust has no runtime reflection, so the "native" side of a conversion is
//! itself a dynamic value: a [`Value`] shaped according to some
//! [`TypeDescriptor`](crate::type_descriptor::TypeDescriptor). Records carry
//! their type identity name, which is what polymorphic dispatch keys on.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Order-preserving map of a record's fields, keyed by source identifier.
pub type FieldMap = IndexMap<String, Value>;

/// A native dynamic value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// A variant of a closed enum type, by variant name.
    Enum(String),
    Seq(Vec<Value>),
    Set(Vec<Value>),
    Tuple(Vec<Value>),
    /// Key/value pairs; keys need not be strings.
    Map(Vec<(Value, Value)>),
    /// A composite value: record identity name plus named fields.
    Record { name: String, fields: FieldMap },
}

impl Value {
    /// Short variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::Enum(_) => "enum",
            Self::Seq(_) => "seq",
            Self::Set(_) => "set",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "map",
            Self::Record { .. } => "record",
        }
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if the value is an empty collection.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Self::Seq(v) | Self::Set(v) | Self::Tuple(v) => v.is_empty(),
            Self::Map(v) => v.is_empty(),
            Self::Str(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            _ => false,
        }
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

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as a record's field map.
    pub fn as_record(&self) -> Option<(&str, &FieldMap)> {
        match self {
            Self::Record { name, fields } => Some((name, fields)),
            _ => None,
        }
    }

    /// Get a record field by source identifier.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Record { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// Build a record value.
    pub fn record<N, K, I>(name: N, fields: I) -> Self
    where
        N: Into<String>,
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Record {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// Floats compare and hash by bit pattern so descriptors holding literal or
// default values stay usable as cache keys.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Seq(a), Self::Seq(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (
                Self::Record { name: an, fields: af },
                Self::Record { name: bn, fields: bf },
            ) => an == bn && af == bf,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::BigInt(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Str(v) => v.hash(state),
            Self::Bytes(v) => v.hash(state),
            Self::Uuid(v) => v.hash(state),
            Self::Timestamp(v) => v.hash(state),
            Self::Enum(v) => v.hash(state),
            Self::Seq(v) | Self::Set(v) | Self::Tuple(v) => v.hash(state),
            Self::Map(v) => v.hash(state),
            Self::Record { name, fields } => {
                name.hash(state);
                for (k, v) in fields {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

/// Conversion from a Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Fallible conversion from a [`Value`] reference back to a Rust value.
pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Option<Self>;
}

macro_rules! impl_value_conv {
    ($t:ty, $variant:ident, $as:expr) => {
        impl IntoValue for $t {
            fn into_value(self) -> Value {
                Value::$variant(self.into())
            }
        }

        impl FromValue for $t {
            fn from_value(v: &Value) -> Option<Self> {
                #[allow(clippy::redundant_closure_call)]
                ($as)(v)
            }
        }
    };
}

impl_value_conv!(bool, Bool, |v: &Value| v.as_bool());
impl_value_conv!(i64, Int, |v: &Value| v.as_int());
impl_value_conv!(f64, Float, |v: &Value| match v {
    Value::Float(f) => Some(*f),
    _ => None,
});
impl_value_conv!(String, Str, |v: &Value| v.as_str().map(str::to_string));

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_equality_by_bits() {
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
    }

    #[test]
    fn test_record_access() {
        let v = Value::record("Point", [("x", Value::Int(1)), ("y", Value::Int(2))]);
        assert_eq!(v.field("x"), Some(&Value::Int(1)));
        assert_eq!(v.as_record().unwrap().0, "Point");
        assert_eq!(v.field("z"), None);
    }

    #[test]
    fn test_into_value() {
        assert_eq!(42i64.into_value(), Value::Int(42));
        assert_eq!("a".into_value(), Value::Str("a".into()));
        assert_eq!(None::<i64>.into_value(), Value::Null);
    }

    #[test]
    fn test_empty_collection() {
        assert!(Value::Seq(vec![]).is_empty_collection());
        assert!(Value::Str(String::new()).is_empty_collection());
        assert!(!Value::Int(0).is_empty_collection());
    }
}
