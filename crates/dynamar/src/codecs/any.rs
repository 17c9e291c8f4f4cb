// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Structural fallback codec for `any`-typed values.
//!
//! Converts without type guidance: native collections become wire lists and
//! maps, non-wire scalars are rendered as strings on encode, and decode maps
//! each wire shape to its closest native one.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{
    ready_marshaler, ready_unmarshaler, MarshalerFactory, MarshalerMaker, UnmarshalerFactory,
    UnmarshalerMaker,
};
use crate::type_descriptor::TypeDescriptor;
use crate::value::Value;
use crate::wire::{WireMap, WireValue};
use std::sync::Arc;

/// Structurally convert a native value to its wire form.
pub fn value_to_wire(v: &Value) -> Result<WireValue, MarshalError> {
    Ok(match v {
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Int(i) => WireValue::Int(*i),
        Value::BigInt(i) => WireValue::Str(i.to_string()),
        Value::Float(f) => WireValue::Float(*f),
        Value::Str(s) => WireValue::Str(s.clone()),
        Value::Bytes(b) => WireValue::Bytes(b.clone()),
        Value::Uuid(u) => WireValue::Str(u.to_string()),
        Value::Timestamp(ts) => WireValue::Str(ts.to_rfc3339()),
        Value::Enum(name) => WireValue::Str(name.clone()),
        Value::Seq(items) | Value::Set(items) | Value::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(value_to_wire(item)?);
            }
            WireValue::List(out)
        }
        Value::Map(entries) => {
            let mut out = WireMap::with_capacity(entries.len());
            for (k, val) in entries {
                let Value::Str(key) = k else {
                    return Err(MarshalError::InvalidValue(format!(
                        "untyped map key must be a string, got {}",
                        k.kind()
                    )));
                };
                if out.insert(key.clone(), value_to_wire(val)?).is_some() {
                    return Err(MarshalError::DuplicateKey(key.clone()));
                }
            }
            WireValue::Map(out)
        }
        Value::Record { fields, .. } => {
            let mut out = WireMap::with_capacity(fields.len());
            for (k, val) in fields {
                out.insert(k.clone(), value_to_wire(val)?);
            }
            WireValue::Map(out)
        }
    })
}

/// Structurally convert a wire value to its closest native form.
///
/// Also used to materialize raw-input captures for records declaring a
/// source field.
pub fn wire_to_value(v: &WireValue) -> Value {
    match v {
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Int(i) => Value::Int(*i),
        WireValue::Float(f) => Value::Float(*f),
        WireValue::Str(s) => Value::Str(s.clone()),
        WireValue::Bytes(b) => Value::Bytes(b.clone()),
        WireValue::List(items) => Value::Seq(items.iter().map(wire_to_value).collect()),
        WireValue::Map(map) => Value::Map(
            map.iter()
                .map(|(k, val)| (Value::Str(k.clone()), wire_to_value(val)))
                .collect(),
        ),
    }
}

struct AnyMarshaler;

impl Marshaler for AnyMarshaler {
    fn marshal(&self, _ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        value_to_wire(v)
    }
}

struct AnyUnmarshaler;

impl Unmarshaler for AnyUnmarshaler {
    fn unmarshal(&self, _ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        Ok(wire_to_value(v))
    }
}

/// Last stage in the standard pipeline; claims only `any`.
#[derive(Debug)]
pub struct AnyMarshalerFactory;

impl MarshalerFactory for AnyMarshalerFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        match ty.as_ref() {
            TypeDescriptor::Any => Ok(Some(ready_marshaler(Arc::new(AnyMarshaler)))),
            _ => Ok(None),
        }
    }
}

/// Last stage in the standard pipeline; claims only `any`.
#[derive(Debug)]
pub struct AnyUnmarshalerFactory;

impl UnmarshalerFactory for AnyUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        _ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        match ty.as_ref() {
            TypeDescriptor::Any => Ok(Some(ready_unmarshaler(Arc::new(AnyUnmarshaler)))),
            _ => Ok(None),
        }
    }
}
