// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Codecs for the base primitive kinds: bool, int, float, string, bytes.
//!
//! The remaining primitive kinds (bigint, uuid, timestamp) are handled by
//! the singular scalar codecs later in the pipeline.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{
    ready_marshaler, ready_unmarshaler, MarshalerFactory, MarshalerMaker, UnmarshalerFactory,
    UnmarshalerMaker,
};
use crate::type_descriptor::{PrimitiveKind, TypeDescriptor};
use crate::value::Value;
use crate::wire::WireValue;
use std::sync::Arc;

/// Converter for one base primitive kind.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveCodec {
    kind: PrimitiveKind,
}

impl PrimitiveCodec {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }
}

impl Marshaler for PrimitiveCodec {
    fn marshal(&self, _ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        match (self.kind, v) {
            (PrimitiveKind::Bool, Value::Bool(b)) => Ok(WireValue::Bool(*b)),
            (PrimitiveKind::Int, Value::Int(i)) => Ok(WireValue::Int(*i)),
            (PrimitiveKind::Float, Value::Float(f)) => Ok(WireValue::Float(*f)),
            (PrimitiveKind::Str, Value::Str(s)) => Ok(WireValue::Str(s.clone())),
            (PrimitiveKind::Bytes, Value::Bytes(b)) => Ok(WireValue::Bytes(b.clone())),
            (kind, v) => Err(MarshalError::ShapeMismatch {
                expected: kind.name(),
                got: v.kind(),
            }),
        }
    }
}

impl Unmarshaler for PrimitiveCodec {
    fn unmarshal(&self, _ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        match (self.kind, v) {
            (PrimitiveKind::Bool, WireValue::Bool(b)) => Ok(Value::Bool(*b)),
            (PrimitiveKind::Int, WireValue::Int(i)) => Ok(Value::Int(*i)),
            (PrimitiveKind::Float, WireValue::Float(f)) => Ok(Value::Float(*f)),
            // JSON writers emit `1` for `1.0`.
            (PrimitiveKind::Float, WireValue::Int(i)) => Ok(Value::Float(*i as f64)),
            (PrimitiveKind::Str, WireValue::Str(s)) => Ok(Value::Str(s.clone())),
            (PrimitiveKind::Bytes, WireValue::Bytes(b)) => Ok(Value::Bytes(b.clone())),
            (kind, v) => Err(MarshalError::ShapeMismatch {
                expected: kind.name(),
                got: v.kind(),
            }),
        }
    }
}

fn base_kind(ty: &TypeDescriptor) -> Option<PrimitiveKind> {
    match ty {
        TypeDescriptor::Primitive(kind) if kind.is_base() => Some(*kind),
        _ => None,
    }
}

/// Builds marshalers for base primitive types.
#[derive(Debug, Default)]
pub struct PrimitiveMarshalerFactory;

impl MarshalerFactory for PrimitiveMarshalerFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        Ok(base_kind(ty).map(|kind| ready_marshaler(Arc::new(PrimitiveCodec::new(kind)))))
    }
}

/// Builds unmarshalers for base primitive types.
#[derive(Debug, Default)]
pub struct PrimitiveUnmarshalerFactory;

impl UnmarshalerFactory for PrimitiveUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        _ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        Ok(base_kind(ty).map(|kind| ready_unmarshaler(Arc::new(PrimitiveCodec::new(kind)))))
    }
}
