// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Primitive-only union codec.
//!
//! Handles unions whose members are all base primitive types by matching the
//! value's own shape against the member set. Record unions are claimed
//! earlier by polymorphic dispatch; anything else is unhandled.

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

/// Converter for a union of base primitive kinds.
#[derive(Debug, Clone)]
pub struct PrimitiveUnionCodec {
    kinds: Vec<PrimitiveKind>,
}

impl PrimitiveUnionCodec {
    fn has(&self, kind: PrimitiveKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl Marshaler for PrimitiveUnionCodec {
    fn marshal(&self, _ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        match v {
            Value::Bool(b) if self.has(PrimitiveKind::Bool) => Ok(WireValue::Bool(*b)),
            Value::Int(i) if self.has(PrimitiveKind::Int) => Ok(WireValue::Int(*i)),
            Value::Float(f) if self.has(PrimitiveKind::Float) => Ok(WireValue::Float(*f)),
            Value::Str(s) if self.has(PrimitiveKind::Str) => Ok(WireValue::Str(s.clone())),
            Value::Bytes(b) if self.has(PrimitiveKind::Bytes) => Ok(WireValue::Bytes(b.clone())),
            other => Err(MarshalError::ShapeMismatch {
                expected: "primitive union member",
                got: other.kind(),
            }),
        }
    }
}

impl Unmarshaler for PrimitiveUnionCodec {
    fn unmarshal(&self, _ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        match v {
            WireValue::Bool(b) if self.has(PrimitiveKind::Bool) => Ok(Value::Bool(*b)),
            WireValue::Int(i) if self.has(PrimitiveKind::Int) => Ok(Value::Int(*i)),
            // A wire int may satisfy a float-only union.
            WireValue::Int(i) if self.has(PrimitiveKind::Float) => Ok(Value::Float(*i as f64)),
            WireValue::Float(f) if self.has(PrimitiveKind::Float) => Ok(Value::Float(*f)),
            WireValue::Str(s) if self.has(PrimitiveKind::Str) => Ok(Value::Str(s.clone())),
            WireValue::Bytes(b) if self.has(PrimitiveKind::Bytes) => Ok(Value::Bytes(b.clone())),
            other => Err(MarshalError::ShapeMismatch {
                expected: "primitive union member",
                got: other.kind(),
            }),
        }
    }
}

fn primitive_members(ty: &TypeDescriptor) -> Option<Vec<PrimitiveKind>> {
    let TypeDescriptor::Union(members) = ty else {
        return None;
    };
    let mut kinds = Vec::with_capacity(members.len());
    for m in members {
        match m.as_ref() {
            TypeDescriptor::Primitive(kind) if kind.is_base() => kinds.push(*kind),
            _ => return None,
        }
    }
    Some(kinds)
}

/// Builds marshalers for primitive-only unions.
#[derive(Debug, Default)]
pub struct PrimitiveUnionMarshalerFactory;

impl MarshalerFactory for PrimitiveUnionMarshalerFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        Ok(primitive_members(ty)
            .map(|kinds| ready_marshaler(Arc::new(PrimitiveUnionCodec { kinds }))))
    }
}

/// Builds unmarshalers for primitive-only unions.
#[derive(Debug, Default)]
pub struct PrimitiveUnionUnmarshalerFactory;

impl UnmarshalerFactory for PrimitiveUnionUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        _ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        Ok(primitive_members(ty)
            .map(|kinds| ready_unmarshaler(Arc::new(PrimitiveUnionCodec { kinds }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_matches_by_shape() {
        let codec = PrimitiveUnionCodec {
            kinds: vec![PrimitiveKind::Int, PrimitiveKind::Str],
        };
        let ctx = MarshalContext {
            registry: Arc::new(Registry::new()),
        };
        assert_eq!(codec.marshal(&ctx, &Value::Int(1)).unwrap(), WireValue::Int(1));
        assert_eq!(
            codec.marshal(&ctx, &Value::Str("x".into())).unwrap(),
            WireValue::Str("x".into())
        );
        assert!(codec.marshal(&ctx, &Value::Bool(true)).is_err());
    }

    #[test]
    fn test_declines_non_primitive_union() {
        let ty = TypeDescriptor::union([TypeDescriptor::int(), TypeDescriptor::uuid()]);
        assert!(primitive_members(&ty).is_none());
    }
}
