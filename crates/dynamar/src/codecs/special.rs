// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Singular scalar codecs: 128-bit integers, UUIDs, timestamps.
//!
//! All three carry string wire forms: bigints because they overflow the wire
//! int, UUIDs as hyphenated text, timestamps as RFC 3339.

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
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Converter for one non-base primitive kind.
#[derive(Debug, Clone, Copy)]
pub struct SpecialScalarCodec {
    kind: PrimitiveKind,
}

impl SpecialScalarCodec {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }
}

impl Marshaler for SpecialScalarCodec {
    fn marshal(&self, _ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        match (self.kind, v) {
            (PrimitiveKind::BigInt, Value::BigInt(i)) => Ok(WireValue::Str(i.to_string())),
            (PrimitiveKind::Uuid, Value::Uuid(u)) => Ok(WireValue::Str(u.to_string())),
            (PrimitiveKind::Timestamp, Value::Timestamp(ts)) => {
                Ok(WireValue::Str(ts.to_rfc3339()))
            }
            (kind, v) => Err(MarshalError::ShapeMismatch {
                expected: kind.name(),
                got: v.kind(),
            }),
        }
    }
}

impl Unmarshaler for SpecialScalarCodec {
    fn unmarshal(&self, _ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        match (self.kind, v) {
            (PrimitiveKind::BigInt, WireValue::Str(s)) => s
                .parse::<i128>()
                .map(Value::BigInt)
                .map_err(|e| MarshalError::InvalidValue(format!("bad bigint {:?}: {}", s, e))),
            // Small values may arrive as plain wire ints.
            (PrimitiveKind::BigInt, WireValue::Int(i)) => Ok(Value::BigInt(*i as i128)),
            (PrimitiveKind::Uuid, WireValue::Str(s)) => Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|e| MarshalError::InvalidValue(format!("bad uuid {:?}: {}", s, e))),
            (PrimitiveKind::Timestamp, WireValue::Str(s)) => DateTime::parse_from_rfc3339(s)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|e| MarshalError::InvalidValue(format!("bad timestamp {:?}: {}", s, e))),
            (kind, v) => Err(MarshalError::ShapeMismatch {
                expected: kind.name(),
                got: v.kind(),
            }),
        }
    }
}

fn special_kind(ty: &TypeDescriptor) -> Option<PrimitiveKind> {
    match ty {
        TypeDescriptor::Primitive(kind) if !kind.is_base() => Some(*kind),
        _ => None,
    }
}

/// Builds marshalers for the singular scalar types.
#[derive(Debug, Default)]
pub struct SpecialScalarMarshalerFactory;

impl MarshalerFactory for SpecialScalarMarshalerFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        Ok(special_kind(ty).map(|kind| ready_marshaler(Arc::new(SpecialScalarCodec::new(kind)))))
    }
}

/// Builds unmarshalers for the singular scalar types.
#[derive(Debug, Default)]
pub struct SpecialScalarUnmarshalerFactory;

impl UnmarshalerFactory for SpecialScalarUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        _ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        Ok(special_kind(ty).map(|kind| ready_unmarshaler(Arc::new(SpecialScalarCodec::new(kind)))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn mctx() -> MarshalContext {
        MarshalContext {
            registry: Arc::new(Registry::new()),
        }
    }

    fn uctx() -> UnmarshalContext {
        UnmarshalContext {
            registry: Arc::new(Registry::new()),
        }
    }

    #[test]
    fn test_bigint_string_round_trip() {
        let codec = SpecialScalarCodec::new(PrimitiveKind::BigInt);
        let big = 170141183460469231731687303715884105727i128;
        let wire = codec.marshal(&mctx(), &Value::BigInt(big)).unwrap();
        assert_eq!(
            wire,
            WireValue::Str("170141183460469231731687303715884105727".into())
        );
        assert_eq!(codec.unmarshal(&uctx(), &wire).unwrap(), Value::BigInt(big));
    }

    #[test]
    fn test_uuid_round_trip() {
        let codec = SpecialScalarCodec::new(PrimitiveKind::Uuid);
        let u = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let wire = codec.marshal(&mctx(), &Value::Uuid(u)).unwrap();
        assert_eq!(codec.unmarshal(&uctx(), &wire).unwrap(), Value::Uuid(u));
    }

    #[test]
    fn test_bad_uuid_is_domain_error() {
        let codec = SpecialScalarCodec::new(PrimitiveKind::Uuid);
        let err = codec
            .unmarshal(&uctx(), &WireValue::Str("nope".into()))
            .unwrap_err();
        assert!(matches!(err, MarshalError::InvalidValue(_)));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let codec = SpecialScalarCodec::new(PrimitiveKind::Timestamp);
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let wire = codec.marshal(&mctx(), &Value::Timestamp(ts)).unwrap();
        assert_eq!(codec.unmarshal(&uctx(), &wire).unwrap(), Value::Timestamp(ts));
    }
}
