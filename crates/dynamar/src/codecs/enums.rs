// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Enumeration codec: variants travel by name.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{
    ready_marshaler, ready_unmarshaler, MarshalerFactory, MarshalerMaker, UnmarshalerFactory,
    UnmarshalerMaker,
};
use crate::type_descriptor::{EnumDescriptor, TypeDescriptor};
use crate::value::Value;
use crate::wire::WireValue;
use std::sync::Arc;

/// Converter for one enumeration type.
pub struct EnumCodec {
    desc: EnumDescriptor,
}

impl EnumCodec {
    fn check(&self, variant: &str) -> Result<(), MarshalError> {
        if !self.desc.has_variant(variant) {
            return Err(MarshalError::UnknownEnumVariant {
                ty: self.desc.name.clone(),
                variant: variant.to_string(),
            });
        }
        Ok(())
    }
}

impl Marshaler for EnumCodec {
    fn marshal(&self, _ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        match v {
            Value::Enum(variant) => {
                self.check(variant)?;
                Ok(WireValue::Str(variant.clone()))
            }
            other => Err(MarshalError::ShapeMismatch {
                expected: "enum",
                got: other.kind(),
            }),
        }
    }
}

impl Unmarshaler for EnumCodec {
    fn unmarshal(&self, _ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        match v {
            WireValue::Str(variant) => {
                self.check(variant)?;
                Ok(Value::Enum(variant.clone()))
            }
            other => Err(MarshalError::ShapeMismatch {
                expected: "string",
                got: other.kind(),
            }),
        }
    }
}

/// Builds marshalers for enumeration types.
#[derive(Debug, Default)]
pub struct EnumMarshalerFactory;

impl MarshalerFactory for EnumMarshalerFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        match ty.as_ref() {
            TypeDescriptor::Enum(desc) => Ok(Some(ready_marshaler(Arc::new(EnumCodec {
                desc: desc.clone(),
            })))),
            _ => Ok(None),
        }
    }
}

/// Builds unmarshalers for enumeration types.
#[derive(Debug, Default)]
pub struct EnumUnmarshalerFactory;

impl UnmarshalerFactory for EnumUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        _ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        match ty.as_ref() {
            TypeDescriptor::Enum(desc) => Ok(Some(ready_unmarshaler(Arc::new(EnumCodec {
                desc: desc.clone(),
            })))),
            _ => Ok(None),
        }
    }
}
