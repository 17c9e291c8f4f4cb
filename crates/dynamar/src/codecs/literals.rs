// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Literal codec: the value must equal one of a closed set of scalars.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{
    ready_marshaler, ready_unmarshaler, MarshalerFactory, MarshalerMaker, UnmarshalerFactory,
    UnmarshalerMaker,
};
use crate::type_descriptor::{LiteralValue, TypeDescriptor};
use crate::value::Value;
use crate::wire::WireValue;
use std::sync::Arc;

/// Converter for one literal set.
pub struct LiteralCodec {
    values: Vec<LiteralValue>,
}

impl Marshaler for LiteralCodec {
    fn marshal(&self, _ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        for lit in &self.values {
            if &lit.to_value() == v {
                return Ok(lit.to_wire());
            }
        }
        Err(MarshalError::InvalidValue(format!(
            "{:?} is not one of the {} allowed literal values",
            v,
            self.values.len()
        )))
    }
}

impl Unmarshaler for LiteralCodec {
    fn unmarshal(&self, _ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        for lit in &self.values {
            if &lit.to_wire() == v {
                return Ok(lit.to_value());
            }
        }
        Err(MarshalError::InvalidValue(format!(
            "{:?} is not one of the {} allowed literal values",
            v,
            self.values.len()
        )))
    }
}

/// Builds marshalers for literal types.
#[derive(Debug, Default)]
pub struct LiteralMarshalerFactory;

impl MarshalerFactory for LiteralMarshalerFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        match ty.as_ref() {
            TypeDescriptor::Literal(values) => Ok(Some(ready_marshaler(Arc::new(LiteralCodec {
                values: values.clone(),
            })))),
            _ => Ok(None),
        }
    }
}

/// Builds unmarshalers for literal types.
#[derive(Debug, Default)]
pub struct LiteralUnmarshalerFactory;

impl UnmarshalerFactory for LiteralUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        _ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        match ty.as_ref() {
            TypeDescriptor::Literal(values) => Ok(Some(ready_unmarshaler(Arc::new(
                LiteralCodec {
                    values: values.clone(),
                },
            )))),
            _ => Ok(None),
        }
    }
}
