// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Optional and new-type codecs.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{MarshalerFactory, MarshalerMaker, UnmarshalerFactory, UnmarshalerMaker};
use crate::type_descriptor::TypeDescriptor;
use crate::value::Value;
use crate::wire::WireValue;
use std::sync::Arc;

/// Null passes through; anything else delegates to the inner converter.
pub struct OptionalMarshaler {
    inner: Arc<dyn Marshaler>,
}

impl Marshaler for OptionalMarshaler {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        match v {
            Value::Null => Ok(WireValue::Null),
            other => self.inner.marshal(ctx, other),
        }
    }
}

pub struct OptionalUnmarshaler {
    inner: Arc<dyn Unmarshaler>,
}

impl Unmarshaler for OptionalUnmarshaler {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        match v {
            WireValue::Null => Ok(Value::Null),
            other => self.inner.unmarshal(ctx, other),
        }
    }
}

/// Builds marshalers for optional types.
#[derive(Debug, Default)]
pub struct OptionalMarshalerFactory;

impl MarshalerFactory for OptionalMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        let TypeDescriptor::Optional(inner) = ty.as_ref() else {
            return Ok(None);
        };
        let ctx = ctx.clone();
        let inner = inner.clone();
        Ok(Some(Box::new(move || {
            Ok(Arc::new(OptionalMarshaler {
                inner: ctx.make_marshaler(&inner)?,
            }))
        })))
    }
}

/// Builds unmarshalers for optional types.
#[derive(Debug, Default)]
pub struct OptionalUnmarshalerFactory;

impl UnmarshalerFactory for OptionalUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        let TypeDescriptor::Optional(inner) = ty.as_ref() else {
            return Ok(None);
        };
        let ctx = ctx.clone();
        let inner = inner.clone();
        Ok(Some(Box::new(move || {
            Ok(Arc::new(OptionalUnmarshaler {
                inner: ctx.make_unmarshaler(&inner)?,
            }))
        })))
    }
}

/// New types convert exactly as their underlying type; the built converter
/// is the underlying type's own.
#[derive(Debug, Default)]
pub struct NewTypeMarshalerFactory;

impl MarshalerFactory for NewTypeMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        let TypeDescriptor::NewType { underlying, .. } = ty.as_ref() else {
            return Ok(None);
        };
        let ctx = ctx.clone();
        let underlying = underlying.clone();
        Ok(Some(Box::new(move || ctx.make_marshaler(&underlying))))
    }
}

/// Decode-side new-type factory.
#[derive(Debug, Default)]
pub struct NewTypeUnmarshalerFactory;

impl UnmarshalerFactory for NewTypeUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        let TypeDescriptor::NewType { underlying, .. } = ty.as_ref() else {
            return Ok(None);
        };
        let ctx = ctx.clone();
        let underlying = underlying.clone();
        Ok(Some(Box::new(move || ctx.make_unmarshaler(&underlying))))
    }
}
