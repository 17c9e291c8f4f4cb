// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Factory resolution contract and policy factories.
//!
//! A factory either declines a type (`Ok(None)`) or returns a deferred
//! constructor for a converter. The constructor indirection is what lets
//! recursive types be broken: resolution (is this type mine?) is separated
//! from construction (build the converter, possibly recursing). The `Result`
//! layer carries configuration faults only — ambiguity, forbidden types —
//! never "don't know".

use crate::context::{MarshalFactoryContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::registry::RegistryItem;
use crate::type_descriptor::TypeDescriptor;
use std::collections::HashSet;
use std::sync::Arc;

/// Zero-argument deferred marshaler constructor.
pub type MarshalerMaker = Box<dyn FnOnce() -> Result<Arc<dyn Marshaler>, MarshalError>>;

/// Zero-argument deferred unmarshaler constructor.
pub type UnmarshalerMaker = Box<dyn FnOnce() -> Result<Arc<dyn Unmarshaler>, MarshalError>>;

/// A strategy that builds marshalers for types it recognizes.
pub trait MarshalerFactory: Send + Sync {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError>;
}

/// A strategy that builds unmarshalers for types it recognizes.
pub trait UnmarshalerFactory: Send + Sync {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError>;
}

/// A maker that yields an already-built marshaler.
pub fn ready_marshaler(m: Arc<dyn Marshaler>) -> MarshalerMaker {
    Box::new(move || Ok(m))
}

/// A maker that yields an already-built unmarshaler.
pub fn ready_unmarshaler(u: Arc<dyn Unmarshaler>) -> UnmarshalerMaker {
    Box::new(move || Ok(u))
}

/// Resolves registry override items for the exact type key, then
/// globally-scoped items (which see every type and may decline).
///
/// Installed first in the standard pipeline so host-registered converters,
/// factories, and type overrides win over every built-in codec.
#[derive(Debug, Default)]
pub struct OverrideMarshalerFactory;

impl MarshalerFactory for OverrideMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        let mut items = ctx.registry.items_for(ty);
        items.extend(ctx.registry.global_items());
        for item in items {
            match item {
                RegistryItem::Marshaler(m) => return Ok(Some(ready_marshaler(m))),
                RegistryItem::MarshalerFactory(f) => {
                    if let Some(maker) = f.make_marshaler(ctx, ty)? {
                        return Ok(Some(maker));
                    }
                }
                RegistryItem::TypeOverride(target) => {
                    log::debug!("[marshal] type override: {} -> {}", ty, target);
                    let ctx = ctx.clone();
                    return Ok(Some(Box::new(move || ctx.make_marshaler(&target))));
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

/// Resolves registry override items for the exact type key, then
/// globally-scoped items (decode side).
#[derive(Debug, Default)]
pub struct OverrideUnmarshalerFactory;

impl UnmarshalerFactory for OverrideUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        let mut items = ctx.registry.items_for(ty);
        items.extend(ctx.registry.global_items());
        for item in items {
            match item {
                RegistryItem::Unmarshaler(u) => return Ok(Some(ready_unmarshaler(u))),
                RegistryItem::UnmarshalerFactory(f) => {
                    if let Some(maker) = f.make_unmarshaler(ctx, ty)? {
                        return Ok(Some(maker));
                    }
                }
                RegistryItem::TypeOverride(target) => {
                    log::debug!("[unmarshal] type override: {} -> {}", ty, target);
                    let ctx = ctx.clone();
                    return Ok(Some(Box::new(move || ctx.make_unmarshaler(&target))));
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

/// Fails resolution for explicitly blocked types.
#[derive(Debug, Default)]
pub struct ForbiddenTypeFactory {
    tys: HashSet<Arc<TypeDescriptor>>,
}

impl ForbiddenTypeFactory {
    pub fn new<I: IntoIterator<Item = Arc<TypeDescriptor>>>(tys: I) -> Self {
        Self {
            tys: tys.into_iter().collect(),
        }
    }

    fn check(&self, ty: &Arc<TypeDescriptor>) -> Result<(), MarshalError> {
        if self.tys.contains(ty) {
            return Err(MarshalError::ForbiddenType(ty.clone()));
        }
        Ok(())
    }
}

impl MarshalerFactory for ForbiddenTypeFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        self.check(ty)?;
        Ok(None)
    }
}

impl UnmarshalerFactory for ForbiddenTypeFactory {
    fn make_unmarshaler(
        &self,
        _ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        self.check(ty)?;
        Ok(None)
    }
}
