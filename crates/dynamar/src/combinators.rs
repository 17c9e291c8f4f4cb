// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Factory composition combinators.
//!
//! Multi (ordered alternation), Type-Cache (memoizing), Recursive
//! (cycle-breaking via forwarding proxies), and Setup (lazy dependency
//! hooks) are all factories themselves, wrapping other factories.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{
    ready_marshaler, ready_unmarshaler, MarshalerFactory, MarshalerMaker, UnmarshalerFactory,
    UnmarshalerMaker,
};
use crate::type_descriptor::TypeDescriptor;
use crate::value::Value;
use crate::wire::WireValue;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

// ---------------------------------------------------------------------------
// Forwarding proxies

/// A marshaler slot allocated before a recursive build and filled after it
/// returns. Holders delegate to the filled converter.
#[derive(Default)]
pub struct MarshalerProxy {
    slot: OnceLock<Arc<dyn Marshaler>>,
}

impl MarshalerProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the proxy. Filling twice is a programming error.
    pub fn fill(&self, m: Arc<dyn Marshaler>) -> Result<(), MarshalError> {
        self.slot.set(m).map_err(|_| MarshalError::ProxyAlreadySet)
    }
}

impl Marshaler for MarshalerProxy {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        self.slot.get().ok_or(MarshalError::ProxyUnset)?.marshal(ctx, v)
    }
}

/// Decode-side forwarding proxy.
#[derive(Default)]
pub struct UnmarshalerProxy {
    slot: OnceLock<Arc<dyn Unmarshaler>>,
}

impl UnmarshalerProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the proxy. Filling twice is a programming error.
    pub fn fill(&self, u: Arc<dyn Unmarshaler>) -> Result<(), MarshalError> {
        self.slot.set(u).map_err(|_| MarshalError::ProxyAlreadySet)
    }
}

impl Unmarshaler for UnmarshalerProxy {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        self.slot
            .get()
            .ok_or(MarshalError::ProxyUnset)?
            .unmarshal(ctx, v)
    }
}

// ---------------------------------------------------------------------------
// Multi

/// Ordered alternation over child factories.
///
/// First match wins by default; in strict mode every child is consulted and
/// more than one match is a configuration error.
pub struct MultiMarshalerFactory {
    children: Vec<Arc<dyn MarshalerFactory>>,
    strict: bool,
}

impl MultiMarshalerFactory {
    pub fn new(children: Vec<Arc<dyn MarshalerFactory>>) -> Self {
        Self {
            children,
            strict: false,
        }
    }

    /// An alternation that must prove at most one child claims a type.
    pub fn strict(children: Vec<Arc<dyn MarshalerFactory>>) -> Self {
        Self {
            children,
            strict: true,
        }
    }
}

impl MarshalerFactory for MultiMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        if !self.strict {
            for child in &self.children {
                if let Some(maker) = child.make_marshaler(ctx, ty)? {
                    return Ok(Some(maker));
                }
            }
            return Ok(None);
        }

        let mut matches: Vec<MarshalerMaker> = Vec::new();
        for child in &self.children {
            if let Some(maker) = child.make_marshaler(ctx, ty)? {
                matches.push(maker);
            }
        }
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(MarshalError::AmbiguousMatches {
                ty: ty.clone(),
                count: n,
            }),
        }
    }
}

/// Decode-side ordered alternation.
pub struct MultiUnmarshalerFactory {
    children: Vec<Arc<dyn UnmarshalerFactory>>,
    strict: bool,
}

impl MultiUnmarshalerFactory {
    pub fn new(children: Vec<Arc<dyn UnmarshalerFactory>>) -> Self {
        Self {
            children,
            strict: false,
        }
    }

    pub fn strict(children: Vec<Arc<dyn UnmarshalerFactory>>) -> Self {
        Self {
            children,
            strict: true,
        }
    }
}

impl UnmarshalerFactory for MultiUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        if !self.strict {
            for child in &self.children {
                if let Some(maker) = child.make_unmarshaler(ctx, ty)? {
                    return Ok(Some(maker));
                }
            }
            return Ok(None);
        }

        let mut matches: Vec<UnmarshalerMaker> = Vec::new();
        for child in &self.children {
            if let Some(maker) = child.make_unmarshaler(ctx, ty)? {
                matches.push(maker);
            }
        }
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(MarshalError::AmbiguousMatches {
                ty: ty.clone(),
                count: n,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Type cache

enum MarshalerCacheEntry {
    Built(Arc<dyn Marshaler>),
    Failed,
}

/// Memoizes, per type descriptor, either the built marshaler or the fact
/// that resolution failed.
///
/// No lock is held across a nested build: cross-type cycles entered from
/// different threads must not deadlock, so concurrent first builds of one
/// type race and resolve first-write-wins on the map entry. The loser's
/// converter is discarded and both callers observe the same cached one.
///
/// A converter built mid-resolution may still hold unfilled recursion
/// proxies, so successful builds are not inserted here directly; the insert
/// is staged on the factory context and flushed after the enclosing
/// top-level resolution fills its proxies. Negative entries carry no
/// proxies and are recorded eagerly.
pub struct TypeCacheMarshalerFactory {
    inner: Arc<dyn MarshalerFactory>,
    cache: Arc<DashMap<Arc<TypeDescriptor>, MarshalerCacheEntry>>,
}

impl TypeCacheMarshalerFactory {
    pub fn new(inner: Arc<dyn MarshalerFactory>) -> Self {
        Self {
            inner,
            cache: Arc::new(DashMap::new()),
        }
    }
}

impl MarshalerFactory for TypeCacheMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        if let Some(entry) = self.cache.get(ty) {
            return match entry.value() {
                MarshalerCacheEntry::Built(m) => Ok(Some(ready_marshaler(m.clone()))),
                MarshalerCacheEntry::Failed => Ok(None),
            };
        }

        let Some(maker) = self.inner.make_marshaler(ctx, ty)? else {
            self.cache
                .entry(ty.clone())
                .or_insert(MarshalerCacheEntry::Failed);
            return Ok(None);
        };

        let cache = self.cache.clone();
        let ty = ty.clone();
        let pending = ctx.pending_publish.clone();
        Ok(Some(Box::new(move || {
            if let Some(entry) = cache.get(&ty) {
                if let MarshalerCacheEntry::Built(m) = entry.value() {
                    return Ok(m.clone());
                }
            }
            let built = maker()?;
            let staged = built.clone();
            pending.lock().push(Box::new(move || {
                match cache.entry(ty) {
                    dashmap::mapref::entry::Entry::Occupied(mut occ) => {
                        if matches!(occ.get(), MarshalerCacheEntry::Failed) {
                            occ.insert(MarshalerCacheEntry::Built(staged));
                        }
                    }
                    dashmap::mapref::entry::Entry::Vacant(vac) => {
                        vac.insert(MarshalerCacheEntry::Built(staged));
                    }
                }
            }));
            Ok(built)
        })))
    }
}

enum UnmarshalerCacheEntry {
    Built(Arc<dyn Unmarshaler>),
    Failed,
}

/// Decode-side memoizing combinator.
pub struct TypeCacheUnmarshalerFactory {
    inner: Arc<dyn UnmarshalerFactory>,
    cache: Arc<DashMap<Arc<TypeDescriptor>, UnmarshalerCacheEntry>>,
}

impl TypeCacheUnmarshalerFactory {
    pub fn new(inner: Arc<dyn UnmarshalerFactory>) -> Self {
        Self {
            inner,
            cache: Arc::new(DashMap::new()),
        }
    }
}

impl UnmarshalerFactory for TypeCacheUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        if let Some(entry) = self.cache.get(ty) {
            return match entry.value() {
                UnmarshalerCacheEntry::Built(u) => Ok(Some(ready_unmarshaler(u.clone()))),
                UnmarshalerCacheEntry::Failed => Ok(None),
            };
        }

        let Some(maker) = self.inner.make_unmarshaler(ctx, ty)? else {
            self.cache
                .entry(ty.clone())
                .or_insert(UnmarshalerCacheEntry::Failed);
            return Ok(None);
        };

        let cache = self.cache.clone();
        let ty = ty.clone();
        let pending = ctx.pending_publish.clone();
        Ok(Some(Box::new(move || {
            if let Some(entry) = cache.get(&ty) {
                if let UnmarshalerCacheEntry::Built(u) = entry.value() {
                    return Ok(u.clone());
                }
            }
            let built = maker()?;
            let staged = built.clone();
            pending.lock().push(Box::new(move || {
                match cache.entry(ty) {
                    dashmap::mapref::entry::Entry::Occupied(mut occ) => {
                        if matches!(occ.get(), UnmarshalerCacheEntry::Failed) {
                            occ.insert(UnmarshalerCacheEntry::Built(staged));
                        }
                    }
                    dashmap::mapref::entry::Entry::Vacant(vac) => {
                        vac.insert(UnmarshalerCacheEntry::Built(staged));
                    }
                }
            }));
            Ok(built)
        })))
    }
}

// ---------------------------------------------------------------------------
// Recursive

/// Breaks recursive type cycles with forwarding proxies.
///
/// Before the inner constructor runs for type `T`, a proxy for `T` is
/// registered in the context's in-progress map; re-encountering `T` during
/// the same top-level resolution yields the proxy immediately. Once the
/// inner build completes the proxy is filled exactly once and unregistered.
pub struct RecursiveMarshalerFactory {
    inner: Arc<dyn MarshalerFactory>,
}

impl RecursiveMarshalerFactory {
    pub fn new(inner: Arc<dyn MarshalerFactory>) -> Self {
        Self { inner }
    }
}

impl MarshalerFactory for RecursiveMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        if let Some(proxy) = ctx.in_progress.lock().get(ty) {
            log::debug!("[marshal] recursive resolution of {}", ty);
            let proxy = proxy.clone();
            return Ok(Some(Box::new(move || Ok(proxy as Arc<dyn Marshaler>))));
        }

        let Some(maker) = self.inner.make_marshaler(ctx, ty)? else {
            return Ok(None);
        };

        let ctx = ctx.clone();
        let ty = ty.clone();
        Ok(Some(Box::new(move || {
            let proxy = Arc::new(MarshalerProxy::new());
            ctx.in_progress.lock().insert(ty.clone(), proxy.clone());
            let result = maker();
            ctx.in_progress.lock().remove(&ty);
            let built = result?;
            proxy.fill(built.clone())?;
            Ok(built)
        })))
    }
}

/// Decode-side cycle-breaking combinator.
pub struct RecursiveUnmarshalerFactory {
    inner: Arc<dyn UnmarshalerFactory>,
}

impl RecursiveUnmarshalerFactory {
    pub fn new(inner: Arc<dyn UnmarshalerFactory>) -> Self {
        Self { inner }
    }
}

impl UnmarshalerFactory for RecursiveUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        if let Some(proxy) = ctx.in_progress.lock().get(ty) {
            log::debug!("[unmarshal] recursive resolution of {}", ty);
            let proxy = proxy.clone();
            return Ok(Some(Box::new(move || Ok(proxy as Arc<dyn Unmarshaler>))));
        }

        let Some(maker) = self.inner.make_unmarshaler(ctx, ty)? else {
            return Ok(None);
        };

        let ctx = ctx.clone();
        let ty = ty.clone();
        Ok(Some(Box::new(move || {
            let proxy = Arc::new(UnmarshalerProxy::new());
            ctx.in_progress.lock().insert(ty.clone(), proxy.clone());
            let result = maker();
            ctx.in_progress.lock().remove(&ty);
            let built = result?;
            proxy.fill(built.clone())?;
            Ok(built)
        })))
    }
}

// ---------------------------------------------------------------------------
// Setup

/// Runs registry-registered setup hooks before delegating.
///
/// Each hook runs exactly once; hooks appended to the registry after a run
/// (pre-seal) are picked up on the next resolution. Hooks may themselves
/// register further hooks.
pub struct SetupMarshalerFactory {
    inner: Arc<dyn MarshalerFactory>,
    ran: Arc<Mutex<usize>>,
}

impl SetupMarshalerFactory {
    pub fn new(inner: Arc<dyn MarshalerFactory>) -> Self {
        Self::with_cursor(inner, Arc::new(Mutex::new(0)))
    }

    /// Share a run cursor with another setup combinator so each hook runs
    /// once across both directions.
    pub fn with_cursor(inner: Arc<dyn MarshalerFactory>, ran: Arc<Mutex<usize>>) -> Self {
        Self { inner, ran }
    }
}

pub(crate) fn run_pending_hooks(registry: &crate::registry::Registry, ran: &Mutex<usize>) {
    loop {
        let hooks = registry.setup_hooks();
        let next = {
            let mut ran = ran.lock();
            if *ran >= hooks.len() {
                return;
            }
            let i = *ran;
            *ran += 1;
            i
        };
        // Hook runs outside the counter lock so it may resolve or register.
        (hooks[next])(registry);
    }
}

impl MarshalerFactory for SetupMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        run_pending_hooks(&ctx.registry, &self.ran);
        self.inner.make_marshaler(ctx, ty)
    }
}

/// Decode-side setup combinator.
pub struct SetupUnmarshalerFactory {
    inner: Arc<dyn UnmarshalerFactory>,
    ran: Arc<Mutex<usize>>,
}

impl SetupUnmarshalerFactory {
    pub fn new(inner: Arc<dyn UnmarshalerFactory>) -> Self {
        Self::with_cursor(inner, Arc::new(Mutex::new(0)))
    }

    /// Share a run cursor with the encode-side setup combinator.
    pub fn with_cursor(inner: Arc<dyn UnmarshalerFactory>, ran: Arc<Mutex<usize>>) -> Self {
        Self { inner, ran }
    }
}

impl UnmarshalerFactory for SetupUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        run_pending_hooks(&ctx.registry, &self.ran);
        self.inner.make_unmarshaler(ctx, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct NullMarshaler;

    impl Marshaler for NullMarshaler {
        fn marshal(&self, _ctx: &MarshalContext, _v: &Value) -> Result<WireValue, MarshalError> {
            Ok(WireValue::Null)
        }
    }

    #[test]
    fn test_proxy_unset_read_fails() {
        let proxy = MarshalerProxy::new();
        let ctx = MarshalContext {
            registry: Arc::new(crate::registry::Registry::new()),
        };
        let err = proxy.marshal(&ctx, &Value::Null).unwrap_err();
        assert!(matches!(err, MarshalError::ProxyUnset));
    }

    #[test]
    fn test_proxy_double_fill_fails() {
        let proxy = MarshalerProxy::new();
        proxy.fill(Arc::new(NullMarshaler)).expect("first fill");
        let err = proxy.fill(Arc::new(NullMarshaler)).unwrap_err();
        assert!(matches!(err, MarshalError::ProxyAlreadySet));
    }
}
