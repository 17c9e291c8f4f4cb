// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Process configuration registry.
//!
//! The registry is the one write-then-seal store of configuration items:
//! tagging strategies, type and converter overrides, and setup hooks. The
//! host application registers items during start-up wiring; constructing an
//! [`Engine`](crate::standard::Engine) seals the registry, after which every
//! further `register` call fails and steady-state lookups are plain
//! read-guard reads on an immutable snapshot.
//!
//! Two key spaces exist: the equality space, keyed by structural
//! [`TypeDescriptor`] equality, and the identity space, keyed by opaque
//! [`OverrideKey`] tokens for runtime-constructed overrides that must not
//! collide by value.

use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::RegistryError;
use crate::factory::{MarshalerFactory, UnmarshalerFactory};
use crate::type_descriptor::TypeDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque identity-space key.
///
/// Every call to [`OverrideKey::new`] yields a distinct key; two keys compare
/// equal only if one was copied from the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverrideKey(u64);

static NEXT_OVERRIDE_KEY: AtomicU64 = AtomicU64::new(1);

impl OverrideKey {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(NEXT_OVERRIDE_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a polymorphic value is tagged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTagging {
    /// Single-entry map `{tag: inner}`.
    Wrapper,
    /// Discriminator key inserted into the inner record's own map.
    Field(String),
}

/// A hook run once by the setup combinator before first resolution.
///
/// Hooks may register further items; they run before the registry is sealed
/// or fail trying.
pub type SetupHook = Arc<dyn Fn(&Registry) + Send + Sync>;

/// One registered configuration item.
#[derive(Clone)]
pub enum RegistryItem {
    /// Tagging strategy for a polymorphic base type.
    Tagging(TypeTagging),
    /// Resolve the key type as another type instead.
    TypeOverride(Arc<TypeDescriptor>),
    /// Force a specific marshaler for the key.
    Marshaler(Arc<dyn Marshaler>),
    /// Force a specific unmarshaler for the key.
    Unmarshaler(Arc<dyn Unmarshaler>),
    /// Delegate the key to a specific marshaler factory.
    MarshalerFactory(Arc<dyn MarshalerFactory>),
    /// Delegate the key to a specific unmarshaler factory.
    UnmarshalerFactory(Arc<dyn UnmarshalerFactory>),
    /// Lazy dependency-loading hook (global scope only).
    SetupHook(SetupHook),
}

impl fmt::Debug for RegistryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tagging(t) => write!(f, "Tagging({:?})", t),
            Self::TypeOverride(ty) => write!(f, "TypeOverride({})", ty),
            Self::Marshaler(_) => write!(f, "Marshaler(..)"),
            Self::Unmarshaler(_) => write!(f, "Unmarshaler(..)"),
            Self::MarshalerFactory(_) => write!(f, "MarshalerFactory(..)"),
            Self::UnmarshalerFactory(_) => write!(f, "UnmarshalerFactory(..)"),
            Self::SetupHook(_) => write!(f, "SetupHook(..)"),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    by_type: HashMap<Arc<TypeDescriptor>, Vec<RegistryItem>>,
    global: Vec<RegistryItem>,
    by_token: HashMap<OverrideKey, Vec<RegistryItem>>,
}

/// Write-once-then-sealed configuration store.
#[derive(Default)]
pub struct Registry {
    sealed: AtomicBool,
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unsealed(&self) -> Result<(), RegistryError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(RegistryError::Sealed);
        }
        Ok(())
    }

    /// Register an item under a type key in the equality space.
    pub fn register(
        &self,
        key: &Arc<TypeDescriptor>,
        item: RegistryItem,
    ) -> Result<(), RegistryError> {
        self.check_unsealed()?;
        self.inner
            .write()
            .by_type
            .entry(key.clone())
            .or_default()
            .push(item);
        Ok(())
    }

    /// Register an item under the global scope.
    pub fn register_global(&self, item: RegistryItem) -> Result<(), RegistryError> {
        self.check_unsealed()?;
        self.inner.write().global.push(item);
        Ok(())
    }

    /// Register an item under an identity-space token.
    pub fn register_token(
        &self,
        token: OverrideKey,
        item: RegistryItem,
    ) -> Result<(), RegistryError> {
        self.check_unsealed()?;
        self.inner
            .write()
            .by_token
            .entry(token)
            .or_default()
            .push(item);
        Ok(())
    }

    /// Seal the registry. Idempotent; all further registration fails.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            log::debug!("[marshal] registry sealed");
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// All items registered under a type key, in registration order.
    pub fn items_for(&self, key: &Arc<TypeDescriptor>) -> Vec<RegistryItem> {
        self.inner
            .read()
            .by_type
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// All items registered under the global scope, in registration order.
    pub fn global_items(&self) -> Vec<RegistryItem> {
        self.inner.read().global.clone()
    }

    /// All items registered under an identity token, in registration order.
    pub fn token_items(&self, token: OverrideKey) -> Vec<RegistryItem> {
        self.inner
            .read()
            .by_token
            .get(&token)
            .cloned()
            .unwrap_or_default()
    }

    /// First tagging strategy registered for a type key.
    pub fn tagging_for(&self, key: &Arc<TypeDescriptor>) -> Option<TypeTagging> {
        self.items_for(key).into_iter().find_map(|item| match item {
            RegistryItem::Tagging(t) => Some(t),
            _ => None,
        })
    }

    /// Registered global setup hooks, in registration order.
    pub fn setup_hooks(&self) -> Vec<SetupHook> {
        self.global_items()
            .into_iter()
            .filter_map(|item| match item {
                RegistryItem::SetupHook(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// First marshaler registered under an identity token.
    pub fn marshaler_for_token(&self, token: OverrideKey) -> Option<Arc<dyn Marshaler>> {
        self.token_items(token).into_iter().find_map(|item| match item {
            RegistryItem::Marshaler(m) => Some(m),
            _ => None,
        })
    }

    /// First unmarshaler registered under an identity token.
    pub fn unmarshaler_for_token(&self, token: OverrideKey) -> Option<Arc<dyn Unmarshaler>> {
        self.token_items(token).into_iter().find_map(|item| match item {
            RegistryItem::Unmarshaler(u) => Some(u),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_blocks_registration() {
        let reg = Registry::new();
        let key = TypeDescriptor::int();
        reg.register(&key, RegistryItem::Tagging(TypeTagging::Wrapper))
            .expect("register before seal");
        reg.seal();
        assert!(reg.is_sealed());
        let err = reg
            .register(&key, RegistryItem::Tagging(TypeTagging::Wrapper))
            .unwrap_err();
        assert_eq!(err, RegistryError::Sealed);
        assert!(reg.register_global(RegistryItem::Tagging(TypeTagging::Wrapper)).is_err());
    }

    #[test]
    fn test_items_in_registration_order() {
        let reg = Registry::new();
        let key = TypeDescriptor::string();
        reg.register(&key, RegistryItem::Tagging(TypeTagging::Field("k".into())))
            .unwrap();
        reg.register(&key, RegistryItem::Tagging(TypeTagging::Wrapper))
            .unwrap();
        assert_eq!(reg.items_for(&key).len(), 2);
        // First registered wins.
        assert_eq!(
            reg.tagging_for(&key),
            Some(TypeTagging::Field("k".into()))
        );
    }

    #[test]
    fn test_override_keys_distinct() {
        let a = OverrideKey::new();
        let b = OverrideKey::new();
        assert_ne!(a, b);
        let reg = Registry::new();
        reg.register_token(a, RegistryItem::Tagging(TypeTagging::Wrapper))
            .unwrap();
        assert_eq!(reg.token_items(a).len(), 1);
        assert!(reg.token_items(b).is_empty());
    }

    #[test]
    fn test_equality_space_keys_by_structure() {
        let reg = Registry::new();
        reg.register(
            &TypeDescriptor::sequence(TypeDescriptor::int()),
            RegistryItem::Tagging(TypeTagging::Wrapper),
        )
        .unwrap();
        // A structurally equal but separately built key hits the same slot.
        assert_eq!(
            reg.items_for(&TypeDescriptor::sequence(TypeDescriptor::int()))
                .len(),
            1
        );
    }
}
