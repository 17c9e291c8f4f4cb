// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Conversion and resolution contexts.
//!
//! Runtime contexts carry the sealed registry through nested conversions.
//! Factory contexts additionally carry the installed root factory and the
//! per-top-level-resolution in-progress proxy map used for recursive-type
//! cycle breaking. Both flavors are immutable snapshots built once per
//! top-level call.

use crate::combinators::{MarshalerProxy, UnmarshalerProxy};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{MarshalerFactory, UnmarshalerFactory};
use crate::registry::Registry;
use crate::type_descriptor::TypeDescriptor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Runtime context threaded through nested marshal calls.
#[derive(Clone)]
pub struct MarshalContext {
    pub registry: Arc<Registry>,
}

/// Runtime context threaded through nested unmarshal calls.
#[derive(Clone)]
pub struct UnmarshalContext {
    pub registry: Arc<Registry>,
}

/// Deferred shared-state write, run once the enclosing top-level resolution
/// has completed and filled its recursion proxies.
pub(crate) type PendingPublish = Box<dyn FnOnce() + Send>;

/// Build-time context for marshaler resolution.
#[derive(Clone)]
pub struct MarshalFactoryContext {
    pub registry: Arc<Registry>,
    factory: Arc<dyn MarshalerFactory>,
    pub(crate) in_progress: Arc<Mutex<HashMap<Arc<TypeDescriptor>, Arc<MarshalerProxy>>>>,
    pub(crate) pending_publish: Arc<Mutex<Vec<PendingPublish>>>,
}

impl MarshalFactoryContext {
    pub fn new(registry: Arc<Registry>, factory: Arc<dyn MarshalerFactory>) -> Self {
        Self {
            registry,
            factory,
            in_progress: Arc::new(Mutex::new(HashMap::new())),
            pending_publish: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Resolve and build a marshaler for a type through the installed root
    /// factory.
    ///
    /// Publications staged during the build (cache inserts of converters
    /// that may still reference unfilled recursion proxies) are flushed only
    /// once no build is in progress, so other threads never observe a
    /// partially built converter. A failed build discards them.
    pub fn make_marshaler(
        &self,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Arc<dyn Marshaler>, MarshalError> {
        let result = match self.factory.make_marshaler(self, ty) {
            Ok(Some(maker)) => maker(),
            Ok(None) => Err(MarshalError::UnhandledType(ty.clone())),
            Err(e) => Err(e),
        };
        if self.in_progress.lock().is_empty() {
            let staged: Vec<PendingPublish> = self.pending_publish.lock().drain(..).collect();
            if result.is_ok() {
                for publish in staged {
                    publish();
                }
            }
        }
        result
    }

    /// The runtime context converters built from this context will run with.
    pub fn runtime(&self) -> MarshalContext {
        MarshalContext {
            registry: self.registry.clone(),
        }
    }
}

/// Build-time context for unmarshaler resolution.
#[derive(Clone)]
pub struct UnmarshalFactoryContext {
    pub registry: Arc<Registry>,
    factory: Arc<dyn UnmarshalerFactory>,
    pub(crate) in_progress: Arc<Mutex<HashMap<Arc<TypeDescriptor>, Arc<UnmarshalerProxy>>>>,
    pub(crate) pending_publish: Arc<Mutex<Vec<PendingPublish>>>,
}

impl UnmarshalFactoryContext {
    pub fn new(registry: Arc<Registry>, factory: Arc<dyn UnmarshalerFactory>) -> Self {
        Self {
            registry,
            factory,
            in_progress: Arc::new(Mutex::new(HashMap::new())),
            pending_publish: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Resolve and build an unmarshaler for a type through the installed
    /// root factory. Staged publications flush as on the encode side.
    pub fn make_unmarshaler(
        &self,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Arc<dyn Unmarshaler>, MarshalError> {
        let result = match self.factory.make_unmarshaler(self, ty) {
            Ok(Some(maker)) => maker(),
            Ok(None) => Err(MarshalError::UnhandledType(ty.clone())),
            Err(e) => Err(e),
        };
        if self.in_progress.lock().is_empty() {
            let staged: Vec<PendingPublish> = self.pending_publish.lock().drain(..).collect();
            if result.is_ok() {
                for publish in staged {
                    publish();
                }
            }
        }
        result
    }

    /// The runtime context converters built from this context will run with.
    pub fn runtime(&self) -> UnmarshalContext {
        UnmarshalContext {
            registry: self.registry.clone(),
        }
    }
}
