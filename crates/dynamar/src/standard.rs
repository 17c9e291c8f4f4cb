// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Standard pipeline assembly and the engine facade.
//!
//! The standard pipeline is an ordered alternation over every built-in codec
//! factory, registry overrides first and the structural `any` fallback last,
//! wrapped as Recursive(Setup(Cache(Multi))). The engine owns the sealed
//! registry plus the two pipelines and hands out converters.

use crate::codecs::{
    AnyMarshalerFactory, AnyUnmarshalerFactory, ContainerMarshalerFactory,
    ContainerUnmarshalerFactory, EnumMarshalerFactory, EnumUnmarshalerFactory,
    LiteralMarshalerFactory, LiteralUnmarshalerFactory, NewTypeMarshalerFactory,
    NewTypeUnmarshalerFactory, OptionalMarshalerFactory, OptionalUnmarshalerFactory,
    PrimitiveMarshalerFactory, PrimitiveUnionMarshalerFactory, PrimitiveUnionUnmarshalerFactory,
    PrimitiveUnmarshalerFactory, SpecialScalarMarshalerFactory, SpecialScalarUnmarshalerFactory,
};
use crate::combinators::{
    run_pending_hooks, MultiMarshalerFactory, MultiUnmarshalerFactory, RecursiveMarshalerFactory,
    RecursiveUnmarshalerFactory, SetupMarshalerFactory, SetupUnmarshalerFactory,
    TypeCacheMarshalerFactory, TypeCacheUnmarshalerFactory,
};
use crate::context::{MarshalFactoryContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{
    ForbiddenTypeFactory, MarshalerFactory, OverrideMarshalerFactory, OverrideUnmarshalerFactory,
    UnmarshalerFactory,
};
use crate::record::{RecordMarshalerFactory, RecordUnmarshalerFactory};
use crate::registry::Registry;
use crate::type_descriptor::{BaseKind, TypeDescriptor};
use crate::value::Value;
use crate::wire::WireValue;
use parking_lot::Mutex;
use std::sync::Arc;

/// The standard encode pipeline, earlier entries strictly more specific
/// than later ones.
pub fn new_standard_marshaler_factory() -> Arc<dyn MarshalerFactory> {
    Arc::new(MultiMarshalerFactory::new(vec![
        Arc::new(OverrideMarshalerFactory),
        Arc::new(PrimitiveMarshalerFactory),
        Arc::new(NewTypeMarshalerFactory),
        Arc::new(OptionalMarshalerFactory),
        Arc::new(PrimitiveUnionMarshalerFactory),
        Arc::new(RecordMarshalerFactory),
        Arc::new(ContainerMarshalerFactory::new(BaseKind::Tuple)),
        Arc::new(EnumMarshalerFactory),
        Arc::new(LiteralMarshalerFactory),
        Arc::new(SpecialScalarMarshalerFactory),
        Arc::new(ContainerMarshalerFactory::new(BaseKind::Maybe)),
        Arc::new(ContainerMarshalerFactory::new(BaseKind::Mapping)),
        Arc::new(ContainerMarshalerFactory::new(BaseKind::Sequence)),
        Arc::new(ContainerMarshalerFactory::new(BaseKind::Set)),
        Arc::new(AnyMarshalerFactory),
    ]))
}

/// The standard decode pipeline, mirroring the encode one.
pub fn new_standard_unmarshaler_factory() -> Arc<dyn UnmarshalerFactory> {
    Arc::new(MultiUnmarshalerFactory::new(vec![
        Arc::new(OverrideUnmarshalerFactory),
        Arc::new(PrimitiveUnmarshalerFactory),
        Arc::new(NewTypeUnmarshalerFactory),
        Arc::new(OptionalUnmarshalerFactory),
        Arc::new(PrimitiveUnionUnmarshalerFactory),
        Arc::new(RecordUnmarshalerFactory),
        Arc::new(ContainerUnmarshalerFactory::new(BaseKind::Tuple)),
        Arc::new(EnumUnmarshalerFactory),
        Arc::new(LiteralUnmarshalerFactory),
        Arc::new(SpecialScalarUnmarshalerFactory),
        Arc::new(ContainerUnmarshalerFactory::new(BaseKind::Maybe)),
        Arc::new(ContainerUnmarshalerFactory::new(BaseKind::Mapping)),
        Arc::new(ContainerUnmarshalerFactory::new(BaseKind::Sequence)),
        Arc::new(ContainerUnmarshalerFactory::new(BaseKind::Set)),
        Arc::new(AnyUnmarshalerFactory),
    ]))
}

/// Staged engine configuration.
pub struct EngineBuilder {
    registry: Registry,
    forbidden: Vec<Arc<TypeDescriptor>>,
}

impl EngineBuilder {
    /// Block a type: resolving it fails with `ForbiddenType`.
    pub fn forbid(mut self, ty: Arc<TypeDescriptor>) -> Self {
        self.forbidden.push(ty);
        self
    }

    pub fn build(self) -> Engine {
        let registry = Arc::new(self.registry);
        // Hooks may still register items, so they run to fixpoint before
        // the seal. The pipeline's setup combinators share this cursor and
        // will find nothing left to run.
        let cursor = Arc::new(Mutex::new(0usize));
        run_pending_hooks(&registry, &cursor);
        registry.seal();

        let mut m: Arc<dyn MarshalerFactory> =
            Arc::new(TypeCacheMarshalerFactory::new(new_standard_marshaler_factory()));
        let mut u: Arc<dyn UnmarshalerFactory> = Arc::new(TypeCacheUnmarshalerFactory::new(
            new_standard_unmarshaler_factory(),
        ));
        if !self.forbidden.is_empty() {
            let forbidden = Arc::new(ForbiddenTypeFactory::new(self.forbidden));
            m = Arc::new(MultiMarshalerFactory::new(vec![forbidden.clone(), m]));
            u = Arc::new(MultiUnmarshalerFactory::new(vec![forbidden, u]));
        }
        let m = Arc::new(RecursiveMarshalerFactory::new(Arc::new(
            SetupMarshalerFactory::with_cursor(m, cursor.clone()),
        )));
        let u = Arc::new(RecursiveUnmarshalerFactory::new(Arc::new(
            SetupUnmarshalerFactory::with_cursor(u, cursor),
        )));
        Engine {
            registry,
            marshaler_factory: m,
            unmarshaler_factory: u,
        }
    }
}

/// The conversion engine: a sealed registry plus the two standard
/// pipelines.
pub struct Engine {
    registry: Arc<Registry>,
    marshaler_factory: Arc<dyn MarshalerFactory>,
    unmarshaler_factory: Arc<dyn UnmarshalerFactory>,
}

impl Engine {
    /// Seal the registry and install the standard pipelines.
    pub fn new(registry: Registry) -> Self {
        Self::builder(registry).build()
    }

    pub fn builder(registry: Registry) -> EngineBuilder {
        EngineBuilder {
            registry,
            forbidden: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolve and build a marshaler for a type.
    pub fn marshaler(&self, ty: &Arc<TypeDescriptor>) -> Result<Arc<dyn Marshaler>, MarshalError> {
        let ctx =
            MarshalFactoryContext::new(self.registry.clone(), self.marshaler_factory.clone());
        ctx.make_marshaler(ty)
    }

    /// Resolve and build an unmarshaler for a type.
    pub fn unmarshaler(
        &self,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Arc<dyn Unmarshaler>, MarshalError> {
        let ctx =
            UnmarshalFactoryContext::new(self.registry.clone(), self.unmarshaler_factory.clone());
        ctx.make_unmarshaler(ty)
    }

    /// One-shot encode.
    pub fn marshal(&self, ty: &Arc<TypeDescriptor>, v: &Value) -> Result<WireValue, MarshalError> {
        let m = self.marshaler(ty)?;
        m.marshal(
            &crate::context::MarshalContext {
                registry: self.registry.clone(),
            },
            v,
        )
    }

    /// One-shot decode.
    pub fn unmarshal(&self, ty: &Arc<TypeDescriptor>, v: &WireValue) -> Result<Value, MarshalError> {
        let u = self.unmarshaler(ty)?;
        u.unmarshal(
            &crate::context::UnmarshalContext {
                registry: self.registry.clone(),
            },
            v,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_seals_registry() {
        let engine = Engine::new(Registry::new());
        assert!(engine.registry().is_sealed());
    }

    #[test]
    fn test_forbidden_type_blocked() {
        let engine = Engine::builder(Registry::new())
            .forbid(TypeDescriptor::bytes())
            .build();
        let err = engine
            .marshaler(&TypeDescriptor::bytes())
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, MarshalError::ForbiddenType(_)));
        assert!(engine.marshaler(&TypeDescriptor::int()).is_ok());
    }
}
