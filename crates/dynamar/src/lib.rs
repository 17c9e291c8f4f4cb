// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! # dynamar - runtime type-driven marshalling
//!
//! Builds converters between a native dynamic value model and a universal
//! wire-value model (null/bool/number/string/bytes/list/map), driven by
//! runtime type descriptors rather than compile-time derives.
//!
//! ## Quick Start
//!
//! ```rust
//! use dynamar::{Engine, RecordBuilder, Registry, TypeDescriptor, Value, WireValue};
//!
//! let point = RecordBuilder::new("Point")
//!     .int_field("x")
//!     .int_field("y")
//!     .build();
//!
//! let engine = Engine::new(Registry::new());
//! let wire = engine
//!     .marshal(&point, &Value::record("Point", [
//!         ("x", Value::Int(1)),
//!         ("y", Value::Int(2)),
//!     ]))
//!     .unwrap();
//! assert_eq!(
//!     wire,
//!     WireValue::map([("x", WireValue::Int(1)), ("y", WireValue::Int(2))]),
//! );
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        Engine                                |
//! |   sealed Registry | marshaler pipeline | unmarshaler pipeline|
//! +--------------------------------------------------------------+
//! |                  Combinator stack                            |
//! |   Recursive -> Setup -> [Forbidden] -> Type-Cache -> Multi   |
//! +--------------------------------------------------------------+
//! |                    Leaf codecs                               |
//! |   primitives | wrappers | unions | records | containers |    |
//! |   enums | literals | special scalars | polymorphism | any    |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeDescriptor`] | Immutable, value-equal runtime type description |
//! | [`Value`] | Native dynamic value shaped by a descriptor |
//! | [`WireValue`] | Universal wire value external formats read and write |
//! | [`Registry`] | Write-once-then-sealed configuration store |
//! | [`Engine`] | Sealed registry plus the standard pipelines |

pub mod builder;
pub mod codecs;
pub mod combinators;
pub mod context;
pub mod convert;
pub mod errors;
pub mod factory;
#[cfg(feature = "json")]
pub mod json;
pub mod naming;
pub mod polymorphism;
pub mod record;
pub mod registry;
pub mod standard;
pub mod type_descriptor;
pub mod value;
pub mod wire;

#[cfg(test)]
mod tests;

pub use builder::RecordBuilder;
pub use context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
pub use convert::{Marshaler, Unmarshaler};
pub use errors::{MarshalError, RegistryError};
pub use factory::{MarshalerFactory, MarshalerMaker, UnmarshalerFactory, UnmarshalerMaker};
#[cfg(feature = "json")]
pub use json::{json_to_wire, wire_to_json};
pub use naming::Naming;
pub use polymorphism::{Impl, Impls, Polymorphism, PolymorphismMarshalerFactory, PolymorphismUnmarshalerFactory};
pub use registry::{OverrideKey, Registry, RegistryItem, TypeTagging};
pub use standard::{new_standard_marshaler_factory, new_standard_unmarshaler_factory, Engine, EngineBuilder};
pub use type_descriptor::{
    BaseKind, EnumDescriptor, FieldDescriptor, FieldMetadata, FieldOptions, LiteralValue, OmitIf,
    PrimitiveKind, RecordDescriptor, RecordOptions, TypeDescriptor,
};
pub use value::{FieldMap, IntoValue, FromValue, Value};
pub use wire::{WireMap, WireValue};
