// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Leaf codec factories for the standard pipeline.

pub mod any;
pub mod containers;
pub mod enums;
pub mod literals;
pub mod primitives;
pub mod special;
pub mod unions;
pub mod wrappers;

pub use any::{AnyMarshalerFactory, AnyUnmarshalerFactory};
pub use containers::{ContainerMarshalerFactory, ContainerUnmarshalerFactory};
pub use enums::{EnumMarshalerFactory, EnumUnmarshalerFactory};
pub use literals::{LiteralMarshalerFactory, LiteralUnmarshalerFactory};
pub use primitives::{PrimitiveMarshalerFactory, PrimitiveUnmarshalerFactory};
pub use special::{SpecialScalarMarshalerFactory, SpecialScalarUnmarshalerFactory};
pub use unions::{PrimitiveUnionMarshalerFactory, PrimitiveUnionUnmarshalerFactory};
pub use wrappers::{
    NewTypeMarshalerFactory, NewTypeUnmarshalerFactory, OptionalMarshalerFactory,
    OptionalUnmarshalerFactory,
};
