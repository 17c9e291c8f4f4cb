// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Error types for descriptor resolution and conversion.

use crate::type_descriptor::TypeDescriptor;
use std::fmt;
use std::sync::Arc;

/// Errors raised while building or applying converters.
///
/// Build-graph faults (unhandled/forbidden types, ambiguity, duplicate
/// keys/tags) surface at factory-build time; shape and domain faults surface
/// per call. Nothing in this crate retries.
#[derive(Debug, Clone)]
pub enum MarshalError {
    /// No factory in the chain resolved the type.
    UnhandledType(Arc<TypeDescriptor>),
    /// The type is explicitly blocked by policy.
    ForbiddenType(Arc<TypeDescriptor>),
    /// A strict alternation saw more than one matching child.
    AmbiguousMatches {
        ty: Arc<TypeDescriptor>,
        count: usize,
    },
    /// A wire or field key resolved twice.
    DuplicateKey(String),
    /// Two polymorphism impls share a tag, alt, or identity.
    DuplicateTag(String),
    /// The wire or native value's variant does not match the target type.
    ShapeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// A required record field is absent.
    MissingField(String),
    /// An input key matched no record field.
    UnknownField(String),
    /// No impl is registered for a polymorphic tag or identity.
    UnknownTag(String),
    /// The name is not a variant of the target enum.
    UnknownEnumVariant { ty: String, variant: String },
    /// A domain-specific decode failure (malformed UUID, timestamp, ...).
    InvalidValue(String),
    /// A recursive forwarding proxy was read before being filled.
    ProxyUnset,
    /// A recursive forwarding proxy was filled twice.
    ProxyAlreadySet,
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnhandledType(ty) => write!(f, "Unhandled type: {}", ty),
            Self::ForbiddenType(ty) => write!(f, "Forbidden type: {}", ty),
            Self::AmbiguousMatches { ty, count } => {
                write!(f, "Ambiguous matches for type {}: {} factories", ty, count)
            }
            Self::DuplicateKey(key) => write!(f, "Duplicate key: {}", key),
            Self::DuplicateTag(tag) => write!(f, "Duplicate tag: {}", tag),
            Self::ShapeMismatch { expected, got } => {
                write!(f, "Shape mismatch: expected {}, got {}", expected, got)
            }
            Self::MissingField(name) => write!(f, "Missing field: {}", name),
            Self::UnknownField(name) => write!(f, "Unknown field: {}", name),
            Self::UnknownTag(tag) => write!(f, "Unknown tag: {}", tag),
            Self::UnknownEnumVariant { ty, variant } => {
                write!(f, "Unknown variant of enum {}: {}", ty, variant)
            }
            Self::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            Self::ProxyUnset => write!(f, "recursive proxy not set"),
            Self::ProxyAlreadySet => write!(f, "recursive proxy already set"),
        }
    }
}

impl std::error::Error for MarshalError {}

/// Errors raised by the configuration registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry was sealed before this registration.
    Sealed,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sealed => write!(f, "Registry is sealed"),
        }
    }
}

impl std::error::Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_descriptor::TypeDescriptor;

    #[test]
    fn test_display() {
        let e = MarshalError::UnhandledType(TypeDescriptor::int());
        assert_eq!(e.to_string(), "Unhandled type: int");
        assert_eq!(MarshalError::ProxyUnset.to_string(), "recursive proxy not set");
        assert_eq!(RegistryError::Sealed.to_string(), "Registry is sealed");
    }
}
