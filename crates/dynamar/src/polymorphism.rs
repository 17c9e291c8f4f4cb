// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Polymorphic dispatch: one abstract base type, many concrete record
//! impls, each carried on the wire under a tag.
//!
//! Impl sets validate their uniqueness invariants eagerly so a colliding
//! tag, alt, or record identity fails at declaration time. Dispatch keys on
//! record identity when encoding and on the wire tag when decoding.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{MarshalerFactory, MarshalerMaker, UnmarshalerFactory, UnmarshalerMaker};
use crate::registry::TypeTagging;
use crate::type_descriptor::TypeDescriptor;
use crate::value::Value;
use crate::wire::{WireMap, WireValue};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One concrete impl of a polymorphic base.
#[derive(Debug, Clone)]
pub struct Impl {
    /// Must be a record descriptor; dispatch keys on its identity name.
    pub ty: Arc<TypeDescriptor>,
    pub tag: String,
    /// Additional accepted wire tags on decode.
    pub alts: Vec<String>,
}

impl Impl {
    pub fn new(ty: Arc<TypeDescriptor>, tag: impl Into<String>) -> Self {
        Self {
            ty,
            tag: tag.into(),
            alts: Vec::new(),
        }
    }

    pub fn with_alts<S: Into<String>, I: IntoIterator<Item = S>>(mut self, alts: I) -> Self {
        self.alts = alts.into_iter().map(Into::into).collect();
        self
    }

    fn identity(&self) -> Result<&str, MarshalError> {
        self.ty.record_name().ok_or_else(|| {
            MarshalError::InvalidValue(format!(
                "polymorphism impl for tag {:?} is not record-typed",
                self.tag
            ))
        })
    }
}

/// A validated set of impls.
#[derive(Debug, Clone)]
pub struct Impls {
    entries: Vec<Impl>,
}

impl Impls {
    /// Validate and build. Fails with `DuplicateTag` when two entries share
    /// a record identity, tag, or alt.
    pub fn new<I: IntoIterator<Item = Impl>>(entries: I) -> Result<Self, MarshalError> {
        let entries: Vec<Impl> = entries.into_iter().collect();
        let mut identities = HashSet::new();
        let mut tags = HashSet::new();
        for imp in &entries {
            let identity = imp.identity()?.to_string();
            if !identities.insert(identity.clone()) {
                return Err(MarshalError::DuplicateTag(identity));
            }
            for tag in std::iter::once(&imp.tag).chain(&imp.alts) {
                if !tags.insert(tag.clone()) {
                    return Err(MarshalError::DuplicateTag(tag.clone()));
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Impl] {
        &self.entries
    }

    /// Record identity names of every impl.
    pub fn identities(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter_map(|i| i.ty.record_name().map(str::to_string))
            .collect()
    }
}

/// A polymorphic base with its impl set and optional declared intermediate
/// bases mapping to impl identity subsets.
#[derive(Debug, Clone)]
pub struct Polymorphism {
    pub base: Arc<TypeDescriptor>,
    pub impls: Impls,
    /// Abstract intermediates dispatching to a subset of the impls, by
    /// record identity.
    pub bases: Vec<(Arc<TypeDescriptor>, Vec<String>)>,
}

impl Polymorphism {
    pub fn new(base: Arc<TypeDescriptor>, impls: Impls) -> Self {
        Self {
            base,
            impls,
            bases: Vec::new(),
        }
    }

    /// Declare an intermediate base covering a subset of impl identities.
    pub fn with_base<S: Into<String>, I: IntoIterator<Item = S>>(
        mut self,
        ty: Arc<TypeDescriptor>,
        identities: I,
    ) -> Self {
        self.bases
            .push((ty, identities.into_iter().map(Into::into).collect()));
        self
    }

    /// The impl identity subset this type dispatches over, if it is covered
    /// by this polymorphism.
    fn dispatch_subset(&self, ty: &Arc<TypeDescriptor>) -> Option<HashSet<String>> {
        if *ty == self.base {
            return Some(self.impls.identities());
        }
        for (base, identities) in &self.bases {
            if ty == base {
                return Some(identities.iter().cloned().collect());
            }
        }
        // A union of declared impl records dispatches over its members.
        if let TypeDescriptor::Union(members) = ty.as_ref() {
            let known = self.impls.identities();
            let mut subset = HashSet::new();
            for m in members {
                let name = m.record_name()?;
                if !known.contains(name) {
                    return None;
                }
                subset.insert(name.to_string());
            }
            if !subset.is_empty() {
                return Some(subset);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Converters

struct PolymorphismMarshaler {
    tagging: TypeTagging,
    /// Record identity -> (wire tag, impl converter).
    by_identity: HashMap<String, (String, Arc<dyn Marshaler>)>,
}

impl Marshaler for PolymorphismMarshaler {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        let Value::Record { name, .. } = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "record",
                got: v.kind(),
            });
        };
        let (tag, m) = self
            .by_identity
            .get(name)
            .ok_or_else(|| MarshalError::UnknownTag(name.clone()))?;
        let inner = m.marshal(ctx, v)?;
        match &self.tagging {
            TypeTagging::Wrapper => {
                let mut out = WireMap::with_capacity(1);
                out.insert(tag.clone(), inner);
                Ok(WireValue::Map(out))
            }
            TypeTagging::Field(key) => {
                let WireValue::Map(mut map) = inner else {
                    return Err(MarshalError::InvalidValue(format!(
                        "impl {:?} did not encode to a map under field tagging",
                        name
                    )));
                };
                if map.contains_key(key) {
                    return Err(MarshalError::DuplicateKey(key.clone()));
                }
                map.shift_insert(0, key.clone(), WireValue::Str(tag.clone()));
                Ok(WireValue::Map(map))
            }
        }
    }
}

struct PolymorphismUnmarshaler {
    tagging: TypeTagging,
    /// Wire tag (or alt) -> impl converter.
    by_tag: HashMap<String, Arc<dyn Unmarshaler>>,
}

impl PolymorphismUnmarshaler {
    fn lookup(&self, tag: &str) -> Result<&Arc<dyn Unmarshaler>, MarshalError> {
        self.by_tag
            .get(tag)
            .ok_or_else(|| MarshalError::UnknownTag(tag.to_string()))
    }
}

impl Unmarshaler for PolymorphismUnmarshaler {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        let WireValue::Map(map) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "map",
                got: v.kind(),
            });
        };
        match &self.tagging {
            TypeTagging::Wrapper => {
                let mut entries = map.iter();
                let (Some((tag, inner)), None) = (entries.next(), entries.next()) else {
                    return Err(MarshalError::InvalidValue(format!(
                        "tag wrapper must hold exactly one entry, got {}",
                        map.len()
                    )));
                };
                self.lookup(tag)?.unmarshal(ctx, inner)
            }
            TypeTagging::Field(key) => {
                let tag_value = map
                    .get(key)
                    .ok_or_else(|| MarshalError::MissingField(key.clone()))?;
                let WireValue::Str(tag) = tag_value else {
                    return Err(MarshalError::ShapeMismatch {
                        expected: "string",
                        got: tag_value.kind(),
                    });
                };
                let u = self.lookup(tag)?;
                let mut rest = map.clone();
                rest.shift_remove(key);
                u.unmarshal(ctx, &WireValue::Map(rest))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Factories

/// Resolves the polymorphic base, its declared intermediates, and fully
/// covered unions of impl records.
pub struct PolymorphismMarshalerFactory {
    poly: Arc<Polymorphism>,
    tagging: Option<TypeTagging>,
}

impl PolymorphismMarshalerFactory {
    pub fn new(poly: Arc<Polymorphism>) -> Self {
        Self {
            poly,
            tagging: None,
        }
    }

    pub fn with_tagging(mut self, tagging: TypeTagging) -> Self {
        self.tagging = Some(tagging);
        self
    }
}

fn effective_tagging(
    explicit: &Option<TypeTagging>,
    registry: &crate::registry::Registry,
    base: &Arc<TypeDescriptor>,
) -> TypeTagging {
    explicit
        .clone()
        .or_else(|| registry.tagging_for(base))
        .unwrap_or(TypeTagging::Wrapper)
}

impl MarshalerFactory for PolymorphismMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        let Some(subset) = self.poly.dispatch_subset(ty) else {
            return Ok(None);
        };
        let tagging = effective_tagging(&self.tagging, &ctx.registry, &self.poly.base);
        let poly = self.poly.clone();
        let ctx = ctx.clone();
        Ok(Some(Box::new(move || {
            let mut by_identity = HashMap::new();
            for imp in poly.impls.entries() {
                let identity = imp.identity()?;
                if !subset.contains(identity) {
                    continue;
                }
                let m = ctx.make_marshaler(&imp.ty)?;
                by_identity.insert(identity.to_string(), (imp.tag.clone(), m));
            }
            Ok(Arc::new(PolymorphismMarshaler {
                tagging,
                by_identity,
            }))
        })))
    }
}

/// Decode-side counterpart of [`PolymorphismMarshalerFactory`].
pub struct PolymorphismUnmarshalerFactory {
    poly: Arc<Polymorphism>,
    tagging: Option<TypeTagging>,
}

impl PolymorphismUnmarshalerFactory {
    pub fn new(poly: Arc<Polymorphism>) -> Self {
        Self {
            poly,
            tagging: None,
        }
    }

    pub fn with_tagging(mut self, tagging: TypeTagging) -> Self {
        self.tagging = Some(tagging);
        self
    }
}

impl UnmarshalerFactory for PolymorphismUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        let Some(subset) = self.poly.dispatch_subset(ty) else {
            return Ok(None);
        };
        let tagging = effective_tagging(&self.tagging, &ctx.registry, &self.poly.base);
        let poly = self.poly.clone();
        let ctx = ctx.clone();
        Ok(Some(Box::new(move || {
            let mut by_tag: HashMap<String, Arc<dyn Unmarshaler>> = HashMap::new();
            for imp in poly.impls.entries() {
                let identity = imp.identity()?;
                if !subset.contains(identity) {
                    continue;
                }
                let u = ctx.make_unmarshaler(&imp.ty)?;
                for tag in std::iter::once(&imp.tag).chain(&imp.alts) {
                    by_tag.insert(tag.clone(), u.clone());
                }
            }
            Ok(Arc::new(PolymorphismUnmarshaler { tagging, by_tag }))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_descriptor::{FieldDescriptor, RecordDescriptor, RecordOptions};

    fn rec(name: &str) -> Arc<TypeDescriptor> {
        TypeDescriptor::record(RecordDescriptor {
            name: name.to_string(),
            fields: vec![FieldDescriptor::new("x", TypeDescriptor::int())],
            options: RecordOptions::default(),
        })
    }

    #[test]
    fn test_duplicate_tag_fails_eagerly() {
        let err = Impls::new([Impl::new(rec("A"), "t"), Impl::new(rec("B"), "t")]).unwrap_err();
        assert!(matches!(err, MarshalError::DuplicateTag(t) if t == "t"));
    }

    #[test]
    fn test_duplicate_identity_fails_eagerly() {
        let err = Impls::new([Impl::new(rec("A"), "a"), Impl::new(rec("A"), "b")]).unwrap_err();
        assert!(matches!(err, MarshalError::DuplicateTag(t) if t == "A"));
    }

    #[test]
    fn test_alt_collision_fails_eagerly() {
        let err = Impls::new([
            Impl::new(rec("A"), "a").with_alts(["x"]),
            Impl::new(rec("B"), "b").with_alts(["x"]),
        ])
        .unwrap_err();
        assert!(matches!(err, MarshalError::DuplicateTag(t) if t == "x"));
    }

    #[test]
    fn test_non_record_impl_rejected() {
        let err = Impls::new([Impl::new(TypeDescriptor::int(), "i")]).unwrap_err();
        assert!(matches!(err, MarshalError::InvalidValue(_)));
    }

    #[test]
    fn test_union_dispatch_subset() {
        let a = rec("A");
        let b = rec("B");
        let base = TypeDescriptor::newtype("Base", TypeDescriptor::any());
        let impls = Impls::new([Impl::new(a.clone(), "a"), Impl::new(b.clone(), "b")]).unwrap();
        let poly = Polymorphism::new(base, impls);
        let subset = poly
            .dispatch_subset(&TypeDescriptor::union([a.clone()]))
            .unwrap();
        assert_eq!(subset, HashSet::from(["A".to_string()]));
        // A union containing an undeclared record does not dispatch here.
        assert!(poly
            .dispatch_subset(&TypeDescriptor::union([a, rec("C")]))
            .is_none());
    }
}
