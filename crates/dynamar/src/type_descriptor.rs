// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Type descriptors for runtime type information.
//!
//! A [`TypeDescriptor`] is an immutable, value-equal description of a native
//! type, used throughout the crate as a resolution and cache key. Two
//! descriptors are equal iff they are structurally equal.

use crate::naming::Naming;
use crate::registry::OverrideKey;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int,
    /// 128-bit integer, carried as a decimal wire string.
    BigInt,
    Float,
    Str,
    Bytes,
    Uuid,
    Timestamp,
}

impl PrimitiveKind {
    /// Short name, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Str => "string",
            Self::Bytes => "bytes",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
        }
    }

    /// Whether this kind is handled by the base primitive codec (the rest
    /// go through the singular scalar codecs later in the pipeline).
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Float | Self::Str | Self::Bytes
        )
    }
}

/// A literal value usable in a `Literal` descriptor.
///
/// Restricted to hashable scalar shapes so descriptors stay usable as map
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl LiteralValue {
    /// The native form of this literal.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(v) => Value::Bool(*v),
            Self::Int(v) => Value::Int(*v),
            Self::Str(v) => Value::Str(v.clone()),
        }
    }

    /// The wire form of this literal.
    pub fn to_wire(&self) -> crate::wire::WireValue {
        match self {
            Self::Bool(v) => crate::wire::WireValue::Bool(*v),
            Self::Int(v) => crate::wire::WireValue::Int(*v),
            Self::Str(v) => crate::wire::WireValue::Str(v.clone()),
        }
    }
}

/// Generic container base kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Sequence,
    Set,
    Mapping,
    /// Zero-or-one container, distinct from `Optional`: `just(null)` is
    /// representable.
    Maybe,
    /// Fixed-arity heterogeneous tuple.
    Tuple,
}

impl BaseKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Set => "set",
            Self::Mapping => "mapping",
            Self::Maybe => "maybe",
            Self::Tuple => "tuple",
        }
    }
}

/// When a record field is dropped on encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OmitIf {
    #[default]
    Never,
    /// Drop when the native value is null.
    Null,
    /// Drop when the native value is null or an empty collection.
    Empty,
}

impl OmitIf {
    /// Evaluate the predicate against a native value.
    pub fn matches(&self, v: &Value) -> bool {
        match self {
            Self::Never => false,
            Self::Null => v.is_null(),
            Self::Empty => v.is_null() || v.is_empty_collection(),
        }
    }
}

/// Per-field behavioral options.
///
/// Merge precedence when deriving field infos: built-in default <
/// record-level `field_defaults` < per-field metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldOptions {
    pub omit_if: OmitIf,
    /// Fallback native value used on decode when the field is absent.
    pub default: Option<Value>,
    /// Flatten this field's encoded map into the parent map.
    pub embed: bool,
    /// Suppress the field on encode.
    pub no_marshal: bool,
    /// Suppress the field on decode.
    pub no_unmarshal: bool,
}

/// Per-field wire metadata: naming, aliases, options, converter overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldMetadata {
    /// Explicit wire name; wins over any naming convention.
    pub name: Option<String>,
    /// Additional accepted wire keys on decode.
    pub alts: Vec<String>,
    /// Per-field naming convention, overriding the record-level one.
    pub naming: Option<Naming>,
    pub options: FieldOptions,
    /// Identity-registry token resolving to a marshaler override.
    pub marshaler_token: Option<OverrideKey>,
    /// Identity-registry token resolving to an unmarshaler override.
    pub unmarshaler_token: Option<OverrideKey>,
}

/// One declared record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Source identifier.
    pub name: String,
    pub ty: Arc<TypeDescriptor>,
    pub metadata: FieldMetadata,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            ty,
            metadata: FieldMetadata::default(),
        }
    }

    /// Set an explicit wire name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    /// Add accepted alias keys for decode.
    pub fn with_alts<S: Into<String>, I: IntoIterator<Item = S>>(mut self, alts: I) -> Self {
        self.metadata.alts = alts.into_iter().map(Into::into).collect();
        self
    }

    /// Set a per-field naming convention.
    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.metadata.naming = Some(naming);
        self
    }

    /// Set the omit-on-encode predicate.
    pub fn omit_if(mut self, omit: OmitIf) -> Self {
        self.metadata.options.omit_if = omit;
        self
    }

    /// Set the decode-time default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.metadata.options.default = Some(default);
        self
    }

    /// Flatten this field's encoded map into the parent.
    pub fn embedded(mut self) -> Self {
        self.metadata.options.embed = true;
        self
    }

    /// Suppress the field on encode.
    pub fn no_marshal(mut self) -> Self {
        self.metadata.options.no_marshal = true;
        self
    }

    /// Suppress the field on decode.
    pub fn no_unmarshal(mut self) -> Self {
        self.metadata.options.no_unmarshal = true;
        self
    }

    /// Force a specific marshaler, registered under `token` in the
    /// registry's identity space.
    pub fn with_marshaler_token(mut self, token: OverrideKey) -> Self {
        self.metadata.marshaler_token = Some(token);
        self
    }

    /// Force a specific unmarshaler, registered under `token` in the
    /// registry's identity space.
    pub fn with_unmarshaler_token(mut self, token: OverrideKey) -> Self {
        self.metadata.unmarshaler_token = Some(token);
        self
    }
}

/// Record-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordOptions {
    /// Naming convention applied to fields without an explicit name.
    pub field_naming: Option<Naming>,
    /// Silently drop unknown keys on decode.
    pub ignore_unknown: bool,
    /// Catch-all field receiving unknown keys on decode and merged into the
    /// output last on encode. Must name a map-typed field.
    pub unknown_field: Option<String>,
    /// Field receiving the whole raw input map on decode; never encoded.
    pub source_field: Option<String>,
    /// Record-level field option defaults.
    pub field_defaults: FieldOptions,
}

/// A record (composite) type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordDescriptor {
    /// Type identity; polymorphic dispatch keys on this.
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub options: RecordOptions,
}

impl RecordDescriptor {
    /// Find a declared field by source identifier.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// An enumeration: a named, closed set of variant names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumDescriptor {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumDescriptor {
    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.iter().any(|v| v == name)
    }
}

/// A complete type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Optional(Arc<TypeDescriptor>),
    /// Member order is preserved and doubles as the match order.
    Union(Vec<Arc<TypeDescriptor>>),
    Literal(Vec<LiteralValue>),
    NewType {
        name: String,
        underlying: Arc<TypeDescriptor>,
    },
    Generic(BaseKind, Vec<Arc<TypeDescriptor>>),
    Record(RecordDescriptor),
    Enum(EnumDescriptor),
    Any,
}

impl TypeDescriptor {
    pub fn bool() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::Bool))
    }

    pub fn int() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::Int))
    }

    pub fn bigint() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::BigInt))
    }

    pub fn float() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::Float))
    }

    pub fn string() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::Str))
    }

    pub fn bytes() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::Bytes))
    }

    pub fn uuid() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::Uuid))
    }

    pub fn timestamp() -> Arc<Self> {
        Arc::new(Self::Primitive(PrimitiveKind::Timestamp))
    }

    pub fn any() -> Arc<Self> {
        Arc::new(Self::Any)
    }

    pub fn optional(inner: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Optional(inner))
    }

    /// Build a union descriptor, de-duplicating members while preserving
    /// first-occurrence order.
    pub fn union<I: IntoIterator<Item = Arc<Self>>>(members: I) -> Arc<Self> {
        let mut seen: Vec<Arc<Self>> = Vec::new();
        for m in members {
            if !seen.contains(&m) {
                seen.push(m);
            }
        }
        Arc::new(Self::Union(seen))
    }

    pub fn literal<I: IntoIterator<Item = LiteralValue>>(values: I) -> Arc<Self> {
        Arc::new(Self::Literal(values.into_iter().collect()))
    }

    pub fn newtype(name: impl Into<String>, underlying: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::NewType {
            name: name.into(),
            underlying,
        })
    }

    pub fn sequence(element: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Generic(BaseKind::Sequence, vec![element]))
    }

    pub fn set(element: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Generic(BaseKind::Set, vec![element]))
    }

    pub fn mapping(key: Arc<Self>, value: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Generic(BaseKind::Mapping, vec![key, value]))
    }

    pub fn maybe(inner: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Generic(BaseKind::Maybe, vec![inner]))
    }

    pub fn tuple<I: IntoIterator<Item = Arc<Self>>>(items: I) -> Arc<Self> {
        Arc::new(Self::Generic(BaseKind::Tuple, items.into_iter().collect()))
    }

    pub fn record(desc: RecordDescriptor) -> Arc<Self> {
        Arc::new(Self::Record(desc))
    }

    pub fn enumeration<N, S, I>(name: N, variants: I) -> Arc<Self>
    where
        N: Into<String>,
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Arc::new(Self::Enum(EnumDescriptor {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }))
    }

    /// The record descriptor, if this is a record type.
    pub fn as_record(&self) -> Option<&RecordDescriptor> {
        match self {
            Self::Record(rd) => Some(rd),
            _ => None,
        }
    }

    /// The record identity name, if this is a record type.
    pub fn record_name(&self) -> Option<&str> {
        self.as_record().map(|rd| rd.name.as_str())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p.name()),
            Self::Optional(inner) => write!(f, "optional<{}>", inner),
            Self::Union(members) => {
                write!(f, "union<")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, ">")
            }
            Self::Literal(values) => write!(f, "literal[{}]", values.len()),
            Self::NewType { name, .. } => write!(f, "newtype<{}>", name),
            Self::Generic(base, args) => {
                write!(f, "{}<", base.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ">")
            }
            Self::Record(rd) => write!(f, "record<{}>", rd.name),
            Self::Enum(ed) => write!(f, "enum<{}>", ed.name),
            Self::Any => write!(f, "any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = TypeDescriptor::sequence(TypeDescriptor::int());
        let b = TypeDescriptor::sequence(TypeDescriptor::int());
        assert_eq!(a, b);
        assert_ne!(a, TypeDescriptor::sequence(TypeDescriptor::string()));
    }

    #[test]
    fn test_union_dedup() {
        let u = TypeDescriptor::union([
            TypeDescriptor::int(),
            TypeDescriptor::string(),
            TypeDescriptor::int(),
        ]);
        match u.as_ref() {
            TypeDescriptor::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("not a union: {}", other),
        }
    }

    #[test]
    fn test_display() {
        let ty = TypeDescriptor::mapping(TypeDescriptor::string(), TypeDescriptor::int());
        assert_eq!(ty.to_string(), "mapping<string,int>");
        assert_eq!(
            TypeDescriptor::optional(TypeDescriptor::bool()).to_string(),
            "optional<bool>"
        );
    }

    #[test]
    fn test_omit_if() {
        assert!(OmitIf::Null.matches(&Value::Null));
        assert!(!OmitIf::Null.matches(&Value::Seq(vec![])));
        assert!(OmitIf::Empty.matches(&Value::Seq(vec![])));
        assert!(!OmitIf::Never.matches(&Value::Null));
    }
}
