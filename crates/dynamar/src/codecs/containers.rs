// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Generic container codecs: maybe, mapping, sequence, set, tuple.
//!
//! One factory type handles one base kind, so the standard pipeline can
//! order the container stages independently.

use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{MarshalerFactory, MarshalerMaker, UnmarshalerFactory, UnmarshalerMaker};
use crate::type_descriptor::{BaseKind, PrimitiveKind, TypeDescriptor};
use crate::value::Value;
use crate::wire::{WireMap, WireValue};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Converters

/// Zero-or-one container; wire form is a zero-or-one-element list, so
/// `just(null)` stays distinguishable from `nothing`.
struct MaybeMarshaler {
    inner: Arc<dyn Marshaler>,
}

impl Marshaler for MaybeMarshaler {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        let Value::Seq(items) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "maybe (zero-or-one seq)",
                got: v.kind(),
            });
        };
        match items.as_slice() {
            [] => Ok(WireValue::List(vec![])),
            [one] => Ok(WireValue::List(vec![self.inner.marshal(ctx, one)?])),
            _ => Err(MarshalError::InvalidValue(format!(
                "maybe holds at most one value, got {}",
                items.len()
            ))),
        }
    }
}

struct MaybeUnmarshaler {
    inner: Arc<dyn Unmarshaler>,
}

impl Unmarshaler for MaybeUnmarshaler {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        let WireValue::List(items) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "list",
                got: v.kind(),
            });
        };
        match items.as_slice() {
            [] => Ok(Value::Seq(vec![])),
            [one] => Ok(Value::Seq(vec![self.inner.unmarshal(ctx, one)?])),
            _ => Err(MarshalError::InvalidValue(format!(
                "maybe holds at most one value, got {}",
                items.len()
            ))),
        }
    }
}

/// Render an encoded mapping key as a wire map key. Mirrors JSON's coercion
/// of scalar keys to strings.
fn wire_key_to_string(key: &WireValue) -> Result<String, MarshalError> {
    match key {
        WireValue::Str(s) => Ok(s.clone()),
        WireValue::Int(i) => Ok(i.to_string()),
        WireValue::Bool(b) => Ok(b.to_string()),
        other => Err(MarshalError::InvalidValue(format!(
            "mapping key must encode to a string-like wire value, got {}",
            other.kind()
        ))),
    }
}

/// Re-wrap a wire map key into the wire shape the key type expects.
fn wire_key_from_string(key: &str, key_ty: &TypeDescriptor) -> Result<WireValue, MarshalError> {
    match key_ty {
        TypeDescriptor::NewType { underlying, .. } => wire_key_from_string(key, underlying),
        TypeDescriptor::Primitive(PrimitiveKind::Int) => key
            .parse::<i64>()
            .map(WireValue::Int)
            .map_err(|e| MarshalError::InvalidValue(format!("bad int key {:?}: {}", key, e))),
        TypeDescriptor::Primitive(PrimitiveKind::Bool) => match key {
            "true" => Ok(WireValue::Bool(true)),
            "false" => Ok(WireValue::Bool(false)),
            _ => Err(MarshalError::InvalidValue(format!("bad bool key {:?}", key))),
        },
        _ => Ok(WireValue::Str(key.to_string())),
    }
}

struct MappingMarshaler {
    key: Arc<dyn Marshaler>,
    value: Arc<dyn Marshaler>,
}

impl Marshaler for MappingMarshaler {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        let Value::Map(entries) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "map",
                got: v.kind(),
            });
        };
        let mut out = WireMap::with_capacity(entries.len());
        for (k, val) in entries {
            let key = wire_key_to_string(&self.key.marshal(ctx, k)?)?;
            if out.insert(key.clone(), self.value.marshal(ctx, val)?).is_some() {
                return Err(MarshalError::DuplicateKey(key));
            }
        }
        Ok(WireValue::Map(out))
    }
}

struct MappingUnmarshaler {
    key_ty: Arc<TypeDescriptor>,
    key: Arc<dyn Unmarshaler>,
    value: Arc<dyn Unmarshaler>,
}

impl Unmarshaler for MappingUnmarshaler {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        let WireValue::Map(map) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "map",
                got: v.kind(),
            });
        };
        let mut entries = Vec::with_capacity(map.len());
        for (k, val) in map {
            let key_wire = wire_key_from_string(k, &self.key_ty)?;
            entries.push((
                self.key.unmarshal(ctx, &key_wire)?,
                self.value.unmarshal(ctx, val)?,
            ));
        }
        Ok(Value::Map(entries))
    }
}

/// Sequences and sets share the list wire form; only the native variant
/// differs.
struct ElementsMarshaler {
    base: BaseKind,
    inner: Arc<dyn Marshaler>,
}

impl Marshaler for ElementsMarshaler {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        let items = match (self.base, v) {
            (BaseKind::Sequence, Value::Seq(items)) => items,
            (BaseKind::Set, Value::Set(items)) => items,
            (base, other) => {
                return Err(MarshalError::ShapeMismatch {
                    expected: base.name(),
                    got: other.kind(),
                })
            }
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.inner.marshal(ctx, item)?);
        }
        Ok(WireValue::List(out))
    }
}

struct ElementsUnmarshaler {
    base: BaseKind,
    inner: Arc<dyn Unmarshaler>,
}

impl Unmarshaler for ElementsUnmarshaler {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        let WireValue::List(items) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "list",
                got: v.kind(),
            });
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.inner.unmarshal(ctx, item)?);
        }
        match self.base {
            BaseKind::Sequence => Ok(Value::Seq(out)),
            BaseKind::Set => Ok(Value::Set(out)),
            _ => unreachable!("elements codec built for {:?}", self.base),
        }
    }
}

/// Fixed-arity heterogeneous tuple over a positional converter list.
struct TupleMarshaler {
    items: Vec<Arc<dyn Marshaler>>,
}

impl Marshaler for TupleMarshaler {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        let Value::Tuple(items) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "tuple",
                got: v.kind(),
            });
        };
        if items.len() != self.items.len() {
            return Err(MarshalError::InvalidValue(format!(
                "tuple arity mismatch: expected {}, got {}",
                self.items.len(),
                items.len()
            )));
        }
        let mut out = Vec::with_capacity(items.len());
        for (m, item) in self.items.iter().zip(items) {
            out.push(m.marshal(ctx, item)?);
        }
        Ok(WireValue::List(out))
    }
}

struct TupleUnmarshaler {
    items: Vec<Arc<dyn Unmarshaler>>,
}

impl Unmarshaler for TupleUnmarshaler {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        let WireValue::List(items) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "list",
                got: v.kind(),
            });
        };
        if items.len() != self.items.len() {
            return Err(MarshalError::InvalidValue(format!(
                "tuple arity mismatch: expected {}, got {}",
                self.items.len(),
                items.len()
            )));
        }
        let mut out = Vec::with_capacity(items.len());
        for (u, item) in self.items.iter().zip(items) {
            out.push(u.unmarshal(ctx, item)?);
        }
        Ok(Value::Tuple(out))
    }
}

// ---------------------------------------------------------------------------
// Factories

/// Maybe, Sequence, and Set take one type argument; Mapping takes two.
/// Tuple takes any number. A descriptor built with the wrong count is a
/// configuration fault, not a decline.
fn check_arity(base: BaseKind, args: &[Arc<TypeDescriptor>]) -> Result<(), MarshalError> {
    let expected = match base {
        BaseKind::Mapping => 2,
        BaseKind::Maybe | BaseKind::Sequence | BaseKind::Set => 1,
        BaseKind::Tuple => return Ok(()),
    };
    if args.len() != expected {
        return Err(MarshalError::InvalidValue(format!(
            "{:?} expects {} type argument(s), got {}",
            base,
            expected,
            args.len()
        )));
    }
    Ok(())
}

/// Builds marshalers for one generic container base kind.
#[derive(Debug)]
pub struct ContainerMarshalerFactory {
    base: BaseKind,
}

impl ContainerMarshalerFactory {
    pub fn new(base: BaseKind) -> Self {
        Self { base }
    }
}

impl MarshalerFactory for ContainerMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        let TypeDescriptor::Generic(base, args) = ty.as_ref() else {
            return Ok(None);
        };
        if *base != self.base {
            return Ok(None);
        }
        check_arity(*base, args)?;
        let base = *base;
        let args = args.clone();
        let ctx = ctx.clone();
        Ok(Some(Box::new(move || match base {
            BaseKind::Maybe => Ok(Arc::new(MaybeMarshaler {
                inner: ctx.make_marshaler(&args[0])?,
            })),
            BaseKind::Mapping => Ok(Arc::new(MappingMarshaler {
                key: ctx.make_marshaler(&args[0])?,
                value: ctx.make_marshaler(&args[1])?,
            })),
            BaseKind::Sequence | BaseKind::Set => Ok(Arc::new(ElementsMarshaler {
                base,
                inner: ctx.make_marshaler(&args[0])?,
            })),
            BaseKind::Tuple => {
                let mut items = Vec::with_capacity(args.len());
                for arg in &args {
                    items.push(ctx.make_marshaler(arg)?);
                }
                Ok(Arc::new(TupleMarshaler { items }))
            }
        })))
    }
}

/// Builds unmarshalers for one generic container base kind.
#[derive(Debug)]
pub struct ContainerUnmarshalerFactory {
    base: BaseKind,
}

impl ContainerUnmarshalerFactory {
    pub fn new(base: BaseKind) -> Self {
        Self { base }
    }
}

impl UnmarshalerFactory for ContainerUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        let TypeDescriptor::Generic(base, args) = ty.as_ref() else {
            return Ok(None);
        };
        if *base != self.base {
            return Ok(None);
        }
        check_arity(*base, args)?;
        let base = *base;
        let args = args.clone();
        let ctx = ctx.clone();
        Ok(Some(Box::new(move || match base {
            BaseKind::Maybe => Ok(Arc::new(MaybeUnmarshaler {
                inner: ctx.make_unmarshaler(&args[0])?,
            })),
            BaseKind::Mapping => Ok(Arc::new(MappingUnmarshaler {
                key_ty: args[0].clone(),
                key: ctx.make_unmarshaler(&args[0])?,
                value: ctx.make_unmarshaler(&args[1])?,
            })),
            BaseKind::Sequence | BaseKind::Set => Ok(Arc::new(ElementsUnmarshaler {
                base,
                inner: ctx.make_unmarshaler(&args[0])?,
            })),
            BaseKind::Tuple => {
                let mut items = Vec::with_capacity(args.len());
                for arg in &args {
                    items.push(ctx.make_unmarshaler(arg)?);
                }
                Ok(Arc::new(TupleUnmarshaler { items }))
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_key_coercion() {
        assert_eq!(wire_key_to_string(&WireValue::Int(7)).unwrap(), "7");
        assert_eq!(wire_key_to_string(&WireValue::Str("k".into())).unwrap(), "k");
        assert!(wire_key_to_string(&WireValue::List(vec![])).is_err());
        assert_eq!(
            wire_key_from_string("7", &TypeDescriptor::Primitive(PrimitiveKind::Int)).unwrap(),
            WireValue::Int(7)
        );
        assert_eq!(
            wire_key_from_string("k", &TypeDescriptor::Primitive(PrimitiveKind::Str)).unwrap(),
            WireValue::Str("k".into())
        );
    }

    #[test]
    fn test_malformed_generic_arity_rejected() {
        use crate::registry::Registry;

        let factory = Arc::new(ContainerMarshalerFactory::new(BaseKind::Mapping));
        let ctx = MarshalFactoryContext::new(Arc::new(Registry::new()), factory.clone());
        let bad = Arc::new(TypeDescriptor::Generic(BaseKind::Mapping, vec![]));
        let err = factory.make_marshaler(&ctx, &bad).map(|_| ()).unwrap_err();
        assert!(matches!(err, MarshalError::InvalidValue(_)));

        let decode = Arc::new(ContainerUnmarshalerFactory::new(BaseKind::Sequence));
        let ctx = UnmarshalFactoryContext::new(Arc::new(Registry::new()), decode.clone());
        let bad = Arc::new(TypeDescriptor::Generic(
            BaseKind::Sequence,
            vec![TypeDescriptor::int(), TypeDescriptor::int()],
        ));
        let err = decode.make_unmarshaler(&ctx, &bad).map(|_| ()).unwrap_err();
        assert!(matches!(err, MarshalError::InvalidValue(_)));
    }
}
