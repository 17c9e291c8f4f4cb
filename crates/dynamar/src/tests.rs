// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! End-to-end engine tests.

use crate::builder::RecordBuilder;
use crate::context::MarshalFactoryContext;
use crate::errors::{MarshalError, RegistryError};
use crate::factory::{MarshalerFactory, MarshalerMaker, ready_marshaler};
use crate::naming::Naming;
use crate::polymorphism::{Impl, Impls, Polymorphism, PolymorphismMarshalerFactory, PolymorphismUnmarshalerFactory};
use crate::registry::{Registry, RegistryItem, TypeTagging};
use crate::standard::Engine;
use crate::type_descriptor::{FieldDescriptor, LiteralValue, TypeDescriptor};
use crate::value::Value;
use crate::wire::WireValue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn round_trip(engine: &Engine, ty: &Arc<TypeDescriptor>, v: Value) {
    let wire = engine.marshal(ty, &v).expect("marshal");
    let back = engine.unmarshal(ty, &wire).expect("unmarshal");
    assert_eq!(back, v, "round trip through {}", ty);
}

#[test]
fn test_primitive_round_trips() {
    let engine = Engine::new(Registry::new());
    round_trip(&engine, &TypeDescriptor::bool(), Value::Bool(true));
    round_trip(&engine, &TypeDescriptor::int(), Value::Int(-7));
    round_trip(&engine, &TypeDescriptor::float(), Value::Float(2.25));
    round_trip(&engine, &TypeDescriptor::string(), Value::Str("hi".into()));
    round_trip(&engine, &TypeDescriptor::bytes(), Value::Bytes(vec![0, 255]));
}

#[test]
fn test_wrapper_and_container_round_trips() {
    let engine = Engine::new(Registry::new());
    let opt_int = TypeDescriptor::optional(TypeDescriptor::int());
    round_trip(&engine, &opt_int, Value::Null);
    round_trip(&engine, &opt_int, Value::Int(3));
    round_trip(
        &engine,
        &TypeDescriptor::newtype("UserId", TypeDescriptor::int()),
        Value::Int(17),
    );
    round_trip(
        &engine,
        &TypeDescriptor::sequence(TypeDescriptor::string()),
        Value::Seq(vec![Value::Str("a".into()), Value::Str("b".into())]),
    );
    round_trip(
        &engine,
        &TypeDescriptor::set(TypeDescriptor::int()),
        Value::Set(vec![Value::Int(1), Value::Int(2)]),
    );
    round_trip(
        &engine,
        &TypeDescriptor::tuple([TypeDescriptor::int(), TypeDescriptor::string()]),
        Value::Tuple(vec![Value::Int(1), Value::Str("x".into())]),
    );
    let maybe = TypeDescriptor::maybe(TypeDescriptor::int());
    round_trip(&engine, &maybe, Value::Seq(vec![]));
    round_trip(&engine, &maybe, Value::Seq(vec![Value::Int(5)]));
}

#[test]
fn test_mapping_key_coercion_round_trip() {
    let engine = Engine::new(Registry::new());
    let ty = TypeDescriptor::mapping(TypeDescriptor::int(), TypeDescriptor::string());
    let v = Value::Map(vec![
        (Value::Int(1), Value::Str("one".into())),
        (Value::Int(2), Value::Str("two".into())),
    ]);
    let wire = engine.marshal(&ty, &v).expect("marshal");
    // Int keys render as strings on the wire.
    assert_eq!(
        wire,
        WireValue::map([("1", WireValue::Str("one".into())), ("2", WireValue::Str("two".into()))])
    );
    assert_eq!(engine.unmarshal(&ty, &wire).expect("unmarshal"), v);
}

#[test]
fn test_union_enum_literal_round_trips() {
    let engine = Engine::new(Registry::new());
    let union = TypeDescriptor::union([TypeDescriptor::int(), TypeDescriptor::string()]);
    round_trip(&engine, &union, Value::Int(4));
    round_trip(&engine, &union, Value::Str("s".into()));
    let color = TypeDescriptor::enumeration("Color", ["Red", "Green"]);
    round_trip(&engine, &color, Value::Enum("Red".into()));
    let err = engine
        .marshal(&color, &Value::Enum("Blue".into()))
        .unwrap_err();
    assert!(matches!(err, MarshalError::UnknownEnumVariant { .. }));
    let lit = TypeDescriptor::literal([LiteralValue::Str("a".into()), LiteralValue::Int(1)]);
    round_trip(&engine, &lit, Value::Str("a".into()));
    assert!(engine.marshal(&lit, &Value::Str("b".into())).is_err());
}

#[test]
fn test_special_scalar_round_trips() {
    let engine = Engine::new(Registry::new());
    round_trip(
        &engine,
        &TypeDescriptor::bigint(),
        Value::BigInt(170141183460469231731687303715884105727),
    );
    let uuid = uuid::Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    round_trip(&engine, &TypeDescriptor::uuid(), Value::Uuid(uuid));
    let ts = chrono::DateTime::parse_from_rfc3339("2026-08-29T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    round_trip(&engine, &TypeDescriptor::timestamp(), Value::Timestamp(ts));
}

#[test]
fn test_any_round_trip() {
    let engine = Engine::new(Registry::new());
    round_trip(
        &engine,
        &TypeDescriptor::any(),
        Value::Map(vec![(
            Value::Str("k".into()),
            Value::Seq(vec![Value::Int(1), Value::Null]),
        )]),
    );
}

fn node_types() -> (Arc<TypeDescriptor>, Arc<TypeDescriptor>) {
    // Descriptors are immutable values, so the self-reference goes through
    // a named placeholder resolved by a registry type override.
    let node_ref = TypeDescriptor::newtype("Node", TypeDescriptor::any());
    let node = RecordBuilder::new("Node")
        .int_field("v")
        .optional_field("next", node_ref.clone())
        .build();
    (node, node_ref)
}

#[test]
fn test_recursive_record_deep_round_trip() {
    let (node, node_ref) = node_types();
    let registry = Registry::new();
    registry
        .register(&node_ref, RegistryItem::TypeOverride(node.clone()))
        .unwrap();
    let engine = Engine::new(registry);

    let mut v = Value::record("Node", [("v", Value::Int(0)), ("next", Value::Null)]);
    for i in 1..=150 {
        v = Value::record("Node", [("v", Value::Int(i)), ("next", v)]);
    }
    round_trip(&engine, &node, v);
}

struct CountingFactory {
    ty: Arc<TypeDescriptor>,
    builds: Arc<AtomicUsize>,
}

impl MarshalerFactory for CountingFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        if ty != &self.ty {
            return Ok(None);
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        struct Fixed;
        impl crate::convert::Marshaler for Fixed {
            fn marshal(
                &self,
                _ctx: &crate::context::MarshalContext,
                _v: &Value,
            ) -> Result<WireValue, MarshalError> {
                Ok(WireValue::Null)
            }
        }
        Ok(Some(ready_marshaler(Arc::new(Fixed))))
    }
}

#[test]
fn test_cache_builds_each_type_once() {
    let counted = TypeDescriptor::newtype("Counted", TypeDescriptor::any());
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    registry
        .register(
            &counted,
            RegistryItem::MarshalerFactory(Arc::new(CountingFactory {
                ty: counted.clone(),
                builds: builds.clone(),
            })),
        )
        .unwrap();
    let engine = Engine::new(registry);

    let seq = TypeDescriptor::sequence(counted.clone());
    let a = engine.marshaler(&seq).expect("first");
    let b = engine.marshaler(&seq).expect("second");
    engine.marshaler(&counted).expect("direct");
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    // Both resolutions observe the same cached converter.
    let ctx = crate::context::MarshalContext {
        registry: engine.registry().clone(),
    };
    let v = Value::Seq(vec![Value::Int(1)]);
    assert_eq!(a.marshal(&ctx, &v).unwrap(), b.marshal(&ctx, &v).unwrap());
}

/// Claims one type and stalls its construction, holding the enclosing
/// build open while sibling converters finish.
struct SlowBuildFactory {
    ty: Arc<TypeDescriptor>,
    delay: std::time::Duration,
}

impl MarshalerFactory for SlowBuildFactory {
    fn make_marshaler(
        &self,
        _ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        if ty != &self.ty {
            return Ok(None);
        }
        let delay = self.delay;
        Ok(Some(Box::new(move || {
            std::thread::sleep(delay);
            struct Fixed;
            impl crate::convert::Marshaler for Fixed {
                fn marshal(
                    &self,
                    _ctx: &crate::context::MarshalContext,
                    _v: &Value,
                ) -> Result<WireValue, MarshalError> {
                    Ok(WireValue::Null)
                }
            }
            Ok(Arc::new(Fixed) as Arc<dyn crate::convert::Marshaler>)
        })))
    }
}

#[test]
fn test_concurrent_resolution_never_observes_partial_build() {
    // Outer and Inner are mutually recursive; Outer also carries a field
    // whose converter is slow to construct. While one thread is stalled
    // inside Outer's build, another thread resolving Inner must get a
    // converter whose recursion proxies are all filled.
    let outer_ref = TypeDescriptor::newtype("Outer", TypeDescriptor::any());
    let inner = RecordBuilder::new("Inner")
        .optional_field("back", outer_ref.clone())
        .build();
    let slow = TypeDescriptor::newtype("Slow", TypeDescriptor::any());
    // The recursive branch comes first so Inner finishes building while
    // Outer's own proxy is still unfilled.
    let outer = RecordBuilder::new("Outer")
        .field("inner", inner.clone())
        .field("s", slow.clone())
        .build();

    let registry = Registry::new();
    registry
        .register(&outer_ref, RegistryItem::TypeOverride(outer.clone()))
        .unwrap();
    registry
        .register(
            &slow,
            RegistryItem::MarshalerFactory(Arc::new(SlowBuildFactory {
                ty: slow.clone(),
                delay: std::time::Duration::from_millis(200),
            })),
        )
        .unwrap();
    let engine = Arc::new(Engine::new(registry));

    let bg = {
        let engine = engine.clone();
        let outer = outer.clone();
        std::thread::spawn(move || engine.marshaler(&outer).map(|_| ()))
    };
    std::thread::sleep(std::time::Duration::from_millis(50));

    let m = engine.marshaler(&inner).expect("resolve while other build runs");
    let v = Value::record(
        "Inner",
        [(
            "back",
            Value::record(
                "Outer",
                [
                    ("inner", Value::record("Inner", [("back", Value::Null)])),
                    ("s", Value::Null),
                ],
            ),
        )],
    );
    let ctx = crate::context::MarshalContext {
        registry: engine.registry().clone(),
    };
    m.marshal(&ctx, &v).expect("converter is fully built");

    bg.join().expect("join").expect("background build");
}

#[test]
fn test_concurrent_first_resolution_converges() {
    let counted = TypeDescriptor::newtype("Counted", TypeDescriptor::any());
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new();
    registry
        .register(
            &counted,
            RegistryItem::MarshalerFactory(Arc::new(CountingFactory {
                ty: counted.clone(),
                builds: builds.clone(),
            })),
        )
        .unwrap();
    let engine = Arc::new(Engine::new(registry));

    let seq = TypeDescriptor::sequence(counted.clone());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            let seq = seq.clone();
            std::thread::spawn(move || engine.marshaler(&seq).map(|_| ()))
        })
        .collect();
    for h in handles {
        h.join().expect("join").expect("resolve");
    }

    // First-build races resolve first-write-wins; afterwards the cache
    // serves every resolution without building again.
    let after_race = builds.load(Ordering::SeqCst);
    assert!((1..=4).contains(&after_race));
    engine.marshaler(&seq).expect("cached");
    assert_eq!(builds.load(Ordering::SeqCst), after_race);
}

#[test]
fn test_field_aliasing() {
    let ty = RecordBuilder::new("R")
        .push(
            FieldDescriptor::new("v", TypeDescriptor::int())
                .with_name("value")
                .with_alts(["v"]),
        )
        .build();
    let engine = Engine::new(Registry::new());
    let v = Value::record("R", [("v", Value::Int(9))]);
    let wire = engine.marshal(&ty, &v).expect("marshal");
    assert_eq!(wire, WireValue::map([("value", WireValue::Int(9))]));
    // Both the name and the alt decode.
    assert_eq!(engine.unmarshal(&ty, &wire).unwrap(), v);
    let alt = WireValue::map([("v", WireValue::Int(9))]);
    assert_eq!(engine.unmarshal(&ty, &alt).unwrap(), v);
    // Both at once is ambiguous.
    let both = WireValue::map([("value", WireValue::Int(9)), ("v", WireValue::Int(8))]);
    assert!(matches!(
        engine.unmarshal(&ty, &both).unwrap_err(),
        MarshalError::DuplicateKey(_)
    ));
}

#[test]
fn test_unknown_field_policies() {
    let engine = Engine::new(Registry::new());
    let input = WireValue::map([("x", WireValue::Int(1)), ("mystery", WireValue::Bool(true))]);

    // Default: unknown keys are errors.
    let strict = RecordBuilder::new("S").int_field("x").build();
    assert!(matches!(
        engine.unmarshal(&strict, &input).unwrap_err(),
        MarshalError::UnknownField(k) if k == "mystery"
    ));

    // ignore_unknown drops them.
    let lax = RecordBuilder::new("L").int_field("x").ignore_unknown().build();
    assert_eq!(
        engine.unmarshal(&lax, &input).unwrap(),
        Value::record("L", [("x", Value::Int(1))])
    );

    // A catch-all collects them.
    let catching = RecordBuilder::new("C")
        .int_field("x")
        .field(
            "extra",
            TypeDescriptor::mapping(TypeDescriptor::string(), TypeDescriptor::any()),
        )
        .unknown_field("extra")
        .build();
    assert_eq!(
        engine.unmarshal(&catching, &input).unwrap(),
        Value::record(
            "C",
            [
                ("x", Value::Int(1)),
                (
                    "extra",
                    Value::Map(vec![(Value::Str("mystery".into()), Value::Bool(true))])
                ),
            ]
        )
    );
}

#[test]
fn test_embedding_flattens_and_round_trips() {
    let child = RecordBuilder::new("Addr")
        .string_field("city")
        .string_field("zip")
        .build();
    let parent = RecordBuilder::new("Person")
        .string_field("name")
        .embedded_field("addr", child)
        .build();
    let engine = Engine::new(Registry::new());
    let v = Value::record(
        "Person",
        [
            ("name", Value::Str("Ada".into())),
            (
                "addr",
                Value::record(
                    "Addr",
                    [
                        ("city", Value::Str("London".into())),
                        ("zip", Value::Str("N1".into())),
                    ],
                ),
            ),
        ],
    );
    let wire = engine.marshal(&parent, &v).expect("marshal");
    assert_eq!(
        wire,
        WireValue::map([
            ("name", WireValue::Str("Ada".into())),
            ("addr_city", WireValue::Str("London".into())),
            ("addr_zip", WireValue::Str("N1".into())),
        ])
    );
    assert_eq!(engine.unmarshal(&parent, &wire).unwrap(), v);
}

#[test]
fn test_naming_convention_applied_on_wire() {
    let ty = RecordBuilder::new("R")
        .int_field("first_field")
        .naming(Naming::LowCamel)
        .build();
    let engine = Engine::new(Registry::new());
    let wire = engine
        .marshal(&ty, &Value::record("R", [("first_field", Value::Int(1))]))
        .unwrap();
    assert_eq!(wire, WireValue::map([("firstField", WireValue::Int(1))]));
}

fn shapes() -> (Arc<TypeDescriptor>, Arc<Polymorphism>) {
    let circle = RecordBuilder::new("Circle").int_field("r").build();
    let square = RecordBuilder::new("Square").int_field("side").build();
    let base = TypeDescriptor::newtype("Shape", TypeDescriptor::any());
    let impls = Impls::new([
        Impl::new(circle, "circle"),
        Impl::new(square, "square").with_alts(["sq"]),
    ])
    .expect("impls");
    let poly = Arc::new(Polymorphism::new(base.clone(), impls));
    (base, poly)
}

#[test]
fn test_wrapper_tagging() {
    let (base, poly) = shapes();
    let registry = Registry::new();
    registry
        .register_global(RegistryItem::MarshalerFactory(Arc::new(
            PolymorphismMarshalerFactory::new(poly.clone()),
        )))
        .unwrap();
    registry
        .register_global(RegistryItem::UnmarshalerFactory(Arc::new(
            PolymorphismUnmarshalerFactory::new(poly),
        )))
        .unwrap();
    let engine = Engine::new(registry);
    let v = Value::record("Circle", [("r", Value::Int(2))]);
    let wire = engine.marshal(&base, &v).expect("marshal");
    assert_eq!(
        wire,
        WireValue::map([("circle", WireValue::map([("r", WireValue::Int(2))]))])
    );
    assert_eq!(engine.unmarshal(&base, &wire).unwrap(), v);
    // Alts decode too.
    let alt = WireValue::map([("sq", WireValue::map([("side", WireValue::Int(3))]))]);
    assert_eq!(
        engine.unmarshal(&base, &alt).unwrap(),
        Value::record("Square", [("side", Value::Int(3))])
    );
    // An undeclared identity has no tag.
    let triangle = Value::Record {
        name: "Triangle".into(),
        fields: Default::default(),
    };
    let err = engine.marshal(&base, &triangle).unwrap_err();
    assert!(matches!(err, MarshalError::UnknownTag(t) if t == "Triangle"));
}

#[test]
fn test_field_tagging() {
    let (base, poly) = shapes();
    let registry = Registry::new();
    registry
        .register_global(RegistryItem::MarshalerFactory(Arc::new(
            PolymorphismMarshalerFactory::new(poly.clone())
                .with_tagging(TypeTagging::Field("type".into())),
        )))
        .unwrap();
    registry
        .register_global(RegistryItem::UnmarshalerFactory(Arc::new(
            PolymorphismUnmarshalerFactory::new(poly)
                .with_tagging(TypeTagging::Field("type".into())),
        )))
        .unwrap();
    let engine = Engine::new(registry);
    let v = Value::record("Square", [("side", Value::Int(4))]);
    let wire = engine.marshal(&base, &v).expect("marshal");
    assert_eq!(
        wire,
        WireValue::map([
            ("type", WireValue::Str("square".into())),
            ("side", WireValue::Int(4)),
        ])
    );
    assert_eq!(engine.unmarshal(&base, &wire).unwrap(), v);
    // Missing discriminator.
    let bare = WireValue::map([("side", WireValue::Int(4))]);
    assert!(matches!(
        engine.unmarshal(&base, &bare).unwrap_err(),
        MarshalError::MissingField(k) if k == "type"
    ));
}

#[test]
fn test_registry_tagging_item_picked_up() {
    let (base, poly) = shapes();
    let registry = Registry::new();
    registry
        .register(&base, RegistryItem::Tagging(TypeTagging::Field("kind".into())))
        .unwrap();
    registry
        .register_global(RegistryItem::MarshalerFactory(Arc::new(
            PolymorphismMarshalerFactory::new(poly),
        )))
        .unwrap();
    let engine = Engine::new(registry);
    let wire = engine
        .marshal(&base, &Value::record("Circle", [("r", Value::Int(1))]))
        .unwrap();
    assert_eq!(
        wire,
        WireValue::map([
            ("kind", WireValue::Str("circle".into())),
            ("r", WireValue::Int(1)),
        ])
    );
}

#[test]
fn test_seal_violation() {
    let engine = Engine::new(Registry::new());
    let err = engine
        .registry()
        .register(&TypeDescriptor::int(), RegistryItem::Tagging(TypeTagging::Wrapper))
        .unwrap_err();
    assert_eq!(err, RegistryError::Sealed);
}

#[test]
fn test_strict_multi_ambiguity() {
    use crate::combinators::MultiMarshalerFactory;
    use crate::codecs::PrimitiveMarshalerFactory;
    let strict = Arc::new(MultiMarshalerFactory::strict(vec![
        Arc::new(PrimitiveMarshalerFactory),
        Arc::new(PrimitiveMarshalerFactory),
    ]));
    let ctx = MarshalFactoryContext::new(Arc::new(Registry::new()), strict);
    let err = ctx
        .make_marshaler(&TypeDescriptor::int())
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, MarshalError::AmbiguousMatches { count: 2, .. }));
}

#[test]
fn test_setup_hook_registers_override() {
    let counted = TypeDescriptor::newtype("Hooked", TypeDescriptor::any());
    let registry = Registry::new();
    let key = counted.clone();
    registry
        .register_global(RegistryItem::SetupHook(Arc::new(move |reg: &Registry| {
            reg.register(&key, RegistryItem::TypeOverride(TypeDescriptor::int()))
                .expect("hook registers pre-seal");
        })))
        .unwrap();
    let engine = Engine::new(registry);
    round_trip(&engine, &counted, Value::Int(11));
}

#[test]
fn test_random_int_sequences_round_trip() {
    let engine = Engine::new(Registry::new());
    let ty = TypeDescriptor::sequence(TypeDescriptor::int());
    for _ in 0..20 {
        let v = Value::Seq(
            (0..fastrand::usize(0..32))
                .map(|_| Value::Int(fastrand::i64(..)))
                .collect(),
        );
        round_trip(&engine, &ty, v);
    }
}

#[cfg(feature = "json")]
#[test]
fn test_json_bridge_round_trip() {
    let ty = RecordBuilder::new("Blob")
        .string_field("name")
        .field("data", TypeDescriptor::bytes())
        .build();
    let engine = Engine::new(Registry::new());
    let v = Value::record(
        "Blob",
        [
            ("name", Value::Str("b".into())),
            ("data", Value::Bytes(vec![1, 2, 3])),
        ],
    );
    let wire = engine.marshal(&ty, &v).expect("marshal");
    let json = crate::json::wire_to_json(&wire).expect("to json");
    let text = serde_json::to_string(&json).expect("serialize");
    assert_eq!(text, r#"{"name":"b","data":"AQID"}"#);
}
