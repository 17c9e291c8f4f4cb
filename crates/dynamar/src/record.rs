// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Record codec: named-field composites with naming conventions, aliasing,
//! embedding, defaults, and the catch-all / source-capture specials.
//!
//! Wire-name derivation and the decode-side accepted-name table are built
//! eagerly when the converter is constructed, so misconfigured records
//! (colliding keys, specials on embedded records) fail at build time rather
//! than on first use.

use crate::codecs::any::wire_to_value;
use crate::context::{MarshalContext, MarshalFactoryContext, UnmarshalContext, UnmarshalFactoryContext};
use crate::convert::{Marshaler, Unmarshaler};
use crate::errors::MarshalError;
use crate::factory::{MarshalerFactory, MarshalerMaker, UnmarshalerFactory, UnmarshalerMaker};
use crate::naming::translate_name;
use crate::type_descriptor::{
    BaseKind, FieldOptions, OmitIf, RecordDescriptor, TypeDescriptor,
};
use crate::value::{FieldMap, Value};
use crate::wire::{WireMap, WireValue};
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Field info derivation

/// A field's resolved wire-facing shape.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Source identifier.
    pub name: String,
    pub ty: Arc<TypeDescriptor>,
    /// Encoded key, or embed prefix; `None` when the field is decode-only.
    pub marshal_name: Option<String>,
    /// Accepted input keys, de-duplicated, declaration order; empty when the
    /// field is encode-only.
    pub unmarshal_names: Vec<String>,
    /// Merged options (built-in < record defaults < per-field).
    pub options: FieldOptions,
    pub marshaler_token: Option<crate::registry::OverrideKey>,
    pub unmarshaler_token: Option<crate::registry::OverrideKey>,
}

fn merge_options(defaults: &FieldOptions, over: &FieldOptions) -> FieldOptions {
    FieldOptions {
        omit_if: if over.omit_if != OmitIf::Never {
            over.omit_if
        } else {
            defaults.omit_if
        },
        default: over.default.clone().or_else(|| defaults.default.clone()),
        embed: over.embed || defaults.embed,
        no_marshal: over.no_marshal || defaults.no_marshal,
        no_unmarshal: over.no_unmarshal || defaults.no_unmarshal,
    }
}

/// Resolve every field of a record to its wire-facing shape.
pub fn derive_field_infos(rd: &RecordDescriptor) -> Vec<FieldInfo> {
    rd.fields
        .iter()
        .map(|f| {
            let options = merge_options(&rd.options.field_defaults, &f.metadata.options);
            let explicit = f.metadata.name.clone();
            let mut wire_name = match &explicit {
                Some(n) => n.clone(),
                None => match f.metadata.naming.or(rd.options.field_naming) {
                    Some(naming) => translate_name(&f.name, naming),
                    None => f.name.clone(),
                },
            };
            // An embed prefix without an explicit name gets a separator.
            if options.embed && explicit.is_none() {
                wire_name.push('_');
            }
            let marshal_name = (!options.no_marshal).then(|| wire_name.clone());
            let unmarshal_names = if options.no_unmarshal {
                Vec::new()
            } else {
                let mut names = vec![wire_name];
                for alt in &f.metadata.alts {
                    if !names.iter().any(|n| n == alt) {
                        names.push(alt.clone());
                    }
                }
                names
            };
            FieldInfo {
                name: f.name.clone(),
                ty: f.ty.clone(),
                marshal_name,
                unmarshal_names,
                options,
                marshaler_token: f.metadata.marshaler_token,
                unmarshaler_token: f.metadata.unmarshaler_token,
            }
        })
        .collect()
}

fn is_special(rd: &RecordDescriptor, name: &str) -> bool {
    rd.options.unknown_field.as_deref() == Some(name)
        || rd.options.source_field.as_deref() == Some(name)
}

fn mapping_value_type(ty: &TypeDescriptor) -> Option<Arc<TypeDescriptor>> {
    match ty {
        TypeDescriptor::Generic(BaseKind::Mapping, args) => args.get(1).cloned(),
        _ => None,
    }
}

fn check_special(rd: &RecordDescriptor, name: &str) -> Result<(), MarshalError> {
    if rd.field(name).is_none() {
        return Err(MarshalError::InvalidValue(format!(
            "record {} declares special field {:?} but does not define it",
            rd.name, name
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Marshal side

struct FieldMarshaler {
    info: FieldInfo,
    m: Arc<dyn Marshaler>,
}

/// Encodes a record value as a wire map.
pub struct RecordMarshaler {
    fields: Vec<FieldMarshaler>,
    /// Catch-all field: encoded through its own converter, merged last.
    catch_all: Option<(String, Arc<dyn Marshaler>)>,
}

impl RecordMarshaler {
    fn build(ctx: &MarshalFactoryContext, rd: &RecordDescriptor) -> Result<Self, MarshalError> {
        if let Some(name) = &rd.options.unknown_field {
            check_special(rd, name)?;
        }
        if let Some(name) = &rd.options.source_field {
            check_special(rd, name)?;
        }
        let mut fields = Vec::new();
        let mut catch_all = None;
        for info in derive_field_infos(rd) {
            if rd.options.source_field.as_deref() == Some(info.name.as_str()) {
                continue;
            }
            let m = field_marshaler(ctx, &info)?;
            if rd.options.unknown_field.as_deref() == Some(info.name.as_str()) {
                catch_all = Some((info.name, m));
                continue;
            }
            if info.marshal_name.is_none() {
                continue;
            }
            fields.push(FieldMarshaler { info, m });
        }
        Ok(Self { fields, catch_all })
    }
}

fn field_marshaler(
    ctx: &MarshalFactoryContext,
    info: &FieldInfo,
) -> Result<Arc<dyn Marshaler>, MarshalError> {
    match info.marshaler_token {
        Some(token) => ctx.registry.marshaler_for_token(token).ok_or_else(|| {
            MarshalError::InvalidValue(format!(
                "no marshaler registered for field {:?} override token",
                info.name
            ))
        }),
        None => ctx.make_marshaler(&info.ty),
    }
}

fn insert_wire_key(out: &mut WireMap, key: String, v: WireValue) -> Result<(), MarshalError> {
    if out.contains_key(&key) {
        return Err(MarshalError::DuplicateKey(key));
    }
    out.insert(key, v);
    Ok(())
}

impl Marshaler for RecordMarshaler {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError> {
        let Value::Record { fields, .. } = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "record",
                got: v.kind(),
            });
        };
        let mut out = WireMap::with_capacity(self.fields.len());
        for fm in &self.fields {
            let default = fm.info.options.default.as_ref();
            let value = match fields.get(&fm.info.name).or(default) {
                Some(value) => value,
                None => return Err(MarshalError::MissingField(fm.info.name.clone())),
            };
            if fm.info.options.omit_if.matches(value) {
                continue;
            }
            let encoded = fm.m.marshal(ctx, value)?;
            let name = fm
                .info
                .marshal_name
                .as_ref()
                .ok_or_else(|| MarshalError::MissingField(fm.info.name.clone()))?;
            if fm.info.options.embed {
                let WireValue::Map(child) = encoded else {
                    return Err(MarshalError::InvalidValue(format!(
                        "embedded field {:?} did not encode to a map",
                        fm.info.name
                    )));
                };
                for (k, cv) in child {
                    insert_wire_key(&mut out, format!("{}{}", name, k), cv)?;
                }
            } else {
                insert_wire_key(&mut out, name.clone(), encoded)?;
            }
        }
        if let Some((name, m)) = &self.catch_all {
            if let Some(extra) = fields.get(name) {
                let WireValue::Map(extra) = m.marshal(ctx, extra)? else {
                    return Err(MarshalError::InvalidValue(format!(
                        "catch-all field {:?} did not encode to a map",
                        name
                    )));
                };
                for (k, ev) in extra {
                    insert_wire_key(&mut out, k, ev)?;
                }
            }
        }
        Ok(WireValue::Map(out))
    }
}

// ---------------------------------------------------------------------------
// Unmarshal side

struct FieldUnmarshaler {
    info: FieldInfo,
    kind: FieldKind,
}

enum FieldKind {
    Leaf(Arc<dyn Unmarshaler>),
    Embedded(EmbeddedRecord),
}

struct EmbeddedRecord {
    record_name: String,
    fields: Vec<FieldUnmarshaler>,
}

/// Decodes a wire map into a record value.
pub struct RecordUnmarshaler {
    record_name: String,
    fields: Vec<FieldUnmarshaler>,
    /// Accepted input key -> path of source field names from the root.
    table: HashMap<String, Vec<String>>,
    ignore_unknown: bool,
    catch_all: Option<(String, Arc<dyn Unmarshaler>)>,
    source_field: Option<String>,
}

fn build_field_unmarshalers(
    ctx: &UnmarshalFactoryContext,
    rd: &RecordDescriptor,
    top: bool,
) -> Result<Vec<FieldUnmarshaler>, MarshalError> {
    if !top && (rd.options.unknown_field.is_some() || rd.options.source_field.is_some()) {
        return Err(MarshalError::InvalidValue(format!(
            "embedded record {} may not declare catch-all or source fields",
            rd.name
        )));
    }
    let mut out = Vec::new();
    for info in derive_field_infos(rd) {
        if top && is_special(rd, &info.name) {
            continue;
        }
        if info.options.embed {
            let TypeDescriptor::Record(child) = info.ty.as_ref() else {
                return Err(MarshalError::InvalidValue(format!(
                    "embedded field {:?} is not record-typed",
                    info.name
                )));
            };
            let record_name = child.name.clone();
            let fields = build_field_unmarshalers(ctx, child, false)?;
            out.push(FieldUnmarshaler {
                info,
                kind: FieldKind::Embedded(EmbeddedRecord { record_name, fields }),
            });
        } else {
            let u = field_unmarshaler(ctx, &info)?;
            out.push(FieldUnmarshaler {
                info,
                kind: FieldKind::Leaf(u),
            });
        }
    }
    Ok(out)
}

fn field_unmarshaler(
    ctx: &UnmarshalFactoryContext,
    info: &FieldInfo,
) -> Result<Arc<dyn Unmarshaler>, MarshalError> {
    match info.unmarshaler_token {
        Some(token) => ctx.registry.unmarshaler_for_token(token).ok_or_else(|| {
            MarshalError::InvalidValue(format!(
                "no unmarshaler registered for field {:?} override token",
                info.name
            ))
        }),
        None => ctx.make_unmarshaler(&info.ty),
    }
}

/// Flatten the accepted-name table, expanding embedded records under the
/// prefix product of the embedding field's accepted names.
fn flatten_table(
    fields: &[FieldUnmarshaler],
    prefixes: &[String],
    path: &mut Vec<String>,
    table: &mut HashMap<String, Vec<String>>,
) -> Result<(), MarshalError> {
    for f in fields {
        path.push(f.info.name.clone());
        match &f.kind {
            FieldKind::Embedded(emb) => {
                let mut child_prefixes = Vec::new();
                for p in prefixes {
                    for n in &f.info.unmarshal_names {
                        child_prefixes.push(format!("{}{}", p, n));
                    }
                }
                flatten_table(&emb.fields, &child_prefixes, path, table)?;
            }
            FieldKind::Leaf(_) => {
                for p in prefixes {
                    for n in &f.info.unmarshal_names {
                        let key = format!("{}{}", p, n);
                        if table.insert(key.clone(), path.clone()).is_some() {
                            return Err(MarshalError::DuplicateKey(key));
                        }
                    }
                }
            }
        }
        path.pop();
    }
    Ok(())
}

impl RecordUnmarshaler {
    fn build(ctx: &UnmarshalFactoryContext, rd: &RecordDescriptor) -> Result<Self, MarshalError> {
        if let Some(name) = &rd.options.unknown_field {
            check_special(rd, name)?;
        }
        if let Some(name) = &rd.options.source_field {
            check_special(rd, name)?;
        }
        let fields = build_field_unmarshalers(ctx, rd, true)?;
        let mut table = HashMap::new();
        flatten_table(&fields, &[String::new()], &mut Vec::new(), &mut table)?;
        let catch_all = match &rd.options.unknown_field {
            Some(name) => {
                // The catch-all collects raw keys, so only its value type is
                // converted.
                let fd = rd
                    .field(name)
                    .ok_or_else(|| MarshalError::MissingField(name.clone()))?;
                let value_ty = mapping_value_type(&fd.ty).ok_or_else(|| {
                    MarshalError::InvalidValue(format!(
                        "catch-all field {:?} is not mapping-typed",
                        name
                    ))
                })?;
                Some((name.clone(), ctx.make_unmarshaler(&value_ty)?))
            }
            None => None,
        };
        Ok(Self {
            record_name: rd.name.clone(),
            fields,
            table,
            ignore_unknown: rd.options.ignore_unknown,
            catch_all,
            source_field: rd.options.source_field.clone(),
        })
    }
}

fn assemble(
    ctx: &UnmarshalContext,
    fields: &[FieldUnmarshaler],
    path: &mut Vec<String>,
    taken: &HashMap<Vec<String>, WireValue>,
) -> Result<FieldMap, MarshalError> {
    let mut out = FieldMap::new();
    for f in fields {
        path.push(f.info.name.clone());
        match &f.kind {
            FieldKind::Embedded(emb) => {
                let child = assemble(ctx, &emb.fields, path, taken)?;
                out.insert(
                    f.info.name.clone(),
                    Value::Record {
                        name: emb.record_name.clone(),
                        fields: child,
                    },
                );
            }
            FieldKind::Leaf(u) => match taken.get(path) {
                Some(raw) => {
                    out.insert(f.info.name.clone(), u.unmarshal(ctx, raw)?);
                }
                // Absent without a default stays absent.
                None => {
                    if let Some(default) = &f.info.options.default {
                        out.insert(f.info.name.clone(), default.clone());
                    }
                }
            },
        }
        path.pop();
    }
    Ok(out)
}

impl Unmarshaler for RecordUnmarshaler {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError> {
        let WireValue::Map(map) = v else {
            return Err(MarshalError::ShapeMismatch {
                expected: "map",
                got: v.kind(),
            });
        };
        let mut taken: HashMap<Vec<String>, WireValue> = HashMap::new();
        let mut unknown: Vec<(&str, &WireValue)> = Vec::new();
        for (k, val) in map {
            match self.table.get(k) {
                Some(path) => {
                    if taken.insert(path.clone(), val.clone()).is_some() {
                        return Err(MarshalError::DuplicateKey(k.clone()));
                    }
                }
                None => unknown.push((k, val)),
            }
        }
        let mut fields = assemble(ctx, &self.fields, &mut Vec::new(), &taken)?;
        if !unknown.is_empty() {
            match &self.catch_all {
                Some((name, u)) => {
                    let mut extra = Vec::with_capacity(unknown.len());
                    for (k, val) in unknown {
                        extra.push((Value::Str(k.to_string()), u.unmarshal(ctx, val)?));
                    }
                    fields.insert(name.clone(), Value::Map(extra));
                }
                None if self.ignore_unknown => {}
                None => {
                    return Err(MarshalError::UnknownField(unknown[0].0.to_string()));
                }
            }
        }
        if let Some(name) = &self.source_field {
            fields.insert(name.clone(), wire_to_value(v));
        }
        Ok(Value::Record {
            name: self.record_name.clone(),
            fields,
        })
    }
}

// ---------------------------------------------------------------------------
// Factories

#[derive(Debug, Default)]
pub struct RecordMarshalerFactory;

impl MarshalerFactory for RecordMarshalerFactory {
    fn make_marshaler(
        &self,
        ctx: &MarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<MarshalerMaker>, MarshalError> {
        let TypeDescriptor::Record(_) = ty.as_ref() else {
            return Ok(None);
        };
        let ctx = ctx.clone();
        let ty = ty.clone();
        Ok(Some(Box::new(move || {
            let TypeDescriptor::Record(rd) = ty.as_ref() else {
                return Err(MarshalError::UnhandledType(ty.clone()));
            };
            Ok(Arc::new(RecordMarshaler::build(&ctx, rd)?))
        })))
    }
}

#[derive(Debug, Default)]
pub struct RecordUnmarshalerFactory;

impl UnmarshalerFactory for RecordUnmarshalerFactory {
    fn make_unmarshaler(
        &self,
        ctx: &UnmarshalFactoryContext,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Option<UnmarshalerMaker>, MarshalError> {
        let TypeDescriptor::Record(_) = ty.as_ref() else {
            return Ok(None);
        };
        let ctx = ctx.clone();
        let ty = ty.clone();
        Ok(Some(Box::new(move || {
            let TypeDescriptor::Record(rd) = ty.as_ref() else {
                return Err(MarshalError::UnhandledType(ty.clone()));
            };
            Ok(Arc::new(RecordUnmarshaler::build(&ctx, rd)?))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::Naming;
    use crate::type_descriptor::{FieldDescriptor, RecordOptions};

    fn record_desc(
        name: &str,
        fields: Vec<FieldDescriptor>,
        options: RecordOptions,
    ) -> RecordDescriptor {
        RecordDescriptor {
            name: name.to_string(),
            fields,
            options,
        }
    }

    #[test]
    fn test_naming_applied_without_explicit_name() {
        let rd = record_desc(
            "R",
            vec![
                FieldDescriptor::new("field_one", TypeDescriptor::int()),
                FieldDescriptor::new("field_two", TypeDescriptor::int()).with_name("ft"),
            ],
            RecordOptions {
                field_naming: Some(Naming::LowCamel),
                ..Default::default()
            },
        );
        let infos = derive_field_infos(&rd);
        assert_eq!(infos[0].marshal_name.as_deref(), Some("fieldOne"));
        // Explicit names win over the convention.
        assert_eq!(infos[1].marshal_name.as_deref(), Some("ft"));
    }

    #[test]
    fn test_embed_prefix_gets_separator() {
        let child = record_desc(
            "C",
            vec![FieldDescriptor::new("x", TypeDescriptor::int())],
            RecordOptions::default(),
        );
        let rd = record_desc(
            "R",
            vec![FieldDescriptor::new("inner", TypeDescriptor::record(child)).embedded()],
            RecordOptions::default(),
        );
        let infos = derive_field_infos(&rd);
        assert_eq!(infos[0].marshal_name.as_deref(), Some("inner_"));
    }

    #[test]
    fn test_unmarshal_names_dedup() {
        let rd = record_desc(
            "R",
            vec![FieldDescriptor::new("v", TypeDescriptor::int())
                .with_name("value")
                .with_alts(["v", "value", "val"])],
            RecordOptions::default(),
        );
        let infos = derive_field_infos(&rd);
        assert_eq!(infos[0].unmarshal_names, vec!["value", "v", "val"]);
    }

    #[test]
    fn test_suppressed_directions() {
        let rd = record_desc(
            "R",
            vec![
                FieldDescriptor::new("a", TypeDescriptor::int()).no_marshal(),
                FieldDescriptor::new("b", TypeDescriptor::int()).no_unmarshal(),
            ],
            RecordOptions::default(),
        );
        let infos = derive_field_infos(&rd);
        assert_eq!(infos[0].marshal_name, None);
        assert_eq!(infos[0].unmarshal_names, vec!["a"]);
        assert_eq!(infos[1].marshal_name.as_deref(), Some("b"));
        assert!(infos[1].unmarshal_names.is_empty());
    }

    #[test]
    fn test_record_defaults_overridden_per_field() {
        let rd = record_desc(
            "R",
            vec![
                FieldDescriptor::new("a", TypeDescriptor::optional(TypeDescriptor::int())),
                FieldDescriptor::new("b", TypeDescriptor::optional(TypeDescriptor::int()))
                    .omit_if(OmitIf::Empty),
            ],
            RecordOptions {
                field_defaults: FieldOptions {
                    omit_if: OmitIf::Null,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let infos = derive_field_infos(&rd);
        assert_eq!(infos[0].options.omit_if, OmitIf::Null);
        assert_eq!(infos[1].options.omit_if, OmitIf::Empty);
    }
}
