// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Fluent builder API for record descriptors.

use crate::naming::Naming;
use crate::type_descriptor::{
    FieldDescriptor, FieldOptions, RecordDescriptor, RecordOptions, TypeDescriptor,
};
use std::sync::Arc;

/// Builder for record type descriptors.
#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    options: RecordOptions,
}

impl RecordBuilder {
    /// Create a new builder for a record type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            options: RecordOptions::default(),
        }
    }

    /// Add a field with a type descriptor.
    pub fn field(mut self, name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    /// Add a fully configured field descriptor.
    pub fn push(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Add an optional field.
    pub fn optional_field(mut self, name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, TypeDescriptor::optional(ty)));
        self
    }

    /// Add an int field.
    pub fn int_field(self, name: impl Into<String>) -> Self {
        self.field(name, TypeDescriptor::int())
    }

    /// Add a string field.
    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, TypeDescriptor::string())
    }

    /// Add a bool field.
    pub fn bool_field(self, name: impl Into<String>) -> Self {
        self.field(name, TypeDescriptor::bool())
    }

    /// Add an embedded record field.
    pub fn embedded_field(mut self, name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty).embedded());
        self
    }

    /// Set the naming convention for fields without an explicit wire name.
    pub fn naming(mut self, naming: Naming) -> Self {
        self.options.field_naming = Some(naming);
        self
    }

    /// Silently drop unknown input keys on decode.
    pub fn ignore_unknown(mut self) -> Self {
        self.options.ignore_unknown = true;
        self
    }

    /// Route unknown input keys into a declared mapping-typed field.
    pub fn unknown_field(mut self, name: impl Into<String>) -> Self {
        self.options.unknown_field = Some(name.into());
        self
    }

    /// Capture the whole raw input map into a declared field on decode.
    pub fn source_field(mut self, name: impl Into<String>) -> Self {
        self.options.source_field = Some(name.into());
        self
    }

    /// Set record-level field option defaults.
    pub fn field_defaults(mut self, defaults: FieldOptions) -> Self {
        self.options.field_defaults = defaults;
        self
    }

    /// Build the record type descriptor.
    pub fn build(self) -> Arc<TypeDescriptor> {
        TypeDescriptor::record(RecordDescriptor {
            name: self.name,
            fields: self.fields,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_record_descriptor() {
        let ty = RecordBuilder::new("Point")
            .int_field("x")
            .int_field("y")
            .optional_field("label", TypeDescriptor::string())
            .naming(Naming::LowCamel)
            .build();
        let rd = ty.as_record().expect("record");
        assert_eq!(rd.name, "Point");
        assert_eq!(rd.fields.len(), 3);
        assert_eq!(rd.options.field_naming, Some(Naming::LowCamel));
    }
}
