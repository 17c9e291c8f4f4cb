// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! Field-name translation conventions.

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

/// A field naming convention applied to source identifiers that have no
/// explicit wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Naming {
    Snake,
    Camel,
    LowCamel,
    Kebab,
}

/// Translate a source identifier under a naming convention.
pub fn translate_name(name: &str, naming: Naming) -> String {
    match naming {
        Naming::Snake => name.to_snake_case(),
        Naming::Camel => name.to_upper_camel_case(),
        Naming::LowCamel => name.to_lower_camel_case(),
        Naming::Kebab => name.to_kebab_case(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        assert_eq!(translate_name("field_name", Naming::LowCamel), "fieldName");
        assert_eq!(translate_name("field_name", Naming::Camel), "FieldName");
        assert_eq!(translate_name("fieldName", Naming::Snake), "field_name");
        assert_eq!(translate_name("field_name", Naming::Kebab), "field-name");
    }
}
