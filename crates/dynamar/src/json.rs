// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! JSON bridge for the wire-value model.
//!
//! Wire bytes have no JSON representation, so they cross as base64 strings.
//! Non-finite floats have no JSON representation at all and are errors in
//! both directions.

use crate::errors::MarshalError;
use crate::wire::{WireMap, WireValue};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Number, Value as JsonValue};

/// Render a wire value as JSON.
pub fn wire_to_json(v: &WireValue) -> Result<JsonValue, MarshalError> {
    Ok(match v {
        WireValue::Null => JsonValue::Null,
        WireValue::Bool(b) => JsonValue::Bool(*b),
        WireValue::Int(i) => JsonValue::Number((*i).into()),
        WireValue::Float(f) => JsonValue::Number(Number::from_f64(*f).ok_or_else(|| {
            MarshalError::InvalidValue(format!("non-finite float {} has no JSON form", f))
        })?),
        WireValue::Str(s) => JsonValue::String(s.clone()),
        WireValue::Bytes(b) => JsonValue::String(BASE64.encode(b)),
        WireValue::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(wire_to_json(item)?);
            }
            JsonValue::Array(out)
        }
        WireValue::Map(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, val) in map {
                out.insert(k.clone(), wire_to_json(val)?);
            }
            JsonValue::Object(out)
        }
    })
}

/// Parse JSON into a wire value. Integral numbers in `i64` range decode as
/// ints, everything else as floats.
pub fn json_to_wire(v: &JsonValue) -> Result<WireValue, MarshalError> {
    Ok(match v {
        JsonValue::Null => WireValue::Null,
        JsonValue::Bool(b) => WireValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => WireValue::Int(i),
            None => WireValue::Float(n.as_f64().ok_or_else(|| {
                MarshalError::InvalidValue(format!("JSON number {} out of range", n))
            })?),
        },
        JsonValue::String(s) => WireValue::Str(s.clone()),
        JsonValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(json_to_wire(item)?);
            }
            WireValue::List(out)
        }
        JsonValue::Object(map) => {
            let mut out = WireMap::with_capacity(map.len());
            for (k, val) in map {
                out.insert(k.clone(), json_to_wire(val)?);
            }
            WireValue::Map(out)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let wire = WireValue::map([
            ("n", WireValue::Int(42)),
            ("f", WireValue::Float(1.5)),
            ("s", WireValue::Str("hi".into())),
            ("l", WireValue::List(vec![WireValue::Null, WireValue::Bool(true)])),
        ]);
        let json = wire_to_json(&wire).unwrap();
        assert_eq!(json_to_wire(&json).unwrap(), wire);
    }

    #[test]
    fn test_bytes_cross_as_base64() {
        let json = wire_to_json(&WireValue::Bytes(vec![1, 2, 3])).unwrap();
        assert_eq!(json, JsonValue::String("AQID".to_string()));
        // Without type guidance the string stays a string.
        assert_eq!(
            json_to_wire(&json).unwrap(),
            WireValue::Str("AQID".to_string())
        );
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(wire_to_json(&WireValue::Float(f64::NAN)).is_err());
        assert!(wire_to_json(&WireValue::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_integral_numbers_decode_as_int() {
        let json: JsonValue = serde_json::from_str("[1, 1.0, 9.25]").unwrap();
        assert_eq!(
            json_to_wire(&json).unwrap(),
            WireValue::List(vec![
                WireValue::Int(1),
                WireValue::Float(1.0),
                WireValue::Float(9.25),
            ])
        );
    }
}
