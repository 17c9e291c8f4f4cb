// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynamar contributors

//! The converter contract.
//!
//! A built converter handles exactly one type: by the time one exists it is
//! assumed applicable, so converters never signal "unhandled type" — they
//! signal shape mismatches or domain errors.

use crate::context::{MarshalContext, UnmarshalContext};
use crate::errors::MarshalError;
use crate::value::Value;
use crate::wire::WireValue;

/// Converts one native value to one wire value.
pub trait Marshaler: Send + Sync {
    fn marshal(&self, ctx: &MarshalContext, v: &Value) -> Result<WireValue, MarshalError>;
}

/// Converts one wire value to one native value.
pub trait Unmarshaler: Send + Sync {
    fn unmarshal(&self, ctx: &UnmarshalContext, v: &WireValue) -> Result<Value, MarshalError>;
}
