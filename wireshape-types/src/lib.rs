/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Core types shared by every wireshape protocol crate: the `Instant`
//! timestamp with its three wire formats, `Blob`, JSON-semantics `Number`,
//! the runtime `Value` graph, and the `Shape` schema that drives the
//! structural walkers.

pub mod base64;
pub mod instant;
pub mod primitive;
pub mod shape;
pub mod value;

pub use crate::instant::Instant;
pub use crate::value::{Structure, StructureBuilder, Value};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Blob {
    inner: Vec<u8>,
}

impl Blob {
    pub fn new<T: Into<Vec<u8>>>(inp: T) -> Self {
        Blob { inner: inp.into() }
    }

    /// Encodes the contents as base64 for embedding in a wire body.
    pub fn to_base64(&self) -> String {
        crate::base64::encode(&self.inner)
    }

    /// Decodes base64 wire text into a `Blob`.
    pub fn from_base64(encoded: &str) -> Result<Self, crate::base64::DecodeError> {
        crate::base64::decode(encoded).map(Blob::new)
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

/// A number type that implements Javascript / JSON semantics, modeled on serde_json:
/// https://docs.serde.rs/src/serde_json/number.rs.html#20-22
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    PosInt(u64),
    NegInt(i64),
    Float(f64),
}

impl Number {
    /// Lossy conversion for float-typed members.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::PosInt(v) => v as f64,
            Number::NegInt(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// Conversion for integer-typed members. Floats and out-of-range
    /// magnitudes are rejected rather than truncated.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Number::PosInt(v) => {
                if v <= i64::MAX as u64 {
                    Some(v as i64)
                } else {
                    None
                }
            }
            Number::NegInt(v) => Some(v),
            Number::Float(_) => None,
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        if value < 0 {
            Number::NegInt(value)
        } else {
            Number::PosInt(value as u64)
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}
