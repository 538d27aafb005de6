/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The runtime object graph interpreted by the structural walkers.
//!
//! Request and result objects are `Structure` values whose fields conform to
//! a [`Shape`](crate::shape::Shape). A `Structure` is immutable once built;
//! callers assemble one through [`StructureBuilder`] and hand it to a
//! marshaller, which consumes it without mutating it.

use crate::instant::Instant;
use crate::{Blob, Number};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(Number),
    String(String),
    Blob(Blob),
    Instant(Instant),
    List(Vec<Value>),
    Structure(Structure),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(Number::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(Number::Float(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Blob(v)
    }
}

impl From<Instant> for Value {
    fn from(v: Instant) -> Self {
        Value::Instant(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Structure> for Value {
    fn from(v: Structure) -> Self {
        Value::Structure(v)
    }
}

/// An immutable set of named fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure {
    fields: HashMap<String, Value>,
}

impl Structure {
    pub fn builder() -> StructureBuilder {
        StructureBuilder {
            fields: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Number(n)) => n.to_i64(),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Number(n)) => Some(n.to_f64()),
            _ => None,
        }
    }

    pub fn get_blob(&self, name: &str) -> Option<&Blob> {
        match self.get(name) {
            Some(Value::Blob(b)) => Some(b),
            _ => None,
        }
    }

    pub fn get_instant(&self, name: &str) -> Option<Instant> {
        match self.get(name) {
            Some(Value::Instant(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        match self.get(name) {
            Some(Value::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn get_structure(&self, name: &str) -> Option<&Structure> {
        match self.get(name) {
            Some(Value::Structure(s)) => Some(s),
            _ => None,
        }
    }

    /// Reopens the structure for additional fields, e.g. to merge
    /// header-located members into a body-decoded result.
    pub fn into_builder(self) -> StructureBuilder {
        StructureBuilder {
            fields: self.fields,
        }
    }
}

/// Assembles a [`Structure`]. Unset fields are simply absent; there is no
/// null placeholder.
#[derive(Debug)]
pub struct StructureBuilder {
    fields: HashMap<String, Value>,
}

impl StructureBuilder {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets the field only when `value` is present. Convenience for callers
    /// assembling requests from optional data.
    pub fn optional_field<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    pub fn build(self) -> Structure {
        Structure {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder_and_accessors() {
        let value = Structure::builder()
            .field("name", "interconnect-1")
            .field("count", 3i64)
            .field("enabled", true)
            .optional_field("missing", None::<i64>)
            .build();
        assert_eq!(value.get_str("name"), Some("interconnect-1"));
        assert_eq!(value.get_i64("count"), Some(3));
        assert_eq!(value.get_bool("enabled"), Some(true));
        assert_eq!(value.get("missing"), None);
        assert_eq!(value.len(), 3);
    }

    #[test]
    fn nested_structures() {
        let inner = Structure::builder().field("leaf", "x").build();
        let value = Structure::builder()
            .field("nested", inner.clone())
            .field("items", vec![Value::from(1i64), Value::from(2i64)])
            .build();
        assert_eq!(value.get_structure("nested"), Some(&inner));
        assert_eq!(value.get_list("items").map(|l| l.len()), Some(2));
    }
}
