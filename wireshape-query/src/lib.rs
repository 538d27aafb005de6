/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Form-encoded body writer for `Action`/`Version` style query protocols.
//!
//! A query body is a flat list of `key=value` pairs. Structure comes from
//! the keys: nested members are written as `Outer.Inner`, list elements as
//! `Name.N` with 1-based indices. The writer hands out scopes so callers
//! drive it exactly like the JSON object/array writers.
//!
//! ```
//! use wireshape_query::QueryWriter;
//!
//! let mut out = String::new();
//! let mut writer = QueryWriter::new(&mut out, "DeleteCertificate", "2015-12-08");
//! writer.value("CertificateArn", "arn:aws:acm:us-east-1:123:certificate/abc");
//! writer.finish();
//! assert!(out.starts_with("Action=DeleteCertificate&Version=2015-12-08"));
//! ```

use wireshape_types::instant::Format;
use wireshape_types::{primitive, Instant, Number};

/// Top-level writer: emits `Action` and `Version`, then delegates to
/// [`QueryValueWriter`] scopes for the operation's members.
pub struct QueryWriter<'a> {
    output: &'a mut String,
}

impl<'a> QueryWriter<'a> {
    pub fn new(output: &'a mut String, action: &str, version: &str) -> Self {
        output.push_str("Action=");
        output.push_str(&urlencoding::encode(action));
        output.push_str("&Version=");
        output.push_str(&urlencoding::encode(version));
        QueryWriter { output }
    }

    pub fn prefix(&mut self, prefix: &str) -> QueryValueWriter<'_> {
        QueryValueWriter {
            output: &mut *self.output,
            prefix: prefix.to_string(),
        }
    }

    /// Shorthand for writing a string-valued member at the top level.
    pub fn value(&mut self, key: &str, value: &str) {
        self.prefix(key).string(value);
    }

    pub fn finish(self) {
        // The output is complete after the last pair; nothing to close.
    }
}

/// Writes the value for one key prefix. Consumed by whichever `string`/
/// `boolean`/... call matches the member's kind, or forked into child
/// prefixes for nested structures and lists.
pub struct QueryValueWriter<'a> {
    output: &'a mut String,
    prefix: String,
}

impl<'a> QueryValueWriter<'a> {
    fn pair(&mut self, value: &str) {
        self.output.push('&');
        self.output.push_str(&urlencoding::encode(&self.prefix));
        self.output.push('=');
        self.output.push_str(&urlencoding::encode(value));
    }

    pub fn string(mut self, value: &str) {
        self.pair(value);
    }

    pub fn boolean(mut self, value: bool) {
        self.pair(primitive::fmt_boolean(value));
    }

    pub fn number(mut self, value: Number) {
        match value {
            Number::PosInt(v) => self.pair(&v.to_string()),
            Number::NegInt(v) => self.pair(&primitive::fmt_integer(v)),
            Number::Float(v) => self.pair(&primitive::fmt_float(v)),
        }
    }

    /// Timestamps in query strings are ISO-8601 unless the member declares
    /// otherwise.
    pub fn instant(mut self, value: &Instant, format: Format) {
        self.pair(&value.fmt(format));
    }

    pub fn blob_base64(mut self, encoded: &str) {
        self.pair(encoded);
    }

    /// Starts a nested structure scope: members are written as
    /// `<prefix>.<member>`.
    pub fn structure(self) -> QueryStructureWriter<'a> {
        QueryStructureWriter {
            output: self.output,
            prefix: self.prefix,
        }
    }

    /// Starts a list scope: elements are written as `<prefix>.N`.
    pub fn list(self) -> QueryListWriter<'a> {
        QueryListWriter {
            output: self.output,
            prefix: self.prefix,
            next_index: 1,
        }
    }
}

pub struct QueryStructureWriter<'a> {
    output: &'a mut String,
    prefix: String,
}

impl<'a> QueryStructureWriter<'a> {
    pub fn field(&mut self, name: &str) -> QueryValueWriter<'_> {
        QueryValueWriter {
            output: &mut *self.output,
            prefix: format!("{}.{}", self.prefix, name),
        }
    }

    pub fn finish(self) {}
}

pub struct QueryListWriter<'a> {
    output: &'a mut String,
    prefix: String,
    next_index: usize,
}

impl<'a> QueryListWriter<'a> {
    pub fn entry(&mut self) -> QueryValueWriter<'_> {
        let prefix = format!("{}.{}", self.prefix, self.next_index);
        self.next_index += 1;
        QueryValueWriter {
            output: &mut *self.output,
            prefix,
        }
    }

    pub fn finish(self) {}
}
