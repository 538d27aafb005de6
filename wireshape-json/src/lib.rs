/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! JSON encoding and decoding for wireshape protocols.
//!
//! The write side is a pair of scoped writers ([`serialize::JsonObjectWriter`],
//! [`serialize::JsonArrayWriter`]) appending to a `String`. The read side is a
//! zero-copy token iterator ([`deserialize::json_token_iter`]) over the raw
//! body bytes; unmarshallers drive it with the `expect_*` helpers and skip
//! unknown subtrees with [`deserialize::skip_value`].

pub mod deserialize;
mod escape;
pub mod serialize;

pub use crate::escape::{escape_string, unescape_string, EscapeError};
