/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! XML encoding and decoding for wireshape protocols.
//!
//! The write side ([`encode`]) is a scoped element writer. The read side
//! ([`decode`]) wraps an `xmlparser` token stream in depth-tracked scopes: a
//! [`decode::ScopedDecoder`] hands out one child scope at a time and
//! guarantees that advancing past a child never consumes tokens belonging to
//! a sibling, even when the child was only partially read.

pub mod decode;
pub mod encode;
mod escape;
mod unescape;
