/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::decode::XmlError;
use std::borrow::Cow;

/// Resolves entity references: the five named XML entities plus decimal
/// (`&#65;`) and hexadecimal (`&#x41;`) character references.
pub fn unescape(value: &str) -> Result<Cow<'_, str>, XmlError> {
    if !value.contains('&') {
        return Ok(Cow::Borrowed(value));
    }
    let mut unescaped = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        unescaped.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semicolon = rest
            .find(';')
            .ok_or_else(|| XmlError::invalid_escape(rest))?;
        let entity = &rest[1..semicolon];
        match entity {
            "lt" => unescaped.push('<'),
            "gt" => unescaped.push('>'),
            "amp" => unescaped.push('&'),
            "quot" => unescaped.push('"'),
            "apos" => unescaped.push('\''),
            entity => {
                let codepoint = if let Some(hex) = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                {
                    u32::from_str_radix(hex, 16)
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse()
                } else {
                    return Err(XmlError::invalid_escape(&rest[..=semicolon]));
                };
                let chr = codepoint
                    .ok()
                    .and_then(std::char::from_u32)
                    .ok_or_else(|| XmlError::invalid_escape(&rest[..=semicolon]))?;
                unescaped.push(chr);
            }
        }
        rest = &rest[semicolon + 1..];
    }
    unescaped.push_str(rest);
    Ok(Cow::Owned(unescaped))
}
