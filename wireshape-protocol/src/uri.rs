/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside the unreserved set is escaped, including `/`, so a
/// member value can never introduce extra path segments.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(crate) fn percent_encode_path(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TemplateError {
    UnresolvedPlaceholder(String),
    UnterminatedPlaceholder,
}

/// Expands `{name}` placeholders in a URI template. `lookup` returns the
/// already-encoded substitution text, or `None` when the placeholder has no
/// matching member.
pub(crate) fn expand_template(
    template: &str,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        rest = &rest[open + 1..];
        let close = rest
            .find('}')
            .ok_or(TemplateError::UnterminatedPlaceholder)?;
        let name = &rest[..close];
        match lookup(name) {
            Some(encoded) => out.push_str(&encoded),
            None => return Err(TemplateError::UnresolvedPlaceholder(name.to_string())),
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{expand_template, percent_encode_path, TemplateError};

    #[test]
    fn no_placeholders() {
        assert_eq!(expand_template("/", |_| None), Ok("/".to_string()));
    }

    #[test]
    fn substitutes_in_order() {
        let expanded = expand_template(
            "/restapis/{restApiId}/resources/{resourceId}/methods/{httpMethod}/integration",
            |name| {
                Some(match name {
                    "restApiId" => "r1".to_string(),
                    "resourceId" => "res1".to_string(),
                    "httpMethod" => "GET".to_string(),
                    _ => return None,
                })
            },
        );
        assert_eq!(
            expanded,
            Ok("/restapis/r1/resources/res1/methods/GET/integration".to_string())
        );
    }

    #[test]
    fn unresolved_placeholder() {
        assert_eq!(
            expand_template("/widgets/{id}", |_| None),
            Err(TemplateError::UnresolvedPlaceholder("id".to_string()))
        );
    }

    #[test]
    fn unterminated_placeholder() {
        assert_eq!(
            expand_template("/widgets/{id", |_| Some(String::new())),
            Err(TemplateError::UnterminatedPlaceholder)
        );
    }

    #[test]
    fn path_encoding_escapes_reserved_characters() {
        assert_eq!(percent_encode_path("a/b:c"), "a%2Fb%3Ac");
        assert_eq!(percent_encode_path("safe-chars_1.0~"), "safe-chars_1.0~");
    }
}
