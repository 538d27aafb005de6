/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::unescape::unescape;
use std::borrow::Cow;
use thiserror::Error;
use xmlparser::{ElementEnd, Token, Tokenizer};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(#[from] xmlparser::Error),
    #[error("invalid XML escape: {esc}")]
    InvalidEscape { esc: String },
    #[error("error parsing XML: {msg}")]
    Custom { msg: Cow<'static, str> },
}

impl XmlError {
    pub fn custom(msg: impl Into<Cow<'static, str>>) -> Self {
        XmlError::Custom { msg: msg.into() }
    }

    pub(crate) fn invalid_escape(esc: impl Into<String>) -> Self {
        XmlError::InvalidEscape { esc: esc.into() }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Name<'inp> {
    pub prefix: &'inp str,
    pub local: &'inp str,
}

impl<'inp> Name<'inp> {
    /// Checks this name against a tag pattern. A pattern with a `:` matches
    /// prefix and local name; without one, only the local name.
    pub fn matches(&self, tag_name: &str) -> bool {
        match tag_name.find(':') {
            Some(idx) => self.prefix == &tag_name[..idx] && self.local == &tag_name[idx + 1..],
            None => self.local == tag_name,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Attr<'inp> {
    name: Name<'inp>,
    value: Cow<'inp, str>,
}

/// A consumed element opening, with its attributes and document depth.
#[derive(Debug, PartialEq, Clone)]
pub struct StartEl<'inp> {
    name: Name<'inp>,
    attributes: Vec<Attr<'inp>>,
    depth: usize,
}

impl<'inp> StartEl<'inp> {
    pub fn local(&self) -> &str {
        self.name.local
    }

    pub fn prefix(&self) -> &str {
        self.name.prefix
    }

    pub fn matches(&self, pattern: &str) -> bool {
        self.name.matches(pattern)
    }

    /// Returns the value of the first attribute matching `key`, if any.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.matches(key))
            .map(|attr| attr.value.as_ref())
    }
}

enum XmlEvent<'inp> {
    Start(StartEl<'inp>),
    End,
    Text(&'inp str),
    Eof,
}

/// Event reader over the raw token stream. Tracks the current element depth;
/// self-closing elements produce a synthetic end event so scopes always see
/// a balanced start/end pair.
struct XmlTokens<'inp> {
    scanner: Tokenizer<'inp>,
    depth: usize,
    pending_close: bool,
}

impl<'inp> XmlTokens<'inp> {
    fn next_event(&mut self) -> Result<XmlEvent<'inp>, XmlError> {
        if self.pending_close {
            self.pending_close = false;
            self.depth = self
                .depth
                .checked_sub(1)
                .expect("self-closing element was entered");
            return Ok(XmlEvent::End);
        }
        loop {
            match self.scanner.next() {
                None => return Ok(XmlEvent::Eof),
                Some(Err(err)) => return Err(err.into()),
                Some(Ok(Token::ElementStart { prefix, local, .. })) => {
                    let name = Name {
                        prefix: prefix.as_str(),
                        local: local.as_str(),
                    };
                    let mut attributes = Vec::new();
                    let self_closing = loop {
                        match self.scanner.next() {
                            Some(Ok(Token::Attribute {
                                prefix,
                                local,
                                value,
                                ..
                            })) => attributes.push(Attr {
                                name: Name {
                                    prefix: prefix.as_str(),
                                    local: local.as_str(),
                                },
                                value: unescape(value.as_str())?,
                            }),
                            Some(Ok(Token::ElementEnd {
                                end: ElementEnd::Open,
                                ..
                            })) => break false,
                            Some(Ok(Token::ElementEnd {
                                end: ElementEnd::Empty,
                                ..
                            })) => break true,
                            Some(Err(err)) => return Err(err.into()),
                            None => {
                                return Err(XmlError::custom(
                                    "unexpected end of document inside element tag",
                                ))
                            }
                            Some(Ok(_)) => {
                                return Err(XmlError::custom("unexpected token in element tag"))
                            }
                        }
                    };
                    self.depth += 1;
                    self.pending_close = self_closing;
                    return Ok(XmlEvent::Start(StartEl {
                        name,
                        attributes,
                        depth: self.depth,
                    }));
                }
                Some(Ok(Token::ElementEnd {
                    end: ElementEnd::Close(..),
                    ..
                })) => {
                    self.depth = self
                        .depth
                        .checked_sub(1)
                        .ok_or_else(|| XmlError::custom("unbalanced closing tag"))?;
                    return Ok(XmlEvent::End);
                }
                Some(Ok(Token::Text { text })) => return Ok(XmlEvent::Text(text.as_str())),
                Some(Ok(Token::Cdata { text, .. })) => return Ok(XmlEvent::Text(text.as_str())),
                // declarations, comments, processing instructions
                Some(Ok(_)) => continue,
            }
        }
    }
}

/// An XML document ready for decoding.
pub struct Document<'inp> {
    tokens: XmlTokens<'inp>,
}

impl<'inp> Document<'inp> {
    pub fn new(doc: &'inp str) -> Self {
        Document {
            tokens: XmlTokens {
                scanner: Tokenizer::from(doc),
                depth: 0,
                pending_close: false,
            },
        }
    }

    /// Returns a decoder scoped to the document's root element.
    pub fn root(&mut self) -> Result<ScopedDecoder<'inp, '_>, XmlError> {
        loop {
            match self.tokens.next_event()? {
                XmlEvent::Start(start) => {
                    return Ok(ScopedDecoder {
                        tokens: &mut self.tokens,
                        start,
                        terminated: false,
                    })
                }
                XmlEvent::Eof => return Err(XmlError::custom("no root element in document")),
                _ => {}
            }
        }
    }
}

/// A decoder bound to a single element.
///
/// `next_tag` yields one direct child scope at a time. Before looking for
/// the next child it skips whatever remains of the previous one, so a caller
/// that only partially reads a child can never consume a sibling's tokens.
/// Once `next_tag` returns `None` the element's closing tag has been
/// consumed and the parent scope is positioned at the next sibling.
pub struct ScopedDecoder<'inp, 'a> {
    tokens: &'a mut XmlTokens<'inp>,
    start: StartEl<'inp>,
    terminated: bool,
}

impl<'inp, 'a> ScopedDecoder<'inp, 'a> {
    pub fn start_el(&self) -> &StartEl<'inp> {
        &self.start
    }

    pub fn next_tag(&mut self) -> Result<Option<ScopedDecoder<'inp, '_>>, XmlError> {
        if self.terminated {
            return Ok(None);
        }
        let my_depth = self.start.depth;
        loop {
            match self.tokens.next_event()? {
                XmlEvent::Eof => {
                    self.terminated = true;
                    return Ok(None);
                }
                XmlEvent::Start(start) => {
                    if start.depth == my_depth + 1 {
                        return Ok(Some(ScopedDecoder {
                            tokens: &mut *self.tokens,
                            start,
                            terminated: false,
                        }));
                    }
                    // leftover content of a partially-read previous child
                }
                XmlEvent::End => {
                    if self.tokens.depth < my_depth {
                        self.terminated = true;
                        return Ok(None);
                    }
                }
                XmlEvent::Text(_) => {}
            }
        }
    }

    /// Reads the text content of this element and consumes it through its
    /// closing tag. Nested elements encountered along the way are skipped.
    pub fn try_data(&mut self) -> Result<Cow<'inp, str>, XmlError> {
        if self.terminated {
            return Ok(Cow::Borrowed(""));
        }
        let my_depth = self.start.depth;
        let mut result = Cow::Borrowed("");
        loop {
            match self.tokens.next_event()? {
                XmlEvent::Eof => return Err(XmlError::custom("unexpected end of document")),
                XmlEvent::Text(text) => {
                    if self.tokens.depth == my_depth && result.is_empty() {
                        result = unescape(text)?;
                    }
                }
                XmlEvent::Start(_) => {}
                XmlEvent::End => {
                    if self.tokens.depth < my_depth {
                        self.terminated = true;
                        return Ok(result);
                    }
                }
            }
        }
    }
}
