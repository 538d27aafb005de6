/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Tokenizes a JSON byte stream without copying string data.
//!
//! [`json_token_iter`] yields one [`Token`] per structural element or scalar
//! value. String values are returned as [`EscapedStr`] borrows into the
//! input; unescaping only happens when the caller asks for it.

pub mod error;
pub mod token;

pub use crate::deserialize::error::{Error, ErrorReason};
pub use crate::deserialize::token::{
    expect_bool_or_null, expect_number_or_null, expect_start_array, expect_start_object,
    expect_string_or_null, skip_value, EscapedStr, Offset, Token,
};

use wireshape_types::Number;

/// Creates a token iterator over the given input bytes. The iterator yields
/// `Err` once for unparseable input and then fuses to `None`.
pub fn json_token_iter(input: &[u8]) -> JsonTokenIterator<'_> {
    JsonTokenIterator {
        input,
        index: 0,
        state_stack: vec![State::Initial],
        done: false,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    Initial,
    ArrayFirstValueOrEnd,
    ArrayNextValueOrEnd,
    ObjectFirstKeyOrEnd,
    ObjectNextKeyOrEnd,
    ObjectFieldValue,
}

pub struct JsonTokenIterator<'a> {
    input: &'a [u8],
    index: usize,
    state_stack: Vec<State>,
    done: bool,
}

impl<'a> JsonTokenIterator<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.index).copied()
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn discard_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                _ => break,
            }
        }
    }

    fn error_at(&self, reason: ErrorReason) -> Error {
        Error::new(reason, Some(self.index))
    }

    fn replace_top(&mut self, state: State) {
        let top = self
            .state_stack
            .last_mut()
            .expect("state stack is never empty");
        *top = state;
    }

    fn pop_container(&mut self) {
        debug_assert!(self.state_stack.len() > 1);
        self.state_stack.pop();
    }

    fn expect_literal(&mut self, literal: &'static [u8]) -> Result<(), Error> {
        if self.input[self.index..].starts_with(literal) {
            self.index += literal.len();
            Ok(())
        } else {
            Err(self.error_at(ErrorReason::ExpectedLiteral(
                String::from_utf8_lossy(literal).into(),
            )))
        }
    }

    /// Reads a string, assuming the head of the input is the opening quote.
    /// The returned [`EscapedStr`] borrows the text between the quotes.
    fn read_string(&mut self) -> Result<EscapedStr<'a>, Error> {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.advance();
        let start = self.index;
        loop {
            match self.peek() {
                None => return Err(self.error_at(ErrorReason::UnexpectedEos)),
                Some(b'"') => {
                    let value = std::str::from_utf8(&self.input[start..self.index])
                        .map_err(|err| Error::new(err.into(), Some(start)))?;
                    self.advance();
                    return Ok(EscapedStr::new(value));
                }
                Some(b'\\') => {
                    // The escaped character is validated during unescaping
                    self.advance();
                    self.advance();
                }
                Some(byte) if byte < 0x20 => {
                    return Err(self.error_at(ErrorReason::UnexpectedControlCharacter(byte)))
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn read_number(&mut self) -> Result<Number, Error> {
        let start = self.index;
        while let Some(byte) = self.peek() {
            match byte {
                b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E' => self.advance(),
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.input[start..self.index])
            .expect("number candidates are always ascii");
        let invalid = || Error::new(ErrorReason::InvalidNumber, Some(start));
        if text.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
            text.parse::<f64>().map(Number::Float).map_err(|_| invalid())
        } else if text.starts_with('-') {
            text.parse::<i64>().map(Number::NegInt).map_err(|_| invalid())
        } else {
            text.parse::<u64>().map(Number::PosInt).map_err(|_| invalid())
        }
    }

    /// Reads one value, pushing a container state for `{`/`[`. For scalar
    /// values and container starts alike, the top of the state stack is
    /// first replaced with `replace_with` so the enclosing container knows a
    /// value has been read.
    fn read_value(&mut self, replace_with: Option<State>) -> Result<Token<'a>, Error> {
        let offset = Offset(self.index);
        let byte = match self.peek() {
            Some(byte) => byte,
            None => return Err(self.error_at(ErrorReason::UnexpectedEos)),
        };
        if let Some(state) = replace_with {
            self.replace_top(state);
        }
        match byte {
            b'{' => {
                self.advance();
                self.state_stack.push(State::ObjectFirstKeyOrEnd);
                Ok(Token::StartObject { offset })
            }
            b'[' => {
                self.advance();
                self.state_stack.push(State::ArrayFirstValueOrEnd);
                Ok(Token::StartArray { offset })
            }
            b'"' => {
                let value = self.read_string()?;
                Ok(Token::ValueString { offset, value })
            }
            b't' => {
                self.expect_literal(b"true")?;
                Ok(Token::ValueBool {
                    offset,
                    value: true,
                })
            }
            b'f' => {
                self.expect_literal(b"false")?;
                Ok(Token::ValueBool {
                    offset,
                    value: false,
                })
            }
            b'n' => {
                self.expect_literal(b"null")?;
                Ok(Token::ValueNull { offset })
            }
            b'0'..=b'9' | b'-' => {
                let value = self.read_number()?;
                Ok(Token::ValueNumber { offset, value })
            }
            byte => Err(Error::new(
                ErrorReason::UnexpectedToken(
                    byte as char,
                    "'{', '[', '\"', number, boolean, or null",
                ),
                Some(offset.0),
            )),
        }
    }

    /// Reads an object key, assuming the head of the input is the opening
    /// quote, and consumes the `:` separator.
    fn read_object_key(&mut self) -> Result<Token<'a>, Error> {
        let offset = Offset(self.index);
        let key = self.read_string()?;
        self.discard_whitespace();
        match self.peek() {
            Some(b':') => {
                self.advance();
                self.replace_top(State::ObjectFieldValue);
                Ok(Token::ObjectKey { offset, key })
            }
            Some(byte) => Err(self.error_at(ErrorReason::UnexpectedToken(byte as char, "':'"))),
            None => Err(self.error_at(ErrorReason::UnexpectedEos)),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, Error> {
        self.discard_whitespace();
        let state = *self
            .state_stack
            .last()
            .expect("state stack is never empty");
        match state {
            State::Initial => match self.peek() {
                None => Ok(None),
                Some(_) => self.read_value(None).map(Some),
            },
            State::ObjectFirstKeyOrEnd => match self.peek() {
                None => Err(self.error_at(ErrorReason::UnexpectedEos)),
                Some(b'}') => {
                    let offset = Offset(self.index);
                    self.advance();
                    self.pop_container();
                    Ok(Some(Token::EndObject { offset }))
                }
                Some(b'"') => self.read_object_key().map(Some),
                Some(byte) => {
                    Err(self.error_at(ErrorReason::UnexpectedToken(byte as char, "'}', '\"'")))
                }
            },
            State::ObjectNextKeyOrEnd => match self.peek() {
                None => Err(self.error_at(ErrorReason::UnexpectedEos)),
                Some(b'}') => {
                    let offset = Offset(self.index);
                    self.advance();
                    self.pop_container();
                    Ok(Some(Token::EndObject { offset }))
                }
                Some(b',') => {
                    self.advance();
                    self.discard_whitespace();
                    match self.peek() {
                        Some(b'"') => self.read_object_key().map(Some),
                        Some(byte) => Err(
                            self.error_at(ErrorReason::UnexpectedToken(byte as char, "'\"'"))
                        ),
                        None => Err(self.error_at(ErrorReason::UnexpectedEos)),
                    }
                }
                Some(byte) => {
                    Err(self.error_at(ErrorReason::UnexpectedToken(byte as char, "'}', ','")))
                }
            },
            State::ObjectFieldValue => self
                .read_value(Some(State::ObjectNextKeyOrEnd))
                .map(Some),
            State::ArrayFirstValueOrEnd => match self.peek() {
                None => Err(self.error_at(ErrorReason::UnexpectedEos)),
                Some(b']') => {
                    let offset = Offset(self.index);
                    self.advance();
                    self.pop_container();
                    Ok(Some(Token::EndArray { offset }))
                }
                Some(_) => self
                    .read_value(Some(State::ArrayNextValueOrEnd))
                    .map(Some),
            },
            State::ArrayNextValueOrEnd => match self.peek() {
                None => Err(self.error_at(ErrorReason::UnexpectedEos)),
                Some(b']') => {
                    let offset = Offset(self.index);
                    self.advance();
                    self.pop_container();
                    Ok(Some(Token::EndArray { offset }))
                }
                Some(b',') => {
                    self.advance();
                    self.discard_whitespace();
                    self.read_value(Some(State::ArrayNextValueOrEnd)).map(Some)
                }
                Some(byte) => {
                    Err(self.error_at(ErrorReason::UnexpectedToken(byte as char, "']', ','")))
                }
            },
        }
    }
}

impl<'a> Iterator for JsonTokenIterator<'a> {
    type Item = Result<Token<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
