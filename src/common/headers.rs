/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{
    iter::{Enumerate, Peekable},
    slice::Iter,
};

use serde::Serialize;

#[derive(Clone, Copy)]
enum State {
    Name { start: usize },
    Value { start: usize, colon: usize },
}

/// Splits a raw header block into `(name, value)` byte slices. Values keep
/// their folding whitespace and line endings. Iteration stops at the first
/// empty line.
pub(crate) struct HeaderIterator<'x> {
    message: &'x [u8],
    iter: Peekable<Enumerate<Iter<'x, u8>>>,
    state: State,
}

impl<'x> HeaderIterator<'x> {
    pub fn new(message: &'x [u8]) -> Self {
        HeaderIterator {
            message,
            iter: message.iter().enumerate().peekable(),
            state: State::Name { start: 0 },
        }
    }
}

impl<'x> Iterator for HeaderIterator<'x> {
    type Item = (&'x [u8], &'x [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let mut last_ch = 0;
        while let Some((pos, &ch)) = self.iter.next() {
            if ch == b':' {
                if let State::Name { start } = &self.state {
                    self.state = State::Value {
                        start: *start,
                        colon: pos,
                    };
                }
            } else if ch == b'\n' {
                match self.state {
                    State::Value { start, colon } => {
                        if self
                            .iter
                            .peek()
                            .map_or(true, |(_, next_byte)| ![b' ', b'\t'].contains(next_byte))
                        {
                            let header_name = self.message.get(start..colon).unwrap_or_default();
                            let header_value =
                                self.message.get(colon + 1..pos + 1).unwrap_or_default();
                            self.state = State::Name { start: pos + 1 };
                            return Some((header_name, header_value));
                        }
                    }
                    State::Name { start } => {
                        if (last_ch == b'\r' && start + 1 == pos) || start == pos {
                            // End of headers
                            return None;
                        } else if self
                            .iter
                            .peek()
                            .map_or(true, |(_, next_byte)| ![b' ', b'\t'].contains(next_byte))
                        {
                            // Invalid header, return anyway.
                            let header_name = self.message.get(start..pos + 1).unwrap_or_default();
                            self.state = State::Name { start: pos + 1 };
                            return Some((header_name, b""));
                        }
                    }
                }
            }

            last_ch = ch;
        }

        // Last header is not terminated by a line break
        if let State::Value { start, colon } = self.state {
            self.state = State::Name {
                start: self.message.len(),
            };
            return Some((
                self.message.get(start..colon).unwrap_or_default(),
                self.message.get(colon + 1..).unwrap_or_default(),
            ));
        }

        None
    }
}

/// A single header field with its value unfolded into one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

/// Ordered, duplicate-preserving collection of the header fields of a
/// message. Lookups by name are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderSet {
    fields: Vec<HeaderField>,
}

impl HeaderSet {
    /// Parses a raw header block. Lines that do not form a valid header
    /// field are skipped, so input that cannot be parsed at all yields an
    /// empty set.
    pub fn parse(raw: impl AsRef<[u8]>) -> Self {
        let raw = raw.as_ref();
        let raw = raw
            .iter()
            .position(|ch| !ch.is_ascii_whitespace())
            .and_then(|start| raw.get(start..))
            .unwrap_or_default();

        HeaderSet {
            fields: HeaderIterator::new(raw)
                .filter_map(|(name, value)| {
                    // Lines without a colon come back with their line break
                    if name.contains(&b'\n') {
                        return None;
                    }
                    let name = name.trim_ascii_end();
                    if !name.is_empty() && name.iter().all(|ch| (33..=126).contains(ch)) {
                        HeaderField {
                            name: String::from_utf8_lossy(name).into_owned(),
                            value: unfold(value),
                        }
                        .into()
                    } else {
                        None
                    }
                })
                .collect(),
        }
    }

    /// Returns the value of the first header named `name`.
    pub fn get<'x>(&'x self, name: &'x str) -> Option<&'x str> {
        self.get_all(name).next()
    }

    /// Returns the values of every header named `name`, in message order.
    pub fn get_all<'x>(&'x self, name: &'x str) -> impl Iterator<Item = &'x str> + 'x {
        self.fields
            .iter()
            .filter(move |field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Joins continuation lines with a single space and trims the result.
fn unfold(value: &[u8]) -> String {
    let value = String::from_utf8_lossy(value);
    let mut unfolded = String::with_capacity(value.len());
    for line in value.split('\n') {
        let line = line.trim();
        if !line.is_empty() {
            if !unfolded.is_empty() {
                unfolded.push(' ');
            }
            unfolded.push_str(line);
        }
    }
    unfolded
}
