/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::slice::Iter;

pub(crate) const D: u64 = b'd' as u64;

/// Scanner over `tag=value;` lists such as the DKIM-Signature header.
/// Tag names are packed little-endian into a `u64`, lowercased.
pub(crate) trait TagParser: Sized {
    fn key(&mut self) -> Option<u64>;
    fn tag(&mut self) -> Vec<u8>;
    fn ignore(&mut self);
}

impl TagParser for Iter<'_, u8> {
    #[allow(clippy::while_let_on_iterator)]
    fn key(&mut self) -> Option<u64> {
        let mut key: u64 = 0;
        let mut shift = 0;

        while let Some(&ch) = self.next() {
            match ch {
                b'a'..=b'z' if shift < 64 => {
                    key |= (ch as u64) << shift;
                    shift += 8;
                }
                b' ' | b'\t' | b'\r' | b'\n' => (),
                b'=' => {
                    return key.into();
                }
                b'A'..=b'Z' if shift < 64 => {
                    key |= ((ch - b'A' + b'a') as u64) << shift;
                    shift += 8;
                }
                b';' => {
                    key = 0;
                    shift = 0;
                }
                _ => {
                    key = u64::MAX;
                    shift = 64;
                }
            }
        }

        None
    }

    #[inline(always)]
    fn tag(&mut self) -> Vec<u8> {
        let mut tag = Vec::with_capacity(20);
        for &ch in self {
            if ch == b';' {
                break;
            } else if !ch.is_ascii_whitespace() {
                tag.push(ch);
            }
        }
        tag
    }

    #[inline(always)]
    fn ignore(&mut self) {
        for &ch in self {
            if ch == b';' {
                break;
            }
        }
    }
}

/// Returns the value of the first occurrence of tag `key`, with whitespace
/// removed.
pub(crate) fn tag_value(header: &[u8], key: u64) -> Option<Vec<u8>> {
    let mut iter = header.iter();
    while let Some(tag) = iter.key() {
        if tag == key {
            return iter.tag().into();
        }
        iter.ignore();
    }
    None
}

#[cfg(test)]
mod test {
    use super::{tag_value, D};

    #[test]
    fn dkim_tag_values() {
        for (header, key, expected) in [
            (
                "v=1; a=rsa-sha256; c=relaxed/relaxed; d=example.com; s=sel1; bh=abc=; b=xyz=",
                D,
                Some("example.com"),
            ),
            (
                "v=1; a=rsa-sha256; D = mail.Example.org ;s=sel1",
                D,
                Some("mail.Example.org"),
            ),
            ("v=1; bh=Zm9vYmFy=; b=ZD1ldmlsLmNvbQ==; d=good.org", D, Some("good.org")),
            ("d=first.org; d=second.org", D, Some("first.org")),
            ("v=1; s=sel; d=mail.\r\n\texample.net", D, Some("mail.example.net")),
            ("v=1; d=trailing.org", D, Some("trailing.org")),
            ("v=1; a=rsa-sha256; s=sel1", D, None),
            ("", D, None),
        ] {
            assert_eq!(
                tag_value(header.as_bytes(), key)
                    .map(|v| String::from_utf8(v).unwrap())
                    .as_deref(),
                expected,
                "{header}"
            );
        }
    }
}
