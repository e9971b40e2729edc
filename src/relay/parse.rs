/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::sync::LazyLock;

use mail_parser::{parsers::MessageStream, DateTime, HeaderValue};
use regex::Regex;

use crate::common::ip::extract_ips;

use super::RelayHop;

static FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bfrom\s+(.+?)\s+by\b").expect("valid from pattern"));

static BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bby\s+(.+?)(?:\s+(?:with|id)\b|\s*;|\s*$)").expect("valid by pattern")
});

static WITH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bwith\s+(.+?)(?:\s+id\b|\s*;|\s*$)").expect("valid with pattern")
});

impl RelayHop {
    /// Extracts the hop fields from the value of a `Received` header. Each
    /// field is matched independently and left empty when absent. The
    /// ordinal and delay are assigned by the chain.
    pub fn parse(value: &str) -> Self {
        let mut hop = RelayHop::default();

        // `by` and `with` are searched after the `from` clause so that
        // comments inside it are not mistaken for them.
        let mut offset = 0;
        if let Some(from) = FROM.captures(value).and_then(|caps| caps.get(1)) {
            hop.from = from.as_str().trim().to_string();
            offset = from.end();
        }
        if let Some(by) = BY.captures_at(value, offset).and_then(|caps| caps.get(1)) {
            hop.by = by.as_str().trim().to_string();
            offset = by.start();
        }
        if let Some(with) = WITH.captures_at(value, offset).and_then(|caps| caps.get(1)) {
            hop.with = with.as_str().trim().to_string();
        }

        hop.ip = extract_ips(&hop.from).pop().unwrap_or_default();

        if let Some(dt) = value.rsplit_once(';').and_then(|(_, date)| parse_date(date)) {
            hop.timestamp = dt.to_timestamp().into();
            hop.time = display_time(&dt);
        }

        tracing::debug!(
            from = %hop.from,
            by = %hop.by,
            ip = %hop.ip,
            timestamp = ?hop.timestamp,
            "Parsed Received header"
        );

        hop
    }
}

fn parse_date(value: &str) -> Option<DateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    // The parser expects a terminated header line
    let value = format!("{value}\n");
    match MessageStream::new(value.as_bytes()).parse_date() {
        HeaderValue::DateTime(dt) if dt.is_valid() && dt.day <= days_in_month(&dt) => Some(dt),
        _ => None,
    }
}

fn days_in_month(dt: &DateTime) -> u8 {
    match dt.month {
        2 if dt.year % 4 == 0 && (dt.year % 100 != 0 || dt.year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Formats `MM/DD/YYYY hh:mm:ss AM|PM` in the timestamp's own offset.
fn display_time(dt: &DateTime) -> String {
    let hour = match dt.hour % 12 {
        0 => 12,
        hour => hour,
    };
    format!(
        "{:02}/{:02}/{:04} {:02}:{:02}:{:02} {}",
        dt.month,
        dt.day,
        dt.year,
        hour,
        dt.minute,
        dt.second,
        if dt.hour < 12 { "AM" } else { "PM" }
    )
}
