/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::sync::LazyLock;

use regex::Regex;

use crate::common::ip::parse_ip;

use super::{AuthResults, AuthStatus};

static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(spf|dkim|dmarc)\s*=\s*([a-z]+)").expect("valid result pattern")
});

static SPF_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bspf\s*=[^;]*").expect("valid SPF clause pattern"));

static SENDER_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:sender\s*ip\s*is|client-ip=)\s*([\[(]?[0-9.:a-f]+[\])]?)")
        .expect("valid sender IP pattern")
});

impl AuthResults {
    /// Decodes the value of an `Authentication-Results` header. Mechanisms
    /// that are not mentioned keep the `none` status.
    pub fn parse(value: &str) -> Self {
        let mut results = AuthResults::default();
        let (mut has_spf, mut has_dkim, mut has_dmarc) = (false, false, false);

        for caps in RESULT.captures_iter(value) {
            let (Some(method), Some(status)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let status = AuthStatus::parse(status.as_str());
            let method = method.as_str();
            if method.eq_ignore_ascii_case("spf") {
                if !has_spf {
                    results.spf = status;
                    has_spf = true;
                }
            } else if method.eq_ignore_ascii_case("dkim") {
                if !has_dkim {
                    results.dkim = status;
                    has_dkim = true;
                }
            } else if !has_dmarc {
                results.dmarc = status;
                has_dmarc = true;
            }
        }

        results.spf_info = SPF_CLAUSE
            .find(value)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        // Hints that are not valid addresses are discarded
        results.sender_ip = SENDER_IP
            .captures(value)
            .and_then(|caps| caps.get(1))
            .and_then(|ip| parse_ip(ip.as_str().trim_matches(['[', ']', '(', ')'])));

        results
    }
}

impl AuthStatus {
    /// Maps a result keyword to a status. Unrecognized keywords map to
    /// `none`.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("pass") {
            AuthStatus::Pass
        } else if token.eq_ignore_ascii_case("fail") {
            AuthStatus::Fail
        } else if token.eq_ignore_ascii_case("softfail") {
            AuthStatus::SoftFail
        } else if token.eq_ignore_ascii_case("neutral") {
            AuthStatus::Neutral
        } else if token.eq_ignore_ascii_case("temperror") {
            AuthStatus::TempError
        } else if token.eq_ignore_ascii_case("permerror")
            || token.eq_ignore_ascii_case("permterror")
        {
            AuthStatus::PermError
        } else {
            AuthStatus::None
        }
    }
}
