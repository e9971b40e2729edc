/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    sync::LazyLock,
};

use regex::Regex;
use serde::Serialize;

// Alternatives are ordered so that, under leftmost-first matching, the
// form with the most groups after `::` is tried first.
static IP_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    let v4 = r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";
    let h = "[0-9a-fA-F]{1,4}";
    let v6 = [
        format!("(?:{h}:){{7}}{h}"),
        format!("(?:{h}:){{1,4}}:{v4}"),
        format!("::(?:ffff(?::0{{1,4}})?:)?{v4}"),
        format!("{h}:(?::{h}){{1,6}}"),
        format!("(?:{h}:){{1,2}}(?::{h}){{1,5}}"),
        format!("(?:{h}:){{1,3}}(?::{h}){{1,4}}"),
        format!("(?:{h}:){{1,4}}(?::{h}){{1,3}}"),
        format!("(?:{h}:){{1,5}}(?::{h}){{1,2}}"),
        format!("(?:{h}:){{1,6}}:{h}"),
        format!("(?:{h}:){{1,7}}:"),
        format!(":(?:(?::{h}){{1,7}}|:)"),
    ]
    .join("|");

    Regex::new(&format!(r"(?:^|[^0-9A-Za-z:.])\[?({v4}|{v6})\]?"))
        .expect("valid IP token pattern")
});

static IPV6_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)IPv6:").expect("valid IPv6 tag pattern"));

/// Address class of a candidate IP token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IpClass {
    Invalid,
    Private,
    Loopback,
    Public,
}

/// Returns every IPv4 or IPv6 looking token in `text`, brackets and
/// `IPv6:` address literal tags removed, in order of appearance. Tokens are
/// not validated.
pub fn extract_ips(text: &str) -> Vec<String> {
    let text = IPV6_TAG.replace_all(text, " ");
    IP_TOKEN
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Strict address syntax check.
pub fn parse_ip(ip: &str) -> Option<IpAddr> {
    ip.trim().parse::<IpAddr>().ok()
}

/// Classifies a candidate address. An empty candidate is private by
/// convention so that it is never chosen as a public origin.
pub fn classify(ip: &str) -> IpClass {
    if ip.trim().is_empty() {
        IpClass::Private
    } else if let Some(addr) = parse_ip(ip) {
        classify_addr(addr)
    } else {
        IpClass::Invalid
    }
}

pub fn classify_addr(addr: IpAddr) -> IpClass {
    match addr {
        IpAddr::V4(addr) => classify_v4(addr),
        IpAddr::V6(addr) => {
            if let Some(mapped) = addr.to_ipv4_mapped() {
                classify_v4(mapped)
            } else if addr.is_loopback() {
                IpClass::Loopback
            } else if is_private_v6(addr) {
                IpClass::Private
            } else {
                IpClass::Public
            }
        }
    }
}

fn classify_v4(addr: Ipv4Addr) -> IpClass {
    if addr.is_loopback() {
        IpClass::Loopback
    } else if is_private_v4(addr) {
        IpClass::Private
    } else {
        IpClass::Public
    }
}

fn is_private_v4(addr: Ipv4Addr) -> bool {
    let [a, b, c, _] = addr.octets();
    addr.is_private()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_documentation()
        // 0.0.0.0/8
        || a == 0
        // 100.64.0.0/10 shared address space
        || (a == 100 && (b & 0xc0) == 64)
        // 192.0.0.0/24 protocol assignments
        || (a == 192 && b == 0 && c == 0)
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || a >= 240
}

fn is_private_v6(addr: Ipv6Addr) -> bool {
    let segments = addr.segments();
    addr.is_unspecified()
        // fc00::/7 unique local
        || (segments[0] & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (segments[0] & 0xffc0) == 0xfe80
        // 2001:db8::/32 documentation
        || (segments[0] == 0x2001 && segments[1] == 0x0db8)
        // 100::/64 discard only
        || (segments[0] == 0x0100 && segments[1..4] == [0, 0, 0])
}
