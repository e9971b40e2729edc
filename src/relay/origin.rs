/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::net::IpAddr;

use crate::common::ip::{classify_addr, parse_ip, IpClass};

use super::RelayChain;

/// Picks the most plausible originating address: the receiver's asserted
/// sender IP when it is public, otherwise the earliest public hop address.
pub fn select_origin(hint: Option<IpAddr>, chain: &RelayChain) -> Option<IpAddr> {
    hint.filter(|ip| classify_addr(*ip) == IpClass::Public)
        .or_else(|| {
            chain
                .hops
                .iter()
                .filter_map(|hop| parse_ip(&hop.ip))
                .find(|ip| classify_addr(*ip) == IpClass::Public)
        })
}
