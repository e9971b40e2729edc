/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use mail_parser::{parsers::MessageStream, Addr, Address, HeaderValue};

/// Returns the lowercased domain of the first address in an RFC 5322
/// address field, or an empty string when the field holds no usable
/// address.
pub fn address_domain(value: &str) -> String {
    // The parser expects a terminated header line
    let value = format!("{value}\n");
    let address = match MessageStream::new(value.as_bytes()).parse_address() {
        HeaderValue::Address(Address::List(list)) => first_address(list),
        HeaderValue::Address(Address::Group(groups)) => groups
            .into_iter()
            .find_map(|group| first_address(group.addresses)),
        _ => None,
    };

    address
        .and_then(|address| {
            address
                .rsplit_once('@')
                .map(|(_, domain)| domain.trim().trim_end_matches('.').to_lowercase())
        })
        .unwrap_or_default()
}

fn first_address(list: Vec<Addr<'_>>) -> Option<String> {
    list.into_iter()
        .find_map(|addr| addr.address.filter(|a| !a.is_empty()))
        .map(|a| a.into_owned())
}
