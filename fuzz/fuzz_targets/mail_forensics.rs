/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

#![no_main]
use libfuzzer_sys::fuzz_target;

use mail_forensics::{
    alignment::signature_domain, common::address::address_domain, common::ip::classify,
    common::ip::extract_ips, relay::DEFAULT_PLACEHOLDER_DELAY, AuthResults, ForensicReport,
    RelayChain, RelayHop,
};

static RFC822_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz:;=-@<>()[]. \r\n";
static RECEIVED_ALPHABET: &[u8] = b"0123456789abcdef:.[]() ;fromby withid\r\n\t";
static TXT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz1=;:.@ ";

fuzz_target!(|data: &[u8]| {
    let data_rfc822 = into_alphabet(data, RFC822_ALPHABET);
    let data_received = String::from_utf8_lossy(&into_alphabet(data, RECEIVED_ALPHABET)).into_owned();
    let data_txt = String::from_utf8_lossy(&into_alphabet(data, TXT_ALPHABET)).into_owned();
    let data_str = String::from_utf8_lossy(data);

    let report = ForensicReport::parse(data, DEFAULT_PLACEHOLDER_DELAY);
    assert_chain(report.relays());
    let report = ForensicReport::parse(&data_rfc822, DEFAULT_PLACEHOLDER_DELAY);
    assert_chain(report.relays());

    assert_chain(&RelayChain::reconstruct(
        data_received.split('\n'),
        DEFAULT_PLACEHOLDER_DELAY,
    ));
    RelayHop::parse(&data_str);

    AuthResults::parse(&data_str);
    AuthResults::parse(&data_txt);

    address_domain(&data_str);
    address_domain(&data_txt);
    signature_domain(&data_txt);

    for ip in extract_ips(&data_received) {
        classify(&ip);
    }
});

fn assert_chain(chain: &RelayChain) {
    let mut total = 0.0;
    for (pos, hop) in chain.hops().iter().enumerate() {
        assert_eq!(hop.hop(), pos + 1);
        assert!(hop.delay() >= 0.0);
        total += hop.delay();
    }
    assert_eq!(chain.total_delay(), total);
}

fn into_alphabet(data: &[u8], alphabet: &[u8]) -> Vec<u8> {
    data.iter()
        .map(|&byte| alphabet[byte as usize % alphabet.len()])
        .collect()
}
