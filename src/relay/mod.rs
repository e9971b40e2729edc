/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use serde::Serialize;

pub mod chain;
pub mod origin;
pub mod parse;

pub const DEFAULT_PLACEHOLDER_DELAY: f64 = 0.1;

/// One relay step recorded by a `Received` header.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelayHop {
    pub(crate) hop: usize,
    pub(crate) from: String,
    pub(crate) by: String,
    pub(crate) with: String,
    #[serde(rename = "time_dt")]
    pub(crate) timestamp: Option<i64>,
    pub(crate) time: String,
    pub(crate) delay: f64,
    /// `true` when the hop address is not listed on the DNSBL.
    #[serde(rename = "blacklist")]
    pub(crate) not_listed: Option<bool>,
    pub(crate) ip: String,
}

/// Relay hops in chronological order, earliest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelayChain {
    #[serde(rename = "relays")]
    pub(crate) hops: Vec<RelayHop>,
    pub(crate) total_delay: f64,
}

impl RelayHop {
    /// 1-based position in the chronological chain.
    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn by(&self) -> &str {
        &self.by
    }

    pub fn with(&self) -> &str {
        &self.with
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    /// Transit delay from the previous hop, in seconds.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn ip(&self) -> Option<&str> {
        Some(self.ip.as_str()).filter(|ip| !ip.is_empty())
    }

    /// DNSBL verdict, or `None` before enrichment.
    pub fn is_listed(&self) -> Option<bool> {
        self.not_listed.map(|not_listed| !not_listed)
    }
}

impl RelayChain {
    pub fn hops(&self) -> &[RelayHop] {
        &self.hops
    }

    pub fn total_delay(&self) -> f64 {
        self.total_delay
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}
