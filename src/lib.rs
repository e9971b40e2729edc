/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

//! Forensic analysis of email header blocks.
//!
//! The crate takes the raw header section of a message and produces a
//! [`report::ForensicReport`]: the SPF/DKIM/DMARC statuses asserted by the
//! receiving side, whether the asserted domains align with the visible
//! `From` domain, the reconstructed chain of `Received` hops with per-hop
//! transit delay, and the most likely originating IP address.
//!
//! Parsing and reconstruction are pure and synchronous. DNS and reputation
//! lookups are performed by pluggable collaborators (see
//! [`common::resolver::DnsLookup`] and [`reputation::ReputationLookup`])
//! whose failures never abort the analysis.

use std::fmt::Display;

use trust_dns_resolver::proto::op::ResponseCode;

pub mod alignment;
pub mod analyzer;
pub mod auth;
pub mod common;
pub mod relay;
pub mod report;
pub mod reputation;

pub use analyzer::{AnalyzerConfig, ForensicAnalyzer};
pub use auth::{AuthResults, AuthStatus};
pub use common::{headers::HeaderSet, resolver::Resolver};
pub use relay::{RelayChain, RelayHop};
pub use report::{ForensicAnalysis, ForensicReport, IpInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    DnsError(String),
    DnsRecordNotFound(ResponseCode),
    Http(String),
    HttpStatus(u16),
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DnsError(err) => write!(f, "DNS resolution error: {err}"),
            Error::DnsRecordNotFound(code) => write!(f, "DNS record not found: {code}."),
            Error::Http(err) => write!(f, "Request failed: {err}"),
            Error::HttpStatus(status) => write!(f, "Unexpected HTTP status {status}."),
            Error::Timeout => write!(f, "Request timed out"),
        }
    }
}
