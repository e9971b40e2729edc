/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

pub mod assemble;

use std::net::IpAddr;

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{alignment::DomainAlignment, AuthStatus, HeaderSet, RelayChain};

pub const NO_DKIM_SIGNATURE: &str =
    "No aligned DKIM-Signature for the message to be considered aligned.";

/// Forensic report derived from a header block alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForensicReport {
    #[serde(rename = "headers_found")]
    headers: HeaderSet,
    #[serde(flatten)]
    alignment: DomainAlignment,
    dmarc_compliant: bool,
    spf_authenticated: bool,
    dkim_authenticated: bool,
    spf_status: AuthStatus,
    dkim_status: AuthStatus,
    dmarc_status: AuthStatus,
    spf_info: String,
    dkim_info: String,
    #[serde(flatten)]
    relays: RelayChain,
    sender_ip: Option<IpAddr>,
    auth_results: String,
}

/// A [`ForensicReport`] enriched with the DNS and reputation lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForensicAnalysis {
    #[serde(flatten)]
    report: ForensicReport,
    dmarc_txt: String,
    spf_txt: String,
    #[serde(serialize_with = "serialize_ip_info")]
    ip_info: Option<IpInfo>,
}

/// Reputation service answer, or the reason it could not be obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IpInfo {
    Found(serde_json::Value),
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

impl ForensicReport {
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn alignment(&self) -> &DomainAlignment {
        &self.alignment
    }

    pub fn from_domain(&self) -> &str {
        self.alignment.from_domain()
    }

    pub fn return_path_domain(&self) -> &str {
        self.alignment.return_path_domain()
    }

    pub fn spf_aligned(&self) -> bool {
        self.alignment.spf_aligned()
    }

    pub fn dkim_aligned(&self) -> bool {
        self.alignment.dkim_aligned()
    }

    pub fn spf_status(&self) -> AuthStatus {
        self.spf_status
    }

    pub fn dkim_status(&self) -> AuthStatus {
        self.dkim_status
    }

    pub fn dmarc_status(&self) -> AuthStatus {
        self.dmarc_status
    }

    pub fn spf_authenticated(&self) -> bool {
        self.spf_authenticated
    }

    pub fn dkim_authenticated(&self) -> bool {
        self.dkim_authenticated
    }

    pub fn dmarc_compliant(&self) -> bool {
        self.dmarc_compliant
    }

    pub fn spf_info(&self) -> &str {
        &self.spf_info
    }

    pub fn dkim_info(&self) -> &str {
        &self.dkim_info
    }

    pub fn relays(&self) -> &RelayChain {
        &self.relays
    }

    /// Most plausible public originating address.
    pub fn sender_ip(&self) -> Option<IpAddr> {
        self.sender_ip
    }

    pub fn auth_results(&self) -> &str {
        &self.auth_results
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl ForensicAnalysis {
    pub fn report(&self) -> &ForensicReport {
        &self.report
    }

    pub fn dmarc_txt(&self) -> &str {
        &self.dmarc_txt
    }

    pub fn spf_txt(&self) -> &str {
        &self.spf_txt
    }

    /// `None` when no sender IP was selected or the lookup was disabled.
    pub fn ip_info(&self) -> Option<&IpInfo> {
        self.ip_info.as_ref()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl IpInfo {
    pub fn error(error: impl Into<String>, status: Option<u16>) -> Self {
        IpInfo::Error {
            error: error.into(),
            status,
        }
    }
}

// Absent lookups serialize as an empty object
fn serialize_ip_info<S: Serializer>(
    ip_info: &Option<IpInfo>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match ip_info {
        Some(ip_info) => ip_info.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
