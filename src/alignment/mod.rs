/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use serde::Serialize;

use crate::common::{
    address::address_domain,
    headers::HeaderSet,
    parse::{tag_value, D},
};

/// Domains asserted by the visible sender identity and the authentication
/// mechanisms, and whether they match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DomainAlignment {
    pub(crate) from_domain: String,
    pub(crate) return_path_domain: String,
    pub(crate) dkim_domain: String,
    pub(crate) spf_aligned: bool,
    pub(crate) dkim_aligned: bool,
}

impl DomainAlignment {
    pub fn new(headers: &HeaderSet) -> Self {
        let from_domain = headers.get("From").map(address_domain).unwrap_or_default();
        let return_path_domain = headers
            .get("Return-Path")
            .map(address_domain)
            .unwrap_or_default();
        let dkim_domain = headers
            .get("DKIM-Signature")
            .map(signature_domain)
            .unwrap_or_default();

        DomainAlignment {
            spf_aligned: is_aligned(&from_domain, &return_path_domain),
            dkim_aligned: is_aligned(&from_domain, &dkim_domain),
            from_domain,
            return_path_domain,
            dkim_domain,
        }
    }

    pub fn from_domain(&self) -> &str {
        &self.from_domain
    }

    pub fn return_path_domain(&self) -> &str {
        &self.return_path_domain
    }

    pub fn dkim_domain(&self) -> &str {
        &self.dkim_domain
    }

    pub fn spf_aligned(&self) -> bool {
        self.spf_aligned
    }

    pub fn dkim_aligned(&self) -> bool {
        self.dkim_aligned
    }
}

/// Value of the first `d=` tag of a DKIM-Signature header.
pub fn signature_domain(value: &str) -> String {
    tag_value(value.as_bytes(), D)
        .and_then(|domain| String::from_utf8(domain).ok())
        .map(|domain| domain.trim().trim_end_matches('.').to_lowercase())
        .unwrap_or_default()
}

// Domains are lowercased on extraction, so alignment is case-insensitive
fn is_aligned(from_domain: &str, domain: &str) -> bool {
    !from_domain.is_empty() && from_domain == domain
}
