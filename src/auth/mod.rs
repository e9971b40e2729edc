/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{fmt::Display, net::IpAddr};

use serde::Serialize;

pub mod parse;

/// Result asserted by the receiving side for one authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Pass,
    Fail,
    SoftFail,
    Neutral,
    TempError,
    PermError,
    #[default]
    None,
}

/// Statuses and hints decoded from an `Authentication-Results` header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthResults {
    pub(crate) spf: AuthStatus,
    pub(crate) dkim: AuthStatus,
    pub(crate) dmarc: AuthStatus,
    pub(crate) sender_ip: Option<IpAddr>,
    pub(crate) spf_info: String,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Pass => "pass",
            AuthStatus::Fail => "fail",
            AuthStatus::SoftFail => "softfail",
            AuthStatus::Neutral => "neutral",
            AuthStatus::TempError => "temperror",
            AuthStatus::PermError => "permerror",
            AuthStatus::None => "none",
        }
    }

    pub fn is_pass(&self) -> bool {
        *self == AuthStatus::Pass
    }
}

impl Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthResults {
    pub fn spf(&self) -> AuthStatus {
        self.spf
    }

    pub fn dkim(&self) -> AuthStatus {
        self.dkim
    }

    pub fn dmarc(&self) -> AuthStatus {
        self.dmarc
    }

    /// Sender address asserted by the receiving side, when syntactically
    /// valid. It may still be private or loopback.
    pub fn sender_ip(&self) -> Option<IpAddr> {
        self.sender_ip
    }

    /// First `spf=...` clause of the header, without its terminating `;`.
    pub fn spf_info(&self) -> &str {
        &self.spf_info
    }
}
