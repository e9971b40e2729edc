/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{future::Future, net::IpAddr, time::Duration};

use crate::{Error, IpInfo};

pub const DEFAULT_REPUTATION_URL: &str = "https://ipinfo.io/{ip}/json";

/// Reputation and geolocation metadata for an address. Failures are
/// returned as an [`IpInfo::Error`] value.
pub trait ReputationLookup: Sync + Send {
    fn ip_info(&self, ip: IpAddr) -> impl Future<Output = IpInfo> + Send;
}

/// JSON-over-HTTP reputation service client.
pub struct IpInfoClient {
    client: reqwest::Client,
    url: String,
}

impl IpInfoClient {
    /// `url` may contain an `{ip}` placeholder, replaced by the queried
    /// address.
    pub fn new(url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        Ok(IpInfoClient {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("mail-forensics/", env!("CARGO_PKG_VERSION")))
                .build()?,
            url: url.into(),
        })
    }

    pub fn url(&self, ip: IpAddr) -> String {
        self.url.replace("{ip}", &ip.to_string())
    }

    pub async fn fetch(&self, ip: IpAddr) -> crate::Result<serde_json::Value> {
        let response = self.client.get(self.url(ip)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(Error::HttpStatus(status.as_u16()))
        }
    }
}

impl ReputationLookup for IpInfoClient {
    async fn ip_info(&self, ip: IpAddr) -> IpInfo {
        match self.fetch(ip).await {
            Ok(info) => IpInfo::Found(info),
            Err(err) => {
                tracing::warn!(%ip, %err, "IP reputation lookup failed");
                err.into()
            }
        }
    }
}

impl From<Error> for IpInfo {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpStatus(status) => IpInfo::error("Unable to fetch IP info", status.into()),
            err => IpInfo::error(err.to_string(), None),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if let Some(status) = err.status() {
            Error::HttpStatus(status.as_u16())
        } else {
            Error::Http(err.to_string())
        }
    }
}
