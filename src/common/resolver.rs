/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{
    borrow::Cow,
    future::Future,
    net::Ipv4Addr,
    sync::Arc,
    time::Duration,
};

use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    system_conf::read_system_conf,
    AsyncResolver, TokioAsyncResolver,
};

use crate::Error;

use super::lru::{DnsCache, LruCache};

pub const DEFAULT_DNSBL_ZONE: &str = "zen.spamhaus.org";

/// DNS queries needed to enrich a report. Every method is fail-open: a
/// resolution failure yields "not listed" or an empty record.
pub trait DnsLookup: Sync + Send {
    /// Whether `ip` is listed on the configured DNS blocklist.
    fn dnsbl_listed(&self, ip: Ipv4Addr) -> impl Future<Output = bool> + Send;

    /// First TXT record published at `_dmarc.{domain}`.
    fn dmarc_record(&self, domain: &str) -> impl Future<Output = String> + Send;

    /// First TXT record at `domain` starting with `v=spf1`.
    fn spf_record(&self, domain: &str) -> impl Future<Output = String> + Send;
}

pub struct Resolver {
    resolver: TokioAsyncResolver,
    cache_txt: LruCache<String, Arc<Vec<String>>>,
    cache_ipv4: LruCache<String, Arc<Vec<Ipv4Addr>>>,
    dnsbl_zone: String,
}

impl Resolver {
    pub fn new_cloudflare_tls() -> Result<Self, ResolveError> {
        Self::with_capacity(
            ResolverConfig::cloudflare_tls(),
            ResolverOpts::default(),
            128,
        )
    }

    pub fn new_cloudflare() -> Result<Self, ResolveError> {
        Self::with_capacity(ResolverConfig::cloudflare(), ResolverOpts::default(), 128)
    }

    pub fn new_google() -> Result<Self, ResolveError> {
        Self::with_capacity(ResolverConfig::google(), ResolverOpts::default(), 128)
    }

    pub fn new_system_conf() -> Result<Self, ResolveError> {
        let (config, options) = read_system_conf()?;
        Self::with_capacity(config, options, 128)
    }

    pub fn with_capacity(
        config: ResolverConfig,
        options: ResolverOpts,
        capacity: usize,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            resolver: AsyncResolver::tokio(config, options)?,
            cache_txt: LruCache::with_capacity(capacity),
            cache_ipv4: LruCache::with_capacity(capacity),
            dnsbl_zone: DEFAULT_DNSBL_ZONE.to_string(),
        })
    }

    pub fn with_dnsbl_zone(mut self, zone: impl Into<String>) -> Self {
        self.dnsbl_zone = zone.into().trim_matches('.').to_string();
        self
    }

    /// Resolver options for a single query attempt bounded by `timeout`.
    pub fn single_attempt_options(timeout: Duration) -> ResolverOpts {
        let mut options = ResolverOpts::default();
        options.timeout = timeout;
        options.attempts = 1;
        options
    }

    pub async fn txt_lookup<'x>(&self, key: impl IntoFqdn<'x>) -> crate::Result<Arc<Vec<String>>> {
        let key = key.into_fqdn();
        if let Some(value) = self.cache_txt.get(key.as_ref()) {
            return Ok(value);
        }

        #[cfg(any(test, feature = "test"))]
        if true {
            return mock_resolve(key.as_ref());
        }

        let txt_lookup = self.resolver.txt_lookup(key.as_ref()).await?;
        let records = txt_lookup
            .as_lookup()
            .record_iter()
            .filter_map(|r| {
                let txt_data = r.data()?.as_txt()?.txt_data();
                let mut entry = Vec::with_capacity(255 * txt_data.len());
                for data in txt_data {
                    entry.extend_from_slice(data);
                }
                String::from_utf8(entry).ok()
            })
            .collect::<Vec<_>>();

        Ok(self.cache_txt.insert(
            key.into_owned(),
            Arc::new(records),
            txt_lookup.valid_until(),
        ))
    }

    pub async fn ipv4_lookup<'x>(
        &self,
        key: impl IntoFqdn<'x>,
    ) -> crate::Result<Arc<Vec<Ipv4Addr>>> {
        let key = key.into_fqdn();
        if let Some(value) = self.cache_ipv4.get(key.as_ref()) {
            return Ok(value);
        }

        #[cfg(any(test, feature = "test"))]
        if true {
            return mock_resolve(key.as_ref());
        }

        let ipv4_lookup = self.resolver.ipv4_lookup(key.as_ref()).await?;
        let ips = ipv4_lookup
            .as_lookup()
            .record_iter()
            .filter_map(|r| (*r.data()?.as_a()?).into())
            .collect::<Vec<_>>();

        Ok(self
            .cache_ipv4
            .insert(key.into_owned(), Arc::new(ips), ipv4_lookup.valid_until()))
    }

    #[cfg(any(test, feature = "test"))]
    pub fn txt_add<'x>(
        &self,
        name: impl IntoFqdn<'x>,
        value: Vec<String>,
        valid_until: std::time::Instant,
    ) {
        self.cache_txt
            .insert(name.into_fqdn().into_owned(), Arc::new(value), valid_until);
    }

    #[cfg(any(test, feature = "test"))]
    pub fn ipv4_add<'x>(
        &self,
        name: impl IntoFqdn<'x>,
        value: Vec<Ipv4Addr>,
        valid_until: std::time::Instant,
    ) {
        self.cache_ipv4
            .insert(name.into_fqdn().into_owned(), Arc::new(value), valid_until);
    }
}

impl DnsLookup for Resolver {
    async fn dnsbl_listed(&self, ip: Ipv4Addr) -> bool {
        let [a, b, c, d] = ip.octets();
        match self
            .ipv4_lookup(format!("{d}.{c}.{b}.{a}.{}.", self.dnsbl_zone))
            .await
        {
            Ok(answers) => !answers.is_empty(),
            Err(Error::DnsRecordNotFound(_)) => false,
            Err(err) => {
                tracing::warn!(%ip, zone = %self.dnsbl_zone, %err, "DNSBL lookup failed");
                false
            }
        }
    }

    async fn dmarc_record(&self, domain: &str) -> String {
        match self.txt_lookup(format!("_dmarc.{domain}.")).await {
            Ok(records) => records.first().cloned().unwrap_or_default(),
            Err(err) => {
                tracing::debug!(domain, %err, "No DMARC record");
                String::new()
            }
        }
    }

    async fn spf_record(&self, domain: &str) -> String {
        match self.txt_lookup(domain).await {
            Ok(records) => records
                .iter()
                .find(|record| record.starts_with("v=spf1"))
                .cloned()
                .unwrap_or_default(),
            Err(err) => {
                tracing::debug!(domain, %err, "No SPF record");
                String::new()
            }
        }
    }
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. } => {
                Error::DnsRecordNotFound(*response_code)
            }
            ResolveErrorKind::Timeout => Error::Timeout,
            _ => Error::DnsError(err.to_string()),
        }
    }
}

pub trait IntoFqdn<'x> {
    fn into_fqdn(self) -> Cow<'x, str>;
}

impl<'x> IntoFqdn<'x> for String {
    fn into_fqdn(self) -> Cow<'x, str> {
        fqdn(&self).into_owned().into()
    }
}

impl<'x> IntoFqdn<'x> for &'x str {
    fn into_fqdn(self) -> Cow<'x, str> {
        fqdn(self)
    }
}

fn fqdn(name: &str) -> Cow<'_, str> {
    if name.ends_with('.') && !name.bytes().any(|ch| ch.is_ascii_uppercase()) {
        name.into()
    } else if name.ends_with('.') {
        name.to_lowercase().into()
    } else {
        format!("{}.", name.to_lowercase()).into()
    }
}

#[cfg(any(test, feature = "test"))]
pub fn mock_resolve<T>(domain: &str) -> crate::Result<T> {
    Err(if domain.contains("_dns_error.") {
        Error::DnsError("".to_string())
    } else if domain.contains("_timeout.") {
        Error::Timeout
    } else {
        Error::DnsRecordNotFound(trust_dns_resolver::proto::op::ResponseCode::NXDomain)
    })
}
