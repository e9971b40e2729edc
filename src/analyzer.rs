/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use trust_dns_resolver::{config::ResolverConfig, system_conf::read_system_conf};

use crate::{
    common::{
        ip::{classify_addr, parse_ip, IpClass},
        resolver::{DnsLookup, DEFAULT_DNSBL_ZONE},
    },
    relay::DEFAULT_PLACEHOLDER_DELAY,
    reputation::{IpInfoClient, ReputationLookup, DEFAULT_REPUTATION_URL},
    Error, ForensicAnalysis, ForensicReport, Resolver,
};

/// Upstream nameservers used by the default DNS collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsProvider {
    #[default]
    System,
    Cloudflare,
    CloudflareTls,
    Google,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Delay assigned to every hop when the chain has no positive delay.
    pub placeholder_delay: f64,
    pub dns_provider: DnsProvider,
    pub dns_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub dnsbl_zone: String,
    /// Reputation service URL, `{ip}` is replaced by the sender address.
    pub reputation_url: String,
    pub cache_capacity: usize,
    pub enable_dns: bool,
    pub enable_reputation: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            placeholder_delay: DEFAULT_PLACEHOLDER_DELAY,
            dns_provider: DnsProvider::default(),
            dns_timeout_secs: 5,
            http_timeout_secs: 5,
            dnsbl_zone: DEFAULT_DNSBL_ZONE.to_string(),
            reputation_url: DEFAULT_REPUTATION_URL.to_string(),
            cache_capacity: 128,
            enable_dns: true,
            enable_reputation: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_placeholder_delay(mut self, placeholder_delay: f64) -> Self {
        self.placeholder_delay = placeholder_delay;
        self
    }

    pub fn with_dns_provider(mut self, dns_provider: DnsProvider) -> Self {
        self.dns_provider = dns_provider;
        self
    }

    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_dnsbl_zone(mut self, zone: impl Into<String>) -> Self {
        self.dnsbl_zone = zone.into();
        self
    }

    pub fn with_reputation_url(mut self, url: impl Into<String>) -> Self {
        self.reputation_url = url.into();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_dns(mut self, enable: bool) -> Self {
        self.enable_dns = enable;
        self
    }

    pub fn with_reputation(mut self, enable: bool) -> Self {
        self.enable_reputation = enable;
        self
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Produces forensic reports and enriches them through the DNS and
/// reputation collaborators.
pub struct ForensicAnalyzer<D = Resolver, R = IpInfoClient> {
    config: AnalyzerConfig,
    dns: D,
    reputation: R,
}

impl ForensicAnalyzer {
    /// Builds an analyzer backed by a caching DNS resolver and an HTTP
    /// reputation client. Requires a Tokio runtime.
    pub fn new(config: AnalyzerConfig) -> crate::Result<Self> {
        let resolver_config = match config.dns_provider {
            DnsProvider::System => {
                read_system_conf()
                    .map_err(|err| Error::DnsError(err.to_string()))?
                    .0
            }
            DnsProvider::Cloudflare => ResolverConfig::cloudflare(),
            DnsProvider::CloudflareTls => ResolverConfig::cloudflare_tls(),
            DnsProvider::Google => ResolverConfig::google(),
        };
        let dns = Resolver::with_capacity(
            resolver_config,
            Resolver::single_attempt_options(config.dns_timeout()),
            config.cache_capacity,
        )?
        .with_dnsbl_zone(config.dnsbl_zone.as_str());
        let reputation = IpInfoClient::new(config.reputation_url.as_str(), config.http_timeout())?;

        Ok(ForensicAnalyzer {
            config,
            dns,
            reputation,
        })
    }
}

impl<D: DnsLookup, R: ReputationLookup> ForensicAnalyzer<D, R> {
    pub fn with_collaborators(config: AnalyzerConfig, dns: D, reputation: R) -> Self {
        ForensicAnalyzer {
            config,
            dns,
            reputation,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Offline report for a raw header block.
    pub fn report(&self, raw: impl AsRef<[u8]>) -> ForensicReport {
        ForensicReport::parse(raw, self.config.placeholder_delay)
    }

    /// Report for a raw header block plus DNS and reputation lookups.
    pub async fn analyze(&self, raw: impl AsRef<[u8]>) -> ForensicAnalysis {
        self.enrich(self.report(raw)).await
    }

    /// Runs every enabled lookup once. Lookup failures leave the
    /// corresponding field empty or carry an error descriptor.
    pub async fn enrich(&self, report: ForensicReport) -> ForensicAnalysis {
        let (report, dmarc_txt, spf_txt) = if self.config.enable_dns {
            let mut listed = Vec::with_capacity(report.relays().len());
            for hop in report.relays().hops() {
                listed.push(match hop.ip().and_then(dnsbl_candidate) {
                    Some(ip) => self.dns.dnsbl_listed(ip).await,
                    None => false,
                });
            }

            let dmarc_txt = match report.from_domain() {
                "" => String::new(),
                domain => self.dns.dmarc_record(domain).await,
            };
            let spf_txt = match report.return_path_domain() {
                "" => String::new(),
                domain => self.dns.spf_record(domain).await,
            };

            (report.with_listings(listed), dmarc_txt, spf_txt)
        } else {
            (report, String::new(), String::new())
        };

        let ip_info = match report.sender_ip() {
            Some(ip) if self.config.enable_reputation => Some(self.reputation.ip_info(ip).await),
            _ => None,
        };

        ForensicAnalysis::new(report, dmarc_txt, spf_txt, ip_info)
    }
}

// Only public IPv4 addresses are checked against the DNSBL
fn dnsbl_candidate(ip: &str) -> Option<Ipv4Addr> {
    match parse_ip(ip)? {
        IpAddr::V4(ip) if classify_addr(IpAddr::V4(ip)) == IpClass::Public => Some(ip),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::HashMap,
        net::{IpAddr, Ipv4Addr},
    };

    use parking_lot::Mutex;

    use crate::{
        common::resolver::DnsLookup, reputation::ReputationLookup, AnalyzerConfig, Error,
        ForensicAnalyzer, IpInfo,
    };

    use super::DnsProvider;

    const HEADERS: &str = concat!(
        "Received: from relay.example.net (relay.example.net [209.85.220.41])\r\n",
        "\tby mx.example.com with ESMTPS; Mon, 1 Jan 2024 10:05:00 +0000\r\n",
        "Received: from client (client [10.1.2.3])\r\n",
        "\tby relay.example.net with ESMTP; Mon, 1 Jan 2024 10:00:00 +0000\r\n",
        "Received: from v6.example.org ([2607:f8b0:4864:20::42c]) by client;\r\n",
        "\tMon, 1 Jan 2024 09:59:00 +0000\r\n",
        "Authentication-Results: mx.example.com; spf=pass smtp.mailfrom=example.com;\r\n",
        "\tdkim=fail; dmarc=pass\r\n",
        "From: Alice <alice@example.com>\r\n",
        "Return-Path: <bob@other.com>\r\n",
        "\r\n"
    );

    #[derive(Default)]
    struct MockDns {
        listed: Vec<Ipv4Addr>,
        records: HashMap<String, String>,
        queries: Mutex<Vec<String>>,
    }

    #[derive(Default)]
    struct MockReputation {
        queries: Mutex<Vec<IpAddr>>,
    }

    impl DnsLookup for MockDns {
        async fn dnsbl_listed(&self, ip: Ipv4Addr) -> bool {
            self.queries.lock().push(format!("dnsbl {ip}"));
            self.listed.contains(&ip)
        }

        async fn dmarc_record(&self, domain: &str) -> String {
            self.queries.lock().push(format!("dmarc {domain}"));
            self.records
                .get(&format!("_dmarc.{domain}"))
                .cloned()
                .unwrap_or_default()
        }

        async fn spf_record(&self, domain: &str) -> String {
            self.queries.lock().push(format!("spf {domain}"));
            self.records.get(domain).cloned().unwrap_or_default()
        }
    }

    impl ReputationLookup for MockReputation {
        async fn ip_info(&self, ip: IpAddr) -> IpInfo {
            self.queries.lock().push(ip);
            IpInfo::Found(serde_json::json!({ "ip": ip.to_string(), "country": "US" }))
        }
    }

    fn analyzer(config: AnalyzerConfig) -> ForensicAnalyzer<MockDns, MockReputation> {
        ForensicAnalyzer::with_collaborators(
            config,
            MockDns {
                listed: vec![Ipv4Addr::new(209, 85, 220, 41)],
                records: HashMap::from([
                    (
                        "_dmarc.example.com".to_string(),
                        "v=DMARC1; p=reject".to_string(),
                    ),
                    ("other.com".to_string(), "v=spf1 -all".to_string()),
                ]),
                ..Default::default()
            },
            MockReputation::default(),
        )
    }

    #[tokio::test]
    async fn analyze_with_lookups() {
        let analyzer = analyzer(AnalyzerConfig::default());
        let analysis = analyzer.analyze(HEADERS).await;
        let report = analysis.report();

        assert_eq!(report.spf_status().as_str(), "pass");
        assert_eq!(report.dkim_status().as_str(), "fail");
        assert!(report.dmarc_compliant());
        assert!(!report.spf_aligned());
        assert_eq!(analysis.dmarc_txt(), "v=DMARC1; p=reject");
        assert_eq!(analysis.spf_txt(), "v=spf1 -all");

        // IPv6 and private hops are never queried and count as not listed
        assert_eq!(
            report
                .relays()
                .hops()
                .iter()
                .map(|hop| (hop.ip().unwrap_or_default(), hop.is_listed()))
                .collect::<Vec<_>>(),
            vec![
                ("2607:f8b0:4864:20::42c", Some(false)),
                ("10.1.2.3", Some(false)),
                ("209.85.220.41", Some(true)),
            ]
        );
        assert_eq!(
            *analyzer.dns.queries.lock(),
            vec![
                "dnsbl 209.85.220.41".to_string(),
                "dmarc example.com".to_string(),
                "spf other.com".to_string(),
            ]
        );

        // The earliest public hop is the IPv6 relay
        let sender_ip = "2607:f8b0:4864:20::42c".parse::<IpAddr>().unwrap();
        assert_eq!(report.sender_ip(), Some(sender_ip));
        assert_eq!(*analyzer.reputation.queries.lock(), vec![sender_ip]);
        assert_eq!(
            analysis.ip_info(),
            Some(&IpInfo::Found(serde_json::json!({
                "ip": "2607:f8b0:4864:20::42c",
                "country": "US"
            })))
        );
    }

    #[tokio::test]
    async fn analyze_with_lookups_disabled() {
        let analyzer = analyzer(
            AnalyzerConfig::default()
                .with_dns(false)
                .with_reputation(false)
                .with_placeholder_delay(0.5),
        );
        let analysis = analyzer.analyze(HEADERS).await;

        assert_eq!(analysis.dmarc_txt(), "");
        assert_eq!(analysis.spf_txt(), "");
        assert_eq!(analysis.ip_info(), None);
        assert!(analysis
            .report()
            .relays()
            .hops()
            .iter()
            .all(|hop| hop.is_listed().is_none()));
        assert!(analyzer.dns.queries.lock().is_empty());
        assert!(analyzer.reputation.queries.lock().is_empty());
        assert_eq!(analysis.report().relays().total_delay(), 360.0);
    }

    #[tokio::test]
    async fn analyze_without_identities() {
        let analyzer = analyzer(AnalyzerConfig::default().with_placeholder_delay(0.5));
        let analysis = analyzer
            .analyze("Received: from localhost ([127.0.0.1]) by mx.example.com\r\n\r\n")
            .await;

        // No From or Return-Path domain and no public address to look up
        assert!(analyzer.dns.queries.lock().is_empty());
        assert!(analyzer.reputation.queries.lock().is_empty());
        assert_eq!(analysis.ip_info(), None);
        assert_eq!(analysis.report().relays().total_delay(), 0.5);

        let json: serde_json::Value = serde_json::from_str(&analysis.to_json()).unwrap();
        assert_eq!(json["ip_info"], serde_json::json!({}));
        assert_eq!(json["relays"][0]["blacklist"], true);
    }

    #[test]
    fn config_defaults() {
        let config: AnalyzerConfig = serde_json::from_str(
            r#"{"placeholder_delay": 0.25, "dns_provider": "cloudflare_tls", "enable_reputation": false}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            AnalyzerConfig::default()
                .with_placeholder_delay(0.25)
                .with_dns_provider(DnsProvider::CloudflareTls)
                .with_reputation(false)
        );
        assert_eq!(config.dns_timeout().as_secs(), 5);
        assert_eq!(config.dnsbl_zone, "zen.spamhaus.org");
        assert_eq!(config.reputation_url, "https://ipinfo.io/{ip}/json");
    }

    #[tokio::test]
    async fn analyzer_from_config() {
        for provider in [
            DnsProvider::Cloudflare,
            DnsProvider::CloudflareTls,
            DnsProvider::Google,
        ] {
            assert!(
                ForensicAnalyzer::new(AnalyzerConfig::default().with_dns_provider(provider))
                    .is_ok(),
                "{provider:?}"
            );
        }

        // Hosts without a resolver configuration report a DNS error
        match ForensicAnalyzer::new(AnalyzerConfig::default()) {
            Ok(_) | Err(Error::DnsError(_)) => (),
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
}
