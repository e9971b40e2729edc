/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use crate::{
    alignment::DomainAlignment, relay::origin::select_origin, AuthResults, HeaderSet,
    RelayChain,
};

use super::{ForensicAnalysis, ForensicReport, IpInfo, NO_DKIM_SIGNATURE};

impl ForensicReport {
    /// Builds the report for a raw header block. Never fails: fields that
    /// cannot be derived keep their empty defaults.
    pub fn parse(raw: impl AsRef<[u8]>, placeholder_delay: f64) -> Self {
        Self::new(HeaderSet::parse(raw), placeholder_delay)
    }

    pub fn new(headers: HeaderSet, placeholder_delay: f64) -> Self {
        let alignment = DomainAlignment::new(&headers);
        let auth_results = headers
            .get("Authentication-Results")
            .unwrap_or_default()
            .to_string();
        let auth = AuthResults::parse(&auth_results);
        let relays = RelayChain::reconstruct(headers.get_all("Received"), placeholder_delay);
        let sender_ip = select_origin(auth.sender_ip(), &relays);
        let dkim_info = headers
            .get("DKIM-Signature")
            .unwrap_or(NO_DKIM_SIGNATURE)
            .to_string();

        ForensicReport {
            alignment,
            dmarc_compliant: auth.dmarc().is_pass(),
            spf_authenticated: auth.spf().is_pass(),
            dkim_authenticated: auth.dkim().is_pass(),
            spf_status: auth.spf(),
            dkim_status: auth.dkim(),
            dmarc_status: auth.dmarc(),
            spf_info: auth.spf_info,
            dkim_info,
            relays,
            sender_ip,
            auth_results,
            headers,
        }
    }

    /// Records the DNSBL verdict of each relay hop, in chain order.
    pub(crate) fn with_listings(mut self, listed: impl IntoIterator<Item = bool>) -> Self {
        self.relays = self.relays.with_listings(listed);
        self
    }
}

impl ForensicAnalysis {
    pub(crate) fn new(
        report: ForensicReport,
        dmarc_txt: String,
        spf_txt: String,
        ip_info: Option<IpInfo>,
    ) -> Self {
        ForensicAnalysis {
            report,
            dmarc_txt,
            spf_txt,
            ip_info,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{fs, net::IpAddr, path::PathBuf};

    use crate::{
        relay::DEFAULT_PLACEHOLDER_DELAY,
        report::{ForensicAnalysis, IpInfo, NO_DKIM_SIGNATURE},
        AuthStatus, ForensicReport,
    };

    fn fixture(name: &str) -> Vec<u8> {
        let mut file_name = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        file_name.push("resources");
        file_name.push("headers");
        file_name.push(name);
        fs::read(&file_name).unwrap()
    }

    #[test]
    fn report_from_google_headers() {
        let report = ForensicReport::parse(fixture("google.txt"), DEFAULT_PLACEHOLDER_DELAY);

        assert_eq!(report.headers().get_all("Received").count(), 3);
        assert_eq!(report.from_domain(), "example.org");
        assert_eq!(report.return_path_domain(), "news.example.org");
        assert_eq!(report.alignment().dkim_domain(), "example.org");
        assert!(!report.spf_aligned());
        assert!(report.dkim_aligned());
        assert_eq!(
            (report.spf_status(), report.dkim_status(), report.dmarc_status()),
            (AuthStatus::Pass, AuthStatus::Pass, AuthStatus::Pass)
        );
        assert!(report.spf_authenticated());
        assert!(report.dkim_authenticated());
        assert!(report.dmarc_compliant());
        assert_eq!(
            report.spf_info(),
            concat!(
                "spf=pass (google.com: domain of newsletter@news.example.org designates ",
                "209.85.220.41 as permitted sender) smtp.mailfrom=newsletter@news.example.org"
            )
        );
        assert!(report.dkim_info().starts_with("v=1; a=rsa-sha256; c=relaxed/relaxed; d=example.org;"));
        assert!(report.auth_results().starts_with("mx.google.com; dkim=pass"));

        let hops = report.relays().hops();
        assert_eq!(
            hops.iter()
                .map(|hop| (hop.hop(), hop.by(), hop.ip().unwrap_or_default(), hop.delay()))
                .collect::<Vec<_>>(),
            vec![
                (1, "smtp.example.org (Postfix)", "10.20.30.40", 0.0),
                (2, "mx.google.com", "209.85.220.41", 6.0),
                (3, "2002:a05:6a10:a0d1:b0:5a4:1b2c:3d4e", "", 2.0),
            ]
        );
        assert_eq!(
            hops.iter().map(|hop| hop.time()).collect::<Vec<_>>(),
            vec![
                "01/02/2024 06:05:04 PM",
                "01/02/2024 10:05:10 AM",
                "01/02/2024 10:05:12 AM"
            ]
        );
        assert_eq!(hops[1].with(), "SMTPS");
        assert_eq!(hops[0].timestamp(), Some(1704218704));
        assert_eq!(report.relays().total_delay(), 8.0);
        assert_eq!(
            report.sender_ip(),
            Some("209.85.220.41".parse::<IpAddr>().unwrap())
        );
    }

    #[test]
    fn report_from_appended_headers() {
        let report = ForensicReport::parse(fixture("appended.txt"), DEFAULT_PLACEHOLDER_DELAY);

        assert_eq!(report.from_domain(), "example.com");
        assert_eq!(report.return_path_domain(), "other.com");
        assert!(!report.spf_aligned());
        assert!(!report.dkim_aligned());
        assert_eq!(
            (report.spf_status(), report.dkim_status(), report.dmarc_status()),
            (AuthStatus::SoftFail, AuthStatus::None, AuthStatus::PermError)
        );
        assert!(!report.dmarc_compliant());
        assert_eq!(
            report.spf_info(),
            "spf=SoftFail (sender IP is 10.0.0.5) smtp.mailfrom=bob@other.com"
        );
        assert_eq!(report.dkim_info(), NO_DKIM_SIGNATURE);

        // Relays were appended, so the chain is flipped back
        let hops = report.relays().hops();
        assert_eq!(hops[0].by(), "relay.example.com");
        assert_eq!(hops[1].by(), "mx.example.com");
        assert_eq!(hops[1].delay(), 45.0);
        assert_eq!(report.relays().total_delay(), 45.0);

        // Private hint is ignored in favour of the first public hop
        assert_eq!(
            report.sender_ip(),
            Some("8.8.4.4".parse::<IpAddr>().unwrap())
        );
    }

    #[test]
    fn report_from_unparsable_input() {
        let inputs: [&[u8]; 3] = [b"", b"\x00\x01\x02 not a header block", b"\r\n\r\nBody only"];
        for raw in inputs {
            let report = ForensicReport::parse(raw, DEFAULT_PLACEHOLDER_DELAY);
            assert!(report.headers().is_empty());
            assert!(report.relays().is_empty());
            assert_eq!(report.relays().total_delay(), 0.0);
            assert_eq!(
                (report.spf_status(), report.dkim_status(), report.dmarc_status()),
                (AuthStatus::None, AuthStatus::None, AuthStatus::None)
            );
            assert!(!report.spf_aligned() && !report.dkim_aligned());
            assert_eq!(report.spf_info(), "");
            assert_eq!(report.sender_ip(), None);
        }
    }

    #[test]
    fn report_json_fields() {
        let report = ForensicReport::parse(
            concat!(
                "Received: by mx.example.com\r\n",
                "Authentication-Results: spf=pass smtp.mailfrom=example.com; dkim=fail; dmarc=pass\r\n",
                "From: alice@example.com\r\n",
                "Return-Path: <bob@other.com>\r\n\r\n"
            ),
            DEFAULT_PLACEHOLDER_DELAY,
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();

        assert_eq!(json["spf_status"], "pass");
        assert_eq!(json["dkim_status"], "fail");
        assert_eq!(json["dmarc_status"], "pass");
        assert_eq!(json["dmarc_compliant"], true);
        assert_eq!(json["spf_authenticated"], true);
        assert_eq!(json["dkim_authenticated"], false);
        assert_eq!(json["spf_aligned"], false);
        assert_eq!(json["dkim_info"], NO_DKIM_SIGNATURE);
        assert_eq!(json["sender_ip"], serde_json::Value::Null);
        assert_eq!(json["headers_found"][0]["name"], "Received");
        assert_eq!(json["total_delay"], 0.1);

        let relay = &json["relays"][0];
        assert_eq!(relay["hop"], 1);
        assert_eq!(relay["from"], "");
        assert_eq!(relay["by"], "mx.example.com");
        assert_eq!(relay["ip"], "");
        assert_eq!(relay["time_dt"], serde_json::Value::Null);
        assert_eq!(relay["blacklist"], serde_json::Value::Null);

        let analysis = ForensicAnalysis::new(
            report.clone().with_listings([false]),
            "v=DMARC1; p=none".to_string(),
            String::new(),
            None,
        );
        let json: serde_json::Value = serde_json::from_str(&analysis.to_json()).unwrap();
        assert_eq!(json["dmarc_txt"], "v=DMARC1; p=none");
        assert_eq!(json["spf_txt"], "");
        assert_eq!(json["ip_info"], serde_json::json!({}));
        assert_eq!(json["relays"][0]["blacklist"], true);
        assert_eq!(json["spf_status"], "pass");

        let analysis = ForensicAnalysis::new(
            report,
            String::new(),
            String::new(),
            IpInfo::error("Unable to fetch IP info", 429.into()).into(),
        );
        let json: serde_json::Value = serde_json::from_str(&analysis.to_json()).unwrap();
        assert_eq!(
            json["ip_info"],
            serde_json::json!({"error": "Unable to fetch IP info", "status": 429})
        );
    }
}
