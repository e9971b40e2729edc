/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::io::Read;

use mail_forensics::{AnalyzerConfig, ForensicAnalyzer};
use tracing_subscriber::EnvFilter;

// Usage: analyze_headers [HEADERS_FILE [CONFIG_JSON]]
// Reads the header block from stdin when no file is given.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let headers = match args.next() {
        Some(path) => std::fs::read(path).unwrap(),
        None => {
            let mut headers = Vec::new();
            std::io::stdin().read_to_end(&mut headers).unwrap();
            headers
        }
    };
    let config = match args.next() {
        Some(path) => serde_json::from_slice::<AnalyzerConfig>(&std::fs::read(path).unwrap()).unwrap(),
        None => AnalyzerConfig::default(),
    };

    let analyzer = ForensicAnalyzer::new(config).unwrap();
    let analysis = analyzer.analyze(&headers).await;

    println!("{}", serde_json::to_string_pretty(&analysis).unwrap());
}
