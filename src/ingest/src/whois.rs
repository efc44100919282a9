// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Origin-AS lookups against the Team Cymru whois service.
//!
//! Used only when neither reference database attributed an address. The
//! verbose query returns a pipe-separated table; the AS number and AS name
//! columns are all the merge path needs.

use std::net::IpAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const WHOIS_HOST: &str = "whois.cymru.com:43";
const TIMEOUT: Duration = Duration::from_secs(5);

/// The subset of a whois answer the normalizer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisRecord {
    pub asn: u32,
    pub name: String,
}

pub async fn lookup(ip: IpAddr) -> Result<WhoisRecord, anyhow::Error> {
    tokio::time::timeout(TIMEOUT, lookup_at(WHOIS_HOST, ip))
        .await
        .map_err(|_| anyhow::anyhow!("whois lookup of {ip} timed out"))?
}

async fn lookup_at(host: &str, ip: IpAddr) -> Result<WhoisRecord, anyhow::Error> {
    let mut stream = TcpStream::connect(host).await?;
    stream.write_all(format!(" -v {ip}\r\n").as_bytes()).await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    parse_response(&response).ok_or_else(|| anyhow::anyhow!("no whois answer for {ip}"))
}

/// Parses the verbose response format:
///
/// ```text
/// AS      | IP               | BGP Prefix | CC | Registry | Allocated  | AS Name
/// 15169   | 8.8.8.8          | 8.8.8.0/24 | US | arin     | 2023-12-28 | GOOGLE, US
/// ```
fn parse_response(response: &str) -> Option<WhoisRecord> {
    for line in response.lines() {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() < 7 {
            continue;
        }
        let Ok(asn) = fields[0].parse::<u32>() else {
            // Header line, or "NA" for unannounced space.
            continue;
        };
        return Some(WhoisRecord {
            asn,
            name: fields[6].to_string(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_verbose_answer() {
        let response = "AS      | IP               | BGP Prefix          | CC | Registry | Allocated  | AS Name\n\
                        15169   | 8.8.8.8          | 8.8.8.0/24          | US | arin     | 2023-12-28 | GOOGLE, US\n";
        assert_eq!(
            parse_response(response),
            Some(WhoisRecord {
                asn: 15169,
                name: "GOOGLE, US".into(),
            })
        );
    }

    #[test]
    fn unannounced_space_yields_nothing() {
        let response = "AS      | IP               | BGP Prefix          | CC | Registry | Allocated  | AS Name\n\
                        NA      | 198.51.100.1     | NA                  |    |          |            | NA\n";
        assert_eq!(parse_response(response), None);
        assert_eq!(parse_response(""), None);
        assert_eq!(parse_response("Error: no entries found\n"), None);
    }
}
