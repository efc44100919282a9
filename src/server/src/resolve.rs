// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Host resolution for the lookup routes.
//!
//! A literal address reads straight from the store; a DNS name resolves to
//! its addresses first, and the queried name is bound to each address as a
//! domain. A read miss enqueues an ingest job and polls the store a few
//! times before giving up and returning an address-only record.

use std::net::IpAddr;
use std::time::Duration;

use tokio::net::lookup_host;
use tracing::warn;

use geoip_store::IpRecord;

use crate::AppState;

/// How often and how long to poll after enqueueing a missing address.
const MISS_RETRIES: u32 = 3;
const MISS_DELAY: Duration = Duration::from_secs(3);

/// The host did not resolve to any address.
#[derive(Debug, thiserror::Error)]
#[error("host not found")]
pub struct HostNotFound;

/// Resolves a path parameter (an address or a DNS name) to its canonical
/// record.
pub async fn resolve_host(state: &AppState, host: &str) -> Result<IpRecord, HostNotFound> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(resolve_ip(state, ip, &[]).await);
    }

    let addrs = lookup_host((host, 0)).await.map_err(|_| HostNotFound)?;
    let ips: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
    if ips.is_empty() {
        return Err(HostNotFound);
    }

    let domains = vec![host.to_string()];
    let mut record = IpRecord::default();
    for ip in ips {
        record = resolve_ip(state, ip, &domains).await;
    }
    Ok(record)
}

/// Reads an address from the store, ingesting it on a miss.
pub async fn resolve_ip(state: &AppState, ip: IpAddr, domains: &[String]) -> IpRecord {
    let address = ip.to_string();

    let mut record = find(state, &address);
    let mut attempts = 0;
    while record.is_none() && attempts < MISS_RETRIES {
        state.ingestor.spawn_enqueue(ip, domains.to_vec());
        tokio::time::sleep(MISS_DELAY).await;
        record = find(state, &address);
        attempts += 1;
    }

    let Some(record) = record else {
        // Still unknown: serve what we have, which is the address itself.
        return IpRecord {
            address,
            ..Default::default()
        };
    };

    if domains.is_empty() || domains.iter().all(|name| record.has_domain(name)) {
        return record;
    }

    // Bind the queried name(s) to the record and re-read.
    let mut domain_ids = Vec::new();
    for name in domains {
        match state.store.upsert_domain(name) {
            Ok(domain) => domain_ids.push(domain.id),
            Err(e) => warn!("binding domain {name} to {address}: {e}"),
        }
    }
    if let Err(e) = state.store.add_ip_domains(record.id, &domain_ids) {
        warn!("binding domains to {address}: {e}");
    }
    find(state, &address).unwrap_or(record)
}

fn find(state: &AppState, address: &str) -> Option<IpRecord> {
    match state.store.find_ip(address) {
        Ok(record) => record,
        Err(e) => {
            warn!("read of {address} failed: {e}");
            None
        }
    }
}
