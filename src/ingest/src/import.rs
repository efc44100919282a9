// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The normalizer: folds one hydrated job into the canonical entity model.
//!
//! Field merging uses a fixed precedence ("first non-empty source wins", see
//! the per-field chains below), then the entities are upserted owner-first so
//! every reference id exists before the IP row that points at it. Retryable
//! persistence errors re-enqueue the job with a bumped fail count; the
//! worker never retries in place.

use std::sync::Arc;

use geoip_sources::maxmind::GeoTraits;
use geoip_sources::ProxyRecord;
use geoip_store::NewIp;

use crate::{Ingestor, Job};

pub(crate) fn import_job(ingestor: &Arc<Ingestor>, job: &Job) -> Result<(), anyhow::Error> {
    if job.fail_count > 10 {
        anyhow::bail!("giving up on {} after {} attempts", job.ip, job.fail_count);
    }
    let store = ingestor.store();
    let mm = &job.maxmind;
    let i2l = &job.ip2location;

    macro_rules! try_store {
        ($expr:expr) => {
            match $expr {
                Ok(value) => value,
                Err(e) if e.is_retryable() => {
                    ingestor.requeue(job);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        };
    }

    let mut continent_code = mm.continent.code.clone().unwrap_or_default();
    if continent_code.is_empty() {
        continent_code = mm.country.continent_code.clone().unwrap_or_default();
    }
    continent_code.make_ascii_uppercase();
    let mut continent_name = mm.continent.name_en().to_string();
    if continent_name.is_empty() {
        continent_name = continent_code.clone();
    }
    let continent = try_store!(store.upsert_continent(&continent_code, &continent_name));

    let mut iso_code = mm.country.iso_code.clone().unwrap_or_default();
    if iso_code.is_empty() {
        iso_code = i2l.country_short.clone();
    }
    iso_code.make_ascii_uppercase();
    let mut country_name = mm.country.name_en().to_string();
    if country_name.is_empty() {
        country_name = i2l.country_long.clone();
    }
    let country = try_store!(store.upsert_country(
        continent.id,
        &iso_code,
        mm.country.is_in_european_union,
        &country_name,
    ));

    // The region list is the union of the single IP2Location region and the
    // ordered MaxMind subdivisions.
    let mut region_ids = Vec::new();
    if !i2l.region.is_empty() {
        region_ids.push(try_store!(store.upsert_region(country.id, "", &i2l.region)).id);
    }
    for subdivision in &mm.subdivisions {
        let code = subdivision.iso_code.as_deref().unwrap_or("");
        region_ids
            .push(try_store!(store.upsert_region(country.id, code, subdivision.name_en())).id);
    }

    let mut city_name = mm.city.name_en().to_string();
    if city_name.is_empty() {
        city_name = i2l.city.clone();
    }
    let city = try_store!(store.upsert_city(
        country.id,
        &city_name,
        mm.location.metro_code.unwrap_or(0),
        mm.location.time_zone.as_deref().unwrap_or(""),
        mm.location.population_density.unwrap_or(0),
    ));
    try_store!(store.set_city_regions(city.id, &region_ids));

    let mut postal_id = 0;
    if let Some(zip) = mm.postal.code.as_deref().filter(|zip| !zip.is_empty()) {
        postal_id = try_store!(store.upsert_postal(city.id, zip)).id;
    }

    let mut isp_name = mm.traits.isp.clone().unwrap_or_default();
    if isp_name.is_empty() {
        isp_name = i2l.isp.clone();
    }
    if isp_name.is_empty() {
        if let Some(whois) = &job.whois {
            isp_name = whois.name.clone();
        }
    }
    let mut isp_id = 0;
    if !isp_name.is_empty() {
        isp_id = try_store!(store.upsert_isp(&isp_name)).id;
    }

    let network_cidr = mm.traits.network.clone().unwrap_or_default();
    let mut network_domain = mm.traits.domain.clone().unwrap_or_default();
    if network_domain.is_empty() {
        network_domain = i2l.domain.clone();
    }
    let mut network_id = 0;
    if !network_cidr.is_empty() || !network_domain.is_empty() {
        network_id = try_store!(store.upsert_network(&network_cidr, &network_domain)).id;
    }

    let organization_name = mm.traits.organization.clone().unwrap_or_default();
    let mut organization_id = 0;
    if !organization_name.is_empty() {
        organization_id = try_store!(store.upsert_organization(&organization_name)).id;
    }

    let mut domain_ids = Vec::new();
    for name in &job.domains {
        domain_ids.push(try_store!(store.upsert_domain(name)).id);
    }

    let mut as_number = mm.traits.autonomous_system_number.unwrap_or(0);
    if as_number == 0 {
        as_number = job.maxmind_asn.autonomous_system_number.unwrap_or(0);
    }
    if as_number == 0 {
        as_number = i2l.asn.parse().unwrap_or(0);
    }
    if as_number == 0 {
        if let Some(whois) = &job.whois {
            as_number = whois.asn;
        }
    }
    let mut as_name = mm.traits.autonomous_system_organization.clone().unwrap_or_default();
    if as_name.is_empty() {
        as_name = i2l.as_name.clone();
    }
    if as_name.is_empty() {
        as_name = job
            .maxmind_asn
            .autonomous_system_organization
            .clone()
            .unwrap_or_default();
    }
    let mut autonomous_system_id = 0;
    if as_number != 0 || !as_name.is_empty() {
        autonomous_system_id =
            try_store!(store.upsert_autonomous_system(as_number, &as_name)).id;
    }

    let is_tor_exit_node =
        ingestor.sources().is_tor_exit(job.ip) || mm.traits.is_tor_exit_node;
    let (is_anonymous_proxy, is_public_proxy) = reconcile_proxy_flags(
        i2l,
        mm.traits.is_anonymous_proxy,
        mm.traits.is_public_proxy,
    );
    let mut threat = i2l.threat.clone();
    if threat == "NOT SUPPORTED" {
        threat.clear();
    }

    let new = NewIp {
        isp_id,
        network_id,
        country_id: country.id,
        city_id: city.id,
        postal_id,
        organization_id,
        autonomous_system_id,
        address: job.ip.to_string(),
        is_anonymous: mm.traits.is_anonymous,
        is_anonymous_proxy,
        is_anonymous_vpn: mm.traits.is_anonymous_vpn,
        is_hosting_provider: mm.traits.is_hosting_provider,
        is_public_proxy,
        is_satellite_provider: mm.traits.is_satellite_provider,
        is_tor_exit_node,
        proxy_type: i2l.proxy_type.clone(),
        usage_type: merge_usage_type(i2l, &mm.traits),
        static_ip_score: mm
            .traits
            .static_ip_score
            .map(|score| score.to_string())
            .unwrap_or_default(),
        threat,
        user_count: mm
            .traits
            .user_count
            .map(|count| count.to_string())
            .unwrap_or_default(),
        latitude: mm.location.latitude.unwrap_or(0.0),
        longitude: mm.location.longitude.unwrap_or(0.0),
        accuracy_radius: mm.location.accuracy_radius.unwrap_or(0),
        last_seen: i2l.last_seen,
    };
    let row = try_store!(store.upsert_ip(&new));
    try_store!(store.add_ip_domains(row.id, &domain_ids));
    Ok(())
}

/// IP2Location knows an address is a proxy without saying which MaxMind flag
/// applies; when MaxMind set neither, a PUB proxy type marks a public proxy
/// and everything else an anonymous one.
fn reconcile_proxy_flags(
    i2l: &ProxyRecord,
    mm_anonymous_proxy: bool,
    mm_public_proxy: bool,
) -> (bool, bool) {
    let mut anonymous_proxy = mm_anonymous_proxy;
    let mut public_proxy = mm_public_proxy;
    if i2l.is_proxy && !anonymous_proxy && !public_proxy {
        if i2l.proxy_type == "PUB" {
            public_proxy = true;
        } else {
            anonymous_proxy = true;
        }
    }
    (anonymous_proxy, public_proxy)
}

/// The usage type prefers IP2Location's mnemonic and falls back to the
/// MaxMind user type translated into the same vocabulary.
fn merge_usage_type(i2l: &ProxyRecord, traits: &GeoTraits) -> String {
    if !i2l.usage_type.is_empty() {
        return i2l.usage_type.clone();
    }
    map_user_type(traits.user_type.as_deref().unwrap_or("")).to_string()
}

fn map_user_type(user_type: &str) -> &'static str {
    match user_type {
        "business" => "COM",
        "cafe" => "CAF",
        "cellular" => "MOB",
        "college" => "EDU",
        "consumer_privacy_network" => "CPN",
        "content_delivery_network" => "CDN",
        "government" => "GOV",
        "hosting" => "DCH",
        "library" => "LIB",
        "military" => "MIL",
        "residential" => "RDL",
        "router" => "RTR",
        "school" => "EDU",
        "search_engine_spider" => "SES",
        "traveler" => "TRA",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use geoip_sources::maxmind::{GeoRecord, MaxMind, MaxMindConfig};
    use geoip_sources::{
        AsnRecord, Ip2Location, Ip2LocationConfig, ProxyRecord, SourceSet, Tor, TorConfig,
    };
    use geoip_store::Store;

    use super::*;
    use crate::{IngestConfig, Job};

    fn test_sources() -> SourceSet {
        let interval = Duration::from_secs(3600);
        SourceSet {
            maxmind: MaxMind::new(MaxMindConfig {
                license_key: String::new(),
                product_id: "GeoLite2".into(),
                downstream: "download.maxmind.com".into(),
                update_interval: interval,
                retry_interval: interval,
            }),
            ip2location: Ip2Location::new(Ip2LocationConfig {
                token: String::new(),
                product_id: "PX8LITEBIN".into(),
                csv_product_id: "PX8LITECSV".into(),
                downstream: "www.ip2location.com".into(),
                update_interval: interval,
                retry_interval: interval,
            }),
            tor: Tor::new(TorConfig {
                exit_check: "8.8.8.8".into(),
                downstream: "check.torproject.org".into(),
                update_interval: interval,
                retry_interval: interval,
            }),
        }
    }

    fn job_for(ip: &str) -> Job {
        Job {
            ip: ip.parse().unwrap(),
            fail_count: 0,
            domains: Vec::new(),
            maxmind: GeoRecord::default(),
            maxmind_asn: AsnRecord::default(),
            ip2location: ProxyRecord::default(),
            whois: None,
        }
    }

    #[test]
    fn user_type_mapping_covers_the_closed_set() {
        assert_eq!(map_user_type("business"), "COM");
        assert_eq!(map_user_type("cellular"), "MOB");
        assert_eq!(map_user_type("college"), "EDU");
        assert_eq!(map_user_type("school"), "EDU");
        assert_eq!(map_user_type("hosting"), "DCH");
        assert_eq!(map_user_type("search_engine_spider"), "SES");
        assert_eq!(map_user_type("residential"), "RDL");
        assert_eq!(map_user_type("consumer_privacy_network"), "CPN");
        assert_eq!(map_user_type(""), "");
        assert_eq!(map_user_type("unheard_of"), "");
    }

    #[test]
    fn usage_type_prefers_ip2location() {
        let i2l = ProxyRecord {
            usage_type: "ISP".into(),
            ..Default::default()
        };
        let mut traits = GeoTraits::default();
        traits.user_type = Some("hosting".into());
        assert_eq!(merge_usage_type(&i2l, &traits), "ISP");
        assert_eq!(merge_usage_type(&ProxyRecord::default(), &traits), "DCH");
    }

    #[test]
    fn proxy_flags_reconcile() {
        // MaxMind already flagged it: IP2Location adds nothing.
        let i2l = ProxyRecord {
            is_proxy: true,
            proxy_type: "PUB".into(),
            ..Default::default()
        };
        assert_eq!(reconcile_proxy_flags(&i2l, true, false), (true, false));

        // Neither MaxMind flag: PUB marks a public proxy.
        assert_eq!(reconcile_proxy_flags(&i2l, false, false), (false, true));

        // Neither flag and a non-PUB type: anonymous proxy.
        let i2l = ProxyRecord {
            is_proxy: true,
            proxy_type: "VPN".into(),
            ..Default::default()
        };
        assert_eq!(reconcile_proxy_flags(&i2l, false, false), (true, false));

        // Not a proxy at all: nothing set.
        assert_eq!(
            reconcile_proxy_flags(&ProxyRecord::default(), false, false),
            (false, false)
        );
    }

    #[tokio::test]
    async fn import_merges_sources_into_the_store() {
        let store = Store::open_in_memory().unwrap();
        let ingestor = crate::Ingestor::start(IngestConfig::default(), store.clone(), test_sources());

        let mut job = job_for("203.0.113.9");
        job.maxmind.continent.code = Some("EU".into());
        job.maxmind.country.iso_code = Some("DE".into());
        job.maxmind.country.is_in_european_union = true;
        job.maxmind.location.latitude = Some(52.5200081);
        job.maxmind.location.longitude = Some(13.4049541);
        job.maxmind.location.accuracy_radius = Some(100);
        job.maxmind.traits.isp = Some("Example Carrier".into());
        job.maxmind.traits.user_type = Some("hosting".into());
        job.ip2location = ProxyRecord {
            is_proxy: true,
            proxy_type: "VPN".into(),
            city: "Berlin".into(),
            region: "Berlin".into(),
            threat: "NOT SUPPORTED".into(),
            last_seen: 3,
            ..Default::default()
        };
        job.domains = vec!["proxy.example".into()];

        import_job(&ingestor, &job).unwrap();

        let record = store.find_ip("203.0.113.9").unwrap().unwrap();
        assert_eq!(record.country.iso_code, "DE");
        // The country name came from the bundled dataset.
        assert_eq!(record.country.name, "Germany");
        assert_eq!(record.country.continent.code, "EU");
        assert_eq!(record.city.name, "Berlin");
        assert_eq!(record.city.regions.len(), 1);
        assert_eq!(record.isp.name, "Example Carrier");
        assert_eq!(record.usage_type, "DCH");
        assert_eq!(record.proxy_type, "VPN");
        // Unset by MaxMind, reconciled from IP2Location's verdict.
        assert!(record.is_anonymous_proxy);
        assert!(!record.is_public_proxy);
        // The sentinel threat value normalized away.
        assert_eq!(record.threat, "");
        assert_eq!(record.last_seen, 3);
        assert_eq!(record.latitude, 52.52);
        assert_eq!(record.domains.len(), 1);
        assert_eq!(record.domains[0].name, "proxy.example");

        // Importing the same evidence twice changes nothing.
        import_job(&ingestor, &job).unwrap();
        let again = store.find_ip("203.0.113.9").unwrap().unwrap();
        assert_eq!(record, again);
    }
}
