// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use geoip_store::{NewIp, PageParams, SearchFilter, Store};

fn new_ip(address: &str) -> NewIp {
    NewIp {
        address: address.into(),
        ..Default::default()
    }
}

#[test]
fn upserts_are_idempotent() {
    let store = Store::open_in_memory().unwrap();

    let continent = store.upsert_continent("EU", "Europe").unwrap();
    assert_eq!(continent, store.upsert_continent("EU", "Europe").unwrap());

    let country = store
        .upsert_country(continent.id, "DE", true, "Germany")
        .unwrap();
    assert_eq!(
        country,
        store
            .upsert_country(continent.id, "DE", true, "Germany")
            .unwrap()
    );

    let region = store.upsert_region(country.id, "BE", "Berlin").unwrap();
    assert_eq!(region, store.upsert_region(country.id, "BE", "Berlin").unwrap());

    let city = store
        .upsert_city(country.id, "Berlin", 0, "Europe/Berlin", 0)
        .unwrap();
    assert_eq!(
        city,
        store
            .upsert_city(country.id, "Berlin", 0, "Europe/Berlin", 0)
            .unwrap()
    );

    let postal = store.upsert_postal(city.id, "10115").unwrap();
    assert_eq!(postal, store.upsert_postal(city.id, "10115").unwrap());

    let isp = store.upsert_isp("Example Carrier").unwrap();
    assert_eq!(isp, store.upsert_isp("Example Carrier").unwrap());

    let asn = store.upsert_autonomous_system(64500, "EXAMPLE-AS").unwrap();
    assert_eq!(
        asn,
        store.upsert_autonomous_system(64500, "EXAMPLE-AS").unwrap()
    );

    let first = store.upsert_ip(&new_ip("192.0.2.1")).unwrap();
    let second = store.upsert_ip(&new_ip("192.0.2.1")).unwrap();
    assert_eq!(first, second);
    assert_eq!(store.statistics().unwrap().ips, 1);
}

#[test]
fn upserts_commute_on_disjoint_keys() {
    let a = Store::open_in_memory().unwrap();
    let b = Store::open_in_memory().unwrap();

    a.upsert_isp("first").unwrap();
    a.upsert_isp("second").unwrap();
    b.upsert_isp("second").unwrap();
    b.upsert_isp("first").unwrap();

    // Identities differ with order, the contents do not.
    assert_eq!(a.upsert_isp("first").unwrap().name, "first");
    assert_eq!(b.upsert_isp("first").unwrap().name, "first");
    assert_eq!(a.statistics().unwrap().isps, 2);
    assert_eq!(b.statistics().unwrap().isps, 2);
}

#[test]
fn country_name_falls_back_to_bundled_dataset() {
    let store = Store::open_in_memory().unwrap();
    let continent = store.upsert_continent("EU", "Europe").unwrap();
    let country = store.upsert_country(continent.id, "FR", true, "").unwrap();
    assert_eq!(country.name, "France");
}

#[test]
fn continent_name_is_improved_but_never_blanked() {
    let store = Store::open_in_memory().unwrap();
    store.upsert_continent("NA", "").unwrap();
    let named = store.upsert_continent("NA", "North America").unwrap();
    assert_eq!(named.name, "North America");
    let after_empty = store.upsert_continent("NA", "").unwrap();
    assert_eq!(after_empty.name, "North America");
}

#[test]
fn city_regions_are_replaced_ip_domains_are_unioned() {
    let store = Store::open_in_memory().unwrap();
    let continent = store.upsert_continent("EU", "Europe").unwrap();
    let country = store.upsert_country(continent.id, "DE", true, "").unwrap();
    let city = store.upsert_city(country.id, "Berlin", 0, "", 0).unwrap();
    let r1 = store.upsert_region(country.id, "BE", "Berlin").unwrap();
    let r2 = store.upsert_region(country.id, "BB", "Brandenburg").unwrap();

    store.set_city_regions(city.id, &[r1.id]).unwrap();
    store.set_city_regions(city.id, &[r2.id]).unwrap();

    let mut ip = new_ip("192.0.2.10");
    ip.country_id = country.id;
    ip.city_id = city.id;
    let row = store.upsert_ip(&ip).unwrap();

    let d1 = store.upsert_domain("one.example").unwrap();
    let d2 = store.upsert_domain("two.example").unwrap();
    store.add_ip_domains(row.id, &[d1.id]).unwrap();
    store.add_ip_domains(row.id, &[d2.id, d1.id]).unwrap();

    let hydrated = store.find_ip("192.0.2.10").unwrap().unwrap();
    // The replace dropped the first region; the union kept both domains.
    assert_eq!(hydrated.city.regions.len(), 1);
    assert_eq!(hydrated.city.regions[0].name, "Brandenburg");
    let mut names: Vec<_> = hydrated.domains.iter().map(|d| d.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["one.example", "two.example"]);
}

#[test]
fn ip_update_rewrites_only_the_observation_fields() {
    let store = Store::open_in_memory().unwrap();
    let mut ip = new_ip("198.51.100.5");
    ip.proxy_type = "VPN".into();
    ip.latitude = 52.5200081;
    ip.longitude = 13.4049541;
    let first = store.upsert_ip(&ip).unwrap();
    // Coordinates land at four decimal places.
    assert_eq!(first.latitude, 52.52);
    assert_eq!(first.longitude, 13.405);

    let mut newer = new_ip("198.51.100.5");
    newer.proxy_type = "PUB".into();
    newer.is_tor_exit_node = true;
    let second = store.upsert_ip(&newer).unwrap();
    assert_eq!(second.id, first.id);
    assert!(second.is_tor_exit_node);
    // proxy_type is fixed at first observation.
    assert_eq!(second.proxy_type, "VPN");
}

#[test]
fn find_ip_hydrates_every_reference() {
    let store = Store::open_in_memory().unwrap();
    let continent = store.upsert_continent("NA", "North America").unwrap();
    let country = store.upsert_country(continent.id, "US", false, "").unwrap();
    let city = store
        .upsert_city(country.id, "Wichita", 678, "America/Chicago", 0)
        .unwrap();
    let region = store.upsert_region(country.id, "KS", "Kansas").unwrap();
    store.set_city_regions(city.id, &[region.id]).unwrap();
    let postal = store.upsert_postal(city.id, "67202").unwrap();
    let isp = store.upsert_isp("Example Carrier").unwrap();
    let org = store.upsert_organization("Example Org").unwrap();
    let network = store.upsert_network("8.8.8.0/24", "example.com").unwrap();
    let asn = store.upsert_autonomous_system(15169, "EXAMPLE").unwrap();

    let mut ip = new_ip("8.8.8.8");
    ip.country_id = country.id;
    ip.city_id = city.id;
    ip.postal_id = postal.id;
    ip.isp_id = isp.id;
    ip.organization_id = org.id;
    ip.network_id = network.id;
    ip.autonomous_system_id = asn.id;
    store.upsert_ip(&ip).unwrap();

    let record = store.find_ip("8.8.8.8").unwrap().unwrap();
    assert_eq!(record.country.iso_code, "US");
    assert_eq!(record.country.name, "United States");
    assert_eq!(record.country.continent.code, "NA");
    assert_eq!(record.city.name, "Wichita");
    assert_eq!(record.city.regions[0].code, "KS");
    assert_eq!(record.postal.zip, "67202");
    assert_eq!(record.isp.name, "Example Carrier");
    assert_eq!(record.organization.name, "Example Org");
    assert_eq!(record.network.network, "8.8.8.0/24");
    assert_eq!(record.autonomous_system.number, 15169);

    assert!(store.find_ip("203.0.113.1").unwrap().is_none());
}

#[test]
fn search_by_flag_and_bounding_box() {
    let store = Store::open_in_memory().unwrap();

    let mut berlin = new_ip("192.0.2.1");
    berlin.latitude = 52.52;
    berlin.longitude = 13.40;
    berlin.is_tor_exit_node = true;
    store.upsert_ip(&berlin).unwrap();

    let mut tokyo = new_ip("192.0.2.2");
    tokyo.latitude = 35.68;
    tokyo.longitude = 139.69;
    store.upsert_ip(&tokyo).unwrap();

    let filter = SearchFilter {
        latitude: 52.52,
        longitude: 13.40,
        accuracy_radius: 50,
        ..Default::default()
    };
    let page = store.search(&filter, &PageParams::default()).unwrap();
    assert_eq!(page.total_rows, 1);
    assert_eq!(page.rows[0].address, "192.0.2.1");

    let filter = SearchFilter {
        is_tor_exit_node: true,
        ..Default::default()
    };
    let page = store.search(&filter, &PageParams::default()).unwrap();
    assert_eq!(page.total_rows, 1);
    assert_eq!(page.rows[0].address, "192.0.2.1");
}

#[test]
fn search_pagination_and_sorting() {
    let store = Store::open_in_memory().unwrap();
    for i in 0..25 {
        store.upsert_ip(&new_ip(&format!("10.0.0.{i}"))).unwrap();
    }

    let page = store
        .search(
            &SearchFilter::default(),
            &PageParams {
                limit: 10,
                page: 3,
                sort: "address".into(),
                direction: "asc".into(),
            },
        )
        .unwrap();
    assert_eq!(page.total_rows, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.rows.len(), 5);
    assert_eq!(page.limit, 10);
    assert_eq!(page.page, 3);

    // An oversized limit clamps rather than erroring.
    let page = store
        .search(
            &SearchFilter::default(),
            &PageParams {
                limit: 5000,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(page.limit, 1000);
    assert_eq!(page.rows.len(), 25);
}

#[test]
fn search_by_related_entities() {
    let store = Store::open_in_memory().unwrap();
    let continent = store.upsert_continent("EU", "Europe").unwrap();
    let country = store.upsert_country(continent.id, "DE", true, "").unwrap();
    let isp = store.upsert_isp("Deutsche Example").unwrap();

    let mut ip = new_ip("203.0.113.7");
    ip.country_id = country.id;
    ip.isp_id = isp.id;
    store.upsert_ip(&ip).unwrap();
    store.upsert_ip(&new_ip("203.0.113.8")).unwrap();

    let filter = SearchFilter {
        country: geoip_store::Country {
            iso_code: "DE".into(),
            ..Default::default()
        },
        ..Default::default()
    };
    let page = store.search(&filter, &PageParams::default()).unwrap();
    assert_eq!(page.total_rows, 1);
    assert_eq!(page.rows[0].address, "203.0.113.7");

    let filter = SearchFilter {
        isp: geoip_store::Isp {
            name: "Deutsche".into(),
            ..Default::default()
        },
        ..Default::default()
    };
    let page = store.search(&filter, &PageParams::default()).unwrap();
    assert_eq!(page.total_rows, 1);
}
