// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The canonical entities. Wire names follow the public JSON schema; row
//! identities and foreign keys never serialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    #[serde(skip)]
    pub id: i64,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub continent_id: i64,
    #[serde(rename = "code", default)]
    pub iso_code: String,
    #[serde(rename = "european_member", default)]
    pub is_in_european_union: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub continent: Continent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub country_id: i64,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub country_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metro_code: u32,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default)]
    pub population_density: u32,
    #[serde(default)]
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Postal {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub city_id: i64,
    #[serde(default)]
    pub zip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Isp {
    #[serde(skip)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(skip)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(skip)]
    pub id: i64,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutonomousSystem {
    #[serde(skip)]
    pub id: i64,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(skip)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A fully hydrated IP row: the canonical record every read path returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpRecord {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub isp_id: i64,
    #[serde(skip)]
    pub network_id: i64,
    #[serde(skip)]
    pub country_id: i64,
    #[serde(skip)]
    pub city_id: i64,
    #[serde(skip)]
    pub postal_id: i64,
    #[serde(skip)]
    pub organization_id: i64,
    #[serde(skip)]
    pub autonomous_system_id: i64,

    #[serde(rename = "ip", default)]
    pub address: String,

    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub is_anonymous_proxy: bool,
    #[serde(default)]
    pub is_anonymous_vpn: bool,
    #[serde(default)]
    pub is_hosting_provider: bool,
    #[serde(default)]
    pub is_public_proxy: bool,
    #[serde(default)]
    pub is_satellite_provider: bool,
    #[serde(default)]
    pub is_tor_exit_node: bool,

    /// Short uppercase mnemonic from the closed proxy-type set (VPN, TOR,
    /// DCH, PUB, WEB, SES, RES).
    #[serde(default)]
    pub proxy_type: String,
    /// Short uppercase mnemonic classifying the address's user (COM, ORG,
    /// GOV, MIL, EDU, LIB, CDN, ISP, MOB, DCH, SES, RSV, TRA, RTR, RDL,
    /// CPN, CAF).
    #[serde(rename = "type", default)]
    pub usage_type: String,

    #[serde(rename = "score", default)]
    pub static_ip_score: String,
    #[serde(default)]
    pub threat: String,
    #[serde(default)]
    pub user_count: String,

    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_radius: u32,
    #[serde(default)]
    pub last_seen: i64,

    #[serde(default)]
    pub country: Country,
    #[serde(default)]
    pub city: City,
    #[serde(default)]
    pub postal: Postal,
    #[serde(default)]
    pub isp: Isp,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub organization: Organization,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub autonomous_system: AutonomousSystem,

    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl IpRecord {
    /// Whether the record exists in the store (as opposed to an address-only
    /// placeholder returned on a read miss).
    pub fn persisted(&self) -> bool {
        self.id > 0
    }

    pub fn has_domain(&self, name: &str) -> bool {
        self.domains.iter().any(|d| d.name == name)
    }
}

/// The flat shape handed to [`Store::upsert_ip`](crate::Store::upsert_ip).
#[derive(Debug, Clone, Default)]
pub struct NewIp {
    pub isp_id: i64,
    pub network_id: i64,
    pub country_id: i64,
    pub city_id: i64,
    pub postal_id: i64,
    pub organization_id: i64,
    pub autonomous_system_id: i64,
    pub address: String,
    pub is_anonymous: bool,
    pub is_anonymous_proxy: bool,
    pub is_anonymous_vpn: bool,
    pub is_hosting_provider: bool,
    pub is_public_proxy: bool,
    pub is_satellite_provider: bool,
    pub is_tor_exit_node: bool,
    pub proxy_type: String,
    pub usage_type: String,
    pub static_ip_score: String,
    pub threat: String,
    pub user_count: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_radius: u32,
    pub last_seen: i64,
}

/// Entity counts for `/api/statistic`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub ips: i64,
    pub cities: i64,
    pub countries: i64,
    pub domains: i64,
    pub isps: i64,
    pub asns: i64,
    pub networks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_record_round_trips_through_json() {
        let record = IpRecord {
            address: "8.8.8.8".into(),
            is_anonymous: true,
            is_tor_exit_node: true,
            proxy_type: "VPN".into(),
            usage_type: "DCH".into(),
            static_ip_score: "0.01".into(),
            latitude: 37.751,
            longitude: -97.822,
            accuracy_radius: 1000,
            last_seen: 12,
            country: Country {
                iso_code: "US".into(),
                name: "United States".into(),
                continent: Continent {
                    code: "NA".into(),
                    name: "North America".into(),
                    ..Default::default()
                },
                ..Default::default()
            },
            city: City {
                name: "Wichita".into(),
                regions: vec![Region {
                    code: "KS".into(),
                    name: "Kansas".into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            domains: vec![Domain {
                name: "dns.google".into(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&record).unwrap();
        let decoded: IpRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, decoded);

        // Identities stay private to the store.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["ip"], "8.8.8.8");
        assert_eq!(value["type"], "DCH");
        assert_eq!(value["score"], "0.01");
    }
}
