// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `/json` compatibility schema: the canonical record flattened into the
//! network/location/system/user shape the first API generation served.

use serde::Serialize;

use geoip_store::IpRecord;

use crate::language::LanguageResponse;
use crate::useragent::UserAgentResponse;

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyResponse {
    pub network: LegacyNetwork,
    pub location: LegacyLocation,
    pub system: UserAgentResponse,
    pub user: LegacyUser,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyNetwork {
    pub ip: String,
    #[serde(rename = "as")]
    pub autonomous_system: LegacyAs,
    pub isp: String,
    pub domain: String,
    pub tld: Vec<String>,
    pub bot: bool,
    pub tor: bool,
    pub proxy: bool,
    pub proxy_type: String,
    pub last_seen: i64,
    pub usage_type: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyAs {
    pub number: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyLocation {
    pub region_code: String,
    pub region_name: String,
    pub city: String,
    pub zip_code: String,
    pub time_zone: String,
    pub longitude: f64,
    pub latitude: f64,
    pub accuracy_radius: u32,
    pub metro_code: u32,
    pub country: LegacyCountry,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyCountry {
    pub code: String,
    pub cca3: String,
    pub call_code: Vec<String>,
    pub capital: String,
    pub name: String,
    pub currency: Vec<LegacyCurrency>,
    pub continent: LegacyContinent,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyCurrency {
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyContinent {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyUser {
    pub language: LanguageResponse,
}

/// Flattens a canonical record plus the request-derived helpers into the
/// legacy shape.
pub fn legacy_response(
    record: &IpRecord,
    language: LanguageResponse,
    user_agent: UserAgentResponse,
) -> LegacyResponse {
    let info = geoip_countries::lookup(&record.country.iso_code);
    let region = record.city.regions.first();

    LegacyResponse {
        network: LegacyNetwork {
            ip: record.address.clone(),
            autonomous_system: LegacyAs {
                number: record.autonomous_system.number,
                name: record.autonomous_system.name.clone(),
            },
            isp: record.isp.name.clone(),
            domain: record.network.domain.clone(),
            tld: info.map(|i| vec![i.tld.to_string()]).unwrap_or_default(),
            bot: user_agent.bot,
            tor: record.is_tor_exit_node,
            proxy: record.is_public_proxy || record.is_anonymous_proxy,
            proxy_type: record.proxy_type.clone(),
            last_seen: record.last_seen,
            usage_type: record.usage_type.clone(),
        },
        location: LegacyLocation {
            region_code: region.map(|r| r.code.clone()).unwrap_or_default(),
            region_name: region.map(|r| r.name.clone()).unwrap_or_default(),
            city: record.city.name.clone(),
            zip_code: record.postal.zip.clone(),
            time_zone: record.city.time_zone.clone(),
            longitude: record.longitude,
            latitude: record.latitude,
            accuracy_radius: record.accuracy_radius,
            metro_code: record.city.metro_code,
            country: LegacyCountry {
                code: record.country.iso_code.clone(),
                cca3: info.map(|i| i.alpha3.to_string()).unwrap_or_default(),
                call_code: info
                    .map(|i| vec![i.calling_code.to_string()])
                    .unwrap_or_default(),
                capital: info.map(|i| i.capital.to_string()).unwrap_or_default(),
                name: record.country.name.clone(),
                currency: info
                    .map(|i| {
                        vec![LegacyCurrency {
                            code: i.currency.to_string(),
                        }]
                    })
                    .unwrap_or_default(),
                continent: LegacyContinent {
                    code: record.country.continent.code.clone(),
                    name: record.country.continent.name.clone(),
                },
            },
        },
        system: user_agent,
        user: LegacyUser { language },
    }
}

#[cfg(test)]
mod tests {
    use geoip_store::{AutonomousSystem, Continent, Country, IpRecord};

    use super::*;

    #[test]
    fn flattens_the_canonical_record() {
        let record = IpRecord {
            address: "8.8.8.8".into(),
            is_tor_exit_node: true,
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
            autonomous_system: AutonomousSystem {
                number: 15169,
                name: "GOOGLE".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let legacy = legacy_response(
            &record,
            LanguageResponse::default(),
            UserAgentResponse::default(),
        );
        assert_eq!(legacy.network.ip, "8.8.8.8");
        assert_eq!(legacy.network.autonomous_system.number, 15169);
        assert!(legacy.network.tor);
        assert_eq!(legacy.location.country.cca3, "USA");
        assert_eq!(legacy.location.country.capital, "Washington, D.C.");
        assert_eq!(legacy.location.country.continent.code, "NA");
        assert_eq!(legacy.user.language.language, "en");

        // The flattened record is JSON-stable.
        let value = serde_json::to_value(&legacy).unwrap();
        assert_eq!(value["network"]["as"]["number"], 15169);
        assert_eq!(value["location"]["country"]["code"], "US");
    }
}
