// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Read paths: hydration of canonical records and the statistics counts.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::entities::{
    AutonomousSystem, City, Continent, Country, Domain, IpRecord, Isp, Network, Organization,
    Postal, Region, Statistics,
};
use crate::{Store, StoreError};

const IP_COLUMNS: &str = "id, isp_id, network_id, country_id, city_id, postal_id,
    organization_id, autonomous_system_id, address, is_anonymous,
    is_anonymous_proxy, is_anonymous_vpn, is_hosting_provider, is_public_proxy,
    is_satellite_provider, is_tor_exit_node, proxy_type, usage_type,
    static_ip_score, threat, user_count, latitude, longitude, accuracy_radius,
    last_seen, created_at, updated_at";

fn ip_from_row(row: &Row) -> Result<IpRecord, rusqlite::Error> {
    Ok(IpRecord {
        id: row.get(0)?,
        isp_id: row.get(1)?,
        network_id: row.get(2)?,
        country_id: row.get(3)?,
        city_id: row.get(4)?,
        postal_id: row.get(5)?,
        organization_id: row.get(6)?,
        autonomous_system_id: row.get(7)?,
        address: row.get(8)?,
        is_anonymous: row.get(9)?,
        is_anonymous_proxy: row.get(10)?,
        is_anonymous_vpn: row.get(11)?,
        is_hosting_provider: row.get(12)?,
        is_public_proxy: row.get(13)?,
        is_satellite_provider: row.get(14)?,
        is_tor_exit_node: row.get(15)?,
        proxy_type: row.get(16)?,
        usage_type: row.get(17)?,
        static_ip_score: row.get(18)?,
        threat: row.get(19)?,
        user_count: row.get(20)?,
        latitude: row.get(21)?,
        longitude: row.get(22)?,
        accuracy_radius: row.get(23)?,
        last_seen: row.get(24)?,
        created_at: row.get(25)?,
        updated_at: row.get(26)?,
        ..Default::default()
    })
}

impl Store {
    /// Reads the flat IP row by id, without its references.
    pub(crate) fn flat_ip(&self, id: i64) -> Result<IpRecord, StoreError> {
        let conn = self.conn();
        Ok(conn.query_row(
            &format!("SELECT {IP_COLUMNS} FROM ips WHERE id = ?1"),
            params![id],
            ip_from_row,
        )?)
    }

    /// The canonical read path: the IP row with every owning reference,
    /// the subdivision list, and the domain set attached.
    pub fn find_ip(&self, address: &str) -> Result<Option<IpRecord>, StoreError> {
        let conn = self.conn();
        let ip = conn
            .query_row(
                &format!("SELECT {IP_COLUMNS} FROM ips WHERE address = ?1"),
                params![address],
                ip_from_row,
            )
            .optional()?;
        match ip {
            None => Ok(None),
            Some(mut ip) => {
                hydrate(&conn, &mut ip)?;
                Ok(Some(ip))
            }
        }
    }

    /// Hydrates a batch of rows by id, preserving the given order.
    pub fn find_ips_by_ids(&self, ids: &[i64]) -> Result<Vec<IpRecord>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let ip = conn
                .query_row(
                    &format!("SELECT {IP_COLUMNS} FROM ips WHERE id = ?1"),
                    params![id],
                    ip_from_row,
                )
                .optional()?;
            if let Some(mut ip) = ip {
                hydrate(&conn, &mut ip)?;
                out.push(ip);
            }
        }
        Ok(out)
    }

    /// Counts per entity for the statistics snapshot.
    pub fn statistics(&self) -> Result<Statistics, StoreError> {
        let conn = self.conn();
        let count = |table: &str| -> Result<i64, rusqlite::Error> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
        };
        Ok(Statistics {
            ips: count("ips")?,
            cities: count("cities")?,
            countries: count("countries")?,
            domains: count("domains")?,
            isps: count("isps")?,
            asns: count("autonomous_systems")?,
            networks: count("networks")?,
        })
    }
}

pub(crate) fn hydrate(conn: &Connection, ip: &mut IpRecord) -> Result<(), StoreError> {
    if ip.country_id > 0 {
        ip.country = conn
            .query_row(
                "SELECT id, continent_id, iso_code, is_in_european_union, name
                 FROM countries WHERE id = ?1",
                params![ip.country_id],
                |row| {
                    Ok(Country {
                        id: row.get(0)?,
                        continent_id: row.get(1)?,
                        iso_code: row.get(2)?,
                        is_in_european_union: row.get(3)?,
                        name: row.get(4)?,
                        continent: Continent::default(),
                    })
                },
            )
            .optional()?
            .unwrap_or_default();
        if ip.country.continent_id > 0 {
            ip.country.continent = conn
                .query_row(
                    "SELECT id, code, name FROM continents WHERE id = ?1",
                    params![ip.country.continent_id],
                    |row| {
                        Ok(Continent {
                            id: row.get(0)?,
                            code: row.get(1)?,
                            name: row.get(2)?,
                        })
                    },
                )
                .optional()?
                .unwrap_or_default();
        }
    }

    if ip.city_id > 0 {
        ip.city = conn
            .query_row(
                "SELECT id, country_id, name, metro_code, time_zone, population_density
                 FROM cities WHERE id = ?1",
                params![ip.city_id],
                |row| {
                    Ok(City {
                        id: row.get(0)?,
                        country_id: row.get(1)?,
                        name: row.get(2)?,
                        metro_code: row.get(3)?,
                        time_zone: row.get(4)?,
                        population_density: row.get(5)?,
                        regions: Vec::new(),
                    })
                },
            )
            .optional()?
            .unwrap_or_default();
        if ip.city.id > 0 {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.country_id, r.code, r.name
                 FROM regions r
                 JOIN city_regions cr ON cr.region_id = r.id
                 WHERE cr.city_id = ?1
                 ORDER BY r.id",
            )?;
            let regions = stmt.query_map(params![ip.city.id], |row| {
                Ok(Region {
                    id: row.get(0)?,
                    country_id: row.get(1)?,
                    code: row.get(2)?,
                    name: row.get(3)?,
                })
            })?;
            ip.city.regions = regions.collect::<Result<Vec<_>, _>>()?;
        }
    }

    if ip.postal_id > 0 {
        ip.postal = conn
            .query_row(
                "SELECT id, city_id, zip FROM postals WHERE id = ?1",
                params![ip.postal_id],
                |row| {
                    Ok(Postal {
                        id: row.get(0)?,
                        city_id: row.get(1)?,
                        zip: row.get(2)?,
                    })
                },
            )
            .optional()?
            .unwrap_or_default();
    }

    if ip.isp_id > 0 {
        ip.isp = conn
            .query_row(
                "SELECT id, name FROM isps WHERE id = ?1",
                params![ip.isp_id],
                |row| {
                    Ok(Isp {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .unwrap_or_default();
    }

    if ip.network_id > 0 {
        ip.network = conn
            .query_row(
                "SELECT id, network, domain FROM networks WHERE id = ?1",
                params![ip.network_id],
                |row| {
                    Ok(Network {
                        id: row.get(0)?,
                        network: row.get(1)?,
                        domain: row.get(2)?,
                    })
                },
            )
            .optional()?
            .unwrap_or_default();
    }

    if ip.organization_id > 0 {
        ip.organization = conn
            .query_row(
                "SELECT id, name FROM organizations WHERE id = ?1",
                params![ip.organization_id],
                |row| {
                    Ok(Organization {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .unwrap_or_default();
    }

    if ip.autonomous_system_id > 0 {
        ip.autonomous_system = conn
            .query_row(
                "SELECT id, number, name FROM autonomous_systems WHERE id = ?1",
                params![ip.autonomous_system_id],
                |row| {
                    Ok(AutonomousSystem {
                        id: row.get(0)?,
                        number: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?
            .unwrap_or_default();
    }

    let mut stmt = conn.prepare(
        "SELECT d.id, d.name, d.created_at, d.updated_at
         FROM domains d
         JOIN ip_domains link ON link.domain_id = d.id
         WHERE link.ip_id = ?1
         ORDER BY d.id",
    )?;
    let domains = stmt.query_map(params![ip.id], |row| {
        Ok(Domain {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    })?;
    ip.domains = domains.collect::<Result<Vec<_>, _>>()?;

    Ok(())
}
