// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Find-or-create-or-update operations, one per entity.
//!
//! Each upsert selects by the entity's uniqueness key, inserts when absent,
//! and otherwise overwrites only the fields a later observation is allowed
//! to improve. Calling an upsert twice with the same input changes nothing
//! the second time.

use rusqlite::{params, OptionalExtension};

use crate::entities::{
    AutonomousSystem, City, Continent, Country, Domain, Isp, Network, NewIp, Organization, Postal,
    Region,
};
use crate::{now, round_coord, IpRecord, Store, StoreError};

impl Store {
    /// Upserts a continent by code. The name is only ever improved, never
    /// blanked.
    pub fn upsert_continent(&self, code: &str, name: &str) -> Result<Continent, StoreError> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, code, name FROM continents WHERE code = ?1",
                params![code],
                |row| {
                    Ok(Continent {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO continents (code, name, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)",
                    params![code, name, ts],
                )?;
                Ok(Continent {
                    id: conn.last_insert_rowid(),
                    code: code.into(),
                    name: name.into(),
                })
            }
            Some(mut existing) => {
                if !name.is_empty() && existing.name != name {
                    conn.execute(
                        "UPDATE continents SET name = ?1, updated_at = ?2 WHERE id = ?3",
                        params![name, now(), existing.id],
                    )?;
                    existing.name = name.into();
                }
                Ok(existing)
            }
        }
    }

    /// Upserts a country by (iso_code, continent). An empty name falls back
    /// to the bundled static dataset.
    pub fn upsert_country(
        &self,
        continent_id: i64,
        iso_code: &str,
        is_in_european_union: bool,
        name: &str,
    ) -> Result<Country, StoreError> {
        let mut name = name.to_string();
        if name.is_empty() {
            name = geoip_countries::name_for(iso_code).to_string();
        }

        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, continent_id, iso_code, is_in_european_union, name
                 FROM countries WHERE iso_code = ?1 AND continent_id = ?2",
                params![iso_code, continent_id],
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
            .optional()?;
        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO countries
                         (continent_id, iso_code, is_in_european_union, name,
                          created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![continent_id, iso_code, is_in_european_union, name, ts],
                )?;
                Ok(Country {
                    id: conn.last_insert_rowid(),
                    continent_id,
                    iso_code: iso_code.into(),
                    is_in_european_union,
                    name,
                    continent: Continent::default(),
                })
            }
            Some(mut existing) => {
                if existing.name.is_empty()
                    || existing.is_in_european_union != is_in_european_union
                    || existing.continent_id != continent_id
                {
                    if existing.name.is_empty() {
                        existing.name = name;
                    }
                    existing.is_in_european_union = is_in_european_union;
                    existing.continent_id = continent_id;
                    conn.execute(
                        "UPDATE countries
                         SET name = ?1, is_in_european_union = ?2, continent_id = ?3,
                             updated_at = ?4
                         WHERE id = ?5",
                        params![
                            existing.name,
                            existing.is_in_european_union,
                            existing.continent_id,
                            now(),
                            existing.id
                        ],
                    )?;
                }
                Ok(existing)
            }
        }
    }

    /// Upserts a region by (name, country).
    pub fn upsert_region(
        &self,
        country_id: i64,
        code: &str,
        name: &str,
    ) -> Result<Region, StoreError> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, country_id, code, name FROM regions
                 WHERE name = ?1 AND country_id = ?2",
                params![name, country_id],
                |row| {
                    Ok(Region {
                        id: row.get(0)?,
                        country_id: row.get(1)?,
                        code: row.get(2)?,
                        name: row.get(3)?,
                    })
                },
            )
            .optional()?;
        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO regions (country_id, code, name, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![country_id, code, name, ts],
                )?;
                Ok(Region {
                    id: conn.last_insert_rowid(),
                    country_id,
                    code: code.into(),
                    name: name.into(),
                })
            }
            Some(mut existing) => {
                if existing.country_id != country_id || existing.code != code {
                    existing.country_id = country_id;
                    existing.code = code.into();
                    conn.execute(
                        "UPDATE regions SET country_id = ?1, code = ?2, updated_at = ?3
                         WHERE id = ?4",
                        params![country_id, code, now(), existing.id],
                    )?;
                }
                Ok(existing)
            }
        }
    }

    /// Upserts a city by (name, country). Location details always track the
    /// latest observation.
    pub fn upsert_city(
        &self,
        country_id: i64,
        name: &str,
        metro_code: u32,
        time_zone: &str,
        population_density: u32,
    ) -> Result<City, StoreError> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, country_id, name, metro_code, time_zone, population_density
                 FROM cities WHERE name = ?1 AND country_id = ?2",
                params![name, country_id],
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
            .optional()?;
        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO cities
                         (country_id, name, metro_code, time_zone, population_density,
                          created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![country_id, name, metro_code, time_zone, population_density, ts],
                )?;
                Ok(City {
                    id: conn.last_insert_rowid(),
                    country_id,
                    name: name.into(),
                    metro_code,
                    time_zone: time_zone.into(),
                    population_density,
                    regions: Vec::new(),
                })
            }
            Some(mut existing) => {
                existing.metro_code = metro_code;
                existing.time_zone = time_zone.into();
                existing.population_density = population_density;
                conn.execute(
                    "UPDATE cities
                     SET metro_code = ?1, time_zone = ?2, population_density = ?3,
                         updated_at = ?4
                     WHERE id = ?5",
                    params![metro_code, time_zone, population_density, now(), existing.id],
                )?;
                Ok(existing)
            }
        }
    }

    /// Replaces a city's subdivision set.
    pub fn set_city_regions(&self, city_id: i64, region_ids: &[i64]) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute("DELETE FROM city_regions WHERE city_id = ?1", params![city_id])?;
        for region_id in region_ids {
            conn.execute(
                "INSERT OR IGNORE INTO city_regions (city_id, region_id) VALUES (?1, ?2)",
                params![city_id, region_id],
            )?;
        }
        Ok(())
    }

    /// Upserts a postal code. Insert-only; a zip's city binding is fixed at
    /// first observation.
    pub fn upsert_postal(&self, city_id: i64, zip: &str) -> Result<Postal, StoreError> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, city_id, zip FROM postals WHERE zip = ?1",
                params![zip],
                |row| {
                    Ok(Postal {
                        id: row.get(0)?,
                        city_id: row.get(1)?,
                        zip: row.get(2)?,
                    })
                },
            )
            .optional()?;
        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO postals (city_id, zip, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)",
                    params![city_id, zip, ts],
                )?;
                Ok(Postal {
                    id: conn.last_insert_rowid(),
                    city_id,
                    zip: zip.into(),
                })
            }
            Some(existing) => Ok(existing),
        }
    }

    pub fn upsert_isp(&self, name: &str) -> Result<Isp, StoreError> {
        let id = self.upsert_named("isps", name)?;
        Ok(Isp {
            id,
            name: name.into(),
        })
    }

    pub fn upsert_organization(&self, name: &str) -> Result<Organization, StoreError> {
        let id = self.upsert_named("organizations", name)?;
        Ok(Organization {
            id,
            name: name.into(),
        })
    }

    pub fn upsert_domain(&self, name: &str) -> Result<Domain, StoreError> {
        let id = self.upsert_named("domains", name)?;
        Ok(Domain {
            id,
            name: name.into(),
            ..Default::default()
        })
    }

    /// Shared insert-only upsert for entities keyed solely by name.
    fn upsert_named(&self, table: &str, name: &str) -> Result<i64, StoreError> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                &format!("SELECT id FROM {table} WHERE name = ?1"),
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match existing {
            Some(id) => Ok(id),
            None => {
                let ts = now();
                conn.execute(
                    &format!(
                        "INSERT INTO {table} (name, created_at, updated_at) VALUES (?1, ?2, ?2)"
                    ),
                    params![name, ts],
                )?;
                Ok(conn.last_insert_rowid())
            }
        }
    }

    /// Upserts a network block by (network, domain). Insert-only.
    pub fn upsert_network(&self, network: &str, domain: &str) -> Result<Network, StoreError> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, network, domain FROM networks
                 WHERE network = ?1 AND domain = ?2",
                params![network, domain],
                |row| {
                    Ok(Network {
                        id: row.get(0)?,
                        network: row.get(1)?,
                        domain: row.get(2)?,
                    })
                },
            )
            .optional()?;
        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO networks (network, domain, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)",
                    params![network, domain, ts],
                )?;
                Ok(Network {
                    id: conn.last_insert_rowid(),
                    network: network.into(),
                    domain: domain.into(),
                })
            }
            Some(existing) => Ok(existing),
        }
    }

    /// Upserts an autonomous system by number; the name tracks the latest
    /// observation.
    pub fn upsert_autonomous_system(
        &self,
        number: u32,
        name: &str,
    ) -> Result<AutonomousSystem, StoreError> {
        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, number, name FROM autonomous_systems WHERE number = ?1",
                params![number],
                |row| {
                    Ok(AutonomousSystem {
                        id: row.get(0)?,
                        number: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO autonomous_systems (number, name, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)",
                    params![number, name, ts],
                )?;
                Ok(AutonomousSystem {
                    id: conn.last_insert_rowid(),
                    number,
                    name: name.into(),
                })
            }
            Some(mut existing) => {
                if existing.name != name && !name.is_empty() {
                    existing.name = name.into();
                    conn.execute(
                        "UPDATE autonomous_systems SET name = ?1, updated_at = ?2 WHERE id = ?3",
                        params![name, now(), existing.id],
                    )?;
                }
                Ok(existing)
            }
        }
    }

    /// Upserts an IP row by address, rewriting only the fields a newer
    /// observation may legitimately change. Returns the flat row; read paths
    /// hydrate separately.
    pub fn upsert_ip(&self, new: &NewIp) -> Result<IpRecord, StoreError> {
        let latitude = round_coord(new.latitude);
        let longitude = round_coord(new.longitude);

        let conn = self.conn();
        let existing = conn
            .query_row(
                "SELECT id, country_id, city_id,
                        is_anonymous, is_anonymous_proxy, is_anonymous_vpn,
                        is_hosting_provider, is_public_proxy, is_satellite_provider,
                        is_tor_exit_node, latitude, longitude, accuracy_radius,
                        static_ip_score, user_count
                 FROM ips WHERE address = ?1",
                params![new.address],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, bool>(7)?,
                        row.get::<_, bool>(8)?,
                        row.get::<_, bool>(9)?,
                        row.get::<_, f64>(10)?,
                        row.get::<_, f64>(11)?,
                        row.get::<_, u32>(12)?,
                        row.get::<_, String>(13)?,
                        row.get::<_, String>(14)?,
                    ))
                },
            )
            .optional()?;

        match existing {
            None => {
                let ts = now();
                conn.execute(
                    "INSERT INTO ips
                         (isp_id, network_id, country_id, city_id, postal_id,
                          organization_id, autonomous_system_id, address,
                          is_anonymous, is_anonymous_proxy, is_anonymous_vpn,
                          is_hosting_provider, is_public_proxy, is_satellite_provider,
                          is_tor_exit_node, proxy_type, usage_type, static_ip_score,
                          threat, user_count, latitude, longitude, accuracy_radius,
                          last_seen, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                             ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                             ?25, ?25)",
                    params![
                        new.isp_id,
                        new.network_id,
                        new.country_id,
                        new.city_id,
                        new.postal_id,
                        new.organization_id,
                        new.autonomous_system_id,
                        new.address,
                        new.is_anonymous,
                        new.is_anonymous_proxy,
                        new.is_anonymous_vpn,
                        new.is_hosting_provider,
                        new.is_public_proxy,
                        new.is_satellite_provider,
                        new.is_tor_exit_node,
                        new.proxy_type,
                        new.usage_type,
                        new.static_ip_score,
                        new.threat,
                        new.user_count,
                        latitude,
                        longitude,
                        new.accuracy_radius,
                        new.last_seen,
                        ts,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                drop(conn);
                self.flat_ip(id)
            }
            Some((
                id,
                country_id,
                city_id,
                is_anonymous,
                is_anonymous_proxy,
                is_anonymous_vpn,
                is_hosting_provider,
                is_public_proxy,
                is_satellite_provider,
                is_tor_exit_node,
                old_latitude,
                old_longitude,
                accuracy_radius,
                static_ip_score,
                user_count,
            )) => {
                let changed = country_id != new.country_id
                    || city_id != new.city_id
                    || is_anonymous != new.is_anonymous
                    || is_anonymous_proxy != new.is_anonymous_proxy
                    || is_anonymous_vpn != new.is_anonymous_vpn
                    || is_hosting_provider != new.is_hosting_provider
                    || is_public_proxy != new.is_public_proxy
                    || is_satellite_provider != new.is_satellite_provider
                    || is_tor_exit_node != new.is_tor_exit_node
                    || old_latitude != latitude
                    || old_longitude != longitude
                    || accuracy_radius != new.accuracy_radius
                    || static_ip_score != new.static_ip_score
                    || user_count != new.user_count;
                if changed {
                    conn.execute(
                        "UPDATE ips
                         SET country_id = ?1, city_id = ?2, is_anonymous = ?3,
                             is_anonymous_proxy = ?4, is_anonymous_vpn = ?5,
                             is_hosting_provider = ?6, is_public_proxy = ?7,
                             is_satellite_provider = ?8, is_tor_exit_node = ?9,
                             latitude = ?10, longitude = ?11, accuracy_radius = ?12,
                             static_ip_score = ?13, user_count = ?14, updated_at = ?15
                         WHERE id = ?16",
                        params![
                            new.country_id,
                            new.city_id,
                            new.is_anonymous,
                            new.is_anonymous_proxy,
                            new.is_anonymous_vpn,
                            new.is_hosting_provider,
                            new.is_public_proxy,
                            new.is_satellite_provider,
                            new.is_tor_exit_node,
                            latitude,
                            longitude,
                            new.accuracy_radius,
                            new.static_ip_score,
                            new.user_count,
                            now(),
                            id,
                        ],
                    )?;
                }
                drop(conn);
                self.flat_ip(id)
            }
        }
    }

    /// Unions new domain associations into an IP's set; existing links are
    /// never removed.
    pub fn add_ip_domains(&self, ip_id: i64, domain_ids: &[i64]) -> Result<(), StoreError> {
        let conn = self.conn();
        for domain_id in domain_ids {
            conn.execute(
                "INSERT OR IGNORE INTO ip_domains (ip_id, domain_id) VALUES (?1, ?2)",
                params![ip_id, domain_id],
            )?;
        }
        Ok(())
    }
}
