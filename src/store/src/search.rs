// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Structured search over persisted IPs.
//!
//! The filter is an IP record template: every non-empty field narrows the
//! result, related entities match through subselects on their own tables,
//! and a center point plus accuracy radius (miles) turns into a lat/lon
//! bounding box via a small great-circle derivation.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::entities::IpRecord;
use crate::{Store, StoreError};

/// The search filter is the canonical record itself, used as a template.
pub type SearchFilter = IpRecord;

/// Sortable columns. Unknown sort keys fall back to `id`.
pub const SORT_KEYS: &[&str] = &[
    "id",
    "address",
    "latitude",
    "longitude",
    "accuracy_radius",
    "last_seen",
    "created_at",
    "updated_at",
];

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 1000;

/// Pagination controls, taken from the request's query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub direction: String,
}

impl PageParams {
    fn normalized(&self) -> (i64, i64, &'static str, &'static str) {
        let limit = match self.limit {
            l if l <= 0 => DEFAULT_LIMIT,
            l if l > MAX_LIMIT => MAX_LIMIT,
            l => l,
        };
        let page = self.page.max(1);
        let sort = SORT_KEYS
            .iter()
            .find(|k| **k == self.sort)
            .copied()
            .unwrap_or("id");
        let direction = if self.direction == "asc" { "asc" } else { "desc" };
        (limit, page, sort, direction)
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub rows: Vec<IpRecord>,
    pub total_rows: i64,
    pub total_pages: i64,
    pub limit: i64,
    pub page: i64,
    pub sort: String,
    pub direction: String,
}

impl Store {
    /// Runs a filtered, paginated query and hydrates the matching records.
    pub fn search(&self, filter: &SearchFilter, params: &PageParams) -> Result<Page, StoreError> {
        let (limit, page, sort, direction) = params.normalized();
        let (where_sql, args) = build_where(filter);

        let (total_rows, ids) = {
            let conn = self.conn();
            let total_rows: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM ips{where_sql}"),
                rusqlite::params_from_iter(args.iter()),
                |row| row.get(0),
            )?;

            let mut page_args = args;
            page_args.push(Value::Integer(limit));
            page_args.push(Value::Integer((page - 1) * limit));
            let mut stmt = conn.prepare(&format!(
                "SELECT id FROM ips{where_sql} ORDER BY {sort} {direction} LIMIT ? OFFSET ?"
            ))?;
            let ids = stmt
                .query_map(rusqlite::params_from_iter(page_args.iter()), |row| {
                    row.get::<_, i64>(0)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            (total_rows, ids)
        };

        let rows = self.find_ips_by_ids(&ids)?;
        Ok(Page {
            rows,
            total_rows,
            total_pages: ((total_rows + limit - 1) / limit).max(1),
            limit,
            page,
            sort: sort.to_string(),
            direction: direction.to_string(),
        })
    }
}

fn build_where(filter: &SearchFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    let mut like = |clauses: &mut Vec<String>, args: &mut Vec<Value>, column: &str, v: &str| {
        if !v.is_empty() {
            clauses.push(format!("{column} LIKE ?"));
            args.push(Value::Text(format!("%{v}%")));
        }
    };

    like(&mut clauses, &mut args, "address", &filter.address);

    for (column, set) in [
        ("is_anonymous", filter.is_anonymous),
        ("is_anonymous_proxy", filter.is_anonymous_proxy),
        ("is_anonymous_vpn", filter.is_anonymous_vpn),
        ("is_hosting_provider", filter.is_hosting_provider),
        ("is_public_proxy", filter.is_public_proxy),
        ("is_satellite_provider", filter.is_satellite_provider),
        ("is_tor_exit_node", filter.is_tor_exit_node),
    ] {
        if set {
            clauses.push(format!("{column} = 1"));
        }
    }

    like(&mut clauses, &mut args, "proxy_type", &filter.proxy_type);
    like(&mut clauses, &mut args, "usage_type", &filter.usage_type);
    like(&mut clauses, &mut args, "static_ip_score", &filter.static_ip_score);
    like(&mut clauses, &mut args, "threat", &filter.threat);
    if !filter.user_count.is_empty() {
        clauses.push("user_count = ?".into());
        args.push(Value::Text(filter.user_count.clone()));
    }

    if filter.latitude > 0.0 && filter.longitude > 0.0 {
        let radius = if filter.accuracy_radius > 0 {
            f64::from(filter.accuracy_radius)
        } else {
            100.0
        };
        let (north, _) = derived_position(filter.latitude, filter.longitude, radius, 0.0);
        let (_, east) = derived_position(filter.latitude, filter.longitude, radius, 90.0);
        let (south, _) = derived_position(filter.latitude, filter.longitude, radius, 180.0);
        let (_, west) = derived_position(filter.latitude, filter.longitude, radius, 270.0);
        clauses.push("latitude > ? AND latitude < ? AND longitude > ? AND longitude < ?".into());
        args.push(Value::Real(south));
        args.push(Value::Real(north));
        args.push(Value::Real(west));
        args.push(Value::Real(east));
    } else {
        if filter.latitude > 0.0 {
            clauses.push("latitude = ?".into());
            args.push(Value::Real(filter.latitude));
        }
        if filter.longitude > 0.0 {
            clauses.push("longitude = ?".into());
            args.push(Value::Real(filter.longitude));
        }
        if filter.accuracy_radius > 0 {
            clauses.push("accuracy_radius = ?".into());
            args.push(Value::Integer(i64::from(filter.accuracy_radius)));
        }
    }

    // Related entities narrow through subselects on their own tables.
    {
        let mut sub: Vec<String> = Vec::new();
        if filter.country.is_in_european_union {
            sub.push("is_in_european_union = 1".into());
        }
        if !filter.country.iso_code.is_empty() {
            sub.push("iso_code LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.country.iso_code)));
        }
        if !filter.country.name.is_empty() {
            sub.push("name LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.country.name)));
        }
        if !sub.is_empty() {
            clauses.push(format!(
                "country_id IN (SELECT id FROM countries WHERE {})",
                sub.join(" AND ")
            ));
        }
    }
    {
        let mut sub: Vec<String> = Vec::new();
        if !filter.country.continent.code.is_empty() {
            sub.push("code LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.country.continent.code)));
        }
        if !filter.country.continent.name.is_empty() {
            sub.push("name LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.country.continent.name)));
        }
        if !sub.is_empty() {
            clauses.push(format!(
                "country_id IN (SELECT id FROM countries WHERE continent_id IN \
                 (SELECT id FROM continents WHERE {}))",
                sub.join(" AND ")
            ));
        }
    }
    {
        let mut sub: Vec<String> = Vec::new();
        if filter.city.metro_code > 0 {
            sub.push("metro_code = ?".into());
            args.push(Value::Integer(i64::from(filter.city.metro_code)));
        }
        if filter.city.population_density > 0 {
            sub.push("population_density = ?".into());
            args.push(Value::Integer(i64::from(filter.city.population_density)));
        }
        if !filter.city.time_zone.is_empty() {
            sub.push("time_zone LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.city.time_zone)));
        }
        if !filter.city.name.is_empty() {
            sub.push("name LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.city.name)));
        }
        if !sub.is_empty() {
            clauses.push(format!(
                "city_id IN (SELECT id FROM cities WHERE {})",
                sub.join(" AND ")
            ));
        }
    }
    for region in &filter.city.regions {
        let mut sub: Vec<String> = Vec::new();
        if !region.name.is_empty() {
            sub.push("name LIKE ?".into());
            args.push(Value::Text(format!("%{}%", region.name)));
        }
        if !region.code.is_empty() {
            sub.push("code LIKE ?".into());
            args.push(Value::Text(format!("%{}%", region.code)));
        }
        if !sub.is_empty() {
            clauses.push(format!(
                "city_id IN (SELECT city_id FROM city_regions WHERE region_id IN \
                 (SELECT id FROM regions WHERE {}))",
                sub.join(" AND ")
            ));
        }
    }
    if !filter.postal.zip.is_empty() {
        clauses.push("postal_id IN (SELECT id FROM postals WHERE zip LIKE ?)".into());
        args.push(Value::Text(format!("%{}%", filter.postal.zip)));
    }
    if !filter.isp.name.is_empty() {
        clauses.push("isp_id IN (SELECT id FROM isps WHERE name LIKE ?)".into());
        args.push(Value::Text(format!("%{}%", filter.isp.name)));
    }
    if !filter.organization.name.is_empty() {
        clauses
            .push("organization_id IN (SELECT id FROM organizations WHERE name LIKE ?)".into());
        args.push(Value::Text(format!("%{}%", filter.organization.name)));
    }
    {
        let mut sub: Vec<String> = Vec::new();
        if !filter.network.network.is_empty() {
            sub.push("network LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.network.network)));
        }
        if !filter.network.domain.is_empty() {
            sub.push("domain LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.network.domain)));
        }
        if !sub.is_empty() {
            clauses.push(format!(
                "network_id IN (SELECT id FROM networks WHERE {})",
                sub.join(" AND ")
            ));
        }
    }
    {
        let mut sub: Vec<String> = Vec::new();
        if filter.autonomous_system.number > 0 {
            sub.push("number = ?".into());
            args.push(Value::Integer(i64::from(filter.autonomous_system.number)));
        }
        if !filter.autonomous_system.name.is_empty() {
            sub.push("name LIKE ?".into());
            args.push(Value::Text(format!("%{}%", filter.autonomous_system.name)));
        }
        if !sub.is_empty() {
            clauses.push(format!(
                "autonomous_system_id IN (SELECT id FROM autonomous_systems WHERE {})",
                sub.join(" AND ")
            ));
        }
    }
    if !filter.domains.is_empty() {
        let placeholders = vec!["?"; filter.domains.len()].join(", ");
        clauses.push(format!(
            "id IN (SELECT ip_id FROM ip_domains WHERE domain_id IN \
             (SELECT id FROM domains WHERE name IN ({placeholders})))"
        ));
        for domain in &filter.domains {
            args.push(Value::Text(domain.name.clone()));
        }
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }
}

const EARTH_RADIUS_MILES: f64 = 3959.0;

/// The point `distance` miles from the center along the given true course.
pub fn derived_position(lat: f64, lon: f64, distance: f64, bearing: f64) -> (f64, f64) {
    let lat_a = lat.to_radians();
    let lon_a = lon.to_radians();
    let angular = distance / EARTH_RADIUS_MILES;
    let course = bearing.to_radians();

    let new_lat =
        (lat_a.sin() * angular.cos() + lat_a.cos() * angular.sin() * course.cos()).asin();
    let dlon = (course.sin() * angular.sin() * lat_a.cos())
        .atan2(angular.cos() - lat_a.sin() * new_lat.sin());
    let new_lon = (lon_a + dlon + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI)
        - std::f64::consts::PI;

    (new_lat.to_degrees(), new_lon.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_positions_surround_the_center() {
        let (lat, lon) = (52.52, 13.40);
        let (north, _) = derived_position(lat, lon, 50.0, 0.0);
        let (_, east) = derived_position(lat, lon, 50.0, 90.0);
        let (south, _) = derived_position(lat, lon, 50.0, 180.0);
        let (_, west) = derived_position(lat, lon, 50.0, 270.0);
        assert!(north > lat && south < lat);
        assert!(east > lon && west < lon);
        // 50 miles is under one degree of latitude.
        assert!(north - lat < 1.0);
    }

    #[test]
    fn limit_clamps_and_defaults() {
        let params = PageParams {
            limit: 5000,
            page: 0,
            sort: "drop table".into(),
            direction: "sideways".into(),
        };
        assert_eq!(params.normalized(), (1000, 1, "id", "desc"));

        let params = PageParams::default();
        assert_eq!(params.normalized(), (10, 1, "id", "desc"));

        let params = PageParams {
            limit: 25,
            page: 3,
            sort: "latitude".into(),
            direction: "asc".into(),
        };
        assert_eq!(params.normalized(), (25, 3, "latitude", "asc"));
    }

    #[test]
    fn empty_filter_builds_no_where_clause() {
        let (sql, args) = build_where(&SearchFilter::default());
        assert_eq!(sql, "");
        assert!(args.is_empty());
    }

    #[test]
    fn bbox_clause_replaces_exact_coordinate_match() {
        let filter = SearchFilter {
            latitude: 52.52,
            longitude: 13.40,
            accuracy_radius: 50,
            ..Default::default()
        };
        let (sql, args) = build_where(&filter);
        assert!(sql.contains("latitude > ? AND latitude < ?"));
        assert_eq!(args.len(), 4);
    }
}
