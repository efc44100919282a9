// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

// BEGIN LINT CONFIG
// DO NOT EDIT. Automatically generated by bin/gen-lints.
// Have complaints about the noise? See the note in misc/python/materialize/cli/gen-lints.py first.
#![allow(clippy::style)]
#![allow(clippy::complexity)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::mutable_key_type)]
#![allow(clippy::stable_sort_primitive)]
#![allow(clippy::map_entry)]
#![allow(clippy::box_default)]
#![warn(clippy::bool_comparison)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::no_effect)]
#![warn(clippy::unnecessary_unwrap)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::todo)]
#![warn(clippy::wildcard_dependencies)]
#![warn(clippy::zero_prefixed_literal)]
#![warn(clippy::borrowed_box)]
#![warn(clippy::deref_addrof)]
#![warn(clippy::double_must_use)]
#![warn(clippy::double_parens)]
#![warn(clippy::extra_unused_lifetimes)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_question_mark)]
#![warn(clippy::needless_return)]
#![warn(clippy::redundant_pattern)]
#![warn(clippy::redundant_slicing)]
#![warn(clippy::redundant_static_lifetimes)]
#![warn(clippy::single_component_path_imports)]
#![warn(clippy::unnecessary_cast)]
#![warn(clippy::useless_asref)]
#![warn(clippy::useless_conversion)]
#![warn(clippy::builtin_type_shadow)]
#![warn(clippy::duplicate_underscore_argument)]
#![warn(clippy::double_neg)]
#![warn(clippy::unnecessary_mut_passed)]
#![warn(clippy::wildcard_in_or_patterns)]
#![warn(clippy::crosspointer_transmute)]
#![warn(clippy::excessive_precision)]
#![warn(clippy::overflow_check_conditional)]
#![warn(clippy::as_conversions)]
#![warn(clippy::match_overlapping_arm)]
#![warn(clippy::zero_divided_by_zero)]
#![warn(clippy::must_use_unit)]
#![warn(clippy::suspicious_assignment_formatting)]
#![warn(clippy::suspicious_else_formatting)]
#![warn(clippy::suspicious_unary_op_formatting)]
#![warn(clippy::mut_mutex_lock)]
#![warn(clippy::print_literal)]
#![warn(clippy::same_item_push)]
#![warn(clippy::useless_format)]
#![warn(clippy::write_literal)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::redundant_closure_call)]
#![warn(clippy::unnecessary_lazy_evaluations)]
#![warn(clippy::partialeq_ne_impl)]
#![warn(clippy::redundant_field_names)]
#![warn(clippy::transmutes_expressible_as_ptr_casts)]
#![warn(clippy::unused_async)]
#![warn(clippy::disallowed_methods)]
#![warn(clippy::disallowed_macros)]
#![warn(clippy::disallowed_types)]
#![warn(clippy::from_over_into)]
// END LINT CONFIG

//! SQLite persistence for the canonical entity model.
//!
//! Every entity exposes one idempotent upsert keyed on its uniqueness
//! columns: select, insert when absent, overwrite a fixed subset of fields
//! when a later ingest brought strictly more information. Rows are never
//! deleted. Writes are serialized on the shared connection; readers see
//! whole rows or nothing. Contention surfaces as a typed retryable error so
//! callers can re-enqueue instead of string-matching messages.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

mod entities;
mod query;
mod search;
mod upsert;

pub use entities::{
    AutonomousSystem, City, Continent, Country, Domain, IpRecord, Isp, Network, NewIp,
    Organization, Postal, Region, Statistics,
};
pub use search::{Page, PageParams, SearchFilter, SORT_KEYS};

/// An error from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Whether the operation may succeed if retried: lock contention and
    /// unique-key races qualify, everything else is fatal to the job.
    pub fn is_retryable(&self) -> bool {
        let StoreError::Sqlite(e) = self;
        match e {
            rusqlite::Error::SqliteFailure(ffi_err, _) => matches!(
                ffi_err.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::ConstraintViolation
            ),
            _ => false,
        }
    }
}

/// A handle on the entity store. Cheap to clone; all clones share one
/// serialized connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (and migrates) the database at `path`. Failure here is fatal to
    /// the process.
    pub fn open(path: &Path) -> Result<Store, StoreError> {
        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                return Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("creating {}: {e}", dir.display())),
                )));
            }
        }
        let conn = Connection::open(path)?;
        // WAL keeps readers from blocking the single writer. The pragma
        // reports the resulting mode as a row.
        let _: String = conn.query_row("PRAGMA journal_mode = wal", [], |row| row.get(0))?;
        let store = Store {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// An in-memory store, for tests.
    pub fn open_in_memory() -> Result<Store, StoreError> {
        let store = Store {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.migrate()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> MutexGuard<Connection> {
        self.conn.lock().expect("poisoned")
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS continents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS countries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    continent_id INTEGER NOT NULL,
    iso_code TEXT NOT NULL DEFAULT '',
    is_in_european_union INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (iso_code, continent_id)
);
CREATE INDEX IF NOT EXISTS idx_countries_continent ON countries (continent_id);
CREATE TABLE IF NOT EXISTS regions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_id INTEGER NOT NULL,
    code TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (name, country_id)
);
CREATE TABLE IF NOT EXISTS cities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_id INTEGER NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    metro_code INTEGER NOT NULL DEFAULT 0,
    time_zone TEXT NOT NULL DEFAULT '',
    population_density INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (name, country_id)
);
CREATE TABLE IF NOT EXISTS city_regions (
    city_id INTEGER NOT NULL,
    region_id INTEGER NOT NULL,
    PRIMARY KEY (city_id, region_id)
);
CREATE TABLE IF NOT EXISTS postals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city_id INTEGER NOT NULL,
    zip TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS isps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS organizations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS networks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    network TEXT NOT NULL DEFAULT '',
    domain TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (network, domain)
);
CREATE TABLE IF NOT EXISTS autonomous_systems (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS ips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    isp_id INTEGER NOT NULL DEFAULT 0,
    network_id INTEGER NOT NULL DEFAULT 0,
    country_id INTEGER NOT NULL DEFAULT 0,
    city_id INTEGER NOT NULL DEFAULT 0,
    postal_id INTEGER NOT NULL DEFAULT 0,
    organization_id INTEGER NOT NULL DEFAULT 0,
    autonomous_system_id INTEGER NOT NULL DEFAULT 0,
    address TEXT NOT NULL UNIQUE,
    is_anonymous INTEGER NOT NULL DEFAULT 0,
    is_anonymous_proxy INTEGER NOT NULL DEFAULT 0,
    is_anonymous_vpn INTEGER NOT NULL DEFAULT 0,
    is_hosting_provider INTEGER NOT NULL DEFAULT 0,
    is_public_proxy INTEGER NOT NULL DEFAULT 0,
    is_satellite_provider INTEGER NOT NULL DEFAULT 0,
    is_tor_exit_node INTEGER NOT NULL DEFAULT 0,
    proxy_type TEXT NOT NULL DEFAULT '',
    usage_type TEXT NOT NULL DEFAULT '',
    static_ip_score TEXT NOT NULL DEFAULT '',
    threat TEXT NOT NULL DEFAULT '',
    user_count TEXT NOT NULL DEFAULT '',
    latitude REAL NOT NULL DEFAULT 0,
    longitude REAL NOT NULL DEFAULT 0,
    accuracy_radius INTEGER NOT NULL DEFAULT 0,
    last_seen INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS ip_domains (
    ip_id INTEGER NOT NULL,
    domain_id INTEGER NOT NULL,
    PRIMARY KEY (ip_id, domain_id)
);
";

/// The current wall-clock time in the stored timestamp format.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Rounds a coordinate to the stored precision of four decimal places.
pub fn round_coord(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_coord_is_idempotent() {
        for x in [0.0, 1.23456789, -52.520008, 179.99995, -0.00004, 13.404954] {
            let once = round_coord(x);
            assert_eq!(round_coord(once), once, "x = {x}");
        }
    }

    #[test]
    fn round_coord_half_up() {
        assert_eq!(round_coord(1.23456), 1.2346);
        assert_eq!(round_coord(52.520008), 52.52);
        assert_eq!(round_coord(-13.404954), -13.405);
    }

    #[test]
    fn retryable_classification() {
        let busy = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        ));
        assert!(busy.is_retryable());
        let constraint = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: ips.address".into()),
        ));
        assert!(constraint.is_retryable());
        let misuse = StoreError::Sqlite(rusqlite::Error::InvalidQuery);
        assert!(!misuse.is_retryable());
    }
}
