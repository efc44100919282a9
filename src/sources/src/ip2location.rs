// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The IP2Location source: the PX-series proxy BIN database plus the CSV
//! bulk-seeding path.

use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use geoip_updater::{archive, Updater, UpdaterConfig, UpdaterEvent};

use crate::{BlockFn, MIN_BIN_ARCHIVE_BYTES};

mod bin;

pub use bin::ProxyDatabase;

/// Configuration for the IP2Location source.
#[derive(Debug, Clone)]
pub struct Ip2LocationConfig {
    pub token: String,
    /// BIN product, e.g. `PX8LITEBIN`.
    pub product_id: String,
    /// CSV product, e.g. `PX8LITECSV`.
    pub csv_product_id: String,
    pub downstream: String,
    pub update_interval: Duration,
    pub retry_interval: Duration,
}

/// One proxy-database answer. String fields are empty when the database has
/// no value (the upstream format uses a `-` sentinel).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyRecord {
    pub is_proxy: bool,
    pub proxy_type: String,
    pub country_short: String,
    pub country_long: String,
    pub region: String,
    pub city: String,
    pub isp: String,
    pub domain: String,
    pub usage_type: String,
    pub asn: String,
    pub as_name: String,
    pub last_seen: i64,
    pub threat: String,
}

/// One row of the proxy CSV product: an integer address range plus the same
/// columns the BIN database carries.
#[derive(Debug, Clone, Default)]
pub struct Ip2LocationRow {
    pub ip_from: u128,
    pub ip_to: u128,
    pub proxy_type: String,
    pub country_code: String,
    pub country_name: String,
    pub region: String,
    pub city: String,
    pub isp: String,
    pub domain: String,
    pub usage_type: String,
    pub asn: u32,
    pub as_name: String,
    pub last_seen: i64,
}

impl Ip2LocationRow {
    fn from_record(record: &csv::StringRecord) -> Ip2LocationRow {
        let cell = |i: usize| record.get(i).unwrap_or_default().to_string();
        Ip2LocationRow {
            ip_from: record.get(0).and_then(|v| v.parse().ok()).unwrap_or(0),
            ip_to: record.get(1).and_then(|v| v.parse().ok()).unwrap_or(0),
            proxy_type: cell(2),
            country_code: cell(3),
            country_name: cell(4),
            region: cell(5),
            city: cell(6),
            isp: cell(7),
            domain: cell(8),
            usage_type: cell(9),
            asn: record.get(10).and_then(|v| v.parse().ok()).unwrap_or(0),
            as_name: cell(11),
            last_seen: record.get(12).and_then(|v| v.parse().ok()).unwrap_or(0),
        }
    }
}

/// Converts a CSV range endpoint back into an address.
pub fn int_to_ip(n: u128) -> IpAddr {
    match u32::try_from(n) {
        Ok(v4) => IpAddr::V4(std::net::Ipv4Addr::from(v4)),
        Err(_) => IpAddr::V6(std::net::Ipv6Addr::from(n)),
    }
}

/// The IP2Location source.
pub struct Ip2Location {
    config: Ip2LocationConfig,
    db: RwLock<Option<ProxyDatabase>>,
    importing: AtomicI32,
    updaters: Mutex<Vec<Arc<Updater>>>,
}

impl Ip2Location {
    pub fn new(config: Ip2LocationConfig) -> Arc<Ip2Location> {
        Arc::new(Ip2Location {
            config,
            db: RwLock::new(None),
            importing: AtomicI32::new(0),
            updaters: Mutex::new(Vec::new()),
        })
    }

    fn download_url(&self, product: &str) -> String {
        format!(
            "https://{}/download/?token={}&file={}",
            self.config.downstream, self.config.token, product
        )
    }

    pub fn start(
        self: &Arc<Self>,
        root: &Path,
        events: UnboundedSender<UpdaterEvent>,
        on_row: Option<BlockFn<Ip2LocationRow>>,
    ) {
        let cache = root.join("cache");
        let mut updaters = Vec::new();

        let archive_path = cache.join(format!("{}.zip", self.config.product_id));
        let extracted_path = cache.join(format!("{}.bin", self.config.product_id));
        let i2l = Arc::clone(self);
        let reload_archive = archive_path.clone();
        let reload_extracted = extracted_path.clone();
        let updater = Updater::new(
            UpdaterConfig {
                name: "ip2location".into(),
                url: self.download_url(&self.config.product_id),
                archive_path,
                extracted_path,
                update_interval: self.config.update_interval,
                retry_interval: self.config.retry_interval,
            },
            Arc::new(move || {
                // An undersized artifact is rejected before the live reader
                // is touched.
                archive::check_min_size(&reload_archive, MIN_BIN_ARCHIVE_BYTES)?;
                archive::unpack_database(&reload_archive, &reload_extracted)?;
                let db = ProxyDatabase::open(&reload_extracted)?;
                *i2l.db.write().expect("poisoned") = Some(db);
                Ok(())
            }),
            events.clone(),
        );
        updater.start();
        updaters.push(updater);

        if let Some(on_row) = on_row {
            let csv_archive = cache.join(format!("{}.zip", self.config.csv_product_id));
            let i2l = Arc::clone(self);
            let reload_archive = csv_archive.clone();
            let updater = Updater::new(
                UpdaterConfig {
                    name: "ip2location-csv".into(),
                    url: self.download_url(&self.config.csv_product_id),
                    archive_path: csv_archive.clone(),
                    extracted_path: csv_archive,
                    update_interval: self.config.update_interval,
                    retry_interval: self.config.retry_interval,
                },
                Arc::new(move || {
                    if i2l.importing.load(Ordering::SeqCst) > 0 {
                        return Ok(());
                    }
                    i2l.importing.store(1, Ordering::SeqCst);
                    let result = import_csv_archive(&reload_archive, &on_row);
                    i2l.importing.store(0, Ordering::SeqCst);
                    result
                }),
                events,
            );
            updater.start();
            updaters.push(updater);
        }

        *self.updaters.lock().expect("poisoned") = updaters;
    }

    pub fn stop(&self) {
        for updater in self.updaters.lock().expect("poisoned").iter() {
            updater.stop();
        }
    }

    pub fn ready(&self) -> bool {
        self.db.read().expect("poisoned").is_some()
    }

    pub fn importing(&self) -> bool {
        self.importing.load(Ordering::SeqCst) > 0
    }

    /// Looks up the proxy database. Returns an empty record while the reader
    /// is unavailable or when the address has no row.
    pub fn lookup(&self, ip: IpAddr) -> ProxyRecord {
        let guard = self.db.read().expect("poisoned");
        match &*guard {
            Some(db) => db.lookup(ip).unwrap_or_default(),
            None => ProxyRecord::default(),
        }
    }
}

fn import_csv_archive(
    archive_path: &Path,
    on_row: &BlockFn<Ip2LocationRow>,
) -> Result<(), anyhow::Error> {
    info!("unpacking {}", archive_path.display());
    let dir = archive::unpack_zip_all(archive_path)?;
    let mut files: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    let file = files
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no csv files found in {}", dir.display()))?;
    import_rows(&file, on_row)
}

fn import_rows(path: &Path, on_row: &BlockFn<Ip2LocationRow>) -> Result<(), anyhow::Error> {
    info!("loading {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    for record in reader.records() {
        let record = record?;
        if record.len() != 13 {
            warn!("skipping row with {} columns", record.len());
            continue;
        }
        on_row(Ip2LocationRow::from_record(&record));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn int_to_ip_picks_family_by_magnitude() {
        assert_eq!(int_to_ip(16_777_217), "1.0.0.1".parse::<IpAddr>().unwrap());
        let v6 = int_to_ip(u128::from(u32::MAX) + 1);
        assert!(matches!(v6, IpAddr::V6(_)));
    }

    #[test]
    fn csv_rows_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("px.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "\"16777216\",\"16777471\",\"VPN\",\"US\",\"United States\",\"California\",\
             \"Los Angeles\",\"Example ISP\",\"example.com\",\"DCH\",\"13335\",\"Example AS\",\"5\""
        )
        .unwrap();
        drop(file);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink: BlockFn<Ip2LocationRow> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |row: Ip2LocationRow| seen.lock().unwrap().push(row))
        };
        import_rows(&path, &sink).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].ip_from, 16_777_216);
        assert_eq!(seen[0].ip_to, 16_777_471);
        assert_eq!(seen[0].proxy_type, "VPN");
        assert_eq!(seen[0].asn, 13_335);
        assert_eq!(seen[0].last_seen, 5);
    }
}
