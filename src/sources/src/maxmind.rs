// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The MaxMind source: City and ASN binary databases plus the City CSV
//! bulk-seeding path.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use memmap2::Mmap;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use geoip_updater::{archive, Updater, UpdaterConfig, UpdaterEvent};

use crate::{BlockFn, MIN_ARCHIVE_BYTES};

/// Configuration for the MaxMind source.
#[derive(Debug, Clone)]
pub struct MaxMindConfig {
    pub license_key: String,
    /// Product family, e.g. `GeoLite2`. Edition suffixes are appended.
    pub product_id: String,
    /// Download host.
    pub downstream: String,
    pub update_interval: Duration,
    pub retry_interval: Duration,
}

/// One row of a `*-Blocks-IPv{4,6}.csv` file.
#[derive(Debug, Clone, Default)]
pub struct MaxMindBlock {
    pub network: String,
    pub geoname_id: u32,
    pub registered_country_geoname_id: u32,
    pub represented_country_geoname_id: u32,
    pub is_anonymous_proxy: bool,
    pub is_satellite_provider: bool,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_radius: u32,
}

impl MaxMindBlock {
    fn from_record(record: &csv::StringRecord) -> MaxMindBlock {
        MaxMindBlock {
            network: record.get(0).unwrap_or_default().to_string(),
            geoname_id: record.get(1).and_then(|v| v.parse().ok()).unwrap_or(0),
            registered_country_geoname_id: record.get(2).and_then(|v| v.parse().ok()).unwrap_or(0),
            represented_country_geoname_id: record.get(3).and_then(|v| v.parse().ok()).unwrap_or(0),
            is_anonymous_proxy: record.get(4) == Some("1"),
            is_satellite_provider: record.get(5) == Some("1"),
            postal_code: record.get(6).unwrap_or_default().to_string(),
            latitude: record.get(7).and_then(|v| v.parse().ok()).unwrap_or(0.0),
            longitude: record.get(8).and_then(|v| v.parse().ok()).unwrap_or(0.0),
            accuracy_radius: record.get(9).and_then(|v| v.parse().ok()).unwrap_or(0),
        }
    }
}

fn english(names: &Option<BTreeMap<String, String>>) -> &str {
    names
        .as_ref()
        .and_then(|names| names.get("en"))
        .map(String::as_str)
        .unwrap_or("")
}

/// The City database's continent block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoContinent {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub names: Option<BTreeMap<String, String>>,
}

impl GeoContinent {
    pub fn name_en(&self) -> &str {
        english(&self.names)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoCountry {
    #[serde(default)]
    pub iso_code: Option<String>,
    #[serde(default)]
    pub continent_code: Option<String>,
    #[serde(default)]
    pub is_in_european_union: bool,
    #[serde(default)]
    pub names: Option<BTreeMap<String, String>>,
}

impl GeoCountry {
    pub fn name_en(&self) -> &str {
        english(&self.names)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoSubdivision {
    #[serde(default)]
    pub iso_code: Option<String>,
    #[serde(default)]
    pub names: Option<BTreeMap<String, String>>,
}

impl GeoSubdivision {
    pub fn name_en(&self) -> &str {
        english(&self.names)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoCity {
    #[serde(default)]
    pub names: Option<BTreeMap<String, String>>,
}

impl GeoCity {
    pub fn name_en(&self) -> &str {
        english(&self.names)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoLocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub accuracy_radius: Option<u32>,
    #[serde(default)]
    pub metro_code: Option<u32>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub population_density: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoPostal {
    #[serde(default)]
    pub code: Option<String>,
}

/// The traits block of the City (or Insights) database.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoTraits {
    #[serde(default)]
    pub autonomous_system_number: Option<u32>,
    #[serde(default)]
    pub autonomous_system_organization: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
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
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub static_ip_score: Option<f64>,
    #[serde(default)]
    pub user_count: Option<u32>,
    #[serde(default)]
    pub user_type: Option<String>,
}

/// The default City database query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoRecord {
    #[serde(default)]
    pub continent: GeoContinent,
    #[serde(default)]
    pub country: GeoCountry,
    #[serde(default)]
    pub subdivisions: Vec<GeoSubdivision>,
    #[serde(default)]
    pub city: GeoCity,
    #[serde(default)]
    pub location: GeoLocation,
    #[serde(default)]
    pub postal: GeoPostal,
    #[serde(default)]
    pub traits: GeoTraits,
}

/// The ASN database query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AsnRecord {
    #[serde(default)]
    pub autonomous_system_number: Option<u32>,
    #[serde(default)]
    pub autonomous_system_organization: Option<String>,
}

type MmdbReader = maxminddb::Reader<Mmap>;

/// The MaxMind source. Holds two live readers (City and ASN), each swapped
/// atomically by its own updater, plus the CSV seeding updater.
pub struct MaxMind {
    config: MaxMindConfig,
    city: RwLock<Option<MmdbReader>>,
    asn: RwLock<Option<MmdbReader>>,
    importing: AtomicI32,
    updaters: Mutex<Vec<Arc<Updater>>>,
}

impl MaxMind {
    pub fn new(config: MaxMindConfig) -> Arc<MaxMind> {
        Arc::new(MaxMind {
            config,
            city: RwLock::new(None),
            asn: RwLock::new(None),
            importing: AtomicI32::new(0),
            updaters: Mutex::new(Vec::new()),
        })
    }

    fn download_url(&self, edition: &str, suffix: &str) -> String {
        format!(
            "https://{}/app/geoip_download?edition_id={}&date=&license_key={}&suffix={}",
            self.config.downstream, edition, self.config.license_key, suffix
        )
    }

    /// Starts the City, ASN, and CSV updaters. `on_block` receives every CSV
    /// block row; pass `None` to disable bulk seeding.
    pub fn start(
        self: &Arc<Self>,
        root: &Path,
        events: UnboundedSender<UpdaterEvent>,
        on_block: Option<BlockFn<MaxMindBlock>>,
    ) {
        let cache = root.join("cache");
        let product = &self.config.product_id;

        let mut updaters = Vec::new();
        let editions: [(&str, InstallFn); 2] = [
            (
                "City",
                Arc::new(|mm: &MaxMind, reader| *mm.city.write().expect("poisoned") = Some(reader)),
            ),
            (
                "ASN",
                Arc::new(|mm: &MaxMind, reader| *mm.asn.write().expect("poisoned") = Some(reader)),
            ),
        ];
        for (edition, install) in editions {
            let archive_path = cache.join(format!("{product}-{edition}.tar.gz"));
            let extracted_path = cache.join(format!("{product}-{edition}.mmdb"));
            let mm = Arc::clone(self);
            let reload_archive = archive_path.clone();
            let reload_extracted = extracted_path.clone();
            let updater = Updater::new(
                UpdaterConfig {
                    name: format!("maxmind-{}", edition.to_lowercase()),
                    url: self.download_url(&format!("{product}-{edition}"), "tar.gz"),
                    archive_path,
                    extracted_path,
                    update_interval: self.config.update_interval,
                    retry_interval: self.config.retry_interval,
                },
                Arc::new(move || {
                    archive::check_min_size(&reload_archive, MIN_ARCHIVE_BYTES)?;
                    archive::unpack_database(&reload_archive, &reload_extracted)?;
                    let reader = maxminddb::Reader::open_mmap(&reload_extracted)?;
                    install(&mm, reader);
                    Ok(())
                }),
                events.clone(),
            );
            updater.start();
            updaters.push(updater);
        }

        if let Some(on_block) = on_block {
            let csv_archive = cache.join(format!("{product}-City-CSV.zip"));
            let mm = Arc::clone(self);
            let product = product.clone();
            let reload_archive = csv_archive.clone();
            let updater = Updater::new(
                UpdaterConfig {
                    name: "maxmind-csv".into(),
                    url: self.download_url(&format!("{product}-City-CSV"), "zip"),
                    archive_path: csv_archive.clone(),
                    extracted_path: csv_archive,
                    update_interval: self.config.update_interval,
                    retry_interval: self.config.retry_interval,
                },
                Arc::new(move || {
                    // A refresh that lands while the previous import is still
                    // replaying is skipped; the next poll picks it up.
                    if mm.importing.load(Ordering::SeqCst) > 0 {
                        return Ok(());
                    }
                    mm.importing.store(2, Ordering::SeqCst);
                    let dir = match archive::unpack_zip_all(&reload_archive) {
                        Ok(dir) => dir,
                        Err(e) => {
                            mm.importing.store(0, Ordering::SeqCst);
                            return Err(e.into());
                        }
                    };
                    for family in ["IPv6", "IPv4"] {
                        let path = dir.join(format!("{product}-City-Blocks-{family}.csv"));
                        let mm = Arc::clone(&mm);
                        let on_block = Arc::clone(&on_block);
                        std::thread::spawn(move || {
                            if let Err(e) = import_blocks(&path, &on_block) {
                                warn!("block import of {} failed: {e}", path.display());
                            }
                            mm.importing.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                    Ok(())
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
        self.city.read().expect("poisoned").is_some() && self.asn.read().expect("poisoned").is_some()
    }

    /// Whether a bulk CSV replay is currently running.
    pub fn importing(&self) -> bool {
        self.importing.load(Ordering::SeqCst) > 0
    }

    /// Looks up the City database. Returns an empty record while the reader
    /// is unavailable or when the address is unknown.
    pub fn lookup(&self, ip: IpAddr) -> GeoRecord {
        let guard = self.city.read().expect("poisoned");
        match &*guard {
            Some(reader) => reader.lookup(ip).unwrap_or_default(),
            None => GeoRecord::default(),
        }
    }

    /// Looks up the ASN database.
    pub fn lookup_asn(&self, ip: IpAddr) -> AsnRecord {
        let guard = self.asn.read().expect("poisoned");
        match &*guard {
            Some(reader) => reader.lookup(ip).unwrap_or_default(),
            None => AsnRecord::default(),
        }
    }
}

type InstallFn = Arc<dyn Fn(&MaxMind, MmdbReader) + Send + Sync>;

/// Replays one block file through the callback. The header row and rows with
/// an unexpected column count are skipped.
fn import_blocks(path: &Path, on_block: &BlockFn<MaxMindBlock>) -> Result<(), anyhow::Error> {
    info!("loading {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    for record in reader.records() {
        let record = record?;
        if record.len() != 10 {
            continue;
        }
        on_block(MaxMindBlock::from_record(&record));
    }
    Ok(())
}

/// Expands a block's network into individual addresses: every address of an
/// IPv4 CIDR, exactly one (the network address) for IPv6.
pub fn expand_network(network: &str) -> Vec<IpAddr> {
    match network.parse::<ipnet::IpNet>() {
        Ok(ipnet::IpNet::V4(net)) => {
            let start = u32::from(net.network());
            let end = u32::from(net.broadcast());
            (start..=end)
                .map(|n| IpAddr::V4(std::net::Ipv4Addr::from(n)))
                .collect()
        }
        Ok(ipnet::IpNet::V6(net)) => vec![IpAddr::V6(net.network())],
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn expand_host_network() {
        assert_eq!(expand_network("10.0.0.1/32").len(), 1);
    }

    #[test]
    fn expand_small_network() {
        let addrs = expand_network("192.0.2.0/24");
        assert_eq!(addrs.len(), 256);
        assert_eq!(addrs[0], "192.0.2.0".parse::<IpAddr>().unwrap());
        assert_eq!(addrs[255], "192.0.2.255".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn expand_ipv6_network_is_single_job() {
        let addrs = expand_network("2001:db8::/32");
        assert_eq!(addrs, vec!["2001:db8::".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn expand_garbage_is_empty() {
        assert!(expand_network("not-a-network").is_empty());
    }

    #[test]
    fn block_rows_parse_and_header_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "network,geoname_id,registered_country_geoname_id,represented_country_geoname_id,\
             is_anonymous_proxy,is_satellite_provider,postal_code,latitude,longitude,accuracy_radius"
        )
        .unwrap();
        writeln!(file, "1.0.0.0/24,2077456,2077456,,0,0,,-33.4940,143.2104,1000").unwrap();
        writeln!(file, "1.0.1.0/24,1814991,1814991,,1,0,,34.7732,113.7220,50").unwrap();
        drop(file);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink: BlockFn<MaxMindBlock> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |block: MaxMindBlock| seen.lock().unwrap().push(block))
        };
        import_blocks(&path, &sink).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].network, "1.0.0.0/24");
        assert!(!seen[0].is_anonymous_proxy);
        assert!(seen[1].is_anonymous_proxy);
        assert_eq!(seen[1].accuracy_radius, 50);
    }
}
