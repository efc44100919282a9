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

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geoip_ingest::IngestConfig;
use geoip_server::{RateLimitConfig, ServerConfig, TlsServerConfig};
use geoip_sources::{Ip2LocationConfig, MaxMindConfig, TorConfig};
use geoipd::{Config, StartError};

/// Geolocation and network-attribution service.
#[derive(clap::Parser)]
#[clap(name = "geoipd", version)]
struct Args {
    // === Connection options. ===
    /// Address in form of ip:port for the plaintext listener.
    #[clap(long = "http", env = "GEOIP_HTTP", value_name = "HOST:PORT")]
    http: Option<SocketAddr>,
    /// Address in form of ip:port for the TLS listener.
    #[clap(long = "https", env = "GEOIP_HTTPS", value_name = "HOST:PORT")]
    https: Option<SocketAddr>,
    /// X.509 certificate file for the TLS listener.
    #[clap(long, env = "GEOIP_CERT", value_name = "PATH")]
    cert: Option<PathBuf>,
    /// X.509 key file for the TLS listener.
    #[clap(long, env = "GEOIP_KEY", value_name = "PATH")]
    key: Option<PathBuf>,
    /// API endpoint prefix.
    #[clap(long = "api-prefix", env = "GEOIP_API_PREFIX", value_name = "PREFIX")]
    api_prefix: Option<String>,
    /// Comma separated list of allowed CORS origins.
    #[clap(long = "cors-origin", env = "GEOIP_CORS_ORIGIN", value_name = "ORIGINS")]
    cors_origin: Option<String>,

    // === Storage options. ===
    /// Directory that holds the cache of downloaded databases.
    #[clap(long = "root-dir", env = "GEOIP_ROOT_DIR", value_name = "PATH")]
    root_dir: Option<PathBuf>,
    /// Database file location.
    #[clap(long = "db", env = "GEOIP_DB", value_name = "PATH")]
    database: Option<PathBuf>,
    /// Config file location.
    #[clap(long, env = "GEOIP_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    // === Ingest options. ===
    /// Number of concurrent import workers.
    #[clap(long, env = "GEOIP_WORKERS", value_name = "N")]
    workers: Option<usize>,
    /// Capacity of the ingest queue.
    #[clap(long = "queue-size", env = "GEOIP_QUEUE_SIZE", value_name = "N")]
    queue_size: Option<usize>,

    // === MaxMind options. ===
    /// MaxMind license key.
    #[clap(long = "mm-license-key", env = "GEOIP_MM_LICENSE_KEY", value_name = "KEY")]
    mm_license_key: Option<String>,
    /// MaxMind product family (e.g. GeoLite2).
    #[clap(long = "mm-product-id", env = "GEOIP_MM_PRODUCT_ID", value_name = "ID")]
    mm_product_id: Option<String>,
    /// MaxMind download host.
    #[clap(long = "mm-downstreams", env = "GEOIP_MM_DOWNSTREAMS", value_name = "HOST")]
    mm_downstreams: Option<String>,
    /// MaxMind database update check interval.
    #[clap(long = "mm-update", env = "GEOIP_MM_UPDATE", value_name = "DURATION", parse(try_from_str = humantime::parse_duration))]
    mm_update: Option<Duration>,
    /// Max time to wait before retrying a failed MaxMind download.
    #[clap(long = "mm-retry", env = "GEOIP_MM_RETRY", value_name = "DURATION", parse(try_from_str = humantime::parse_duration))]
    mm_retry: Option<Duration>,

    // === IP2Location options. ===
    /// IP2Location download token.
    #[clap(long = "i2l-token", env = "GEOIP_I2L_TOKEN", value_name = "TOKEN")]
    i2l_token: Option<String>,
    /// IP2Location BIN product (e.g. PX8LITEBIN).
    #[clap(long = "i2l-product-id", env = "GEOIP_I2L_PRODUCT_ID", value_name = "ID")]
    i2l_product_id: Option<String>,
    /// IP2Location CSV product (e.g. PX8LITECSV).
    #[clap(long = "i2l-csv-product-id", env = "GEOIP_I2L_CSV_PRODUCT_ID", value_name = "ID")]
    i2l_csv_product_id: Option<String>,
    /// IP2Location download host.
    #[clap(long = "i2l-downstreams", env = "GEOIP_I2L_DOWNSTREAMS", value_name = "HOST")]
    i2l_downstreams: Option<String>,
    /// IP2Location database update check interval.
    #[clap(long = "i2l-update", env = "GEOIP_I2L_UPDATE", value_name = "DURATION", parse(try_from_str = humantime::parse_duration))]
    i2l_update: Option<Duration>,
    /// Max time to wait before retrying a failed IP2Location download.
    #[clap(long = "i2l-retry", env = "GEOIP_I2L_RETRY", value_name = "DURATION", parse(try_from_str = humantime::parse_duration))]
    i2l_retry: Option<Duration>,

    // === Tor options. ===
    /// Probe address for the Tor exit list query.
    #[clap(long = "tor-exit-check", env = "GEOIP_TOR_EXIT_CHECK", value_name = "IP")]
    tor_exit_check: Option<String>,
    /// Tor exit list host.
    #[clap(long = "tor-downstreams", env = "GEOIP_TOR_DOWNSTREAMS", value_name = "HOST")]
    tor_downstreams: Option<String>,
    /// Tor exit list update check interval.
    #[clap(long = "tor-update", env = "GEOIP_TOR_UPDATE", value_name = "DURATION", parse(try_from_str = humantime::parse_duration))]
    tor_update: Option<Duration>,
    /// Max time to wait before retrying a failed Tor download.
    #[clap(long = "tor-retry", env = "GEOIP_TOR_RETRY", value_name = "DURATION", parse(try_from_str = humantime::parse_duration))]
    tor_retry: Option<Duration>,

    // === Rate limiting options. ===
    /// Max requests per source IP per minute; 0 turns quotas off.
    #[clap(long = "quota-max", env = "GEOIP_QUOTA_MAX", value_name = "N")]
    quota_max: Option<f64>,
    /// Max burst of requests per source IP.
    #[clap(long = "quota-burst", env = "GEOIP_QUOTA_BURST", value_name = "N")]
    quota_burst: Option<u32>,
    /// How long an idle visitor's quota bucket is kept.
    #[clap(long = "quota-interval", env = "GEOIP_QUOTA_INTERVAL", value_name = "DURATION", parse(try_from_str = humantime::parse_duration))]
    quota_interval: Option<Duration>,

    // === Logging options. ===
    /// Tracing filter directives.
    #[clap(long = "log-filter", env = "GEOIP_LOG_FILTER", value_name = "FILTER", default_value = "info")]
    log_filter: String,
}

/// The JSON config file: the same knobs as the flags, all optional. Flags
/// and environment variables win over the file; the file wins over the
/// defaults. Durations are in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    http: Option<SocketAddr>,
    https: Option<SocketAddr>,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    api_prefix: Option<String>,
    cors_origin: Option<String>,
    root_dir: Option<PathBuf>,
    database: Option<PathBuf>,
    workers: Option<usize>,
    queue_size: Option<usize>,
    max_mind: FileSource,
    ip2location: FileSource,
    tor: FileTor,
    rate_limit: FileRateLimit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSource {
    license_key: Option<String>,
    token: Option<String>,
    product_id: Option<String>,
    csv_product_id: Option<String>,
    downstreams: Option<String>,
    update_interval: Option<u64>,
    retry_interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileTor {
    exit_check: Option<String>,
    downstreams: Option<String>,
    update_interval: Option<u64>,
    retry_interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileRateLimit {
    limit: Option<f64>,
    burst: Option<u32>,
    interval: Option<u64>,
}

fn load_file(path: &PathBuf) -> Result<FileConfig, anyhow::Error> {
    match std::fs::read(path) {
        Ok(content) => serde_json::from_slice(&content)
            .with_context(|| format!("parsing config file {}", path.display())),
        // A missing config file is not an error; everything has defaults.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(e).with_context(|| format!("reading config file {}", path.display())),
    }
}

fn resolve_config(args: Args) -> Result<Config, anyhow::Error> {
    let cwd = std::env::current_dir().context("resolving working directory")?;
    let file_path = args
        .config
        .clone()
        .unwrap_or_else(|| cwd.join("config").join("settings.json"));
    let file = load_file(&file_path)?;

    let root_dir = args.root_dir.or(file.root_dir).unwrap_or(cwd);
    let database_path = args
        .database
        .or(file.database)
        .unwrap_or_else(|| root_dir.join("cache").join("geoip.db"));

    let listen_addr = Some(
        args.http
            .or(file.http)
            .unwrap_or_else(|| "127.0.0.1:8080".parse().expect("static address parses")),
    );
    let tls = match args.https.or(file.https) {
        None => None,
        Some(listen_addr) => {
            let cert = args.cert.or(file.cert);
            let key = args.key.or(file.key);
            match (cert, key) {
                (Some(cert), Some(key)) => Some(TlsServerConfig {
                    listen_addr,
                    cert,
                    key,
                }),
                _ => bail!("--https requires both --cert and --key"),
            }
        }
    };

    let file_secs = |v: Option<u64>| v.map(Duration::from_secs);
    Ok(Config {
        root_dir,
        database_path,
        server: ServerConfig {
            listen_addr,
            tls,
            api_prefix: args.api_prefix.or(file.api_prefix).unwrap_or_else(|| "/".into()),
            cors_origin: args.cors_origin.or(file.cors_origin).unwrap_or_else(|| "*".into()),
        },
        rate_limit: RateLimitConfig {
            limit: args.quota_max.or(file.rate_limit.limit).unwrap_or(1.0),
            burst: args.quota_burst.or(file.rate_limit.burst).unwrap_or(4),
            expiry: args
                .quota_interval
                .or(file_secs(file.rate_limit.interval))
                .unwrap_or(Duration::from_secs(180)),
        },
        ingest: IngestConfig {
            workers: args.workers.or(file.workers).unwrap_or(1),
            queue_size: args.queue_size.or(file.queue_size).unwrap_or(64),
        },
        maxmind: MaxMindConfig {
            license_key: args
                .mm_license_key
                .or(file.max_mind.license_key)
                .unwrap_or_default(),
            product_id: args
                .mm_product_id
                .or(file.max_mind.product_id)
                .unwrap_or_else(|| "GeoLite2".into()),
            downstream: args
                .mm_downstreams
                .or(file.max_mind.downstreams)
                .unwrap_or_else(|| "download.maxmind.com".into()),
            update_interval: args
                .mm_update
                .or(file_secs(file.max_mind.update_interval))
                .unwrap_or(Duration::from_secs(4 * 3600)),
            retry_interval: args
                .mm_retry
                .or(file_secs(file.max_mind.retry_interval))
                .unwrap_or(Duration::from_secs(2 * 3600)),
        },
        ip2location: Ip2LocationConfig {
            token: args.i2l_token.or(file.ip2location.token).unwrap_or_default(),
            product_id: args
                .i2l_product_id
                .or(file.ip2location.product_id)
                .unwrap_or_else(|| "PX8LITEBIN".into()),
            csv_product_id: args
                .i2l_csv_product_id
                .or(file.ip2location.csv_product_id)
                .unwrap_or_else(|| "PX8LITECSV".into()),
            downstream: args
                .i2l_downstreams
                .or(file.ip2location.downstreams)
                .unwrap_or_else(|| "www.ip2location.com".into()),
            update_interval: args
                .i2l_update
                .or(file_secs(file.ip2location.update_interval))
                .unwrap_or(Duration::from_secs(4 * 3600)),
            retry_interval: args
                .i2l_retry
                .or(file_secs(file.ip2location.retry_interval))
                .unwrap_or(Duration::from_secs(2 * 3600)),
        },
        tor: TorConfig {
            exit_check: args
                .tor_exit_check
                .or(file.tor.exit_check)
                .unwrap_or_else(|| "8.8.8.8".into()),
            downstream: args
                .tor_downstreams
                .or(file.tor.downstreams)
                .unwrap_or_else(|| "check.torproject.org".into()),
            update_interval: args
                .tor_update
                .or(file_secs(file.tor.update_interval))
                .unwrap_or(Duration::from_secs(30 * 60)),
            retry_interval: args
                .tor_retry
                .or(file_secs(file.tor.retry_interval))
                .unwrap_or(Duration::from_secs(2 * 3600)),
        },
    })
}

#[tokio::main]
async fn main() {
    let args = <Args as clap::Parser>::parse();

    let filter = EnvFilter::try_new(&args.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(args).await {
        eprintln!("geoipd: fatal: {err:#}");
        let code = match err {
            StartError::Listen(_) => 2,
            StartError::Fatal(_) => 1,
        };
        process::exit(code);
    }
}

async fn run(args: Args) -> Result<(), StartError> {
    let config = resolve_config(args).map_err(StartError::Fatal)?;
    let app = geoipd::serve(config).await?;
    for addr in app.local_addrs() {
        info!("serving requests on {addr}");
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| StartError::Fatal(e.into()))?;
    info!("shutting down");
    app.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("geoipd").chain(argv.iter().copied()))
    }

    #[test]
    fn defaults_resolve() {
        let config = resolve_config(parse(&[])).unwrap();
        assert_eq!(
            config.server.listen_addr,
            Some("127.0.0.1:8080".parse().unwrap())
        );
        assert!(config.server.tls.is_none());
        assert_eq!(config.server.api_prefix, "/");
        assert_eq!(config.ingest.workers, 1);
        assert_eq!(config.ingest.queue_size, 64);
        assert_eq!(config.maxmind.product_id, "GeoLite2");
        assert_eq!(config.ip2location.product_id, "PX8LITEBIN");
        assert_eq!(config.tor.update_interval.as_secs(), 1800);
        assert_eq!(config.rate_limit.burst, 4);
    }

    #[test]
    fn https_requires_key_material() {
        let err = resolve_config(parse(&["--https", "0.0.0.0:8443"])).unwrap_err();
        assert!(err.to_string().contains("--cert"));

        let config = resolve_config(parse(&[
            "--https",
            "0.0.0.0:8443",
            "--cert",
            "cert.pem",
            "--key",
            "key.pem",
        ]))
        .unwrap();
        assert!(config.server.tls.is_some());
        // The plaintext listener stays up alongside TLS.
        assert!(config.server.listen_addr.is_some());
    }

    #[test]
    fn file_values_yield_to_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "http": "0.0.0.0:9090",
                "workers": 4,
                "max_mind": {"license_key": "from-file", "update_interval": 600}
            }"#,
        )
        .unwrap();

        let config = resolve_config(parse(&[
            "--config",
            path.to_str().unwrap(),
            "--workers",
            "8",
        ]))
        .unwrap();
        assert_eq!(config.server.listen_addr, Some("0.0.0.0:9090".parse().unwrap()));
        assert_eq!(config.ingest.workers, 8);
        assert_eq!(config.maxmind.license_key, "from-file");
        assert_eq!(config.maxmind.update_interval.as_secs(), 600);
    }

    #[test]
    fn missing_config_file_is_fine() {
        let config = resolve_config(parse(&["--config", "/nonexistent/settings.json"]));
        assert!(config.is_ok());
    }
}
