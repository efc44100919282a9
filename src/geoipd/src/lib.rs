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

//! The supervisor: wires sources, ingest, store, and the HTTP surface into
//! one running service.
//!
//! Startup order is fixed: cache directory and store first (failures here
//! are fatal), then the source updaters and the worker pool, then a 1-second
//! readiness poll. The HTTP listeners do not bind until every source has
//! installed its first reader. After that a background task refreshes the
//! statistics snapshot every five minutes.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use geoip_ingest::{IngestConfig, Ingestor};
use geoip_server::{AppState, RateLimitConfig, RateLimiter, ServerConfig};
use geoip_sources::{
    Ip2Location, Ip2LocationConfig, MaxMind, MaxMindConfig, SourceSet, Tor, TorConfig,
};
use geoip_store::Store;
use geoip_updater::UpdaterEvent;

/// How often the readiness of the sources is polled during startup.
const READY_POLL: Duration = Duration::from_secs(1);
/// How often the statistics snapshot refreshes.
const STATISTICS_REFRESH: Duration = Duration::from_secs(300);

/// The assembled service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the cache subdirectory with every source artifact.
    pub root_dir: PathBuf,
    /// SQLite database file.
    pub database_path: PathBuf,
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub ingest: IngestConfig,
    pub maxmind: MaxMindConfig,
    pub ip2location: Ip2LocationConfig,
    pub tor: TorConfig,
}

/// Startup failure, split by exit code.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// Configuration or environment problems. Exit code 1.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
    /// Listener bind failures. Exit code 2.
    #[error(transparent)]
    Listen(#[from] geoip_server::ServeError),
}

/// A running service.
pub struct App {
    server: geoip_server::Server,
    sources: SourceSet,
    ingestor: Arc<Ingestor>,
    shutdown: watch::Sender<bool>,
}

impl App {
    pub fn local_addrs(&self) -> &[std::net::SocketAddr] {
        self.server.local_addrs()
    }

    /// Stops the updaters, stops dispatching ingest jobs (in-flight jobs
    /// complete), and closes the listeners.
    pub fn stop(&self) {
        self.sources.stop();
        self.ingestor.stop();
        self.server.stop();
        let _ = self.shutdown.send(true);
    }
}

/// Starts the whole service and resolves once the HTTP listeners are bound.
pub async fn serve(config: Config) -> Result<App, StartError> {
    let cache_dir = config.root_dir.join("cache");
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("creating cache directory {}", cache_dir.display()))?;

    let store = Store::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (shutdown, _) = watch::channel(false);
    drain_events(events_rx, shutdown.subscribe());

    let sources = SourceSet {
        maxmind: MaxMind::new(config.maxmind.clone()),
        ip2location: Ip2Location::new(config.ip2location.clone()),
        tor: Tor::new(config.tor.clone()),
    };
    let ingestor = Ingestor::start(config.ingest.clone(), store.clone(), sources.clone());

    let (maxmind_blocks, ip2location_rows) = ingestor.block_callbacks();
    sources
        .maxmind
        .start(&config.root_dir, events_tx.clone(), Some(maxmind_blocks));
    sources
        .ip2location
        .start(&config.root_dir, events_tx.clone(), Some(ip2location_rows));
    sources.tor.start(&config.root_dir, events_tx);

    // No requests are answered until every source can answer them.
    while !sources.ready() {
        tokio::time::sleep(READY_POLL).await;
    }
    info!("all sources ready");

    let statistics = Arc::new(RwLock::new(store.statistics().context("first statistics")?));
    let state = AppState {
        store: store.clone(),
        ingestor: Arc::clone(&ingestor),
        statistics: Arc::clone(&statistics),
        rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
    };

    let server = geoip_server::serve(config.server.clone(), state).await?;

    refresh_statistics(store, statistics, shutdown.subscribe());

    Ok(App {
        server,
        sources,
        ingestor,
        shutdown,
    })
}

/// Relays updater lifecycle events into the log.
fn drain_events(
    mut events: mpsc::UnboundedReceiver<UpdaterEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(UpdaterEvent::Open { name, path }) => {
                        info!(source = %name, "installed {}", path.display());
                    }
                    Some(UpdaterEvent::Info { name, message }) => {
                        info!(source = %name, "{message}");
                    }
                    Some(UpdaterEvent::Error { name, message }) => {
                        warn!(source = %name, "{message}");
                    }
                    None => return,
                },
                _ = shutdown.changed() => return,
            }
        }
    });
}

fn refresh_statistics(
    store: Store,
    statistics: Arc<RwLock<geoip_store::Statistics>>,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STATISTICS_REFRESH);
        ticker.tick().await; // the first tick completes immediately
        loop {
            tokio::select! {
                _ = ticker.tick() => match store.statistics() {
                    Ok(snapshot) => *statistics.write().expect("poisoned") = snapshot,
                    Err(e) => warn!("statistics refresh failed: {e}"),
                },
                _ = shutdown.changed() => return,
            }
        }
    });
}
