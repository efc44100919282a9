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

//! The ingest pipeline: a bounded job queue fanned out to a fixed worker
//! pool, with jobs hydrated from every source at enqueue time.
//!
//! The enqueueing side pays the source-lookup latency so a worker only ever
//! merges and writes. Backpressure is the channel itself: when the queue is
//! full, enqueueing awaits. Request paths that must not block submit through
//! [`Ingestor::spawn_enqueue`].

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use geoip_sources::{
    ip2location, maxmind, AsnRecord, GeoRecord, Ip2LocationRow, MaxMindBlock, ProxyRecord,
    SourceSet,
};
use geoip_store::Store;

mod import;
mod whois;
mod worker;

pub use whois::WhoisRecord;

/// Sizing knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Number of concurrent import workers.
    pub workers: usize,
    /// Capacity of the job queue.
    pub queue_size: usize,
}

impl Default for IngestConfig {
    fn default() -> IngestConfig {
        IngestConfig {
            workers: 1,
            queue_size: 64,
        }
    }
}

/// One fully hydrated unit of ingest work.
#[derive(Debug, Clone)]
pub struct Job {
    pub ip: IpAddr,
    pub fail_count: u32,
    /// DNS names observed resolving to this address.
    pub domains: Vec<String>,
    pub maxmind: GeoRecord,
    pub maxmind_asn: AsnRecord,
    pub ip2location: ProxyRecord,
    pub whois: Option<WhoisRecord>,
}

/// The shared ingest handle: owns the queue, the dispatcher, and the workers.
pub struct Ingestor {
    sources: SourceSet,
    store: Store,
    tx: mpsc::Sender<Job>,
    shutdown: watch::Sender<bool>,
    handle: tokio::runtime::Handle,
}

impl Ingestor {
    /// Builds the pipeline and starts the dispatcher. Jobs are not handed to
    /// workers until every source reports ready.
    pub fn start(config: IngestConfig, store: Store, sources: SourceSet) -> Arc<Ingestor> {
        let (tx, mut rx) = mpsc::channel::<Job>(config.queue_size.max(1));
        let (shutdown, _) = watch::channel(false);
        let ingestor = Arc::new(Ingestor {
            sources,
            store,
            tx,
            shutdown,
            handle: tokio::runtime::Handle::current(),
        });

        let workers: Vec<_> = (0..config.workers.max(1))
            .map(|_| Arc::new(worker::Worker::new()))
            .collect();

        let dispatcher = Arc::clone(&ingestor);
        let mut shutdown = ingestor.shutdown.subscribe();
        tokio::spawn(async move {
            dispatcher.wait_ready(&mut shutdown).await;
            info!("ingest dispatcher running with {} workers", workers.len());
            loop {
                tokio::select! {
                    job = rx.recv() => match job {
                        Some(job) => dispatch(&dispatcher, &workers, job).await,
                        None => return,
                    },
                    _ = shutdown.changed() => return,
                }
            }
        });

        ingestor
    }

    /// Signals the dispatcher to stop handing out jobs. In-flight imports
    /// run to completion.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Hydrates and enqueues one address, blocking on a full queue.
    pub async fn enqueue(&self, ip: IpAddr, domains: Vec<String>) {
        self.enqueue_job(ip, 0, domains).await;
    }

    /// Enqueues from a request path that must not block.
    pub fn spawn_enqueue(self: &Arc<Self>, ip: IpAddr, domains: Vec<String>) {
        let ingestor = Arc::clone(self);
        tokio::spawn(async move {
            ingestor.enqueue(ip, domains).await;
        });
    }

    /// Re-enqueues a failed job with a bumped fail count, re-reading every
    /// source. Never recurses into the calling worker.
    pub(crate) fn requeue(self: &Arc<Self>, job: &Job) {
        let ip = job.ip;
        let fail_count = job.fail_count + 1;
        let domains = job.domains.clone();
        let ingestor = Arc::clone(self);
        tokio::spawn(async move {
            ingestor.enqueue_job(ip, fail_count, domains).await;
        });
    }

    async fn enqueue_job(&self, ip: IpAddr, fail_count: u32, domains: Vec<String>) {
        let mut shutdown = self.shutdown.subscribe();
        self.wait_ready(&mut shutdown).await;
        if *shutdown.borrow() {
            return;
        }
        let job = self.hydrate(ip, fail_count, domains).await;
        if self.tx.send(job).await.is_err() {
            error!("ingest queue closed; dropping {ip}");
        }
    }

    /// The callbacks handed to the bulk CSV sources. They run on import
    /// threads and block on the queue, which is the admission control for
    /// seeding whole databases.
    pub fn block_callbacks(
        self: &Arc<Self>,
    ) -> (
        geoip_sources::BlockFn<MaxMindBlock>,
        geoip_sources::BlockFn<Ip2LocationRow>,
    ) {
        let mm = {
            let ingestor = Arc::clone(self);
            Arc::new(move |block: MaxMindBlock| {
                for ip in maxmind::expand_network(&block.network) {
                    ingestor
                        .handle
                        .block_on(ingestor.enqueue(ip, Vec::new()));
                }
            }) as geoip_sources::BlockFn<MaxMindBlock>
        };
        let i2l = {
            let ingestor = Arc::clone(self);
            Arc::new(move |row: Ip2LocationRow| {
                let mut n = row.ip_from;
                while n <= row.ip_to {
                    let ip = ip2location::int_to_ip(n);
                    ingestor.handle.block_on(ingestor.enqueue(ip, Vec::new()));
                    n += 1;
                }
            }) as geoip_sources::BlockFn<Ip2LocationRow>
        };
        (mm, i2l)
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    async fn wait_ready(&self, shutdown: &mut watch::Receiver<bool>) {
        while !self.sources.ready() {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => (),
                _ = shutdown.changed() => return,
            }
        }
    }

    async fn hydrate(&self, ip: IpAddr, fail_count: u32, domains: Vec<String>) -> Job {
        let maxmind = self.sources.maxmind.lookup(ip);
        let maxmind_asn = self.sources.maxmind.lookup_asn(ip);
        let ip2location = self.sources.ip2location.lookup(ip);

        // WHOIS fills in attribution no database produced.
        let whois = if needs_whois(&maxmind, &maxmind_asn, &ip2location) {
            whois::lookup(ip).await.ok()
        } else {
            None
        };

        Job {
            ip,
            fail_count,
            domains,
            maxmind,
            maxmind_asn,
            ip2location,
            whois,
        }
    }
}

fn needs_whois(maxmind: &GeoRecord, asn: &AsnRecord, i2l: &ProxyRecord) -> bool {
    let no_asn = maxmind.traits.autonomous_system_number.unwrap_or(0) == 0
        && asn.autonomous_system_number.unwrap_or(0) == 0
        && (i2l.asn.is_empty() || i2l.asn == "0");
    let no_isp = maxmind.traits.isp.as_deref().unwrap_or("").is_empty() && i2l.isp.is_empty();
    no_asn || no_isp
}

async fn dispatch(ingestor: &Arc<Ingestor>, workers: &[Arc<worker::Worker>], job: Job) {
    // Push-assignment: spin over the pool until a worker goes idle.
    loop {
        for worker in workers {
            if worker.try_claim() {
                worker.run(Arc::clone(ingestor), job);
                return;
            }
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whois_is_skipped_when_any_source_attributed() {
        let mut maxmind = GeoRecord::default();
        maxmind.traits.autonomous_system_number = Some(64500);
        maxmind.traits.isp = Some("Example Carrier".into());
        assert!(!needs_whois(
            &maxmind,
            &AsnRecord::default(),
            &ProxyRecord::default()
        ));
    }

    #[test]
    fn whois_fills_missing_asn_or_isp() {
        // Nothing anywhere: required.
        assert!(needs_whois(
            &GeoRecord::default(),
            &AsnRecord::default(),
            &ProxyRecord::default()
        ));

        // An ASN but no ISP name anywhere: still required.
        let asn = AsnRecord {
            autonomous_system_number: Some(64500),
            autonomous_system_organization: None,
        };
        assert!(needs_whois(
            &GeoRecord::default(),
            &asn,
            &ProxyRecord::default()
        ));

        // ISP present and ASN present: not required.
        let i2l = ProxyRecord {
            isp: "Example".into(),
            asn: "64500".into(),
            ..Default::default()
        };
        assert!(!needs_whois(&GeoRecord::default(), &AsnRecord::default(), &i2l));
    }
}
