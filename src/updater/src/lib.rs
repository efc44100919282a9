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

//! Background refresh of reference-database archives.
//!
//! An [`Updater`] owns one cached archive file and one extracted data file.
//! It polls a remote URL for a newer artifact, downloads into a temporary
//! file, atomically swaps the archive into place, and then drives a
//! caller-supplied reload callback so the owning source reader can install a
//! new live reader. Failures are reported on the event channel and retried
//! with exponentially growing backoff; they never tear down the process.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::header::LAST_MODIFIED;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

pub mod archive;

/// How often the poll loop wakes up to re-evaluate freshness.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// An error produced while refreshing or unpacking an archive.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed Last-Modified header: {0:?}")]
    LastModified(String),
    #[error("archive {}: {size} bytes is below the {min} byte minimum", path.display())]
    TooSmall { path: PathBuf, size: u64, min: u64 },
    #[error("archive member {0:?} has an unsupported entry type")]
    UnsupportedEntry(String),
    #[error("no database member found in {}", .0.display())]
    MissingMember(PathBuf),
    #[error("zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Configuration for one [`Updater`].
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Human-readable source name, used in events and logs.
    pub name: String,
    /// The remote artifact URL.
    pub url: String,
    /// Where the downloaded archive lives.
    pub archive_path: PathBuf,
    /// Where the extracted data file lives. For sources whose artifact is
    /// consumed as-is this is the same path as `archive_path`.
    pub extracted_path: PathBuf,
    /// How often to look for a newer artifact once one is installed.
    pub update_interval: Duration,
    /// Upper bound on the failure backoff.
    pub retry_interval: Duration,
}

/// Lifecycle notifications emitted by an [`Updater`].
#[derive(Debug, Clone)]
pub enum UpdaterEvent {
    /// A new artifact was installed and the reload callback succeeded.
    Open { name: String, path: PathBuf },
    /// Progress worth relaying to the operator.
    Info { name: String, message: String },
    /// A failed cycle; the updater will retry.
    Error { name: String, message: String },
}

/// The reload callback invoked after every archive swap.
///
/// Must be idempotent. The updater runs it on a blocking thread; the callback
/// is responsible for its own exclusion against in-flight lookups.
pub type ReloadFn = Arc<dyn Fn() -> Result<(), anyhow::Error> + Send + Sync>;

struct UpdaterState {
    blocked_until: Instant,
    last_updated: Option<DateTime<Utc>>,
    failures: u32,
}

/// A background refresh task for one remote artifact.
pub struct Updater {
    config: UpdaterConfig,
    reload: ReloadFn,
    events: mpsc::UnboundedSender<UpdaterEvent>,
    client: reqwest::Client,
    state: Mutex<UpdaterState>,
    shutdown: watch::Sender<bool>,
}

impl Updater {
    pub fn new(
        config: UpdaterConfig,
        reload: ReloadFn,
        events: mpsc::UnboundedSender<UpdaterEvent>,
    ) -> Arc<Updater> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Updater {
            config,
            reload,
            events,
            client: reqwest::Client::new(),
            state: Mutex::new(UpdaterState {
                blocked_until: Instant::now(),
                last_updated: None,
                failures: 0,
            }),
            shutdown,
        })
    }

    /// Starts the poll loop and returns immediately.
    ///
    /// If the local extracted file is already fresh, one reload attempt is
    /// made against it before the first poll so that a restart does not wait
    /// for the remote.
    pub fn start(self: &Arc<Self>) {
        let updater = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = updater.prepare() {
                updater.error(format!("cannot create cache directories: {e}"));
                return;
            }

            match updater.update_required().await {
                Ok(true) => (),
                // An unreachable upstream must not prevent loading a
                // previously extracted file.
                Ok(false) | Err(_) => {
                    if updater.config.extracted_path.exists() {
                        if let Err(e) = updater.run_reload().await {
                            updater.error(format!("reload of existing file failed: {e}"));
                        }
                    }
                }
            }

            let mut ticker = time::interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = updater.update_once().await {
                            updater.error(e.to_string());
                            updater.backoff();
                        }
                    }
                    _ = shutdown.changed() => return,
                }
            }
        });
    }

    /// Signals the poll loop to exit.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// The timestamp of the last successfully installed artifact, if any.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.lock().expect("poisoned").last_updated
    }

    fn prepare(&self) -> Result<(), std::io::Error> {
        for path in [&self.config.archive_path, &self.config.extracted_path] {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Runs one freshness check and, when required, a download cycle.
    pub async fn update_once(&self) -> Result<(), anyhow::Error> {
        if !self.update_required().await? {
            return Ok(());
        }
        {
            let mut state = self.state.lock().expect("poisoned");
            state.blocked_until = Instant::now() + self.config.update_interval;
        }

        self.info(format!("downloading {}", self.config.url));
        let tmp = self.download().await?;
        if let Err(e) = install(&tmp, &self.config.archive_path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        self.run_reload().await?;

        let mut state = self.state.lock().expect("poisoned");
        state.failures = 0;
        state.last_updated = std::fs::metadata(&self.config.archive_path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .ok();
        Ok(())
    }

    /// The freshness protocol. Returns whether a download is required.
    async fn update_required(&self) -> Result<bool, UpdateError> {
        {
            let state = self.state.lock().expect("poisoned");
            if Instant::now() < state.blocked_until {
                return Ok(false);
            }
        }

        let mtime = match std::fs::metadata(&self.config.extracted_path) {
            // Local file is missing and must be downloaded.
            Err(_) => return Ok(true),
            Ok(meta) => meta.modified()?,
        };

        // Minimum re-check spacing: a file touched recently is fresh enough.
        let age = SystemTime::now().duration_since(mtime).unwrap_or_default();
        if age < self.config.update_interval / 12 {
            return Ok(false);
        }

        let resp = self.client.head(&self.config.url).send().await?;
        if let Some(value) = resp.headers().get(LAST_MODIFIED) {
            let raw = value.to_str().unwrap_or_default();
            let remote = DateTime::parse_from_rfc2822(raw)
                .map_err(|_| UpdateError::LastModified(raw.to_string()))?;
            if remote.with_timezone(&Utc) > DateTime::<Utc>::from(mtime) {
                return Ok(true);
            }
        }

        touch(&self.config.extracted_path)?;
        Ok(false)
    }

    async fn download(&self) -> Result<PathBuf, UpdateError> {
        let resp = self
            .client
            .get(&self.config.url)
            .send()
            .await?
            .error_for_status()?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let tmp = PathBuf::from(format!("{}.{}", self.config.archive_path.display(), nanos));

        if let Err(e) = stream_to_file(resp, &tmp).await {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(tmp)
    }

    async fn run_reload(&self) -> Result<(), anyhow::Error> {
        let reload = Arc::clone(&self.reload);
        tokio::task::spawn_blocking(move || reload())
            .await
            .map_err(|e| anyhow::anyhow!("reload task panicked: {e}"))??;
        let _ = self.events.send(UpdaterEvent::Open {
            name: self.config.name.clone(),
            path: self.config.extracted_path.clone(),
        });
        Ok(())
    }

    /// Schedules the next attempt after a failed cycle. The delay grows by a
    /// factor of e per consecutive failure, capped at the retry interval.
    fn backoff(&self) {
        let mut state = self.state.lock().expect("poisoned");
        state.failures += 1;
        let grown = POLL_INTERVAL.as_secs_f64() * f64::exp(f64::from(state.failures));
        let delay = Duration::from_secs_f64(grown.min(self.config.retry_interval.as_secs_f64()));
        state.blocked_until = Instant::now() + delay;
        debug!(
            source = %self.config.name,
            failures = state.failures,
            "next update attempt in {:?}",
            delay
        );
    }

    fn info(&self, message: String) {
        debug!(source = %self.config.name, "{message}");
        let _ = self.events.send(UpdaterEvent::Info {
            name: self.config.name.clone(),
            message,
        });
    }

    fn error(&self, message: String) {
        warn!(source = %self.config.name, "{message}");
        let _ = self.events.send(UpdaterEvent::Error {
            name: self.config.name.clone(),
            message,
        });
    }
}

async fn stream_to_file(resp: reqwest::Response, path: &Path) -> Result<(), UpdateError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Moves a downloaded temporary file into place, keeping the previous archive
/// around as `<archive>.bak`.
fn install(tmp: &Path, archive: &Path) -> Result<(), std::io::Error> {
    let mut backup = archive.as_os_str().to_owned();
    backup.push(".bak");
    let _ = std::fs::rename(archive, &backup);
    std::fs::rename(tmp, archive)
}

/// Bumps a file's mtime to now so the next freshness check skips it.
fn touch(path: &Path) -> Result<(), std::io::Error> {
    filetime::set_file_mtime(path, filetime::FileTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_updater(dir: &Path, update_interval: Duration) -> Arc<Updater> {
        let (events, _rx) = mpsc::unbounded_channel();
        Updater::new(
            UpdaterConfig {
                name: "test".into(),
                // Never resolvable; the paths under test must not reach it.
                url: "http://invalid.invalid/archive".into(),
                archive_path: dir.join("archive.tar.gz"),
                extracted_path: dir.join("data.mmdb"),
                update_interval,
                retry_interval: Duration::from_secs(600),
            },
            Arc::new(|| Ok(())),
            events,
        )
    }

    #[tokio::test]
    async fn missing_local_file_requires_update() {
        let dir = tempfile::tempdir().unwrap();
        let updater = test_updater(dir.path(), Duration::from_secs(3600));
        assert!(updater.update_required().await.unwrap());
    }

    #[tokio::test]
    async fn fresh_local_file_skips_head_probe() {
        let dir = tempfile::tempdir().unwrap();
        let updater = test_updater(dir.path(), Duration::from_secs(3600));
        std::fs::write(dir.path().join("data.mmdb"), b"data").unwrap();
        // The file was just written, so it is younger than interval / 12 and
        // no HEAD request is issued against the unresolvable URL.
        assert!(!updater.update_required().await.unwrap());
    }

    #[tokio::test]
    async fn blocked_updater_skips_all_checks() {
        let dir = tempfile::tempdir().unwrap();
        let updater = test_updater(dir.path(), Duration::from_secs(3600));
        updater.state.lock().unwrap().blocked_until = Instant::now() + Duration::from_secs(60);
        assert!(!updater.update_required().await.unwrap());
    }

    #[tokio::test]
    async fn backoff_grows_and_caps() {
        let dir = tempfile::tempdir().unwrap();
        let updater = test_updater(dir.path(), Duration::from_secs(3600));
        let mut last = Duration::ZERO;
        for _ in 0..3 {
            updater.backoff();
            let state = updater.state.lock().unwrap();
            let delay = state.blocked_until - Instant::now();
            assert!(delay > last);
            last = delay;
        }
        for _ in 0..20 {
            updater.backoff();
        }
        let state = updater.state.lock().unwrap();
        assert!(state.blocked_until - Instant::now() <= Duration::from_secs(600));
    }

    #[test]
    fn install_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.tar.gz");
        let tmp = dir.path().join("a.tar.gz.123");
        std::fs::write(&archive, b"old").unwrap();
        std::fs::write(&tmp, b"new").unwrap();
        install(&tmp, &archive).unwrap();
        assert_eq!(std::fs::read(&archive).unwrap(), b"new");
        assert_eq!(std::fs::read(dir.path().join("a.tar.gz.bak")).unwrap(), b"old");
    }
}
