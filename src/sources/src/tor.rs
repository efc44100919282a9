// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Tor exit-node source: a plain text list of addresses rebuilt into an
//! in-memory set on every refresh.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use geoip_updater::{Updater, UpdaterConfig, UpdaterEvent};

/// Configuration for the Tor source.
#[derive(Debug, Clone)]
pub struct TorConfig {
    /// Probe address the exit-list service expects as a query parameter.
    pub exit_check: String,
    pub downstream: String,
    pub update_interval: Duration,
    pub retry_interval: Duration,
}

/// The Tor exit-node list. Lookup is set membership; the set is replaced
/// wholesale under the write lock on every reload.
pub struct Tor {
    config: TorConfig,
    set: RwLock<HashSet<IpAddr>>,
    updaters: Mutex<Vec<Arc<Updater>>>,
}

impl Tor {
    pub fn new(config: TorConfig) -> Arc<Tor> {
        Arc::new(Tor {
            config,
            set: RwLock::new(HashSet::new()),
            updaters: Mutex::new(Vec::new()),
        })
    }

    fn download_url(&self) -> String {
        format!(
            "https://{}/cgi-bin/TorBulkExitList.py?ip={}",
            self.config.downstream, self.config.exit_check
        )
    }

    pub fn start(self: &Arc<Self>, root: &Path, events: UnboundedSender<UpdaterEvent>) {
        // The artifact is consumed as-is; archive and extracted file are one.
        let path = root.join("cache").join("tor.db");
        let tor = Arc::clone(self);
        let reload_path = path.clone();
        let updater = Updater::new(
            UpdaterConfig {
                name: "tor".into(),
                url: self.download_url(),
                archive_path: path.clone(),
                extracted_path: path,
                update_interval: self.config.update_interval,
                retry_interval: self.config.retry_interval,
            },
            Arc::new(move || {
                let set = parse_exit_list(&std::fs::read_to_string(&reload_path)?);
                *tor.set.write().expect("poisoned") = set;
                Ok(())
            }),
            events,
        );
        updater.start();
        *self.updaters.lock().expect("poisoned") = vec![updater];
    }

    pub fn stop(&self) {
        for updater in self.updaters.lock().expect("poisoned").iter() {
            updater.stop();
        }
    }

    pub fn ready(&self) -> bool {
        !self.set.read().expect("poisoned").is_empty()
    }

    /// Whether the address is currently a known exit node.
    pub fn lookup(&self, ip: IpAddr) -> bool {
        self.set.read().expect("poisoned").contains(&ip)
    }
}

fn parse_exit_list(text: &str) -> HashSet<IpAddr> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_addresses_and_skips_comments() {
        let set = parse_exit_list("# ExitNode list\n1.2.3.4\n\n2001:db8::1\nnot-an-ip\n5.6.7.8\n");
        assert_eq!(set.len(), 3);
        assert!(set.contains(&"1.2.3.4".parse::<IpAddr>().unwrap()));
        assert!(set.contains(&"2001:db8::1".parse::<IpAddr>().unwrap()));
        assert!(!set.contains(&"9.9.9.9".parse::<IpAddr>().unwrap()));
    }

    #[tokio::test]
    async fn reload_replaces_the_set() {
        let tor = Tor::new(TorConfig {
            exit_check: "8.8.8.8".into(),
            downstream: "check.torproject.org".into(),
            update_interval: Duration::from_secs(1800),
            retry_interval: Duration::from_secs(7200),
        });
        assert!(!tor.ready());

        *tor.set.write().unwrap() = parse_exit_list("1.2.3.4\n");
        assert!(tor.ready());
        assert!(tor.lookup("1.2.3.4".parse().unwrap()));

        *tor.set.write().unwrap() = parse_exit_list("5.6.7.8\n");
        assert!(tor.lookup("5.6.7.8".parse().unwrap()));
        assert!(!tor.lookup("1.2.3.4".parse().unwrap()));
    }
}
