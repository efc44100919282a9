// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Import workers. A worker is idle or busy; the dispatcher claims an idle
//! worker and hands it exactly one job, which it runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::{import, Ingestor, Job};

pub(crate) struct Worker {
    idle: AtomicBool,
}

impl Worker {
    pub fn new() -> Worker {
        Worker {
            idle: AtomicBool::new(true),
        }
    }

    /// Atomically claims the worker. Only the claiming dispatcher may then
    /// call [`Worker::run`].
    pub fn try_claim(&self) -> bool {
        self.idle
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Runs one job on the shared runtime, returning the worker to the idle
    /// set when the import finishes.
    pub fn run(self: &Arc<Self>, ingestor: Arc<Ingestor>, job: Job) {
        let worker = Arc::clone(self);
        tokio::spawn(async move {
            if job.fail_count > 0 {
                // Progressive delay between attempts on the same address.
                tokio::time::sleep(Duration::from_secs(u64::from(job.fail_count))).await;
            }
            if let Err(e) = import::import_job(&ingestor, &job) {
                error!("import of {} failed: {e}", job.ip);
            }
            worker.idle.store(true, Ordering::Release);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive_until_released() {
        let worker = Worker::new();
        assert!(worker.try_claim());
        assert!(!worker.try_claim());
        worker.idle.store(true, Ordering::Release);
        assert!(worker.try_claim());
    }
}
