// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Detection worker
//!
//! Drives the engine in a tight loop: check the shutdown flag, lock the
//! engine, run `find_object` + `serve_position`, unlock. There is no sleep
//! between cycles; the frame timeout inside `find_object` is the only pacing.

use parking_lot::MutexGuard;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::engine::SharedEngine;
use crate::shutdown::ShutdownToken;
use crate::{DetectorError, DetectorResult};

pub const WORKER_THREAD_NAME: &str = "tracker-detect-worker";

/// Consecutive failures are logged on the first and every Nth occurrence
const ERROR_LOG_INTERVAL: u64 = 100;

/// Summary returned when the worker exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub cycles: u64,
    pub failed_cycles: u64,
}

/// Run detection cycles until shutdown is requested or the engine stops
pub fn run_worker(engine: SharedEngine, shutdown: ShutdownToken) -> WorkerReport {
    let mut report = WorkerReport::default();
    let mut consecutive_failures: u64 = 0;

    info!("[WORKER] Detection loop started");

    while !shutdown.is_triggered() {
        let mut guard = engine.lock();
        if guard.is_stopped() {
            debug!("[WORKER] Engine stopped, leaving loop");
            break;
        }
        let result = guard.cycle();
        // Hand the lock to a waiting console instead of re-acquiring it first
        MutexGuard::unlock_fair(guard);

        report.cycles += 1;
        match result {
            Ok(()) => {
                if consecutive_failures > 0 {
                    info!(
                        "[WORKER] Recovered after {} failed cycles",
                        consecutive_failures
                    );
                    consecutive_failures = 0;
                }
            }
            Err(DetectorError::EngineStopped) => break,
            Err(e) => {
                report.failed_cycles += 1;
                consecutive_failures += 1;
                if consecutive_failures == 1 || consecutive_failures % ERROR_LOG_INTERVAL == 0 {
                    warn!(
                        "[WORKER] Cycle failed ({} in a row): {}",
                        consecutive_failures, e
                    );
                }
            }
        }
    }

    info!(
        "[WORKER] Detection loop exited after {} cycles ({} failed)",
        report.cycles, report.failed_cycles
    );
    report
}

/// Start [`run_worker`] on its own named thread
pub fn spawn_worker(
    engine: SharedEngine,
    shutdown: ShutdownToken,
) -> DetectorResult<JoinHandle<WorkerReport>> {
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || run_worker(engine, shutdown))
        .map_err(|source| DetectorError::Spawn {
            thread: "worker",
            source,
        })
}
