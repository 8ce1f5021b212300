// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Detector node orchestration
//!
//! Builds the engine, starts the worker and console threads, waits for
//! shutdown, and tears everything down in order:
//!
//! 1. wait for the shutdown flag
//! 2. join the worker
//! 3. join the console if it has finished (a console still blocked on input
//!    after an interrupt is left behind; process exit reclaims it)
//! 4. stop the engine, releasing every channel
//! 5. drop the engine

use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cli::NodeOptions;
use crate::console::{spawn_console, Console, ConsoleExit};
use crate::engine::{DetectorEngine, EngineStats};
use crate::shutdown::ShutdownToken;
use crate::strategy::create_strategy;
use crate::worker::{spawn_worker, WorkerReport};
use tracker_shmem::ChannelProvider;

/// How often the coordinator checks on the worker while waiting for shutdown
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of a node run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeReport {
    pub worker: WorkerReport,
    pub engine: EngineStats,
    /// `None` when the console was still blocked on input at teardown
    pub console: Option<ConsoleExit>,
}

/// Run a detector node until shutdown
///
/// # Errors
///
/// Fails on configuration errors (before any thread starts), thread spawn
/// failures, and a panicked worker.
pub fn run_node<R, W>(
    options: &NodeOptions,
    channels: Arc<dyn ChannelProvider>,
    shutdown: ShutdownToken,
    input: R,
    output: W,
) -> Result<NodeReport>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let mut engine = DetectorEngine::new(
        create_strategy(options.kind),
        channels,
        options.source.clone(),
        options.sink.clone(),
    );

    if let Some(config) = &options.config {
        engine.configure(&config.file, &config.key).with_context(|| {
            format!(
                "Failed to configure {} detector from '{}' [{}]",
                options.kind,
                config.file.display(),
                config.key
            )
        })?;
    }

    engine.start()?;
    let engine = engine.into_shared();

    let worker = spawn_worker(engine.clone(), shutdown.clone())?;

    let mut console = Console::new(input, output, engine.clone(), shutdown.clone());
    if let Err(e) = console.print_banner() {
        warn!("[NODE] Could not print console banner: {}", e);
    }
    let console = match spawn_console(console) {
        Ok(handle) => handle,
        Err(e) => {
            shutdown.trigger();
            let _ = worker.join();
            return Err(e.into());
        }
    };

    // Wait for `x` or an interrupt; also notice a worker that died early
    while !shutdown.wait_timeout(SUPERVISE_INTERVAL) {
        if worker.is_finished() {
            error!("[NODE] Detection worker exited unexpectedly");
            shutdown.trigger();
        }
    }

    info!("[NODE] Shutting down...");

    let worker_report = worker
        .join()
        .map_err(|_| anyhow!("Detection worker panicked"));

    let console_exit = if console.is_finished() {
        match console.join() {
            Ok(Ok(exit)) => Some(exit),
            Ok(Err(e)) => {
                warn!("[NODE] Console input failed: {}", e);
                None
            }
            Err(_) => {
                warn!("[NODE] Console thread panicked");
                None
            }
        }
    } else {
        debug!("[NODE] Console still waiting for input; leaving it behind");
        None
    };

    let engine_stats = {
        let mut engine = engine.lock();
        engine.stop();
        engine.stats()
    };
    drop(engine);

    let worker = worker_report?;
    info!(
        "[NODE] Detector exited: {} cycles, {} positions served",
        worker.cycles, engine_stats.positions_served
    );

    Ok(NodeReport {
        worker,
        engine: engine_stats,
        console: console_exit,
    })
}
