// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use std::io::{self, BufReader};
use std::sync::Arc;
use tracing::{error, info};

use tracker_detector::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use tracker_detector::{install_interrupt_handler, parse_args, run_node, NodeOptions, ShutdownToken};
use tracker_observability::{init_logging, parse_debug_flags, CrateDebugFlags};
use tracker_shmem::ShmNamespace;

fn main() {
    let code = match parse_args(std::env::args_os()) {
        Ok(options) => run(&options),
        Err(err) => err.report(),
    };
    std::process::exit(code);
}

fn run(options: &NodeOptions) -> i32 {
    let mut debug_flags = parse_debug_flags();
    debug_flags.merge(CrateDebugFlags::from_crate_names(&options.debug_crates));
    if let Err(e) = init_logging(&debug_flags) {
        eprintln!("{:#}", e);
    }

    match run_detector(options) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!("[DETECTOR] {:#}", e);
            EXIT_FAILURE
        }
    }
}

fn run_detector(options: &NodeOptions) -> Result<()> {
    let namespace = match &options.shm_dir {
        Some(dir) => ShmNamespace::new(dir),
        None => ShmNamespace::from_env(),
    };
    info!(
        "[DETECTOR] {} detector, shared memory at {}",
        options.kind.description(),
        namespace.root().display()
    );

    let shutdown = ShutdownToken::new();
    install_interrupt_handler(shutdown.clone()).context("Failed to install interrupt handler")?;

    let report = run_node(
        options,
        Arc::new(namespace),
        shutdown,
        BufReader::new(io::stdin()),
        io::stdout(),
    )?;

    println!("Detector is exiting.");
    info!(
        "[DETECTOR] {} frames processed, {} source errors, {} sink errors",
        report.engine.frames_processed, report.engine.source_errors, report.engine.sink_errors
    );
    Ok(())
}
