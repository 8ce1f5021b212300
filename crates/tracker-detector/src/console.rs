// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Operator console
//!
//! Reads one command per line:
//! - `t`: toggle tuning mode
//! - `x`: request shutdown and stop the engine
//!
//! Blank lines are ignored; anything else is reported as invalid.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use crate::engine::SharedEngine;
use crate::shutdown::ShutdownToken;
use crate::{DetectorError, DetectorResult};

pub const CONSOLE_THREAD_NAME: &str = "tracker-console";
pub const INVALID_COMMAND_MESSAGE: &str = "Invalid command. Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleTuning,
    Exit,
}

impl Command {
    /// Parse one input line; surrounding whitespace is ignored
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "t" => Some(Self::ToggleTuning),
            "x" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Why the console loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator entered `x`
    ExitCommand,
    /// Shutdown was requested elsewhere (interrupt)
    Shutdown,
    /// Input was closed; shutdown is left to the interrupt handler
    EndOfInput,
}

pub struct Console<R, W> {
    input: R,
    output: W,
    engine: SharedEngine,
    shutdown: ShutdownToken,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, engine: SharedEngine, shutdown: ShutdownToken) -> Self {
        Self {
            input,
            output,
            engine,
            shutdown,
        }
    }

    pub fn print_banner(&mut self) -> io::Result<()> {
        let (source, sink) = {
            let engine = self.engine.lock();
            (engine.source_name().to_string(), engine.sink_name().to_string())
        };

        writeln!(self.output, "Detector has begun listening to source \"{}\".", source)?;
        writeln!(self.output, "Detector has begun streaming to sink \"{}\".", sink)?;
        writeln!(self.output, "COMMANDS:")?;
        writeln!(self.output, "  t: Toggle tuning mode.")?;
        writeln!(self.output, "  x: Exit.")?;
        self.output.flush()
    }

    /// Process commands until `x`, shutdown, or end of input
    pub fn run(&mut self) -> io::Result<ConsoleExit> {
        let mut buf = Vec::new();

        loop {
            if self.shutdown.is_triggered() {
                return Ok(ConsoleExit::Shutdown);
            }

            buf.clear();
            if self.input.read_until(b'\n', &mut buf)? == 0 {
                info!("[CONSOLE] Input closed; press Ctrl-C to stop the detector");
                return Ok(ConsoleExit::EndOfInput);
            }

            // An interrupt may have arrived while blocked on input
            if self.shutdown.is_triggered() {
                return Ok(ConsoleExit::Shutdown);
            }

            // Bytes that are not UTF-8 become an invalid command
            let line = String::from_utf8_lossy(&buf);
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Some(Command::ToggleTuning) => {
                    let mut engine = self.engine.lock();
                    let enabled = engine.toggle_tune_mode();
                    debug!("[CONSOLE] Tuning mode toggled to {}", enabled);
                }
                Some(Command::Exit) => {
                    let mut engine = self.engine.lock();
                    self.shutdown.trigger();
                    engine.stop();
                    info!("[CONSOLE] Exit requested");
                    return Ok(ConsoleExit::ExitCommand);
                }
                None => {
                    writeln!(self.output, "{}", INVALID_COMMAND_MESSAGE)?;
                    self.output.flush()?;
                }
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Run `console` on its own named thread
pub fn spawn_console<R, W>(
    mut console: Console<R, W>,
) -> DetectorResult<JoinHandle<io::Result<ConsoleExit>>>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    thread::Builder::new()
        .name(CONSOLE_THREAD_NAME.to_string())
        .spawn(move || console.run())
        .map_err(|source| DetectorError::Spawn {
            thread: "console",
            source,
        })
}
