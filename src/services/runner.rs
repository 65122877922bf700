//! Two-cadence tokio runner for desktop simulation.
//!
//! The safety cadence samples inputs on a short fixed period and reacts
//! immediately. The command cadence moves serial bytes in, runs
//! [`MachineController::poll`](crate::controller::MachineController::poll)
//! and writes responses out. Both share one [`SharedMachine`] and stop when
//! the shutdown signal flips to `true`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::watch;
//! use rs_axisctl::controller::MachineController;
//! use rs_axisctl::config::MachineConfig;
//! use rs_axisctl::hal::{MockInputs, MockOutputs, MockStepDriver};
//! use rs_axisctl::services::{run_commands, run_safety, ChannelPort, RunnerConfig, SharedMachine};
//!
//! # async fn demo() {
//! let controller: MachineController<_, _> =
//!     MachineController::new(MockStepDriver::new(), MockOutputs::new(), MachineConfig::default());
//! let shared = Arc::new(SharedMachine::new(controller));
//! let (usb, _host) = ChannelPort::pair();
//! let (_stop, shutdown) = watch::channel(false);
//! let config = RunnerConfig::default();
//!
//! let safety = tokio::spawn(run_safety(Arc::clone(&shared), MockInputs::new(), config, shutdown.clone()));
//! let commands = tokio::spawn(run_commands(shared, usb, None, config, shutdown));
//! # let _ = (safety.await, commands.await);
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::controller::Channel;
use crate::traits::{DigitalOutputs, InputSampler, SerialPort, StepDriver};

use super::shared::SharedMachine;

/// Safety cadence period.
pub const DEFAULT_SAFETY_PERIOD_MS: u64 = 1;

/// Command cadence period.
pub const DEFAULT_COMMAND_PERIOD_MS: u64 = 5;

// ============================================================================
// Runner Config
// ============================================================================

/// Cadence periods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Input sampling period in milliseconds.
    pub safety_period_ms: u64,
    /// Serial and dispatch period in milliseconds.
    pub command_period_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            safety_period_ms: DEFAULT_SAFETY_PERIOD_MS,
            command_period_ms: DEFAULT_COMMAND_PERIOD_MS,
        }
    }
}

impl RunnerConfig {
    /// Set the safety period.
    pub fn with_safety_period_ms(mut self, ms: u64) -> Self {
        self.safety_period_ms = ms.max(1);
        self
    }

    /// Set the command period.
    pub fn with_command_period_ms(mut self, ms: u64) -> Self {
        self.command_period_ms = ms.max(1);
        self
    }
}

// ============================================================================
// Channel Port
// ============================================================================

/// The other side of the port's channels closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortClosed;

impl fmt::Display for PortClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("serial peer disconnected")
    }
}

impl std::error::Error for PortClosed {}

/// Serial port backed by tokio channels.
///
/// Chunks sent through [`HostEnd::input`] become readable bytes; every line
/// the controller writes arrives on [`HostEnd::output`].
#[derive(Debug)]
pub struct ChannelPort {
    incoming: mpsc::UnboundedReceiver<Vec<u8>>,
    outgoing: mpsc::UnboundedSender<String>,
    pending: VecDeque<u8>,
}

/// Host side of a [`ChannelPort`].
#[derive(Debug)]
pub struct HostEnd {
    /// Bytes for the controller.
    pub input: mpsc::UnboundedSender<Vec<u8>>,
    /// Lines from the controller.
    pub output: mpsc::UnboundedReceiver<String>,
}

impl ChannelPort {
    /// A connected port and its host end.
    pub fn pair() -> (ChannelPort, HostEnd) {
        let (input, incoming) = mpsc::unbounded_channel();
        let (outgoing, output) = mpsc::unbounded_channel();
        let port = ChannelPort {
            incoming,
            outgoing,
            pending: VecDeque::new(),
        };
        (port, HostEnd { input, output })
    }

    fn pump(&mut self) {
        while let Ok(chunk) = self.incoming.try_recv() {
            self.pending.extend(chunk);
        }
    }
}

impl SerialPort for ChannelPort {
    type Error = PortClosed;

    fn available(&self) -> usize {
        self.pending.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            self.pump();
        }
        self.pending.pop_front()
    }

    fn write_line(&mut self, line: &str) -> Result<(), PortClosed> {
        self.outgoing.send(line.to_owned()).map_err(|_| PortClosed)
    }
}

// ============================================================================
// Cadences
// ============================================================================

fn ticker(period_ms: u64) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_millis(period_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Safety cadence: sample `sampler` every `safety_period_ms` until shutdown.
pub async fn run_safety<D, O, I, const Q: usize, const L: usize>(
    machine: Arc<SharedMachine<D, O, Q, L>>,
    mut sampler: I,
    config: RunnerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), D::Error>
where
    D: StepDriver + Send,
    O: DigitalOutputs + Send,
    I: InputSampler,
{
    let mut ticker = ticker(config.safety_period_ms);
    log::debug!("safety cadence every {} ms", config.safety_period_ms);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now_ms = machine.now_ms();
                let levels = sampler.read_levels();
                machine.with_machine(|m| m.sample_safety(&levels, now_ms))?;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Command cadence: serial intake, tick and dispatch, then responses, every
/// `command_period_ms` until shutdown. State changes are logged.
pub async fn run_commands<D, O, S, const Q: usize, const L: usize>(
    machine: Arc<SharedMachine<D, O, Q, L>>,
    mut usb: S,
    mut display: Option<S>,
    config: RunnerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), D::Error>
where
    D: StepDriver + Send,
    O: DigitalOutputs + Send,
    S: SerialPort,
{
    let mut ticker = ticker(config.command_period_ms);
    log::debug!("command cadence every {} ms", config.command_period_ms);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now_ms = machine.now_ms();
                machine.with_machine(|m| {
                    m.poll_serial(Channel::Usb, &mut usb, now_ms)?;
                    if let Some(port) = display.as_mut() {
                        m.poll_serial(Channel::Display, port, now_ms)?;
                    }
                    m.poll(now_ms)?;
                    m.flush(Channel::Usb, &mut usb);
                    if let Some(port) = display.as_mut() {
                        m.flush(Channel::Display, port);
                    }
                    Ok(())
                })?;

                if let Some(status) = machine.check_changes() {
                    log::info!(
                        "state {} at X{} R{}",
                        status.state.as_str(),
                        status.linear,
                        status.rotary
                    );
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    Ok(())
}
