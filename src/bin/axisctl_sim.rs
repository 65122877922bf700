//! Desktop simulation of the dual-axis controller.
//!
//! Stdin is the USB channel: type frames such as `!G1,X100,F600;` and the
//! responses appear on stdout. The axes are the simulated steppers from
//! `hal::mock`, advanced in real time. Safety inputs rest inactive.
//!
//! # Run
//!
//! ```bash
//! RUST_LOG=debug cargo run --features desktop --bin axisctl_sim
//! ```
//!
//! Closing stdin (Ctrl-D) shuts the simulation down.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use rs_axisctl::config::{InputsConfig, MachineConfig, OutputConfig};
use rs_axisctl::controller::MachineController;
use rs_axisctl::debounce::Polarity;
use rs_axisctl::hal::{MockInputs, MockOutputs, MockStepDriver};
use rs_axisctl::services::{run_commands, run_safety, ChannelPort, RunnerConfig, SharedMachine};

/// Simulated stepping period.
const SIM_STEP_MS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Simulated inputs read low at rest.
    let config = MachineConfig::default()
        .with_name("axisctl-sim")
        .with_inputs(InputsConfig::default().with_polarity(Polarity::ActiveHigh))
        .with_outputs(OutputConfig::default().with_alarm_pin(15));

    let driver = MockStepDriver::from_config(&config.linear, &config.rotary);
    let mut controller: MachineController<_, _> =
        MachineController::new(driver, MockOutputs::new(), config);
    controller
        .init()
        .map_err(|()| anyhow!("failed to initialise axes"))?;
    let panel = MockInputs::at_rest(&controller.config().inputs);

    let shared = Arc::new(SharedMachine::new(controller));
    let runner = RunnerConfig::default();
    let (stop, shutdown) = watch::channel(false);
    let (usb, host) = ChannelPort::pair();
    let (input, mut output) = (host.input, host.output);

    let safety = tokio::spawn(run_safety(
        Arc::clone(&shared),
        panel,
        runner,
        shutdown.clone(),
    ));
    let commands = tokio::spawn(run_commands(
        Arc::clone(&shared),
        usb,
        None,
        runner,
        shutdown.clone(),
    ));

    let sim = {
        let shared = Arc::clone(&shared);
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(SIM_STEP_MS));
            loop {
                tokio::select! {
                    _ = ticker.tick() => shared.with_machine(|m| m.driver_mut().advance_ms(SIM_STEP_MS)),
                    _ = shutdown.changed() => break,
                }
            }
        })
    };

    let printer = tokio::spawn(async move {
        while let Some(line) = output.recv().await {
            println!("{line}");
        }
    });

    log::info!("reading frames from stdin, Ctrl-D to quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if input.send(line.into_bytes()).is_err() {
            break;
        }
    }

    log::info!("stdin closed, shutting down");
    stop.send(true).context("signalling shutdown")?;

    safety
        .await?
        .map_err(|()| anyhow!("driver failed in safety cadence"))?;
    commands
        .await?
        .map_err(|()| anyhow!("driver failed in command cadence"))?;
    sim.await?;
    printer.abort();

    let status = shared.status();
    log::info!(
        "final state {} at X{} R{}",
        status.state.as_str(),
        status.linear,
        status.rotary
    );
    Ok(())
}
