//! # rs-axisctl
//!
//! Core of a dual-axis (linear + rotary) stepper motion controller driven by a
//! G-code-like serial protocol.
//!
//! ## Features
//!
//! - **Framed protocol**: `!TOKEN,FIELD,...;` lines on two serial channels
//!   (host USB and front-panel display)
//! - **Per-channel command queues** with bounded replay for `M999` jumps
//! - **State machine** with a fixed table of which commands may run in which
//!   state, and head-of-line blocking for the rest
//! - **Motion coordination**: modal feeds, synchronized linear/rotary feeds,
//!   travel clamping and a two-phase homing sequence
//! - **Safety reactor**: debounced limit, home and e-stop inputs that act
//!   without waiting on the queues
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware abstractions (step driver, serial, outputs, inputs, clock)
//! - `commands` / `parsing` - Command model and wire protocol
//! - `queue` - Ring buffer with rewind
//! - `state` - Machine state record and admissibility table
//! - `motion` - Turns commands into step driver requests
//! - `debounce` / `safety` - Input debouncing and safety reactions
//! - `controller` - Ties everything together
//! - `hal` - Concrete implementations (mocks, software stepper model, pin adapters)
//! - `services` - Shared state and the desktop runner (`std` / `desktop`)
//!
//! ## Example
//!
//! ```rust
//! use rs_axisctl::{
//!     Channel, MachineConfig, MachineController, MachineState, Response,
//!     hal::{MockOutputs, MockStepDriver},
//! };
//!
//! let mut machine: MachineController<_, _> =
//!     MachineController::new(MockStepDriver::new(), MockOutputs::new(), MachineConfig::default());
//!
//! // Relative move, then wait for it to finish.
//! machine.feed_usb(b"!G91;!G1,X100,R90,F1000;", 0).unwrap();
//! machine.poll(0).unwrap();
//! assert_eq!(machine.state(), MachineState::Moving);
//!
//! machine.driver_mut().complete_moves();
//! machine.poll(5).unwrap();
//! assert_eq!(machine.state(), MachineState::Idle);
//! assert_eq!(machine.pop_response(Channel::Usb), Some(Response::Idle));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Command model: kinds, fields and wire tokens.
pub mod commands;
/// The machine controller: intake, dispatch, tick and safety reactions.
pub mod controller;
/// Debounced digital inputs.
pub mod debounce;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Coordinated motion of the two axes, including homing.
pub mod motion;
/// Byte framing and line parsing.
pub mod parsing;
/// Per-channel command ring buffer with rewind.
pub mod queue;
/// Safety input bank and the input-to-action mapping.
pub mod safety;
/// Machine states, coordinate systems and command admissibility.
pub mod state;
/// Core traits for hardware abstraction.
pub mod traits;

/// Startup configuration.
pub mod config;

/// Responses sent back over the serial channels.
pub mod messages;

/// Shared state and desktop runner (requires `std`).
#[cfg(feature = "std")]
pub mod services;

// Re-exports for convenience
pub use commands::{Command, CommandKind, Field, Frame};
pub use controller::{Channel, DispatchOutcome, MachineController, MachineStatus};
pub use debounce::{DebounceTiming, DebouncedInput, InputEvent, Polarity};
pub use motion::{HomingStep, MotionCoordinator, MovePlan};
pub use parsing::{parse_command, LineFramer};
pub use queue::CommandQueue;
pub use safety::{SafetyAction, SafetyInputs};
pub use state::{is_admissible, CoordinateSystem, MachineState, MachineStateTracker};
pub use traits::{
    Axis, Clock, DigitalOutputs, InputLevels, InputSampler, SerialPort, StepDriver,
};

// Config re-exports
pub use config::{
    AxisConfig, EndstopConfig, HomingConfig, InputsConfig, MachineConfig, OutputConfig,
    PingConfig, SerialConfig,
};

// Message re-exports
pub use messages::{MotionFault, Response, Warning};
