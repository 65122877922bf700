//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all collaborator traits, enabling
//! development and testing on desktop without a machine attached.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockStepDriver`] | [`StepDriver`] | Two simulated axes plus a log of every move |
//! | [`MockSerial`] | [`SerialPort`] | Queued input bytes and captured output lines |
//! | [`MockOutputs`] | [`DigitalOutputs`] | Records pin writes |
//! | [`MockInputs`] | [`InputSampler`] | Settable raw input levels |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::hal::{MockOutputs, MockStepDriver};
//! use rs_axisctl::controller::MachineController;
//! use rs_axisctl::config::MachineConfig;
//! use rs_axisctl::state::MachineState;
//!
//! let mut machine: MachineController<_, _> =
//!     MachineController::new(MockStepDriver::new(), MockOutputs::new(), MachineConfig::default());
//!
//! machine.feed_usb(b"!G1,X100,F600;", 0).unwrap();
//! machine.poll(0).unwrap();
//! assert_eq!(machine.state(), MachineState::Moving);
//!
//! machine.driver_mut().complete_moves();
//! machine.poll(10).unwrap();
//! assert_eq!(machine.state(), MachineState::Idle);
//! ```
//!
//! [`StepDriver`]: crate::traits::StepDriver
//! [`SerialPort`]: crate::traits::SerialPort
//! [`DigitalOutputs`]: crate::traits::DigitalOutputs
//! [`InputSampler`]: crate::traits::InputSampler
//! [`Clock`]: crate::traits::Clock

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use super::stepper::StepperAxis;
use crate::config::{AxisConfig, InputConfig, InputsConfig};
use crate::traits::{
    Axis, Clock, DigitalOutputs, InputLevels, InputSampler, SerialPort, StepDriver,
    OUTPUT_PIN_COUNT,
};

// ============================================================================
// Step Driver Mock
// ============================================================================

/// One recorded `move_to` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRecord {
    /// Axis that was commanded.
    pub axis: Axis,
    /// Absolute target in units.
    pub target: i32,
    /// Requested speed in units/min.
    pub speed: u32,
}

/// Mock step driver for testing.
///
/// Each axis is a [`StepperAxis`]; time only passes when the test calls
/// [`advance_ms`](Self::advance_ms) or [`complete_moves`](Self::complete_moves).
/// Every command is recorded in the public fields.
///
/// # Example
///
/// ```rust
/// use rs_axisctl::hal::MockStepDriver;
/// use rs_axisctl::traits::{Axis, StepDriver};
///
/// let mut driver = MockStepDriver::new();
/// driver.move_to(Axis::Rotary, 90, 600).unwrap();
/// assert_eq!(driver.last_move(Axis::Rotary).unwrap().target, 90);
///
/// // 600 units/min at one step per unit: 10 units per second.
/// driver.advance_ms(1000);
/// assert_eq!(driver.current_position(Axis::Rotary), 10);
///
/// driver.complete_moves();
/// assert_eq!(driver.current_position(Axis::Rotary), 90);
/// assert!(!driver.any_moving());
/// ```
#[derive(Debug)]
pub struct MockStepDriver {
    axes: [StepperAxis; 2],
    /// Every `move_to` call, oldest first.
    pub moves: Vec<MoveRecord>,
    /// Number of `stop` calls per axis.
    pub stops: [usize; 2],
    /// When set, every command fails with `Err(())`.
    pub fail: bool,
}

impl MockStepDriver {
    /// Two axes at one step per unit with no practical speed limit.
    pub fn new() -> Self {
        Self::with_axes(StepperAxis::new(1.0, u32::MAX), StepperAxis::new(1.0, u32::MAX))
    }

    /// Axes modelled from machine configuration.
    pub fn from_config(linear: &AxisConfig, rotary: &AxisConfig) -> Self {
        let build = |cfg: &AxisConfig| {
            StepperAxis::new(cfg.steps_per_unit, cfg.max_speed)
                .with_invert_direction(cfg.invert_direction)
        };
        Self::with_axes(build(linear), build(rotary))
    }

    fn with_axes(linear: StepperAxis, rotary: StepperAxis) -> Self {
        Self {
            axes: [linear, rotary],
            moves: Vec::new(),
            stops: [0; 2],
            fail: false,
        }
    }

    /// Simulated axis.
    pub fn axis(&self, axis: Axis) -> &StepperAxis {
        &self.axes[axis.index()]
    }

    /// Let `ms` milliseconds of stepping happen on both axes.
    pub fn advance_ms(&mut self, ms: u64) {
        for axis in &mut self.axes {
            axis.advance(ms * 1000);
        }
    }

    /// Bring both axes to their targets.
    pub fn complete_moves(&mut self) {
        for axis in &mut self.axes {
            axis.finish();
        }
    }

    /// Most recent move on `axis`.
    pub fn last_move(&self, axis: Axis) -> Option<MoveRecord> {
        self.moves.iter().rev().find(|m| m.axis == axis).copied()
    }

    /// Whether the driver for `axis` is energized.
    pub fn is_enabled(&self, axis: Axis) -> bool {
        self.axes[axis.index()].is_enabled()
    }

    /// Last acceleration set on `axis`.
    pub fn acceleration(&self, axis: Axis) -> u32 {
        self.axes[axis.index()].acceleration()
    }

    fn check(&self) -> Result<(), ()> {
        if self.fail {
            Err(())
        } else {
            Ok(())
        }
    }
}

impl Default for MockStepDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl StepDriver for MockStepDriver {
    type Error = ();

    fn move_to(&mut self, axis: Axis, target: i32, speed: u32) -> Result<(), ()> {
        self.check()?;
        self.moves.push(MoveRecord {
            axis,
            target,
            speed,
        });
        self.axes[axis.index()].move_to(target, speed);
        Ok(())
    }

    fn stop(&mut self, axis: Axis) -> Result<(), ()> {
        self.check()?;
        self.stops[axis.index()] += 1;
        self.axes[axis.index()].stop();
        Ok(())
    }

    fn set_enabled(&mut self, axis: Axis, enabled: bool) -> Result<(), ()> {
        self.check()?;
        self.axes[axis.index()].set_enabled(enabled);
        Ok(())
    }

    fn set_current_position(&mut self, axis: Axis, position: i32) -> Result<(), ()> {
        self.check()?;
        self.axes[axis.index()].set_current_position(position);
        Ok(())
    }

    fn set_acceleration(&mut self, axis: Axis, acceleration: u32) -> Result<(), ()> {
        self.check()?;
        self.axes[axis.index()].set_acceleration(acceleration);
        Ok(())
    }

    fn current_position(&self, axis: Axis) -> i32 {
        self.axes[axis.index()].current_units()
    }

    fn is_moving(&self, axis: Axis) -> bool {
        self.axes[axis.index()].is_moving()
    }

    fn speed(&self, axis: Axis) -> u32 {
        self.axes[axis.index()].speed()
    }
}

// ============================================================================
// Serial Mock
// ============================================================================

/// Mock serial port for testing.
///
/// # Example
///
/// ```rust
/// use rs_axisctl::hal::MockSerial;
/// use rs_axisctl::traits::SerialPort;
///
/// let mut port = MockSerial::new();
/// port.queue_str("!M114;");
/// assert_eq!(port.available(), 6);
/// assert_eq!(port.read_byte(), Some(b'!'));
///
/// port.write_line("!0;").unwrap();
/// assert_eq!(port.written, vec!["!0;".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct MockSerial {
    /// Bytes waiting to be read.
    pub incoming: VecDeque<u8>,
    /// Lines written by the controller.
    pub written: Vec<String>,
}

impl MockSerial {
    /// Creates an empty port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for reading.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    /// Queue a string for reading.
    pub fn queue_str(&mut self, s: &str) {
        self.queue_bytes(s.as_bytes());
    }

    /// Take all written lines, leaving the log empty.
    pub fn take_written(&mut self) -> Vec<String> {
        core::mem::take(&mut self.written)
    }
}

impl SerialPort for MockSerial {
    type Error = ();

    fn available(&self) -> usize {
        self.incoming.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.incoming.pop_front()
    }

    fn write_line(&mut self, line: &str) -> Result<(), ()> {
        self.written.push(line.into());
        Ok(())
    }
}

// ============================================================================
// Output and Input Mocks
// ============================================================================

/// Mock relay outputs for testing.
///
/// # Example
///
/// ```rust
/// use rs_axisctl::hal::MockOutputs;
/// use rs_axisctl::traits::DigitalOutputs;
///
/// let mut outputs = MockOutputs::new();
/// outputs.write(9, true).unwrap();
/// assert!(outputs.pins[9]);
/// assert!(outputs.write(16, true).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockOutputs {
    /// Current level of every pin.
    pub pins: [bool; OUTPUT_PIN_COUNT as usize],
    /// Every successful write, oldest first.
    pub writes: Vec<(u8, bool)>,
}

impl MockOutputs {
    /// Creates outputs with every pin low.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DigitalOutputs for MockOutputs {
    type Error = ();

    fn write(&mut self, pin: u8, high: bool) -> Result<(), ()> {
        let slot = self.pins.get_mut(pin as usize).ok_or(())?;
        *slot = high;
        self.writes.push((pin, high));
        Ok(())
    }
}

/// Mock input sampler returning whatever levels the test sets.
#[derive(Debug, Default)]
pub struct MockInputs {
    /// Levels returned by the next sample.
    pub levels: InputLevels,
}

impl MockInputs {
    /// Creates a sampler with every input low.
    ///
    /// Low reads as triggered for active-low inputs, which is the default
    /// polarity. Use [`MockInputs::at_rest`] for a quiet panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sampler with every input at its untriggered level for `config`.
    pub fn at_rest(config: &InputsConfig) -> Self {
        let rest = |input: InputConfig| input.polarity.resting_level();
        Self::with_levels(InputLevels {
            limit_min: rest(config.limit_min),
            limit_max: rest(config.limit_max),
            home: rest(config.home),
            estop: rest(config.estop),
            home_button: rest(config.home_button),
            resume_button: rest(config.resume_button),
        })
    }

    /// Creates a sampler returning `levels`.
    pub fn with_levels(levels: InputLevels) -> Self {
        Self { levels }
    }
}

impl InputSampler for MockInputs {
    fn read_levels(&mut self) -> InputLevels {
        self.levels
    }
}

// ============================================================================
// Clock Mock
// ============================================================================

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_axisctl::hal::MockClock;
/// use rs_axisctl::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Tests
// ============================================================================
