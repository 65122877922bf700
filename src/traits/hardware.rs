//! Hardware abstraction traits for the step driver, serial transport, digital
//! outputs and safety inputs.
//!
//! This module defines the collaborator interfaces that keep the motion core
//! independent of the board it runs on (a microcontroller with an I2C port
//! expander, a desktop simulation, or test mocks).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`StepDriver`] | Step-pulse engine for the linear and rotary axes |
//! | [`SerialPort`] | Byte-oriented serial transport |
//! | [`DigitalOutputs`] | Relay-style output pins across two 8-pin banks |
//! | [`InputSampler`] | Raw levels of the safety and panel inputs |
//! | [`Clock`] | Monotonic time source for `no_std` environments |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`].
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::traits::{Axis, StepDriver};
//! use rs_axisctl::hal::MockStepDriver;
//!
//! let mut driver = MockStepDriver::new();
//! driver.move_to(Axis::Linear, 100, 600).unwrap();
//! assert!(driver.is_moving(Axis::Linear));
//!
//! driver.stop(Axis::Linear).unwrap();
//! assert!(!driver.is_moving(Axis::Linear));
//! ```

/// One independently driven stepper axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// Linear carriage, positions in millimetres.
    Linear,
    /// Rotary spindle, positions in degrees.
    Rotary,
}

impl Axis {
    /// Both axes, linear first.
    pub const ALL: [Axis; 2] = [Axis::Linear, Axis::Rotary];

    /// Index of the axis in per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::Linear => 0,
            Axis::Rotary => 1,
        }
    }

    /// Wire field letter used for this axis' position.
    #[inline]
    pub const fn position_letter(self) -> char {
        match self {
            Axis::Linear => 'X',
            Axis::Rotary => 'R',
        }
    }
}

/// Step-pulse engine contract.
///
/// Positions are in axis units (mm or degrees) and speeds in units per
/// minute. Conversion to steps and step periods is the driver's job; see
/// [`StepperAxis`](crate::hal::StepperAxis) for a software model of that math.
///
/// # Implementation Notes
///
/// - `move_to` replaces any in-flight target; it never queues.
/// - `stop` halts immediately, there is no deceleration ramp at this level.
/// - Queries must be cheap, they are polled on every tick.
pub trait StepDriver {
    /// Error type for driver operations.
    type Error;

    /// Start moving `axis` toward an absolute target at `speed` units/min.
    fn move_to(&mut self, axis: Axis, target: i32, speed: u32) -> Result<(), Self::Error>;

    /// Stop `axis` immediately, keeping its current position.
    fn stop(&mut self, axis: Axis) -> Result<(), Self::Error>;

    /// Energize or release the axis driver.
    fn set_enabled(&mut self, axis: Axis, enabled: bool) -> Result<(), Self::Error>;

    /// Redefine the current position of `axis` without moving it.
    fn set_current_position(&mut self, axis: Axis, position: i32) -> Result<(), Self::Error>;

    /// Set the acceleration used by the driver in units/min².
    fn set_acceleration(&mut self, axis: Axis, acceleration: u32) -> Result<(), Self::Error>;

    /// Current position of `axis` in units.
    fn current_position(&self, axis: Axis) -> i32;

    /// Returns true while `axis` has distance left to go.
    fn is_moving(&self, axis: Axis) -> bool;

    /// Current commanded speed of `axis` in units/min.
    fn speed(&self, axis: Axis) -> u32;

    /// Convenience method to stop both axes.
    fn stop_all(&mut self) -> Result<(), Self::Error> {
        self.stop(Axis::Linear)?;
        self.stop(Axis::Rotary)
    }

    /// Returns true if either axis is moving.
    fn any_moving(&self) -> bool {
        Axis::ALL.iter().any(|&axis| self.is_moving(axis))
    }
}

/// Byte-oriented serial transport.
///
/// Framing is handled by [`LineFramer`](crate::parsing::LineFramer); the
/// transport only moves bytes in and complete response lines out.
pub trait SerialPort {
    /// Error type for write operations.
    type Error;

    /// Number of bytes ready to be read without blocking.
    fn available(&self) -> usize;

    /// Read one byte, `None` if nothing is buffered.
    fn read_byte(&mut self) -> Option<u8>;

    /// Write one complete response line (already framed).
    fn write_line(&mut self, line: &str) -> Result<(), Self::Error>;
}

/// Number of relay output pins (two banks of eight).
pub const OUTPUT_PIN_COUNT: u8 = 16;

/// Relay-style digital outputs.
///
/// Pins `0..8` live on the first bank and `8..16` on the second.
pub trait DigitalOutputs {
    /// Error type for output operations.
    type Error;

    /// Drive output `pin` high or low.
    fn write(&mut self, pin: u8, high: bool) -> Result<(), Self::Error>;
}

/// Raw electrical levels of every safety and panel input, as read from the
/// pins before polarity normalization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputLevels {
    /// Travel limit at the minimum end of the linear axis.
    pub limit_min: bool,
    /// Travel limit at the maximum end of the linear axis.
    pub limit_max: bool,
    /// Home reference switch.
    pub home: bool,
    /// Emergency stop mushroom button.
    pub estop: bool,
    /// Front panel "home" button.
    pub home_button: bool,
    /// Front panel "resume" button.
    pub resume_button: bool,
}

/// Source of raw input levels, sampled on the safety cadence.
pub trait InputSampler {
    /// Read all inputs at once.
    fn read_levels(&mut self) -> InputLevels;
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for debounce windows, wait
/// states, ping deadlines and homing timeouts.
///
/// # Example
///
/// ```rust
/// use rs_axisctl::traits::Clock;
/// use rs_axisctl::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
