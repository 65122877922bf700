//! Startup configuration for the motion controller.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`. Nothing here changes at runtime;
//! the few live-adjustable values (max travel, acceleration, positions) are
//! changed by commands and live in the controller.
//!
//! Queue capacity and line buffer size are const generics on
//! [`MachineController`](crate::controller::MachineController) rather than
//! fields, so storage stays statically sized.
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::config::{AxisConfig, HomingConfig, MachineConfig};
//!
//! // Use defaults
//! let config = MachineConfig::default();
//! assert_eq!(config.serial.baud_rate, 115_200);
//!
//! // Or customize
//! let config = MachineConfig::default()
//!     .with_linear(AxisConfig::linear().with_max_speed(2000))
//!     .with_homing(HomingConfig::default().with_timeout_ms(30_000));
//! assert_eq!(config.linear.max_speed, 2000);
//! ```

use heapless::String as HString;

use crate::debounce::{DebounceTiming, Polarity};

/// Maximum length for short config strings (axis and machine names)
pub const MAX_SHORT_STRING: usize = 32;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let take = s.len().min(MAX_SHORT_STRING);
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete machine configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineConfig {
    /// Machine name used in logs
    pub name: ShortString,
    /// Linear axis (positions in mm)
    pub linear: AxisConfig,
    /// Rotary axis (positions in degrees)
    pub rotary: AxisConfig,
    /// Endstop positions and travel limit
    pub endstops: EndstopConfig,
    /// Polarity and debounce timing of every input
    pub inputs: InputsConfig,
    /// Two-phase homing parameters
    pub homing: HomingConfig,
    /// Serial channels
    pub serial: SerialConfig,
    /// Liveness ping
    pub ping: PingConfig,
    /// Relay outputs
    pub outputs: OutputConfig,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: short_string("axisctl"),
            linear: AxisConfig::linear(),
            rotary: AxisConfig::rotary(),
            endstops: EndstopConfig::default(),
            inputs: InputsConfig::default(),
            homing: HomingConfig::default(),
            serial: SerialConfig::default(),
            ping: PingConfig::default(),
            outputs: OutputConfig::default(),
        }
    }
}

impl MachineConfig {
    /// Set the machine name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set linear axis configuration
    pub fn with_linear(mut self, linear: AxisConfig) -> Self {
        self.linear = linear;
        self
    }

    /// Set rotary axis configuration
    pub fn with_rotary(mut self, rotary: AxisConfig) -> Self {
        self.rotary = rotary;
        self
    }

    /// Set endstop configuration
    pub fn with_endstops(mut self, endstops: EndstopConfig) -> Self {
        self.endstops = endstops;
        self
    }

    /// Set input configuration
    pub fn with_inputs(mut self, inputs: InputsConfig) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set homing configuration
    pub fn with_homing(mut self, homing: HomingConfig) -> Self {
        self.homing = homing;
        self
    }

    /// Set serial configuration
    pub fn with_serial(mut self, serial: SerialConfig) -> Self {
        self.serial = serial;
        self
    }

    /// Set ping configuration
    pub fn with_ping(mut self, ping: PingConfig) -> Self {
        self.ping = ping;
        self
    }

    /// Set output configuration
    pub fn with_outputs(mut self, outputs: OutputConfig) -> Self {
        self.outputs = outputs;
        self
    }
}

// ============================================================================
// Axis Config
// ============================================================================

/// Steps per unit of the stock lead screw and spindle drives.
pub const DEFAULT_STEPS_PER_UNIT: f32 = 4.444_444_4;

/// Per-axis drive parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisConfig {
    /// Axis name used in logs
    pub name: ShortString,
    /// Motor steps per axis unit
    pub steps_per_unit: f32,
    /// Maximum speed in units/min
    pub max_speed: u32,
    /// Maximum acceleration in units/min²
    pub max_acceleration: u32,
    /// Reverse the direction output (wiring inversion)
    pub invert_direction: bool,
    /// Feed used by moves that never specified one, in units/min
    pub default_feed: u32,
}

impl AxisConfig {
    /// Stock linear axis
    pub fn linear() -> Self {
        Self {
            name: short_string("linear"),
            steps_per_unit: DEFAULT_STEPS_PER_UNIT,
            max_speed: 1440,
            max_acceleration: 10_000_000,
            invert_direction: false,
            default_feed: 600,
        }
    }

    /// Stock rotary axis
    pub fn rotary() -> Self {
        Self {
            name: short_string("rotary"),
            ..Self::linear()
        }
    }

    /// Set the steps per unit
    pub fn with_steps_per_unit(mut self, steps: f32) -> Self {
        self.steps_per_unit = steps;
        self
    }

    /// Set the maximum speed
    pub fn with_max_speed(mut self, speed: u32) -> Self {
        self.max_speed = speed;
        self
    }

    /// Set the maximum acceleration
    pub fn with_max_acceleration(mut self, accel: u32) -> Self {
        self.max_acceleration = accel;
        self
    }

    /// Set direction inversion
    pub fn with_invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Set the default feed
    pub fn with_default_feed(mut self, feed: u32) -> Self {
        self.default_feed = feed;
        self
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self::linear()
    }
}

// ============================================================================
// Endstop Config
// ============================================================================

/// Positions associated with the linear axis endstops
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndstopConfig {
    /// Position the axis snaps to when the minimum limit fires
    pub min_position: i32,
    /// Position the axis snaps to when the maximum limit fires (0 = max travel)
    pub max_position: i32,
    /// Position of the home switch
    pub home_position: i32,
    /// Initial linear travel limit (0 = unconstrained, `M208` overrides)
    pub max_travel: i32,
}

impl EndstopConfig {
    /// Set the minimum endstop position
    pub fn with_min_position(mut self, pos: i32) -> Self {
        self.min_position = pos;
        self
    }

    /// Set the maximum endstop position
    pub fn with_max_position(mut self, pos: i32) -> Self {
        self.max_position = pos;
        self
    }

    /// Set the home switch position
    pub fn with_home_position(mut self, pos: i32) -> Self {
        self.home_position = pos;
        self
    }

    /// Set the initial travel limit
    pub fn with_max_travel(mut self, travel: i32) -> Self {
        self.max_travel = travel;
        self
    }

    /// Snap position for the maximum limit given the live travel limit.
    pub fn resolved_max_position(&self, max_travel: i32) -> i32 {
        if self.max_position != 0 {
            self.max_position
        } else {
            max_travel
        }
    }
}

// ============================================================================
// Input Config
// ============================================================================

/// Polarity and timing of one input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputConfig {
    /// Electrical polarity
    pub polarity: Polarity,
    /// Debounce timing
    pub timing: DebounceTiming,
}

impl InputConfig {
    /// Set the polarity
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Set the debounce timing
    pub fn with_timing(mut self, timing: DebounceTiming) -> Self {
        self.timing = timing;
        self
    }
}

/// Per-input configuration for every safety and panel input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputsConfig {
    /// Minimum travel limit
    pub limit_min: InputConfig,
    /// Maximum travel limit
    pub limit_max: InputConfig,
    /// Home switch
    pub home: InputConfig,
    /// Emergency stop
    pub estop: InputConfig,
    /// Panel home button
    pub home_button: InputConfig,
    /// Panel resume button
    pub resume_button: InputConfig,
}

impl InputsConfig {
    /// Apply the same debounce timing to every input
    pub fn with_timing(mut self, timing: DebounceTiming) -> Self {
        for input in self.iter_mut() {
            input.timing = timing;
        }
        self
    }

    /// Apply the same polarity to every input
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        for input in self.iter_mut() {
            input.polarity = polarity;
        }
        self
    }

    /// Set the e-stop input
    pub fn with_estop(mut self, estop: InputConfig) -> Self {
        self.estop = estop;
        self
    }

    /// Set the home switch input
    pub fn with_home(mut self, home: InputConfig) -> Self {
        self.home = home;
        self
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut InputConfig> {
        [
            &mut self.limit_min,
            &mut self.limit_max,
            &mut self.home,
            &mut self.estop,
            &mut self.home_button,
            &mut self.resume_button,
        ]
        .into_iter()
    }
}

// ============================================================================
// Homing Config
// ============================================================================

/// Two-phase homing parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HomingConfig {
    /// Feed of the initial approach in units/min
    pub fast_feed: u32,
    /// Feed of the back-off and final approach in units/min
    pub slow_feed: u32,
    /// Distance to back off after the first trigger
    pub back_off: i32,
    /// Distance travelled toward the switch before giving up on the approach
    pub excursion: i32,
    /// Pause between back-off and final approach
    pub settle_ms: u64,
    /// Maximum time from homing start to completion
    pub timeout_ms: u64,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            fast_feed: 1200,
            slow_feed: 120,
            back_off: 5,
            excursion: 10_000,
            settle_ms: 250,
            timeout_ms: 60_000,
        }
    }
}

impl HomingConfig {
    /// Set the approach feeds
    pub fn with_feeds(mut self, fast: u32, slow: u32) -> Self {
        self.fast_feed = fast;
        self.slow_feed = slow;
        self
    }

    /// Set the back-off distance
    pub fn with_back_off(mut self, distance: i32) -> Self {
        self.back_off = distance;
        self
    }

    /// Set the approach excursion
    pub fn with_excursion(mut self, distance: i32) -> Self {
        self.excursion = distance;
        self
    }

    /// Set the settle delay
    pub fn with_settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Set the homing timeout
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

// ============================================================================
// Serial Config
// ============================================================================

/// Serial channel configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialConfig {
    /// Baud rate of both channels
    pub baud_rate: u32,
    /// Whether the display channel is wired
    pub display_enabled: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            display_enabled: true,
        }
    }
}

impl SerialConfig {
    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Enable or disable the display channel
    pub fn with_display_enabled(mut self, enabled: bool) -> Self {
        self.display_enabled = enabled;
        self
    }
}

// ============================================================================
// Ping Config
// ============================================================================

/// Liveness ping configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PingConfig {
    /// Interval used when `M2` carries no `P` field
    pub default_interval_ms: u64,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 1000,
        }
    }
}

impl PingConfig {
    /// Set the default interval
    pub fn with_default_interval_ms(mut self, ms: u64) -> Self {
        self.default_interval_ms = ms;
        self
    }
}

// ============================================================================
// Output Config
// ============================================================================

/// Relay output configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputConfig {
    /// Output driven high on a motion fault (`None` = no alarm output)
    pub alarm_pin: Option<u8>,
}

impl OutputConfig {
    /// Set the alarm pin
    pub fn with_alarm_pin(mut self, pin: u8) -> Self {
        self.alarm_pin = Some(pin);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
