//! Response lines written back on the serial channels.
//!
//! Every response uses the same `!…;` framing as commands:
//!
//! | Response | Line |
//! |----------|------|
//! | [`Response::Idle`] | `!0;` |
//! | [`Response::Position`] | `!M114,X<pos>,R<pos>,F<speed>,S<speed>;` |
//! | [`Response::PingAck`] | `!M2;` |
//! | [`Response::Warning`] | `!WARN,<name>;` |
//! | [`Response::Fault`] | `!FAULT,<code>;` |
//!
//! # Example
//!
//! ```
//! use rs_axisctl::messages::{Response, Warning};
//!
//! let pos = Response::Position { linear: 100, rotary: -45, linear_speed: 1000, rotary_speed: 450 };
//! assert_eq!(pos.to_line().as_str(), "!M114,X100,R-45,F1000,S450;");
//! assert_eq!(Response::Warning(Warning::QueueFull).to_line().as_str(), "!WARN,QUEUE_FULL;");
//! ```

use core::fmt::{self, Write};

use crate::commands::Frame;

// ============================================================================
// Warnings
// ============================================================================

/// Non-fatal problems reported to the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Warning {
    /// The channel's queue was full; the command was dropped.
    QueueFull,
    /// A line exceeded the line buffer and was discarded.
    LineOverflow,
    /// `M42` named a pin outside the two output banks.
    PinOutOfRange,
    /// `M999` asked to rewind further than the retained history.
    JumpOutOfRange,
    /// A collaborator (driver or output bank) reported an error.
    HardwareError,
}

impl Warning {
    /// Wire name of this warning.
    pub const fn as_str(self) -> &'static str {
        match self {
            Warning::QueueFull => "QUEUE_FULL",
            Warning::LineOverflow => "LINE_OVERFLOW",
            Warning::PinOutOfRange => "PIN_RANGE",
            Warning::JumpOutOfRange => "JUMP_RANGE",
            Warning::HardwareError => "HARDWARE",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Motion Faults
// ============================================================================

/// Recoverable motion faults. Each one asserts the alarm output and returns
/// the machine to idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionFault {
    /// Homing did not complete within the configured timeout.
    HomingTimeout,
    /// A travel limit switch fired while homing.
    LimitDuringHoming,
}

impl MotionFault {
    /// Numeric code sent in `!FAULT,<code>;`.
    pub const fn code(self) -> u8 {
        match self {
            MotionFault::HomingTimeout => 1,
            MotionFault::LimitDuringHoming => 2,
        }
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            MotionFault::HomingTimeout => "homing timed out",
            MotionFault::LimitDuringHoming => "limit switch hit while homing",
        }
    }
}

impl fmt::Display for MotionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

// ============================================================================
// Responses
// ============================================================================

/// One line to be written to a serial channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Response {
    /// Both queues drained and the machine is idle.
    Idle,
    /// Answer to `M114`.
    Position {
        /// Linear axis position in units.
        linear: i32,
        /// Rotary axis position in units.
        rotary: i32,
        /// Linear axis speed in units/min.
        linear_speed: u32,
        /// Rotary axis speed in units/min.
        rotary_speed: u32,
    },
    /// Acknowledges a ping that refreshed the liveness deadline.
    PingAck,
    /// Non-fatal warning.
    Warning(Warning),
    /// Motion fault.
    Fault(MotionFault),
}

impl Response {
    /// Format as a framed line.
    pub fn to_line(&self) -> Frame {
        let mut line = Frame::new();
        // Every response is far shorter than a frame.
        let _ = write!(line, "{}", self);
        line
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Idle => f.write_str("!0;"),
            Response::Position {
                linear,
                rotary,
                linear_speed,
                rotary_speed,
            } => write!(
                f,
                "!M114,X{},R{},F{},S{};",
                linear, rotary, linear_speed, rotary_speed
            ),
            Response::PingAck => f.write_str("!M2;"),
            Response::Warning(w) => write!(f, "!WARN,{};", w.as_str()),
            Response::Fault(fault) => write!(f, "!FAULT,{};", fault.code()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_str;
    use crate::commands::CommandKind;

    #[test]
    fn idle_line() {
        assert_eq!(Response::Idle.to_line().as_str(), "!0;");
    }

    #[test]
    fn position_line_with_extremes() {
        let r = Response::Position {
            linear: i32::MIN,
            rotary: i32::MAX,
            linear_speed: u32::MAX,
            rotary_speed: 0,
        };
        assert_eq!(
            r.to_line().as_str(),
            "!M114,X-2147483648,R2147483647,F4294967295,S0;"
        );
    }

    #[test]
    fn position_line_parses_back_as_m114() {
        let line = Response::Position {
            linear: 12,
            rotary: 34,
            linear_speed: 0,
            rotary_speed: 0,
        }
        .to_line();
        let payload = &line[1..line.len() - 1];
        let cmd = parse_str(payload);
        assert_eq!(cmd.kind, CommandKind::GetPosition);
        assert_eq!(cmd.x, Some(12));
        assert_eq!(cmd.r, Some(34));
    }

    #[test]
    fn fault_codes_are_distinct() {
        assert_ne!(
            MotionFault::HomingTimeout.code(),
            MotionFault::LimitDuringHoming.code()
        );
        assert_eq!(
            Response::Fault(MotionFault::HomingTimeout).to_line().as_str(),
            "!FAULT,1;"
        );
    }

    #[test]
    fn warning_lines() {
        assert_eq!(
            Response::Warning(Warning::LineOverflow).to_line().as_str(),
            "!WARN,LINE_OVERFLOW;"
        );
        assert_eq!(Response::PingAck.to_line().as_str(), "!M2;");
    }
}
