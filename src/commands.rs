//! Command model for the serial protocol.
//!
//! A [`Command`] is what one `!…;` line becomes after parsing: a
//! [`CommandKind`] plus up to six optional signed integer fields named after
//! their wire letters (`X`, `R`, `F`, `S`, `P`, `T`).
//!
//! # Vocabulary
//!
//! | Kind | Token | Meaning |
//! |------|-------|---------|
//! | [`Ping`](CommandKind::Ping) | `M2` | Liveness ping |
//! | [`Wait`](CommandKind::Wait) | `G4` | Timed delay |
//! | [`EmergencyStop`](CommandKind::EmergencyStop) | `M0` | E-stop |
//! | [`ReleaseEmergencyStop`](CommandKind::ReleaseEmergencyStop) | `M1` | Release e-stop |
//! | [`PauseResume`](CommandKind::PauseResume) | `M24` | Toggle pause |
//! | [`GetPosition`](CommandKind::GetPosition) | `M114` | Report position |
//! | [`SetRelative`](CommandKind::SetRelative) | `G91` | Relative coordinates |
//! | [`SetAbsolute`](CommandKind::SetAbsolute) | `G90` | Absolute coordinates |
//! | [`SetMaxTravel`](CommandKind::SetMaxTravel) | `M208` | Linear travel limit |
//! | [`SetStepsPerUnit`](CommandKind::SetStepsPerUnit) | `M92` | Accepted, no effect |
//! | [`ControlledMove`](CommandKind::ControlledMove) | `G1` | Synchronized move |
//! | [`CoastMove`](CommandKind::CoastMove) | `G0` | Non-blocking move |
//! | [`Home`](CommandKind::Home) | `G28` | Two-phase homing |
//! | [`SetPin`](CommandKind::SetPin) | `M42` | Drive a relay output |
//! | [`Cancel`](CommandKind::Cancel) | `M112` | Abort motion |
//! | [`SetPosition`](CommandKind::SetPosition) | `G92` | Redefine position |
//! | [`SetAcceleration`](CommandKind::SetAcceleration) | `M204` | Driver acceleration |
//! | [`Jump`](CommandKind::Jump) | `M999` | Replay earlier commands |
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::commands::{Command, CommandKind, Field};
//!
//! let cmd = Command::new(CommandKind::ControlledMove)
//!     .with(Field::X, 100)
//!     .with(Field::F, 1000);
//!
//! assert_eq!(cmd.x, Some(100));
//! assert!(cmd.r.is_none());
//! assert_eq!(cmd.to_frame().as_str(), "!G1,X100,F1000;");
//! ```

use core::fmt::{self, Write};

use heapless::String as HString;

/// Start-of-frame marker on the wire.
pub const FRAME_START: u8 = b'!';

/// End-of-frame marker on the wire.
pub const FRAME_END: u8 = b';';

/// Separator between the token and each field.
pub const FIELD_SEPARATOR: u8 = b',';

/// Longest formatted frame: token, six fields with sign and ten digits, framing.
pub const MAX_FRAME_LEN: usize = 96;

/// A framed wire line.
pub type Frame = HString<MAX_FRAME_LEN>;

/// Recognized command kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandKind {
    /// Unknown token or malformed field.
    #[default]
    Invalid,
    /// `M2`: enter or refresh the ping state.
    Ping,
    /// `G4`: wait for `P` milliseconds plus `S` seconds.
    Wait,
    /// `M0`: emergency stop, handled out of band.
    EmergencyStop,
    /// `M1`: leave emergency stop.
    ReleaseEmergencyStop,
    /// `M24`: pause when running, resume when paused.
    PauseResume,
    /// `M114`: report positions and speeds.
    GetPosition,
    /// `G91`: interpret move targets as deltas.
    SetRelative,
    /// `G90`: interpret move targets as absolute positions.
    SetAbsolute,
    /// `M208`: set the linear travel limit from `X`.
    SetMaxTravel,
    /// `M92`: recognized but not implemented.
    SetStepsPerUnit,
    /// `G1`: blocking move with synchronized arrival.
    ControlledMove,
    /// `G0`: non-blocking move, each axis at its own feed.
    CoastMove,
    /// `G28`: two-phase homing of the linear axis.
    Home,
    /// `M42`: drive relay output `P` to `S`.
    SetPin,
    /// `M112`: abort any motion.
    Cancel,
    /// `G92`: redefine the current position.
    SetPosition,
    /// `M204`: set driver acceleration.
    SetAcceleration,
    /// `M999`: rewind the queue by `P`, `T` more times.
    Jump,
}

/// Token table used by the parser. Order is not significant.
pub const TOKENS: [(&str, CommandKind); 18] = [
    ("M2", CommandKind::Ping),
    ("G4", CommandKind::Wait),
    ("M0", CommandKind::EmergencyStop),
    ("M1", CommandKind::ReleaseEmergencyStop),
    ("M24", CommandKind::PauseResume),
    ("M114", CommandKind::GetPosition),
    ("G91", CommandKind::SetRelative),
    ("G90", CommandKind::SetAbsolute),
    ("M208", CommandKind::SetMaxTravel),
    ("M92", CommandKind::SetStepsPerUnit),
    ("G1", CommandKind::ControlledMove),
    ("G0", CommandKind::CoastMove),
    ("G28", CommandKind::Home),
    ("M42", CommandKind::SetPin),
    ("M112", CommandKind::Cancel),
    ("G92", CommandKind::SetPosition),
    ("M204", CommandKind::SetAcceleration),
    ("M999", CommandKind::Jump),
];

impl CommandKind {
    /// Wire token, `None` for [`Invalid`](Self::Invalid).
    pub fn token(self) -> Option<&'static str> {
        TOKENS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(token, _)| *token)
    }

    /// Look up a token. The whole input must equal the whole token.
    ///
    /// ```
    /// use rs_axisctl::commands::CommandKind;
    ///
    /// assert_eq!(CommandKind::from_token(b"G28"), CommandKind::Home);
    /// assert_eq!(CommandKind::from_token(b"G2"), CommandKind::Invalid);
    /// assert_eq!(CommandKind::from_token(b"G"), CommandKind::Invalid);
    /// ```
    pub fn from_token(token: &[u8]) -> Self {
        TOKENS
            .iter()
            .find(|(candidate, _)| candidate.as_bytes() == token)
            .map(|(_, kind)| *kind)
            .unwrap_or(CommandKind::Invalid)
    }

    /// Returns true for the two move kinds that are blocked while moving.
    #[inline]
    pub fn is_move(self) -> bool {
        matches!(self, CommandKind::ControlledMove | CommandKind::CoastMove)
    }
}

/// Field letters accepted after the token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Field {
    /// Linear position.
    X,
    /// Rotary position.
    R,
    /// Linear feed rate.
    F,
    /// Flag / secondary value.
    S,
    /// Rotary feed rate, pin index, wait time, jump offset.
    P,
    /// Iteration count.
    T,
}

impl Field {
    /// All fields in wire order.
    pub const ALL: [Field; 6] = [Field::X, Field::R, Field::F, Field::S, Field::P, Field::T];

    /// Map an (uppercase) letter to a field.
    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'X' => Some(Field::X),
            b'R' => Some(Field::R),
            b'F' => Some(Field::F),
            b'S' => Some(Field::S),
            b'P' => Some(Field::P),
            b'T' => Some(Field::T),
            _ => None,
        }
    }

    /// Wire letter of this field.
    pub const fn letter(self) -> char {
        match self {
            Field::X => 'X',
            Field::R => 'R',
            Field::F => 'F',
            Field::S => 'S',
            Field::P => 'P',
            Field::T => 'T',
        }
    }
}

/// A parsed command.
///
/// Plain value type: copying it out of the queue leaves the slot intact, which
/// is what lets [`CommandQueue::rewind`](crate::queue::CommandQueue::rewind)
/// replay already-consumed commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Command {
    /// What to do.
    pub kind: CommandKind,
    /// `X` field.
    pub x: Option<i32>,
    /// `R` field.
    pub r: Option<i32>,
    /// `F` field.
    pub f: Option<i32>,
    /// `S` field.
    pub s: Option<i32>,
    /// `P` field.
    pub p: Option<i32>,
    /// `T` field.
    pub t: Option<i32>,
}

impl Command {
    /// The invalid command, used for empty queue slots.
    pub const INVALID: Command = Command {
        kind: CommandKind::Invalid,
        x: None,
        r: None,
        f: None,
        s: None,
        p: None,
        t: None,
    };

    /// A command of `kind` with no fields.
    pub const fn new(kind: CommandKind) -> Self {
        Command {
            kind,
            ..Self::INVALID
        }
    }

    /// Builder: set `field` to `value`.
    pub fn with(mut self, field: Field, value: i32) -> Self {
        self.set(field, value);
        self
    }

    /// Set `field` to `value`, marking it present.
    pub fn set(&mut self, field: Field, value: i32) {
        *self.slot_mut(field) = Some(value);
    }

    /// Read `field`, `None` if it was not on the wire.
    pub fn get(&self, field: Field) -> Option<i32> {
        match field {
            Field::X => self.x,
            Field::R => self.r,
            Field::F => self.f,
            Field::S => self.s,
            Field::P => self.p,
            Field::T => self.t,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<i32> {
        match field {
            Field::X => &mut self.x,
            Field::R => &mut self.r,
            Field::F => &mut self.f,
            Field::S => &mut self.s,
            Field::P => &mut self.p,
            Field::T => &mut self.t,
        }
    }

    /// Returns true unless the kind is [`CommandKind::Invalid`].
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind != CommandKind::Invalid
    }

    /// Number of fields present.
    pub fn field_count(&self) -> usize {
        Field::ALL.iter().filter(|&&f| self.get(f).is_some()).count()
    }

    /// Format as a complete `!…;` frame.
    pub fn to_frame(&self) -> Frame {
        let mut frame = Frame::new();
        // A formatted command always fits MAX_FRAME_LEN.
        let _ = write!(frame, "!{};", self);
        frame
    }
}

/// Formats the unframed payload, e.g. `G1,X100,F1000`.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.token().unwrap_or("INVALID"))?;
        for field in Field::ALL {
            if let Some(value) = self.get(field) {
                write!(f, ",{}{}", field.letter(), value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Token Table Tests
    // =========================================================================

    #[test]
    fn every_kind_but_invalid_has_a_unique_token() {
        for (i, (token, kind)) in TOKENS.iter().enumerate() {
            assert_eq!(kind.token(), Some(*token));
            for (other, _) in TOKENS.iter().skip(i + 1) {
                assert_ne!(token, other);
            }
        }
        assert_eq!(CommandKind::Invalid.token(), None);
    }

    #[test]
    fn from_token_exact_length_only() {
        assert_eq!(CommandKind::from_token(b"M1"), CommandKind::ReleaseEmergencyStop);
        assert_eq!(CommandKind::from_token(b"M11"), CommandKind::Invalid);
        assert_eq!(CommandKind::from_token(b"M114"), CommandKind::GetPosition);
        assert_eq!(CommandKind::from_token(b"M"), CommandKind::Invalid);
        assert_eq!(CommandKind::from_token(b""), CommandKind::Invalid);
    }

    #[test]
    fn from_token_is_case_sensitive() {
        // The parser uppercases before lookup.
        assert_eq!(CommandKind::from_token(b"g1"), CommandKind::Invalid);
    }

    #[test]
    fn move_kinds() {
        assert!(CommandKind::ControlledMove.is_move());
        assert!(CommandKind::CoastMove.is_move());
        assert!(!CommandKind::Home.is_move());
    }

    // =========================================================================
    // Command Tests
    // =========================================================================

    #[test]
    fn default_is_invalid() {
        assert_eq!(Command::default(), Command::INVALID);
        assert!(!Command::default().is_valid());
    }

    #[test]
    fn set_and_get_fields() {
        let mut cmd = Command::new(CommandKind::Jump);
        cmd.set(Field::P, 3);
        cmd.set(Field::T, -2);
        assert_eq!(cmd.get(Field::P), Some(3));
        assert_eq!(cmd.get(Field::T), Some(-2));
        assert_eq!(cmd.get(Field::X), None);
        assert_eq!(cmd.field_count(), 2);
    }

    #[test]
    fn display_payload_orders_fields() {
        let cmd = Command::new(CommandKind::CoastMove)
            .with(Field::P, 30)
            .with(Field::X, -5);
        assert_eq!(format!("{}", cmd), "G0,X-5,P30");
    }

    #[test]
    fn frame_with_no_fields() {
        assert_eq!(Command::new(CommandKind::Home).to_frame().as_str(), "!G28;");
    }

    #[test]
    fn frame_with_extreme_values_fits() {
        let mut cmd = Command::new(CommandKind::GetPosition);
        for field in Field::ALL {
            cmd.set(field, i32::MIN);
        }
        let frame = cmd.to_frame();
        assert!(frame.ends_with(';'));
        assert_eq!(frame.matches(',').count(), 6);
    }
}
