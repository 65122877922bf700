//! Wire protocol parsing: byte framing and line-to-[`Command`] conversion.
//!
//! Lines travel as `!TOKEN,FIELD,FIELD;`. [`LineFramer`] turns a byte stream
//! into line payloads; [`parse_command`] turns one payload into a
//! [`Command`]. Neither ever panics: anything malformed becomes
//! [`CommandKind::Invalid`] or an overflow event.
//!
//! # Parse rules
//!
//! 1. The line is compared case-insensitively (everything is uppercased).
//! 2. The first comma-separated segment must equal a token exactly; `G`
//!    does not match `G0` or `G28`.
//! 3. Each further non-empty segment is `<letter><integer>`. An unknown
//!    letter invalidates the whole command. A malformed integer reads as `0`
//!    with C `atoi` rules (leading digits only).
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::parsing::{parse_command, FrameEvent, LineFramer};
//! use rs_axisctl::commands::CommandKind;
//!
//! let mut framer: LineFramer<64> = LineFramer::new();
//! let mut lines = Vec::new();
//! for &b in b"noise!g1,x100,f1000;" {
//!     if let Some(FrameEvent::Line(line)) = framer.push(b) {
//!         lines.push(parse_command(&line));
//!     }
//! }
//!
//! assert_eq!(lines.len(), 1);
//! assert_eq!(lines[0].kind, CommandKind::ControlledMove);
//! assert_eq!(lines[0].x, Some(100));
//! assert_eq!(lines[0].f, Some(1000));
//! ```

use heapless::Vec;

use crate::commands::{
    Command, CommandKind, Field, FIELD_SEPARATOR, FRAME_END, FRAME_START,
};

/// Longest token accepted before the lookup is skipped.
const MAX_TOKEN_LEN: usize = 8;

/// Default line buffer size for a serial channel.
pub const DEFAULT_LINE_CAPACITY: usize = 64;

/// Parse one unframed line payload into a command.
pub fn parse_command(line: &[u8]) -> Command {
    let mut segments = line.split(|&b| b == FIELD_SEPARATOR);

    let kind = segments.next().map(match_token).unwrap_or_default();
    if kind == CommandKind::Invalid {
        return Command::INVALID;
    }

    let mut command = Command::new(kind);
    for segment in segments.filter(|s| !s.is_empty()) {
        match Field::from_letter(segment[0].to_ascii_uppercase()) {
            Some(field) => command.set(field, parse_int_lenient(&segment[1..])),
            None => return Command::INVALID,
        }
    }
    command
}

/// Parse a `&str` payload. See [`parse_command`].
///
/// ```
/// use rs_axisctl::parsing::parse_str;
/// use rs_axisctl::commands::CommandKind;
///
/// assert_eq!(parse_str("m114").kind, CommandKind::GetPosition);
/// assert_eq!(parse_str("G1,Q5").kind, CommandKind::Invalid);
/// ```
pub fn parse_str(line: &str) -> Command {
    parse_command(line.as_bytes())
}

fn match_token(segment: &[u8]) -> CommandKind {
    if segment.len() > MAX_TOKEN_LEN {
        return CommandKind::Invalid;
    }
    let mut upper = [0u8; MAX_TOKEN_LEN];
    for (dst, src) in upper.iter_mut().zip(segment) {
        *dst = src.to_ascii_uppercase();
    }
    CommandKind::from_token(&upper[..segment.len()])
}

/// `atoi`-style integer parse: optional whitespace and sign, then leading
/// digits. No digits yields 0; out-of-range values saturate.
///
/// ```
/// use rs_axisctl::parsing::parse_int_lenient;
///
/// assert_eq!(parse_int_lenient(b"42"), 42);
/// assert_eq!(parse_int_lenient(b"-17mm"), -17);
/// assert_eq!(parse_int_lenient(b"abc"), 0);
/// assert_eq!(parse_int_lenient(b"99999999999"), i32::MAX);
/// ```
pub fn parse_int_lenient(bytes: &[u8]) -> i32 {
    let mut rest = bytes;
    while let [b, tail @ ..] = rest {
        if b.is_ascii_whitespace() {
            rest = tail;
        } else {
            break;
        }
    }

    let negative = match rest {
        [b'-', tail @ ..] => {
            rest = tail;
            true
        }
        [b'+', tail @ ..] => {
            rest = tail;
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for &b in rest.iter().take_while(|b| b.is_ascii_digit()) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Result of pushing one byte into a [`LineFramer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameEvent<const N: usize> {
    /// A complete payload (between `!` and `;`, markers excluded).
    Line(Vec<u8, N>),
    /// A frame ended after exceeding the buffer and was discarded.
    Overflow,
}

/// Splits a serial byte stream into `!…;` frames.
///
/// - Bytes outside a frame are ignored.
/// - `!` always starts a new frame, dropping any partial one.
/// - A frame longer than `N` is discarded when its `;` arrives.
#[derive(Debug, Default)]
pub struct LineFramer<const N: usize> {
    buffer: Vec<u8, N>,
    in_frame: bool,
    overflowed: bool,
}

impl<const N: usize> LineFramer<N> {
    /// Creates an idle framer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            in_frame: false,
            overflowed: false,
        }
    }

    /// Feed one byte.
    pub fn push(&mut self, byte: u8) -> Option<FrameEvent<N>> {
        match byte {
            FRAME_START => {
                self.buffer.clear();
                self.in_frame = true;
                self.overflowed = false;
                None
            }
            FRAME_END if self.in_frame => {
                self.in_frame = false;
                if self.overflowed {
                    self.overflowed = false;
                    self.buffer.clear();
                    Some(FrameEvent::Overflow)
                } else {
                    Some(FrameEvent::Line(core::mem::take(&mut self.buffer)))
                }
            }
            _ if self.in_frame => {
                if self.buffer.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
            _ => None,
        }
    }

    /// Returns true while a frame is being received.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_frame = false;
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(bytes: &[u8]) -> std::vec::Vec<FrameEvent<16>> {
        let mut framer: LineFramer<16> = LineFramer::new();
        bytes.iter().filter_map(|&b| framer.push(b)).collect()
    }

    // =========================================================================
    // parse_command tests
    // =========================================================================

    #[test]
    fn parse_token_only() {
        let cmd = parse_str("G28");
        assert_eq!(cmd.kind, CommandKind::Home);
        assert_eq!(cmd.field_count(), 0);
    }

    #[test]
    fn parse_all_fields() {
        let cmd = parse_str("G1,X1,R2,F3,S4,P5,T6");
        assert_eq!(cmd.kind, CommandKind::ControlledMove);
        assert_eq!(
            (cmd.x, cmd.r, cmd.f, cmd.s, cmd.p, cmd.t),
            (Some(1), Some(2), Some(3), Some(4), Some(5), Some(6))
        );
    }

    #[test]
    fn parse_fields_order_independent() {
        assert_eq!(parse_str("G0,F10,X5"), parse_str("G0,X5,F10"));
    }

    #[test]
    fn parse_lowercase() {
        let cmd = parse_str("g92,x-10,r45");
        assert_eq!(cmd.kind, CommandKind::SetPosition);
        assert_eq!(cmd.x, Some(-10));
        assert_eq!(cmd.r, Some(45));
    }

    #[test]
    fn parse_prefix_does_not_match() {
        assert_eq!(parse_str("G").kind, CommandKind::Invalid);
        assert_eq!(parse_str("M").kind, CommandKind::Invalid);
        assert_eq!(parse_str("M11").kind, CommandKind::Invalid);
        assert_eq!(parse_str("G281").kind, CommandKind::Invalid);
    }

    #[test]
    fn parse_unknown_field_invalidates() {
        assert_eq!(parse_str("G1,X10,Z5").kind, CommandKind::Invalid);
        assert_eq!(parse_str("G1,Z5,X10").kind, CommandKind::Invalid);
    }

    #[test]
    fn parse_empty_segments_skipped() {
        let cmd = parse_str("G1,,X10,");
        assert_eq!(cmd.kind, CommandKind::ControlledMove);
        assert_eq!(cmd.x, Some(10));
        assert_eq!(cmd.field_count(), 1);
    }

    #[test]
    fn parse_bad_number_is_zero_but_present() {
        let cmd = parse_str("G1,Xabc");
        assert_eq!(cmd.x, Some(0));
    }

    #[test]
    fn parse_letter_only_is_zero() {
        assert_eq!(parse_str("M42,P").p, Some(0));
    }

    #[test]
    fn parse_empty_line() {
        assert_eq!(parse_command(b""), Command::INVALID);
    }

    #[test]
    fn parse_long_garbage() {
        let garbage = [0xFFu8; 200];
        assert_eq!(parse_command(&garbage).kind, CommandKind::Invalid);
        let long_token = [b'G'; 200];
        assert_eq!(parse_command(&long_token).kind, CommandKind::Invalid);
    }

    #[test]
    fn parse_non_ascii_field() {
        assert_eq!(parse_command("G1,\u{e9}5".as_bytes()).kind, CommandKind::Invalid);
    }

    // =========================================================================
    // parse_int_lenient tests
    // =========================================================================

    #[test]
    fn int_signs() {
        assert_eq!(parse_int_lenient(b"+7"), 7);
        assert_eq!(parse_int_lenient(b"-7"), -7);
        assert_eq!(parse_int_lenient(b"--7"), 0);
    }

    #[test]
    fn int_saturates() {
        assert_eq!(parse_int_lenient(b"-99999999999999999999"), i32::MIN);
        assert_eq!(parse_int_lenient(b"2147483647"), i32::MAX);
        assert_eq!(parse_int_lenient(b"-2147483648"), i32::MIN);
    }

    #[test]
    fn int_leading_whitespace() {
        assert_eq!(parse_int_lenient(b"  12"), 12);
    }

    // =========================================================================
    // LineFramer tests
    // =========================================================================

    #[test]
    fn framer_single_line() {
        let events = frames(b"!M2;");
        assert_eq!(events.len(), 1);
        match &events[0] {
            FrameEvent::Line(line) => assert_eq!(line.as_slice(), b"M2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn framer_ignores_bytes_outside_frame() {
        let events = frames(b"abc;\r\n!G90;xyz");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn framer_restart_on_start_marker() {
        let events = frames(b"!G1,X1!G28;");
        match &events[..] {
            [FrameEvent::Line(line)] => assert_eq!(line.as_slice(), b"G28"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn framer_overflow_discards_frame() {
        let events = frames(b"!G1,X1111111111111111111;!M2;");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], FrameEvent::Overflow);
        assert!(matches!(&events[1], FrameEvent::Line(l) if l.as_slice() == b"M2"));
    }

    #[test]
    fn framer_exactly_full_is_ok() {
        let events = frames(b"!0123456789ABCDEF;");
        assert!(matches!(&events[0], FrameEvent::Line(l) if l.len() == 16));
    }

    #[test]
    fn framer_empty_frame() {
        let events = frames(b"!;");
        assert!(matches!(&events[0], FrameEvent::Line(l) if l.is_empty()));
    }

    #[test]
    fn framer_reset_drops_partial() {
        let mut framer: LineFramer<16> = LineFramer::new();
        framer.push(b'!');
        framer.push(b'G');
        assert!(framer.in_frame());
        framer.reset();
        assert!(!framer.in_frame());
        assert_eq!(framer.push(b';'), None);
    }
}
