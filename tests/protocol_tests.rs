//! Wire protocol tests: framing, parsing, formatting and the response lines
//! seen by a host on each channel.

use rs_axisctl::{
    commands::{Command, CommandKind, Field, TOKENS},
    config::MachineConfig,
    controller::{Channel, MachineController},
    hal::{MockOutputs, MockSerial, MockStepDriver},
    parsing::{parse_command, parse_str, FrameEvent, LineFramer},
    queue::DEFAULT_QUEUE_CAPACITY,
};

type Machine = MachineController<MockStepDriver, MockOutputs>;

fn machine() -> Machine {
    Machine::new(MockStepDriver::new(), MockOutputs::new(), MachineConfig::default())
}

/// Push `input` through a port, run one command pass and return what the host reads.
fn exchange(m: &mut Machine, channel: Channel, input: &str, now_ms: u64) -> Vec<String> {
    let mut port = MockSerial::new();
    port.queue_str(input);
    m.poll_serial(channel, &mut port, now_ms).unwrap();
    m.poll(now_ms).unwrap();
    m.flush(channel, &mut port);
    port.take_written()
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn every_token_survives_format_and_parse() {
    for (token, kind) in TOKENS {
        for mask in 0u32..(1 << Field::ALL.len()) {
            let cmd = Field::ALL
                .iter()
                .enumerate()
                .filter(|&(i, _)| mask & (1 << i) != 0)
                .fold(Command::new(kind), |cmd, (i, field)| cmd.with(*field, i as i32 * 7 - 10));
            assert_eq!(parse_str(&cmd.to_string()), cmd, "{token} fields {mask:#08b}");

            let frame = cmd.to_frame();
            let payload = &frame.as_bytes()[1..frame.len() - 1];
            assert_eq!(parse_command(payload), cmd, "{token} fields {mask:#08b}");
        }
    }
}

#[test]
fn token_must_match_exactly() {
    for line in ["G", "G9", "G900", "M", "M11", "M1142", "G28X"] {
        assert_eq!(parse_str(line).kind, CommandKind::Invalid, "{line}");
    }
    assert_eq!(parse_str("G28").kind, CommandKind::Home);
    assert_eq!(parse_str("g92,x5").kind, CommandKind::SetPosition);
}

#[test]
fn bad_fields_invalidate_or_read_as_zero() {
    assert_eq!(parse_str("G1,Y5").kind, CommandKind::Invalid);
    let cmd = parse_str("G1,Xabc,F12.5,,R-3");
    assert_eq!(cmd.kind, CommandKind::ControlledMove);
    assert_eq!(cmd.x, Some(0));
    assert_eq!(cmd.f, Some(12));
    assert_eq!(cmd.r, Some(-3));
}

#[test]
fn framer_splits_noisy_stream() {
    let mut framer: LineFramer<64> = LineFramer::new();
    let mut lines = Vec::new();
    for &b in b"\r\n junk;!M114;!G1,X1!G90;xx" {
        if let Some(FrameEvent::Line(line)) = framer.push(b) {
            lines.push(String::from_utf8(line.to_vec()).unwrap());
        }
    }
    // The unterminated G1 is dropped when the next frame starts.
    assert_eq!(lines, vec!["M114", "G90"]);
}

// ============================================================================
// Responses
// ============================================================================

#[test]
fn position_query_round_trip() {
    let mut m = machine();
    let lines = exchange(&mut m, Channel::Usb, "!G92,X-12,R300;!M114;", 0);
    assert_eq!(lines, vec!["!M114,X-12,R300,F0,S0;", "!0;"]);
}

#[test]
fn position_reports_speeds_while_moving() {
    let mut m = machine();
    let lines = exchange(&mut m, Channel::Usb, "!G1,X100,R25,F800;!M114;", 0);
    assert_eq!(lines, vec!["!M114,X0,R0,F800,S200;"]);
}

#[test]
fn response_goes_to_requesting_channel() {
    let mut m = machine();
    let display = exchange(&mut m, Channel::Display, "!M114;", 0);
    assert_eq!(display, vec!["!M114,X0,R0,F0,S0;", "!0;"]);

    // The idle notification was broadcast to USB as well.
    let mut usb = MockSerial::new();
    m.flush(Channel::Usb, &mut usb);
    assert_eq!(usb.written, vec!["!0;"]);
}

#[test]
fn ping_is_acknowledged() {
    let mut m = machine();
    assert_eq!(exchange(&mut m, Channel::Usb, "!M2,P100;", 0), vec!["!M2;"]);
    assert_eq!(exchange(&mut m, Channel::Usb, "!M2,P100;", 50), vec!["!M2;"]);
    assert_eq!(exchange(&mut m, Channel::Usb, "", 150), vec!["!0;"]);
}

#[test]
fn warnings_on_the_wire() {
    let mut m = machine();
    assert_eq!(
        exchange(&mut m, Channel::Usb, "!M42,P20,S1;", 0),
        vec!["!WARN,PIN_RANGE;", "!0;"]
    );

    let long = format!("!G1,X{};", "9".repeat(80));
    assert_eq!(exchange(&mut m, Channel::Usb, &long, 1), vec!["!WARN,LINE_OVERFLOW;"]);

    let jump = exchange(&mut m, Channel::Usb, "!M999,P3,T1;", 2);
    assert_eq!(jump, vec!["!WARN,JUMP_RANGE;", "!0;"]);
}

#[test]
fn queue_full_warning() {
    let mut m = machine();
    m.feed_usb(b"!G1,X100,F10;!G1,X0;", 0).unwrap();
    m.poll(0).unwrap();

    // The blocked move holds one slot; fill the rest and overflow by one.
    let mut port = MockSerial::new();
    for _ in 0..DEFAULT_QUEUE_CAPACITY {
        port.queue_str("!M114;");
    }
    m.poll_serial(Channel::Usb, &mut port, 1).unwrap();
    m.flush(Channel::Usb, &mut port);
    assert_eq!(port.written, vec!["!WARN,QUEUE_FULL;"]);
    assert!(m.queue(Channel::Usb).is_full());
}

#[test]
fn malformed_lines_never_stop_processing() {
    let mut m = machine();
    let lines = exchange(&mut m, Channel::Usb, "!G;!Q1;!G1,Z9;!;!M114;", 0);
    assert_eq!(lines, vec!["!M114,X0,R0,F0,S0;", "!0;"]);
}
