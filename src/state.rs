//! Machine state tracking and command admissibility.
//!
//! [`MachineStateTracker`] is the single owned record of what the machine is
//! doing. Every state change goes through
//! [`set_state`](MachineStateTracker::set_state), which also stamps the time
//! the state was entered. [`is_admissible`] decides which queued commands the
//! dispatcher may execute in the current state.
//!
//! # Admissibility
//!
//! | State | Admissible commands |
//! |-------|---------------------|
//! | `Idle` | all |
//! | `HomingInitial`, `HomingFinal`, `Moving`, `NoBlockMoving` | all except `G0`, `G1` |
//! | `Paused` | `M24` |
//! | `EmergencyStop` | `M1` |
//! | `Error` | none |
//! | `Ping` | `M2`, `G0` |
//! | `Waiting` | none |
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::state::{is_admissible, MachineState, MachineStateTracker};
//! use rs_axisctl::commands::CommandKind;
//!
//! let mut tracker = MachineStateTracker::new();
//! assert_eq!(tracker.state(), MachineState::Idle);
//!
//! tracker.set_state(MachineState::Moving, 100);
//! assert_eq!(tracker.time_entered_state(), 100);
//! assert!(!is_admissible(CommandKind::ControlledMove, tracker.state()));
//! assert!(is_admissible(CommandKind::GetPosition, tracker.state()));
//! ```

use crate::commands::CommandKind;

/// Operating state of the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum MachineState {
    /// Ready for any command.
    #[default]
    Idle = 0,
    /// Fast approach toward the home switch.
    HomingInitial = 1,
    /// Back-off and slow re-approach of the home switch.
    HomingFinal = 2,
    /// Blocking move (`G1`) in progress.
    Moving = 3,
    /// Non-blocking move (`G0`) in progress.
    NoBlockMoving = 4,
    /// Motion suspended by `M24` or the panel.
    Paused = 5,
    /// Emergency stop latched; only `M1` releases it.
    EmergencyStop = 6,
    /// Reserved fault state; nothing is accepted.
    Error = 7,
    /// Awaiting a fresh `M2` before the liveness deadline.
    Ping = 8,
    /// Timed delay from `G4`.
    Waiting = 9,
}

impl MachineState {
    /// Decode a raw state code, `None` if unknown.
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => MachineState::Idle,
            1 => MachineState::HomingInitial,
            2 => MachineState::HomingFinal,
            3 => MachineState::Moving,
            4 => MachineState::NoBlockMoving,
            5 => MachineState::Paused,
            6 => MachineState::EmergencyStop,
            7 => MachineState::Error,
            8 => MachineState::Ping,
            9 => MachineState::Waiting,
            _ => return None,
        })
    }

    /// Raw state code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns true in either homing phase.
    #[inline]
    pub const fn is_homing(self) -> bool {
        matches!(self, MachineState::HomingInitial | MachineState::HomingFinal)
    }

    /// Returns true while an axis is expected to be in motion.
    #[inline]
    pub const fn is_motion(self) -> bool {
        matches!(
            self,
            MachineState::HomingInitial
                | MachineState::HomingFinal
                | MachineState::Moving
                | MachineState::NoBlockMoving
        )
    }

    /// Lowercase name for logs and status lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            MachineState::Idle => "idle",
            MachineState::HomingInitial => "homing_initial",
            MachineState::HomingFinal => "homing_final",
            MachineState::Moving => "moving",
            MachineState::NoBlockMoving => "no_block_moving",
            MachineState::Paused => "paused",
            MachineState::EmergencyStop => "emergency_stop",
            MachineState::Error => "error",
            MachineState::Ping => "ping",
            MachineState::Waiting => "waiting",
        }
    }
}

/// How move targets are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CoordinateSystem {
    /// Targets are absolute positions (`G90`).
    #[default]
    Absolute,
    /// Targets are deltas from the current position (`G91`).
    Relative,
}

/// Whether `kind` may be dispatched while the machine is in `state`.
///
/// `M0` is never routed through this check; it is executed at intake.
pub fn is_admissible(kind: CommandKind, state: MachineState) -> bool {
    use CommandKind as K;
    use MachineState as S;

    match state {
        S::Idle => true,
        S::HomingInitial | S::HomingFinal | S::Moving | S::NoBlockMoving => !kind.is_move(),
        S::Paused => kind == K::PauseResume,
        S::EmergencyStop => kind == K::ReleaseEmergencyStop,
        S::Error => false,
        S::Ping => matches!(kind, K::Ping | K::CoastMove),
        S::Waiting => false,
    }
}

/// [`is_admissible`] for a raw state code. Unknown codes deny everything.
///
/// ```
/// use rs_axisctl::state::is_admissible_code;
/// use rs_axisctl::commands::CommandKind;
///
/// assert!(is_admissible_code(CommandKind::Home, 0));
/// assert!(!is_admissible_code(CommandKind::Home, 200));
/// ```
pub fn is_admissible_code(kind: CommandKind, code: u8) -> bool {
    MachineState::from_code(code)
        .map(|state| is_admissible(kind, state))
        .unwrap_or(false)
}

/// Mutable machine state record.
///
/// Created idle, absolute, not homed. `time_entered_state` changes on every
/// [`set_state`](Self::set_state) call and nowhere else.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineStateTracker {
    state: MachineState,
    coordinate_system: CoordinateSystem,
    time_entered_state_ms: u64,
    wait_time_ms: u64,
    is_homed: bool,
}

impl MachineStateTracker {
    /// Power-on state.
    pub const fn new() -> Self {
        Self {
            state: MachineState::Idle,
            coordinate_system: CoordinateSystem::Absolute,
            time_entered_state_ms: 0,
            wait_time_ms: 0,
            is_homed: false,
        }
    }

    /// Transition to `state` at `now_ms`. Entering `Idle` clears the wait time.
    pub fn set_state(&mut self, state: MachineState, now_ms: u64) {
        if state != self.state {
            log::debug!("state {} -> {}", self.state.as_str(), state.as_str());
        }
        self.state = state;
        self.time_entered_state_ms = now_ms;
        if state == MachineState::Idle {
            self.wait_time_ms = 0;
        }
    }

    /// Enter `Waiting` for `duration_ms`.
    pub fn start_wait(&mut self, duration_ms: u64, now_ms: u64) {
        self.set_state(MachineState::Waiting, now_ms);
        self.wait_time_ms = duration_ms;
    }

    /// Enter (or refresh) `Ping` with a liveness interval of `interval_ms`.
    pub fn start_ping(&mut self, interval_ms: u64, now_ms: u64) {
        self.set_state(MachineState::Ping, now_ms);
        self.wait_time_ms = interval_ms;
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Current coordinate system.
    #[inline]
    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    /// Switch between absolute and relative targets.
    pub fn set_coordinate_system(&mut self, system: CoordinateSystem) {
        self.coordinate_system = system;
    }

    /// Timestamp of the last state transition.
    #[inline]
    pub fn time_entered_state(&self) -> u64 {
        self.time_entered_state_ms
    }

    /// Wait or ping interval; zero outside `Waiting`/`Ping`.
    #[inline]
    pub fn wait_time(&self) -> u64 {
        self.wait_time_ms
    }

    /// Milliseconds spent in the current state.
    #[inline]
    pub fn time_in_state(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.time_entered_state_ms)
    }

    /// Returns true once the wait/ping interval has run out.
    #[inline]
    pub fn wait_elapsed(&self, now_ms: u64) -> bool {
        self.time_in_state(now_ms) >= self.wait_time_ms
    }

    /// Whether the linear axis has been homed since power-on or e-stop release.
    #[inline]
    pub fn is_homed(&self) -> bool {
        self.is_homed
    }

    /// Record the homed flag.
    pub fn set_homed(&mut self, homed: bool) {
        self.is_homed = homed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TOKENS;

    const ALL_STATES: [MachineState; 10] = [
        MachineState::Idle,
        MachineState::HomingInitial,
        MachineState::HomingFinal,
        MachineState::Moving,
        MachineState::NoBlockMoving,
        MachineState::Paused,
        MachineState::EmergencyStop,
        MachineState::Error,
        MachineState::Ping,
        MachineState::Waiting,
    ];

    fn all_kinds() -> impl Iterator<Item = CommandKind> {
        TOKENS
            .iter()
            .map(|(_, kind)| *kind)
            .chain(core::iter::once(CommandKind::Invalid))
    }

    // =========================================================================
    // Admissibility table
    // =========================================================================

    #[test]
    fn idle_accepts_everything() {
        for kind in all_kinds() {
            assert!(is_admissible(kind, MachineState::Idle), "{:?}", kind);
        }
    }

    #[test]
    fn motion_states_block_only_moves() {
        for state in [
            MachineState::HomingInitial,
            MachineState::HomingFinal,
            MachineState::Moving,
            MachineState::NoBlockMoving,
        ] {
            for kind in all_kinds() {
                assert_eq!(is_admissible(kind, state), !kind.is_move(), "{:?} {:?}", state, kind);
            }
        }
    }

    #[test]
    fn single_command_states() {
        for kind in all_kinds() {
            assert_eq!(
                is_admissible(kind, MachineState::Paused),
                kind == CommandKind::PauseResume
            );
            assert_eq!(
                is_admissible(kind, MachineState::EmergencyStop),
                kind == CommandKind::ReleaseEmergencyStop
            );
            assert_eq!(
                is_admissible(kind, MachineState::Ping),
                matches!(kind, CommandKind::Ping | CommandKind::CoastMove)
            );
        }
    }

    #[test]
    fn error_and_waiting_accept_nothing() {
        for kind in all_kinds() {
            assert!(!is_admissible(kind, MachineState::Error));
            assert!(!is_admissible(kind, MachineState::Waiting));
        }
    }

    #[test]
    fn unknown_codes_fail_closed() {
        for code in 10..=u8::MAX {
            for kind in all_kinds() {
                assert!(!is_admissible_code(kind, code));
            }
        }
    }

    #[test]
    fn codes_round_trip() {
        for state in ALL_STATES {
            assert_eq!(MachineState::from_code(state.code()), Some(state));
        }
    }

    // =========================================================================
    // Tracker
    // =========================================================================

    #[test]
    fn tracker_power_on_defaults() {
        let tracker = MachineStateTracker::new();
        assert_eq!(tracker.state(), MachineState::Idle);
        assert_eq!(tracker.coordinate_system(), CoordinateSystem::Absolute);
        assert!(!tracker.is_homed());
        assert_eq!(tracker.wait_time(), 0);
    }

    #[test]
    fn set_state_stamps_time() {
        let mut tracker = MachineStateTracker::new();
        tracker.set_state(MachineState::Moving, 250);
        assert_eq!(tracker.time_entered_state(), 250);
        assert_eq!(tracker.time_in_state(400), 150);
    }

    #[test]
    fn entering_idle_clears_wait() {
        let mut tracker = MachineStateTracker::new();
        tracker.start_wait(500, 10);
        assert_eq!(tracker.state(), MachineState::Waiting);
        assert_eq!(tracker.wait_time(), 500);
        assert!(!tracker.wait_elapsed(509));
        assert!(tracker.wait_elapsed(510));

        tracker.set_state(MachineState::Idle, 510);
        assert_eq!(tracker.wait_time(), 0);
    }

    #[test]
    fn entering_other_state_keeps_wait() {
        let mut tracker = MachineStateTracker::new();
        tracker.start_ping(1000, 0);
        tracker.set_state(MachineState::Ping, 300);
        assert_eq!(tracker.wait_time(), 1000);
        assert_eq!(tracker.time_entered_state(), 300);
    }

    #[test]
    fn time_in_state_never_underflows() {
        let mut tracker = MachineStateTracker::new();
        tracker.set_state(MachineState::Waiting, 1000);
        assert_eq!(tracker.time_in_state(500), 0);
    }

    #[test]
    fn state_predicates() {
        assert!(MachineState::HomingFinal.is_homing());
        assert!(!MachineState::Moving.is_homing());
        assert!(MachineState::NoBlockMoving.is_motion());
        assert!(!MachineState::Paused.is_motion());
    }
}
