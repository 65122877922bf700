//! Safety input bank and the mapping from input events to machine actions.
//!
//! [`SafetyInputs`] debounces every safety and panel input and turns settled
//! changes into [`SafetyAction`]s. Executing the actions is the
//! controller's job (see
//! [`MachineController::apply_safety`](crate::controller::MachineController::apply_safety)).
//!
//! | Input | Event | Action |
//! |-------|-------|--------|
//! | limit min / max | triggered | [`SafetyAction::Limit`] |
//! | home switch | triggered | [`SafetyAction::HomeSwitch`] |
//! | e-stop | triggered | [`SafetyAction::EmergencyStop`] |
//! | e-stop | released | [`SafetyAction::ReleaseEmergencyStop`] |
//! | home button | triggered | [`SafetyAction::HomeRequest`] |
//! | resume button | triggered | [`SafetyAction::Resume`] |
//!
//! Actions come out in priority order: e-stop first, then limits, then the
//! home switch, then the panel buttons.

use heapless::Vec as HVec;

use crate::config::{InputConfig, InputsConfig};
use crate::debounce::{DebouncedInput, InputEvent};
use crate::traits::InputLevels;

/// Which end of the linear axis a limit switch guards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Limit {
    /// Minimum end.
    Min,
    /// Maximum end.
    Max,
}

/// Physical inputs watched by the safety cadence, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyInput {
    /// Emergency stop button.
    EStop,
    /// Minimum travel limit.
    LimitMin,
    /// Maximum travel limit.
    LimitMax,
    /// Home reference switch.
    Home,
    /// Panel home button.
    HomeButton,
    /// Panel resume button.
    ResumeButton,
}

impl SafetyInput {
    /// Every input, highest priority first.
    pub const ALL: [SafetyInput; 6] = [
        SafetyInput::EStop,
        SafetyInput::LimitMin,
        SafetyInput::LimitMax,
        SafetyInput::Home,
        SafetyInput::HomeButton,
        SafetyInput::ResumeButton,
    ];

    /// Raw level of this input in `levels`.
    pub fn level(self, levels: &InputLevels) -> bool {
        match self {
            SafetyInput::EStop => levels.estop,
            SafetyInput::LimitMin => levels.limit_min,
            SafetyInput::LimitMax => levels.limit_max,
            SafetyInput::Home => levels.home,
            SafetyInput::HomeButton => levels.home_button,
            SafetyInput::ResumeButton => levels.resume_button,
        }
    }

    fn config(self, inputs: &InputsConfig) -> InputConfig {
        match self {
            SafetyInput::EStop => inputs.estop,
            SafetyInput::LimitMin => inputs.limit_min,
            SafetyInput::LimitMax => inputs.limit_max,
            SafetyInput::Home => inputs.home,
            SafetyInput::HomeButton => inputs.home_button,
            SafetyInput::ResumeButton => inputs.resume_button,
        }
    }

    /// Whether settling inactive is itself meaningful for this input.
    pub const fn reports_release(self) -> bool {
        matches!(self, SafetyInput::EStop)
    }
}

/// What the controller must do in response to an input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyAction {
    /// Stop the linear axis and snap it to the endstop position.
    Limit(Limit),
    /// Drive the homing sequence.
    HomeSwitch,
    /// Same as `M0`.
    EmergencyStop,
    /// Same as `M1`.
    ReleaseEmergencyStop,
    /// Panel equivalent of `G28`.
    HomeRequest,
    /// Panel equivalent of `M24` while paused.
    Resume,
}

/// Map one input event to its action.
///
/// ```
/// use rs_axisctl::debounce::InputEvent;
/// use rs_axisctl::safety::{reaction, SafetyAction, SafetyInput};
///
/// assert_eq!(reaction(SafetyInput::EStop, InputEvent::Untriggered), Some(SafetyAction::ReleaseEmergencyStop));
/// assert_eq!(reaction(SafetyInput::Home, InputEvent::Untriggered), None);
/// ```
pub fn reaction(input: SafetyInput, event: InputEvent) -> Option<SafetyAction> {
    use SafetyAction as A;

    match (input, event) {
        (SafetyInput::EStop, InputEvent::Triggered) => Some(A::EmergencyStop),
        (SafetyInput::EStop, InputEvent::Untriggered) => Some(A::ReleaseEmergencyStop),
        (SafetyInput::LimitMin, InputEvent::Triggered) => Some(A::Limit(Limit::Min)),
        (SafetyInput::LimitMax, InputEvent::Triggered) => Some(A::Limit(Limit::Max)),
        (SafetyInput::Home, InputEvent::Triggered) => Some(A::HomeSwitch),
        (SafetyInput::HomeButton, InputEvent::Triggered) => Some(A::HomeRequest),
        (SafetyInput::ResumeButton, InputEvent::Triggered) => Some(A::Resume),
        (_, InputEvent::Untriggered) => None,
    }
}

/// Actions produced by one sample of the input bank.
pub type SafetyActions = HVec<SafetyAction, 6>;

/// Debounced bank of all safety and panel inputs.
#[derive(Clone, Debug)]
pub struct SafetyInputs {
    inputs: [DebouncedInput; 6],
}

impl SafetyInputs {
    /// Build the bank from per-input polarity and timing.
    pub fn new(config: &InputsConfig) -> Self {
        let build = |input: SafetyInput| {
            let cfg = input.config(config);
            let debounced = DebouncedInput::new(cfg.polarity, cfg.timing);
            if input.reports_release() {
                debounced.with_release()
            } else {
                debounced
            }
        };
        Self {
            inputs: SafetyInput::ALL.map(build),
        }
    }

    /// Sample every input once at `now_ms`.
    pub fn sample(&mut self, levels: &InputLevels, now_ms: u64) -> SafetyActions {
        let mut actions = SafetyActions::new();
        for (input, debounced) in SafetyInput::ALL.iter().zip(self.inputs.iter_mut()) {
            let Some(event) = debounced.sample(input.level(levels), now_ms) else {
                continue;
            };
            log::debug!("{:?} {:?} at {} ms", input, event, now_ms);
            if let Some(action) = reaction(*input, event) {
                // One slot per input, cannot overflow.
                let _ = actions.push(action);
            }
        }
        actions
    }

    /// Settled state of `input`.
    pub fn is_triggered(&self, input: SafetyInput) -> bool {
        self.inputs[Self::slot(input)].is_triggered()
    }

    fn slot(input: SafetyInput) -> usize {
        match input {
            SafetyInput::EStop => 0,
            SafetyInput::LimitMin => 1,
            SafetyInput::LimitMax => 2,
            SafetyInput::Home => 3,
            SafetyInput::HomeButton => 4,
            SafetyInput::ResumeButton => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::Polarity;

    fn bank() -> SafetyInputs {
        SafetyInputs::new(&InputsConfig::default().with_polarity(Polarity::ActiveHigh))
    }

    fn run(bank: &mut SafetyInputs, levels: InputLevels, from: u64, to: u64) -> Vec<SafetyAction> {
        (from..=to)
            .flat_map(|t| bank.sample(&levels, t))
            .collect()
    }

    #[test]
    fn quiet_inputs_produce_nothing() {
        let mut bank = bank();
        assert!(run(&mut bank, InputLevels::default(), 0, 500).is_empty());
    }

    #[test]
    fn active_low_idle_high_is_quiet() {
        let mut bank = SafetyInputs::new(&InputsConfig::default());
        let idle = InputLevels {
            limit_min: true,
            limit_max: true,
            home: true,
            estop: true,
            home_button: true,
            resume_button: true,
        };
        assert!(run(&mut bank, idle, 0, 500).is_empty());
    }

    #[test]
    fn estop_press_and_release() {
        let mut bank = bank();
        let pressed = InputLevels {
            estop: true,
            ..InputLevels::default()
        };
        assert_eq!(run(&mut bank, pressed, 0, 300), vec![SafetyAction::EmergencyStop]);
        assert!(bank.is_triggered(SafetyInput::EStop));
        assert_eq!(
            run(&mut bank, InputLevels::default(), 301, 600),
            vec![SafetyAction::ReleaseEmergencyStop]
        );
    }

    #[test]
    fn limit_release_is_silent() {
        let mut bank = bank();
        let hit = InputLevels {
            limit_max: true,
            ..InputLevels::default()
        };
        assert_eq!(run(&mut bank, hit, 0, 300), vec![SafetyAction::Limit(Limit::Max)]);
        assert!(run(&mut bank, InputLevels::default(), 301, 600).is_empty());
    }

    #[test]
    fn simultaneous_events_in_priority_order() {
        let mut bank = bank();
        let all = InputLevels {
            limit_min: true,
            limit_max: false,
            home: true,
            estop: true,
            home_button: true,
            resume_button: true,
        };
        let actions = run(&mut bank, all, 0, 300);
        assert_eq!(
            actions,
            vec![
                SafetyAction::EmergencyStop,
                SafetyAction::Limit(Limit::Min),
                SafetyAction::HomeSwitch,
                SafetyAction::HomeRequest,
                SafetyAction::Resume,
            ]
        );
    }

    #[test]
    fn reaction_table() {
        assert_eq!(
            reaction(SafetyInput::LimitMin, InputEvent::Triggered),
            Some(SafetyAction::Limit(Limit::Min))
        );
        assert_eq!(reaction(SafetyInput::ResumeButton, InputEvent::Untriggered), None);
        assert_eq!(
            reaction(SafetyInput::HomeButton, InputEvent::Triggered),
            Some(SafetyAction::HomeRequest)
        );
    }
}
