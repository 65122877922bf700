//! Software model of one stepper axis.
//!
//! [`StepperAxis`] does the bookkeeping a step-pulse engine does: it converts
//! axis units to steps, derives the step period from a feed in units/min,
//! applies wiring inversion to the direction output and advances the step
//! counter as time passes. It runs at constant speed; acceleration is stored
//! for drivers that ramp but is not simulated.
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::hal::StepperAxis;
//!
//! // 10 steps per unit, 600 units/min max.
//! let mut axis = StepperAxis::new(10.0, 600);
//! axis.move_to(2, 600);
//! assert_eq!(axis.target_steps(), 20);
//!
//! // 600 units/min = 100 steps/s = one step every 10 ms.
//! assert_eq!(axis.step_period_us(), Some(10_000));
//! assert_eq!(axis.advance(50_000), 5);
//! assert_eq!(axis.current_steps(), 5);
//! ```

/// One simulated stepper axis.
#[derive(Clone, Debug, PartialEq)]
pub struct StepperAxis {
    steps_per_unit: f32,
    max_speed: u32,
    invert_direction: bool,
    enabled: bool,
    current_steps: i64,
    target_steps: i64,
    speed: u32,
    acceleration: u32,
    pending_us: u64,
}

impl StepperAxis {
    /// Create an enabled axis at position zero.
    pub fn new(steps_per_unit: f32, max_speed: u32) -> Self {
        Self {
            steps_per_unit,
            max_speed,
            invert_direction: false,
            enabled: true,
            current_steps: 0,
            target_steps: 0,
            speed: 0,
            acceleration: 0,
            pending_us: 0,
        }
    }

    /// Reverse the direction output.
    pub fn with_invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Convert axis units to the nearest step.
    pub fn units_to_steps(&self, units: i32) -> i64 {
        round_half_away(units as f32 * self.steps_per_unit)
    }

    /// Convert steps to the nearest whole axis unit.
    pub fn steps_to_units(&self, steps: i64) -> i32 {
        if self.steps_per_unit <= 0.0 {
            return 0;
        }
        let units = round_half_away(steps as f32 / self.steps_per_unit);
        units.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Start moving toward `target` units at `speed` units/min, clamped to the
    /// axis maximum. Replaces any previous target.
    pub fn move_to(&mut self, target: i32, speed: u32) {
        self.target_steps = self.units_to_steps(target);
        self.speed = speed.min(self.max_speed);
        if !self.is_moving() {
            self.speed = 0;
        }
    }

    /// Stop immediately at the current step.
    pub fn stop(&mut self) {
        self.target_steps = self.current_steps;
        self.speed = 0;
        self.pending_us = 0;
    }

    /// Redefine the current position without moving.
    pub fn set_current_position(&mut self, units: i32) {
        self.current_steps = self.units_to_steps(units);
        self.target_steps = self.current_steps;
        self.speed = 0;
        self.pending_us = 0;
    }

    /// Energize or release the driver. A released axis does not step.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Record the acceleration in units/min².
    pub fn set_acceleration(&mut self, acceleration: u32) {
        self.acceleration = acceleration;
    }

    /// Time between two step pulses at the current speed, `None` when holding.
    pub fn step_period_us(&self) -> Option<u64> {
        let steps_per_min = self.speed as f32 * self.steps_per_unit;
        if steps_per_min <= 0.0 {
            return None;
        }
        let period = 60_000_000.0 / steps_per_min;
        Some(round_half_away(period).max(1) as u64)
    }

    /// Level of the direction output for the pending move.
    pub fn direction_level(&self) -> bool {
        (self.target_steps >= self.current_steps) != self.invert_direction
    }

    /// Advance simulated time by `elapsed_us` and return the steps taken.
    pub fn advance(&mut self, elapsed_us: u64) -> u64 {
        if !self.enabled || !self.is_moving() {
            self.pending_us = 0;
            return 0;
        }
        let Some(period) = self.step_period_us() else {
            return 0;
        };

        self.pending_us += elapsed_us;
        let remaining = self.target_steps.abs_diff(self.current_steps);
        let steps = (self.pending_us / period).min(remaining);
        self.pending_us -= steps * period;

        if self.target_steps > self.current_steps {
            self.current_steps += steps as i64;
        } else {
            self.current_steps -= steps as i64;
        }
        if !self.is_moving() {
            self.speed = 0;
            self.pending_us = 0;
        }
        steps
    }

    /// Jump straight to the target.
    pub fn finish(&mut self) {
        self.current_steps = self.target_steps;
        self.speed = 0;
        self.pending_us = 0;
    }

    /// Current position in units.
    pub fn current_units(&self) -> i32 {
        self.steps_to_units(self.current_steps)
    }

    /// Current position in steps.
    #[inline]
    pub fn current_steps(&self) -> i64 {
        self.current_steps
    }

    /// Target position in steps.
    #[inline]
    pub fn target_steps(&self) -> i64 {
        self.target_steps
    }

    /// Returns true while steps remain.
    #[inline]
    pub fn is_moving(&self) -> bool {
        self.current_steps != self.target_steps
    }

    /// Commanded speed in units/min, zero when idle.
    #[inline]
    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Whether the driver is energized.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Recorded acceleration.
    #[inline]
    pub fn acceleration(&self) -> u32 {
        self.acceleration
    }
}

fn round_half_away(value: f32) -> i64 {
    if value >= 0.0 {
        (value + 0.5) as i64
    } else {
        (value - 0.5) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_step_conversion_rounds() {
        let axis = StepperAxis::new(4.444_444_4, 1440);
        assert_eq!(axis.units_to_steps(9), 40);
        assert_eq!(axis.units_to_steps(-9), -40);
        assert_eq!(axis.steps_to_units(40), 9);
        assert_eq!(axis.steps_to_units(-40), -9);
    }

    #[test]
    fn speed_clamped_to_max() {
        let mut axis = StepperAxis::new(1.0, 100);
        axis.move_to(50, 5000);
        assert_eq!(axis.speed(), 100);
    }

    #[test]
    fn move_to_current_position_holds() {
        let mut axis = StepperAxis::new(1.0, 100);
        axis.move_to(0, 50);
        assert!(!axis.is_moving());
        assert_eq!(axis.speed(), 0);
        assert_eq!(axis.step_period_us(), None);
    }

    #[test]
    fn step_period_from_feed() {
        let mut axis = StepperAxis::new(1.0, 6000);
        axis.move_to(100, 6000);
        // 6000 steps/min = 100 steps/s.
        assert_eq!(axis.step_period_us(), Some(10_000));
    }

    #[test]
    fn advance_stops_exactly_at_target() {
        let mut axis = StepperAxis::new(1.0, 6000);
        axis.move_to(-3, 6000);
        assert_eq!(axis.advance(1_000_000), 3);
        assert_eq!(axis.current_units(), -3);
        assert!(!axis.is_moving());
        assert_eq!(axis.speed(), 0);
    }

    #[test]
    fn advance_carries_partial_periods() {
        let mut axis = StepperAxis::new(1.0, 6000);
        axis.move_to(10, 6000);
        assert_eq!(axis.advance(6_000), 0);
        assert_eq!(axis.advance(6_000), 1);
        assert_eq!(axis.advance(8_000), 1);
        assert_eq!(axis.current_steps(), 2);
    }

    #[test]
    fn disabled_axis_does_not_step() {
        let mut axis = StepperAxis::new(1.0, 6000);
        axis.move_to(10, 6000);
        axis.set_enabled(false);
        assert_eq!(axis.advance(1_000_000), 0);
        assert!(axis.is_moving());
    }

    #[test]
    fn direction_inversion() {
        let mut axis = StepperAxis::new(1.0, 100);
        axis.move_to(10, 100);
        assert!(axis.direction_level());

        let mut inverted = StepperAxis::new(1.0, 100).with_invert_direction(true);
        inverted.move_to(10, 100);
        assert!(!inverted.direction_level());
        inverted.move_to(-10, 100);
        assert!(inverted.direction_level());
    }

    #[test]
    fn stop_and_set_position() {
        let mut axis = StepperAxis::new(2.0, 600);
        axis.move_to(100, 600);
        axis.advance(100_000);
        axis.stop();
        assert!(!axis.is_moving());
        let here = axis.current_steps();
        assert_eq!(axis.target_steps(), here);

        axis.set_current_position(7);
        assert_eq!(axis.current_steps(), 14);
        assert_eq!(axis.current_units(), 7);
    }
}
