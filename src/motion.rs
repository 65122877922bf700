//! Motion coordination for the linear and rotary axes.
//!
//! [`MotionCoordinator`] owns the [`StepDriver`] and turns move, homing and
//! position commands into per-axis driver requests. It never changes the
//! machine state itself; callers look at the returned outcomes and decide.
//!
//! # Synchronized moves
//!
//! A `G1` without an explicit rotary feed computes one so both axes arrive
//! together:
//!
//! ```text
//! rotary_feed = |linear_feed * rotary_delta / linear_delta|
//! ```
//!
//! with a linear delta of zero replaced by one.
//!
//! # Homing
//!
//! Homing only moves the linear axis and runs through [`HomingStep`]s:
//!
//! ```text
//! Approach --home--> BackingOff --stopped--> Settling --settle_ms--> FinalApproach --home--> done
//! ```
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::motion::MotionCoordinator;
//! use rs_axisctl::commands::{Command, CommandKind, Field};
//! use rs_axisctl::config::MachineConfig;
//! use rs_axisctl::state::CoordinateSystem;
//! use rs_axisctl::hal::MockStepDriver;
//! use rs_axisctl::traits::Axis;
//!
//! let mut motion = MotionCoordinator::new(MockStepDriver::new(), &MachineConfig::default());
//! let g1 = Command::new(CommandKind::ControlledMove)
//!     .with(Field::X, 100)
//!     .with(Field::R, 50)
//!     .with(Field::F, 1000);
//!
//! let plan = motion.plan_move(&g1, CoordinateSystem::Relative, true);
//! assert_eq!(plan.rotary.unwrap().speed, 500);
//!
//! motion.execute(&plan).unwrap();
//! assert!(motion.any_moving());
//! assert_eq!(motion.position(Axis::Linear), 0);
//! ```

use crate::commands::Command;
use crate::config::{HomingConfig, MachineConfig};
use crate::state::CoordinateSystem;
use crate::traits::{Axis, StepDriver};

// ============================================================================
// Plans
// ============================================================================

/// One axis' share of a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisMove {
    /// Absolute target in units.
    pub target: i32,
    /// Feed in units/min, never zero.
    pub speed: u32,
}

/// Resolved per-axis requests for one move command. `None` holds the axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovePlan {
    /// Linear axis request.
    pub linear: Option<AxisMove>,
    /// Rotary axis request.
    pub rotary: Option<AxisMove>,
}

impl MovePlan {
    /// Request for `axis`.
    pub fn get(&self, axis: Axis) -> Option<AxisMove> {
        match axis {
            Axis::Linear => self.linear,
            Axis::Rotary => self.rotary,
        }
    }

    /// Returns true if neither axis moves.
    pub fn is_empty(&self) -> bool {
        self.linear.is_none() && self.rotary.is_none()
    }
}

/// Rotary feed that makes the rotary axis arrive together with the linear one.
///
/// A zero `linear_delta` is treated as one. The result saturates at
/// `u32::MAX`.
///
/// ```
/// use rs_axisctl::motion::synchronized_feed;
///
/// assert_eq!(synchronized_feed(1000, 100, 50), 500);
/// assert_eq!(synchronized_feed(1000, -100, 50), 500);
/// assert_eq!(synchronized_feed(10, 0, 3), 30);
/// ```
pub fn synchronized_feed(linear_feed: u32, linear_delta: i64, rotary_delta: i64) -> u32 {
    let divisor = if linear_delta == 0 { 1 } else { linear_delta };
    let feed = (linear_feed as i128 * rotary_delta as i128 / divisor as i128).unsigned_abs();
    u32::try_from(feed).unwrap_or(u32::MAX)
}

/// Clamp a linear target to `[0, max_travel]`. A zero limit disables the clamp.
///
/// ```
/// use rs_axisctl::motion::clamp_to_travel;
///
/// assert_eq!(clamp_to_travel(250, 200), 200);
/// assert_eq!(clamp_to_travel(-5, 200), 0);
/// assert_eq!(clamp_to_travel(-5, 0), -5);
/// ```
pub fn clamp_to_travel(target: i32, max_travel: i32) -> i32 {
    match max_travel {
        0 => target,
        max if max > 0 => target.clamp(0, max),
        max => target.clamp(max, 0),
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

// ============================================================================
// Homing
// ============================================================================

/// Sub-step of the two-phase homing sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HomingStep {
    /// Fast move toward the home switch.
    Approach,
    /// Slow move away from the switch after the first trigger.
    BackingOff,
    /// Back-off done, waiting before the final approach.
    Settling {
        /// When the back-off move finished.
        since_ms: u64,
    },
    /// Slow move back onto the switch.
    FinalApproach,
}

/// What a home switch trigger did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HomeTrigger {
    /// Not homing; nothing happened.
    Ignored,
    /// First trigger: position set, back-off started.
    BackOffStarted,
    /// Second trigger: position set, homing complete.
    Homed,
}

/// Result of polling an active homing sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HomingPoll {
    /// Not homing.
    Inactive,
    /// Still in progress.
    Running(HomingStep),
    /// Timeout exceeded; the linear axis was stopped and homing aborted.
    TimedOut,
}

// ============================================================================
// Coordinator
// ============================================================================

/// Motion state that survives a pause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PausedMotion {
    /// Moves that were still in flight when paused.
    pub plan: MovePlan,
}

/// Translates commands into [`StepDriver`] requests.
#[derive(Debug)]
pub struct MotionCoordinator<D: StepDriver> {
    driver: D,
    feeds: [u32; 2],
    max_acceleration: [u32; 2],
    max_travel: i32,
    home_position: i32,
    homing: HomingConfig,
    homing_step: Option<HomingStep>,
    homing_started_ms: u64,
    active: MovePlan,
}

impl<D: StepDriver> MotionCoordinator<D> {
    /// Wrap `driver` with the axis, endstop and homing settings of `config`.
    pub fn new(driver: D, config: &MachineConfig) -> Self {
        Self {
            driver,
            feeds: [config.linear.default_feed, config.rotary.default_feed],
            max_acceleration: [config.linear.max_acceleration, config.rotary.max_acceleration],
            max_travel: config.endstops.max_travel,
            home_position: config.endstops.home_position,
            homing: config.homing,
            homing_step: None,
            homing_started_ms: 0,
            active: MovePlan::default(),
        }
    }

    /// Energize both axes and apply the configured maximum accelerations.
    pub fn init(&mut self) -> Result<(), D::Error> {
        for axis in Axis::ALL {
            self.driver.set_enabled(axis, true)?;
            self.driver
                .set_acceleration(axis, self.max_acceleration[axis.index()])?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------------

    /// Resolve a `G0`/`G1` command into per-axis requests.
    ///
    /// Feeds present on the command become the new modal feeds; a feed of
    /// exactly zero holds its axis for this command only. With `synchronize`
    /// and no `P` field the rotary feed is derived from the linear one.
    pub fn plan_move(
        &mut self,
        command: &Command,
        coordinates: CoordinateSystem,
        synchronize: bool,
    ) -> MovePlan {
        let linear_now = self.driver.current_position(Axis::Linear) as i64;
        let rotary_now = self.driver.current_position(Axis::Rotary) as i64;

        let resolve = |field: Option<i32>, now: i64| -> i64 {
            match (field, coordinates) {
                (None, _) => now,
                (Some(v), CoordinateSystem::Relative) => now + v as i64,
                (Some(v), CoordinateSystem::Absolute) => v as i64,
            }
        };
        // Synchronization uses the clamped linear distance.
        let linear_target =
            clamp_to_travel(saturate(resolve(command.x, linear_now)), self.max_travel);
        let rotary_target = saturate(resolve(command.r, rotary_now));

        let linear_feed = self.feed_for(Axis::Linear, command.f);
        let rotary_feed = match command.p {
            None if synchronize => {
                let feed = synchronized_feed(
                    linear_feed,
                    linear_target as i64 - linear_now,
                    rotary_target as i64 - rotary_now,
                );
                if feed == 0 && linear_feed > 0 {
                    1
                } else {
                    feed
                }
            }
            p => self.feed_for(Axis::Rotary, p),
        };

        let build = |target: i32, now: i64, speed: u32| {
            (target as i64 != now && speed > 0).then_some(AxisMove { target, speed })
        };

        MovePlan {
            linear: build(linear_target, linear_now, linear_feed),
            rotary: build(rotary_target, rotary_now, rotary_feed),
        }
    }

    fn feed_for(&mut self, axis: Axis, field: Option<i32>) -> u32 {
        match field {
            Some(0) => 0,
            Some(feed) => {
                self.feeds[axis.index()] = feed.unsigned_abs();
                feed.unsigned_abs()
            }
            None => self.feeds[axis.index()],
        }
    }

    /// Issue the requests of `plan` to the driver.
    pub fn execute(&mut self, plan: &MovePlan) -> Result<(), D::Error> {
        for axis in Axis::ALL {
            if let Some(m) = plan.get(axis) {
                self.driver.move_to(axis, m.target, m.speed)?;
                self.set_active(axis, Some(m));
            }
        }
        Ok(())
    }

    fn set_active(&mut self, axis: Axis, m: Option<AxisMove>) {
        match axis {
            Axis::Linear => self.active.linear = m,
            Axis::Rotary => self.active.rotary = m,
        }
    }

    /// Stop both axes. Homing, if any, is aborted.
    pub fn stop_all(&mut self) -> Result<(), D::Error> {
        self.homing_step = None;
        self.active = MovePlan::default();
        self.driver.stop_all()
    }

    /// Stop both axes and remember what was still moving.
    pub fn pause(&mut self) -> Result<PausedMotion, D::Error> {
        let mut plan = MovePlan::default();
        for axis in Axis::ALL {
            if self.driver.is_moving(axis) {
                match axis {
                    Axis::Linear => plan.linear = self.active.linear,
                    Axis::Rotary => plan.rotary = self.active.rotary,
                }
            }
        }
        self.driver.stop_all()?;
        self.active = MovePlan::default();
        Ok(PausedMotion { plan })
    }

    /// Re-issue the moves captured by [`pause`](Self::pause).
    pub fn resume(&mut self, paused: &PausedMotion) -> Result<(), D::Error> {
        self.execute(&paused.plan)
    }

    // ------------------------------------------------------------------------
    // Positions and limits
    // ------------------------------------------------------------------------

    /// Redefine positions from the `X`/`R` fields that are present (`G92`).
    pub fn set_position(&mut self, command: &Command) -> Result<(), D::Error> {
        if let Some(x) = command.x {
            self.driver.set_current_position(Axis::Linear, x)?;
            self.set_active(Axis::Linear, None);
        }
        if let Some(r) = command.r {
            self.driver.set_current_position(Axis::Rotary, r)?;
            self.set_active(Axis::Rotary, None);
        }
        Ok(())
    }

    /// Apply `F` (linear) and `P` (rotary) accelerations, capped at the
    /// configured maxima (`M204`).
    pub fn set_acceleration(&mut self, command: &Command) -> Result<(), D::Error> {
        for (axis, field) in [(Axis::Linear, command.f), (Axis::Rotary, command.p)] {
            if let Some(accel) = field {
                let accel = accel.unsigned_abs().min(self.max_acceleration[axis.index()]);
                self.driver.set_acceleration(axis, accel)?;
            }
        }
        Ok(())
    }

    /// Linear travel limit; zero means unconstrained.
    #[inline]
    pub fn max_travel(&self) -> i32 {
        self.max_travel
    }

    /// Set the linear travel limit (`M208`).
    pub fn set_max_travel(&mut self, max_travel: i32) {
        self.max_travel = max_travel;
    }

    /// Stop the linear axis and snap its position to `endstop_position`.
    pub fn snap_linear_to(&mut self, endstop_position: i32) -> Result<(), D::Error> {
        self.driver.stop(Axis::Linear)?;
        self.driver
            .set_current_position(Axis::Linear, endstop_position)?;
        self.set_active(Axis::Linear, None);
        Ok(())
    }

    /// Disable and stop both axes, aborting homing.
    pub fn emergency_stop(&mut self) -> Result<(), D::Error> {
        self.homing_step = None;
        self.active = MovePlan::default();
        for axis in Axis::ALL {
            self.driver.set_enabled(axis, false)?;
        }
        self.driver.stop_all()
    }

    /// Re-enable both axes and zero their positions.
    pub fn release_emergency_stop(&mut self) -> Result<(), D::Error> {
        for axis in Axis::ALL {
            self.driver.set_enabled(axis, true)?;
            self.driver.set_current_position(axis, 0)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Homing
    // ------------------------------------------------------------------------

    /// Start the fast approach toward the home switch.
    pub fn start_homing(&mut self, now_ms: u64) -> Result<(), D::Error> {
        let here = self.driver.current_position(Axis::Linear);
        let target = here.saturating_sub(self.homing.excursion);
        self.homing_started_ms = now_ms;
        self.homing_step = Some(HomingStep::Approach);
        self.issue_linear(target, self.homing.fast_feed)
    }

    fn issue_linear(&mut self, target: i32, speed: u32) -> Result<(), D::Error> {
        self.driver.move_to(Axis::Linear, target, speed)?;
        self.set_active(Axis::Linear, Some(AxisMove { target, speed }));
        Ok(())
    }

    /// React to a settled home switch trigger.
    pub fn on_home_trigger(&mut self, now_ms: u64) -> Result<HomeTrigger, D::Error> {
        let Some(step) = self.homing_step else {
            return Ok(HomeTrigger::Ignored);
        };
        self.snap_linear_to(self.home_position)?;

        match step {
            HomingStep::Approach => {
                log::debug!("home switch hit at {} ms, backing off", now_ms);
                self.homing_step = Some(HomingStep::BackingOff);
                let target = self.home_position.saturating_add(self.homing.back_off);
                self.issue_linear(target, self.homing.slow_feed)?;
                Ok(HomeTrigger::BackOffStarted)
            }
            HomingStep::BackingOff | HomingStep::Settling { .. } | HomingStep::FinalApproach => {
                self.homing_step = None;
                Ok(HomeTrigger::Homed)
            }
        }
    }

    /// Advance the timed homing sub-steps and enforce the homing timeout.
    pub fn poll_homing(&mut self, now_ms: u64) -> Result<HomingPoll, D::Error> {
        let Some(step) = self.homing_step else {
            return Ok(HomingPoll::Inactive);
        };

        if now_ms.saturating_sub(self.homing_started_ms) >= self.homing.timeout_ms {
            self.homing_step = None;
            self.driver.stop(Axis::Linear)?;
            self.set_active(Axis::Linear, None);
            return Ok(HomingPoll::TimedOut);
        }

        let next = match step {
            HomingStep::BackingOff if !self.driver.is_moving(Axis::Linear) => {
                HomingStep::Settling { since_ms: now_ms }
            }
            HomingStep::Settling { since_ms }
                if now_ms.saturating_sub(since_ms) >= self.homing.settle_ms =>
            {
                let here = self.driver.current_position(Axis::Linear);
                let target = here.saturating_sub(self.homing.excursion);
                self.issue_linear(target, self.homing.slow_feed)?;
                HomingStep::FinalApproach
            }
            other => other,
        };
        self.homing_step = Some(next);
        Ok(HomingPoll::Running(next))
    }

    /// Drop homing progress without touching the axes.
    pub fn abort_homing(&mut self) {
        self.homing_step = None;
    }

    /// Current homing sub-step.
    #[inline]
    pub fn homing_step(&self) -> Option<HomingStep> {
        self.homing_step
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Current position of `axis`.
    pub fn position(&self, axis: Axis) -> i32 {
        self.driver.current_position(axis)
    }

    /// Current speed of `axis`.
    pub fn speed(&self, axis: Axis) -> u32 {
        self.driver.speed(axis)
    }

    /// Returns true if either axis is moving.
    pub fn any_moving(&self) -> bool {
        self.driver.any_moving()
    }

    /// Modal feed of `axis`.
    pub fn modal_feed(&self, axis: Axis) -> u32 {
        self.feeds[axis.index()]
    }

    /// Shared access to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
