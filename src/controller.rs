//! Machine controller that ties intake, dispatch, motion and safety together.
//!
//! The [`MachineController`] owns every piece of mutable machine state: the
//! [`MachineStateTracker`], the [`MotionCoordinator`] (and through it the step
//! driver), the relay outputs, the debounced safety inputs and one
//! [`CommandQueue`] per serial channel. It is driven from two cadences:
//!
//! - **Safety**: [`sample_safety`](MachineController::sample_safety) on a short
//!   fixed period. It reacts immediately and never waits on the queues.
//! - **Commands**: [`feed`](MachineController::feed) /
//!   [`poll_serial`](MachineController::poll_serial) for intake and
//!   [`poll`](MachineController::poll) for the periodic tick and dispatch.
//!
//! # Dispatch rules
//!
//! - The head of each channel's queue runs only if it is admissible in the
//!   current state; otherwise it stays queued and blocks the commands behind it.
//! - `M0` never enters a queue; it runs at intake.
//! - In `EmergencyStop` the queues are scanned for `M1`, which is taken out of
//!   order.
//! - `M999` at the head rewinds its queue by `P` while `T > 0`, decrementing
//!   `T` in place.
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::controller::{Channel, MachineController};
//! use rs_axisctl::config::MachineConfig;
//! use rs_axisctl::hal::{MockOutputs, MockStepDriver};
//! use rs_axisctl::messages::Response;
//! use rs_axisctl::state::MachineState;
//!
//! let mut machine: MachineController<_, _> =
//!     MachineController::new(MockStepDriver::new(), MockOutputs::new(), MachineConfig::default());
//!
//! machine.feed_usb(b"!G91;!G1,X100,R50,F1000;!M114;", 0).unwrap();
//! machine.poll(0).unwrap();
//! assert_eq!(machine.state(), MachineState::Moving);
//!
//! // M114 is admissible while moving.
//! assert!(matches!(machine.pop_response(Channel::Usb), Some(Response::Position { .. })));
//! ```

use heapless::Deque;

use crate::commands::{Command, CommandKind};
use crate::config::MachineConfig;
use crate::messages::{MotionFault, Response, Warning};
use crate::motion::{HomeTrigger, HomingPoll, MotionCoordinator, PausedMotion};
use crate::parsing::{parse_command, FrameEvent, LineFramer, DEFAULT_LINE_CAPACITY};
use crate::queue::{CommandQueue, DEFAULT_QUEUE_CAPACITY};
use crate::safety::{Limit, SafetyAction, SafetyInputs};
use crate::state::{is_admissible, CoordinateSystem, MachineState, MachineStateTracker};
use crate::traits::{
    Axis, DigitalOutputs, InputLevels, InputSampler, SerialPort, StepDriver, OUTPUT_PIN_COUNT,
};

/// Responses buffered per channel before the oldest are dropped.
pub const OUTBOX_CAPACITY: usize = 16;

// ============================================================================
// Channels
// ============================================================================

/// Serial channel a command arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Channel {
    /// Host connection.
    Usb,
    /// Front panel display.
    Display,
}

impl Channel {
    /// Both channels, USB first.
    pub const ALL: [Channel; 2] = [Channel::Usb, Channel::Display];

    /// Index in per-channel arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Channel::Usb => 0,
            Channel::Display => 1,
        }
    }
}

#[derive(Debug)]
struct ChannelIo<const Q: usize, const L: usize> {
    framer: LineFramer<L>,
    queue: CommandQueue<Q>,
    outbox: Deque<Response, OUTBOX_CAPACITY>,
}

impl<const Q: usize, const L: usize> ChannelIo<Q, L> {
    fn new() -> Self {
        Self {
            framer: LineFramer::new(),
            queue: CommandQueue::new(),
            outbox: Deque::new(),
        }
    }

    fn respond(&mut self, response: Response) {
        if self.outbox.is_full() {
            let _ = self.outbox.pop_front();
        }
        // Room was made above.
        let _ = self.outbox.push_back(response);
    }
}

// ============================================================================
// Outcomes and status
// ============================================================================

/// Result of one dispatch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchOutcome {
    /// A command was executed (or a jump was applied).
    Executed(CommandKind),
    /// The head command is not admissible in the current state.
    Deferred(CommandKind),
    /// Every queue is empty.
    Empty,
}

/// Snapshot of the machine for status displays and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineStatus {
    /// Current state.
    pub state: MachineState,
    /// Active coordinate system.
    pub coordinate_system: CoordinateSystem,
    /// Whether the linear axis is homed.
    pub is_homed: bool,
    /// Linear position in units.
    pub linear: i32,
    /// Rotary position in units.
    pub rotary: i32,
    /// Linear speed in units/min.
    pub linear_speed: u32,
    /// Rotary speed in units/min.
    pub rotary_speed: u32,
    /// Commands waiting on the USB channel.
    pub usb_queued: usize,
    /// Commands waiting on the display channel.
    pub display_queued: usize,
    /// Whether the alarm output is asserted.
    pub alarm: bool,
}

#[derive(Clone, Copy, Debug)]
struct PauseRecord {
    previous: MachineState,
    motion: PausedMotion,
}

// ============================================================================
// Controller
// ============================================================================

/// The motion controller core.
///
/// `Q` is the per-channel queue capacity and `L` the longest accepted line.
pub struct MachineController<
    D: StepDriver,
    O: DigitalOutputs,
    const Q: usize = DEFAULT_QUEUE_CAPACITY,
    const L: usize = DEFAULT_LINE_CAPACITY,
> {
    config: MachineConfig,
    motion: MotionCoordinator<D>,
    outputs: O,
    tracker: MachineStateTracker,
    safety: SafetyInputs,
    channels: [ChannelIo<Q, L>; 2],
    paused: Option<PauseRecord>,
    next_channel: usize,
    idle_reported: bool,
    alarm_active: bool,
}

impl<D, O, const Q: usize, const L: usize> MachineController<D, O, Q, L>
where
    D: StepDriver,
    O: DigitalOutputs,
{
    /// Create a controller in `Idle`, absolute coordinates, not homed.
    pub fn new(driver: D, outputs: O, config: MachineConfig) -> Self {
        Self {
            motion: MotionCoordinator::new(driver, &config),
            safety: SafetyInputs::new(&config.inputs),
            outputs,
            tracker: MachineStateTracker::new(),
            channels: [ChannelIo::new(), ChannelIo::new()],
            paused: None,
            next_channel: 0,
            idle_reported: true,
            alarm_active: false,
            config,
        }
    }

    /// Energize the axes and apply configured accelerations.
    pub fn init(&mut self) -> Result<(), D::Error> {
        log::info!(
            "{}: linear max {} units/min, rotary max {} units/min",
            self.config.name,
            self.config.linear.max_speed,
            self.config.rotary.max_speed
        );
        self.motion.init()
    }

    // ------------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------------

    /// Feed raw bytes received on `channel`.
    ///
    /// Complete lines are parsed and queued. `M0` is executed on the spot.
    pub fn feed(&mut self, channel: Channel, bytes: &[u8], now_ms: u64) -> Result<(), D::Error> {
        for &byte in bytes {
            self.feed_byte(channel, byte, now_ms)?;
        }
        Ok(())
    }

    /// [`feed`](Self::feed) on the USB channel.
    pub fn feed_usb(&mut self, bytes: &[u8], now_ms: u64) -> Result<(), D::Error> {
        self.feed(Channel::Usb, bytes, now_ms)
    }

    /// [`feed`](Self::feed) on the display channel.
    pub fn feed_display(&mut self, bytes: &[u8], now_ms: u64) -> Result<(), D::Error> {
        self.feed(Channel::Display, bytes, now_ms)
    }

    fn feed_byte(&mut self, channel: Channel, byte: u8, now_ms: u64) -> Result<(), D::Error> {
        match self.channels[channel.index()].framer.push(byte) {
            None => Ok(()),
            Some(FrameEvent::Overflow) => {
                log::warn!("{:?}: line longer than {} bytes dropped", channel, L);
                self.respond(channel, Response::Warning(Warning::LineOverflow));
                Ok(())
            }
            Some(FrameEvent::Line(line)) => {
                let command = parse_command(&line);
                self.accept(channel, command, now_ms)
            }
        }
    }

    /// Queue an already-parsed command as if it had arrived on `channel`.
    pub fn accept(&mut self, channel: Channel, command: Command, now_ms: u64) -> Result<(), D::Error> {
        match command.kind {
            CommandKind::Invalid => {
                log::debug!("{:?}: invalid command dropped", channel);
                Ok(())
            }
            CommandKind::EmergencyStop => self.emergency_stop(now_ms),
            _ => {
                if self.channels[channel.index()].queue.push(command) {
                    self.idle_reported = false;
                } else {
                    log::warn!("{:?}: queue full, dropped {}", channel, command);
                    self.respond(channel, Response::Warning(Warning::QueueFull));
                }
                Ok(())
            }
        }
    }

    /// Drain `port` into `channel`, then write out its pending responses.
    pub fn poll_serial<S: SerialPort>(
        &mut self,
        channel: Channel,
        port: &mut S,
        now_ms: u64,
    ) -> Result<(), D::Error> {
        while let Some(byte) = port.read_byte() {
            self.feed_byte(channel, byte, now_ms)?;
        }
        self.flush(channel, port);
        Ok(())
    }

    /// Write every pending response of `channel` to `port`.
    ///
    /// Lines the port refuses are dropped.
    pub fn flush<S: SerialPort>(&mut self, channel: Channel, port: &mut S) {
        while let Some(response) = self.pop_response(channel) {
            if port.write_line(&response.to_line()).is_err() {
                log::warn!("{:?}: failed to write {}", channel, response);
            }
        }
    }

    /// Take the oldest pending response of `channel`.
    pub fn pop_response(&mut self, channel: Channel) -> Option<Response> {
        self.channels[channel.index()].outbox.pop_front()
    }

    fn respond(&mut self, channel: Channel, response: Response) {
        self.channels[channel.index()].respond(response);
    }

    fn broadcast(&mut self, response: Response) {
        self.respond(Channel::Usb, response);
        if self.config.serial.display_enabled {
            self.respond(Channel::Display, response);
        }
    }

    // ------------------------------------------------------------------------
    // Command cadence
    // ------------------------------------------------------------------------

    /// One pass of the command cadence: periodic tick, then dispatch until the
    /// queues are empty or blocked, then the idle notification.
    pub fn poll(&mut self, now_ms: u64) -> Result<(), D::Error> {
        self.tick(now_ms)?;
        for _ in 0..2 * Q {
            match self.dispatch(now_ms)? {
                DispatchOutcome::Executed(_) => continue,
                DispatchOutcome::Deferred(_) | DispatchOutcome::Empty => break,
            }
        }
        self.notify_idle();
        Ok(())
    }

    /// Time-driven state transitions: wait expiry, ping timeout, move
    /// completion, homing progress and homing timeout.
    pub fn tick(&mut self, now_ms: u64) -> Result<(), D::Error> {
        match self.tracker.state() {
            MachineState::Waiting if self.tracker.wait_elapsed(now_ms) => {
                self.tracker.set_state(MachineState::Idle, now_ms);
            }
            MachineState::Ping if self.tracker.wait_elapsed(now_ms) => {
                log::info!("ping timeout after {} ms, stopping", self.tracker.wait_time());
                self.motion.stop_all()?;
                self.tracker.set_state(MachineState::Idle, now_ms);
            }
            MachineState::Moving | MachineState::NoBlockMoving if !self.motion.any_moving() => {
                self.tracker.set_state(MachineState::Idle, now_ms);
            }
            MachineState::HomingInitial | MachineState::HomingFinal => {
                match self.motion.poll_homing(now_ms)? {
                    HomingPoll::Running(_) => {}
                    HomingPoll::TimedOut => {
                        self.fault(MotionFault::HomingTimeout);
                        self.tracker.set_state(MachineState::Idle, now_ms);
                    }
                    HomingPoll::Inactive => {
                        self.tracker.set_state(MachineState::Idle, now_ms);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Try to run one queued command.
    pub fn dispatch(&mut self, now_ms: u64) -> Result<DispatchOutcome, D::Error> {
        if self.tracker.state() == MachineState::EmergencyStop {
            return self.dispatch_release(now_ms);
        }

        let state = self.tracker.state();
        let mut deferred = None;
        for i in 0..Channel::ALL.len() {
            let channel = Channel::ALL[(self.next_channel + i) % Channel::ALL.len()];
            let Some(head) = self.channels[channel.index()].queue.peek(0).copied() else {
                continue;
            };
            if !is_admissible(head.kind, state) {
                deferred = deferred.or(Some(head.kind));
                continue;
            }

            self.next_channel = (channel.index() + 1) % Channel::ALL.len();
            if head.kind == CommandKind::Jump {
                self.jump(channel);
                return Ok(DispatchOutcome::Executed(CommandKind::Jump));
            }
            let _ = self.channels[channel.index()].queue.pop();
            self.execute(channel, &head, now_ms)?;
            return Ok(DispatchOutcome::Executed(head.kind));
        }

        Ok(deferred.map_or(DispatchOutcome::Empty, DispatchOutcome::Deferred))
    }

    fn dispatch_release(&mut self, now_ms: u64) -> Result<DispatchOutcome, D::Error> {
        let mut deferred = None;
        for channel in Channel::ALL {
            let queue = &mut self.channels[channel.index()].queue;
            match queue.position(|c| c.kind == CommandKind::ReleaseEmergencyStop) {
                Some(pos) => {
                    if let Some(release) = queue.take(pos) {
                        self.execute(channel, &release, now_ms)?;
                        return Ok(DispatchOutcome::Executed(release.kind));
                    }
                }
                None => {
                    if let Some(head) = queue.peek(0) {
                        deferred = deferred.or(Some(head.kind));
                    }
                }
            }
        }
        Ok(deferred.map_or(DispatchOutcome::Empty, DispatchOutcome::Deferred))
    }

    fn jump(&mut self, channel: Channel) {
        let queue = &mut self.channels[channel.index()].queue;
        let Some(head) = queue.peek_mut(0) else {
            return;
        };
        let remaining = head.t.unwrap_or(0);
        let offset = head.p.unwrap_or(0).max(0) as usize;
        if remaining <= 0 {
            let _ = queue.pop();
            return;
        }
        head.t = Some(remaining - 1);

        if queue.rewind(offset) {
            log::debug!("{:?}: jump back {}, {} left", channel, offset, remaining - 1);
        } else {
            let _ = queue.pop();
            log::warn!("{:?}: jump back {} out of range", channel, offset);
            self.respond(channel, Response::Warning(Warning::JumpOutOfRange));
        }
    }

    fn execute(&mut self, channel: Channel, command: &Command, now_ms: u64) -> Result<(), D::Error> {
        log::debug!("{:?}: {}", channel, command);

        match command.kind {
            CommandKind::Invalid | CommandKind::Jump => {}
            CommandKind::Ping => {
                let interval = command
                    .p
                    .filter(|p| *p > 0)
                    .map_or(self.config.ping.default_interval_ms, |p| p as u64);
                self.tracker.start_ping(interval, now_ms);
                self.respond(channel, Response::PingAck);
            }
            CommandKind::Wait => {
                let ms = command.p.unwrap_or(0).max(0) as u64;
                let secs = command.s.unwrap_or(0).max(0) as u64;
                self.tracker.start_wait(ms + secs * 1000, now_ms);
            }
            CommandKind::EmergencyStop => self.emergency_stop(now_ms)?,
            CommandKind::ReleaseEmergencyStop => self.release_emergency_stop(now_ms)?,
            CommandKind::PauseResume => {
                if self.tracker.state() == MachineState::Paused {
                    self.resume(now_ms)?;
                } else {
                    self.pause(now_ms)?;
                }
            }
            CommandKind::GetPosition => {
                let response = self.position_report();
                self.respond(channel, response);
            }
            CommandKind::SetRelative => {
                self.tracker.set_coordinate_system(CoordinateSystem::Relative)
            }
            CommandKind::SetAbsolute => {
                self.tracker.set_coordinate_system(CoordinateSystem::Absolute)
            }
            CommandKind::SetMaxTravel => {
                if let Some(x) = command.x {
                    self.motion.set_max_travel(x);
                }
            }
            CommandKind::SetStepsPerUnit => {
                log::debug!("steps per unit are fixed by configuration, ignoring {}", command);
            }
            CommandKind::ControlledMove => {
                let plan = self
                    .motion
                    .plan_move(command, self.tracker.coordinate_system(), true);
                self.motion.execute(&plan)?;
                self.tracker.set_state(MachineState::Moving, now_ms);
            }
            CommandKind::CoastMove => {
                let plan = self
                    .motion
                    .plan_move(command, self.tracker.coordinate_system(), false);
                self.motion.execute(&plan)?;
                if self.tracker.state() != MachineState::Ping {
                    self.tracker.set_state(MachineState::NoBlockMoving, now_ms);
                }
            }
            CommandKind::Home => self.start_homing(now_ms)?,
            CommandKind::SetPin => self.set_pin(channel, command),
            CommandKind::Cancel => {
                self.motion.stop_all()?;
                self.paused = None;
                self.tracker.set_state(MachineState::Idle, now_ms);
            }
            CommandKind::SetPosition => self.motion.set_position(command)?,
            CommandKind::SetAcceleration => self.motion.set_acceleration(command)?,
        }
        Ok(())
    }

    fn set_pin(&mut self, channel: Channel, command: &Command) {
        let pin = match command.p {
            Some(p) if (0..OUTPUT_PIN_COUNT as i32).contains(&p) => p as u8,
            other => {
                log::warn!("{:?}: output pin {:?} out of range", channel, other);
                self.respond(channel, Response::Warning(Warning::PinOutOfRange));
                return;
            }
        };
        let high = command.s.unwrap_or(0) != 0;
        if self.outputs.write(pin, high).is_err() {
            log::warn!("{:?}: failed to drive output {}", channel, pin);
            self.respond(channel, Response::Warning(Warning::HardwareError));
        }
    }

    fn position_report(&self) -> Response {
        Response::Position {
            linear: self.motion.position(Axis::Linear),
            rotary: self.motion.position(Axis::Rotary),
            linear_speed: self.motion.speed(Axis::Linear),
            rotary_speed: self.motion.speed(Axis::Rotary),
        }
    }

    fn notify_idle(&mut self) {
        let drained = self.channels.iter().all(|c| c.queue.is_empty());
        if drained && self.tracker.state() == MachineState::Idle {
            if !self.idle_reported {
                self.idle_reported = true;
                self.broadcast(Response::Idle);
            }
        } else {
            self.idle_reported = false;
        }
    }

    // ------------------------------------------------------------------------
    // Actions shared by commands and safety inputs
    // ------------------------------------------------------------------------

    fn emergency_stop(&mut self, now_ms: u64) -> Result<(), D::Error> {
        log::info!("emergency stop");
        self.paused = None;
        self.idle_reported = false;
        self.tracker.set_state(MachineState::EmergencyStop, now_ms);
        self.motion.emergency_stop()
    }

    fn release_emergency_stop(&mut self, now_ms: u64) -> Result<(), D::Error> {
        if self.tracker.state() != MachineState::EmergencyStop {
            log::debug!("not in emergency stop, release ignored");
            return Ok(());
        }
        log::info!("emergency stop released");
        self.motion.release_emergency_stop()?;
        self.tracker.set_homed(false);
        self.clear_alarm();
        self.tracker.set_state(MachineState::Idle, now_ms);
        Ok(())
    }

    fn start_homing(&mut self, now_ms: u64) -> Result<(), D::Error> {
        self.motion.start_homing(now_ms)?;
        self.tracker.set_state(MachineState::HomingInitial, now_ms);
        Ok(())
    }

    fn pause(&mut self, now_ms: u64) -> Result<(), D::Error> {
        let previous = self.tracker.state();
        let motion = self.motion.pause()?;
        self.paused = Some(PauseRecord { previous, motion });
        self.tracker.set_state(MachineState::Paused, now_ms);
        Ok(())
    }

    fn resume(&mut self, now_ms: u64) -> Result<(), D::Error> {
        let Some(record) = self.paused.take() else {
            self.tracker.set_state(MachineState::Idle, now_ms);
            return Ok(());
        };
        self.motion.resume(&record.motion)?;
        self.tracker.set_state(record.previous, now_ms);
        Ok(())
    }

    fn fault(&mut self, fault: MotionFault) {
        log::error!("motion fault: {}", fault);
        if let Some(pin) = self.config.outputs.alarm_pin {
            if self.outputs.write(pin, true).is_err() {
                log::warn!("failed to assert alarm output {}", pin);
            }
        }
        self.alarm_active = true;
        self.broadcast(Response::Fault(fault));
    }

    fn clear_alarm(&mut self) {
        if !self.alarm_active {
            return;
        }
        self.alarm_active = false;
        if let Some(pin) = self.config.outputs.alarm_pin {
            if self.outputs.write(pin, false).is_err() {
                log::warn!("failed to clear alarm output {}", pin);
            }
        }
    }

    /// Move to the reserved `Error` state, stopping both axes.
    ///
    /// Nothing inside the core calls this; it is the hook for integrators
    /// wiring up hardware fault detection. Only a restart leaves `Error`.
    pub fn enter_error(&mut self, now_ms: u64) -> Result<(), D::Error> {
        log::error!("entering error state");
        self.paused = None;
        self.tracker.set_state(MachineState::Error, now_ms);
        self.motion.stop_all()
    }

    // ------------------------------------------------------------------------
    // Safety cadence
    // ------------------------------------------------------------------------

    /// Debounce one set of raw input levels and react to settled changes.
    pub fn sample_safety(&mut self, levels: &InputLevels, now_ms: u64) -> Result<(), D::Error> {
        let actions = self.safety.sample(levels, now_ms);
        for action in actions {
            self.apply_safety(action, now_ms)?;
        }
        Ok(())
    }

    /// Read `sampler` and run [`sample_safety`](Self::sample_safety).
    pub fn poll_inputs<I: InputSampler>(&mut self, sampler: &mut I, now_ms: u64) -> Result<(), D::Error> {
        let levels = sampler.read_levels();
        self.sample_safety(&levels, now_ms)
    }

    /// Execute one safety action immediately.
    pub fn apply_safety(&mut self, action: SafetyAction, now_ms: u64) -> Result<(), D::Error> {
        match action {
            SafetyAction::EmergencyStop => self.emergency_stop(now_ms),
            SafetyAction::ReleaseEmergencyStop => self.release_emergency_stop(now_ms),
            SafetyAction::Limit(limit) => self.limit_hit(limit, now_ms),
            SafetyAction::HomeSwitch => self.home_switch(now_ms),
            SafetyAction::HomeRequest => {
                if self.tracker.state() == MachineState::Idle {
                    self.start_homing(now_ms)
                } else {
                    log::debug!("home button ignored in {}", self.tracker.state().as_str());
                    Ok(())
                }
            }
            SafetyAction::Resume => {
                if self.tracker.state() == MachineState::Paused {
                    self.resume(now_ms)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn limit_hit(&mut self, limit: Limit, now_ms: u64) -> Result<(), D::Error> {
        let position = match limit {
            Limit::Min => self.config.endstops.min_position,
            Limit::Max => self
                .config
                .endstops
                .resolved_max_position(self.motion.max_travel()),
        };
        log::warn!("{:?} limit hit, linear axis set to {}", limit, position);
        self.motion.snap_linear_to(position)?;

        if self.tracker.state().is_homing() {
            self.motion.abort_homing();
            self.fault(MotionFault::LimitDuringHoming);
            self.tracker.set_state(MachineState::Idle, now_ms);
        }
        Ok(())
    }

    fn home_switch(&mut self, now_ms: u64) -> Result<(), D::Error> {
        if !self.tracker.state().is_homing() {
            return Ok(());
        }
        match self.motion.on_home_trigger(now_ms)? {
            HomeTrigger::Ignored => {}
            HomeTrigger::BackOffStarted => {
                self.tracker.set_state(MachineState::HomingFinal, now_ms);
            }
            HomeTrigger::Homed => {
                log::info!("homed");
                self.tracker.set_homed(true);
                self.clear_alarm();
                self.tracker.set_state(MachineState::Idle, now_ms);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current machine state.
    #[inline]
    pub fn state(&self) -> MachineState {
        self.tracker.state()
    }

    /// The state record.
    #[inline]
    pub fn tracker(&self) -> &MachineStateTracker {
        &self.tracker
    }

    /// The motion coordinator.
    #[inline]
    pub fn motion(&self) -> &MotionCoordinator<D> {
        &self.motion
    }

    /// The step driver.
    #[inline]
    pub fn driver(&self) -> &D {
        self.motion.driver()
    }

    /// Mutable access to the step driver.
    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        self.motion.driver_mut()
    }

    /// The relay outputs.
    #[inline]
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Commands waiting on `channel`.
    #[inline]
    pub fn queue(&self, channel: Channel) -> &CommandQueue<Q> {
        &self.channels[channel.index()].queue
    }

    /// Startup configuration.
    #[inline]
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Whether a motion fault is currently signalled.
    #[inline]
    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    /// Snapshot for displays and logs.
    pub fn status(&self) -> MachineStatus {
        MachineStatus {
            state: self.tracker.state(),
            coordinate_system: self.tracker.coordinate_system(),
            is_homed: self.tracker.is_homed(),
            linear: self.motion.position(Axis::Linear),
            rotary: self.motion.position(Axis::Rotary),
            linear_speed: self.motion.speed(Axis::Linear),
            rotary_speed: self.motion.speed(Axis::Rotary),
            usb_queued: self.queue(Channel::Usb).len(),
            display_queued: self.queue(Channel::Display).len(),
            alarm: self.alarm_active,
        }
    }
}
