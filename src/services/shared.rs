//! Shared machine state for the concurrent runners.
//!
//! `SharedMachine` wraps the single [`MachineController`] so the safety
//! cadence, the command cadence and any simulation task can all reach it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_axisctl::controller::MachineController;
//! use rs_axisctl::config::MachineConfig;
//! use rs_axisctl::hal::{MockOutputs, MockStepDriver};
//! use rs_axisctl::services::SharedMachine;
//!
//! let controller: MachineController<_, _> =
//!     MachineController::new(MockStepDriver::new(), MockOutputs::new(), MachineConfig::default());
//! let shared = Arc::new(SharedMachine::new(controller));
//!
//! let now_ms = shared.now_ms();
//! shared.with_machine(|m| m.feed_usb(b"!G91;", now_ms)).unwrap();
//! assert_eq!(shared.status().usb_queued, 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::controller::{MachineController, MachineStatus};
use crate::parsing::DEFAULT_LINE_CAPACITY;
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use crate::state::MachineState;
use crate::traits::{Clock, DigitalOutputs, StepDriver};

/// One controller shared between tasks.
///
/// # Thread Safety
///
/// - A plain `Mutex` guards the controller; both cadences write on every tick.
/// - A poisoned lock is recovered, not propagated.
/// - Every task takes its timestamps from the same `start_time`.
pub struct SharedMachine<
    D: StepDriver,
    O: DigitalOutputs,
    const Q: usize = DEFAULT_QUEUE_CAPACITY,
    const L: usize = DEFAULT_LINE_CAPACITY,
> {
    machine: Mutex<MachineController<D, O, Q, L>>,
    start_time: Instant,
    last_reported: Mutex<Option<MachineState>>,
}

impl<D, O, const Q: usize, const L: usize> SharedMachine<D, O, Q, L>
where
    D: StepDriver,
    O: DigitalOutputs,
{
    /// Wrap `machine`; `now_ms` counts from this call.
    pub fn new(machine: MachineController<D, O, Q, L>) -> Self {
        Self {
            machine: Mutex::new(machine),
            start_time: Instant::now(),
            last_reported: Mutex::new(None),
        }
    }

    /// Milliseconds since creation. The time base of every cadence.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Creation instant.
    #[inline]
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    fn lock(&self) -> MutexGuard<'_, MachineController<D, O, Q, L>> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the controller.
    ///
    /// The closure form keeps the lock from being held across await points.
    pub fn with_machine<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut MachineController<D, O, Q, L>) -> R,
    {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Status snapshot.
    pub fn status(&self) -> MachineStatus {
        self.lock().status()
    }

    /// Returns the status if the machine state changed since the last call.
    ///
    /// The first call always reports.
    pub fn check_changes(&self) -> Option<MachineStatus> {
        let status = self.status();
        let mut last = self
            .last_reported
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last == Some(status.state) {
            None
        } else {
            *last = Some(status.state);
            Some(status)
        }
    }
}

impl<D, O, const Q: usize, const L: usize> Clock for SharedMachine<D, O, Q, L>
where
    D: StepDriver,
    O: DigitalOutputs,
{
    fn now_ms(&self) -> u64 {
        SharedMachine::now_ms(self)
    }
}
