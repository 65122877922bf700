//! Debounced digital inputs.
//!
//! A [`DebouncedInput`] turns a stream of raw pin samples into at most one
//! [`InputEvent`] per settled state change. An event is emitted only after
//! the logical level has been stable for the debounce window and the minimum
//! interval since the previous event has passed.
//!
//! # Example
//!
//! ```rust
//! use rs_axisctl::debounce::{DebouncedInput, DebounceTiming, InputEvent, Polarity};
//!
//! let mut input = DebouncedInput::new(Polarity::ActiveLow, DebounceTiming::default());
//!
//! // Pin pulled low at t=0 (active for an NPN switch).
//! assert_eq!(input.sample(false, 0), None);
//! assert_eq!(input.sample(false, 50), None);
//! assert_eq!(input.sample(false, 100), Some(InputEvent::Triggered));
//! assert_eq!(input.sample(false, 200), None);
//! ```

/// Electrical polarity of an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Polarity {
    /// Triggered when the pin reads low (NPN sensors, switches to ground).
    #[default]
    ActiveLow,
    /// Triggered when the pin reads high (PNP sensors).
    ActiveHigh,
}

impl Polarity {
    /// Map a raw pin level to the logical "triggered" state.
    #[inline]
    pub const fn normalize(self, raw: bool) -> bool {
        match self {
            Polarity::ActiveLow => !raw,
            Polarity::ActiveHigh => raw,
        }
    }

    /// Raw pin level of an input that is not triggered.
    #[inline]
    pub const fn resting_level(self) -> bool {
        matches!(self, Polarity::ActiveLow)
    }
}

/// Timing of one debounced input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebounceTiming {
    /// The logical level must be stable this long before an event fires.
    pub window_ms: u64,
    /// Minimum spacing between two events.
    pub min_interval_ms: u64,
}

/// Default settle window for safety inputs.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 100;

/// Default minimum spacing between events.
pub const DEFAULT_MIN_FIRE_INTERVAL_MS: u64 = 100;

impl Default for DebounceTiming {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            min_interval_ms: DEFAULT_MIN_FIRE_INTERVAL_MS,
        }
    }
}

impl DebounceTiming {
    /// Set the settle window.
    pub fn with_window_ms(mut self, ms: u64) -> Self {
        self.window_ms = ms;
        self
    }

    /// Set the minimum interval between events.
    pub fn with_min_interval_ms(mut self, ms: u64) -> Self {
        self.min_interval_ms = ms;
        self
    }
}

/// A settled state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputEvent {
    /// The input became active.
    Triggered,
    /// The input became inactive.
    Untriggered,
}

/// One debounced input.
#[derive(Clone, Debug)]
pub struct DebouncedInput {
    polarity: Polarity,
    timing: DebounceTiming,
    report_release: bool,
    raw: bool,
    logical: bool,
    reported: bool,
    last_change_ms: u64,
    last_fire_ms: Option<u64>,
    can_fire: bool,
}

impl DebouncedInput {
    /// Create an input that reports only [`InputEvent::Triggered`].
    ///
    /// The input starts logically inactive; no event is synthesized from the
    /// power-on default.
    pub const fn new(polarity: Polarity, timing: DebounceTiming) -> Self {
        Self {
            polarity,
            timing,
            report_release: false,
            raw: false,
            logical: false,
            reported: false,
            last_change_ms: 0,
            last_fire_ms: None,
            can_fire: false,
        }
    }

    /// Also report [`InputEvent::Untriggered`] when the input settles inactive.
    pub const fn with_release(mut self) -> Self {
        self.report_release = true;
        self
    }

    /// Feed one raw sample taken at `now_ms`.
    pub fn sample(&mut self, raw: bool, now_ms: u64) -> Option<InputEvent> {
        self.raw = raw;
        let logical = self.polarity.normalize(raw);

        if logical != self.logical {
            self.logical = logical;
            self.last_change_ms = now_ms;
            self.can_fire = true;
        }

        if !self.can_fire || self.logical == self.reported {
            return None;
        }
        if now_ms.saturating_sub(self.last_change_ms) < self.timing.window_ms {
            return None;
        }
        if let Some(last) = self.last_fire_ms {
            if now_ms.saturating_sub(last) < self.timing.min_interval_ms {
                return None;
            }
        }

        self.can_fire = false;
        self.last_fire_ms = Some(now_ms);
        self.reported = self.logical;

        if self.logical {
            Some(InputEvent::Triggered)
        } else if self.report_release {
            Some(InputEvent::Untriggered)
        } else {
            None
        }
    }

    /// Last raw pin level seen.
    #[inline]
    pub fn raw(&self) -> bool {
        self.raw
    }

    /// Logical level after polarity normalization, before debouncing.
    #[inline]
    pub fn logical(&self) -> bool {
        self.logical
    }

    /// Last settled level.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.reported
    }

    /// Configured polarity.
    #[inline]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Configured timing.
    #[inline]
    pub fn timing(&self) -> DebounceTiming {
        self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high_input() -> DebouncedInput {
        DebouncedInput::new(Polarity::ActiveHigh, DebounceTiming::default())
    }

    /// Feed a constant level every millisecond over `from..=to` and collect events.
    fn run(input: &mut DebouncedInput, raw: bool, from: u64, to: u64) -> Vec<InputEvent> {
        (from..=to).filter_map(|t| input.sample(raw, t)).collect()
    }

    // =========================================================================
    // Polarity Tests
    // =========================================================================

    #[test]
    fn polarity_normalization() {
        assert!(Polarity::ActiveLow.normalize(false));
        assert!(!Polarity::ActiveLow.normalize(true));
        assert!(Polarity::ActiveHigh.normalize(true));
        assert!(!Polarity::ActiveHigh.normalize(false));
    }

    // =========================================================================
    // Settling Tests
    // =========================================================================

    #[test]
    fn no_event_at_power_on() {
        let mut input = high_input();
        assert!(run(&mut input, false, 0, 1000).is_empty());

        // Active-low input idles high: also no event.
        let mut npn = DebouncedInput::new(Polarity::ActiveLow, DebounceTiming::default());
        assert!(run(&mut npn, true, 0, 1000).is_empty());
    }

    #[test]
    fn stable_change_fires_exactly_once() {
        let mut input = high_input();
        let events = run(&mut input, true, 10, 1000);
        assert_eq!(events, vec![InputEvent::Triggered]);
        assert!(input.is_triggered());
    }

    #[test]
    fn event_waits_for_full_window() {
        let mut input = high_input();
        assert_eq!(input.sample(true, 10), None);
        assert_eq!(input.sample(true, 109), None);
        assert_eq!(input.sample(true, 110), Some(InputEvent::Triggered));
    }

    #[test]
    fn bounce_back_within_window_is_silent() {
        let mut input = high_input();
        let mut events = run(&mut input, true, 0, 40);
        events.extend(run(&mut input, false, 41, 60));
        events.extend(run(&mut input, true, 61, 70));
        events.extend(run(&mut input, false, 71, 1000));
        assert!(events.is_empty());
        assert!(!input.is_triggered());
    }

    #[test]
    fn bounce_restarts_window() {
        let mut input = high_input();
        input.sample(true, 0);
        input.sample(false, 50);
        input.sample(true, 80);
        assert_eq!(input.sample(true, 150), None);
        assert_eq!(input.sample(true, 180), Some(InputEvent::Triggered));
    }

    // =========================================================================
    // Release Reporting Tests
    // =========================================================================

    #[test]
    fn release_not_reported_by_default() {
        let mut input = high_input();
        run(&mut input, true, 0, 200);
        let events = run(&mut input, false, 201, 600);
        assert!(events.is_empty());
        assert!(!input.is_triggered());

        // The next activation is still reported.
        assert_eq!(run(&mut input, true, 601, 900), vec![InputEvent::Triggered]);
    }

    #[test]
    fn release_reported_when_enabled() {
        let mut input = high_input().with_release();
        let mut events = run(&mut input, true, 0, 200);
        events.extend(run(&mut input, false, 201, 600));
        assert_eq!(events, vec![InputEvent::Triggered, InputEvent::Untriggered]);
    }

    // =========================================================================
    // Minimum Interval Tests
    // =========================================================================

    #[test]
    fn min_interval_delays_second_event() {
        let timing = DebounceTiming::default()
            .with_window_ms(10)
            .with_min_interval_ms(500);
        let mut input = DebouncedInput::new(Polarity::ActiveHigh, timing).with_release();

        assert_eq!(input.sample(true, 0), None);
        assert_eq!(input.sample(true, 10), Some(InputEvent::Triggered));

        // Settled inactive well before the interval is over.
        input.sample(false, 20);
        assert_eq!(input.sample(false, 100), None);
        assert_eq!(input.sample(false, 509), None);
        assert_eq!(input.sample(false, 510), Some(InputEvent::Untriggered));
    }

    #[test]
    fn raw_and_logical_tracking() {
        let mut input = DebouncedInput::new(Polarity::ActiveLow, DebounceTiming::default());
        input.sample(false, 0);
        assert!(!input.raw());
        assert!(input.logical());
        assert!(!input.is_triggered());
    }
}
