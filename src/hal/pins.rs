//! `embedded-hal` 1.0 adapters for real pins.
//!
//! [`PinInputs`] samples six input pins into [`InputLevels`] and
//! [`PinOutputs`] exposes two banks of eight output pins as
//! [`DigitalOutputs`]. Any HAL whose pins implement the `embedded-hal`
//! digital traits (including port-expander drivers) plugs in here.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::traits::{DigitalOutputs, InputLevels, InputSampler, OUTPUT_PIN_COUNT};

/// Pins per output bank.
pub const BANK_SIZE: u8 = 8;

/// Error from [`PinOutputs`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinError<E> {
    /// Pin index outside both banks.
    OutOfRange(u8),
    /// The underlying pin failed.
    Pin(E),
}

/// Safety and panel inputs backed by `embedded-hal` input pins.
///
/// A pin that fails to read keeps its previous level.
pub struct PinInputs<P> {
    /// Minimum travel limit.
    pub limit_min: P,
    /// Maximum travel limit.
    pub limit_max: P,
    /// Home switch.
    pub home: P,
    /// Emergency stop.
    pub estop: P,
    /// Panel home button.
    pub home_button: P,
    /// Panel resume button.
    pub resume_button: P,
    last: InputLevels,
}

impl<P: InputPin> PinInputs<P> {
    /// Wrap six input pins.
    pub fn new(limit_min: P, limit_max: P, home: P, estop: P, home_button: P, resume_button: P) -> Self {
        Self {
            limit_min,
            limit_max,
            home,
            estop,
            home_button,
            resume_button,
            last: InputLevels::default(),
        }
    }
}

fn read_or_keep<P: InputPin>(pin: &mut P, name: &str, previous: bool) -> bool {
    match pin.is_high() {
        Ok(level) => level,
        Err(_) => {
            log::warn!("failed to read {} input", name);
            previous
        }
    }
}

impl<P: InputPin> InputSampler for PinInputs<P> {
    fn read_levels(&mut self) -> InputLevels {
        let last = self.last;
        let levels = InputLevels {
            limit_min: read_or_keep(&mut self.limit_min, "limit_min", last.limit_min),
            limit_max: read_or_keep(&mut self.limit_max, "limit_max", last.limit_max),
            home: read_or_keep(&mut self.home, "home", last.home),
            estop: read_or_keep(&mut self.estop, "estop", last.estop),
            home_button: read_or_keep(&mut self.home_button, "home_button", last.home_button),
            resume_button: read_or_keep(&mut self.resume_button, "resume_button", last.resume_button),
        };
        self.last = levels;
        levels
    }
}

/// Two banks of relay outputs backed by `embedded-hal` output pins.
pub struct PinOutputs<P> {
    banks: [[P; BANK_SIZE as usize]; 2],
}

impl<P: OutputPin> PinOutputs<P> {
    /// Wrap two banks of eight pins. Pin `n` is `banks[n / 8][n % 8]`.
    pub fn new(banks: [[P; BANK_SIZE as usize]; 2]) -> Self {
        Self { banks }
    }
}

impl<P: OutputPin> DigitalOutputs for PinOutputs<P> {
    type Error = PinError<P::Error>;

    fn write(&mut self, pin: u8, high: bool) -> Result<(), Self::Error> {
        if pin >= OUTPUT_PIN_COUNT {
            return Err(PinError::OutOfRange(pin));
        }
        let out = &mut self.banks[(pin / BANK_SIZE) as usize][(pin % BANK_SIZE) as usize];
        let result = if high { out.set_high() } else { out.set_low() };
        result.map_err(PinError::Pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Debug, Default)]
    struct FakePin {
        high: bool,
        broken: bool,
    }

    #[derive(Debug)]
    struct Broken;

    impl embedded_hal::digital::Error for Broken {
        fn kind(&self) -> embedded_hal::digital::ErrorKind {
            embedded_hal::digital::ErrorKind::Other
        }
    }

    impl ErrorType for FakePin {
        type Error = Broken;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Broken> {
            if self.broken {
                Err(Broken)
            } else {
                Ok(self.high)
            }
        }

        fn is_low(&mut self) -> Result<bool, Broken> {
            self.is_high().map(|h| !h)
        }
    }

    struct OutPin(bool);

    impl ErrorType for OutPin {
        type Error = Infallible;
    }

    impl OutputPin for OutPin {
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0 = true;
            Ok(())
        }

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 = false;
            Ok(())
        }
    }

    fn pin(high: bool) -> FakePin {
        FakePin {
            high,
            broken: false,
        }
    }

    #[test]
    fn inputs_map_to_levels() {
        let mut inputs = PinInputs::new(pin(true), pin(false), pin(false), pin(true), pin(false), pin(true));
        let levels = inputs.read_levels();
        assert!(levels.limit_min);
        assert!(!levels.limit_max);
        assert!(levels.estop);
        assert!(levels.resume_button);
    }

    #[test]
    fn failed_read_keeps_previous_level() {
        let mut inputs = PinInputs::new(pin(false), pin(false), pin(false), pin(true), pin(false), pin(false));
        assert!(inputs.read_levels().estop);

        inputs.estop.broken = true;
        inputs.estop.high = false;
        assert!(inputs.read_levels().estop);
    }

    #[test]
    fn outputs_address_both_banks() {
        let banks = [
            core::array::from_fn(|_| OutPin(false)),
            core::array::from_fn(|_| OutPin(false)),
        ];
        let mut outputs = PinOutputs::new(banks);
        outputs.write(3, true).unwrap();
        outputs.write(12, true).unwrap();
        assert!(outputs.banks[0][3].0);
        assert!(outputs.banks[1][4].0);
        assert_eq!(outputs.write(16, true), Err(PinError::OutOfRange(16)));
    }
}
