//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `stepper`: Software stepper axis model (unit/step and feed/period math)
//! - `pins`: `embedded-hal` 1.0 pin adapters (requires `embedded-hal` feature)

pub mod mock;
pub mod stepper;

#[cfg(feature = "embedded-hal")]
pub mod pins;

pub use mock::*;
pub use stepper::StepperAxis;

#[cfg(feature = "embedded-hal")]
pub use pins::{PinError, PinInputs, PinOutputs};
