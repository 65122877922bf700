//! Trait definitions for hardware abstraction.
//!
//! This module defines the collaborator boundary of the motion core. The core
//! never touches pins, buses or step timing directly; it talks to:
//!
//! - [`StepDriver`]: step-pulse engine for both axes
//! - [`SerialPort`]: byte transport for the USB and display channels
//! - [`DigitalOutputs`]: relay banks driven by `M42`
//! - [`InputSampler`]: raw levels of endstops, e-stop and panel buttons
//! - [`Clock`]: monotonic millisecond time source

pub mod hardware;

pub use hardware::*;
