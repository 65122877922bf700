//! Host-side services around the controller core.
//!
//! - `shared` (`std`): [`SharedMachine`], one controller behind a mutex with a
//!   common time base.
//! - `runner` (`desktop` feature): tokio tasks for the safety and command
//!   cadences plus a channel-backed serial port.
//!
//! ```ignore
//! let shared = Arc::new(SharedMachine::new(controller));
//! tokio::spawn(run_safety(Arc::clone(&shared), inputs, config, shutdown.clone()));
//! tokio::spawn(run_commands(shared, usb, None, config, shutdown));
//! ```

pub mod shared;

#[cfg(feature = "desktop")]
pub mod runner;

pub use shared::*;

#[cfg(feature = "desktop")]
pub use runner::*;
