#![no_std]

//! picolink - Self-describing telemetry link server for embedded targets
//!
//! This library implements the device side of a lightweight telemetry
//! protocol over a single byte stream (typically a UART). The device
//! registers named, typed variables; picolink publishes a schema packet
//! describing them, streams value updates as they change, applies value
//! writes received from the host, and passes non-telemetry bytes through
//! to the application untouched.
//!
//! Everything is statically allocated: no heap, no threads, no blocking
//! beyond what the HAL's transmit path imposes.
//!
//! # Modules
//!
//! - [`platform`]: Hardware abstraction ([`TelemetryHal`]) and the mock
//!   HAL used by host tests
//! - [`core`]: Lock-free SPSC byte queue and the logging facade
//! - [`protocol`]: Wire constants, packet codec, and framing decoder
//! - [`telemetry`]: Variable types, the registry, and the [`Telemetry`]
//!   coordinator

#[cfg(any(test, feature = "mock"))]
extern crate std;

pub mod core;
pub mod platform;
pub mod protocol;
pub mod telemetry;

pub use platform::TelemetryHal;
pub use telemetry::{Numeric, NumericArray, Telemetry, TelemetryData};
