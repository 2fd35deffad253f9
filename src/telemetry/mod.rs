//! Telemetry variables and the coordinating server
//!
//! Applications create [`Numeric`] / [`NumericArray`] variables,
//! register them with a [`Telemetry`] instance, transmit the schema
//! header once, then call [`Telemetry::do_io`] from a periodic task.

pub mod data;
pub mod server;

pub use data::{Descriptor, Element, Numeric, NumericArray, TelemetryData};
pub use server::{Telemetry, DATA_LIMIT, SERIAL_RX_BUFFER_SIZE};
