//! Types for the `trace` module output.

pub mod config;
pub mod parity;

pub use config::{TraceCall, TraceConfig, TraceType};
pub use parity::*;
