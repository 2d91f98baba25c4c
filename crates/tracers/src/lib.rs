//! Callback-driven EVM tracers.
//!
//! The tracers in this crate do not execute bytecode. They are driven by an
//! external EVM interpreter through the [EvmTracer] callback contract and
//! accumulate three kinds of structured observations:
//!
//! - [VmTraceTracer]: a per-opcode trace with retroactive gas attribution and
//!   nested sub-traces for inner calls,
//! - [TraceTracer]: a flat, ordered list of call/create frames related through
//!   trace-address paths,
//! - [StateDiffTracer]: a minimal per-address diff of balance, nonce, code and
//!   storage against a pre-execution baseline.
//!
//! The baseline itself is maintained by [IntraBlockStateTracer], which after
//! every transaction folds the touched addresses back into the shared
//! [StateAddresses] shadow state, so that the next transaction of the block
//! diffs against the correct pre-image.
//!
//! All tracers assume the single-threaded cooperative execution model: one
//! callback fires at a time, in strict program order.

#![warn(missing_debug_implementations, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

mod call;
pub mod opcode;
mod state;
mod state_diff;
mod tracer;
mod types;
mod vm;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use call::TraceTracer;
pub use state::{IntraBlockState, IntraBlockStateTracer, StateAddresses};
pub use state_diff::StateDiffTracer;
pub use tracer::{EvmTracer, Tracers};
pub use types::{CallKind, CallResult, EvmStack, ExecutionState, Message, Revision, StatusCode};
pub use vm::VmTraceTracer;
