//! Orchestration of the `trace` module.
//!
//! [TraceCallExecutor] composes the tracers of [tracevm_tracers] around an
//! external EVM executor: it installs the tracer set a request asks for,
//! drives the executor once per transaction (or simulated call), and harvests
//! the buffered observations into the [tracevm_rpc_types] output model.
//!
//! Everything that touches the chain is behind the [TraceProvider] and
//! [TransactionExecutor] interfaces: the EVM itself, the historical state
//! reader, chain configuration and block-reward computation all live
//! upstream.
//!
//! The model is single-threaded cooperative: transactions of a block are
//! processed strictly in order, and tracer callbacks never suspend. Dropping
//! an in-flight future cancels the block-level operation; per-transaction
//! results already harvested stay individually consistent.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

mod error;
mod executor;
mod provider;

pub use error::{ExecutorError, ProviderError, TraceError};
pub use executor::TraceCallExecutor;
pub use provider::{
    BlockReward, ChainConfig, ExecutionResult, TraceProvider, TransactionExecutor,
};
