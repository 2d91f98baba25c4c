//! Types of the `trace` RPC namespace.
//!
//! See <https://openethereum.github.io/JSONRPC-trace-module>

#![warn(missing_debug_implementations, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

mod call;
pub mod trace;

pub use call::{CallInput, CallInputError, CallRequest, DEFAULT_CALL_GAS_LIMIT};

use serde::{Deserialize, Serialize};
use tracevm_primitives::{BlockHash, TxHash};

/// Additional fields in the context of a block that contains this transaction.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    /// Hash of the transaction.
    pub hash: Option<TxHash>,
    /// Index of the transaction in the block.
    pub index: Option<u64>,
    /// Hash of the block.
    pub block_hash: Option<BlockHash>,
    /// Number of the block.
    pub block_number: Option<u64>,
}
