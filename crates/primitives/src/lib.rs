//! Commonly used types in tracevm.
//!
//! This crate re-exports the Ethereum base types the rest of the workspace is
//! built on and adds the small carrier types the trace orchestrator consumes.
//! Transaction decoding, sender recovery and hashing happen upstream: a
//! [`Transaction`] enters this workspace with its `hash` and `from` already
//! resolved.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(no_crate_inject, attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))))]

mod block;
mod hex_bytes;
mod transaction;

pub use block::{Block, BlockWithHash, Header};
pub use hex_bytes::{Bytes, ParseBytesError};
pub use transaction::Transaction;

/// A block hash.
pub type BlockHash = H256;
/// A block number.
pub type BlockNumber = u64;
/// An Ethereum address.
pub type Address = H160;
/// A transaction hash is a keccak hash of an RLP encoded signed transaction.
pub type TxHash = H256;
/// Chain identifier type (introduced in EIP-155).
pub type ChainId = u64;
/// An account storage key.
pub type StorageKey = H256;
/// An account storage value.
pub type StorageValue = U256;

pub use ethers_core::types::{BigEndianHash, H160, H256, H512, H64, U128, U256, U64};

#[doc(hidden)]
mod __reexport {
    pub use hex;
}

// Useful reexports
pub use __reexport::*;
