use crate::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

/// A transaction ready for re-execution.
///
/// Decoding and signature recovery happen upstream, so `hash` and `from` are
/// always populated by the time a transaction reaches the tracers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Hash of the signed transaction.
    pub hash: TxHash,
    /// Recovered sender.
    pub from: Address,
    /// Recipient, `None` for contract creation transactions.
    pub to: Option<Address>,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Effective gas price, `None` for simulated calls without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    /// Transferred value.
    pub value: U256,
    /// Call data / init code.
    pub input: Bytes,
    /// Index of this transaction within its block, 0 for simulated calls.
    pub transaction_index: u64,
}
