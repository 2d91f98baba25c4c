use crate::{Address, BlockHash, BlockNumber, Transaction, U256};
use serde::{Deserialize, Serialize};

/// Block header.
///
/// Only the fields the trace module consumes are carried; the full header
/// lives upstream with the historical state reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Block number.
    pub number: BlockNumber,
    /// The address that receives the block reward.
    pub beneficiary: Address,
    /// Block difficulty, zero post-merge.
    pub difficulty: U256,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Timestamp of the block.
    pub timestamp: u64,
    /// Base fee per gas, added in the London upgrade.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
}

/// An Ethereum block with the transactions to be re-executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block header.
    pub header: Header,
    /// Transactions in this block, with senders recovered.
    pub transactions: Vec<Transaction>,
    /// Ommer headers, needed for uncle reward traces.
    pub ommers: Vec<Header>,
}

/// A [Block] together with its hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockWithHash {
    /// The block.
    pub block: Block,
    /// Hash of the block.
    pub hash: BlockHash,
}
