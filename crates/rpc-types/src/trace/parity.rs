#![allow(missing_docs)]
//! Output types of the trace module.
//!
//! See <https://openethereum.github.io/JSONRPC-trace-module>

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
};
use tracevm_primitives::{Address, BlockHash, Bytes, TxHash, H256, U256, U64};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChangedType<T> {
    pub from: T,
    pub to: T,
}

/// How a value changed relative to the pre-execution state.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Delta<T> {
    #[default]
    #[serde(rename = "=")]
    Unchanged,
    #[serde(rename = "+")]
    Added(T),
    #[serde(rename = "-")]
    Removed(T),
    #[serde(rename = "*")]
    Changed(ChangedType<T>),
}

impl<T> Delta<T> {
    /// Returns true if the value is [Delta::Unchanged].
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Delta::Unchanged)
    }
}

/// Net changes of one account over a transaction.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDiff {
    pub balance: Delta<U256>,
    pub code: Delta<Bytes>,
    pub nonce: Delta<U64>,
    pub storage: BTreeMap<H256, Delta<H256>>,
}

/// New-type for list of account diffs
#[derive(Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDiff(pub BTreeMap<Address, AccountDiff>);

impl Deref for StateDiff {
    type Target = BTreeMap<Address, AccountDiff>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for StateDiff {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "action")]
pub enum Action {
    Call(CallAction),
    Create(CreateAction),
    Reward(RewardAction),
}

impl Action {
    /// Returns true if this is a call action
    pub fn is_call(&self) -> bool {
        matches!(self, Action::Call(_))
    }

    /// Returns true if this is a create action
    pub fn is_create(&self) -> bool {
        matches!(self, Action::Create(_))
    }

    /// Returns true if this is a reward action
    pub fn is_reward(&self) -> bool {
        matches!(self, Action::Reward(_))
    }
}

/// Call type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Call
    Call,
    /// Call code
    CallCode,
    /// Delegate call
    DelegateCall,
    /// Static call
    StaticCall,
}

/// Represents a certain [CallType] of a _call_ or message transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAction {
    /// Address of the sending account.
    pub from: Address,
    /// The type of the call, absent when the frame was entered via `CREATE`
    /// on an already existing account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_type: Option<CallType>,
    /// The gas available for executing the call.
    pub gas: U64,
    /// The input data provided to the call.
    pub input: Bytes,
    /// Address of the destination/target account.
    pub to: Address,
    /// Value transferred to the destination account.
    pub value: U256,
}

/// Represents a _create_ action, either a `CREATE` operation or a CREATE transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAction {
    /// The address of the creator.
    pub from: Address,
    /// The value with which the new account is endowed.
    pub value: U256,
    /// The gas available for the creation init code.
    pub gas: U64,
    /// The init code.
    pub init: Bytes,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RewardType {
    Block,
    Uncle,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardAction {
    /// Author's address.
    pub author: Address,
    /// Reward amount.
    pub value: U256,
    /// Reward type.
    pub reward_type: RewardType,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutput {
    pub gas_used: U64,
    pub output: Bytes,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutput {
    pub gas_used: U64,
    pub code: Bytes,
    pub address: Address,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceOutput {
    Call(CallOutput),
    Create(CreateOutput),
}

impl TraceOutput {
    /// Gas consumed by this frame.
    pub fn gas_used(&self) -> U64 {
        match self {
            TraceOutput::Call(output) => output.gas_used,
            TraceOutput::Create(output) => output.gas_used,
        }
    }

    /// Sets the gas consumed by this frame.
    pub fn set_gas_used(&mut self, gas_used: u64) {
        match self {
            TraceOutput::Call(output) => output.gas_used = U64::from(gas_used),
            TraceOutput::Create(output) => output.gas_used = U64::from(gas_used),
        }
    }

    /// Sets the returned bytes: deployed code for creates, return data for
    /// calls.
    pub fn set_data(&mut self, data: Bytes) {
        match self {
            TraceOutput::Call(output) => output.output = data,
            TraceOutput::Create(output) => output.code = data,
        }
    }
}

/// One frame of the flat call trace of a transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTrace {
    #[serde(flatten)]
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub result: Option<TraceOutput>,
    pub subtraces: usize,
    pub trace_address: Vec<usize>,
}

/// A [TransactionTrace] decorated with its position within the chain.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedTransactionTrace {
    #[serde(flatten)]
    pub trace: TransactionTrace,
    /// Hash of the block, if not pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<BlockHash>,
    /// Block number the transaction is included in, None if pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Hash of the transaction, absent for reward pseudo-traces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
    /// Transaction index within the block, None if pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_position: Option<u64>,
}

/// A record of a full VM trace for a CALL/CREATE.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmTrace {
    /// The code to be executed.
    pub code: Bytes,
    /// All executed instructions.
    pub ops: Vec<VmInstruction>,
}

/// One executed instruction within a [VmTrace].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmInstruction {
    /// The gas cost for this instruction.
    pub cost: i64,
    /// Information concerning the execution of the operation.
    pub ex: VmExecutedOperation,
    /// Dash-joined path of op positions from the root trace to this op.
    pub idx: String,
    /// Name of the operation.
    pub op: String,
    /// The program counter.
    pub pc: usize,
    /// Subordinate trace of the CALL/CREATE if applicable.
    pub sub: Option<VmTrace>,
}

/// A record of an executed VM operation.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmExecutedOperation {
    /// If altered, the memory delta.
    pub mem: Option<MemoryDelta>,
    /// The stack items placed, if any.
    pub push: Vec<U256>,
    /// The altered storage value, if any.
    pub store: Option<StorageDelta>,
    /// The remaining gas after the operation.
    pub used: i64,
}

/// A diff of some chunk of memory.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDelta {
    /// The changed data.
    pub data: Bytes,
    /// Offset into memory the change begins.
    pub off: u64,
}

/// A diff of some storage value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDelta {
    pub key: U256,
    pub val: U256,
}

/// The outcome of a traced transaction or simulated call.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResults {
    /// Output of the execution.
    pub output: Bytes,
    /// Enabled if [TraceType::StateDiff](super::TraceType::StateDiff) is provided.
    pub state_diff: Option<StateDiff>,
    /// Enabled if [TraceType::Trace](super::TraceType::Trace) is provided, empty otherwise.
    pub trace: Vec<TransactionTrace>,
    /// Enabled if [TraceType::VmTrace](super::TraceType::VmTrace) is provided.
    pub vm_trace: Option<VmTrace>,
    /// Hash of the traced transaction, set by block-level operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TxHash>,
}

/// Result of tracing a single transaction or call.
///
/// A pre-check failure (e.g. insufficient funds under non-bailout mode) is
/// surfaced verbatim and the traces stay empty; it is not part of the JSON
/// output.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceCallResult {
    /// The harvested traces.
    pub traces: TraceResults,
    /// Error reported by the executor before the EVM ran.
    #[serde(skip)]
    pub pre_check_error: Option<String>,
}

/// Result of tracing many calls against the same pre-state, serialized as a
/// JSON array with one element per call.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceManyCallResult {
    /// One entry per traced call.
    pub traces: Vec<TraceResults>,
    /// Error that aborted the batch, if any.
    #[serde(skip)]
    pub pre_check_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_transaction_trace() {
        let s = r#"{
            "action": {
                "from": "0x66e29f0b6b1b07071f2fde4345d512386cb66f5f",
                "callType": "call",
                "gas": "0x10bfc",
                "input": "0xf6cd1e8d",
                "to": "0x160f5f00288e9e1cc8655b327e081566e580a71d",
                "value": "0x244b"
            },
            "error": "Reverted",
            "result": {
                "gasUsed": "0x9daf",
                "output": "0x01"
            },
            "subtraces": 3,
            "traceAddress": [],
            "type": "call"
        }"#;
        let val = serde_json::from_str::<TransactionTrace>(s).unwrap();
        assert!(val.action.is_call());
        let json = serde_json::to_value(val).unwrap();
        let expect = serde_json::from_str::<serde_json::Value>(s).unwrap();
        similar_asserts::assert_eq!(json, expect);
    }

    #[test]
    fn test_create_trace() {
        let s = r#"{
            "action": {
                "from": "0x66e29f0b6b1b07071f2fde4345d512386cb66f5f",
                "value": "0x0",
                "gas": "0x4f588",
                "init": "0x6080604052"
            },
            "result": {
                "gasUsed": "0x3a46",
                "code": "0x60806040",
                "address": "0x8b3cf6c724e70b9b78ec22b10a98ef6a99c32069"
            },
            "subtraces": 0,
            "traceAddress": [0, 1],
            "type": "create"
        }"#;
        let val = serde_json::from_str::<TransactionTrace>(s).unwrap();
        assert!(val.action.is_create());
        match &val.result {
            Some(TraceOutput::Create(out)) => {
                assert_eq!(out.address, Address::from_str("0x8b3cf6c724e70b9b78ec22b10a98ef6a99c32069").unwrap())
            }
            other => panic!("expected create output, got {other:?}"),
        }
        let json = serde_json::to_value(val).unwrap();
        let expect = serde_json::from_str::<serde_json::Value>(s).unwrap();
        similar_asserts::assert_eq!(json, expect);
    }

    #[test]
    fn test_reward_trace_null_result() {
        let trace = LocalizedTransactionTrace {
            trace: TransactionTrace {
                action: Action::Reward(RewardAction {
                    author: Address::from_low_u64_be(1),
                    value: U256::from(5),
                    reward_type: RewardType::Block,
                }),
                error: None,
                result: None,
                subtraces: 0,
                trace_address: vec![],
            },
            block_hash: Some(H256::from_low_u64_be(7)),
            block_number: Some(7),
            transaction_hash: None,
            transaction_position: None,
        };
        let json = serde_json::to_value(trace).unwrap();
        assert_eq!(json["type"], "reward");
        assert_eq!(json["action"]["rewardType"], "block");
        assert!(json["result"].is_null());
        assert!(json.get("transactionHash").is_none());
    }

    #[test]
    fn test_delta_serde() {
        let unchanged: Delta<U256> = serde_json::from_str(r#""=""#).unwrap();
        assert_eq!(unchanged, Delta::Unchanged);

        let added: Delta<U256> = serde_json::from_str(r#"{"+": "0x2a"}"#).unwrap();
        assert_eq!(added, Delta::Added(U256::from(42)));

        let removed: Delta<U256> = serde_json::from_str(r#"{"-": "0x2a"}"#).unwrap();
        assert_eq!(removed, Delta::Removed(U256::from(42)));

        let changed: Delta<U256> =
            serde_json::from_str(r#"{"*": {"from": "0x0", "to": "0x2a"}}"#).unwrap();
        assert_eq!(changed, Delta::Changed(ChangedType { from: U256::zero(), to: U256::from(42) }));

        for raw in [r#""=""#, r#"{"+":"0x2a"}"#, r#"{"-":"0x2a"}"#, r#"{"*":{"from":"0x0","to":"0x2a"}}"#] {
            let delta: Delta<U256> = serde_json::from_str(raw).unwrap();
            let emitted = serde_json::to_string(&delta).unwrap();
            let reparsed: Delta<U256> = serde_json::from_str(&emitted).unwrap();
            assert_eq!(delta, reparsed);
        }
    }

    #[test]
    fn test_account_diff_formatting() {
        let mut storage = BTreeMap::new();
        storage.insert(
            H256::from_low_u64_be(1),
            Delta::Changed(ChangedType { from: H256::zero(), to: H256::from_low_u64_be(0x42) }),
        );
        let diff = AccountDiff {
            balance: Delta::Changed(ChangedType { from: U256::from(0x1000), to: U256::from(0xfff) }),
            code: Delta::Unchanged,
            nonce: Delta::Changed(ChangedType { from: U64::zero(), to: U64::one() }),
            storage,
        };
        let json = serde_json::to_value(diff).unwrap();
        assert_eq!(json["balance"]["*"]["from"], "0x1000");
        assert_eq!(json["code"], "=");
        assert_eq!(json["nonce"]["*"]["to"], "0x1");
        // storage keys and values are zero-padded 32 byte words
        let key = "0x0000000000000000000000000000000000000000000000000000000000000001";
        let to = "0x0000000000000000000000000000000000000000000000000000000000000042";
        assert_eq!(json["storage"][key]["*"]["to"], to);
    }

    #[test]
    fn test_vm_trace_serde() {
        let trace = VmTrace {
            code: Bytes::from(vec![0x60, 0x01, 0x00]),
            ops: vec![VmInstruction {
                cost: 3,
                ex: VmExecutedOperation {
                    mem: None,
                    push: vec![U256::one()],
                    store: None,
                    used: 96,
                },
                idx: "0".to_string(),
                op: "PUSH1".to_string(),
                pc: 0,
                sub: None,
            }],
        };
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["code"], "0x600100");
        let op = &json["ops"][0];
        assert_eq!(op["cost"], 3);
        assert_eq!(op["ex"]["push"][0], "0x1");
        assert!(op["ex"]["mem"].is_null());
        assert!(op["ex"]["store"].is_null());
        assert_eq!(op["ex"]["used"], 96);
        assert!(op["sub"].is_null());

        let round: VmTrace = serde_json::from_value(json).unwrap();
        assert_eq!(round, trace);
    }

    #[test]
    fn test_trace_results_serde() {
        let results = TraceResults {
            output: Bytes::from(vec![0xab]),
            state_diff: Some(StateDiff::default()),
            trace: vec![],
            vm_trace: None,
            transaction_hash: None,
        };
        let json = serde_json::to_value(results).unwrap();
        assert_eq!(json["output"], "0xab");
        assert!(json["vmTrace"].is_null());
        assert_eq!(json["stateDiff"], serde_json::json!({}));
        assert!(json.get("transactionHash").is_none());
    }

    #[test]
    fn test_many_call_result_serializes_as_array() {
        let result = TraceManyCallResult {
            traces: vec![TraceResults::default()],
            pre_check_error: Some("first run for txIndex 1 error: nonce too low".to_string()),
        };
        let json = serde_json::to_value(result).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 1);
    }
}
