use crate::error::{ExecutorError, ProviderError};
use async_trait::async_trait;
use std::rc::Rc;
use tracevm_primitives::{Block, BlockNumber, Bytes, Transaction, U256};
use tracevm_tracers::{IntraBlockState, StatusCode, Tracers};

/// The chain-level facts the orchestrator consults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Whether the chain pays proof-of-work block rewards; when unset, block
    /// traces carry no reward pseudo-traces.
    pub ethash: bool,
}

/// Mining rewards of one block, computed by the consensus layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockReward {
    /// Reward credited to the block beneficiary, inclusion bonuses included.
    pub miner_reward: U256,
    /// Reward credited to each ommer's beneficiary, in ommer order.
    pub ommer_rewards: Vec<U256>,
}

/// Outcome of running one transaction through the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Error raised before the EVM started (insufficient funds, nonce
    /// mismatch, …) under non-bailout mode; when set, no tracer callback has
    /// fired and `data` is empty.
    pub pre_check_error: Option<String>,
    /// Terminal status of the outermost frame.
    pub status_code: StatusCode,
    /// Gas left after execution and refunds.
    pub gas_left: i64,
    /// Return data of the outermost frame.
    pub data: Bytes,
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self {
            pre_check_error: None,
            status_code: StatusCode::Success,
            gas_left: 0,
            data: Bytes::new(),
        }
    }
}

/// The external EVM executor driving the tracer callbacks.
///
/// An executor is positioned on the state of a specific block and keeps the
/// journal of everything it has executed since, so consecutive [call]s
/// observe each other's effects until [reset] drops them.
///
/// [call]: TransactionExecutor::call
/// [reset]: TransactionExecutor::reset
#[async_trait(?Send)]
pub trait TransactionExecutor {
    /// Executes `txn` on top of the current journal state.
    ///
    /// Every installed tracer observes the full callback sequence of the
    /// execution; after refunds are granted the executor fires
    /// `on_reward_granted` on each of them. May suspend on historical state
    /// fetches.
    async fn call(
        &mut self,
        block: &Block,
        txn: &Transaction,
        refund: bool,
        gas_bailout: bool,
        tracers: Tracers,
    ) -> Result<ExecutionResult, ExecutorError>;

    /// Drops the journal state accumulated by previous calls.
    fn reset(&mut self);
}

/// Access to historical chain state, configuration and consensus rewards.
#[async_trait(?Send)]
pub trait TraceProvider {
    /// The executor type this provider creates.
    type Executor: TransactionExecutor;

    /// Configuration of the backing chain.
    async fn chain_config(&self) -> Result<ChainConfig, ProviderError>;

    /// World state as of the end of `block_number`.
    async fn state_at(&self, block_number: BlockNumber) -> Result<Rc<dyn IntraBlockState>, ProviderError>;

    /// Creates an executor positioned on the state at the end of
    /// `block_number`.
    async fn executor_at(&self, block_number: BlockNumber) -> Result<Self::Executor, ProviderError>;

    /// Mining rewards for `block`; consulted only for proof-of-work chains.
    fn block_rewards(&self, chain_config: &ChainConfig, block: &Block) -> BlockReward;
}
