use tracevm_primitives::BlockNumber;
use tracevm_rpc_types::CallInputError;

/// Errors of the historical-state and chain-config providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The requested block is not known to the backing store.
    #[error("unknown block number {0}")]
    UnknownBlockNumber(BlockNumber),
    /// Reading from the historical state failed.
    #[error("state access failed: {0}")]
    StateAccess(String),
    /// Chain configuration could not be read.
    #[error("chain config unavailable: {0}")]
    ChainConfig(String),
}

/// Errors raised by the external transaction executor.
///
/// Pre-check failures are not errors: they are surfaced as
/// [pre_check_error](crate::ExecutionResult::pre_check_error) data on the
/// execution result.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The driving context was canceled.
    #[error("execution canceled")]
    Canceled,
    /// A state fetch issued by the executor failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Any other executor-internal failure.
    #[error("{0}")]
    Internal(String),
}

/// Errors returned by [TraceCallExecutor](crate::TraceCallExecutor) operations.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Reading chain data failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The executor failed outright (as opposed to a pre-check failure).
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// The call request carried conflicting `data` and `input` fields.
    #[error(transparent)]
    CallInput(#[from] CallInputError),
}
