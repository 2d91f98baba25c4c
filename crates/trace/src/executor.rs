use crate::{
    error::TraceError,
    provider::{TraceProvider, TransactionExecutor},
};
use std::{cell::RefCell, rc::Rc};
use tracing::debug;
use tracevm_primitives::{Block, BlockNumber, BlockWithHash, Transaction};
use tracevm_rpc_types::{
    trace::{
        Action, LocalizedTransactionTrace, RewardAction, RewardType, TraceCall, TraceCallResult,
        TraceConfig, TraceManyCallResult, TraceResults, TransactionTrace,
    },
    CallRequest, TransactionInfo,
};
use tracevm_tracers::{
    IntraBlockState, IntraBlockStateTracer, StateAddresses, StateDiffTracer, TraceTracer, Tracers,
    VmTraceTracer,
};

/// Drives the external EVM executor with the tracer set a request asks for
/// and harvests the buffered observations.
///
/// All operations re-execute historical transactions on top of the state the
/// chain had before them; the provider supplies that state, the executors and
/// the consensus reward figures.
#[derive(Debug)]
pub struct TraceCallExecutor<P> {
    provider: P,
}

impl<P: TraceProvider> TraceCallExecutor<P> {
    /// Creates a new instance over the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns all traces of the block: the call traces of every transaction
    /// in block order, followed by the reward pseudo-traces when the chain
    /// pays proof-of-work rewards.
    pub async fn trace_block(
        &self,
        block_with_hash: &BlockWithHash,
    ) -> Result<Vec<LocalizedTransactionTrace>, TraceError> {
        let block = &block_with_hash.block;
        let results = self.trace_block_transactions(block, TraceConfig::trace_only()).await?;

        let mut traces = Vec::new();
        for (position, result) in results.into_iter().enumerate() {
            let txn = &block.transactions[position];
            let info = TransactionInfo {
                hash: Some(txn.hash),
                index: Some(position as u64),
                block_hash: Some(block_with_hash.hash),
                block_number: Some(block.header.number),
            };
            traces.extend(result.traces.trace.into_iter().map(|trace| localize(trace, &info)));
        }

        let chain_config = self.provider.chain_config().await?;
        if chain_config.ethash {
            let rewards = self.provider.block_rewards(&chain_config, block);
            traces.push(reward_trace(
                block_with_hash,
                RewardAction {
                    author: block.header.beneficiary,
                    value: rewards.miner_reward,
                    reward_type: RewardType::Block,
                },
            ));
            for (ommer, reward) in block.ommers.iter().zip(rewards.ommer_rewards) {
                traces.push(reward_trace(
                    block_with_hash,
                    RewardAction {
                        author: ommer.beneficiary,
                        value: reward,
                        reward_type: RewardType::Uncle,
                    },
                ));
            }
        }

        Ok(traces)
    }

    /// Re-executes all transactions of the block in order, tracing each with
    /// a fresh tracer set built from `config`.
    pub async fn trace_block_transactions(
        &self,
        block: &Block,
        config: TraceConfig,
    ) -> Result<Vec<TraceCallResult>, TraceError> {
        let block_number = block.header.number;
        debug!(
            target: "trace::executor",
            block_number,
            txns = block.transactions.len(),
            ?config,
            "tracing block transactions"
        );

        let initial_ibs = self.provider.state_at(block_number - 1).await?;
        let state_addresses = Rc::new(RefCell::new(StateAddresses::new(initial_ibs.clone())));
        let ibs_tracer = Rc::new(RefCell::new(IntraBlockStateTracer::new(state_addresses.clone())));

        let mut executor = self.provider.executor_at(block_number - 1).await?;

        let mut results = Vec::with_capacity(block.transactions.len());
        for (index, txn) in block.transactions.iter().enumerate() {
            let mut result = TraceCallResult::default();
            result.traces.transaction_hash = Some(txn.hash);

            let txn_tracers = TxnTracers::new(&config, Some(index), &initial_ibs, &state_addresses);
            let mut tracers = txn_tracers.install();
            tracers.push(ibs_tracer.clone());

            let execution_result = executor.call(block, txn, true, true, tracers).await?;
            if let Some(pre_check_error) = execution_result.pre_check_error {
                result.pre_check_error = Some(pre_check_error);
            } else {
                result.traces.output = execution_result.data;
            }
            txn_tracers.harvest(&mut result.traces);
            results.push(result);
        }
        Ok(results)
    }

    /// Simulates a single call on top of the block's state and traces it.
    pub async fn trace_call(
        &self,
        block: &Block,
        call: CallRequest,
        config: TraceConfig,
    ) -> Result<TraceCallResult, TraceError> {
        let txn = call.into_transaction()?;
        self.execute(block.header.number, block, &txn, None, &config).await
    }

    /// Simulates several calls independently against the same pre-state,
    /// resetting the executor between them.
    ///
    /// A pre-check failure of any call aborts the batch and discards the
    /// results accumulated so far.
    pub async fn trace_calls(
        &self,
        block: &Block,
        calls: Vec<TraceCall>,
    ) -> Result<TraceManyCallResult, TraceError> {
        let block_number = block.header.number;
        debug!(target: "trace::executor", block_number, calls = calls.len(), "tracing calls");

        let initial_ibs = self.provider.state_at(block_number).await?;
        let state_addresses = Rc::new(RefCell::new(StateAddresses::new(initial_ibs.clone())));
        let ibs_tracer = Rc::new(RefCell::new(IntraBlockStateTracer::new(state_addresses.clone())));

        let mut executor = self.provider.executor_at(block_number).await?;

        let mut result = TraceManyCallResult::default();
        for (index, TraceCall(call, config)) in calls.into_iter().enumerate() {
            let txn = call.into_transaction()?;

            let txn_tracers = TxnTracers::new(&config, Some(index), &initial_ibs, &state_addresses);
            let mut tracers = txn_tracers.install();
            tracers.push(ibs_tracer.clone());

            let execution_result = executor.call(block, &txn, true, true, tracers).await?;
            if let Some(pre_check_error) = execution_result.pre_check_error {
                result.pre_check_error =
                    Some(format!("first run for txIndex {index} error: {pre_check_error}"));
                result.traces.clear();
                break
            }

            let mut traces = TraceResults { output: execution_result.data, ..Default::default() };
            txn_tracers.harvest(&mut traces);
            result.traces.push(traces);

            executor.reset();
        }
        Ok(result)
    }

    /// Returns the call traces of one historical transaction, decorated with
    /// its position within the chain.
    pub async fn trace_transaction(
        &self,
        block_with_hash: &BlockWithHash,
        txn: &Transaction,
    ) -> Result<Vec<LocalizedTransactionTrace>, TraceError> {
        let block = &block_with_hash.block;
        let result = self
            .execute(
                block.header.number - 1,
                block,
                txn,
                Some(txn.transaction_index as usize),
                &TraceConfig::trace_only(),
            )
            .await?;

        let info = TransactionInfo {
            hash: Some(txn.hash),
            index: Some(txn.transaction_index),
            block_hash: Some(block_with_hash.hash),
            block_number: Some(block.header.number),
        };
        Ok(result.traces.trace.into_iter().map(|trace| localize(trace, &info)).collect())
    }

    /// Runs `txn` against the state at `block_number` with the requested
    /// tracer set.
    ///
    /// Transactions preceding `txn` in the block are re-executed first with
    /// only the shadow-state tracer installed, so the intra-block state the
    /// tracers observe matches the chain's.
    async fn execute(
        &self,
        block_number: BlockNumber,
        block: &Block,
        txn: &Transaction,
        transaction_index: Option<usize>,
        config: &TraceConfig,
    ) -> Result<TraceCallResult, TraceError> {
        debug!(
            target: "trace::executor",
            block_number,
            index = ?transaction_index,
            ?config,
            "executing transaction"
        );

        let initial_ibs = self.provider.state_at(block_number).await?;
        let state_addresses = Rc::new(RefCell::new(StateAddresses::new(initial_ibs.clone())));
        let ibs_tracer = Rc::new(RefCell::new(IntraBlockStateTracer::new(state_addresses.clone())));

        let mut executor = self.provider.executor_at(block_number).await?;

        // rebuild the intra-block state left behind by the predecessors
        for preceding in block.transactions.iter().take(txn.transaction_index as usize) {
            let tracers: Tracers = vec![ibs_tracer.clone()];
            executor.call(block, preceding, true, true, tracers).await?;
        }
        executor.reset();

        let txn_tracers = TxnTracers::new(config, transaction_index, &initial_ibs, &state_addresses);
        let tracers = txn_tracers.install();

        let mut result = TraceCallResult::default();
        let execution_result = executor.call(block, txn, true, true, tracers).await?;
        if let Some(pre_check_error) = execution_result.pre_check_error {
            result.pre_check_error = Some(pre_check_error);
        } else {
            result.traces.output = execution_result.data;
        }
        txn_tracers.harvest(&mut result.traces);
        Ok(result)
    }
}

/// The per-transaction tracer set selected by a [TraceConfig], kept by
/// concrete handle so the buffers can be harvested after the call.
struct TxnTracers {
    vm: Option<Rc<RefCell<VmTraceTracer>>>,
    call: Option<Rc<RefCell<TraceTracer>>>,
    state_diff: Option<Rc<RefCell<StateDiffTracer>>>,
}

impl TxnTracers {
    fn new(
        config: &TraceConfig,
        transaction_index: Option<usize>,
        initial_ibs: &Rc<dyn IntraBlockState>,
        state_addresses: &Rc<RefCell<StateAddresses>>,
    ) -> Self {
        Self {
            vm: config
                .vm_trace
                .then(|| Rc::new(RefCell::new(VmTraceTracer::new(transaction_index)))),
            call: config.trace.then(|| Rc::new(RefCell::new(TraceTracer::new(initial_ibs.clone())))),
            state_diff: config
                .state_diff
                .then(|| Rc::new(RefCell::new(StateDiffTracer::new(state_addresses.clone())))),
        }
    }

    fn install(&self) -> Tracers {
        let mut tracers: Tracers = Vec::new();
        if let Some(vm) = &self.vm {
            tracers.push(vm.clone());
        }
        if let Some(call) = &self.call {
            tracers.push(call.clone());
        }
        if let Some(state_diff) = &self.state_diff {
            tracers.push(state_diff.clone());
        }
        tracers
    }

    fn harvest(&self, traces: &mut TraceResults) {
        if let Some(vm) = &self.vm {
            traces.vm_trace = Some(vm.borrow_mut().take_vm_trace());
        }
        if let Some(call) = &self.call {
            traces.trace = call.borrow_mut().take_traces();
        }
        if let Some(state_diff) = &self.state_diff {
            traces.state_diff = Some(state_diff.borrow_mut().take_state_diff());
        }
    }
}

fn localize(trace: TransactionTrace, info: &TransactionInfo) -> LocalizedTransactionTrace {
    LocalizedTransactionTrace {
        trace,
        block_hash: info.block_hash,
        block_number: info.block_number,
        transaction_hash: info.hash,
        transaction_position: info.index,
    }
}

fn reward_trace(block_with_hash: &BlockWithHash, action: RewardAction) -> LocalizedTransactionTrace {
    LocalizedTransactionTrace {
        trace: TransactionTrace {
            action: Action::Reward(action),
            error: None,
            result: None,
            subtraces: 0,
            trace_address: Vec::new(),
        },
        block_hash: Some(block_with_hash.hash),
        block_number: Some(block_with_hash.block.header.number),
        transaction_hash: None,
        transaction_position: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ExecutorError,
        provider::{BlockReward, ChainConfig, ExecutionResult},
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tracevm_primitives::{Address, Header, TxHash, H256, U256};
    use tracevm_tracers::{
        opcode,
        test_utils::{call_message, MockIntraBlockState},
        CallResult, EvmStack, ExecutionState, Message, Revision, StatusCode,
    };

    fn sender() -> Address {
        Address::from_low_u64_be(0x5e17de5)
    }

    fn contract() -> Address {
        Address::from_low_u64_be(0xc0117ac7)
    }

    fn beneficiary() -> Address {
        Address::from_low_u64_be(0xbe7ef1c1)
    }

    enum Event {
        Start { msg: Message, code: Vec<u8> },
        Step { pc: usize, stack: Vec<U256>, code: Vec<u8>, gas_left: i64 },
        End { status: StatusCode, gas_left: i64, data: Vec<u8> },
    }

    struct TxnScript {
        pre_check_error: Option<String>,
        events: Vec<Event>,
        result: ExecutionResult,
    }

    /// What a call/create transaction executing a single STOP looks like to
    /// the tracers.
    fn stop_script(gas: i64) -> TxnScript {
        let msg = call_message(0, gas, sender(), contract());
        TxnScript {
            pre_check_error: None,
            events: vec![
                Event::Start { msg, code: vec![opcode::STOP] },
                Event::Step { pc: 0, stack: vec![], code: vec![opcode::STOP], gas_left: gas },
                Event::End { status: StatusCode::Success, gas_left: gas, data: vec![] },
            ],
            result: ExecutionResult {
                pre_check_error: None,
                status_code: StatusCode::Success,
                gas_left: gas,
                data: vec![0xaa].into(),
            },
        }
    }

    /// A two-op script (PC, STOP) so the vm trace has a surviving op.
    fn pc_script(gas: i64) -> TxnScript {
        let msg = call_message(0, gas, sender(), contract());
        let code = vec![opcode::PC, opcode::STOP];
        TxnScript {
            pre_check_error: None,
            events: vec![
                Event::Start { msg, code: code.clone() },
                Event::Step { pc: 0, stack: vec![], code: code.clone(), gas_left: gas },
                Event::Step { pc: 1, stack: vec![U256::zero()], code, gas_left: gas - 2 },
                Event::End { status: StatusCode::Success, gas_left: gas - 2, data: vec![] },
            ],
            result: ExecutionResult {
                pre_check_error: None,
                status_code: StatusCode::Success,
                gas_left: gas - 2,
                data: Default::default(),
            },
        }
    }

    fn pre_check_script(error: &str) -> TxnScript {
        TxnScript {
            pre_check_error: Some(error.to_string()),
            events: vec![],
            result: ExecutionResult::default(),
        }
    }

    #[derive(Default)]
    struct ExecLog {
        calls: usize,
        resets: usize,
        tracer_counts: Vec<usize>,
    }

    struct MockExecutor {
        scripts: Rc<RefCell<VecDeque<TxnScript>>>,
        post_state: Rc<MockIntraBlockState>,
        log: Rc<RefCell<ExecLog>>,
    }

    #[async_trait(?Send)]
    impl TransactionExecutor for MockExecutor {
        async fn call(
            &mut self,
            _block: &Block,
            _txn: &Transaction,
            _refund: bool,
            _gas_bailout: bool,
            tracers: Tracers,
        ) -> Result<ExecutionResult, ExecutorError> {
            let script = self
                .scripts
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ExecutorError::Internal("no script left".to_string()))?;
            {
                let mut log = self.log.borrow_mut();
                log.calls += 1;
                log.tracer_counts.push(tracers.len());
            }

            if script.pre_check_error.is_some() {
                return Ok(ExecutionResult {
                    pre_check_error: script.pre_check_error,
                    ..Default::default()
                })
            }

            let ibs: &dyn IntraBlockState = self.post_state.as_ref();
            let mut open_frames: Vec<Message> = Vec::new();
            for event in &script.events {
                match event {
                    Event::Start { msg, code } => {
                        for tracer in &tracers {
                            tracer.borrow_mut().on_execution_start(Revision::Shanghai, msg, code);
                        }
                        open_frames.push(msg.clone());
                    }
                    Event::Step { pc, stack, code, gas_left } => {
                        let msg = open_frames.last().expect("step outside of a frame");
                        let state = ExecutionState {
                            code,
                            memory: &[],
                            gas_left: *gas_left,
                            message: msg,
                        };
                        let stack = EvmStack::new(stack);
                        for tracer in &tracers {
                            tracer.borrow_mut().on_instruction_start(*pc, &stack, &state, ibs);
                        }
                    }
                    Event::End { status, gas_left, data } => {
                        open_frames.pop();
                        let result = CallResult {
                            status_code: *status,
                            gas_left: *gas_left,
                            data: data.clone().into(),
                        };
                        for tracer in &tracers {
                            tracer.borrow_mut().on_execution_end(&result, ibs);
                        }
                    }
                }
            }

            let reward = CallResult {
                status_code: script.result.status_code,
                gas_left: script.result.gas_left,
                data: script.result.data.clone(),
            };
            for tracer in &tracers {
                tracer.borrow_mut().on_reward_granted(&reward, ibs);
            }
            Ok(script.result)
        }

        fn reset(&mut self) {
            self.log.borrow_mut().resets += 1;
        }
    }

    struct MockProvider {
        chain_config: ChainConfig,
        rewards: BlockReward,
        pre_state: Rc<MockIntraBlockState>,
        post_state: Rc<MockIntraBlockState>,
        scripts: Rc<RefCell<VecDeque<TxnScript>>>,
        log: Rc<RefCell<ExecLog>>,
    }

    impl MockProvider {
        fn new(scripts: Vec<TxnScript>) -> Self {
            let state = MockIntraBlockState::default()
                .with_account(sender(), U256::from(1_000_000_000u64), 0, vec![])
                .with_account(contract(), U256::zero(), 1, vec![opcode::STOP]);
            Self {
                chain_config: ChainConfig { chain_id: 1, ethash: false },
                rewards: BlockReward::default(),
                pre_state: Rc::new(state.clone()),
                post_state: Rc::new(state),
                scripts: Rc::new(RefCell::new(scripts.into())),
                log: Rc::new(RefCell::new(ExecLog::default())),
            }
        }

        fn with_ethash(mut self, rewards: BlockReward) -> Self {
            self.chain_config.ethash = true;
            self.rewards = rewards;
            self
        }
    }

    #[async_trait(?Send)]
    impl TraceProvider for MockProvider {
        type Executor = MockExecutor;

        async fn chain_config(&self) -> Result<ChainConfig, crate::ProviderError> {
            Ok(self.chain_config.clone())
        }

        async fn state_at(
            &self,
            _block_number: BlockNumber,
        ) -> Result<Rc<dyn IntraBlockState>, crate::ProviderError> {
            Ok(self.pre_state.clone())
        }

        async fn executor_at(
            &self,
            _block_number: BlockNumber,
        ) -> Result<MockExecutor, crate::ProviderError> {
            Ok(MockExecutor {
                scripts: self.scripts.clone(),
                post_state: self.post_state.clone(),
                log: self.log.clone(),
            })
        }

        fn block_rewards(&self, _chain_config: &ChainConfig, _block: &Block) -> BlockReward {
            self.rewards.clone()
        }
    }

    fn block_with_transactions(count: usize) -> BlockWithHash {
        let transactions = (0..count)
            .map(|index| Transaction {
                hash: TxHash::from_low_u64_be(0x100 + index as u64),
                from: sender(),
                to: Some(contract()),
                nonce: index as u64,
                gas_limit: 100_000,
                gas_price: None,
                value: U256::zero(),
                input: Default::default(),
                transaction_index: index as u64,
            })
            .collect();
        BlockWithHash {
            block: Block {
                header: Header {
                    number: 10,
                    beneficiary: beneficiary(),
                    ..Default::default()
                },
                transactions,
                ommers: vec![],
            },
            hash: H256::from_low_u64_be(0xb10c),
        }
    }

    #[tokio::test]
    async fn trace_block_transactions_harvests_each_transaction() {
        let provider = MockProvider::new(vec![stop_script(50_000), stop_script(60_000)]);
        let log = provider.log.clone();
        let executor = TraceCallExecutor::new(provider);

        let block = block_with_transactions(2).block;
        let config = TraceConfig { vm_trace: true, trace: true, state_diff: false };
        let results = executor.trace_block_transactions(&block, config).await.unwrap();

        assert_eq!(results.len(), 2);
        for (index, result) in results.iter().enumerate() {
            assert!(result.pre_check_error.is_none());
            assert_eq!(
                result.traces.transaction_hash,
                Some(TxHash::from_low_u64_be(0x100 + index as u64))
            );
            assert_eq!(result.traces.output, vec![0xaa].into());
            // STOP-only frames collapse to an empty vm trace
            let vm_trace = result.traces.vm_trace.as_ref().unwrap();
            assert!(vm_trace.ops.is_empty());
            assert_eq!(result.traces.trace.len(), 1);
            assert!(result.traces.state_diff.is_none());
        }
        // vm + call tracers plus the shared shadow-state tracer
        assert_eq!(log.borrow().tracer_counts, vec![3, 3]);
    }

    #[tokio::test]
    async fn vm_trace_idx_labels_carry_the_transaction_index() {
        let provider = MockProvider::new(vec![pc_script(50_000), pc_script(60_000)]);
        let executor = TraceCallExecutor::new(provider);

        let block = block_with_transactions(2).block;
        let config = TraceConfig { vm_trace: true, trace: false, state_diff: false };
        let results = executor.trace_block_transactions(&block, config).await.unwrap();

        let first = results[0].traces.vm_trace.as_ref().unwrap();
        assert_eq!(first.ops[0].idx, "0-0");
        let second = results[1].traces.vm_trace.as_ref().unwrap();
        assert_eq!(second.ops[0].idx, "1-0");
    }

    #[tokio::test]
    async fn trace_block_without_pow_omits_the_reward_trace() {
        let provider = MockProvider::new(vec![stop_script(50_000)]);
        let executor = TraceCallExecutor::new(provider);

        let block_with_hash = block_with_transactions(1);
        let traces = executor.trace_block(&block_with_hash).await.unwrap();

        assert_eq!(traces.len(), 1);
        let trace = &traces[0];
        assert!(trace.trace.action.is_call());
        assert_eq!(trace.block_hash, Some(block_with_hash.hash));
        assert_eq!(trace.block_number, Some(10));
        assert_eq!(trace.transaction_hash, Some(TxHash::from_low_u64_be(0x100)));
        assert_eq!(trace.transaction_position, Some(0));
    }

    #[tokio::test]
    async fn trace_block_appends_reward_traces_for_pow_chains() {
        let ommer_author = Address::from_low_u64_be(0x044e);
        let rewards = BlockReward {
            miner_reward: U256::from(5_000_000_000u64),
            ommer_rewards: vec![U256::from(3_000_000_000u64)],
        };
        let provider = MockProvider::new(vec![stop_script(50_000)]).with_ethash(rewards);
        let executor = TraceCallExecutor::new(provider);

        let mut block_with_hash = block_with_transactions(1);
        block_with_hash.block.ommers =
            vec![Header { beneficiary: ommer_author, ..Default::default() }];
        let traces = executor.trace_block(&block_with_hash).await.unwrap();

        assert_eq!(traces.len(), 3);

        let block_reward = &traces[1];
        match &block_reward.trace.action {
            Action::Reward(action) => {
                assert_eq!(action.author, beneficiary());
                assert_eq!(action.reward_type, RewardType::Block);
                assert_eq!(action.value, U256::from(5_000_000_000u64));
            }
            other => panic!("expected reward action, got {other:?}"),
        }
        assert!(block_reward.transaction_hash.is_none());
        assert_eq!(block_reward.block_number, Some(10));

        let uncle_reward = &traces[2];
        match &uncle_reward.trace.action {
            Action::Reward(action) => {
                assert_eq!(action.author, ommer_author);
                assert_eq!(action.reward_type, RewardType::Uncle);
            }
            other => panic!("expected reward action, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn trace_calls_aborts_the_batch_on_a_pre_check_error() {
        let provider =
            MockProvider::new(vec![stop_script(50_000), pre_check_script("intrinsic gas too low")]);
        let log = provider.log.clone();
        let executor = TraceCallExecutor::new(provider);

        let block = block_with_transactions(0).block;
        let call = CallRequest { to: Some(contract()), ..Default::default() };
        let calls = vec![
            TraceCall(call.clone(), TraceConfig::trace_only()),
            TraceCall(call, TraceConfig::trace_only()),
        ];
        let result = executor.trace_calls(&block, calls).await.unwrap();

        assert!(result.traces.is_empty());
        assert_eq!(
            result.pre_check_error.as_deref(),
            Some("first run for txIndex 1 error: intrinsic gas too low")
        );
        // the executor was reset after the first call only
        assert_eq!(log.borrow().resets, 1);
    }

    #[tokio::test]
    async fn trace_calls_traces_each_call_independently() {
        let provider = MockProvider::new(vec![stop_script(50_000), stop_script(50_000)]);
        let log = provider.log.clone();
        let executor = TraceCallExecutor::new(provider);

        let block = block_with_transactions(0).block;
        let call = CallRequest { to: Some(contract()), ..Default::default() };
        let calls = vec![
            TraceCall(call.clone(), TraceConfig::trace_only()),
            TraceCall(call, TraceConfig { vm_trace: true, trace: false, state_diff: true }),
        ];
        let result = executor.trace_calls(&block, calls).await.unwrap();

        assert_eq!(result.traces.len(), 2);
        assert!(result.pre_check_error.is_none());
        assert_eq!(result.traces[0].trace.len(), 1);
        assert!(result.traces[0].vm_trace.is_none());
        assert!(result.traces[1].vm_trace.is_some());
        assert!(result.traces[1].state_diff.is_some());
        assert_eq!(log.borrow().resets, 2);
    }

    #[tokio::test]
    async fn trace_call_surfaces_the_pre_check_error() {
        let provider = MockProvider::new(vec![pre_check_script("insufficient funds")]);
        let executor = TraceCallExecutor::new(provider);

        let block = block_with_transactions(0).block;
        let call = CallRequest { to: Some(contract()), ..Default::default() };
        let result = executor.trace_call(&block, call, TraceConfig::trace_only()).await.unwrap();

        assert_eq!(result.pre_check_error.as_deref(), Some("insufficient funds"));
        assert!(result.traces.trace.is_empty());
    }

    #[tokio::test]
    async fn trace_transaction_replays_predecessors_with_the_shadow_tracer() {
        let provider = MockProvider::new(vec![stop_script(50_000), stop_script(60_000)]);
        let log = provider.log.clone();
        let executor = TraceCallExecutor::new(provider);

        let block_with_hash = block_with_transactions(2);
        let target = block_with_hash.block.transactions[1].clone();
        let traces = executor.trace_transaction(&block_with_hash, &target).await.unwrap();

        // one replay call plus the traced transaction
        assert_eq!(log.borrow().calls, 2);
        // the replay runs with the shadow tracer alone; the traced txn with
        // the call tracer alone
        assert_eq!(log.borrow().tracer_counts, vec![1, 1]);
        assert_eq!(log.borrow().resets, 1);

        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].transaction_position, Some(1));
        assert_eq!(traces[0].transaction_hash, Some(TxHash::from_low_u64_be(0x101)));
        assert_eq!(traces[0].block_number, Some(10));
    }

    #[tokio::test]
    async fn trace_call_runs_without_an_index_prefix() {
        let provider = MockProvider::new(vec![pc_script(50_000)]);
        let executor = TraceCallExecutor::new(provider);

        let block = block_with_transactions(0).block;
        let call = CallRequest { to: Some(contract()), ..Default::default() };
        let config = TraceConfig { vm_trace: true, trace: false, state_diff: false };
        let result = executor.trace_call(&block, call, config).await.unwrap();

        let vm_trace = result.traces.vm_trace.as_ref().unwrap();
        assert_eq!(vm_trace.ops[0].idx, "0");
    }
}
