use crate::{
    state::IntraBlockState,
    tracer::EvmTracer,
    types::{CallKind, CallResult, EvmStack, ExecutionState, Message, Revision, StatusCode},
};
use std::{collections::HashSet, rc::Rc};
use tracing::trace;
use tracevm_primitives::{Address, U64};
use tracevm_rpc_types::trace::{
    Action, CallAction, CallOutput, CallType, CreateAction, CreateOutput, TraceOutput,
    TransactionTrace,
};

/// Records the flat, ordered list of call/create frames of a transaction.
///
/// Frames are appended in DFS-execution order and related through
/// trace-address paths assigned from sibling arrival order. Outputs and
/// errors are filled retroactively when frames close.
pub struct TraceTracer {
    traces: Vec<TransactionTrace>,
    /// Indices of the currently open frames, innermost last.
    index_stack: Vec<usize>,
    start_gas: Vec<i64>,
    initial_gas: i64,
    current_depth: i32,
    /// Addresses created by `CREATE`/`CREATE2` during this execution.
    created: HashSet<Address>,
    initial_ibs: Rc<dyn IntraBlockState>,
}

impl std::fmt::Debug for TraceTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceTracer")
            .field("traces", &self.traces)
            .field("index_stack", &self.index_stack)
            .field("current_depth", &self.current_depth)
            .finish_non_exhaustive()
    }
}

impl TraceTracer {
    /// Creates a tracer diffing frame recipients against the given
    /// pre-execution state for create detection.
    pub fn new(initial_ibs: Rc<dyn IntraBlockState>) -> Self {
        Self {
            traces: Vec::new(),
            index_stack: Vec::new(),
            start_gas: Vec::new(),
            initial_gas: 0,
            current_depth: 0,
            created: HashSet::new(),
            initial_ibs,
        }
    }

    /// Takes the accumulated traces, leaving the tracer ready for another
    /// transaction.
    pub fn take_traces(&mut self) -> Vec<TransactionTrace> {
        self.index_stack.clear();
        self.start_gas.clear();
        self.initial_gas = 0;
        self.current_depth = 0;
        self.created.clear();
        std::mem::take(&mut self.traces)
    }
}

impl EvmTracer for TraceTracer {
    fn on_execution_start(&mut self, _rev: Revision, msg: &Message, code: &[u8]) {
        self.current_depth = msg.depth;

        // A frame is a create when its recipient is genuinely new: absent
        // from the pre-execution state, not created earlier in this
        // execution, and distinct from the executing code's account.
        let create = !self.initial_ibs.exists(msg.recipient) &&
            !self.created.contains(&msg.recipient) &&
            msg.recipient != msg.code_address;

        self.start_gas.push(msg.gas);

        trace!(
            target: "trace::call",
            depth = msg.depth,
            kind = ?msg.kind,
            gas = msg.gas,
            sender = %msg.sender,
            recipient = %msg.recipient,
            code_address = %msg.code_address,
            create,
            "execution start"
        );

        let gas = U64::from(msg.gas as u64);
        let (action, result) = if create {
            self.created.insert(msg.recipient);
            let action = Action::Create(CreateAction {
                from: msg.sender,
                value: msg.value,
                gas,
                init: code.into(),
            });
            let result = TraceOutput::Create(CreateOutput {
                gas_used: U64::zero(),
                code: Default::default(),
                address: msg.recipient,
            });
            (action, result)
        } else {
            let (from, to, call_type) = match msg.kind {
                CallKind::Call => {
                    let call_type =
                        if msg.is_static { CallType::StaticCall } else { CallType::Call };
                    (msg.sender, msg.recipient, Some(call_type))
                }
                // delegate semantics: the currently executing contract is the
                // caller, the code owner the callee
                CallKind::DelegateCall => (msg.recipient, msg.code_address, Some(CallType::DelegateCall)),
                CallKind::CallCode => (msg.sender, msg.recipient, Some(CallType::CallCode)),
                CallKind::Create | CallKind::Create2 => (msg.sender, msg.recipient, None),
            };
            let action = Action::Call(CallAction {
                from,
                call_type,
                gas,
                input: msg.input.clone(),
                to,
                value: msg.value,
            });
            let result =
                TraceOutput::Call(CallOutput { gas_used: U64::zero(), output: Default::default() });
            (action, result)
        };

        let mut trace = TransactionTrace {
            action,
            error: None,
            result: Some(result),
            subtraces: 0,
            trace_address: Vec::new(),
        };

        if msg.depth > 0 {
            if let Some(&parent) = self.index_stack.last() {
                let parent_trace = &mut self.traces[parent];
                trace.trace_address = parent_trace.trace_address.clone();
                trace.trace_address.push(parent_trace.subtraces);
                parent_trace.subtraces += 1;
            }
        } else {
            self.initial_gas = msg.gas;
        }

        self.index_stack.push(self.traces.len());
        self.traces.push(trace);
    }

    fn on_instruction_start(
        &mut self,
        pc: usize,
        _stack: &EvmStack<'_>,
        state: &ExecutionState<'_>,
        _intra_block_state: &dyn IntraBlockState,
    ) {
        trace!(
            target: "trace::call",
            pc,
            gas_left = state.gas_left,
            depth = state.message.depth,
            "instruction start"
        );
    }

    fn on_execution_end(&mut self, result: &CallResult, _intra_block_state: &dyn IntraBlockState) {
        let Some(index) = self.index_stack.pop() else { return };
        let start_gas = self.start_gas.pop().unwrap_or_default();

        let trace = &mut self.traces[index];
        if self.current_depth > 0 {
            if let Some(output) = &mut trace.result {
                output.set_data(result.data.clone());
            }
        }
        self.current_depth -= 1;

        trace!(
            target: "trace::call",
            status = ?result.status_code,
            start_gas,
            gas_left = result.gas_left,
            "execution end"
        );

        match result.status_code {
            StatusCode::Success => {
                if let Some(output) = &mut trace.result {
                    output.set_gas_used((start_gas - result.gas_left) as u64);
                }
            }
            status => {
                trace.error = Some(failure_error(status));
                trace.result = None;
            }
        }
    }

    fn on_reward_granted(&mut self, result: &CallResult, _intra_block_state: &dyn IntraBlockState) {
        trace!(
            target: "trace::call",
            status = ?result.status_code,
            gas_left = result.gas_left,
            initial_gas = self.initial_gas,
            "reward granted"
        );

        // only the root frame is settled with the post-refund figures
        let Some(trace) = self.traces.first_mut() else { return };
        match result.status_code {
            StatusCode::Success => {
                if let Some(output) = &mut trace.result {
                    output.set_gas_used((self.initial_gas - result.gas_left) as u64);
                    if !result.data.is_empty() {
                        output.set_data(result.data.clone());
                    }
                }
            }
            status => {
                trace.error = Some(failure_error(status));
                trace.result = None;
            }
        }
    }
}

fn failure_error(status: StatusCode) -> String {
    match status {
        StatusCode::Revert => "Reverted",
        StatusCode::OutOfGas | StatusCode::StackOverflow => "Out of gas",
        StatusCode::UndefinedInstruction | StatusCode::InvalidInstruction => "Bad instruction",
        StatusCode::StackUnderflow => "Stack underflow",
        StatusCode::BadJumpDestination => "Bad jump destination",
        _ => "",
    }
    .to_string()
}
