use crate::{
    opcode,
    state::IntraBlockState,
    tracer::EvmTracer,
    types::{CallResult, EvmStack, ExecutionState, Message, Revision, StatusCode},
};
use tracing::trace;
use tracevm_primitives::{Bytes, U256};
use tracevm_rpc_types::trace::{
    MemoryDelta, StorageDelta, VmExecutedOperation, VmInstruction, VmTrace,
};

/// Index of a node in the trace arena.
type NodeHandle = usize;

#[derive(Debug, Default)]
struct VmTraceNode {
    code: Bytes,
    ops: Vec<TraceOp>,
}

#[derive(Debug)]
struct TraceOp {
    pc: usize,
    op_code: u8,
    op_name: String,
    /// Holds `gas_left` before the op until the next callback rewrites it to
    /// the true cost.
    gas_cost: i64,
    depth: i32,
    idx: String,
    precompiled_call_gas: Option<i64>,
    sub: Option<NodeHandle>,
    ex: TraceEx,
}

#[derive(Debug, Default)]
struct TraceEx {
    used: i64,
    stack: Vec<U256>,
    memory: Option<TraceMemory>,
    storage: Option<(U256, U256)>,
}

#[derive(Debug)]
struct TraceMemory {
    off: u64,
    len: u64,
    data: Bytes,
}

/// Records a per-opcode trace of a transaction, including nested sub-traces
/// for every inner call.
///
/// The gas cost of an opcode is only known once the next opcode starts (or
/// the frame ends), so each emitted op temporarily stores the gas remaining
/// before it ran and is rewritten retroactively.
///
/// The trace tree is kept in an arena; the frame stack carries node handles
/// so opening and closing frames never touches more than an index.
#[derive(Debug)]
pub struct VmTraceTracer {
    arena: Vec<VmTraceNode>,
    node_stack: Vec<NodeHandle>,
    start_gas: Vec<i64>,
    index_prefix: Vec<String>,
    transaction_index: Option<usize>,
    revision: Option<Revision>,
}

impl VmTraceTracer {
    /// Creates a tracer. With a transaction index, every op index label is
    /// prefixed with `"{index}-"`.
    pub fn new(transaction_index: Option<usize>) -> Self {
        Self {
            arena: vec![VmTraceNode::default()],
            node_stack: Vec::new(),
            start_gas: Vec::new(),
            index_prefix: Vec::new(),
            transaction_index,
            revision: None,
        }
    }

    /// Takes the accumulated trace out of the tracer, leaving it ready for
    /// another transaction.
    pub fn take_vm_trace(&mut self) -> VmTrace {
        let arena = std::mem::replace(&mut self.arena, vec![VmTraceNode::default()]);
        self.node_stack.clear();
        self.start_gas.clear();
        self.index_prefix.clear();

        let mut nodes: Vec<Option<VmTraceNode>> = arena.into_iter().map(Some).collect();
        build_vm_trace(&mut nodes, 0)
    }

    fn alloc_node(&mut self, code: Bytes) -> NodeHandle {
        self.arena.push(VmTraceNode { code, ops: Vec::new() });
        self.arena.len() - 1
    }

    fn current_prefix(&self) -> &str {
        self.index_prefix.last().map(String::as_str).unwrap_or("")
    }
}

impl EvmTracer for VmTraceTracer {
    fn on_execution_start(&mut self, rev: Revision, msg: &Message, code: &[u8]) {
        if self.revision.is_none() {
            self.revision = Some(rev);
        }
        self.start_gas.push(msg.gas);

        if msg.depth == 0 {
            self.arena[0].code = code.into();
            self.node_stack.push(0);
            let prefix = match self.transaction_index {
                Some(index) => format!("{index}-"),
                None => String::new(),
            };
            self.index_prefix.push(prefix);
        } else if let Some(&parent) = self.node_stack.last() {
            if self.arena[parent].ops.is_empty() {
                return
            }
            let prefix = format!("{}{}-", self.current_prefix(), self.arena[parent].ops.len() - 1);
            self.index_prefix.push(prefix);

            let child = self.alloc_node(code.into());
            let op = self.arena[parent].ops.last_mut().expect("parent frame has a call-site op");
            if matches!(op.op_code, opcode::CALL | opcode::STATICCALL | opcode::DELEGATECALL) {
                // gas handed to the callee is not consumed by the caller
                op.depth = msg.depth;
                op.gas_cost -= msg.gas;
            }
            op.sub = Some(child);
            self.node_stack.push(child);
        }

        trace!(
            target: "trace::vm",
            depth = msg.depth,
            gas = msg.gas,
            sender = %msg.sender,
            recipient = %msg.recipient,
            code_address = %msg.code_address,
            prefix = self.current_prefix(),
            "execution start"
        );
    }

    fn on_instruction_start(
        &mut self,
        pc: usize,
        stack: &EvmStack<'_>,
        state: &ExecutionState<'_>,
        _intra_block_state: &dyn IntraBlockState,
    ) {
        let Some(&node) = self.node_stack.last() else { return };
        let rev = self.revision.unwrap_or(Revision::latest());

        // close out the previous op now that its gas effect is observable
        if let Some(op) = self.arena[node].ops.last_mut() {
            if let Some(precompiled_call_gas) = op.precompiled_call_gas {
                op.gas_cost -= precompiled_call_gas;
            } else if op.depth == state.message.depth {
                op.gas_cost -= state.gas_left;
            }
            op.ex.used = state.gas_left;

            fill_memory(&mut op.ex.memory, state.memory);
            op.ex.stack = capture_stack(op.op_code, stack);
        }

        let Some(&op_code) = state.code.get(pc) else { return };
        let op_name = match opcode::instruction_name_or_undefined(rev, op_code).as_str() {
            // erigon's rpcdaemon reports SHA3
            "KECCAK256" => "SHA3".to_string(),
            name => name.to_string(),
        };
        let idx = format!("{}{}", self.current_prefix(), self.arena[node].ops.len());

        trace!(target: "trace::vm", pc, op = %op_name, idx = %idx, gas_left = state.gas_left, "instruction start");

        let mut ex = TraceEx::default();
        ex.memory = opcode::memory_window(op_code, stack)
            .map(|(off, len)| TraceMemory { off, len, data: Bytes::new() });
        ex.storage = opcode::storage_write(op_code, stack);

        self.arena[node].ops.push(TraceOp {
            pc,
            op_code,
            op_name,
            gas_cost: state.gas_left,
            depth: state.message.depth,
            idx,
            precompiled_call_gas: None,
            sub: None,
            ex,
        });
    }

    fn on_precompiled_run(&mut self, result: &CallResult, gas: i64, _intra_block_state: &dyn IntraBlockState) {
        trace!(target: "trace::vm", status = ?result.status_code, gas, "precompiled run");

        if self.arena[0].ops.is_empty() {
            return
        }
        let child = self.alloc_node(Bytes::new());
        let op = self.arena[0].ops.last_mut().expect("root trace has a call-site op");
        op.precompiled_call_gas = Some(gas);
        op.sub = Some(child);
    }

    fn on_execution_end(&mut self, result: &CallResult, _intra_block_state: &dyn IntraBlockState) {
        let node = self.node_stack.pop();
        let start_gas = self.start_gas.pop().unwrap_or_default();
        self.index_prefix.pop();

        trace!(
            target: "trace::vm",
            status = ?result.status_code,
            start_gas,
            gas_left = result.gas_left,
            "execution end"
        );

        let Some(node) = node else { return };
        let ops = &mut self.arena[node].ops;
        if ops.is_empty() {
            return
        }
        if ops.len() == 1 && ops[0].op_code == opcode::STOP {
            // canonical empty trace for frames that only STOP
            ops.clear();
            return
        }

        let op = ops.last_mut().expect("frame trace is non-empty");
        match result.status_code {
            StatusCode::OutOfGas => {
                op.ex.used = result.gas_left;
                op.gas_cost -= result.gas_left;
            }
            StatusCode::UndefinedInstruction => {
                // three dependent updates, order matters
                op.ex.used = op.gas_cost;
                op.gas_cost = start_gas - op.gas_cost;
                op.ex.used -= op.gas_cost;
            }
            // REVERT and every other terminal status share this accounting
            _ => {
                op.gas_cost -= result.gas_left;
                op.ex.used = result.gas_left;
            }
        }
    }
}

/// Snapshots the values the previous op pushed, bottom-most first.
fn capture_stack(op_code: u8, stack: &EvmStack<'_>) -> Vec<U256> {
    let count = opcode::stack_capture_count(op_code);
    (0..count).rev().filter_map(|i| stack.peek(i)).collect()
}

/// Materializes a pre-planted memory window from the current memory contents.
///
/// Memory is conceptually infinite and zero filled, so a window reaching past
/// the allocated buffer is padded with zeros. Zero-length windows are dropped.
fn fill_memory(intent: &mut Option<TraceMemory>, memory: &[u8]) {
    let Some(tm) = intent else { return };
    if tm.len == 0 {
        *intent = None;
        return
    }
    let mut data = vec![0u8; tm.len as usize];
    let start = tm.off as usize;
    if start < memory.len() {
        let end = memory.len().min(start + data.len());
        data[..end - start].copy_from_slice(&memory[start..end]);
    }
    tm.data = data.into();
}

fn build_vm_trace(nodes: &mut Vec<Option<VmTraceNode>>, handle: NodeHandle) -> VmTrace {
    let node = nodes[handle].take().expect("arena nodes are linked exactly once");
    let ops = node
        .ops
        .into_iter()
        .map(|op| {
            let sub = op.sub.map(|child| build_vm_trace(nodes, child));
            VmInstruction {
                cost: op.gas_cost,
                ex: VmExecutedOperation {
                    mem: op.ex.memory.map(|m| MemoryDelta { data: m.data, off: m.off }),
                    push: op.ex.stack,
                    store: op.ex.storage.map(|(key, val)| StorageDelta { key, val }),
                    used: op.ex.used,
                },
                idx: op.idx,
                op: op.op_name,
                pc: op.pc,
                sub,
            }
        })
        .collect();
    VmTrace { code: node.code, ops }
}
