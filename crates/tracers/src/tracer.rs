use crate::{
    state::IntraBlockState,
    types::{CallResult, EvmStack, ExecutionState, Message, Revision},
};
use std::{cell::RefCell, rc::Rc};

/// Callback contract between the EVM interpreter and a tracer.
///
/// The interpreter invokes these hooks synchronously and in strict program
/// order; a tracer never observes concurrent invocation. All callbacks are
/// infallible: a tracer must swallow whatever it sees.
#[allow(unused_variables)]
pub trait EvmTracer {
    /// Entry to a new call/create frame, including the outermost one.
    fn on_execution_start(&mut self, rev: Revision, msg: &Message, code: &[u8]) {}

    /// Fires immediately before each instruction.
    fn on_instruction_start(
        &mut self,
        pc: usize,
        stack: &EvmStack<'_>,
        state: &ExecutionState<'_>,
        intra_block_state: &dyn IntraBlockState,
    ) {
    }

    /// Fires after a precompiled contract ran, with the gas it consumed.
    fn on_precompiled_run(&mut self, result: &CallResult, gas: i64, intra_block_state: &dyn IntraBlockState) {}

    /// Exit of the frame entered by the matching [on_execution_start](EvmTracer::on_execution_start).
    fn on_execution_end(&mut self, result: &CallResult, intra_block_state: &dyn IntraBlockState) {}

    /// End of the transaction, after all refunds have been granted.
    fn on_reward_granted(&mut self, result: &CallResult, intra_block_state: &dyn IntraBlockState) {}
}

/// The set of tracers installed for one execution.
///
/// Tracers are shared between the caller (which harvests their buffers
/// afterwards) and the executor, under the single-threaded cooperative model.
pub type Tracers = Vec<Rc<RefCell<dyn EvmTracer>>>;
