use crate::{
    opcode,
    state::{IntraBlockState, StateAddresses},
    tracer::EvmTracer,
    types::{CallResult, EvmStack, ExecutionState, Message, Revision},
};
use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    rc::Rc,
};
use tracing::{debug, trace};
use tracevm_primitives::{Address, BigEndianHash, H256, U64};
use tracevm_rpc_types::trace::{AccountDiff, ChangedType, Delta, StateDiff};

/// Accumulates the storage keys written per address and, at the end of the
/// transaction, folds every touched address into a [StateDiff] against the
/// shadow baseline.
///
/// Values are not captured at `SSTORE` time: the final pre/post pair is read
/// from the intra-block state at finalization, so writes undone by a revert
/// drop out naturally.
pub struct StateDiffTracer {
    diff_storage: HashMap<Address, BTreeSet<H256>>,
    state_addresses: Rc<RefCell<StateAddresses>>,
    state_diff: StateDiff,
}

impl std::fmt::Debug for StateDiffTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDiffTracer")
            .field("diff_storage", &self.diff_storage)
            .field("state_diff", &self.state_diff)
            .finish_non_exhaustive()
    }
}

impl StateDiffTracer {
    /// Creates a tracer diffing against the given shadow baseline.
    pub fn new(state_addresses: Rc<RefCell<StateAddresses>>) -> Self {
        Self { diff_storage: HashMap::new(), state_addresses, state_diff: StateDiff::default() }
    }

    /// Takes the computed diff, leaving the tracer ready for another
    /// transaction.
    pub fn take_state_diff(&mut self) -> StateDiff {
        self.diff_storage.clear();
        std::mem::take(&mut self.state_diff)
    }
}

impl EvmTracer for StateDiffTracer {
    fn on_execution_start(&mut self, _rev: Revision, msg: &Message, _code: &[u8]) {
        trace!(
            target: "trace::state_diff",
            depth = msg.depth,
            gas = msg.gas,
            sender = %msg.sender,
            recipient = %msg.recipient,
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
        let Some(&op_code) = state.code.get(pc) else { return };
        if op_code != opcode::SSTORE {
            return
        }
        let Some(key) = stack.peek(0) else { return };
        let address = state.message.recipient;
        self.diff_storage.entry(address).or_default().insert(H256::from_uint(&key));
    }

    fn on_reward_granted(&mut self, result: &CallResult, intra_block_state: &dyn IntraBlockState) {
        let touched = intra_block_state.touched();
        debug!(
            target: "trace::state_diff",
            status = ?result.status_code,
            gas_left = result.gas_left,
            touched = touched.len(),
            "computing state diff"
        );

        let state_addresses = self.state_addresses.borrow();
        for address in touched {
            let initial_exists = state_addresses.exists(address);
            let exists = intra_block_state.exists(address);
            let storage_keys = self.diff_storage.get(&address).cloned().unwrap_or_default();

            let mut entry = AccountDiff::default();
            if initial_exists {
                let initial_balance = state_addresses.get_balance(address);
                let initial_code = state_addresses.get_code(address);
                let initial_nonce = state_addresses.get_nonce(address);
                if exists {
                    let mut all_equals = true;
                    let final_balance = intra_block_state.get_balance(address);
                    if initial_balance != final_balance {
                        all_equals = false;
                        entry.balance =
                            Delta::Changed(ChangedType { from: initial_balance, to: final_balance });
                    }
                    let final_code = intra_block_state.get_code(address);
                    if initial_code != final_code {
                        all_equals = false;
                        entry.code =
                            Delta::Changed(ChangedType { from: initial_code, to: final_code });
                    }
                    let final_nonce = intra_block_state.get_nonce(address);
                    if initial_nonce != final_nonce {
                        all_equals = false;
                        entry.nonce = Delta::Changed(ChangedType {
                            from: U64::from(initial_nonce),
                            to: U64::from(final_nonce),
                        });
                    }
                    for key in storage_keys {
                        let original = intra_block_state.get_original_storage(address, key);
                        let current = intra_block_state.get_current_storage(address, key);
                        if original != current {
                            all_equals = false;
                            entry
                                .storage
                                .insert(key, Delta::Changed(ChangedType { from: original, to: current }));
                        }
                    }
                    if !all_equals {
                        self.state_diff.insert(address, entry);
                    }
                } else {
                    entry.balance = Delta::Removed(initial_balance);
                    entry.code = Delta::Removed(initial_code);
                    entry.nonce = Delta::Removed(U64::from(initial_nonce));
                    for key in storage_keys {
                        entry
                            .storage
                            .insert(key, Delta::Removed(intra_block_state.get_original_storage(address, key)));
                    }
                    self.state_diff.insert(address, entry);
                }
            } else if exists {
                let balance = intra_block_state.get_balance(address);
                let code = intra_block_state.get_code(address);
                let nonce = intra_block_state.get_nonce(address);
                entry.balance = Delta::Added(balance);
                entry.code = Delta::Added(code.clone());
                entry.nonce = Delta::Added(U64::from(nonce));

                // touched but left effectively empty: not reported
                let mut to_be_removed = balance.is_zero() && code.is_empty() && nonce == 0;
                for key in storage_keys {
                    entry
                        .storage
                        .insert(key, Delta::Added(intra_block_state.get_current_storage(address, key)));
                    to_be_removed = false;
                }
                if !to_be_removed {
                    self.state_diff.insert(address, entry);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{call_message, MockIntraBlockState};
    use tracevm_primitives::{Bytes, U256};

    fn contract() -> Address {
        Address::from_low_u64_be(0xc0117ac7)
    }

    fn tracer_over(initial: MockIntraBlockState) -> StateDiffTracer {
        let state_addresses = Rc::new(RefCell::new(StateAddresses::new(Rc::new(initial))));
        StateDiffTracer::new(state_addresses)
    }

    fn record_sstore(tracer: &mut StateDiffTracer, address: Address, key: u64, value: u64) {
        let msg = call_message(0, 100_000, Address::zero(), address);
        let code = [opcode::SSTORE];
        let items = [U256::from(value), U256::from(key)];
        let stack = EvmStack::new(&items);
        let state = ExecutionState { code: &code, memory: &[], gas_left: 100_000, message: &msg };
        tracer.on_instruction_start(0, &stack, &state, &MockIntraBlockState::default());
    }

    #[test]
    fn storage_write_produces_a_changed_entry() {
        let key = H256::from_low_u64_be(1);
        let initial = MockIntraBlockState::default()
            .with_account(contract(), U256::from(10), 1, vec![0x00]);
        let mut tracer = tracer_over(initial);

        record_sstore(&mut tracer, contract(), 1, 0x42);

        let post = MockIntraBlockState::default()
            .with_account(contract(), U256::from(10), 1, vec![0x00])
            .with_current_storage(contract(), key, H256::from_low_u64_be(0x42))
            .with_touched(contract());
        tracer.on_reward_granted(&CallResult::default(), &post);

        let diff = tracer.take_state_diff();
        let entry = diff.get(&contract()).expect("contract must appear in the diff");
        assert!(entry.balance.is_unchanged());
        assert!(entry.nonce.is_unchanged());
        assert_eq!(
            entry.storage.get(&key),
            Some(&Delta::Changed(ChangedType {
                from: H256::zero(),
                to: H256::from_low_u64_be(0x42)
            }))
        );
    }

    #[test]
    fn storage_write_back_to_the_original_value_is_suppressed() {
        let key = H256::from_low_u64_be(1);
        let initial = MockIntraBlockState::default()
            .with_account(contract(), U256::from(10), 1, vec![0x00]);
        let mut tracer = tracer_over(initial);

        record_sstore(&mut tracer, contract(), 1, 0x42);

        // reverted (or overwritten back): original == current
        let post = MockIntraBlockState::default()
            .with_account(contract(), U256::from(10), 1, vec![0x00])
            .with_storage(contract(), key, H256::from_low_u64_be(0x7))
            .with_touched(contract());
        tracer.on_reward_granted(&CallResult::default(), &post);

        let diff = tracer.take_state_diff();
        assert!(diff.get(&contract()).is_none());
    }

    #[test]
    fn balance_change_is_reported() {
        let alice = Address::from_low_u64_be(0xa11ce);
        let initial = MockIntraBlockState::default()
            .with_account(alice, U256::from(1000), 0, vec![]);
        let mut tracer = tracer_over(initial);

        let post = MockIntraBlockState::default()
            .with_account(alice, U256::from(750), 1, vec![])
            .with_touched(alice);
        tracer.on_reward_granted(&CallResult::default(), &post);

        let diff = tracer.take_state_diff();
        let entry = diff.get(&alice).unwrap();
        assert_eq!(
            entry.balance,
            Delta::Changed(ChangedType { from: U256::from(1000), to: U256::from(750) })
        );
        assert_eq!(
            entry.nonce,
            Delta::Changed(ChangedType { from: U64::zero(), to: U64::one() })
        );
        assert!(entry.code.is_unchanged());
    }

    #[test]
    fn destroyed_account_emits_removed_entries() {
        let key = H256::from_low_u64_be(2);
        let initial = MockIntraBlockState::default()
            .with_account(contract(), U256::from(5), 1, vec![0xff]);
        let mut tracer = tracer_over(initial);

        record_sstore(&mut tracer, contract(), 2, 0);

        let post = MockIntraBlockState::default()
            .with_storage(contract(), key, H256::from_low_u64_be(0x9))
            .with_touched(contract());
        tracer.on_reward_granted(&CallResult::default(), &post);

        let diff = tracer.take_state_diff();
        let entry = diff.get(&contract()).unwrap();
        assert_eq!(entry.balance, Delta::Removed(U256::from(5)));
        assert_eq!(entry.code, Delta::Removed(Bytes::from(vec![0xff])));
        assert_eq!(entry.nonce, Delta::Removed(U64::one()));
        assert_eq!(entry.storage.get(&key), Some(&Delta::Removed(H256::from_low_u64_be(0x9))));
    }

    #[test]
    fn new_account_emits_added_entries() {
        let fresh = Address::from_low_u64_be(0xf4e54);
        let mut tracer = tracer_over(MockIntraBlockState::default());

        let post = MockIntraBlockState::default()
            .with_account(fresh, U256::from(9000), 1, vec![])
            .with_touched(fresh);
        tracer.on_reward_granted(&CallResult::default(), &post);

        let diff = tracer.take_state_diff();
        let entry = diff.get(&fresh).unwrap();
        assert_eq!(entry.balance, Delta::Added(U256::from(9000)));
        assert_eq!(entry.nonce, Delta::Added(U64::one()));
    }

    #[test]
    fn touched_but_empty_new_account_is_suppressed() {
        let fresh = Address::from_low_u64_be(0xf4e54);
        let mut tracer = tracer_over(MockIntraBlockState::default());

        let post = MockIntraBlockState::default()
            .with_account(fresh, U256::zero(), 0, vec![])
            .with_touched(fresh);
        tracer.on_reward_granted(&CallResult::default(), &post);

        assert!(tracer.take_state_diff().is_empty());
    }

    #[test]
    fn empty_new_account_with_storage_write_survives() {
        let key = H256::from_low_u64_be(3);
        let fresh = Address::from_low_u64_be(0xf4e54);
        let mut tracer = tracer_over(MockIntraBlockState::default());

        record_sstore(&mut tracer, fresh, 3, 0x1);

        let post = MockIntraBlockState::default()
            .with_account(fresh, U256::zero(), 0, vec![])
            .with_current_storage(fresh, key, H256::from_low_u64_be(0x1))
            .with_touched(fresh);
        tracer.on_reward_granted(&CallResult::default(), &post);

        let diff = tracer.take_state_diff();
        let entry = diff.get(&fresh).unwrap();
        assert_eq!(entry.storage.get(&key), Some(&Delta::Added(H256::from_low_u64_be(0x1))));
    }

    #[test]
    fn untouched_addresses_never_appear() {
        let initial = MockIntraBlockState::default()
            .with_account(contract(), U256::from(10), 1, vec![]);
        let mut tracer = tracer_over(initial);

        let post = MockIntraBlockState::default()
            .with_account(contract(), U256::from(999), 1, vec![]);
        tracer.on_reward_granted(&CallResult::default(), &post);

        assert!(tracer.take_state_diff().is_empty());
    }
}
