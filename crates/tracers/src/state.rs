use crate::{tracer::EvmTracer, types::CallResult};
use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    rc::Rc,
};
use tracevm_primitives::{Address, Bytes, H256, U256};

/// Read access to the per-transaction view of the Ethereum world state,
/// including the journal of changes since the block started.
///
/// Implemented by the executor's state; tracers only ever read through it.
pub trait IntraBlockState {
    /// Whether the account exists.
    fn exists(&self, address: Address) -> bool;

    /// Current balance of the account.
    fn get_balance(&self, address: Address) -> U256;

    /// Current nonce of the account.
    fn get_nonce(&self, address: Address) -> u64;

    /// Current code of the account.
    fn get_code(&self, address: Address) -> Bytes;

    /// Storage value as of the beginning of the transaction.
    fn get_original_storage(&self, address: Address, key: H256) -> H256;

    /// Storage value as currently journaled.
    fn get_current_storage(&self, address: Address, key: H256) -> H256;

    /// Addresses touched during the transaction, in deterministic order.
    fn touched(&self) -> BTreeSet<Address>;
}

/// Shadow baseline of balance/nonce/code per touched address.
///
/// Reads fall back to the initial pre-block snapshot until an override is
/// stored; [IntraBlockStateTracer] overwrites entries with post-transaction
/// values after every transaction, so that the state diff of transaction
/// `n + 1` is computed against the state left behind by transaction `n`.
pub struct StateAddresses {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    codes: HashMap<Address, Bytes>,
    initial: Rc<dyn IntraBlockState>,
}

impl std::fmt::Debug for StateAddresses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateAddresses")
            .field("balances", &self.balances)
            .field("nonces", &self.nonces)
            .field("codes", &self.codes)
            .finish_non_exhaustive()
    }
}

impl StateAddresses {
    /// Creates a shadow state over the given pre-block snapshot.
    pub fn new(initial: Rc<dyn IntraBlockState>) -> Self {
        Self { balances: HashMap::new(), nonces: HashMap::new(), codes: HashMap::new(), initial }
    }

    /// Whether the address exists in the shadow state.
    pub fn exists(&self, address: Address) -> bool {
        if self.balances.contains_key(&address) ||
            self.nonces.contains_key(&address) ||
            self.codes.contains_key(&address)
        {
            return true
        }
        self.initial.exists(address)
    }

    /// Balance of the address in the shadow state.
    pub fn get_balance(&self, address: Address) -> U256 {
        if let Some(balance) = self.balances.get(&address) {
            return *balance
        }
        self.initial.get_balance(address)
    }

    /// Nonce of the address in the shadow state.
    pub fn get_nonce(&self, address: Address) -> u64 {
        if let Some(nonce) = self.nonces.get(&address) {
            return *nonce
        }
        self.initial.get_nonce(address)
    }

    /// Code of the address in the shadow state.
    pub fn get_code(&self, address: Address) -> Bytes {
        if let Some(code) = self.codes.get(&address) {
            return code.clone()
        }
        self.initial.get_code(address)
    }

    /// Stores a balance override.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.balances.insert(address, balance);
    }

    /// Stores a nonce override.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.nonces.insert(address, nonce);
    }

    /// Stores a code override.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.codes.insert(address, code);
    }
}

/// Folds the intra-block state of a finished transaction back into the shared
/// [StateAddresses], producing the baseline for the next transaction.
#[derive(Debug)]
pub struct IntraBlockStateTracer {
    state_addresses: Rc<RefCell<StateAddresses>>,
}

impl IntraBlockStateTracer {
    /// Creates a tracer writing into the given shadow state.
    pub fn new(state_addresses: Rc<RefCell<StateAddresses>>) -> Self {
        Self { state_addresses }
    }
}

impl EvmTracer for IntraBlockStateTracer {
    fn on_reward_granted(&mut self, result: &CallResult, intra_block_state: &dyn IntraBlockState) {
        let touched = intra_block_state.touched();
        tracing::debug!(
            target: "trace::state",
            status = ?result.status_code,
            gas_left = result.gas_left,
            touched = touched.len(),
            "absorbing post-transaction state"
        );

        let mut state_addresses = self.state_addresses.borrow_mut();
        for address in touched {
            state_addresses.set_balance(address, intra_block_state.get_balance(address));
            state_addresses.set_nonce(address, intra_block_state.get_nonce(address));
            state_addresses.set_code(address, intra_block_state.get_code(address));
        }
    }
}
