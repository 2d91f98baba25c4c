//! Helpers shared by tracer tests.

use crate::{
    state::IntraBlockState,
    types::{CallKind, Message},
};
use std::collections::{BTreeSet, HashMap};
use tracevm_primitives::{Address, Bytes, H256, U256};

/// In-memory [IntraBlockState] with builder-style setup.
#[derive(Debug, Clone, Default)]
pub struct MockIntraBlockState {
    accounts: HashMap<Address, (U256, u64, Bytes)>,
    original_storage: HashMap<(Address, H256), H256>,
    current_storage: HashMap<(Address, H256), H256>,
    touched: BTreeSet<Address>,
}

impl MockIntraBlockState {
    /// Adds an account with the given balance, nonce and code.
    pub fn with_account(
        mut self,
        address: Address,
        balance: U256,
        nonce: u64,
        code: impl Into<Bytes>,
    ) -> Self {
        self.accounts.insert(address, (balance, nonce, code.into()));
        self
    }

    /// Sets the storage value both as original and current.
    pub fn with_storage(mut self, address: Address, key: H256, value: H256) -> Self {
        self.original_storage.insert((address, key), value);
        self.current_storage.insert((address, key), value);
        self
    }

    /// Sets the current (journaled) storage value only.
    pub fn with_current_storage(mut self, address: Address, key: H256, value: H256) -> Self {
        self.current_storage.insert((address, key), value);
        self
    }

    /// Marks an address as touched.
    pub fn with_touched(mut self, address: Address) -> Self {
        self.touched.insert(address);
        self
    }

    /// Removes an account, keeping any recorded storage.
    pub fn without_account(mut self, address: Address) -> Self {
        self.accounts.remove(&address);
        self
    }
}

impl IntraBlockState for MockIntraBlockState {
    fn exists(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    fn get_balance(&self, address: Address) -> U256 {
        self.accounts.get(&address).map(|(balance, _, _)| *balance).unwrap_or_default()
    }

    fn get_nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map(|(_, nonce, _)| *nonce).unwrap_or_default()
    }

    fn get_code(&self, address: Address) -> Bytes {
        self.accounts.get(&address).map(|(_, _, code)| code.clone()).unwrap_or_default()
    }

    fn get_original_storage(&self, address: Address, key: H256) -> H256 {
        self.original_storage.get(&(address, key)).copied().unwrap_or_default()
    }

    fn get_current_storage(&self, address: Address, key: H256) -> H256 {
        self.current_storage.get(&(address, key)).copied().unwrap_or_default()
    }

    fn touched(&self) -> BTreeSet<Address> {
        self.touched.clone()
    }
}

/// A call message with sane defaults for driving tracers by hand.
pub fn call_message(depth: i32, gas: i64, sender: Address, recipient: Address) -> Message {
    Message {
        kind: CallKind::Call,
        is_static: false,
        depth,
        gas,
        recipient,
        sender,
        code_address: recipient,
        input: Bytes::new(),
        value: U256::zero(),
    }
}
