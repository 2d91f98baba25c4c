//! Types crossing the tracer callback boundary.
//!
//! These mirror the interpreter-side structures a tracer observes: the call
//! message, the live execution state of the current frame, the value stack
//! and the terminal result of a frame.

use tracevm_primitives::{Address, Bytes, U256};

/// EVM revision the interpreter runs under.
///
/// Ordered chronologically so revisions compare with `<=`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Revision {
    Frontier,
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
}

impl Revision {
    /// The most recent supported revision.
    pub const fn latest() -> Self {
        Revision::Shanghai
    }
}

/// The kind of call-like instruction that entered the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    DelegateCall,
    CallCode,
    Create,
    Create2,
}

/// Status of a finished frame or transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    Failure,
    Revert,
    OutOfGas,
    InvalidInstruction,
    UndefinedInstruction,
    StackOverflow,
    StackUnderflow,
    BadJumpDestination,
    InvalidMemoryAccess,
    CallDepthExceeded,
    StaticModeViolation,
    PrecompileFailure,
    ContractValidationFailure,
    ArgumentOutOfRange,
    InsufficientBalance,
    InternalError,
}

/// The message that entered the current frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// How the frame was entered.
    pub kind: CallKind,
    /// Whether the frame executes under the STATIC flag.
    pub is_static: bool,
    /// Call depth, 0 for the outermost frame of a transaction.
    pub depth: i32,
    /// Gas available to this frame.
    pub gas: i64,
    /// Account whose storage the frame operates on.
    pub recipient: Address,
    /// The caller.
    pub sender: Address,
    /// Account the executed code belongs to; differs from `recipient` for
    /// `DELEGATECALL` and `CALLCODE`.
    pub code_address: Address,
    /// Input data of the call, init code excluded.
    pub input: Bytes,
    /// Value transferred with the message.
    pub value: U256,
}

/// Terminal result of a frame (`on_execution_end`) or of a whole transaction
/// (`on_reward_granted`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult {
    pub status_code: StatusCode,
    /// Gas left when the frame returned.
    pub gas_left: i64,
    /// Return data, deployed code for create frames.
    pub data: Bytes,
}

impl Default for CallResult {
    fn default() -> Self {
        Self { status_code: StatusCode::Success, gas_left: 0, data: Bytes::new() }
    }
}

/// Read-only view of the interpreter state of the current frame, valid for
/// the duration of a single callback.
#[derive(Debug)]
pub struct ExecutionState<'a> {
    /// Code being executed in this frame.
    pub code: &'a [u8],
    /// Linear memory of the frame.
    pub memory: &'a [u8],
    /// Gas remaining before the current instruction executes.
    pub gas_left: i64,
    /// The message that entered this frame.
    pub message: &'a Message,
}

/// View of the EVM value stack, ordered bottom to top.
#[derive(Clone, Copy, Debug)]
pub struct EvmStack<'a> {
    items: &'a [U256],
}

impl<'a> EvmStack<'a> {
    /// Creates a stack view over `items`, where the last element is the top.
    pub fn new(items: &'a [U256]) -> Self {
        Self { items }
    }

    /// Number of items on the stack.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the stack holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item `n` positions below the top; `peek(0)` is the top.
    pub fn peek(&self, n: usize) -> Option<U256> {
        self.items.len().checked_sub(n + 1).map(|i| self.items[i])
    }
}
