//! EVM opcode constants, instruction names and the capture-effect tables the
//! tracers consult when an instruction starts.

use crate::types::{EvmStack, Revision};
use tracevm_primitives::U256;

pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const SDIV: u8 = 0x05;
pub const MOD: u8 = 0x06;
pub const SMOD: u8 = 0x07;
pub const ADDMOD: u8 = 0x08;
pub const MULMOD: u8 = 0x09;
pub const EXP: u8 = 0x0a;
pub const SIGNEXTEND: u8 = 0x0b;
pub const LT: u8 = 0x10;
pub const GT: u8 = 0x11;
pub const SLT: u8 = 0x12;
pub const SGT: u8 = 0x13;
pub const EQ: u8 = 0x14;
pub const ISZERO: u8 = 0x15;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const XOR: u8 = 0x18;
pub const NOT: u8 = 0x19;
pub const BYTE: u8 = 0x1a;
pub const SHL: u8 = 0x1b;
pub const SHR: u8 = 0x1c;
pub const SAR: u8 = 0x1d;
pub const KECCAK256: u8 = 0x20;
pub const ADDRESS: u8 = 0x30;
pub const BALANCE: u8 = 0x31;
pub const ORIGIN: u8 = 0x32;
pub const CALLER: u8 = 0x33;
pub const CALLVALUE: u8 = 0x34;
pub const CALLDATALOAD: u8 = 0x35;
pub const CALLDATASIZE: u8 = 0x36;
pub const CALLDATACOPY: u8 = 0x37;
pub const CODESIZE: u8 = 0x38;
pub const CODECOPY: u8 = 0x39;
pub const GASPRICE: u8 = 0x3a;
pub const EXTCODESIZE: u8 = 0x3b;
pub const EXTCODECOPY: u8 = 0x3c;
pub const RETURNDATASIZE: u8 = 0x3d;
pub const RETURNDATACOPY: u8 = 0x3e;
pub const EXTCODEHASH: u8 = 0x3f;
pub const BLOCKHASH: u8 = 0x40;
pub const COINBASE: u8 = 0x41;
pub const TIMESTAMP: u8 = 0x42;
pub const NUMBER: u8 = 0x43;
pub const DIFFICULTY: u8 = 0x44;
pub const GASLIMIT: u8 = 0x45;
pub const CHAINID: u8 = 0x46;
pub const SELFBALANCE: u8 = 0x47;
pub const BASEFEE: u8 = 0x48;
pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const PC: u8 = 0x58;
pub const MSIZE: u8 = 0x59;
pub const GAS: u8 = 0x5a;
pub const JUMPDEST: u8 = 0x5b;
pub const PUSH0: u8 = 0x5f;
pub const PUSH1: u8 = 0x60;
pub const PUSH32: u8 = 0x7f;
pub const DUP1: u8 = 0x80;
pub const DUP16: u8 = 0x8f;
pub const SWAP1: u8 = 0x90;
pub const SWAP16: u8 = 0x9f;
pub const LOG0: u8 = 0xa0;
pub const LOG4: u8 = 0xa4;
pub const CREATE: u8 = 0xf0;
pub const CALL: u8 = 0xf1;
pub const CALLCODE: u8 = 0xf2;
pub const RETURN: u8 = 0xf3;
pub const DELEGATECALL: u8 = 0xf4;
pub const CREATE2: u8 = 0xf5;
pub const STATICCALL: u8 = 0xfa;
pub const REVERT: u8 = 0xfd;
pub const INVALID: u8 = 0xfe;
pub const SELFDESTRUCT: u8 = 0xff;

/// Returns the instruction name under the given revision, or `None` when the
/// opcode is not defined there.
pub fn instruction_name(rev: Revision, opcode: u8) -> Option<&'static str> {
    if opcode == DIFFICULTY && rev >= Revision::Paris {
        return Some("PREVRANDAO")
    }
    let (name, introduced_in) = instruction_info(opcode)?;
    (introduced_in <= rev).then_some(name)
}

/// Name of the instruction, or the `opcode 0x… not defined` placeholder the
/// RPC surface reports for undefined bytes.
pub fn instruction_name_or_undefined(rev: Revision, opcode: u8) -> String {
    match instruction_name(rev, opcode) {
        Some(name) => name.to_string(),
        None => format!("opcode 0x{opcode:x} not defined"),
    }
}

fn instruction_info(opcode: u8) -> Option<(&'static str, Revision)> {
    use Revision::*;
    let info = match opcode {
        STOP => ("STOP", Frontier),
        ADD => ("ADD", Frontier),
        MUL => ("MUL", Frontier),
        SUB => ("SUB", Frontier),
        DIV => ("DIV", Frontier),
        SDIV => ("SDIV", Frontier),
        MOD => ("MOD", Frontier),
        SMOD => ("SMOD", Frontier),
        ADDMOD => ("ADDMOD", Frontier),
        MULMOD => ("MULMOD", Frontier),
        EXP => ("EXP", Frontier),
        SIGNEXTEND => ("SIGNEXTEND", Frontier),
        LT => ("LT", Frontier),
        GT => ("GT", Frontier),
        SLT => ("SLT", Frontier),
        SGT => ("SGT", Frontier),
        EQ => ("EQ", Frontier),
        ISZERO => ("ISZERO", Frontier),
        AND => ("AND", Frontier),
        OR => ("OR", Frontier),
        XOR => ("XOR", Frontier),
        NOT => ("NOT", Frontier),
        BYTE => ("BYTE", Frontier),
        SHL => ("SHL", Constantinople),
        SHR => ("SHR", Constantinople),
        SAR => ("SAR", Constantinople),
        KECCAK256 => ("KECCAK256", Frontier),
        ADDRESS => ("ADDRESS", Frontier),
        BALANCE => ("BALANCE", Frontier),
        ORIGIN => ("ORIGIN", Frontier),
        CALLER => ("CALLER", Frontier),
        CALLVALUE => ("CALLVALUE", Frontier),
        CALLDATALOAD => ("CALLDATALOAD", Frontier),
        CALLDATASIZE => ("CALLDATASIZE", Frontier),
        CALLDATACOPY => ("CALLDATACOPY", Frontier),
        CODESIZE => ("CODESIZE", Frontier),
        CODECOPY => ("CODECOPY", Frontier),
        GASPRICE => ("GASPRICE", Frontier),
        EXTCODESIZE => ("EXTCODESIZE", Frontier),
        EXTCODECOPY => ("EXTCODECOPY", Frontier),
        RETURNDATASIZE => ("RETURNDATASIZE", Byzantium),
        RETURNDATACOPY => ("RETURNDATACOPY", Byzantium),
        EXTCODEHASH => ("EXTCODEHASH", Constantinople),
        BLOCKHASH => ("BLOCKHASH", Frontier),
        COINBASE => ("COINBASE", Frontier),
        TIMESTAMP => ("TIMESTAMP", Frontier),
        NUMBER => ("NUMBER", Frontier),
        DIFFICULTY => ("DIFFICULTY", Frontier),
        GASLIMIT => ("GASLIMIT", Frontier),
        CHAINID => ("CHAINID", Istanbul),
        SELFBALANCE => ("SELFBALANCE", Istanbul),
        BASEFEE => ("BASEFEE", London),
        POP => ("POP", Frontier),
        MLOAD => ("MLOAD", Frontier),
        MSTORE => ("MSTORE", Frontier),
        MSTORE8 => ("MSTORE8", Frontier),
        SLOAD => ("SLOAD", Frontier),
        SSTORE => ("SSTORE", Frontier),
        JUMP => ("JUMP", Frontier),
        JUMPI => ("JUMPI", Frontier),
        PC => ("PC", Frontier),
        MSIZE => ("MSIZE", Frontier),
        GAS => ("GAS", Frontier),
        JUMPDEST => ("JUMPDEST", Frontier),
        PUSH0 => ("PUSH0", Shanghai),
        0x60 => ("PUSH1", Frontier),
        0x61 => ("PUSH2", Frontier),
        0x62 => ("PUSH3", Frontier),
        0x63 => ("PUSH4", Frontier),
        0x64 => ("PUSH5", Frontier),
        0x65 => ("PUSH6", Frontier),
        0x66 => ("PUSH7", Frontier),
        0x67 => ("PUSH8", Frontier),
        0x68 => ("PUSH9", Frontier),
        0x69 => ("PUSH10", Frontier),
        0x6a => ("PUSH11", Frontier),
        0x6b => ("PUSH12", Frontier),
        0x6c => ("PUSH13", Frontier),
        0x6d => ("PUSH14", Frontier),
        0x6e => ("PUSH15", Frontier),
        0x6f => ("PUSH16", Frontier),
        0x70 => ("PUSH17", Frontier),
        0x71 => ("PUSH18", Frontier),
        0x72 => ("PUSH19", Frontier),
        0x73 => ("PUSH20", Frontier),
        0x74 => ("PUSH21", Frontier),
        0x75 => ("PUSH22", Frontier),
        0x76 => ("PUSH23", Frontier),
        0x77 => ("PUSH24", Frontier),
        0x78 => ("PUSH25", Frontier),
        0x79 => ("PUSH26", Frontier),
        0x7a => ("PUSH27", Frontier),
        0x7b => ("PUSH28", Frontier),
        0x7c => ("PUSH29", Frontier),
        0x7d => ("PUSH30", Frontier),
        0x7e => ("PUSH31", Frontier),
        0x7f => ("PUSH32", Frontier),
        0x80 => ("DUP1", Frontier),
        0x81 => ("DUP2", Frontier),
        0x82 => ("DUP3", Frontier),
        0x83 => ("DUP4", Frontier),
        0x84 => ("DUP5", Frontier),
        0x85 => ("DUP6", Frontier),
        0x86 => ("DUP7", Frontier),
        0x87 => ("DUP8", Frontier),
        0x88 => ("DUP9", Frontier),
        0x89 => ("DUP10", Frontier),
        0x8a => ("DUP11", Frontier),
        0x8b => ("DUP12", Frontier),
        0x8c => ("DUP13", Frontier),
        0x8d => ("DUP14", Frontier),
        0x8e => ("DUP15", Frontier),
        0x8f => ("DUP16", Frontier),
        0x90 => ("SWAP1", Frontier),
        0x91 => ("SWAP2", Frontier),
        0x92 => ("SWAP3", Frontier),
        0x93 => ("SWAP4", Frontier),
        0x94 => ("SWAP5", Frontier),
        0x95 => ("SWAP6", Frontier),
        0x96 => ("SWAP7", Frontier),
        0x97 => ("SWAP8", Frontier),
        0x98 => ("SWAP9", Frontier),
        0x99 => ("SWAP10", Frontier),
        0x9a => ("SWAP11", Frontier),
        0x9b => ("SWAP12", Frontier),
        0x9c => ("SWAP13", Frontier),
        0x9d => ("SWAP14", Frontier),
        0x9e => ("SWAP15", Frontier),
        0x9f => ("SWAP16", Frontier),
        0xa0 => ("LOG0", Frontier),
        0xa1 => ("LOG1", Frontier),
        0xa2 => ("LOG2", Frontier),
        0xa3 => ("LOG3", Frontier),
        0xa4 => ("LOG4", Frontier),
        CREATE => ("CREATE", Frontier),
        CALL => ("CALL", Frontier),
        CALLCODE => ("CALLCODE", Frontier),
        RETURN => ("RETURN", Frontier),
        DELEGATECALL => ("DELEGATECALL", Homestead),
        CREATE2 => ("CREATE2", Constantinople),
        STATICCALL => ("STATICCALL", Byzantium),
        REVERT => ("REVERT", Byzantium),
        INVALID => ("INVALID", Frontier),
        SELFDESTRUCT => ("SELFDESTRUCT", Frontier),
        _ => return None,
    };
    Some(info)
}

/// How many values pushed by the instruction the VM trace snapshots once the
/// instruction has executed.
pub fn stack_capture_count(opcode: u8) -> usize {
    match opcode {
        PUSH1..=PUSH32 => 1,
        SWAP1..=SWAP16 => (opcode - SWAP1) as usize + 2,
        DUP1..=DUP16 => (opcode - DUP1) as usize + 2,
        CALLDATALOAD | SLOAD | MLOAD | CALLDATASIZE | LT | GT | DIV | SDIV | SAR | AND | EQ |
        CALLVALUE | ISZERO | ADD | EXP | CALLER | KECCAK256 | SUB | ADDRESS | GAS | MUL |
        RETURNDATASIZE | NOT | SHR | SHL | EXTCODESIZE | SLT | OR | NUMBER | PC | TIMESTAMP |
        BALANCE | SELFBALANCE | MULMOD | ADDMOD | BASEFEE | BLOCKHASH | BYTE | XOR | ORIGIN |
        CODESIZE | MOD | SIGNEXTEND | GASLIMIT | SGT | GASPRICE | MSIZE | EXTCODEHASH |
        STATICCALL | DELEGATECALL | CALL | CALLCODE | CREATE | CREATE2 => 1,
        _ => 0,
    }
}

/// The memory window `(offset, length)` the instruction is about to touch,
/// derived from its stack arguments. The window contents are materialized on
/// the next instruction, once the write has landed.
pub fn memory_window(opcode: u8, stack: &EvmStack<'_>) -> Option<(u64, u64)> {
    match opcode {
        MSTORE | MLOAD => Some((stack.peek(0)?.low_u64(), 32)),
        MSTORE8 => Some((stack.peek(0)?.low_u64(), 1)),
        RETURNDATACOPY | CALLDATACOPY | CODECOPY => {
            Some((stack.peek(0)?.low_u64(), stack.peek(2)?.low_u64()))
        }
        STATICCALL | DELEGATECALL => Some((stack.peek(4)?.low_u64(), stack.peek(5)?.low_u64())),
        CALL | CALLCODE => Some((stack.peek(5)?.low_u64(), stack.peek(6)?.low_u64())),
        CREATE | CREATE2 => Some((0, 0)),
        _ => None,
    }
}

/// The storage write `(key, value)` performed by an `SSTORE`.
pub fn storage_write(opcode: u8, stack: &EvmStack<'_>) -> Option<(U256, U256)> {
    if opcode == SSTORE {
        return Some((stack.peek(0)?, stack.peek(1)?))
    }
    None
}
