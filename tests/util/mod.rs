#![allow(dead_code)]

use armature::Outcome;
use armature::common::{Address, Word, addr, block::BlockContext};
use armature::db::MemoryBackend;
use armature::execute_bytecode;
use armature::state::State;

pub const SENDER: Address = addr("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
pub const CONTRACT: Address = addr("0xe7f1725e7734ce288f8367e1bb143e90bb3f0512");
pub const OTHER: Address = addr("0x5c2e112783a6854653b4bc7dc22248d3e592559c");

// opcode bytes the tests assemble by hand
pub const STOP: u8 = 0x00;
pub const ADDMOD: u8 = 0x08;
pub const ISZERO: u8 = 0x15;
pub const SHA3: u8 = 0x20;
pub const CALLER: u8 = 0x33;
pub const RETURNDATASIZE: u8 = 0x3d;
pub const RETURNDATACOPY: u8 = 0x3e;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const MSIZE: u8 = 0x59;
pub const GAS: u8 = 0x5a;
pub const JUMPDEST: u8 = 0x5b;
pub const TLOAD: u8 = 0x5c;
pub const TSTORE: u8 = 0x5d;
pub const LOG0: u8 = 0xa0;
pub const LOG2: u8 = 0xa2;
pub const CREATE: u8 = 0xf0;
pub const CALL: u8 = 0xf1;
pub const RETURN: u8 = 0xf3;
pub const DELEGATECALL: u8 = 0xf4;
pub const CREATE2: u8 = 0xf5;
pub const STATICCALL: u8 = 0xfa;
pub const REVERT: u8 = 0xfd;
pub const SELFDESTRUCT: u8 = 0xff;

/// Tiny bytecode assembler for readable test programs.
pub struct Asm {
    bytes: Vec<u8>,
}

impl Asm {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn op(mut self, byte: u8) -> Self {
        self.bytes.push(byte);
        self
    }

    /// Minimal-width PUSH of an integer.
    pub fn push(self, value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(7);
        self.push_slice(&bytes[start..])
    }

    /// PUSH_n of an explicit byte string (1..=32 bytes).
    pub fn push_slice(mut self, data: &[u8]) -> Self {
        assert!(!data.is_empty() && data.len() <= 32);
        self.bytes.push(0x60 + data.len() as u8 - 1);
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn push_addr(self, address: &Address) -> Self {
        self.push_slice(&address.0)
    }

    pub fn raw(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn block_context() -> BlockContext {
    BlockContext {
        number: Word::from(19_000_000u64),
        timestamp: Word::from(1_700_000_000u64),
        coinbase: OTHER,
        base_fee: Word::from(7u64),
        chain_id: Word::one(),
        gas_limit: Word::from(30_000_000u64),
        prevrandao: Word::from(0x9e3779b97f4a7c15u64),
        blob_base_fee: Word::one(),
        blob_hashes: Vec::new(),
    }
}

pub fn fresh_state() -> State<MemoryBackend> {
    State::new(MemoryBackend::new(), block_context())
}

/// Install `code` at CONTRACT and call it from SENDER with `data`.
pub fn run_code(code: Vec<u8>, data: Vec<u8>) -> (Outcome, State<MemoryBackend>) {
    let mut state = fresh_state();
    state.set_code(&CONTRACT, &code).unwrap();
    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        data,
        Vec::new(),
    )
    .unwrap();
    (outcome, state)
}

/// The output interpreted as a sequence of 32-byte words.
pub fn output_words(outcome: &Outcome) -> Vec<Word> {
    assert!(outcome.output.len() % 32 == 0, "ragged output");
    outcome.output.chunks(32).map(Word::from_bytes).collect()
}
