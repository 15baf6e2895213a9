use thiserror::Error;

use crate::common::{address::Address, word::Word};
use crate::precompiles::PrecompileError;

/// Every way a frame can halt abnormally. `Revert` is the one kind that
/// keeps its output; all others erase it.
#[derive(Error, Debug)]
pub enum VmError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid jump destination {0:#x}")]
    InvalidJumpDestination(usize),
    #[error("invalid instruction 0x{0:02x}")]
    InvalidInstruction(u8),
    #[error("return data read out of bounds: {end} > {size}")]
    OutOfBoundsRead { end: usize, size: usize },
    #[error("state mutation inside a static call")]
    StaticViolation,
    #[error("value transfer inside a static call")]
    WriteProtection,
    #[error("call depth limit exceeded")]
    DepthExceeded,
    #[error("insufficient balance: have {have:#x}, need {need:#x}")]
    InsufficientBalance { have: Word, need: Word },
    #[error("contract creation collision at {0}")]
    CreationCollision(Address),
    #[error("deployed code too large: {0} bytes")]
    CodeTooLarge(usize),
    #[error("deployed code starts with 0xef")]
    InvalidCodeFirstByte,
    #[error("memory request past the engine limit: {0} bytes")]
    OutOfMemory(usize),
    #[error("reverted")]
    Revert,
    #[error("precompile failure: {0}")]
    Precompile(#[from] PrecompileError),
    #[error(transparent)]
    Backend(#[from] eyre::Report),
}

impl VmError {
    /// REVERT hands its payload to the caller; every other halt erases it.
    pub fn erases_output(&self) -> bool {
        !matches!(self, VmError::Revert)
    }
}
