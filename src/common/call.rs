use crate::common::{address::Address, word::Word};

/// One call frame's view of who called it, where its storage lives, and
/// which code it runs. `target` and `code_address` differ for CALLCODE and
/// DELEGATECALL, which execute foreign code against the caller's storage.
#[derive(Clone, Debug, Default)]
pub struct Message {
    pub caller: Address,
    pub target: Address,
    pub code_address: Address,
    pub value: Word,
    pub data: Vec<u8>,
    pub code: Vec<u8>,
    pub depth: usize,
    pub is_static: bool,
    pub is_create: bool,
    /// DELEGATECALL carries the parent's value without moving it again.
    pub transfers_value: bool,
}
