use serde::{Deserialize, Serialize};

use crate::common::{address::Address, word::Word};

/// The block environment a transaction executes in, read-only for the whole
/// transaction. Feeds the BLOCK* opcode family.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockContext {
    pub number: Word,
    pub timestamp: Word,
    pub coinbase: Address,
    pub base_fee: Word,
    pub chain_id: Word,
    pub gas_limit: Word,
    pub prevrandao: Word,
    pub blob_base_fee: Word,
    pub blob_hashes: Vec<Word>,
}
