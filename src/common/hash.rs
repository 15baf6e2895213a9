use crate::common::{decode, word::Word};

pub fn keccak256(input: &[u8]) -> [u8; 32] {
    use tiny_keccak::Hasher;
    let mut keccak = tiny_keccak::Keccak::v256();
    let mut ret = [0u8; 32];
    keccak.update(input);
    keccak.finalize(&mut ret);
    ret
}

/// keccak256 of the empty byte string, the code hash of codeless accounts.
pub const fn empty_code() -> [u8; 32] {
    decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
}

/// keccak256 of the empty RLP list, the storage-root placeholder carried by
/// every account record while no trie is maintained.
pub const fn empty_root() -> [u8; 32] {
    decode("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421")
}

pub fn empty_code_hash() -> Word {
    Word::from_bytes(&empty_code())
}

pub fn empty_root_hash() -> Word {
    Word::from_bytes(&empty_root())
}
