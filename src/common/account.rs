use crate::common::{
    hash::{empty_code_hash, empty_root_hash},
    rlp::{self, RlpError},
    word::Word,
};

/// Canonical account record: `rlp([nonce, balance, storage_root, code_hash])`.
/// The storage root is a fixed placeholder while no trie is maintained.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountRecord {
    pub nonce: u64,
    pub balance: Word,
    pub storage_root: Word,
    pub code_hash: Word,
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: Word::zero(),
            storage_root: empty_root_hash(),
            code_hash: empty_code_hash(),
        }
    }
}

impl AccountRecord {
    /// EIP-161 emptiness: no nonce, no balance, no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == empty_code_hash()
    }

    pub fn has_code_or_nonce(&self) -> bool {
        self.nonce != 0 || self.code_hash != empty_code_hash()
    }

    pub fn to_rlp(&self) -> Vec<u8> {
        rlp::encode_list(&[
            rlp::encode_uint(&Word::from(self.nonce).into_bytes()),
            rlp::encode_uint(&self.balance.into_bytes()),
            rlp::encode_bytes(&self.storage_root.into_bytes()),
            rlp::encode_bytes(&self.code_hash.into_bytes()),
        ])
    }

    pub fn from_rlp(data: &[u8]) -> Result<Self, RlpError> {
        let items = rlp::decode_list(data)?;
        let [nonce, balance, storage_root, code_hash] = items.as_slice() else {
            return Err(RlpError::NonCanonical);
        };
        if nonce.len() > 8 || balance.len() > 32 {
            return Err(RlpError::NonCanonical);
        }
        if storage_root.len() != 32 || code_hash.len() != 32 {
            return Err(RlpError::NonCanonical);
        }
        Ok(Self {
            nonce: Word::from_bytes(nonce).as_u64(),
            balance: Word::from_bytes(balance),
            storage_root: Word::from_bytes(storage_root),
            code_hash: Word::from_bytes(code_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let record = AccountRecord::default();
        assert!(record.is_empty());
        assert!(!record.has_code_or_nonce());
    }

    #[test]
    fn test_rlp_round_trip() {
        let record = AccountRecord {
            nonce: 1627,
            balance: Word::from(1_000_000_000_000_000_000u64),
            ..Default::default()
        };
        let encoded = record.to_rlp();
        assert_eq!(AccountRecord::from_rlp(&encoded).unwrap(), record);
    }

    #[test]
    fn test_rlp_rejects_wrong_arity() {
        let three = rlp::encode_list(&[
            rlp::encode_uint(&Word::zero().into_bytes()),
            rlp::encode_uint(&Word::zero().into_bytes()),
            rlp::encode_bytes(&[0u8; 32]),
        ]);
        assert!(AccountRecord::from_rlp(&three).is_err());
    }
}
