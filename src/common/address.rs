use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::common::{decode, hash::keccak256, rlp, word::Word};

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("invalid address")]
    Invalid,
}

#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|byte| byte == &0)
    }

    /// CREATE address derivation: `keccak256(rlp([sender, nonce]))[12..]`.
    pub fn create(&self, nonce: u64) -> Address {
        let mut nonce_word = [0u8; 32];
        nonce_word[24..].copy_from_slice(&nonce.to_be_bytes());
        let encoded = rlp::encode_list(&[
            rlp::encode_bytes(&self.0),
            rlp::encode_uint(&nonce_word),
        ]);
        let hash = keccak256(&encoded);
        Address::from_hash(&hash)
    }

    /// CREATE2 address derivation:
    /// `keccak256(0xff ++ sender ++ salt ++ keccak256(initcode))[12..]`.
    pub fn create2(&self, salt: &Word, initcode: &[u8]) -> Address {
        let mut buffer = Vec::with_capacity(1 + 20 + 32 + 32);
        buffer.push(0xffu8);
        buffer.extend_from_slice(&self.0);
        buffer.extend_from_slice(&salt.into_bytes());
        buffer.extend_from_slice(&keccak256(initcode));
        Address::from_hash(&keccak256(&buffer))
    }

    fn from_hash(hash: &[u8; 32]) -> Address {
        let mut ret = Address::default();
        ret.0.copy_from_slice(&hash[12..]);
        ret
    }

    pub fn as_word(&self) -> Word {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(&self.0);
        Word::from_bytes(&bytes)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl From<&Address> for Word {
    fn from(value: &Address) -> Self {
        value.as_word()
    }
}

impl From<&Word> for Address {
    fn from(value: &Word) -> Self {
        let bytes = value.into_bytes();
        let mut ret = Address::default();
        ret.0.copy_from_slice(&bytes[12..]);
        ret
    }
}

impl From<[u8; 20]> for Address {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim_start_matches("0x");
        if value.len() != 40 {
            return Err(AddressError::Invalid);
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| AddressError::Invalid)?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let hex: String = Deserialize::deserialize(deserializer)?;
        Address::try_from(hex.as_str())
            .map_err(|_| D::Error::custom(format!("invalid address '{hex}'")))
    }
}

/// Address literal helper for full-width hex strings.
pub const fn addr(s: &str) -> Address {
    Address(decode(s))
}
