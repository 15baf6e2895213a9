use std::ops::{BitAnd, BitOr, BitXor, Shl, Shr};

use i256::I256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

type U256 = primitive_types::U256;
type U512 = primitive_types::U512;

/// A 256-bit EVM machine word. Arithmetic wraps modulo 2^256; signed
/// operations reinterpret the bits as two's complement.
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Word(U256);

impl Word {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn one() -> Self {
        Self(U256::one())
    }

    pub fn max() -> Self {
        Self(U256::max_value())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(U256::from_big_endian(bytes))
    }

    pub fn into_bytes(&self) -> [u8; 32] {
        self.0.to_big_endian()
    }

    pub fn bit(&self, index: usize) -> bool {
        self.0.bit(index)
    }

    pub fn as_u64(&self) -> u64 {
        self.0.as_u64()
    }

    /// Lossless conversion to `usize`, `None` when the value does not fit.
    pub fn to_usize(&self) -> Option<usize> {
        if self.0 > U256::from(usize::MAX) {
            None
        } else {
            Some(self.0.as_usize())
        }
    }

    pub fn from_hex(hex: &str) -> eyre::Result<Self> {
        let hex = hex.trim_start_matches("0x");
        let word = U256::from_str_radix(hex, 16)
            .map_err(|_| eyre::eyre!("Invalid 256-bit word: '{hex}'."))?;
        Ok(Self(word))
    }

    pub fn saturating_sub(&self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    pub fn overflowing_add(&self, rhs: Self) -> (Self, bool) {
        let (word, flag) = self.0.overflowing_add(rhs.0);
        (Self(word), flag)
    }

    pub fn overflowing_sub(&self, rhs: Self) -> (Self, bool) {
        let (word, flag) = self.0.overflowing_sub(rhs.0);
        (Self(word), flag)
    }

    pub fn overflowing_mul(&self, rhs: Self) -> (Self, bool) {
        let (word, flag) = self.0.overflowing_mul(rhs.0);
        (Self(word), flag)
    }

    /// Signed division truncating toward zero. Division by zero yields zero
    /// and `MIN / -1` stays `MIN`.
    pub fn sdiv(&self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return Self::zero();
        }
        let a = I256::from_be_bytes(self.into_bytes());
        let b = I256::from_be_bytes(rhs.into_bytes());
        let res = if a == I256::MIN && b == I256::from(-1) {
            I256::MIN
        } else {
            a / b
        };
        Self::from_bytes(&res.to_be_bytes())
    }

    /// Signed remainder; the sign follows the dividend. Zero divisor yields
    /// zero.
    pub fn smod(&self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return Self::zero();
        }
        let a = I256::from_be_bytes(self.into_bytes());
        let b = I256::from_be_bytes(rhs.into_bytes());
        let res = if a == I256::MIN && b == I256::from(-1) {
            I256::from(0)
        } else {
            a % b
        };
        Self::from_bytes(&res.to_be_bytes())
    }

    /// `(self + rhs) % modulo` over the full 512-bit intermediate; zero
    /// modulus yields zero.
    pub fn add_mod(&self, rhs: &Self, modulo: &Self) -> Self {
        if modulo.is_zero() {
            return Self::zero();
        }
        let wide = U512::from(self.0) + U512::from(rhs.0);
        let res = wide % U512::from(modulo.0);
        Self::from_bytes(&res.to_big_endian()[32..])
    }

    /// `(self * rhs) % modulo` over the full 512-bit product; zero modulus
    /// yields zero.
    pub fn mul_mod(&self, rhs: &Self, modulo: &Self) -> Self {
        if modulo.is_zero() {
            return Self::zero();
        }
        let res = self.0.full_mul(rhs.0) % U512::from(modulo.0);
        Self::from_bytes(&res.to_big_endian()[32..])
    }

    /// Exponentiation by squaring, wrapping modulo 2^256.
    pub fn pow(&self, exp: Self) -> Self {
        let (ret, _) = self.0.overflowing_pow(exp.0);
        Self(ret)
    }

    /// SIGNEXTEND: extend the sign bit of the byte at (little-endian) index
    /// `index` through the high bytes. Index 31 and above is the identity.
    pub fn sign_extend(&self, index: Self) -> Self {
        if index >= Self::from(31u64) {
            return *self;
        }
        let index = index.as_u64() as usize;
        let bit = index * 8 + 7;
        let mask = (Self::one() << (bit + 1)) - Self::one();
        if self.bit(bit) {
            *self | !mask
        } else {
            *self & mask
        }
    }

    /// BYTE: the i-th big-endian byte of the word, or zero when i >= 32.
    pub fn byte_at(&self, index: Self) -> Self {
        if index >= Self::from(32u64) {
            return Self::zero();
        }
        let bytes = self.into_bytes();
        Self::from(bytes[index.as_u64() as usize])
    }

    /// Logical shift left; shifts of 256 or more collapse to zero.
    pub fn shl_by(&self, shift: Self) -> Self {
        match shift.to_usize() {
            Some(s) if s < 256 => *self << s,
            _ => Self::zero(),
        }
    }

    /// Logical shift right; shifts of 256 or more collapse to zero.
    pub fn shr_by(&self, shift: Self) -> Self {
        match shift.to_usize() {
            Some(s) if s < 256 => *self >> s,
            _ => Self::zero(),
        }
    }

    /// Arithmetic shift right: the sign bit backfills the vacated high bits.
    pub fn sar_by(&self, shift: Self) -> Self {
        let negative = self.bit(255);
        match shift.to_usize() {
            Some(0) => *self,
            Some(s) if s < 256 => {
                let shifted = *self >> s;
                if negative {
                    shifted | (Self::max() << (256 - s))
                } else {
                    shifted
                }
            }
            _ => {
                if negative {
                    Self::max()
                } else {
                    Self::zero()
                }
            }
        }
    }

    pub fn slt(&self, rhs: &Self) -> bool {
        let a = I256::from_be_bytes(self.into_bytes());
        let b = I256::from_be_bytes(rhs.into_bytes());
        a < b
    }

    pub fn sgt(&self, rhs: &Self) -> bool {
        let a = I256::from_be_bytes(self.into_bytes());
        let b = I256::from_be_bytes(rhs.into_bytes());
        a > b
    }
}

impl std::fmt::Debug for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl std::fmt::LowerHex for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u8> for Word {
    fn from(value: u8) -> Self {
        Self(U256::from(value))
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<usize> for Word {
    fn from(value: usize) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Word {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl std::ops::Add<Word> for Word {
    type Output = Word;

    fn add(self, rhs: Word) -> Self::Output {
        let (word, _) = self.0.overflowing_add(rhs.0);
        Word(word)
    }
}

impl std::ops::Sub<Word> for Word {
    type Output = Word;

    fn sub(self, rhs: Word) -> Self::Output {
        let (word, _) = self.0.overflowing_sub(rhs.0);
        Word(word)
    }
}

impl std::ops::Mul<Word> for Word {
    type Output = Word;

    fn mul(self, rhs: Word) -> Self::Output {
        let (word, _) = self.0.overflowing_mul(rhs.0);
        Word(word)
    }
}

impl std::ops::Div<Word> for Word {
    type Output = Word;

    fn div(self, rhs: Word) -> Self::Output {
        Word(self.0 / rhs.0)
    }
}

impl std::ops::Rem<Word> for Word {
    type Output = Word;

    fn rem(self, rhs: Word) -> Self::Output {
        Word(self.0 % rhs.0)
    }
}

impl BitAnd for Word {
    type Output = Word;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for Word {
    type Output = Word;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitXor for Word {
    type Output = Word;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl std::ops::Not for Word {
    type Output = Word;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl Shl<usize> for Word {
    type Output = Word;

    fn shl(self, rhs: usize) -> Self::Output {
        Self(self.0 << rhs)
    }
}

impl Shr<usize> for Word {
    type Output = Word;

    fn shr(self, rhs: usize) -> Self::Output {
        Self(self.0 >> rhs)
    }
}

impl Serialize for Word {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:#x}", self.0))
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D>(deserializer: D) -> Result<Word, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let hex: String = Deserialize::deserialize(deserializer)?;
        Word::from_hex(&hex).map_err(D::Error::custom)
    }
}

/// Word literal helper, e.g. `word("0x2a")`.
pub fn word(s: &str) -> Word {
    Word::from_hex(s).expect("invalid word literal")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(Word::max() + Word::one(), Word::zero());
        assert_eq!(Word::zero() - Word::one(), Word::max());
        assert_eq!(Word::max() * Word::from(2u64), Word::max() - Word::one());
    }

    #[test]
    fn test_sdiv_smod() {
        let minus_two = Word::zero() - Word::from(2u64);
        let minus_one = Word::max();
        assert_eq!(Word::from(10u64).sdiv(minus_two), Word::zero() - Word::from(5u64));
        assert_eq!(minus_two.sdiv(minus_one), Word::from(2u64));
        assert_eq!(Word::from(10u64).sdiv(Word::zero()), Word::zero());

        // MIN / -1 keeps MIN
        let min = Word::one() << 255;
        assert_eq!(min.sdiv(minus_one), min);
        assert_eq!(min.smod(minus_one), Word::zero());

        // sign of the remainder follows the dividend
        let minus_three = Word::zero() - Word::from(3u64);
        assert_eq!(
            (Word::zero() - Word::from(10u64)).smod(minus_three),
            Word::zero() - Word::from(1u64)
        );
        assert_eq!(Word::from(10u64).smod(Word::zero()), Word::zero());
    }

    #[test]
    fn test_modular() {
        let a = Word::from(10u64);
        assert_eq!(a.add_mod(&a, &Word::from(8u64)), Word::from(4u64));
        assert_eq!(a.add_mod(&a, &Word::zero()), Word::zero());
        assert_eq!(
            Word::max().mul_mod(&Word::max(), &Word::from(12u64)),
            Word::from(9u64)
        );
        // wrap-around is observable through the 512-bit intermediate
        assert_eq!(
            Word::max().add_mod(&Word::from(2u64), &Word::max()),
            Word::from(2u64)
        );
    }

    #[test]
    fn test_exp() {
        assert_eq!(Word::from(2u64).pow(Word::from(10u64)), Word::from(1024u64));
        assert_eq!(Word::from(2u64).pow(Word::from(256u64)), Word::zero());
        assert_eq!(Word::zero().pow(Word::zero()), Word::one());
    }

    #[test]
    fn test_sign_extend() {
        // 0xff at byte 0 becomes -1
        assert_eq!(Word::from(0xffu8).sign_extend(Word::zero()), Word::max());
        // 0x7f stays positive
        assert_eq!(
            Word::from(0x7fu8).sign_extend(Word::zero()),
            Word::from(0x7fu8)
        );
        // out-of-range index is the identity
        assert_eq!(
            Word::from(0xffu8).sign_extend(Word::from(32u64)),
            Word::from(0xffu8)
        );
        assert_eq!(
            word("0x00ff").sign_extend(Word::one()),
            word("0x00ff")
        );
    }

    #[test]
    fn test_byte_at() {
        let w = word("0x102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f1ff");
        assert_eq!(w.byte_at(Word::zero()), Word::from(0x10u8));
        assert_eq!(w.byte_at(Word::from(31u64)), Word::from(0xffu8));
        assert_eq!(w.byte_at(Word::from(32u64)), Word::zero());
    }

    #[test]
    fn test_shifts() {
        assert_eq!(Word::one().shl_by(Word::from(255u64)), Word::one() << 255);
        assert_eq!(Word::one().shl_by(Word::from(256u64)), Word::zero());
        assert_eq!(Word::max().shr_by(Word::from(255u64)), Word::one());
        assert_eq!(Word::max().shr_by(Word::from(256u64)), Word::zero());

        // arithmetic shift drags the sign bit down
        assert_eq!(Word::max().sar_by(Word::from(8u64)), Word::max());
        assert_eq!(Word::max().sar_by(Word::from(300u64)), Word::max());
        assert_eq!(
            (Word::one() << 255).sar_by(Word::from(255u64)),
            Word::max()
        );
        assert_eq!(
            Word::from(0x80u8).sar_by(Word::from(4u64)),
            Word::from(0x08u8)
        );
    }

    #[test]
    fn test_signed_comparison() {
        let minus_one = Word::max();
        assert!(minus_one.slt(&Word::zero()));
        assert!(Word::zero().sgt(&minus_one));
        assert!(!minus_one.slt(&minus_one));
        assert!(Word::one().sgt(&Word::zero()));
    }

    #[test]
    fn test_hex_round_trip() {
        let w = word("0xdeadbeef");
        assert_eq!(format!("{w:#x}"), "0xdeadbeef");
        assert_eq!(Word::from_hex("deadbeef").unwrap(), w);
    }
}
