use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::{AffineRepr, CurveGroup, pairing::Pairing};
use ark_ff::{BigInteger, PrimeField};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use num_bigint::BigUint;
use num_traits::Zero;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::common::{address::Address, hash::keccak256};

#[derive(Error, Debug)]
pub enum PrecompileError {
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),
    #[error("point not on curve")]
    InvalidPoint,
    #[error("kzg proof rejected")]
    ProofRejected,
}

type Precompile = fn(&[u8]) -> Result<Vec<u8>, PrecompileError>;

/// Dispatch for the ten CANCUN precompile addresses. Anything else is a
/// plain account.
pub fn lookup(address: &Address) -> Option<Precompile> {
    if address.0[..19] != [0u8; 19] {
        return None;
    }
    Some(match address.0[19] {
        0x01 => ecrecover,
        0x02 => sha256,
        0x03 => ripemd160,
        0x04 => identity,
        0x05 => modexp,
        0x06 => bn254_add,
        0x07 => bn254_mul,
        0x08 => bn254_pairing,
        0x09 => blake2f,
        0x0a => point_evaluation,
        _ => return None,
    })
}

pub fn is_precompile(address: &Address) -> bool {
    lookup(address).is_some()
}

//
// 0x01: ECDSA public key recovery
//

// secp256k1 group order and its half, for high-s normalization: the
// precompile accepts high-s signatures while k256 refuses to recover them.
const SECP256K1_N: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
    0x41, 0x41,
];
const SECP256K1_N_HALF: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa0,
];

/// Recovery failures return the empty byte string, not an error: the
/// canonical contract-visible behavior.
fn ecrecover(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    let mut padded = [0u8; 128];
    let len = input.len().min(128);
    padded[..len].copy_from_slice(&input[..len]);

    let hash = &padded[0..32];
    let v = &padded[32..64];
    let r = &padded[64..96];
    let s = &padded[96..128];

    if v[..31] != [0u8; 31] || (v[31] != 27 && v[31] != 28) {
        return Ok(Vec::new());
    }
    let mut parity = v[31] - 27;

    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(r);
    signature[32..].copy_from_slice(s);

    if s > SECP256K1_N_HALF.as_slice() {
        let n = BigUint::from_bytes_be(&SECP256K1_N);
        let low = (n - BigUint::from_bytes_be(s)).to_bytes_be();
        signature[32..].fill(0);
        signature[64 - low.len()..].copy_from_slice(&low);
        parity ^= 1;
    }

    let Ok(signature) = Signature::from_slice(&signature) else {
        return Ok(Vec::new());
    };
    let Some(recovery_id) = RecoveryId::from_byte(parity) else {
        return Ok(Vec::new());
    };
    let Ok(key) = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id) else {
        return Ok(Vec::new());
    };

    // keccak over the uncompressed point without its 0x04 tag; the address
    // is the low 20 bytes, left-padded to a word
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut output = vec![0u8; 32];
    output[12..].copy_from_slice(&digest[12..]);
    Ok(output)
}

//
// 0x02 / 0x03 / 0x04: hashes and identity
//

fn sha256(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    Ok(Sha256::digest(input).to_vec())
}

fn ripemd160(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    let digest = Ripemd160::digest(input);
    let mut output = vec![0u8; 32];
    output[12..].copy_from_slice(&digest);
    Ok(output)
}

fn identity(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    Ok(input.to_vec())
}

//
// 0x05: modular exponentiation (EIP-198)
//

/// Operand length cap; keeps an unmetered call from turning a length header
/// into a multi-gigabyte allocation.
const MODEXP_MAX_OPERAND: usize = 1024;

fn modexp(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    let read_len = |from: usize| -> Result<usize, PrecompileError> {
        let mut word = [0u8; 32];
        let from = from.min(input.len());
        let available = input.len().saturating_sub(from).min(32);
        word[..available].copy_from_slice(&input[from..from + available]);
        let len: usize = BigUint::from_bytes_be(&word)
            .try_into()
            .map_err(|_| PrecompileError::MalformedInput("length does not fit"))?;
        if len > MODEXP_MAX_OPERAND {
            return Err(PrecompileError::MalformedInput("operand too large"));
        }
        Ok(len)
    };
    let base_len = read_len(0)?;
    let exp_len = read_len(32)?;
    let mod_len = read_len(64)?;

    // operands past the supplied input read as zeros
    let read_operand = |from: usize, len: usize| -> BigUint {
        let mut bytes = vec![0u8; len];
        let from = from.min(input.len());
        let available = input.len().saturating_sub(from).min(len);
        bytes[..available].copy_from_slice(&input[from..from + available]);
        BigUint::from_bytes_be(&bytes)
    };
    let base = read_operand(96, base_len);
    let exp = read_operand(96 + base_len, exp_len);
    let modulus = read_operand(96 + base_len + exp_len, mod_len);

    if modulus.is_zero() {
        return Ok(vec![0u8; mod_len]);
    }

    let result = base.modpow(&exp, &modulus).to_bytes_be();
    let mut output = vec![0u8; mod_len - result.len()];
    output.extend(result);
    Ok(output)
}

//
// 0x06 / 0x07 / 0x08: BN254 curve operations
//

fn read_fq(bytes: &[u8]) -> Fq {
    Fq::from_be_bytes_mod_order(bytes)
}

fn read_g1(x: &[u8], y: &[u8]) -> Result<G1Projective, PrecompileError> {
    if x.iter().all(|b| *b == 0) && y.iter().all(|b| *b == 0) {
        return Ok(G1Projective::zero());
    }
    let point = G1Affine::new_unchecked(read_fq(x), read_fq(y));
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrecompileError::InvalidPoint);
    }
    Ok(point.into())
}

fn write_g1(point: G1Projective) -> Vec<u8> {
    let mut output = vec![0u8; 64];
    if !point.is_zero() {
        let affine = point.into_affine();
        write_fq(&mut output[0..32], affine.x);
        write_fq(&mut output[32..64], affine.y);
    }
    output
}

fn write_fq(out: &mut [u8], value: Fq) {
    let bytes = value.into_bigint().to_bytes_be();
    out[32 - bytes.len()..].copy_from_slice(&bytes);
}

fn bn254_add(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    let mut padded = input.to_vec();
    padded.resize(128, 0);

    let p = read_g1(&padded[0..32], &padded[32..64])?;
    let q = read_g1(&padded[64..96], &padded[96..128])?;
    Ok(write_g1(p + q))
}

fn bn254_mul(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    let mut padded = input.to_vec();
    padded.resize(96, 0);

    let p = read_g1(&padded[0..32], &padded[32..64])?;
    let scalar = Fr::from_be_bytes_mod_order(&padded[64..96]);
    Ok(write_g1(p * scalar))
}

fn bn254_pairing(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    if input.len() % 192 != 0 {
        return Err(PrecompileError::MalformedInput("pairing input not a multiple of 192"));
    }

    let mut g1 = Vec::new();
    let mut g2 = Vec::new();
    for pair in input.chunks(192) {
        g1.push(read_g1(&pair[0..32], &pair[32..64])?.into_affine());

        // G2 coordinates arrive with the imaginary part first
        let zero_g2 = pair[64..192].iter().all(|b| *b == 0);
        let point = if zero_g2 {
            G2Affine::zero()
        } else {
            let x = Fq2::new(read_fq(&pair[96..128]), read_fq(&pair[64..96]));
            let y = Fq2::new(read_fq(&pair[160..192]), read_fq(&pair[128..160]));
            let point = G2Affine::new_unchecked(x, y);
            if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
                return Err(PrecompileError::InvalidPoint);
            }
            point
        };
        g2.push(point);
    }

    let mut output = vec![0u8; 32];
    if g1.is_empty() || Bn254::multi_pairing(g1, g2).is_zero() {
        output[31] = 1;
    }
    Ok(output)
}

//
// 0x09: BLAKE2b compression (EIP-152)
//

const BLAKE2_IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

const BLAKE2_SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

fn blake2f(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    if input.len() != 213 {
        return Err(PrecompileError::MalformedInput("blake2f input must be 213 bytes"));
    }
    if input[212] > 1 {
        return Err(PrecompileError::MalformedInput("blake2f final flag must be 0 or 1"));
    }

    let rounds = u32::from_be_bytes(input[0..4].try_into().expect("4 bytes"));
    let word_at = |offset: usize| -> u64 {
        u64::from_le_bytes(input[offset..offset + 8].try_into().expect("8 bytes"))
    };

    let mut h = [0u64; 8];
    for (i, h) in h.iter_mut().enumerate() {
        *h = word_at(4 + i * 8);
    }
    let mut m = [0u64; 16];
    for (i, m) in m.iter_mut().enumerate() {
        *m = word_at(68 + i * 8);
    }
    let t = [word_at(196), word_at(204)];
    let last = input[212] == 1;

    compress(&mut h, &m, &t, last, rounds);

    let mut output = vec![0u8; 64];
    for (i, word) in h.iter().enumerate() {
        output[i * 8..(i + 1) * 8].copy_from_slice(&word.to_le_bytes());
    }
    Ok(output)
}

fn compress(h: &mut [u64; 8], m: &[u64; 16], t: &[u64; 2], last: bool, rounds: u32) {
    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&BLAKE2_IV);
    v[12] ^= t[0];
    v[13] ^= t[1];
    if last {
        v[14] = !v[14];
    }

    for round in 0..rounds as usize {
        let s = &BLAKE2_SIGMA[round % 10];
        g(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        g(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        g(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        g(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        g(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        g(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        g(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        g(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

//
// 0x0a: KZG point evaluation (EIP-4844)
//

const FIELD_ELEMENTS_PER_BLOB: u64 = 4096;
const BLS_MODULUS: &str = "73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001";

fn point_evaluation(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
    if input.len() != 192 {
        return Err(PrecompileError::MalformedInput("point evaluation input must be 192 bytes"));
    }

    let versioned_hash = &input[0..32];
    let z = &input[32..64];
    let y = &input[64..96];
    let commitment = &input[96..144];
    let proof = &input[144..192];

    // versioned hash: 0x01 ++ sha256(commitment)[1..]
    let mut expected = Sha256::digest(commitment);
    expected[0] = 0x01;
    if versioned_hash != expected.as_slice() {
        return Err(PrecompileError::ProofRejected);
    }

    if !verify_kzg_proof(commitment, z, y, proof)? {
        return Err(PrecompileError::ProofRejected);
    }

    let mut output = vec![0u8; 64];
    output[24..32].copy_from_slice(&FIELD_ELEMENTS_PER_BLOB.to_be_bytes());
    output[32..].copy_from_slice(&hex::decode(BLS_MODULUS).expect("const modulus"));
    Ok(output)
}

fn verify_kzg_proof(
    commitment: &[u8],
    z: &[u8],
    y: &[u8],
    proof: &[u8],
) -> Result<bool, PrecompileError> {
    use ark_bls12_381::{Bls12_381, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
    use ark_serialize::CanonicalDeserialize;

    let commitment = G1Affine::deserialize_compressed(commitment)
        .map_err(|_| PrecompileError::InvalidPoint)?;
    let proof =
        G1Affine::deserialize_compressed(proof).map_err(|_| PrecompileError::InvalidPoint)?;

    let z = Fr::from_be_bytes_mod_order(z);
    let y = Fr::from_be_bytes_mod_order(y);

    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();
    // Placeholder tau*G2; proofs against the mainnet trusted setup will not
    // verify against it.
    let tau_g2 = G2Affine::generator();

    let commitment_minus_y =
        (G1Projective::from(commitment) - G1Projective::from(g1) * y).into_affine();
    let tau_minus_z = (G2Projective::from(tau_g2) - G2Projective::from(g2) * z).into_affine();

    // e(proof, tau - z) == e(commitment - y, G2)
    let lhs = Bls12_381::pairing(proof, tau_minus_z);
    let rhs = Bls12_381::pairing(commitment_minus_y, g2);
    Ok(lhs == rhs)
}
