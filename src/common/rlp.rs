use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RlpError {
    #[error("rlp input truncated")]
    Truncated,
    #[error("expected an rlp list")]
    ExpectedList,
    #[error("non-canonical rlp encoding")]
    NonCanonical,
}

/// Encode a byte string.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    match data {
        [byte] if *byte < 0x80 => vec![*byte],
        _ => {
            let mut out = header(0x80, data.len());
            out.extend_from_slice(data);
            out
        }
    }
}

/// Encode an unsigned integer as its minimal big-endian byte string.
pub fn encode_uint(value: &[u8; 32]) -> Vec<u8> {
    let start = value.iter().position(|b| *b != 0).unwrap_or(32);
    encode_bytes(&value[start..])
}

/// Encode a list whose items are already RLP-encoded.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = items.iter().map(Vec::len).sum();
    let mut out = header(0xc0, payload_len);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

fn header(base: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        vec![base + len as u8]
    } else {
        let len_bytes = len.to_be_bytes();
        let start = len_bytes.iter().position(|b| *b != 0).unwrap_or(7);
        let mut out = vec![base + 55 + (8 - start) as u8];
        out.extend_from_slice(&len_bytes[start..]);
        out
    }
}

/// Decode a top-level list into its raw byte-string items. Nested lists are
/// not needed by any caller and are rejected.
pub fn decode_list(data: &[u8]) -> Result<Vec<Vec<u8>>, RlpError> {
    let (payload, rest) = take(data, 0xc0)?;
    if !rest.is_empty() {
        return Err(RlpError::NonCanonical);
    }
    let mut items = Vec::new();
    let mut cursor = payload;
    while !cursor.is_empty() {
        if cursor[0] >= 0xc0 {
            return Err(RlpError::ExpectedList);
        }
        if cursor[0] < 0x80 {
            items.push(vec![cursor[0]]);
            cursor = &cursor[1..];
            continue;
        }
        let (item, rest) = take(cursor, 0x80)?;
        items.push(item.to_vec());
        cursor = rest;
    }
    Ok(items)
}

/// Split off one item's payload given its expected header base
/// (0x80 strings, 0xc0 lists).
fn take(data: &[u8], base: u8) -> Result<(&[u8], &[u8]), RlpError> {
    let first = *data.first().ok_or(RlpError::Truncated)?;
    let in_range = first >= base && (base == 0xc0 || first < 0xc0);
    if !in_range {
        return Err(if base == 0xc0 {
            RlpError::ExpectedList
        } else {
            RlpError::NonCanonical
        });
    }
    let short = (first - base) as usize;
    if short < 56 {
        let end = 1 + short;
        if data.len() < end {
            return Err(RlpError::Truncated);
        }
        Ok((&data[1..end], &data[end..]))
    } else {
        let len_len = short - 55;
        if data.len() < 1 + len_len {
            return Err(RlpError::Truncated);
        }
        let mut len = 0usize;
        for byte in &data[1..1 + len_len] {
            len = len << 8 | *byte as usize;
        }
        let end = 1 + len_len + len;
        if data.len() < end {
            return Err(RlpError::Truncated);
        }
        Ok((&data[1 + len_len..end], &data[end..]))
    }
}
