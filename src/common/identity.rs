//! Textual rendering of 32-byte keys and digests.
//!
//! An identity is four groups of 14 base-26 letters, one per little-endian
//! 8-byte fragment, followed by a 4-letter checksum over the raw bytes.
//! Public keys are shown uppercase, transaction digests lowercase.

use super::crypto::digest;
use super::error::{Error, Result};

pub const IDENTITY_LENGTH: usize = 60;

const FRAGMENT_LETTERS: usize = 14;
const BODY_LENGTH: usize = 4 * FRAGMENT_LETTERS;
const CHECKSUM_MASK: u32 = 0x3FFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Case {
    Upper,
    Lower,
}

impl Case {
    fn base(self) -> u8 {
        match self {
            Case::Upper => b'A',
            Case::Lower => b'a',
        }
    }
}

pub fn encode(bytes: &[u8; 32], case: Case) -> String {
    let base = case.base();
    let mut out = String::with_capacity(IDENTITY_LENGTH);

    for chunk in bytes.chunks_exact(8) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        let mut fragment = u64::from_le_bytes(raw);
        for _ in 0..FRAGMENT_LETTERS {
            out.push((base + (fragment % 26) as u8) as char);
            fragment /= 26;
        }
    }

    let mut checksum = checksum(bytes);
    for _ in 0..4 {
        out.push((base + (checksum % 26) as u8) as char);
        checksum /= 26;
    }
    out
}

/// Parses an identity in either case and checks its checksum.
pub fn decode(identity: &str) -> Result<[u8; 32]> {
    let text = identity.trim();
    if text.len() != IDENTITY_LENGTH || !text.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(Error::InvalidIdentity(format!(
            "expected {IDENTITY_LENGTH} letters, got {:?}",
            text
        )));
    }
    let letters: Vec<u64> = text
        .bytes()
        .map(|b| (b.to_ascii_uppercase() - b'A') as u64)
        .collect();

    let mut bytes = [0u8; 32];
    for (i, group) in letters[..BODY_LENGTH].chunks_exact(FRAGMENT_LETTERS).enumerate() {
        let mut fragment: u64 = 0;
        for letter in group.iter().rev() {
            fragment = fragment
                .checked_mul(26)
                .and_then(|f| f.checked_add(*letter))
                .ok_or_else(|| Error::InvalidIdentity(format!("fragment {i} overflows")))?;
        }
        bytes[i * 8..(i + 1) * 8].copy_from_slice(&fragment.to_le_bytes());
    }

    let claimed = letters[BODY_LENGTH..]
        .iter()
        .rev()
        .fold(0u32, |acc, letter| acc * 26 + *letter as u32);
    if claimed != checksum(&bytes) {
        return Err(Error::InvalidIdentity(format!("checksum mismatch in {text}")));
    }
    Ok(bytes)
}

/// Case-insensitive comparison over the first 60 characters.
pub fn same_identity(a: &str, b: &str) -> bool {
    let a = a.trim().as_bytes();
    let b = b.trim().as_bytes();
    if a.len() < IDENTITY_LENGTH || b.len() < IDENTITY_LENGTH {
        return false;
    }
    a[..IDENTITY_LENGTH].eq_ignore_ascii_case(&b[..IDENTITY_LENGTH])
}

fn checksum(bytes: &[u8; 32]) -> u32 {
    let hash = digest(bytes);
    u32::from_le_bytes([hash[0], hash[1], hash[2], 0]) & CHECKSUM_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = (i * 37 + 11) as u8;
        }
        let upper = encode(&key, Case::Upper);
        let lower = encode(&key, Case::Lower);

        assert_eq!(upper.len(), IDENTITY_LENGTH);
        assert_eq!(upper.to_lowercase(), lower);
        assert_eq!(decode(&upper).unwrap(), key);
        assert_eq!(decode(&lower).unwrap(), key);
    }

    #[test]
    fn test_zero_key_is_all_a_body() {
        let identity = encode(&[0u8; 32], Case::Upper);
        assert!(identity[..BODY_LENGTH].bytes().all(|b| b == b'A'));
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let mut identity = encode(&[7u8; 32], Case::Upper).into_bytes();
        identity[59] = if identity[59] == b'Z' { b'A' } else { identity[59] + 1 };
        let identity = String::from_utf8(identity).unwrap();
        assert!(decode(&identity).is_err());
        assert!(decode("TOOSHORT").is_err());
    }

    #[test]
    fn test_same_identity_ignores_case() {
        let identity = encode(&[3u8; 32], Case::Lower);
        assert!(same_identity(&identity, &identity.to_uppercase()));
        assert!(!same_identity(&identity, &encode(&[4u8; 32], Case::Lower)));
        assert!(!same_identity(&identity, "abc"));
    }
}
