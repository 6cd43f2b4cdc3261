use crate::common::error::{Error, Result};

pub const HEADER_SIZE: usize = 8;
pub const MAX_MESSAGE_SIZE: usize = 0xFF_FFFF;

/// The 8-byte prefix of every message: 24-bit size (header included),
/// message type, and the dejavu nonce that ties a response to its request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestResponseHeader {
    size: [u8; 3],
    pub msg_type: u8,
    pub dejavu: u32,
}

impl RequestResponseHeader {
    pub fn new(msg_type: u8, payload_len: usize, dejavu: u32) -> Result<Self> {
        let total = payload_len + HEADER_SIZE;
        if total >= MAX_MESSAGE_SIZE {
            return Err(Error::ProtocolViolation(format!(
                "message of {total} bytes does not fit the size field"
            )));
        }
        let raw = (total as u32).to_le_bytes();
        Ok(RequestResponseHeader {
            size: [raw[0], raw[1], raw[2]],
            msg_type,
            dejavu,
        })
    }

    /// Total message size. An all-zero size field reads as the maximum.
    pub fn size(&self) -> usize {
        let size = u32::from_le_bytes([self.size[0], self.size[1], self.size[2], 0]) as usize;
        if size == 0 {
            MAX_MESSAGE_SIZE
        } else {
            size
        }
    }

    /// Zero-encoded or otherwise impossible sizes mean the stream is garbled.
    pub fn is_corrupted(&self) -> bool {
        let size = self.size();
        size == MAX_MESSAGE_SIZE || size < HEADER_SIZE
    }

    pub fn payload_size(&self) -> usize {
        self.size().saturating_sub(HEADER_SIZE)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..3].copy_from_slice(&self.size);
        out[3] = self.msg_type;
        out[4..].copy_from_slice(&self.dejavu.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        RequestResponseHeader {
            size: [bytes[0], bytes[1], bytes[2]],
            msg_type: bytes[3],
            dejavu: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Non-zero nonce for a request; zero is reserved for broadcasts.
    pub fn random_dejavu() -> u32 {
        loop {
            let dejavu: u32 = rand::random();
            if dejavu != 0 {
                return dejavu;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = RequestResponseHeader::new(14, 89, 0xAABBCCDD).unwrap();
        let bytes = header.to_bytes();

        assert_eq!(bytes, [97, 0, 0, 14, 0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(RequestResponseHeader::from_bytes(&bytes), header);
        assert_eq!(header.payload_size(), 89);
        assert!(!header.is_corrupted());
    }

    #[test]
    fn test_zero_size_reads_as_maximum() {
        let header = RequestResponseHeader::from_bytes(&[0, 0, 0, 24, 1, 0, 0, 0]);

        assert_eq!(header.size(), MAX_MESSAGE_SIZE);
        assert!(header.is_corrupted());
    }

    #[test]
    fn test_random_dejavu_is_never_zero() {
        for _ in 0..64 {
            assert_ne!(RequestResponseHeader::random_dejavu(), 0);
        }
    }
}
