use std::io::{ErrorKind, Read};

use crate::common::codec::ByteReader;
use crate::common::crypto::{digest, digest_parts, Digest, Hashable, Pubkey, Signature};
use crate::common::error::{Error, Result};
use crate::common::identity::{self, Case};

pub const TRANSACTION_HEADER_SIZE: usize = 80;
pub const MAX_INPUT_SIZE: usize = 1024;
pub const SIGNATURE_SIZE: usize = 64;

/// A transfer plus optional contract input, signed by the source key.
/// Its identity is the digest of all its bytes, signature included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub source: Pubkey,
    pub destination: Pubkey,
    pub amount: i64,
    pub tick: u32,
    pub input_type: u16,
    pub input: Vec<u8>,
    pub signature: Signature,
}

struct FixedPart {
    source: Pubkey,
    destination: Pubkey,
    amount: i64,
    tick: u32,
    input_type: u16,
    input_size: usize,
}

fn read_fixed_part(bytes: &[u8]) -> Result<FixedPart> {
    let mut r = ByteReader::new(bytes, "transaction");
    let part = FixedPart {
        source: Pubkey::from(&r.array::<32>()?),
        destination: Pubkey::from(&r.array::<32>()?),
        amount: r.i64()?,
        tick: r.u32()?,
        input_type: r.u16()?,
        input_size: r.u16()? as usize,
    };
    if part.input_size > MAX_INPUT_SIZE {
        return Err(Error::ProtocolViolation(format!(
            "transaction declares {} input bytes, limit is {MAX_INPUT_SIZE}",
            part.input_size
        )));
    }
    Ok(part)
}

impl Transaction {
    /// Decodes one complete transaction: fixed part, input, signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let part = read_fixed_part(bytes)?;
        let expected = TRANSACTION_HEADER_SIZE + part.input_size + SIGNATURE_SIZE;
        if bytes.len() != expected {
            return Err(Error::Malformed {
                what: "transaction",
                expected,
                actual: bytes.len(),
            });
        }
        let mut r = ByteReader::new(&bytes[TRANSACTION_HEADER_SIZE..], "transaction");
        let input = r.take(part.input_size)?.to_vec();
        let signature = Signature::from(r.array::<64>()?);
        Ok(Transaction::assemble(part, input, signature))
    }

    /// Reads the next transaction from a stream. `None` when the stream
    /// ends before the record starts; a record cut off partway is
    /// `Malformed`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut fixed = [0u8; TRANSACTION_HEADER_SIZE];
        match fill(reader, &mut fixed)? {
            0 => return Ok(None),
            n if n < TRANSACTION_HEADER_SIZE => return Err(truncated(TRANSACTION_HEADER_SIZE, n)),
            _ => {}
        }
        let part = read_fixed_part(&fixed)?;
        let expected = TRANSACTION_HEADER_SIZE + part.input_size + SIGNATURE_SIZE;

        let mut input = vec![0u8; part.input_size];
        let got = fill(reader, &mut input)?;
        if got < input.len() {
            return Err(truncated(expected, TRANSACTION_HEADER_SIZE + got));
        }
        let mut signature = [0u8; SIGNATURE_SIZE];
        let got = fill(reader, &mut signature)?;
        if got < SIGNATURE_SIZE {
            return Err(truncated(expected, TRANSACTION_HEADER_SIZE + part.input_size + got));
        }
        Ok(Some(Transaction::assemble(part, input, Signature::from(signature))))
    }

    fn assemble(part: FixedPart, input: Vec<u8>, signature: Signature) -> Self {
        Transaction {
            source: part.source,
            destination: part.destination,
            amount: part.amount,
            tick: part.tick,
            input_type: part.input_type,
            input,
            signature,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.unsigned_bytes();
        out.extend_from_slice(&self.signature.sig);
        out
    }

    /// Digest the source key signs: everything but the signature.
    pub fn signing_digest(&self) -> Digest {
        digest(&self.unsigned_bytes())
    }

    pub fn verify(&self) -> bool {
        self.source.verify(&self.signing_digest(), &self.signature)
    }

    /// Lowercase 60-character rendering of the transaction's digest.
    pub fn id(&self) -> String {
        identity::encode(&self.hash(), Case::Lower)
    }

    fn unsigned_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TRANSACTION_HEADER_SIZE + self.input.len() + SIGNATURE_SIZE);
        out.extend_from_slice(&self.source.key);
        out.extend_from_slice(&self.destination.key);
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
        out.extend_from_slice(&self.input_type.to_le_bytes());
        out.extend_from_slice(&(self.input.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.input);
        out
    }
}

/// Reads until `buf` is full or the stream ends, returning the byte count.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn truncated(expected: usize, actual: usize) -> Error {
    Error::Malformed {
        what: "transaction",
        expected,
        actual,
    }
}

impl Hashable for Transaction {
    fn hash(&self) -> Digest {
        digest_parts(&[&self.unsigned_bytes(), &self.signature.sig])
    }
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::testing::signed_transaction;
    use super::*;
    use crate::common::crypto::Keypair;

    #[test]
    fn test_decode_and_verify() {
        let keypair = Keypair::new_pair();
        let tx = signed_transaction(&keypair, 42, 1_000, b"payload");
        let bytes = tx.to_bytes();

        assert_eq!(bytes.len(), TRANSACTION_HEADER_SIZE + 7 + SIGNATURE_SIZE);
        let decoded = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify());
    }

    #[test]
    fn test_id_covers_signature() {
        let keypair = Keypair::new_pair();
        let tx = signed_transaction(&keypair, 42, 5, &[]);
        let mut other = tx.clone();
        other.signature.sig[0] ^= 1;

        assert_eq!(tx.id().len(), identity::IDENTITY_LENGTH);
        assert!(tx.id().bytes().all(|b| b.is_ascii_lowercase()));
        assert_ne!(tx.id(), other.id());
        assert!(!other.verify());
    }

    #[test]
    fn test_oversized_input_is_protocol_violation() {
        let keypair = Keypair::new_pair();
        let mut bytes = signed_transaction(&keypair, 42, 5, &[]).to_bytes();
        bytes[78..80].copy_from_slice(&((MAX_INPUT_SIZE + 1) as u16).to_le_bytes());

        assert!(matches!(
            Transaction::from_bytes(&bytes),
            Err(Error::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_stream_reading() {
        let keypair = Keypair::new_pair();
        let a = signed_transaction(&keypair, 42, 1, b"x");
        let b = signed_transaction(&keypair, 42, 2, &[]);
        let mut stream = a.to_bytes();
        stream.extend_from_slice(&b.to_bytes());
        let mut cursor = Cursor::new(stream);

        assert_eq!(Transaction::read_from(&mut cursor).unwrap(), Some(a));
        assert_eq!(Transaction::read_from(&mut cursor).unwrap(), Some(b));
        assert_eq!(Transaction::read_from(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_record_cut_inside_fixed_part() {
        let keypair = Keypair::new_pair();
        let bytes = signed_transaction(&keypair, 42, 1, b"x").to_bytes();
        let mut cursor = Cursor::new(bytes[..40].to_vec());

        match Transaction::read_from(&mut cursor) {
            Err(Error::Malformed { expected, actual, .. }) => {
                assert_eq!(expected, TRANSACTION_HEADER_SIZE);
                assert_eq!(actual, 40);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_record_cut_inside_signature() {
        let keypair = Keypair::new_pair();
        let bytes = signed_transaction(&keypair, 42, 1, b"abc").to_bytes();
        let cut = bytes.len() - 10;
        let mut cursor = Cursor::new(bytes[..cut].to_vec());

        match Transaction::read_from(&mut cursor) {
            Err(Error::Malformed { expected, actual, .. }) => {
                assert_eq!(expected, bytes.len());
                assert_eq!(actual, cut);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
