use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest as ShaDigest, Sha256};

use super::identity::{self, Case};

/*
    Every hash and signature the client checks goes through this module.
    Records are hashed to a 32-byte digest and the digest is what gets
    signed, so swapping the backend only means swapping the bodies below.
*/

pub type Digest = [u8; 32];

pub trait Hashable {
    fn hash(&self) -> Digest;
}

pub struct Keypair {
    pubkey: Pubkey,
    dalek_signer: SigningKey,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Pubkey {
    pub key: [u8; 32],
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Signature {
    pub sig: [u8; 64],
}

impl Keypair {
    pub fn new_pair() -> Self {
        let mut csprng = OsRng;
        let dalek_signer = SigningKey::generate(&mut csprng);
        let pubkey = Pubkey::from(&dalek_signer.verifying_key().to_bytes());

        Keypair {
            pubkey,
            dalek_signer,
        }
    }

    pub fn sign(&self, digest: &Digest) -> Signature {
        let sig = self.dalek_signer.sign(digest).to_bytes();
        Signature { sig }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.pubkey
    }
}

impl Pubkey {
    pub fn verify(&self, digest: &Digest, signature: &Signature) -> bool {
        let Ok(dalek_pubkey) = VerifyingKey::from_bytes(&self.key) else {
            return false;
        };
        let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.sig);
        dalek_pubkey.verify_strict(digest, &dalek_sig).is_ok()
    }

    /// Uppercase 60-character identity of this key.
    pub fn identity(&self) -> String {
        identity::encode(&self.key, Case::Upper)
    }

    pub fn from_identity(text: &str) -> crate::common::error::Result<Self> {
        identity::decode(text).map(|key| Pubkey { key })
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.key
    }
}

impl From<&[u8; 32]> for Pubkey {
    fn from(bytes: &[u8; 32]) -> Self {
        Pubkey { key: *bytes }
    }
}

impl Signature {
    pub fn zeroed() -> Self {
        Signature { sig: [0u8; 64] }
    }
}

impl From<[u8; 64]> for Signature {
    fn from(sig: [u8; 64]) -> Self {
        Signature { sig }
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.sig
    }
}

pub fn digest(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

pub fn digest_parts(parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// 8-byte variant of [`digest_parts`], read as a little-endian integer.
pub fn short_digest_parts(parts: &[&[u8]]) -> u64 {
    let full = digest_parts(parts);
    let mut short = [0u8; 8];
    short.copy_from_slice(&full[..8]);
    u64::from_le_bytes(short)
}

pub fn is_zero(digest: &Digest) -> bool {
    digest.iter().all(|b| *b == 0)
}
