use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::NUMBER_OF_COMPUTORS;
use crate::common::checked::Checked;
use crate::common::codec::{expect_len, ByteReader};
use crate::common::crypto::{digest, Digest, Hashable, Pubkey, Signature};
use crate::common::error::Result;
use crate::network::packet::{BROADCAST_COMPUTORS, REQUEST_COMPUTOR_LIST};
use crate::network::{drain_response, next_response, send_request, Transport};

pub const COMPUTOR_SET_SIZE: usize = 2 + NUMBER_OF_COMPUTORS * 32 + 64;
const SIGNED_LEN: usize = COMPUTOR_SET_SIZE - 64;

/// The epoch's computors, in index order, as signed by the trust anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputorSet {
    pub epoch: u16,
    pub public_keys: Vec<Pubkey>,
    pub signature: Signature,
}

impl ComputorSet {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, COMPUTOR_SET_SIZE, "computor list")?;
        let mut reader = ByteReader::new(bytes, "computor list");
        let epoch = reader.u16()?;
        let mut public_keys = Vec::with_capacity(NUMBER_OF_COMPUTORS);
        for _ in 0..NUMBER_OF_COMPUTORS {
            public_keys.push(Pubkey::from(&reader.array::<32>()?));
        }
        let signature = Signature::from(reader.array::<64>()?);
        Ok(ComputorSet {
            epoch,
            public_keys,
            signature,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.signed_bytes();
        out.extend_from_slice(&self.signature.sig);
        out
    }

    /// Parses `bytes` and checks the signature against `trust_anchor`.
    /// Only a wrong length is an error; a bad signature yields an
    /// unverified set.
    pub fn load(bytes: &[u8], trust_anchor: &Pubkey) -> Result<Checked<Self>> {
        let set = ComputorSet::from_bytes(bytes)?;
        let verified = set.verify(trust_anchor);
        if verified {
            info!(epoch = set.epoch, "computor list verified");
        } else {
            warn!(epoch = set.epoch, "computor list signature does not match trust anchor");
        }
        Ok(Checked::new(set, verified))
    }

    pub fn read_file(path: &Path, trust_anchor: &Pubkey) -> Result<Checked<Self>> {
        let bytes = fs::read(path)?;
        ComputorSet::load(&bytes, trust_anchor)
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Asks the peer for its current computor list. `None` if the peer
    /// did not answer with one.
    pub fn fetch<T: Transport + ?Sized>(
        transport: &mut T,
        trust_anchor: &Pubkey,
    ) -> Result<Option<Checked<Self>>> {
        let dejavu = send_request(transport, REQUEST_COMPUTOR_LIST, &[])?;
        let mut found = None;
        while let Some(packet) = next_response(transport, dejavu)? {
            if packet.msg_type() == BROADCAST_COMPUTORS {
                found = Some(ComputorSet::load(&packet.payload, trust_anchor)?);
                break;
            }
            if packet.is_end_of_response() {
                return Ok(None);
            }
        }
        if found.is_some() {
            drain_response(transport, dejavu)?;
        }
        Ok(found)
    }

    pub fn verify(&self, trust_anchor: &Pubkey) -> bool {
        trust_anchor.verify(&self.hash(), &self.signature)
    }

    pub fn get(&self, index: u16) -> Option<&Pubkey> {
        self.public_keys.get(index as usize)
    }

    fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(COMPUTOR_SET_SIZE);
        out.extend_from_slice(&self.epoch.to_le_bytes());
        for key in &self.public_keys {
            out.extend_from_slice(&key.key);
        }
        out
    }
}

impl Hashable for ComputorSet {
    fn hash(&self) -> Digest {
        digest(&self.signed_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::testing::Committee;
    use crate::network::mock::ScriptedPeer;
    use crate::network::packet::END_RESPONSE;

    #[test]
    fn test_load_signed_list() {
        let committee = Committee::new(12);
        let bytes = committee.set.to_bytes();
        assert_eq!(bytes.len(), COMPUTOR_SET_SIZE);

        let loaded = ComputorSet::load(&bytes, &committee.arbitrator.pubkey()).unwrap();
        assert!(loaded.is_verified());
        assert_eq!(loaded.value, committee.set);
    }

    #[test]
    fn test_flipped_bits_are_unverified() {
        let committee = Committee::new(12);
        let anchor = committee.arbitrator.pubkey();
        let bytes = committee.set.to_bytes();

        // epoch, first key, a middle key, last key byte, signature start and end
        for position in [0, 2, 2 + 300 * 32 + 5, SIGNED_LEN - 1, SIGNED_LEN, COMPUTOR_SET_SIZE - 1] {
            for bit in [0u8, 7] {
                let mut tampered = bytes.clone();
                tampered[position] ^= 1 << bit;
                let loaded = ComputorSet::load(&tampered, &anchor).unwrap();
                assert!(!loaded.is_verified(), "bit {bit} at {position} went unnoticed");
            }
        }
    }

    #[test]
    fn test_wrong_anchor_is_unverified() {
        let committee = Committee::new(12);
        let stranger = crate::common::crypto::Keypair::new_pair();
        let loaded = ComputorSet::load(&committee.set.to_bytes(), &stranger.pubkey()).unwrap();
        assert!(!loaded.is_verified());
    }

    #[test]
    fn test_wrong_length_is_fatal() {
        let committee = Committee::new(12);
        let bytes = committee.set.to_bytes();
        assert!(ComputorSet::load(&bytes[..bytes.len() - 1], &committee.arbitrator.pubkey()).is_err());
    }

    #[test]
    fn test_fetch_from_peer() {
        let committee = Committee::new(12);
        let bytes = committee.set.to_bytes();
        let mut peer = ScriptedPeer::new(move |request| {
            assert_eq!(request.msg_type(), REQUEST_COMPUTOR_LIST);
            vec![(BROADCAST_COMPUTORS, bytes.clone()), (END_RESPONSE, Vec::new())]
        });

        let fetched = ComputorSet::fetch(&mut peer, &committee.arbitrator.pubkey())
            .unwrap()
            .unwrap();
        assert!(fetched.is_verified());
        assert_eq!(fetched.value.epoch, committee.set.epoch);
        assert!(peer.receive().unwrap().is_none());
    }
}
