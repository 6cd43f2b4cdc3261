use std::collections::HashSet;

use tracing::{debug, warn};

use super::computors::ComputorSet;
use super::NUMBER_OF_COMPUTORS;
use crate::common::codec::{expect_len, ByteReader};
use crate::common::crypto::{digest, Digest, Hashable, Signature};
use crate::common::error::Result;
use crate::network::packet::{tick_request_with_flags, BROADCAST_TICK, REQUEST_QUORUM_TICK};
use crate::network::{next_response, send_request, Transport};
use crate::tick::time::{TickTime, TICK_TIME_SIZE};

/*
    A vote is one computor's account of a tick: the state digests it
    holds for the end of the previous tick, the same digests for the end
    of this tick salted with its own key (so they can be checked once the
    next tick reveals them), and digests of this and the next tick's
    transaction sets. The signature covers every byte before it, with the
    computor index XORed with the vote message type so a vote can never
    pass for another signed record.
*/

const STATE_DIGESTS_SIZE: usize = 8 + 3 * 32;
pub const VOTE_SIZE: usize = 8 + TICK_TIME_SIZE + 2 * STATE_DIGESTS_SIZE + 32 + 32 + 64;
pub const VOTE_TYPE_TAG: u16 = BROADCAST_TICK as u16;
const SIGNED_LEN: usize = VOTE_SIZE - 64;
const KNOWN_VOTE_FLAG_BYTES: usize = (NUMBER_OF_COMPUTORS + 7) / 8;

/// Resource-testing digest plus the roots of the three state partitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StateDigests {
    pub resource_testing: u64,
    pub spectrum: Digest,
    pub universe: Digest,
    pub computer: Digest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub computor_index: u16,
    pub epoch: u16,
    pub tick: u32,
    pub time: TickTime,
    pub prev: StateDigests,
    pub salted: StateDigests,
    pub transaction_digest: Digest,
    pub expected_next_tick_transaction_digest: Digest,
    pub signature: Signature,
}

/// The part of a vote honest computors agree on. Index, signature and the
/// salted digests differ per voter and are left out.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConsensusFields {
    pub epoch: u16,
    pub tick: u32,
    pub time: TickTime,
    pub prev: StateDigests,
    pub transaction_digest: Digest,
    pub expected_next_tick_transaction_digest: Digest,
}

impl Vote {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, VOTE_SIZE, "vote")?;
        let mut r = ByteReader::new(bytes, "vote");
        let computor_index = r.u16()?;
        let epoch = r.u16()?;
        let tick = r.u32()?;
        let time = TickTime::read(&mut r)?;
        let prev_resource_testing = r.u64()?;
        let salted_resource_testing = r.u64()?;
        let prev = StateDigests {
            resource_testing: prev_resource_testing,
            spectrum: r.array()?,
            universe: r.array()?,
            computer: r.array()?,
        };
        let salted = StateDigests {
            resource_testing: salted_resource_testing,
            spectrum: r.array()?,
            universe: r.array()?,
            computer: r.array()?,
        };
        Ok(Vote {
            computor_index,
            epoch,
            tick,
            time,
            prev,
            salted,
            transaction_digest: r.array()?,
            expected_next_tick_transaction_digest: r.array()?,
            signature: Signature::from(r.array::<64>()?),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.signed_bytes(self.computor_index);
        out.extend_from_slice(&self.signature.sig);
        out
    }

    pub fn consensus_fields(&self) -> ConsensusFields {
        ConsensusFields {
            epoch: self.epoch,
            tick: self.tick,
            time: self.time,
            prev: self.prev,
            transaction_digest: self.transaction_digest,
            expected_next_tick_transaction_digest: self.expected_next_tick_transaction_digest,
        }
    }

    /// Checks the signature against the key at this vote's index.
    pub fn verify(&self, computors: &ComputorSet) -> bool {
        match computors.get(self.computor_index) {
            Some(key) => key.verify(&self.hash(), &self.signature),
            None => false,
        }
    }

    fn signed_bytes(&self, index_field: u16) -> Vec<u8> {
        let mut out = Vec::with_capacity(VOTE_SIZE);
        out.extend_from_slice(&index_field.to_le_bytes());
        out.extend_from_slice(&self.epoch.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
        self.time.write(&mut out);
        out.extend_from_slice(&self.prev.resource_testing.to_le_bytes());
        out.extend_from_slice(&self.salted.resource_testing.to_le_bytes());
        out.extend_from_slice(&self.prev.spectrum);
        out.extend_from_slice(&self.prev.universe);
        out.extend_from_slice(&self.prev.computer);
        out.extend_from_slice(&self.salted.spectrum);
        out.extend_from_slice(&self.salted.universe);
        out.extend_from_slice(&self.salted.computer);
        out.extend_from_slice(&self.transaction_digest);
        out.extend_from_slice(&self.expected_next_tick_transaction_digest);
        out
    }

    #[cfg(test)]
    pub fn sign_with(mut self, keypair: &crate::common::crypto::Keypair) -> Self {
        self.signature = keypair.sign(&self.hash());
        self
    }
}

impl Hashable for Vote {
    /// Signing digest: the signed bytes with the index tagged.
    fn hash(&self) -> Digest {
        let bytes = self.signed_bytes(self.computor_index ^ VOTE_TYPE_TAG);
        debug_assert_eq!(bytes.len(), SIGNED_LEN);
        digest(&bytes)
    }
}

/// Result of collecting one tick's votes from a peer.
#[derive(Clone, Debug, Default)]
pub struct VoteCollection {
    pub accepted: Vec<Vote>,
    /// Indices whose vote failed signature verification.
    pub rejected: Vec<u16>,
    /// Indices that sent more than one valid vote; only the first counts.
    pub duplicates: Vec<u16>,
}

/// Requests every vote the peer holds for `tick`, in arrival order.
pub fn fetch_votes<T: Transport + ?Sized>(transport: &mut T, tick: u32) -> Result<Vec<Vote>> {
    let payload = tick_request_with_flags(tick, KNOWN_VOTE_FLAG_BYTES);
    let dejavu = send_request(transport, REQUEST_QUORUM_TICK, &payload)?;

    let mut votes = Vec::new();
    while let Some(packet) = next_response(transport, dejavu)? {
        if packet.is_end_of_response() {
            break;
        }
        if packet.msg_type() != BROADCAST_TICK {
            continue;
        }
        let vote = Vote::from_bytes(&packet.payload)?;
        if vote.tick != tick {
            debug!(requested = tick, got = vote.tick, "ignoring vote for another tick");
            continue;
        }
        votes.push(vote);
    }
    debug!(tick, count = votes.len(), "collected votes");
    Ok(votes)
}

/// Splits votes into signature-valid ones (one per computor) and the rest.
pub fn verify_votes(votes: Vec<Vote>, computors: &ComputorSet) -> VoteCollection {
    let mut collection = VoteCollection::default();
    let mut seen = HashSet::new();
    for vote in votes {
        if !vote.verify(computors) {
            warn!(
                tick = vote.tick,
                computor = vote.computor_index,
                "vote signature does not verify"
            );
            collection.rejected.push(vote.computor_index);
            continue;
        }
        if !seen.insert(vote.computor_index) {
            warn!(
                tick = vote.tick,
                computor = vote.computor_index,
                "computor sent more than one vote"
            );
            collection.duplicates.push(vote.computor_index);
            continue;
        }
        collection.accepted.push(vote);
    }
    collection
}

pub fn collect_votes<T: Transport + ?Sized>(
    transport: &mut T,
    tick: u32,
    computors: &ComputorSet,
) -> Result<VoteCollection> {
    let votes = fetch_votes(transport, tick)?;
    Ok(verify_votes(votes, computors))
}
