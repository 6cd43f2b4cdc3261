use super::time::{TickTime, TICK_TIME_SIZE};
use crate::common::codec::{expect_len, ByteReader};
use crate::common::crypto::{digest, is_zero, Digest, Hashable, Signature};
use crate::common::error::Result;
use crate::consensus::ComputorSet;
use crate::network::packet::BROADCAST_FUTURE_TICK_DATA;

pub const NUMBER_OF_TRANSACTIONS_PER_TICK: usize = 1024;
pub const MAX_NUMBER_OF_CONTRACTS: usize = 1024;
pub const PROPOSAL_SIZE: usize = 256;
pub const TICK_HEADER_SIZE: usize = 8
    + TICK_TIME_SIZE
    + PROPOSAL_SIZE
    + 32
    + NUMBER_OF_TRANSACTIONS_PER_TICK * 32
    + MAX_NUMBER_OF_CONTRACTS * 8
    + 64;
pub const TICK_HEADER_TYPE_TAG: u16 = BROADCAST_FUTURE_TICK_DATA as u16;

/// The tick leader's published record of a tick. The order of
/// `transaction_digests` is the canonical transaction order; zero digests
/// are empty slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickHeader {
    pub computor_index: u16,
    pub epoch: u16,
    pub tick: u32,
    pub time: TickTime,
    /// Proposal URI (first byte is its length) or ballot (first byte zero).
    pub proposal: [u8; PROPOSAL_SIZE],
    pub timelock: Digest,
    pub transaction_digests: Vec<Digest>,
    pub contract_fees: Vec<i64>,
    pub signature: Signature,
}

impl TickHeader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, TICK_HEADER_SIZE, "tick header")?;
        let mut r = ByteReader::new(bytes, "tick header");
        let computor_index = r.u16()?;
        let epoch = r.u16()?;
        let tick = r.u32()?;
        let time = TickTime::read(&mut r)?;
        let proposal = r.array::<PROPOSAL_SIZE>()?;
        let timelock = r.array()?;
        let mut transaction_digests = Vec::with_capacity(NUMBER_OF_TRANSACTIONS_PER_TICK);
        for _ in 0..NUMBER_OF_TRANSACTIONS_PER_TICK {
            transaction_digests.push(r.array()?);
        }
        let mut contract_fees = Vec::with_capacity(MAX_NUMBER_OF_CONTRACTS);
        for _ in 0..MAX_NUMBER_OF_CONTRACTS {
            contract_fees.push(r.i64()?);
        }
        let signature = Signature::from(r.array::<64>()?);
        Ok(TickHeader {
            computor_index,
            epoch,
            tick,
            time,
            proposal,
            timelock,
            transaction_digests,
            contract_fees,
            signature,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.signed_bytes(self.computor_index);
        out.extend_from_slice(&self.signature.sig);
        out
    }

    /// A zero epoch marks a tick that has not been produced.
    pub fn is_empty(&self) -> bool {
        self.epoch == 0
    }

    /// Non-zero digests in canonical order, with their slot numbers.
    pub fn digests(&self) -> impl Iterator<Item = (usize, &Digest)> {
        self.transaction_digests
            .iter()
            .enumerate()
            .filter(|(_, d)| !is_zero(d))
    }

    pub fn transaction_count(&self) -> usize {
        self.digests().count()
    }

    pub fn proposal_uri(&self) -> Option<&[u8]> {
        match self.proposal[0] as usize {
            0 => None,
            len => Some(&self.proposal[1..(1 + len).min(PROPOSAL_SIZE)]),
        }
    }

    /// Checks the leader's signature against the computor at this
    /// header's index.
    pub fn verify(&self, computors: &ComputorSet) -> bool {
        match computors.get(self.computor_index) {
            Some(key) => key.verify(&self.hash(), &self.signature),
            None => false,
        }
    }

    fn signed_bytes(&self, index_field: u16) -> Vec<u8> {
        let mut out = Vec::with_capacity(TICK_HEADER_SIZE);
        out.extend_from_slice(&index_field.to_le_bytes());
        out.extend_from_slice(&self.epoch.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
        self.time.write(&mut out);
        out.extend_from_slice(&self.proposal);
        out.extend_from_slice(&self.timelock);
        for digest in &self.transaction_digests {
            out.extend_from_slice(digest);
        }
        for fee in &self.contract_fees {
            out.extend_from_slice(&fee.to_le_bytes());
        }
        out
    }

    #[cfg(test)]
    pub fn empty_for_test(tick: u32) -> Self {
        TickHeader {
            computor_index: 0,
            epoch: 0,
            tick,
            time: TickTime::default(),
            proposal: [0u8; PROPOSAL_SIZE],
            timelock: [0u8; 32],
            transaction_digests: vec![[0u8; 32]; NUMBER_OF_TRANSACTIONS_PER_TICK],
            contract_fees: vec![0; MAX_NUMBER_OF_CONTRACTS],
            signature: Signature::zeroed(),
        }
    }
}

impl Hashable for TickHeader {
    fn hash(&self) -> Digest {
        digest(&self.signed_bytes(self.computor_index ^ TICK_HEADER_TYPE_TAG))
    }
}
