use tracing::{info, warn};

use super::computors::ComputorSet;
use super::resolver::{majority, CandidateOutcome};
use super::salt::{cross_check, reduced, ReducedTrust, TrustLevel};
use super::vote::collect_votes;
use crate::common::error::Result;
use crate::network::Transport;

/// Everything learned about one tick's votes.
#[derive(Clone, Debug)]
pub struct QuorumReport {
    pub tick: u32,
    /// Tick whose votes served as ground truth. `None` when `tick` has no
    /// successor.
    pub next_tick: Option<u32>,
    pub votes_collected: usize,
    pub candidates: Vec<CandidateOutcome>,
    pub signature_rejected: Vec<u16>,
    pub duplicate_voters: Vec<u16>,
    pub salt_rejected: Vec<u16>,
    pub trust: TrustLevel,
}

impl QuorumReport {
    pub fn majority(&self) -> Option<&CandidateOutcome> {
        majority(&self.candidates)
    }

    pub fn is_reduced_trust(&self) -> bool {
        matches!(self.trust, TrustLevel::Reduced(_))
    }
}

/// Collects and verifies the votes for `tick` and `tick + 1`, then
/// resolves `tick` with the salt check applied when possible.
pub fn verify_quorum_tick<T: Transport + ?Sized>(
    transport: &mut T,
    computors: &ComputorSet,
    tick: u32,
) -> Result<QuorumReport> {
    let current = collect_votes(transport, tick, computors)?;
    let next_tick = tick.checked_add(1);
    let check = match next_tick {
        Some(next_tick) => {
            let next = collect_votes(transport, next_tick, computors)?;
            cross_check(&current.accepted, &next.accepted, computors)
        }
        None => {
            warn!(tick, "no next tick to check salted digests against");
            reduced(&current.accepted, ReducedTrust::NoNextTick)
        }
    };
    let votes_collected =
        current.accepted.len() + current.rejected.len() + current.duplicates.len();

    let report = QuorumReport {
        tick,
        next_tick,
        votes_collected,
        candidates: check.candidates,
        signature_rejected: current.rejected,
        duplicate_voters: current.duplicates,
        salt_rejected: check.rejected,
        trust: check.trust,
    };
    info!(
        tick,
        candidates = report.candidates.len(),
        majority = report.majority().map(|c| c.support()),
        reduced_trust = report.is_reduced_trust(),
        "quorum resolved"
    );
    Ok(report)
}
