use tracing::{info, warn};

use super::computors::ComputorSet;
use super::resolver::{dedupe, majority, CandidateOutcome};
use super::vote::{StateDigests, Vote};
use super::QUORUM;
use crate::common::crypto::{digest_parts, short_digest_parts, Pubkey};

/*
    A vote for tick T carries the end-of-T state digests salted with the
    voter's key. Those digests only become public in tick T+1, where the
    votes report them as their "previous" digests. Taking T+1's quorum as
    ground truth, a vote for T whose salted digests do not match was cast
    without knowing T's real outcome and is dropped before T is resolved.
*/

/// How far a tick's resolution can be trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrustLevel {
    /// Votes were checked against the next tick's quorum.
    SaltVerified,
    /// Salt checking was skipped; candidates come from signature-valid
    /// votes only.
    Reduced(ReducedTrust),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReducedTrust {
    /// The next tick has fewer votes than a quorum.
    InsufficientNextTickVotes { collected: usize },
    /// The next tick has enough votes but none of its candidates reached
    /// quorum.
    NoNextTickMajority { largest: usize },
    /// The tick is the last one a `u32` can name.
    NoNextTick,
}

#[derive(Clone, Debug)]
pub struct SaltCheck {
    pub trust: TrustLevel,
    pub candidates: Vec<CandidateOutcome>,
    /// Indices whose salted digests disagreed with ground truth.
    pub rejected: Vec<u16>,
}

/// Salted form of `truth` for one voter. The resource-testing digest is
/// salted into 8 bytes, the state roots into 32.
pub fn salted_digests(voter: &Pubkey, truth: &StateDigests) -> StateDigests {
    StateDigests {
        resource_testing: short_digest_parts(&[&voter.key, &truth.resource_testing.to_le_bytes()]),
        spectrum: digest_parts(&[&voter.key, &truth.spectrum]),
        universe: digest_parts(&[&voter.key, &truth.universe]),
        computer: digest_parts(&[&voter.key, &truth.computer]),
    }
}

pub fn salt_matches(vote: &Vote, voter: &Pubkey, truth: &StateDigests) -> bool {
    salted_digests(voter, truth) == vote.salted
}

/// Resolves `votes` (tick T) using `next_votes` (tick T+1) as ground truth.
/// Both sets are expected to be signature-checked already.
pub fn cross_check(votes: &[Vote], next_votes: &[Vote], computors: &ComputorSet) -> SaltCheck {
    if next_votes.len() < QUORUM {
        warn!(
            collected = next_votes.len(),
            "not enough votes for the next tick, skipping salt check"
        );
        return reduced(
            votes,
            ReducedTrust::InsufficientNextTickVotes {
                collected: next_votes.len(),
            },
        );
    }

    let next_candidates = dedupe(next_votes);
    let Some(next_majority) = majority(&next_candidates) else {
        let largest = next_candidates.iter().map(|c| c.support()).max().unwrap_or(0);
        warn!(largest, "next tick has no quorum, skipping salt check");
        return reduced(votes, ReducedTrust::NoNextTickMajority { largest });
    };
    let truth = next_majority.fields.prev;

    let mut rejected = Vec::new();
    let mut kept = Vec::with_capacity(votes.len());
    for vote in votes {
        let valid = computors
            .get(vote.computor_index)
            .is_some_and(|key| salt_matches(vote, key, &truth));
        if valid {
            kept.push(vote.clone());
        } else {
            warn!(
                tick = vote.tick,
                computor = vote.computor_index,
                "salted digests disagree with next tick's quorum"
            );
            rejected.push(vote.computor_index);
        }
    }

    let candidates = if rejected.is_empty() {
        dedupe(votes)
    } else {
        dedupe(&kept)
    };
    info!(rejected = rejected.len(), "salt check complete");
    SaltCheck {
        trust: TrustLevel::SaltVerified,
        candidates,
        rejected,
    }
}

pub(super) fn reduced(votes: &[Vote], reason: ReducedTrust) -> SaltCheck {
    SaltCheck {
        trust: TrustLevel::Reduced(reason),
        candidates: dedupe(votes),
        rejected: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::testing::{sample_vote, split_votes, Committee};

    fn truth(seed: u8) -> StateDigests {
        StateDigests {
            resource_testing: 0x1122_3344_5566_7700 + seed as u64,
            spectrum: [seed; 32],
            universe: [seed.wrapping_add(1); 32],
            computer: [seed.wrapping_add(2); 32],
        }
    }

    #[test]
    fn test_salt_accepts_true_digest_and_rejects_other() {
        let committee = Committee::new(3);
        let key = committee.set.public_keys[17];
        let mut vote = sample_vote(17, 10, 0);
        vote.salted = salted_digests(&key, &truth(5));

        assert!(salt_matches(&vote, &key, &truth(5)));
        assert!(!salt_matches(&vote, &key, &truth(6)));

        let mut only_rt_differs = truth(5);
        only_rt_differs.resource_testing ^= 1;
        assert!(!salt_matches(&vote, &key, &only_rt_differs));
    }

    #[test]
    fn test_salt_is_per_voter() {
        let committee = Committee::new(3);
        let a = salted_digests(&committee.set.public_keys[0], &truth(1));
        let b = salted_digests(&committee.set.public_keys[1], &truth(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_reduced_trust_when_next_tick_is_short() {
        let committee = Committee::new(3);
        let votes = split_votes(20, &[460, 216]);
        let next: Vec<Vote> = split_votes(21, &[450]);

        let check = cross_check(&votes, &next, &committee.set);
        assert_eq!(
            check.trust,
            TrustLevel::Reduced(ReducedTrust::InsufficientNextTickVotes { collected: 450 })
        );
        assert_eq!(check.candidates.len(), 2);
        assert_eq!(check.candidates[0].support(), 460);
        assert!(check.rejected.is_empty());
    }

    #[test]
    fn test_reduced_trust_when_next_tick_is_split() {
        let committee = Committee::new(3);
        let votes = split_votes(20, &[460]);
        let next = split_votes(21, &[340, 336]);

        let check = cross_check(&votes, &next, &committee.set);
        assert_eq!(
            check.trust,
            TrustLevel::Reduced(ReducedTrust::NoNextTickMajority { largest: 340 })
        );
    }

    #[test]
    fn test_equivocating_votes_are_removed() {
        let committee = Committee::new(3);
        let next = split_votes(21, &[500]);
        let ground = next[0].prev;

        let mut votes = split_votes(20, &[460]);
        for vote in votes.iter_mut() {
            let key = committee.set.public_keys[vote.computor_index as usize];
            vote.salted = salted_digests(&key, &ground);
        }
        // three computors guessed the outcome
        for vote in votes.iter_mut().take(3) {
            let key = committee.set.public_keys[vote.computor_index as usize];
            vote.salted = salted_digests(&key, &truth(99));
        }

        let check = cross_check(&votes, &next, &committee.set);
        assert_eq!(check.trust, TrustLevel::SaltVerified);
        assert_eq!(check.rejected, vec![0, 1, 2]);
        assert_eq!(check.candidates.len(), 1);
        assert_eq!(check.candidates[0].support(), 457);
        assert!(check.candidates[0].has_quorum());
    }

    #[test]
    fn test_clean_votes_keep_original_set() {
        let committee = Committee::new(3);
        let next = split_votes(21, &[451]);
        let ground = next[0].prev;
        let mut votes = split_votes(20, &[455, 10]);
        for vote in votes.iter_mut() {
            let key = committee.set.public_keys[vote.computor_index as usize];
            vote.salted = salted_digests(&key, &ground);
        }

        let check = cross_check(&votes, &next, &committee.set);
        assert!(check.rejected.is_empty());
        assert_eq!(check.candidates, dedupe(&votes));
    }
}
