use super::vote::{ConsensusFields, Vote};
use super::QUORUM;

/*
    Votes that agree on every consensus field form one candidate outcome
    for the tick. With 676 computors and at most 225 faulty ones, a
    candidate backed by 451 distinct computors is the tick's outcome, and
    no two candidates can both get there.
*/

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateOutcome {
    pub fields: ConsensusFields,
    /// Supporting computor indices, in the order their votes were seen.
    pub voters: Vec<u16>,
}

impl CandidateOutcome {
    pub fn support(&self) -> usize {
        self.voters.len()
    }

    pub fn has_quorum(&self) -> bool {
        self.support() >= QUORUM
    }
}

/// Groups votes by equality of their consensus fields. Every vote lands in
/// exactly one candidate; candidates keep first-seen order.
pub fn dedupe(votes: &[Vote]) -> Vec<CandidateOutcome> {
    let mut candidates: Vec<CandidateOutcome> = Vec::new();
    for vote in votes {
        let fields = vote.consensus_fields();
        match candidates.iter_mut().find(|c| c.fields == fields) {
            Some(candidate) => candidate.voters.push(vote.computor_index),
            None => candidates.push(CandidateOutcome {
                fields,
                voters: vec![vote.computor_index],
            }),
        }
    }
    candidates
}

/// The candidate that reached quorum, if any.
pub fn majority(candidates: &[CandidateOutcome]) -> Option<&CandidateOutcome> {
    candidates.iter().find(|c| c.has_quorum())
}


#[cfg(test)]
mod proptests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::consensus::testing::sample_vote;

    proptest! {
        /// Every vote ends up in exactly one candidate whose fields it
        /// carries, and no two candidates share fields.
        #[test]
        fn dedupe_is_a_partition(variants in prop::collection::vec(0u8..6, 0..120)) {
            let votes: Vec<Vote> = variants
                .iter()
                .enumerate()
                .map(|(i, variant)| sample_vote(i as u16, 77, *variant))
                .collect();
            let candidates = dedupe(&votes);

            let mut seen = HashSet::new();
            for candidate in &candidates {
                for voter in &candidate.voters {
                    prop_assert!(seen.insert(*voter));
                    prop_assert_eq!(&votes[*voter as usize].consensus_fields(), &candidate.fields);
                }
            }
            prop_assert_eq!(seen.len(), votes.len());

            for (i, a) in candidates.iter().enumerate() {
                for b in &candidates[i + 1..] {
                    prop_assert_ne!(&a.fields, &b.fields);
                }
            }
            let distinct: HashSet<u8> = variants.iter().copied().collect();
            prop_assert_eq!(candidates.len(), distinct.len());
        }
    }
}
