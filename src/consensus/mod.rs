pub mod computors;
pub mod quorum;
pub mod resolver;
pub mod salt;
pub mod vote;

pub use computors::*;
pub use quorum::*;
pub use resolver::*;
pub use salt::*;
pub use vote::*;

pub const NUMBER_OF_COMPUTORS: usize = 676;
/// Votes needed to accept an outcome: more than two thirds of the computors.
pub const QUORUM: usize = NUMBER_OF_COMPUTORS * 2 / 3 + 1;

/// Two-letter code for a computor index, `AA` for 0 through `ZZ` for 675.
/// Indices outside the epoch render as `#<index>`.
pub fn computor_code(index: u16) -> String {
    let index = index as usize;
    if index >= NUMBER_OF_COMPUTORS {
        return format!("#{index}");
    }
    let first = (b'A' + (index / 26) as u8) as char;
    let second = (b'A' + (index % 26) as u8) as char;
    format!("{first}{second}")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::common::crypto::{Hashable, Keypair, Signature};
    use crate::tick::time::TickTime;

    /// A full epoch of computors plus the key that signed their list.
    pub struct Committee {
        pub arbitrator: Keypair,
        pub keypairs: Vec<Keypair>,
        pub set: ComputorSet,
    }

    impl Committee {
        pub fn new(epoch: u16) -> Self {
            let arbitrator = Keypair::new_pair();
            let keypairs: Vec<Keypair> = (0..NUMBER_OF_COMPUTORS).map(|_| Keypair::new_pair()).collect();
            let mut set = ComputorSet {
                epoch,
                public_keys: keypairs.iter().map(|k| k.pubkey()).collect(),
                signature: Signature::zeroed(),
            };
            set.signature = arbitrator.sign(&set.hash());
            Committee {
                arbitrator,
                keypairs,
                set,
            }
        }
    }

    fn filled(tick: u32, variant: u8, lane: u8) -> [u8; 32] {
        let mut out = [variant.wrapping_mul(31) ^ lane; 32];
        out[..4].copy_from_slice(&tick.to_le_bytes());
        out[4] = variant;
        out
    }

    /// Unsigned vote whose consensus fields depend only on `tick` and
    /// `variant`.
    pub fn sample_vote(index: u16, tick: u32, variant: u8) -> Vote {
        Vote {
            computor_index: index,
            epoch: 90,
            tick,
            time: TickTime {
                millisecond: 125,
                second: 7,
                minute: 30,
                hour: 12,
                day: 19,
                month: 10,
                year: 26,
            },
            prev: StateDigests {
                resource_testing: ((tick as u64) << 8) | variant as u64,
                spectrum: filled(tick, variant, 1),
                universe: filled(tick, variant, 2),
                computer: filled(tick, variant, 3),
            },
            salted: StateDigests::default(),
            transaction_digest: filled(tick, variant, 4),
            expected_next_tick_transaction_digest: filled(tick, variant, 5),
            signature: Signature::zeroed(),
        }
    }

    /// Consecutive computor indices split into groups of the given sizes,
    /// each group voting for its own outcome.
    pub fn split_votes(tick: u32, sizes: &[usize]) -> Vec<Vote> {
        let mut votes = Vec::new();
        let mut index = 0u16;
        for (variant, size) in sizes.iter().enumerate() {
            for _ in 0..*size {
                votes.push(sample_vote(index, tick, variant as u8));
                index += 1;
            }
        }
        votes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_threshold() {
        assert_eq!(QUORUM, 451);
        assert_eq!(NUMBER_OF_COMPUTORS - QUORUM, 225);
    }

    #[test]
    fn test_computor_codes() {
        assert_eq!(computor_code(0), "AA");
        assert_eq!(computor_code(27), "BB");
        assert_eq!(computor_code(675), "ZZ");
    }

    #[test]
    fn test_out_of_range_computor_code() {
        assert_eq!(computor_code(676), "#676");
        assert_eq!(computor_code(u16::MAX), "#65535");
    }
}
