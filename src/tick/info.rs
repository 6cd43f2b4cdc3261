use tracing::debug;

use crate::common::codec::{expect_len, ByteReader};
use crate::common::error::Result;
use crate::network::packet::{REQUEST_CURRENT_TICK_INFO, RESPOND_CURRENT_TICK_INFO};
use crate::network::{next_response, send_request, Transport, WaitStrategy};

pub const CURRENT_TICK_INFO_SIZE: usize = 16;

/// A node's view of where the network is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentTickInfo {
    pub tick_duration: u16,
    pub epoch: u16,
    pub tick: u32,
    pub aligned_votes: u16,
    pub misaligned_votes: u16,
    pub initial_tick: u32,
}

impl CurrentTickInfo {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, CURRENT_TICK_INFO_SIZE, "current tick info")?;
        let mut r = ByteReader::new(bytes, "current tick info");
        Ok(CurrentTickInfo {
            tick_duration: r.u16()?,
            epoch: r.u16()?,
            tick: r.u32()?,
            aligned_votes: r.u16()?,
            misaligned_votes: r.u16()?,
            initial_tick: r.u32()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CURRENT_TICK_INFO_SIZE);
        out.extend_from_slice(&self.tick_duration.to_le_bytes());
        out.extend_from_slice(&self.epoch.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
        out.extend_from_slice(&self.aligned_votes.to_le_bytes());
        out.extend_from_slice(&self.misaligned_votes.to_le_bytes());
        out.extend_from_slice(&self.initial_tick.to_le_bytes());
        out
    }
}

/// `None` if the peer did not answer.
pub fn fetch_current_tick_info<T: Transport + ?Sized>(
    transport: &mut T,
) -> Result<Option<CurrentTickInfo>> {
    let dejavu = send_request(transport, REQUEST_CURRENT_TICK_INFO, &[])?;
    while let Some(packet) = next_response(transport, dejavu)? {
        if packet.msg_type() == RESPOND_CURRENT_TICK_INFO {
            let info = CurrentTickInfo::from_bytes(&packet.payload)?;
            debug!(tick = info.tick, epoch = info.epoch, "current tick info");
            return Ok(Some(info));
        }
        if packet.is_end_of_response() {
            return Ok(None);
        }
    }
    Ok(None)
}

/// Polls until the node reports a tick past `tick`. Returns the last info
/// seen once that happens, or `None` when `strategy` gives up first.
pub fn wait_for_tick<T, W>(
    transport: &mut T,
    tick: u32,
    strategy: &mut W,
) -> Result<Option<CurrentTickInfo>>
where
    T: Transport + ?Sized,
    W: WaitStrategy + ?Sized,
{
    let mut attempt = 0;
    loop {
        if let Some(info) = fetch_current_tick_info(transport)? {
            if info.tick > tick {
                return Ok(Some(info));
            }
            debug!(current = info.tick, target = tick, attempt, "waiting for tick");
        }
        if !strategy.wait(attempt) {
            return Ok(None);
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::network::mock::ScriptedPeer;
    use crate::network::{FixedInterval, NoWait};

    fn info(tick: u32) -> CurrentTickInfo {
        CurrentTickInfo {
            tick_duration: 1000,
            epoch: 150,
            tick,
            aligned_votes: 600,
            misaligned_votes: 3,
            initial_tick: 100,
        }
    }

    #[test]
    fn test_decode() {
        let bytes = info(123).to_bytes();
        assert_eq!(CurrentTickInfo::from_bytes(&bytes).unwrap(), info(123));
        assert!(CurrentTickInfo::from_bytes(&bytes[..15]).is_err());
    }

    #[test]
    fn test_wait_until_tick_passes() {
        let mut tick = 98;
        let mut peer = ScriptedPeer::new(move |_| {
            tick += 1;
            vec![(RESPOND_CURRENT_TICK_INFO, info(tick).to_bytes())]
        });
        let mut strategy = FixedInterval::new(Duration::ZERO);

        let reached = wait_for_tick(&mut peer, 100, &mut strategy).unwrap().unwrap();
        assert_eq!(reached.tick, 101);
        assert_eq!(peer.requests_of_type(REQUEST_CURRENT_TICK_INFO), 3);
    }

    #[test]
    fn test_wait_gives_up() {
        let mut peer = ScriptedPeer::new(|_| vec![(RESPOND_CURRENT_TICK_INFO, info(5).to_bytes())]);
        assert!(wait_for_tick(&mut peer, 100, &mut NoWait).unwrap().is_none());
    }
}
