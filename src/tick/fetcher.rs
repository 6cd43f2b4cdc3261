use tracing::{debug, info};

use super::header::{TickHeader, NUMBER_OF_TRANSACTIONS_PER_TICK};
use super::transaction::Transaction;
use crate::common::error::Result;
use crate::network::packet::{
    tick_request_with_flags, BROADCAST_FUTURE_TICK_DATA, BROADCAST_TRANSACTION, REQUEST_TICK_DATA,
    REQUEST_TICK_TRANSACTIONS,
};
use crate::network::{drain_response, next_response, send_request, Transport};

const KNOWN_TRANSACTION_FLAG_BYTES: usize = NUMBER_OF_TRANSACTIONS_PER_TICK / 8;

/// A peer's answer to a tick header request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchedHeader {
    Published(Box<TickHeader>),
    /// The tick has not been produced, or produced nothing.
    Empty,
}

impl FetchedHeader {
    pub fn published(self) -> Option<TickHeader> {
        match self {
            FetchedHeader::Published(header) => Some(*header),
            FetchedHeader::Empty => None,
        }
    }
}

pub fn fetch_header<T: Transport + ?Sized>(transport: &mut T, tick: u32) -> Result<FetchedHeader> {
    let dejavu = send_request(transport, REQUEST_TICK_DATA, &tick.to_le_bytes())?;

    let mut header = None;
    while let Some(packet) = next_response(transport, dejavu)? {
        if packet.is_end_of_response() {
            break;
        }
        if packet.msg_type() == BROADCAST_FUTURE_TICK_DATA && header.is_none() {
            header = Some(TickHeader::from_bytes(&packet.payload)?);
        }
    }

    match header {
        Some(header) if !header.is_empty() => {
            debug!(tick, transactions = header.transaction_count(), "tick header received");
            Ok(FetchedHeader::Published(Box::new(header)))
        }
        _ => {
            info!(tick, "tick is empty or not produced yet");
            Ok(FetchedHeader::Empty)
        }
    }
}

/// Fetches up to `expected_count` transactions of `tick` in the order the
/// peer sends them.
pub fn fetch_transactions<T: Transport + ?Sized>(
    transport: &mut T,
    tick: u32,
    expected_count: usize,
) -> Result<Vec<Transaction>> {
    if expected_count == 0 {
        return Ok(Vec::new());
    }
    let payload = tick_request_with_flags(tick, KNOWN_TRANSACTION_FLAG_BYTES);
    let dejavu = send_request(transport, REQUEST_TICK_TRANSACTIONS, &payload)?;

    let mut transactions = Vec::with_capacity(expected_count);
    let mut finished = false;
    while transactions.len() < expected_count {
        match next_response(transport, dejavu)? {
            Some(packet) if packet.msg_type() == BROADCAST_TRANSACTION => {
                transactions.push(Transaction::from_bytes(&packet.payload)?);
            }
            Some(packet) => {
                finished = packet.is_end_of_response();
                break;
            }
            None => {
                finished = true;
                break;
            }
        }
    }
    if !finished {
        drain_response(transport, dejavu)?;
    }

    debug!(tick, expected = expected_count, got = transactions.len(), "transactions received");
    Ok(transactions)
}
