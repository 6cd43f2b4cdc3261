use std::io;

use tracing::{debug, info, warn};

use super::archive::TickArchive;
use super::fetcher::{fetch_header, fetch_transactions, FetchedHeader};
use super::header::{TickHeader, NUMBER_OF_TRANSACTIONS_PER_TICK};
use super::info::fetch_current_tick_info;
use super::transaction::Transaction;
use crate::common::checked::{Checked, Integrity};
use crate::common::codec::ByteReader;
use crate::common::crypto::{Digest, Hashable};
use crate::common::error::{Error, Result};
use crate::common::identity::same_identity;
use crate::consensus::ComputorSet;
use crate::network::packet::{REQUEST_TX_STATUS, RESPOND_TX_STATUS};
use crate::network::{drain_response, next_response, send_request, Transport};

const MONEY_FLEW_BYTES: usize = (NUMBER_OF_TRANSACTIONS_PER_TICK + 7) / 8;
const TX_STATUS_FIXED_SIZE: usize = 12 + MONEY_FLEW_BYTES;

/// Whether a located transaction actually moved funds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    MoneyFlew,
    NoMoneyFlew,
    /// The peer has no status data for the tick.
    Unknown,
}

#[derive(Clone, Debug)]
pub struct Receipt {
    pub tick: u32,
    /// Canonical slot in the tick header.
    pub slot: usize,
    pub transaction: Checked<Transaction>,
    /// Tick leader's signature on the header, `None` when no computor list
    /// was available to check it against.
    pub header_signature: Option<Integrity>,
    pub status: ExecutionStatus,
}

#[derive(Clone, Debug)]
pub enum Located {
    Found(Receipt),
    /// The network has not moved past the tick yet; ask again later.
    NotYetFinalized { tick: u32, current_tick: u32 },
    NotFound,
}

/// Execution status response. Digests follow the tick's canonical order
/// with trailing empty slots cut off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxStatusReport {
    pub current_tick_of_node: u32,
    pub tick: u32,
    pub money_flew: [u8; MONEY_FLEW_BYTES],
    pub digests: Vec<Digest>,
}

impl TxStatusReport {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes, "transaction status");
        let current_tick_of_node = r.u32()?;
        let tick = r.u32()?;
        let count = r.u32()? as usize;
        let money_flew = r.array::<MONEY_FLEW_BYTES>()?;
        if count > NUMBER_OF_TRANSACTIONS_PER_TICK || r.remaining() != count * 32 {
            return Err(Error::Malformed {
                what: "transaction status",
                expected: TX_STATUS_FIXED_SIZE + count.min(NUMBER_OF_TRANSACTIONS_PER_TICK) * 32,
                actual: bytes.len(),
            });
        }
        let mut digests = Vec::with_capacity(count);
        for _ in 0..count {
            digests.push(r.array()?);
        }
        Ok(TxStatusReport {
            current_tick_of_node,
            tick,
            money_flew,
            digests,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TX_STATUS_FIXED_SIZE + self.digests.len() * 32);
        out.extend_from_slice(&self.current_tick_of_node.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
        out.extend_from_slice(&(self.digests.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.money_flew);
        for digest in &self.digests {
            out.extend_from_slice(digest);
        }
        out
    }

    pub fn status_of(&self, digest: &Digest) -> ExecutionStatus {
        match self.digests.iter().position(|d| d == digest) {
            Some(i) if self.money_flew[i / 8] & (1 << (i % 8)) != 0 => ExecutionStatus::MoneyFlew,
            Some(_) => ExecutionStatus::NoMoneyFlew,
            None => ExecutionStatus::Unknown,
        }
    }
}

/// `None` when the peer keeps no status for `tick`.
pub fn fetch_tx_status<T: Transport + ?Sized>(
    transport: &mut T,
    tick: u32,
) -> Result<Option<TxStatusReport>> {
    let dejavu = send_request(transport, REQUEST_TX_STATUS, &tick.to_le_bytes())?;
    let mut report = None;
    while let Some(packet) = next_response(transport, dejavu)? {
        if packet.msg_type() == RESPOND_TX_STATUS {
            report = Some(TxStatusReport::from_bytes(&packet.payload)?);
            break;
        }
        if packet.is_end_of_response() {
            return Ok(None);
        }
    }
    if report.is_some() {
        drain_response(transport, dejavu)?;
    }
    Ok(report)
}

/// Looks for the transaction identified by `hash` in `tick`. With
/// `computors` the tick header's signature is checked as well.
pub fn locate<T: Transport + ?Sized>(
    transport: &mut T,
    hash: &str,
    tick: u32,
    computors: Option<&ComputorSet>,
) -> Result<Located> {
    let current = fetch_current_tick_info(transport)?.ok_or_else(|| {
        Error::Connectivity(io::Error::new(
            io::ErrorKind::TimedOut,
            "node did not report its current tick",
        ))
    })?;
    if current.tick <= tick {
        debug!(tick, current = current.tick, "tick not finalized yet");
        return Ok(Located::NotYetFinalized {
            tick,
            current_tick: current.tick,
        });
    }

    let header = match fetch_header(transport, tick)? {
        FetchedHeader::Published(header) => header,
        FetchedHeader::Empty => return Ok(Located::NotFound),
    };
    let transactions = fetch_transactions(transport, tick, header.transaction_count())?;

    let Some((slot, transaction)) = find_in(&header, transactions, hash) else {
        info!(tick, hash, "transaction not in tick");
        return Ok(Located::NotFound);
    };
    let status = match fetch_tx_status(transport, tick)? {
        Some(report) => report.status_of(&transaction.hash()),
        None => ExecutionStatus::Unknown,
    };
    let header_signature = check_header(&header, computors);
    Ok(Located::Found(receipt(tick, slot, transaction, header_signature, status)))
}

/// Offline lookup in a loaded archive. Execution status is not recorded in
/// archives and is always `Unknown`.
pub fn locate_in_archive(
    archive: &TickArchive,
    hash: &str,
    computors: Option<&ComputorSet>,
) -> Located {
    match find_in(&archive.header, archive.transactions.clone(), hash) {
        Some((slot, transaction)) => Located::Found(receipt(
            archive.header.tick,
            slot,
            transaction,
            check_header(&archive.header, computors),
            ExecutionStatus::Unknown,
        )),
        None => Located::NotFound,
    }
}

fn check_header(header: &TickHeader, computors: Option<&ComputorSet>) -> Option<Integrity> {
    let computors = computors?;
    if header.verify(computors) {
        Some(Integrity::Verified)
    } else {
        warn!(
            tick = header.tick,
            computor = header.computor_index,
            "tick header signature does not verify"
        );
        Some(Integrity::Unverified)
    }
}

fn find_in(
    header: &TickHeader,
    transactions: Vec<Transaction>,
    hash: &str,
) -> Option<(usize, Transaction)> {
    let transaction = transactions
        .into_iter()
        .find(|tx| same_identity(&tx.id(), hash))?;
    let digest = transaction.hash();
    let slot = header
        .digests()
        .find(|(_, d)| **d == digest)
        .map(|(slot, _)| slot)?;
    Some((slot, transaction))
}

fn receipt(
    tick: u32,
    slot: usize,
    transaction: Transaction,
    header_signature: Option<Integrity>,
    status: ExecutionStatus,
) -> Receipt {
    let verified = transaction.verify();
    if !verified {
        warn!(tick, id = %transaction.id(), "transaction signature does not verify");
    }
    Receipt {
        tick,
        slot,
        transaction: Checked::new(transaction, verified),
        header_signature,
        status,
    }
}
