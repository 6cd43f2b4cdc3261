//! Tick archive files.
//!
//! An archive is the raw tick header followed by one record per non-empty
//! digest slot, each record being the transaction's fixed part, its input
//! and its signature. Records are written in the order they were fetched;
//! reading puts them back into the header's canonical order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use super::header::{TickHeader, TICK_HEADER_SIZE};
use super::transaction::Transaction;
use crate::common::crypto::{Digest, Hashable};
use crate::common::error::{Error, Result};
use crate::common::identity::{self, Case};

/// A tick header with its transactions in canonical order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickArchive {
    pub header: TickHeader,
    pub transactions: Vec<Transaction>,
}

pub fn write_archive<W: Write>(
    writer: &mut W,
    header: &TickHeader,
    transactions: &[Transaction],
) -> Result<()> {
    writer.write_all(&header.to_bytes())?;
    for transaction in transactions {
        writer.write_all(&transaction.to_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_archive<R: Read>(reader: &mut R) -> Result<TickArchive> {
    let mut raw = vec![0u8; TICK_HEADER_SIZE];
    if let Err(e) = reader.read_exact(&mut raw) {
        return Err(match e.kind() {
            ErrorKind::UnexpectedEof => Error::Malformed {
                what: "tick archive header",
                expected: TICK_HEADER_SIZE,
                actual: 0,
            },
            _ => e.into(),
        });
    }
    let header = TickHeader::from_bytes(&raw)?;

    let expected = header.transaction_count();
    let mut records = Vec::with_capacity(expected);
    while records.len() < expected {
        match Transaction::read_from(reader)? {
            Some(transaction) => records.push(transaction),
            None => break,
        }
    }
    debug!(tick = header.tick, expected, read = records.len(), "archive records loaded");

    let transactions = canonical_order(&header, records)?;
    Ok(TickArchive {
        header,
        transactions,
    })
}

/// Reorders fetched transactions to match the header's digest slots.
pub fn canonical_order(header: &TickHeader, records: Vec<Transaction>) -> Result<Vec<Transaction>> {
    let mut by_digest: HashMap<Digest, Transaction> = records
        .into_iter()
        .map(|transaction| (transaction.hash(), transaction))
        .collect();

    header
        .digests()
        .map(|(_, digest)| {
            by_digest
                .remove(digest)
                .ok_or_else(|| Error::IncompleteArchive(identity::encode(digest, Case::Lower)))
        })
        .collect()
}

pub fn save(path: &Path, header: &TickHeader, transactions: &[Transaction]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_archive(&mut writer, header, transactions)?;
    info!(tick = header.tick, path = %path.display(), transactions = transactions.len(), "tick archive written");
    Ok(())
}

pub fn load(path: &Path) -> Result<TickArchive> {
    let mut reader = BufReader::new(File::open(path)?);
    read_archive(&mut reader)
}
