//! Handlers behind the `tick-quorum` subcommands.
//!
//! Each handler opens its own connection, runs one verification to the
//! end and prints the outcome. Argument parsing lives in `main.rs`.

use std::path::Path;

use anyhow::{bail, Context as _};
use tracing::warn;

use crate::common::checked::{Checked, Integrity};
use crate::common::config::Context;
use crate::common::crypto::{Digest, Pubkey};
use crate::common::identity::{self, Case};
use crate::consensus::{computor_code, verify_quorum_tick, ComputorSet, QuorumReport, ReducedTrust, TrustLevel};
use crate::network::{TcpConnection, WaitStrategy};
use crate::tick::archive::{self, TickArchive};
use crate::tick::{
    fetch_current_tick_info, fetch_header, fetch_transactions, locate, locate_in_archive, wait_for_tick,
    ExecutionStatus, FetchedHeader, Located, Receipt,
};

fn trust_anchor(ctx: &Context) -> anyhow::Result<&Pubkey> {
    ctx.trust_anchor
        .as_ref()
        .context("no trust anchor configured, pass --arbitrator <IDENTITY>")
}

fn load_computors(ctx: &Context, path: &Path) -> anyhow::Result<Checked<ComputorSet>> {
    let anchor = trust_anchor(ctx)?;
    ComputorSet::read_file(path, anchor)
        .with_context(|| format!("failed to load computor list {}", path.display()))
}

fn digest_text(digest: &Digest) -> String {
    identity::encode(digest, Case::Lower)
}

pub fn get_current_tick(ctx: &Context) -> anyhow::Result<()> {
    let mut connection = TcpConnection::connect(ctx)?;
    let info = fetch_current_tick_info(&mut connection)?.context("node did not report its tick")?;
    println!("Tick: {}", info.tick);
    println!("Epoch: {}", info.epoch);
    println!("Tick duration: {}", info.tick_duration);
    println!("Aligned votes: {}", info.aligned_votes);
    println!("Misaligned votes: {}", info.misaligned_votes);
    println!("Initial tick: {}", info.initial_tick);
    Ok(())
}

pub fn get_computor_list(ctx: &Context, out: &Path) -> anyhow::Result<()> {
    let anchor = trust_anchor(ctx)?;
    let mut connection = TcpConnection::connect(ctx)?;
    let computors = ComputorSet::fetch(&mut connection, anchor)?
        .context("node did not send a computor list")?;
    if !computors.is_verified() {
        bail!(
            "computor list for epoch {} is not signed by the trust anchor, not saving it",
            computors.value.epoch
        );
    }
    computors.value.write_file(out)?;
    println!(
        "Computor list for epoch {} written to {}",
        computors.value.epoch,
        out.display()
    );
    Ok(())
}

pub fn get_quorum_tick(
    ctx: &Context,
    computor_file: &Path,
    tick: u32,
    allow_unverified: bool,
) -> anyhow::Result<()> {
    let computors = load_computors(ctx, computor_file)?;
    if !computors.is_verified() {
        if !allow_unverified {
            bail!("computor list signature does not verify, refusing to evaluate votes");
        }
        warn!("evaluating votes against an unverified computor list");
        println!("WARNING: computor list is NOT verified");
    }
    let mut connection = TcpConnection::connect(ctx)?;
    let report = verify_quorum_tick(&mut connection, &computors.value, tick)?;
    print_quorum_report(&report);
    Ok(())
}

pub fn print_quorum_report(report: &QuorumReport) {
    println!(
        "Tick {}: {} votes received, {} distinct outcomes",
        report.tick,
        report.votes_collected,
        report.candidates.len()
    );
    let next = match report.next_tick {
        Some(next) => next.to_string(),
        None => "none".to_string(),
    };
    match &report.trust {
        TrustLevel::SaltVerified => println!("Salted digests checked against tick {next}"),
        TrustLevel::Reduced(ReducedTrust::InsufficientNextTickVotes { collected }) => println!(
            "REDUCED TRUST: only {collected} votes for tick {next}, salted digests not checked"
        ),
        TrustLevel::Reduced(ReducedTrust::NoNextTickMajority { largest }) => println!(
            "REDUCED TRUST: tick {next} has no quorum (largest outcome {largest}), salted digests not checked"
        ),
        TrustLevel::Reduced(ReducedTrust::NoNextTick) => println!(
            "REDUCED TRUST: tick {} has no successor, salted digests not checked",
            report.tick
        ),
    }

    for (i, candidate) in report.candidates.iter().enumerate() {
        let fields = &candidate.fields;
        let verdict = if candidate.has_quorum() { " QUORUM" } else { "" };
        println!();
        println!("Outcome #{} ({} votes){verdict}", i + 1, candidate.support());
        println!("  Epoch: {}  Tick: {}  Time: {}", fields.epoch, fields.tick, fields.time);
        println!("  Prev resource testing digest: {}", fields.prev.resource_testing);
        println!("  Prev spectrum digest: {}", digest_text(&fields.prev.spectrum));
        println!("  Prev universe digest: {}", digest_text(&fields.prev.universe));
        println!("  Prev computer digest: {}", digest_text(&fields.prev.computer));
        println!("  Transaction digest: {}", digest_text(&fields.transaction_digest));
        println!(
            "  Expected next tick transaction digest: {}",
            digest_text(&fields.expected_next_tick_transaction_digest)
        );
        let voters: Vec<String> = candidate.voters.iter().map(|i| computor_code(*i)).collect();
        println!("  Voters: {}", voters.join(" "));
    }

    print_indices("Bad signatures", &report.signature_rejected);
    print_indices("Duplicate votes", &report.duplicate_voters);
    print_indices("Failed salt check", &report.salt_rejected);
    if report.majority().is_none() {
        println!();
        println!("No outcome reached quorum");
    }
}

fn print_indices(label: &str, indices: &[u16]) {
    if indices.is_empty() {
        return;
    }
    let codes: Vec<String> = indices.iter().map(|i| computor_code(*i)).collect();
    println!("{label} ({}): {}", indices.len(), codes.join(" "));
}

pub fn get_tick_data(ctx: &Context, tick: u32, out: &Path) -> anyhow::Result<()> {
    let mut connection = TcpConnection::connect(ctx)?;
    let header = match fetch_header(&mut connection, tick)? {
        FetchedHeader::Published(header) => header,
        FetchedHeader::Empty => {
            println!("Tick {tick} is empty or not produced yet, nothing written");
            return Ok(());
        }
    };
    let expected = header.transaction_count();
    let transactions = fetch_transactions(&mut connection, tick, expected)?;
    if transactions.len() < expected {
        warn!(tick, expected, got = transactions.len(), "node sent fewer transactions than the header lists");
    }
    archive::save(out, &header, &transactions)?;
    println!(
        "Tick {tick}: header and {}/{expected} transactions written to {}",
        transactions.len(),
        out.display()
    );
    Ok(())
}

pub fn read_tick_data(ctx: &Context, file: &Path, computor_file: Option<&Path>) -> anyhow::Result<()> {
    let archive = archive::load(file).with_context(|| format!("failed to read {}", file.display()))?;
    let header = &archive.header;
    println!("Tick: {}", header.tick);
    println!("Epoch: {}", header.epoch);
    println!("Computor: {}", computor_code(header.computor_index));
    println!("Time: {}", header.time);
    println!("Timelock: {}", digest_text(&header.timelock));
    if let Some(uri) = header.proposal_uri() {
        println!("Proposal: {}", String::from_utf8_lossy(uri));
    }

    match computor_file {
        Some(path) => {
            let computors = load_computors(ctx, path)?;
            if !computors.is_verified() {
                println!("WARNING: computor list is NOT verified");
            }
            if computors.value.epoch != header.epoch {
                println!(
                    "WARNING: computor list is for epoch {}, tick is in epoch {}",
                    computors.value.epoch, header.epoch
                );
            }
            if header.verify(&computors.value) {
                println!("Tick header signature: valid");
            } else {
                println!("Tick header signature: INVALID");
            }
        }
        None => println!("Tick header signature: not checked (no computor list)"),
    }

    print_transactions(&archive);
    Ok(())
}

fn print_transactions(archive: &TickArchive) {
    println!("Transactions: {}", archive.transactions.len());
    for transaction in &archive.transactions {
        let signature = if transaction.verify() { "valid" } else { "INVALID" };
        println!();
        println!("  {}", transaction.id());
        println!("    From: {}", transaction.source.identity());
        println!("    To: {}", transaction.destination.identity());
        println!("    Amount: {}", transaction.amount);
        println!(
            "    Input: type {}, {} bytes",
            transaction.input_type,
            transaction.input.len()
        );
        println!("    Signature: {signature}");
    }
}

/// Loads the computor list for header checks, if one was given.
fn optional_computors(ctx: &Context, path: Option<&Path>) -> anyhow::Result<Option<ComputorSet>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let computors = load_computors(ctx, path)?;
    if !computors.is_verified() {
        bail!("computor list signature does not verify, refusing to check tick headers against it");
    }
    Ok(Some(computors.value))
}

pub fn check_tx_on_tick(
    ctx: &Context,
    tick: u32,
    hash: &str,
    computor_file: Option<&Path>,
    strategy: &mut dyn WaitStrategy,
) -> anyhow::Result<()> {
    let computors = optional_computors(ctx, computor_file)?;
    let mut connection = TcpConnection::connect(ctx)?;
    if wait_for_tick(&mut connection, tick, strategy)?.is_none() {
        println!("Tick {tick} is not finalized yet, try again later");
        return Ok(());
    }
    report_location(locate(&mut connection, hash, tick, computors.as_ref())?, hash);
    Ok(())
}

pub fn check_tx_on_file(
    ctx: &Context,
    hash: &str,
    file: &Path,
    computor_file: Option<&Path>,
) -> anyhow::Result<()> {
    let computors = optional_computors(ctx, computor_file)?;
    let archive = archive::load(file).with_context(|| format!("failed to read {}", file.display()))?;
    report_location(locate_in_archive(&archive, hash, computors.as_ref()), hash);
    Ok(())
}

fn report_location(located: Located, hash: &str) {
    match located {
        Located::Found(receipt) => print_receipt(&receipt),
        Located::NotYetFinalized { tick, current_tick } => {
            println!("Tick {tick} is not finalized yet (node is at tick {current_tick})")
        }
        Located::NotFound => println!("Transaction {hash} was not found"),
    }
}

fn print_receipt(receipt: &Receipt) {
    let transaction = &receipt.transaction.value;
    println!("Found {} in tick {} (slot {})", transaction.id(), receipt.tick, receipt.slot);
    println!("From: {}", transaction.source.identity());
    println!("To: {}", transaction.destination.identity());
    println!("Amount: {}", transaction.amount);
    println!("Input type: {}", transaction.input_type);
    if receipt.transaction.is_verified() {
        println!("Signature: valid");
    } else {
        println!("Signature: INVALID");
    }
    match receipt.header_signature {
        Some(Integrity::Verified) => println!("Tick header signature: valid"),
        Some(Integrity::Unverified) => println!("Tick header signature: INVALID"),
        None => println!("Tick header signature: not checked (no computor list)"),
    }
    match receipt.status {
        ExecutionStatus::MoneyFlew => println!("Money flew: yes"),
        ExecutionStatus::NoMoneyFlew => println!("Money flew: no"),
        ExecutionStatus::Unknown => println!("Money flew: unknown"),
    }
}
