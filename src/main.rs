/*
    The network advances in ticks. For every tick each of the epoch's 676
    computors publishes a signed vote, and the tick's outcome is the one
    at least 451 of them agree on. Votes for tick T also carry T's
    resulting state digests salted with the voter's key; once tick T+1
    reveals those digests, any vote whose salt does not match was cast
    blind. This tool asks a single node for votes, tick headers and
    transactions and verifies all of it locally.
*/

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tick_quorum::commands;
use tick_quorum::common::config::{Context, DEFAULT_NODE_PORT};
use tick_quorum::common::crypto::Pubkey;
use tick_quorum::network::FixedInterval;

/// Quorum and transaction verification client.
#[derive(Parser, Debug)]
#[command(name = "tick-quorum", version, about)]
struct Cli {
    /// Node to query.
    #[arg(long, global = true, default_value = "127.0.0.1")]
    node_ip: String,

    #[arg(long, global = true, default_value_t = DEFAULT_NODE_PORT)]
    node_port: u16,

    /// How long to wait for a node to answer before treating the answer as complete.
    #[arg(long, global = true, default_value_t = 2000)]
    timeout_ms: u64,

    /// Identity of the key that signs computor lists.
    #[arg(long, global = true)]
    arbitrator: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the node's current tick and epoch.
    #[command(name = "getcurrenttick")]
    GetCurrentTick,
    /// Fetch the epoch's computor list and save it.
    #[command(name = "getcomputorlist")]
    GetComputorList { out_file: PathBuf },
    /// Resolve a tick's votes into outcomes.
    #[command(name = "getquorumtick")]
    GetQuorumTick {
        computor_file: PathBuf,
        tick: u32,
        /// Continue even if the computor list signature does not verify.
        #[arg(long)]
        allow_unverified: bool,
    },
    /// Save a tick's header and transactions to an archive file.
    #[command(name = "gettickdata")]
    GetTickData { tick: u32, out_file: PathBuf },
    /// Print and verify a tick archive.
    #[command(name = "readtickdata")]
    ReadTickData {
        file: PathBuf,
        computor_file: Option<PathBuf>,
    },
    /// Check whether a transaction made it into a tick.
    #[command(name = "checktxontick")]
    CheckTxOnTick {
        tick: u32,
        hash: String,
        /// Poll interval while waiting for the tick to pass.
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
        /// Give up after this many polls.
        #[arg(long)]
        max_polls: Option<u32>,
        /// Computor list used to check the tick header's signature.
        #[arg(long)]
        computor_file: Option<PathBuf>,
    },
    /// Check whether a transaction is in a tick archive.
    #[command(name = "checktxonfile")]
    CheckTxOnFile {
        hash: String,
        file: PathBuf,
        /// Computor list used to check the tick header's signature.
        #[arg(long)]
        computor_file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut ctx = Context::new(cli.node_ip)
        .with_port(cli.node_port)
        .with_receive_timeout(Duration::from_millis(cli.timeout_ms));
    if let Some(arbitrator) = &cli.arbitrator {
        ctx = ctx.with_trust_anchor(Pubkey::from_identity(arbitrator)?);
    }

    match cli.command {
        Commands::GetCurrentTick => commands::get_current_tick(&ctx),
        Commands::GetComputorList { out_file } => commands::get_computor_list(&ctx, &out_file),
        Commands::GetQuorumTick {
            computor_file,
            tick,
            allow_unverified,
        } => commands::get_quorum_tick(&ctx, &computor_file, tick, allow_unverified),
        Commands::GetTickData { tick, out_file } => commands::get_tick_data(&ctx, tick, &out_file),
        Commands::ReadTickData {
            file,
            computor_file,
        } => commands::read_tick_data(&ctx, &file, computor_file.as_deref()),
        Commands::CheckTxOnTick {
            tick,
            hash,
            poll_ms,
            max_polls,
            computor_file,
        } => {
            let mut strategy = FixedInterval::new(Duration::from_millis(poll_ms));
            if let Some(max) = max_polls {
                strategy = strategy.with_max_attempts(max);
            }
            commands::check_tx_on_tick(&ctx, tick, &hash, computor_file.as_deref(), &mut strategy)
        }
        Commands::CheckTxOnFile {
            hash,
            file,
            computor_file,
        } => commands::check_tx_on_file(&ctx, &hash, &file, computor_file.as_deref()),
    }
}
