//! Command-line surface: argument parsing and human-readable reporting.
//!
//! Commands that move funds build a [`TransferEngine`] from the loaded
//! context; bookkeeping commands only touch the local store. All output
//! goes through a generic writer so tests can capture it.

use std::io::Write;

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use tracing::info;

use ferry_bridge::chain::{
    ChainError, ChainId, NetworkEnv, explorer_tx_url, solana_cluster, supported_chains,
};

use crate::config::{ConfigError, Ctx, Env};
use crate::error::user_facing_message;
use crate::steps::{StepState, is_mint_step};
use crate::store::TransactionStore;
use crate::store::record::{LocalTransaction, TransferStatus};
use crate::transfer::{TransferOutcome, TransferRequest, find_record};

#[derive(Debug, Parser)]
#[command(name = "ferry")]
#[command(about = "USDC cross-chain transfers over CCTP")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

impl CliEnv {
    /// Parses CLI arguments and loads the runtime context they point at.
    pub fn parse_and_convert() -> Result<(Ctx, Commands), ConfigError> {
        let cli = Self::parse();
        let ctx = Ctx::load_files(&cli.env.config, &cli.env.secrets)?;
        Ok((ctx, cli.command))
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send USDC from one chain to another
    Transfer {
        /// Source chain: name, EVM chain id, or "solana" (e.g. base, 1)
        #[arg(short = 'f', long = "from")]
        from: String,
        /// Destination chain
        #[arg(short = 't', long = "to")]
        to: String,
        /// Amount in USDC, e.g. 12.5
        #[arg(short = 'a', long)]
        amount: String,
        /// Recipient address on the destination chain
        #[arg(short = 'r', long)]
        recipient: String,
    },
    /// Resume an interrupted transfer from its burn transaction
    Resume {
        /// Burn transaction hash or Solana signature
        hash: String,
    },
    /// List stored transfers, newest first
    List,
    /// Show the signer's USDC balance on a chain
    Balance {
        /// Chain: name, EVM chain id, or "solana"
        chain: String,
    },
    /// Delete one stored transfer record
    Remove {
        /// Burn transaction hash of the record to delete
        hash: String,
    },
    /// Delete every record still pending
    ClearPending,
    /// Delete every stored record
    ClearAll,
}

pub async fn run_command(ctx: Ctx, command: Commands) -> anyhow::Result<()> {
    let mut store = TransactionStore::open(ctx.state_dir()).await?;
    run_command_with_writers(&ctx, command, &mut store, &mut std::io::stdout()).await
}

async fn run_command_with_writers<W: Write>(
    ctx: &Ctx,
    command: Commands,
    store: &mut TransactionStore,
    stdout: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::Transfer {
            from,
            to,
            amount,
            recipient,
        } => {
            let source = parse_chain(&from, ctx.network())?;
            let destination = parse_chain(&to, ctx.network())?;
            info!(%source, %destination, amount, "starting transfer");
            writeln!(
                stdout,
                "🔄 Sending {amount} USDC from {} to {}...",
                source.name(),
                destination.name()
            )?;

            let engine = ctx.engine()?;
            let request = TransferRequest {
                source: Some(source),
                destination: Some(destination),
                amount,
                recipient,
            };
            match engine.execute(store, &request).await {
                Ok(outcome) => report_outcome(stdout, outcome)?,
                Err(error) => {
                    writeln!(
                        stdout,
                        "❌ Transfer not started: {}",
                        user_facing_message(&error)
                    )?;
                    return Err(error.into());
                }
            }
        }
        Commands::Resume { hash } => {
            info!(hash, "resuming transfer");
            writeln!(stdout, "🔄 Resuming transfer {hash}...")?;

            let engine = ctx.engine()?;
            match engine.resume(store, &hash).await {
                Ok(outcome) => report_outcome(stdout, outcome)?,
                Err(error) => {
                    writeln!(stdout, "❌ Resume failed: {}", user_facing_message(&error))?;
                    return Err(error.into());
                }
            }
        }
        Commands::List => {
            if store.transactions().is_empty() {
                writeln!(stdout, "No transfers stored.")?;
            }
            for (index, record) in store.transactions().iter().enumerate() {
                write_record_line(stdout, index + 1, record)?;
            }
        }
        Commands::Balance { chain } => {
            let chain = parse_chain(&chain, ctx.network())?;
            let engine = ctx.engine()?;
            let balance = engine.bridge().usdc_balance(chain).await?;
            writeln!(stdout, "💰 {} USDC on {}", format_usdc(balance), chain.name())?;
        }
        Commands::Remove { hash } => {
            let Some(record) = find_record(store, &hash) else {
                writeln!(stdout, "❌ No stored transfer matches {hash}")?;
                return Ok(());
            };
            let key = record.hash;
            store.remove(&key).await?;
            writeln!(stdout, "🧹 Removed {key}")?;
        }
        Commands::ClearPending => {
            let removed = store.clear_pending().await?;
            writeln!(stdout, "🧹 Removed {removed} pending transfer(s).")?;
        }
        Commands::ClearAll => {
            let total = store.transactions().len();
            store.clear_all().await?;
            writeln!(stdout, "🧹 Removed all {total} stored transfer(s).")?;
        }
    }

    Ok(())
}

/// Renders an outcome for the user. Unfinished transfers come back as
/// errors so the process exits nonzero, but only after the record and the
/// way forward have been printed.
fn report_outcome<W: Write>(stdout: &mut W, outcome: TransferOutcome) -> anyhow::Result<()> {
    match outcome {
        TransferOutcome::Claimed(record) => {
            writeln!(stdout, "✅ Transfer complete!")?;
            write_steps(stdout, &record)?;
            Ok(())
        }
        TransferOutcome::AlreadyClaimed(record) => {
            writeln!(stdout, "✅ Transfer was already claimed, nothing to do.")?;
            write_steps(stdout, &record)?;
            Ok(())
        }
        TransferOutcome::Pending { record, error } => {
            writeln!(
                stdout,
                "⚠️ Transfer interrupted: {}",
                user_facing_message(&error)
            )?;
            write_steps(stdout, &record)?;
            writeln!(
                stdout,
                "   Funds are safe. Pick it back up with: ferry resume {}",
                record.hash
            )?;
            Err(error.into())
        }
        TransferOutcome::Failed { record, error } => {
            writeln!(stdout, "❌ Burn failed: {}", user_facing_message(&error))?;
            write_steps(stdout, &record)?;
            writeln!(stdout, "   No funds left the source wallet.")?;
            Err(error.into())
        }
    }
}

fn write_steps<W: Write>(stdout: &mut W, record: &LocalTransaction) -> std::io::Result<()> {
    for step in &record.steps {
        let icon = match step.state {
            StepState::Pending => "⏳",
            StepState::Success => "✅",
            StepState::Error => "❌",
        };
        write!(stdout, "   {icon} {}", step.name)?;
        if let Some(tx) = &step.tx_hash {
            // Approve and burn live on the source chain, the mint on the
            // destination.
            let chain = if is_mint_step(&step.name) {
                record.target_chain
            } else {
                record.origin_chain
            };
            match explorer_tx_url(chain, &tx.to_string()) {
                Some(url) => write!(stdout, "  {url}")?,
                None => write!(stdout, "  {tx}")?,
            }
        }
        if let Some(message) = &step.error_message {
            write!(stdout, "  ({message})")?;
        }
        writeln!(stdout)?;
    }
    Ok(())
}

fn write_record_line<W: Write>(
    stdout: &mut W,
    index: usize,
    record: &LocalTransaction,
) -> std::io::Result<()> {
    let status = match record.status {
        TransferStatus::Pending => "⏳ pending",
        TransferStatus::Claimed => "✅ claimed",
        TransferStatus::Failed => "❌ failed",
    };
    let amount = record.amount.map_or_else(|| "?".to_string(), format_usdc);
    writeln!(
        stdout,
        "{index}. {status}  {} -> {}  {amount} USDC  {}",
        record.origin_chain.name(),
        record.target_chain.name(),
        record.date.format("%Y-%m-%d %H:%M")
    )?;
    writeln!(stdout, "   {}", record.hash)
}

/// Resolves a user-entered chain: friendly names first ("base",
/// "avalanche-fuji"), then whatever [`ChainId`] itself parses (numeric ids
/// and cluster names). "solana" maps to the environment's cluster.
fn parse_chain(value: &str, env: NetworkEnv) -> Result<ChainId, ChainError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("solana") {
        return Ok(ChainId::Solana(solana_cluster(env)));
    }
    for chain in supported_chains(env) {
        let name = chain.name();
        if name.eq_ignore_ascii_case(trimmed)
            || name.replace(' ', "-").eq_ignore_ascii_case(trimmed)
        {
            return Ok(chain);
        }
    }
    trimmed.parse()
}

fn format_usdc(amount: U256) -> String {
    let divisor = U256::from(1_000_000u64);
    let whole = amount / divisor;
    let fraction = (amount % divisor).to::<u64>();
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:06}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
