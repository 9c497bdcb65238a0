//! flow-batcher - command-line front end for batch transfers
//!
//! Pays many recipients in one transaction through a deployed batch
//! contract, either in the native coin or in an ERC-20 token. Every batch
//! shows its gas estimate and waits for a typed `yes` unless `--yes` is given.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flow_batcher_sdk::address::parse_address;
use flow_batcher_sdk::config::Config;
use flow_batcher_sdk::confirm::{Confirmation, ScriptedConfirmation, StdinConfirmation};
use flow_batcher_sdk::transaction::BatchTransfer;
use flow_batcher_sdk::types::utils::{format_ether, format_gwei};
use flow_batcher_sdk::{Address, Asset, TransferOutcome};

#[derive(Parser)]
#[command(name = "flow-batcher")]
#[command(about = "Batch native and ERC-20 transfers through a multi-send contract", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (defaults to the per-user config, then environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Skip the interactive confirmation
    #[arg(short, long, global = true)]
    yes: bool,
}

#[derive(Args)]
struct Batch {
    /// Recipient address, repeat once per recipient
    #[arg(long = "to", required = true)]
    recipients: Vec<String>,

    /// Decimal amount, repeat once per recipient in the same order
    #[arg(long = "amount", required = true)]
    amounts: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send an ERC-20 token to many recipients
    Token {
        #[command(flatten)]
        batch: Batch,
        /// Token contract (defaults to the configured token)
        #[arg(long)]
        token: Option<String>,
    },
    /// Send the native coin to many recipients
    Native {
        #[command(flatten)]
        batch: Batch,
    },
    /// Print the gas estimate of a batch as JSON without sending anything
    Estimate {
        #[command(flatten)]
        batch: Batch,
        /// Estimate a token batch for this contract
        #[arg(long, conflicts_with = "native")]
        token: Option<String>,
        /// Estimate a native batch (the default without --token)
        #[arg(long)]
        native: bool,
    },
}

fn parse_token(token: Option<&str>) -> anyhow::Result<Option<Address>> {
    token
        .map(|t| parse_address(t).with_context(|| format!("invalid token address {}", t)))
        .transpose()
}

/// Asset an `estimate` run prices: a token only when one is given and
/// `--native` is not set.
fn estimate_asset(token: Option<Address>, native: bool) -> Asset {
    match token {
        Some(token) if !native => Asset::Token(token),
        _ => Asset::Native,
    }
}

fn report(outcome: &TransferOutcome) {
    let estimate = outcome.estimate();
    match outcome {
        TransferOutcome::Completed {
            approval, receipt, ..
        } => {
            if let Some(approval) = approval {
                println!("Approval: {} (block {})", approval.tx_hash, approval.block_number);
            }
            println!("✓ Batch transfer completed");
            println!("Transaction: {}", receipt.tx_hash);
            println!("Block: {}", receipt.block_number);
            println!("Gas used: {} (estimated {})", receipt.gas_used, estimate.gas_units);
            println!("Gas price: {}", format_gwei(estimate.gas_price_wei));
        }
        TransferOutcome::Cancelled { .. } => {
            println!("Batch transfer cancelled, nothing was submitted.");
            println!("Estimated cost was {}", format_ether(estimate.cost_wei));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let confirmation: Arc<dyn Confirmation> = if cli.yes {
        Arc::new(ScriptedConfirmation::approve_once())
    } else {
        Arc::new(StdinConfirmation::stdio())
    };
    let transfer = BatchTransfer::from_config(&config, confirmation)?;

    match &cli.command {
        Commands::Token { batch, token } => {
            let token = parse_token(token.as_deref())?;
            let outcome = transfer
                .batch_transfer_token(&batch.recipients, &batch.amounts, token)
                .await?;
            report(&outcome);
        }
        Commands::Native { batch } => {
            let outcome = transfer
                .batch_transfer_native(&batch.recipients, &batch.amounts)
                .await?;
            report(&outcome);
        }
        Commands::Estimate {
            batch,
            token,
            native,
        } => {
            let asset = estimate_asset(parse_token(token.as_deref())?, *native);
            let estimate = transfer
                .estimate(&batch.recipients, &batch.amounts, asset)
                .await?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0xFD623F170D47850c3617e62324eBe4607e191F16";

    #[test]
    fn test_estimate_asset_selection() {
        let token = parse_token(Some(TOKEN)).unwrap();
        assert_eq!(estimate_asset(token, false), Asset::Token(token.unwrap()));
        assert_eq!(estimate_asset(token, true), Asset::Native);
        assert_eq!(estimate_asset(None, false), Asset::Native);
        assert_eq!(estimate_asset(None, true), Asset::Native);
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(parse_token(None).unwrap(), None);
        assert!(parse_token(Some("0x1234")).is_err());
    }

    #[test]
    fn test_cli_parses_repeated_recipients() {
        let cli = Cli::try_parse_from([
            "flow-batcher",
            "estimate",
            "--to",
            "0x93297d48A40446dc84a388BB94F3A1247CB74870",
            "--amount",
            "1",
            "--to",
            "0x50da5C365a08169A9101C1969492540dA937071F",
            "--amount",
            "2.5",
            "--native",
        ])
        .unwrap();
        match cli.command {
            Commands::Estimate { batch, token, native } => {
                assert_eq!(batch.recipients.len(), 2);
                assert_eq!(batch.amounts, vec!["1", "2.5"]);
                assert!(token.is_none());
                assert!(native);
            }
            _ => panic!("expected estimate subcommand"),
        }
    }
}
