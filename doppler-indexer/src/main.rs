//! Doppler indexer plan CLI.
//!
//! Resolves which chains, contracts and price-feed tasks a run will index,
//! from the credentials present in the environment (or `config.toml`).
//!
//! # Usage
//!
//! ```bash
//! # Print the plan for the chains with an RPC URL set
//! INDEXER_RPC_URL_8453=https://mainnet.base.org doppler-indexer plan
//!
//! # Plan the Base-only profile narrowed to two tokens
//! INDEXER_ALLOWED_BASE_TOKENS=0xabc...,0xdef... doppler-indexer plan --profile bankr
//!
//! # Verify every configured endpoint before starting the indexer
//! doppler-indexer check --config ./config.toml
//!
//! # List known chains and their credential slots
//! doppler-indexer chains
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use doppler_indexer::catalog::Profile;
use doppler_indexer::config::{Config, process_env};
use doppler_indexer::preflight;
use doppler_plan::chains::ChainRegistry;

/// Doppler multi-chain indexing plan resolver.
#[derive(Debug, Parser)]
#[command(name = "doppler-indexer", version, about)]
struct Cli {
    /// Path to the optional TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Override the catalog profile from the config file.
    #[arg(long, global = true, value_enum)]
    profile: Option<Profile>,

    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve credentials and print the indexing plan as JSON.
    Plan {
        /// Print on a single line.
        #[arg(long)]
        compact: bool,
    },

    /// Build the plan, then check every reachable chain's endpoint.
    Check,

    /// List all known chains.
    Chains,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `plan` output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config, cli.profile)?;
    let registry = config.registry()?;

    match cli.command {
        Command::Plan { compact } => cmd_plan(&config, &registry, compact),
        Command::Check => cmd_check(&config, &registry).await,
        Command::Chains => {
            cmd_chains(&registry);
            Ok(())
        }
    }
}

fn load_config(path: &std::path::Path, profile: Option<Profile>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(profile) = profile {
        config.profile = profile;
    }
    Ok(config)
}

/// Execute the `plan` subcommand.
#[allow(clippy::print_stdout, reason = "the plan is the command's output")]
fn cmd_plan(config: &Config, registry: &ChainRegistry, compact: bool) -> Result<()> {
    let plan = config.build_plan(registry, process_env)?;
    if plan.reachable().is_empty() {
        tracing::warn!("no chain has a credential; the plan is empty");
    }
    let json = if compact {
        serde_json::to_string(&plan)
    } else {
        serde_json::to_string_pretty(&plan)
    }
    .context("serializing plan")?;
    println!("{json}");
    Ok(())
}

/// Execute the `check` subcommand.
async fn cmd_check(config: &Config, registry: &ChainRegistry) -> Result<()> {
    let plan = Arc::new(config.build_plan(registry, process_env)?);
    if plan.reachable().is_empty() {
        bail!("no chain has a credential; nothing to check");
    }

    let endpoints: BTreeMap<_, _> = plan
        .reachable()
        .iter()
        .filter_map(|chain| {
            let slot = registry.get(chain)?.credential_slot;
            config.credential(slot, process_env).map(|url| (chain, url))
        })
        .collect();

    tracing::info!(chains = endpoints.len(), "starting preflight");
    let reports = preflight::check_all(plan, endpoints).await?;

    let ahead: usize = reports.iter().map(|r| r.ahead_of_tip.len()).sum();
    tracing::info!(chains = reports.len(), ahead_of_tip = ahead, "preflight finished");
    Ok(())
}

/// Execute the `chains` subcommand.
#[allow(clippy::print_stdout, reason = "the listing is the command's output")]
fn cmd_chains(registry: &ChainRegistry) {
    println!(
        "{:<12} {:<14} {:<15} Credential slot",
        "Chain ID", "Name", "Start Block"
    );
    println!("{}", "-".repeat(70));

    for cfg in registry.iter() {
        println!(
            "{:<12} {:<14} {:<15} {}",
            cfg.chain.chain_id(),
            cfg.chain.name(),
            cfg.start_block,
            cfg.credential_slot,
        );
    }
}
