#![allow(clippy::print_stdout, reason = "examples print their results")]
//! Resolve a small plan across two chains and show where each piece lands.
//!
//! Usage:
//!   `INDEXER_RPC_URL_8453=https://mainnet.base.org \
//!    AIRLOCK_8453=0x... cargo run --example resolve_plan`
//!
//! Only Base is given a credential, so the Base Sepolia price feed is
//! parked on Base. The Airlock, and the tokens it creates, are followed on
//! every chain whose `AIRLOCK_<chainId>` variable holds an address.

use alloy::primitives::Address;
use doppler_plan::{
    Chain, ChainRegistry, ContractRole, EventSignature, Interval, PlanOptions, TaskDecl,
    build_plan, resolve_credentials_from_env,
};

/// Airlock address for `chain` from the environment, if set.
fn airlock_on(chain: Chain) -> Result<Option<Address>, Box<dyn std::error::Error>> {
    match std::env::var(format!("AIRLOCK_{}", chain.chain_id())) {
        Ok(raw) => Ok(Some(raw.trim().parse()?)),
        Err(_) => Ok(None),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = ChainRegistry::builtin();
    let reachable = resolve_credentials_from_env(&registry);
    let create = EventSignature::new("Create(address,address,address,address)");

    let mut airlock = ContractRole::new("Airlock", "AirlockABI");
    let mut token = ContractRole::new("DERC20", "DERC20ABI");
    for (chain, start) in [(Chain::Base, 36_178_538), (Chain::BaseSepolia, 31_000_617)] {
        if let Some(address) = airlock_on(chain)? {
            airlock = airlock.at(chain, start, Some(address));
            token = token.derived_from(chain, start, "Airlock", create.clone(), "asset");
        }
    }
    let roles = [airlock, token];

    let five_minutes = Interval::blocks(150).ok_or("zero interval")?;
    let tasks = [
        TaskDecl::new("BaseChainlinkEthPriceFeed", Chain::Base, 36_175_538, five_minutes),
        TaskDecl::new(
            "BaseSepoliaChainlinkEthPriceFeed",
            Chain::BaseSepolia,
            31_000_617,
            five_minutes,
        ),
    ];

    let plan = build_plan(&registry, &roles, &tasks, &reachable, None, &PlanOptions::default())?;

    for chain in plan.reachable().iter() {
        for (role, binding) in plan.bindings_on(chain) {
            println!("[{chain}] {role} from block {}", binding.start_block);
        }
        for task in plan.tasks_on(chain) {
            println!(
                "[{chain}] task {} every {} blocks (declared for {})",
                task.name,
                task.interval.as_blocks(),
                task.logical_chain
            );
        }
    }
    for omission in plan.omitted() {
        println!("omitted {} on {}: {:?}", omission.subject, omission.chain, omission.reason);
    }

    Ok(())
}
