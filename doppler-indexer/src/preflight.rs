//! Startup preflight against live RPC endpoints.
//!
//! Spawns one task per reachable chain, all sharing the same plan. Each
//! task confirms the endpoint serves the expected chain and that nothing
//! in the plan starts beyond the current tip.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result, bail};
use doppler_plan::{Chain, IndexingPlan};
use tokio::task::JoinSet;

/// Per-request timeout for RPC calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of checking one chain.
#[derive(Debug, Clone)]
pub struct ChainReport {
    /// The chain checked.
    pub chain: Chain,
    /// Latest block reported by the endpoint.
    pub tip: u64,
    /// Bindings and firing tasks that start after `tip`, by name.
    pub ahead_of_tip: Vec<(String, u64)>,
}

/// Plan entries on `chain` that start after `tip`.
///
/// Parked and dormant tasks are skipped since they never run.
#[must_use]
pub fn ahead_of_tip(plan: &IndexingPlan, chain: Chain, tip: u64) -> Vec<(String, u64)> {
    let bindings = plan
        .bindings_on(chain)
        .filter(|(_, b)| b.start_block > tip)
        .map(|(role, b)| (role.to_owned(), b.start_block));
    let tasks = plan
        .tasks_on(chain)
        .filter(|t| t.interval.fires() && t.start_block > tip)
        .map(|t| (t.name.clone(), t.start_block));
    bindings.chain(tasks).collect()
}

/// Check one chain's endpoint against the plan.
///
/// # Errors
///
/// Returns an error if the URL is invalid, an RPC call fails or times out,
/// or the endpoint reports a different chain ID.
pub async fn check_chain(
    plan: Arc<IndexingPlan>,
    chain: Chain,
    rpc_url: String,
) -> Result<ChainReport> {
    tracing::info!(%chain, "connecting");

    let provider = ProviderBuilder::new().connect_http(
        rpc_url
            .parse()
            .with_context(|| format!("{chain}: invalid RPC URL"))?,
    );

    let remote_id = tokio::time::timeout(REQUEST_TIMEOUT, provider.get_chain_id())
        .await
        .with_context(|| format!("{chain}: get_chain_id timed out"))?
        .with_context(|| format!("{chain}: get_chain_id failed"))?;
    if remote_id != chain.chain_id() {
        bail!(
            "{chain}: endpoint serves chain {remote_id}, expected {}",
            chain.chain_id()
        );
    }

    let tip = tokio::time::timeout(REQUEST_TIMEOUT, provider.get_block_number())
        .await
        .with_context(|| format!("{chain}: get_block_number timed out"))?
        .with_context(|| format!("{chain}: get_block_number failed"))?;

    let ahead = ahead_of_tip(&plan, chain, tip);
    for (name, start_block) in &ahead {
        tracing::warn!(%chain, subject = %name, start_block, tip, "starts after chain tip");
    }
    tracing::info!(
        %chain,
        tip,
        bindings = plan.bindings_on(chain).count(),
        tasks = plan.tasks_on(chain).count(),
        "chain ok"
    );

    Ok(ChainReport {
        chain,
        tip,
        ahead_of_tip: ahead,
    })
}

/// Check every chain in `endpoints` concurrently.
///
/// The allowlist is initialized before any task is spawned.
///
/// # Errors
///
/// Returns an error if any chain fails its check; every chain is still
/// checked first.
pub async fn check_all(
    plan: Arc<IndexingPlan>,
    endpoints: BTreeMap<Chain, String>,
) -> Result<Vec<ChainReport>> {
    plan.allowlist().initialize();

    let mut set = JoinSet::new();
    for (chain, url) in endpoints {
        set.spawn(check_chain(Arc::clone(&plan), chain, url));
    }

    let mut reports = Vec::new();
    let mut failed = 0u32;
    while let Some(joined) = set.join_next().await {
        match joined.context("preflight task panicked")? {
            Ok(report) => reports.push(report),
            Err(e) => {
                failed += 1;
                tracing::error!(error = %e, "preflight failed");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} chain(s) failed preflight");
    }
    reports.sort_by_key(|r| r.chain);
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use doppler_plan::{ChainRegistry, PlanOptions, ReachableChains, build_plan};

    use super::*;
    use crate::catalog::{AddressBook, Profile};

    fn base_plan(profile: Profile) -> IndexingPlan {
        let registry = ChainRegistry::builtin();
        let catalog = profile.catalog(&registry, &AddressBook::builtin());
        let reachable: ReachableChains = [Chain::Base].into_iter().collect();
        build_plan(
            &registry,
            &catalog.roles,
            &catalog.tasks,
            &reachable,
            None,
            &PlanOptions::default(),
        )
        .expect("valid plan")
    }

    #[test]
    fn reports_entries_past_the_tip() {
        let plan = base_plan(Profile::Bankr);

        let ahead = ahead_of_tip(&plan, Chain::Base, 42_000_000);
        let names: Vec<&str> = ahead.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"RehypeDopplerHookMigrator"), "{names:?}");
        assert!(!names.contains(&"BankrWethPrice"), "starts before tip");

        assert!(ahead_of_tip(&plan, Chain::Base, 50_000_000).is_empty(), "all behind tip");
    }

    #[test]
    fn parked_tasks_are_not_checked() {
        let plan = base_plan(Profile::Multicurve);

        let ahead = ahead_of_tip(&plan, Chain::Base, 36_500_000);
        assert!(
            ahead
                .iter()
                .all(|(name, _)| name != "EurcUsdcPrice" && name != "MonadUsdcPrice"),
            "{ahead:?}"
        );
    }
}
