//! Plan assembly and the immutable [`IndexingPlan`].

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::Address;
use serde::Serialize;

use crate::allowlist::ContentAllowlist;
use crate::chains::{Chain, ChainRegistry};
use crate::credentials::ReachableChains;
use crate::error::ConfigError;
use crate::planner::{ChainBinding, RolePlan, link_derived, plan_role};
use crate::role::ContractRole;
use crate::scheduler::{PollingTask, Schedule, TaskDecl, UnhostedTasks, schedule};

/// Why something declared in a catalog is not part of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OmissionReason {
    /// The role is deployed on a chain with no credential.
    MissingCredential,
    /// A task could not be hosted: neither its chain nor the carrier is reachable.
    NoCarrier,
    /// A reachable chain received no bindings and no tasks at all.
    NoDeployments,
}

/// One intentionally omitted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Omission {
    /// Role name, task name, or the chain name for chain-level omissions.
    pub subject: String,
    /// The chain concerned.
    pub chain: Chain,
    /// Why it was left out.
    pub reason: OmissionReason,
}

/// Knobs of plan assembly that are not part of any catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Chain that hosts tasks whose own chain is unreachable.
    pub carrier: Chain,
    /// Policy when the carrier is unreachable too.
    pub unhosted_tasks: UnhostedTasks,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            carrier: Chain::Base,
            unhosted_tasks: UnhostedTasks::Omit,
        }
    }
}

/// The resolved indexing plan.
///
/// Immutable after [`build_plan`] returns. Safe to share across per-chain
/// workers behind an `Arc`; the allowlist's one-time parse is the only
/// interior state.
#[derive(Debug, Clone, Serialize)]
pub struct IndexingPlan {
    reachable: ReachableChains,
    roles: BTreeMap<String, RolePlan>,
    tasks: BTreeMap<String, PollingTask>,
    allowlist: ContentAllowlist,
    omitted: Vec<Omission>,
}

impl IndexingPlan {
    /// The chains this plan was built for.
    #[must_use]
    pub const fn reachable(&self) -> &ReachableChains {
        &self.reachable
    }

    /// All roles, including those with no bindings.
    #[must_use]
    pub const fn roles(&self) -> &BTreeMap<String, RolePlan> {
        &self.roles
    }

    /// A single role by name.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&RolePlan> {
        self.roles.get(name)
    }

    /// All scheduled tasks by name.
    #[must_use]
    pub const fn tasks(&self) -> &BTreeMap<String, PollingTask> {
        &self.tasks
    }

    /// A single task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&PollingTask> {
        self.tasks.get(name)
    }

    /// Everything intentionally left out of the plan.
    #[must_use]
    pub fn omitted(&self) -> &[Omission] {
        &self.omitted
    }

    /// `(role, binding)` pairs bound on `chain`, in role-name order.
    pub fn bindings_on(&self, chain: Chain) -> impl Iterator<Item = (&str, &ChainBinding)> {
        self.roles
            .iter()
            .filter_map(move |(name, plan)| plan.bindings.get(&chain).map(|b| (name.as_str(), b)))
    }

    /// Tasks hosted on `chain`, including tasks parked there.
    pub fn tasks_on(&self, chain: Chain) -> impl Iterator<Item = &PollingTask> {
        self.tasks.values().filter(move |t| t.chain == chain)
    }

    /// Chains that host at least one binding or task.
    #[must_use]
    pub fn active_chains(&self) -> BTreeSet<Chain> {
        self.roles
            .values()
            .flat_map(|r| r.bindings.keys().copied())
            .chain(self.tasks.values().map(|t| t.chain))
            .collect()
    }

    /// The content allowlist owned by this plan.
    #[must_use]
    pub const fn allowlist(&self) -> &ContentAllowlist {
        &self.allowlist
    }

    /// Returns `true` if `address` is in scope under the allowlist.
    #[must_use]
    pub fn is_address_allowed(&self, address: &str) -> bool {
        self.allowlist.is_allowed(address)
    }

    /// Typed variant of [`Self::is_address_allowed`].
    #[must_use]
    pub fn is_token_allowed(&self, address: Address) -> bool {
        self.allowlist.is_address_allowed(address)
    }

    /// Returns `true` if an allowlist narrows the dataset.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.allowlist.is_restricted()
    }
}

/// Assemble an [`IndexingPlan`] from catalogs and the reachable chain set.
///
/// The allowlist is stored unparsed; it is parsed on first query.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found. No partial plan is returned.
pub fn build_plan(
    registry: &ChainRegistry,
    roles: &[ContractRole],
    tasks: &[TaskDecl],
    reachable: &ReachableChains,
    raw_allowlist: Option<String>,
    options: &PlanOptions,
) -> Result<IndexingPlan, ConfigError> {
    let mut omitted = Vec::new();
    let mut planned = BTreeMap::new();

    for role in roles {
        if planned.contains_key(&role.name) {
            return Err(ConfigError::DuplicateRoleName {
                role: role.name.clone(),
            });
        }
        let bindings = plan_role(role, registry, reachable)?;
        for dep in &role.deployments {
            if !reachable.contains(dep.chain) {
                tracing::debug!(
                    role = %role.name,
                    chain = %dep.chain,
                    "missing credential, deployment omitted"
                );
                omitted.push(Omission {
                    subject: role.name.clone(),
                    chain: dep.chain,
                    reason: OmissionReason::MissingCredential,
                });
            }
        }
        planned.insert(
            role.name.clone(),
            RolePlan {
                abi: role.abi.clone(),
                bindings,
            },
        );
    }
    link_derived(&mut planned)?;

    let Schedule {
        tasks: scheduled,
        omitted: unhosted,
    } = schedule(
        tasks,
        registry,
        reachable,
        options.carrier,
        options.unhosted_tasks,
    )?;
    omitted.extend(unhosted);

    let active: BTreeSet<Chain> = planned
        .values()
        .flat_map(|r| r.bindings.keys().copied())
        .chain(scheduled.values().map(|t| t.chain))
        .collect();
    for chain in reachable.iter().filter(|c| !active.contains(c)) {
        tracing::debug!(%chain, "reachable chain has nothing to index");
        omitted.push(Omission {
            subject: chain.name().to_owned(),
            chain,
            reason: OmissionReason::NoDeployments,
        });
    }

    let plan = IndexingPlan {
        reachable: reachable.clone(),
        roles: planned,
        tasks: scheduled,
        allowlist: ContentAllowlist::new(raw_allowlist),
        omitted,
    };

    tracing::info!(
        chains = plan.reachable.len(),
        roles = plan.roles.len(),
        bindings = plan.roles.values().map(|r| r.bindings.len()).sum::<usize>(),
        tasks = plan.tasks.len(),
        parked = plan.tasks.values().filter(|t| t.is_proxy()).count(),
        omitted = plan.omitted.len(),
        "indexing plan built"
    );
    Ok(plan)
}
