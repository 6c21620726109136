//! Subscription planning: which role is followed on which chain, from where.
//!
//! For every chain in the registry a role is bound only if the chain is
//! reachable and the role has a deployment there. Derived sources are
//! emitted as descriptors for the ingestion engine and linked to their
//! factory binding once every role has been planned.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use serde::Serialize;

use crate::chains::{Chain, ChainRegistry};
use crate::credentials::ReachableChains;
use crate::error::ConfigError;
use crate::role::ContractRole;
use crate::source::{AddressSource, EventSignature};

/// Reference to one role's binding on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingRef {
    /// The referenced role.
    pub role: String,
    /// The chain of the referenced binding.
    pub chain: Chain,
}

/// The address side of a [`ChainBinding`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BindingSource {
    /// A fixed contract address.
    Static {
        /// The contract address.
        address: Address,
    },
    /// Addresses discovered from a factory binding's events.
    #[serde(rename_all = "camelCase")]
    Derived {
        /// The factory binding to watch.
        source: BindingRef,
        /// The creation event.
        event: EventSignature,
        /// The event parameter holding each new address.
        extracted_field: String,
        /// First block at which the factory is watched.
        from_block: u64,
        /// The factory's own address, when it is static.
        factory_address: Option<Address>,
    },
}

/// A role's subscription on a single chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBinding {
    /// The chain subscribed to. Always reachable.
    pub chain: Chain,
    /// First block to subscribe from.
    pub start_block: u64,
    /// Where the contract address comes from.
    pub source: BindingSource,
}

impl ChainBinding {
    /// The static address, if this binding has one.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        match &self.source {
            BindingSource::Static { address } => Some(*address),
            BindingSource::Derived { .. } => None,
        }
    }
}

/// A role's ABI reference and its bindings, keyed by chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePlan {
    /// Opaque ABI reference.
    pub abi: String,
    /// At most one binding per chain.
    pub bindings: BTreeMap<Chain, ChainBinding>,
}

/// Plan the bindings of a single role.
///
/// Returns an empty mapping when the role is deployed nowhere reachable.
///
/// # Errors
///
/// - [`ConfigError::DuplicateDeployment`] if the role lists a chain twice.
/// - [`ConfigError::UnknownChain`] if a deployment targets an unregistered chain.
/// - [`ConfigError::InvalidStartingPoint`] if a bound deployment starts
///   before its chain's earliest block.
pub fn plan_role(
    role: &ContractRole,
    registry: &ChainRegistry,
    reachable: &ReachableChains,
) -> Result<BTreeMap<Chain, ChainBinding>, ConfigError> {
    for (i, dep) in role.deployments.iter().enumerate() {
        if role.deployments.iter().take(i).any(|d| d.chain == dep.chain) {
            return Err(ConfigError::DuplicateDeployment {
                role: role.name.clone(),
                chain: dep.chain,
            });
        }
        if registry.get(dep.chain).is_none() {
            return Err(ConfigError::UnknownChain {
                subject: role.name.clone(),
                chain: dep.chain,
            });
        }
    }

    let mut bindings = BTreeMap::new();
    for cfg in registry.iter() {
        if !reachable.contains(cfg.chain) {
            continue;
        }
        let Some(dep) = role.deployment_on(cfg.chain) else {
            continue;
        };

        let check_start = |block: u64| {
            if block < cfg.start_block {
                Err(ConfigError::InvalidStartingPoint {
                    subject: role.name.clone(),
                    chain: cfg.chain,
                    start_block: block,
                    earliest_block: cfg.start_block,
                })
            } else {
                Ok(())
            }
        };
        check_start(dep.start_block)?;

        let source = match &dep.source {
            AddressSource::Static(address) => BindingSource::Static { address: *address },
            AddressSource::Derived(derived) => {
                check_start(derived.from_block)?;
                BindingSource::Derived {
                    source: BindingRef {
                        role: derived.source_role.clone(),
                        chain: cfg.chain,
                    },
                    event: derived.event.clone(),
                    extracted_field: derived.extracted_field.clone(),
                    from_block: derived.from_block,
                    factory_address: None,
                }
            }
        };

        tracing::debug!(
            role = %role.name,
            chain = %cfg.chain,
            start_block = dep.start_block,
            "bound"
        );
        bindings.insert(
            cfg.chain,
            ChainBinding {
                chain: cfg.chain,
                start_block: dep.start_block,
                source,
            },
        );
    }

    Ok(bindings)
}

/// Check every derived binding against its factory binding and record the
/// factory's address where it is static.
///
/// # Errors
///
/// Returns [`ConfigError::DanglingDerivedReference`] if a derived binding
/// references a role with no binding on the same chain.
pub fn link_derived(roles: &mut BTreeMap<String, RolePlan>) -> Result<(), ConfigError> {
    let mut links = Vec::new();

    for (name, plan) in roles.iter() {
        for (chain, binding) in &plan.bindings {
            let BindingSource::Derived { source, .. } = &binding.source else {
                continue;
            };
            let factory = roles
                .get(&source.role)
                .and_then(|r| r.bindings.get(&source.chain))
                .ok_or_else(|| ConfigError::DanglingDerivedReference {
                    role: name.clone(),
                    chain: *chain,
                    source_role: source.role.clone(),
                })?;
            links.push((name.clone(), *chain, factory.address()));
        }
    }

    for (name, chain, address) in links {
        if let Some(BindingSource::Derived {
            factory_address, ..
        }) = roles
            .get_mut(&name)
            .and_then(|r| r.bindings.get_mut(&chain))
            .map(|b| &mut b.source)
        {
            *factory_address = address;
        }
    }

    Ok(())
}
