//! Credential resolution: which chains can actually be reached this run.
//!
//! A credential slot is present when its value is non-empty after trimming.
//! Resolution is a syntactic check only; no connection is attempted.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::chains::{Chain, ChainRegistry};

/// The chains with usable connection data, produced once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReachableChains(BTreeSet<Chain>);

impl ReachableChains {
    /// Returns `true` if `chain` has a present credential.
    #[must_use]
    pub fn contains(&self, chain: Chain) -> bool {
        self.0.contains(&chain)
    }

    /// Iterate over reachable chains in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Chain> + '_ {
        self.0.iter().copied()
    }

    /// Number of reachable chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no chain is reachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Chain> for ReachableChains {
    fn from_iter<I: IntoIterator<Item = Chain>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolve the reachable chain set from a credential lookup.
///
/// `lookup` maps a slot name to its raw value, if any. Each slot is looked
/// up once even when it gates several chains.
pub fn resolve_credentials<F>(registry: &ChainRegistry, mut lookup: F) -> ReachableChains
where
    F: FnMut(&str) -> Option<String>,
{
    let mut present: BTreeMap<&str, bool> = BTreeMap::new();
    let mut reachable = BTreeSet::new();

    for cfg in registry.iter() {
        let slot = cfg.credential_slot;
        let ok = *present
            .entry(slot)
            .or_insert_with(|| lookup(slot).is_some_and(|v| !v.trim().is_empty()));
        if ok {
            reachable.insert(cfg.chain);
        } else {
            tracing::debug!(chain = %cfg.chain, slot, "missing credential, chain omitted");
        }
    }

    tracing::info!(
        reachable = reachable.len(),
        chains = ?reachable.iter().map(|c: &Chain| c.name()).collect::<Vec<_>>(),
        "resolved credentials"
    );
    ReachableChains(reachable)
}

/// Resolve credentials from the process environment.
#[must_use]
pub fn resolve_credentials_from_env(registry: &ChainRegistry) -> ReachableChains {
    resolve_credentials(registry, |slot| std::env::var(slot).ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve(pairs: &[(&str, &str)]) -> ReachableChains {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        resolve_credentials(&ChainRegistry::builtin(), |slot| env.get(slot).cloned())
    }

    #[test]
    fn no_credentials_means_nothing_reachable() {
        assert!(resolve(&[]).is_empty(), "empty env");
    }

    #[test]
    fn present_slot_makes_chain_reachable() {
        let reachable = resolve(&[("INDEXER_RPC_URL_8453", "https://base.example")]);
        assert!(reachable.contains(Chain::Base), "base");
        assert_eq!(reachable.len(), 1, "only base");
    }

    #[test]
    fn empty_and_blank_values_are_absent() {
        let reachable = resolve(&[
            ("INDEXER_RPC_URL_8453", ""),
            ("INDEXER_RPC_URL_84532", "   "),
        ]);
        assert!(reachable.is_empty(), "blank values are not credentials");
    }

    #[test]
    fn shared_slot_enables_every_chain_behind_it() {
        let reachable = resolve(&[("INDEXER_RPC_URL_130", "https://uni.example")]);
        assert!(reachable.contains(Chain::Unichain), "unichain");
        assert!(reachable.contains(Chain::Ink), "ink");
        assert_eq!(reachable.len(), 2, "exactly the shared pair");
    }

    #[test]
    fn shared_slot_is_looked_up_once() {
        let mut calls = Vec::new();
        let _ = resolve_credentials(&ChainRegistry::builtin(), |slot| {
            calls.push(slot.to_owned());
            None
        });
        let shared = calls.iter().filter(|s| *s == "INDEXER_RPC_URL_130").count();
        assert_eq!(shared, 1, "lookups: {calls:?}");
    }
}
