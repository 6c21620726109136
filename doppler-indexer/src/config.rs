//! Runtime configuration loaded from `config.toml`.
//!
//! Selects the catalog profile, the carrier chain and the unhosted-task
//! policy, and may supply credentials, contract addresses, chain start
//! blocks and the token allowlist. Every field is optional; without a file
//! the built-in defaults apply and credentials come from
//! `INDEXER_RPC_URL_<chainId>` environment variables.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use doppler_plan::chains::CREDENTIAL_SLOT_PREFIX;
use doppler_plan::{
    Chain, ChainAddresses, ChainRegistry, IndexingPlan, PlanOptions, UnhostedTasks, build_plan,
    resolve_credentials,
};
use serde::Deserialize;

use crate::catalog::{AddressBook, Profile};

/// Environment variable holding the comma-separated token allowlist.
pub const ALLOWLIST_ENV: &str = "INDEXER_ALLOWED_BASE_TOKENS";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Which built-in catalog to plan.
    pub profile: Profile,
    /// Chain that hosts tasks whose own chain is unreachable.
    pub carrier: Option<Chain>,
    /// Policy when the carrier is unreachable too.
    pub unhosted_tasks: Option<UnhostedTasks>,
    /// Comma-separated token allowlist. The environment takes precedence.
    pub allowlist: Option<String>,
    /// RPC URLs keyed by chain ID. These take precedence over the
    /// environment for the credential slot of that ID.
    pub rpc: HashMap<String, String>,
    /// Contract addresses keyed by chain name or ID, layered over the
    /// built-in table.
    pub addresses: HashMap<String, ChainAddresses>,
    /// Earliest relevant block keyed by chain name or ID.
    pub start_blocks: HashMap<String, u64>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns [`Config::default`] if the file does not exist,
    /// allowing the binary to work without any config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Plan options with defaults filled in.
    #[must_use]
    pub fn plan_options(&self) -> PlanOptions {
        let defaults = PlanOptions::default();
        PlanOptions {
            carrier: self.carrier.unwrap_or(defaults.carrier),
            unhosted_tasks: self.unhosted_tasks.unwrap_or(defaults.unhosted_tasks),
        }
    }

    /// Value of credential `slot`: the `[rpc]` entry for the slot's chain ID
    /// if present, else `env(slot)`.
    pub fn credential<F>(&self, slot: &str, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        slot.strip_prefix(CREDENTIAL_SLOT_PREFIX)
            .and_then(|id| self.rpc.get(id))
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .or_else(|| env(slot))
    }

    /// Raw allowlist input: `env(ALLOWLIST_ENV)` if set and not blank, else
    /// the file value.
    pub fn allowlist_input<F>(&self, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        env(ALLOWLIST_ENV)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.allowlist.clone())
    }

    /// The built-in registry with `[start_blocks]` applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a key does not name a known chain.
    pub fn registry(&self) -> Result<ChainRegistry> {
        let mut registry = ChainRegistry::builtin();
        for (key, &block) in &self.start_blocks {
            let chain = parse_chain(key, "start_blocks")?;
            tracing::debug!(%chain, start_block = block, "start block override");
            registry = registry.with_start_block(chain, block);
        }
        Ok(registry)
    }

    /// The built-in addresses with `[addresses.<chain>]` tables on top.
    ///
    /// # Errors
    ///
    /// Returns an error if a key does not name a known chain.
    pub fn address_book(&self) -> Result<AddressBook> {
        let mut book = AddressBook::builtin();
        for (key, addresses) in &self.addresses {
            let chain = parse_chain(key, "addresses")?;
            book = book.with(chain, *addresses);
        }
        Ok(book)
    }

    /// Resolve credentials and build the plan for the configured profile.
    ///
    /// # Errors
    ///
    /// Returns an error if an address key names no chain, or plan assembly
    /// rejects the catalog.
    pub fn build_plan<F>(&self, registry: &ChainRegistry, env: F) -> Result<IndexingPlan>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reachable = resolve_credentials(registry, |slot| self.credential(slot, &env));
        let catalog = self.profile.catalog(registry, &self.address_book()?);
        build_plan(
            registry,
            &catalog.roles,
            &catalog.tasks,
            &reachable,
            self.allowlist_input(&env),
            &self.plan_options(),
        )
        .with_context(|| format!("building {:?} plan", self.profile))
    }
}

fn parse_chain(key: &str, table: &str) -> Result<Chain> {
    key.parse::<Chain>()
        .with_context(|| format!("[{table}] key `{key}` is not a known chain"))
}

/// Read a variable from the process environment.
#[must_use]
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn parses_full_file() {
        let config: Config = toml::from_str(
            r#"
            profile = "bankr"
            carrier = "base"
            unhosted_tasks = "reject"
            allowlist = "0x4200000000000000000000000000000000000006"

            [rpc]
            "8453" = "https://base.example"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.profile, Profile::Bankr, "profile");
        let options = config.plan_options();
        assert_eq!(options.carrier, Chain::Base, "carrier");
        assert_eq!(options.unhosted_tasks, UnhostedTasks::Reject, "policy");
        assert_eq!(
            config.rpc.get("8453").map(String::as_str),
            Some("https://base.example"),
            "rpc"
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").expect("empty config");
        assert_eq!(config.profile, Profile::Multicurve, "default profile");
        assert_eq!(config.plan_options(), PlanOptions::default(), "default options");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<Config>("carier = \"base\"").is_err(), "typo caught");
    }

    #[test]
    fn file_rpc_overrides_environment() {
        let mut config = Config::default();
        config.rpc.insert("8453".to_owned(), "https://file.example".to_owned());
        let env = env_of(&[
            ("INDEXER_RPC_URL_8453", "https://env.example"),
            ("INDEXER_RPC_URL_143", "https://monad.example"),
        ]);

        assert_eq!(
            config.credential("INDEXER_RPC_URL_8453", &env).as_deref(),
            Some("https://file.example"),
            "file wins"
        );
        assert_eq!(
            config.credential("INDEXER_RPC_URL_143", &env).as_deref(),
            Some("https://monad.example"),
            "env fallback"
        );
        assert_eq!(config.credential("INDEXER_RPC_URL_1", &env), None, "absent");
    }

    #[test]
    fn environment_allowlist_overrides_file() {
        let config = Config {
            allowlist: Some("0x4200000000000000000000000000000000000006".to_owned()),
            ..Config::default()
        };
        let env = env_of(&[(ALLOWLIST_ENV, "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913")]);
        assert_eq!(
            config.allowlist_input(env).as_deref(),
            Some("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            "env wins"
        );
    }

    #[test]
    fn blank_environment_allowlist_keeps_file_value() {
        let config = Config {
            allowlist: Some("0x4200000000000000000000000000000000000006".to_owned()),
            ..Config::default()
        };
        let env = env_of(&[(ALLOWLIST_ENV, "  ")]);
        assert_eq!(
            config.allowlist_input(env).as_deref(),
            Some("0x4200000000000000000000000000000000000006"),
            "file value kept"
        );

        let plan = config
            .build_plan(&ChainRegistry::builtin(), env_of(&[(ALLOWLIST_ENV, "")]))
            .expect("valid plan");
        assert!(plan.is_restricted(), "filter stays in effect");
    }

    #[test]
    fn addresses_and_start_blocks_come_from_the_file() {
        let config: Config = toml::from_str(
            r#"
            [start_blocks]
            monad = 45000000
            "8453" = 30500000

            [addresses.base]
            airlock = "0x1111111111111111111111111111111111111111"
            "#,
        )
        .expect("valid config");

        let registry = config.registry().expect("known chains");
        assert_eq!(registry.get(Chain::Monad).map(|c| c.start_block), Some(45_000_000), "monad");
        assert_eq!(registry.get(Chain::Base).map(|c| c.start_block), Some(30_500_000), "base");

        let book = config.address_book().expect("known chains");
        assert_eq!(
            book.get(Chain::Base).airlock,
            Some(Address::repeat_byte(0x11)),
            "airlock supplied"
        );

        let env = env_of(&[("INDEXER_RPC_URL_8453", "https://base.example")]);
        let plan = config.build_plan(&registry, env).expect("valid plan");
        let airlock = plan.role("Airlock").expect("role");
        assert!(airlock.bindings.contains_key(&Chain::Base), "airlock followed");
        let token = plan.role("DERC20").expect("role");
        assert!(token.bindings.contains_key(&Chain::Base), "tokens discovered");
    }

    #[test]
    fn unknown_chain_keys_are_rejected() {
        let config: Config = toml::from_str("[start_blocks]\nsolana = 1").expect("parses");
        assert!(config.registry().is_err(), "start block key");

        let config: Config = toml::from_str(
            r#"
            [addresses.solana]
            airlock = "0x1111111111111111111111111111111111111111"
            "#,
        )
        .expect("parses");
        assert!(config.address_book().is_err(), "address key");
    }

    #[test]
    fn builds_plan_from_shared_slot_override() {
        let mut config = Config::default();
        config.rpc.insert("130".to_owned(), "https://unichain.example".to_owned());
        config.rpc.insert("8453".to_owned(), "https://base.example".to_owned());

        let plan = config
            .build_plan(&ChainRegistry::builtin(), env_of(&[]))
            .expect("valid plan");
        assert!(plan.reachable().contains(Chain::Unichain), "unichain");
        assert!(plan.reachable().contains(Chain::Ink), "ink shares the slot");
        let ink = plan.task("InkChainlinkEthPriceFeed").expect("task");
        assert_eq!(ink.chain, Chain::Ink, "hosted on its own chain");
    }
}
