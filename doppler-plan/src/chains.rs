//! Static chain registry: every chain the indexer knows how to follow.
//!
//! Each [`Chain`] pairs a symbolic name with its EIP-155 id. The matching
//! [`ChainConfig`] adds the operational metadata the planner needs: the
//! earliest block worth indexing and the credential slot that gates it.
//! Several chains may share one slot when they are served by the same RPC
//! infrastructure.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

/// A chain the indexer can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Chain {
    /// Ethereum Mainnet (chain ID 1).
    Mainnet,
    /// Ethereum Sepolia testnet (chain ID 11155111).
    Sepolia,
    /// Base Mainnet (chain ID 8453).
    Base,
    /// Base Sepolia testnet (chain ID 84532).
    BaseSepolia,
    /// Unichain Mainnet (chain ID 130).
    Unichain,
    /// Ink Mainnet (chain ID 57073).
    Ink,
    /// Monad Mainnet (chain ID 143).
    Monad,
}

impl Chain {
    /// All known chains, in registry order.
    pub const ALL: &[Self] = &[
        Self::Mainnet,
        Self::Sepolia,
        Self::Base,
        Self::BaseSepolia,
        Self::Unichain,
        Self::Ink,
        Self::Monad,
    ];

    /// Returns the EIP-155 chain ID.
    #[must_use]
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Sepolia => 11_155_111,
            Self::Base => 8453,
            Self::BaseSepolia => 84532,
            Self::Unichain => 130,
            Self::Ink => 57073,
            Self::Monad => 143,
        }
    }

    /// Returns the symbolic name used as the chain key in a plan.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Sepolia => "sepolia",
            Self::Base => "base",
            Self::BaseSepolia => "baseSepolia",
            Self::Unichain => "unichain",
            Self::Ink => "ink",
            Self::Monad => "monad",
        }
    }

    /// Look up a [`Chain`] by its EIP-155 chain ID.
    #[must_use]
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.iter().find(|c| c.chain_id() == chain_id).copied()
    }

    /// Returns the built-in Doppler contract addresses for this chain.
    #[must_use]
    pub const fn addresses(self) -> ChainAddresses {
        match self {
            Self::Base => BASE_ADDRESSES,
            Self::Mainnet
            | Self::Sepolia
            | Self::BaseSepolia
            | Self::Unichain
            | Self::Ink
            | Self::Monad => ChainAddresses::NONE,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a chain name or id does not match any [`Chain`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chain `{0}`")]
pub struct UnknownChain(pub String);

impl FromStr for Chain {
    type Err = UnknownChain;

    /// Accepts either the symbolic name (case-insensitive) or the numeric id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u64>() {
            return Self::from_chain_id(id).ok_or_else(|| UnknownChain(s.to_owned()));
        }
        Self::ALL
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownChain(s.to_owned()))
    }
}

/// Doppler contract addresses for one chain. `None` means not deployed.
///
/// Deserializes from a table of optional `0x` addresses, so callers can
/// supply deployments the built-in table does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainAddresses {
    /// The Airlock factory.
    pub airlock: Option<Address>,
    /// Uniswap V4 multicurve initializer.
    pub v4_multicurve_initializer: Option<Address>,
    /// Hook paired with the multicurve initializer.
    pub v4_multicurve_initializer_hook: Option<Address>,
    /// Uniswap V4 scheduled multicurve initializer.
    pub v4_scheduled_multicurve_initializer: Option<Address>,
    /// Hook paired with the scheduled multicurve initializer.
    pub v4_scheduled_multicurve_initializer_hook: Option<Address>,
    /// Uniswap V4 migrator.
    pub v4_migrator: Option<Address>,
    /// Decay multicurve initializer.
    pub decay_multicurve_initializer: Option<Address>,
    /// Hook paired with the decay multicurve initializer.
    pub decay_multicurve_initializer_hook: Option<Address>,
    /// Rehype Doppler hook migrator.
    pub rehype_doppler_hook_migrator: Option<Address>,
}

impl ChainAddresses {
    /// A chain with no Doppler deployment at all.
    pub const NONE: Self = Self {
        airlock: None,
        v4_multicurve_initializer: None,
        v4_multicurve_initializer_hook: None,
        v4_scheduled_multicurve_initializer: None,
        v4_scheduled_multicurve_initializer_hook: None,
        v4_migrator: None,
        decay_multicurve_initializer: None,
        decay_multicurve_initializer_hook: None,
        rehype_doppler_hook_migrator: None,
    };

    /// `self` with every address set in `overrides` replaced.
    #[must_use]
    pub fn merged(self, overrides: Self) -> Self {
        Self {
            airlock: overrides.airlock.or(self.airlock),
            v4_multicurve_initializer: overrides
                .v4_multicurve_initializer
                .or(self.v4_multicurve_initializer),
            v4_multicurve_initializer_hook: overrides
                .v4_multicurve_initializer_hook
                .or(self.v4_multicurve_initializer_hook),
            v4_scheduled_multicurve_initializer: overrides
                .v4_scheduled_multicurve_initializer
                .or(self.v4_scheduled_multicurve_initializer),
            v4_scheduled_multicurve_initializer_hook: overrides
                .v4_scheduled_multicurve_initializer_hook
                .or(self.v4_scheduled_multicurve_initializer_hook),
            v4_migrator: overrides.v4_migrator.or(self.v4_migrator),
            decay_multicurve_initializer: overrides
                .decay_multicurve_initializer
                .or(self.decay_multicurve_initializer),
            decay_multicurve_initializer_hook: overrides
                .decay_multicurve_initializer_hook
                .or(self.decay_multicurve_initializer_hook),
            rehype_doppler_hook_migrator: overrides
                .rehype_doppler_hook_migrator
                .or(self.rehype_doppler_hook_migrator),
        }
    }
}

// Only addresses published alongside the deployment configs are listed.
// Everything else is left unset and has to be supplied by the caller.
const BASE_ADDRESSES: ChainAddresses = ChainAddresses {
    rehype_doppler_hook_migrator: Some(address!("2497969a9d38045e7bd3d632af9685d9fd774ca1")),
    ..ChainAddresses::NONE
};

/// Operational metadata for a single chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainConfig {
    /// The chain this entry describes.
    pub chain: Chain,
    /// Earliest block relevant to any subscription or polling task.
    /// Nothing may be planned before it.
    pub start_block: u64,
    /// Block from which the V4 contracts are worth following, when they
    /// were deployed after [`Self::start_block`].
    pub v4_start_block: Option<u64>,
    /// Name of the credential slot holding this chain's RPC URL.
    pub credential_slot: &'static str,
}

impl ChainConfig {
    /// Effective starting block for V4 contracts on this chain.
    #[must_use]
    pub const fn v4_start_block(&self) -> u64 {
        match self.v4_start_block {
            Some(b) => b,
            None => self.start_block,
        }
    }
}

/// Prefix of every credential slot; the suffix is the slot's chain id.
pub const CREDENTIAL_SLOT_PREFIX: &str = "INDEXER_RPC_URL_";

/// Built-in chain configurations (single source of truth).
///
/// The Base and Base Sepolia blocks match the deployment configs. Mainnet,
/// Sepolia, Unichain, Ink and Monad carry no built-in deployment, and
/// their blocks are placeholders; set real values with
/// [`ChainRegistry::with_start_block`] before planning anything there.
pub const ALL: &[ChainConfig] = &[
    ChainConfig {
        chain: Chain::Mainnet,
        start_block: 21_000_000,
        v4_start_block: None,
        credential_slot: "INDEXER_RPC_URL_1",
    },
    ChainConfig {
        chain: Chain::Sepolia,
        start_block: 7_000_000,
        v4_start_block: None,
        credential_slot: "INDEXER_RPC_URL_11155111",
    },
    ChainConfig {
        chain: Chain::Base,
        start_block: 30_530_166,
        v4_start_block: Some(36_178_538),
        credential_slot: "INDEXER_RPC_URL_8453",
    },
    ChainConfig {
        chain: Chain::BaseSepolia,
        start_block: 31_000_617,
        v4_start_block: None,
        credential_slot: "INDEXER_RPC_URL_84532",
    },
    // Unichain and Ink are served by the same RPC provider account.
    ChainConfig {
        chain: Chain::Unichain,
        start_block: 9_000_000,
        v4_start_block: None,
        credential_slot: "INDEXER_RPC_URL_130",
    },
    ChainConfig {
        chain: Chain::Ink,
        start_block: 12_000_000,
        v4_start_block: None,
        credential_slot: "INDEXER_RPC_URL_130",
    },
    ChainConfig {
        chain: Chain::Monad,
        start_block: 30_000_000,
        v4_start_block: None,
        credential_slot: "INDEXER_RPC_URL_143",
    },
];

/// The set of chains a plan may reference, with their metadata.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
}

impl ChainRegistry {
    /// Build a registry from explicit entries. Later duplicates of a chain
    /// are ignored.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = ChainConfig>) -> Self {
        let mut chains: Vec<ChainConfig> = Vec::new();
        for entry in entries {
            if !chains.iter().any(|c| c.chain == entry.chain) {
                chains.push(entry);
            }
        }
        Self { chains }
    }

    /// The registry built from [`ALL`].
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(ALL.iter().copied())
    }

    /// Replace the earliest block of `chain`. A V4 start block that would
    /// fall before it is raised along with it. Unregistered chains are left
    /// untouched.
    #[must_use]
    pub fn with_start_block(mut self, chain: Chain, start_block: u64) -> Self {
        if let Some(cfg) = self.chains.iter_mut().find(|c| c.chain == chain) {
            cfg.start_block = start_block;
            cfg.v4_start_block = cfg.v4_start_block.filter(|&b| b > start_block);
        }
        self
    }

    /// Look up the configuration of `chain`.
    #[must_use]
    pub fn get(&self, chain: Chain) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain == chain)
    }

    /// Iterate over all entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.iter()
    }

    /// Chains gated by the credential slot `slot`.
    pub fn chains_for_slot<'a>(&'a self, slot: &'a str) -> impl Iterator<Item = Chain> + 'a {
        self.chains
            .iter()
            .filter(move |c| c.credential_slot == slot)
            .map(|c| c.chain)
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
