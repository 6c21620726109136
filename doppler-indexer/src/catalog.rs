//! Built-in role and task catalogs.
//!
//! Two deployment profiles are provided. `multicurve` follows the Doppler
//! factory, multicurve initializers and migrator on Base and Base Sepolia,
//! and declares every price-feed task the handlers expect. `bankr` follows
//! only the decay multicurve contracts on Base, for runs narrowed by the
//! token allowlist.
//!
//! Contract addresses come from an [`AddressBook`]: the built-in table in
//! [`Chain::addresses`] plus whatever the configuration supplies. A role
//! whose address is unknown on a chain is simply not deployed there.

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use alloy::sol;
use clap::ValueEnum;
use doppler_plan::{
    Chain, ChainAddresses, ChainRegistry, ContractRole, EventSignature, Interval, TaskDecl,
};
use serde::Deserialize;

sol! {
    /// Emitted by the Airlock when a new asset and its pool are created.
    event Create(
        address asset,
        address indexed numeraire,
        address initializer,
        address poolOrHook
    );
}

/// Roughly five minutes of Base blocks.
const FIVE_MINUTES: Interval = match NonZeroU64::new(150) {
    Some(n) => Interval::Every(n),
    None => Interval::Never,
};

/// Airlock start blocks, which the token role inherits.
const AIRLOCK_STARTS: [(Chain, u64); 2] =
    [(Chain::BaseSepolia, 31_000_617), (Chain::Base, 36_178_538)];

/// Roles declared with no deployment so handlers can register against
/// them, with their ABI references.
const DECLARED_ONLY: &[(&str, &str)] = &[
    ("MigrationPool", "UniswapV3PoolABI+UniswapV2PairABI"),
    ("UniswapV3Initializer", "UniswapV3InitializerABI"),
    ("UniswapV4Initializer", "UniswapV4InitializerABI"),
    ("UniswapV4Initializer2", "UniswapV4InitializerABI"),
    ("UniswapV4InitializerSelfCorrecting", "UniswapV4InitializerABI"),
    ("UniswapV3Migrator", "UniswapV3MigratorABI"),
    ("UniswapV3Pool", "UniswapV3PoolABI"),
    ("LockableUniswapV3Pool", "UniswapV3PoolABI"),
    ("UniswapV2PairUnichain", "UniswapV2PairABI"),
    ("PoolManager", "PoolManagerABI"),
    ("UniswapV4Pool", "DopplerABI"),
    ("UniswapV4Pool2", "DopplerABI"),
    ("UniswapV4PoolSelfCorrecting", "DopplerABI"),
    ("LockableUniswapV3Initializer", "LockableUniswapV3InitializerABI"),
    ("ZoraFactory", "ZoraFactoryABI"),
    ("ZoraCoinV4", "ZoraCoinABI"),
    ("ZoraCreatorCoinV4", "ZoraCreatorCoinABI"),
    ("ZoraV4Hook", "ZoraV4HookABI"),
    ("ZoraV4CreatorCoinHook", "ZoraV4HookABI"),
    ("DopplerHookInitializer", "DopplerHookInitializerABI"),
    ("UniswapV4MigratorHook", "V4MigratorHookABI"),
    ("DopplerHookMigrator", "DopplerHookMigratorABI"),
    ("RehypeDopplerHookMigrator", "RehypeDopplerHookMigratorABI"),
    ("DecayMulticurveInitializer", "UniswapV4ScheduledMulticurveInitializerABI"),
    (
        "DecayMulticurveInitializerHook",
        "UniswapV4ScheduledMulticurveInitializerHookABI",
    ),
];

/// A named catalog of roles and tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Full multicurve deployment across Base and Base Sepolia.
    #[default]
    Multicurve,
    /// Base-only decay multicurve contracts.
    Bankr,
}

/// Role and task declarations for one profile.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Contract roles, in declaration order.
    pub roles: Vec<ContractRole>,
    /// Polling tasks, in declaration order.
    pub tasks: Vec<TaskDecl>,
}

/// Per-chain contract addresses: the built-in table with overrides on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    overrides: BTreeMap<Chain, ChainAddresses>,
}

impl AddressBook {
    /// Only the built-in addresses.
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Layer `addresses` over `chain`'s entries. Unset fields keep their
    /// previous value.
    #[must_use]
    pub fn with(mut self, chain: Chain, addresses: ChainAddresses) -> Self {
        let merged = self.get(chain).merged(addresses);
        self.overrides.insert(chain, merged);
        self
    }

    /// Effective addresses on `chain`.
    #[must_use]
    pub fn get(&self, chain: Chain) -> ChainAddresses {
        self.overrides
            .get(&chain)
            .copied()
            .unwrap_or_else(|| chain.addresses())
    }
}

impl Profile {
    /// Build this profile's catalog against `registry` and `book`.
    #[must_use]
    pub fn catalog(self, registry: &ChainRegistry, book: &AddressBook) -> Catalog {
        match self {
            Self::Multicurve => multicurve(registry, book),
            Self::Bankr => bankr(book),
        }
    }
}

/// Chain start block from the registry, zero if the chain is unregistered.
fn start_of(registry: &ChainRegistry, chain: Chain) -> u64 {
    registry.get(chain).map_or(0, |c| c.start_block)
}

fn v4_start_of(registry: &ChainRegistry, chain: Chain) -> u64 {
    registry.get(chain).map_or(0, |c| c.v4_start_block())
}

/// A price feed kept declared on `chain` but never polled.
fn dormant(name: &str, registry: &ChainRegistry, chain: Chain) -> TaskDecl {
    TaskDecl::new(name, chain, start_of(registry, chain), Interval::Never)
}

fn multicurve(registry: &ChainRegistry, book: &AddressBook) -> Catalog {
    let base = book.get(Chain::Base);
    let sepolia = book.get(Chain::BaseSepolia);
    let create = EventSignature::of::<Create>();

    // Tokens are only discovered where the factory itself is followed.
    let token = AIRLOCK_STARTS
        .iter()
        .filter(|(chain, _)| book.get(*chain).airlock.is_some())
        .fold(ContractRole::new("DERC20", "DERC20ABI"), |role, &(chain, start)| {
            role.derived_from(chain, start, "Airlock", create.clone(), "asset")
        });

    let mut roles = vec![
        ContractRole::new("Airlock", "AirlockABI")
            .at(Chain::BaseSepolia, 31_000_617, sepolia.airlock)
            .at(Chain::Base, 36_178_538, base.airlock),
        token,
        ContractRole::new("UniswapV4MulticurveInitializer", "UniswapV4MulticurveInitializerABI")
            .at(Chain::BaseSepolia, 31_000_617, sepolia.v4_multicurve_initializer)
            .at(Chain::Base, 36_178_538, base.v4_multicurve_initializer),
        ContractRole::new(
            "UniswapV4MulticurveInitializerHook",
            "UniswapV4MulticurveInitializerHookABI",
        )
        .at(Chain::BaseSepolia, 31_000_617, sepolia.v4_multicurve_initializer_hook)
        .at(Chain::Base, 36_178_538, base.v4_multicurve_initializer_hook),
        ContractRole::new(
            "UniswapV4ScheduledMulticurveInitializer",
            "UniswapV4ScheduledMulticurveInitializerABI",
        )
        .at(Chain::BaseSepolia, 32_169_922, sepolia.v4_scheduled_multicurve_initializer)
        .at(Chain::Base, 36_659_443, base.v4_scheduled_multicurve_initializer),
        ContractRole::new(
            "UniswapV4ScheduledMulticurveInitializerHook",
            "UniswapV4ScheduledMulticurveInitializerHookABI",
        )
        .at(Chain::BaseSepolia, 32_169_922, sepolia.v4_scheduled_multicurve_initializer_hook)
        .at(Chain::Base, 36_659_444, base.v4_scheduled_multicurve_initializer_hook),
        ContractRole::new("UniswapV4Migrator", "V4MigratorABI")
            .at(
                Chain::BaseSepolia,
                start_of(registry, Chain::BaseSepolia),
                sepolia.v4_migrator,
            )
            .at(Chain::Base, v4_start_of(registry, Chain::Base), base.v4_migrator),
    ];
    roles.extend(
        DECLARED_ONLY
            .iter()
            .map(|&(name, abi)| ContractRole::new(name, abi)),
    );

    let tasks = vec![
        TaskDecl::new(
            "BaseSepoliaChainlinkEthPriceFeed",
            Chain::BaseSepolia,
            31_000_617,
            FIVE_MINUTES,
        ),
        TaskDecl::new("BaseChainlinkEthPriceFeed", Chain::Base, 36_175_538, FIVE_MINUTES),
        TaskDecl::new("FxhWethPrice", Chain::Base, 36_175_538, FIVE_MINUTES),
        TaskDecl::new("NoiceWethPrice", Chain::Base, 30_530_166, FIVE_MINUTES),
        // Dormant: declared for handler validation, never polled.
        TaskDecl::new("BankrWethPrice", Chain::Base, 36_175_538, Interval::Never),
        TaskDecl::new("ZoraUsdcPrice", Chain::Base, 31_058_549, Interval::Never),
        TaskDecl::new("EurcUsdcPrice", Chain::Base, 38_212_428, Interval::Never),
        dormant("MainnetChainlinkEthPriceFeed", registry, Chain::Mainnet),
        dormant("SepoliaChainlinkEthPriceFeed", registry, Chain::Sepolia),
        dormant("UnichainChainlinkEthPriceFeed", registry, Chain::Unichain),
        dormant("InkChainlinkEthPriceFeed", registry, Chain::Ink),
        dormant("MonadChainlinkEthPriceFeed", registry, Chain::Monad),
        dormant("MonadUsdcPrice", registry, Chain::Monad),
    ];

    Catalog { roles, tasks }
}

fn bankr(book: &AddressBook) -> Catalog {
    let base = book.get(Chain::Base);
    let init_start = 42_019_831;
    let hook_start = 42_019_829;

    let roles = vec![
        ContractRole::new(
            "DecayMulticurveInitializer",
            "UniswapV4ScheduledMulticurveInitializerABI",
        )
        .at(Chain::Base, init_start, base.decay_multicurve_initializer),
        ContractRole::new(
            "DecayMulticurveInitializerHook",
            "UniswapV4ScheduledMulticurveInitializerHookABI",
        )
        .at(Chain::Base, hook_start, base.decay_multicurve_initializer_hook),
        ContractRole::new("RehypeDopplerHookMigrator", "RehypeDopplerHookMigratorABI")
            .at(Chain::Base, hook_start, base.rehype_doppler_hook_migrator),
        ContractRole::new("PoolManager", "PoolManagerABI"),
        ContractRole::new("UniswapV4Pool", "DopplerABI"),
    ];

    let tasks = vec![
        TaskDecl::new("BaseChainlinkEthPriceFeed", Chain::Base, 36_175_538, FIVE_MINUTES),
        TaskDecl::new("BankrWethPrice", Chain::Base, 41_900_609, FIVE_MINUTES),
    ];

    Catalog { roles, tasks }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use alloy::primitives::Address;
    use doppler_plan::{BindingSource, IndexingPlan, PlanOptions, ReachableChains, build_plan};

    use super::*;

    /// Every contract the multicurve profile follows, at synthetic addresses.
    fn full_book() -> AddressBook {
        let addresses = |seed: u8| ChainAddresses {
            airlock: Some(Address::repeat_byte(seed)),
            v4_multicurve_initializer: Some(Address::repeat_byte(seed + 1)),
            v4_multicurve_initializer_hook: Some(Address::repeat_byte(seed + 2)),
            v4_scheduled_multicurve_initializer: Some(Address::repeat_byte(seed + 3)),
            v4_scheduled_multicurve_initializer_hook: Some(Address::repeat_byte(seed + 4)),
            v4_migrator: Some(Address::repeat_byte(seed + 5)),
            decay_multicurve_initializer: Some(Address::repeat_byte(seed + 6)),
            decay_multicurve_initializer_hook: Some(Address::repeat_byte(seed + 7)),
            rehype_doppler_hook_migrator: None,
        };
        AddressBook::builtin()
            .with(Chain::Base, addresses(0x10))
            .with(Chain::BaseSepolia, addresses(0x20))
    }

    /// Every subset of chains, as reachable sets.
    fn subsets() -> Vec<ReachableChains> {
        let chains = Chain::ALL;
        (0u32..(1 << chains.len()))
            .map(|mask| {
                chains
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, c)| *c)
                    .collect()
            })
            .collect()
    }

    fn plan_on(profile: Profile, book: &AddressBook, chains: &[Chain]) -> IndexingPlan {
        let registry = ChainRegistry::builtin();
        let catalog = profile.catalog(&registry, book);
        let reachable: ReachableChains = chains.iter().copied().collect();
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
    fn every_profile_builds_for_every_credential_subset() {
        let registry = ChainRegistry::builtin();
        for book in [AddressBook::builtin(), full_book()] {
            for profile in [Profile::Multicurve, Profile::Bankr] {
                let catalog = profile.catalog(&registry, &book);
                for reachable in subsets() {
                    let plan = build_plan(
                        &registry,
                        &catalog.roles,
                        &catalog.tasks,
                        &reachable,
                        None,
                        &PlanOptions::default(),
                    );
                    assert!(plan.is_ok(), "{profile:?} {reachable:?}: {:?}", plan.err());
                }
            }
        }
    }

    #[test]
    fn multicurve_declares_every_task_when_base_is_reachable() {
        let registry = ChainRegistry::builtin();
        let catalog = Profile::Multicurve.catalog(&registry, &AddressBook::builtin());
        let plan = plan_on(Profile::Multicurve, &AddressBook::builtin(), &[Chain::Base]);

        let declared: BTreeSet<&str> = catalog.tasks.iter().map(|t| t.name.as_str()).collect();
        let planned: BTreeSet<&str> = plan.tasks().keys().map(String::as_str).collect();
        assert_eq!(declared, planned, "no task dropped");

        let fx = plan.task("FxhWethPrice").expect("task");
        assert!(fx.interval.fires(), "base feed polls");
        let monad = plan.task("MonadUsdcPrice").expect("task");
        assert_eq!(monad.chain, Chain::Base, "parked on base");
        assert!(!monad.interval.fires(), "parked task is dormant");
    }

    #[test]
    fn multicurve_declares_every_handler_role() {
        let catalog =
            Profile::Multicurve.catalog(&ChainRegistry::builtin(), &AddressBook::builtin());
        let names: BTreeSet<&str> = catalog.roles.iter().map(|r| r.name.as_str()).collect();
        let expected: BTreeSet<&str> = [
            "Airlock",
            "MigrationPool",
            "UniswapV3Initializer",
            "UniswapV4Initializer",
            "UniswapV4Initializer2",
            "UniswapV4InitializerSelfCorrecting",
            "DERC20",
            "UniswapV3Migrator",
            "UniswapV3Pool",
            "LockableUniswapV3Pool",
            "UniswapV2PairUnichain",
            "PoolManager",
            "UniswapV4Pool",
            "UniswapV4Pool2",
            "UniswapV4PoolSelfCorrecting",
            "LockableUniswapV3Initializer",
            "ZoraFactory",
            "ZoraCoinV4",
            "ZoraCreatorCoinV4",
            "ZoraV4Hook",
            "ZoraV4CreatorCoinHook",
            "UniswapV4MulticurveInitializer",
            "UniswapV4MulticurveInitializerHook",
            "UniswapV4ScheduledMulticurveInitializer",
            "UniswapV4ScheduledMulticurveInitializerHook",
            "DopplerHookInitializer",
            "UniswapV4MigratorHook",
            "UniswapV4Migrator",
            "DopplerHookMigrator",
            "RehypeDopplerHookMigrator",
            "DecayMulticurveInitializer",
            "DecayMulticurveInitializerHook",
        ]
        .into_iter()
        .collect();
        assert_eq!(names, expected, "role set");
        assert_eq!(catalog.roles.len(), expected.len(), "no duplicates");
    }

    #[test]
    fn unknown_addresses_leave_roles_undeployed() {
        let plan = plan_on(
            Profile::Multicurve,
            &AddressBook::builtin(),
            &[Chain::Base, Chain::BaseSepolia],
        );
        for name in ["Airlock", "DERC20", "UniswapV4Migrator"] {
            let role = plan.role(name).expect("declared");
            assert!(role.bindings.is_empty(), "{name} has no known address");
        }
    }

    #[test]
    fn token_role_derives_from_airlock_create() {
        let book = full_book();
        let plan = plan_on(Profile::Multicurve, &book, &[Chain::Base]);

        let binding = &plan.role("DERC20").expect("role").bindings[&Chain::Base];
        let BindingSource::Derived {
            event,
            factory_address,
            ..
        } = &binding.source
        else {
            panic!("DERC20 is factory-derived");
        };
        assert_eq!(event.signature, "Create(address,address,address,address)", "selector source");
        assert_eq!(*factory_address, book.get(Chain::Base).airlock, "airlock address");
    }

    #[test]
    fn address_book_layers_overrides() {
        let airlock = Address::repeat_byte(0x42);
        let book = AddressBook::builtin().with(
            Chain::Base,
            ChainAddresses {
                airlock: Some(airlock),
                ..ChainAddresses::NONE
            },
        );
        let base = book.get(Chain::Base);
        assert_eq!(base.airlock, Some(airlock), "override applied");
        assert_eq!(
            base.rehype_doppler_hook_migrator,
            Chain::Base.addresses().rehype_doppler_hook_migrator,
            "built-in kept"
        );
        assert_eq!(book.get(Chain::Monad), ChainAddresses::NONE, "untouched chain");
    }

    #[test]
    fn bankr_profile_is_base_only() {
        let catalog = Profile::Bankr.catalog(&ChainRegistry::builtin(), &full_book());
        for role in &catalog.roles {
            assert!(role.deployments.iter().all(|d| d.chain == Chain::Base), "{}", role.name);
        }
        assert!(catalog.tasks.iter().all(|t| t.chain == Chain::Base), "tasks on base");
    }
}
