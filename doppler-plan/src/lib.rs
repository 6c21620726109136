//! Startup plan resolution for a multi-chain Doppler event indexer.
//!
//! Given the credentials available to this process and catalogs of
//! contract roles and polling tasks, [`build_plan`] produces an immutable
//! [`IndexingPlan`]: which role is followed on which chain from which
//! block, how each address is discovered, and where every price-feed task
//! runs.
//!
//! Rules applied during resolution:
//!
//! - No binding is ever created on a chain without a credential.
//! - A task whose chain is unreachable is parked on the carrier chain with
//!   [`Interval::Never`] instead of being dropped.
//! - Derived address sources must reference a factory role bound on the
//!   same chain.
//! - The optional [`ContentAllowlist`] narrows the dataset without
//!   changing the plan's shape.
//!
//! Any inconsistency is a [`ConfigError`] at startup; no partial plan is
//! returned.

pub mod allowlist;
pub mod chains;
pub mod credentials;
pub mod planner;
pub mod role;
pub mod scheduler;
pub mod source;

mod error;
mod plan;

pub use allowlist::ContentAllowlist;
pub use chains::{Chain, ChainAddresses, ChainConfig, ChainRegistry};
pub use credentials::{ReachableChains, resolve_credentials, resolve_credentials_from_env};
pub use error::ConfigError;
pub use plan::{IndexingPlan, Omission, OmissionReason, PlanOptions, build_plan};
pub use planner::{BindingRef, BindingSource, ChainBinding, RolePlan};
pub use role::{ContractRole, Deployment};
pub use scheduler::{Interval, NEVER_FIRES_BLOCKS, PollingTask, TaskDecl, UnhostedTasks};
pub use source::{AddressSource, DerivedSource, EventSignature};
