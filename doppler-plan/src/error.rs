use thiserror::Error;

use crate::chains::Chain;

/// Errors that abort plan assembly.
///
/// Each variant names the role, chain or task at fault. No partial plan is
/// ever returned alongside one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two polling tasks were declared with the same name.
    #[error("polling task `{task}` is declared more than once")]
    DuplicateTaskName {
        /// The repeated task name.
        task: String,
    },

    /// Two contract roles were declared with the same name.
    #[error("contract role `{role}` is declared more than once")]
    DuplicateRoleName {
        /// The repeated role name.
        role: String,
    },

    /// A role declares more than one deployment on the same chain.
    #[error("contract role `{role}` has more than one deployment on {chain}")]
    DuplicateDeployment {
        /// The role at fault.
        role: String,
        /// The chain with multiple deployments.
        chain: Chain,
    },

    /// A derived address source points at a role with no binding on that chain.
    #[error(
        "contract role `{role}` on {chain} derives addresses from `{source_role}`, \
         which has no binding on {chain}"
    )]
    DanglingDerivedReference {
        /// The role whose address is derived.
        role: String,
        /// The chain of the derived binding.
        chain: Chain,
        /// The referenced factory role.
        source_role: String,
    },

    /// A binding or task starts before the chain's earliest relevant block.
    #[error(
        "`{subject}` on {chain} starts at block {start_block}, \
         before the chain's earliest block {earliest_block}"
    )]
    InvalidStartingPoint {
        /// The role or task at fault.
        subject: String,
        /// The chain it is bound to.
        chain: Chain,
        /// The declared starting block.
        start_block: u64,
        /// The chain's earliest relevant block.
        earliest_block: u64,
    },

    /// A task targets an unreachable chain and the carrier is unreachable too.
    #[error(
        "polling task `{task}` targets unreachable {chain} \
         and carrier {carrier} is unreachable"
    )]
    NoReachableCarrier {
        /// The task that cannot be hosted.
        task: String,
        /// The task's logical chain.
        chain: Chain,
        /// The designated carrier chain.
        carrier: Chain,
    },

    /// A binding, task or carrier references a chain missing from the registry.
    #[error("`{subject}` references {chain}, which is not in the chain registry")]
    UnknownChain {
        /// The role, task or `carrier` at fault.
        subject: String,
        /// The unregistered chain.
        chain: Chain,
    },
}
