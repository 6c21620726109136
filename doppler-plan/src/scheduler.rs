//! Periodic snapshot tasks (price-feed reads) and their chain binding.
//!
//! A task whose logical chain is unreachable is not dropped. It is rebound
//! to the carrier chain with [`Interval::Never`], so every declared task
//! name stays present for consumers that enumerate tasks by name. Only when
//! the carrier itself is unreachable does [`UnhostedTasks`] decide between
//! omission and failure.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize, Serializer};

use crate::chains::{Chain, ChainRegistry};
use crate::credentials::ReachableChains;
use crate::error::ConfigError;
use crate::plan::{Omission, OmissionReason};

/// Wire value of [`Interval::Never`] for consumers that need a block count.
pub const NEVER_FIRES_BLOCKS: u64 = 99_999_999_999;

/// How often a task runs, in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    /// Every `n` blocks.
    Every(NonZeroU64),
    /// Declared and schedulable, but never due.
    Never,
}

impl Interval {
    /// The sentinel given to tasks parked on a carrier chain.
    pub const NEVER_FIRES: Self = Self::Never;

    /// An interval of `n` blocks. Returns `None` for zero.
    #[must_use]
    pub const fn blocks(n: u64) -> Option<Self> {
        match NonZeroU64::new(n) {
            Some(n) => Some(Self::Every(n)),
            None => None,
        }
    }

    /// Block count handed to the polling engine.
    #[must_use]
    pub const fn as_blocks(self) -> u64 {
        match self {
            Self::Every(n) => n.get(),
            Self::Never => NEVER_FIRES_BLOCKS,
        }
    }

    /// Returns `true` unless this is the never-fires sentinel.
    #[must_use]
    pub const fn fires(self) -> bool {
        matches!(self, Self::Every(_))
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.as_blocks())
    }
}

/// What to do with a task when neither its chain nor the carrier is reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnhostedTasks {
    /// Drop the task and record the omission.
    #[default]
    Omit,
    /// Fail plan assembly with [`ConfigError::NoReachableCarrier`].
    Reject,
}

/// A declared polling task, before reachability is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDecl {
    /// Unique task name.
    pub name: String,
    /// The chain the task is meant to read.
    pub chain: Chain,
    /// First block of the task.
    pub start_block: u64,
    /// Declared interval. May itself be [`Interval::Never`] for tasks that
    /// are kept declared but dormant.
    pub interval: Interval,
}

impl TaskDecl {
    /// Declare a task.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        chain: Chain,
        start_block: u64,
        interval: Interval,
    ) -> Self {
        Self {
            name: name.into(),
            chain,
            start_block,
            interval,
        }
    }
}

/// A scheduled polling task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingTask {
    /// Unique task name.
    pub name: String,
    /// The reachable chain hosting the task.
    pub chain: Chain,
    /// The chain the task was declared for.
    pub logical_chain: Chain,
    /// First block of the task.
    pub start_block: u64,
    /// Effective interval.
    pub interval: Interval,
}

impl PollingTask {
    /// Returns `true` if the task is parked on a carrier chain.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.chain != self.logical_chain
    }
}

/// Output of [`schedule`].
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    /// Scheduled tasks by name.
    pub tasks: BTreeMap<String, PollingTask>,
    /// Tasks that could not be hosted anywhere.
    pub omitted: Vec<Omission>,
}

/// Bind every declared task to a reachable chain.
///
/// # Errors
///
/// - [`ConfigError::DuplicateTaskName`] if two declarations share a name.
/// - [`ConfigError::UnknownChain`] if the carrier or a task's chain is not registered.
/// - [`ConfigError::InvalidStartingPoint`] if a firing task starts before
///   its chain's earliest block.
/// - [`ConfigError::NoReachableCarrier`] under [`UnhostedTasks::Reject`].
pub fn schedule(
    decls: &[TaskDecl],
    registry: &ChainRegistry,
    reachable: &ReachableChains,
    carrier: Chain,
    policy: UnhostedTasks,
) -> Result<Schedule, ConfigError> {
    if registry.get(carrier).is_none() {
        return Err(ConfigError::UnknownChain {
            subject: "carrier".to_owned(),
            chain: carrier,
        });
    }

    let mut seen = BTreeSet::new();
    for decl in decls {
        if !seen.insert(decl.name.as_str()) {
            return Err(ConfigError::DuplicateTaskName {
                task: decl.name.clone(),
            });
        }
    }

    let mut out = Schedule::default();
    for decl in decls {
        let cfg = registry
            .get(decl.chain)
            .ok_or_else(|| ConfigError::UnknownChain {
                subject: decl.name.clone(),
                chain: decl.chain,
            })?;

        let (chain, interval) = if reachable.contains(decl.chain) {
            if decl.interval.fires() && decl.start_block < cfg.start_block {
                return Err(ConfigError::InvalidStartingPoint {
                    subject: decl.name.clone(),
                    chain: decl.chain,
                    start_block: decl.start_block,
                    earliest_block: cfg.start_block,
                });
            }
            (decl.chain, decl.interval)
        } else if reachable.contains(carrier) {
            tracing::debug!(task = %decl.name, chain = %decl.chain, %carrier, "parked on carrier");
            (carrier, Interval::NEVER_FIRES)
        } else {
            match policy {
                UnhostedTasks::Omit => {
                    tracing::warn!(
                        task = %decl.name,
                        chain = %decl.chain,
                        %carrier,
                        "no reachable carrier, task omitted"
                    );
                    out.omitted.push(Omission {
                        subject: decl.name.clone(),
                        chain: decl.chain,
                        reason: OmissionReason::NoCarrier,
                    });
                    continue;
                }
                UnhostedTasks::Reject => {
                    return Err(ConfigError::NoReachableCarrier {
                        task: decl.name.clone(),
                        chain: decl.chain,
                        carrier,
                    });
                }
            }
        };

        out.tasks.insert(
            decl.name.clone(),
            PollingTask {
                name: decl.name.clone(),
                chain,
                logical_chain: decl.chain,
                start_block: decl.start_block,
                interval,
            },
        );
    }

    Ok(out)
}
