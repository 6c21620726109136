//! How a contract's address becomes known: fixed, or discovered from events.

use std::fmt;

use alloy::primitives::{Address, B256, keccak256};
use alloy::sol_types::SolEvent;
use serde::Serialize;

/// A Solidity event signature together with its topic-0 selector.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct EventSignature {
    /// Canonical signature, e.g. `Create(address,address,address,address)`.
    pub signature: String,
    /// `keccak256(signature)`.
    pub selector: B256,
}

impl EventSignature {
    /// Build from a canonical signature string.
    #[must_use]
    pub fn new(signature: impl Into<String>) -> Self {
        let signature = signature.into();
        let selector = keccak256(signature.as_bytes());
        Self {
            signature,
            selector,
        }
    }

    /// Build from an event type generated by [`alloy::sol!`].
    #[must_use]
    pub fn of<E: SolEvent>() -> Self {
        Self {
            signature: E::SIGNATURE.to_owned(),
            selector: E::SIGNATURE_HASH,
        }
    }

    /// The event name, without its parameter list.
    #[must_use]
    pub fn name(&self) -> &str {
        self.signature
            .split_once('(')
            .map_or(self.signature.as_str(), |(name, _)| name)
    }
}

impl fmt::Debug for EventSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.signature, self.selector)
    }
}

/// Where a contract role gets its address on a given chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    /// A single address known in advance.
    Static(Address),
    /// Addresses extracted at runtime from a factory role's events.
    Derived(DerivedSource),
}

impl AddressSource {
    /// Shorthand for a [`DerivedSource`].
    #[must_use]
    pub fn derived(
        source_role: impl Into<String>,
        event: EventSignature,
        extracted_field: impl Into<String>,
        from_block: u64,
    ) -> Self {
        Self::Derived(DerivedSource {
            source_role: source_role.into(),
            event,
            extracted_field: extracted_field.into(),
            from_block,
        })
    }
}

/// A factory-discovered address source.
///
/// The planner never resolves concrete addresses. The ingestion engine
/// watches `event` on `source_role`'s binding for the same chain and
/// collects `extracted_field` from each match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSource {
    /// The factory role whose events reveal new addresses.
    pub source_role: String,
    /// The creation event to watch.
    pub event: EventSignature,
    /// The event parameter holding the new address.
    pub extracted_field: String,
    /// First block at which the factory is watched.
    pub from_block: u64,
}
