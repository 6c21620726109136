//! Contract roles and their per-chain deployments.

use alloy::primitives::Address;

use crate::chains::Chain;
use crate::source::{AddressSource, EventSignature};

/// One deployment of a role on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// The chain the role is deployed on.
    pub chain: Chain,
    /// First block to subscribe from.
    pub start_block: u64,
    /// How the contract address becomes known.
    pub source: AddressSource,
}

/// A logical kind of contract, independent of the chain it lives on.
///
/// A role with no deployments is valid: it plans to an empty mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRole {
    /// Unique role name, e.g. `Airlock`.
    pub name: String,
    /// Opaque ABI reference handed through to the event decoder.
    pub abi: String,
    /// Declared deployments, at most one per chain.
    pub deployments: Vec<Deployment>,
}

impl ContractRole {
    /// A role with no deployments yet.
    #[must_use]
    pub fn new(name: impl Into<String>, abi: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abi: abi.into(),
            deployments: Vec::new(),
        }
    }

    /// Add a deployment with an explicit [`AddressSource`].
    #[must_use]
    pub fn deploy(mut self, chain: Chain, start_block: u64, source: AddressSource) -> Self {
        self.deployments.push(Deployment {
            chain,
            start_block,
            source,
        });
        self
    }

    /// Add a deployment at a fixed address. `None` leaves the role
    /// undeployed on `chain`, which lets catalogs pass
    /// [`crate::chains::ChainAddresses`] fields straight through.
    #[must_use]
    pub fn at(self, chain: Chain, start_block: u64, address: Option<Address>) -> Self {
        match address {
            Some(address) => self.deploy(chain, start_block, AddressSource::Static(address)),
            None => self,
        }
    }

    /// Add a deployment whose addresses come from `source_role`'s `event`.
    #[must_use]
    pub fn derived_from(
        self,
        chain: Chain,
        start_block: u64,
        source_role: &str,
        event: EventSignature,
        extracted_field: &str,
    ) -> Self {
        let source = AddressSource::derived(source_role, event, extracted_field, start_block);
        self.deploy(chain, start_block, source)
    }

    /// The deployment on `chain`, if any.
    #[must_use]
    pub fn deployment_on(&self, chain: Chain) -> Option<&Deployment> {
        self.deployments.iter().find(|d| d.chain == chain)
    }
}
