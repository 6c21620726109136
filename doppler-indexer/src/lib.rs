//! Doppler indexer host.
//!
//! Supplies the built-in role and task catalogs, loads `config.toml`,
//! resolves credentials and hands the resulting
//! [`doppler_plan::IndexingPlan`] to the CLI and the RPC preflight.

pub mod catalog;
pub mod config;
pub mod preflight;
