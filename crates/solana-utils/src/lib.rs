#![deny(missing_docs)]
#![deny(unreachable_pub)]

//! # PMSettle Solana Utils

/// Error type.
pub mod error;

/// Cluster.
pub mod cluster;

/// Signer.
pub mod signer;

/// Compute budget.
pub mod compute_budget;

/// Instruction group.
pub mod instruction_group;

/// Ledger RPC client.
#[cfg(client)]
pub mod client;

/// Utils.
pub mod utils;

pub use crate::{error::Error, instruction_group::AtomicGroup};

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(client)]
pub use solana_client;
pub use solana_sdk;
