#![deny(missing_docs)]
#![deny(unreachable_pub)]

//! # PMSettle SDK
//!
//! Client-side settlement pipeline for oracle-resolved prediction markets:
//! fetch a Pyth attestation, post it through Wormhole and the Pyth receiver,
//! patch the server's consume instructions with the posted price update account,
//! then sign, submit and classify every step while reporting progress.

/// Error type.
pub mod error;

/// Configuration.
pub mod config;

/// Serialization helpers.
pub mod serde;

/// Utils.
pub mod utils;

/// Server-issued instruction templates.
pub mod instruction;

/// Pyth pull oracle support.
pub mod pyth;

/// Settlement pipeline and sibling action flows.
pub mod pipeline;

pub use error::Error;

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;

pub use pmsettle_solana_utils as solana_utils;

pub use pmsettle_solana_utils::{
    client::LedgerClient, AtomicGroup, Error as SolanaUtilsError,
};
