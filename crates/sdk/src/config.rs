use std::{collections::HashSet, path::Path, time::Duration};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use pmsettle_solana_utils::{
    client::{SendOptions, DEFAULT_CONFIRM_TIMEOUT, DEFAULT_POLL_INTERVAL},
    cluster::Cluster,
    compute_budget::ComputeBudget,
    solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig},
};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
};
use typed_builder::TypedBuilder;

use crate::{
    pipeline::submit::DEFAULT_SIGNATURE_TIMEOUT,
    pyth::{
        hermes::DEFAULT_HERMES_BASE, receiver::PYTH_RECEIVER_PROGRAM_ID,
        wormhole::WORMHOLE_PROGRAM_ID, Hermes,
    },
    serde::StringPubkey,
};

/// Prefix of the environment variables overriding the config.
pub const ENV_PREFIX: &str = "PMSETTLE_";

/// Separator of nested keys in environment variables.
pub const ENV_SPLIT: &str = "__";

/// Maximum size of a serialized transaction.
pub const PACKET_DATA_SIZE: usize = 1232;

/// Default compute unit limit of a post transaction.
pub const DEFAULT_POST_COMPUTE_UNITS: u32 = 400_000;

/// Pipeline configuration.
#[serde_as]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, TypedBuilder)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cluster to connect to.
    #[builder(default)]
    pub cluster: Cluster,
    /// Commitment for preflight and confirmation.
    #[builder(default = CommitmentLevel::Confirmed)]
    pub commitment: CommitmentLevel,
    /// Base URL of the Hermes service.
    #[builder(default = DEFAULT_HERMES_BASE.to_string(), setter(into))]
    pub hermes_url: String,
    /// Wormhole core bridge program.
    #[builder(default = WORMHOLE_PROGRAM_ID.into(), setter(into))]
    pub wormhole_program_id: StringPubkey,
    /// Pyth receiver program.
    #[builder(default = PYTH_RECEIVER_PROGRAM_ID.into(), setter(into))]
    pub receiver_program_id: StringPubkey,
    /// Receiver treasury id. A random one is picked for each run when unset.
    #[builder(default)]
    pub treasury_id: Option<u8>,
    /// Compute unit limit of post transactions.
    #[builder(default = DEFAULT_POST_COMPUTE_UNITS)]
    pub post_compute_units: u32,
    /// Compute unit limit of single-transaction steps.
    #[builder(default = ComputeBudget::DEFAULT_LIMIT_UNITS)]
    pub resolve_compute_units: u32,
    /// Compute unit price in micro lamports.
    #[builder(default)]
    pub compute_unit_price: u64,
    /// Transactions estimated larger than this are split or flagged.
    #[builder(default = PACKET_DATA_SIZE)]
    pub packet_limit: usize,
    /// Simulate the resolve transaction before submitting it.
    #[builder(default = true)]
    pub simulate_before_resolve: bool,
    /// Close the encoded VAA and price update accounts after resolution.
    #[builder(default)]
    pub close_accounts: bool,
    /// How long to wait for the wallet to sign.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[builder(default = DEFAULT_SIGNATURE_TIMEOUT)]
    pub signature_timeout: Duration,
    /// How long to wait for a confirmation.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[builder(default = DEFAULT_CONFIRM_TIMEOUT)]
    pub confirm_timeout: Duration,
    /// Interval between two signature status queries.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
    /// Addresses that must never be marked as signers in server-issued instructions.
    #[builder(default)]
    pub extra_non_signers: Vec<StringPubkey>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    /// Load the config from an optional TOML file, overridden by `PMSETTLE_` environment variables.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SPLIT))
            .extract()?;
        Ok(config)
    }

    /// Commitment config.
    pub fn commitment_config(&self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.commitment,
        }
    }

    /// Create a RPC client for the configured cluster.
    pub fn rpc_client(&self) -> RpcClient {
        self.cluster.rpc(self.commitment_config())
    }

    /// Create a Hermes client.
    pub fn hermes(&self) -> crate::Result<Hermes> {
        Hermes::try_new(self.hermes_url.as_str())
    }

    /// Send options.
    pub fn send_options(&self) -> SendOptions {
        SendOptions {
            config: RpcSendTransactionConfig {
                skip_preflight: false,
                preflight_commitment: Some(self.commitment),
                ..Default::default()
            },
            commitment: self.commitment_config(),
            confirm_timeout: self.confirm_timeout,
            poll_interval: self.poll_interval,
        }
    }

    /// Compute budget of post transactions.
    pub fn post_compute_budget(&self) -> ComputeBudget {
        ComputeBudget::default()
            .with_limit(self.post_compute_units)
            .with_price(self.compute_unit_price)
    }

    /// Compute budget of single-transaction steps.
    pub fn resolve_compute_budget(&self) -> ComputeBudget {
        ComputeBudget::default()
            .with_limit(self.resolve_compute_units)
            .with_price(self.compute_unit_price)
    }

    /// Addresses forced to non-signer, including the market address if any.
    pub fn forced_non_signers(&self, market: Option<Pubkey>) -> HashSet<Pubkey> {
        self.extra_non_signers
            .iter()
            .map(|address| address.0)
            .chain(market)
            .collect()
    }
}
