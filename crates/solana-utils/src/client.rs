use std::time::Duration;

use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig},
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use tokio::time::{sleep, Instant};

/// Default confirmation timeout.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(90);

/// Default interval between two signature status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Options for sending a transaction.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Config passed to `sendTransaction`.
    pub config: RpcSendTransactionConfig,
    /// Commitment to wait for.
    pub commitment: CommitmentConfig,
    /// Give up waiting for confirmation after this duration.
    pub confirm_timeout: Duration,
    /// Interval between two status queries.
    pub poll_interval: Duration,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            config: RpcSendTransactionConfig {
                skip_preflight: false,
                preflight_commitment: Some(CommitmentLevel::Confirmed),
                ..Default::default()
            },
            commitment: CommitmentConfig::confirmed(),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Outcome of a transaction simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    /// Transaction error, if the simulation failed.
    pub err: Option<TransactionError>,
    /// Program logs.
    pub logs: Vec<String>,
    /// Compute units consumed.
    pub units_consumed: Option<u64>,
}

impl SimulationReport {
    /// Returns whether the simulation succeeded.
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// The subset of ledger RPC used by the settlement flows.
///
/// Implementations must be safe to share between concurrent runs.
#[allow(async_fn_in_trait)]
pub trait LedgerClient {
    /// Default commitment of the client.
    fn commitment(&self) -> CommitmentConfig;

    /// Fetch a recent blockhash.
    async fn latest_blockhash(&self) -> crate::Result<Hash>;

    /// Get the lamports required for an account of `len` bytes to be rent exempt.
    async fn rent_exempt_balance(&self, len: usize) -> crate::Result<u64>;

    /// Simulate the given transaction without signature verification.
    async fn simulate(
        &self,
        transaction: &VersionedTransaction,
    ) -> crate::Result<SimulationReport>;

    /// Send the transaction and wait until it reaches the requested commitment.
    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        options: &SendOptions,
    ) -> crate::Result<Signature>;
}

impl<T: LedgerClient> LedgerClient for &T {
    fn commitment(&self) -> CommitmentConfig {
        (**self).commitment()
    }

    async fn latest_blockhash(&self) -> crate::Result<Hash> {
        (**self).latest_blockhash().await
    }

    async fn rent_exempt_balance(&self, len: usize) -> crate::Result<u64> {
        (**self).rent_exempt_balance(len).await
    }

    async fn simulate(
        &self,
        transaction: &VersionedTransaction,
    ) -> crate::Result<SimulationReport> {
        (**self).simulate(transaction).await
    }

    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        options: &SendOptions,
    ) -> crate::Result<Signature> {
        (**self).send_and_confirm(transaction, options).await
    }
}

impl LedgerClient for RpcClient {
    fn commitment(&self) -> CommitmentConfig {
        RpcClient::commitment(self)
    }

    async fn latest_blockhash(&self) -> crate::Result<Hash> {
        Ok(self.get_latest_blockhash().await?)
    }

    async fn rent_exempt_balance(&self, len: usize) -> crate::Result<u64> {
        Ok(self.get_minimum_balance_for_rent_exemption(len).await?)
    }

    async fn simulate(
        &self,
        transaction: &VersionedTransaction,
    ) -> crate::Result<SimulationReport> {
        let result = self
            .simulate_transaction_with_config(
                transaction,
                RpcSimulateTransactionConfig {
                    sig_verify: false,
                    commitment: Some(RpcClient::commitment(self)),
                    ..Default::default()
                },
            )
            .await?
            .value;
        Ok(SimulationReport {
            err: result.err,
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }

    async fn send_and_confirm(
        &self,
        transaction: &VersionedTransaction,
        options: &SendOptions,
    ) -> crate::Result<Signature> {
        let signature = self
            .send_transaction_with_config(transaction, options.config)
            .await?;
        tracing::debug!(%signature, "transaction sent, waiting for confirmation");

        let recent_blockhash = *transaction.message.recent_blockhash();
        let deadline = Instant::now() + options.confirm_timeout;

        loop {
            match self
                .get_signature_status_with_commitment(&signature, options.commitment)
                .await?
            {
                Some(Ok(())) => return Ok(signature),
                Some(Err(error)) => {
                    return Err(crate::Error::TransactionFailed { signature, error });
                }
                None => {
                    if !self
                        .is_blockhash_valid(&recent_blockhash, CommitmentConfig::processed())
                        .await?
                    {
                        return Err(crate::Error::Unconfirmed {
                            signature,
                            reason: "blockhash expired",
                        });
                    }
                    if Instant::now() >= deadline {
                        return Err(crate::Error::Unconfirmed {
                            signature,
                            reason: "confirmation timed out",
                        });
                    }
                    sleep(options.poll_interval).await;
                }
            }
        }
    }
}
