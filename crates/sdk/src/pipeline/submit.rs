use std::time::Duration;

use pmsettle_solana_utils::{
    client::{LedgerClient, SendOptions},
    cluster::Cluster,
    utils::inspector_url,
};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, SignerError},
    transaction::VersionedTransaction,
};

use super::{phase::TransactionPhase, progress::StepId};

/// Default signature timeout.
pub const DEFAULT_SIGNATURE_TIMEOUT: Duration = Duration::from_secs(120);

/// A wallet able to sign transactions on behalf of its owner.
///
/// No key material is handled by the pipeline itself.
#[allow(async_fn_in_trait)]
pub trait Wallet {
    /// The pubkey of the wallet, used as the fee payer.
    fn pubkey(&self) -> Pubkey;

    /// Sign the transaction, filling the slot of [`Wallet::pubkey`].
    ///
    /// Wallets without signing capability keep the default implementation.
    async fn sign_transaction(
        &self,
        _transaction: VersionedTransaction,
    ) -> crate::Result<VersionedTransaction> {
        Err(crate::Error::WalletUnsupported)
    }
}

impl<W: Wallet> Wallet for &W {
    fn pubkey(&self) -> Pubkey {
        (**self).pubkey()
    }

    async fn sign_transaction(
        &self,
        transaction: VersionedTransaction,
    ) -> crate::Result<VersionedTransaction> {
        (**self).sign_transaction(transaction).await
    }
}

/// [`Wallet`] backed by a local [`Signer`].
#[derive(Debug, Clone)]
pub struct SignerWallet<S>(S);

impl<S: Signer> SignerWallet<S> {
    /// Create from a signer.
    pub fn new(signer: S) -> Self {
        Self(signer)
    }

    /// Returns the signer.
    pub fn signer(&self) -> &S {
        &self.0
    }
}

impl<S: Signer> Wallet for SignerWallet<S> {
    fn pubkey(&self) -> Pubkey {
        self.0.pubkey()
    }

    async fn sign_transaction(
        &self,
        mut transaction: VersionedTransaction,
    ) -> crate::Result<VersionedTransaction> {
        let pubkey = self.0.try_pubkey()?;
        let num_required = usize::from(transaction.message.header().num_required_signatures);
        let index = transaction
            .message
            .static_account_keys()
            .iter()
            .take(num_required)
            .position(|key| *key == pubkey)
            .ok_or(SignerError::KeypairPubkeyMismatch)?;
        if transaction.signatures.len() < num_required {
            transaction
                .signatures
                .resize(num_required, Signature::default());
        }
        transaction.signatures[index] = self.0.try_sign_message(&transaction.message.serialize())?;
        Ok(transaction)
    }
}

/// Checks that every required signature slot is filled.
pub fn verify_signatures(transaction: &VersionedTransaction) -> crate::Result<()> {
    let num_required = usize::from(transaction.message.header().num_required_signatures);
    let keys = transaction.message.static_account_keys();
    for index in 0..num_required {
        let filled = transaction
            .signatures
            .get(index)
            .is_some_and(|signature| *signature != Signature::default());
        if !filled {
            return Err(crate::Error::IncompleteSignature {
                index,
                signer: keys.get(index).copied().unwrap_or_default(),
            });
        }
    }
    if transaction.signatures.len() != num_required {
        return Err(crate::Error::invalid_argument(format!(
            "expected {num_required} signatures, found {}",
            transaction.signatures.len()
        )));
    }
    Ok(())
}

/// Signs and submits phases.
#[derive(Debug)]
pub struct Submitter<'a, C, W> {
    client: &'a C,
    wallet: &'a W,
    options: SendOptions,
    signature_timeout: Duration,
    cluster: Option<&'a Cluster>,
}

impl<'a, C, W> Submitter<'a, C, W> {
    /// Create a new submitter with default options.
    pub fn new(client: &'a C, wallet: &'a W) -> Self {
        Self {
            client,
            wallet,
            options: SendOptions::default(),
            signature_timeout: DEFAULT_SIGNATURE_TIMEOUT,
            cluster: None,
        }
    }

    /// Set send options.
    pub fn with_options(mut self, options: SendOptions) -> Self {
        self.options = options;
        self
    }

    /// Set how long to wait for the wallet.
    pub fn with_signature_timeout(mut self, timeout: Duration) -> Self {
        self.signature_timeout = timeout;
        self
    }

    /// Set the cluster used for inspector URLs in logs.
    pub fn with_cluster(mut self, cluster: &'a Cluster) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Returns the explorer inspector URL of the transaction.
    pub fn inspect(&self, transaction: &VersionedTransaction) -> String {
        match self.cluster {
            Some(cluster) => inspector_url(transaction, cluster),
            None => inspector_url(transaction, &Cluster::default()),
        }
    }
}

impl<C: LedgerClient, W: Wallet> Submitter<'_, C, W> {
    /// Build and fully sign the transaction of the given phase.
    ///
    /// Nothing is submitted.
    pub async fn sign(&self, phase: &TransactionPhase) -> crate::Result<VersionedTransaction> {
        let blockhash = self.client.latest_blockhash().await?;
        let unsigned = phase.group().unsigned_transaction(blockhash)?;
        let mut transaction = tokio::time::timeout(
            self.signature_timeout,
            self.wallet.sign_transaction(unsigned),
        )
        .await
        .map_err(|_| crate::Error::TimedOut("waiting for the wallet signature"))??;
        phase.group().sign_with_owned_signers(&mut transaction)?;
        verify_signatures(&transaction)?;
        Ok(transaction)
    }

    /// Simulate the transaction and log the outcome.
    ///
    /// Never fails, the simulation is diagnostic only.
    pub async fn simulate(&self, step: StepId, transaction: &VersionedTransaction) {
        match self.client.simulate(transaction).await {
            Ok(report) if report.is_ok() => {
                tracing::debug!(
                    %step,
                    units_consumed = ?report.units_consumed,
                    "simulation succeeded"
                );
            }
            Ok(report) => {
                tracing::warn!(
                    %step,
                    err = ?report.err,
                    logs = ?report.logs,
                    "simulation failed, submitting anyway"
                );
            }
            Err(err) => {
                tracing::warn!(%step, %err, "unable to simulate, submitting anyway");
            }
        }
    }

    /// Submit the signed transaction and wait for confirmation.
    pub async fn submit(
        &self,
        step: StepId,
        transaction: &VersionedTransaction,
    ) -> crate::Result<Signature> {
        verify_signatures(transaction)?;
        tracing::debug!(%step, "sending transaction");
        let signature = self
            .client
            .send_and_confirm(transaction, &self.options)
            .await
            .map_err(crate::Error::Submission)?;
        tracing::info!(%step, %signature, "transaction confirmed");
        Ok(signature)
    }
}
