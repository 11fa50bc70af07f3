use pmsettle_solana_utils::client::LedgerClient;

use crate::{
    config::PipelineConfig,
    instruction::{patch::patch_instruction, InstructionBundle},
};

use super::{
    classify::{AlreadyProcessed, FailureClassifier},
    execute_step,
    phase::{PhaseBuilder, TransactionPhase},
    progress::{ProgressEvent, ProgressReporter, StepId, TracingReporter},
    submit::{Submitter, Wallet},
    StepOutcome,
};

/// Runs server-issued single-transaction actions: placing a bet or creating a market.
///
/// Unlike [`SettlementPipeline`](super::SettlementPipeline), a flow holds no
/// per-run state and can be reused.
#[derive(Debug)]
pub struct ActionFlow<C, W, R = TracingReporter, K = AlreadyProcessed> {
    config: PipelineConfig,
    client: C,
    wallet: W,
    reporter: R,
    classifier: K,
}

impl<C, W> ActionFlow<C, W> {
    /// Create a new flow.
    pub fn new(config: PipelineConfig, client: C, wallet: W) -> Self {
        Self {
            config,
            client,
            wallet,
            reporter: TracingReporter,
            classifier: AlreadyProcessed,
        }
    }
}

impl<C, W, R, K> ActionFlow<C, W, R, K> {
    /// Replace the progress reporter.
    pub fn with_reporter<R2>(self, reporter: R2) -> ActionFlow<C, W, R2, K> {
        ActionFlow {
            config: self.config,
            client: self.client,
            wallet: self.wallet,
            reporter,
            classifier: self.classifier,
        }
    }

    /// Replace the failure classifier.
    pub fn with_classifier<K2>(self, classifier: K2) -> ActionFlow<C, W, R, K2> {
        ActionFlow {
            config: self.config,
            client: self.client,
            wallet: self.wallet,
            reporter: self.reporter,
            classifier,
        }
    }
}

impl<C, W, R, K> ActionFlow<C, W, R, K>
where
    C: LedgerClient,
    W: Wallet,
    R: ProgressReporter,
    K: FailureClassifier,
{
    /// Run the action of the bundle as `step`.
    ///
    /// Only [`StepId::PlaceBet`] and [`StepId::CreateMarket`] are actions.
    pub async fn run(
        &self,
        step: StepId,
        bundle: &InstructionBundle,
    ) -> crate::Result<StepOutcome> {
        if !matches!(step, StepId::PlaceBet | StepId::CreateMarket) {
            return Err(crate::Error::invalid_argument(format!(
                "`{step}` is not an action"
            )));
        }

        let phase = match self.build(step, bundle) {
            Ok(phase) => phase,
            Err(err) => {
                tracing::error!(%step, %err, "failed to build the action transaction");
                self.reporter.report(ProgressEvent::error(step, &err, None));
                return Err(err);
            }
        };

        let submitter = Submitter::new(&self.client, &self.wallet)
            .with_options(self.config.send_options())
            .with_signature_timeout(self.config.signature_timeout)
            .with_cluster(&self.config.cluster);
        execute_step(
            &submitter,
            &self.reporter,
            &self.classifier,
            &phase,
            false,
            None,
        )
        .await
    }

    fn build(&self, step: StepId, bundle: &InstructionBundle) -> crate::Result<TransactionPhase> {
        bundle.ensure_ok()?;
        let instructions = bundle.decode_instructions()?;
        if instructions.is_empty() {
            return Err(crate::Error::invalid_argument("the bundle has no instructions"));
        }
        let forced = self.config.forced_non_signers(bundle.market_address());
        let instructions = instructions
            .iter()
            .map(|ix| patch_instruction(ix, None, &forced));
        Ok(PhaseBuilder::new(&self.client, self.wallet.pubkey(), &self.config)
            .single_phase(step, instructions))
    }
}
