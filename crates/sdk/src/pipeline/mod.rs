/// Progress events.
pub mod progress;

/// Failure classification.
pub mod classify;

/// Signing and submission.
pub mod submit;

/// Transaction phases.
pub mod phase;

/// Single-transaction action flows.
pub mod action;

use std::fmt;

use pmsettle_solana_utils::client::LedgerClient;
use solana_sdk::signature::Signature;

use crate::{
    config::PipelineConfig,
    instruction::{
        patch::{patch_instruction, PatchOverride},
        InstructionBundle,
    },
    pyth::PullOracle,
};

use self::{
    classify::{AlreadyProcessed, FailureClassifier, Severity},
    phase::{PhaseBuilder, PostPlan, TransactionPhase},
    progress::{ProgressEvent, ProgressReporter, StepId, TracingReporter},
    submit::{Submitter, Wallet},
};

pub use self::action::ActionFlow;

/// State of a [`SettlementPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Fetching the attestation and planning the post transactions.
    Fetching,
    /// Submitting the post transaction with the given index.
    Posting(usize),
    /// Submitting the consume transaction.
    Resolving,
    /// Closing the posted accounts.
    Closing,
    /// Finished.
    Done,
    /// Aborted.
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Posting(index) => write!(f, "posting({index})"),
            Self::Resolving => write!(f, "resolving"),
            Self::Closing => write!(f, "closing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The transaction was confirmed.
    Confirmed(Signature),
    /// The step failed softly.
    Warned(String),
}

impl StepOutcome {
    /// Returns the signature if confirmed.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Confirmed(signature) => Some(signature),
            Self::Warned(_) => None,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineResult {
    /// Signatures of the confirmed steps, in order.
    pub signatures: Vec<(StepId, Signature)>,
    /// Number of steps that failed softly.
    pub warnings: usize,
}

impl PipelineResult {
    /// Returns the last confirmed signature.
    pub fn last_signature(&self) -> Option<&Signature> {
        self.signatures.last().map(|(_, signature)| signature)
    }
}

/// A failed run.
#[derive(Debug, thiserror::Error)]
#[error("settlement failed while {state}: {error}")]
pub struct PipelineFailure {
    /// The error.
    #[source]
    pub error: crate::Error,
    /// The state in which the run failed.
    pub state: PipelineState,
    /// Signatures confirmed before the failure.
    pub signatures: Vec<(StepId, Signature)>,
}

impl PipelineFailure {
    /// Returns the last confirmed signature.
    pub fn last_signature(&self) -> Option<&Signature> {
        self.signatures.last().map(|(_, signature)| signature)
    }
}

/// Drives one settlement run: fetch, post, resolve.
///
/// An instance runs once; create a new one for every run.
#[derive(Debug)]
pub struct SettlementPipeline<C, W, O, R = TracingReporter, K = AlreadyProcessed> {
    config: PipelineConfig,
    client: C,
    wallet: W,
    oracle: O,
    reporter: R,
    classifier: K,
    state: PipelineState,
}

impl<C, W, O> SettlementPipeline<C, W, O> {
    /// Create a new pipeline.
    pub fn new(config: PipelineConfig, client: C, wallet: W, oracle: O) -> Self {
        Self {
            config,
            client,
            wallet,
            oracle,
            reporter: TracingReporter,
            classifier: AlreadyProcessed,
            state: PipelineState::Idle,
        }
    }
}

impl<C, W, O, R, K> SettlementPipeline<C, W, O, R, K> {
    /// Replace the progress reporter.
    pub fn with_reporter<R2>(self, reporter: R2) -> SettlementPipeline<C, W, O, R2, K> {
        SettlementPipeline {
            config: self.config,
            client: self.client,
            wallet: self.wallet,
            oracle: self.oracle,
            reporter,
            classifier: self.classifier,
            state: self.state,
        }
    }

    /// Replace the failure classifier.
    pub fn with_classifier<K2>(self, classifier: K2) -> SettlementPipeline<C, W, O, R, K2> {
        SettlementPipeline {
            config: self.config,
            client: self.client,
            wallet: self.wallet,
            oracle: self.oracle,
            reporter: self.reporter,
            classifier,
            state: self.state,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns the config.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn transition(&mut self, state: PipelineState) {
        tracing::debug!(from = %self.state, to = %state, "pipeline state transition");
        self.state = state;
    }

    fn fail(
        &mut self,
        error: crate::Error,
        signatures: Vec<(StepId, Signature)>,
    ) -> PipelineFailure {
        let state = self.state;
        self.transition(PipelineState::Failed);
        PipelineFailure {
            error,
            state,
            signatures,
        }
    }
}

impl<C, W, O, R, K> SettlementPipeline<C, W, O, R, K>
where
    C: LedgerClient,
    W: Wallet,
    O: PullOracle,
    R: ProgressReporter,
    K: FailureClassifier,
{
    /// Run the settlement of the bundle.
    ///
    /// Fails with [`crate::Error::InvalidState`] if this instance has already run.
    pub async fn run(
        &mut self,
        bundle: &InstructionBundle,
    ) -> Result<PipelineResult, PipelineFailure> {
        if self.state != PipelineState::Idle {
            return Err(PipelineFailure {
                error: crate::Error::invalid_state(format!(
                    "a pipeline runs once, current state: {}",
                    self.state
                )),
                state: self.state,
                signatures: vec![],
            });
        }

        let mut result = PipelineResult::default();

        self.transition(PipelineState::Fetching);
        let plan = match self.prepare(bundle).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::error!(%err, "failed to prepare the post transactions");
                self.reporter
                    .report(ProgressEvent::error(StepId::Fetch, &err, None));
                return Err(self.fail(err, result.signatures));
            }
        };
        // Built before posting, so a broken template costs no transaction.
        let resolve = match self.resolve_phase(bundle, &plan) {
            Ok(phase) => phase,
            Err(err) => {
                tracing::error!(%err, "failed to build the resolve transaction");
                self.reporter
                    .report(ProgressEvent::error(StepId::Resolve, &err, None));
                return Err(self.fail(err, result.signatures));
            }
        };
        let close = match self.close_phase(&plan) {
            Ok(phase) => phase,
            Err(err) => {
                tracing::error!(%err, "failed to build the close transaction");
                self.reporter
                    .report(ProgressEvent::error(StepId::PostClose, &err, None));
                return Err(self.fail(err, result.signatures));
            }
        };

        for (index, phase) in plan.phases().iter().enumerate() {
            self.transition(PipelineState::Posting(index));
            if let Err(err) = self.execute(phase, false, &self.classifier, &mut result).await {
                return Err(self.fail(err, result.signatures));
            }
        }

        self.transition(PipelineState::Resolving);
        let simulate = self.config.simulate_before_resolve;
        if let Err(err) = self
            .execute(&resolve, simulate, &self.classifier, &mut result)
            .await
        {
            return Err(self.fail(err, result.signatures));
        }

        if let Some(close) = close {
            self.transition(PipelineState::Closing);
            // The settlement is done, failing to reclaim rent only warns.
            let best_effort = |_: &crate::Error| Severity::Soft;
            if let Err(err) = self.execute(&close, false, &best_effort, &mut result).await {
                return Err(self.fail(err, result.signatures));
            }
        }

        self.transition(PipelineState::Done);
        Ok(result)
    }

    async fn prepare(&self, bundle: &InstructionBundle) -> crate::Result<PostPlan> {
        bundle.ensure_ok()?;
        let params = bundle.settlement_params()?;
        let attestation = self
            .oracle
            .fetch_attestation(&params.feed_id, params.publish_time)
            .await?;
        PhaseBuilder::new(&self.client, self.wallet.pubkey(), &self.config)
            .build_post_plan(&attestation)
            .await
    }

    fn resolve_phase(
        &self,
        bundle: &InstructionBundle,
        plan: &PostPlan,
    ) -> crate::Result<TransactionPhase> {
        let params = bundle.settlement_params()?;
        let templates = bundle.decode_instructions()?;
        if templates.is_empty() {
            return Err(crate::Error::invalid_argument(
                "no consume instructions to resolve with",
            ));
        }
        let patch = PatchOverride {
            account_index: params.price_update_index,
            replacement_address: *plan.price_update(),
            force_signer_false: true,
        };
        let forced = self.config.forced_non_signers(bundle.market_address());
        let instructions = templates
            .iter()
            .map(|ix| patch_instruction(ix, Some(&patch), &forced));
        Ok(PhaseBuilder::new(&self.client, self.wallet.pubkey(), &self.config)
            .single_phase(StepId::Resolve, instructions))
    }

    fn close_phase(&self, plan: &PostPlan) -> crate::Result<Option<TransactionPhase>> {
        if !self.config.close_accounts {
            return Ok(None);
        }
        PhaseBuilder::new(&self.client, self.wallet.pubkey(), &self.config)
            .close_phase(plan)
            .map(Some)
    }

    async fn execute(
        &self,
        phase: &TransactionPhase,
        simulate: bool,
        classifier: &impl FailureClassifier,
        result: &mut PipelineResult,
    ) -> crate::Result<()> {
        let submitter = Submitter::new(&self.client, &self.wallet)
            .with_options(self.config.send_options())
            .with_signature_timeout(self.config.signature_timeout)
            .with_cluster(&self.config.cluster);
        let outcome = execute_step(
            &submitter,
            &self.reporter,
            classifier,
            phase,
            simulate,
            result.last_signature().copied(),
        )
        .await?;
        match outcome {
            StepOutcome::Confirmed(signature) => result.signatures.push((phase.step(), signature)),
            StepOutcome::Warned(_) => result.warnings += 1,
        }
        Ok(())
    }
}

/// Sign, submit and classify one phase, reporting its events.
///
/// Emits `Start` and then exactly one of `Success`, `Warning` or `Error`.
async fn execute_step<C, W, R, K>(
    submitter: &Submitter<'_, C, W>,
    reporter: &R,
    classifier: &K,
    phase: &TransactionPhase,
    simulate: bool,
    last_signature: Option<Signature>,
) -> crate::Result<StepOutcome>
where
    C: LedgerClient,
    W: Wallet,
    R: ProgressReporter,
    K: FailureClassifier,
{
    let step = phase.step();
    reporter.report(ProgressEvent::start(step));

    let submitted = match submitter.sign(phase).await {
        Ok(transaction) => {
            if simulate {
                submitter.simulate(step, &transaction).await;
            }
            let submitted = submitter.submit(step, &transaction).await;
            submitted.map_err(|err| (err, Some(transaction)))
        }
        Err(err) => Err((err, None)),
    };

    match submitted {
        Ok(signature) => {
            reporter.report(ProgressEvent::success(step, signature));
            Ok(StepOutcome::Confirmed(signature))
        }
        Err((err, transaction)) => match classifier.classify(&err) {
            Severity::Soft => {
                tracing::warn!(%step, %err, "step failed softly, continuing");
                reporter.report(ProgressEvent::warning(step, &err));
                Ok(StepOutcome::Warned(err.to_string()))
            }
            Severity::Fatal => {
                match transaction {
                    Some(transaction) => tracing::error!(
                        %step,
                        %err,
                        inspector = submitter.inspect(&transaction),
                        "step failed"
                    ),
                    None => tracing::error!(%step, %err, "step failed"),
                }
                reporter.report(ProgressEvent::error(step, &err, last_signature));
                Err(err)
            }
        },
    }
}
