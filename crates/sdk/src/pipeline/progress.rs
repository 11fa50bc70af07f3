use std::{fmt, str::FromStr};

use serde_with::{serde_as, DisplayFromStr};
use solana_sdk::signature::Signature;
use tokio::sync::mpsc::UnboundedSender;

/// Identifier of a pipeline step.
///
/// The string forms are stable and used by callers to key UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StepId {
    /// Attestation fetch.
    #[serde(rename = "fetch")]
    Fetch,
    /// Create, initialize and partially write the encoded VAA.
    #[serde(rename = "post:init")]
    PostInit,
    /// Finish writing and verifying the VAA and post the price update.
    #[serde(rename = "post:write")]
    PostWrite,
    /// Consume the posted price update.
    #[serde(rename = "resolve")]
    Resolve,
    /// Close the encoded VAA and price update accounts after resolution.
    #[serde(rename = "post:close")]
    PostClose,
    /// Place a bet.
    #[serde(rename = "bet")]
    PlaceBet,
    /// Create a market.
    #[serde(rename = "market:create")]
    CreateMarket,
}

impl StepId {
    /// All steps.
    pub const ALL: [Self; 7] = [
        Self::Fetch,
        Self::PostInit,
        Self::PostWrite,
        Self::Resolve,
        Self::PostClose,
        Self::PlaceBet,
        Self::CreateMarket,
    ];

    /// Returns the stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::PostInit => "post:init",
            Self::PostWrite => "post:write",
            Self::Resolve => "resolve",
            Self::PostClose => "post:close",
            Self::PlaceBet => "bet",
            Self::CreateMarket => "market:create",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| crate::Error::invalid_argument(format!("unknown step `{s}`")))
    }
}

/// Kind of a [`ProgressEvent`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// The step started.
    Start,
    /// The step was confirmed.
    Success {
        /// Signature of the transaction.
        #[serde_as(as = "DisplayFromStr")]
        signature: Signature,
    },
    /// The step failed softly, its effect already took place.
    Warning {
        /// Error message.
        message: String,
    },
    /// The step failed and the run aborted.
    Error {
        /// Error message.
        message: String,
        /// The last signature confirmed in this run.
        #[serde_as(as = "Option<DisplayFromStr>")]
        last_signature: Option<Signature>,
    },
}

/// Progress event.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProgressEvent {
    /// Step.
    pub step: StepId,
    /// Kind.
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ProgressEvent {
    /// Create a start event.
    pub fn start(step: StepId) -> Self {
        Self {
            step,
            kind: EventKind::Start,
        }
    }

    /// Create a success event.
    pub fn success(step: StepId, signature: Signature) -> Self {
        Self {
            step,
            kind: EventKind::Success { signature },
        }
    }

    /// Create a warning event.
    pub fn warning(step: StepId, message: impl ToString) -> Self {
        Self {
            step,
            kind: EventKind::Warning {
                message: message.to_string(),
            },
        }
    }

    /// Create an error event.
    pub fn error(step: StepId, message: impl ToString, last_signature: Option<Signature>) -> Self {
        Self {
            step,
            kind: EventKind::Error {
                message: message.to_string(),
                last_signature,
            },
        }
    }

    /// Returns whether this is a terminal event of its step.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, EventKind::Start)
    }
}

/// Consumer of progress events.
pub trait ProgressReporter {
    /// Report an event.
    fn report(&self, event: ProgressEvent);
}

impl ProgressReporter for () {
    fn report(&self, _event: ProgressEvent) {}
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for &R {
    fn report(&self, event: ProgressEvent) {
        (**self).report(event)
    }
}

impl ProgressReporter for UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        if let Err(err) = self.send(event) {
            tracing::debug!(event = ?err.0, "progress receiver dropped");
        }
    }
}

/// Reporter that logs every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: ProgressEvent) {
        let step = event.step;
        match event.kind {
            EventKind::Start => tracing::info!(%step, "step started"),
            EventKind::Success { signature } => tracing::info!(%step, %signature, "step confirmed"),
            EventKind::Warning { message } => tracing::warn!(%step, %message, "step warned"),
            EventKind::Error {
                message,
                last_signature,
            } => tracing::error!(%step, %message, ?last_signature, "step failed"),
        }
    }
}
