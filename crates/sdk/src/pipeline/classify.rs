use solana_sdk::transaction::TransactionError;

use crate::Error;

/// Severity of a step failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the run.
    Fatal,
    /// The effect of the step already took place; warn and continue.
    Soft,
}

/// Decides whether a step failure aborts the run.
pub trait FailureClassifier {
    /// Classify the error.
    fn classify(&self, error: &Error) -> Severity;
}

impl<F: Fn(&Error) -> Severity> FailureClassifier for F {
    fn classify(&self, error: &Error) -> Severity {
        (self)(error)
    }
}

/// Treats "already processed" submission failures as soft.
///
/// Checks the structured [`TransactionError::AlreadyProcessed`] first, then falls
/// back to matching the error message, which RPC nodes word inconsistently.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlreadyProcessed;

impl AlreadyProcessed {
    const PATTERNS: [&'static str; 2] = ["alreadyprocessed", "alreadybeenprocessed"];
}

impl FailureClassifier for AlreadyProcessed {
    fn classify(&self, error: &Error) -> Severity {
        let Error::Submission(inner) = error else {
            return Severity::Fatal;
        };
        if matches!(
            inner.transaction_error(),
            Some(TransactionError::AlreadyProcessed)
        ) || matches_error_pattern(&inner.to_string(), &Self::PATTERNS)
        {
            Severity::Soft
        } else {
            Severity::Fatal
        }
    }
}

/// Returns whether the normalized `message` contains any of the normalized `patterns`.
///
/// Normalization lowercases and removes whitespace.
pub fn matches_error_pattern(message: &str, patterns: &[&str]) -> bool {
    let normalized = normalize(message);
    patterns
        .iter()
        .any(|pattern| normalized.contains(&normalize(pattern)))
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
