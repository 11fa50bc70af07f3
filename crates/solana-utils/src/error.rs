use solana_sdk::{signature::Signature, transaction::TransactionError};

/// Error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parse url error.
    #[error("parse url: {0}")]
    ParseUrl(#[from] url::ParseError),
    /// Parse cluster error.
    #[error("parse cluster: {0}")]
    ParseCluster(&'static str),
    /// Compile message error.
    #[error("compile message: {0}")]
    CompileMessage(#[from] solana_sdk::message::CompileError),
    /// Client error.
    #[cfg(feature = "solana-client")]
    #[error("client: {0}")]
    Client(#[from] Box<solana_client::client_error::ClientError>),
    /// Signer error.
    #[error("signer: {0}")]
    Signer(#[from] solana_sdk::signer::SignerError),
    /// The transaction was processed but failed.
    #[error("transaction {signature} failed: {error}")]
    TransactionFailed {
        /// Signature of the failed transaction.
        signature: Signature,
        /// Transaction error.
        error: TransactionError,
    },
    /// Confirmation was not observed in time.
    #[error("unable to confirm transaction {signature}: {reason}")]
    Unconfirmed {
        /// Signature of the submitted transaction.
        signature: Signature,
        /// Why confirmation stopped.
        reason: &'static str,
    },
}

impl Error {
    /// Returns the structured [`TransactionError`] carried by this error, if any.
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            Self::TransactionFailed { error, .. } => Some(error),
            #[cfg(feature = "solana-client")]
            Self::Client(err) => {
                use solana_client::{
                    client_error::ClientErrorKind,
                    rpc_request::{RpcError, RpcResponseErrorData},
                };

                match err.kind() {
                    ClientErrorKind::TransactionError(err) => Some(err),
                    ClientErrorKind::RpcError(RpcError::RpcResponseError {
                        data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
                        ..
                    }) => result.err.as_ref(),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(feature = "solana-client")]
impl From<solana_client::client_error::ClientError> for Error {
    fn from(value: solana_client::client_error::ClientError) -> Self {
        Self::Client(Box::new(value))
    }
}
