use solana_sdk::{pubkey::Pubkey, transaction::TransactionError};

/// SDK Error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error from [`pmsettle-solana-utils`].
    #[error("utils: {0}")]
    SolanaUtils(#[from] pmsettle_solana_utils::Error),
    /// Malformed server-issued instruction.
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    /// The oracle returned nothing usable.
    #[error("no attestation data: {0}")]
    NoAttestationData(String),
    /// The wallet cannot sign transactions.
    #[error("wallet does not support transaction signing")]
    WalletUnsupported,
    /// A signature slot is still empty after signing.
    #[error("incomplete signature: slot {index} ({signer}) is empty")]
    IncompleteSignature {
        /// Index of the empty slot.
        index: usize,
        /// The signer expected to fill the slot.
        signer: Pubkey,
    },
    /// The ledger rejected the transaction or it could not be confirmed.
    #[error("submission: {0}")]
    Submission(#[source] pmsettle_solana_utils::Error),
    /// Waiting for an external party took too long.
    #[error("timed out: {0}")]
    TimedOut(&'static str),
    /// Invalid state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Signer error.
    #[error("signer: {0}")]
    Signer(#[from] solana_sdk::signer::SignerError),
    /// Reqwest error.
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// Json error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Parse url error.
    #[error("parse url: {0}")]
    ParseUrl(#[from] url::ParseError),
    /// Config error.
    #[error("config: {0}")]
    Config(Box<figment::Error>),
}

/// Errors raised while decoding server-issued instructions.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Malformed base64 payload.
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Malformed base58 address.
    #[error("address `{address}`: {source}")]
    Address {
        /// The offending address.
        address: String,
        /// Parse error.
        source: solana_sdk::pubkey::ParsePubkeyError,
    },
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl ToString) -> Self {
        Self::InvalidArgument(msg.to_string())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl ToString) -> Self {
        Self::InvalidState(msg.to_string())
    }

    /// Create a no attestation data error.
    pub fn no_attestation_data(msg: impl ToString) -> Self {
        Self::NoAttestationData(msg.to_string())
    }

    /// Returns the structured [`TransactionError`] carried by this error, if any.
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            Self::Submission(err) | Self::SolanaUtils(err) => err.transaction_error(),
            _ => None,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(value: figment::Error) -> Self {
        Self::Config(Box::new(value))
    }
}
