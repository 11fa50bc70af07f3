/// Account patching.
pub mod patch;

use pyth_sdk::Identifier;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::{
    error::DecodeError,
    utils::{decode_base64, encode_base64},
};

/// Account entry of an [`InstructionSpec`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccountSpec {
    /// Base58 address.
    #[serde(alias = "pubkey")]
    pub address: String,
    /// Whether the account must sign.
    #[serde(alias = "isSigner")]
    pub is_signer: bool,
    /// Whether the account is writable.
    #[serde(alias = "isWritable")]
    pub is_writable: bool,
}

/// A server-issued, opaque description of a ledger instruction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InstructionSpec {
    /// Base58 program address.
    #[serde(alias = "programId", alias = "program_id")]
    pub program_address: String,
    /// Ordered account list.
    #[serde(alias = "keys")]
    pub accounts: Vec<AccountSpec>,
    /// Base64 encoded instruction data.
    #[serde(alias = "data", alias = "payload_bytes")]
    pub payload: String,
}

impl InstructionSpec {
    /// Decode into a native [`Instruction`].
    ///
    /// No semantic validation is performed.
    pub fn decode(&self) -> Result<Instruction, DecodeError> {
        let program_id = parse_address(&self.program_address)?;
        let accounts = self
            .accounts
            .iter()
            .map(|account| {
                let pubkey = parse_address(&account.address)?;
                Ok(AccountMeta {
                    pubkey,
                    is_signer: account.is_signer,
                    is_writable: account.is_writable,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;
        let data = decode_base64(&self.payload)?;
        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }

    /// Describe a native [`Instruction`].
    pub fn from_instruction(instruction: &Instruction) -> Self {
        Self {
            program_address: instruction.program_id.to_string(),
            accounts: instruction
                .accounts
                .iter()
                .map(|meta| AccountSpec {
                    address: meta.pubkey.to_string(),
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            payload: encode_base64(&instruction.data),
        }
    }
}

fn parse_address(address: &str) -> Result<Pubkey, DecodeError> {
    address.parse().map_err(|source| DecodeError::Address {
        address: address.to_string(),
        source,
    })
}

/// Instruction bundle returned by the server for a market action.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InstructionBundle {
    /// Whether the server accepted the request.
    pub ok: bool,
    /// Instructions to execute in one transaction.
    #[serde(default)]
    pub instructions: Vec<InstructionSpec>,
    /// The account slot to patch with the price update account.
    #[serde(default, alias = "priceUpdateIndex")]
    pub price_update_index: Option<usize>,
    /// Hex encoded Pyth feed id.
    #[serde(default, alias = "feedIdHex")]
    pub feed_id_hex: Option<String>,
    /// Resolution timestamp of the market (unix seconds).
    #[serde(default, alias = "endTs")]
    pub end_ts: Option<i64>,
    /// Market identifier.
    #[serde(default, alias = "marketId")]
    pub market_id: Option<String>,
    /// Error reported by the server.
    #[serde(default)]
    pub error: Option<String>,
}

/// Parameters required to settle a market, extracted from an [`InstructionBundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementParams {
    /// Feed to fetch.
    pub feed_id: Identifier,
    /// Publish time of the attestation.
    pub publish_time: i64,
    /// The account slot to patch.
    pub price_update_index: usize,
}

impl InstructionBundle {
    /// Parse from a JSON response body.
    pub fn from_json(body: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Returns an error if the server rejected the request.
    pub fn ensure_ok(&self) -> crate::Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(crate::Error::invalid_argument(
                self.error
                    .as_deref()
                    .unwrap_or("the server rejected the request"),
            ))
        }
    }

    /// The market address, if `market_id` is a base58 public key.
    pub fn market_address(&self) -> Option<Pubkey> {
        self.market_id.as_deref()?.parse().ok()
    }

    /// Decode all instructions.
    pub fn decode_instructions(&self) -> Result<Vec<Instruction>, DecodeError> {
        self.instructions
            .iter()
            .map(InstructionSpec::decode)
            .collect()
    }

    /// Extract the parameters required to settle the market.
    pub fn settlement_params(&self) -> crate::Result<SettlementParams> {
        self.ensure_ok()?;
        let feed_id_hex = self
            .feed_id_hex
            .as_deref()
            .ok_or_else(|| crate::Error::invalid_argument("missing `feed_id_hex`"))?;
        let publish_time = self
            .end_ts
            .ok_or_else(|| crate::Error::invalid_argument("missing `end_ts`"))?;
        let price_update_index = self
            .price_update_index
            .ok_or_else(|| crate::Error::invalid_argument("missing `price_update_index`"))?;
        Ok(SettlementParams {
            feed_id: parse_feed_id(feed_id_hex)?,
            publish_time,
            price_update_index,
        })
    }
}

/// Parse a hex encoded feed id, with or without the `0x` prefix.
pub fn parse_feed_id(feed_id_hex: &str) -> crate::Result<Identifier> {
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(feed_id_hex.trim_start_matches("0x"), &mut bytes)
        .map_err(|err| crate::Error::invalid_argument(format!("feed id `{feed_id_hex}`: {err}")))?;
    Ok(Identifier::new(bytes))
}
