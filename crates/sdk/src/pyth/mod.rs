/// Hermes client.
pub mod hermes;

/// Accumulator update decoding.
pub mod accumulator;

/// Wormhole core bridge instructions.
pub mod wormhole;

/// Pyth receiver instructions.
pub mod receiver;

use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

pub use self::hermes::{EncodingType, Hermes};
pub use pyth_sdk::Identifier;

/// Raw accumulator update bytes for one feed, valid as of `publish_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    feed_id: Identifier,
    publish_time: i64,
    data: Vec<Vec<u8>>,
}

impl Attestation {
    /// Create a new attestation.
    pub fn new(feed_id: Identifier, publish_time: i64, data: Vec<Vec<u8>>) -> Self {
        Self {
            feed_id,
            publish_time,
            data,
        }
    }

    /// The requested feed.
    pub fn feed_id(&self) -> &Identifier {
        &self.feed_id
    }

    /// The requested publish time.
    pub fn publish_time(&self) -> i64 {
        self.publish_time
    }

    /// Raw accumulator update datas.
    pub fn data(&self) -> &[Vec<u8>] {
        &self.data
    }
}

/// Source of signed price attestations.
#[allow(async_fn_in_trait)]
pub trait PullOracle {
    /// Fetch the attestation of `feed_id` as of `publish_time`.
    ///
    /// Implementations perform a single request without retrying.
    async fn fetch_attestation(
        &self,
        feed_id: &Identifier,
        publish_time: i64,
    ) -> crate::Result<Attestation>;
}

impl<T: PullOracle> PullOracle for &T {
    async fn fetch_attestation(
        &self,
        feed_id: &Identifier,
        publish_time: i64,
    ) -> crate::Result<Attestation> {
        (**self).fetch_attestation(feed_id, publish_time).await
    }
}

trait ToAccountMetas {
    fn to_account_metas(&self) -> Vec<AccountMeta>;
}

trait InstructionData: BorshSerialize {
    const DISCRIMINATOR: [u8; 8];

    fn data(&self) -> crate::Result<Vec<u8>> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

fn build_instruction(
    program_id: &Pubkey,
    args: &impl InstructionData,
    accounts: &impl ToAccountMetas,
) -> crate::Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(),
        data: args.data()?,
    })
}
