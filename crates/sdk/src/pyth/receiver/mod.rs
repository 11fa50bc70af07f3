use solana_sdk::{instruction::Instruction, pubkey, pubkey::Pubkey, system_program};

use super::{accumulator::MerklePriceUpdate, build_instruction};

mod accounts;
mod instruction;

/// Pyth Solana Receiver Program Address.
pub const PYTH_RECEIVER_PROGRAM_ID: Pubkey = pubkey!("rec5EKMGg6MxZYaMdyBfgwp4d5rB9T1VQH5pJv5LtFJ");

/// Treasury account seed.
pub const TREASURY_SEED: &[u8] = b"treasury";

/// Config account seed.
pub const CONFIG_SEED: &[u8] = b"config";

/// Find PDA for treasury account.
pub fn find_treasury_pda(treasury_id: u8, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[TREASURY_SEED, &[treasury_id]], program_id)
}

/// Find PDA for config account.
pub fn find_config_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Builder of Pyth receiver instructions.
#[derive(Debug, Clone, Copy)]
pub struct PythReceiver {
    program_id: Pubkey,
    payer: Pubkey,
}

impl PythReceiver {
    /// Create a builder for the given program and payer.
    pub fn new(program_id: Pubkey, payer: Pubkey) -> Self {
        Self { program_id, payer }
    }

    /// Returns the program id.
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Post a price update into the fresh `price_update` account.
    ///
    /// `price_update` must sign the transaction.
    pub fn post_update(
        &self,
        price_update: &Pubkey,
        encoded_vaa: &Pubkey,
        update: &MerklePriceUpdate,
        treasury_id: u8,
    ) -> crate::Result<Instruction> {
        build_instruction(
            &self.program_id,
            &instruction::PostUpdate {
                merkle_price_update: update.clone(),
                treasury_id,
            },
            &accounts::PostUpdate {
                payer: self.payer,
                encoded_vaa: *encoded_vaa,
                config: find_config_pda(&self.program_id).0,
                treasury: find_treasury_pda(treasury_id, &self.program_id).0,
                price_update_account: *price_update,
                system_program: system_program::ID,
                write_authority: self.payer,
            },
        )
    }

    /// Close the price update account, returning its rent to the payer.
    pub fn reclaim_rent(&self, price_update: &Pubkey) -> crate::Result<Instruction> {
        build_instruction(
            &self.program_id,
            &instruction::ReclaimRent {},
            &accounts::ReclaimRent {
                payer: self.payer,
                price_update_account: *price_update,
            },
        )
    }
}
