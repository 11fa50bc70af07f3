use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};

use super::build_instruction;

mod accounts;
mod instruction;

/// Wormhole Core Bridge Program Address.
pub const WORMHOLE_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    241, 11, 180, 229, 13, 86, 253, 161, 61, 254, 31, 50, 155, 141, 57, 61, 210, 74, 1, 69, 145,
    225, 131, 22, 151, 148, 13, 124, 52, 163, 141, 221,
]);

/// The start offset of the VAA bytes.
pub const VAA_START: usize = 46;

/// Where a VAA too large for one transaction is split.
pub const VAA_SPLIT_INDEX: usize = 755;

/// Guardian set account seed.
pub const GUARDIAN_SET_SEED: &[u8] = b"GuardianSet";

/// Find PDA for guardian set account.
pub fn find_guardian_set_pda(guardian_set_index: u32, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[GUARDIAN_SET_SEED, &guardian_set_index.to_be_bytes()],
        program_id,
    )
}

/// Space of an encoded VAA account holding `vaa_len` bytes.
pub fn encoded_vaa_space(vaa_len: usize) -> usize {
    vaa_len + VAA_START
}

/// Builder of Wormhole core bridge instructions.
#[derive(Debug, Clone, Copy)]
pub struct Wormhole {
    program_id: Pubkey,
    write_authority: Pubkey,
}

impl Wormhole {
    /// Create a builder for the given program and write authority (the payer).
    pub fn new(program_id: Pubkey, write_authority: Pubkey) -> Self {
        Self {
            program_id,
            write_authority,
        }
    }

    /// Returns the program id.
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Create and initialize encoded vaa account.
    ///
    /// `encoded_vaa` must sign the transaction.
    pub fn create_encoded_vaa(
        &self,
        encoded_vaa: &Pubkey,
        lamports: u64,
        vaa_len: usize,
    ) -> crate::Result<[Instruction; 2]> {
        let space = encoded_vaa_space(vaa_len);
        let create = system_instruction::create_account(
            &self.write_authority,
            encoded_vaa,
            lamports,
            space as u64,
            &self.program_id,
        );
        let init = build_instruction(
            &self.program_id,
            &instruction::InitEncodedVaa {},
            &accounts::InitEncodedVaa {
                write_authority: self.write_authority,
                encoded_vaa: *encoded_vaa,
            },
        )?;
        Ok([create, init])
    }

    /// Write to encoded vaa account.
    pub fn write_encoded_vaa(
        &self,
        draft_vaa: &Pubkey,
        index: u32,
        data: &[u8],
    ) -> crate::Result<Instruction> {
        build_instruction(
            &self.program_id,
            &instruction::WriteEncodedVaa {
                index,
                data: data.to_owned(),
            },
            &accounts::WriteEncodedVaa {
                write_authority: self.write_authority,
                draft_vaa: *draft_vaa,
            },
        )
    }

    /// Verify the encoded vaa against its guardian set.
    pub fn verify_encoded_vaa_v1(
        &self,
        draft_vaa: &Pubkey,
        guardian_set_index: u32,
    ) -> crate::Result<Instruction> {
        build_instruction(
            &self.program_id,
            &instruction::VerifyEncodedVaaV1 {},
            &accounts::VerifyEncodedVaaV1 {
                write_authority: self.write_authority,
                draft_vaa: *draft_vaa,
                guardian_set: find_guardian_set_pda(guardian_set_index, &self.program_id).0,
            },
        )
    }

    /// Close the encoded vaa account, returning its rent to the write authority.
    pub fn close_encoded_vaa(&self, encoded_vaa: &Pubkey) -> crate::Result<Instruction> {
        build_instruction(
            &self.program_id,
            &instruction::CloseEncodedVaa {},
            &accounts::CloseEncodedVaa {
                write_authority: self.write_authority,
                encoded_vaa: *encoded_vaa,
            },
        )
    }
}
