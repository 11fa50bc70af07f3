use std::collections::HashSet;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_program, sysvar};

/// Addresses that can never sign.
pub const RESERVED_NON_SIGNERS: [Pubkey; 2] = [system_program::ID, sysvar::clock::ID];

/// Index-based replacement of one account of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOverride {
    /// Slot to replace.
    pub account_index: usize,
    /// The new address of the slot.
    pub replacement_address: Pubkey,
    /// Clear the signer flag of the replaced slot.
    pub force_signer_false: bool,
}

/// Returns whether `address` must be treated as a non-signer.
pub fn is_forced_non_signer(address: &Pubkey, forced: &HashSet<Pubkey>) -> bool {
    RESERVED_NON_SIGNERS.contains(address) || forced.contains(address)
}

/// Returns a patched copy of `instruction`.
///
/// Only the overridden slot and the signer flags of forced non-signers may change.
/// An out-of-range `account_index` replaces nothing.
pub fn patch_instruction(
    instruction: &Instruction,
    patch: Option<&PatchOverride>,
    forced: &HashSet<Pubkey>,
) -> Instruction {
    let accounts = instruction
        .accounts
        .iter()
        .enumerate()
        .map(|(idx, meta)| {
            let mut meta = meta.clone();
            if let Some(patch) = patch.filter(|patch| patch.account_index == idx) {
                meta.pubkey = patch.replacement_address;
                if patch.force_signer_false {
                    meta.is_signer = false;
                }
            }
            if is_forced_non_signer(&meta.pubkey, forced) {
                meta.is_signer = false;
            }
            meta
        })
        .collect();
    Instruction {
        program_id: instruction.program_id,
        accounts,
        data: instruction.data.clone(),
    }
}
