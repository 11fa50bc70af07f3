use std::{borrow::Borrow, collections::HashSet};

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

fn compact_len(len: usize) -> usize {
    match len {
        0..=127 => 1,
        128..=16383 => 2,
        _ => 3,
    }
}

/// Estimates the serialized size of a v0 transaction paid by `payer`.
///
/// No address lookup table is used, so every account is a static key.
/// See [Solana Transactions](https://solana.com/docs/core/transactions) for the layout.
pub fn transaction_size(payer: &Pubkey, ixs: &[impl Borrow<Instruction>]) -> usize {
    let mut accounts = HashSet::from([*payer]);
    let mut signers = HashSet::from([*payer]);
    let mut ixs_size = 0;

    for ix in ixs {
        let ix = ix.borrow();
        accounts.insert(ix.program_id);
        for meta in ix.accounts.iter() {
            accounts.insert(meta.pubkey);
            if meta.is_signer {
                signers.insert(meta.pubkey);
            }
        }
        // program index, account indexes, data
        ixs_size += 1
            + compact_len(ix.accounts.len())
            + ix.accounts.len()
            + compact_len(ix.data.len())
            + ix.data.len();
    }

    let signatures = compact_len(signers.len()) + signers.len() * 64;
    // version prefix, header, static keys, blockhash, instructions, lookups
    let message = 1
        + 3
        + compact_len(accounts.len())
        + accounts.len() * 32
        + 32
        + compact_len(ixs.len())
        + ixs_size
        + compact_len(0);
    signatures + message
}
