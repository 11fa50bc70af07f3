use std::{collections::BTreeMap, ops::Deref};

use smallvec::SmallVec;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, SignerError},
    transaction::VersionedTransaction,
};

use crate::{compute_budget::ComputeBudget, signer::BoxClonableSigner};

const ATOMIC_SIZE: usize = 4;

/// A group of instructions that are expected to be executed in the same transaction.
///
/// The payer signs externally; keypairs created for the group (ephemeral accounts)
/// are owned by it and sign through [`AtomicGroup::sign_with_owned_signers`].
#[derive(Debug, Clone)]
pub struct AtomicGroup {
    payer: Pubkey,
    owned_signers: BTreeMap<Pubkey, BoxClonableSigner<'static>>,
    instructions: SmallVec<[Instruction; ATOMIC_SIZE]>,
    compute_budget: ComputeBudget,
}

impl AtomicGroup {
    /// Create from an iterator of instructions.
    pub fn with_instructions(
        payer: &Pubkey,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Self {
        Self {
            payer: *payer,
            owned_signers: Default::default(),
            instructions: SmallVec::from_iter(instructions),
            compute_budget: Default::default(),
        }
    }

    /// Create a new empty group.
    pub fn new(payer: &Pubkey) -> Self {
        Self::with_instructions(payer, None)
    }

    /// Add an owned signer.
    pub fn add_owned_signer(
        &mut self,
        signer: impl Signer + Clone + Send + Sync + 'static,
    ) -> &mut Self {
        self.owned_signers
            .insert(signer.pubkey(), BoxClonableSigner::new(signer));
        self
    }

    /// Get mutable reference to the compute budget.
    pub fn compute_budget_mut(&mut self) -> &mut ComputeBudget {
        &mut self.compute_budget
    }

    /// Returns the pubkey of the payer.
    pub fn payer(&self) -> &Pubkey {
        &self.payer
    }

    /// Returns the pubkeys of the owned signers.
    pub fn owned_signers(&self) -> impl Iterator<Item = &Pubkey> + '_ {
        self.owned_signers.keys()
    }

    /// Returns whether this group carries owned signers.
    pub fn has_owned_signers(&self) -> bool {
        !self.owned_signers.is_empty()
    }

    /// Returns all instructions of the transaction, compute budget first.
    pub fn transaction_instructions(&self) -> Vec<Instruction> {
        self.compute_budget
            .compute_budget_instructions()
            .into_iter()
            .chain(self.instructions.iter().cloned())
            .collect()
    }

    /// Estimates the serialized size of the transaction built from this group.
    pub fn transaction_size(&self) -> usize {
        crate::utils::transaction_size(&self.payer, &self.transaction_instructions())
    }

    /// Create an unsigned v0 transaction, with every signature slot left empty.
    pub fn unsigned_transaction(
        &self,
        recent_blockhash: Hash,
    ) -> crate::Result<VersionedTransaction> {
        let message = v0::Message::try_compile(
            &self.payer,
            &self.transaction_instructions(),
            &[],
            recent_blockhash,
        )?;
        let num_required = usize::from(message.header.num_required_signatures);
        Ok(VersionedTransaction {
            signatures: vec![Signature::default(); num_required],
            message: VersionedMessage::V0(message),
        })
    }

    /// Fill the signature slots of the owned signers in the given transaction.
    ///
    /// Slots belonging to other signers are left untouched.
    pub fn sign_with_owned_signers(
        &self,
        transaction: &mut VersionedTransaction,
    ) -> crate::Result<()> {
        if self.owned_signers.is_empty() {
            return Ok(());
        }
        let num_required = usize::from(transaction.message.header().num_required_signatures);
        if transaction.signatures.len() < num_required {
            transaction
                .signatures
                .resize(num_required, Signature::default());
        }
        let message_data = transaction.message.serialize();
        let keys = transaction.message.static_account_keys();
        for (pubkey, signer) in self.owned_signers.iter() {
            let slot = keys
                .iter()
                .take(num_required)
                .position(|key| key == pubkey)
                .and_then(|index| transaction.signatures.get_mut(index))
                .ok_or(SignerError::KeypairPubkeyMismatch)?;
            *slot = signer.try_sign_message(&message_data)?;
        }
        Ok(())
    }
}

impl Extend<Instruction> for AtomicGroup {
    fn extend<T: IntoIterator<Item = Instruction>>(&mut self, iter: T) {
        self.instructions.extend(iter);
    }
}

impl Deref for AtomicGroup {
    type Target = [Instruction];

    fn deref(&self) -> &Self::Target {
        self.instructions.deref()
    }
}
