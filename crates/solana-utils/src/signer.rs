use std::fmt;

use dyn_clone::{clone_trait_object, DynClone};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, SignerError},
};

/// Clonable Signer.
pub trait CloneableSigner: Signer + DynClone + Send + Sync {}

impl<T: Signer + Clone + Send + Sync> CloneableSigner for T {}

clone_trait_object!(CloneableSigner);

/// Boxed Clonable Signer.
///
/// Used to carry locally held (ephemeral) keypairs together with the instructions
/// that require them.
#[derive(Clone)]
pub struct BoxClonableSigner<'a>(Box<dyn CloneableSigner + 'a>);

impl<'a> BoxClonableSigner<'a> {
    /// Create a new [`BoxClonableSigner`].
    pub fn new(signer: impl Signer + Clone + Send + Sync + 'a) -> Self {
        Self(Box::new(signer))
    }
}

impl fmt::Debug for BoxClonableSigner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoxClonableSigner")
            .field(&self.0.pubkey())
            .finish()
    }
}

impl Signer for BoxClonableSigner<'_> {
    fn pubkey(&self) -> Pubkey {
        self.0.pubkey()
    }

    fn try_pubkey(&self) -> Result<Pubkey, SignerError> {
        self.0.try_pubkey()
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        self.0.sign_message(message)
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.0.try_sign_message(message)
    }

    fn is_interactive(&self) -> bool {
        self.0.is_interactive()
    }
}
