//! Single-identity validator.

use crate::error::AuthError;
use crate::identity::Identity;
use crate::traits::CredentialValidator;

/// Admits exactly one configured identity.
#[derive(Debug, Clone)]
pub struct StaticAuth {
    identity: Identity,
}

impl StaticAuth {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl CredentialValidator for StaticAuth {
    /// Compares all 16 bytes regardless of where the first difference is.
    fn verify(&self, credential: &[u8; 16]) -> Result<(), AuthError> {
        let diff = self
            .identity
            .as_bytes()
            .iter()
            .zip(credential)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff == 0 {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}
