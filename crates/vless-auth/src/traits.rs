//! Credential validator trait.

use std::sync::Arc;

use crate::error::AuthError;

/// Checks the credential carried in a request header.
///
/// Implementations must be thread-safe (`Send + Sync`); one validator is
/// shared by every session.
pub trait CredentialValidator: Send + Sync {
    /// Verify the 16-byte credential of a request.
    fn verify(&self, credential: &[u8; 16]) -> Result<(), AuthError>;
}

impl<V: CredentialValidator + ?Sized> CredentialValidator for Arc<V> {
    #[inline]
    fn verify(&self, credential: &[u8; 16]) -> Result<(), AuthError> {
        (**self).verify(credential)
    }
}

impl<V: CredentialValidator + ?Sized> CredentialValidator for Box<V> {
    #[inline]
    fn verify(&self, credential: &[u8; 16]) -> Result<(), AuthError> {
        (**self).verify(credential)
    }
}
