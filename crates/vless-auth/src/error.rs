//! Authentication error types.

/// Authentication error.
///
/// Deliberately carries no detail: callers turn every failure into the same
/// silent rejection.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Presented credential does not match the configured identity.
    #[error("invalid credential")]
    Invalid,
}

/// Error parsing a textual identity.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity must be 32 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("identity is not hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
