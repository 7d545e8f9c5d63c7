//! Credential validation for vless.
//!
//! The service is configured with a single identity, a UUID. Clients present
//! its 16 raw bytes in every request header and are admitted only on an exact
//! match.
//!
//! # Example
//!
//! ```
//! use vless_auth::{CredentialValidator, Identity, StaticAuth};
//!
//! let identity: Identity = "ffffffff-ffff-ffff-ffff-ffffffffffff".parse().unwrap();
//! let auth = StaticAuth::new(identity);
//! assert!(auth.verify(&[0xff; 16]).is_ok());
//! assert!(auth.verify(&[0x00; 16]).is_err());
//! ```

mod error;
mod identity;
mod memory;
mod traits;

pub use error::{AuthError, IdentityError};
pub use identity::Identity;
pub use memory::StaticAuth;
pub use traits::CredentialValidator;
