//! Configured service identity.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::IdentityError;

/// The 16-byte identity clients must present.
///
/// Parsed once at startup from a UUID-style string; `-` separators are
/// ignored wherever they appear.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Identity([u8; 16]);

impl Identity {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// A fresh random (v4) identity.
    pub fn generate() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    /// Parse `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` (or the bare 32 hex digits).
    pub fn parse(text: &str) -> Result<Self, IdentityError> {
        let digits: String = text.trim().chars().filter(|c| *c != '-').collect();
        if digits.len() != 32 {
            return Err(IdentityError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(&digits, &mut bytes)?;
        Ok(Self(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical hyphenated lowercase form, as used in share links.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from_bytes(self.0).hyphenated(), f)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}
