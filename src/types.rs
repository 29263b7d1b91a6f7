//! Principal identities used throughout the staking ledger.
//!
//! Every party the engine deals with (stakers, validators, the
//! administrator, escrows, the custody vault, the reward pool) is a 32-byte
//! opaque principal supplied by the hosting environment. The engine never
//! derives or verifies these bytes; authentication happens upstream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque 32-byte principal (account id supplied by the host)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

/// Escrows are principals too: an escrow authorizes its privileged calls
/// (`close`, `distribute`) by calling as itself.
pub type EscrowId = Address;

impl Address {
    /// Create from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    /// The zero address. Never a valid staker or escrow identity.
    pub fn zero() -> Self {
        Address([0u8; 32])
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to base58 string
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Parse from a base58 string
    pub fn from_base58(s: &str) -> Result<Self, AddressParseError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressParseError::InvalidEncoding)?;
        if bytes.len() != 32 {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

/// Address parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid base58 encoding")]
    InvalidEncoding,

    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize),
}
