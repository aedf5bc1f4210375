//! Timing-safe credential verification.
//!
//! # Responsibilities
//! - Hold one configured `identity:secret` pair, padded once at startup
//! - Compare presented credentials without leaking where they differ
//!
//! # Design Decisions
//! - Padding happens at construction so its cost never depends on the
//!   real secret's length
//! - Presented values are padded with the same sentinel and compared
//!   with `subtle`, which does not short-circuit
//! - Presented values longer than the padded reference are compared at
//!   their own length; the length mismatch is rejected without a
//!   byte-by-byte pass (accepted residual leak)

use std::fmt;

use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

/// Upper bound for `identity:secret`, and the padded length of every reference.
pub const MAX_SECRET_LEN: usize = 128;

/// Byte used to pad both sides before comparing.
pub const PAD_BYTE: u8 = 0x00;

/// Separator between identity and secret.
pub const SEPARATOR: u8 = b':';

/// Errors raised while building a verifier from configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential identity must not be empty")]
    EmptyIdentity,

    #[error("credential identity must not contain ':'")]
    SeparatorInIdentity,

    #[error("credential contains the padding byte")]
    PadByteInCredential,

    #[error("credential is {len} bytes, maximum is {max}")]
    SecretTooLong { len: usize, max: usize },
}

/// Verifies one presented credential against one configured secret.
pub struct CredentialVerifier {
    padded_reference: Zeroizing<Vec<u8>>,
}

impl CredentialVerifier {
    /// Build a verifier for `identity:secret`.
    pub fn new(identity: &str, secret: &str) -> Result<Self, AuthError> {
        if identity.is_empty() {
            return Err(AuthError::EmptyIdentity);
        }
        if identity.as_bytes().contains(&SEPARATOR) {
            return Err(AuthError::SeparatorInIdentity);
        }

        let mut reference = Zeroizing::new(Vec::with_capacity(MAX_SECRET_LEN));
        reference.extend_from_slice(identity.as_bytes());
        reference.push(SEPARATOR);
        reference.extend_from_slice(secret.as_bytes());

        if reference.contains(&PAD_BYTE) {
            return Err(AuthError::PadByteInCredential);
        }
        if reference.len() > MAX_SECRET_LEN {
            return Err(AuthError::SecretTooLong {
                len: reference.len(),
                max: MAX_SECRET_LEN,
            });
        }

        reference.resize(MAX_SECRET_LEN, PAD_BYTE);
        Ok(Self {
            padded_reference: reference,
        })
    }

    /// Returns true iff `presented` equals the configured `identity:secret`.
    pub fn verify(&self, presented: &[u8]) -> bool {
        let target_len = presented.len().max(self.padded_reference.len());
        let mut padded = Zeroizing::new(Vec::with_capacity(target_len));
        padded.extend_from_slice(presented);
        padded.resize(target_len, PAD_BYTE);

        padded.as_slice().ct_eq(self.padded_reference.as_slice()).into()
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("padded_reference", &"[REDACTED]")
            .finish()
    }
}
