//! Wire format of an encrypted column encryption key.
//!
//! ```text
//! ┌─────────┬──────────┬────────────┬──────────────┬────────────┬───────────┐
//! │ Version │ Path len │ Cipher len │   Key path   │ Ciphertext │ Signature │
//! │ (0x01)  │ (u16 LE) │  (u16 LE)  │ (UTF-16LE,   │ (RSA-OAEP) │ (PKCS#1   │
//! │         │          │            │  lowercase)  │            │  v1.5)    │
//! └─────────┴──────────┴────────────┴──────────────┴────────────┴───────────┘
//! ```
//!
//! The signature covers SHA-256 of every byte before it. Ciphertext and
//! signature are each as long as the RSA modulus.

use sha2::{Digest, Sha256};

use crate::error::{CmkError, Operation};

/// Leading version byte.
pub const ENVELOPE_VERSION: u8 = 0x01;

const HEADER_LEN: usize = 5;

/// A parsed encrypted CEK, borrowing from its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// UTF-16LE key path as written by the wrapping client.
    pub key_path: &'a [u8],
    /// RSA-OAEP ciphertext of the CEK.
    pub ciphertext: &'a [u8],
    /// Signature over [`Envelope::signed`].
    pub signature: &'a [u8],
    /// Header, key path and ciphertext.
    pub signed: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Split an encrypted CEK into its parts.
    pub fn parse(data: &'a [u8], operation: Operation) -> Result<Self, CmkError> {
        if data.len() < HEADER_LEN {
            return Err(CmkError::message(
                operation,
                format!("Encrypted column encryption key is too short: {} bytes", data.len()),
            ));
        }
        if data[0] != ENVELOPE_VERSION {
            return Err(CmkError::message(
                operation,
                format!(
                    "Unsupported encrypted column encryption key version {:#04x}, expected {ENVELOPE_VERSION:#04x}",
                    data[0]
                ),
            ));
        }

        let path_len = usize::from(u16::from_le_bytes([data[1], data[2]]));
        let cipher_len = usize::from(u16::from_le_bytes([data[3], data[4]]));
        let signed_len = HEADER_LEN + path_len + cipher_len;
        if data.len() <= signed_len {
            return Err(CmkError::message(
                operation,
                "Encrypted column encryption key is truncated",
            ));
        }

        let (signed, signature) = data.split_at(signed_len);
        let key_path = &signed[HEADER_LEN..HEADER_LEN + path_len];
        let ciphertext = &signed[HEADER_LEN + path_len..];
        Ok(Self {
            key_path,
            ciphertext,
            signature,
            signed,
        })
    }

    /// Require ciphertext and signature to match an RSA modulus of `key_size` bytes.
    pub fn check_key_size(&self, key_size: usize, operation: Operation) -> Result<(), CmkError> {
        if self.ciphertext.len() != key_size {
            return Err(CmkError::message(
                operation,
                format!(
                    "Ciphertext length {} does not match the {key_size}-byte master key",
                    self.ciphertext.len()
                ),
            ));
        }
        if self.signature.len() != key_size {
            return Err(CmkError::message(
                operation,
                format!(
                    "Signature length {} does not match the {key_size}-byte master key",
                    self.signature.len()
                ),
            ));
        }
        Ok(())
    }

    /// SHA-256 of the signed bytes.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        sha256(self.signed)
    }

    /// The key path, decoded.
    #[must_use]
    pub fn key_path_lossy(&self) -> String {
        let units: Vec<u16> = self
            .key_path
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    }
}

/// Build the signed portion of an envelope.
///
/// The caller appends the signature over [`sha256`] of the result.
pub fn build_unsigned(key_path: &str, ciphertext: &[u8], operation: Operation) -> Result<Vec<u8>, CmkError> {
    let path: Vec<u8> = key_path
        .to_lowercase()
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    let path_len = u16::try_from(path.len())
        .map_err(|_| CmkError::message(operation, "Key path is too long to encode"))?;
    let cipher_len = u16::try_from(ciphertext.len())
        .map_err(|_| CmkError::message(operation, "Ciphertext is too long to encode"))?;

    let mut out = Vec::with_capacity(HEADER_LEN + path.len() + ciphertext.len() * 2);
    out.push(ENVELOPE_VERSION);
    out.extend_from_slice(&path_len.to_le_bytes());
    out.extend_from_slice(&cipher_len.to_le_bytes());
    out.extend_from_slice(&path);
    out.extend_from_slice(ciphertext);
    Ok(out)
}

/// SHA-256 digest.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(data));
    digest
}
