//! Sub-key derivation for AEAD_AES_256_CBC_HMAC_SHA256.
//!
//! A 256-bit column encryption key is never used directly. Three sub-keys
//! are derived from it with HMAC-SHA256, each keyed by the root key over a
//! fixed UTF-16LE label:
//!
//! ```text
//! enc_key = HMAC-SHA256(root, "Microsoft SQL Server cell encryption key with ...")
//! mac_key = HMAC-SHA256(root, "Microsoft SQL Server cell MAC key with ...")
//! iv_key  = HMAC-SHA256(root, "Microsoft SQL Server cell IV key with ...")
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Size of the root key and of each derived key, in bytes.
pub const KEY_SIZE: usize = 32;

const ALGORITHM_SUFFIX: &str =
    " with encryption algorithm:AEAD_AES_256_CBC_HMAC_SHA256 and key length:256";

type HmacSha256 = Hmac<Sha256>;

/// Which derived key a label produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// AES-256-CBC key.
    Encryption,
    /// HMAC-SHA256 authentication key.
    Mac,
    /// Deterministic IV key.
    Iv,
}

impl KeyPurpose {
    /// The derivation label, before UTF-16LE encoding.
    #[must_use]
    pub fn label(self) -> String {
        let head = match self {
            Self::Encryption => "Microsoft SQL Server cell encryption key",
            Self::Mac => "Microsoft SQL Server cell MAC key",
            Self::Iv => "Microsoft SQL Server cell IV key",
        };
        format!("{head}{ALGORITHM_SUFFIX}")
    }
}

/// A column encryption key and the three keys derived from it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CellKey {
    root_key: [u8; KEY_SIZE],
    enc_key: [u8; KEY_SIZE],
    mac_key: [u8; KEY_SIZE],
    iv_key: [u8; KEY_SIZE],
}

impl CellKey {
    /// Derive the sub-keys from a 32-byte root key.
    pub fn derive(root_key: &[u8]) -> Result<Self, CryptoError> {
        let root: [u8; KEY_SIZE] = root_key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: root_key.len(),
        })?;

        Ok(Self {
            enc_key: derive_key(&root, KeyPurpose::Encryption)?,
            mac_key: derive_key(&root, KeyPurpose::Mac)?,
            iv_key: derive_key(&root, KeyPurpose::Iv)?,
            root_key: root,
        })
    }

    /// The column encryption key itself.
    #[must_use]
    pub fn root_key(&self) -> &[u8; KEY_SIZE] {
        &self.root_key
    }

    /// AES-256 key.
    #[must_use]
    pub fn encryption_key(&self) -> &[u8; KEY_SIZE] {
        &self.enc_key
    }

    /// HMAC key for the authentication tag.
    #[must_use]
    pub fn mac_key(&self) -> &[u8; KEY_SIZE] {
        &self.mac_key
    }

    /// HMAC key for deterministic IVs.
    #[must_use]
    pub fn iv_key(&self) -> &[u8; KEY_SIZE] {
        &self.iv_key
    }
}

impl std::fmt::Debug for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellKey").finish_non_exhaustive()
    }
}

fn derive_key(root: &[u8; KEY_SIZE], purpose: KeyPurpose) -> Result<[u8; KEY_SIZE], CryptoError> {
    let label: Vec<u8> = purpose
        .label()
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    let mut mac = hmac_sha256(root)?;
    mac.update(&label);

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

/// HMAC-SHA256 keyed with `key`.
pub(crate) fn hmac_sha256(key: &[u8]) -> Result<HmacSha256, CryptoError> {
    <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_SIZE,
        actual: key.len(),
    })
}
