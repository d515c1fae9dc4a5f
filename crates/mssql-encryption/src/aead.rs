//! AEAD_AES_256_CBC_HMAC_SHA256 cell encryption.
//!
//! Encrypt-then-MAC over AES-256-CBC with PKCS#5 padding, authenticated with
//! HMAC-SHA256, using the sub-keys from [`CellKey`].
//!
//! ## Ciphertext Format
//!
//! ```text
//! ┌──────────┬────────────┬────────────┬─────────────────────────┐
//! │ Version  │    Tag     │     IV     │   AES-256-CBC Cipher    │
//! │ (1 byte) │ (32 bytes) │ (16 bytes) │   (variable, min 16)    │
//! └──────────┴────────────┴────────────┴─────────────────────────┘
//! ```
//!
//! The tag is `HMAC-SHA256(mac_key, version || iv || cipher || 0x01)`, the
//! trailing byte being the length of the version field. The smallest valid
//! ciphertext (empty plaintext) is 65 bytes.
//!
//! Deterministic encryption derives the IV as the first 16 bytes of
//! `HMAC-SHA256(iv_key, plaintext)`, so equal plaintexts produce equal
//! ciphertexts. Randomized encryption draws the IV from the OS RNG.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::Mac;
use rand::RngCore;
use tds_protocol::EncryptionType;

use crate::error::{CryptoError, Error};
use crate::keys::{CellKey, KEY_SIZE, hmac_sha256};

/// Name of the only supported cell encryption algorithm.
pub const ALGORITHM_NAME: &str = tds_protocol::ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256_NAME;

/// Version byte leading every ciphertext.
pub const ALGORITHM_VERSION: u8 = 0x01;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Authentication tag size in bytes.
pub const TAG_SIZE: usize = 32;

/// IV size in bytes.
pub const IV_SIZE: usize = 16;

/// Length of an encrypted empty value: version, tag, IV and one padding block.
pub const MIN_CIPHERTEXT_LEN: usize = 1 + TAG_SIZE + IV_SIZE + BLOCK_SIZE;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of `len` plaintext bytes after PKCS#5 padding.
///
/// Block-aligned input (including empty input) gains a whole extra block.
#[must_use]
pub const fn padded_len(len: usize) -> usize {
    (len / BLOCK_SIZE + 1) * BLOCK_SIZE
}

/// Length of the ciphertext for `len` plaintext bytes.
#[must_use]
pub const fn ciphertext_len(len: usize) -> usize {
    1 + TAG_SIZE + IV_SIZE + padded_len(len)
}

/// Cell encryptor bound to one column encryption key and encryption type.
#[derive(Debug, Clone)]
pub struct AeadCodec {
    key: CellKey,
    encryption_type: EncryptionType,
    version: u8,
}

impl AeadCodec {
    /// Create a codec for deterministic or randomized encryption.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedEncryptionType`] for [`EncryptionType::Plaintext`].
    pub fn new(key: CellKey, encryption_type: EncryptionType) -> Result<Self, Error> {
        if encryption_type == EncryptionType::Plaintext {
            return Err(Error::UnsupportedEncryptionType(encryption_type.name()));
        }
        Ok(Self {
            key,
            encryption_type,
            version: ALGORITHM_VERSION,
        })
    }

    /// Derive the sub-keys from `root_key` and create a codec.
    pub fn from_root_key(root_key: &[u8], encryption_type: EncryptionType) -> Result<Self, Error> {
        Self::new(CellKey::derive(root_key)?, encryption_type)
    }

    /// Override the algorithm version byte.
    #[must_use]
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// The encryption type this codec applies.
    #[must_use]
    pub fn encryption_type(&self) -> EncryptionType {
        self.encryption_type
    }

    /// Encrypt `plaintext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv = self.iv_for(plaintext)?;

        let cipher = Aes256CbcEnc::new_from_slices(self.key.encryption_key(), &iv).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: self.key.encryption_key().len(),
            }
        })?;
        let body = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let tag = self.tag(&iv, &body)?;

        let mut out = Vec::with_capacity(1 + TAG_SIZE + IV_SIZE + body.len());
        out.push(self.version);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&iv);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Authenticate and decrypt `ciphertext`.
    ///
    /// Length, version and tag are all checked before any decryption.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < MIN_CIPHERTEXT_LEN {
            return Err(CryptoError::CiphertextTooShort {
                actual: ciphertext.len(),
                minimum: MIN_CIPHERTEXT_LEN,
            });
        }
        if ciphertext[0] != self.version {
            return Err(CryptoError::InvalidVersion {
                expected: self.version,
                actual: ciphertext[0],
            });
        }

        let (tag, rest) = ciphertext[1..].split_at(TAG_SIZE);
        let (iv, body) = rest.split_at(IV_SIZE);
        if body.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::Padding);
        }

        let mut mac = hmac_sha256(self.key.mac_key())?;
        feed_tag_input(&mut mac, self.version, iv, body);
        mac.verify_slice(tag)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        let cipher = Aes256CbcDec::new_from_slices(self.key.encryption_key(), iv)
            .map_err(|_| CryptoError::Padding)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| CryptoError::Padding)
    }

    fn iv_for(&self, plaintext: &[u8]) -> Result<[u8; IV_SIZE], CryptoError> {
        let mut iv = [0u8; IV_SIZE];
        if self.encryption_type.is_deterministic() {
            let mut mac = hmac_sha256(self.key.iv_key())?;
            mac.update(plaintext);
            iv.copy_from_slice(&mac.finalize().into_bytes()[..IV_SIZE]);
        } else {
            rand::rngs::OsRng.fill_bytes(&mut iv);
        }
        Ok(iv)
    }

    fn tag(&self, iv: &[u8], body: &[u8]) -> Result<[u8; TAG_SIZE], CryptoError> {
        let mut mac = hmac_sha256(self.key.mac_key())?;
        feed_tag_input(&mut mac, self.version, iv, body);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }
}

fn feed_tag_input(mac: &mut impl Mac, version: u8, iv: &[u8], body: &[u8]) {
    mac.update(&[version]);
    mac.update(iv);
    mac.update(body);
    mac.update(&[1]);
}
