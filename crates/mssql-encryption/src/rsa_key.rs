//! RSA column master keys held locally.
//!
//! Wrapping follows the `RSA_OAEP` key encryption algorithm: OAEP with SHA-1
//! for the CEK, and a PKCS#1 v1.5 SHA-256 signature over the envelope (see
//! [`crate::envelope`]).

use std::path::Path;

use rsa::{
    Oaep, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey, pkcs1::DecodeRsaPrivateKey,
    pkcs8::DecodePrivateKey, traits::PublicKeyParts,
};
use sha1::Sha1;
use sha2::Sha256;
use thiserror::Error;

use crate::envelope::{Envelope, build_unsigned, sha256};
use crate::error::{CmkError, Operation};

/// Failure to load an RSA private key.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    /// The key file could not be read.
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    /// PEM or DER contents are not an RSA private key.
    #[error("failed to parse RSA private key: {0}")]
    Parse(String),

    /// PKCS#12 container could not be opened.
    #[error("failed to open PKCS#12 container: {0}")]
    Pkcs12(String),

    /// PKCS#12 container holds no private key.
    #[error("PKCS#12 container has no private key")]
    NoPrivateKey,
}

/// An RSA private key used as a column master key.
pub struct RsaMasterKey {
    private_key: RsaPrivateKey,
}

impl RsaMasterKey {
    /// Wrap an existing private key.
    #[must_use]
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self { private_key }
    }

    /// Parse a PEM private key, PKCS#8 or PKCS#1.
    pub fn from_pem(pem: &str) -> Result<Self, KeyLoadError> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map(Self::new)
            .map_err(|e| KeyLoadError::Parse(e.to_string()))
    }

    /// Parse a DER private key, PKCS#8 or PKCS#1.
    pub fn from_der(der: &[u8]) -> Result<Self, KeyLoadError> {
        RsaPrivateKey::from_pkcs8_der(der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
            .map(Self::new)
            .map_err(|e| KeyLoadError::Parse(e.to_string()))
    }

    /// Take the first private key out of a PKCS#12 container.
    pub fn from_pkcs12(der: &[u8], password: &str) -> Result<Self, KeyLoadError> {
        let pfx = p12::PFX::parse(der).map_err(|e| KeyLoadError::Pkcs12(format!("{e:?}")))?;
        let bags = pfx
            .key_bags(password)
            .map_err(|e| KeyLoadError::Pkcs12(format!("{e:?}")))?;
        let key = bags.first().ok_or(KeyLoadError::NoPrivateKey)?;
        Self::from_der(key)
    }

    /// Load a key file.
    ///
    /// Files starting with a PEM armor line are read as PEM, anything else
    /// as a PKCS#12 container opened with `password`.
    pub fn from_file(path: &Path, password: &str) -> Result<Self, KeyLoadError> {
        let data = std::fs::read(path)?;
        if data.trim_ascii_start().starts_with(b"-----BEGIN") {
            let pem = std::str::from_utf8(&data).map_err(|e| KeyLoadError::Parse(e.to_string()))?;
            Self::from_pem(pem)
        } else {
            Self::from_pkcs12(&data, password)
        }
    }

    /// Modulus size in bytes.
    #[must_use]
    pub fn key_size(&self) -> usize {
        self.private_key.size()
    }

    /// The public half.
    #[must_use]
    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Encrypt and sign a CEK into the envelope format.
    pub fn wrap(&self, master_key_path: &str, cek: &[u8]) -> Result<Vec<u8>, CmkError> {
        let op = Operation::Encryption;
        let ciphertext = self
            .public_key()
            .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha1>(), cek)
            .map_err(|e| CmkError::new(op, "RSA-OAEP encryption of the column encryption key failed", e))?;

        let mut envelope = build_unsigned(master_key_path, &ciphertext, op)?;
        let signature = self.sign(&sha256(&envelope), op)?;
        envelope.extend_from_slice(&signature);
        Ok(envelope)
    }

    /// Verify and decrypt an envelope produced by [`RsaMasterKey::wrap`].
    pub fn unwrap(&self, encrypted_cek: &[u8]) -> Result<Vec<u8>, CmkError> {
        let op = Operation::Decryption;
        let envelope = Envelope::parse(encrypted_cek, op)?;
        envelope.check_key_size(self.key_size(), op)?;

        if !self.verify(&envelope.digest(), envelope.signature) {
            return Err(CmkError::message(
                op,
                "Signature of the encrypted column encryption key does not match the master key",
            ));
        }

        self.private_key
            .decrypt(Oaep::new::<Sha1>(), envelope.ciphertext)
            .map_err(|e| CmkError::new(op, "RSA-OAEP decryption of the column encryption key failed", e))
    }

    /// PKCS#1 v1.5 signature over a SHA-256 digest.
    pub fn sign(&self, digest: &[u8; 32], operation: Operation) -> Result<Vec<u8>, CmkError> {
        self.private_key
            .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
            .map_err(|e| CmkError::new(operation, "RSA signing failed", e))
    }

    /// Check a PKCS#1 v1.5 signature over a SHA-256 digest.
    #[must_use]
    pub fn verify(&self, digest: &[u8; 32], signature: &[u8]) -> bool {
        self.public_key()
            .verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
            .is_ok()
    }
}

impl std::fmt::Debug for RsaMasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaMasterKey")
            .field("bits", &(self.key_size() * 8))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};

    fn test_key() -> RsaMasterKey {
        RsaMasterKey::new(RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap())
    }

    #[test]
    fn test_wrap_unwrap() {
        let key = test_key();
        let cek = [0x42u8; 32];
        let wrapped = key.wrap("CurrentUser/My/Thumbprint", &cek).unwrap();

        let env = Envelope::parse(&wrapped, Operation::Decryption).unwrap();
        assert_eq!(env.key_path_lossy(), "currentuser/my/thumbprint");
        assert_eq!(env.ciphertext.len(), 256);
        assert_eq!(env.signature.len(), 256);

        assert_eq!(key.unwrap(&wrapped).unwrap(), cek);
    }

    #[test]
    fn test_tampered_envelope_fails_signature() {
        let key = test_key();
        let mut wrapped = key.wrap("path", &[1u8; 32]).unwrap();
        let mid = wrapped.len() / 2;
        wrapped[mid] ^= 0xFF;
        let err = key.unwrap(&wrapped).unwrap_err();
        assert_eq!(err.operation(), Operation::Decryption);
        assert!(err.to_string().contains("Signature"));
    }

    #[test]
    fn test_other_key_cannot_unwrap() {
        let a = test_key();
        let b = test_key();
        let wrapped = a.wrap("path", &[9u8; 32]).unwrap();
        assert!(b.unwrap(&wrapped).is_err());
    }

    #[test]
    fn test_pem_formats() {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let pkcs8 = key.to_pkcs8_pem(LineEnding::LF).unwrap();
        let loaded = RsaMasterKey::from_pem(&pkcs8).unwrap();
        assert_eq!(loaded.key_size(), 256);

        let der = key.to_pkcs8_der().unwrap();
        assert!(RsaMasterKey::from_der(der.as_bytes()).is_ok());

        assert!(matches!(
            RsaMasterKey::from_pem("not a key"),
            Err(KeyLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_pkcs12() {
        assert!(matches!(
            RsaMasterKey::from_pkcs12(b"garbage", ""),
            Err(KeyLoadError::Pkcs12(_))
        ));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = test_key();
        assert_eq!(format!("{key:?}"), "RsaMasterKey { bits: 2048, .. }");
    }
}
