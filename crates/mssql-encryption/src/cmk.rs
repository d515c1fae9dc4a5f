//! Column master key providers.
//!
//! A provider owns access to the asymmetric key (the CMK) that wraps each
//! column encryption key. SQL Server stores only the wrapped CEK plus the
//! provider name and key path; the client looks the provider up by name and
//! asks it to unwrap the CEK.
//!
//! ```text
//! CEK table entry ──► provider name ──► CmkProvider::decrypt_column_encryption_key
//!                     key path               │
//!                     wrapped CEK            ▼
//!                                       plaintext CEK ──► AeadCodec
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{CmkError, Operation};

/// Provider name of the certificate store provider.
pub const CERTIFICATE_STORE_PROVIDER: &str = "MSSQL_CERTIFICATE_STORE";

/// Provider name of the key vault provider.
pub const AZURE_KEY_VAULT_PROVIDER: &str = "AZURE_KEY_VAULT";

/// The only key encryption algorithm accepted for wrapping CEKs.
pub const KEY_ENCRYPTION_ALGORITHM: &str = "RSA_OAEP";

/// Longest accepted master key path, in bytes.
pub const MAX_KEY_PATH_LEN: usize = 32767;

/// Cache lifetime for decrypted CEKs when a provider does not set one.
pub const DEFAULT_KEY_LIFETIME: Duration = Duration::from_secs(2 * 60 * 60);

/// Access to column master keys held in an external key store.
///
/// Implementations must never log or echo key material.
#[async_trait]
pub trait CmkProvider: Send + Sync {
    /// Unwrap an encrypted column encryption key.
    async fn decrypt_column_encryption_key(
        &self,
        master_key_path: &str,
        encryption_algorithm: &str,
        encrypted_cek: &[u8],
    ) -> Result<Vec<u8>, CmkError>;

    /// Wrap a plaintext column encryption key.
    async fn encrypt_column_encryption_key(
        &self,
        master_key_path: &str,
        encryption_algorithm: &str,
        cek: &[u8],
    ) -> Result<Vec<u8>, CmkError>;

    /// Sign the column master key metadata.
    ///
    /// `Ok(None)` means the provider does not support signing.
    async fn sign_column_master_key_metadata(
        &self,
        master_key_path: &str,
        allow_enclave_computations: bool,
    ) -> Result<Option<Vec<u8>>, CmkError>;

    /// Verify a column master key metadata signature.
    ///
    /// `Ok(None)` means the provider does not support verification.
    async fn verify_column_master_key_metadata(
        &self,
        master_key_path: &str,
        allow_enclave_computations: bool,
        signature: &[u8],
    ) -> Result<Option<bool>, CmkError>;

    /// How long decrypted keys from this provider may be cached.
    ///
    /// `None` selects the cache default.
    fn key_lifetime(&self) -> Option<Duration> {
        None
    }
}

/// Reject any key encryption algorithm other than `RSA_OAEP`.
///
/// The comparison ignores ASCII case.
pub fn validate_encryption_algorithm(algorithm: &str, operation: Operation) -> Result<(), CmkError> {
    if algorithm.eq_ignore_ascii_case(KEY_ENCRYPTION_ALGORITHM) {
        Ok(())
    } else {
        Err(CmkError::message(
            operation,
            format!(
                "Invalid key encryption algorithm '{algorithm}'; expected '{KEY_ENCRYPTION_ALGORITHM}'"
            ),
        ))
    }
}

/// Reject master key paths longer than [`MAX_KEY_PATH_LEN`] bytes.
pub fn validate_key_path_length(master_key_path: &str, operation: Operation) -> Result<(), CmkError> {
    if master_key_path.len() > MAX_KEY_PATH_LEN {
        Err(CmkError::message(
            operation,
            format!(
                "Key path is {} bytes, longer than the maximum of {MAX_KEY_PATH_LEN}",
                master_key_path.len()
            ),
        ))
    } else {
        Ok(())
    }
}

/// SHA-256 of the column master key metadata a provider signs.
///
/// The hashed text is the lower-cased UTF-16LE concatenation of the provider
/// name, the key path and `true`/`false` for enclave computations.
#[must_use]
pub fn cmk_metadata_hash(provider_name: &str, master_key_path: &str, allow_enclave_computations: bool) -> [u8; 32] {
    let text = format!("{provider_name}{master_key_path}{allow_enclave_computations}").to_lowercase();

    let mut hasher = Sha256::new();
    for unit in text.encode_utf16() {
        hasher.update(unit.to_le_bytes());
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}
