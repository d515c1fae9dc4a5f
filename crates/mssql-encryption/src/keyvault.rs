//! Key-vault column master key provider.
//!
//! Master keys live in a remote vault and never leave it. The provider
//! validates key paths, frames and verifies the CEK envelope, and delegates
//! the RSA operations to a [`KeyVaultClient`]. The HTTP transport and
//! credential handling sit behind that trait.
//!
//! Key paths are `https://<vault-host>/keys/<name>[/<version>]`, where the
//! host must fall under one of the trusted endpoint suffixes.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::cmk::{
    AZURE_KEY_VAULT_PROVIDER, CmkProvider, cmk_metadata_hash, validate_encryption_algorithm,
    validate_key_path_length,
};
use crate::envelope::{Envelope, build_unsigned, sha256};
use crate::error::{BoxError, CmkError, Operation};

/// Vault-side name of the key wrapping algorithm.
pub const VAULT_WRAP_ALGORITHM: &str = "RSA-OAEP";

/// Host suffixes accepted by default.
pub const DEFAULT_TRUSTED_ENDPOINTS: &[&str] = &[
    "vault.azure.net",
    "vault.azure.cn",
    "vault.usgovcloudapi.net",
    "vault.microsoftazure.de",
    "managedhsm.azure.net",
    "managedhsm.azure.cn",
    "managedhsm.usgovcloudapi.net",
    "managedhsm.microsoftazure.de",
];

/// A key identifier parsed from a master key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVaultKey {
    /// `https://<host>` of the vault.
    pub vault_url: String,
    /// Key name.
    pub name: String,
    /// Key version, when pinned.
    pub version: Option<String>,
}

impl KeyVaultKey {
    /// Parse and validate a master key path.
    pub fn parse(master_key_path: &str, trusted_endpoints: &[String], operation: Operation) -> Result<Self, CmkError> {
        let invalid = |reason: &str| {
            CmkError::message(
                operation,
                format!("Invalid key vault key path '{master_key_path}': {reason}"),
            )
        };

        let url = Url::parse(master_key_path)
            .map_err(|e| CmkError::new(operation, format!("Invalid key vault key path '{master_key_path}'"), e))?;
        if url.scheme() != "https" {
            return Err(invalid("scheme must be https"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        if !is_trusted_host(host, trusted_endpoints) {
            tracing::warn!(key_path = %master_key_path, "key vault host is not a trusted endpoint");
            return Err(CmkError::key_path_not_allowed(master_key_path, operation));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let (name, version) = match segments.as_slice() {
            ["keys", name] => (*name, None),
            ["keys", name, version] => (*name, Some((*version).to_string())),
            _ => return Err(invalid("expected /keys/<name>[/<version>]")),
        };

        Ok(Self {
            vault_url: format!("https://{host}"),
            name: name.to_string(),
            version,
        })
    }
}

fn is_trusted_host(host: &str, trusted_endpoints: &[String]) -> bool {
    trusted_endpoints.iter().any(|suffix| {
        let suffix = suffix.trim_start_matches('.');
        host.eq_ignore_ascii_case(suffix)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", suffix.to_ascii_lowercase()))
    })
}

/// RSA operations performed inside a key vault.
#[async_trait]
pub trait KeyVaultClient: Send + Sync {
    /// Modulus size of the key, in bytes.
    async fn key_size(&self, key: &KeyVaultKey) -> Result<usize, BoxError>;

    /// Encrypt a CEK with the vault key.
    async fn wrap_key(&self, key: &KeyVaultKey, algorithm: &str, cek: &[u8]) -> Result<Vec<u8>, BoxError>;

    /// Decrypt a CEK with the vault key.
    async fn unwrap_key(&self, key: &KeyVaultKey, algorithm: &str, wrapped: &[u8]) -> Result<Vec<u8>, BoxError>;

    /// RS256 signature over a SHA-256 digest.
    async fn sign(&self, key: &KeyVaultKey, digest: &[u8; 32]) -> Result<Vec<u8>, BoxError>;

    /// Check an RS256 signature over a SHA-256 digest.
    async fn verify(&self, key: &KeyVaultKey, digest: &[u8; 32], signature: &[u8]) -> Result<bool, BoxError>;
}

/// Column master key provider backed by a key vault.
pub struct KeyVaultProvider<C> {
    client: C,
    trusted_endpoints: Vec<String>,
    key_lifetime: Option<Duration>,
}

impl<C: KeyVaultClient> KeyVaultProvider<C> {
    /// Create a provider trusting [`DEFAULT_TRUSTED_ENDPOINTS`].
    pub fn new(client: C) -> Self {
        Self {
            client,
            trusted_endpoints: DEFAULT_TRUSTED_ENDPOINTS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            key_lifetime: None,
        }
    }

    /// Replace the trusted endpoint suffixes.
    #[must_use]
    pub fn with_trusted_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Set how long CEKs unwrapped by this provider may be cached.
    #[must_use]
    pub fn with_key_lifetime(mut self, lifetime: Duration) -> Self {
        self.key_lifetime = Some(lifetime);
        self
    }

    /// Provider name to register under.
    #[must_use]
    pub fn name(&self) -> &'static str {
        AZURE_KEY_VAULT_PROVIDER
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn resolve(&self, master_key_path: &str, algorithm: &str, operation: Operation) -> Result<KeyVaultKey, CmkError> {
        validate_encryption_algorithm(algorithm, operation)?;
        validate_key_path_length(master_key_path, operation)?;
        KeyVaultKey::parse(master_key_path, &self.trusted_endpoints, operation)
    }

    fn metadata_key(&self, master_key_path: &str) -> Result<KeyVaultKey, CmkError> {
        validate_key_path_length(master_key_path, Operation::Validation)?;
        KeyVaultKey::parse(master_key_path, &self.trusted_endpoints, Operation::Validation)
    }
}

impl<C> std::fmt::Debug for KeyVaultProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultProvider")
            .field("trusted_endpoints", &self.trusted_endpoints)
            .field("key_lifetime", &self.key_lifetime)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: KeyVaultClient> CmkProvider for KeyVaultProvider<C> {
    async fn decrypt_column_encryption_key(
        &self,
        master_key_path: &str,
        encryption_algorithm: &str,
        encrypted_cek: &[u8],
    ) -> Result<Vec<u8>, CmkError> {
        let op = Operation::Decryption;
        let key = self.resolve(master_key_path, encryption_algorithm, op)?;

        let envelope = Envelope::parse(encrypted_cek, op)?;
        let key_size = self
            .client
            .key_size(&key)
            .await
            .map_err(|e| CmkError::new(op, "Failed to read key vault key size", e))?;
        envelope.check_key_size(key_size, op)?;

        let valid = self
            .client
            .verify(&key, &envelope.digest(), envelope.signature)
            .await
            .map_err(|e| CmkError::new(op, "Key vault signature verification failed", e))?;
        if !valid {
            tracing::warn!(key_path = %master_key_path, "encrypted CEK signature mismatch");
            return Err(CmkError::message(
                op,
                "Signature of the encrypted column encryption key does not match the master key",
            ));
        }

        self.client
            .unwrap_key(&key, VAULT_WRAP_ALGORITHM, envelope.ciphertext)
            .await
            .map_err(|e| CmkError::new(op, "Key vault failed to unwrap the column encryption key", e))
    }

    async fn encrypt_column_encryption_key(
        &self,
        master_key_path: &str,
        encryption_algorithm: &str,
        cek: &[u8],
    ) -> Result<Vec<u8>, CmkError> {
        let op = Operation::Encryption;
        let key = self.resolve(master_key_path, encryption_algorithm, op)?;

        let ciphertext = self
            .client
            .wrap_key(&key, VAULT_WRAP_ALGORITHM, cek)
            .await
            .map_err(|e| CmkError::new(op, "Key vault failed to wrap the column encryption key", e))?;

        let mut envelope = build_unsigned(master_key_path, &ciphertext, op)?;
        let signature = self
            .client
            .sign(&key, &sha256(&envelope))
            .await
            .map_err(|e| CmkError::new(op, "Key vault signing failed", e))?;
        envelope.extend_from_slice(&signature);
        Ok(envelope)
    }

    async fn sign_column_master_key_metadata(
        &self,
        master_key_path: &str,
        allow_enclave_computations: bool,
    ) -> Result<Option<Vec<u8>>, CmkError> {
        let key = self.metadata_key(master_key_path)?;
        let hash = cmk_metadata_hash(AZURE_KEY_VAULT_PROVIDER, master_key_path, allow_enclave_computations);
        let signature = self
            .client
            .sign(&key, &hash)
            .await
            .map_err(|e| CmkError::new(Operation::Validation, "Key vault signing failed", e))?;
        Ok(Some(signature))
    }

    async fn verify_column_master_key_metadata(
        &self,
        master_key_path: &str,
        allow_enclave_computations: bool,
        signature: &[u8],
    ) -> Result<Option<bool>, CmkError> {
        let key = self.metadata_key(master_key_path)?;
        let hash = cmk_metadata_hash(AZURE_KEY_VAULT_PROVIDER, master_key_path, allow_enclave_computations);
        let valid = self
            .client
            .verify(&key, &hash, signature)
            .await
            .map_err(|e| CmkError::new(Operation::Validation, "Key vault signature verification failed", e))?;
        Ok(Some(valid))
    }

    fn key_lifetime(&self) -> Option<Duration> {
        self.key_lifetime
    }
}
