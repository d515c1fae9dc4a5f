//! Certificate-store column master key provider.
//!
//! The master key path names a key file on the local filesystem: a PKCS#12
//! container (`.pfx`/`.p12`) or a PEM private key. Keys are loaded on demand
//! and never kept past the call; the CEK cache absorbs repeated loads.

use std::collections::HashMap;
use std::path::{Component, Path};

use async_trait::async_trait;

use crate::cmk::{
    CERTIFICATE_STORE_PROVIDER, CmkProvider, validate_encryption_algorithm,
    validate_key_path_length,
};
use crate::error::{CmkError, Operation};
use crate::rsa_key::RsaMasterKey;

const WILDCARD: &str = "";

/// Column master key provider backed by local key files.
#[derive(Default)]
pub struct LocalCertProvider {
    passwords: HashMap<String, String>,
    allowed_locations: Vec<String>,
}

impl LocalCertProvider {
    /// Create a provider with no passwords and no location restrictions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider name to register under.
    #[must_use]
    pub fn name(&self) -> &'static str {
        CERTIFICATE_STORE_PROVIDER
    }

    /// Set the password for a PKCS#12 file.
    ///
    /// An empty `location` sets the password used for every file without
    /// its own entry.
    pub fn set_certificate_password(&mut self, location: impl Into<String>, password: impl Into<String>) {
        self.passwords.insert(location.into(), password.into());
    }

    /// Builder form of [`LocalCertProvider::set_certificate_password`].
    #[must_use]
    pub fn with_certificate_password(mut self, location: impl Into<String>, password: impl Into<String>) -> Self {
        self.set_certificate_password(location, password);
        self
    }

    /// Restrict key paths to those under one of `locations`.
    ///
    /// Locations match whole path components, so `/keys` admits
    /// `/keys/a.pfx` but not `/keys_old/a.pfx`. Paths containing `..` are
    /// rejected whenever a list is set. An empty list allows every path.
    #[must_use]
    pub fn with_allowed_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Configured location prefixes.
    #[must_use]
    pub fn allowed_locations(&self) -> &[String] {
        &self.allowed_locations
    }

    /// Password used for `location`.
    #[must_use]
    pub fn password_for(&self, location: &str) -> &str {
        self.passwords
            .get(location)
            .or_else(|| self.passwords.get(WILDCARD))
            .map_or("", String::as_str)
    }

    fn is_allowed(&self, master_key_path: &str) -> bool {
        if self.allowed_locations.is_empty() {
            return true;
        }
        let path = Path::new(master_key_path);
        if path.components().any(|c| c == Component::ParentDir) {
            return false;
        }
        self.allowed_locations
            .iter()
            .any(|location| path.starts_with(Path::new(location)))
    }

    fn load_key(&self, master_key_path: &str, operation: Operation) -> Result<RsaMasterKey, CmkError> {
        if !self.is_allowed(master_key_path) {
            tracing::warn!(key_path = %master_key_path, "key path outside allowed locations");
            return Err(CmkError::key_path_not_allowed(master_key_path, operation));
        }

        RsaMasterKey::from_file(Path::new(master_key_path), self.password_for(master_key_path))
            .map_err(|e| {
                CmkError::new(
                    operation,
                    format!("Invalid certificate path: {master_key_path}"),
                    e,
                )
            })
    }

    fn validate(master_key_path: &str, algorithm: &str, operation: Operation) -> Result<(), CmkError> {
        validate_encryption_algorithm(algorithm, operation)?;
        validate_key_path_length(master_key_path, operation)
    }
}

impl std::fmt::Debug for LocalCertProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCertProvider")
            .field("password_locations", &self.passwords.keys().collect::<Vec<_>>())
            .field("allowed_locations", &self.allowed_locations)
            .finish()
    }
}

#[async_trait]
impl CmkProvider for LocalCertProvider {
    async fn decrypt_column_encryption_key(
        &self,
        master_key_path: &str,
        encryption_algorithm: &str,
        encrypted_cek: &[u8],
    ) -> Result<Vec<u8>, CmkError> {
        Self::validate(master_key_path, encryption_algorithm, Operation::Decryption)?;
        let key = self.load_key(master_key_path, Operation::Decryption)?;
        key.unwrap(encrypted_cek)
    }

    async fn encrypt_column_encryption_key(
        &self,
        master_key_path: &str,
        encryption_algorithm: &str,
        cek: &[u8],
    ) -> Result<Vec<u8>, CmkError> {
        Self::validate(master_key_path, encryption_algorithm, Operation::Encryption)?;
        let key = self.load_key(master_key_path, Operation::Encryption)?;
        key.wrap(master_key_path, cek)
    }

    async fn sign_column_master_key_metadata(
        &self,
        _master_key_path: &str,
        _allow_enclave_computations: bool,
    ) -> Result<Option<Vec<u8>>, CmkError> {
        Ok(None)
    }

    async fn verify_column_master_key_metadata(
        &self,
        _master_key_path: &str,
        _allow_enclave_computations: bool,
        _signature: &[u8],
    ) -> Result<Option<bool>, CmkError> {
        Ok(None)
    }
}
