//! Always Encrypted configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::cmk::DEFAULT_KEY_LIFETIME;

/// Settings for an [`EncryptionPipeline`](crate::EncryptionPipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
    /// Whether column encryption is enabled (default: true).
    pub enabled: bool,
    /// Swap GUID byte order between wire and value (default: true).
    pub guid_conversion: bool,
    /// CEK cache lifetime when a provider sets none (default: 2 hours).
    pub default_key_lifetime: Duration,
    /// Master key paths trusted per server. Servers without an entry trust
    /// every path.
    pub trusted_key_paths: HashMap<String, Vec<String>>,
    /// Passed to master key metadata signing and verification.
    pub allow_enclave_computations: bool,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            guid_conversion: true,
            default_key_lifetime: DEFAULT_KEY_LIFETIME,
            trusted_key_paths: HashMap::new(),
            allow_enclave_computations: false,
        }
    }
}

impl EncryptionConfig {
    /// Create a configuration with encryption enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that refuses encrypted metadata.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Enable or disable column encryption.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enable or disable GUID byte-order conversion.
    #[must_use]
    pub fn guid_conversion(mut self, enabled: bool) -> Self {
        self.guid_conversion = enabled;
        self
    }

    /// Set the default CEK cache lifetime.
    #[must_use]
    pub fn key_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_key_lifetime = lifetime;
        self
    }

    /// Trust `paths` for master keys used by `server`.
    #[must_use]
    pub fn trusted_key_paths<I, S>(mut self, server: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_key_paths
            .entry(server.into())
            .or_default()
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Allow enclave computations.
    #[must_use]
    pub fn allow_enclave_computations(mut self, allow: bool) -> Self {
        self.allow_enclave_computations = allow;
        self
    }

    /// Whether `master_key_path` may be used with `server`.
    ///
    /// Paths compare case-insensitively.
    #[must_use]
    pub fn is_key_path_trusted(&self, server: &str, master_key_path: &str) -> bool {
        match self.trusted_key_paths.get(server) {
            None => true,
            Some(paths) => paths.iter().any(|p| p.eq_ignore_ascii_case(master_key_path)),
        }
    }
}
