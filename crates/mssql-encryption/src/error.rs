//! Always Encrypted error types.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed error carried as the cause of a [`CmkError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The key-store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Unwrapping a column encryption key.
    Decryption,
    /// Wrapping a column encryption key.
    Encryption,
    /// Validating a key path, algorithm or signature.
    Validation,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decryption => "decryption",
            Self::Encryption => "encryption",
            Self::Validation => "validation",
        })
    }
}

/// Error raised by a column master key provider.
///
/// The display form is the message alone. The underlying cause, if any, is
/// reachable through [`std::error::Error::source`].
#[derive(Debug)]
pub struct CmkError {
    operation: Operation,
    message: String,
    source: Option<BoxError>,
}

impl CmkError {
    /// Create an error with an underlying cause.
    pub fn new(operation: Operation, message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an error without an underlying cause.
    pub fn message(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// A key path rejected by an allow-list.
    pub fn key_path_not_allowed(path: &str, operation: Operation) -> Self {
        Self::message(
            operation,
            format!("Key path '{path}' is not in the list of trusted key paths"),
        )
    }

    /// The operation that failed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl fmt::Display for CmkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CmkError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// AEAD cell encryption failures.
///
/// None of these carry partial plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Root key of the wrong size.
    #[error("column encryption key must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key size.
        expected: usize,
        /// Size supplied.
        actual: usize,
    },

    /// Ciphertext shorter than version, tag, IV and one block.
    #[error("ciphertext too short: {actual} bytes, minimum {minimum}")]
    CiphertextTooShort {
        /// Bytes supplied.
        actual: usize,
        /// Minimum valid length.
        minimum: usize,
    },

    /// Leading algorithm version byte does not match.
    #[error("invalid algorithm version byte: expected {expected:#04x}, got {actual:#04x}")]
    InvalidVersion {
        /// Configured version.
        expected: u8,
        /// Version found in the ciphertext.
        actual: u8,
    },

    /// Authentication tag mismatch.
    #[error("authentication tag mismatch")]
    AuthenticationFailed,

    /// Ciphertext body is not a whole number of blocks or padding is invalid.
    #[error("invalid ciphertext padding")]
    Padding,
}

/// Errors surfaced by the encryption pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed wire metadata.
    #[error("protocol error: {0}")]
    Protocol(#[from] tds_protocol::ProtocolError),

    /// Value encode/decode failure.
    #[error("type error: {0}")]
    Type(#[from] mssql_types::TypeError),

    /// Crypto metadata referenced a CEK ordinal missing from the table.
    #[error("CEK table has no entry for ordinal {0}")]
    UnknownCekOrdinal(u16),

    /// Column flagged as encrypted without crypto metadata.
    #[error("encrypted column {0} has no crypto metadata")]
    MissingCryptoMetadata(String),

    /// CEK table entry without any encrypted value.
    #[error("CEK table entry {0} has no encrypted values")]
    EmptyCekEntry(u16),

    /// No provider registered under this name.
    #[error("column master key provider not registered: {0}")]
    ProviderNotRegistered(String),

    /// A provider is already registered under this name.
    #[error("column master key provider already registered: {0}")]
    DuplicateProvider(String),

    /// Key provider failure.
    #[error("{0}")]
    Cmk(#[from] CmkError),

    /// AEAD failure.
    #[error("cell encryption failed: {0}")]
    Crypto(#[from] CryptoError),

    /// Cell encryption algorithm other than AEAD_AES_256_CBC_HMAC_SHA256.
    #[error("unsupported cell encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Encryption type that cannot be applied to a value.
    #[error("unsupported encryption type: {0}")]
    UnsupportedEncryptionType(&'static str),

    /// The server described a parameter the call does not bind.
    #[error("parameter {0} was described for encryption but not supplied")]
    ParameterNotDescribed(String),

    /// The quoter cannot render this literal kind.
    #[error("cannot quote {0} literal")]
    UnsupportedLiteral(&'static str),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether retrying with the same inputs cannot succeed.
    ///
    /// Provider failures may come from a remote key store and are left to the
    /// caller's retry policy.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Cmk(e) if e.operation() != Operation::Validation)
    }

    /// Whether the error arose while resolving a column encryption key.
    #[must_use]
    pub fn is_key_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnknownCekOrdinal(_)
                | Self::EmptyCekEntry(_)
                | Self::ProviderNotRegistered(_)
                | Self::Cmk(_)
        )
    }

    /// Whether the error is an AEAD validation failure.
    #[must_use]
    pub fn is_crypto_validation(&self) -> bool {
        matches!(self, Self::Crypto(_))
    }
}

/// Result alias for the encryption pipeline.
pub type Result<T> = std::result::Result<T, Error>;
