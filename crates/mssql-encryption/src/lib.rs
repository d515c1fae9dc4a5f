//! # mssql-encryption
//!
//! Client-side column encryption (Always Encrypted) for SQL Server.
//!
//! Encrypted columns are stored and transmitted as ciphertext; only the
//! client holds the keys. This crate covers the client half:
//!
//! - [`AeadCodec`]: `AEAD_AES_256_CBC_HMAC_SHA256` cell encryption with
//!   deterministic and randomized IVs
//! - [`CmkProvider`]: pluggable column master key access, with
//!   [`LocalCertProvider`] for key files and [`KeyVaultProvider`] for
//!   remote vaults
//! - [`CmkProviderRegistry`] and [`CekCache`]: provider lookup by name and
//!   time-bounded caching of decrypted column encryption keys
//! - [`EncryptionPipeline`]: parameter encryption and result decryption
//!   driven by server metadata
//!
//! ## Example
//!
//! ```rust
//! use mssql_encryption::AeadCodec;
//! use tds_protocol::EncryptionType;
//!
//! let codec = AeadCodec::from_root_key(&[7u8; 32], EncryptionType::Deterministic).unwrap();
//! let cipher = codec.encrypt(b"secret").unwrap();
//! assert_eq!(codec.decrypt(&cipher).unwrap(), b"secret");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod aead;
pub mod cache;
pub mod cmk;
pub mod config;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod keyvault;
pub mod localcert;
pub mod pipeline;
pub mod quoter;
pub mod registry;
pub mod rsa_key;
pub mod statement;

pub use aead::AeadCodec;
pub use cache::{CekCache, PlaintextKey};
pub use cmk::{
    AZURE_KEY_VAULT_PROVIDER, CERTIFICATE_STORE_PROVIDER, CmkProvider, DEFAULT_KEY_LIFETIME,
    KEY_ENCRYPTION_ALGORITHM,
};
pub use config::EncryptionConfig;
pub use error::{CmkError, CryptoError, Error, Operation, Result};
pub use keys::{CellKey, KeyPurpose};
pub use keyvault::{KeyVaultClient, KeyVaultKey, KeyVaultProvider};
pub use localcert::LocalCertProvider;
pub use pipeline::{BoundParameter, ColumnDecryptor, EncryptionPipeline};
pub use quoter::{QuoteValue, quote_identifier, quote_value};
pub use registry::{CekProvider, CmkProviderRegistry};
pub use rsa_key::{KeyLoadError, RsaMasterKey};
pub use statement::{
    DescribeCekRow, DescribeParamRow, Parameter, ParameterEncryptionDescriptor,
    ParameterEncryptionInfo, RpcArg, build_exec_statement, normalize_param_name,
    prepare_encryption_query,
};
