//! Transparent column encryption for statements and result sets.
//!
//! ## Outbound
//!
//! ```text
//! Parameter ──► normalize (base type) ──► AEAD encrypt (CEK, enc type) ──► varbinary + CryptoMetadata
//! ```
//!
//! ## Inbound
//!
//! ```text
//! COLMETADATA ──► CEK table ──► provider + cache ──► ColumnDecryptor
//! row bytes ────────────────────────────────────────► AEAD decrypt ──► decode (base type)
//! ```
//!
//! Plaintext is normalized before encryption so that equal values encrypt
//! to equal ciphertext under deterministic encryption regardless of the
//! declared width: every integer and bit base type is serialized as an
//! 8-byte little-endian integer. Other base types use their wire encoding
//! without a length prefix.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use mssql_types::metadata::param_type_info;
use mssql_types::{SqlValue, TypeCodec, TypeError};
use tds_protocol::crypto::{ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256, NORMALIZATION_RULE_VERSION};
use tds_protocol::{
    CekTableEntry, CekValue, ColMetaData, CryptoMetadata, EncryptionType, TypeId, TypeInfo,
};

use crate::aead::AeadCodec;
use crate::cache::PlaintextKey;
use crate::config::EncryptionConfig;
use crate::error::{CmkError, Error, Operation, Result};
use crate::registry::CmkProviderRegistry;
use crate::statement::{Parameter, ParameterEncryptionInfo};

/// Normalization rule version this pipeline writes.
pub const RULE_VERSION: u8 = NORMALIZATION_RULE_VERSION;

/// Maximum inline `varbinary` size; larger ciphertext is sent as `max`.
const MAX_INLINE_BINARY: usize = 8000;

/// Encrypts parameters and decrypts result columns for one server.
#[derive(Debug, Clone)]
pub struct EncryptionPipeline {
    registry: Arc<CmkProviderRegistry>,
    config: EncryptionConfig,
    codec: TypeCodec,
    server: String,
}

impl EncryptionPipeline {
    /// Create a pipeline over a shared provider registry.
    pub fn new(registry: Arc<CmkProviderRegistry>, config: EncryptionConfig) -> Self {
        let codec = TypeCodec::new().with_guid_conversion(config.guid_conversion);
        Self {
            registry,
            config,
            codec,
            server: String::new(),
        }
    }

    /// Name the server this pipeline talks to, for trusted key path lookup.
    #[must_use]
    pub fn for_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EncryptionConfig {
        &self.config
    }

    /// Shared provider registry.
    pub fn registry(&self) -> &Arc<CmkProviderRegistry> {
        &self.registry
    }

    /// Value codec used on both sides of encryption.
    pub fn codec(&self) -> &TypeCodec {
        &self.codec
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(Error::Config(
                "server sent encrypted metadata but column encryption is disabled".into(),
            ))
        }
    }

    /// Decrypt a CEK table entry.
    ///
    /// Each encrypted value is tried in order until one decrypts. When all
    /// fail, the last error is returned.
    pub async fn resolve_cek(&self, ordinal: u16, entry: &CekTableEntry) -> Result<PlaintextKey> {
        let mut last_error = None;
        for value in &entry.values {
            match self.resolve_value(value).await {
                Ok(key) => return Ok(key),
                Err(e) => {
                    tracing::warn!(
                        ordinal,
                        provider = %value.key_store_provider_name,
                        key_path = %value.cmk_path,
                        error = %e,
                        "column encryption key candidate failed"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(Error::EmptyCekEntry(ordinal)))
    }

    async fn resolve_value(&self, value: &CekValue) -> Result<PlaintextKey> {
        if !self.config.is_key_path_trusted(&self.server, &value.cmk_path) {
            return Err(CmkError::key_path_not_allowed(&value.cmk_path, Operation::Validation).into());
        }
        let provider = self.registry.require(&value.key_store_provider_name)?;
        Ok(provider
            .get_decrypted_key(&value.cmk_path, &value.encryption_algorithm, &value.encrypted_value)
            .await?)
    }

    async fn cell_codec(
        &self,
        ordinal: u16,
        entry: &CekTableEntry,
        algorithm_id: u8,
        algorithm_name: &str,
        encryption_type: EncryptionType,
    ) -> Result<AeadCodec> {
        if algorithm_id != ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256 {
            return Err(Error::UnsupportedAlgorithm(if algorithm_name.is_empty() {
                format!("algorithm id {algorithm_id}")
            } else {
                algorithm_name.to_string()
            }));
        }
        let key = self.resolve_cek(ordinal, entry).await?;
        AeadCodec::from_root_key(&key, encryption_type)
    }

    /// Prepare to decrypt rows described by `metadata`.
    ///
    /// Every CEK referenced by an encrypted column is resolved up front.
    pub async fn column_decryptor(&self, metadata: &ColMetaData) -> Result<ColumnDecryptor> {
        if metadata.has_encrypted_columns() {
            self.ensure_enabled()?;
        }

        let mut codecs: HashMap<(u16, EncryptionType), AeadCodec> = HashMap::new();
        let mut columns = Vec::with_capacity(metadata.columns.len());
        for column in &metadata.columns {
            let cipher = match (&column.crypto_metadata, column.is_encrypted()) {
                (Some(meta), true) => {
                    let key = (meta.cek_table_ordinal, meta.encryption_type);
                    let codec = match codecs.get(&key) {
                        Some(codec) => codec.clone(),
                        None => {
                            let entry = metadata
                                .cek_table
                                .get(meta.cek_table_ordinal)
                                .ok_or(Error::UnknownCekOrdinal(meta.cek_table_ordinal))?;
                            let codec = self
                                .cell_codec(
                                    meta.cek_table_ordinal,
                                    entry,
                                    meta.algorithm_id,
                                    meta.algorithm(),
                                    meta.encryption_type,
                                )
                                .await?;
                            codecs.insert(key, codec.clone());
                            codec
                        }
                    };
                    Some(ColumnCipher {
                        codec,
                        base_type: meta.base_type.clone(),
                    })
                }
                (None, true) => return Err(Error::MissingCryptoMetadata(column.name.clone())),
                (_, false) => None,
            };
            columns.push(ColumnSlot {
                type_info: column.type_info.clone(),
                cipher,
            });
        }

        tracing::debug!(
            columns = columns.len(),
            ceks = codecs.len(),
            "prepared column decryptor"
        );
        Ok(ColumnDecryptor {
            columns,
            codec: self.codec,
        })
    }

    /// Encrypt the parameters the server described as encrypted.
    ///
    /// Parameters without a descriptor, or described as plaintext, pass
    /// through unchanged. A described parameter missing from `params` is an
    /// error.
    pub async fn encrypt_parameters(
        &self,
        info: &ParameterEncryptionInfo,
        params: &[Parameter],
    ) -> Result<Vec<BoundParameter>> {
        if info.has_encrypted_params() {
            self.ensure_enabled()?;
        }

        let wire_names: Vec<String> = params.iter().map(Parameter::wire_name).collect();
        for descriptor in info.params.iter().filter(|d| d.is_encrypted()) {
            if !wire_names.iter().any(|n| n.eq_ignore_ascii_case(&descriptor.name)) {
                return Err(Error::ParameterNotDescribed(descriptor.name.clone()));
            }
        }

        let mut codecs: HashMap<(u16, EncryptionType), AeadCodec> = HashMap::new();
        let mut bound = Vec::with_capacity(params.len());
        for (param, name) in params.iter().zip(wire_names) {
            let descriptor = match info.descriptor(&name) {
                Some(d) if d.is_encrypted() => d,
                _ => {
                    bound.push(BoundParameter::plaintext(name, param.value.clone()));
                    continue;
                }
            };

            let key = (descriptor.cek_ordinal, descriptor.encryption_type);
            let codec = match codecs.get(&key) {
                Some(codec) => codec.clone(),
                None => {
                    let entry = info.cek(descriptor.cek_ordinal)?;
                    let codec = self
                        .cell_codec(
                            descriptor.cek_ordinal,
                            entry,
                            descriptor.algorithm_id,
                            "",
                            descriptor.encryption_type,
                        )
                        .await?;
                    codecs.insert(key, codec.clone());
                    codec
                }
            };

            let base_type = param_type_info(&param.value);
            let value = if param.value.is_null() {
                SqlValue::Null
            } else {
                let plaintext = normalize(&self.codec, &base_type, &param.value)?;
                SqlValue::Binary(Bytes::from(codec.encrypt(&plaintext)?))
            };
            let cipher_len = value.as_bytes().map_or(1, <[u8]>::len);

            bound.push(BoundParameter {
                name,
                type_info: cipher_type_info(cipher_len),
                value,
                crypto_metadata: Some(CryptoMetadata {
                    cek_table_ordinal: descriptor.cek_ordinal,
                    user_type: 0,
                    base_type,
                    algorithm_id: descriptor.algorithm_id,
                    algorithm_name: None,
                    encryption_type: descriptor.encryption_type,
                    normalization_version: descriptor.rule_version,
                }),
            });
        }
        Ok(bound)
    }

    /// Verify a column master key metadata signature through its provider.
    ///
    /// `Ok(None)` when the provider does not support signatures.
    pub async fn verify_master_key_metadata(&self, value: &CekValue, signature: &[u8]) -> Result<Option<bool>> {
        let provider = self.registry.require(&value.key_store_provider_name)?;
        Ok(provider
            .provider()
            .verify_column_master_key_metadata(
                &value.cmk_path,
                self.config.allow_enclave_computations,
                signature,
            )
            .await?)
    }
}

fn cipher_type_info(len: usize) -> TypeInfo {
    if len > MAX_INLINE_BINARY {
        TypeInfo::new(TypeId::BigVarBinary, tds_protocol::MAX_LENGTH)
    } else {
        TypeInfo::new(TypeId::BigVarBinary, MAX_INLINE_BINARY as u32)
    }
}

/// A parameter ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// `@`-prefixed name.
    pub name: String,
    /// Wire type; `varbinary` for encrypted parameters.
    pub type_info: TypeInfo,
    /// Value, or ciphertext bytes for encrypted parameters.
    pub value: SqlValue,
    /// Encryption metadata sent alongside encrypted parameters.
    pub crypto_metadata: Option<CryptoMetadata>,
}

impl BoundParameter {
    fn plaintext(name: String, value: SqlValue) -> Self {
        Self {
            name,
            type_info: param_type_info(&value),
            value,
            crypto_metadata: None,
        }
    }

    /// Whether the value was encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.crypto_metadata.is_some()
    }
}

#[derive(Debug, Clone)]
struct ColumnCipher {
    codec: AeadCodec,
    base_type: TypeInfo,
}

#[derive(Debug, Clone)]
struct ColumnSlot {
    type_info: TypeInfo,
    cipher: Option<ColumnCipher>,
}

/// Decrypts and decodes row values for one result set.
#[derive(Debug, Clone)]
pub struct ColumnDecryptor {
    columns: Vec<ColumnSlot>,
    codec: TypeCodec,
}

impl ColumnDecryptor {
    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the result set has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether `column` is encrypted.
    #[must_use]
    pub fn is_encrypted(&self, column: usize) -> bool {
        self.columns.get(column).is_some_and(|c| c.cipher.is_some())
    }

    /// The type values of `column` decode to.
    #[must_use]
    pub fn value_type(&self, column: usize) -> Option<&TypeInfo> {
        self.columns.get(column).map(|c| match &c.cipher {
            Some(cipher) => &cipher.base_type,
            None => &c.type_info,
        })
    }

    /// Decode one value. `None` is SQL `NULL`.
    ///
    /// Encrypted columns are authenticated and decrypted first, then decoded
    /// under their original type.
    pub fn decrypt_value(&self, column: usize, raw: Option<&[u8]>) -> Result<SqlValue> {
        let slot = self
            .columns
            .get(column)
            .ok_or_else(|| Error::Config(format!("column index {column} out of range")))?;
        let Some(raw) = raw else {
            return Ok(SqlValue::Null);
        };
        match &slot.cipher {
            None => Ok(self.codec.decode(&slot.type_info, raw)?),
            Some(cipher) => {
                let plaintext = cipher.codec.decrypt(raw)?;
                denormalize(&self.codec, &cipher.base_type, &plaintext)
            }
        }
    }

    /// Decode a whole row.
    pub fn decode_row(&self, raw: &[Option<Bytes>]) -> Result<Vec<SqlValue>> {
        raw.iter()
            .enumerate()
            .map(|(i, cell)| self.decrypt_value(i, cell.as_deref()))
            .collect()
    }
}

fn is_integer(type_id: TypeId) -> bool {
    matches!(
        type_id,
        TypeId::Int1 | TypeId::Int2 | TypeId::Int4 | TypeId::Int8 | TypeId::IntN
    )
}

fn is_bit(type_id: TypeId) -> bool {
    matches!(type_id, TypeId::Bit | TypeId::BitN)
}

/// Serialize a value for encryption under normalization rule version 1.
pub fn normalize(codec: &TypeCodec, base_type: &TypeInfo, value: &SqlValue) -> Result<Vec<u8>> {
    let id = base_type.type_id;
    if is_integer(id) || is_bit(id) {
        let n = match value {
            SqlValue::Bool(b) => i64::from(*b),
            other => other.as_i64().ok_or_else(|| TypeError::UnsupportedConversion {
                from: other.type_name().to_owned(),
                to: "BIGINT",
            })?,
        };
        let n = if is_bit(id) { i64::from(n != 0) } else { n };
        return Ok(n.to_le_bytes().to_vec());
    }
    Ok(codec.encode(base_type, value)?)
}

/// Inverse of [`normalize`].
pub fn denormalize(codec: &TypeCodec, base_type: &TypeInfo, plaintext: &[u8]) -> Result<SqlValue> {
    let id = base_type.type_id;
    if !(is_integer(id) || is_bit(id)) {
        return Ok(codec.decode(base_type, plaintext)?);
    }

    let bytes: [u8; 8] = plaintext.try_into().map_err(|_| TypeError::InvalidLength {
        type_name: "normalized integer",
        length: plaintext.len(),
    })?;
    let n = i64::from_le_bytes(bytes);
    if is_bit(id) {
        return Ok(SqlValue::Bool(n != 0));
    }

    let width = match id {
        TypeId::IntN => base_type.size as usize,
        other => other.fixed_size().unwrap_or(8),
    };
    let out_of_range = |target_type| Error::Type(TypeError::OutOfRange { target_type });
    Ok(match width {
        1 => SqlValue::TinyInt(u8::try_from(n).map_err(|_| out_of_range("TINYINT"))?),
        2 => SqlValue::SmallInt(i16::try_from(n).map_err(|_| out_of_range("SMALLINT"))?),
        4 => SqlValue::Int(i32::try_from(n).map_err(|_| out_of_range("INT"))?),
        _ => SqlValue::BigInt(n),
    })
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tds_protocol::{CekTable, ColumnDescriptor};

    use super::*;
    use crate::cmk::CmkProvider;
    use crate::statement::{DescribeCekRow, DescribeParamRow};

    const PROVIDER: &str = "TEST_PROVIDER";
    const ROOT_KEY: [u8; 32] = [0x24; 32];

    /// Treats the encrypted CEK as the plaintext CEK.
    struct IdentityProvider;

    #[async_trait]
    impl CmkProvider for IdentityProvider {
        async fn decrypt_column_encryption_key(
            &self,
            _master_key_path: &str,
            _encryption_algorithm: &str,
            encrypted_cek: &[u8],
        ) -> std::result::Result<Vec<u8>, CmkError> {
            Ok(encrypted_cek.to_vec())
        }

        async fn encrypt_column_encryption_key(
            &self,
            _master_key_path: &str,
            _encryption_algorithm: &str,
            cek: &[u8],
        ) -> std::result::Result<Vec<u8>, CmkError> {
            Ok(cek.to_vec())
        }

        async fn sign_column_master_key_metadata(
            &self,
            _master_key_path: &str,
            _allow_enclave_computations: bool,
        ) -> std::result::Result<Option<Vec<u8>>, CmkError> {
            Ok(None)
        }

        async fn verify_column_master_key_metadata(
            &self,
            _master_key_path: &str,
            allow_enclave_computations: bool,
            _signature: &[u8],
        ) -> std::result::Result<Option<bool>, CmkError> {
            Ok(Some(allow_enclave_computations))
        }

        fn key_lifetime(&self) -> Option<Duration> {
            Some(Duration::from_secs(60))
        }
    }

    fn pipeline(config: EncryptionConfig) -> EncryptionPipeline {
        let registry = CmkProviderRegistry::new();
        registry.register(PROVIDER, Arc::new(IdentityProvider)).unwrap();
        EncryptionPipeline::new(Arc::new(registry), config).for_server("server1")
    }

    fn cek_value(path: &str) -> CekValue {
        CekValue {
            encrypted_value: Bytes::copy_from_slice(&ROOT_KEY),
            key_store_provider_name: PROVIDER.into(),
            cmk_path: path.into(),
            encryption_algorithm: "RSA_OAEP".into(),
        }
    }

    fn cek_entry(values: Vec<CekValue>) -> CekTableEntry {
        CekTableEntry {
            database_id: 1,
            cek_id: 1,
            cek_version: 1,
            cek_md_version: [0; 8],
            values,
        }
    }

    fn crypto(base_type: TypeInfo, encryption_type: EncryptionType) -> CryptoMetadata {
        CryptoMetadata {
            cek_table_ordinal: 0,
            user_type: 0,
            base_type,
            algorithm_id: ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256,
            algorithm_name: None,
            encryption_type,
            normalization_version: RULE_VERSION,
        }
    }

    fn metadata(columns: Vec<ColumnDescriptor>) -> ColMetaData {
        ColMetaData {
            cek_table: CekTable {
                entries: vec![cek_entry(vec![cek_value("/keys/a")])],
            },
            columns,
        }
    }

    #[tokio::test]
    async fn test_decrypts_encrypted_column_to_base_type() {
        let p = pipeline(EncryptionConfig::new());
        let meta = metadata(vec![
            ColumnDescriptor::new("id", TypeInfo::new(TypeId::IntN, 4)),
            ColumnDescriptor::encrypted(
                "ssn",
                crypto(TypeInfo::new(TypeId::NVarChar, 22), EncryptionType::Deterministic),
            ),
        ]);
        let decryptor = p.column_decryptor(&meta).await.unwrap();
        assert!(!decryptor.is_encrypted(0));
        assert!(decryptor.is_encrypted(1));
        assert_eq!(decryptor.value_type(1).unwrap().type_id, TypeId::NVarChar);

        let codec = AeadCodec::from_root_key(&ROOT_KEY, EncryptionType::Deterministic).unwrap();
        let plaintext = normalize(
            &TypeCodec::new(),
            &TypeInfo::new(TypeId::NVarChar, 22),
            &SqlValue::from("123-45-6789"),
        )
        .unwrap();
        let cipher = codec.encrypt(&plaintext).unwrap();

        let row = decryptor
            .decode_row(&[
                Some(Bytes::from_static(&[7, 0, 0, 0])),
                Some(Bytes::from(cipher)),
            ])
            .unwrap();
        assert_eq!(row, vec![SqlValue::Int(7), SqlValue::from("123-45-6789")]);
        assert_eq!(decryptor.decrypt_value(1, None).unwrap(), SqlValue::Null);
    }

    #[tokio::test]
    async fn test_tampered_cell_is_fatal() {
        let p = pipeline(EncryptionConfig::new());
        let meta = metadata(vec![ColumnDescriptor::encrypted(
            "c",
            crypto(TypeInfo::new(TypeId::IntN, 4), EncryptionType::Randomized),
        )]);
        let decryptor = p.column_decryptor(&meta).await.unwrap();

        let codec = AeadCodec::from_root_key(&ROOT_KEY, EncryptionType::Randomized).unwrap();
        let mut cipher = codec.encrypt(&5i64.to_le_bytes()).unwrap();
        assert_eq!(decryptor.decrypt_value(0, Some(&cipher)).unwrap(), SqlValue::Int(5));

        let last = cipher.len() - 1;
        cipher[last] ^= 1;
        let err = decryptor.decrypt_value(0, Some(&cipher)).unwrap_err();
        assert!(err.is_crypto_validation());
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unknown_ordinal_and_disabled_config() {
        let p = pipeline(EncryptionConfig::new());
        let mut meta = metadata(vec![ColumnDescriptor::encrypted(
            "c",
            crypto(TypeInfo::new(TypeId::IntN, 4), EncryptionType::Deterministic),
        )]);
        meta.cek_table.entries.clear();
        assert!(matches!(
            p.column_decryptor(&meta).await,
            Err(Error::UnknownCekOrdinal(0))
        ));

        let disabled = pipeline(EncryptionConfig::disabled());
        assert!(matches!(
            disabled.column_decryptor(&metadata(vec![ColumnDescriptor::encrypted(
                "c",
                crypto(TypeInfo::new(TypeId::IntN, 4), EncryptionType::Deterministic),
            )]))
            .await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_encrypted_flag_requires_crypto_metadata() {
        let p = pipeline(EncryptionConfig::new());
        let mut column = ColumnDescriptor::encrypted(
            "ssn",
            crypto(TypeInfo::new(TypeId::NVarChar, 22), EncryptionType::Deterministic),
        );
        column.crypto_metadata = None;
        let err = p.column_decryptor(&metadata(vec![column])).await.unwrap_err();
        assert!(matches!(err, Error::MissingCryptoMetadata(ref name) if name == "ssn"));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unsupported_algorithm() {
        let p = pipeline(EncryptionConfig::new());
        let mut cm = crypto(TypeInfo::new(TypeId::IntN, 4), EncryptionType::Deterministic);
        cm.algorithm_id = 0;
        cm.algorithm_name = Some("CUSTOM_ALG".into());
        let err = p
            .column_decryptor(&metadata(vec![ColumnDescriptor::encrypted("c", cm)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(ref name) if name == "CUSTOM_ALG"));
    }

    #[tokio::test]
    async fn test_resolve_cek_falls_back_across_values() {
        let p = pipeline(EncryptionConfig::new());
        let mut missing = cek_value("/keys/a");
        missing.key_store_provider_name = "MISSING".into();

        let key = p
            .resolve_cek(0, &cek_entry(vec![missing.clone(), cek_value("/keys/b")]))
            .await
            .unwrap();
        assert_eq!(key.as_slice(), &ROOT_KEY);

        let err = p.resolve_cek(0, &cek_entry(vec![missing])).await.unwrap_err();
        assert!(matches!(err, Error::ProviderNotRegistered(ref n) if n == "MISSING"));

        let err = p.resolve_cek(3, &cek_entry(vec![])).await.unwrap_err();
        assert!(matches!(err, Error::EmptyCekEntry(3)));
    }

    #[tokio::test]
    async fn test_untrusted_key_path_is_rejected() {
        let p = pipeline(EncryptionConfig::new().trusted_key_paths("server1", ["/keys/trusted"]));
        let err = p
            .resolve_cek(0, &cek_entry(vec![cek_value("/keys/other")]))
            .await
            .unwrap_err();
        assert!(err.is_key_resolution());
        assert!(err.is_fatal());
        assert!(p.resolve_cek(0, &cek_entry(vec![cek_value("/keys/trusted")])).await.is_ok());
    }

    fn describe(encryption_type: u8) -> ParameterEncryptionInfo {
        ParameterEncryptionInfo::from_describe_results(
            vec![DescribeCekRow {
                ordinal: 1,
                database_id: 1,
                cek_id: 1,
                cek_version: 1,
                metadata_version: [0; 8],
                encrypted_value: Bytes::copy_from_slice(&ROOT_KEY),
                key_store_provider_name: PROVIDER.into(),
                cmk_path: "/keys/a".into(),
                encryption_algorithm: "RSA_OAEP".into(),
            }],
            vec![DescribeParamRow {
                ordinal: 1,
                name: "@ssn".into(),
                algorithm_id: ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256,
                encryption_type,
                cek_ordinal: 1,
                rule_version: 1,
            }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_encrypt_parameters() {
        let p = pipeline(EncryptionConfig::new());
        let info = describe(1);
        let params = [
            Parameter::named("ssn", 1, "123-45-6789"),
            Parameter::named("plain", 2, 5i32),
        ];

        let bound = p.encrypt_parameters(&info, &params).await.unwrap();
        assert_eq!(bound.len(), 2);
        assert!(bound[0].is_encrypted());
        assert_eq!(bound[0].name, "@ssn");
        assert_eq!(bound[0].type_info.type_id, TypeId::BigVarBinary);
        let cm = bound[0].crypto_metadata.as_ref().unwrap();
        assert_eq!(cm.cek_table_ordinal, 1);
        assert_eq!(cm.base_type.type_id, TypeId::NVarChar);

        assert!(!bound[1].is_encrypted());
        assert_eq!(bound[1].value, SqlValue::Int(5));

        // Deterministic: same input, same ciphertext; and it decrypts back.
        let again = p.encrypt_parameters(&info, &params).await.unwrap();
        assert_eq!(bound[0].value, again[0].value);

        let codec = AeadCodec::from_root_key(&ROOT_KEY, EncryptionType::Deterministic).unwrap();
        let plaintext = codec.decrypt(bound[0].value.as_bytes().unwrap()).unwrap();
        assert_eq!(
            denormalize(&TypeCodec::new(), &cm.base_type, &plaintext).unwrap(),
            SqlValue::from("123-45-6789")
        );
    }

    #[tokio::test]
    async fn test_missing_described_parameter() {
        let p = pipeline(EncryptionConfig::new());
        let err = p
            .encrypt_parameters(&describe(2), &[Parameter::named("other", 1, 1i32)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParameterNotDescribed(ref n) if n == "@ssn"));
    }

    #[tokio::test]
    async fn test_null_parameter_stays_null() {
        let p = pipeline(EncryptionConfig::new());
        let bound = p
            .encrypt_parameters(&describe(2), &[Parameter::named("@ssn", 1, SqlValue::Null)])
            .await
            .unwrap();
        assert_eq!(bound[0].value, SqlValue::Null);
        assert!(bound[0].is_encrypted());
    }

    #[tokio::test]
    async fn test_verify_master_key_metadata_passes_enclave_flag() {
        let p = pipeline(EncryptionConfig::new().allow_enclave_computations(true));
        assert_eq!(
            p.verify_master_key_metadata(&cek_value("/keys/a"), &[]).await.unwrap(),
            Some(true)
        );
    }

    #[test]
    fn test_integer_normalization() {
        let codec = TypeCodec::new();
        let tiny = TypeInfo::new(TypeId::IntN, 1);
        let bytes = normalize(&codec, &tiny, &SqlValue::TinyInt(200)).unwrap();
        assert_eq!(bytes, 200i64.to_le_bytes());
        assert_eq!(denormalize(&codec, &tiny, &bytes).unwrap(), SqlValue::TinyInt(200));

        let small = TypeInfo::fixed(TypeId::Int2);
        let bytes = normalize(&codec, &small, &SqlValue::SmallInt(-3)).unwrap();
        assert_eq!(denormalize(&codec, &small, &bytes).unwrap(), SqlValue::SmallInt(-3));

        let bit = TypeInfo::new(TypeId::BitN, 1);
        let bytes = normalize(&codec, &bit, &SqlValue::Bool(true)).unwrap();
        assert_eq!(bytes, 1i64.to_le_bytes());
        assert_eq!(denormalize(&codec, &bit, &bytes).unwrap(), SqlValue::Bool(true));

        let out_of_range = 70_000i64.to_le_bytes();
        assert!(denormalize(&codec, &small, &out_of_range).is_err());
        assert!(denormalize(&codec, &small, &[1, 2]).is_err());
    }

    #[test]
    fn test_other_types_use_wire_encoding() {
        let codec = TypeCodec::new();
        let date = TypeInfo::fixed(TypeId::Date);
        let value = SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let bytes = normalize(&codec, &date, &value).unwrap();
        assert_eq!(bytes.len(), 3);
        assert_eq!(denormalize(&codec, &date, &bytes).unwrap(), value);
    }
}
