//! Always Encrypted cryptography metadata for TDS protocol.
//!
//! This module defines the wire-level structures for SQL Server's Always Encrypted
//! feature. When a query returns encrypted columns, SQL Server sends additional
//! metadata describing how to decrypt the data.
//!
//! ## TDS Wire Format
//!
//! When column encryption has been negotiated, the COLMETADATA token includes:
//!
//! 1. **CEK Table**: A table of Column Encryption Keys needed for the result set
//! 2. **CryptoMetadata**: Per-column encryption information
//!
//! ```text
//! COLMETADATA Token (with encryption):
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Column Count (2 bytes)                                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ CEK Table                                                       │
//! │ ├── CEK Count (2 bytes)                                         │
//! │ ├── CEK Entry 1                                                 │
//! │ │   ├── Database ID (4 bytes)                                   │
//! │ │   ├── CEK ID (4 bytes)                                        │
//! │ │   ├── CEK Version (4 bytes)                                   │
//! │ │   ├── CEK MD Version (8 bytes)                                │
//! │ │   ├── CEK Value Count (2 bytes)                               │
//! │ │   └── CEK Value(s)                                            │
//! │ │       ├── Encrypted Value Length (2 bytes)                    │
//! │ │       ├── Encrypted Value (variable)                          │
//! │ │       ├── Key Store Name (B_VARCHAR)                          │
//! │ │       ├── CMK Path (US_VARCHAR)                               │
//! │ │       └── Algorithm (B_VARCHAR)                               │
//! │ └── ...more CEK entries                                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Column Definitions                                              │
//! │ ├── Column 1                                                    │
//! │ │   ├── User Type (4 bytes)                                     │
//! │ │   ├── Flags (2 bytes) - includes encryption flag              │
//! │ │   ├── TYPE_INFO (cipher type, varbinary)                      │
//! │ │   ├── CryptoMetadata (if encrypted)                           │
//! │ │   │   ├── CEK Table Ordinal (2 bytes)                         │
//! │ │   │   ├── User Type (4 bytes)                                 │
//! │ │   │   ├── Base TYPE_INFO (original type)                      │
//! │ │   │   ├── Algorithm ID (1 byte) [+ name if custom]            │
//! │ │   │   ├── Encryption Type (1 byte)                            │
//! │ │   │   └── Normalization Version (1 byte)                      │
//! │ │   └── Column Name (B_VARCHAR)                                 │
//! │ └── ...more columns                                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use bytes::{Buf, BufMut, Bytes};

use crate::codec::{read_b_varchar, read_us_varchar, write_b_varchar, write_us_varchar};
use crate::error::ProtocolError;
use crate::metadata::TypeInfo;

/// Algorithm ID for a custom (named) algorithm.
pub const ALGORITHM_CUSTOM: u8 = 0;

/// Algorithm ID for AEAD_AES_256_CBC_HMAC_SHA256.
pub const ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256: u8 = 2;

/// Name of the AEAD_AES_256_CBC_HMAC_SHA256 algorithm.
pub const ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256_NAME: &str = "AEAD_AES_256_CBC_HMAC_SHA256";

/// Current normalization rule version.
pub const NORMALIZATION_RULE_VERSION: u8 = 1;

/// Column encryption type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EncryptionType {
    /// Not encrypted (value 0).
    Plaintext = 0,
    /// Deterministic encryption (value 1).
    Deterministic = 1,
    /// Randomized encryption (value 2).
    Randomized = 2,
}

impl EncryptionType {
    /// Create from wire value.
    ///
    /// Unknown values are rejected rather than treated as plaintext.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Plaintext),
            1 => Ok(Self::Deterministic),
            2 => Ok(Self::Randomized),
            _ => Err(ProtocolError::InvalidField {
                field: "encryption_type",
                value: u32::from(value),
            }),
        }
    }

    /// Convert to wire value.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plaintext => "Plaintext",
            Self::Deterministic => "Deterministic",
            Self::Randomized => "Randomized",
        }
    }

    /// Whether the same plaintext always yields the same ciphertext.
    #[must_use]
    pub const fn is_deterministic(self) -> bool {
        matches!(self, Self::Deterministic)
    }
}

/// Column Encryption Key table entry.
///
/// This represents a single CEK entry in the CEK table sent with COLMETADATA.
/// Multiple columns may share the same CEK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CekTableEntry {
    /// Database ID where the CEK is defined.
    pub database_id: u32,
    /// CEK ID within the database.
    pub cek_id: u32,
    /// CEK version (incremented on key rotation).
    pub cek_version: u32,
    /// Metadata version (changes with any metadata update).
    pub cek_md_version: [u8; 8],
    /// CEK value entries (usually one, but may have multiple for key rotation).
    pub values: Vec<CekValue>,
}

/// A single CEK value (encrypted by CMK).
///
/// A CEK may have multiple values when key rotation is in progress,
/// with different CMKs encrypting the same CEK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CekValue {
    /// The encrypted CEK bytes.
    pub encrypted_value: Bytes,
    /// Name of the key store provider (e.g., "AZURE_KEY_VAULT").
    pub key_store_provider_name: String,
    /// Path to the Column Master Key in the key store.
    pub cmk_path: String,
    /// Asymmetric algorithm used to encrypt the CEK (e.g., "RSA_OAEP").
    pub encryption_algorithm: String,
}

/// Per-column (or per-parameter) encryption metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoMetadata {
    /// Index into the CEK table (0-based).
    pub cek_table_ordinal: u16,
    /// User type of the original column.
    pub user_type: u32,
    /// The column's type before encryption was applied.
    pub base_type: TypeInfo,
    /// Encryption algorithm ID.
    pub algorithm_id: u8,
    /// Algorithm name, present only for custom algorithms.
    pub algorithm_name: Option<String>,
    /// Encryption type.
    pub encryption_type: EncryptionType,
    /// Normalization rule version.
    pub normalization_version: u8,
}

/// CEK table containing all Column Encryption Keys needed for a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CekTable {
    /// CEK entries.
    pub entries: Vec<CekTableEntry>,
}

impl CekTable {
    /// Create an empty CEK table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a CEK entry by ordinal.
    #[must_use]
    pub fn get(&self, ordinal: u16) -> Option<&CekTableEntry> {
        self.entries.get(ordinal as usize)
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Decode a CEK table from the wire format.
    ///
    /// # Wire Format
    ///
    /// ```text
    /// CEK_TABLE:
    ///   cek_count: USHORT (2 bytes)
    ///   entries: CEK_ENTRY[cek_count]
    ///
    /// CEK_ENTRY:
    ///   database_id: DWORD (4 bytes)
    ///   cek_id: DWORD (4 bytes)
    ///   cek_version: DWORD (4 bytes)
    ///   cek_md_version: BYTE[8]
    ///   value_count: USHORT (2 bytes)
    ///   values: CEK_VALUE[value_count]
    ///
    /// CEK_VALUE:
    ///   encrypted_value_length: USHORT (2 bytes)
    ///   encrypted_value: BYTE[encrypted_value_length]
    ///   key_store_name: B_VARCHAR
    ///   cmk_path: US_VARCHAR
    ///   algorithm: B_VARCHAR
    /// ```
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let cek_count = src.get_u16_le() as usize;

        // Bound the pre-allocation by what the buffer could possibly hold.
        let mut entries = Vec::with_capacity(cek_count.min(src.remaining() / 22));

        for _ in 0..cek_count {
            entries.push(CekTableEntry::decode(src)?);
        }

        Ok(Self { entries })
    }

    /// Encode the CEK table to the wire format.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.entries.len() as u16);
        for entry in &self.entries {
            entry.encode(dst);
        }
    }
}

impl CekTableEntry {
    /// Fixed-size prefix of an entry on the wire.
    const HEADER_SIZE: usize = 22;

    /// Decode a CEK table entry from the wire format.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        // database_id (4) + cek_id (4) + cek_version (4) + cek_md_version (8) + value_count (2)
        if src.remaining() < Self::HEADER_SIZE {
            return Err(ProtocolError::UnexpectedEof);
        }

        let database_id = src.get_u32_le();
        let cek_id = src.get_u32_le();
        let cek_version = src.get_u32_le();
        let mut cek_md_version = [0u8; 8];
        src.copy_to_slice(&mut cek_md_version);
        let value_count = src.get_u16_le() as usize;

        let mut values = Vec::with_capacity(value_count.min(src.remaining() / 5));

        for _ in 0..value_count {
            values.push(CekValue::decode(src)?);
        }

        Ok(Self {
            database_id,
            cek_id,
            cek_version,
            cek_md_version,
            values,
        })
    }

    /// Encode the entry to the wire format.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.database_id);
        dst.put_u32_le(self.cek_id);
        dst.put_u32_le(self.cek_version);
        dst.put_slice(&self.cek_md_version);
        dst.put_u16_le(self.values.len() as u16);
        for value in &self.values {
            value.encode(dst);
        }
    }

    /// Get the first (primary) encrypted value.
    #[must_use]
    pub fn primary_value(&self) -> Option<&CekValue> {
        self.values.first()
    }
}

impl CekValue {
    /// Decode a CEK value from the wire format.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let encrypted_value_length = src.get_u16_le() as usize;

        if src.remaining() < encrypted_value_length {
            return Err(ProtocolError::IncompletePacket {
                expected: encrypted_value_length,
                actual: src.remaining(),
            });
        }

        let encrypted_value = src.copy_to_bytes(encrypted_value_length);
        let key_store_provider_name = read_b_varchar(src)?;
        let cmk_path = read_us_varchar(src)?;
        let encryption_algorithm = read_b_varchar(src)?;

        Ok(Self {
            encrypted_value,
            key_store_provider_name,
            cmk_path,
            encryption_algorithm,
        })
    }

    /// Encode the value to the wire format.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.encrypted_value.len() as u16);
        dst.put_slice(&self.encrypted_value);
        write_b_varchar(dst, &self.key_store_provider_name);
        write_us_varchar(dst, &self.cmk_path);
        write_b_varchar(dst, &self.encryption_algorithm);
    }
}

impl CryptoMetadata {
    /// Decode crypto metadata from the wire format.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 6 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let cek_table_ordinal = src.get_u16_le();
        let user_type = src.get_u32_le();
        let base_type = TypeInfo::decode(src)?;

        if src.remaining() < 1 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let algorithm_id = src.get_u8();
        let algorithm_name = if algorithm_id == ALGORITHM_CUSTOM {
            Some(read_b_varchar(src)?)
        } else {
            None
        };

        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let encryption_type = EncryptionType::from_u8(src.get_u8())?;
        let normalization_version = src.get_u8();

        Ok(Self {
            cek_table_ordinal,
            user_type,
            base_type,
            algorithm_id,
            algorithm_name,
            encryption_type,
            normalization_version,
        })
    }

    /// Encode crypto metadata to the wire format.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.cek_table_ordinal);
        dst.put_u32_le(self.user_type);
        self.base_type.encode(dst);
        dst.put_u8(self.algorithm_id);
        if self.algorithm_id == ALGORITHM_CUSTOM {
            write_b_varchar(dst, self.algorithm_name.as_deref().unwrap_or_default());
        }
        dst.put_u8(self.encryption_type.to_u8());
        dst.put_u8(self.normalization_version);
    }

    /// Check if this uses the standard AEAD algorithm.
    #[must_use]
    pub fn is_aead_aes_256(&self) -> bool {
        self.algorithm_id == ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256
    }

    /// Algorithm name as used by the cryptography layer.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        match (&self.algorithm_name, self.algorithm_id) {
            (Some(name), _) => name,
            (None, ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256) => {
                ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256_NAME
            }
            (None, _) => "",
        }
    }
}
