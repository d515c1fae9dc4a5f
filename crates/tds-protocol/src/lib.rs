//! # tds-protocol
//!
//! Wire structures of the MS-TDS (Tabular Data Stream) protocol that describe
//! column types and Always Encrypted metadata.
//!
//! This crate covers the pieces of the token stream a type codec and an
//! encryption pipeline need: `TYPE_INFO` blocks, column metadata with its CEK
//! table and per-column crypto metadata, the feature-extension
//! acknowledgement, and collation-driven code page selection for narrow
//! character data.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no networking logic and
//! makes no assumptions about the async runtime. Higher-level crates build upon
//! this foundation.
//!
//! ## Example
//!
//! ```rust
//! use tds_protocol::{TypeId, TypeInfo};
//!
//! let mut wire: &[u8] = &[0x6A, 0x09, 0x12, 0x04];
//! let info = TypeInfo::decode(&mut wire).unwrap();
//! assert_eq!(info.type_id, TypeId::DecimalN);
//! assert_eq!((info.precision, info.scale), (18, 4));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod collation;
pub mod crypto;
pub mod error;
pub mod feature_ext;
pub mod metadata;
pub mod types;

pub use collation::{Charset, Collation, CollationFlags};
pub use crypto::{
    CekTable, CekTableEntry, CekValue, CryptoMetadata, EncryptionType,
    ALGORITHM_AEAD_AES_256_CBC_HMAC_SHA256_NAME,
};
pub use error::ProtocolError;
pub use feature_ext::{FeatureAck, FeatureExtAck, FeatureId};
pub use metadata::{
    ColMetaData, ColumnDescriptor, TypeInfo, UdtInfo, XmlSchema, MAX_LENGTH,
};
pub use types::{ColumnFlags, TypeId, Updateable};
