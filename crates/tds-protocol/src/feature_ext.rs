//! FEATUREEXTACK token parsing.
//!
//! After LOGIN7 the server acknowledges each negotiated feature extension
//! with `(id, length, data)`. A lone `0xFF` terminates the list.

use bytes::{Buf, BufMut, Bytes};

use crate::error::ProtocolError;

/// Feature extension identifiers relevant to Always Encrypted sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FeatureId {
    /// Session recovery.
    SessionRecovery = 0x01,
    /// Federated authentication.
    FedAuth = 0x02,
    /// Column encryption.
    ColumnEncryption = 0x04,
    /// Global transactions.
    GlobalTransactions = 0x05,
    /// Azure SQL support.
    AzureSqlSupport = 0x08,
    /// Data classification.
    DataClassification = 0x09,
    /// UTF-8 support.
    Utf8Support = 0x0A,
    /// Azure SQL DNS caching.
    AzureSqlDnsCaching = 0x0B,
    /// Terminator.
    Terminator = 0xFF,
}

impl FeatureId {
    /// Create a feature id from a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::SessionRecovery),
            0x02 => Some(Self::FedAuth),
            0x04 => Some(Self::ColumnEncryption),
            0x05 => Some(Self::GlobalTransactions),
            0x08 => Some(Self::AzureSqlSupport),
            0x09 => Some(Self::DataClassification),
            0x0A => Some(Self::Utf8Support),
            0x0B => Some(Self::AzureSqlDnsCaching),
            0xFF => Some(Self::Terminator),
            _ => None,
        }
    }
}

/// Individual feature acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureAck {
    /// Raw feature id. Unknown ids are preserved.
    pub feature_id: u8,
    /// Feature data.
    pub data: Bytes,
}

/// Feature extension acknowledgment token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureExtAck {
    /// Acknowledged features in wire order.
    pub features: Vec<FeatureAck>,
}

impl FeatureExtAck {
    /// Feature terminator byte.
    pub const TERMINATOR: u8 = 0xFF;

    /// Decode a FEATUREEXTACK token body.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let mut features: Vec<FeatureAck> = Vec::new();

        loop {
            if !src.has_remaining() {
                return Err(ProtocolError::UnexpectedEof);
            }

            let feature_id = src.get_u8();
            if feature_id == Self::TERMINATOR {
                break;
            }

            if features.iter().any(|f| f.feature_id == feature_id) {
                return Err(ProtocolError::DuplicateFeature(feature_id));
            }

            if src.remaining() < 4 {
                return Err(ProtocolError::UnexpectedEof);
            }

            let data_len = src.get_u32_le() as usize;

            if src.remaining() < data_len {
                return Err(ProtocolError::IncompletePacket {
                    expected: data_len,
                    actual: src.remaining(),
                });
            }

            let data = src.copy_to_bytes(data_len);
            features.push(FeatureAck { feature_id, data });
        }

        Ok(Self { features })
    }

    /// Encode the token body, including the terminator.
    pub fn encode(&self, dst: &mut impl BufMut) {
        for feature in &self.features {
            dst.put_u8(feature.feature_id);
            dst.put_u32_le(feature.data.len() as u32);
            dst.put_slice(&feature.data);
        }
        dst.put_u8(Self::TERMINATOR);
    }

    /// Get the acknowledgment payload for a feature.
    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<&Bytes> {
        self.features
            .iter()
            .find(|f| f.feature_id == id as u8)
            .map(|f| &f.data)
    }

    /// The Always Encrypted version the server accepted, if any.
    #[must_use]
    pub fn column_encryption_version(&self) -> Option<u8> {
        self.get(FeatureId::ColumnEncryption)
            .and_then(|data| data.first().copied())
    }

    /// The federated authentication payload (nonce and signature), if any.
    #[must_use]
    pub fn fed_auth(&self) -> Option<&Bytes> {
        self.get(FeatureId::FedAuth)
    }
}
