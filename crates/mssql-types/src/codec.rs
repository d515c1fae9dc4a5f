//! Per-connection codec settings.

use bytes::{Bytes, BytesMut};
use tds_protocol::TypeInfo;

use crate::error::TypeError;
use crate::value::SqlValue;
use crate::{decode, encode};

/// Encodes and decodes values with a connection's settings applied.
///
/// The only setting today is GUID byte-order conversion, which is on by
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCodec {
    guid_conversion: bool,
}

impl Default for TypeCodec {
    fn default() -> Self {
        Self {
            guid_conversion: true,
        }
    }
}

impl TypeCodec {
    /// Create a codec with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable GUID byte-order conversion.
    #[must_use]
    pub fn with_guid_conversion(mut self, enabled: bool) -> Self {
        self.guid_conversion = enabled;
        self
    }

    /// Whether GUID byte-order conversion is enabled.
    #[must_use]
    pub fn guid_conversion(&self) -> bool {
        self.guid_conversion
    }

    /// Decode the bytes of one non-NULL value.
    pub fn decode(&self, type_info: &TypeInfo, raw: &[u8]) -> Result<SqlValue, TypeError> {
        decode::decode(type_info, raw, self.guid_conversion)
    }

    /// Encode one non-NULL value without a length prefix.
    pub fn encode(&self, type_info: &TypeInfo, value: &SqlValue) -> Result<Vec<u8>, TypeError> {
        encode::encode(type_info, value, self.guid_conversion)
    }

    /// Decode one length-prefixed value from row data.
    pub fn decode_value(&self, src: &mut Bytes, type_info: &TypeInfo) -> Result<SqlValue, TypeError> {
        decode::decode_value(src, type_info, self.guid_conversion)
    }

    /// Encode one value with its length prefix.
    pub fn encode_value(
        &self,
        dst: &mut BytesMut,
        type_info: &TypeInfo,
        value: &SqlValue,
    ) -> Result<(), TypeError> {
        encode::encode_value(dst, type_info, value, self.guid_conversion)
    }
}
