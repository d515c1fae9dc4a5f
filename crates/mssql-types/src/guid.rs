//! `UNIQUEIDENTIFIER` byte order.
//!
//! SQL Server stores the first three GUID fields (4, 2 and 2 bytes)
//! little-endian and the trailing 8 bytes as-is. `uuid::Uuid` holds the
//! RFC 4122 big-endian layout, so conversion swaps those three fields.

use uuid::Uuid;

use crate::error::TypeError;

/// Wire size of a `UNIQUEIDENTIFIER`.
pub const GUID_LEN: usize = 16;

/// Reverse the byte order of the first three GUID fields in place.
///
/// The operation is its own inverse.
pub fn swap_guid_bytes(bytes: &mut [u8; GUID_LEN]) {
    bytes[0..4].reverse();
    bytes[4..6].reverse();
    bytes[6..8].reverse();
}

/// Decode a GUID, converting from the mixed-endian wire layout when
/// `conversion` is on. With conversion off the bytes pass through unchanged.
pub fn decode_guid(raw: &[u8], conversion: bool) -> Result<Uuid, TypeError> {
    let mut bytes: [u8; GUID_LEN] = raw.try_into().map_err(|_| {
        if raw.len() < GUID_LEN {
            TypeError::short(GUID_LEN, raw.len())
        } else {
            TypeError::InvalidLength {
                type_name: "UNIQUEIDENTIFIER",
                length: raw.len(),
            }
        }
    })?;
    if conversion {
        swap_guid_bytes(&mut bytes);
    }
    Ok(Uuid::from_bytes(bytes))
}

/// Encode a GUID, the inverse of [`decode_guid`].
#[must_use]
pub fn encode_guid(uuid: &Uuid, conversion: bool) -> [u8; GUID_LEN] {
    let mut bytes = *uuid.as_bytes();
    if conversion {
        swap_guid_bytes(&mut bytes);
    }
    bytes
}
