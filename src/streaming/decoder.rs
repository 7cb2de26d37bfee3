// Binary layouts of the sensor board characteristics
//
// - Readings characteristic: 4 x little-endian f32 (16 bytes)
// - Debug characteristic: 32 x little-endian u16 (64 bytes)

use super::record::{NormalizedRecord, RawRecord, NORMALIZED_LEN, RAW_LEN};
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Payload size of a normalized notification in bytes
pub const NORMALIZED_PAYLOAD_LEN: usize = NORMALIZED_LEN * 4;

/// Payload size of a raw/debug notification in bytes
pub const RAW_PAYLOAD_LEN: usize = RAW_LEN * 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{layout} payload must be {expected} bytes, received {actual}")]
pub struct DecodeError {
    pub layout: &'static str,
    pub expected: usize,
    pub actual: usize,
}

fn check_len(layout: &'static str, bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() != expected {
        return Err(DecodeError {
            layout,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Decode a readings notification into a normalized record
pub fn decode_normalized(bytes: &[u8]) -> Result<NormalizedRecord, DecodeError> {
    check_len("normalized", bytes, NORMALIZED_PAYLOAD_LEN)?;
    let mut values = [0f32; NORMALIZED_LEN];
    LittleEndian::read_f32_into(bytes, &mut values);
    Ok(NormalizedRecord::new(values))
}

/// Decode a debug notification into a raw record
pub fn decode_raw(bytes: &[u8]) -> Result<RawRecord, DecodeError> {
    check_len("raw", bytes, RAW_PAYLOAD_LEN)?;
    let mut values = [0u16; RAW_LEN];
    LittleEndian::read_u16_into(bytes, &mut values);
    Ok(RawRecord::new(values))
}
