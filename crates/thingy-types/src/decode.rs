//! Payload decoders for the tag's characteristics.
//!
//! Both characteristics carry an unsigned 16-bit little-endian integer at
//! offset 0. The value is passed through as-is: the tag's firmware units are
//! not converted to degrees Celsius or angles.

use bytes::Buf;

use crate::error::{ParseError, ParseResult};
use crate::types::SensorKind;

/// Minimum payload length accepted by the decoders.
pub const MIN_PAYLOAD_LEN: usize = 2;

/// Read the unsigned 16-bit little-endian value at offset 0.
pub fn decode_u16_le(payload: &[u8]) -> ParseResult<f64> {
    if payload.len() < MIN_PAYLOAD_LEN {
        return Err(ParseError::insufficient(MIN_PAYLOAD_LEN, payload.len()));
    }
    let mut buf = payload;
    Ok(f64::from(buf.get_u16_le()))
}

/// Decode a temperature notification.
pub fn decode_temperature(payload: &[u8]) -> ParseResult<f64> {
    decode_u16_le(payload)
}

/// Decode a rotary notification.
pub fn decode_rotary(payload: &[u8]) -> ParseResult<f64> {
    decode_u16_le(payload)
}

/// Alternate readings of a payload that the decoders do not use.
///
/// Earlier firmware tooling read the payload big-endian, as a signed integer
/// plus a secondary field. Those readings are kept for trace logging while
/// the unit question stays open. They never change the decoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInterpretation {
    /// The value the decoder returns.
    pub value: u16,
    /// Big-endian signed integer at offset 0.
    pub signed_be: i16,
    /// Big-endian unsigned secondary field (offset 1 for temperature,
    /// offset 0 for rotary). `None` when the payload is too short.
    pub secondary_be: Option<u16>,
}

/// Compute every interpretation of a payload for diagnostics.
pub fn inspect(kind: SensorKind, payload: &[u8]) -> ParseResult<RawInterpretation> {
    if payload.len() < MIN_PAYLOAD_LEN {
        return Err(ParseError::insufficient(MIN_PAYLOAD_LEN, payload.len()));
    }

    let value = (&payload[..2]).get_u16_le();
    let signed_be = (&payload[..2]).get_i16();
    let offset = match kind {
        SensorKind::Temperature => 1,
        SensorKind::Rotary => 0,
    };
    let secondary_be = payload
        .get(offset..offset + 2)
        .map(|mut field| field.get_u16());

    Ok(RawInterpretation {
        value,
        signed_be,
        secondary_be,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_example_payload() {
        // 256 * 0 + 100
        assert_eq!(decode_temperature(&[0x64, 0x00]).unwrap(), 100.0);
        assert_eq!(decode_rotary(&[0x64, 0x00]).unwrap(), 100.0);
    }

    #[test]
    fn test_decode_is_little_endian() {
        assert_eq!(decode_u16_le(&[0x00, 0x01]).unwrap(), 256.0);
        assert_eq!(decode_u16_le(&[0xFF, 0xFF]).unwrap(), 65535.0);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(decode_temperature(&[0x2C, 0x01, 0xAA, 0xBB]).unwrap(), 300.0);
    }

    #[test]
    fn test_decode_short_payload() {
        let err = decode_temperature(&[0x01]).unwrap_err();
        assert_eq!(err, ParseError::insufficient(2, 1));
        assert!(err.to_string().contains("at least 2 bytes"));

        let err = decode_rotary(&[]).unwrap_err();
        assert_eq!(err, ParseError::insufficient(2, 0));
    }

    #[test]
    fn test_inspect_temperature_offsets() {
        let raw = inspect(SensorKind::Temperature, &[0x64, 0x00, 0x05]).unwrap();
        assert_eq!(raw.value, 100);
        assert_eq!(raw.signed_be, 0x6400);
        assert_eq!(raw.secondary_be, Some(0x0005));
    }

    #[test]
    fn test_inspect_temperature_two_bytes_has_no_secondary() {
        let raw = inspect(SensorKind::Temperature, &[0x64, 0x00]).unwrap();
        assert_eq!(raw.secondary_be, None);
    }

    #[test]
    fn test_inspect_rotary_offsets() {
        let raw = inspect(SensorKind::Rotary, &[0xFF, 0x7F]).unwrap();
        assert_eq!(raw.value, 0x7FFF);
        assert_eq!(raw.signed_be, -129);
        assert_eq!(raw.secondary_be, Some(0xFF7F));
    }

    proptest! {
        #[test]
        fn decoded_value_matches_le_encoding(value in any::<u16>(), tail in proptest::collection::vec(any::<u8>(), 0..8)) {
            let mut payload = value.to_le_bytes().to_vec();
            payload.extend(tail);
            prop_assert_eq!(decode_temperature(&payload).unwrap(), f64::from(value));
            prop_assert_eq!(decode_rotary(&payload).unwrap(), f64::from(value));
        }

        #[test]
        fn inspect_agrees_with_decoder(payload in proptest::collection::vec(any::<u8>(), 2..6)) {
            for kind in SensorKind::ALL {
                let raw = inspect(kind, &payload).unwrap();
                prop_assert_eq!(f64::from(raw.value), decode_u16_le(&payload).unwrap());
            }
        }
    }
}
