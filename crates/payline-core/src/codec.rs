//! Inner serializers wrapped by the signed envelope.
//!
//! A [`Codec`] turns values into bytes and back. It also knows how to carry an
//! already serialized payload inside a larger message without re-escaping it
//! (its `Raw` form), which is what keeps envelope payloads byte-exact.

use serde::de::DeserializeOwned;
use serde::Serialize;
use ciborium::value::Value;
use serde_json::value::RawValue;

use crate::error::CodecError;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// A format-agnostic serializer.
pub trait Codec: Send + Sync {
    /// Pre-serialized value embedded verbatim into an outer message.
    type Raw: Serialize + DeserializeOwned;

    /// Serialize a value.
    fn pack<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize into the caller's target type.
    fn unpack<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Wrap bytes produced by [`Codec::pack`] so they embed without re-encoding.
    fn to_raw(&self, bytes: &[u8]) -> Result<Self::Raw>;

    /// Recover the exact bytes of an embedded raw value.
    fn from_raw(&self, raw: &Self::Raw) -> Result<Vec<u8>>;
}

/// JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    type Raw = Box<RawValue>;

    fn pack<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encoding(e.to_string()))
    }

    fn unpack<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decoding(e.to_string()))
    }

    fn to_raw(&self, bytes: &[u8]) -> Result<Self::Raw> {
        let text =
            String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::Encoding(e.to_string()))?;
        RawValue::from_string(text).map_err(|e| CodecError::Encoding(e.to_string()))
    }

    fn from_raw(&self, raw: &Self::Raw) -> Result<Vec<u8>> {
        Ok(raw.get().as_bytes().to_vec())
    }
}

/// CBOR tag for an encoded CBOR data item carried in a byte string.
pub const ENCODED_CBOR_TAG: u64 = 24;

/// CBOR via `ciborium`.
///
/// CBOR has no verbatim splice, so the raw form is the item's bytes wrapped in
/// tag 24. Decoding and re-encoding is never involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl CborCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for CborCodec {
    type Raw = Value;

    fn pack<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).map_err(|e| CodecError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    fn unpack<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        ciborium::from_reader(bytes).map_err(|e| CodecError::Decoding(e.to_string()))
    }

    fn to_raw(&self, bytes: &[u8]) -> Result<Self::Raw> {
        // Reject anything that is not a well-formed item.
        ciborium::from_reader::<Value, _>(bytes).map_err(|e| CodecError::Encoding(e.to_string()))?;
        Ok(Value::Tag(
            ENCODED_CBOR_TAG,
            Box::new(Value::Bytes(bytes.to_vec())),
        ))
    }

    fn from_raw(&self, raw: &Self::Raw) -> Result<Vec<u8>> {
        match raw {
            Value::Tag(ENCODED_CBOR_TAG, inner) => match inner.as_ref() {
                Value::Bytes(bytes) => Ok(bytes.clone()),
                _ => Err(CodecError::Decoding("tag 24 must wrap a byte string".into())),
            },
            _ => Err(CodecError::Decoding(
                "expected an embedded CBOR item (tag 24)".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Custom {
        field: i32,
    }

    #[test]
    fn test_json_pack_unpack() {
        let codec = JsonCodec::new();
        let bytes = codec.pack(&Custom { field: 123 }).unwrap();
        assert_eq!(bytes, br#"{"field":123}"#);

        let back: Custom = codec.unpack(&bytes).unwrap();
        assert_eq!(back, Custom { field: 123 });
    }

    #[test]
    fn test_json_raw_is_verbatim() {
        let codec = JsonCodec::new();
        let bytes = codec.pack("hello \"name\"").unwrap();
        let raw = codec.to_raw(&bytes).unwrap();
        assert_eq!(codec.from_raw(&raw).unwrap(), bytes);
    }

    #[test]
    fn test_json_type_mismatch() {
        let codec = JsonCodec::new();
        let result: Result<String> = codec.unpack(b"true");
        assert!(matches!(result, Err(CodecError::Decoding(_))));
    }

    #[test]
    fn test_cbor_raw_roundtrip() {
        let codec = CborCodec::new();
        let bytes = codec.pack(&Custom { field: -7 }).unwrap();
        let raw = codec.to_raw(&bytes).unwrap();
        assert_eq!(codec.from_raw(&raw).unwrap(), bytes);

        let back: Custom = codec.unpack(&bytes).unwrap();
        assert_eq!(back.field, -7);
    }

    #[test]
    fn test_cbor_raw_keeps_non_minimal_encoding() {
        let codec = CborCodec::new();
        // 5 as a two-byte integer; ciborium itself would write 0x05.
        let bytes = [0x19, 0x00, 0x05];
        let raw = codec.to_raw(&bytes).unwrap();
        assert_eq!(codec.from_raw(&raw).unwrap(), bytes);

        let value: u64 = codec.unpack(&bytes).unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn test_cbor_raw_rejects_bare_item() {
        let codec = CborCodec::new();
        assert!(matches!(
            codec.from_raw(&Value::Integer(5.into())),
            Err(CodecError::Decoding(_))
        ));
        assert!(matches!(codec.to_raw(&[0x19]), Err(CodecError::Encoding(_))));
    }
}
