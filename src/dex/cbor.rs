//! Shared CBOR/Plutus-datum decoding helpers used by every classifier.
//!
//! Plutus datums are CBOR-encoded constructor applications. Grounded in the
//! datum-decoding helpers used throughout the wider Cardano DEX-indexing
//! corpus (constructor-tag dispatch plus field extraction over
//! `ciborium::value::Value`).

use ciborium::value::Value;

use crate::error::{IndexerError, IndexerResult};

/// Decode raw CBOR bytes into a [`Value`] tree.
pub fn decode_cbor(bytes: &[u8]) -> IndexerResult<Value> {
    ciborium::de::from_reader(bytes)
        .map_err(|e| IndexerError::decoding(format!("invalid CBOR datum: {e}"), None))
}

/// If `value` is a Plutus constructor application, return its tag and
/// fields. Plutus encodes constructors as CBOR tag 121+n (for n < 7) wrapping
/// an array of fields, or tag 102 wrapping a `[tag, fields]` pair for larger
/// indices.
pub fn constr_fields(value: &Value) -> Option<(u64, &[Value])> {
    match value {
        Value::Tag(tag, boxed) => match boxed.as_ref() {
            Value::Array(fields) if (121..=127).contains(tag) => Some((*tag - 121, fields)),
            Value::Array(pair) if *tag == 102 && pair.len() == 2 => {
                let Value::Integer(idx) = &pair[0] else {
                    return None;
                };
                let Value::Array(fields) = &pair[1] else {
                    return None;
                };
                let idx_u64 = u64::try_from(i128::from(*idx)).ok()?;
                // Field slice borrowed from `pair[1]`; safe since `pair` itself
                // is borrowed from `boxed`, which outlives this match arm via `value`.
                Some((idx_u64, fields.as_slice()))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Extract an integer field as `i128`.
pub fn value_to_i128(value: &Value) -> Option<i128> {
    match value {
        Value::Integer(i) => Some(i128::from(*i)),
        _ => None,
    }
}

/// Extract a byte-string field, hex-encoded.
pub fn value_to_hex(value: &Value) -> Option<String> {
    match value {
        Value::Bytes(b) => Some(hex::encode(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(value, &mut buf).unwrap();
        buf
    }

    #[test]
    fn decode_cbor_round_trips_a_simple_integer() {
        let encoded = encode(&Value::Integer(42.into()));
        let decoded = decode_cbor(&encoded).unwrap();
        assert_eq!(value_to_i128(&decoded), Some(42));
    }

    #[test]
    fn constr_fields_extracts_small_constructor_tag_and_fields() {
        let datum = Value::Tag(
            121,
            Box::new(Value::Array(vec![Value::Integer(10.into()), Value::Integer(20.into())])),
        );
        let (tag, fields) = constr_fields(&datum).unwrap();
        assert_eq!(tag, 0);
        assert_eq!(fields.len(), 2);
        assert_eq!(value_to_i128(&fields[0]), Some(10));
    }

    #[test]
    fn constr_fields_rejects_non_constructor_values() {
        assert!(constr_fields(&Value::Integer(5.into())).is_none());
    }

    #[test]
    fn decode_cbor_rejects_garbage_bytes() {
        let err = decode_cbor(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, IndexerError::Decoding { .. }));
    }
}
