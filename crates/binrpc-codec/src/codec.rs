use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::record::{Record, StructItem, Value};
use crate::types::TypeTag;

/// Header bit marking an extended (separately encoded) payload length.
pub const EXTENDED_FLAG: u8 = 0x80;

/// Largest payload length that fits the 3-bit size field.
pub const MAX_SHORT_LEN: usize = 7;

/// Maximum number of length bytes an extended header can announce.
pub const MAX_LEN_BYTES: usize = 7;

/// Struct nesting beyond this depth is rejected while decoding.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Doubles travel as integers scaled by this factor.
pub const FIXED_SCALE: f64 = 1000.0;

/// Big-endian bytes of `value` with leading zero bytes removed.
///
/// Returns the 8-byte buffer and the index of the first significant byte;
/// zero yields an empty slice.
fn trimmed_be(value: u64) -> ([u8; 8], usize) {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().take_while(|&&b| b == 0).count();
    (bytes, start)
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn fixed_to_wire(value: f64) -> i64 {
    // `as` truncates toward zero and saturates; NaN becomes 0.
    (value * FIXED_SCALE) as i64
}

fn int_payload_len(value: i64) -> usize {
    8 - trimmed_be(value as u64).1
}

/// Total encoded size of a record whose payload is `len` bytes.
fn record_len(len: usize) -> usize {
    if len <= MAX_SHORT_LEN {
        1 + len
    } else {
        1 + (8 - trimmed_be(len as u64).1) + len
    }
}

/// Payload length a value encodes to.
///
/// Structs are measured as their key/value member records even though
/// [`encode_record`] refuses to emit them.
pub(crate) fn payload_len(value: &Value) -> usize {
    match value {
        Value::Integer(v) => int_payload_len(*v),
        Value::Text(s) => s.len() + 1,
        Value::Fixed(v) => int_payload_len(fixed_to_wire(*v)),
        Value::Aggregate(items) => items
            .iter()
            .map(|item| record_len(item.key.len() + 1) + record_len(item.value.size()))
            .sum(),
    }
}

/// Encode a record header for a payload of `len` bytes.
///
/// ```text
///   bit 7      bits 6..4     bits 3..0
/// ┌──────────┬────────────┬──────────┐
/// │ extended │ size field │ type tag │
/// └──────────┴────────────┴──────────┘
/// ```
///
/// Payloads shorter than 8 bytes store their length in the size field.
/// Longer payloads set the extended flag, store the number of length bytes
/// in the size field and follow the header with the big-endian length.
pub fn encode_header(tag: TypeTag, len: usize, dst: &mut BytesMut) -> Result<()> {
    if len <= MAX_SHORT_LEN {
        dst.put_u8(((len as u8) << 4) | tag.as_u8());
        return Ok(());
    }

    let (bytes, start) = trimmed_be(len as u64);
    let count = bytes.len() - start;
    if count > MAX_LEN_BYTES {
        return Err(CodecError::MalformedRecord(format!(
            "payload length {len} needs {count} length bytes (max {MAX_LEN_BYTES})"
        )));
    }

    dst.reserve(1 + count);
    dst.put_u8(EXTENDED_FLAG | ((count as u8) << 4) | tag.as_u8());
    dst.put_slice(&bytes[start..]);
    Ok(())
}

fn encode_int(tag: TypeTag, value: i64, dst: &mut BytesMut) -> Result<()> {
    let (bytes, start) = trimmed_be(value as u64);
    encode_header(tag, bytes.len() - start, dst)?;
    dst.put_slice(&bytes[start..]);
    Ok(())
}

fn encode_str(value: &str, dst: &mut BytesMut) -> Result<()> {
    encode_header(TypeTag::String, value.len() + 1, dst)?;
    dst.reserve(value.len() + 1);
    dst.put_slice(value.as_bytes());
    dst.put_u8(0);
    Ok(())
}

/// Encode one record.
///
/// Only scalar records can be sent; a struct fails with
/// [`CodecError::UnsupportedType`] and leaves `dst` untouched.
pub fn encode_record(record: &Record, dst: &mut BytesMut) -> Result<()> {
    match record.value() {
        Value::Integer(v) => encode_int(TypeTag::Integer, *v, dst),
        Value::Text(s) => encode_str(s, dst),
        Value::Fixed(v) => encode_int(TypeTag::Double, fixed_to_wire(*v), dst),
        Value::Aggregate(_) => Err(CodecError::UnsupportedType {
            tag: TypeTag::Struct.as_u8(),
            reason: "struct records cannot be encoded",
        }),
    }
}

/// Decode one record from the start of `src`.
///
/// Returns the record and the number of bytes it occupied.
pub fn decode_record(src: &[u8]) -> Result<(Record, usize)> {
    decode_at_depth(src, 0)
}

/// Decode a concatenation of top-level records that must fill `src` exactly.
pub fn decode_records(src: &[u8]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < src.len() {
        let (record, used) = decode_record(&src[offset..])?;
        records.push(record);
        offset += used;
    }
    Ok(records)
}

fn decode_at_depth(src: &[u8], depth: usize) -> Result<(Record, usize)> {
    let header = *src
        .first()
        .ok_or_else(|| CodecError::MalformedRecord("missing record header".into()))?;
    let extended = header & EXTENDED_FLAG != 0;
    let size_field = usize::from((header >> 4) & 0x07);

    let (len, offset) = if extended {
        let len_bytes = src.get(1..1 + size_field).ok_or_else(|| {
            CodecError::MalformedRecord(format!(
                "length field of {size_field} bytes runs past end of input"
            ))
        })?;
        let len = usize::try_from(be_uint(len_bytes)).map_err(|_| {
            CodecError::MalformedRecord("payload length does not fit in memory".into())
        })?;
        (len, 1 + size_field)
    } else {
        (size_field, 1)
    };

    let end = offset
        .checked_add(len)
        .filter(|&end| end <= src.len())
        .ok_or_else(|| {
            CodecError::MalformedRecord(format!(
                "record declares {len} payload bytes, {} available",
                src.len() - offset
            ))
        })?;
    let payload = &src[offset..end];

    let tag = TypeTag::try_from(header & TypeTag::MASK)?;
    let value = match tag {
        TypeTag::Integer => Value::Integer(decode_int(payload)?),
        TypeTag::String => Value::Text(decode_str(payload)?),
        TypeTag::Double => Value::Fixed(decode_int(payload)? as f64 / FIXED_SCALE),
        TypeTag::Struct => Value::Aggregate(decode_struct(payload, depth)?),
    };

    Ok((Record::from_wire(value, len), end))
}

fn decode_int(payload: &[u8]) -> Result<i64> {
    if payload.len() > 8 {
        return Err(CodecError::MalformedRecord(format!(
            "integer payload of {} bytes exceeds 8",
            payload.len()
        )));
    }
    Ok(be_uint(payload) as i64)
}

fn decode_str(payload: &[u8]) -> Result<String> {
    let (terminator, text) = payload
        .split_last()
        .ok_or_else(|| CodecError::MalformedRecord("empty string payload".into()))?;
    if *terminator != 0 {
        return Err(CodecError::MalformedRecord(
            "string payload missing terminator".into(),
        ));
    }
    String::from_utf8(text.to_vec())
        .map_err(|err| CodecError::MalformedRecord(format!("string is not UTF-8: {err}")))
}

fn decode_struct(payload: &[u8], depth: usize) -> Result<Vec<StructItem>> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(CodecError::MalformedRecord(format!(
            "struct nesting exceeds {MAX_NESTING_DEPTH} levels"
        )));
    }

    let mut items = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let (key, used) = decode_at_depth(&payload[offset..], depth + 1)?;
        offset += used;
        let key = match key.into_value() {
            Value::Text(key) => key,
            other => {
                return Err(CodecError::MalformedRecord(format!(
                    "struct key must be a string record, found {}",
                    other.type_tag()
                )))
            }
        };

        let (value, used) = decode_at_depth(&payload[offset..], depth + 1)?;
        offset += used;
        items.push(StructItem { key, value });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(record: &Record) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_record(record, &mut buf).unwrap();
        buf.to_vec()
    }

    fn roundtrip(record: &Record) -> Record {
        let wire = encode(record);
        let (decoded, used) = decode_record(&wire).unwrap();
        assert_eq!(used, wire.len());
        decoded
    }

    /// Struct payload assembled from encoded member records, the way a peer
    /// emits it.
    fn struct_wire(members: &[(&str, Record)]) -> Vec<u8> {
        let mut body = BytesMut::new();
        for (key, value) in members {
            encode_record(&Record::string(*key), &mut body).unwrap();
            encode_record(value, &mut body).unwrap();
        }
        let mut wire = BytesMut::new();
        encode_header(TypeTag::Struct, body.len(), &mut wire).unwrap();
        wire.extend_from_slice(&body);
        wire.to_vec()
    }

    #[test]
    fn zero_is_a_single_header_byte() {
        assert_eq!(encode(&Record::int(0)), vec![0x00]);
        assert_eq!(roundtrip(&Record::int(0)), Record::int(0));
    }

    #[test]
    fn integer_wire_bytes() {
        assert_eq!(encode(&Record::int(1)), vec![0x10, 0x01]);
        assert_eq!(encode(&Record::int(0x1234)), vec![0x20, 0x12, 0x34]);
        assert_eq!(encode(&Record::int(0x80)), vec![0x10, 0x80]);
        assert_eq!(
            encode(&Record::int(-1)),
            vec![0x80 | 0x10, 0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn integer_roundtrip() {
        for v in [
            0,
            1,
            -1,
            127,
            128,
            255,
            256,
            65_535,
            1 << 40,
            i64::from(i32::MIN),
            i64::MAX,
            i64::MIN,
        ] {
            assert_eq!(roundtrip(&Record::int(v)).as_int().unwrap(), v, "value {v}");
        }
    }

    #[test]
    fn padded_integer_equals_minimal_one() {
        let (record, used) = decode_record(&[0x20, 0x00, 0x01]).unwrap();
        assert_eq!(used, 3);
        assert_eq!(record.size(), 2);
        assert_eq!(record, Record::int(1));
    }

    #[test]
    fn four_byte_payload_is_read_unsigned() {
        // A peer writing a 32-bit -1 is not sign-extended.
        let (record, _) = decode_record(&[0x40, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(record.as_int().unwrap(), 4_294_967_295);
    }

    #[test]
    fn string_wire_bytes_and_roundtrip() {
        assert_eq!(encode(&Record::string("")), vec![0x11, 0x00]);
        assert_eq!(encode(&Record::string("ab")), vec![0x31, b'a', b'b', 0x00]);

        let long = "x".repeat(300);
        for s in ["", "a", "tm.stats", "ünïcödé", long.as_str()] {
            assert_eq!(roundtrip(&Record::string(s)).as_str().unwrap(), s);
        }
    }

    #[test]
    fn fixed_precision_is_three_decimals() {
        assert_eq!(roundtrip(&Record::double(1.23456)).as_double().unwrap(), 1.234);
        assert_eq!(roundtrip(&Record::double(-2.5)).as_double().unwrap(), -2.5);
        assert_eq!(roundtrip(&Record::double(0.0009)).as_double().unwrap(), 0.0);
        assert_eq!(roundtrip(&Record::double(42.0)).as_double().unwrap(), 42.0);
    }

    #[test]
    fn fixed_wire_matches_scaled_integer() {
        let mut expected = BytesMut::new();
        encode_int(TypeTag::Double, 1500, &mut expected).unwrap();
        assert_eq!(encode(&Record::double(1.5)), expected.to_vec());
        assert_eq!(encode(&Record::double(1.5))[0] & TypeTag::MASK, 2);
    }

    #[test]
    fn seven_byte_payload_uses_short_header() {
        let record = Record::string("abcdef"); // 6 chars + terminator
        let wire = encode(&record);
        assert_eq!(wire[0], 0x71);
        assert_eq!(wire.len(), 8);
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn eight_byte_payload_uses_extended_header() {
        let record = Record::string("abcdefg"); // 7 chars + terminator
        let wire = encode(&record);
        assert_eq!(wire[0], EXTENDED_FLAG | 0x10 | 0x01);
        assert_eq!(wire[1], 8);
        assert_eq!(wire.len(), 10);
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn long_payload_uses_two_length_bytes() {
        let record = Record::string("y".repeat(299)); // 300-byte payload
        let wire = encode(&record);
        assert_eq!(wire[0], EXTENDED_FLAG | 0x20 | 0x01);
        assert_eq!(&wire[1..3], &[0x01, 0x2C]);
        assert_eq!(roundtrip(&record), record);
    }

    #[test]
    fn struct_cannot_be_encoded() {
        let mut buf = BytesMut::new();
        let err = encode_record(&Record::structure(vec![]), &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedType { tag: 3, .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn struct_preserves_order_and_duplicates() {
        let wire = struct_wire(&[
            ("a", Record::int(1)),
            ("b", Record::int(2)),
            ("a", Record::int(3)),
        ]);
        let (record, used) = decode_record(&wire).unwrap();
        assert_eq!(used, wire.len());

        let items = record.struct_items().unwrap();
        let pairs: Vec<(&str, i64)> = items
            .iter()
            .map(|item| (item.key.as_str(), item.value.as_int().unwrap()))
            .collect();
        assert_eq!(pairs, vec![("a", 1), ("b", 2), ("a", 3)]);
    }

    #[test]
    fn decoded_struct_size_matches_constructed() {
        let wire = struct_wire(&[("kos", Record::int(42)), ("name", Record::string("x"))]);
        let (decoded, _) = decode_record(&wire).unwrap();
        let built = Record::structure(vec![
            StructItem::new("kos", 42),
            StructItem::new("name", "x"),
        ]);
        assert_eq!(decoded, built);
    }

    #[test]
    fn nested_struct_decodes() {
        let inner = struct_wire(&[("depth", Record::int(2))]);
        let mut body = BytesMut::new();
        encode_record(&Record::string("inner"), &mut body).unwrap();
        body.extend_from_slice(&inner);
        encode_record(&Record::string("after"), &mut body).unwrap();
        encode_record(&Record::double(0.5), &mut body).unwrap();
        let mut wire = BytesMut::new();
        encode_header(TypeTag::Struct, body.len(), &mut wire).unwrap();
        wire.extend_from_slice(&body);

        let (record, _) = decode_record(&wire).unwrap();
        let inner = record.get("inner").unwrap();
        assert_eq!(inner.get("depth").unwrap().as_int().unwrap(), 2);
        assert_eq!(record.get("after").unwrap().as_double().unwrap(), 0.5);
    }

    #[test]
    fn empty_struct_decodes() {
        let (record, used) = decode_record(&[0x03]).unwrap();
        assert_eq!(used, 1);
        assert!(record.struct_items().unwrap().is_empty());
    }

    #[test]
    fn struct_with_partial_final_pair_is_malformed() {
        let mut body = BytesMut::new();
        encode_record(&Record::string("a"), &mut body).unwrap();
        encode_record(&Record::int(1), &mut body).unwrap();
        encode_record(&Record::string("b"), &mut body).unwrap();
        // declared length stops inside the second pair's key
        let mut wire = BytesMut::new();
        encode_header(TypeTag::Struct, body.len() - 1, &mut wire).unwrap();
        wire.extend_from_slice(&body);

        let err = decode_record(&wire).unwrap_err();
        assert!(matches!(err, CodecError::MalformedRecord(_)));
    }

    #[test]
    fn struct_key_without_value_is_malformed() {
        let mut body = BytesMut::new();
        encode_record(&Record::string("lonely"), &mut body).unwrap();
        let mut wire = BytesMut::new();
        encode_header(TypeTag::Struct, body.len(), &mut wire).unwrap();
        wire.extend_from_slice(&body);

        assert!(matches!(
            decode_record(&wire),
            Err(CodecError::MalformedRecord(_))
        ));
    }

    #[test]
    fn struct_key_must_be_string() {
        let mut body = BytesMut::new();
        encode_record(&Record::int(5), &mut body).unwrap();
        encode_record(&Record::int(6), &mut body).unwrap();
        let mut wire = BytesMut::new();
        encode_header(TypeTag::Struct, body.len(), &mut wire).unwrap();
        wire.extend_from_slice(&body);

        assert!(matches!(
            decode_record(&wire),
            Err(CodecError::MalformedRecord(_))
        ));
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let mut wire = vec![0x03];
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            let mut body = BytesMut::new();
            encode_record(&Record::string("k"), &mut body).unwrap();
            body.extend_from_slice(&wire);
            let mut outer = BytesMut::new();
            encode_header(TypeTag::Struct, body.len(), &mut outer).unwrap();
            outer.extend_from_slice(&body);
            wire = outer.to_vec();
        }

        assert!(matches!(
            decode_record(&wire),
            Err(CodecError::MalformedRecord(_))
        ));
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        // array (4), AVP (5), bytes (6) and beyond
        for tag in 4u8..=0x0F {
            let err = decode_record(&[0x10 | tag, 0x01]).unwrap_err();
            assert!(matches!(err, CodecError::UnsupportedType { tag: t, .. } if t == tag));
        }
    }

    #[test]
    fn unknown_tag_inside_struct_is_unsupported() {
        let mut body = BytesMut::new();
        encode_record(&Record::string("k"), &mut body).unwrap();
        body.put_u8(0x14); // tag 4, 1-byte payload
        body.put_u8(0x00);
        let mut wire = BytesMut::new();
        encode_header(TypeTag::Struct, body.len(), &mut wire).unwrap();
        wire.extend_from_slice(&body);

        assert!(matches!(
            decode_record(&wire),
            Err(CodecError::UnsupportedType { tag: 4, .. })
        ));
    }

    #[test]
    fn declared_length_past_input_is_malformed() {
        assert!(matches!(
            decode_record(&[0x30, 0x01]),
            Err(CodecError::MalformedRecord(_))
        ));
        // extended header announcing two length bytes but carrying one
        assert!(matches!(
            decode_record(&[0xA1, 0x01]),
            Err(CodecError::MalformedRecord(_))
        ));
        assert!(matches!(
            decode_record(&[]),
            Err(CodecError::MalformedRecord(_))
        ));
    }

    #[test]
    fn oversized_integer_payload_is_malformed() {
        let mut wire = vec![EXTENDED_FLAG | 0x10, 9];
        wire.extend_from_slice(&[1; 9]);
        assert!(matches!(
            decode_record(&wire),
            Err(CodecError::MalformedRecord(_))
        ));
    }

    #[test]
    fn string_without_terminator_is_malformed() {
        assert!(matches!(
            decode_record(&[0x21, b'h', b'i']),
            Err(CodecError::MalformedRecord(_))
        ));
        assert!(matches!(
            decode_record(&[0x01]),
            Err(CodecError::MalformedRecord(_))
        ));
    }

    #[test]
    fn decode_consumes_only_one_record() {
        let mut wire = BytesMut::new();
        encode_record(&Record::int(7), &mut wire).unwrap();
        encode_record(&Record::string("tail"), &mut wire).unwrap();

        let (first, used) = decode_record(&wire).unwrap();
        assert_eq!(first.as_int().unwrap(), 7);
        assert_eq!(used, 2);
    }

    #[test]
    fn decode_records_reads_whole_sequence() {
        let mut wire = BytesMut::new();
        encode_record(&Record::int(7), &mut wire).unwrap();
        encode_record(&Record::string("tail"), &mut wire).unwrap();
        encode_record(&Record::double(2.25), &mut wire).unwrap();

        let records = decode_records(&wire).unwrap();
        assert_eq!(
            records,
            vec![Record::int(7), Record::string("tail"), Record::double(2.25)]
        );
        assert!(decode_records(&[]).unwrap().is_empty());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn header_for_huge_length_is_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_header(TypeTag::String, 1usize << 56, &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::MalformedRecord(_)));
    }
}
