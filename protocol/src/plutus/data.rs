//! Generic Plutus data and its CBOR encoding.
//!
//! The encoding matches what the ledger's script evaluator and the usual
//! off-chain libraries produce, so datums built here hash identically to
//! datums built anywhere else:
//!
//! - Constructor `i` is CBOR tag `121 + i` for `i <= 6`, `1280 + (i - 7)` for
//!   `7 <= i <= 127`, and tag `102` wrapping `[i, fields]` beyond that.
//! - Non-empty lists (including constructor fields) are indefinite-length
//!   arrays; empty lists are the definite `0x80`.
//! - Byte strings longer than 64 bytes are split into 64-byte chunks.
//! - Integers outside the 64-bit CBOR range use bignum tags 2 and 3.

use ciborium::value::Value;
use ciborium_ll::{Encoder, Header};
use std::convert::Infallible;

use crate::error::BadgeError;

/// Maximum chunk length for byte strings inside Plutus data.
const BYTES_CHUNK: usize = 64;

const TAG_BIGNUM_POS: u64 = 2;
const TAG_BIGNUM_NEG: u64 = 3;
const TAG_CONSTR_GENERAL: u64 = 102;
const TAG_CONSTR_SMALL: u64 = 121;
const TAG_CONSTR_MEDIUM: u64 = 1280;

/// A Plutus data value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlutusData {
    Constr { tag: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(i128),
    Bytes(Vec<u8>),
}

/// Append-only buffer whose writes cannot fail.
struct Sink<'a>(&'a mut Vec<u8>);

impl ciborium_io::Write for Sink<'_> {
    type Error = Infallible;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl PlutusData {
    pub fn constr(tag: u64, fields: Vec<PlutusData>) -> Self {
        Self::Constr { tag, fields }
    }

    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self::Bytes(bytes.as_ref().to_vec())
    }

    pub fn integer(value: impl Into<i128>) -> Self {
        Self::Integer(value.into())
    }

    /// Serializes to CBOR.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(64);
        let mut encoder = Encoder::from(Sink(&mut bytes));
        match self.write(&mut encoder) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        drop(encoder);
        bytes
    }

    /// Serializes to CBOR and hex-encodes the result.
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    fn write(&self, enc: &mut Encoder<Sink<'_>>) -> Result<(), Infallible> {
        match self {
            Self::Constr { tag, fields } => {
                match *tag {
                    0..=6 => enc.push(Header::Tag(TAG_CONSTR_SMALL + tag))?,
                    7..=127 => enc.push(Header::Tag(TAG_CONSTR_MEDIUM + tag - 7))?,
                    _ => {
                        enc.push(Header::Tag(TAG_CONSTR_GENERAL))?;
                        enc.push(Header::Array(Some(2)))?;
                        enc.push(Header::Positive(*tag))?;
                    }
                }
                write_list(enc, fields)
            }
            Self::Map(entries) => {
                enc.push(Header::Map(Some(entries.len())))?;
                for (k, v) in entries {
                    k.write(enc)?;
                    v.write(enc)?;
                }
                Ok(())
            }
            Self::List(items) => write_list(enc, items),
            Self::Integer(n) => write_integer(enc, *n),
            Self::Bytes(b) => enc.bytes(b, Some(BYTES_CHUNK)),
        }
    }

    /// Parses CBOR produced by any conforming Plutus data encoder. The
    /// buffer must hold exactly one data item.
    pub fn decode(bytes: &[u8]) -> Result<Self, BadgeError> {
        let mut rest = bytes;
        let value: Value = ciborium::de::from_reader(&mut rest)
            .map_err(|e| BadgeError::InvalidPlutusData(e.to_string()))?;
        if !rest.is_empty() {
            return Err(BadgeError::InvalidPlutusData(format!(
                "{} trailing bytes after data item",
                rest.len()
            )));
        }
        Self::from_value(value)
    }

    /// Parses hex-encoded CBOR.
    pub fn from_hex(hex_str: &str) -> Result<Self, BadgeError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| BadgeError::InvalidPlutusData(e.to_string()))?;
        Self::decode(&bytes)
    }

    fn from_value(value: Value) -> Result<Self, BadgeError> {
        match value {
            Value::Integer(i) => Ok(Self::Integer(i128::from(i))),
            Value::Bytes(b) => Ok(Self::Bytes(b)),
            Value::Array(items) => Ok(Self::List(
                items
                    .into_iter()
                    .map(Self::from_value)
                    .collect::<Result<_, _>>()?,
            )),
            Value::Map(entries) => Ok(Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((Self::from_value(k)?, Self::from_value(v)?)))
                    .collect::<Result<_, BadgeError>>()?,
            )),
            Value::Tag(tag, inner) => Self::from_tagged(tag, *inner),
            other => Err(BadgeError::InvalidPlutusData(format!(
                "unsupported CBOR item {:?}",
                other
            ))),
        }
    }

    fn from_tagged(tag: u64, inner: Value) -> Result<Self, BadgeError> {
        match tag {
            121..=127 => Ok(Self::Constr {
                tag: tag - TAG_CONSTR_SMALL,
                fields: fields_of(inner)?,
            }),
            1280..=1400 => Ok(Self::Constr {
                tag: tag - TAG_CONSTR_MEDIUM + 7,
                fields: fields_of(inner)?,
            }),
            TAG_CONSTR_GENERAL => match inner {
                Value::Array(mut pair) if pair.len() == 2 => {
                    let fields = fields_of(pair.pop().unwrap_or(Value::Null))?;
                    let index = match pair.pop() {
                        Some(Value::Integer(i)) => u64::try_from(i).map_err(|_| {
                            BadgeError::InvalidPlutusData("negative constructor index".into())
                        })?,
                        _ => {
                            return Err(BadgeError::InvalidPlutusData(
                                "constructor index must be an integer".into(),
                            ))
                        }
                    };
                    Ok(Self::Constr {
                        tag: index,
                        fields,
                    })
                }
                _ => Err(BadgeError::InvalidPlutusData(
                    "tag 102 must wrap [index, fields]".into(),
                )),
            },
            TAG_BIGNUM_POS | TAG_BIGNUM_NEG => {
                let Value::Bytes(magnitude) = inner else {
                    return Err(BadgeError::InvalidPlutusData("bignum without bytes".into()));
                };
                let n = bignum_to_i128(&magnitude)?;
                Ok(Self::Integer(if tag == TAG_BIGNUM_POS { n } else { -1 - n }))
            }
            other => Err(BadgeError::InvalidPlutusData(format!(
                "unexpected CBOR tag {}",
                other
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Accessors used by the typed decoders
    // ------------------------------------------------------------------

    /// Returns the fields if this is constructor `expected`.
    pub fn as_constr(&self, expected: u64) -> Result<&[PlutusData], BadgeError> {
        match self {
            Self::Constr { tag, fields } if *tag == expected => Ok(fields),
            other => Err(BadgeError::InvalidPlutusData(format!(
                "expected constructor {}, found {:?}",
                expected, other
            ))),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], BadgeError> {
        match self {
            Self::Bytes(b) => Ok(b),
            other => Err(BadgeError::InvalidPlutusData(format!(
                "expected bytes, found {:?}",
                other
            ))),
        }
    }

    pub fn as_integer(&self) -> Result<i128, BadgeError> {
        match self {
            Self::Integer(n) => Ok(*n),
            other => Err(BadgeError::InvalidPlutusData(format!(
                "expected integer, found {:?}",
                other
            ))),
        }
    }
}

fn write_list(enc: &mut Encoder<Sink<'_>>, items: &[PlutusData]) -> Result<(), Infallible> {
    if items.is_empty() {
        return enc.push(Header::Array(Some(0)));
    }
    enc.push(Header::Array(None))?;
    for item in items {
        item.write(enc)?;
    }
    enc.push(Header::Break)
}

fn write_integer(enc: &mut Encoder<Sink<'_>>, n: i128) -> Result<(), Infallible> {
    if n >= 0 {
        match u64::try_from(n) {
            Ok(small) => enc.push(Header::Positive(small)),
            Err(_) => {
                enc.push(Header::Tag(TAG_BIGNUM_POS))?;
                enc.bytes(&minimal_be(n as u128), None::<usize>)
            }
        }
    } else {
        // CBOR negative integers carry -1 - n.
        let magnitude = (-1 - n) as u128;
        match u64::try_from(magnitude) {
            Ok(small) => enc.push(Header::Negative(small)),
            Err(_) => {
                enc.push(Header::Tag(TAG_BIGNUM_NEG))?;
                enc.bytes(&minimal_be(magnitude), None::<usize>)
            }
        }
    }
}

fn minimal_be(n: u128) -> Vec<u8> {
    let bytes = n.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

fn bignum_to_i128(magnitude: &[u8]) -> Result<i128, BadgeError> {
    let significant: Vec<u8> = magnitude.iter().copied().skip_while(|b| *b == 0).collect();
    if significant.len() > 15 {
        return Err(BadgeError::InvalidPlutusData(
            "integer exceeds supported range".into(),
        ));
    }
    Ok(significant
        .iter()
        .fold(0i128, |acc, b| (acc << 8) | i128::from(*b)))
}

fn fields_of(value: Value) -> Result<Vec<PlutusData>, BadgeError> {
    match value {
        Value::Array(items) => items.into_iter().map(PlutusData::from_value).collect(),
        other => Err(BadgeError::InvalidPlutusData(format!(
            "constructor fields must be an array, found {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_constructor_encodes_definite_empty_array() {
        let d = PlutusData::constr(1, vec![]);
        assert_eq!(d.to_hex(), "d87a80");
    }

    #[test]
    fn constructor_fields_use_indefinite_array() {
        let d = PlutusData::constr(0, vec![PlutusData::integer(1)]);
        assert_eq!(d.to_hex(), "d8799f01ff");
    }

    #[test]
    fn medium_and_general_constructor_tags() {
        let seven = PlutusData::constr(7, vec![]);
        assert_eq!(seven.to_hex(), "d9050080");
        let big = PlutusData::constr(200, vec![]);
        assert_eq!(big.to_hex(), "d8668218c880");
        assert_eq!(PlutusData::decode(&seven.encode()).unwrap(), seven);
        assert_eq!(PlutusData::decode(&big.encode()).unwrap(), big);
    }

    #[test]
    fn negative_and_large_integers() {
        assert_eq!(PlutusData::integer(-1).to_hex(), "20");
        assert_eq!(PlutusData::integer(255).to_hex(), "18ff");
        let huge = PlutusData::Integer(1i128 << 70);
        let back = PlutusData::decode(&huge.encode()).unwrap();
        assert_eq!(back, huge);
        let neg_huge = PlutusData::Integer(-(1i128 << 70));
        assert_eq!(PlutusData::decode(&neg_huge.encode()).unwrap(), neg_huge);
    }

    #[test]
    fn long_bytes_are_chunked_and_reassembled() {
        let long = PlutusData::Bytes(vec![0xAB; 100]);
        let encoded = long.encode();
        // 0x5f opens an indefinite byte string.
        assert_eq!(encoded[0], 0x5f);
        assert_eq!(PlutusData::decode(&encoded).unwrap(), long);

        let short = PlutusData::Bytes(vec![0x01; 28]);
        assert_eq!(short.encode()[0], 0x58);
    }

    #[test]
    fn nested_structures_decode() {
        let d = PlutusData::constr(
            2,
            vec![
                PlutusData::List(vec![PlutusData::integer(1), PlutusData::bytes([9u8])]),
                PlutusData::Map(vec![(PlutusData::integer(0), PlutusData::bytes(b"x"))]),
            ],
        );
        assert_eq!(PlutusData::decode(&d.encode()).unwrap(), d);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = PlutusData::constr(0, vec![PlutusData::integer(2)]).encode();
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let err = PlutusData::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("4 trailing bytes"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(PlutusData::decode(&[0xff]).is_err());
        assert!(PlutusData::from_hex("6161").is_err()); // text string "a"
    }
}
