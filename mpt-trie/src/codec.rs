//! # Node Codec
//!
//! Nodes are serialized as field lists. A field is either a byte string or a
//! nested list; an embedded child node is simply a nested list inside its
//! parent. The default codec is RLP.

use alloy_rlp::{length_of_length, Encodable, Header};
use mpt_error::{Error, Result};
use thiserror::Error;

/// One item of a node's field list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A byte string (path, value, digest, or empty marker)
    Bytes(Vec<u8>),
    /// A nested field list (an embedded node)
    List(Vec<Field>),
}

impl Field {
    /// The empty byte string, used for empty slots and the empty node
    pub fn empty() -> Self {
        Field::Bytes(Vec::new())
    }

    /// Check if this is an empty byte string or an empty list
    pub fn is_empty(&self) -> bool {
        match self {
            Field::Bytes(bytes) => bytes.is_empty(),
            Field::List(items) => items.is_empty(),
        }
    }

    /// Get the bytes if this is a byte string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Field::Bytes(bytes) => Some(bytes),
            Field::List(_) => None,
        }
    }
}

/// Canonical encoding of field lists.
///
/// `decode(encode(f)) == f` must hold for every field.
pub trait Codec: Send + Sync {
    /// Encode a field to bytes
    fn encode(&self, field: &Field) -> Vec<u8>;

    /// Decode bytes produced by `encode`
    fn decode(&self, data: &[u8]) -> Result<Field>;
}

/// Low-level RLP failures, surfaced as the source of a `MalformedNode` error
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("rlp: {0}")]
    Rlp(#[from] alloy_rlp::Error),

    #[error("{0} trailing bytes after rlp item")]
    TrailingBytes(usize),
}

/// RLP codec
#[derive(Debug, Clone, Copy, Default)]
pub struct RlpCodec;

impl Codec for RlpCodec {
    fn encode(&self, field: &Field) -> Vec<u8> {
        let mut out = Vec::with_capacity(encoded_length(field));
        encode_field(field, &mut out);
        out
    }

    fn decode(&self, data: &[u8]) -> Result<Field> {
        decode_exact(data).map_err(|err| {
            Error::malformed_node(format!("cannot decode node: {}", err))
                .with_operation("codec::decode")
                .with_context("bytes", data.len().to_string())
                .set_source(err)
        })
    }
}

fn decode_exact(data: &[u8]) -> std::result::Result<Field, CodecError> {
    let mut buf = data;
    let field = decode_field(&mut buf)?;
    if !buf.is_empty() {
        return Err(CodecError::TrailingBytes(buf.len()));
    }
    Ok(field)
}

fn payload_length(items: &[Field]) -> usize {
    items.iter().map(encoded_length).sum()
}

fn encoded_length(field: &Field) -> usize {
    match field {
        Field::Bytes(bytes) => bytes.as_slice().length(),
        Field::List(items) => {
            let payload = payload_length(items);
            length_of_length(payload) + payload
        }
    }
}

fn encode_field(field: &Field, out: &mut Vec<u8>) {
    match field {
        Field::Bytes(bytes) => <[u8] as Encodable>::encode(bytes.as_slice(), out),
        Field::List(items) => {
            Header {
                list: true,
                payload_length: payload_length(items),
            }
            .encode(out);
            for item in items {
                encode_field(item, out);
            }
        }
    }
}

fn decode_field(buf: &mut &[u8]) -> std::result::Result<Field, CodecError> {
    let header = Header::decode(buf)?;
    // Header::decode guarantees the payload is present
    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;

    if !header.list {
        return Ok(Field::Bytes(payload.to_vec()));
    }

    let mut items = Vec::new();
    let mut payload = payload;
    while !payload.is_empty() {
        items.push(decode_field(&mut payload)?);
    }
    Ok(Field::List(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string() {
        let codec = RlpCodec;
        assert_eq!(codec.encode(&Field::empty()), vec![0x80]);
        assert_eq!(codec.decode(&[0x80]).unwrap(), Field::empty());
    }

    #[test]
    fn test_single_byte() {
        let codec = RlpCodec;
        assert_eq!(codec.encode(&Field::Bytes(vec![0x7f])), vec![0x7f]);
        assert_eq!(codec.encode(&Field::Bytes(vec![0x80])), vec![0x81, 0x80]);
        assert_eq!(codec.decode(&[0x7f]).unwrap(), Field::Bytes(vec![0x7f]));
    }

    #[test]
    fn test_known_list() {
        // ["cat", "dog"]
        let codec = RlpCodec;
        let field = Field::List(vec![
            Field::Bytes(b"cat".to_vec()),
            Field::Bytes(b"dog".to_vec()),
        ]);
        let encoded = codec.encode(&field);
        assert_eq!(
            encoded,
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        assert_eq!(codec.decode(&encoded).unwrap(), field);
    }

    #[test]
    fn test_nested_list() {
        let codec = RlpCodec;
        let field = Field::List(vec![
            Field::Bytes(vec![0x20]),
            Field::List(vec![Field::Bytes(vec![0x31]), Field::empty()]),
            Field::List(vec![]),
        ]);
        let encoded = codec.encode(&field);
        assert_eq!(codec.decode(&encoded).unwrap(), field);
    }

    #[test]
    fn test_long_payload() {
        let codec = RlpCodec;
        let field = Field::List(vec![Field::Bytes(vec![0xaa; 100]); 3]);
        let encoded = codec.encode(&field);
        // Long list and long strings use length-of-length prefixes
        assert_eq!(encoded[0], 0xf9);
        assert_eq!(codec.decode(&encoded).unwrap(), field);
    }

    #[test]
    fn test_decode_errors() {
        let codec = RlpCodec;

        let err = codec.decode(&[]).unwrap_err();
        assert_eq!(err.kind(), mpt_error::ErrorKind::MalformedNode);

        // Declares 3 bytes, provides 1
        let err = codec.decode(&[0x83, 0x01]).unwrap_err();
        assert_eq!(err.kind(), mpt_error::ErrorKind::MalformedNode);

        let err = codec.decode(&[0x80, 0x80]).unwrap_err();
        assert!(err.message().contains("trailing"));
    }

    #[test]
    fn test_field_helpers() {
        assert!(Field::empty().is_empty());
        assert!(Field::List(vec![]).is_empty());
        assert_eq!(Field::Bytes(vec![1]).as_bytes(), Some(&[1u8][..]));
        assert_eq!(Field::List(vec![]).as_bytes(), None);
    }
}
