//! Entry Codec Module
//!
//! Turns cached values into the tagged byte records stored in the remote layer.
//!
//! # Record Layout
//! ```text
//! [tag: 1 byte][payload]
//!   b'J' -> JSON text (primary, human-inspectable)
//!   b'M' -> MessagePack (fallback for values JSON cannot carry)
//! ```
//!
//! Decoding dispatches on the tag, it never probes formats.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::CodecError;

const TAG_JSON: u8 = b'J';
const TAG_MSGPACK: u8 = b'M';

// == Format ==
/// Payload format of an encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    MessagePack,
}

impl Format {
    fn tag(self) -> u8 {
        match self {
            Format::Json => TAG_JSON,
            Format::MessagePack => TAG_MSGPACK,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_JSON => Some(Format::Json),
            TAG_MSGPACK => Some(Format::MessagePack),
            _ => None,
        }
    }
}

// == Encode ==
/// Encodes a value, preferring JSON and falling back to MessagePack.
///
/// The JSON text is read back as `T` and accepted only if the result
/// serializes exactly like the input. JSON writes non-finite floats as
/// `null`, which either fails to decode or decodes to something else (an
/// `Option<f64>` comes back `None`). Both cases go to MessagePack.
pub fn encode<T>(value: &T) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + DeserializeOwned,
{
    match encode_json(value) {
        Ok(bytes) => Ok(bytes),
        Err(json_err) => {
            tracing::debug!(error = %json_err, "JSON encoding rejected, using MessagePack");
            encode_msgpack(value)
        }
    }
}

fn encode_json<T>(value: &T) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + DeserializeOwned,
{
    let mut out = vec![TAG_JSON];
    serde_json::to_writer(&mut out, value)?;
    let decoded = serde_json::from_slice::<T>(&out[1..])?;

    // Values MessagePack cannot serialize either are not compared
    let original = rmp_serde::to_vec(value);
    let round_tripped = rmp_serde::to_vec(&decoded);
    if let (Ok(original), Ok(round_tripped)) = (original, round_tripped) {
        if original != round_tripped {
            return Err(CodecError::JsonLossy);
        }
    }
    Ok(out)
}

fn encode_msgpack<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let payload = rmp_serde::to_vec_named(value)?;
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(TAG_MSGPACK);
    out.extend_from_slice(&payload);
    Ok(out)
}

// == Decode ==
/// Decodes a record produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let (&tag, payload) = bytes.split_first().ok_or(CodecError::Empty)?;
    match Format::from_tag(tag) {
        Some(Format::Json) => Ok(serde_json::from_slice(payload)?),
        Some(Format::MessagePack) => Ok(rmp_serde::from_slice(payload)?),
        None => Err(CodecError::UnknownTag(tag)),
    }
}

/// Returns the format of an encoded record, or None for foreign bytes.
pub fn format_of(bytes: &[u8]) -> Option<Format> {
    bytes.first().copied().and_then(Format::from_tag)
}

/// Encodes with an explicit format. Used by tests and tooling.
pub fn encode_as<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>, CodecError> {
    match format {
        Format::Json => {
            let mut out = vec![format.tag()];
            serde_json::to_writer(&mut out, value)?;
            Ok(out)
        }
        Format::MessagePack => encode_msgpack(value),
    }
}
