//! Pluggable value serialization for structured payloads.
//!
//! The store holds bytes; applications hold structs. A [`ValueCodec`]
//! bridges the two for the `get_json`/`set_json` convenience layer. The
//! default codec is JSON via `serde_json`; alternatives plug in through
//! the same object-safe trait.

use prism_core::{Error, Result};

/// Byte-level codec for structured values.
pub trait ValueCodec: Send + Sync {
    /// Codec name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Encode a JSON value tree to storable bytes.
    fn encode(&self, value: serde_json::Value) -> Result<Vec<u8>>;

    /// Decode storable bytes back to a JSON value tree.
    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value>;
}

/// The default codec: compact JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: serde_json::Value) -> Result<Vec<u8>> {
        serde_json::to_vec(&value).map_err(|err| Error::Codec {
            reason: err.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        serde_json::from_slice(bytes).map_err(|err| Error::Codec {
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let codec = JsonCodec;
        let value = serde_json::json!({"name": "alice", "logins": 3});
        let bytes = codec.encode(value.clone()).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_decode_failure_is_codec_error() {
        let codec = JsonCodec;
        match codec.decode(b"{not json") {
            Err(Error::Codec { .. }) => {}
            other => panic!("expected codec error, got {:?}", other),
        }
    }
}
