//! Payload serialization as an opaque collaborator.
//!
//! The engine never interprets payload bytes itself; whenever payloads
//! cross a process boundary (workload files, wire transports), the
//! conversion goes through a [`Codec`] supplied by the caller. The codec
//! makes no concurrency promises and is handed values one at a time.

use windlass_common::{Result, error::Error};

/// Encodes and decodes values of one payload type.
pub trait Codec<V>: Send + Sync {
    fn encode(&self, value: &V) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<V>;
}

/// JSON codec for any serde-enabled payload type.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl<V> Codec<V> for JsonCodec
where
    V: serde::Serialize + serde::de::DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::codec("JSON encode", e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        serde_json::from_slice(bytes).map_err(|e| Error::codec("JSON decode", e))
    }
}
