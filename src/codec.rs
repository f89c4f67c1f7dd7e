use bytes::Bytes;

use crate::error::{Error, Result};

/// Converts keys and values to and from the bytes carried on the wire.
///
/// A client holds exactly one codec for its lifetime. Encoding runs before a
/// request is queued, so a failing `encode_*` never produces a partial frame.
pub trait Codec: Send + Sync + 'static {
    type Key: Clone + Send + Sync;
    type Value: Send + Sync;

    fn encode_key(&self, key: &Self::Key) -> Result<Bytes>;
    fn encode_value(&self, value: &Self::Value) -> Result<Bytes>;
    fn decode_key(&self, bytes: &[u8]) -> Result<Self::Key>;
    fn decode_value(&self, bytes: &[u8]) -> Result<Self::Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
}

/// `String` keys and values in UTF-8 or US-ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringCodec {
    charset: Charset,
}

impl StringCodec {
    pub fn utf8() -> Self {
        Self {
            charset: Charset::Utf8,
        }
    }

    pub fn ascii() -> Self {
        Self {
            charset: Charset::Ascii,
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    fn encode(&self, text: &str) -> Result<Bytes> {
        if self.charset == Charset::Ascii && !text.is_ascii() {
            return Err(Error::Encode(format!(
                "'{}' is not representable in US-ASCII",
                text
            )));
        }
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        if self.charset == Charset::Ascii && !bytes.is_ascii() {
            return Err(Error::Decode("reply is not US-ASCII".to_string()));
        }
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Decode(e.to_string()))
    }
}

impl Default for StringCodec {
    fn default() -> Self {
        Self::utf8()
    }
}

impl Codec for StringCodec {
    type Key = String;
    type Value = String;

    fn encode_key(&self, key: &String) -> Result<Bytes> {
        self.encode(key)
    }

    fn encode_value(&self, value: &String) -> Result<Bytes> {
        self.encode(value)
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<String> {
        self.decode(bytes)
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<String> {
        self.decode(bytes)
    }
}

/// Raw bytes in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteArrayCodec;

impl Codec for ByteArrayCodec {
    type Key = Bytes;
    type Value = Bytes;

    fn encode_key(&self, key: &Bytes) -> Result<Bytes> {
        Ok(key.clone())
    }

    fn encode_value(&self, value: &Bytes) -> Result<Bytes> {
        Ok(value.clone())
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(bytes))
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(bytes))
    }
}

/// UTF-8 keys with JSON documents as values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    type Key = String;
    type Value = serde_json::Value;

    fn encode_key(&self, key: &String) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(key.as_bytes()))
    }

    fn encode_value(&self, value: &serde_json::Value) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Decode(e.to_string()))
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}
