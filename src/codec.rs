//! Payload codecs and the registry that names them.
//!
//! A codec turns a [`Value`] into payload bytes and back. The registry maps
//! short format names (the token's `format` field) to codecs. It is built at
//! startup, with the `j` and `jx` codecs pre-registered, and is shared
//! read-only (behind an `Arc`) by every engine constructed afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CodecError, HwtError};
use crate::jx::ExtendedJsonCodec;
use crate::types::{DEFAULT_FORMAT, EXTENDED_FORMAT};
use crate::value::{number_to_json, TypedArray, Value};

/// Encode/decode pair for one payload format.
pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// Whether `name` is usable as a format name: `[A-Za-z][A-Za-z0-9]{1,9}`.
///
/// The built-in `j` is the only single-character name.
pub fn is_valid_format_name(name: &str) -> bool {
    if name == DEFAULT_FORMAT {
        return true;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (2..=10).contains(&name.len())
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Append-only registry of named codecs.
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// A registry holding the built-in `j` and `jx` codecs.
    pub fn new() -> Self {
        let mut codecs: HashMap<String, Arc<dyn Codec>> = HashMap::new();
        codecs.insert(DEFAULT_FORMAT.to_owned(), Arc::new(JsonCodec));
        codecs.insert(EXTENDED_FORMAT.to_owned(), Arc::new(ExtendedJsonCodec));
        CodecRegistry { codecs }
    }

    /// Register `codec` under `name`. Existing names are never overwritten.
    pub fn register(&mut self, name: &str, codec: Arc<dyn Codec>) -> Result<(), HwtError> {
        if self.codecs.contains_key(name) {
            return Err(HwtError::DuplicateFormat(name.to_owned()));
        }
        if !is_valid_format_name(name) {
            return Err(HwtError::InvalidName(name.to_owned()));
        }
        tracing::debug!(format = name, "codec registered");
        self.codecs.insert(name.to_owned(), codec);
        Ok(())
    }

    /// Register a closure-built codec, rejecting it when either half is missing.
    pub fn register_fns(&mut self, name: &str, codec: FnCodecBuilder) -> Result<(), HwtError> {
        let codec = codec
            .build()
            .ok_or_else(|| HwtError::InvalidCodec(name.to_owned()))?;
        self.register(name, Arc::new(codec))
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Registered format names, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

/// The default `j` codec: plain JSON text.
///
/// Values outside the JSON model are written the way a browser's
/// `JSON.stringify` writes them: dates as ISO-8601 strings, typed arrays as
/// index-keyed objects, sets/maps/byte buffers as `{}`. Big integers cannot
/// be written and fail the encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let json = to_plain_json(value)?;
        Ok(serde_json::to_vec(&json)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Value::from(json))
    }
}

fn to_plain_json(value: &Value) -> Result<serde_json::Value, CodecError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(
            items.iter().map(to_plain_json).collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_plain_json(v)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
        Value::Date(d) => serde_json::Value::String(
            d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        ),
        Value::BigInt(_) => return Err(CodecError::new("cannot serialize a BigInt")),
        Value::Set(_) | Value::Map(_) | Value::Bytes(_) => {
            serde_json::Value::Object(serde_json::Map::new())
        }
        Value::TypedArray(a) => typed_array_as_object(a),
    })
}

fn typed_array_as_object(a: &TypedArray) -> serde_json::Value {
    serde_json::Value::Object(
        a.to_json_elements()
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
    )
}

type EncodeFn = dyn Fn(&Value) -> Result<Vec<u8>, CodecError> + Send + Sync;
type DecodeFn = dyn Fn(&[u8]) -> Result<Value, CodecError> + Send + Sync;

/// Codec assembled from two closures, typically a thin wrapper around an
/// external serializer (CBOR, MessagePack, ...).
pub struct FnCodec {
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

impl FnCodec {
    pub fn builder() -> FnCodecBuilder {
        FnCodecBuilder::default()
    }
}

impl Codec for FnCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        (self.encode)(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        (self.decode)(bytes)
    }
}

#[derive(Default)]
pub struct FnCodecBuilder {
    encode: Option<Box<EncodeFn>>,
    decode: Option<Box<DecodeFn>>,
}

impl FnCodecBuilder {
    pub fn encode<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Vec<u8>, CodecError> + Send + Sync + 'static,
    {
        self.encode = Some(Box::new(f));
        self
    }

    pub fn decode<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Value, CodecError> + Send + Sync + 'static,
    {
        self.decode = Some(Box::new(f));
        self
    }

    /// `None` unless both closures were supplied.
    pub fn build(self) -> Option<FnCodec> {
        Some(FnCodec {
            encode: self.encode?,
            decode: self.decode?,
        })
    }
}
