//! Extended JSON (`jx`) codec.
//!
//! Encoding runs a visitor over the value tree that rewrites the six non-JSON
//! variants into tagged arrays before handing the tree to `serde_json`:
//!
//! | variant     | wire form                          |
//! |-------------|------------------------------------|
//! | date        | `[-7, 1, epoch_millis]`            |
//! | big integer | `[-7, 2, "decimal"]`               |
//! | set         | `[-7, 3, [elements...]]`           |
//! | map         | `[-7, 4, [[key, value]...]]`       |
//! | typed array | `[-7, 7, element_code, [nums...]]` |
//! | bytes       | `[-7, 8, [bytes...]]`              |
//!
//! Decoding inspects every array: a leading `-7` followed by a known
//! discriminator (and a well-formed body) is rebuilt as the typed value,
//! anything else stays an ordinary array.
//!
//! There is no escaping. A user array that happens to start with `-7` and a
//! known discriminator decodes as the tagged type; this ambiguity is part of
//! the format.

use num_bigint::BigInt;

use crate::codec::Codec;
use crate::error::CodecError;
use crate::value::{number_to_json, ElementType, TypedArray, Value};

/// First element of every tagged array.
pub const SENTINEL: i64 = -7;

/// Second element of a tagged array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Date = 1,
    BigInt = 2,
    Set = 3,
    Map = 4,
    TypedArray = 7,
    Bytes = 8,
}

impl Tag {
    pub fn from_byte(b: u8) -> Option<Tag> {
        match b {
            1 => Some(Tag::Date),
            2 => Some(Tag::BigInt),
            3 => Some(Tag::Set),
            4 => Some(Tag::Map),
            7 => Some(Tag::TypedArray),
            8 => Some(Tag::Bytes),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedJsonCodec;

impl Codec for ExtendedJsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&to_tagged(value))?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(from_tagged(&json))
    }
}

fn tagged(tag: Tag, body: impl IntoIterator<Item = serde_json::Value>) -> serde_json::Value {
    let mut items: Vec<serde_json::Value> = vec![SENTINEL.into(), tag.to_byte().into()];
    items.extend(body);
    serde_json::Value::Array(items)
}

/// Rewrite `value` into its tagged-JSON intermediate form.
pub fn to_tagged(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_tagged).collect()),
        Value::Object(map) => serde_json::Value::Object(
            map.iter().map(|(k, v)| (k.clone(), to_tagged(v))).collect(),
        ),
        Value::Date(d) => tagged(Tag::Date, [serde_json::Value::from(d.timestamp_millis())]),
        Value::BigInt(n) => tagged(Tag::BigInt, [serde_json::Value::from(n.to_string())]),
        Value::Set(items) => tagged(
            Tag::Set,
            [serde_json::Value::Array(items.iter().map(to_tagged).collect())],
        ),
        Value::Map(entries) => tagged(
            Tag::Map,
            [serde_json::Value::Array(
                entries
                    .iter()
                    .map(|(k, v)| serde_json::Value::Array(vec![to_tagged(k), to_tagged(v)]))
                    .collect(),
            )],
        ),
        Value::TypedArray(a) => tagged(
            Tag::TypedArray,
            [
                serde_json::Value::from(a.element_type().to_byte()),
                serde_json::Value::Array(a.to_json_elements()),
            ],
        ),
        Value::Bytes(bytes) => tagged(
            Tag::Bytes,
            [serde_json::Value::Array(
                bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
            )],
        ),
    }
}

/// Rebuild a value from its tagged-JSON form.
pub fn from_tagged(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            untag(items).unwrap_or_else(|| Value::Array(items.iter().map(from_tagged).collect()))
        }
        serde_json::Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), from_tagged(v))).collect(),
        ),
    }
}

fn untag(items: &[serde_json::Value]) -> Option<Value> {
    let [head, tag, body @ ..] = items else {
        return None;
    };
    if head.as_f64() != Some(SENTINEL as f64) {
        return None;
    }
    let tag = tag
        .as_u64()
        .and_then(|t| u8::try_from(t).ok())
        .and_then(Tag::from_byte)?;

    match tag {
        Tag::Date => {
            let millis = body.first()?.as_f64()?;
            Value::date_millis(millis as i64)
        }
        Tag::BigInt => {
            let digits = body.first()?;
            let n = match digits {
                serde_json::Value::String(s) => s.parse::<BigInt>().ok()?,
                serde_json::Value::Number(n) => n.to_string().parse::<BigInt>().ok()?,
                _ => return None,
            };
            Some(Value::BigInt(n))
        }
        Tag::Set => {
            let elements = body.first()?.as_array()?;
            Some(Value::Set(elements.iter().map(from_tagged).collect()))
        }
        Tag::Map => {
            let entries = body.first()?.as_array()?;
            let pairs = entries
                .iter()
                .map(|entry| match entry.as_array()?.as_slice() {
                    [k, v] => Some((from_tagged(k), from_tagged(v))),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            Some(Value::Map(pairs))
        }
        Tag::TypedArray => {
            let code = body.first()?.as_u64()?;
            let elements = body.get(1)?.as_array()?;
            let kind = u8::try_from(code)
                .ok()
                .and_then(ElementType::from_byte)
                .unwrap_or(ElementType::Uint8);
            Some(Value::TypedArray(TypedArray::from_json_elements(kind, elements)))
        }
        Tag::Bytes => {
            let elements = body.first()?.as_array()?;
            Some(Value::Bytes(
                elements
                    .iter()
                    .map(|b| b.as_f64().unwrap_or(0.0) as u8)
                    .collect(),
            ))
        }
    }
}
