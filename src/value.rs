//! Structured data carried in token payloads.
//!
//! [`Value`] is a superset of JSON: besides the JSON types it models dates,
//! arbitrary-precision integers, sets, maps with non-string keys, typed
//! numeric arrays and raw byte buffers. The plain `j` codec stores only the
//! JSON subset; the `jx` codec round-trips every variant.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;

/// Largest integer a double represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// Millisecond-precision timestamp.
    Date(DateTime<Utc>),
    BigInt(BigInt),
    /// Unique elements in insertion order.
    Set(Vec<Value>),
    /// Entries in insertion order; keys may be any value.
    Map(Vec<(Value, Value)>),
    TypedArray(TypedArray),
    Bytes(Vec<u8>),
}

impl Value {
    /// Build a set, dropping later duplicates.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Value::Set(out)
    }

    /// Build a map, later entries replacing earlier ones with an equal key.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let mut out: Vec<(Value, Value)> = Vec::new();
        for (k, v) in entries {
            match out.iter_mut().find(|(existing, _)| *existing == k) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        Value::Map(out)
    }

    /// Date from epoch milliseconds; `None` outside chrono's range.
    pub fn date_millis(millis: i64) -> Option<Value> {
        DateTime::from_timestamp_millis(millis).map(Value::Date)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }
}

/// JSON number for `n`, written without a fraction when it is an exact
/// integer. Non-finite numbers become `null`.
pub(crate) fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<TypedArray> for Value {
    fn from(a: TypedArray) -> Self {
        Value::TypedArray(a)
    }
}

/// Element type code of a [`TypedArray`] in the `jx` wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementType {
    Int8 = 0,
    Uint8 = 1,
    Uint8Clamped = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Float32 = 7,
    Float64 = 8,
    BigInt64 = 9,
    BigUint64 = 10,
}

impl ElementType {
    pub fn from_byte(b: u8) -> Option<ElementType> {
        match b {
            0 => Some(ElementType::Int8),
            1 => Some(ElementType::Uint8),
            2 => Some(ElementType::Uint8Clamped),
            3 => Some(ElementType::Int16),
            4 => Some(ElementType::Uint16),
            5 => Some(ElementType::Int32),
            6 => Some(ElementType::Uint32),
            7 => Some(ElementType::Float32),
            8 => Some(ElementType::Float64),
            9 => Some(ElementType::BigInt64),
            10 => Some(ElementType::BigUint64),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Fixed-width numeric array.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    /// Bytes whose writes clamp to `0..=255` instead of wrapping.
    Uint8Clamped(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    BigInt64(Vec<i64>),
    BigUint64(Vec<u64>),
}

impl TypedArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            TypedArray::Int8(_) => ElementType::Int8,
            TypedArray::Uint8(_) => ElementType::Uint8,
            TypedArray::Uint8Clamped(_) => ElementType::Uint8Clamped,
            TypedArray::Int16(_) => ElementType::Int16,
            TypedArray::Uint16(_) => ElementType::Uint16,
            TypedArray::Int32(_) => ElementType::Int32,
            TypedArray::Uint32(_) => ElementType::Uint32,
            TypedArray::Float32(_) => ElementType::Float32,
            TypedArray::Float64(_) => ElementType::Float64,
            TypedArray::BigInt64(_) => ElementType::BigInt64,
            TypedArray::BigUint64(_) => ElementType::BigUint64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::Int8(v) => v.len(),
            TypedArray::Uint8(v) | TypedArray::Uint8Clamped(v) => v.len(),
            TypedArray::Int16(v) => v.len(),
            TypedArray::Uint16(v) => v.len(),
            TypedArray::Int32(v) => v.len(),
            TypedArray::Uint32(v) => v.len(),
            TypedArray::Float32(v) => v.len(),
            TypedArray::Float64(v) => v.len(),
            TypedArray::BigInt64(v) => v.len(),
            TypedArray::BigUint64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements as JSON numbers. 64-bit integers keep full precision.
    pub(crate) fn to_json_elements(&self) -> Vec<serde_json::Value> {
        fn ints<T: Copy + Into<serde_json::Value>>(v: &[T]) -> Vec<serde_json::Value> {
            v.iter().map(|x| (*x).into()).collect()
        }
        match self {
            TypedArray::Int8(v) => ints(v),
            TypedArray::Uint8(v) | TypedArray::Uint8Clamped(v) => ints(v),
            TypedArray::Int16(v) => ints(v),
            TypedArray::Uint16(v) => ints(v),
            TypedArray::Int32(v) => ints(v),
            TypedArray::Uint32(v) => ints(v),
            TypedArray::Float32(v) => v.iter().map(|x| number_to_json(f64::from(*x))).collect(),
            TypedArray::Float64(v) => v.iter().map(|x| number_to_json(*x)).collect(),
            TypedArray::BigInt64(v) => ints(v),
            TypedArray::BigUint64(v) => ints(v),
        }
    }

    /// Rebuild an array of `kind` from JSON elements. Elements that are not
    /// numbers read as zero; out-of-range values saturate.
    pub(crate) fn from_json_elements(kind: ElementType, items: &[serde_json::Value]) -> TypedArray {
        let floats = || items.iter().map(|x| x.as_f64().unwrap_or(0.0));
        match kind {
            ElementType::Int8 => TypedArray::Int8(floats().map(|x| x as i8).collect()),
            ElementType::Uint8 => TypedArray::Uint8(floats().map(|x| x as u8).collect()),
            ElementType::Uint8Clamped => {
                TypedArray::Uint8Clamped(floats().map(|x| x.round_ties_even() as u8).collect())
            }
            ElementType::Int16 => TypedArray::Int16(floats().map(|x| x as i16).collect()),
            ElementType::Uint16 => TypedArray::Uint16(floats().map(|x| x as u16).collect()),
            ElementType::Int32 => TypedArray::Int32(floats().map(|x| x as i32).collect()),
            ElementType::Uint32 => TypedArray::Uint32(floats().map(|x| x as u32).collect()),
            ElementType::Float32 => TypedArray::Float32(floats().map(|x| x as f32).collect()),
            ElementType::Float64 => TypedArray::Float64(floats().collect()),
            ElementType::BigInt64 => TypedArray::BigInt64(
                items
                    .iter()
                    .map(|x| {
                        x.as_i64()
                            .or_else(|| x.as_str().and_then(|s| s.parse().ok()))
                            .unwrap_or(0)
                    })
                    .collect(),
            ),
            ElementType::BigUint64 => TypedArray::BigUint64(
                items
                    .iter()
                    .map(|x| {
                        x.as_u64()
                            .or_else(|| x.as_str().and_then(|s| s.parse().ok()))
                            .unwrap_or(0)
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let v = Value::from(json!({"sub": "alice", "n": 3, "tags": ["a", null, true]}));
        assert_eq!(v.get("sub").and_then(Value::as_str), Some("alice"));
        assert_eq!(v.get("n").and_then(Value::as_f64), Some(3.0));
        assert_eq!(
            v.get("tags"),
            Some(&Value::Array(vec!["a".into(), Value::Null, true.into()]))
        );
    }

    #[test]
    fn test_number_to_json_integral() {
        assert_eq!(number_to_json(42.0).to_string(), "42");
        assert_eq!(number_to_json(-7.0).to_string(), "-7");
        assert_eq!(number_to_json(1.5).to_string(), "1.5");
        assert_eq!(number_to_json(f64::NAN), serde_json::Value::Null);
        assert_eq!(number_to_json(f64::INFINITY), serde_json::Value::Null);
    }

    #[test]
    fn test_set_dedupes() {
        let s = Value::set(vec![1i64.into(), 2i64.into(), 1i64.into()]);
        assert_eq!(s, Value::Set(vec![1i64.into(), 2i64.into()]));
    }

    #[test]
    fn test_map_replaces() {
        let m = Value::map(vec![
            (Value::from(1i64), Value::from("a")),
            (Value::from(1i64), Value::from("b")),
        ]);
        assert_eq!(m, Value::Map(vec![(1i64.into(), "b".into())]));
    }

    #[test]
    fn test_element_type_codes() {
        for code in 0u8..=10 {
            assert_eq!(ElementType::from_byte(code).unwrap().to_byte(), code);
        }
        assert_eq!(ElementType::from_byte(11), None);
    }

    #[test]
    fn test_typed_array_elements() {
        let a = TypedArray::BigUint64(vec![u64::MAX, 0]);
        let json = a.to_json_elements();
        assert_eq!(json, vec![json!(u64::MAX), json!(0)]);
        assert_eq!(TypedArray::from_json_elements(ElementType::BigUint64, &json), a);

        let clamped = TypedArray::from_json_elements(ElementType::Uint8Clamped, &[json!(300), json!(-4), json!(1.6)]);
        assert_eq!(clamped, TypedArray::Uint8Clamped(vec![255, 0, 2]));

        let halves = TypedArray::from_json_elements(
            ElementType::Uint8Clamped,
            &[json!(0.5), json!(1.5), json!(2.5), json!(254.5)],
        );
        assert_eq!(halves, TypedArray::Uint8Clamped(vec![0, 2, 2, 254]));
    }
}
