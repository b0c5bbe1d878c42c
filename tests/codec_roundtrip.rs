#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::redundant_closure
)]
//! Property tests: codec round-trips through full tokens and tamper
//! rejection for arbitrary payloads.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use num_bigint::BigInt;
use proptest::prelude::*;

use hwt::codec::Codec;
use hwt::{
    ExtendedJsonCodec, HashAlgorithm, Hwt, JsonCodec, KeySpec, KeyringSpec, Options, Secret,
    TypedArray, Value,
};

const NOW: u64 = 1_800_000_000;

fn engine(format: &str, hash: HashAlgorithm) -> Hwt {
    let keyring = KeyringSpec {
        current: None,
        keys: vec![KeySpec {
            id: "prop".into(),
            secret: Secret::Bytes(vec![0x5a; 48]),
            created: None,
        }],
    };
    Hwt::new(
        &Options {
            format: format.into(),
            hash,
            max_token_size_bytes: 5120,
            ..Default::default()
        },
        &keyring,
    )
    .unwrap()
}

/// Numbers that survive a trip through decimal text exactly. Kept
/// non-negative so no plain array starts with the `jx` sentinel.
fn arb_number() -> impl Strategy<Value = f64> {
    (0i64..4_000_000).prop_map(|n| n as f64 / 4.0)
}

fn arb_plain_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        arb_number().prop_map(Value::Number),
        "[a-zA-Z0-9 _.:/-]{0,16}".prop_map(Value::String),
    ]
}

/// Values inside the plain JSON model.
fn arb_plain() -> impl Strategy<Value = Value> {
    arb_plain_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(Value::Object),
        ]
    })
}

fn arb_typed_array() -> impl Strategy<Value = TypedArray> {
    prop_oneof![
        prop::collection::vec(any::<i8>(), 0..4).prop_map(TypedArray::Int8),
        prop::collection::vec(any::<u8>(), 0..4).prop_map(TypedArray::Uint8Clamped),
        prop::collection::vec(any::<u16>(), 0..4).prop_map(TypedArray::Uint16),
        prop::collection::vec(any::<i32>(), 0..4).prop_map(TypedArray::Int32),
        prop::collection::vec(arb_number(), 0..4).prop_map(TypedArray::Float64),
        prop::collection::vec(any::<i64>(), 0..4).prop_map(TypedArray::BigInt64),
        prop::collection::vec(any::<u64>(), 0..4).prop_map(TypedArray::BigUint64),
    ]
}

fn arb_extended_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_plain_leaf(),
        (0i64..4_000_000_000_000)
            .prop_map(|ms| Value::Date(Utc.timestamp_millis_opt(ms).unwrap())),
        any::<i64>().prop_map(|n| Value::BigInt(BigInt::from(n) * BigInt::from(1_000_000_007u64))),
        arb_typed_array().prop_map(Value::TypedArray),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Values using every `jx` extension, nested.
fn arb_extended() -> impl Strategy<Value = Value> {
    arb_extended_leaf().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner.clone(), 0..3)
                .prop_map(Value::Object),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|items| Value::set(items)),
            prop::collection::vec(("[a-z]{1,4}".prop_map(Value::String), inner), 0..3)
                .prop_map(|entries| Value::map(entries)),
        ]
    })
}

proptest! {
    /// Plain JSON values decode to exactly what was encoded.
    #[test]
    fn json_codec_round_trip(value in arb_plain()) {
        let bytes = JsonCodec.encode(&value).unwrap();
        prop_assert_eq!(JsonCodec.decode(&bytes).unwrap(), value);
    }

    /// Every extended type survives `jx`.
    #[test]
    fn extended_codec_round_trip(value in arb_extended()) {
        let bytes = ExtendedJsonCodec.encode(&value).unwrap();
        prop_assert_eq!(ExtendedJsonCodec.decode(&bytes).unwrap(), value);
    }

    /// Create then verify returns the payload for every hash.
    #[test]
    fn token_round_trip(value in arb_extended(), hash_index in 0usize..3) {
        let hash = [HashAlgorithm::Sha256, HashAlgorithm::Sha384, HashAlgorithm::Sha512][hash_index];
        let hwt = engine("jx", hash);
        let token = hwt.create_at(NOW, 300, &value, None).unwrap();
        let result = hwt.verify_at(NOW + 10, &token, None).unwrap();
        prop_assert!(result.ok, "{:?}", result.error);
        prop_assert_eq!(result.data, Some(value));
    }

    /// Changing any single signature character is rejected.
    #[test]
    fn signature_tamper_rejected(value in arb_plain(), pos in any::<prop::sample::Index>()) {
        let hwt = engine("j", HashAlgorithm::Sha256);
        let token = hwt.create_at(NOW, 300, &value, None).unwrap();
        let mut fields: Vec<String> = token.split('.').map(str::to_owned).collect();
        let mut sig = fields[1].clone().into_bytes();
        let i = pos.index(sig.len());
        sig[i] = if sig[i] == b'x' { b'y' } else { b'x' };
        fields[1] = String::from_utf8(sig).unwrap();

        let result = hwt.verify_at(NOW, &fields.join("."), None).unwrap();
        prop_assert!(!result.ok);
        prop_assert_eq!(result.data, None);
    }

    /// A hidden value only verifies against itself.
    #[test]
    fn hidden_value_binding(visible in arb_plain(), hidden in arb_plain(), other in arb_plain()) {
        let hwt = engine("j", HashAlgorithm::Sha256);
        let token = hwt.create_at(NOW, 300, &visible, Some(&hidden)).unwrap();
        prop_assert!(hwt.verify_at(NOW, &token, Some(&hidden)).unwrap().ok);
        if other != hidden {
            prop_assert!(!hwt.verify_at(NOW, &token, Some(&other)).unwrap().ok);
        }
    }

    /// Arbitrary input never panics the verifier or the decoder.
    #[test]
    fn verify_arbitrary_input(token in "hwt\\.[A-Za-z0-9_.-]{0,80}") {
        let hwt = engine("jx", HashAlgorithm::Sha256);
        let result = hwt.verify_at(NOW, &token, None).unwrap();
        prop_assert!(!result.ok);
        let _ = hwt.decode(&token);
    }
}

#[test]
fn object_keys_are_emitted_sorted() {
    let mut map = BTreeMap::new();
    map.insert("b".to_owned(), Value::from(1.0));
    map.insert("a".to_owned(), Value::from(2.0));
    let bytes = JsonCodec.encode(&Value::Object(map)).unwrap();
    assert_eq!(bytes, br#"{"a":2,"b":1}"#);
}
