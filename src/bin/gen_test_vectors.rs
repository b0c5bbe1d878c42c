#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
//! Generates the HWT regression vectors in testdata/hwt_vectors.json.
//! Run with: cargo run --bin gen_test_vectors > testdata/hwt_vectors.json

use hwt::primitives::b64url_encode;
use hwt::types::{EXTENDED_FORMAT, TOKEN_PREFIX};
use hwt::{jx, HashAlgorithm, Hwt, KeySpec, KeyringSpec, Options, Secret, Value};

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const ISSUED_AT: u64 = 1_999_999_940;
const TTL: i64 = 60;

struct Case {
    name: &'static str,
    hash: HashAlgorithm,
    signature_size: usize,
    format: &'static str,
    data: serde_json::Value,
    hidden: Option<serde_json::Value>,
}

fn main() {
    let cases = [
        Case {
            name: "j_sha256_full",
            hash: HashAlgorithm::Sha256,
            signature_size: 0,
            format: "j",
            data: serde_json::json!({"n": 3, "sub": "alice"}),
            hidden: None,
        },
        Case {
            name: "j_sha256_min",
            hash: HashAlgorithm::Sha256,
            signature_size: 22,
            format: "j",
            data: serde_json::json!({"n": 3, "sub": "alice"}),
            hidden: None,
        },
        Case {
            name: "j_sha256_hidden",
            hash: HashAlgorithm::Sha256,
            signature_size: 0,
            format: "j",
            data: serde_json::json!({"sub": "alice"}),
            hidden: Some(serde_json::json!({"ip": "10.0.0.1"})),
        },
        Case {
            name: "j_sha384_sig40",
            hash: HashAlgorithm::Sha384,
            signature_size: 40,
            format: "j",
            data: serde_json::json!(["read", "write"]),
            hidden: None,
        },
        Case {
            name: "j_sha512_full",
            hash: HashAlgorithm::Sha512,
            signature_size: 0,
            format: "j",
            data: serde_json::json!("plain string"),
            hidden: None,
        },
        Case {
            name: "jx_sha256_extended",
            hash: HashAlgorithm::Sha256,
            signature_size: 0,
            format: "jx",
            data: serde_json::json!({
                "at": [-7, 1, 1_700_000_000_000u64],
                "big": [-7, 2, "12345678901234567890"],
                "tags": [-7, 3, ["a", "b"]]
            }),
            hidden: None,
        },
        Case {
            name: "jx_sha256_bytes_hidden",
            hash: HashAlgorithm::Sha256,
            signature_size: 0,
            format: "jx",
            data: serde_json::json!([-7, 8, [0, 1, 254, 255]]),
            hidden: Some(serde_json::json!([-7, 4, [["k", 1]]])),
        },
    ];

    let keyring = KeyringSpec {
        current: Some("k1".into()),
        keys: vec![KeySpec {
            id: "k1".into(),
            secret: Secret::Text(SECRET.into()),
            created: None,
        }],
    };

    let vectors: Vec<serde_json::Value> = cases
        .iter()
        .map(|case| {
            let options = Options {
                hash: case.hash,
                signature_size: case.signature_size,
                format: case.format.into(),
                ..Default::default()
            };
            let hwt = Hwt::new(&options, &keyring).expect("engine");
            let value = |json: &serde_json::Value| {
                if case.format == EXTENDED_FORMAT {
                    jx::from_tagged(json)
                } else {
                    Value::from(json.clone())
                }
            };
            let data = value(&case.data);
            let hidden = case.hidden.as_ref().map(value);

            let token = hwt
                .create_at(ISSUED_AT, TTL, &data, hidden.as_ref())
                .expect("create");
            let fields: Vec<&str> = token.split('.').collect();
            assert_eq!(fields[0], TOKEN_PREFIX);
            let mut signing_input = fields[3..].join(".");
            if let Some(hidden) = &hidden {
                let codec = hwt.registry().lookup(case.format).expect("codec");
                signing_input.push('.');
                signing_input.push_str(&b64url_encode(&codec.encode(hidden).expect("hidden")));
            }

            let mut vector = serde_json::json!({
                "name": case.name,
                "hash": case.hash.name(),
                "signatureSize": case.signature_size,
                "format": case.format,
                "issuedAt": ISSUED_AT,
                "ttl": TTL,
                "data": case.data,
            });
            if let Some(hidden) = &case.hidden {
                vector["hidden"] = hidden.clone();
            }
            vector["signingInput"] = signing_input.into();
            vector["expected"] = token.into();
            vector
        })
        .collect();

    let output = serde_json::json!({
        "description": "HWT regression vectors. Key k1, secret \"0123456789abcdef0123456789abcdef\". jx inputs are given in tagged form.",
        "generated_by": "gen_test_vectors",
        "key": {"id": "k1", "secret": SECRET},
        "vectors": vectors,
    });

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}
