#![no_main]
use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use hwt::{generate_keys, jx, Hwt, Options};

fn engine() -> &'static Hwt {
    static ENGINE: OnceLock<Hwt> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let keyring = generate_keys(1).expect("keygen");
        let options = Options {
            format: "jx".into(),
            ..Default::default()
        };
        Hwt::new(&options, &keyring).expect("engine")
    })
}

/// Builds a token around fuzzed payload bytes and exercises everything the
/// decoder returns. Signature checks fail, so this reaches the codecs.
fuzz_target!(|data: &[u8]| {
    let payload = hwt::primitives::b64url_encode(data);
    for format in ["j", "jx", ""] {
        let token = format!("hwt.sig.kid.1700000000.{format}.{payload}");
        if let Ok(decoded) = engine().decode(&token) {
            let _ = decoded.key_id.len();
            let _ = decoded.signature.len();
            let _ = decoded.expires;
            // Tagged output must be valid JSON.
            let tagged = jx::to_tagged(&decoded.data);
            let _ = serde_json::to_string(&tagged).expect("tagged value serializes");
        }
        let result = engine().verify_at(1_700_000_000, &token, None).expect("non-strict");
        assert!(!result.ok);
    }
});
