#![no_main]
use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use hwt::codec::Codec;
use hwt::{generate_keys, ExtendedJsonCodec, Hwt, Options};

fn engine() -> &'static Hwt {
    static ENGINE: OnceLock<Hwt> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let keyring = generate_keys(1).expect("keygen");
        let options = Options {
            format: "jx".into(),
            error_on_generate: true,
            max_token_size_bytes: 5120,
            ..Default::default()
        };
        Hwt::new(&options, &keyring).expect("engine")
    })
}

fuzz_target!(|data: &[u8]| {
    // Any value the jx codec can decode must survive create then verify.
    let Ok(value) = ExtendedJsonCodec.decode(data) else {
        return;
    };
    if let Ok(token) = engine().create_at(1_700_000_000, 60, &value, None) {
        let result = engine()
            .verify_at(1_700_000_000, &token, None)
            .expect("verify");
        assert!(result.ok, "fresh token rejected: {:?}", result.error);
    }
});
