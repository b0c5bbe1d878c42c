#![no_main]
use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use hwt::{generate_keys, Hwt, Options};

fn engine() -> &'static Hwt {
    static ENGINE: OnceLock<Hwt> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let keyring = generate_keys(2).expect("keygen");
        Hwt::new(&Options::default(), &keyring).expect("engine")
    })
}

fuzz_target!(|data: &[u8]| {
    // Must never panic, regardless of input.
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };
    let _ = engine().verify_at(1_700_000_000, token, None);
    let _ = engine().decode(token);
});
