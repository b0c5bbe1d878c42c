#![no_main]
use libfuzzer_sys::fuzz_target;
use hwt::keys::{KeyManager, KeyringSpec};
use hwt::HashAlgorithm;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Fuzz keyring parsing and import: rejections are errors, never panics.
    if let Ok(spec) = KeyringSpec::from_json(text) {
        if let Ok(keys) = KeyManager::import_keys(&spec, HashAlgorithm::Sha256) {
            // A successful import always has a usable current key.
            keys.current().expect("current key");
            assert!(!keys.is_empty());
        }
    }
});
