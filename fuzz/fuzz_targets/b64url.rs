#![no_main]
use libfuzzer_sys::fuzz_target;
use hwt::primitives::{b64url_decode, b64url_encode, constant_time_eq};

fuzz_target!(|data: &[u8]| {
    // Encoding is lossless.
    let text = b64url_encode(data);
    assert_eq!(b64url_decode(&text), data);

    // Arbitrary text decodes without panicking.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = b64url_decode(text);
    }

    assert!(constant_time_eq(data, data));
});
