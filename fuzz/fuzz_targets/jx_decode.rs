#![no_main]
use libfuzzer_sys::fuzz_target;
use hwt::codec::Codec;
use hwt::{ExtendedJsonCodec, JsonCodec};

fuzz_target!(|data: &[u8]| {
    // Must never panic, regardless of input.
    if let Ok(value) = ExtendedJsonCodec.decode(data) {
        // Anything decoded re-encodes.
        ExtendedJsonCodec.encode(&value).expect("jx re-encode");
    }
    let _ = JsonCodec.decode(data);
});
