#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = cose_hpke::decode_fragment(text);
        let _ = cose_hpke::parse_shareable_url(text);
    }

    let fragment = cose_hpke::encode_fragment(data);
    assert_eq!(cose_hpke::decode_fragment(&fragment).ok().as_deref(), Some(data));
});
