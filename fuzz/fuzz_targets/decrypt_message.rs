#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use cose_hpke::{KeyPair, Options, SuiteId};

static KEYPAIRS: Lazy<[KeyPair; 2]> = Lazy::new(|| {
    [
        cose_hpke::generate_key_pair(Some(SuiteId::Hpke4)).unwrap(),
        cose_hpke::generate_key_pair(Some(SuiteId::Hpke7)).unwrap(),
    ]
});

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the key and splits off external aad.
    let kp = &KEYPAIRS[(data[0] & 1) as usize];
    let split = ((data[0] >> 1) as usize).min(data.len() - 1);
    let aad = &data[1..1 + split];
    let message = &data[1 + split..];

    let options = Options::new().with_external_aad(aad.to_vec());
    let _ = cose_hpke::decrypt(message, &kp.private_key, &options);
    let _ = cose_hpke::inspect(message);
});
