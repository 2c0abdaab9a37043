use cose_hpke::header::{self, HeaderMap, HeaderValue, HEADER_ENCAPSULATED_KEY};
use cose_hpke::suite::{ALG_A256GCM, ALG_HPKE_4_KEY_ENCRYPTION, ALG_HPKE_7_KEY_ENCRYPTION};
use cose_hpke::wire::{self, COSE_ENCRYPT_TAG, NONCE_BYTES};
use cose_hpke::{decrypt, encrypt, generate_key_pair, Error, KeyPair, Options, SuiteId};

fn pairs(suite: SuiteId, n: usize) -> Vec<KeyPair> {
    (0..n).map(|_| generate_key_pair(Some(suite)).unwrap()).collect()
}

fn publics(pairs: &[KeyPair]) -> Vec<Vec<u8>> {
    pairs.iter().map(|kp| kp.public_key.clone()).collect()
}

#[test]
fn each_of_n_recipients_can_open() {
    for suite in [SuiteId::Hpke4, SuiteId::Hpke7] {
        let options = Options::new().with_suite(suite);
        let group = pairs(suite, 4);
        let outsider = generate_key_pair(Some(suite)).unwrap();

        let ct = encrypt(b"team update", &publics(&group), &options).unwrap();
        for kp in &group {
            assert_eq!(decrypt(&ct, &kp.private_key, &Options::new()).unwrap(), b"team update");
        }
        assert!(matches!(
            decrypt(&ct, &outsider.private_key, &options),
            Err(Error::NoMatchingRecipient)
        ));
    }
}

#[test]
fn wire_shape() {
    let group = pairs(SuiteId::Hpke7, 2);
    let ct = encrypt(b"x", &publics(&group), &Options::new()).unwrap();

    // 96([...]) with four elements
    assert_eq!(&ct[..3], &[0xd8, 0x60, 0x84]);
    assert_eq!(COSE_ENCRYPT_TAG, 96);

    let msg = wire::parse_multi(&ct).unwrap();
    assert_eq!(msg.protected, header::build_protected_header(ALG_A256GCM).unwrap());
    assert_eq!(msg.unprotected.iv().map(<[u8]>::len), Some(NONCE_BYTES));
    assert_eq!(msg.recipients.len(), 2);
    for r in &msg.recipients {
        assert_eq!(
            header::parse_protected_header(&r.protected).unwrap().alg(),
            Some(ALG_HPKE_7_KEY_ENCRYPTION)
        );
        assert_eq!(r.unprotected.encapsulated_key().map(<[u8]>::len), Some(65));
        // 32-byte content key + 16-byte tag
        assert_eq!(r.ciphertext.len(), 48);
    }
}

#[test]
fn hpke4_recipient_alg() {
    let group = pairs(SuiteId::Hpke4, 2);
    let options = Options::new().with_suite(SuiteId::Hpke4);
    let ct = encrypt(b"x", &publics(&group), &options).unwrap();
    let msg = wire::parse_multi(&ct).unwrap();
    for r in &msg.recipients {
        assert_eq!(
            header::parse_protected_header(&r.protected).unwrap().alg(),
            Some(ALG_HPKE_4_KEY_ENCRYPTION)
        );
        assert_eq!(r.unprotected.encapsulated_key().map(<[u8]>::len), Some(32));
    }
}

#[test]
fn recipients_keep_input_order() {
    let (a_pub, a_priv) = cose_hpke::CoseKey::generate(None).unwrap();
    let (b_pub, _) = cose_hpke::CoseKey::generate(None).unwrap();
    let recipients = [
        a_pub.with_kid(b"a".to_vec()).encode().unwrap(),
        b_pub.with_kid(b"b".to_vec()).encode().unwrap(),
    ];
    let ct = encrypt(b"x", &recipients, &Options::new()).unwrap();
    let info = cose_hpke::inspect(&ct).unwrap();
    let kids: Vec<_> = info.recipients.iter().map(|r| r.kid.clone().unwrap()).collect();
    assert_eq!(kids, vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(decrypt(&ct, &a_priv.encode().unwrap(), &Options::new()).unwrap(), b"x");
}

#[test]
fn external_aad_binds_content_layer() {
    let group = pairs(SuiteId::Hpke7, 2);
    let options = Options::new().with_external_aad(b"doc-42".to_vec());
    let ct = encrypt(b"x", &publics(&group), &options).unwrap();

    assert_eq!(decrypt(&ct, &group[1].private_key, &options).unwrap(), b"x");
    // The content key still unwraps, so the failure is at the content layer.
    assert!(matches!(
        decrypt(&ct, &group[1].private_key, &Options::new()),
        Err(Error::DecryptionFailed { .. })
    ));
}

#[test]
fn recipient_extra_info_binds_key_wrap() {
    let group = pairs(SuiteId::Hpke4, 3);
    let options = Options::new()
        .with_suite(SuiteId::Hpke4)
        .with_recipient_extra_info(b"channel-7".to_vec());
    let ct = encrypt(b"x", &publics(&group), &options).unwrap();

    assert_eq!(decrypt(&ct, &group[2].private_key, &options).unwrap(), b"x");
    assert!(matches!(
        decrypt(&ct, &group[2].private_key, &Options::new()),
        Err(Error::NoMatchingRecipient)
    ));
}

#[test]
fn tampered_content_fails() {
    let group = pairs(SuiteId::Hpke7, 2);
    let ct = encrypt(b"payload", &publics(&group), &Options::new()).unwrap();
    let mut msg = wire::parse_multi(&ct).unwrap();
    msg.ciphertext[0] ^= 0x01;
    let tampered = wire::build_multi(&msg).unwrap();
    assert!(matches!(
        decrypt(&tampered, &group[0].private_key, &Options::new()),
        Err(Error::DecryptionFailed { .. })
    ));
}

#[test]
fn tampered_wrapped_key_only_affects_that_recipient() {
    let group = pairs(SuiteId::Hpke7, 2);
    let ct = encrypt(b"payload", &publics(&group), &Options::new()).unwrap();
    let mut msg = wire::parse_multi(&ct).unwrap();
    msg.recipients[0].ciphertext[5] ^= 0x01;
    let tampered = wire::build_multi(&msg).unwrap();

    assert!(matches!(
        decrypt(&tampered, &group[0].private_key, &Options::new()),
        Err(Error::NoMatchingRecipient)
    ));
    assert_eq!(decrypt(&tampered, &group[1].private_key, &Options::new()).unwrap(), b"payload");
}

#[test]
fn tampered_encapsulated_key_fails_that_recipient() {
    for suite in [SuiteId::Hpke4, SuiteId::Hpke7] {
        let options = Options::new().with_suite(suite);
        let group = pairs(suite, 2);
        let ct = encrypt(b"payload", &publics(&group), &options).unwrap();
        let msg = wire::parse_multi(&ct).unwrap();
        let ek = msg.recipients[0].unprotected.encapsulated_key().unwrap().to_vec();

        for i in 0..ek.len() {
            let mut bad = ek.clone();
            bad[i] ^= 0x01;
            let mut tampered = msg.clone();
            tampered.recipients[0].unprotected = HeaderMap::new();
            tampered.recipients[0]
                .unprotected
                .insert(HEADER_ENCAPSULATED_KEY, HeaderValue::Bytes(bad));
            let bytes = wire::build_multi(&tampered).unwrap();
            assert!(
                matches!(
                    decrypt(&bytes, &group[0].private_key, &options),
                    Err(Error::NoMatchingRecipient)
                ),
                "{suite} ek byte {i}"
            );
        }
    }
}

#[test]
fn tampered_content_protected_header_fails() {
    let group = pairs(SuiteId::Hpke7, 2);
    let ct = encrypt(b"payload", &publics(&group), &Options::new()).unwrap();
    let msg = wire::parse_multi(&ct).unwrap();
    for i in 0..msg.protected.len() {
        let mut tampered = msg.clone();
        tampered.protected[i] ^= 0x01;
        let bytes = wire::build_multi(&tampered).unwrap();
        assert!(
            matches!(
                decrypt(&bytes, &group[1].private_key, &Options::new()),
                Err(Error::DecryptionFailed { .. })
            ),
            "protected byte {i}"
        );
    }
}

#[test]
fn missing_iv_is_malformed() {
    let group = pairs(SuiteId::Hpke7, 2);
    let ct = encrypt(b"payload", &publics(&group), &Options::new()).unwrap();
    let mut msg = wire::parse_multi(&ct).unwrap();
    msg.unprotected = HeaderMap::new();
    let bytes = wire::build_multi(&msg).unwrap();
    assert!(matches!(
        decrypt(&bytes, &group[0].private_key, &Options::new()),
        Err(Error::MalformedMessage(_))
    ));
}

#[test]
fn mixed_key_types_are_rejected_on_seal() {
    let p256 = generate_key_pair(Some(SuiteId::Hpke7)).unwrap();
    let x25519 = generate_key_pair(Some(SuiteId::Hpke4)).unwrap();
    let result = encrypt(
        b"x",
        &[p256.public_key.clone(), x25519.public_key.clone()],
        &Options::new(),
    );
    assert!(matches!(result, Err(Error::InvalidKey(_))));
}

#[test]
fn untagged_multi_still_decrypts() {
    let group = pairs(SuiteId::Hpke7, 2);
    let ct = encrypt(b"payload", &publics(&group), &Options::new()).unwrap();
    // Strip the two-byte tag(96) prefix.
    assert_eq!(&ct[..2], &[0xd8, 0x60]);
    assert_eq!(decrypt(&ct[2..], &group[0].private_key, &Options::new()).unwrap(), b"payload");
}

#[test]
fn empty_recipient_list_fails() {
    let none: Vec<Vec<u8>> = Vec::new();
    assert!(matches!(
        encrypt(b"x", &none, &Options::new()),
        Err(Error::NoRecipients)
    ));
}
