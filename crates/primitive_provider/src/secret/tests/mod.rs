// Copyright (C) Microsoft Corporation. All rights reserved.

use super::*;

fn dispatch() -> Dispatch {
    Dispatch::probe(&[BackendKind::OpenSsl, BackendKind::BigNum])
}

fn key_pair(name: &str, bits: u32, dispatch: &Dispatch) -> AsymmetricKey {
    let alg = Algorithm::open(name, None, OpenFlags::empty()).expect("open algorithm");
    let mut key = AsymmetricKey::new(&alg, bits).expect("allocate key pair");
    key.finalize(dispatch).expect("finalize key pair");
    key
}

#[test]
fn test_agreement_is_symmetric() {
    let dispatch = dispatch();
    for (name, bits) in [("ECDH_P256", 256), ("ECDH_P384", 384)] {
        let a = key_pair(name, bits, &dispatch);
        let b = key_pair(name, bits, &dispatch);

        let ab = Secret::agree(&a, &b, &dispatch).expect("agree a b");
        let ba = Secret::agree(&b, &a, &dispatch).expect("agree b a");
        assert_eq!(ab.len(), bits as usize / 8);
        assert_eq!(ab.as_bytes(), ba.as_bytes());
        assert_eq!(ab.alg_id().name(), name);
        assert!(!ab.is_empty());
    }
}

#[test]
fn test_agreement_with_bignum_only() {
    // The fallback backend cannot export keys generated by another backend.
    let full = dispatch();
    let a = key_pair("ECDH_P256", 256, &full);
    let b = key_pair("ECDH_P256", 256, &full);

    let bignum = Dispatch::probe(&[BackendKind::BigNum]);
    assert_eq!(
        Secret::agree(&a, &b, &bignum).map(|s| s.len()),
        Err(CngError::NotImplemented)
    );
}

#[test]
fn test_agreement_errors() {
    let dispatch = dispatch();
    let p256 = key_pair("ECDH_P256", 256, &dispatch);
    let p384 = key_pair("ECDH_P384", 384, &dispatch);
    assert_eq!(
        Secret::agree(&p256, &p384, &dispatch).map(|s| s.len()),
        Err(CngError::InvalidParameter)
    );

    let ecdsa = key_pair("ECDSA_P256", 256, &dispatch);
    assert_eq!(
        Secret::agree(&ecdsa, &ecdsa, &dispatch).map(|s| s.len()),
        Err(CngError::NotSupported)
    );

    let alg = Algorithm::open("ECDH_P256", None, OpenFlags::empty()).expect("open algorithm");
    let empty = AsymmetricKey::new(&alg, 256).expect("allocate key pair");
    assert_eq!(
        Secret::agree(&p256, &empty, &dispatch).map(|s| s.len()),
        Err(CngError::InvalidParameter)
    );
    assert_eq!(
        Secret::agree(&empty, &p256, &dispatch).map(|s| s.len()),
        Err(CngError::InvalidParameter)
    );
}

#[test]
fn test_secret_debug_hides_value() {
    let secret = Secret::new(AlgId::EcdhP256, vec![0xab; 32]);
    let text = format!("{secret:?}");
    assert!(text.contains("len: 32"));
    assert!(!text.contains("171"));
}
