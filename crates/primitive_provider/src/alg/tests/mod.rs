// Copyright (C) Microsoft Corporation. All rights reserved.

use super::*;

#[test]
fn test_catalog_sizes() {
    assert_eq!(AlgId::Sha256.info(), AlgInfo::new(InterfaceClass::Hash, 286, 32, 512));
    assert_eq!(AlgId::Sha384.hash_length(), 48);
    assert_eq!(AlgId::Sha512.block_bytes(), 128);
    assert_eq!(AlgId::Md2.block_bytes(), 16);
    assert_eq!(AlgId::Aes.info().object_length, 654);
    assert_eq!(AlgId::Rsa.info().object_length, 0);
    assert_eq!(AlgId::Rng.class().id(), 6);
}

#[test]
fn test_catalog_names_round_trip() {
    for id in AlgId::iter() {
        assert_eq!(AlgId::from_str(id.name()), Ok(id));
    }
    assert_eq!(AlgId::EcdsaP384.name(), "ECDSA_P384");
}

#[test]
fn test_open_unknown_name() {
    let result = Algorithm::open("SHA3-256", None, OpenFlags::empty());
    assert_eq!(result, Err(CngError::NotSupported));
}

#[test]
fn test_open_foreign_implementation() {
    let result = Algorithm::open("SHA256", Some("Some Other Provider"), OpenFlags::empty());
    assert_eq!(result, Err(CngError::NotSupported));

    let alg = Algorithm::open("SHA256", Some(MS_PRIMITIVE_PROVIDER), OpenFlags::empty())
        .expect("open sha256 with explicit implementation");
    assert_eq!(alg.id(), AlgId::Sha256);
}

#[test]
fn test_open_flags() {
    let alg = Algorithm::open("SHA1", None, OpenFlags::HMAC | OpenFlags::HASH_REUSABLE)
        .expect("open reusable hmac");
    assert!(alg.flags().contains(OpenFlags::HMAC));

    let bad = OpenFlags::from_bits_retain(0x4);
    assert_eq!(
        Algorithm::open("SHA1", None, bad),
        Err(CngError::NotSupported)
    );
}

#[test]
fn test_default_mode_is_cbc() {
    let mut alg = Algorithm::open("AES", None, OpenFlags::empty()).expect("open aes");
    assert_eq!(alg.mode(), ChainingMode::Cbc);
    alg.set_mode(ChainingMode::Gcm).expect("set gcm");
    assert_eq!(alg.mode(), ChainingMode::Gcm);

    let mut sha = Algorithm::open("SHA256", None, OpenFlags::empty()).expect("open sha256");
    assert_eq!(sha.set_mode(ChainingMode::Ecb), Err(CngError::NotImplemented));
}

#[test]
fn test_chaining_mode_names() {
    assert_eq!(ChainingMode::Gcm.name(), "ChainingModeGCM");
    assert_eq!(ChainingMode::from_str("ChainingModeECB"), Ok(ChainingMode::Ecb));
    assert!(ChainingMode::from_str("ChainingModeCFB").is_err());
}

#[test]
fn test_enum_algorithms_all() {
    let all = enum_algorithms(0).expect("enumerate all");
    assert_eq!(all.len(), AlgId::iter().count());
    assert_eq!(all[0].name, "AES");
}

#[test]
fn test_enum_algorithms_filtered() {
    let hashes = enum_algorithms(OperationType::HASH.bits()).expect("enumerate hashes");
    let names: Vec<_> = hashes.iter().map(|a| a.name).collect();
    assert_eq!(names, ["SHA256", "SHA384", "SHA512", "SHA1", "MD5", "MD4", "MD2"]);

    let mixed = enum_algorithms((OperationType::CIPHER | OperationType::RNG).bits())
        .expect("enumerate cipher and rng");
    let names: Vec<_> = mixed.iter().map(|a| a.name).collect();
    assert_eq!(names, ["AES", "RNG"]);

    let signatures = enum_algorithms(OperationType::SIGNATURE.bits()).expect("enumerate signature");
    assert!(signatures.iter().all(|a| a.class == InterfaceClass::Signature));
    assert_eq!(signatures.len(), 4);
}

#[test]
fn test_enum_algorithms_bad_mask() {
    assert_eq!(enum_algorithms(0x40), Err(CngError::InvalidParameter));
}

#[test]
fn test_padding_names() {
    assert_eq!(AlgId::from_padding_name("SHA384"), Some(AlgId::Sha384));
    assert_eq!(AlgId::from_padding_name("MD4"), None);
    assert_eq!(AlgId::from_padding_name("AES"), None);
}
