// Copyright (C) Microsoft Corporation. All rights reserved.

use super::*;

fn open(name: &str) -> Algorithm {
    Algorithm::open(name, None, OpenFlags::empty()).expect("open algorithm")
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes[..4].try_into().expect("four bytes"))
}

fn alg_u32(alg: &Algorithm, name: &str) -> Result<u32, CngError> {
    let mut buf = [0u8; 4];
    alg.property(name, Some(&mut buf))?;
    Ok(read_u32(&buf))
}

#[test]
fn test_generic_hash_properties() {
    let sha256 = open("SHA256");
    assert_eq!(alg_u32(&sha256, "ObjectLength"), Ok(286));
    assert_eq!(alg_u32(&sha256, "HashDigestLength"), Ok(32));

    let md2 = open("MD2");
    assert_eq!(alg_u32(&md2, "HashDigestLength"), Ok(16));

    let size = sha256.property("AlgorithmName", None).expect("name size");
    assert_eq!(size, 14);
    let mut name = vec![0u8; size];
    sha256.property("AlgorithmName", Some(&mut name)).expect("name");
    assert_eq!(name, utf16_property("SHA256"));
    assert_eq!(utf16_value(&name), Ok("SHA256".to_string()));
}

#[test]
fn test_generic_not_supported() {
    let rsa = open("RSA");
    assert_eq!(alg_u32(&rsa, "ObjectLength"), Err(CngError::NotSupported));
    assert_eq!(alg_u32(&rsa, "HashDigestLength"), Err(CngError::NotSupported));

    let aes = open("AES");
    assert_eq!(alg_u32(&aes, "ObjectLength"), Ok(654));
    assert_eq!(alg_u32(&aes, "HashDigestLength"), Err(CngError::NotSupported));
}

#[test]
fn test_size_query_and_short_buffer() {
    let sha1 = open("SHA1");
    assert_eq!(sha1.property("HashDigestLength", None), Ok(4));

    let mut short = [0u8; 3];
    assert_eq!(
        sha1.property("HashDigestLength", Some(&mut short)),
        Err(CngError::BufferTooSmall)
    );

    let mut name = [0u8; 9];
    assert_eq!(
        sha1.property("AlgorithmName", Some(&mut name)),
        Err(CngError::BufferTooSmall)
    );
}

#[test]
fn test_aes_properties() {
    let mut aes = open("AES");
    assert_eq!(alg_u32(&aes, "BlockLength"), Ok(16));

    let mut lengths = [0u8; LengthRange::LEN];
    aes.property("KeyLengths", Some(&mut lengths)).expect("key lengths");
    let range = LengthRange::parse(&lengths).expect("parse range");
    assert_eq!((range.min(), range.max(), range.increment()), (128, 256, 64));

    assert_eq!(aes.property("ChainingMode", None), Ok(CHAINING_MODE_PROPERTY_LEN));
    let mut mode = [0u8; CHAINING_MODE_PROPERTY_LEN];
    aes.property("ChainingMode", Some(&mut mode)).expect("mode");
    assert_eq!(utf16_value(&mode), Ok("ChainingModeCBC".to_string()));

    assert_eq!(aes.property("AuthTagLength", None), Err(CngError::NotSupported));
    aes.set_property("ChainingMode", &utf16_property("ChainingModeGCM"))
        .expect("set gcm");
    let mut tags = [0u8; LengthRange::LEN];
    aes.property("AuthTagLength", Some(&mut tags)).expect("tag lengths");
    let range = LengthRange::parse(&tags).expect("parse range");
    assert_eq!((range.min(), range.max(), range.increment()), (12, 16, 1));
}

#[test]
fn test_set_chaining_mode() {
    let mut aes = open("AES");
    aes.set_property("ChainingMode", &utf16_property("ChainingModeECB"))
        .expect("set ecb");
    assert_eq!(aes.mode(), ChainingMode::Ecb);

    assert_eq!(
        aes.set_property("ChainingMode", &utf16_property("ChainingModeCFB")),
        Err(CngError::NotImplemented)
    );
    assert_eq!(aes.mode(), ChainingMode::Ecb);

    assert_eq!(
        aes.set_property("ChainingMode", &[0x43, 0x00, 0x68]),
        Err(CngError::InvalidParameter)
    );
    assert_eq!(
        aes.set_property("BlockLength", &16u32.to_le_bytes()),
        Err(CngError::NotImplemented)
    );

    let mut sha = open("SHA256");
    assert_eq!(
        sha.set_property("ChainingMode", &utf16_property("ChainingModeECB")),
        Err(CngError::NotImplemented)
    );
}

#[test]
fn test_padding_schemes() {
    assert_eq!(alg_u32(&open("RSA"), "PaddingSchemes"), Ok(SUPPORTED_PAD_PKCS1_SIG));
    assert_eq!(alg_u32(&open("DSA"), "PaddingSchemes"), Err(CngError::NotSupported));
    assert_eq!(alg_u32(&open("ECDSA_P256"), "PaddingSchemes"), Err(CngError::NotImplemented));
}

#[test]
fn test_unknown_property() {
    let aes = open("AES");
    assert_eq!(aes.property("ProviderHandle", None), Err(CngError::NotImplemented));
    assert_eq!(aes.property("objectlength", None), Err(CngError::NotImplemented));
}

#[test]
fn test_hash_object_properties() {
    let hash = Hash::new(AlgId::Sha384, true, false, b"key").expect("hmac");
    let mut buf = [0u8; 4];
    hash.property("HashDigestLength", Some(&mut buf)).expect("digest length");
    assert_eq!(read_u32(&buf), 48);
    assert_eq!(hash.property("BlockLength", None), Err(CngError::NotImplemented));
}

#[test]
fn test_symmetric_key_properties() {
    let aes = open("AES");
    let mut key = Key::Symmetric(SymmetricKey::new(&aes, &[0u8; 32]).expect("aes key"));

    let mut buf = [0u8; 4];
    key.property("KeyLength", Some(&mut buf)).expect("key length");
    assert_eq!(read_u32(&buf), 256);
    key.property("KeyStrength", Some(&mut buf)).expect("key strength");
    assert_eq!(read_u32(&buf), 256);
    key.property("MessageBlockLength", Some(&mut buf)).expect("message block");
    assert_eq!(read_u32(&buf), 16);
    key.property("BlockLength", Some(&mut buf)).expect("block length");
    assert_eq!(read_u32(&buf), 16);

    key.set_property("ChainingMode", &utf16_property("ChainingModeGCM"))
        .expect("set key mode");
    let mut mode = [0u8; CHAINING_MODE_PROPERTY_LEN];
    key.property("ChainingMode", Some(&mut mode)).expect("key mode");
    assert_eq!(utf16_value(&mode), Ok("ChainingModeGCM".to_string()));

    // Keys never report tag lengths, even in GCM mode.
    assert_eq!(key.property("AuthTagLength", None), Err(CngError::NotSupported));
    // The algorithm keeps its own mode.
    assert_eq!(aes.mode(), ChainingMode::Cbc);
}

#[test]
fn test_asymmetric_key_properties() {
    let alg = open("ECDSA_P384");
    let mut key = Key::Asymmetric(AsymmetricKey::new(&alg, 384).expect("allocate key"));

    let mut buf = [0u8; 4];
    key.property("KeyLength", Some(&mut buf)).expect("key length");
    assert_eq!(read_u32(&buf), 384);
    assert_eq!(key.property("BlockLength", None), Err(CngError::NotImplemented));
    assert_eq!(
        key.set_property("ChainingMode", &utf16_property("ChainingModeECB")),
        Err(CngError::NotImplemented)
    );
}
