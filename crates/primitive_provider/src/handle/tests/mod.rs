// Copyright (C) Microsoft Corporation. All rights reserved.

use super::*;

fn sha256() -> Object {
    Object::Algorithm(Algorithm::open("SHA256", None, OpenFlags::empty()).expect("open sha256"))
}

#[test]
fn test_alloc_skips_null() {
    let mut table = HandleTable::default();
    let handle = table.alloc_handle(sha256());
    assert!(!handle.is_null());
    assert_eq!(*handle, 1);
    assert_eq!(table.get_handle_type(handle), Ok(HandleType::Algorithm));
}

#[test]
fn test_null_handle_rejected() {
    let table = HandleTable::default();
    assert!(matches!(table.algorithm(Handle::NULL), Err(CngError::InvalidHandle)));
    assert_eq!(table.get_handle_type(Handle::NULL), Err(CngError::InvalidHandle));
}

#[test]
fn test_wrong_type_rejected() {
    let mut table = HandleTable::default();
    let alg = table.alloc_handle(sha256());
    let secret = table.alloc_handle(Object::Secret(Secret::new(AlgId::EcdhP256, vec![1, 2, 3])));

    assert!(matches!(table.hash(alg), Err(CngError::InvalidHandle)));
    assert!(matches!(table.key(secret), Err(CngError::InvalidHandle)));
    assert_eq!(table.secret(secret).expect("secret handle").len(), 3);

    assert!(matches!(
        table.free_handle(alg, HandleType::Secret),
        Err(CngError::InvalidHandle)
    ));
    assert_eq!(table.len(), 2);
}

#[test]
fn test_double_free() {
    let mut table = HandleTable::default();
    let alg = table.alloc_handle(sha256());
    assert!(table.free_handle(alg, HandleType::Algorithm).is_ok());
    assert!(matches!(
        table.free_handle(alg, HandleType::Algorithm),
        Err(CngError::InvalidHandle)
    ));
    assert!(matches!(table.algorithm(alg), Err(CngError::InvalidHandle)));
}

#[test]
fn test_handles_not_reused_immediately() {
    let mut table = HandleTable::default();
    let first = table.alloc_handle(sha256());
    table
        .free_handle(first, HandleType::Algorithm)
        .expect("free first");
    let second = table.alloc_handle(sha256());
    assert_ne!(first, second);
}
