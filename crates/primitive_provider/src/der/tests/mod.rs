// Copyright (C) Microsoft Corporation. All rights reserved.

use super::*;

#[test]
fn test_encode_pads_high_bit_and_strips_zeros() {
    let mut raw = [0u8; 64];
    raw[0] = 0x80;
    raw[31] = 0x01;
    raw[63] = 0x05;

    let der = signature_raw_to_der(&raw).expect("encode signature");
    let mut expected = vec![0x30, 0x26, 0x02, 0x21, 0x00, 0x80];
    expected.extend_from_slice(&[0u8; 30]);
    expected.extend_from_slice(&[0x01, 0x02, 0x01, 0x05]);
    assert_eq!(der, expected);
}

#[test]
fn test_decode_left_pads() {
    let der = [0x30, 0x06, 0x02, 0x01, 0x7f, 0x02, 0x01, 0x01];
    let raw = signature_der_to_raw(&der, 40).expect("decode signature");
    assert_eq!(raw.len(), 40);
    assert_eq!(raw[19], 0x7f);
    assert_eq!(raw[39], 0x01);
    assert!(raw[..19].iter().all(|&b| b == 0));
    assert!(raw[20..39].iter().all(|&b| b == 0));
}

#[test]
fn test_round_trip_widths() {
    for width in [40usize, 64, 96] {
        let raw: Vec<u8> = (0..width).map(|i| (i as u8).wrapping_mul(37).wrapping_add(200)).collect();
        let der = signature_raw_to_der(&raw).expect("encode");
        let back = signature_der_to_raw(&der, width).expect("decode");
        assert_eq!(back, raw);
    }
}

#[test]
fn test_zero_component() {
    let raw = [0u8; 64];
    let der = signature_raw_to_der(&raw).expect("encode zero");
    assert_eq!(der, [0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x00]);
    assert_eq!(signature_der_to_raw(&der, 64).expect("decode zero"), raw);
}

#[test]
fn test_component_too_wide() {
    let raw = [0xffu8; 96];
    let der = signature_raw_to_der(&raw).expect("encode p384 size");
    assert_eq!(signature_der_to_raw(&der, 64), Err(CngError::InternalError));
}

#[test]
fn test_malformed_input() {
    assert_eq!(signature_raw_to_der(&[]), Err(CngError::InvalidParameter));
    assert_eq!(signature_raw_to_der(&[1, 2, 3]), Err(CngError::InvalidParameter));
    assert_eq!(signature_der_to_raw(&[0x30, 0x03, 0x02], 64), Err(CngError::InvalidSignature));
}
