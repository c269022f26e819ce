// Copyright (C) Microsoft Corporation. All rights reserved.

//! DSA/ECDSA signature encoding.
//!
//! The provider exchanges signatures as fixed-width `r || s` strings, each
//! half big-endian and zero-padded to the component width. Backends speak
//! the DER form:
//!
//! ```text
//! Dss-Sig-Value ::= SEQUENCE {
//!   r INTEGER,
//!   s INTEGER
//! }
//! ```

use super::*;

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct DssSigValue {
    r: asn1::OwnedBigInt,
    s: asn1::OwnedBigInt,
}

/// Converts a fixed-width `r || s` signature to DER.
///
/// # Arguments
///
/// * `raw` - Concatenated `r` and `s`, each half of `raw`.
///
/// # Errors
///
/// * `CngError::InvalidParameter` - `raw` is empty or has odd length.
/// * `CngError::InternalError` - ASN.1 encoding failed.
pub fn signature_raw_to_der(raw: &[u8]) -> Result<Vec<u8>, CngError> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(CngError::InvalidParameter);
    }

    let (r, s) = raw.split_at(raw.len() / 2);
    let sig = DssSigValue {
        r: unsigned_int(r)?,
        s: unsigned_int(s)?,
    };

    asn1::write_single(&sig).map_err(|_| CngError::InternalError)
}

/// Converts a DER signature to fixed-width `r || s`.
///
/// # Arguments
///
/// * `der` - DER `SEQUENCE { r INTEGER, s INTEGER }`.
/// * `raw_len` - Total width of the output; each component gets half.
///
/// # Errors
///
/// * `CngError::InvalidSignature` - `der` does not parse.
/// * `CngError::InternalError` - A component is wider than its half.
pub fn signature_der_to_raw(der: &[u8], raw_len: usize) -> Result<Vec<u8>, CngError> {
    let sig: DssSigValue = asn1::parse_single(der).map_err(|_| CngError::InvalidSignature)?;

    let half = raw_len / 2;
    let mut raw = vec![0u8; half * 2];
    fixed_width(sig.r.as_bytes(), &mut raw[..half])?;
    fixed_width(sig.s.as_bytes(), &mut raw[half..])?;
    Ok(raw)
}

/// Strips leading zeros and prepends one when the top bit is set.
fn unsigned_int(bytes: &[u8]) -> Result<asn1::OwnedBigInt, CngError> {
    let bytes = bytes
        .iter()
        .position(|&b| b != 0)
        .map_or(&[][..], |pos| &bytes[pos..]);

    let needs_padding = bytes.first().map_or(true, |&b| b & 0x80 == 0x80);

    let mut vec = Vec::with_capacity(bytes.len() + needs_padding as usize);
    if needs_padding {
        vec.push(0);
    }
    vec.extend_from_slice(bytes);

    asn1::OwnedBigInt::new(vec).ok_or(CngError::InternalError)
}

/// Left-pads a DER integer's magnitude into `out`.
fn fixed_width(bytes: &[u8], out: &mut [u8]) -> Result<(), CngError> {
    let bytes = bytes
        .iter()
        .position(|&b| b != 0)
        .map_or(&[][..], |pos| &bytes[pos..]);

    if bytes.len() > out.len() {
        tracing::error!(len = bytes.len(), width = out.len(), "signature component too wide");
        return Err(CngError::InternalError);
    }

    let offset = out.len() - bytes.len();
    out[..offset].fill(0);
    out[offset..].copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests;
