// Copyright (C) Microsoft Corporation. All rights reserved.

//! Key derivation.
//!
//! Three families are provided:
//!
//! - [`pbkdf2`]: PBKDF2 (RFC 8018) over the algorithm's hash, HMAC-keyed with
//!   the password when the algorithm was opened with [`OpenFlags::HMAC`].
//! - [`derive_key_capi`]: the legacy CryptDeriveKey expansion of a finished
//!   hash object.
//! - [`derive_key`]: named KDFs over an agreed [`Secret`].

use std::str::FromStr;

use strum::EnumString;
use strum::IntoStaticStr;
use zeroize::Zeroizing;

use super::*;

/// Size of the CAPI ipad/opad buffers.
const CAPI_PAD_LEN: usize = 64;

const CAPI_INNER_PAD: u8 = 0x36;
const CAPI_OUTER_PAD: u8 = 0x5c;

/// Named KDFs accepted by [`derive_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum KdfName {
    /// Digest of `prepend || secret || append`.
    #[strum(serialize = "HASH")]
    Hash,
    /// The secret itself, byte-reversed and truncated to the output.
    #[strum(serialize = "TRUNCATE")]
    RawSecret,
}

impl KdfName {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Parameter of a named KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParameter<'a> {
    /// Digest algorithm name, e.g. `"SHA256"`.
    HashAlgorithm(&'a str),
    /// Bytes hashed before the secret.
    SecretPrepend(&'a [u8]),
    /// Bytes hashed after the secret.
    SecretAppend(&'a [u8]),
}

/// XOR of `U1..Uc` for block `index` (1-based).
fn pbkdf2_block(hash: &mut Hash, salt: &[u8], iterations: u64, index: u32, block: &mut [u8]) -> Result<(), CngError> {
    let len = hash.hash_length();
    let mut u = Zeroizing::new([0u8; MAX_HASH_OUTPUT_BYTES]);

    hash.update(salt)?;
    hash.update(&index.to_be_bytes())?;
    hash.finish(&mut u[..len])?;
    block.copy_from_slice(&u[..block.len()]);

    for _ in 1..iterations {
        let previous = Zeroizing::new(u[..len].to_vec());
        hash.update(&previous)?;
        hash.finish(&mut u[..len])?;
        block.iter_mut().zip(u.iter()).for_each(|(b, x)| *b ^= x);
    }
    Ok(())
}

/// Derives `output.len()` bytes from `password` and `salt` with PBKDF2.
///
/// # Arguments
///
/// * `alg` - Hash algorithm; opened with [`OpenFlags::HMAC`] for the
///   standard HMAC-based construction.
/// * `password` - PRF key.
/// * `salt` - Salt.
/// * `iterations` - Iteration count, at least one.
/// * `output` - Derived key; its length selects the key length.
///
/// # Errors
///
/// * `CngError::InvalidHandle` - `alg` is not a hash algorithm.
/// * `CngError::InvalidParameter` - Empty output or zero iterations.
pub fn pbkdf2(
    alg: &Algorithm,
    password: &[u8],
    salt: &[u8],
    iterations: u64,
    output: &mut [u8],
) -> Result<(), CngError> {
    if !alg.id().is_hash() {
        tracing::warn!(alg = alg.id().name(), "pbkdf2 over a non-hash algorithm");
        return Err(CngError::InvalidHandle);
    }
    if output.is_empty() || iterations == 0 {
        tracing::warn!(len = output.len(), iterations, "invalid pbkdf2 parameters");
        return Err(CngError::InvalidParameter);
    }

    let hmac = alg.flags().contains(OpenFlags::HMAC);
    let mut hash = Hash::new(alg.id(), hmac, true, password)?;
    let len = hash.hash_length();

    // RFC 8018 caps the key at (2^32 - 1) blocks.
    if output.len().div_ceil(len) > u32::MAX as usize {
        return Err(CngError::InvalidParameter);
    }

    for (index, block) in (1u32..).zip(output.chunks_mut(len)) {
        pbkdf2_block(&mut hash, salt, iterations, index, block)?;
    }
    Ok(())
}

/// Expands a hash object into key material the way CryptDeriveKey does.
///
/// The hash is finished. When its digest is shorter than `output`, the digest
/// is run through ipad/opad expansion to produce up to twice the digest
/// length.
///
/// # Errors
///
/// * `CngError::InvalidParameter` - `output` is empty, longer than twice the
///   digest length, or the hash is already finished.
pub fn derive_key_capi(hash: &mut Hash, output: &mut [u8]) -> Result<(), CngError> {
    let len = hash.hash_length();
    if output.is_empty() || output.len() > 2 * len {
        tracing::warn!(len = output.len(), hash_len = len, "invalid capi derived key length");
        return Err(CngError::InvalidParameter);
    }

    let mut buffer = Zeroizing::new([0u8; 2 * MAX_HASH_OUTPUT_BYTES]);
    hash.finish(&mut buffer[..len])?;

    if len < output.len() {
        let mut pad1 = Zeroizing::new([CAPI_INNER_PAD; CAPI_PAD_LEN]);
        let mut pad2 = Zeroizing::new([CAPI_OUTER_PAD; CAPI_PAD_LEN]);
        for (i, &b) in buffer[..len].iter().enumerate() {
            pad1[i] ^= b;
            pad2[i] ^= b;
        }

        hash.reset()?;
        hash.update(pad1.as_slice())?;
        hash.finish(&mut buffer[..len])?;

        hash.reset()?;
        hash.update(pad2.as_slice())?;
        hash.finish(&mut buffer[len..2 * len])?;
    }

    output.copy_from_slice(&buffer[..output.len()]);
    Ok(())
}

/// Derives key material from an agreed secret with a named KDF.
///
/// With `output == None` the full output length is returned. A short output
/// buffer truncates the result instead of failing; the written length is
/// returned.
///
/// # Arguments
///
/// * `secret` - Agreed secret.
/// * `kdf` - KDF name, `"HASH"` or `"TRUNCATE"`.
/// * `params` - KDF parameters; a later duplicate replaces an earlier one.
/// * `output` - Destination, or `None` for a size query.
///
/// # Errors
///
/// * `CngError::NotImplemented` - Unknown KDF name.
/// * `CngError::NotSupported` - The hash parameter does not name a digest.
pub fn derive_key(
    secret: &Secret,
    kdf: &str,
    params: &[KdfParameter<'_>],
    output: Option<&mut [u8]>,
) -> Result<usize, CngError> {
    let Ok(name) = KdfName::from_str(kdf) else {
        tracing::warn!(kdf, "unknown kdf");
        return Err(CngError::NotImplemented);
    };

    match name {
        KdfName::Hash => derive_hash(secret, params, output),
        KdfName::RawSecret => {
            let Some(output) = output else {
                return Ok(secret.len());
            };
            let n = secret.len().min(output.len());
            for (dst, src) in output.iter_mut().zip(secret.as_bytes().iter().rev()) {
                *dst = *src;
            }
            Ok(n)
        }
    }
}

fn derive_hash(secret: &Secret, params: &[KdfParameter<'_>], output: Option<&mut [u8]>) -> Result<usize, CngError> {
    let mut digest = AlgId::Sha1;
    let mut prepend: &[u8] = &[];
    let mut append: &[u8] = &[];

    for param in params {
        match *param {
            KdfParameter::HashAlgorithm(name) => {
                digest = AlgId::from_str(name)
                    .ok()
                    .filter(|id| id.is_hash())
                    .ok_or_else(|| {
                        tracing::warn!(name, "unsupported kdf hash algorithm");
                        CngError::NotSupported
                    })?;
            }
            KdfParameter::SecretPrepend(bytes) => prepend = bytes,
            KdfParameter::SecretAppend(bytes) => append = bytes,
        }
    }

    let len = digest.hash_length();
    let Some(output) = output else {
        return Ok(len);
    };

    let value = Zeroizing::new(compute_digest(digest, &[prepend, secret.as_bytes(), append])?);
    let n = len.min(output.len());
    output[..n].copy_from_slice(&value[..n]);
    Ok(n)
}

#[cfg(test)]
mod tests;
