// Copyright (C) Microsoft Corporation. All rights reserved.

//! Locally implemented digest primitives.

use digest::Digest;

use super::*;

/// Running digest state for one of the built-in hash algorithms.
#[derive(Clone)]
pub(crate) enum DigestCtx {
    Md2(md2::Md2),
    Md4(md4::Md4),
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
}

impl DigestCtx {
    /// Creates a fresh context, or `None` if `alg_id` is not a hash.
    pub(crate) fn new(alg_id: AlgId) -> Option<Self> {
        let ctx = match alg_id {
            AlgId::Md2 => DigestCtx::Md2(md2::Md2::new()),
            AlgId::Md4 => DigestCtx::Md4(md4::Md4::new()),
            AlgId::Md5 => DigestCtx::Md5(md5::Md5::new()),
            AlgId::Sha1 => DigestCtx::Sha1(sha1::Sha1::new()),
            AlgId::Sha256 => DigestCtx::Sha256(sha2::Sha256::new()),
            AlgId::Sha384 => DigestCtx::Sha384(sha2::Sha384::new()),
            AlgId::Sha512 => DigestCtx::Sha512(sha2::Sha512::new()),
            _ => return None,
        };
        Some(ctx)
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            DigestCtx::Md2(d) => Digest::update(d, data),
            DigestCtx::Md4(d) => Digest::update(d, data),
            DigestCtx::Md5(d) => Digest::update(d, data),
            DigestCtx::Sha1(d) => Digest::update(d, data),
            DigestCtx::Sha256(d) => Digest::update(d, data),
            DigestCtx::Sha384(d) => Digest::update(d, data),
            DigestCtx::Sha512(d) => Digest::update(d, data),
        }
    }

    /// Writes the digest into `out` and resets the context.
    ///
    /// `out` must be exactly the digest length.
    pub(crate) fn finish_into(&mut self, out: &mut [u8]) -> Result<(), CngError> {
        if out.len() != self.output_len() {
            return Err(CngError::InvalidParameter);
        }

        match self {
            DigestCtx::Md2(d) => out.copy_from_slice(&d.finalize_reset()),
            DigestCtx::Md4(d) => out.copy_from_slice(&d.finalize_reset()),
            DigestCtx::Md5(d) => out.copy_from_slice(&d.finalize_reset()),
            DigestCtx::Sha1(d) => out.copy_from_slice(&d.finalize_reset()),
            DigestCtx::Sha256(d) => out.copy_from_slice(&d.finalize_reset()),
            DigestCtx::Sha384(d) => out.copy_from_slice(&d.finalize_reset()),
            DigestCtx::Sha512(d) => out.copy_from_slice(&d.finalize_reset()),
        }
        Ok(())
    }

    pub(crate) fn output_len(&self) -> usize {
        match self {
            DigestCtx::Md2(_) => <md2::Md2 as Digest>::output_size(),
            DigestCtx::Md4(_) => <md4::Md4 as Digest>::output_size(),
            DigestCtx::Md5(_) => <md5::Md5 as Digest>::output_size(),
            DigestCtx::Sha1(_) => <sha1::Sha1 as Digest>::output_size(),
            DigestCtx::Sha256(_) => <sha2::Sha256 as Digest>::output_size(),
            DigestCtx::Sha384(_) => <sha2::Sha384 as Digest>::output_size(),
            DigestCtx::Sha512(_) => <sha2::Sha512 as Digest>::output_size(),
        }
    }
}

/// Computes a plain digest of the concatenation of `parts`.
pub(crate) fn compute_digest(alg_id: AlgId, parts: &[&[u8]]) -> Result<Vec<u8>, CngError> {
    let mut ctx = DigestCtx::new(alg_id).ok_or(CngError::NotSupported)?;
    for part in parts {
        ctx.update(part);
    }
    let mut out = vec![0u8; ctx.output_len()];
    ctx.finish_into(&mut out)?;
    Ok(out)
}
