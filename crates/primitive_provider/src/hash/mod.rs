// Copyright (C) Microsoft Corporation. All rights reserved.

//! Hash and HMAC engine.
//!
//! Digests are computed locally (see [`builtin`]) and need no backend. An
//! HMAC hash keeps two running contexts: the inner context is primed with
//! the key XOR `0x36`, the outer one with the key XOR `0x5c`, each padded to
//! the digest block size.
//!
//! # State machine
//!
//! `Created -> Updated* -> Finished`. A reusable hash re-primes itself on
//! finish and goes straight back to `Created`; any other hash rejects further
//! use with [`CngError::InvalidParameter`].

mod builtin;

pub(crate) use builtin::*;
use zeroize::Zeroizing;

use super::*;

const HMAC_INNER_PAD: u8 = 0x36;
const HMAC_OUTER_PAD: u8 = 0x5c;

/// Largest digest block size among the built-in algorithms, in bytes.
const MAX_HASH_BLOCK_BYTES: usize = 128;

/// Largest digest output among the built-in algorithms, in bytes.
pub(crate) const MAX_HASH_OUTPUT_BYTES: usize = 64;

/// Hash object behind a hash handle.
#[derive(Clone)]
pub struct Hash {
    alg_id: AlgId,
    hmac: bool,
    reusable: bool,
    secret: Zeroizing<Vec<u8>>,
    inner: DigestCtx,
    outer: Option<DigestCtx>,
    finished: bool,
}

impl Hash {
    /// Creates a hash and primes it for the first message.
    ///
    /// # Arguments
    ///
    /// * `alg_id` - Hash algorithm.
    /// * `hmac` - Compute an HMAC keyed with `secret`.
    /// * `reusable` - Re-initialize after every finish.
    /// * `secret` - HMAC key; ignored for plain hashes.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidHandle` - `alg_id` is not a hash algorithm.
    pub fn new(alg_id: AlgId, hmac: bool, reusable: bool, secret: &[u8]) -> Result<Self, CngError> {
        let inner = DigestCtx::new(alg_id).ok_or(CngError::InvalidHandle)?;

        let mut hash = Self {
            alg_id,
            hmac,
            reusable,
            secret: Zeroizing::new(secret.to_vec()),
            inner,
            outer: None,
            finished: false,
        };
        hash.prepare()?;
        Ok(hash)
    }

    fn prepare(&mut self) -> Result<(), CngError> {
        self.inner = DigestCtx::new(self.alg_id).ok_or(CngError::InternalError)?;
        self.finished = false;
        if !self.hmac {
            self.outer = None;
            return Ok(());
        }

        let block_bytes = self.alg_id.block_bytes();
        let mut pad = Zeroizing::new([0u8; MAX_HASH_BLOCK_BYTES]);
        if self.secret.len() > block_bytes {
            let hashed = Zeroizing::new(compute_digest(self.alg_id, &[self.secret.as_slice()])?);
            pad[..hashed.len()].copy_from_slice(&hashed);
        } else {
            pad[..self.secret.len()].copy_from_slice(&self.secret);
        }

        let mut outer = DigestCtx::new(self.alg_id).ok_or(CngError::InternalError)?;
        pad[..block_bytes].iter_mut().for_each(|b| *b ^= HMAC_OUTER_PAD);
        outer.update(&pad[..block_bytes]);
        pad[..block_bytes]
            .iter_mut()
            .for_each(|b| *b ^= HMAC_OUTER_PAD ^ HMAC_INNER_PAD);
        self.inner.update(&pad[..block_bytes]);
        self.outer = Some(outer);
        Ok(())
    }

    pub fn alg_id(&self) -> AlgId {
        self.alg_id
    }

    pub fn is_hmac(&self) -> bool {
        self.hmac
    }

    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    /// Digest length in bytes.
    pub fn hash_length(&self) -> usize {
        self.alg_id.hash_length()
    }

    /// Feeds `data` into the running digest. Empty input is a no-op.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CngError> {
        if self.finished {
            tracing::warn!(alg = self.alg_id.name(), "update on a finished hash");
            return Err(CngError::InvalidParameter);
        }
        if !data.is_empty() {
            self.inner.update(data);
        }
        Ok(())
    }

    /// Writes the digest (or HMAC) into `output`.
    ///
    /// # Arguments
    ///
    /// * `output` - Destination; must be exactly [`Hash::hash_length`] bytes.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidParameter` - Wrong output length, or the hash was
    ///   already finished and is not reusable.
    pub fn finish(&mut self, output: &mut [u8]) -> Result<(), CngError> {
        if self.finished {
            tracing::warn!(alg = self.alg_id.name(), "finish on a finished hash");
            return Err(CngError::InvalidParameter);
        }
        if output.len() != self.hash_length() {
            tracing::warn!(
                expected = self.hash_length(),
                actual = output.len(),
                "hash output length mismatch"
            );
            return Err(CngError::InvalidParameter);
        }

        match self.outer.as_mut() {
            None => self.inner.finish_into(output)?,
            Some(outer) => {
                let mut buffer = [0u8; MAX_HASH_OUTPUT_BYTES];
                let len = self.alg_id.hash_length();
                self.inner.finish_into(&mut buffer[..len])?;
                outer.update(&buffer[..len]);
                outer.finish_into(output)?;
            }
        }

        if self.reusable {
            self.prepare()
        } else {
            self.finished = true;
            Ok(())
        }
    }

    /// Re-primes the hash regardless of the reusable flag.
    pub(crate) fn reset(&mut self) -> Result<(), CngError> {
        self.prepare()
    }
}

/// One-shot digest or HMAC of `input`.
pub fn hash_once(alg_id: AlgId, hmac: bool, secret: &[u8], input: &[u8], output: &mut [u8]) -> Result<(), CngError> {
    let mut hash = Hash::new(alg_id, hmac, false, secret)?;
    hash.update(input)?;
    hash.finish(output)
}
