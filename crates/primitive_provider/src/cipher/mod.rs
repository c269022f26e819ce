// Copyright (C) Microsoft Corporation. All rights reserved.

//! Symmetric cipher engine.
//!
//! A [`SymmetricKey`] owns the secret, the chaining mode and the current
//! initialization vector. The backend [`CipherContext`] is created lazily on
//! the first transform and cached until the vector changes.
//!
//! # Context invalidation
//!
//! Every call replaces the stored vector. The cached context survives only
//! when the new vector is present, all zero, and equal to the previous one;
//! in every other case the context is dropped so a fresh IV can never be
//! served by a context keyed to an old one. A change of direction also drops
//! the context.

use std::fmt;

use bitflags::bitflags;
use zeroize::Zeroizing;

use super::*;

/// AES block length in bytes.
pub const AES_BLOCK_LENGTH: usize = 16;

/// Smallest accepted GCM tag length in bytes.
pub const GCM_MIN_TAG_LENGTH: usize = 12;

/// Largest accepted GCM tag length in bytes.
pub const GCM_MAX_TAG_LENGTH: usize = 16;

bitflags! {
    /// Flags accepted by [`SymmetricKey::encrypt`] and [`SymmetricKey::decrypt`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EncryptFlags: u32 {
        /// Apply PKCS-style block padding (non-GCM modes only).
        const BLOCK_PADDING = 0x0000_0001;
    }
}

/// Authenticated cipher parameters for GCM.
///
/// On encryption the tag buffer receives the computed tag; on decryption it
/// holds the expected tag.
#[derive(Debug, Default)]
pub struct AuthInfo<'a> {
    pub nonce: Option<&'a [u8]>,
    pub aad: Option<&'a [u8]>,
    pub tag: Option<&'a mut [u8]>,
    /// Request call chaining across several encrypt calls. Not supported;
    /// every call is treated as a complete message.
    pub chain_calls: bool,
}

fn is_zero_vector(vector: Option<&[u8]>) -> bool {
    vector.is_some_and(|v| v.iter().all(|&b| b == 0))
}

/// Symmetric key.
pub struct SymmetricKey {
    alg_id: AlgId,
    mode: ChainingMode,
    block_size: usize,
    secret: Zeroizing<Vec<u8>>,
    vector: Option<Zeroizing<Vec<u8>>>,
    ctx: Option<Box<dyn CipherContext>>,
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("alg_id", &self.alg_id)
            .field("mode", &self.mode)
            .field("key_bits", &(self.secret.len() * 8))
            .field("has_context", &self.ctx.is_some())
            .finish_non_exhaustive()
    }
}

impl SymmetricKey {
    /// Creates a key from raw secret bytes.
    ///
    /// The key inherits the chaining mode of `alg`.
    ///
    /// # Errors
    ///
    /// * `CngError::NotSupported` - `alg` is not a cipher algorithm.
    /// * `CngError::InvalidParameter` - The secret is not 16, 24 or 32 bytes.
    pub fn new(alg: &Algorithm, secret: &[u8]) -> Result<Self, CngError> {
        if alg.id() != AlgId::Aes {
            tracing::warn!(alg = alg.id().name(), "symmetric key for a non-cipher algorithm");
            return Err(CngError::NotSupported);
        }
        if !matches!(secret.len(), 16 | 24 | 32) {
            tracing::warn!(len = secret.len(), "unsupported AES key length");
            return Err(CngError::InvalidParameter);
        }

        Ok(Self {
            alg_id: alg.id(),
            mode: alg.mode(),
            block_size: AES_BLOCK_LENGTH,
            secret: Zeroizing::new(secret.to_vec()),
            vector: None,
            ctx: None,
        })
    }

    pub fn alg_id(&self) -> AlgId {
        self.alg_id
    }

    pub fn mode(&self) -> ChainingMode {
        self.mode
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Key length in bits.
    pub fn bits(&self) -> u32 {
        self.secret.len() as u32 * 8
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Changes the chaining mode and drops the cached context.
    pub(crate) fn set_mode(&mut self, mode: ChainingMode) {
        self.mode = mode;
        self.vector = None;
        self.ctx = None;
    }

    /// Copies the secret and mode; vector and context start fresh.
    pub fn duplicate(&self) -> Self {
        Self {
            alg_id: self.alg_id,
            mode: self.mode,
            block_size: self.block_size,
            secret: self.secret.clone(),
            vector: None,
            ctx: None,
        }
    }

    fn set_vector(&mut self, vector: Option<&[u8]>) {
        let unchanged = match (self.vector.as_deref(), vector) {
            (None, None) => true,
            (Some(old), Some(new)) => old.as_slice() == new,
            _ => false,
        };
        let needs_reset = !is_zero_vector(vector) || !unchanged;

        self.vector = vector.map(|v| Zeroizing::new(v.to_vec()));
        if needs_reset {
            self.ctx = None;
        }
    }

    fn context(
        &mut self,
        dispatch: &Dispatch,
        direction: CipherDirection,
    ) -> Result<&mut Box<dyn CipherContext>, CngError> {
        if self
            .ctx
            .as_ref()
            .map_or(true, |ctx| ctx.direction() != direction)
        {
            // CBC without a caller IV runs from an all-zero vector.
            let zero_iv = [0u8; AES_BLOCK_LENGTH];
            let vector = match (self.mode, self.vector.as_deref()) {
                (ChainingMode::Cbc, None) => Some(&zero_iv[..]),
                (_, vector) => vector.map(|v| v.as_slice()),
            };
            let ctx = dispatch.cipher_init(self.mode, &self.secret, vector, direction)?;
            self.ctx = Some(ctx);
        }
        self.ctx.as_mut().ok_or(CngError::InternalError)
    }

    fn transform(
        &mut self,
        dispatch: &Dispatch,
        direction: CipherDirection,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, CngError> {
        let ctx = self.context(dispatch, direction)?;
        match direction {
            CipherDirection::Encrypt => ctx.encrypt(input, output),
            CipherDirection::Decrypt => ctx.decrypt(input, output),
        }
    }

    fn check_auth_info(auth: &AuthInfo<'_>) -> Result<(), CngError> {
        if auth.nonce.is_none() || auth.tag.is_none() {
            tracing::warn!("GCM call without nonce or tag");
            return Err(CngError::InvalidParameter);
        }
        let tag_len = auth.tag.as_deref().map_or(0, <[u8]>::len);
        if !(GCM_MIN_TAG_LENGTH..=GCM_MAX_TAG_LENGTH).contains(&tag_len) {
            tracing::warn!(tag_len, "GCM tag length out of range");
            return Err(CngError::InvalidParameter);
        }
        if auth.chain_calls {
            tracing::warn!("GCM call chaining is not supported, treating call as complete");
        }
        Ok(())
    }

    /// Encrypts `input`.
    ///
    /// With `output` set to `None` the required output size is returned and
    /// nothing is transformed.
    ///
    /// # Arguments
    ///
    /// * `dispatch` - Backend table used to create the cipher context.
    /// * `input` - Plaintext.
    /// * `auth` - GCM parameters; required in GCM mode, ignored otherwise.
    /// * `iv` - Initialization vector (CBC); must be `None` in ECB mode.
    /// * `output` - Ciphertext destination.
    /// * `flags` - [`EncryptFlags::BLOCK_PADDING`] to pad the last block.
    ///
    /// # Returns
    ///
    /// The number of ciphertext bytes.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidParameter` - Missing GCM parameters, a tag length
    ///   outside 12..=16, padding requested in GCM mode, or an IV in ECB mode.
    /// * `CngError::InvalidBufferSize` - Unpadded input is not block aligned.
    /// * `CngError::BufferTooSmall` - `output` is shorter than required.
    pub fn encrypt(
        &mut self,
        dispatch: &Dispatch,
        input: &[u8],
        auth: Option<&mut AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: EncryptFlags,
    ) -> Result<usize, CngError> {
        if self.mode == ChainingMode::Gcm {
            let auth = auth.ok_or(CngError::InvalidParameter)?;
            Self::check_auth_info(auth)?;
            self.set_vector(auth.nonce);

            if flags.contains(EncryptFlags::BLOCK_PADDING) {
                return Err(CngError::InvalidParameter);
            }
            let Some(output) = output else {
                return Ok(input.len());
            };
            if output.len() < input.len() {
                return Err(CngError::BufferTooSmall);
            }

            let result = self.gcm_encrypt(dispatch, input, auth, output);
            // A finalized GCM context cannot be reused.
            self.ctx = None;
            return result;
        }

        let block = self.block_size;
        let padding = flags.contains(EncryptFlags::BLOCK_PADDING);
        let required = if padding {
            (input.len() + block) & !(block - 1)
        } else if input.len() % block != 0 {
            return Err(CngError::InvalidBufferSize);
        } else {
            input.len()
        };

        let Some(output) = output else {
            return Ok(required);
        };
        if output.len() < required {
            return Err(CngError::BufferTooSmall);
        }
        if self.mode == ChainingMode::Ecb && iv.is_some() {
            tracing::warn!("IV supplied in ECB mode");
            return Err(CngError::InvalidParameter);
        }
        self.set_vector(iv);

        let full = input.len() - input.len() % block;
        for (src, dst) in input[..full]
            .chunks_exact(block)
            .zip(output[..full].chunks_exact_mut(block))
        {
            self.transform(dispatch, CipherDirection::Encrypt, src, dst)?;
            if self.mode == ChainingMode::Ecb {
                self.set_vector(None);
            }
        }

        if padding {
            let tail = &input[full..];
            let pad = (block - tail.len()) as u8;
            let mut last = Zeroizing::new(vec![pad; block]);
            last[..tail.len()].copy_from_slice(tail);
            self.transform(
                dispatch,
                CipherDirection::Encrypt,
                &last,
                &mut output[full..full + block],
            )?;
        }

        Ok(required)
    }

    fn gcm_encrypt(
        &mut self,
        dispatch: &Dispatch,
        input: &[u8],
        auth: &mut AuthInfo<'_>,
        output: &mut [u8],
    ) -> Result<usize, CngError> {
        let ctx = self.context(dispatch, CipherDirection::Encrypt)?;
        ctx.set_aad(auth.aad.unwrap_or_default())?;
        ctx.encrypt(input, &mut output[..input.len()])?;
        let tag = auth.tag.as_deref_mut().ok_or(CngError::InvalidParameter)?;
        ctx.get_tag(tag)?;
        Ok(input.len())
    }

    /// Decrypts `input`.
    ///
    /// With `output` set to `None` the input length is returned as an upper
    /// bound; with block padding the exact plaintext length is only known
    /// after the last block is decrypted.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidParameter` - Missing GCM parameters, a tag length
    ///   outside 12..=16, padding requested in GCM mode, or an IV in ECB mode.
    /// * `CngError::InvalidBufferSize` - Input is not block aligned.
    /// * `CngError::BufferTooSmall` - `output` cannot hold the plaintext.
    /// * `CngError::AuthTagMismatch` - The GCM tag does not match.
    /// * `CngError::DataError` - The block padding is malformed.
    pub fn decrypt(
        &mut self,
        dispatch: &Dispatch,
        input: &[u8],
        auth: Option<&AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: EncryptFlags,
    ) -> Result<usize, CngError> {
        if self.mode == ChainingMode::Gcm {
            let auth = auth.ok_or(CngError::InvalidParameter)?;
            Self::check_auth_info(auth)?;
            self.set_vector(auth.nonce);

            if flags.contains(EncryptFlags::BLOCK_PADDING) {
                return Err(CngError::InvalidParameter);
            }
            let Some(output) = output else {
                return Ok(input.len());
            };
            if output.len() < input.len() {
                return Err(CngError::BufferTooSmall);
            }

            let result = self.gcm_decrypt(dispatch, input, auth, output);
            self.ctx = None;
            return result;
        }

        let block = self.block_size;
        if input.len() % block != 0 {
            return Err(CngError::InvalidBufferSize);
        }
        let Some(output) = output else {
            return Ok(input.len());
        };

        let padding = flags.contains(EncryptFlags::BLOCK_PADDING);
        let mut bulk = input.len();
        if padding {
            if output.len() + block < input.len() || input.len() < block {
                return Err(CngError::BufferTooSmall);
            }
            bulk -= block;
        } else if output.len() < input.len() {
            return Err(CngError::BufferTooSmall);
        }

        if self.mode == ChainingMode::Ecb && iv.is_some() {
            tracing::warn!("IV supplied in ECB mode");
            return Err(CngError::InvalidParameter);
        }
        self.set_vector(iv);

        for (src, dst) in input[..bulk]
            .chunks_exact(block)
            .zip(output[..bulk].chunks_exact_mut(block))
        {
            self.transform(dispatch, CipherDirection::Decrypt, src, dst)?;
            if self.mode == ChainingMode::Ecb {
                self.set_vector(None);
            }
        }

        if !padding {
            return Ok(input.len());
        }

        let mut last = Zeroizing::new(vec![0u8; block]);
        self.transform(dispatch, CipherDirection::Decrypt, &input[bulk..], &mut last)?;

        let pad = last[block - 1] as usize;
        if pad == 0 || pad > block || last[block - pad..].iter().any(|&b| b as usize != pad) {
            tracing::warn!("malformed block padding");
            return Err(CngError::DataError);
        }

        let plain_len = input.len() - pad;
        if output.len() < plain_len {
            return Err(CngError::BufferTooSmall);
        }
        output[bulk..plain_len].copy_from_slice(&last[..block - pad]);
        Ok(plain_len)
    }

    fn gcm_decrypt(
        &mut self,
        dispatch: &Dispatch,
        input: &[u8],
        auth: &AuthInfo<'_>,
        output: &mut [u8],
    ) -> Result<usize, CngError> {
        let ctx = self.context(dispatch, CipherDirection::Decrypt)?;
        ctx.set_aad(auth.aad.unwrap_or_default())?;
        ctx.decrypt(input, &mut output[..input.len()])?;
        let tag = auth.tag.as_deref().ok_or(CngError::InvalidParameter)?;
        ctx.verify_tag(tag)?;
        Ok(input.len())
    }
}
