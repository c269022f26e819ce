// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL AES cipher contexts for ECB, CBC and GCM.

use openssl::cipher::*;
use openssl::cipher_ctx::*;

use super::*;

/// GCM standard nonce length; other lengths are set explicitly.
const GCM_DEFAULT_NONCE_LEN: usize = 12;
const AES_BLOCK_SIZE: usize = 16;

/// AES cipher context with padding disabled.
pub struct OsslCipherContext {
    ctx: CipherCtx,
    mode: ChainingMode,
    direction: CipherDirection,
}

impl OsslCipherContext {
    pub(crate) fn new(
        mode: ChainingMode,
        secret: &[u8],
        vector: Option<&[u8]>,
        direction: CipherDirection,
    ) -> Result<Self, CngError> {
        let cipher = Self::cipher(mode, secret.len())?;
        let mut ctx = CipherCtx::new().map_err(|_| CngError::NoMemory)?;

        match mode {
            ChainingMode::Ecb => {
                Self::init(&mut ctx, direction, Some(cipher), Some(secret), None)?;
            }
            ChainingMode::Cbc => {
                let iv = vector.ok_or(CngError::InvalidParameter)?;
                if iv.len() < AES_BLOCK_SIZE {
                    return Err(CngError::InvalidParameter);
                }
                Self::init(
                    &mut ctx,
                    direction,
                    Some(cipher),
                    Some(secret),
                    Some(&iv[..AES_BLOCK_SIZE]),
                )?;
            }
            ChainingMode::Gcm => {
                let nonce = vector
                    .filter(|n| !n.is_empty())
                    .ok_or(CngError::InvalidParameter)?;
                if nonce.len() == GCM_DEFAULT_NONCE_LEN {
                    Self::init(&mut ctx, direction, Some(cipher), Some(secret), Some(nonce))?;
                } else {
                    Self::init(&mut ctx, direction, Some(cipher), None, None)?;
                    ctx.set_iv_length(nonce.len()).map_err(backend_error)?;
                    Self::init(&mut ctx, direction, None, Some(secret), Some(nonce))?;
                }
            }
        }
        ctx.set_padding(false);

        Ok(Self {
            ctx,
            mode,
            direction,
        })
    }

    fn init(
        ctx: &mut CipherCtxRef,
        direction: CipherDirection,
        cipher: Option<&CipherRef>,
        key: Option<&[u8]>,
        iv: Option<&[u8]>,
    ) -> Result<(), CngError> {
        match direction {
            CipherDirection::Encrypt => ctx.encrypt_init(cipher, key, iv),
            CipherDirection::Decrypt => ctx.decrypt_init(cipher, key, iv),
        }
        .map_err(backend_error)
    }

    fn cipher(mode: ChainingMode, key_size: usize) -> Result<&'static CipherRef, CngError> {
        match (mode, key_size) {
            (ChainingMode::Ecb, 16) => Ok(Cipher::aes_128_ecb()),
            (ChainingMode::Ecb, 24) => Ok(Cipher::aes_192_ecb()),
            (ChainingMode::Ecb, 32) => Ok(Cipher::aes_256_ecb()),
            (ChainingMode::Cbc, 16) => Ok(Cipher::aes_128_cbc()),
            (ChainingMode::Cbc, 24) => Ok(Cipher::aes_192_cbc()),
            (ChainingMode::Cbc, 32) => Ok(Cipher::aes_256_cbc()),
            (ChainingMode::Gcm, 16) => Ok(Cipher::aes_128_gcm()),
            (ChainingMode::Gcm, 24) => Ok(Cipher::aes_192_gcm()),
            (ChainingMode::Gcm, 32) => Ok(Cipher::aes_256_gcm()),
            _ => Err(CngError::InvalidParameter),
        }
    }

    fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CngError> {
        if output.len() < input.len() {
            return Err(CngError::BufferTooSmall);
        }
        if input.is_empty() {
            return Ok(0);
        }

        // Block ciphers need room for one extra block in the update buffer.
        let count = if self.mode == ChainingMode::Gcm {
            self.ctx
                .cipher_update(input, Some(&mut output[..input.len()]))
                .map_err(backend_error)?
        } else {
            let mut scratch = zeroize::Zeroizing::new(vec![0u8; input.len() + AES_BLOCK_SIZE]);
            let count = self
                .ctx
                .cipher_update(input, Some(&mut scratch))
                .map_err(backend_error)?;
            output[..count].copy_from_slice(&scratch[..count]);
            count
        };
        Ok(count)
    }
}

impl CipherContext for OsslCipherContext {
    fn direction(&self) -> CipherDirection {
        self.direction
    }

    fn set_aad(&mut self, aad: &[u8]) -> Result<(), CngError> {
        if self.mode != ChainingMode::Gcm {
            return Err(CngError::NotSupported);
        }
        if !aad.is_empty() {
            self.ctx.cipher_update(aad, None).map_err(backend_error)?;
        }
        Ok(())
    }

    fn encrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CngError> {
        if self.direction != CipherDirection::Encrypt {
            return Err(CngError::InternalError);
        }
        self.update(input, output)
    }

    fn decrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CngError> {
        if self.direction != CipherDirection::Decrypt {
            return Err(CngError::InternalError);
        }
        self.update(input, output)
    }

    fn get_tag(&mut self, tag: &mut [u8]) -> Result<(), CngError> {
        if self.mode != ChainingMode::Gcm || self.direction != CipherDirection::Encrypt {
            return Err(CngError::NotSupported);
        }
        let mut final_block = [0u8; AES_BLOCK_SIZE];
        self.ctx
            .cipher_final(&mut final_block)
            .map_err(backend_error)?;
        self.ctx.tag(tag).map_err(backend_error)
    }

    fn verify_tag(&mut self, tag: &[u8]) -> Result<(), CngError> {
        if self.mode != ChainingMode::Gcm || self.direction != CipherDirection::Decrypt {
            return Err(CngError::NotSupported);
        }
        self.ctx.set_tag(tag).map_err(backend_error)?;
        let mut final_block = [0u8; AES_BLOCK_SIZE];
        self.ctx
            .cipher_final(&mut final_block)
            .map_err(|_| CngError::AuthTagMismatch)?;
        Ok(())
    }
}
