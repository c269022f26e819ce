// Copyright (C) Microsoft Corporation. All rights reserved.

//! Primitive cryptographic provider with a CNG-style handle API.
//!
//! The provider exposes algorithm discovery, hashing and HMAC, symmetric
//! encryption, asymmetric key management with signing and verification, key
//! derivation and secret agreement. Callers talk to a [`Provider`] context
//! through opaque [`Handle`] values; every entry point validates the handle's
//! object type before touching any state.
//!
//! - **Catalog**: static table of the built-in algorithms and their sizes
//! - **Hash**: MD2/MD4/MD5/SHA-1/SHA-2 digests and HMAC, implemented locally
//! - **Cipher**: AES in ECB, CBC and GCM modes with PKCS-style block padding
//! - **Keys**: RSA, DSA, ECDH and ECDSA key pairs with CNG blob formats
//! - **KDF**: PBKDF2, CAPI hash derivation and named KDFs over secrets
//!
//! # Backends
//!
//! Bulk math is delegated to a [`Dispatch`] table of [`CryptoBackend`]
//! implementations that is probed once when the provider is created. An
//! operation no backend provides fails with [`CngError::NotImplemented`].

mod alg;
mod backend;
mod cipher;
mod config;
mod der;
mod handle;
mod hash;
mod kdf;
mod key;
mod property;
mod provider;
mod secret;

pub use alg::*;
pub use backend::*;
pub use cipher::*;
pub use config::*;
pub use der::*;
pub use handle::*;
pub use hash::*;
pub use kdf::*;
pub use key::*;
pub use property::*;
pub use provider::*;
pub use secret::*;
use thiserror::Error;

/// Error type for every provider operation.
///
/// Each variant corresponds to one NTSTATUS-style error kind; use
/// [`CngError::status`] to obtain the numeric code.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CngError {
    /// The handle is unknown, stale, or refers to an object of another type.
    #[error("invalid handle")]
    InvalidHandle,
    /// A required argument is missing, or flags and parameters are inconsistent.
    #[error("invalid parameter")]
    InvalidParameter,
    /// The output buffer is smaller than the reported required size.
    #[error("buffer too small")]
    BufferTooSmall,
    /// The input length is not a multiple of the block size.
    #[error("invalid buffer size")]
    InvalidBufferSize,
    /// The operation is meaningless for this algorithm.
    #[error("not supported")]
    NotSupported,
    /// The operation is recognized but no backend provides it.
    #[error("not implemented")]
    NotImplemented,
    /// The authentication tag of an AEAD operation did not match.
    #[error("authentication tag mismatch")]
    AuthTagMismatch,
    /// The signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,
    /// Decrypted data carries malformed block padding.
    #[error("data error")]
    DataError,
    /// Memory allocation failed.
    #[error("out of memory")]
    NoMemory,
    /// The backend reported an unexpected failure.
    #[error("internal error")]
    InternalError,
}

impl CngError {
    /// Returns the NTSTATUS code reported for this error kind.
    pub fn status(&self) -> u32 {
        match self {
            CngError::InvalidHandle => 0xC000_0008,
            CngError::InvalidParameter => 0xC000_000D,
            CngError::BufferTooSmall => 0xC000_0023,
            CngError::InvalidBufferSize => 0xC000_0206,
            CngError::NotSupported => 0xC000_00BB,
            CngError::NotImplemented => 0xC000_0002,
            CngError::AuthTagMismatch => 0xC000_A002,
            CngError::InvalidSignature => 0xC000_A000,
            CngError::DataError => 0xC000_003E,
            CngError::NoMemory => 0xC000_0017,
            CngError::InternalError => 0xC000_00E5,
        }
    }
}

/// Copies `data` into an optional caller buffer using the sizing convention
/// shared by every query-capable entry point.
///
/// With `None` the required size is returned. A buffer shorter than `data`
/// fails with [`CngError::BufferTooSmall`].
pub(crate) fn copy_out(data: &[u8], output: Option<&mut [u8]>) -> Result<usize, CngError> {
    let Some(output) = output else {
        return Ok(data.len());
    };

    if output.len() < data.len() {
        return Err(CngError::BufferTooSmall);
    }

    output[..data.len()].copy_from_slice(data);
    Ok(data.len())
}
