// Copyright (C) Microsoft Corporation. All rights reserved.

//! Primary backend built on the `openssl` crate.
//!
//! Provides random numbers, AES contexts, key generation, import/export and
//! signing. ECDH agreement is left to the big-number backend.

mod cipher;
mod key;
mod sign;

pub use cipher::OsslCipherContext;
pub(crate) use key::ecc_public_key;
pub use key::OsslKey;
use openssl::error::ErrorStack;
use openssl::rand::rand_bytes;

use super::*;

/// Maps an OpenSSL failure with no closer analog.
pub(crate) fn backend_error(err: ErrorStack) -> CngError {
    tracing::error!(%err, "openssl operation failed");
    CngError::InternalError
}

/// OpenSSL backend.
#[derive(Debug, Default)]
pub struct OsslBackend(());

impl OsslBackend {
    /// Initializes the library; `None` if it cannot be used.
    pub fn probe() -> Option<Self> {
        openssl::init();
        let mut probe = [0u8; 1];
        match rand_bytes(&mut probe) {
            Ok(()) => Some(Self(())),
            Err(err) => {
                tracing::warn!(%err, "openssl backend unusable");
                None
            }
        }
    }
}

impl CryptoBackend for OsslBackend {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn gen_random(&self, buf: &mut [u8]) -> Result<(), CngError> {
        rand_bytes(buf).map_err(backend_error)
    }

    fn cipher_init(
        &self,
        mode: ChainingMode,
        secret: &[u8],
        vector: Option<&[u8]>,
        direction: CipherDirection,
    ) -> Result<Box<dyn CipherContext>, CngError> {
        Ok(Box::new(OsslCipherContext::new(mode, secret, vector, direction)?))
    }

    fn key_generate(&self, alg: AlgId, bits: u32) -> Result<KeyPair, CngError> {
        key::generate(alg, bits)
    }

    fn key_import_ecc(&self, alg: AlgId, key: &EccPrivate) -> Result<KeyPair, CngError> {
        key::import_ecc(alg, key)
    }

    fn key_export_ecc(&self, key: &dyn BackendKey) -> Result<EccPrivate, CngError> {
        key::export_ecc(OsslKey::from_backend_key(key)?)
    }

    fn key_import_rsa(&self, alg: AlgId, key: &RsaPrivate) -> Result<KeyPair, CngError> {
        key::import_rsa(alg, key)
    }

    fn key_export_rsa(&self, key: &dyn BackendKey) -> Result<RsaPrivate, CngError> {
        key::export_rsa(OsslKey::from_backend_key(key)?)
    }

    fn key_import_dsa_capi(&self, key: &DsaPrivate) -> Result<KeyPair, CngError> {
        key::import_dsa_capi(key)
    }

    fn key_export_dsa_capi(&self, key: &dyn BackendKey) -> Result<DsaPrivate, CngError> {
        key::export_dsa_capi(OsslKey::from_backend_key(key)?)
    }

    fn sign(&self, key: &dyn BackendKey, scheme: SignScheme, hash: &[u8]) -> Result<Vec<u8>, CngError> {
        sign::sign(OsslKey::from_backend_key(key)?, scheme, hash)
    }

    fn verify(
        &self,
        public: &PublicKey,
        scheme: SignScheme,
        hash: &[u8],
        signature: &[u8],
    ) -> Result<(), CngError> {
        sign::verify(public, scheme, hash, signature)
    }
}
