// Copyright (C) Microsoft Corporation. All rights reserved.

//! Backend dispatch layer.
//!
//! Bulk cryptographic math is delegated to [`CryptoBackend`] implementations.
//! A [`Dispatch`] table is built once by probing the configured backends in
//! priority order; each call walks the table and returns the first answer
//! that is not [`CngError::NotImplemented`]. Entries no backend provides
//! therefore fail with `NotImplemented` instead of crashing.
//!
//! Backends never see CNG blob layouts: keys cross this boundary as
//! big-endian component vectors ([`PublicKey`], [`RsaPrivate`],
//! [`EccPrivate`], [`DsaPrivate`]) and the key engine owns the blob formats.

mod bn;
mod ossl;

use std::any::Any;
use std::fmt;

pub use bn::*;
pub use ossl::*;
use strum::EnumString;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

use super::*;

/// Direction of a cipher context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherDirection {
    Encrypt,
    Decrypt,
}

/// Running backend cipher state keyed to one secret and one vector.
///
/// Block modes transform whole blocks only; padding is applied by the caller.
pub trait CipherContext: Send {
    fn direction(&self) -> CipherDirection;

    /// Binds additional authenticated data (GCM only).
    fn set_aad(&mut self, _aad: &[u8]) -> Result<(), CngError> {
        Err(CngError::NotSupported)
    }

    /// Encrypts `input` into `output` and returns the bytes written.
    fn encrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CngError>;

    /// Decrypts `input` into `output` and returns the bytes written.
    fn decrypt(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CngError>;

    /// Finalizes an encryption and writes the authentication tag (GCM only).
    fn get_tag(&mut self, _tag: &mut [u8]) -> Result<(), CngError> {
        Err(CngError::NotSupported)
    }

    /// Finalizes a decryption against the expected tag (GCM only).
    ///
    /// # Errors
    ///
    /// * `CngError::AuthTagMismatch` - The tag does not match.
    fn verify_tag(&mut self, _tag: &[u8]) -> Result<(), CngError> {
        Err(CngError::NotSupported)
    }
}

/// Opaque backend private-key handle.
pub trait BackendKey: Send {
    /// Deep-copies the key.
    fn duplicate(&self) -> Result<Box<dyn BackendKey>, CngError>;

    /// Allows the owning backend to downcast.
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn BackendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackendKey")
    }
}

/// Public half of an asymmetric key, big-endian components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa {
        exponent: Vec<u8>,
        modulus: Vec<u8>,
    },
    Ecc {
        curve: EccCurve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    Dsa {
        p: Vec<u8>,
        q: Vec<u8>,
        g: Vec<u8>,
        y: Vec<u8>,
    },
}

impl PublicKey {
    /// Key size in bits.
    pub fn bits(&self) -> u32 {
        fn bit_len(bytes: &[u8]) -> u32 {
            match bytes.iter().position(|&b| b != 0) {
                Some(pos) => (bytes.len() - pos) as u32 * 8 - bytes[pos].leading_zeros(),
                None => 0,
            }
        }

        match self {
            PublicKey::Rsa { modulus, .. } => bit_len(modulus),
            PublicKey::Ecc { curve, .. } => curve.bits(),
            PublicKey::Dsa { p, .. } => bit_len(p),
        }
    }
}

/// RSA private key components.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RsaPrivate {
    pub exponent: Vec<u8>,
    pub modulus: Vec<u8>,
    pub prime1: Vec<u8>,
    pub prime2: Vec<u8>,
}

/// ECC private key: scalar `d` and public point.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EccPrivate {
    #[zeroize(skip)]
    pub curve: EccCurve,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
    pub d: Vec<u8>,
}

/// DSA private key components.
///
/// `y` may be left empty on import; the backend derives it from `g^x mod p`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DsaPrivate {
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub g: Vec<u8>,
    pub y: Vec<u8>,
    pub x: Vec<u8>,
}

/// Result of a key-pair generation or private import.
pub struct KeyPair {
    pub private: Box<dyn BackendKey>,
    pub public: PublicKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Signature scheme passed to [`CryptoBackend::sign`] and
/// [`CryptoBackend::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignScheme {
    /// PKCS#1 v1.5 with a DigestInfo for the named digest.
    Pkcs1(AlgId),
    /// ECDSA over a precomputed digest; signature is DER.
    Ecdsa,
    /// DSA over a 20-byte digest; signature is DER.
    Dsa,
}

/// Interface implemented by every native backend.
///
/// Every method defaults to [`CngError::NotImplemented`], so a backend only
/// overrides the entries it provides.
#[allow(unused_variables)]
pub trait CryptoBackend: Send {
    fn name(&self) -> &'static str;

    /// Fills `buf` with cryptographically secure random bytes.
    fn gen_random(&self, buf: &mut [u8]) -> Result<(), CngError> {
        Err(CngError::NotImplemented)
    }

    /// Creates a cipher context for `secret` and the given vector.
    fn cipher_init(
        &self,
        mode: ChainingMode,
        secret: &[u8],
        vector: Option<&[u8]>,
        direction: CipherDirection,
    ) -> Result<Box<dyn CipherContext>, CngError> {
        Err(CngError::NotImplemented)
    }

    /// Generates a key pair of `bits` for `alg`.
    fn key_generate(&self, alg: AlgId, bits: u32) -> Result<KeyPair, CngError> {
        Err(CngError::NotImplemented)
    }

    fn key_import_ecc(&self, alg: AlgId, key: &EccPrivate) -> Result<KeyPair, CngError> {
        Err(CngError::NotImplemented)
    }

    fn key_export_ecc(&self, key: &dyn BackendKey) -> Result<EccPrivate, CngError> {
        Err(CngError::NotImplemented)
    }

    fn key_import_rsa(&self, alg: AlgId, key: &RsaPrivate) -> Result<KeyPair, CngError> {
        Err(CngError::NotImplemented)
    }

    fn key_export_rsa(&self, key: &dyn BackendKey) -> Result<RsaPrivate, CngError> {
        Err(CngError::NotImplemented)
    }

    fn key_import_dsa_capi(&self, key: &DsaPrivate) -> Result<KeyPair, CngError> {
        Err(CngError::NotImplemented)
    }

    fn key_export_dsa_capi(&self, key: &dyn BackendKey) -> Result<DsaPrivate, CngError> {
        Err(CngError::NotImplemented)
    }

    /// Signs a precomputed digest; returns the backend-native signature.
    fn sign(&self, key: &dyn BackendKey, scheme: SignScheme, hash: &[u8]) -> Result<Vec<u8>, CngError> {
        Err(CngError::NotImplemented)
    }

    /// Verifies a backend-native signature.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidSignature` - The signature does not verify.
    fn verify(
        &self,
        public: &PublicKey,
        scheme: SignScheme,
        hash: &[u8],
        signature: &[u8],
    ) -> Result<(), CngError> {
        Err(CngError::NotImplemented)
    }

    /// Computes the ECDH shared value from a private scalar and a peer point.
    ///
    /// The result is the X coordinate of `d * Q`, big-endian, curve width.
    fn secret_agreement(&self, private: &EccPrivate, peer: &PublicKey) -> Result<Vec<u8>, CngError> {
        Err(CngError::NotImplemented)
    }
}

/// Backend selectors accepted by [`ProviderConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// Primary backend built on the `openssl` crate.
    OpenSsl,
    /// Big-number fallback that only provides ECDH agreement.
    BigNum,
}

/// Ordered backend table.
#[derive(Default)]
pub struct Dispatch {
    backends: Vec<Box<dyn CryptoBackend>>,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|b| b.name()))
            .finish()
    }
}

impl Dispatch {
    /// Probes each backend kind in order; absent backends are skipped.
    pub fn probe(kinds: &[BackendKind]) -> Self {
        let mut backends: Vec<Box<dyn CryptoBackend>> = Vec::new();
        for kind in kinds {
            let backend: Option<Box<dyn CryptoBackend>> = match kind {
                BackendKind::OpenSsl => OsslBackend::probe().map(|b| Box::new(b) as _),
                BackendKind::BigNum => BigNumBackend::probe().map(|b| Box::new(b) as _),
            };
            match backend {
                Some(backend) => {
                    tracing::debug!(backend = backend.name(), "backend available");
                    backends.push(backend);
                }
                None => tracing::warn!(?kind, "backend unavailable"),
            }
        }
        Self { backends }
    }

    /// Builds a table from explicit backend instances.
    pub fn with_backends(backends: Vec<Box<dyn CryptoBackend>>) -> Self {
        Self { backends }
    }

    /// Names of the resolved backends, in probe order.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    fn first<T>(&self, mut call: impl FnMut(&dyn CryptoBackend) -> Result<T, CngError>) -> Result<T, CngError> {
        for backend in &self.backends {
            match call(backend.as_ref()) {
                Err(CngError::NotImplemented) => continue,
                result => return result,
            }
        }
        Err(CngError::NotImplemented)
    }

    pub fn gen_random(&self, buf: &mut [u8]) -> Result<(), CngError> {
        self.first(|b| b.gen_random(&mut *buf))
    }

    pub fn cipher_init(
        &self,
        mode: ChainingMode,
        secret: &[u8],
        vector: Option<&[u8]>,
        direction: CipherDirection,
    ) -> Result<Box<dyn CipherContext>, CngError> {
        self.first(|b| b.cipher_init(mode, secret, vector, direction))
    }

    pub fn key_generate(&self, alg: AlgId, bits: u32) -> Result<KeyPair, CngError> {
        self.first(|b| b.key_generate(alg, bits))
    }

    pub fn key_import_ecc(&self, alg: AlgId, key: &EccPrivate) -> Result<KeyPair, CngError> {
        self.first(|b| b.key_import_ecc(alg, key))
    }

    pub fn key_export_ecc(&self, key: &dyn BackendKey) -> Result<EccPrivate, CngError> {
        self.first(|b| b.key_export_ecc(key))
    }

    pub fn key_import_rsa(&self, alg: AlgId, key: &RsaPrivate) -> Result<KeyPair, CngError> {
        self.first(|b| b.key_import_rsa(alg, key))
    }

    pub fn key_export_rsa(&self, key: &dyn BackendKey) -> Result<RsaPrivate, CngError> {
        self.first(|b| b.key_export_rsa(key))
    }

    pub fn key_import_dsa_capi(&self, key: &DsaPrivate) -> Result<KeyPair, CngError> {
        self.first(|b| b.key_import_dsa_capi(key))
    }

    pub fn key_export_dsa_capi(&self, key: &dyn BackendKey) -> Result<DsaPrivate, CngError> {
        self.first(|b| b.key_export_dsa_capi(key))
    }

    pub fn sign(&self, key: &dyn BackendKey, scheme: SignScheme, hash: &[u8]) -> Result<Vec<u8>, CngError> {
        self.first(|b| b.sign(key, scheme, hash))
    }

    pub fn verify(
        &self,
        public: &PublicKey,
        scheme: SignScheme,
        hash: &[u8],
        signature: &[u8],
    ) -> Result<(), CngError> {
        self.first(|b| b.verify(public, scheme, hash, signature))
    }

    /// Computes an ECDH shared value.
    ///
    /// The private scalar is exported through the table first, so the
    /// backend that owns the key need not be the one doing the agreement.
    pub fn secret_agreement(&self, private: &dyn BackendKey, peer: &PublicKey) -> Result<Vec<u8>, CngError> {
        let private = self.key_export_ecc(private)?;
        self.first(|b| b.secret_agreement(&private, peer))
    }
}

#[cfg(test)]
mod tests;
