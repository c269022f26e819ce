// Copyright (C) Microsoft Corporation. All rights reserved.

//! Key objects.
//!
//! A [`Key`] is either a [`SymmetricKey`] (see the cipher engine) or an
//! [`AsymmetricKey`]. Asymmetric keys are created in two phases: allocation
//! fixes the algorithm and bit length, [`AsymmetricKey::finalize`] asks the
//! backend for the actual key pair. Imported keys are complete on creation.
//!
//! The public half is kept as big-endian components and rendered into a CNG
//! blob on export; the private half is an opaque backend handle.

mod blob;
mod sign;

use std::fmt;

pub use blob::*;
pub use sign::*;

use super::*;

/// Smallest accepted RSA modulus, in bits.
const RSA_MIN_BITS: u32 = 512;

/// DSA (FIPS 186-2) modulus range and step, in bits.
const DSA_MIN_BITS: u32 = 512;
const DSA_MAX_BITS: u32 = 1024;
const DSA_STEP_BITS: u32 = 64;

/// Object behind a key handle.
#[derive(Debug)]
pub enum Key {
    Symmetric(SymmetricKey),
    Asymmetric(AsymmetricKey),
}

impl Key {
    pub fn alg_id(&self) -> AlgId {
        match self {
            Key::Symmetric(key) => key.alg_id(),
            Key::Asymmetric(key) => key.alg_id(),
        }
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(self, Key::Symmetric(_))
    }

    /// Key length in bits.
    pub fn bits(&self) -> u32 {
        match self {
            Key::Symmetric(key) => key.bits(),
            Key::Asymmetric(key) => key.bits(),
        }
    }

    /// Deep-copies the key, including the backend private handle.
    pub fn duplicate(&self) -> Result<Key, CngError> {
        match self {
            Key::Symmetric(key) => Ok(Key::Symmetric(key.duplicate())),
            Key::Asymmetric(key) => Ok(Key::Asymmetric(key.duplicate()?)),
        }
    }
}

/// Asymmetric key pair, or public key only.
pub struct AsymmetricKey {
    alg_id: AlgId,
    bits: u32,
    public: Option<PublicKey>,
    private: Option<Box<dyn BackendKey>>,
    dss_seed: DssSeed,
}

impl fmt::Debug for AsymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricKey")
            .field("alg_id", &self.alg_id)
            .field("bits", &self.bits)
            .field("public", &self.public)
            .field("has_private", &self.private.is_some())
            .finish_non_exhaustive()
    }
}

fn check_bits(alg_id: AlgId, bits: u32) -> Result<(), CngError> {
    let valid = match alg_id {
        AlgId::Rsa | AlgId::RsaSign => bits >= RSA_MIN_BITS && bits % 8 == 0,
        AlgId::Dsa => {
            (DSA_MIN_BITS..=DSA_MAX_BITS).contains(&bits) && bits % DSA_STEP_BITS == 0
        }
        id => id.curve().is_some_and(|curve| curve.bits() == bits),
    };

    if !valid {
        tracing::warn!(alg = alg_id.name(), bits, "unsupported key length");
        return Err(CngError::InvalidParameter);
    }
    Ok(())
}

impl AsymmetricKey {
    /// Allocates an empty key pair; [`AsymmetricKey::finalize`] generates it.
    ///
    /// # Errors
    ///
    /// * `CngError::NotSupported` - `alg` is not an asymmetric algorithm.
    /// * `CngError::InvalidParameter` - `bits` is not valid for `alg`.
    pub fn new(alg: &Algorithm, bits: u32) -> Result<Self, CngError> {
        if !alg.id().is_asymmetric() {
            tracing::warn!(alg = alg.id().name(), "key pair for a non-asymmetric algorithm");
            return Err(CngError::NotSupported);
        }
        check_bits(alg.id(), bits)?;

        Ok(Self::empty(alg.id(), bits))
    }

    fn empty(alg_id: AlgId, bits: u32) -> Self {
        Self {
            alg_id,
            bits,
            public: None,
            private: None,
            dss_seed: DssSeed::default(),
        }
    }

    fn from_public(alg_id: AlgId, bits: u32, public: PublicKey) -> Self {
        Self {
            public: Some(public),
            ..Self::empty(alg_id, bits)
        }
    }

    fn from_pair(alg_id: AlgId, bits: u32, pair: KeyPair) -> Self {
        Self {
            public: Some(pair.public),
            private: Some(pair.private),
            ..Self::empty(alg_id, bits)
        }
    }

    pub fn alg_id(&self) -> AlgId {
        self.alg_id
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// True once the key holds key material (finalized or imported).
    pub fn is_finalized(&self) -> bool {
        self.public.is_some()
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    pub fn public(&self) -> Option<&PublicKey> {
        self.public.as_ref()
    }

    pub(crate) fn private(&self) -> Option<&dyn BackendKey> {
        self.private.as_deref()
    }

    /// Generates the key pair.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidParameter` - The key already holds key material.
    /// * `CngError::NotImplemented` - No backend generates keys.
    pub fn finalize(&mut self, dispatch: &Dispatch) -> Result<(), CngError> {
        if self.is_finalized() {
            tracing::warn!(alg = self.alg_id.name(), "key pair already finalized");
            return Err(CngError::InvalidParameter);
        }

        let pair = dispatch.key_generate(self.alg_id, self.bits)?;
        self.public = Some(pair.public);
        self.private = Some(pair.private);
        Ok(())
    }

    /// Deep-copies the key; the backend duplicates the private handle.
    pub fn duplicate(&self) -> Result<Self, CngError> {
        let private = match &self.private {
            Some(private) => Some(private.duplicate()?),
            None => None,
        };

        Ok(Self {
            alg_id: self.alg_id,
            bits: self.bits,
            public: self.public.clone(),
            private,
            dss_seed: self.dss_seed,
        })
    }
}
