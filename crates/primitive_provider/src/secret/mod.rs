// Copyright (C) Microsoft Corporation. All rights reserved.

//! Secret agreement and the shared secrets it produces.

use std::fmt;

use zeroize::Zeroizing;

use super::*;

/// Raw agreed secret.
///
/// Holds the shared value in the byte order produced by the backend
/// (big-endian for every backend in this crate). The buffer is zeroized on
/// drop.
pub struct Secret {
    alg_id: AlgId,
    value: Zeroizing<Vec<u8>>,
}

impl Secret {
    pub(crate) fn new(alg_id: AlgId, value: Vec<u8>) -> Self {
        Self {
            alg_id,
            value: Zeroizing::new(value),
        }
    }

    /// Algorithm of the keys that produced this secret.
    pub fn alg_id(&self) -> AlgId {
        self.alg_id
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Computes the shared value of a private key and a peer public key.
    ///
    /// # Errors
    ///
    /// * `CngError::NotSupported` - The keys are not ECDH keys.
    /// * `CngError::InvalidParameter` - The keys use different algorithms,
    ///   `private` has no private half, or `peer` holds no key material.
    pub fn agree(private: &AsymmetricKey, peer: &AsymmetricKey, dispatch: &Dispatch) -> Result<Self, CngError> {
        let alg_id = private.alg_id();
        if alg_id.class() != InterfaceClass::SecretAgreement {
            tracing::warn!(alg = alg_id.name(), "secret agreement on a non-agreement key");
            return Err(CngError::NotSupported);
        }
        if alg_id != peer.alg_id() {
            tracing::warn!(alg = alg_id.name(), peer = peer.alg_id().name(), "agreement keys of different algorithms");
            return Err(CngError::InvalidParameter);
        }

        let own = private.private().ok_or(CngError::InvalidParameter)?;
        let public = peer.public().ok_or(CngError::InvalidParameter)?;
        let value = dispatch.secret_agreement(own, public)?;
        Ok(Self::new(alg_id, value))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("alg_id", &self.alg_id)
            .field("len", &self.value.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
