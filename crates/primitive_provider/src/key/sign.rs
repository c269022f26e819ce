// Copyright (C) Microsoft Corporation. All rights reserved.

//! Signing and verification over precomputed digests.
//!
//! RSA keys use PKCS#1 v1.5 and need the digest named in
//! [`Pkcs1PaddingInfo`]. ECDSA infers the digest from the hash length and DSA
//! accepts SHA-1 digests only. ECDSA and DSA signatures are exchanged as
//! fixed-width `r || s`; the backend works with DER.

use bitflags::bitflags;

use super::*;

/// DSA signature length: 20-byte `r` and `s`.
const DSA_SIGNATURE_LENGTH: usize = 40;

/// Digest length DSA signs.
const DSA_HASH_LENGTH: usize = 20;

bitflags! {
    /// Flags accepted by [`AsymmetricKey::sign`] and [`AsymmetricKey::verify`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SignFlags: u32 {
        /// PKCS#1 v1.5 padding; requires [`Pkcs1PaddingInfo`].
        const PAD_PKCS1 = 0x0000_0002;
    }
}

/// PKCS#1 padding information naming the signed digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pkcs1PaddingInfo<'a> {
    pub alg_id: Option<&'a str>,
}

/// The hash must be as long as the digest named in the padding info.
fn check_pkcs1_hash(digest: AlgId, hash: &[u8]) -> Result<(), CngError> {
    if hash.len() != digest.hash_length() {
        tracing::warn!(digest = digest.name(), len = hash.len(), "hash length does not match pkcs1 digest");
        return Err(CngError::InvalidParameter);
    }
    Ok(())
}

impl AsymmetricKey {
    /// Exact signature length in bytes.
    pub fn signature_length(&self) -> Result<usize, CngError> {
        match self.alg_id() {
            AlgId::Rsa | AlgId::RsaSign => Ok(self.bits().div_ceil(8) as usize),
            AlgId::EcdsaP256 | AlgId::EcdsaP384 => {
                let curve = self.alg_id().curve().ok_or(CngError::NotSupported)?;
                Ok(curve.point_size() * 2)
            }
            AlgId::Dsa => Ok(DSA_SIGNATURE_LENGTH),
            _ => Err(CngError::NotSupported),
        }
    }

    fn sign_scheme(
        &self,
        padding: Option<&Pkcs1PaddingInfo<'_>>,
        hash: &[u8],
        flags: SignFlags,
    ) -> Result<SignScheme, CngError> {
        let padding_alg = padding.and_then(|info| info.alg_id);

        match self.alg_id() {
            AlgId::EcdsaP256 | AlgId::EcdsaP384 => {
                let inferred = match hash.len() {
                    20 => AlgId::Sha1,
                    32 => AlgId::Sha256,
                    48 => AlgId::Sha384,
                    64 => AlgId::Sha512,
                    len => {
                        tracing::warn!(len, "unsupported ecdsa hash length");
                        return Err(CngError::InvalidParameter);
                    }
                };
                if flags == SignFlags::PAD_PKCS1 {
                    if let Some(name) = padding_alg {
                        if AlgId::from_padding_name(name) != Some(inferred) {
                            tracing::warn!(name, expected = inferred.name(), "padding digest does not match hash length");
                            return Err(CngError::InvalidParameter);
                        }
                    }
                }
                Ok(SignScheme::Ecdsa)
            }
            AlgId::Dsa => {
                if hash.len() != DSA_HASH_LENGTH {
                    tracing::warn!(len = hash.len(), "unsupported dsa hash length");
                    return Err(CngError::InvalidParameter);
                }
                Ok(SignScheme::Dsa)
            }
            AlgId::Rsa | AlgId::RsaSign => {
                if flags == SignFlags::PAD_PKCS1 {
                    let name = padding_alg.ok_or_else(|| {
                        tracing::warn!("pkcs1 padding info missing");
                        CngError::InvalidParameter
                    })?;
                    let digest = AlgId::from_padding_name(name).ok_or_else(|| {
                        tracing::warn!(name, "unsupported pkcs1 digest");
                        CngError::NotSupported
                    })?;
                    check_pkcs1_hash(digest, hash)?;
                    Ok(SignScheme::Pkcs1(digest))
                } else if flags.is_empty() {
                    tracing::warn!("rsa signing needs a padding mode");
                    Err(CngError::InvalidParameter)
                } else {
                    tracing::warn!(flags = flags.bits(), "unsupported rsa padding mode");
                    Err(CngError::NotImplemented)
                }
            }
            alg => {
                tracing::warn!(alg = alg.name(), "algorithm cannot sign");
                Err(CngError::NotSupported)
            }
        }
    }

    /// Signs a precomputed digest.
    ///
    /// With `output == None` the exact signature length is returned.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidParameter` - Bad hash length, missing or mismatched
    ///   padding information, or no private key.
    /// * `CngError::NotSupported` - Unknown PKCS#1 digest name, or the
    ///   algorithm cannot sign.
    /// * `CngError::BufferTooSmall` - `output` is shorter than the signature.
    pub fn sign(
        &self,
        dispatch: &Dispatch,
        padding: Option<&Pkcs1PaddingInfo<'_>>,
        hash: &[u8],
        output: Option<&mut [u8]>,
        flags: SignFlags,
    ) -> Result<usize, CngError> {
        let scheme = self.sign_scheme(padding, hash, flags)?;
        let length = self.signature_length()?;

        let Some(output) = output else {
            return Ok(length);
        };
        let private = self.private().ok_or_else(|| {
            tracing::warn!(alg = self.alg_id().name(), "signing with a public key");
            CngError::InvalidParameter
        })?;
        if output.len() < length {
            return Err(CngError::BufferTooSmall);
        }

        let native = dispatch.sign(private, scheme, hash)?;
        let signature = match scheme {
            SignScheme::Pkcs1(_) => native,
            SignScheme::Ecdsa | SignScheme::Dsa => signature_der_to_raw(&native, length)?,
        };
        copy_out(&signature, Some(output))
    }

    /// Verifies a signature over a precomputed digest.
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidSignature` - The signature does not verify, has
    ///   the wrong length, or an RSA padding block names no digest.
    /// * `CngError::InvalidParameter` - Empty hash or signature, missing
    ///   PKCS#1 padding, or a DSA hash that is not 20 bytes.
    /// * `CngError::NotSupported` - Unknown PKCS#1 digest name.
    pub fn verify(
        &self,
        dispatch: &Dispatch,
        padding: Option<&Pkcs1PaddingInfo<'_>>,
        hash: &[u8],
        signature: &[u8],
        flags: SignFlags,
    ) -> Result<(), CngError> {
        if hash.is_empty() || signature.is_empty() {
            return Err(CngError::InvalidParameter);
        }

        let scheme = match self.alg_id() {
            AlgId::EcdsaP256 | AlgId::EcdsaP384 => {
                // Only the hash size must match, not the digest itself.
                if !matches!(hash.len(), 20 | 32 | 48 | 64) {
                    tracing::warn!(len = hash.len(), "unsupported ecdsa hash length");
                    return Err(CngError::InvalidSignature);
                }
                SignScheme::Ecdsa
            }
            AlgId::Rsa | AlgId::RsaSign => {
                let Some(info) = padding.filter(|_| flags.contains(SignFlags::PAD_PKCS1)) else {
                    tracing::warn!("rsa verification needs pkcs1 padding info");
                    return Err(CngError::InvalidParameter);
                };
                let name = info.alg_id.ok_or(CngError::InvalidSignature)?;
                let digest = AlgId::from_padding_name(name).ok_or_else(|| {
                    tracing::warn!(name, "unsupported pkcs1 digest");
                    CngError::NotSupported
                })?;
                check_pkcs1_hash(digest, hash)?;
                SignScheme::Pkcs1(digest)
            }
            AlgId::Dsa => {
                if hash.len() != DSA_HASH_LENGTH {
                    tracing::warn!(len = hash.len(), "unsupported dsa hash length");
                    return Err(CngError::InvalidParameter);
                }
                SignScheme::Dsa
            }
            alg => {
                tracing::warn!(alg = alg.name(), "algorithm cannot verify");
                return Err(CngError::NotImplemented);
            }
        };

        let public = self.public().ok_or(CngError::InvalidParameter)?;
        let native = match scheme {
            SignScheme::Pkcs1(_) => signature.to_vec(),
            SignScheme::Ecdsa | SignScheme::Dsa => {
                if signature.len() != self.signature_length()? {
                    return Err(CngError::InvalidSignature);
                }
                signature_raw_to_der(signature)?
            }
        };

        dispatch.verify(public, scheme, hash, &native)
    }
}
