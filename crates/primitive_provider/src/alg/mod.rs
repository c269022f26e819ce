// Copyright (C) Microsoft Corporation. All rights reserved.

//! Algorithm catalog and algorithm provider objects.
//!
//! The catalog is a static, read-only table: every built-in algorithm maps to
//! its interface class, the default object length, the digest length and the
//! digest block size. An [`Algorithm`] is the object behind an algorithm
//! handle; it records the identifier, the open flags and the chaining mode
//! that newly created symmetric keys inherit.

use std::str::FromStr;

use bitflags::bitflags;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoEnumIterator;
use strum::IntoStaticStr;

use super::*;

/// Name of the only implementation this provider answers to.
pub const MS_PRIMITIVE_PROVIDER: &str = "Microsoft Primitive Provider";

/// Built-in algorithm identifiers, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
pub enum AlgId {
    #[strum(serialize = "AES")]
    Aes,
    #[strum(serialize = "SHA256")]
    Sha256,
    #[strum(serialize = "SHA384")]
    Sha384,
    #[strum(serialize = "SHA512")]
    Sha512,
    #[strum(serialize = "SHA1")]
    Sha1,
    #[strum(serialize = "MD5")]
    Md5,
    #[strum(serialize = "MD4")]
    Md4,
    #[strum(serialize = "MD2")]
    Md2,
    #[strum(serialize = "RSA")]
    Rsa,
    #[strum(serialize = "ECDH_P256")]
    EcdhP256,
    #[strum(serialize = "ECDH_P384")]
    EcdhP384,
    #[strum(serialize = "RSA_SIGN")]
    RsaSign,
    #[strum(serialize = "ECDSA_P256")]
    EcdsaP256,
    #[strum(serialize = "ECDSA_P384")]
    EcdsaP384,
    #[strum(serialize = "DSA")]
    Dsa,
    #[strum(serialize = "RNG")]
    Rng,
}

/// Interface class of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceClass {
    Cipher,
    Hash,
    AsymmetricEncryption,
    SecretAgreement,
    Signature,
    Rng,
}

impl InterfaceClass {
    /// Returns the CNG interface identifier.
    pub fn id(self) -> u32 {
        match self {
            InterfaceClass::Cipher => 1,
            InterfaceClass::Hash => 2,
            InterfaceClass::AsymmetricEncryption => 3,
            InterfaceClass::SecretAgreement => 4,
            InterfaceClass::Signature => 5,
            InterfaceClass::Rng => 6,
        }
    }

    /// Returns the operation bit that selects this class in enumeration.
    pub fn operation(self) -> OperationType {
        match self {
            InterfaceClass::Cipher => OperationType::CIPHER,
            InterfaceClass::Hash => OperationType::HASH,
            InterfaceClass::AsymmetricEncryption => OperationType::ASYMMETRIC_ENCRYPTION,
            InterfaceClass::SecretAgreement => OperationType::SECRET_AGREEMENT,
            InterfaceClass::Signature => OperationType::SIGNATURE,
            InterfaceClass::Rng => OperationType::RNG,
        }
    }
}

bitflags! {
    /// Flags accepted when opening an algorithm provider.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OpenFlags: u32 {
        /// Hash objects created from this provider compute an HMAC.
        const HMAC = 0x0000_0008;
        /// Hash objects re-initialize themselves after finishing.
        const HASH_REUSABLE = 0x0000_0020;
    }

    /// Operation-type mask used to filter algorithm enumeration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OperationType: u32 {
        const CIPHER = 0x0000_0001;
        const HASH = 0x0000_0002;
        const ASYMMETRIC_ENCRYPTION = 0x0000_0004;
        const SECRET_AGREEMENT = 0x0000_0008;
        const SIGNATURE = 0x0000_0010;
        const RNG = 0x0000_0020;
    }
}

/// Static catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgInfo {
    pub class: InterfaceClass,
    pub object_length: u32,
    pub hash_length: u32,
    pub block_bits: u32,
}

impl AlgInfo {
    const fn new(class: InterfaceClass, object_length: u32, hash_length: u32, block_bits: u32) -> Self {
        Self {
            class,
            object_length,
            hash_length,
            block_bits,
        }
    }
}

impl AlgId {
    /// Returns the catalog row of this algorithm.
    pub const fn info(self) -> AlgInfo {
        use InterfaceClass::*;

        match self {
            AlgId::Aes => AlgInfo::new(Cipher, 654, 0, 0),
            AlgId::Sha256 => AlgInfo::new(Hash, 286, 32, 512),
            AlgId::Sha384 => AlgInfo::new(Hash, 382, 48, 1024),
            AlgId::Sha512 => AlgInfo::new(Hash, 382, 64, 1024),
            AlgId::Sha1 => AlgInfo::new(Hash, 278, 20, 512),
            AlgId::Md5 => AlgInfo::new(Hash, 274, 16, 512),
            AlgId::Md4 => AlgInfo::new(Hash, 270, 16, 512),
            AlgId::Md2 => AlgInfo::new(Hash, 270, 16, 128),
            AlgId::Rsa => AlgInfo::new(AsymmetricEncryption, 0, 0, 0),
            AlgId::EcdhP256 => AlgInfo::new(SecretAgreement, 0, 0, 0),
            AlgId::EcdhP384 => AlgInfo::new(SecretAgreement, 0, 0, 0),
            AlgId::RsaSign => AlgInfo::new(Signature, 0, 0, 0),
            AlgId::EcdsaP256 => AlgInfo::new(Signature, 0, 0, 0),
            AlgId::EcdsaP384 => AlgInfo::new(Signature, 0, 0, 0),
            AlgId::Dsa => AlgInfo::new(Signature, 0, 0, 0),
            AlgId::Rng => AlgInfo::new(Rng, 0, 0, 0),
        }
    }

    /// Returns the catalog name, e.g. `"SHA256"`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns the interface class.
    pub fn class(self) -> InterfaceClass {
        self.info().class
    }

    /// Returns the digest length in bytes, zero for non-hash algorithms.
    pub fn hash_length(self) -> usize {
        self.info().hash_length as usize
    }

    /// Returns the digest block length in bytes, zero for non-hash algorithms.
    pub fn block_bytes(self) -> usize {
        self.info().block_bits as usize / 8
    }

    pub fn is_hash(self) -> bool {
        self.class() == InterfaceClass::Hash
    }

    pub fn is_symmetric(self) -> bool {
        self.class() == InterfaceClass::Cipher
    }

    /// Returns true for algorithms whose keys are asymmetric key pairs.
    pub fn is_asymmetric(self) -> bool {
        matches!(
            self.class(),
            InterfaceClass::AsymmetricEncryption
                | InterfaceClass::SecretAgreement
                | InterfaceClass::Signature
        )
    }

    /// Returns the elliptic curve of an ECDH or ECDSA algorithm.
    pub fn curve(self) -> Option<EccCurve> {
        match self {
            AlgId::EcdhP256 | AlgId::EcdsaP256 => Some(EccCurve::P256),
            AlgId::EcdhP384 | AlgId::EcdsaP384 => Some(EccCurve::P384),
            _ => None,
        }
    }

    /// Resolves a digest name used in PKCS#1 padding information.
    ///
    /// Only the digests a PKCS#1 signature can carry are accepted.
    pub fn from_padding_name(name: &str) -> Option<AlgId> {
        match AlgId::from_str(name).ok()? {
            id @ (AlgId::Sha1 | AlgId::Sha256 | AlgId::Sha384 | AlgId::Sha512 | AlgId::Md2 | AlgId::Md5) => {
                Some(id)
            }
            _ => None,
        }
    }
}

/// NIST prime curves used by the ECC algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EccCurve {
    P256,
    P384,
}

impl EccCurve {
    /// Returns the size in bytes of one coordinate or scalar.
    pub fn point_size(self) -> usize {
        match self {
            EccCurve::P256 => 32,
            EccCurve::P384 => 48,
        }
    }

    pub fn bits(self) -> u32 {
        self.point_size() as u32 * 8
    }
}

/// Block cipher chaining mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, IntoStaticStr)]
pub enum ChainingMode {
    #[strum(serialize = "ChainingModeECB")]
    Ecb,
    #[default]
    #[strum(serialize = "ChainingModeCBC")]
    Cbc,
    #[strum(serialize = "ChainingModeGCM")]
    Gcm,
}

impl ChainingMode {
    /// Returns the CNG property string, e.g. `"ChainingModeCBC"`.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Entry returned by algorithm enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    pub name: &'static str,
    pub class: InterfaceClass,
    pub flags: u32,
}

/// Lists the catalog entries selected by an operation-type mask.
///
/// A zero mask selects every entry. Bits outside the known operation types
/// are rejected with [`CngError::InvalidParameter`].
pub fn enum_algorithms(op_mask: u32) -> Result<Vec<AlgorithmIdentifier>, CngError> {
    let ops = OperationType::from_bits(op_mask).ok_or(CngError::InvalidParameter)?;

    let list = AlgId::iter()
        .filter(|id| ops.is_empty() || ops.intersects(id.class().operation()))
        .map(|id| AlgorithmIdentifier {
            name: id.name(),
            class: id.class(),
            flags: 0,
        })
        .collect();

    Ok(list)
}

/// Object behind an algorithm handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Algorithm {
    id: AlgId,
    mode: ChainingMode,
    flags: OpenFlags,
}

impl Algorithm {
    /// Opens a catalog entry by name.
    ///
    /// # Errors
    ///
    /// - `CngError::NotSupported` - unknown name, foreign implementation, or
    ///   flags other than [`OpenFlags::HMAC`] and [`OpenFlags::HASH_REUSABLE`]
    pub fn open(name: &str, implementation: Option<&str>, flags: OpenFlags) -> Result<Self, CngError> {
        if !OpenFlags::all().contains(flags) {
            tracing::warn!(?flags, "unsupported algorithm provider flags");
            return Err(CngError::NotSupported);
        }

        let id = AlgId::from_str(name).map_err(|_| {
            tracing::warn!(name, "algorithm not in catalog");
            CngError::NotSupported
        })?;

        if let Some(implementation) = implementation {
            if implementation != MS_PRIMITIVE_PROVIDER {
                tracing::warn!(implementation, "unsupported implementation");
                return Err(CngError::NotSupported);
            }
        }

        Ok(Self {
            id,
            mode: ChainingMode::default(),
            flags,
        })
    }

    pub fn id(&self) -> AlgId {
        self.id
    }

    pub fn mode(&self) -> ChainingMode {
        self.mode
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Changes the chaining mode inherited by keys created afterwards.
    pub(crate) fn set_mode(&mut self, mode: ChainingMode) -> Result<(), CngError> {
        if self.id != AlgId::Aes {
            return Err(CngError::NotImplemented);
        }
        self.mode = mode;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
