// Copyright (C) Microsoft Corporation. All rights reserved.

//! Named properties of algorithm, hash and key objects.
//!
//! Integer properties are little-endian `u32`s, string properties are
//! NUL-terminated UTF-16LE, and length ranges are [`LengthRange`] structs.
//! Every getter follows the [`copy_out`] sizing convention.

use core::mem::size_of;
use std::str::FromStr;

use strum::EnumString;
use strum::IntoStaticStr;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::TryFromBytes;

use super::*;

/// Width of the `ChainingMode` property value in bytes.
pub const CHAINING_MODE_PROPERTY_LEN: usize = 64;

/// `PaddingSchemes` bit for PKCS#1 v1.5 signatures.
pub const SUPPORTED_PAD_PKCS1_SIG: u32 = 0x0000_0004;

/// Property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum Property {
    ObjectLength,
    HashDigestLength,
    AlgorithmName,
    BlockLength,
    ChainingMode,
    KeyLengths,
    AuthTagLength,
    PaddingSchemes,
    KeyLength,
    KeyStrength,
    MessageBlockLength,
}

impl Property {
    pub fn name(self) -> &'static str {
        self.into()
    }

    fn is_generic(self) -> bool {
        matches!(
            self,
            Property::ObjectLength | Property::HashDigestLength | Property::AlgorithmName
        )
    }

    fn parse(name: &str) -> Result<Self, CngError> {
        Property::from_str(name).map_err(|_| {
            tracing::warn!(name, "unknown property");
            CngError::NotImplemented
        })
    }
}

/// Range of accepted lengths, as reported by `KeyLengths` and
/// `AuthTagLength`.
#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
pub struct LengthRange {
    min: [u8; 4],
    max: [u8; 4],
    increment: [u8; 4],
}

impl LengthRange {
    pub const LEN: usize = size_of::<Self>();

    pub fn new(min: u32, max: u32, increment: u32) -> Self {
        Self {
            min: min.to_le_bytes(),
            max: max.to_le_bytes(),
            increment: increment.to_le_bytes(),
        }
    }

    pub fn min(&self) -> u32 {
        u32::from_le_bytes(self.min)
    }

    pub fn max(&self) -> u32 {
        u32::from_le_bytes(self.max)
    }

    pub fn increment(&self) -> u32 {
        u32::from_le_bytes(self.increment)
    }

    /// Reads a range from a property buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, CngError> {
        let (range, _) = Self::try_ref_from_prefix(bytes).map_err(|_| CngError::BufferTooSmall)?;
        Ok(*range)
    }
}

/// Encodes `value` as NUL-terminated UTF-16LE.
pub fn utf16_property(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Decodes a UTF-16LE property value up to the first NUL.
pub fn utf16_value(value: &[u8]) -> Result<String, CngError> {
    if value.len() % 2 != 0 {
        tracing::warn!(len = value.len(), "odd-length utf-16 property value");
        return Err(CngError::InvalidParameter);
    }

    let units: Vec<u16> = value
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16(&units).map_err(|_| CngError::InvalidParameter)
}

fn u32_property(value: u32, output: Option<&mut [u8]>) -> Result<usize, CngError> {
    copy_out(&value.to_le_bytes(), output)
}

fn parse_mode(value: &[u8]) -> Result<ChainingMode, CngError> {
    let name = utf16_value(value)?;
    ChainingMode::from_str(&name).map_err(|_| {
        tracing::warn!(mode = name.as_str(), "unsupported chaining mode");
        CngError::NotImplemented
    })
}

/// Properties every catalog entry answers.
fn generic_property(alg_id: AlgId, property: Property, output: Option<&mut [u8]>) -> Result<usize, CngError> {
    let info = alg_id.info();
    match property {
        Property::ObjectLength if info.object_length == 0 => Err(CngError::NotSupported),
        Property::ObjectLength => u32_property(info.object_length, output),
        Property::HashDigestLength if info.hash_length == 0 => Err(CngError::NotSupported),
        Property::HashDigestLength => u32_property(info.hash_length, output),
        Property::AlgorithmName => copy_out(&utf16_property(alg_id.name()), output),
        _ => Err(CngError::NotImplemented),
    }
}

fn aes_property(mode: ChainingMode, property: Property, output: Option<&mut [u8]>) -> Result<usize, CngError> {
    match property {
        Property::BlockLength => u32_property(AES_BLOCK_LENGTH as u32, output),
        Property::ChainingMode => {
            let mut field = [0u8; CHAINING_MODE_PROPERTY_LEN];
            let name = utf16_property(mode.name());
            field[..name.len()].copy_from_slice(&name);
            copy_out(&field, output)
        }
        Property::KeyLengths => copy_out(LengthRange::new(128, 256, 64).as_bytes(), output),
        Property::AuthTagLength => {
            if mode != ChainingMode::Gcm {
                return Err(CngError::NotSupported);
            }
            let range = LengthRange::new(GCM_MIN_TAG_LENGTH as u32, GCM_MAX_TAG_LENGTH as u32, 1);
            copy_out(range.as_bytes(), output)
        }
        _ => Err(CngError::NotImplemented),
    }
}

impl Algorithm {
    /// Reads a property of the algorithm provider.
    ///
    /// # Errors
    ///
    /// * `CngError::NotSupported` - The property is meaningless here (object
    ///   or digest length of a non-hash, tag lengths outside GCM, DSA padding).
    /// * `CngError::NotImplemented` - Unknown property.
    /// * `CngError::BufferTooSmall` - `output` is too short.
    pub fn property(&self, name: &str, output: Option<&mut [u8]>) -> Result<usize, CngError> {
        let property = Property::parse(name)?;
        if property.is_generic() {
            return generic_property(self.id(), property, output);
        }

        match (self.id(), property) {
            (AlgId::Aes, _) => aes_property(self.mode(), property, output),
            (AlgId::Rsa | AlgId::RsaSign, Property::PaddingSchemes) => {
                u32_property(SUPPORTED_PAD_PKCS1_SIG, output)
            }
            (AlgId::Dsa, Property::PaddingSchemes) => Err(CngError::NotSupported),
            (alg, _) => {
                tracing::warn!(alg = alg.name(), property = property.name(), "unsupported property");
                Err(CngError::NotImplemented)
            }
        }
    }

    /// Writes a property of the algorithm provider. Only the AES
    /// `ChainingMode` is writable.
    pub fn set_property(&mut self, name: &str, value: &[u8]) -> Result<(), CngError> {
        let property = Property::parse(name)?;
        if self.id() != AlgId::Aes || property != Property::ChainingMode {
            tracing::warn!(alg = self.id().name(), property = property.name(), "read-only property");
            return Err(CngError::NotImplemented);
        }

        let mode = parse_mode(value)?;
        self.set_mode(mode)
    }
}

impl Hash {
    /// Reads a property of the hash's algorithm.
    pub fn property(&self, name: &str, output: Option<&mut [u8]>) -> Result<usize, CngError> {
        let property = Property::parse(name)?;
        generic_property(self.alg_id(), property, output)
    }
}

impl Key {
    /// Reads a key property.
    ///
    /// Every key reports `KeyLength` and `KeyStrength` in bits. AES keys also
    /// answer the AES algorithm properties for their own chaining mode, except
    /// `AuthTagLength`.
    pub fn property(&self, name: &str, output: Option<&mut [u8]>) -> Result<usize, CngError> {
        let property = Property::parse(name)?;

        match (self, property) {
            (_, Property::KeyLength | Property::KeyStrength) => u32_property(self.bits(), output),
            (Key::Symmetric(key), Property::MessageBlockLength) => u32_property(key.block_size() as u32, output),
            (Key::Symmetric(_), Property::AuthTagLength) => Err(CngError::NotSupported),
            (Key::Symmetric(key), _) => aes_property(key.mode(), property, output),
            (Key::Asymmetric(key), _) => {
                tracing::warn!(alg = key.alg_id().name(), property = property.name(), "unsupported key property");
                Err(CngError::NotImplemented)
            }
        }
    }

    /// Writes a key property. Only `ChainingMode` of a symmetric key is
    /// writable; the change drops any chaining state.
    pub fn set_property(&mut self, name: &str, value: &[u8]) -> Result<(), CngError> {
        let property = Property::parse(name)?;

        match self {
            Key::Symmetric(key) if property == Property::ChainingMode => {
                let mode = parse_mode(value)?;
                key.set_mode(mode);
                Ok(())
            }
            _ => {
                tracing::warn!(alg = self.alg_id().name(), property = property.name(), "read-only key property");
                Err(CngError::NotImplemented)
            }
        }
    }
}

#[cfg(test)]
mod tests;
