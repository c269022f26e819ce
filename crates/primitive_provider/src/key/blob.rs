// Copyright (C) Microsoft Corporation. All rights reserved.

//! CNG key blob formats.
//!
//! Every header is a packed struct of little-endian byte arrays so the wire
//! format does not depend on host endianness. Key components that follow a
//! header are big-endian, except in the legacy CAPI DSA blob which stores
//! them little-endian.
//!
//! ```text
//! KeyDataBlob     magic | version | cbKeyData | key
//! OpaqueKeyBlob   length | key
//! RSA*BLOB        magic | bits | cbE | cbN | cbP | cbQ | e | n [| p | q]
//! DSAPUBLICBLOB   magic | cbKey | Count[4] | Seed[20] | q[20] | p | g | y
//! ECC*BLOB        magic | cbKey | X | Y [| D]
//! CAPI DSA        BLOBHEADER | DSSPUBKEY | p | q | g | x | DSSSEED
//! ```

use core::mem::size_of;

use strum::EnumString;
use strum::IntoStaticStr;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::TryFromBytes;
use zeroize::Zeroizing;

use super::*;

pub const KEY_DATA_BLOB_MAGIC: u32 = 0x4d42_444b;
pub const KEY_DATA_BLOB_VERSION1: u32 = 1;

pub const RSA_PUBLIC_MAGIC: u32 = 0x3141_5352;
pub const RSA_PRIVATE_MAGIC: u32 = 0x3241_5352;

pub const DSA_PUBLIC_MAGIC: u32 = 0x4250_5344;

pub const ECDH_PUBLIC_P256_MAGIC: u32 = 0x314b_4345;
pub const ECDH_PRIVATE_P256_MAGIC: u32 = 0x324b_4345;
pub const ECDH_PUBLIC_P384_MAGIC: u32 = 0x334b_4345;
pub const ECDH_PRIVATE_P384_MAGIC: u32 = 0x344b_4345;
pub const ECDSA_PUBLIC_P256_MAGIC: u32 = 0x3153_4345;
pub const ECDSA_PRIVATE_P256_MAGIC: u32 = 0x3253_4345;
pub const ECDSA_PUBLIC_P384_MAGIC: u32 = 0x3353_4345;
pub const ECDSA_PRIVATE_P384_MAGIC: u32 = 0x3453_4345;

/// CAPI `PRIVATEKEYBLOB` blob type.
pub const CAPI_PRIVATE_KEY_BLOB: u8 = 0x07;
/// CAPI `CALG_DSS_SIGN` algorithm identifier.
pub const CAPI_CALG_DSS_SIGN: u32 = 0x2200;
/// CAPI `DSS2` private key magic.
pub const CAPI_DSS2_MAGIC: u32 = 0x3253_5344;

/// Size of the DSA subgroup order and of the legacy private scalar.
const DSA_Q_SIZE: usize = 20;

/// Key blob type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum BlobType {
    #[strum(serialize = "KeyDataBlob")]
    KeyData,
    #[strum(serialize = "OpaqueKeyBlob")]
    Opaque,
    #[strum(serialize = "RSAPUBLICBLOB")]
    RsaPublic,
    #[strum(serialize = "RSAPRIVATEBLOB")]
    RsaPrivate,
    #[strum(serialize = "DSAPUBLICBLOB")]
    DsaPublic,
    #[strum(serialize = "CAPIDSAPRIVATEBLOB")]
    LegacyDsaV2Private,
    #[strum(serialize = "ECCPUBLICBLOB")]
    EccPublic,
    #[strum(serialize = "ECCPRIVATEBLOB")]
    EccPrivate,
}

impl BlobType {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Splits `len` bytes off the front of `data`.
fn take<'a>(data: &mut &'a [u8], len: usize) -> Result<&'a [u8], CngError> {
    if data.len() < len {
        Err(CngError::InvalidParameter)?;
    }
    let (head, tail) = data.split_at(len);
    *data = tail;
    Ok(head)
}

/// Re-encodes a big-endian integer into exactly `len` bytes.
fn be_fixed(value: &[u8], len: usize) -> Result<Vec<u8>, CngError> {
    let start = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    let significant = &value[start..];
    if significant.len() > len {
        tracing::error!(len, actual = significant.len(), "key component wider than its blob field");
        Err(CngError::InternalError)?;
    }

    let mut out = vec![0u8; len];
    out[len - significant.len()..].copy_from_slice(significant);
    Ok(out)
}

/// Strips leading zero bytes of a big-endian integer.
fn be_minimal(value: &[u8]) -> &[u8] {
    let start = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    &value[start..]
}

/// Re-encodes a big-endian integer as `len` little-endian bytes.
fn le_fixed(value: &[u8], len: usize) -> Result<Vec<u8>, CngError> {
    let mut out = be_fixed(value, len)?;
    out.reverse();
    Ok(out)
}

fn reversed(value: &[u8]) -> Vec<u8> {
    value.iter().rev().copied().collect()
}

fn u32_len(len: usize) -> Result<[u8; 4], CngError> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| CngError::InvalidParameter)
}

#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
struct KeyDataBlobHeader {
    magic: [u8; 4],
    version: [u8; 4],
    key_len: [u8; 4],
}

impl KeyDataBlobHeader {
    const LEN: usize = size_of::<Self>();

    fn key_len(&self) -> usize {
        u32::from_le_bytes(self.key_len) as usize
    }

    fn parse(blob: &[u8]) -> Result<(&Self, &[u8]), CngError> {
        if blob.len() < Self::LEN {
            Err(CngError::BufferTooSmall)?;
        }
        let (header, payload) =
            Self::try_ref_from_prefix(blob).map_err(|_| CngError::InvalidParameter)?;

        if u32::from_le_bytes(header.magic) != KEY_DATA_BLOB_MAGIC {
            Err(CngError::InvalidParameter)?;
        }
        if u32::from_le_bytes(header.version) != KEY_DATA_BLOB_VERSION1 {
            tracing::warn!(version = u32::from_le_bytes(header.version), "unknown key data blob version");
            Err(CngError::InvalidParameter)?;
        }
        Ok((header, payload))
    }

    fn new(key_len: usize) -> Result<Self, CngError> {
        Ok(Self {
            magic: KEY_DATA_BLOB_MAGIC.to_le_bytes(),
            version: KEY_DATA_BLOB_VERSION1.to_le_bytes(),
            key_len: u32_len(key_len)?,
        })
    }
}

#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
struct OpaqueKeyBlobHeader {
    key_len: [u8; 4],
}

impl OpaqueKeyBlobHeader {
    const LEN: usize = size_of::<Self>();

    fn key_len(&self) -> usize {
        u32::from_le_bytes(self.key_len) as usize
    }
}

#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
struct RsaKeyBlobHeader {
    magic: [u8; 4],
    bit_length: [u8; 4],
    public_exp_len: [u8; 4],
    modulus_len: [u8; 4],
    prime1_len: [u8; 4],
    prime2_len: [u8; 4],
}

impl RsaKeyBlobHeader {
    const LEN: usize = size_of::<Self>();

    fn magic(&self) -> u32 {
        u32::from_le_bytes(self.magic)
    }

    fn bit_length(&self) -> u32 {
        u32::from_le_bytes(self.bit_length)
    }

    fn public_exp_len(&self) -> usize {
        u32::from_le_bytes(self.public_exp_len) as usize
    }

    fn modulus_len(&self) -> usize {
        u32::from_le_bytes(self.modulus_len) as usize
    }

    fn prime1_len(&self) -> usize {
        u32::from_le_bytes(self.prime1_len) as usize
    }

    fn prime2_len(&self) -> usize {
        u32::from_le_bytes(self.prime2_len) as usize
    }
}

#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
struct DsaKeyBlobHeader {
    magic: [u8; 4],
    key_len: [u8; 4],
    _count: [u8; 4],
    _seed: [u8; 20],
    q: [u8; DSA_Q_SIZE],
}

impl DsaKeyBlobHeader {
    const LEN: usize = size_of::<Self>();

    fn magic(&self) -> u32 {
        u32::from_le_bytes(self.magic)
    }

    fn key_len(&self) -> usize {
        u32::from_le_bytes(self.key_len) as usize
    }
}

#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
struct EccKeyBlobHeader {
    magic: [u8; 4],
    key_len: [u8; 4],
}

impl EccKeyBlobHeader {
    const LEN: usize = size_of::<Self>();

    fn magic(&self) -> u32 {
        u32::from_le_bytes(self.magic)
    }

    fn key_len(&self) -> usize {
        u32::from_le_bytes(self.key_len) as usize
    }
}

/// CAPI `BLOBHEADER`.
#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
struct CapiBlobHeader {
    blob_type: u8,
    version: u8,
    _reserved: [u8; 2],
    key_alg: [u8; 4],
}

impl CapiBlobHeader {
    const LEN: usize = size_of::<Self>();
}

/// CAPI `DSSPUBKEY`.
#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
struct DssPubKey {
    magic: [u8; 4],
    bit_len: [u8; 4],
}

impl DssPubKey {
    const LEN: usize = size_of::<Self>();

    fn bit_len(&self) -> u32 {
        u32::from_le_bytes(self.bit_len)
    }
}

/// CAPI `DSSSEED`, carried unchanged from import to export.
#[repr(C, packed)]
#[derive(Debug, Default, Clone, Copy, IntoBytes, KnownLayout, TryFromBytes, Immutable)]
pub(crate) struct DssSeed {
    counter: [u8; 4],
    seed: [u8; 20],
}

impl DssSeed {
    const LEN: usize = size_of::<Self>();
}

fn ecc_magic(alg_id: AlgId, private: bool) -> Result<u32, CngError> {
    let magic = match (alg_id, private) {
        (AlgId::EcdhP256, false) => ECDH_PUBLIC_P256_MAGIC,
        (AlgId::EcdhP256, true) => ECDH_PRIVATE_P256_MAGIC,
        (AlgId::EcdhP384, false) => ECDH_PUBLIC_P384_MAGIC,
        (AlgId::EcdhP384, true) => ECDH_PRIVATE_P384_MAGIC,
        (AlgId::EcdsaP256, false) => ECDSA_PUBLIC_P256_MAGIC,
        (AlgId::EcdsaP256, true) => ECDSA_PRIVATE_P256_MAGIC,
        (AlgId::EcdsaP384, false) => ECDSA_PUBLIC_P384_MAGIC,
        (AlgId::EcdsaP384, true) => ECDSA_PRIVATE_P384_MAGIC,
        _ => {
            tracing::warn!(alg = alg_id.name(), "algorithm has no ecc blob format");
            return Err(CngError::NotSupported);
        }
    };
    Ok(magic)
}

impl SymmetricKey {
    /// Creates a key from a raw or opaque symmetric key blob.
    ///
    /// # Errors
    ///
    /// * `CngError::BufferTooSmall` - `input` is shorter than the blob header.
    /// * `CngError::InvalidParameter` - Bad magic or version, or the declared
    ///   key length exceeds the input.
    /// * `CngError::NotImplemented` - `blob_type` is not a symmetric blob.
    pub fn import(alg: &Algorithm, blob_type: BlobType, input: &[u8]) -> Result<Self, CngError> {
        match blob_type {
            BlobType::KeyData => {
                let (header, payload) = KeyDataBlobHeader::parse(input)?;
                let secret = payload
                    .get(..header.key_len())
                    .ok_or(CngError::InvalidParameter)?;
                SymmetricKey::new(alg, secret)
            }
            BlobType::Opaque => {
                if input.len() < OpaqueKeyBlobHeader::LEN {
                    Err(CngError::BufferTooSmall)?;
                }
                let (header, payload) = OpaqueKeyBlobHeader::try_ref_from_prefix(input)
                    .map_err(|_| CngError::InvalidParameter)?;
                let secret = payload
                    .get(..header.key_len())
                    .ok_or(CngError::InvalidParameter)?;
                SymmetricKey::new(alg, secret)
            }
            _ => {
                tracing::warn!(blob = blob_type.name(), "unsupported symmetric key blob");
                Err(CngError::NotImplemented)
            }
        }
    }

    /// Writes the key as a raw or opaque blob.
    ///
    /// With `output == None` the required size is returned.
    pub fn export(&self, blob_type: BlobType, output: Option<&mut [u8]>) -> Result<usize, CngError> {
        let mut blob = Zeroizing::new(Vec::new());
        match blob_type {
            BlobType::KeyData => {
                blob.extend_from_slice(KeyDataBlobHeader::new(self.secret().len())?.as_bytes());
            }
            BlobType::Opaque => {
                let header = OpaqueKeyBlobHeader {
                    key_len: u32_len(self.secret().len())?,
                };
                blob.extend_from_slice(header.as_bytes());
            }
            _ => {
                tracing::warn!(blob = blob_type.name(), "unsupported symmetric key blob");
                Err(CngError::NotImplemented)?;
            }
        }
        blob.extend_from_slice(self.secret());

        copy_out(&blob, output)
    }
}

impl AsymmetricKey {
    /// Creates a key from a public or private key-pair blob.
    ///
    /// Private blobs are handed to the backend as big-endian components.
    ///
    /// # Errors
    ///
    /// * `CngError::NotSupported` - `blob_type` does not fit `alg`, or a
    ///   fixed blob identifier does not match.
    /// * `CngError::InvalidParameter` - Truncated blob, wrong key size, or
    ///   a mismatched ECC magic.
    pub fn import(
        alg: &Algorithm,
        blob_type: BlobType,
        input: &[u8],
        dispatch: &Dispatch,
    ) -> Result<Self, CngError> {
        let alg_id = alg.id();
        match blob_type {
            BlobType::EccPublic | BlobType::EccPrivate => {
                Self::import_ecc(alg_id, blob_type == BlobType::EccPrivate, input, dispatch)
            }
            BlobType::RsaPublic | BlobType::RsaPrivate => {
                Self::import_rsa(alg_id, blob_type == BlobType::RsaPrivate, input, dispatch)
            }
            BlobType::DsaPublic => Self::import_dsa_public(alg_id, input),
            BlobType::LegacyDsaV2Private => Self::import_dsa_capi(alg_id, input, dispatch),
            BlobType::KeyData | BlobType::Opaque => {
                tracing::warn!(blob = blob_type.name(), "symmetric blob for a key pair");
                Err(CngError::NotSupported)
            }
        }
    }

    fn import_ecc(alg_id: AlgId, private: bool, input: &[u8], dispatch: &Dispatch) -> Result<Self, CngError> {
        if input.len() < EccKeyBlobHeader::LEN {
            Err(CngError::InvalidParameter)?;
        }
        let magic = ecc_magic(alg_id, private)?;
        let curve = alg_id.curve().ok_or(CngError::NotSupported)?;
        let size = curve.point_size();

        let (header, mut payload) = EccKeyBlobHeader::try_ref_from_prefix(input)
            .map_err(|_| CngError::InvalidParameter)?;
        if header.magic() != magic {
            tracing::warn!(magic = header.magic(), expected = magic, "ecc blob magic mismatch");
            Err(CngError::InvalidParameter)?;
        }
        if header.key_len() != size {
            tracing::warn!(key_len = header.key_len(), expected = size, "ecc blob key size mismatch");
            Err(CngError::InvalidParameter)?;
        }

        let x = take(&mut payload, size)?.to_vec();
        let y = take(&mut payload, size)?.to_vec();
        if !private {
            return Ok(Self::from_public(alg_id, curve.bits(), PublicKey::Ecc { curve, x, y }));
        }

        let d = take(&mut payload, size)?.to_vec();
        let pair = dispatch.key_import_ecc(alg_id, &EccPrivate { curve, x, y, d })?;
        Ok(Self::from_pair(alg_id, curve.bits(), pair))
    }

    fn import_rsa(alg_id: AlgId, private: bool, input: &[u8], dispatch: &Dispatch) -> Result<Self, CngError> {
        if input.len() < RsaKeyBlobHeader::LEN {
            Err(CngError::InvalidParameter)?;
        }
        let (header, mut payload) = RsaKeyBlobHeader::try_ref_from_prefix(input)
            .map_err(|_| CngError::InvalidParameter)?;

        let magic = if private { RSA_PRIVATE_MAGIC } else { RSA_PUBLIC_MAGIC };
        if !matches!(alg_id, AlgId::Rsa | AlgId::RsaSign) || header.magic() != magic {
            tracing::warn!(alg = alg_id.name(), magic = header.magic(), "rsa blob not supported");
            Err(CngError::NotSupported)?;
        }
        if header.bit_length() == 0 || header.public_exp_len() == 0 || header.modulus_len() == 0 {
            Err(CngError::InvalidParameter)?;
        }
        if header.bit_length().div_ceil(8) as usize != header.modulus_len() {
            tracing::warn!(
                bits = header.bit_length(),
                modulus_len = header.modulus_len(),
                "rsa blob bit length does not match the modulus"
            );
            Err(CngError::InvalidParameter)?;
        }

        let exponent = take(&mut payload, header.public_exp_len())?.to_vec();
        let modulus = take(&mut payload, header.modulus_len())?.to_vec();
        if !private {
            let public = PublicKey::Rsa { exponent, modulus };
            return Ok(Self::from_public(alg_id, header.bit_length(), public));
        }

        if header.prime1_len() == 0 || header.prime2_len() == 0 {
            Err(CngError::InvalidParameter)?;
        }
        let prime1 = take(&mut payload, header.prime1_len())?.to_vec();
        let prime2 = take(&mut payload, header.prime2_len())?.to_vec();
        let key = RsaPrivate {
            exponent,
            modulus,
            prime1,
            prime2,
        };
        let pair = dispatch.key_import_rsa(alg_id, &key)?;
        Ok(Self::from_pair(alg_id, header.bit_length(), pair))
    }

    fn import_dsa_public(alg_id: AlgId, input: &[u8]) -> Result<Self, CngError> {
        if input.len() < DsaKeyBlobHeader::LEN {
            Err(CngError::InvalidParameter)?;
        }
        let (header, mut payload) = DsaKeyBlobHeader::try_ref_from_prefix(input)
            .map_err(|_| CngError::InvalidParameter)?;
        if alg_id != AlgId::Dsa || header.magic() != DSA_PUBLIC_MAGIC {
            tracing::warn!(alg = alg_id.name(), magic = header.magic(), "dsa blob not supported");
            Err(CngError::NotSupported)?;
        }

        let size = header.key_len();
        if size == 0 {
            Err(CngError::InvalidParameter)?;
        }
        let p = take(&mut payload, size)?.to_vec();
        let g = take(&mut payload, size)?.to_vec();
        let y = take(&mut payload, size)?.to_vec();
        let public = PublicKey::Dsa {
            p,
            q: header.q.to_vec(),
            g,
            y,
        };
        Ok(Self::from_public(alg_id, size as u32 * 8, public))
    }

    fn import_dsa_capi(alg_id: AlgId, input: &[u8], dispatch: &Dispatch) -> Result<Self, CngError> {
        if input.len() < CapiBlobHeader::LEN {
            Err(CngError::InvalidParameter)?;
        }
        let (header, rest) =
            CapiBlobHeader::try_ref_from_prefix(input).map_err(|_| CngError::InvalidParameter)?;
        if header.blob_type != CAPI_PRIVATE_KEY_BLOB
            || header.version != 2
            || u32::from_le_bytes(header.key_alg) != CAPI_CALG_DSS_SIGN
        {
            tracing::warn!(
                blob_type = header.blob_type,
                version = header.version,
                key_alg = u32::from_le_bytes(header.key_alg),
                "capi blob not supported"
            );
            Err(CngError::NotSupported)?;
        }
        if alg_id != AlgId::Dsa {
            tracing::warn!(alg = alg_id.name(), "capi dsa blob for a non-dsa algorithm");
            Err(CngError::NotSupported)?;
        }

        if rest.len() < DssPubKey::LEN {
            Err(CngError::InvalidParameter)?;
        }
        let (pubkey, mut payload) =
            DssPubKey::try_ref_from_prefix(rest).map_err(|_| CngError::InvalidParameter)?;
        if u32::from_le_bytes(pubkey.magic) != CAPI_DSS2_MAGIC {
            Err(CngError::NotSupported)?;
        }

        let bits = pubkey.bit_len();
        let size = bits as usize / 8;
        if size == 0 || payload.len() < size * 2 + DSA_Q_SIZE * 2 + DssSeed::LEN {
            Err(CngError::InvalidParameter)?;
        }

        let p = reversed(take(&mut payload, size)?);
        let q = reversed(take(&mut payload, DSA_Q_SIZE)?);
        let g = reversed(take(&mut payload, size)?);
        let x = reversed(take(&mut payload, DSA_Q_SIZE)?);
        let (seed, _) =
            DssSeed::try_ref_from_prefix(payload).map_err(|_| CngError::InvalidParameter)?;
        let seed = *seed;

        let key = DsaPrivate {
            p,
            q,
            g,
            y: Vec::new(),
            x,
        };
        let pair = dispatch.key_import_dsa_capi(&key)?;
        let mut imported = Self::from_pair(alg_id, bits, pair);
        imported.dss_seed = seed;
        Ok(imported)
    }

    /// Writes the key in the requested blob format.
    ///
    /// With `output == None` the required size is returned; a shorter buffer
    /// fails with [`CngError::BufferTooSmall`].
    ///
    /// # Errors
    ///
    /// * `CngError::InvalidParameter` - The key holds no key material, or a
    ///   private blob was requested for a public-only key.
    /// * `CngError::NotSupported` - `blob_type` does not fit the algorithm.
    pub fn export(
        &self,
        blob_type: BlobType,
        dispatch: &Dispatch,
        output: Option<&mut [u8]>,
    ) -> Result<usize, CngError> {
        let blob = match blob_type {
            BlobType::RsaPublic => self.rsa_blob(None)?,
            BlobType::RsaPrivate => {
                let private = dispatch.key_export_rsa(self.require_private()?)?;
                self.rsa_blob(Some(&private))?
            }
            BlobType::EccPublic => self.ecc_blob(None)?,
            BlobType::EccPrivate => {
                let private = dispatch.key_export_ecc(self.require_private()?)?;
                self.ecc_blob(Some(&private))?
            }
            BlobType::DsaPublic => self.dsa_public_blob()?,
            BlobType::LegacyDsaV2Private => self.dsa_capi_blob(dispatch)?,
            BlobType::KeyData | BlobType::Opaque => {
                tracing::warn!(blob = blob_type.name(), "symmetric blob for a key pair");
                return Err(CngError::NotSupported);
            }
        };

        copy_out(&blob, output)
    }

    fn require_public(&self) -> Result<&PublicKey, CngError> {
        self.public().ok_or_else(|| {
            tracing::warn!(alg = self.alg_id().name(), "export of an unfinalized key");
            CngError::InvalidParameter
        })
    }

    fn require_private(&self) -> Result<&dyn BackendKey, CngError> {
        self.private().ok_or_else(|| {
            tracing::warn!(alg = self.alg_id().name(), "private export of a public key");
            CngError::InvalidParameter
        })
    }

    fn rsa_blob(&self, private: Option<&RsaPrivate>) -> Result<Zeroizing<Vec<u8>>, CngError> {
        let PublicKey::Rsa { exponent, modulus } = self.require_public()? else {
            return Err(CngError::NotSupported);
        };

        let exponent = be_minimal(exponent);
        let modulus = be_fixed(modulus, self.bits().div_ceil(8) as usize)?;
        let prime_len = self.bits().div_ceil(16) as usize;
        let primes = match private {
            Some(private) => Some((
                be_fixed(&private.prime1, prime_len)?,
                be_fixed(&private.prime2, prime_len)?,
            )),
            None => None,
        };

        let magic = if primes.is_some() { RSA_PRIVATE_MAGIC } else { RSA_PUBLIC_MAGIC };
        let header = RsaKeyBlobHeader {
            magic: magic.to_le_bytes(),
            bit_length: self.bits().to_le_bytes(),
            public_exp_len: u32_len(exponent.len())?,
            modulus_len: u32_len(modulus.len())?,
            prime1_len: u32_len(primes.as_ref().map_or(0, |(p, _)| p.len()))?,
            prime2_len: u32_len(primes.as_ref().map_or(0, |(_, q)| q.len()))?,
        };

        let mut blob = Zeroizing::new(header.as_bytes().to_vec());
        blob.extend_from_slice(exponent);
        blob.extend_from_slice(&modulus);
        if let Some((prime1, prime2)) = primes {
            let (prime1, prime2) = (Zeroizing::new(prime1), Zeroizing::new(prime2));
            blob.extend_from_slice(&prime1);
            blob.extend_from_slice(&prime2);
        }
        Ok(blob)
    }

    fn ecc_blob(&self, private: Option<&EccPrivate>) -> Result<Zeroizing<Vec<u8>>, CngError> {
        let PublicKey::Ecc { curve, x, y } = self.require_public()? else {
            return Err(CngError::NotSupported);
        };
        let size = curve.point_size();

        let header = EccKeyBlobHeader {
            magic: ecc_magic(self.alg_id(), private.is_some())?.to_le_bytes(),
            key_len: u32_len(size)?,
        };

        let mut blob = Zeroizing::new(header.as_bytes().to_vec());
        blob.extend_from_slice(&be_fixed(x, size)?);
        blob.extend_from_slice(&be_fixed(y, size)?);
        if let Some(private) = private {
            let d = Zeroizing::new(be_fixed(&private.d, size)?);
            blob.extend_from_slice(&d);
        }
        Ok(blob)
    }

    fn dsa_public_blob(&self) -> Result<Zeroizing<Vec<u8>>, CngError> {
        let PublicKey::Dsa { p, q, g, y } = self.require_public()? else {
            return Err(CngError::NotSupported);
        };
        let size = self.bits().div_ceil(8) as usize;

        let mut header = DsaKeyBlobHeader {
            magic: DSA_PUBLIC_MAGIC.to_le_bytes(),
            key_len: u32_len(size)?,
            ..Default::default()
        };
        header.q.copy_from_slice(&be_fixed(q, DSA_Q_SIZE)?);

        let mut blob = Zeroizing::new(header.as_bytes().to_vec());
        blob.extend_from_slice(&be_fixed(p, size)?);
        blob.extend_from_slice(&be_fixed(g, size)?);
        blob.extend_from_slice(&be_fixed(y, size)?);
        Ok(blob)
    }

    fn dsa_capi_blob(&self, dispatch: &Dispatch) -> Result<Zeroizing<Vec<u8>>, CngError> {
        if self.alg_id() != AlgId::Dsa {
            tracing::warn!(alg = self.alg_id().name(), "capi dsa blob for a non-dsa key");
            Err(CngError::NotSupported)?;
        }
        let private = dispatch.key_export_dsa_capi(self.require_private()?)?;
        let size = self.bits() as usize / 8;

        let header = CapiBlobHeader {
            blob_type: CAPI_PRIVATE_KEY_BLOB,
            version: 2,
            _reserved: [0; 2],
            key_alg: CAPI_CALG_DSS_SIGN.to_le_bytes(),
        };
        let pubkey = DssPubKey {
            magic: CAPI_DSS2_MAGIC.to_le_bytes(),
            bit_len: self.bits().to_le_bytes(),
        };

        let mut blob = Zeroizing::new(header.as_bytes().to_vec());
        blob.extend_from_slice(pubkey.as_bytes());
        blob.extend_from_slice(&le_fixed(&private.p, size)?);
        blob.extend_from_slice(&le_fixed(&private.q, DSA_Q_SIZE)?);
        blob.extend_from_slice(&le_fixed(&private.g, size)?);
        let x = Zeroizing::new(le_fixed(&private.x, DSA_Q_SIZE)?);
        blob.extend_from_slice(&x);
        blob.extend_from_slice(self.dss_seed.as_bytes());
        Ok(blob)
    }
}
