// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL key-pair generation, import and export.

use openssl::bn::*;
use openssl::dsa::*;
use openssl::ec::*;
use openssl::nid::*;
use openssl::pkey::*;
use openssl::rsa::*;

use super::*;

/// Width of the DSA subgroup order and private scalar, in bytes.
pub(crate) const DSA_Q_LEN: usize = 20;

/// OpenSSL private key owned by a provider key handle.
#[derive(Clone)]
pub struct OsslKey {
    pkey: PKey<Private>,
    alg: AlgId,
}

impl OsslKey {
    fn new(pkey: PKey<Private>, alg: AlgId) -> Self {
        Self { pkey, alg }
    }

    /// Returns the underlying OpenSSL key.
    pub(crate) fn pkey(&self) -> &PKeyRef<Private> {
        &self.pkey
    }

    pub(crate) fn alg(&self) -> AlgId {
        self.alg
    }

    /// Downcasts a backend key created by this backend.
    ///
    /// Keys owned by another backend answer `NotImplemented` so the dispatch
    /// table moves on to the next backend.
    pub(crate) fn from_backend_key(key: &dyn BackendKey) -> Result<&Self, CngError> {
        key.as_any()
            .downcast_ref::<Self>()
            .ok_or(CngError::NotImplemented)
    }
}

impl BackendKey for OsslKey {
    fn duplicate(&self) -> Result<Box<dyn BackendKey>, CngError> {
        Ok(Box::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<EccCurve> for Nid {
    fn from(curve: EccCurve) -> Self {
        match curve {
            EccCurve::P256 => Nid::X9_62_PRIME256V1,
            EccCurve::P384 => Nid::SECP384R1,
        }
    }
}

fn bn(bytes: &[u8]) -> Result<BigNum, CngError> {
    BigNum::from_slice(bytes).map_err(backend_error)
}

fn padded(value: &BigNumRef, len: usize) -> Result<Vec<u8>, CngError> {
    value.to_vec_padded(len as i32).map_err(backend_error)
}

fn ecc_coordinates<T: HasPublic>(key: &EcKeyRef<T>, curve: EccCurve) -> Result<(Vec<u8>, Vec<u8>), CngError> {
    let mut ctx = BigNumContext::new().map_err(backend_error)?;
    let mut x = BigNum::new().map_err(backend_error)?;
    let mut y = BigNum::new().map_err(backend_error)?;
    key.public_key()
        .affine_coordinates_gfp(key.group(), &mut x, &mut y, &mut ctx)
        .map_err(backend_error)?;
    Ok((padded(&x, curve.point_size())?, padded(&y, curve.point_size())?))
}

/// Builds an OpenSSL EC public key from affine coordinates.
pub(crate) fn ecc_public_key(curve: EccCurve, x: &[u8], y: &[u8]) -> Result<EcKey<Public>, CngError> {
    let group = EcGroup::from_curve_name(curve.into()).map_err(backend_error)?;
    EcKey::from_public_key_affine_coordinates(&group, &*bn(x)?, &*bn(y)?).map_err(|err| {
        tracing::warn!(%err, "public point is not on the curve");
        CngError::InvalidParameter
    })
}

fn dsa_public(dsa: &DsaRef<Private>) -> Result<PublicKey, CngError> {
    let key_len = dsa.p().num_bytes() as usize;
    Ok(PublicKey::Dsa {
        p: padded(dsa.p(), key_len)?,
        q: padded(dsa.q(), DSA_Q_LEN)?,
        g: padded(dsa.g(), key_len)?,
        y: padded(dsa.pub_key(), key_len)?,
    })
}

pub(crate) fn generate(alg: AlgId, bits: u32) -> Result<KeyPair, CngError> {
    let (pkey, public) = match alg {
        AlgId::Rsa | AlgId::RsaSign => {
            let rsa = Rsa::generate(bits).map_err(backend_error)?;
            let public = PublicKey::Rsa {
                exponent: rsa.e().to_vec(),
                modulus: rsa.n().to_vec(),
            };
            (PKey::from_rsa(rsa).map_err(backend_error)?, public)
        }
        AlgId::EcdhP256 | AlgId::EcdhP384 | AlgId::EcdsaP256 | AlgId::EcdsaP384 => {
            let curve = alg.curve().ok_or(CngError::NotSupported)?;
            let group = EcGroup::from_curve_name(curve.into()).map_err(backend_error)?;
            let ec = EcKey::generate(&group).map_err(backend_error)?;
            let (x, y) = ecc_coordinates(&ec, curve)?;
            (PKey::from_ec_key(ec).map_err(backend_error)?, PublicKey::Ecc { curve, x, y })
        }
        AlgId::Dsa => {
            let dsa = Dsa::generate(bits).map_err(backend_error)?;
            let public = dsa_public(&dsa)?;
            (PKey::from_dsa(dsa).map_err(backend_error)?, public)
        }
        _ => return Err(CngError::NotSupported),
    };

    tracing::debug!(alg = alg.name(), bits, "generated key pair");
    Ok(KeyPair {
        private: Box::new(OsslKey::new(pkey, alg)),
        public,
    })
}

pub(crate) fn import_ecc(alg: AlgId, key: &EccPrivate) -> Result<KeyPair, CngError> {
    let public = ecc_public_key(key.curve, &key.x, &key.y)?;
    let d = bn(&key.d)?;
    let ec = EcKey::from_private_components(public.group(), &d, public.public_key())
        .map_err(backend_error)?;
    ec.check_key().map_err(|err| {
        tracing::warn!(%err, "ecc private key does not match public point");
        CngError::InvalidParameter
    })?;

    Ok(KeyPair {
        private: Box::new(OsslKey::new(PKey::from_ec_key(ec).map_err(backend_error)?, alg)),
        public: PublicKey::Ecc {
            curve: key.curve,
            x: key.x.clone(),
            y: key.y.clone(),
        },
    })
}

pub(crate) fn export_ecc(key: &OsslKey) -> Result<EccPrivate, CngError> {
    let curve = key.alg().curve().ok_or(CngError::NotSupported)?;
    let ec = key.pkey().ec_key().map_err(|_| CngError::NotSupported)?;
    let (x, y) = ecc_coordinates(&ec, curve)?;
    Ok(EccPrivate {
        curve,
        x,
        y,
        d: padded(ec.private_key(), curve.point_size())?,
    })
}

/// Computes the private exponent and CRT values from `e`, `p` and `q`.
fn rsa_from_primes(key: &RsaPrivate) -> Result<Rsa<Private>, CngError> {
    let mut ctx = BigNumContext::new().map_err(backend_error)?;
    let one = BigNum::from_u32(1).map_err(backend_error)?;

    let e = bn(&key.exponent)?;
    let n = bn(&key.modulus)?;
    let p = bn(&key.prime1)?;
    let q = bn(&key.prime2)?;

    let mut p1 = BigNum::new().map_err(backend_error)?;
    p1.checked_sub(&p, &one).map_err(backend_error)?;
    let mut q1 = BigNum::new().map_err(backend_error)?;
    q1.checked_sub(&q, &one).map_err(backend_error)?;

    let mut phi = BigNum::new().map_err(backend_error)?;
    phi.checked_mul(&p1, &q1, &mut ctx).map_err(backend_error)?;
    let mut d = BigNum::new().map_err(|_| CngError::NoMemory)?;
    d.mod_inverse(&e, &phi, &mut ctx).map_err(|_| CngError::InvalidParameter)?;

    let mut dmp1 = BigNum::new().map_err(backend_error)?;
    dmp1.nnmod(&d, &p1, &mut ctx).map_err(backend_error)?;
    let mut dmq1 = BigNum::new().map_err(backend_error)?;
    dmq1.nnmod(&d, &q1, &mut ctx).map_err(backend_error)?;
    let mut iqmp = BigNum::new().map_err(backend_error)?;
    iqmp.mod_inverse(&q, &p, &mut ctx).map_err(|_| CngError::InvalidParameter)?;

    let rsa = RsaPrivateKeyBuilder::new(n, e, d)
        .map_err(backend_error)?
        .set_factors(p, q)
        .map_err(backend_error)?
        .set_crt_params(dmp1, dmq1, iqmp)
        .map_err(backend_error)?
        .build();

    match rsa.check_key() {
        Ok(true) => Ok(rsa),
        _ => {
            tracing::warn!("rsa private key components are inconsistent");
            Err(CngError::InvalidParameter)
        }
    }
}

pub(crate) fn import_rsa(alg: AlgId, key: &RsaPrivate) -> Result<KeyPair, CngError> {
    let rsa = rsa_from_primes(key)?;
    let public = PublicKey::Rsa {
        exponent: rsa.e().to_vec(),
        modulus: rsa.n().to_vec(),
    };
    Ok(KeyPair {
        private: Box::new(OsslKey::new(PKey::from_rsa(rsa).map_err(backend_error)?, alg)),
        public,
    })
}

pub(crate) fn export_rsa(key: &OsslKey) -> Result<RsaPrivate, CngError> {
    let rsa = key.pkey().rsa().map_err(|_| CngError::NotSupported)?;
    Ok(RsaPrivate {
        exponent: rsa.e().to_vec(),
        modulus: rsa.n().to_vec(),
        prime1: rsa.p().ok_or(CngError::InternalError)?.to_vec(),
        prime2: rsa.q().ok_or(CngError::InternalError)?.to_vec(),
    })
}

pub(crate) fn import_dsa_capi(key: &DsaPrivate) -> Result<KeyPair, CngError> {
    let p = bn(&key.p)?;
    let g = bn(&key.g)?;
    let x = bn(&key.x)?;

    let y = if key.y.is_empty() {
        let mut ctx = BigNumContext::new().map_err(backend_error)?;
        let mut y = BigNum::new().map_err(backend_error)?;
        y.mod_exp(&g, &x, &p, &mut ctx).map_err(backend_error)?;
        y
    } else {
        bn(&key.y)?
    };

    let dsa = Dsa::from_private_components(p, bn(&key.q)?, g, x, y).map_err(backend_error)?;
    let public = dsa_public(&dsa)?;
    Ok(KeyPair {
        private: Box::new(OsslKey::new(PKey::from_dsa(dsa).map_err(backend_error)?, AlgId::Dsa)),
        public,
    })
}

pub(crate) fn export_dsa_capi(key: &OsslKey) -> Result<DsaPrivate, CngError> {
    let dsa = key.pkey().dsa().map_err(|_| CngError::NotSupported)?;
    let key_len = dsa.p().num_bytes() as usize;
    Ok(DsaPrivate {
        p: padded(dsa.p(), key_len)?,
        q: padded(dsa.q(), DSA_Q_LEN)?,
        g: padded(dsa.g(), key_len)?,
        y: padded(dsa.pub_key(), key_len)?,
        x: padded(dsa.priv_key(), DSA_Q_LEN)?,
    })
}
