// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL signing and verification over precomputed digests.

use openssl::bn::*;
use openssl::dsa::*;
use openssl::md::*;
use openssl::nid::*;
use openssl::pkey::*;
use openssl::pkey_ctx::*;
use openssl::rsa::*;

use super::*;

fn digest_md(alg: AlgId) -> Result<&'static MdRef, CngError> {
    match alg {
        AlgId::Sha1 => Ok(Md::sha1()),
        AlgId::Sha256 => Ok(Md::sha256()),
        AlgId::Sha384 => Ok(Md::sha384()),
        AlgId::Sha512 => Ok(Md::sha512()),
        AlgId::Md5 => Ok(Md::md5()),
        AlgId::Md2 => Md::from_nid(Nid::MD2).ok_or(CngError::NotSupported),
        _ => Err(CngError::NotSupported),
    }
}

fn configure<T>(ctx: &mut PkeyCtx<T>, scheme: SignScheme) -> Result<(), CngError> {
    if let SignScheme::Pkcs1(hash_alg) = scheme {
        ctx.set_rsa_padding(Padding::PKCS1).map_err(backend_error)?;
        ctx.set_signature_md(digest_md(hash_alg)?)
            .map_err(backend_error)?;
    }
    Ok(())
}

fn expected_id(scheme: SignScheme) -> Id {
    match scheme {
        SignScheme::Pkcs1(_) => Id::RSA,
        SignScheme::Ecdsa => Id::EC,
        SignScheme::Dsa => Id::DSA,
    }
}

pub(crate) fn sign(key: &OsslKey, scheme: SignScheme, hash: &[u8]) -> Result<Vec<u8>, CngError> {
    if key.pkey().id() != expected_id(scheme) {
        return Err(CngError::InvalidParameter);
    }

    let mut ctx = PkeyCtx::new(key.pkey()).map_err(backend_error)?;
    ctx.sign_init().map_err(backend_error)?;
    configure(&mut ctx, scheme)?;

    let mut signature = Vec::new();
    ctx.sign_to_vec(hash, &mut signature).map_err(backend_error)?;
    Ok(signature)
}

fn bn(bytes: &[u8]) -> Result<BigNum, CngError> {
    BigNum::from_slice(bytes).map_err(backend_error)
}

fn public_pkey(public: &PublicKey) -> Result<PKey<Public>, CngError> {
    let pkey = match public {
        PublicKey::Rsa { exponent, modulus } => {
            let rsa = Rsa::from_public_components(bn(modulus)?, bn(exponent)?).map_err(backend_error)?;
            PKey::from_rsa(rsa)
        }
        PublicKey::Ecc { curve, x, y } => PKey::from_ec_key(key::ecc_public_key(*curve, x, y)?),
        PublicKey::Dsa { p, q, g, y } => {
            let dsa = Dsa::from_public_components(bn(p)?, bn(q)?, bn(g)?, bn(y)?).map_err(backend_error)?;
            PKey::from_dsa(dsa)
        }
    };
    pkey.map_err(backend_error)
}

pub(crate) fn verify(
    public: &PublicKey,
    scheme: SignScheme,
    hash: &[u8],
    signature: &[u8],
) -> Result<(), CngError> {
    let pkey = public_pkey(public)?;
    if pkey.id() != expected_id(scheme) {
        return Err(CngError::InvalidParameter);
    }

    let mut ctx = PkeyCtx::new(&pkey).map_err(backend_error)?;
    ctx.verify_init().map_err(backend_error)?;
    configure(&mut ctx, scheme)?;

    match ctx.verify(hash, signature) {
        Ok(true) => Ok(()),
        _ => Err(CngError::InvalidSignature),
    }
}
