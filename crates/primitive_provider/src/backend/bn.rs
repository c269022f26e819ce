// Copyright (C) Microsoft Corporation. All rights reserved.

//! Big-number fallback backend.
//!
//! Provides only ECDH secret agreement, computed with raw point arithmetic
//! (`openssl::bn` and `openssl::ec`) rather than a key-exchange API. The
//! shared value is the X coordinate of `d * Q`, big-endian, curve width.

use openssl::bn::*;
use openssl::ec::*;

use super::*;

/// Point-arithmetic backend.
#[derive(Debug, Default)]
pub struct BigNumBackend(());

impl BigNumBackend {
    pub fn probe() -> Option<Self> {
        match BigNumContext::new() {
            Ok(_) => Some(Self(())),
            Err(err) => {
                tracing::warn!(%err, "big-number backend unusable");
                None
            }
        }
    }
}

impl CryptoBackend for BigNumBackend {
    fn name(&self) -> &'static str {
        "bignum"
    }

    fn secret_agreement(&self, private: &EccPrivate, peer: &PublicKey) -> Result<Vec<u8>, CngError> {
        let PublicKey::Ecc { curve, x, y } = peer else {
            return Err(CngError::InvalidParameter);
        };
        if *curve != private.curve {
            tracing::warn!(?curve, private = ?private.curve, "agreement keys on different curves");
            return Err(CngError::InvalidParameter);
        }

        let group = EcGroup::from_curve_name((*curve).into()).map_err(ossl::backend_error)?;
        let mut ctx = BigNumContext::new().map_err(ossl::backend_error)?;

        let px = BigNum::from_slice(x).map_err(ossl::backend_error)?;
        let py = BigNum::from_slice(y).map_err(ossl::backend_error)?;
        let mut point = EcPoint::new(&group).map_err(ossl::backend_error)?;
        point
            .set_affine_coordinates_gfp(&group, &px, &py, &mut ctx)
            .map_err(|_| CngError::InvalidParameter)?;
        if !point.is_on_curve(&group, &mut ctx).map_err(ossl::backend_error)? {
            return Err(CngError::InvalidParameter);
        }

        let d = BigNum::from_slice(&private.d).map_err(ossl::backend_error)?;
        let mut shared = EcPoint::new(&group).map_err(ossl::backend_error)?;
        shared
            .mul2(&group, &point, &d, &mut ctx)
            .map_err(ossl::backend_error)?;
        if shared.is_infinity(&group) {
            return Err(CngError::InvalidParameter);
        }

        let mut sx = BigNum::new().map_err(ossl::backend_error)?;
        let mut sy = BigNum::new().map_err(ossl::backend_error)?;
        shared
            .affine_coordinates_gfp(&group, &mut sx, &mut sy, &mut ctx)
            .map_err(ossl::backend_error)?;
        let value = sx
            .to_vec_padded(curve.point_size() as i32)
            .map_err(ossl::backend_error)?;
        sx.clear();
        Ok(value)
    }
}
