// Copyright (C) Microsoft Corporation. All rights reserved.



pub(crate) use testvectors::*;

use super::*;

pub(crate) fn hmac_alg(name: &str) -> Algorithm {
    Algorithm::open(name, None, OpenFlags::HMAC).expect("open hmac algorithm")
}

pub(crate) fn kdf_secret() -> Secret {
    Secret::new(AlgId::EcdhP256, KDF_SECRET.to_vec())
}
