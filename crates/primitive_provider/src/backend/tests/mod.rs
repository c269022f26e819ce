// Copyright (C) Microsoft Corporation. All rights reserved.

mod testvectors;


pub(crate) use testvectors::*;

use super::*;

pub(crate) fn openssl_dispatch() -> Dispatch {
    Dispatch::probe(&[BackendKind::OpenSsl, BackendKind::BigNum])
}
