// Copyright (C) Microsoft Corporation. All rights reserved.


use test_with_tracing::test;

use super::*;

pub(crate) fn provider() -> Provider {
    Provider::new(ProviderConfig::default())
}

pub(crate) fn open(provider: &mut Provider, name: &str, flags: OpenFlags) -> Handle {
    provider
        .open_algorithm_provider(name, None, flags)
        .expect("open algorithm provider")
}

pub(crate) fn digest(provider: &mut Provider, name: &str, message: &[u8]) -> Vec<u8> {
    let alg = open(provider, name, OpenFlags::empty());
    let mut out = vec![0u8; AlgId::from_str(name).expect("hash name").hash_length()];
    provider.hash(alg, &[], message, &mut out).expect("one-shot hash");
    provider.close_algorithm_provider(alg).expect("close");
    out
}

#[test]
fn test_default_provider_backends() {
    let provider = Provider::default();
    assert_eq!(provider.backend_names(), ["openssl", "bignum"]);
    assert_eq!(provider.config(), &ProviderConfig::default());
    assert_eq!(provider.handle_count(), 0);
}
