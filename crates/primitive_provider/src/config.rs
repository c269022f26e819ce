// Copyright (C) Microsoft Corporation. All rights reserved.

//! Provider configuration.

use std::str::FromStr;

use super::*;

/// Environment variable overriding the backend probe order.
pub const BACKENDS_ENV: &str = "PRIMITIVE_PROVIDER_BACKENDS";

/// Environment variable overriding the reported FIPS mode.
pub const FIPS_ENV: &str = "PRIMITIVE_PROVIDER_FIPS";

/// Settings read once when a [`Provider`] is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Backends to probe, in dispatch order.
    pub backends: Vec<BackendKind>,
    /// Value reported by [`Provider::get_fips_algorithm_mode`].
    pub fips_mode: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendKind::OpenSsl, BackendKind::BigNum],
            fips_mode: false,
        }
    }
}

impl ProviderConfig {
    pub fn with_backends(mut self, backends: &[BackendKind]) -> Self {
        self.backends = backends.to_vec();
        self
    }

    pub fn with_fips_mode(mut self, fips_mode: bool) -> Self {
        self.fips_mode = fips_mode;
        self
    }

    /// Default configuration with overrides from the environment.
    ///
    /// `PRIMITIVE_PROVIDER_BACKENDS` is a comma-separated list of `openssl`,
    /// `bignum` and `none`; `PRIMITIVE_PROVIDER_FIPS` enables FIPS mode when
    /// set to `1` or `true`.
    pub fn from_env() -> Self {
        let backends = std::env::var(BACKENDS_ENV).ok();
        let fips = std::env::var(FIPS_ENV).ok();
        Self::from_values(backends.as_deref(), fips.as_deref())
    }

    /// Applies unparsed override values to the default configuration.
    pub(crate) fn from_values(backends: Option<&str>, fips: Option<&str>) -> Self {
        let mut config = Self::default();

        if let Some(list) = backends {
            config.backends = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("none"))
                .filter_map(|name| match BackendKind::from_str(name) {
                    Ok(kind) => Some(kind),
                    Err(_) => {
                        tracing::warn!(name, "ignoring unknown backend");
                        None
                    }
                })
                .collect();
        }

        if let Some(value) = fips {
            let value = value.trim();
            config.fips_mode = value == "1" || value.eq_ignore_ascii_case("true");
        }

        tracing::debug!(backends = ?config.backends, fips_mode = config.fips_mode, "provider config");
        config
    }
}
