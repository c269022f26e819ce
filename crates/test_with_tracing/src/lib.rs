// Copyright (C) Microsoft Corporation. All rights reserved.

//! `#[test]` replacement that routes `tracing` output of the provider into
//! the test harness.
//!
//! Without `RUST_LOG`, events from `primitive_provider` are shown down to
//! `TRACE` and everything else from `WARN` up.

// Only used by test code; `expect` is allowed here (but not `unwrap`).
#![allow(clippy::expect_used)]

#[cfg(test)]
extern crate self as test_with_tracing;

pub use test_with_tracing_macro::test;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Target whose events are shown at every level by default.
pub const PROVIDER_TARGET: &str = "primitive_provider";

fn default_targets() -> Targets {
    Targets::new()
        .with_target(PROVIDER_TARGET, LevelFilter::TRACE)
        .with_default(LevelFilter::WARN)
}

#[doc(hidden)]
/// Installs the test subscriber once per process.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = match std::env::var("RUST_LOG") {
            Ok(var) => var
                .parse()
                .expect("Failed to parse RUST_LOG environment variable"),
            Err(_) => default_targets(),
        };
        tracing_subscriber::fmt()
            .compact()
            .with_ansi(false)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .with_target(true)
            .finish()
            .with(targets)
            .init();
    });
}
