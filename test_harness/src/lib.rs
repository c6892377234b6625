// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Test support for the Kastela client crates.
//!
//! [`TokenizationServer`] runs an in-process HTTP server that performs the
//! server side of the secure endpoints: it opens sealed values with its own
//! ephemeral keys, hands out tokens, and seals values again on fetch.

use tracing_subscriber::EnvFilter;

pub mod server;

pub use server::{Faults, TokenizationServer};

/// Routes tracing output to the test writer.
///
/// Filtering is controlled by `RUST_LOG`. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
