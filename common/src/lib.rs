// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Common data model used by the Kastela client crates.

pub mod assert_matches;
pub mod batch;
pub mod crypto;
pub mod endpoint_paths;
pub mod identifiers;
pub mod messages;
pub mod version;

/// Name of the header carrying the protocol version of the tokenization server.
pub const VERSION_HEADER: &str = "x-kastela-version";
