// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Demo application of the Kastela client SDK.
//!
//! Requests credentials from the application backend and tokenizes values
//! through the tokenization server, then reads them back.

pub mod configurations;
pub mod demo;
pub mod settings;
pub mod telemetry;
