// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON bodies of the tokenization server and application backend endpoints.

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyError, PublicKey};

pub mod client_backend;
pub mod client_channel;
pub mod client_secure;

/// Structured error body returned by the servers on non-success responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Server half of a handshake as it arrives on the wire.
///
/// The key is kept as a string here so that a malformed key can be told apart
/// from a malformed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPublicKey(String);

impl ServerPublicKey {
    pub fn parse(&self) -> Result<PublicKey, KeyError> {
        PublicKey::from_base64(&self.0)
    }
}

impl From<&PublicKey> for ServerPublicKey {
    fn from(key: &PublicKey) -> Self {
        Self(key.to_base64())
    }
}
