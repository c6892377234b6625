// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Client SDK of the Kastela tokenization service.
//!
//! Values are sealed for the tokenization server on the client, so neither
//! the application backend nor anything in between sees them in the clear.
//! The backend only hands out [`Credential`]s that scope what the client may
//! store or fetch.
//!
//! Every operation runs its own handshake with a freshly generated keypair.
//! [`Client`] holds no key material or session state between operations and
//! can be cloned and shared between tasks.

mod errors;
mod secure_batch;
mod secure_channel;

use kastelaapiclient::{ApiClient, ApiClientInitError, TransportConfig};

pub use errors::ClientError;
pub use kastelacommon::{
    batch::{Batch, BatchShape, ShapeMismatch},
    identifiers::{Credential, Namespace, SessionId, Token},
};
pub use secure_channel::InsertedItem;

#[derive(Debug, Clone)]
pub struct Client {
    api_client: ApiClient,
}

impl Client {
    pub fn new(config: &TransportConfig) -> Result<Self, ApiClientInitError> {
        Ok(Self::with_api_client(ApiClient::new(config)?))
    }

    pub fn with_api_client(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    pub fn api_client(&self) -> &ApiClient {
        &self.api_client
    }
}
