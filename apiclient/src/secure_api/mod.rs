// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Batched secure endpoints of the `protection` and `vault` namespaces.

use kastelacommon::{
    batch::Batch,
    crypto::{FullText, PublicKey},
    endpoint_paths::{secure_begin, secure_fetch, secure_store},
    identifiers::{Credential, Namespace, Token},
    messages::client_secure::{
        BeginParams, BeginResponse, FetchParams, FetchResponse, StoreParams, StoreResponse,
    },
};
use tracing::{error, instrument};

use crate::{ApiClient, RequestError};

#[cfg(test)]
mod tests;

impl ApiClient {
    /// Exchanges the client's ephemeral public key for the server's.
    #[instrument(level = "debug", skip_all, fields(%namespace))]
    pub async fn secure_begin(
        &self,
        namespace: Namespace,
        credential: &Credential,
        client_public_key: &PublicKey,
    ) -> Result<PublicKey, RequestError> {
        let params = BeginParams {
            credential: credential.clone(),
            client_public_key: client_public_key.clone(),
        };
        let response: BeginResponse = self
            .transport
            .post(&secure_begin(namespace), &params)
            .await?;
        let server_public_key = response.server_public_key.parse().inspect_err(|e| {
            error!(%e, "Server sent an invalid public key");
        })?;
        Ok(server_public_key)
    }

    /// Stores a batch of sealed values and returns the server's tokens.
    ///
    /// The shape of the returned batch is whatever the server sent; checking
    /// it against the request is up to the caller.
    #[instrument(level = "debug", skip_all, fields(%namespace, shape = %values.shape()))]
    pub async fn secure_store(
        &self,
        namespace: Namespace,
        credential: &Credential,
        values: Batch<FullText>,
    ) -> Result<Batch<Token>, RequestError> {
        let params = StoreParams {
            credential: credential.clone(),
            values,
        };
        let response: StoreResponse = self
            .transport
            .post(&secure_store(namespace), &params)
            .await?;
        Ok(response.tokens)
    }

    /// Fetches the sealed values stored under a batch of tokens.
    ///
    /// Values are returned base64-encoded, exactly as sent by the server.
    #[instrument(level = "debug", skip_all, fields(%namespace, shape = %tokens.shape()))]
    pub async fn secure_fetch(
        &self,
        namespace: Namespace,
        credential: &Credential,
        tokens: Batch<Token>,
    ) -> Result<Batch<String>, RequestError> {
        let params = FetchParams {
            credential: credential.clone(),
            tokens,
        };
        let response: FetchResponse = self
            .transport
            .post(&secure_fetch(namespace), &params)
            .await?;
        Ok(response.values)
    }
}
