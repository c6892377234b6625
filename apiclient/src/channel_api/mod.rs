// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Legacy single-value secure channel.
//!
//! Every channel session holds one value. A value inserted through a session
//! is only persisted by the server once the session is committed; sessions
//! that are never committed are dropped by the server.

use kastelacommon::{
    crypto::{FullText, PublicKey},
    endpoint_paths::{ENDPOINT_SECURE_CHANNEL_BEGIN, secure_channel_commit, secure_channel_insert},
    identifiers::{Credential, SessionId, Token},
    messages::{
        client_channel::{ChannelBeginResponse, InsertParams, InsertResponse},
        client_secure::BeginParams,
    },
};
use reqwest::Method;
use tracing::{error, instrument};

use crate::{ApiClient, RequestError};


/// Server half of a channel handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandshake {
    pub id: SessionId,
    pub server_public_key: PublicKey,
}

impl ApiClient {
    #[instrument(level = "debug", skip_all)]
    pub async fn channel_begin(
        &self,
        credential: &Credential,
        client_public_key: &PublicKey,
    ) -> Result<ChannelHandshake, RequestError> {
        let params = BeginParams {
            credential: credential.clone(),
            client_public_key: client_public_key.clone(),
        };
        let response: ChannelBeginResponse = self
            .transport
            .post(ENDPOINT_SECURE_CHANNEL_BEGIN, &params)
            .await?;
        let server_public_key = response.server_public_key.parse().inspect_err(|e| {
            error!(%e, id = %response.id, "Server sent an invalid public key");
        })?;
        Ok(ChannelHandshake {
            id: response.id,
            server_public_key,
        })
    }

    /// Stages one sealed value in the session `id`.
    ///
    /// The returned token is not usable until the session is committed.
    #[instrument(level = "debug", skip_all, fields(%id))]
    pub async fn channel_insert(
        &self,
        id: &SessionId,
        credential: &Credential,
        data: FullText,
    ) -> Result<Token, RequestError> {
        let params = InsertParams {
            credential: credential.clone(),
            data,
        };
        let endpoint = self.transport.segments_path(&secure_channel_insert(id))?;
        let response: InsertResponse = self.transport.post(&endpoint, &params).await?;
        Ok(response.token)
    }

    #[instrument(level = "debug", skip_all, fields(%id))]
    pub async fn channel_commit(&self, id: &SessionId) -> Result<(), RequestError> {
        let endpoint = self.transport.segments_path(&secure_channel_commit(id))?;
        self.transport
            .send::<()>(Method::POST, &endpoint, None)
            .await?;
        Ok(())
    }
}
