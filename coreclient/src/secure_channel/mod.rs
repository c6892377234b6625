// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Single-value tokenization through the legacy secure channel.
//!
//! Inserting a value stages it in its own server session. The token returned
//! by the insert only becomes valid once that session is committed. Sessions
//! that are never committed are expired by the server; the client keeps no
//! record of them.

use std::future::Future;

use kastelacommon::{
    crypto::{EphemeralKeyPair, seal},
    identifiers::{Credential, SessionId, Token},
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{Client, ClientError};

#[cfg(test)]
mod tests;

/// A value staged in a channel session, waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedItem {
    pub id: SessionId,
    pub token: Token,
}

impl Client {
    /// Opens a new session and stages `value` in it.
    #[instrument(level = "info", skip_all)]
    pub async fn secure_channel_insert<V: Serialize + ?Sized>(
        &self,
        credential: &Credential,
        value: &V,
    ) -> Result<InsertedItem, ClientError> {
        let key_pair = EphemeralKeyPair::generate();
        let handshake = self
            .api_client
            .channel_begin(credential, key_pair.public_key())
            .await?;
        let data = seal(value, &handshake.server_public_key, &key_pair)?;
        let token = self
            .api_client
            .channel_insert(&handshake.id, credential, data)
            .await?;
        info!(id = %handshake.id, "Staged value");
        Ok(InsertedItem {
            id: handshake.id,
            token,
        })
    }

    #[instrument(level = "info", skip_all, fields(%id))]
    pub async fn secure_channel_commit(&self, id: &SessionId) -> Result<(), ClientError> {
        self.api_client
            .channel_commit(id)
            .await
            .map_err(|source| {
                error!(%source, %id, "Failed to commit session");
                ClientError::Commit {
                    id: id.clone(),
                    source,
                }
            })
    }

    /// Stages `values`, lets the caller persist their tokens and commits.
    ///
    /// `persist` receives the staged tokens in the order of `values`. Nothing
    /// is committed unless it succeeds. Commits happen in order and stop at
    /// the first failure, which is reported with the failing session; earlier
    /// commits are not undone.
    #[instrument(level = "info", skip_all, fields(items = values.len()))]
    pub async fn secure_channel_transaction<V, F, Fut, T>(
        &self,
        credential: &Credential,
        values: &[V],
        persist: F,
    ) -> Result<T, ClientError>
    where
        V: Serialize,
        F: FnOnce(Vec<Token>) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut staged = Vec::with_capacity(values.len());
        for value in values {
            staged.push(self.secure_channel_insert(credential, value).await?);
        }

        let tokens = staged.iter().map(|item| item.token.clone()).collect();
        let output = persist(tokens).await.map_err(|e| {
            warn!(%e, sessions = staged.len(), "Persisting failed, leaving sessions uncommitted");
            ClientError::Persist(e)
        })?;

        for item in &staged {
            self.secure_channel_commit(&item.id).await?;
        }
        Ok(output)
    }
}
