// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Batched tokenization through the `protection` and `vault` namespaces.
//!
//! One batch call makes exactly two requests: the handshake and the store
//! (or fetch) of the whole batch. The positions of the result mirror the
//! positions of the input.

use kastelacommon::{
    batch::Batch,
    crypto::{EphemeralKeyPair, FullText, SessionCodec},
    identifiers::{Credential, Namespace, Token},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{error, info, instrument};

use crate::{Client, ClientError};


impl Client {
    /// Seals `values` for the tokenization server and stores them.
    ///
    /// Returns one token per value, at the value's position. Nothing is
    /// stored unless every value could be sealed.
    #[instrument(level = "info", skip_all, fields(%namespace, shape = %values.shape()))]
    pub async fn secure_send<V: Serialize>(
        &self,
        namespace: Namespace,
        credential: &Credential,
        values: &Batch<V>,
    ) -> Result<Batch<Token>, ClientError> {
        let codec = self.handshake(namespace, credential).await?;
        let sealed = values.try_map(|value| codec.seal_value(value))?;

        let shape = values.shape();
        let tokens = self
            .api_client
            .secure_store(namespace, credential, sealed)
            .await?;
        tokens.ensure_shape(&shape).inspect_err(|e| {
            error!(%e, "Server returned tokens that do not match the stored values");
        })?;
        info!(items = shape.item_count(), "Stored batch");
        Ok(tokens)
    }

    /// Fetches and opens the values stored under `tokens`.
    ///
    /// The shape of the server's answer is checked before anything is
    /// decrypted. If any value fails to open, no value is returned.
    #[instrument(level = "info", skip_all, fields(%namespace, shape = %tokens.shape()))]
    pub async fn secure_receive<V: DeserializeOwned>(
        &self,
        namespace: Namespace,
        credential: &Credential,
        tokens: &Batch<Token>,
    ) -> Result<Batch<V>, ClientError> {
        let codec = self.handshake(namespace, credential).await?;

        let shape = tokens.shape();
        let sealed = self
            .api_client
            .secure_fetch(namespace, credential, tokens.clone())
            .await?;
        sealed.ensure_shape(&shape).inspect_err(|e| {
            error!(%e, "Server returned values that do not match the requested tokens");
        })?;

        let values = sealed.try_map(|encoded| {
            let full_text = FullText::from_base64(encoded)?;
            codec.open_value(&full_text)
        })?;
        info!(items = shape.item_count(), "Fetched batch");
        Ok(values)
    }

    pub async fn secure_protection_send<V: Serialize>(
        &self,
        credential: &Credential,
        values: &Batch<V>,
    ) -> Result<Batch<Token>, ClientError> {
        self.secure_send(Namespace::Protection, credential, values)
            .await
    }

    pub async fn secure_protection_receive<V: DeserializeOwned>(
        &self,
        credential: &Credential,
        tokens: &Batch<Token>,
    ) -> Result<Batch<V>, ClientError> {
        self.secure_receive(Namespace::Protection, credential, tokens)
            .await
    }

    pub async fn secure_vault_send<V: Serialize>(
        &self,
        credential: &Credential,
        values: &Batch<V>,
    ) -> Result<Batch<Token>, ClientError> {
        self.secure_send(Namespace::Vault, credential, values).await
    }

    pub async fn secure_vault_receive<V: DeserializeOwned>(
        &self,
        credential: &Credential,
        tokens: &Batch<Token>,
    ) -> Result<Batch<V>, ClientError> {
        self.secure_receive(Namespace::Vault, credential, tokens)
            .await
    }

    /// Runs a handshake with a fresh keypair. The keypair is dropped once the
    /// shared key is derived.
    async fn handshake(
        &self,
        namespace: Namespace,
        credential: &Credential,
    ) -> Result<SessionCodec, ClientError> {
        let key_pair = EphemeralKeyPair::generate();
        let server_public_key = self
            .api_client
            .secure_begin(namespace, credential, key_pair.public_key())
            .await?;
        Ok(SessionCodec::new(&server_public_key, &key_pair))
    }
}
