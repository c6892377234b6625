// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Credential issuance by the application backend.
//!
//! The backend is the application's own server. It decides which protected
//! fields a caller may access and hands out short-lived credentials for the
//! tokenization server. Its responses are not version-checked.

use kastelacommon::{
    endpoint_paths::credential_init,
    identifiers::{Credential, Namespace, Operation},
    messages::client_backend::{CredentialParams, CredentialResponse},
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{ApiClientInitError, RequestError, parse_base_url, transport::HttpTransport};


#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    pub url: String,
}

/// Source of credentials for the tokenization server.
#[allow(async_fn_in_trait, reason = "trait is only used in the workspace")]
#[trait_variant::make(Send)]
pub trait CredentialSource {
    async fn issue_credential(&self, params: &CredentialParams)
    -> Result<Credential, RequestError>;
}

/// HTTP client of the application backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    transport: HttpTransport,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiClientInitError> {
        Self::initialize(Client::new(), config)
    }

    pub fn initialize(client: Client, config: &BackendConfig) -> Result<Self, ApiClientInitError> {
        let url = parse_base_url(&config.url)?;
        info!(%url, "Initialized backend client");
        Ok(Self {
            transport: HttpTransport::new(client, url, None),
        })
    }

    /// Requests a credential for `ids` in `namespace`.
    pub async fn credential_for(
        &self,
        namespace: Namespace,
        operation: Operation,
        ids: Vec<String>,
        ttl: u32,
    ) -> Result<Credential, RequestError> {
        let params = CredentialParams::new(namespace, operation, ids, ttl);
        self.issue_credential(&params).await
    }
}

impl CredentialSource for BackendClient {
    #[instrument(level = "debug", skip_all, fields(
        namespace = %params.namespace(),
        operation = ?params.operation,
        ids = params.ids().len(),
    ))]
    async fn issue_credential(
        &self,
        params: &CredentialParams,
    ) -> Result<Credential, RequestError> {
        let response: CredentialResponse = self
            .transport
            .post(&credential_init(params.namespace()), params)
            .await?;
        Ok(response.credential)
    }
}
