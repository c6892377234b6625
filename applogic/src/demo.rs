// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::{Context, bail};
use kastelaapiclient::backend_api::{BackendClient, CredentialSource};
use kastelacommon::{identifiers::Operation, messages::client_backend::CredentialParams};
use kastelacoreclient::{Batch, Client, Credential, Namespace, Token};
use serde_json::Value;
use tracing::{info, instrument};

use crate::settings::{DemoSettings, Settings};

/// Result of one demo run.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoOutcome {
    pub tokens: Batch<Token>,
    pub values: Batch<Value>,
}

/// Tokenizes `values` under the configured protected field and reads them
/// back with a separate read credential.
#[instrument(skip_all, fields(items = values.len()))]
pub async fn run(settings: &Settings, values: Vec<Value>) -> anyhow::Result<DemoOutcome> {
    if values.is_empty() {
        bail!("Nothing to tokenize");
    }
    let backend = BackendClient::new(&settings.backend)?;
    let client = Client::new(&settings.tokenization)?;
    run_with(&backend, &client, &settings.demo, values).await
}

pub async fn run_with(
    credentials: &impl CredentialSource,
    client: &Client,
    demo: &DemoSettings,
    values: Vec<Value>,
) -> anyhow::Result<DemoOutcome> {
    let values = Batch::new(vec![values]);

    let write_credential = credential(credentials, demo, Operation::Write)
        .await
        .context("Failed to obtain write credential")?;
    let tokens = client
        .secure_protection_send(&write_credential, &values)
        .await
        .context("Failed to store values")?;
    info!(tokens = ?tokens, "Stored values");

    let read_credential = credential(credentials, demo, Operation::Read)
        .await
        .context("Failed to obtain read credential")?;
    let values: Batch<Value> = client
        .secure_protection_receive(&read_credential, &tokens)
        .await
        .context("Failed to fetch values")?;
    info!(items = values.shape().item_count(), "Fetched values");

    Ok(DemoOutcome { tokens, values })
}

async fn credential(
    credentials: &impl CredentialSource,
    demo: &DemoSettings,
    operation: Operation,
) -> anyhow::Result<Credential> {
    let params = CredentialParams::new(
        Namespace::Protection,
        operation,
        vec![demo.protection_id.clone()],
        demo.ttl,
    );
    Ok(credentials.issue_credential(&params).await?)
}

#[cfg(test)]
mod tests {
    use kastela_test_harness::{TokenizationServer, init_test_tracing};
    use kastelaapiclient::backend_api::BackendConfig;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    use super::*;

    async fn backend() -> MockServer {
        let backend = MockServer::start().await;
        for (operation, credential) in [("WRITE", "cred-write"), ("READ", "cred-read")] {
            Mock::given(method("POST"))
                .and(path("/api/secure/protection/init"))
                .and(body_partial_json(json!({
                    "operation": operation,
                    "protection_ids": ["field-1"],
                })))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"credential": credential})),
                )
                .expect(1)
                .mount(&backend)
                .await;
        }
        backend
    }

    fn settings(server: &TokenizationServer, backend: &MockServer) -> Settings {
        Settings {
            tokenization: server.transport_config(),
            backend: BackendConfig { url: backend.uri() },
            demo: DemoSettings {
                protection_id: "field-1".to_owned(),
                ttl: 1,
            },
        }
    }

    #[tokio::test]
    async fn round_trip_through_backend_and_server() {
        init_test_tracing();
        let server = TokenizationServer::start().await;
        let backend = backend().await;

        let values = vec![json!("alice@example.com"), json!(42)];
        let outcome = run(&settings(&server, &backend), values.clone())
            .await
            .unwrap();
        assert_eq!(
            outcome.tokens,
            Batch::new(vec![vec![Token::from("tok-1"), Token::from("tok-2")]])
        );
        assert_eq!(outcome.values, Batch::new(vec![values]));
    }

    #[tokio::test]
    async fn nothing_to_tokenize() {
        let server = TokenizationServer::start().await;
        let backend = MockServer::start().await;
        assert!(run(&settings(&server, &backend), Vec::new()).await.is_err());
    }
}
