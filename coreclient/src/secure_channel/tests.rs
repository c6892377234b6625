// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;
use kastela_test_harness::{Faults, TokenizationServer, init_test_tracing};
use kastelacommon::assert_matches;
use serde_json::json;

use super::*;

async fn setup() -> (TokenizationServer, Client) {
    init_test_tracing();
    let server = TokenizationServer::start().await;
    let client = Client::with_api_client(server.api_client());
    (server, client)
}

fn credential() -> Credential {
    Credential::new("cred-1").unwrap()
}

#[tokio::test]
async fn sessions_are_independent_until_commit() {
    let (server, client) = setup().await;

    let first = client
        .secure_channel_insert(&credential(), "42")
        .await
        .unwrap();
    assert_eq!(first.id, SessionId::from("s1"));

    let second = client
        .secure_channel_insert(&credential(), &43)
        .await
        .unwrap();
    assert_eq!(second.id, SessionId::from("s2"));
    assert_ne!(first.token, second.token);

    client.secure_channel_commit(&first.id).await.unwrap();
    assert!(server.is_committed(&first.id));
    assert!(!server.is_committed(&second.id));
    assert_eq!(server.pending_sessions(), vec![second.id]);
    assert_eq!(server.committed_value(&first.token), Some(json!("42")));
    assert_eq!(server.committed_value(&second.token), None);
}

#[tokio::test]
async fn every_insert_uses_a_fresh_key_pair() {
    let (server, client) = setup().await;

    client
        .secure_channel_insert(&credential(), "a")
        .await
        .unwrap();
    client
        .secure_channel_insert(&credential(), "b")
        .await
        .unwrap();

    let keys: HashSet<_> = server
        .client_public_keys()
        .iter()
        .map(|key| key.to_base64())
        .collect();
    assert_eq!(keys.len(), 2);
}

#[tokio::test]
async fn transaction_commits_after_persist() {
    let (server, client) = setup().await;
    let persisted = Arc::new(Mutex::new(Vec::new()));

    let sink = persisted.clone();
    let count = client
        .secure_channel_transaction(&credential(), &["a", "b"], |tokens| async move {
            let count = tokens.len();
            sink.lock().unwrap().extend(tokens);
            Ok(count)
        })
        .await
        .unwrap();
    assert_eq!(count, 2);

    let persisted = persisted.lock().unwrap().clone();
    assert_eq!(persisted.len(), 2);
    assert_eq!(server.committed_value(&persisted[0]), Some(json!("a")));
    assert_eq!(server.committed_value(&persisted[1]), Some(json!("b")));
    assert!(server.is_committed(&SessionId::from("s1")));
    assert!(server.is_committed(&SessionId::from("s2")));
}

#[tokio::test]
async fn failed_persist_commits_nothing() {
    let (server, client) = setup().await;

    let res = client
        .secure_channel_transaction(&credential(), &["a", "b"], |_tokens| async {
            Err::<(), _>(anyhow!("database unavailable"))
        })
        .await;
    assert_matches!(&res, Err(ClientError::Persist(e)) if e.to_string() == "database unavailable");
    assert_eq!(
        server.pending_sessions(),
        vec![SessionId::from("s1"), SessionId::from("s2")]
    );
}

#[tokio::test]
async fn failed_commit_names_the_session() {
    let (server, client) = setup().await;
    server.set_faults(Faults {
        fail_commits: true,
        ..Default::default()
    });

    let res = client
        .secure_channel_transaction(&credential(), &["a", "b"], |_tokens| async { Ok(()) })
        .await;
    assert_matches!(&res, Err(ClientError::Commit { id, .. }) if id == &SessionId::from("s1"));
    let err = res.unwrap_err();
    assert_eq!(
        err.request_error()
            .and_then(kastelaapiclient::RequestError::server_message),
        Some("commit failed")
    );
}
