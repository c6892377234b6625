// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tests for the batched secure endpoints.

use std::net::TcpListener;

use http::StatusCode;
use kastelacommon::{
    VERSION_HEADER, assert_matches,
    batch::Batch,
    crypto::{EphemeralKeyPair, SessionCodec},
    identifiers::{Credential, Namespace, Token},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

use crate::{ApiClient, RequestError, TransportConfig};

fn versioned(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header(VERSION_HEADER, "v0.2.0")
}

fn credential() -> Credential {
    Credential::new("cred-1").unwrap()
}

fn client(mock_server: &MockServer) -> ApiClient {
    ApiClient::with_default_http_client(mock_server.uri()).expect("Failed to initialize client")
}

#[tokio::test]
async fn begin_returns_server_public_key() {
    let mock_server = MockServer::start().await;
    let server_key_pair = EphemeralKeyPair::generate();
    let client_key_pair = EphemeralKeyPair::generate();

    Mock::given(method("POST"))
        .and(path("/api/secure/protection/begin"))
        .and(body_partial_json(json!({
            "credential": "cred-1",
            "client_public_key": client_key_pair.public_key().to_base64(),
        })))
        .respond_with(versioned(200).set_body_json(json!({
            "server_public_key": server_key_pair.public_key().to_base64(),
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let server_public_key = client(&mock_server)
        .secure_begin(
            Namespace::Protection,
            &credential(),
            client_key_pair.public_key(),
        )
        .await
        .unwrap();
    assert_eq!(&server_public_key, server_key_pair.public_key());
}

#[tokio::test]
async fn begin_without_server_key_is_bad_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/secure/vault/begin"))
        .respond_with(versioned(200).set_body_json(json!({"id": "unexpected"})))
        .mount(&mock_server)
        .await;

    let res = client(&mock_server)
        .secure_begin(
            Namespace::Vault,
            &credential(),
            EphemeralKeyPair::generate().public_key(),
        )
        .await;
    assert_matches!(res, Err(RequestError::BadResponse));
}

#[tokio::test]
async fn begin_with_malformed_server_key_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/secure/protection/begin"))
        .respond_with(versioned(200).set_body_json(json!({"server_public_key": "AAAA"})))
        .mount(&mock_server)
        .await;

    let res = client(&mock_server)
        .secure_begin(
            Namespace::Protection,
            &credential(),
            EphemeralKeyPair::generate().public_key(),
        )
        .await;
    assert_matches!(res, Err(RequestError::InvalidServerKey(_)));
}

#[tokio::test]
async fn store_sends_values_and_returns_tokens() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/secure/protection/store"))
        .and(body_partial_json(json!({"credential": "cred-1"})))
        .respond_with(versioned(200).set_body_json(json!({
            "tokens": [["tok-a", "tok-b"], ["tok-c"]],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client_key_pair = EphemeralKeyPair::generate();
    let server_key_pair = EphemeralKeyPair::generate();
    let codec = SessionCodec::new(server_key_pair.public_key(), &client_key_pair);
    let values = Batch::new(vec![vec!["a", "b"], vec!["c"]])
        .try_map(|v| codec.seal_value(v))
        .unwrap();

    let tokens = client(&mock_server)
        .secure_store(Namespace::Protection, &credential(), values.clone())
        .await
        .unwrap();
    assert_eq!(
        tokens,
        Batch::new(vec![
            vec![Token::from("tok-a"), Token::from("tok-b")],
            vec![Token::from("tok-c")]
        ])
    );

    // The sealed values went over the wire as nested base64 strings.
    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["values"], serde_json::to_value(&values).unwrap());
}

#[tokio::test]
async fn fetch_returns_raw_values() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/secure/vault/fetch"))
        .and(body_partial_json(json!({
            "credential": "cred-1",
            "tokens": [["tok-1"]],
        })))
        .respond_with(versioned(200).set_body_json(json!({"values": [["c2VhbGVk"]]})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let values = client(&mock_server)
        .secure_fetch(
            Namespace::Vault,
            &credential(),
            Batch::new(vec![vec![Token::from("tok-1")]]),
        )
        .await
        .unwrap();
    assert_eq!(values, Batch::new(vec![vec!["c2VhbGVk".to_owned()]]));
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/secure/protection/begin"))
        .respond_with(versioned(400).set_body_json(json!({"error": "credential expired"})))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .secure_begin(
            Namespace::Protection,
            &credential(),
            EphemeralKeyPair::generate().public_key(),
        )
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        RequestError::ServerError { status, .. } if *status == StatusCode::BAD_REQUEST
    );
    assert_eq!(err.server_message(), Some("credential expired"));
}

#[tokio::test]
async fn version_mismatch_is_raised_before_body_is_read() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/secure/protection/store"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(VERSION_HEADER, "v9.9")
                .set_body_json(json!({"tokens": [["tok-1"]]})),
        )
        .mount(&mock_server)
        .await;

    let res = client(&mock_server)
        .secure_store(Namespace::Protection, &credential(), Batch::default())
        .await;
    assert_matches!(res, Err(RequestError::VersionError(e)) if e.actual() == Some("v9.9"));
}

#[tokio::test]
async fn unversioned_responses_are_rejected_unless_allowed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/secure/protection/store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokens": []})))
        .mount(&mock_server)
        .await;

    let res = client(&mock_server)
        .secure_store(Namespace::Protection, &credential(), Batch::default())
        .await;
    assert_matches!(res, Err(RequestError::VersionError(_)));

    let mut config = TransportConfig::new(mock_server.uri());
    config.allow_unversioned = true;
    let lenient = ApiClient::new(&config).unwrap();
    let tokens = lenient
        .secure_store(Namespace::Protection, &credential(), Batch::default())
        .await
        .unwrap();
    assert!(tokens.is_empty());
}

#[tokio::test]
async fn network_error_without_response() {
    // Bind and immediately release a port to get an address nobody listens on.
    let address = TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("Failed to bind to random port.");
    let client = ApiClient::with_default_http_client(format!("http://{address}")).unwrap();
    let res = client
        .secure_fetch(Namespace::Protection, &credential(), Batch::default())
        .await;
    assert_matches!(res, Err(RequestError::NetworkError(_)));
}
