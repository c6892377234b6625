// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Batched secure endpoints (`/api/secure/{namespace}/...`).

use serde::{Deserialize, Serialize};

use crate::{
    batch::Batch,
    crypto::{FullText, PublicKey},
    identifiers::{Credential, Token},
};

use super::ServerPublicKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeginParams {
    pub credential: Credential,
    pub client_public_key: PublicKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeginResponse {
    pub server_public_key: ServerPublicKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreParams {
    pub credential: Credential,
    pub values: Batch<FullText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub tokens: Batch<Token>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchParams {
    pub credential: Credential,
    pub tokens: Batch<Token>,
}

/// Values are left base64-encoded; a corrupted value is a decryption failure
/// of that value, not a malformed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub values: Batch<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KEY_LENGTH, MAC_LENGTH, NONCE_LENGTH};

    fn credential() -> Credential {
        Credential::new("cred-1").unwrap()
    }

    #[test]
    fn begin_params_json() {
        let params = BeginParams {
            credential: credential(),
            client_public_key: PublicKey::from_bytes([0u8; KEY_LENGTH]),
        };
        insta::assert_json_snapshot!(params, @r#"
        {
          "credential": "cred-1",
          "client_public_key": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
        }
        "#);
    }

    #[test]
    fn store_params_json() {
        let params = StoreParams {
            credential: credential(),
            values: Batch::new(vec![
                vec![FullText::new([0u8; NONCE_LENGTH], vec![0u8; MAC_LENGTH])],
                vec![],
            ]),
        };
        insta::assert_json_snapshot!(params, @r#"
        {
          "credential": "cred-1",
          "values": [
            [
              "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=="
            ],
            []
          ]
        }
        "#);
    }

    #[test]
    fn fetch_and_store_responses_parse() {
        let store: StoreResponse =
            serde_json::from_str(r#"{"tokens": [["tok-a", "tok-b"], ["tok-c"]]}"#).unwrap();
        assert_eq!(store.tokens.shape().groups(), &[2, 1]);
        assert_eq!(store.tokens.get(1, 0), Some(&Token::from("tok-c")));

        let fetch: FetchResponse = serde_json::from_str(r#"{"values": [["abc"]]}"#).unwrap();
        assert_eq!(fetch.values.get(0, 0).map(String::as_str), Some("abc"));

        assert!(serde_json::from_str::<StoreResponse>(r#"{"token": "x"}"#).is_err());
    }

    #[test]
    fn begin_response_with_invalid_key_still_parses() {
        let response: BeginResponse =
            serde_json::from_str(r#"{"server_public_key": "short"}"#).unwrap();
        assert!(response.server_public_key.parse().is_err());
    }
}
