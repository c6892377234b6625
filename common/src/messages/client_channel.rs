// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Legacy single-value secure channel (`/api/secure-channel/...`).
//!
//! The begin request has the same body as the batched variant, see
//! [`super::client_secure::BeginParams`].

use serde::{Deserialize, Serialize};

use crate::{
    crypto::FullText,
    identifiers::{Credential, SessionId, Token},
};

use super::ServerPublicKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelBeginResponse {
    pub id: SessionId,
    pub server_public_key: ServerPublicKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertParams {
    pub credential: Credential,
    pub data: FullText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub token: Token,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_response_requires_id() {
        let response: ChannelBeginResponse = serde_json::from_str(
            r#"{"id": "s1", "server_public_key": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="}"#,
        )
        .unwrap();
        assert_eq!(response.id, SessionId::from("s1"));
        assert!(response.server_public_key.parse().is_ok());

        assert!(
            serde_json::from_str::<ChannelBeginResponse>(r#"{"server_public_key": "AAAA"}"#)
                .is_err()
        );
    }
}
