// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Paths of the tokenization server and application backend endpoints.

use crate::identifiers::{Namespace, SessionId};

pub const ENDPOINT_SECURE_PREFIX: &str = "/api/secure";
pub const ENDPOINT_SECURE_CHANNEL: &str = "/api/secure-channel";
const API_SEGMENT: &str = "api";
const SECURE_CHANNEL_SEGMENT: &str = "secure-channel";
pub const ENDPOINT_SECURE_CHANNEL_BEGIN: &str = "/api/secure-channel/begin";

/// `POST /api/secure/{namespace}/begin`
pub fn secure_begin(namespace: Namespace) -> String {
    format!("{ENDPOINT_SECURE_PREFIX}/{namespace}/begin")
}

/// `POST /api/secure/{namespace}/store`
pub fn secure_store(namespace: Namespace) -> String {
    format!("{ENDPOINT_SECURE_PREFIX}/{namespace}/store")
}

/// `POST /api/secure/{namespace}/fetch`
pub fn secure_fetch(namespace: Namespace) -> String {
    format!("{ENDPOINT_SECURE_PREFIX}/{namespace}/fetch")
}

/// `POST /api/secure/{namespace}/init` on the application backend.
pub fn credential_init(namespace: Namespace) -> String {
    format!("{ENDPOINT_SECURE_PREFIX}/{namespace}/init")
}

/// Path segments of `POST /api/secure-channel/{id}/insert`.
///
/// Session ids are chosen by the server, so the id is kept as a single
/// segment and is percent-encoded when the URL is built.
pub fn secure_channel_insert(id: &SessionId) -> [&str; 4] {
    [API_SEGMENT, SECURE_CHANNEL_SEGMENT, id.as_str(), "insert"]
}

/// Path segments of `POST /api/secure-channel/{id}/commit`.
pub fn secure_channel_commit(id: &SessionId) -> [&str; 4] {
    [API_SEGMENT, SECURE_CHANNEL_SEGMENT, id.as_str(), "commit"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(
            secure_begin(Namespace::Protection),
            "/api/secure/protection/begin"
        );
        assert_eq!(secure_store(Namespace::Vault), "/api/secure/vault/store");
        assert_eq!(
            secure_fetch(Namespace::Protection),
            "/api/secure/protection/fetch"
        );
        assert_eq!(
            credential_init(Namespace::Protection),
            "/api/secure/protection/init"
        );
        let id = SessionId::from("s1");
        assert_eq!(
            secure_channel_insert(&id),
            ["api", "secure-channel", "s1", "insert"]
        );
        assert_eq!(
            secure_channel_commit(&id),
            ["api", "secure-channel", "s1", "commit"]
        );
        assert_eq!(
            format!("/{}", secure_channel_commit(&id).join("/")),
            format!("{ENDPOINT_SECURE_CHANNEL}/s1/commit")
        );
    }
}
