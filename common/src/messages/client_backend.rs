// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Credential issuance by the application backend.

use serde::{Deserialize, Serialize};

use crate::identifiers::{Credential, Namespace, Operation};

/// Request for a credential covering a set of protected fields.
///
/// The identifiers are sent as `protection_ids` or `vault_ids` depending on
/// the namespace. `ttl` is interpreted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialParams {
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    protection_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault_ids: Option<Vec<String>>,
    pub ttl: u32,
}

impl CredentialParams {
    pub fn new(namespace: Namespace, operation: Operation, ids: Vec<String>, ttl: u32) -> Self {
        let (protection_ids, vault_ids) = match namespace {
            Namespace::Protection => (Some(ids), None),
            Namespace::Vault => (None, Some(ids)),
        };
        Self {
            operation,
            protection_ids,
            vault_ids,
            ttl,
        }
    }

    pub fn namespace(&self) -> Namespace {
        if self.vault_ids.is_some() {
            Namespace::Vault
        } else {
            Namespace::Protection
        }
    }

    pub fn ids(&self) -> &[String] {
        self.protection_ids
            .as_deref()
            .or(self.vault_ids.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResponse {
    pub credential: Credential,
}
