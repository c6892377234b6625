// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use kastelaapiclient::RequestError;
use kastelacommon::{
    batch::ShapeMismatch,
    crypto::{DecryptionError, EncryptionError},
    identifiers::SessionId,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
    #[error(transparent)]
    Decryption(#[from] DecryptionError),
    /// The server answered with a batch that does not line up with the
    /// request.
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatch),
    /// The caller's persistence step failed; no session was committed.
    #[error("Persisting staged tokens failed: {0}")]
    Persist(#[source] anyhow::Error),
    /// Committing a channel session failed. Sessions committed before it stay
    /// committed.
    #[error("Failed to commit session {id}: {source}")]
    Commit {
        id: SessionId,
        #[source]
        source: RequestError,
    },
}

impl ClientError {
    /// Underlying request error, if the failure happened on the wire.
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            Self::Request(e) | Self::Commit { source: e, .. } => Some(e),
            _ => None,
        }
    }
}
