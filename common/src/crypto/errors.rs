// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum KeyError {
    /// The key is not valid base64
    #[error("Public key is not valid base64")]
    InvalidEncoding,
    /// The key has the wrong length
    #[error("Public key has invalid length {0}")]
    InvalidLength(usize),
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum EncryptionError {
    /// Encryption error
    #[error("Encryption error")]
    EncryptionError,
    /// Codec error
    #[error("Could not serialize plaintext")]
    SerializationError,
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum DecryptionError {
    /// The full text is not valid base64.
    #[error("Full text is not valid base64")]
    InvalidEncoding,
    /// The full text is too short to hold a nonce and an authentication tag.
    #[error("Full text is too short: {0} bytes")]
    Truncated(usize),
    /// Authenticated decryption rejected the ciphertext.
    #[error("decryption failed")]
    DecryptionFailed,
    /// Error deserializing payload.
    #[error("Error deserializing payload.")]
    DeserializationError,
}
