// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Authenticated encryption of single values and the wire packing of the
//! resulting ciphertext.
//!
//! Every value is JSON-encoded before it is sealed and JSON-decoded after it
//! is opened, so strings, numbers and structured values all round-trip with
//! their type intact. The wire form of a sealed value is
//! `base64(nonce ‖ ciphertext)`.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use crypto_box::{
    SalsaBox,
    aead::{Aead, AeadCore, OsRng, generic_array::GenericArray},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{error, instrument};
use zeroize::Zeroizing;

use super::{
    MAC_LENGTH, NONCE_LENGTH,
    errors::{DecryptionError, EncryptionError},
    keys::{EphemeralKeyPair, PublicKey},
};

/// One encrypted value: a random nonce followed by the authenticated
/// ciphertext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullText {
    nonce: [u8; NONCE_LENGTH],
    ciphertext: Vec<u8>,
}

impl FullText {
    pub fn new(nonce: [u8; NONCE_LENGTH], ciphertext: Vec<u8>) -> Self {
        Self { nonce, ciphertext }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LENGTH] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Concatenates nonce and ciphertext.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NONCE_LENGTH + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Splits the first [`NONCE_LENGTH`] bytes off as the nonce.
    ///
    /// Blobs that cannot hold a nonce and an authentication tag are rejected
    /// before any decryption is attempted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecryptionError> {
        if bytes.len() < NONCE_LENGTH + MAC_LENGTH {
            return Err(DecryptionError::Truncated(bytes.len()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LENGTH);
        let nonce = nonce
            .try_into()
            .map_err(|_| DecryptionError::Truncated(bytes.len()))?;
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, DecryptionError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| DecryptionError::InvalidEncoding)?;
        Self::from_bytes(&bytes)
    }

    #[cfg(any(feature = "test_utils", test))]
    pub fn flip_bit(&mut self, index: usize) {
        let len = NONCE_LENGTH + self.ciphertext.len();
        let index = index % len;
        if index < NONCE_LENGTH {
            self.nonce[index] ^= 1;
        } else {
            self.ciphertext[index - NONCE_LENGTH] ^= 1;
        }
    }
}

impl TryFrom<String> for FullText {
    type Error = DecryptionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_base64(&value)
    }
}

impl From<FullText> for String {
    fn from(full_text: FullText) -> Self {
        full_text.to_base64()
    }
}

/// Encryption context of one handshake.
///
/// Holds the box precomputed from the peer's public key and our own
/// ephemeral secret key. The same context works in both directions, so it is
/// used by the client to seal outgoing values and to open values fetched from
/// the server.
pub struct SessionCodec {
    salsa_box: SalsaBox,
}

impl SessionCodec {
    pub fn new(peer_public_key: &PublicKey, own_key_pair: &EphemeralKeyPair) -> Self {
        Self {
            salsa_box: SalsaBox::new(peer_public_key.inner(), own_key_pair.secret_key()),
        }
    }

    /// Seals raw bytes under a freshly generated nonce.
    pub fn seal_bytes(&self, plaintext: &[u8]) -> Result<FullText, EncryptionError> {
        let nonce = SalsaBox::generate_nonce(&mut OsRng);
        let ciphertext = self.salsa_box.encrypt(&nonce, plaintext).map_err(|_| {
            error!("Encryption error");
            EncryptionError::EncryptionError
        })?;
        Ok(FullText {
            nonce: nonce.into(),
            ciphertext,
        })
    }

    /// Opens a full text. No plaintext is returned unless authentication
    /// succeeds.
    pub fn open_bytes(&self, full_text: &FullText) -> Result<Vec<u8>, DecryptionError> {
        let nonce = GenericArray::from_slice(&full_text.nonce);
        self.salsa_box
            .decrypt(nonce, full_text.ciphertext.as_slice())
            .map_err(|_| {
                error!("Decryption error");
                DecryptionError::DecryptionFailed
            })
    }

    #[instrument(level = "trace", skip_all)]
    pub fn seal_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<FullText, EncryptionError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(value).map_err(|e| {
            error!(%e, "Could not serialize plaintext");
            EncryptionError::SerializationError
        })?);
        self.seal_bytes(&plaintext)
    }

    #[instrument(level = "trace", skip_all)]
    pub fn open_value<T: DeserializeOwned>(&self, full_text: &FullText) -> Result<T, DecryptionError> {
        let plaintext = Zeroizing::new(self.open_bytes(full_text)?);
        serde_json::from_slice(&plaintext).map_err(|e| {
            error!(%e, "Could not deserialize plaintext");
            DecryptionError::DeserializationError
        })
    }
}

/// Seals one value for the peer owning `peer_public_key`.
pub fn seal<T: Serialize + ?Sized>(
    value: &T,
    peer_public_key: &PublicKey,
    own_key_pair: &EphemeralKeyPair,
) -> Result<FullText, EncryptionError> {
    SessionCodec::new(peer_public_key, own_key_pair).seal_value(value)
}

/// Opens one value sealed by the peer owning `peer_public_key`.
pub fn open<T: DeserializeOwned>(
    full_text: &FullText,
    peer_public_key: &PublicKey,
    own_key_pair: &EphemeralKeyPair,
) -> Result<T, DecryptionError> {
    SessionCodec::new(peer_public_key, own_key_pair).open_value(full_text)
}
