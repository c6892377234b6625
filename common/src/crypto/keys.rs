// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Single-use key material for one handshake.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use crypto_box::aead::OsRng;
use serde::{Deserialize, Serialize};

use super::{KEY_LENGTH, errors::KeyError};

/// X25519 public key, transported as standard base64.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(crypto_box::PublicKey);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(crypto_box::PublicKey::from(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| KeyError::InvalidEncoding)?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        self.0.as_bytes()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }

    pub(super) fn inner(&self) -> &crypto_box::PublicKey {
        &self.0
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_base64(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_base64()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_base64()).finish()
    }
}

/// Asymmetric keypair used for exactly one handshake.
///
/// Keypairs are never cached: [`EphemeralKeyPair::generate`] draws fresh key
/// material from the OS RNG on every call. The secret key is wiped when the
/// keypair is dropped and is never serialized.
pub struct EphemeralKeyPair {
    public_key: PublicKey,
    secret_key: crypto_box::SecretKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        let secret_key = crypto_box::SecretKey::generate(&mut OsRng);
        let public_key = PublicKey(secret_key.public_key());
        Self {
            public_key,
            secret_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub(super) fn secret_key(&self) -> &crypto_box::SecretKey {
        &self.secret_key
    }
}

// Ensures that the secret key is not printed in debug outputs.
impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[[REDACTED]]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keypairs_are_independent() {
        let first = EphemeralKeyPair::generate();
        let second = EphemeralKeyPair::generate();
        assert_ne!(first.public_key(), second.public_key());
    }

    #[test]
    fn public_key_base64_roundtrip() {
        let key_pair = EphemeralKeyPair::generate();
        let encoded = key_pair.public_key().to_base64();
        let decoded = PublicKey::from_base64(&encoded).unwrap();
        assert_eq!(&decoded, key_pair.public_key());
    }

    #[test]
    fn public_key_rejects_wrong_length() {
        let encoded = STANDARD.encode([7u8; 31]);
        assert_eq!(
            PublicKey::from_base64(&encoded),
            Err(KeyError::InvalidLength(31))
        );
        assert_eq!(
            PublicKey::from_base64("not base64!"),
            Err(KeyError::InvalidEncoding)
        );
    }

    #[test]
    fn secret_key_is_redacted() {
        let key_pair = EphemeralKeyPair::generate();
        let debug = format!("{key_pair:?}");
        assert!(debug.contains("[[REDACTED]]"));
    }
}
