// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Key exchange and authenticated encryption of single values.
//!
//! Values are sealed with the NaCl box construction (X25519 key agreement,
//! XSalsa20-Poly1305 AEAD), which is what the tokenization server speaks. A
//! fresh [`keys::EphemeralKeyPair`] is generated for every operation and the
//! shared key only lives inside a [`codec::SessionCodec`].

pub mod codec;
pub mod errors;
pub mod keys;

pub use codec::{FullText, SessionCodec, open, seal};
pub use errors::{DecryptionError, EncryptionError, KeyError};
pub use keys::{EphemeralKeyPair, PublicKey};

/// Size of X25519 public and secret keys.
pub const KEY_LENGTH: usize = 32;
/// Size of the XSalsa20 nonce prepended to every ciphertext.
pub const NONCE_LENGTH: usize = 24;
/// Size of the Poly1305 authentication tag.
pub const MAC_LENGTH: usize = 16;
