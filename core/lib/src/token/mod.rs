//! Authenticated encryption of small typed payloads under a process secret.

mod shield;

pub use shield::{shield, unshield};

use base64::{Engine, engine::general_purpose::STANDARD as B64};
use rand::RngCore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::SecretKey;

const NONCE_LEN: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("secret must be at least 8 bytes")]
    SecretTooShort,
    #[error("secret must not be empty")]
    SecretEmpty,
    #[error("token has the wrong type: expected `{expected}`, found `{found}`")]
    WrongType { expected: String, found: String },
    #[error("token decryption failed")]
    DecryptionFailed,
    #[error("token payload could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("malformed token encoding")]
    Malformed,
}

/// A signed+encrypted token as carried on the wire: `{ type, nonce,
/// ciphertext }`, each of the latter two
/// base64-encoded independently so the type tag is visible without
/// decrypting (used to pick the right expected-type check before even
/// attempting decryption).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(with = "b64_field")]
    pub nonce: Vec<u8>,
    #[serde(with = "b64_field")]
    pub ciphertext: Vec<u8>,
}

mod b64_field {
    use super::B64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&B64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        B64.decode(s.as_bytes()).map_err(D::Error::custom)
    }
}

/// Authenticated-encryption facility over a process-wide secret. Two
/// servers sharing the same secret interoperate, because the nonce travels
/// alongside the ciphertext.
#[derive(Clone)]
pub struct TokenBox {
    key: SecretKey,
}

impl TokenBox {
    /// Builds a `TokenBox` directly from a pre-validated [`SecretKey`],
    /// e.g. one produced by [`SecretKey::generate`] at startup.
    pub fn new(key: SecretKey) -> Self {
        TokenBox { key }
    }

    /// Builds a `TokenBox` from raw secret bytes, such as a configuration
    /// value. Secrets shorter than 8 bytes are rejected outright; an empty
    /// secret is a distinct, harder error.
    pub fn from_secret(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::SecretEmpty);
        }

        if secret.len() < 8 {
            return Err(TokenError::SecretTooShort);
        }

        // `SecretKey::derive_from` panics below 32 bytes, but a secret as
        // short as 8 bytes must be accepted, so material short of that
        // floor is stretched to exactly 32 bytes first.
        let key = if secret.len() >= 64 {
            SecretKey::from(secret)
        } else if secret.len() >= 32 {
            SecretKey::derive_from(secret)
        } else {
            let stretched = blake3::hash(secret);
            SecretKey::derive_from(stretched.as_bytes())
        };

        Ok(TokenBox::new(key))
    }

    /// Encrypts `payload` under a freshly generated nonce, tagging the
    /// result with `type_tag` so mismatched decryption attempts fail with a
    /// distinguishable error.
    pub fn encrypt<T: Serialize>(&self, payload: &T, type_tag: &str) -> Result<Token, TokenError> {
        let plaintext = serde_json::to_vec(payload)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self.key
            .encrypt_with_nonce(&plaintext, &nonce)
            .map_err(|_| TokenError::DecryptionFailed)?;

        Ok(Token { type_tag: type_tag.to_owned(), nonce: nonce.to_vec(), ciphertext })
    }

    /// Decrypts `token`, failing with [`TokenError::WrongType`] if its type
    /// tag doesn't match `expected_type` (checked before touching the
    /// ciphertext) and [`TokenError::DecryptionFailed`] on any cryptographic
    /// mismatch — a different secret, a swapped nonce, or a tampered
    /// ciphertext. The two are always distinguishable.
    pub fn decrypt<T: DeserializeOwned>(&self, token: &Token, expected_type: &str) -> Result<T, TokenError> {
        if token.type_tag != expected_type {
            return Err(TokenError::WrongType {
                expected: expected_type.to_owned(),
                found: token.type_tag.clone(),
            });
        }

        let nonce: [u8; NONCE_LEN] = token.nonce.as_slice()
            .try_into()
            .map_err(|_| TokenError::Malformed)?;

        let plaintext = self.key
            .decrypt_with_nonce(&token.ciphertext, &nonce)
            .map_err(|_| TokenError::DecryptionFailed)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}
