use std::fmt;

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng, generic_array::GenericArray},
    XChaCha20Poly1305, XNonce,
};
use cookie::Key;
use serde::{de, ser, Deserialize, Serialize};

const NONCE_LEN: usize = 24; // 192-bit
const KEY_LEN: usize = 32;

#[derive(Debug)]
pub enum Error {
    KeyLengthError,
    EncryptionError,
    DecryptionError,
    EncryptedDataLengthError,
}

/// A cryptographically secure secret key, the process-wide secret that
/// backs [`crate::token::TokenBox`].
///
/// Configured from 256 bits of random material or a 512-bit master key,
/// each as either a base64/hex string or raw bytes.
#[derive(Clone)]
pub struct SecretKey {
    pub(crate) key: Key,
    provided: bool,
}

impl SecretKey {
    /// Returns a secret key that is all zeroes; never valid for production.
    pub(crate) fn zero() -> SecretKey {
        SecretKey { key: Key::from(&[0; 64]), provided: false }
    }

    /// Creates a `SecretKey` from a 512-bit `master` key. `master` _must_ be
    /// cryptographically random.
    ///
    /// # Panics
    ///
    /// Panics if `master` < 64 bytes.
    pub fn from(master: &[u8]) -> SecretKey {
        SecretKey { key: Key::from(master), provided: true }
    }

    /// Derives a `SecretKey` from 256 bits of cryptographically random
    /// `material`. `material` _must_ be cryptographically random.
    ///
    /// # Panics
    ///
    /// Panics if `material` < 32 bytes.
    pub fn derive_from(material: &[u8]) -> SecretKey {
        SecretKey { key: Key::derive_from(material), provided: true }
    }

    /// Attempts to generate a `SecretKey` from OS randomness.
    pub fn generate() -> Option<SecretKey> {
        Some(SecretKey { key: Key::try_generate()?, provided: false })
    }

    /// `true` if `self` is the `0`-key.
    pub fn is_zero(&self) -> bool {
        self == &Self::zero()
    }

    /// `true` if `self` was not automatically generated and is not zero.
    pub fn is_provided(&self) -> bool {
        self.provided && !self.is_zero()
    }

    pub(crate) fn serialize_zero<S>(&self, ser: S) -> Result<S::Ok, S::Error>
        where S: ser::Serializer
    {
        ser.serialize_bytes(&[0; 32][..])
    }

    /// Encrypts `value`, returning the concatenated nonce and ciphertext.
    /// A fresh random nonce is generated on every call.
    pub fn encrypt<T: AsRef<[u8]>>(&self, value: T) -> Result<Vec<u8>, Error> {
        let key: [u8; KEY_LEN] = self.key
            .encryption()
            .try_into()
            .map_err(|_| Error::KeyLengthError)?;

        let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&key));
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, value.as_ref())
            .map_err(|_| Error::EncryptionError)?;

        let mut encrypted_data = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        encrypted_data.extend_from_slice(nonce.as_slice());
        encrypted_data.extend_from_slice(&ciphertext);

        Ok(encrypted_data)
    }

    /// Encrypts `value` under an explicit, externally-generated `nonce`
    /// rather than one this call generates itself. Used by
    /// [`crate::token::TokenBox`], which carries its own nonce field on the
    /// wire separately from the ciphertext.
    pub(crate) fn encrypt_with_nonce<T: AsRef<[u8]>>(
        &self,
        value: T,
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>, Error> {
        let key: [u8; KEY_LEN] = self.key
            .encryption()
            .try_into()
            .map_err(|_| Error::KeyLengthError)?;

        let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&key));
        let nonce = XNonce::from_slice(nonce);
        cipher.encrypt(nonce, value.as_ref()).map_err(|_| Error::EncryptionError)
    }

    pub(crate) fn decrypt_with_nonce<T: AsRef<[u8]>>(
        &self,
        ciphertext: T,
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>, Error> {
        let key: [u8; KEY_LEN] = self.key
            .encryption()
            .try_into()
            .map_err(|_| Error::KeyLengthError)?;

        let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&key));
        let nonce = XNonce::from_slice(nonce);
        cipher.decrypt(nonce, ciphertext.as_ref()).map_err(|_| Error::DecryptionError)
    }

    /// Decrypts data produced by [`Self::encrypt`].
    pub fn decrypt<T: AsRef<[u8]>>(&self, encrypted: T) -> Result<Vec<u8>, Error> {
        let encrypted = encrypted.as_ref();
        if encrypted.len() <= NONCE_LEN {
            return Err(Error::EncryptedDataLengthError);
        }

        let (nonce, ciphertext) = encrypted.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce);

        let key: [u8; KEY_LEN] = self.key
            .encryption()
            .try_into()
            .map_err(|_| Error::KeyLengthError)?;

        let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&key));
        cipher.decrypt(nonce, ciphertext).map_err(|_| Error::DecryptionError)
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        // `Key::partial_eq()` is a constant-time op.
        self.key == other.key
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: de::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        use {binascii::{b64decode, hex2bin}, de::Unexpected::Str};

        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = SecretKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("256-bit base64 or hex string, or 32-byte slice")
            }

            fn visit_str<E: de::Error>(self, val: &str) -> Result<SecretKey, E> {
                let e = |s| E::invalid_value(Str(s), &"256-bit base64 or hex");

                let mut buf = [0u8; 96];
                let bytes = match val.len() {
                    44 | 88 => b64decode(val.as_bytes(), &mut buf).map_err(|_| e(val))?,
                    64 => hex2bin(val.as_bytes(), &mut buf).map_err(|_| e(val))?,
                    n => Err(E::invalid_length(n, &"44 or 88 for base64, 64 for hex"))?
                };

                self.visit_bytes(bytes)
            }

            fn visit_bytes<E: de::Error>(self, bytes: &[u8]) -> Result<SecretKey, E> {
                if bytes.len() < 32 {
                    Err(E::invalid_length(bytes.len(), &"at least 32"))
                } else if bytes.iter().all(|b| *b == 0) {
                    Ok(SecretKey::zero())
                } else if bytes.len() >= 64 {
                    Ok(SecretKey::from(bytes))
                } else {
                    Ok(SecretKey::derive_from(bytes))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
                where A: de::SeqAccess<'de>
            {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }

                self.visit_bytes(&bytes)
            }
        }

        de.deserialize_any(Visitor)
    }
}

impl Serialize for SecretKey {
    fn serialize<S: ser::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        self.serialize_zero(ser)
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            f.write_str("[zero]")
        } else {
            match self.provided {
                true => f.write_str("[provided]"),
                false => f.write_str("[generated]"),
            }
        }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}
