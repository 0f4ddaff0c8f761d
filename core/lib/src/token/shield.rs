//! BREACH-shielding.
//!
//! A token that may end up compressed together with attacker-chosen text in
//! an HTTPS response must not have a stable compressed representation
//! across responses, or a BREACH-style oracle can recover it byte-by-byte.
//! `shield` masks the buffer with fresh randomness of the same length so
//! that the wire-visible bytes differ every time even though the logical
//! token is unchanged.

use hex::{FromHex, ToHex};
use rand::RngCore;

use super::TokenError;

const DELIMITER: &str = "--";

/// `shield(buf) = hex(mask) + "--" + hex(buf XOR mask)`. The empty buffer
/// shields to `"--"`.
pub fn shield(buf: &[u8]) -> String {
    let mut mask = vec![0u8; buf.len()];
    rand::thread_rng().fill_bytes(&mut mask);

    let masked: Vec<u8> = buf.iter().zip(mask.iter()).map(|(b, m)| b ^ m).collect();

    let mut out = String::with_capacity(mask.len() * 4 + DELIMITER.len());
    out.push_str(&mask.encode_hex::<String>());
    out.push_str(DELIMITER);
    out.push_str(&masked.encode_hex::<String>());
    out
}

/// Inverse of [`shield`].
pub fn unshield(shielded: &str) -> Result<Vec<u8>, TokenError> {
    let (mask_hex, masked_hex) = shielded.split_once(DELIMITER).ok_or(TokenError::Malformed)?;

    let mask = Vec::from_hex(mask_hex).map_err(|_| TokenError::Malformed)?;
    let masked = Vec::from_hex(masked_hex).map_err(|_| TokenError::Malformed)?;

    if mask.len() != masked.len() {
        return Err(TokenError::Malformed);
    }

    Ok(mask.iter().zip(masked.iter()).map(|(m, b)| m ^ b).collect())
}
