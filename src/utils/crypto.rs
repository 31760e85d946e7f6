// src/utils/crypto.rs
//! Cryptographic utilities for credential verification.
//!
//! Implements the Telegram WebApp keyed-digest scheme: the signing key is
//! SHA-256 of the bot token, and payloads are authenticated with
//! HMAC-SHA256 over a canonical check string, rendered as lowercase hex.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Derives the signing key from the bot token.
///
/// # Arguments
/// * `bot_token` - The issuer secret shared with Telegram
///
/// # Returns
/// Fixed-size 32-byte array containing `SHA256(bot_token)`. Deterministic
/// for a given token; callers recompute it per verification and never
/// persist it.
pub fn derive_secret_key(bot_token: &str) -> [u8; 32] {
    Sha256::digest(bot_token.as_bytes()).into()
}

/// Computes `HMAC-SHA256(key, message)` rendered as lowercase hex.
pub fn hmac_sha256_hex(key: &[u8], message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC key must be valid");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a presented hex signature against `HMAC-SHA256(key, message)`.
///
/// The comparison is constant-time via the HMAC verifier. Hex decoding is
/// case-insensitive; a signature that is not valid hex simply fails the
/// check.
pub fn hmac_matches_hex(key: &[u8], message: &str, signature_hex: &str) -> bool {
    let presented = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC key must be valid");
    mac.update(message.as_bytes());
    mac.verify_slice(&presented).is_ok()
}
