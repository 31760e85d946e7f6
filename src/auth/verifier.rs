// src/auth/verifier.rs
//! Verification of Telegram WebApp `initData` against the bot token.
//!
//! Algorithm summary:
//! - take the first parse candidate that carries the `hash` field;
//! - remove `hash` and build the data check string by joining the sorted
//!   remaining fields as `key=value` lines separated by `\n`;
//! - compute `secret_key = SHA256(bot_token)` and compare
//!   `HMAC_SHA256(secret_key, data_check_string)` to the presented hash in
//!   constant time;
//! - on mismatch, retry with a bounded set of normalizations of the `user`
//!   field, which is prone to re-serialization drift in clients that
//!   re-encode the embedded JSON (escaped slashes, doubled backslashes).
//!
//! All failure paths return a tagged [`VerifyError`]; malformed credentials
//! never panic. The full signing key and bot token are never logged.

use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

use crate::auth::canonicalizer::{
    parse_variants, FieldMap, ParseCandidate, ParseVariant, SIGNATURE_FIELD,
};
use crate::utils::crypto::{derive_secret_key, hmac_matches_hex};

/// Field coerced to an integer in the verified payload.
const AUTH_DATE_FIELD: &str = "auth_date";

/// Structured field subject to re-serialization drift recovery.
const PROFILE_FIELD: &str = "user";

/// Reasons a credential can fail verification.
///
/// The `Display` rendering is the machine-readable reason code reported to
/// API clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// The credential was not presented as a string.
    #[error("invalid_input")]
    InvalidInput,
    /// No parse variant yielded the signature field.
    #[error("missing_signature")]
    MissingSignature,
    /// The keyed digest matched neither the credential as presented nor any
    /// recovery normalization of the profile field.
    #[error("hash_mismatch")]
    HashMismatch,
}

/// Verified credential fields: strings throughout, except `auth_date`
/// coerced to an integer and `user` decoded to its JSON structure when
/// possible. The signature field is removed.
pub type VerifiedPayload = serde_json::Map<String, Value>;

/// Verifies a credential presented as a JSON value.
///
/// Rejects anything that is not a JSON string with
/// [`VerifyError::InvalidInput`], then delegates to [`verify_init_data`].
pub fn verify_init_value(init_data: &Value, bot_token: &str) -> Result<VerifiedPayload, VerifyError> {
    match init_data.as_str() {
        Some(raw) => verify_init_data(raw, bot_token),
        None => Err(VerifyError::InvalidInput),
    }
}

/// Verifies a raw `initData` string against the bot token.
pub fn verify_init_data(raw: &str, bot_token: &str) -> Result<VerifiedPayload, VerifyError> {
    let ParseCandidate {
        mut fields,
        variant,
        normalized,
    } = parse_variants(raw)
        .into_iter()
        .find(|candidate| candidate.has_signature())
        .ok_or(VerifyError::MissingSignature)?;

    let presented_hash = fields
        .remove(SIGNATURE_FIELD)
        .ok_or(VerifyError::MissingSignature)?;

    let secret_key = derive_secret_key(bot_token);

    if !digest_matches(&secret_key, &fields, &presented_hash) {
        match recover_profile_field(&fields, &secret_key, &presented_hash) {
            Some(recovered) => {
                fields.insert(PROFILE_FIELD.to_string(), recovered);
            }
            None => {
                log_mismatch(variant, &normalized, &fields, &secret_key, &presented_hash);
                return Err(VerifyError::HashMismatch);
            }
        }
    }

    Ok(finalize_payload(fields))
}

/// Builds the data check string: sorted `key=value` lines joined by `\n`.
/// Callers remove the signature field first.
fn canonical_string(fields: &FieldMap) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn digest_matches(secret_key: &[u8], fields: &FieldMap, presented_hash: &str) -> bool {
    hmac_matches_hex(secret_key, &canonical_string(fields), presented_hash)
}

/// Searches the bounded list of profile-field normalizations for one whose
/// substitution makes the digest match. Returns the winning value.
fn recover_profile_field(
    fields: &FieldMap,
    secret_key: &[u8],
    presented_hash: &str,
) -> Option<String> {
    let original = fields.get(PROFILE_FIELD)?;
    for candidate in profile_candidates(original) {
        let mut attempt = fields.clone();
        attempt.insert(PROFILE_FIELD.to_string(), candidate.clone());
        if digest_matches(secret_key, &attempt, presented_hash) {
            return Some(candidate);
        }
    }
    None
}

/// Normalizations known to undo common re-serialization drift, in the order
/// they are tried. Each applies to the field's original value, never to
/// another normalization's output, and duplicates are dropped while keeping
/// that order. A value the JSON step cannot parse simply contributes no
/// candidate.
fn profile_candidates(original: &str) -> Vec<String> {
    let unescaped = original.replace("\\/", "/");
    let reserialized = serde_json::from_str::<Value>(&unescaped)
        .ok()
        .and_then(|value| serde_json::to_string(&value).ok());

    let mut candidates: Vec<String> = Vec::new();
    let mut push = |value: String| {
        if !candidates.contains(&value) {
            candidates.push(value);
        }
    };
    push(original.to_string());
    push(unescaped);
    if let Some(compact) = reserialized {
        push(compact);
    }
    push(original.replace("\\\"", "\""));
    push(original.replace("\\\\", "\\"));
    candidates
}

/// Applies the declared output coercions: `auth_date` becomes an integer
/// when it parses, `user` becomes its decoded JSON structure when it
/// parses; everything else stays a string.
fn finalize_payload(fields: FieldMap) -> VerifiedPayload {
    let mut payload = VerifiedPayload::new();
    for (name, value) in fields {
        let coerced = match name.as_str() {
            AUTH_DATE_FIELD => match value.parse::<i64>() {
                Ok(timestamp) => Value::from(timestamp),
                Err(_) => Value::String(value),
            },
            PROFILE_FIELD => match serde_json::from_str::<Value>(&value) {
                Ok(decoded) => decoded,
                Err(_) => Value::String(value),
            },
            _ => Value::String(value),
        };
        payload.insert(name, coerced);
    }
    payload
}

fn log_mismatch(
    variant: ParseVariant,
    normalized: &str,
    fields: &FieldMap,
    secret_key: &[u8],
    presented: &str,
) {
    warn!("initData verification failed: hash_mismatch");
    debug!("parse variant: {:?}, normalized input: {}", variant, normalized);
    debug!("data_check_string: {}", canonical_string(fields));
    // Only a short prefix of the derived key; never the key or the token.
    debug!("secret_key prefix: {}", &hex::encode(secret_key)[..8]);
    debug!("presented hash: {}", presented);
}
