// src/auth/canonicalizer.rs
//! Canonicalization of raw `initData` credential strings.
//!
//! Telegram clients and the proxies between them deliver `initData` in a
//! handful of shapes: the plain query string, the same string tucked inside
//! a `tgWebAppData=...` pair, or the whole thing percent-encoded one or two
//! extra times in transit. This module turns a raw credential into an
//! ordered list of parse candidates, most trustworthy first, so the
//! verifier can take the first one that actually carries a signature.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

/// Reserved field carrying the issuer's signature.
pub const SIGNATURE_FIELD: &str = "hash";

/// Wrapper key some clients use to envelope the whole credential.
pub const WRAPPER_FIELD: &str = "tgWebAppData";

/// Parsed credential fields keyed by field name. Duplicate names keep the
/// last value, matching query-string convention.
pub type FieldMap = BTreeMap<String, String>;

/// Normalization technique that produced a parse candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseVariant {
    /// Direct query-string split of the input.
    Raw,
    /// Re-split of the value found under [`WRAPPER_FIELD`].
    Wrapper,
    /// Whole input percent-decoded once, then split.
    DecodeOnce,
    /// Whole input percent-decoded a second time, then split.
    DecodeTwice,
}

/// One candidate interpretation of a raw credential.
#[derive(Debug, Clone)]
pub struct ParseCandidate {
    pub fields: FieldMap,
    pub variant: ParseVariant,
    /// The string that was actually split for this candidate.
    pub normalized: String,
}

impl ParseCandidate {
    fn new(normalized: String, variant: ParseVariant) -> Self {
        let fields = split_fields(&normalized);
        Self {
            fields,
            variant,
            normalized,
        }
    }

    /// Whether this candidate carries the [`SIGNATURE_FIELD`].
    pub fn has_signature(&self) -> bool {
        self.fields.contains_key(SIGNATURE_FIELD)
    }
}

/// Splits a query-string-shaped credential into a field map, percent-decoding
/// each key and value once per the standard convention.
fn split_fields(raw: &str) -> FieldMap {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

/// Percent-decodes a whole string once.
///
/// Malformed percent sequences pass through untouched; input that does not
/// decode to valid UTF-8 yields `None` so the variant can be skipped.
fn decode_whole(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Whether the string still contains percent-encoded `=`, `&` or `{`,
/// the markers of a credential that was encoded in transit.
fn looks_encoded(raw: &str) -> bool {
    ["%3D", "%3d", "%26", "%7B", "%7b"]
        .iter()
        .any(|marker| raw.contains(marker))
}

/// Produces parse candidates for a raw credential, in priority order.
///
/// Variants are attempted in the fixed order raw, wrapper, decode-once,
/// decode-twice, stopping as soon as one contains the signature field.
/// Every attempted variant is recorded; when none carries a signature the
/// caller still receives the last attempt and can report the missing
/// signature against it.
pub fn parse_variants(raw: &str) -> Vec<ParseCandidate> {
    let mut candidates = Vec::new();

    let base = ParseCandidate::new(raw.to_string(), ParseVariant::Raw);
    let wrapped = base.fields.get(WRAPPER_FIELD).cloned();
    let found = base.has_signature();
    candidates.push(base);
    if found {
        return candidates;
    }

    // The raw split has already percent-decoded the wrapper value once;
    // re-splitting it decodes the enveloped fields.
    if let Some(inner) = wrapped {
        let candidate = ParseCandidate::new(inner, ParseVariant::Wrapper);
        let found = candidate.has_signature();
        candidates.push(candidate);
        if found {
            return candidates;
        }
    }

    let once = if looks_encoded(raw) {
        decode_whole(raw)
    } else {
        None
    };
    if let Some(decoded) = once.as_ref() {
        let candidate = ParseCandidate::new(decoded.clone(), ParseVariant::DecodeOnce);
        let found = candidate.has_signature();
        candidates.push(candidate);
        if found {
            return candidates;
        }
    }

    // Two decode applications in total: reuse the decode-once output when
    // that variant ran, otherwise start from the raw string.
    let first = match once {
        Some(decoded) => Some(decoded),
        None => decode_whole(raw),
    };
    if let Some(second) = first.as_deref().and_then(decode_whole) {
        candidates.push(ParseCandidate::new(second, ParseVariant::DecodeTwice));
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_split_wins_when_signature_present() {
        let candidates = parse_variants("auth_date=1&query_id=AAA&hash=abc");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].variant, ParseVariant::Raw);
        assert_eq!(candidates[0].fields["hash"], "abc");
        assert_eq!(candidates[0].fields["auth_date"], "1");
    }

    #[test]
    fn test_split_decodes_values_once() {
        let candidates = parse_variants("user=%7B%22id%22%3A1%7D&hash=abc");
        assert_eq!(candidates[0].fields["user"], r#"{"id":1}"#);
    }

    #[test]
    fn test_duplicate_field_keeps_last_value() {
        let candidates = parse_variants("a=1&a=2&hash=abc");
        assert_eq!(candidates[0].fields["a"], "2");
    }

    #[test]
    fn test_wrapper_variant_unwraps_envelope() {
        // tgWebAppData holds the whole credential, percent-encoded once.
        let raw = "tgWebAppData=auth_date%3D1%26hash%3Dabc&tgWebAppVersion=7.2";
        let candidates = parse_variants(raw);
        let winner = candidates.last().unwrap();
        assert_eq!(winner.variant, ParseVariant::Wrapper);
        assert_eq!(winner.fields["hash"], "abc");
        assert_eq!(winner.fields["auth_date"], "1");
    }

    #[test]
    fn test_decode_once_recovers_encoded_credential() {
        let raw = "auth_date%3D1%26hash%3Dabc";
        let candidates = parse_variants(raw);
        let winner = candidates.last().unwrap();
        assert_eq!(winner.variant, ParseVariant::DecodeOnce);
        assert_eq!(winner.fields["hash"], "abc");
    }

    #[test]
    fn test_decode_twice_recovers_doubly_encoded_credential() {
        let raw = "auth_date%253D1%2526hash%253Dabc";
        let candidates = parse_variants(raw);
        let winner = candidates.last().unwrap();
        assert_eq!(winner.variant, ParseVariant::DecodeTwice);
        assert_eq!(winner.fields["hash"], "abc");
    }

    #[test]
    fn test_without_signature_last_attempt_is_returned() {
        let candidates = parse_variants("auth_date=1&query_id=AAA");
        assert!(candidates.iter().all(|c| !c.has_signature()));
        assert_eq!(candidates.last().unwrap().variant, ParseVariant::DecodeTwice);
    }

    #[test]
    fn test_malformed_percent_sequences_do_not_panic() {
        let candidates = parse_variants("a=%zz&b=%2&hash=abc");
        assert!(candidates[0].has_signature());
    }
}
