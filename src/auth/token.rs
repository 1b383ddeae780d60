//! Session token codec.
//!
//! Tokens look like JWTs (`header.payload.signature`, each segment base64url
//! without padding) but carry no trust. The signature segment is a plain
//! SHA-256 digest of the first two segments with no key, and [`decode`] never
//! looks at it: a token with a tampered or garbage signature still decodes.
//! Tokens exist so that expiry can be inspected across page loads, nothing
//! more.

use crate::models::{Identity, Role};
use crate::{Error, Result};
use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Segment delimiter.
pub const DELIMITER: char = '.';

/// Default session lifetime in hours.
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

/// Longest session lifetime accepted from configuration (100 years).
pub const MAX_SESSION_LIFETIME_HOURS: i64 = 24 * 365 * 100;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// What a token says about its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(rename = "sub")]
    pub subject_id: String,
    #[serde(rename = "email")]
    pub alias: String,
    pub role: Role,
    #[serde(rename = "iat", with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl TokenPayload {
    /// Whether the token is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left before expiry at `now` (zero once expired).
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Build a token for `identity`, issued at `now`, valid for `lifetime`.
pub fn encode(identity: &Identity, now: DateTime<Utc>, lifetime: Duration) -> Result<String> {
    let header = Header {
        alg: "none".to_string(),
        typ: "JWT".to_string(),
    };
    let expires_at = now.checked_add_signed(lifetime).ok_or_else(|| {
        Error::InvalidInput(format!(
            "session lifetime of {} hours is out of range",
            lifetime.num_hours()
        ))
    })?;
    let payload = TokenPayload {
        subject_id: identity.id.to_string(),
        alias: identity.alias.to_string(),
        role: identity.role,
        issued_at: now,
        expires_at,
    };

    let header = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?);
    let digest = Sha256::digest(format!("{}{}{}", header, DELIMITER, payload).as_bytes());
    let signature = BASE64_URL_SAFE_NO_PAD.encode(digest);

    Ok(format!(
        "{}{d}{}{d}{}",
        header,
        payload,
        signature,
        d = DELIMITER
    ))
}

/// Decode the payload of `token`.
///
/// Fails with [`Error::InvalidTokenFormat`] unless the token has exactly
/// three segments and the middle one is a well-formed payload. The header
/// and signature segments are not checked.
pub fn decode(token: &str) -> Result<TokenPayload> {
    let segments: Vec<&str> = token.trim().split(DELIMITER).collect();
    if segments.len() != 3 {
        return Err(Error::InvalidTokenFormat(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(segments[1])
        // Tokens written by older builds used padded standard base64
        .or_else(|_| BASE64_STANDARD.decode(segments[1]))
        .map_err(|e| Error::InvalidTokenFormat(format!("payload is not base64: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidTokenFormat(format!("payload is not valid: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory;
    use chrono::TimeZone;

    fn lifetime() -> Duration {
        Duration::hours(DEFAULT_SESSION_LIFETIME_HOURS)
    }

    fn issued() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_767_225_600_123).unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for identity in directory::IDENTITIES {
            let token = encode(identity, issued(), lifetime()).unwrap();
            let payload = decode(&token).unwrap();

            assert_eq!(payload.subject_id, identity.id);
            assert_eq!(payload.alias, identity.alias);
            assert_eq!(payload.role, identity.role);
            assert_eq!(payload.issued_at, issued());
        }
    }

    #[test]
    fn test_expiry_is_issue_plus_lifetime() {
        let identity = &directory::IDENTITIES[0];
        let payload = decode(&encode(identity, issued(), lifetime()).unwrap()).unwrap();
        assert_eq!(payload.expires_at - payload.issued_at, Duration::hours(24));
    }

    #[test]
    fn test_encode_rejects_expiry_past_calendar_range() {
        let identity = &directory::IDENTITIES[0];
        let result = encode(identity, issued(), Duration::days(365 * 300_000));
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let longest = Duration::hours(MAX_SESSION_LIFETIME_HOURS);
        assert!(encode(identity, issued(), longest).is_ok());
    }

    #[test]
    fn test_is_expired_boundaries() {
        let identity = &directory::IDENTITIES[0];
        let payload = decode(&encode(identity, issued(), lifetime()).unwrap()).unwrap();

        assert!(!payload.is_expired(issued()));
        // Exactly at expiry is still valid
        assert!(!payload.is_expired(issued() + Duration::hours(24)));
        assert!(payload.is_expired(issued() + Duration::hours(24) + Duration::milliseconds(1)));
    }

    #[test]
    fn test_remaining() {
        let identity = &directory::IDENTITIES[1];
        let payload = decode(&encode(identity, issued(), lifetime()).unwrap()).unwrap();

        assert_eq!(
            payload.remaining(issued() + Duration::hours(23)),
            Duration::hours(1)
        );
        assert_eq!(
            payload.remaining(issued() + Duration::hours(30)),
            Duration::zero()
        );
    }

    #[test]
    fn test_decode_wrong_segment_count() {
        for token in ["", "abc", "a.b", "a.b.c.d"] {
            let err = decode(token).unwrap_err();
            assert!(matches!(err, Error::InvalidTokenFormat(_)), "{}", token);
        }
    }

    #[test]
    fn test_decode_bad_payload() {
        let not_base64 = "aaa.!!!.ccc";
        assert!(matches!(
            decode(not_base64).unwrap_err(),
            Error::InvalidTokenFormat(_)
        ));

        let not_json = format!("aaa.{}.ccc", BASE64_URL_SAFE_NO_PAD.encode("hello"));
        assert!(matches!(
            decode(&not_json).unwrap_err(),
            Error::InvalidTokenFormat(_)
        ));
    }

    #[test]
    fn test_tampered_signature_still_decodes() {
        let identity = &directory::IDENTITIES[0];
        let token = encode(identity, issued(), lifetime()).unwrap();
        let (head, _) = token.rsplit_once(DELIMITER).unwrap();
        let tampered = format!("{}{}forged", head, DELIMITER);

        assert_eq!(decode(&tampered).unwrap(), decode(&token).unwrap());
    }

    #[test]
    fn test_decode_padded_standard_payload() {
        let payload = serde_json::json!({
            "sub": "2",
            "email": "user@example.com",
            "role": "user",
            "iat": 1_767_225_600_000_i64,
            "exp": 1_767_312_000_000_i64,
        });
        let token = format!(
            "h.{}.s",
            BASE64_STANDARD.encode(serde_json::to_vec(&payload).unwrap())
        );

        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.subject_id, "2");
        assert_eq!(decoded.role, Role::User);
    }
}
