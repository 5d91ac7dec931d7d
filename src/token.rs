// src/token.rs
//! Demo session tokens.
//!
//! Tokens look like JWTs but are NOT signed: the signature segment is a
//! fixed placeholder and nothing in the application verifies a token or
//! checks its expiry. They are informational only and must not be used to
//! protect anything.

use crate::models::auth::{Claims, TokenHeader};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};

const PLACEHOLDER_SIGNATURE: &str = "dummy_signature_for_demo";

pub fn token_lifetime() -> Duration {
    Duration::hours(24)
}

pub fn fabricate_token(now: DateTime<Utc>) -> String {
    let header = TokenHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let iat = now.timestamp();
    let claims = Claims {
        sub: crate::utils::generate_id(),
        iat,
        exp: iat + token_lifetime().num_seconds(),
    };

    // Serializing these plain structs cannot fail.
    let header_json = serde_json::to_string(&header).unwrap_or_default();
    let claims_json = serde_json::to_string(&claims).unwrap_or_default();

    format!(
        "{}.{}.{}",
        STANDARD.encode(header_json),
        STANDARD.encode(claims_json),
        STANDARD.encode(PLACEHOLDER_SIGNATURE)
    )
}

/// Decodes the payload segment for display. Performs no verification.
pub fn peek_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = STANDARD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_token_has_three_segments_and_day_long_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let token = fabricate_token(now);
        assert_eq!(token.split('.').count(), 3);

        let claims = peek_claims(&token).unwrap();
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 86400);
        assert!(!claims.sub.is_empty());
    }

    #[test]
    fn test_header_and_signature_segments() {
        let token = fabricate_token(Utc::now());
        let parts: Vec<&str> = token.split('.').collect();

        let header: TokenHeader =
            serde_json::from_slice(&STANDARD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header.alg, "HS256");
        assert_eq!(header.typ, "JWT");
        assert_eq!(STANDARD.decode(parts[2]).unwrap(), PLACEHOLDER_SIGNATURE.as_bytes());
    }

    #[test]
    fn test_each_token_gets_fresh_subject() {
        let now = Utc::now();
        let a = peek_claims(&fabricate_token(now)).unwrap();
        let b = peek_claims(&fabricate_token(now)).unwrap();
        assert_ne!(a.sub, b.sub);
    }

    #[test]
    fn test_peek_rejects_malformed_tokens() {
        assert_eq!(peek_claims("only.two"), None);
        assert_eq!(peek_claims("a.b.c.d"), None);
        assert_eq!(peek_claims("a.!!!.c"), None);
    }
}
