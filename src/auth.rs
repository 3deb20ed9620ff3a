use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::TokenError;

/// Identity carried by a backend-issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Reads the claims out of a JWT without verifying its signature.
/// The backend verifies every call; the portal only needs to know who is
/// asking so it can join the right push room.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::Payload(e.to_string()))?;
    let claims: Value =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Payload(e.to_string()))?;

    // `sub` is the standard claim; some issuers put the id in `userId` instead.
    let subject = ["sub", "userId"]
        .iter()
        .find_map(|key| match claims.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .ok_or(TokenError::MissingSubject)?;

    let expires_at = claims
        .get("exp")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    Ok(TokenClaims {
        subject,
        expires_at,
    })
}

/// Session registry key (SHA-256 hex); raw tokens are never kept as keys.
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use serde_json::{Value, json};

    /// Unsigned JWT with the given claims.
    pub fn jwt(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    pub fn jwt_for(subject: &str) -> String {
        jwt(json!({ "sub": subject, "exp": 4_102_444_800i64 }))
    }
}

#[cfg(test)]
mod tests {
    use super::test_tokens::jwt;
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_subject_from_sub_claim() {
        let claims = decode_claims(&jwt(json!({ "sub": "patient-17", "exp": 1_900_000_000 }))).unwrap();
        assert_eq!(claims.subject, "patient-17");
        assert_eq!(
            claims.expires_at,
            Some(Utc.timestamp_opt(1_900_000_000, 0).unwrap())
        );
    }

    #[test]
    fn test_subject_falls_back_to_user_id_claim() {
        let claims = decode_claims(&jwt(json!({ "userId": 42 }))).unwrap();
        assert_eq!(claims.subject, "42");
        assert_eq!(claims.expires_at, None);
    }

    #[test]
    fn test_rejects_tokens_without_identity() {
        assert_eq!(
            decode_claims(&jwt(json!({ "sub": "  " }))),
            Err(TokenError::MissingSubject)
        );
        assert_eq!(decode_claims("opaque-session-token"), Err(TokenError::Malformed));
        assert_eq!(decode_claims("a.b.c.d"), Err(TokenError::Malformed));
        assert!(matches!(decode_claims("a.!!!.c"), Err(TokenError::Payload(_))));
    }

    #[test]
    fn test_expiry_check() {
        let claims = TokenClaims {
            subject: "u".into(),
            expires_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
        };
        assert!(claims.is_expired(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        assert!(!claims.is_expired(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn test_hash_access_token_is_stable_hex() {
        let a = hash_access_token("token-a");
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_access_token("token-a"));
        assert_ne!(a, hash_access_token("token-b"));
    }
}
