use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Decode JWT claims without validation
///
/// The client never holds the backend's signing key; the payload is only
/// read to learn when the session ends. The backend still rejects a forged
/// token with a 401.
pub fn decode_jwt_claims(token: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    // Some issuers keep the base64 padding
    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: JwtClaims = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

/// Expiry of a token, if it is well formed and carries an `exp` claim.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_jwt_claims(token).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

/// A token is usable only when it decodes and expires strictly after `now`.
pub fn is_token_valid(token: &str, now: DateTime<Utc>) -> bool {
    is_unexpired(token_expiry(token), now)
}

/// The one expiry rule: a missing expiry never counts as valid.
pub fn is_unexpired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(expires_at) => expires_at > now,
        None => {
            tracing::debug!("Token has no readable expiry, treating as unauthenticated");
            false
        }
    }
}

/// Build an unsigned token carrying the given claims.
///
/// Used by the in-memory backend, which has no signing key either.
pub fn unsigned_token(claims: &JwtClaims) -> Result<String> {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    Ok(format!("{}.{}.unsigned", header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_expiring_at(exp: DateTime<Utc>) -> String {
        unsigned_token(&JwtClaims {
            sub: Some("12".into()),
            exp: Some(exp.timestamp()),
            iat: Some(Utc::now().timestamp()),
            roles: vec!["ROLE_USER".into()],
        })
        .unwrap()
    }

    #[test]
    fn test_decode_jwt_claims() {
        // Payload: {"sub":"user_123","email":"test@example.com","exp":9999999999,"iat":1736500000,"jti":"abc123"}
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiJ1c2VyXzEyMyIsImVtYWlsIjoidGVzdEBleGFtcGxlLmNvbSIsImV4cCI6OTk5OTk5OTk5OSwiaWF0IjoxNzM2NTAwMDAwLCJqdGkiOiJhYmMxMjMifQ.signature";

        let claims = decode_jwt_claims(token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user_123"));
        assert_eq!(claims.exp, Some(9999999999));
    }

    #[test]
    fn past_expiry_is_not_valid() {
        let now = Utc::now();
        for offset in [1, 60, 86_400, 10_000_000] {
            let token = token_expiring_at(now - Duration::seconds(offset));
            assert!(!is_token_valid(&token, now), "offset {offset}");
        }
    }

    #[test]
    fn future_expiry_is_valid() {
        let now = Utc::now();
        for offset in [1, 60, 86_400, 10_000_000] {
            let token = token_expiring_at(now + Duration::seconds(offset));
            assert!(is_token_valid(&token, now), "offset {offset}");
        }
    }

    #[test]
    fn expiry_equal_to_now_is_not_valid() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(!is_token_valid(&token_expiring_at(now), now));
    }

    #[test]
    fn malformed_tokens_are_not_valid() {
        let now = Utc::now();
        assert!(!is_token_valid("", now));
        assert!(!is_token_valid("opaque-session-id", now));
        assert!(!is_token_valid("a.b", now));
        assert!(!is_token_valid("a.!!!.c", now));
        // valid base64 but not JSON
        assert!(!is_token_valid("a.bm90LWpzb24.c", now));
    }

    #[test]
    fn token_without_exp_is_not_valid() {
        let token = unsigned_token(&JwtClaims {
            sub: Some("1".into()),
            exp: None,
            iat: None,
            roles: vec![],
        })
        .unwrap();
        assert!(token_expiry(&token).is_none());
        assert!(!is_token_valid(&token, Utc::now()));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let payload = general_purpose::URL_SAFE.encode(br#"{"exp":4102444800}"#);
        let token = format!("h.{}.s", payload);
        assert_eq!(token_expiry(&token).unwrap().timestamp(), 4102444800);
    }
}
