//! Stateless session tokens.
//!
//! HMAC-signed JWTs carrying `{sub, iat, exp}`. Nothing is persisted: a token
//! is valid iff its signature checks out under the process secret and `exp`
//! lies in the future. Rotating the secret invalidates every issued token.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::errors::{AuthError, TokenError};

/// Algorithm used when issuing.
pub const ISSUE_ALGORITHM: Algorithm = Algorithm::HS256;

/// The pinned HMAC family. Anything else, `none` included, is rejected
/// before the signature is looked at.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenManager {
    /// `ttl` may be negative, which yields tokens that are already expired.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(ISSUE_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            validation,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `subject` expiring `ttl` from now.
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(ISSUE_ALGORITHM), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, subject, "failed to encode session token");
            AuthError::Internal(format!("token encoding failed: {e}"))
        })
    }

    /// Resolve the subject of `token`.
    ///
    /// Depends only on the token, the secret and the clock.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        if token.is_empty() {
            return Err(TokenError::EmptyToken);
        }
        let alg = header_algorithm(token)?;
        match alg.parse::<Algorithm>() {
            Ok(a) if ACCEPTED_ALGORITHMS.contains(&a) => {}
            _ => return Err(TokenError::AlgorithmMismatch),
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::AlgorithmMismatch,
            _ => TokenError::Malformed,
        })?;

        if data.claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims.sub)
    }
}

/// Read `alg` from the unverified header segment.
fn header_algorithm(token: &str) -> Result<String, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(TokenError::Malformed);
    };
    let bytes = URL_SAFE_NO_PAD.decode(header).map_err(|_| TokenError::Malformed)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;
    Ok(raw.alg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new("secret-a", Duration::minutes(15))
    }

    fn b64(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn future_exp() -> i64 {
        (Utc::now() + Duration::hours(1)).timestamp()
    }

    #[test]
    fn issued_token_validates_to_subject() {
        let m = manager();
        let token = m.issue("64b7f0c2-0000-4000-8000-000000000001").unwrap();
        assert_eq!(m.validate(&token).unwrap(), "64b7f0c2-0000-4000-8000-000000000001");
    }

    #[test]
    fn validate_is_repeatable() {
        let m = manager();
        let token = m.issue("abc").unwrap();
        assert_eq!(m.validate(&token), m.validate(&token));
    }

    #[test]
    fn negative_ttl_is_expired() {
        let m = TokenManager::new("secret-a", Duration::seconds(-1));
        let token = m.issue("abc").unwrap();
        assert_eq!(m.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn other_secret_is_bad_signature() {
        let token = manager().issue("abc").unwrap();
        let other = TokenManager::new("secret-b", Duration::minutes(15));
        assert_eq!(other.validate(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn empty_token() {
        assert_eq!(manager().validate(""), Err(TokenError::EmptyToken));
    }

    #[test]
    fn garbage_is_malformed() {
        let m = manager();
        assert_eq!(m.validate("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(m.validate("nodots"), Err(TokenError::Malformed));
        assert_eq!(m.validate("a.b.c.d"), Err(TokenError::Malformed));
    }

    #[test]
    fn unsigned_none_algorithm_rejected() {
        let header = b64(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = b64(&format!(r#"{{"sub":"admin","iat":0,"exp":{}}}"#, future_exp()));
        let forged = format!("{header}.{payload}.");
        assert_eq!(manager().validate(&forged), Err(TokenError::AlgorithmMismatch));

        let upper = format!("{}.{payload}.", b64(r#"{"alg":"NONE","typ":"JWT"}"#));
        assert_eq!(manager().validate(&upper), Err(TokenError::AlgorithmMismatch));
    }

    #[test]
    fn asymmetric_algorithm_rejected() {
        let header = b64(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = b64(&format!(r#"{{"sub":"admin","iat":0,"exp":{}}}"#, future_exp()));
        let forged = format!("{header}.{payload}.c2ln");
        assert_eq!(manager().validate(&forged), Err(TokenError::AlgorithmMismatch));
    }

    #[test]
    fn tampered_payload_is_bad_signature() {
        let m = manager();
        let token = m.issue("alice").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let payload = b64(&format!(r#"{{"sub":"mallory","iat":0,"exp":{}}}"#, future_exp()));
        parts[1] = &payload;
        assert_eq!(m.validate(&parts.join(".")), Err(TokenError::BadSignature));
    }

    #[test]
    fn hmac_family_member_accepted() {
        let claims = Claims { sub: "abc".into(), iat: Utc::now().timestamp(), exp: future_exp() };
        let token = encode(&Header::new(Algorithm::HS512), &claims, &EncodingKey::from_secret(b"secret-a")).unwrap();
        assert_eq!(manager().validate(&token).unwrap(), "abc");
    }

    #[test]
    fn missing_subject_is_malformed() {
        #[derive(Serialize)]
        struct NoSub {
            exp: i64,
        }
        let token = encode(&Header::new(Algorithm::HS256), &NoSub { exp: future_exp() }, &EncodingKey::from_secret(b"secret-a")).unwrap();
        assert_eq!(manager().validate(&token), Err(TokenError::Malformed));
    }
}
