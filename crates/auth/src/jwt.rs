//! Token decoding and signature verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{JwtClaims, TokenValidationError, validate_claims};

/// Decode a bearer token into verified, time-checked claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 validator over a shared secret.
///
/// The registered `exp`/`iat` claims are not used; the time window lives in the
/// `issued_at`/`expires_at` claims and is checked with [`validate_claims`].
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use marketplace_core::UserId;

    fn token(secret: &str, claims: &JwtClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            roles: vec![Role::DISTRIBUTOR],
            issued_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn round_trips_signed_claims() {
        let now = Utc::now();
        let c = claims(now);
        let validator = Hs256JwtValidator::new("secret");
        assert_eq!(validator.validate(&token("secret", &c), now).unwrap(), c);
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = Utc::now();
        let validator = Hs256JwtValidator::new("secret");
        let err = validator.validate(&token("other", &claims(now)), now).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn rejects_expired_claims_even_when_signed() {
        let now = Utc::now();
        let validator = Hs256JwtValidator::new("secret");
        let t = token("secret", &claims(now));
        let err = validator.validate(&t, now + Duration::hours(1)).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }

    #[test]
    fn rejects_garbage() {
        let validator = Hs256JwtValidator::new("secret");
        assert!(validator.validate("not-a-jwt", Utc::now()).is_err());
    }
}
