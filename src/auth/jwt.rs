use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthPrincipal, TokenValidator};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
}

pub struct JwtValidator {
    decoding_key: DecodingKey,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl TokenValidator for JwtValidator {
    fn validate(&self, token: &str) -> Result<AuthPrincipal, AuthError> {
        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &Validation::default()).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::InvalidToken(e.to_string()),
                }
            })?;

        Ok(AuthPrincipal {
            user_id: token_data.claims.sub,
            expires_at: token_data.claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(secret: &str, sub: &str, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_principal() {
        let validator = JwtValidator::new("test_secret");
        let token = mint("test_secret", "alice", Duration::hours(1));

        let principal = validator.validate(&token).unwrap();
        assert_eq!(principal.user_id, "alice");
        assert!(principal.expires_at > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let validator = JwtValidator::new("test_secret");
        let token = mint("test_secret", "alice", Duration::hours(-2));

        assert!(matches!(
            validator.validate(&token),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let validator = JwtValidator::new("test_secret");
        let token = mint("other_secret", "alice", Duration::hours(1));

        assert!(matches!(
            validator.validate(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
