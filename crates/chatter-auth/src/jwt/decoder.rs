//! JWT token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use chatter_core::config::auth::AuthConfig;
use chatter_core::error::AppError;

use super::claims::Claims;

/// Validates JWT access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates an access token string, checking signature and
    /// expiration.
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::JwtEncoder;
    use uuid::Uuid;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            password_min_length: 6,
        }
    }

    #[test]
    fn roundtrip_encode_decode() {
        let config = test_config();
        let encoder = JwtEncoder::new(&config);
        let decoder = JwtDecoder::new(&config);

        let user_id = Uuid::new_v4();
        let (token, _) = encoder.generate_token(user_id, "alice").unwrap();
        let claims = decoder.decode_token(&token).unwrap();

        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.username, "alice");
        assert!(!claims.is_expired());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let encoder = JwtEncoder::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            ..test_config()
        });
        let decoder = JwtDecoder::new(&test_config());

        let (token, _) = encoder.generate_token(Uuid::new_v4(), "mallory").unwrap();
        assert!(decoder.decode_token(&token).is_err());
    }

    #[test]
    fn rejects_garbage_token() {
        let decoder = JwtDecoder::new(&test_config());
        assert!(decoder.decode_token("not.a.token").is_err());
    }
}
