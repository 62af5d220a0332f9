/// Token signing and verification (HMAC-SHA256)
///
/// Pure and stateless: signing is a function of the secret and the claims,
/// verification is deterministic and checks the embedded expiry itself. No
/// side effects, no I/O; revocation lives in
/// [`crate::security::token_revocation`].
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use crate::error::{AuthError, Result};
use crate::models::Claims;

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock leeway: an expired token must fail verification the
        // moment its `exp` passes.
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;
    use uuid::Uuid;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret")
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "session-1", TokenType::Access, 900);

        let token = codec().sign(&claims).unwrap();
        let verified = codec().verify(&token).unwrap();

        assert_eq!(verified.sub, user_id.to_string());
        assert_eq!(verified.sid, "session-1");
        assert_eq!(verified.token_type, TokenType::Access);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), "s", TokenType::Refresh, 900);
        let token = TokenCodec::new("secret-a").sign(&claims).unwrap();

        let result = TokenCodec::new("secret-b").verify(&token);
        assert!(matches!(result, Err(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let claims = Claims::new(Uuid::new_v4(), "s", TokenType::Access, -60);
        let token = codec().sign(&claims).unwrap();

        let result = codec().verify(&token);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(matches!(
            codec().verify("not-a-token"),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn test_extra_claims_survive_round_trip() {
        let mut extra = serde_json::Map::new();
        extra.insert("purpose".to_string(), "password-reset".into());
        let claims =
            Claims::new(Uuid::new_v4(), "s", TokenType::Access, 900).with_extra(extra);

        let token = codec().sign(&claims).unwrap();
        let verified = codec().verify(&token).unwrap();
        assert_eq!(verified.purpose(), Some("password-reset"));
    }
}
