use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CredentialValidator;
use crate::config::AuthConfig;
use crate::models::AuthContext;

/// Claims issued by the auth service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub exp: i64,
}

/// Validates HS256 tokens signed with the secret shared with the auth service.
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        JwtValidator {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait::async_trait]
impl CredentialValidator for JwtValidator {
    fn get_name(&self) -> &str {
        "jwt"
    }

    async fn validate(&self, credential: &str) -> Result<AuthContext, String> {
        let decoded = decode::<Claims>(credential, &self.key, &self.validation)
            .map_err(|e| format!("Failed to decode JWT: {}", e))?;
        debug!("Token accepted for user '{}'", decoded.claims.user_id);
        Ok(AuthContext::new(decoded.claims.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, exp: i64) -> String {
        let claims = Claims {
            user_id: "64f1c0ffee".to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn validator() -> JwtValidator {
        JwtValidator::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
        })
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let credential = token("test-secret", Utc::now().timestamp() + 3600);
        let context = validator().validate(&credential).await.unwrap();
        assert_eq!(context, AuthContext::new("64f1c0ffee"));
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let credential = token("other-secret", Utc::now().timestamp() + 3600);
        assert!(validator().validate(&credential).await.is_err());
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let credential = token("test-secret", Utc::now().timestamp() - 3600);
        assert!(validator().validate(&credential).await.is_err());
    }

    #[tokio::test]
    async fn rejects_garbage() {
        assert!(validator().validate("not-a-jwt").await.is_err());
    }
}
