pub mod gate;
pub mod jwt_validator;

use crate::models::AuthContext;

pub use gate::{auth_gate, authenticate, bearer_credential};
pub use jwt_validator::JwtValidator;

/// Validates the credential presented to the Auth Gate.
#[async_trait::async_trait]
pub trait CredentialValidator: Send + Sync {
    fn get_name(&self) -> &str;
    async fn validate(&self, credential: &str) -> Result<AuthContext, String>;
}
