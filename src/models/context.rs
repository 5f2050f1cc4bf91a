use serde::{Deserialize, Serialize};

/// Identity attached to a request once the Auth Gate accepted its credential.
///
/// Lives in the request extensions, so it is dropped with the request. Public
/// routes never see one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        AuthContext {
            user_id: user_id.into(),
        }
    }
}
