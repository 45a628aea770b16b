use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct JwtQuery {
    pub email: String,
}

/// `accessToken` is empty when the email is not registered.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

impl TokenResponse {
    pub fn denied() -> Self {
        Self {
            access_token: String::new(),
        }
    }
}
