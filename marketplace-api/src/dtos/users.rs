use serde::Deserialize;
use validator::Validate;

use crate::models::{new_id, Role, User, VerificationStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[serde(default)]
    pub role: Role,
}

impl CreateUserRequest {
    pub fn into_user(self) -> User {
        User {
            id: new_id(),
            email: self.email,
            name: self.name,
            role: self.role,
            verification_status: VerificationStatus::Unverified,
        }
    }
}
