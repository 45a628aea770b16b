use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(alias = "Seller")]
    Seller,
    #[serde(alias = "Buyer")]
    Buyer,
    #[default]
    Unset,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Buyer => "buyer",
            Role::Unset => "unset",
        }
    }

    /// Stored spellings that mean this role. Older documents use `Seller` and `Buyer`.
    pub fn stored_spellings(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => &["admin"],
            Role::Seller => &["seller", "Seller"],
            Role::Buyer => &["buyer", "Buyer"],
            Role::Unset => &["unset"],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Verified,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    /// Empty only for records created by a role upsert on an unknown id.
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub verification_status: VerificationStatus,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_role_spellings_are_accepted() {
        let user: User = serde_json::from_str(
            r#"{"_id":"u1","email":"s@x.com","role":"Seller"}"#,
        )
        .unwrap();
        assert_eq!(user.role, Role::Seller);
        assert_eq!(user.verification_status, VerificationStatus::Unverified);
    }

    #[test]
    fn missing_role_reads_as_unset() {
        let user: User = serde_json::from_str(r#"{"_id":"u2","email":"b@x.com"}"#).unwrap();
        assert_eq!(user.role, Role::Unset);
        assert!(!user.has_role(Role::Admin));
    }

    #[test]
    fn role_is_written_lowercase() {
        let json = serde_json::to_value(Role::Buyer).unwrap();
        assert_eq!(json, "buyer");
    }
}
