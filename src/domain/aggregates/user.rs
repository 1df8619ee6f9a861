//! User profile, read from the external user directory

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::domain::value_objects::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] User, Admin }

impl FromStr for Role {
    type Err = UnknownRole;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role {0}")]
pub struct UnknownRole(pub String);

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { id: UserId::new(), name: name.into(), email: email.into(), phone: None, address: None, role: Role::User }
    }

    pub fn with_contact(mut self, phone: impl Into<String>, address: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self.address = Some(address.into());
        self
    }

    /// Checkout needs somewhere to call and somewhere to deliver.
    pub fn has_delivery_contact(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.phone) && filled(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_contact() {
        let user = UserProfile::new("Ada", "ada@example.com");
        assert!(!user.has_delivery_contact());
        let user = user.with_contact("555-1111", "   ");
        assert!(!user.has_delivery_contact());
        let user = user.with_contact("555-1111", "1 Main St");
        assert!(user.has_delivery_contact());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!("Admin".parse::<Role>(), Err(UnknownRole("Admin".into())));
    }
}
