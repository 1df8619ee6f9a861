//! Caller identity.
//!
//! Authentication happens upstream: the gateway verifies the token and
//! forwards the user id and role as headers. Handlers only read them.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;
use crate::domain::aggregates::Role;
use crate::domain::value_objects::UserId;
use crate::StorefrontError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// An authenticated caller holding the admin role
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminUser(pub AuthUser);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthorized = || StorefrontError::Unauthorized("Not authorized to access this route".into());
        let id = header(parts, USER_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(unauthorized)?;
        let role = match header(parts, USER_ROLE_HEADER) {
            Some(raw) => raw.parse().map_err(|_| unauthorized())?,
            None => Role::User,
        };
        Ok(Self { id: id.into(), role })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user = %user.id, "Non-admin caller rejected from admin route");
            return Err(StorefrontError::Forbidden("User role is not authorized to access this route".into()));
        }
        Ok(Self(user))
    }
}
