//! OpenSASE Storefront
//!
//! Self-hosted cart and order service for the OpenSASE e-commerce platform.
//!
//! ## Features
//! - Per-user shopping cart with atomic quantity updates
//! - Checkout that snapshots prices into immutable orders
//! - Self-healing carts: products deleted from the catalog are pruned at checkout
//! - Order lifecycle and admin management
//! - Postgres storage, with an in-memory backend for development and tests

use thiserror::Error;

pub mod config;
pub mod domain;
pub mod http;
pub mod infrastructure;
pub mod services;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorefrontError {
    pub fn not_found(message: impl Into<String>) -> Self { Self::NotFound(message.into()) }
    pub fn validation(message: impl Into<String>) -> Self { Self::Validation(message.into()) }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors.field_errors().into_iter()
            .flat_map(|(field, errs)| errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("Invalid {field}"),
            }))
            .collect::<Vec<_>>()
            .join(", ");
        Self::Validation(message)
    }
}

impl From<domain::aggregates::OrderError> for StorefrontError {
    fn from(err: domain::aggregates::OrderError) -> Self { Self::Validation(err.to_string()) }
}

impl From<domain::aggregates::CartError> for StorefrontError {
    fn from(err: domain::aggregates::CartError) -> Self {
        match err {
            domain::aggregates::CartError::ItemNotFound => Self::NotFound(err.to_string()),
            domain::aggregates::CartError::InvalidQuantity(_) => Self::Validation(err.to_string()),
        }
    }
}

impl From<domain::value_objects::QuantityError> for StorefrontError {
    fn from(err: domain::value_objects::QuantityError) -> Self { Self::Validation(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
