//! Cart handlers

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use crate::http::auth::AuthUser;
use crate::http::error::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::http::AppState;
use crate::services::CartItemView;

fn one() -> i64 { 1 }

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "Quantity cannot be less than 1"))]
    pub quantity: i64,
}

/// Zero or negative removes the entry.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    user: AuthUser,
    ApiJson(r): ApiJson<AddToCartRequest>,
) -> ApiResult<ApiResponse<CartItemView>> {
    r.validate()?;
    let item = s.carts.add_item(user.id, r.product_id.into(), r.quantity).await?;
    Ok(ApiResponse::ok(item))
}

pub async fn update_quantity(
    State(s): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateQuantityRequest>,
) -> ApiResult<ApiResponse<CartItemView>> {
    let item = s.carts.set_quantity(user.id, product_id.into(), r.quantity).await?;
    Ok(ApiResponse::ok(item))
}

pub async fn get_cart(State(s): State<AppState>, user: AuthUser) -> ApiResult<ApiResponse<Vec<CartItemView>>> {
    Ok(ApiResponse::ok(s.carts.get(user.id).await?))
}

pub async fn remove_from_cart(
    State(s): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<CartItemView>> {
    let item = s.carts.remove(user.id, product_id.into()).await?;
    Ok(ApiResponse::ok(item))
}
