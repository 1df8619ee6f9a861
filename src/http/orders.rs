//! Order handlers, user and admin

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderLine, OrderStatus, OrderWithDetails};
use crate::domain::ports::{OrderFilter, PageRequest, Pagination};
use crate::http::auth::{AdminUser, AuthUser};
use crate::http::error::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::http::AppState;
use crate::StorefrontError;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub success: bool,
    pub count: u64,
    pub data: Vec<Order>,
    pub pagination: Pagination,
}

/// Accepts RFC 3339 timestamps or plain dates (midnight UTC).
fn parse_date(field: &str, raw: Option<&str>) -> ApiResult<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else { return Ok(None) };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| StorefrontError::validation(format!("Invalid {field}")))
}

impl ListOrdersParams {
    fn filter(&self) -> ApiResult<OrderFilter> {
        Ok(OrderFilter {
            status: self.status.as_deref().filter(|s| !s.is_empty()).map(str::parse::<OrderStatus>).transpose()?,
            user: self.user_id.map(Into::into),
            start_date: parse_date("startDate", self.start_date.as_deref())?,
            end_date: parse_date("endDate", self.end_date.as_deref())?,
        })
    }
}

pub async fn create_order(State(s): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    let outcome = s.orders.create_order(user.id).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(outcome.order)))
}

pub async fn list_orders(State(s): State<AppState>, user: AuthUser) -> ApiResult<ApiResponse<Vec<Order>>> {
    Ok(ApiResponse::ok(s.orders.get_orders(user.id).await?))
}

/// Owners see their own orders; admins see any.
pub async fn order_details(
    State(s): State<AppState>,
    user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<OrderLine>>> {
    let order_id = order_id.into();
    if !user.is_admin() {
        if let Some(order) = s.orders.find_order(order_id).await? {
            if order.user() != user.id {
                return Err(StorefrontError::Forbidden("Not authorized to access this order".into()));
            }
        }
    }
    Ok(ApiResponse::ok(s.orders.get_order_details(order_id).await?))
}

pub async fn list_all_orders(
    State(s): State<AppState>,
    _admin: AdminUser,
    ApiQuery(params): ApiQuery<ListOrdersParams>,
) -> ApiResult<Json<OrderPage>> {
    let filter = params.filter()?;
    let (orders, pagination) = s.orders.list_all_orders(filter, PageRequest::new(params.page, params.limit)).await?;
    Ok(Json(OrderPage { success: true, count: pagination.total_items, data: orders, pagination }))
}

pub async fn get_order(
    State(s): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<OrderWithDetails>> {
    Ok(ApiResponse::ok(s.orders.get_order_by_id(id.into()).await?))
}

pub async fn update_status(
    State(s): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateStatusRequest>,
) -> ApiResult<ApiResponse<Order>> {
    tracing::debug!(admin = %admin.id, order = %id, status = %r.status, "Status update requested");
    Ok(ApiResponse::ok(s.orders.update_status(id.into(), &r.status).await?))
}

pub async fn delete_order(
    State(s): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    s.orders.delete_order(id.into()).await?;
    Ok(ApiResponse::ok(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        let params = ListOrdersParams {
            status: Some("shipped".into()),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-02-01T12:00:00Z".into()),
            ..ListOrdersParams::default()
        };
        let filter = params.filter().unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Shipped));
        assert_eq!(filter.start_date.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(filter.end_date.is_some());
    }

    #[test]
    fn test_filter_rejects_bad_values() {
        let bad_status = ListOrdersParams { status: Some("Shipped".into()), ..ListOrdersParams::default() };
        assert!(matches!(bad_status.filter(), Err(StorefrontError::Validation(_))));
        let bad_date = ListOrdersParams { start_date: Some("yesterday".into()), ..ListOrdersParams::default() };
        assert!(matches!(bad_date.filter(), Err(StorefrontError::Validation(ref m)) if m == "Invalid startDate"));
    }
}
