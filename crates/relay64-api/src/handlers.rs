use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::models::TunnelStatus;
use crate::update::UpdateError;
use crate::{ApiDoc, AppState};

/// Replace the destination address
///
/// The body is free text; the first IPv6 literal in it becomes the new
/// destination for every tunnel.
#[utoipa::path(
    post,
    path = "/update",
    request_body(content = String, content_type = "text/plain", description = "Text containing one IPv6 address"),
    params(
        ("Authorization" = String, Header, description = "Bearer <token>")
    ),
    responses(
        (status = 200, description = "Address updated", body = String, content_type = "text/plain"),
        (status = 400, description = "No IPv6 address in the body", body = String, content_type = "text/plain"),
        (status = 401, description = "Missing or wrong bearer token", body = String, content_type = "text/plain"),
        (status = 500, description = "Address could not be persisted", body = String, content_type = "text/plain")
    ),
    tag = "address"
)]
pub async fn update_address(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, UpdateError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let payload = String::from_utf8_lossy(&body);

    let address = state.update_handler.handle(authorization, &payload).await?;

    Ok(format!("IPv6 address updated to {}", address))
}

/// Check every tunnel's destination port
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "All destinations reachable", body = [TunnelStatus]),
        (status = 500, description = "At least one destination unreachable", body = [TunnelStatus])
    ),
    tag = "system"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Vec<TunnelStatus>>) {
    let report = state.health_checker.check().await;

    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(report.statuses.iter().map(TunnelStatus::from).collect()),
    )
}

/// OpenAPI document for this API
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
