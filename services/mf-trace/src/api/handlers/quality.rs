//! X 光检测路由

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use foodtrace_errors::AppResult;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, AppState, MessageResponse, created, done};
use crate::application::commands::{Actor, XRayCheckInput};
use crate::domain::entities::XRayCheck;
use crate::domain::value_objects::{BatchId, XRayCheckId};

pub async fn create_xray_check(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(batch_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<XRayCheckInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state
        .handler
        .create_xray_check(&actor, &BatchId::from(batch_id), input)
        .await?;
    Ok(created(id, "X-ray check recorded successfully"))
}

pub async fn list_xray_checks(
    State(state): State<AppState>,
    ApiPath(batch_id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<XRayCheck>>> {
    Ok(Json(state.handler.list_xray_checks(&BatchId::from(batch_id)).await?))
}

pub async fn get_xray_check(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<XRayCheck>> {
    Ok(Json(state.handler.get_xray_check(&XRayCheckId::from(id)).await?))
}

/// 返回重新推导后的检测结果
pub async fn update_xray_check(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<XRayCheckInput>,
) -> AppResult<Json<MessageResponse>> {
    let result = state
        .handler
        .update_xray_check(&actor, &XRayCheckId::from(id), input)
        .await?;
    Ok(done(id, format!("X-ray check updated, result {}", result)))
}

pub async fn delete_xray_check(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_xray_check(&XRayCheckId::from(id)).await?;
    Ok(done(id, "X-ray check deleted successfully"))
}
