//! 生产路由：批次、工序、投料

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use foodtrace_common::PagedResult;
use foodtrace_errors::AppResult;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery, AppState, MessageResponse, created, done, pagination};
use crate::application::commands::{
    Actor, BatchInput, CompleteBatchInput, MaterialUsageInput, StageInput,
};
use crate::domain::entities::{ProductionBatch, ProductionMaterial, ProductionStage};
use crate::domain::enums::BatchStatus;
use crate::domain::repositories::BatchFilter;
use crate::domain::value_objects::{BatchId, ProductId, ProductionMaterialId, StageId};

#[derive(Debug, Default, Deserialize)]
pub struct BatchQuery {
    pub status: Option<BatchStatus>,
    pub product_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// ============================================================================
// 批次
// ============================================================================

pub async fn create_batch(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<BatchInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_batch(&actor, input).await?;
    Ok(created(id, "Batch created successfully"))
}

pub async fn get_batch(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ProductionBatch>> {
    Ok(Json(state.handler.get_batch(&BatchId::from(id)).await?))
}

pub async fn list_batches(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BatchQuery>,
) -> AppResult<Json<PagedResult<ProductionBatch>>> {
    let filter = BatchFilter {
        status: query.status,
        product_id: query.product_id.map(ProductId::from),
    };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_batches(&filter, &page).await?))
}

pub async fn update_batch(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<BatchInput>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.update_batch(&actor, &BatchId::from(id), input).await?;
    Ok(done(id, "Batch updated successfully"))
}

pub async fn start_batch(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.start_batch(&actor, &BatchId::from(id)).await?;
    Ok(done(id, "Batch started"))
}

pub async fn complete_batch(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CompleteBatchInput>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.complete_batch(&actor, &BatchId::from(id), input).await?;
    Ok(done(id, "Batch completed"))
}

pub async fn cancel_batch(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.cancel_batch(&actor, &BatchId::from(id)).await?;
    Ok(done(id, "Batch cancelled"))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_batch(&actor, &BatchId::from(id)).await?;
    Ok(done(id, "Batch deleted successfully"))
}

// ============================================================================
// 工序
// ============================================================================

pub async fn create_stage(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(batch_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<StageInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state
        .handler
        .create_stage(&actor, &BatchId::from(batch_id), input)
        .await?;
    Ok(created(id, "Stage created successfully"))
}

pub async fn list_stages(
    State(state): State<AppState>,
    ApiPath(batch_id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<ProductionStage>>> {
    Ok(Json(state.handler.list_stages(&BatchId::from(batch_id)).await?))
}

pub async fn get_stage(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ProductionStage>> {
    Ok(Json(state.handler.get_stage(&StageId::from(id)).await?))
}

pub async fn update_stage(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<StageInput>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.update_stage(&actor, &StageId::from(id), input).await?;
    Ok(done(id, "Stage updated successfully"))
}

pub async fn start_stage(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.start_stage(&actor, &StageId::from(id)).await?;
    Ok(done(id, "Stage started"))
}

pub async fn complete_stage(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.complete_stage(&actor, &StageId::from(id)).await?;
    Ok(done(id, "Stage completed"))
}

pub async fn delete_stage(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_stage(&StageId::from(id)).await?;
    Ok(done(id, "Stage deleted successfully"))
}

// ============================================================================
// 投料
// ============================================================================

pub async fn add_material(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(batch_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<MaterialUsageInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state
        .handler
        .add_material(&actor, &BatchId::from(batch_id), input)
        .await?;
    Ok(created(id, "Material recorded successfully"))
}

pub async fn list_materials(
    State(state): State<AppState>,
    ApiPath(batch_id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<ProductionMaterial>>> {
    Ok(Json(state.handler.list_materials(&BatchId::from(batch_id)).await?))
}

pub async fn get_material(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ProductionMaterial>> {
    Ok(Json(
        state
            .handler
            .get_material(&ProductionMaterialId::from(id))
            .await?,
    ))
}

pub async fn update_material(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<MaterialUsageInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_material(&actor, &ProductionMaterialId::from(id), input)
        .await?;
    Ok(done(id, "Material updated successfully"))
}

pub async fn delete_material(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .delete_material(&actor, &ProductionMaterialId::from(id))
        .await?;
    Ok(done(id, "Material deleted successfully"))
}
