//! 主数据路由

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use foodtrace_common::{PagedResult, UserId};
use foodtrace_errors::AppResult;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery, AppState, MessageResponse, created, done, pagination};
use crate::application::commands::{
    Actor, CustomerInput, ProductInput, RawMaterialInput, SupplierInput, UserInput,
};
use crate::domain::entities::{Customer, FinishedProduct, RawMaterial, Supplier, User};
use crate::domain::enums::UserRole;
use crate::domain::repositories::{RawMaterialFilter, TextFilter, UserFilter};
use crate::domain::value_objects::{CustomerId, ProductId, RawMaterialId, SupplierId};

#[derive(Debug, Default, Deserialize)]
pub struct TextQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMaterialQuery {
    pub q: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
    pub role: Option<UserRole>,
    #[serde(default)]
    pub active_only: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// ========== 供应商 ==========

pub async fn create_supplier(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<SupplierInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_supplier(&actor, input).await?;
    Ok(created(id, "Supplier created successfully"))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Supplier>> {
    Ok(Json(state.handler.get_supplier(&SupplierId::from(id)).await?))
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TextQuery>,
) -> AppResult<Json<PagedResult<Supplier>>> {
    let filter = TextFilter { q: query.q };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_suppliers(&filter, &page).await?))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<SupplierInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_supplier(&actor, &SupplierId::from(id), input)
        .await?;
    Ok(done(id, "Supplier updated successfully"))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_supplier(&SupplierId::from(id)).await?;
    Ok(done(id, "Supplier deleted successfully"))
}

// ========== 原材料 ==========

pub async fn create_raw_material(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<RawMaterialInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_raw_material(&actor, input).await?;
    Ok(created(id, "Raw material created successfully"))
}

pub async fn get_raw_material(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<RawMaterial>> {
    Ok(Json(
        state
            .handler
            .get_raw_material(&RawMaterialId::from(id))
            .await?,
    ))
}

pub async fn list_raw_materials(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RawMaterialQuery>,
) -> AppResult<Json<PagedResult<RawMaterial>>> {
    let filter = RawMaterialFilter {
        q: query.q,
        supplier_id: query.supplier_id.map(SupplierId::from),
    };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_raw_materials(&filter, &page).await?))
}

pub async fn update_raw_material(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<RawMaterialInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_raw_material(&actor, &RawMaterialId::from(id), input)
        .await?;
    Ok(done(id, "Raw material updated successfully"))
}

pub async fn delete_raw_material(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .delete_raw_material(&RawMaterialId::from(id))
        .await?;
    Ok(done(id, "Raw material deleted successfully"))
}

// ========== 成品 ==========

pub async fn create_product(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<ProductInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_product(&actor, input).await?;
    Ok(created(id, "Product created successfully"))
}

pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<FinishedProduct>> {
    Ok(Json(state.handler.get_product(&ProductId::from(id)).await?))
}

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TextQuery>,
) -> AppResult<Json<PagedResult<FinishedProduct>>> {
    let filter = TextFilter { q: query.q };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_products(&filter, &page).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ProductInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_product(&actor, &ProductId::from(id), input)
        .await?;
    Ok(done(id, "Product updated successfully"))
}

pub async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_product(&ProductId::from(id)).await?;
    Ok(done(id, "Product deleted successfully"))
}

// ========== 客户 ==========

pub async fn create_customer(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CustomerInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_customer(&actor, input).await?;
    Ok(created(id, "Customer created successfully"))
}

pub async fn get_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Customer>> {
    Ok(Json(state.handler.get_customer(&CustomerId::from(id)).await?))
}

pub async fn list_customers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TextQuery>,
) -> AppResult<Json<PagedResult<Customer>>> {
    let filter = TextFilter { q: query.q };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_customers(&filter, &page).await?))
}

pub async fn update_customer(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CustomerInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_customer(&actor, &CustomerId::from(id), input)
        .await?;
    Ok(done(id, "Customer updated successfully"))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_customer(&CustomerId::from(id)).await?;
    Ok(done(id, "Customer deleted successfully"))
}

// ========== 用户 ==========

pub async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<UserInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_user(&actor, input).await?;
    Ok(created(id.0, "User created successfully"))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<User>> {
    Ok(Json(state.handler.get_user(&UserId::from(id)).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> AppResult<Json<PagedResult<User>>> {
    let filter = UserFilter {
        q: query.q,
        role: query.role,
        active_only: query.active_only,
    };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_users(&filter, &page).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UserInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_user(&actor, &UserId::from(id), input)
        .await?;
    Ok(done(id, "User updated successfully"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_user(&UserId::from(id)).await?;
    Ok(done(id, "User deleted successfully"))
}
