//! HTTP API
//!
//! REST 路由，错误统一返回 Problem Details。

mod extractors;
mod handlers;

pub use extractors::{ApiJson, ApiPath, ApiQuery, USER_ID_HEADER};

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use foodtrace_common::Pagination;
use foodtrace_config::AppConfig;
use foodtrace_domain_core::Quantity;
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::application::ServiceHandler;
use crate::infrastructure::persistence::PgUnitOfWorkFactory;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ServiceHandler>,
}

impl AppState {
    pub fn new(handler: Arc<ServiceHandler>) -> Self {
        Self { handler }
    }

    /// 配置中的默认再订货点无效时拒绝启动
    pub fn from_pool(pool: PgPool, config: &AppConfig) -> AppResult<Self> {
        let reorder_level = default_reorder_level(config.inventory.default_reorder_level)?;
        let factory = Arc::new(PgUnitOfWorkFactory::new(pool));
        Ok(Self::new(Arc::new(ServiceHandler::new(factory, reorder_level))))
    }
}

fn default_reorder_level(value: Decimal) -> AppResult<Quantity> {
    Quantity::new(value).map_err(|e| {
        AppError::internal(format!("Invalid inventory.default_reorder_level: {}", e))
    })
}

/// 写操作的响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub message: String,
}

pub(crate) fn created(id: impl Into<Uuid>, message: impl Into<String>) -> (StatusCode, Json<MessageResponse>) {
    (StatusCode::CREATED, done(id, message))
}

pub(crate) fn done(id: impl Into<Uuid>, message: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        id: id.into(),
        message: message.into(),
    })
}

/// 分页参数
pub(crate) fn pagination(page: Option<u32>, page_size: Option<u32>) -> Pagination {
    let default = Pagination::default();
    Pagination::new(
        page.unwrap_or(default.page),
        page_size.unwrap_or(default.page_size),
    )
}

/// 构建业务路由
pub fn build_router(state: AppState) -> Router {
    use handlers::{billing, inventory, logistics, master_data, production, quality, traceability};

    Router::new()
        // 主数据
        .route(
            "/suppliers",
            get(master_data::list_suppliers).post(master_data::create_supplier),
        )
        .route(
            "/suppliers/{id}",
            get(master_data::get_supplier)
                .put(master_data::update_supplier)
                .delete(master_data::delete_supplier),
        )
        .route(
            "/raw-materials",
            get(master_data::list_raw_materials).post(master_data::create_raw_material),
        )
        .route(
            "/raw-materials/{id}",
            get(master_data::get_raw_material)
                .put(master_data::update_raw_material)
                .delete(master_data::delete_raw_material),
        )
        .route(
            "/products",
            get(master_data::list_products).post(master_data::create_product),
        )
        .route(
            "/products/{id}",
            get(master_data::get_product)
                .put(master_data::update_product)
                .delete(master_data::delete_product),
        )
        .route(
            "/customers",
            get(master_data::list_customers).post(master_data::create_customer),
        )
        .route(
            "/customers/{id}",
            get(master_data::get_customer)
                .put(master_data::update_customer)
                .delete(master_data::delete_customer),
        )
        .route(
            "/users",
            get(master_data::list_users).post(master_data::create_user),
        )
        .route(
            "/users/{id}",
            get(master_data::get_user)
                .put(master_data::update_user)
                .delete(master_data::delete_user),
        )
        // 库存
        .route("/inventory/low-stock", get(inventory::low_stock))
        .route("/inventory/{kind}/{id}/movements", get(inventory::list_movements))
        .route("/inventory/{kind}/{id}/adjustments", post(inventory::adjust_stock))
        // 生产
        .route(
            "/batches",
            get(production::list_batches).post(production::create_batch),
        )
        .route(
            "/batches/{id}",
            get(production::get_batch)
                .put(production::update_batch)
                .delete(production::delete_batch),
        )
        .route("/batches/{id}/start", post(production::start_batch))
        .route("/batches/{id}/complete", post(production::complete_batch))
        .route("/batches/{id}/cancel", post(production::cancel_batch))
        .route(
            "/batches/{id}/stages",
            get(production::list_stages).post(production::create_stage),
        )
        .route(
            "/batches/{id}/materials",
            get(production::list_materials).post(production::add_material),
        )
        .route(
            "/stages/{id}",
            get(production::get_stage)
                .put(production::update_stage)
                .delete(production::delete_stage),
        )
        .route("/stages/{id}/start", post(production::start_stage))
        .route("/stages/{id}/complete", post(production::complete_stage))
        .route(
            "/materials/{id}",
            get(production::get_material)
                .put(production::update_material)
                .delete(production::delete_material),
        )
        // 质检
        .route(
            "/batches/{id}/xray-checks",
            get(quality::list_xray_checks).post(quality::create_xray_check),
        )
        .route(
            "/xray-checks/{id}",
            get(quality::get_xray_check)
                .put(quality::update_xray_check)
                .delete(quality::delete_xray_check),
        )
        // 收发货
        .route(
            "/receiving-forms",
            get(logistics::list_receiving_forms).post(logistics::create_receiving_form),
        )
        .route(
            "/receiving-forms/{id}",
            get(logistics::get_receiving_form)
                .put(logistics::update_receiving_form)
                .delete(logistics::delete_receiving_form),
        )
        .route(
            "/shipments",
            get(logistics::list_shipments).post(logistics::create_shipment),
        )
        .route(
            "/shipments/{id}",
            get(logistics::get_shipment)
                .put(logistics::update_shipment)
                .delete(logistics::delete_shipment),
        )
        .route("/shipments/{id}/dispatch", post(logistics::dispatch_shipment))
        .route("/shipments/{id}/cancel", post(logistics::cancel_shipment))
        .route(
            "/shipments/{id}/delivery",
            get(logistics::get_delivery_for_shipment).post(logistics::create_delivery_form),
        )
        .route(
            "/delivery-forms/{id}",
            get(logistics::get_delivery_form)
                .put(logistics::update_delivery_form)
                .delete(logistics::delete_delivery_form),
        )
        // 开票
        .route(
            "/invoices",
            get(billing::list_invoices).post(billing::create_invoice),
        )
        .route(
            "/invoices/{id}",
            get(billing::get_invoice)
                .put(billing::update_invoice)
                .delete(billing::delete_invoice),
        )
        .route("/invoices/{id}/issue", post(billing::issue_invoice))
        .route("/invoices/{id}/pay", post(billing::pay_invoice))
        .route("/invoices/{id}/cancel", post(billing::cancel_invoice))
        .route("/invoices/{id}/items", post(billing::add_invoice_item))
        .route(
            "/invoices/{id}/items/{item_id}",
            put(billing::update_invoice_item).delete(billing::remove_invoice_item),
        )
        // 追溯
        .route("/trace/batches/{id}", get(traceability::trace_batch))
        .route("/trace/lots", get(traceability::trace_lot))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_reorder_level_must_be_a_quantity() {
        assert_eq!(default_reorder_level(dec!(10)).unwrap().value(), dec!(10));
        assert!(matches!(
            default_reorder_level(dec!(-1)),
            Err(AppError::Internal(_))
        ));
        assert!(matches!(
            default_reorder_level(dec!(2.5005)),
            Err(AppError::Internal(_))
        ));
    }
}
