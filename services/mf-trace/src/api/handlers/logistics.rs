//! 物流路由：收货单、发货单、签收单

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use foodtrace_common::PagedResult;
use foodtrace_errors::AppResult;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery, AppState, MessageResponse, created, done, pagination};
use crate::application::commands::{Actor, DeliveryFormInput, ReceivingFormInput, ShipmentInput};
use crate::domain::entities::{DeliveryForm, ReceivingForm, Shipment};
use crate::domain::enums::ShipmentStatus;
use crate::domain::repositories::{ReceivingFormFilter, ShipmentFilter};
use crate::domain::value_objects::{
    BatchId, CustomerId, DeliveryFormId, RawMaterialId, ReceivingFormId, ShipmentId, SupplierId,
};

#[derive(Debug, Default, Deserialize)]
pub struct ReceivingQuery {
    pub supplier_id: Option<Uuid>,
    pub raw_material_id: Option<Uuid>,
    pub lot_number: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShipmentQuery {
    pub status: Option<ShipmentStatus>,
    pub customer_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// ============================================================================
// 收货单
// ============================================================================

pub async fn create_receiving_form(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<ReceivingFormInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_receiving_form(&actor, input).await?;
    Ok(created(id, "Receiving form created successfully"))
}

pub async fn get_receiving_form(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ReceivingForm>> {
    Ok(Json(
        state
            .handler
            .get_receiving_form(&ReceivingFormId::from(id))
            .await?,
    ))
}

pub async fn list_receiving_forms(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReceivingQuery>,
) -> AppResult<Json<PagedResult<ReceivingForm>>> {
    let filter = ReceivingFormFilter {
        supplier_id: query.supplier_id.map(SupplierId::from),
        raw_material_id: query.raw_material_id.map(RawMaterialId::from),
        lot_number: query.lot_number,
    };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_receiving_forms(&filter, &page).await?))
}

pub async fn update_receiving_form(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ReceivingFormInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_receiving_form(&actor, &ReceivingFormId::from(id), input)
        .await?;
    Ok(done(id, "Receiving form updated successfully"))
}

pub async fn delete_receiving_form(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .delete_receiving_form(&actor, &ReceivingFormId::from(id))
        .await?;
    Ok(done(id, "Receiving form deleted successfully"))
}

// ============================================================================
// 发货单
// ============================================================================

pub async fn create_shipment(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<ShipmentInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_shipment(&actor, input).await?;
    Ok(created(id, "Shipment created successfully"))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Shipment>> {
    Ok(Json(state.handler.get_shipment(&ShipmentId::from(id)).await?))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ShipmentQuery>,
) -> AppResult<Json<PagedResult<Shipment>>> {
    let filter = ShipmentFilter {
        status: query.status,
        customer_id: query.customer_id.map(CustomerId::from),
        batch_id: query.batch_id.map(BatchId::from),
    };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_shipments(&filter, &page).await?))
}

pub async fn update_shipment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ShipmentInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_shipment(&actor, &ShipmentId::from(id), input)
        .await?;
    Ok(done(id, "Shipment updated successfully"))
}

pub async fn dispatch_shipment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.dispatch_shipment(&actor, &ShipmentId::from(id)).await?;
    Ok(done(id, "Shipment dispatched"))
}

pub async fn cancel_shipment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.cancel_shipment(&actor, &ShipmentId::from(id)).await?;
    Ok(done(id, "Shipment cancelled"))
}

pub async fn delete_shipment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_shipment(&actor, &ShipmentId::from(id)).await?;
    Ok(done(id, "Shipment deleted successfully"))
}

// ============================================================================
// 签收单
// ============================================================================

pub async fn create_delivery_form(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(shipment_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<DeliveryFormInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state
        .handler
        .create_delivery_form(&actor, &ShipmentId::from(shipment_id), input)
        .await?;
    Ok(created(id, "Delivery recorded successfully"))
}

pub async fn get_delivery_for_shipment(
    State(state): State<AppState>,
    ApiPath(shipment_id): ApiPath<Uuid>,
) -> AppResult<Json<DeliveryForm>> {
    Ok(Json(
        state
            .handler
            .get_delivery_for_shipment(&ShipmentId::from(shipment_id))
            .await?,
    ))
}

pub async fn get_delivery_form(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<DeliveryForm>> {
    Ok(Json(
        state
            .handler
            .get_delivery_form(&DeliveryFormId::from(id))
            .await?,
    ))
}

pub async fn update_delivery_form(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<DeliveryFormInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_delivery_form(&actor, &DeliveryFormId::from(id), input)
        .await?;
    Ok(done(id, "Delivery form updated successfully"))
}

pub async fn delete_delivery_form(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .delete_delivery_form(&actor, &DeliveryFormId::from(id))
        .await?;
    Ok(done(id, "Delivery form deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{router, send};
    use super::*;
    use crate::application::test_support::TestUow;
    use axum::http::Method;
    use chrono::NaiveDate;
    use foodtrace_common::AuditInfo;
    use foodtrace_domain_core::Quantity;
    use rust_decimal_macros::dec;

    fn shipment(status: ShipmentStatus) -> Shipment {
        Shipment {
            id: ShipmentId::new(),
            shipment_number: "SH-7".to_string(),
            customer_id: CustomerId::new(),
            product_id: crate::domain::value_objects::ProductId::new(),
            batch_id: None,
            quantity: Quantity::new(dec!(12)).unwrap(),
            shipment_date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            status,
            carrier: None,
            tracking_number: None,
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_delete_delivered_shipment_is_412() {
        let mut uow = TestUow::default();
        let existing = shipment(ShipmentStatus::Delivered);
        let id: Uuid = existing.id.into();
        uow.shipments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        uow.shipments.expect_delete().never();
        uow.stock.expect_apply_delta().never();

        let (status, body) = send(router(uow), Method::DELETE, &format!("/shipments/{}", id), None).await;

        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(body["status"], 412);
    }

    #[tokio::test]
    async fn test_delete_pending_shipment_restores_stock() {
        let mut uow = TestUow::default();
        let existing = shipment(ShipmentStatus::Pending);
        let id: Uuid = existing.id.into();
        uow.shipments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        uow.allow_stock_changes(dec!(30));
        uow.shipments.expect_delete().times(1).returning(|_| Ok(()));

        let (status, body) = send(router(uow), Method::DELETE, &format!("/shipments/{}", id), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Shipment deleted successfully");
    }

    #[tokio::test]
    async fn test_list_receiving_forms_by_lot() {
        let mut uow = TestUow::default();
        uow.receiving_forms
            .expect_list()
            .withf(|filter, _| filter.lot_number.as_deref() == Some("LOT-42") && filter.supplier_id.is_none())
            .returning(|_, page| Ok(PagedResult::new(vec![], 0, page)));

        let (status, _) = send(router(uow), Method::GET, "/receiving-forms?lot_number=LOT-42", None).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_delivery_condition_is_400() {
        let (status, _) = send(
            router(TestUow::default()),
            Method::POST,
            "/shipments/0191d8a4-7c1e-7000-8000-000000000002/delivery",
            Some(serde_json::json!({ "recipient_name": "Dock 4", "condition": "soggy" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
