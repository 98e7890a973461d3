//! 开票路由

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use foodtrace_common::PagedResult;
use foodtrace_errors::AppResult;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery, AppState, MessageResponse, created, done, pagination};
use crate::application::commands::{Actor, InvoiceInput, InvoiceItemInput};
use crate::application::queries::InvoiceView;
use crate::domain::enums::InvoiceStatus;
use crate::domain::repositories::InvoiceFilter;
use crate::domain::value_objects::{CustomerId, InvoiceId, InvoiceItemId};

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<InvoiceInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state.handler.create_invoice(&actor, input).await?;
    Ok(created(id, "Invoice created successfully"))
}

/// 发票连同发票行与汇总
pub async fn get_invoice(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<InvoiceView>> {
    Ok(Json(state.handler.get_invoice(&InvoiceId::from(id)).await?))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<InvoiceQuery>,
) -> AppResult<Json<PagedResult<InvoiceView>>> {
    let filter = InvoiceFilter {
        status: query.status,
        customer_id: query.customer_id.map(CustomerId::from),
    };
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_invoices(&filter, &page).await?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<InvoiceInput>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.update_invoice(&actor, &InvoiceId::from(id), input).await?;
    Ok(done(id, "Invoice updated successfully"))
}

pub async fn issue_invoice(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.issue_invoice(&actor, &InvoiceId::from(id)).await?;
    Ok(done(id, "Invoice issued"))
}

pub async fn pay_invoice(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.pay_invoice(&actor, &InvoiceId::from(id)).await?;
    Ok(done(id, "Invoice paid"))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.cancel_invoice(&actor, &InvoiceId::from(id)).await?;
    Ok(done(id, "Invoice cancelled"))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.handler.delete_invoice(&InvoiceId::from(id)).await?;
    Ok(done(id, "Invoice deleted successfully"))
}

// ========== 发票行 ==========

pub async fn add_invoice_item(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(invoice_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<InvoiceItemInput>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let id = state
        .handler
        .add_invoice_item(&actor, &InvoiceId::from(invoice_id), input)
        .await?;
    Ok(created(id, "Invoice item added successfully"))
}

pub async fn update_invoice_item(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((invoice_id, item_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<InvoiceItemInput>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .update_invoice_item(
            &actor,
            &InvoiceId::from(invoice_id),
            &InvoiceItemId::from(item_id),
            input,
        )
        .await?;
    Ok(done(item_id, "Invoice item updated successfully"))
}

pub async fn remove_invoice_item(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((invoice_id, item_id)): ApiPath<(Uuid, Uuid)>,
) -> AppResult<Json<MessageResponse>> {
    state
        .handler
        .remove_invoice_item(&actor, &InvoiceId::from(invoice_id), &InvoiceItemId::from(item_id))
        .await?;
    Ok(done(item_id, "Invoice item removed successfully"))
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{router, send};
    use super::*;
    use crate::application::test_support::TestUow;
    use crate::domain::entities::{Invoice, InvoiceItem};
    use axum::http::Method;
    use chrono::NaiveDate;
    use foodtrace_common::AuditInfo;
    use foodtrace_domain_core::{Currency, Quantity};
    use rust_decimal_macros::dec;

    fn invoice(status: InvoiceStatus) -> Invoice {
        let id = InvoiceId::new();
        let mut item = InvoiceItem {
            id: InvoiceItemId::new(),
            invoice_id: id,
            product_id: crate::domain::value_objects::ProductId::new(),
            description: Some("Sourdough".to_string()),
            quantity: Quantity::new(dec!(4)).unwrap(),
            unit_price: dec!(2.50),
            line_total: Default::default(),
            audit_info: AuditInfo::default(),
        };
        item.recalculate(&Currency::usd()).unwrap();
        Invoice {
            id,
            invoice_number: "INV-9".to_string(),
            customer_id: CustomerId::new(),
            shipment_id: None,
            issue_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 5, 31).unwrap(),
            status,
            currency: Currency::usd(),
            tax_rate: dec!(10),
            notes: None,
            items: vec![item],
            audit_info: AuditInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_get_invoice_includes_totals() {
        let mut uow = TestUow::default();
        let existing = invoice(InvoiceStatus::Draft);
        let id: Uuid = existing.id.into();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));

        let (status, body) = send(router(uow), Method::GET, &format!("/invoices/{}", id), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invoice_number"], "INV-9");
        assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
        assert!(body.get("subtotal").is_some());
    }

    #[tokio::test]
    async fn test_pay_draft_invoice_is_412() {
        let mut uow = TestUow::default();
        let existing = invoice(InvoiceStatus::Draft);
        let id: Uuid = existing.id.into();
        uow.invoices
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        uow.invoices.expect_update().never();

        let (status, _) = send(router(uow), Method::POST, &format!("/invoices/{}/pay", id), None).await;

        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_item_path_requires_two_uuids() {
        let (status, _) = send(
            router(TestUow::default()),
            Method::DELETE,
            "/invoices/0191d8a4-7c1e-7000-8000-000000000003/items/first",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_item_with_overflowing_amount_is_400() {
        let mut uow = TestUow::default();
        uow.invoices.expect_save_item().never();

        let (status, body) = send(
            router(uow),
            Method::POST,
            "/invoices/0191d8a4-7c1e-7000-8000-000000000003/items",
            Some(serde_json::json!({
                "product_id": "0191d8a4-7c1e-7000-8000-000000000004",
                "quantity": "100000000000000000000",
                "unit_price": "10000000000"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.to_string().contains("maximum"));
    }
}
