//! 端到端流程测试：收货 → 投料 → 完工 → 发货 → 召回追溯
//!
//! 需要 PostgreSQL：`DATABASE_URL=postgres://... cargo test -- --ignored`

use std::sync::Arc;

use chrono::NaiveDate;
use foodtrace_domain_core::Quantity;
use foodtrace_errors::AppError;
use mf_trace::application::ServiceHandler;
use mf_trace::application::commands::*;
use mf_trace::domain::enums::{BatchStatus, DeliveryCondition, StockItemKind};
use mf_trace::infrastructure::persistence::{PgUnitOfWorkFactory, run_migrations};
use rust_decimal_macros::dec;
use sqlx::PgPool;

async fn handler(pool: PgPool) -> ServiceHandler {
    run_migrations(&pool).await.unwrap();
    ServiceHandler::new(
        Arc::new(PgUnitOfWorkFactory::new(pool)),
        Quantity::new(dec!(10)).unwrap(),
    )
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_lot_recall_reaches_customer(pool: PgPool) {
    let handler = handler(pool).await;
    let actor = Actor::anonymous();

    let supplier_id = handler
        .create_supplier(
            &actor,
            SupplierInput {
                code: "SUP-FLOUR".to_string(),
                name: "Mill & Co".to_string(),
                contact_person: None,
                phone: None,
                email: Some("orders@mill.example".to_string()),
                address: None,
                is_approved: true,
            },
        )
        .await
        .unwrap();

    let flour_id = handler
        .create_raw_material(
            &actor,
            RawMaterialInput {
                code: "RM-FLOUR".to_string(),
                name: "Wheat flour".to_string(),
                description: None,
                supplier_id: Some(supplier_id),
                unit: "kg".to_string(),
                reorder_level: dec!(50),
                unit_cost: dec!(0.80),
                allergens: Some("gluten".to_string()),
                storage_conditions: None,
                opening_stock: None,
            },
        )
        .await
        .unwrap();

    handler
        .create_receiving_form(
            &actor,
            ReceivingFormInput {
                form_number: "RCV-1".to_string(),
                supplier_id,
                raw_material_id: flour_id,
                quantity: dec!(100),
                lot_number: "LOT-A1".to_string(),
                received_at: None,
                received_by: None,
                expiry_date: None,
                temperature_c: None,
                packaging_intact: true,
                accepted: true,
                rejection_reason: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    let product_id = handler
        .create_product(
            &actor,
            ProductInput {
                sku: "BREAD-1".to_string(),
                name: "Sourdough loaf".to_string(),
                description: None,
                unit: "pcs".to_string(),
                unit_price: dec!(3.20),
                shelf_life_days: Some(5),
                opening_stock: None,
            },
        )
        .await
        .unwrap();

    let batch_id = handler
        .create_batch(
            &actor,
            BatchInput {
                batch_number: "B-0601".to_string(),
                product_id,
                supervisor_id: None,
                planned_quantity: dec!(120),
                production_date: date(1),
                expiry_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    handler
        .add_material(
            &actor,
            &batch_id,
            MaterialUsageInput {
                raw_material_id: flour_id,
                quantity_used: dec!(40),
                lot_number: Some("LOT-A1".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        handler.get_raw_material(&flour_id).await.unwrap().quantity_in_stock.value(),
        dec!(60)
    );

    // 超出库存的投料被拒绝，库存不变
    let err = handler
        .add_material(
            &actor,
            &batch_id,
            MaterialUsageInput {
                raw_material_id: flour_id,
                quantity_used: dec!(61),
                lot_number: Some("LOT-A1".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    handler.start_batch(&actor, &batch_id).await.unwrap();
    handler
        .complete_batch(
            &actor,
            &batch_id,
            CompleteBatchInput {
                produced_quantity: dec!(118),
            },
        )
        .await
        .unwrap();
    let batch = handler.get_batch(&batch_id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.expiry_date, Some(date(6)));

    let customer_id = handler
        .create_customer(
            &actor,
            CustomerInput {
                code: "CUS-1".to_string(),
                name: "Corner Cafe".to_string(),
                contact_person: None,
                phone: None,
                email: None,
                address: None,
            },
        )
        .await
        .unwrap();

    let shipment_id = handler
        .create_shipment(
            &actor,
            ShipmentInput {
                shipment_number: "SH-1".to_string(),
                customer_id,
                product_id,
                batch_id: Some(batch_id),
                quantity: dec!(100),
                shipment_date: date(2),
                carrier: None,
                tracking_number: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    handler.dispatch_shipment(&actor, &shipment_id).await.unwrap();
    handler
        .create_delivery_form(
            &actor,
            &shipment_id,
            DeliveryFormInput {
                delivered_at: None,
                recipient_name: "Sam".to_string(),
                vehicle_number: None,
                driver_name: None,
                temperature_c: None,
                condition: DeliveryCondition::Good,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        handler.get_product(&product_id).await.unwrap().quantity_in_stock.value(),
        dec!(18)
    );

    let recall = handler.trace_lot(&flour_id, " LOT-A1 ").await.unwrap();
    assert_eq!(recall.receipts.len(), 1);
    assert_eq!(recall.batches.len(), 1);
    assert_eq!(recall.shipments.len(), 1);
    assert_eq!(recall.customers.len(), 1);
    assert_eq!(recall.customers[0].id, customer_id);

    let trace = handler.trace_batch(&batch_id).await.unwrap();
    assert_eq!(trace.materials.len(), 1);
    assert_eq!(trace.materials[0].receipts.len(), 1);
    assert!(trace.shipments[0].delivery.is_some());

    // 收货 +100，投料 -40
    let movements = handler
        .list_movements(StockItemKind::RawMaterial, flour_id.into(), &Default::default())
        .await
        .unwrap();
    assert_eq!(movements.total, 2);
    assert_eq!(movements.items[0].delta, dec!(-40));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_supplier_code_conflicts(pool: PgPool) {
    let handler = handler(pool).await;
    let actor = Actor::anonymous();
    let input = SupplierInput {
        code: "SUP-1".to_string(),
        name: "Dairy Farm".to_string(),
        contact_person: None,
        phone: None,
        email: None,
        address: None,
        is_approved: false,
    };

    handler.create_supplier(&actor, input.clone()).await.unwrap();
    let err = handler.create_supplier(&actor, input).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}
