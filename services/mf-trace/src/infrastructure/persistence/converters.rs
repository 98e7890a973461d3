//! 数据库行到领域对象的转换

use foodtrace_common::{AuditInfo, UserId};
use foodtrace_domain_core::{Currency, Quantity};
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;

use super::rows::*;
use crate::domain::entities::*;
use crate::domain::value_objects::*;

pub(crate) fn audit_info(cols: AuditColumns) -> AuditInfo {
    AuditInfo {
        created_at: cols.created_at,
        created_by: cols.created_by.map(UserId::from_uuid),
        updated_at: cols.updated_at,
        updated_by: cols.updated_by.map(UserId::from_uuid),
    }
}

/// 数据库中的数量已受 CHECK 约束保护，失败说明数据损坏
pub(crate) fn quantity(column: &str, value: Decimal) -> AppResult<Quantity> {
    Quantity::new(value)
        .map_err(|e| AppError::internal(format!("Invalid {} in database: {}", column, e)))
}

pub(crate) fn supplier_from_row(row: SupplierRow) -> AppResult<Supplier> {
    Ok(Supplier {
        id: SupplierId::from_uuid(row.id),
        code: row.code,
        name: row.name,
        contact_person: row.contact_person,
        phone: row.phone,
        email: row.email,
        address: row.address,
        is_approved: row.is_approved,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn raw_material_from_row(row: RawMaterialRow) -> AppResult<RawMaterial> {
    Ok(RawMaterial {
        id: RawMaterialId::from_uuid(row.id),
        code: row.code,
        name: row.name,
        description: row.description,
        supplier_id: row.supplier_id.map(SupplierId::from_uuid),
        unit: row.unit,
        quantity_in_stock: quantity("quantity_in_stock", row.quantity_in_stock)?,
        reorder_level: quantity("reorder_level", row.reorder_level)?,
        unit_cost: row.unit_cost,
        allergens: row.allergens,
        storage_conditions: row.storage_conditions,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn product_from_row(row: FinishedProductRow) -> AppResult<FinishedProduct> {
    Ok(FinishedProduct {
        id: ProductId::from_uuid(row.id),
        sku: row.sku,
        name: row.name,
        description: row.description,
        unit: row.unit,
        unit_price: row.unit_price,
        quantity_in_stock: quantity("quantity_in_stock", row.quantity_in_stock)?,
        shelf_life_days: row.shelf_life_days,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn customer_from_row(row: CustomerRow) -> AppResult<Customer> {
    Ok(Customer {
        id: CustomerId::from_uuid(row.id),
        code: row.code,
        name: row.name,
        contact_person: row.contact_person,
        phone: row.phone,
        email: row.email,
        address: row.address,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn user_from_row(row: UserRow) -> AppResult<User> {
    Ok(User {
        id: UserId::from_uuid(row.id),
        username: row.username,
        full_name: row.full_name,
        email: row.email,
        role: row.role.try_into()?,
        is_active: row.is_active,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn batch_from_row(row: BatchRow) -> AppResult<ProductionBatch> {
    Ok(ProductionBatch {
        id: BatchId::from_uuid(row.id),
        batch_number: row.batch_number,
        product_id: ProductId::from_uuid(row.product_id),
        supervisor_id: row.supervisor_id.map(UserId::from_uuid),
        planned_quantity: quantity("planned_quantity", row.planned_quantity)?,
        produced_quantity: row
            .produced_quantity
            .map(|q| quantity("produced_quantity", q))
            .transpose()?,
        status: row.status.try_into()?,
        production_date: row.production_date,
        expiry_date: row.expiry_date,
        started_at: row.started_at,
        completed_at: row.completed_at,
        notes: row.notes,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn stage_from_row(row: StageRow) -> AppResult<ProductionStage> {
    Ok(ProductionStage {
        id: StageId::from_uuid(row.id),
        batch_id: BatchId::from_uuid(row.batch_id),
        name: row.name,
        sequence: row.sequence,
        status: row.status.try_into()?,
        operator_id: row.operator_id.map(UserId::from_uuid),
        started_at: row.started_at,
        completed_at: row.completed_at,
        temperature_c: row.temperature_c,
        notes: row.notes,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn material_from_row(row: ProductionMaterialRow) -> AppResult<ProductionMaterial> {
    Ok(ProductionMaterial {
        id: ProductionMaterialId::from_uuid(row.id),
        batch_id: BatchId::from_uuid(row.batch_id),
        raw_material_id: RawMaterialId::from_uuid(row.raw_material_id),
        quantity_used: quantity("quantity_used", row.quantity_used)?,
        lot_number: row.lot_number,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn xray_from_row(row: XRayCheckRow) -> AppResult<XRayCheck> {
    Ok(XRayCheck {
        id: XRayCheckId::from_uuid(row.id),
        batch_id: BatchId::from_uuid(row.batch_id),
        inspector_id: row.inspector_id.map(UserId::from_uuid),
        checked_at: row.checked_at,
        sample_size: row.sample_size,
        rejected_count: row.rejected_count,
        foreign_body_detected: row.foreign_body_detected,
        contaminant_type: row.contaminant_type,
        calibration_verified: row.calibration_verified,
        result: row.result.try_into()?,
        notes: row.notes,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn receiving_from_row(row: ReceivingFormRow) -> AppResult<ReceivingForm> {
    Ok(ReceivingForm {
        id: ReceivingFormId::from_uuid(row.id),
        form_number: row.form_number,
        supplier_id: SupplierId::from_uuid(row.supplier_id),
        raw_material_id: RawMaterialId::from_uuid(row.raw_material_id),
        quantity: quantity("quantity", row.quantity)?,
        lot_number: row.lot_number,
        received_at: row.received_at,
        received_by: row.received_by.map(UserId::from_uuid),
        expiry_date: row.expiry_date,
        temperature_c: row.temperature_c,
        packaging_intact: row.packaging_intact,
        accepted: row.accepted,
        rejection_reason: row.rejection_reason,
        notes: row.notes,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn shipment_from_row(row: ShipmentRow) -> AppResult<Shipment> {
    Ok(Shipment {
        id: ShipmentId::from_uuid(row.id),
        shipment_number: row.shipment_number,
        customer_id: CustomerId::from_uuid(row.customer_id),
        product_id: ProductId::from_uuid(row.product_id),
        batch_id: row.batch_id.map(BatchId::from_uuid),
        quantity: quantity("quantity", row.quantity)?,
        shipment_date: row.shipment_date,
        status: row.status.try_into()?,
        carrier: row.carrier,
        tracking_number: row.tracking_number,
        notes: row.notes,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn delivery_from_row(row: DeliveryFormRow) -> AppResult<DeliveryForm> {
    Ok(DeliveryForm {
        id: DeliveryFormId::from_uuid(row.id),
        shipment_id: ShipmentId::from_uuid(row.shipment_id),
        delivered_at: row.delivered_at,
        recipient_name: row.recipient_name,
        vehicle_number: row.vehicle_number,
        driver_name: row.driver_name,
        temperature_c: row.temperature_c,
        condition: row.condition.try_into()?,
        notes: row.notes,
        audit_info: audit_info(row.audit),
    })
}

/// 发票头；发票行另行加载
pub(crate) fn invoice_from_row(row: InvoiceRow) -> AppResult<Invoice> {
    Ok(Invoice {
        id: InvoiceId::from_uuid(row.id),
        invoice_number: row.invoice_number,
        customer_id: CustomerId::from_uuid(row.customer_id),
        shipment_id: row.shipment_id.map(ShipmentId::from_uuid),
        issue_date: row.issue_date,
        due_date: row.due_date,
        status: row.status.try_into()?,
        currency: Currency::new(row.currency.trim()),
        tax_rate: row.tax_rate,
        notes: row.notes,
        items: Vec::new(),
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn invoice_item_from_row(row: InvoiceItemRow) -> AppResult<InvoiceItem> {
    Ok(InvoiceItem {
        id: InvoiceItemId::from_uuid(row.id),
        invoice_id: InvoiceId::from_uuid(row.invoice_id),
        product_id: ProductId::from_uuid(row.product_id),
        description: row.description,
        quantity: quantity("quantity", row.quantity)?,
        unit_price: row.unit_price,
        line_total: row.line_total,
        audit_info: audit_info(row.audit),
    })
}

pub(crate) fn movement_from_row(row: StockMovementRow) -> AppResult<StockMovement> {
    Ok(StockMovement {
        id: StockMovementId::from_uuid(row.id),
        item_kind: row.item_kind.try_into()?,
        item_id: row.item_id,
        delta: row.delta,
        balance_after: quantity("balance_after", row.balance_after)?,
        reason: row.reason.try_into()?,
        reference_id: row.reference_id,
        note: row.note,
        created_at: row.created_at,
        created_by: row.created_by.map(UserId::from_uuid),
    })
}

/// 批量转换
pub(crate) fn convert_all<R, T>(rows: Vec<R>, f: fn(R) -> AppResult<T>) -> AppResult<Vec<T>> {
    rows.into_iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enums::BatchStatus;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn audit() -> AuditColumns {
        AuditColumns {
            created_at: Utc::now(),
            created_by: Some(Uuid::now_v7()),
            updated_at: Utc::now(),
            updated_by: None,
        }
    }

    #[test]
    fn test_batch_from_row() {
        let row = BatchRow {
            id: Uuid::now_v7(),
            batch_number: "B-1".to_string(),
            product_id: Uuid::now_v7(),
            supervisor_id: None,
            planned_quantity: dec!(100.000),
            produced_quantity: Some(dec!(95.5)),
            status: 3,
            production_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            expiry_date: None,
            started_at: None,
            completed_at: None,
            notes: None,
            audit: audit(),
        };
        let batch = batch_from_row(row).unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(batch.produced_quantity.unwrap().value(), dec!(95.5));
        assert!(batch.audit_info.created_by.is_some());
    }

    #[test]
    fn test_unknown_status_code_is_internal_error() {
        let row = ShipmentRow {
            id: Uuid::now_v7(),
            shipment_number: "SH-1".to_string(),
            customer_id: Uuid::now_v7(),
            product_id: Uuid::now_v7(),
            batch_id: None,
            quantity: dec!(1),
            shipment_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            status: 9,
            carrier: None,
            tracking_number: None,
            notes: None,
            audit: audit(),
        };
        assert!(matches!(shipment_from_row(row), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_negative_quantity_is_internal_error() {
        assert!(matches!(
            quantity("quantity_in_stock", dec!(-1)),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_currency_is_trimmed() {
        let row = InvoiceRow {
            id: Uuid::now_v7(),
            invoice_number: "INV-1".to_string(),
            customer_id: Uuid::now_v7(),
            shipment_id: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
            status: 1,
            currency: "eur".to_string(),
            tax_rate: dec!(0),
            notes: None,
            audit: audit(),
        };
        assert_eq!(invoice_from_row(row).unwrap().currency, Currency::eur());
    }
}
