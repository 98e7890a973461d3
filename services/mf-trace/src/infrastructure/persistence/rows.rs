//! 数据库行映射结构

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// 审计列
#[derive(Debug, FromRow)]
pub struct AuditColumns {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, FromRow)]
pub struct SupplierRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_approved: bool,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct RawMaterialRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub unit: String,
    pub quantity_in_stock: Decimal,
    pub reorder_level: Decimal,
    pub unit_cost: Decimal,
    pub allergens: Option<String>,
    pub storage_conditions: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct FinishedProductRow {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub unit_price: Decimal,
    pub quantity_in_stock: Decimal,
    pub shelf_life_days: Option<i32>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: i16,
    pub is_active: bool,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct BatchRow {
    pub id: Uuid,
    pub batch_number: String,
    pub product_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub planned_quantity: Decimal,
    pub produced_quantity: Option<Decimal>,
    pub status: i16,
    pub production_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct StageRow {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub status: i16,
    pub operator_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub temperature_c: Option<Decimal>,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct ProductionMaterialRow {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub raw_material_id: Uuid,
    pub quantity_used: Decimal,
    pub lot_number: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct XRayCheckRow {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub inspector_id: Option<Uuid>,
    pub checked_at: DateTime<Utc>,
    pub sample_size: i32,
    pub rejected_count: i32,
    pub foreign_body_detected: bool,
    pub contaminant_type: Option<String>,
    pub calibration_verified: bool,
    pub result: i16,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct ReceivingFormRow {
    pub id: Uuid,
    pub form_number: String,
    pub supplier_id: Uuid,
    pub raw_material_id: Uuid,
    pub quantity: Decimal,
    pub lot_number: String,
    pub received_at: DateTime<Utc>,
    pub received_by: Option<Uuid>,
    pub expiry_date: Option<NaiveDate>,
    pub temperature_c: Option<Decimal>,
    pub packaging_intact: bool,
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct ShipmentRow {
    pub id: Uuid,
    pub shipment_number: String,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: Decimal,
    pub shipment_date: NaiveDate,
    pub status: i16,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct DeliveryFormRow {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub delivered_at: DateTime<Utc>,
    pub recipient_name: String,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub temperature_c: Option<Decimal>,
    pub condition: i16,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub shipment_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: i16,
    pub currency: String,
    pub tax_rate: Decimal,
    pub notes: Option<String>,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct InvoiceItemRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Uuid,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    #[sqlx(flatten)]
    pub audit: AuditColumns,
}

#[derive(Debug, FromRow)]
pub struct StockMovementRow {
    pub id: Uuid,
    pub item_kind: i16,
    pub item_id: Uuid,
    pub delta: Decimal,
    pub balance_after: Decimal,
    pub reason: i16,
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}
