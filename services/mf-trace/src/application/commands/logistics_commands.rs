//! 物流命令

use chrono::{DateTime, NaiveDate, Utc};
use foodtrace_common::UserId;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::master_data_commands::default_true;
use crate::domain::enums::DeliveryCondition;
use crate::domain::value_objects::{BatchId, CustomerId, ProductId, RawMaterialId, SupplierId};

/// 收货单输入
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivingFormInput {
    pub form_number: String,
    pub supplier_id: SupplierId,
    pub raw_material_id: RawMaterialId,
    pub quantity: Decimal,
    pub lot_number: String,
    pub received_at: Option<DateTime<Utc>>,
    pub received_by: Option<UserId>,
    pub expiry_date: Option<NaiveDate>,
    pub temperature_c: Option<Decimal>,
    #[serde(default = "default_true")]
    pub packaging_intact: bool,
    #[serde(default = "default_true")]
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
}

/// 发货单输入
#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentInput {
    pub shipment_number: String,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub batch_id: Option<BatchId>,
    pub quantity: Decimal,
    pub shipment_date: NaiveDate,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

/// 签收单输入
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryFormInput {
    pub delivered_at: Option<DateTime<Utc>>,
    pub recipient_name: String,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub temperature_c: Option<Decimal>,
    pub condition: DeliveryCondition,
    pub notes: Option<String>,
}
