//! 生产与质检命令

use chrono::{DateTime, NaiveDate, Utc};
use foodtrace_common::UserId;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::value_objects::{ProductId, RawMaterialId};

/// 生产批次输入
#[derive(Debug, Clone, Deserialize)]
pub struct BatchInput {
    pub batch_number: String,
    pub product_id: ProductId,
    pub supervisor_id: Option<UserId>,
    pub planned_quantity: Decimal,
    pub production_date: NaiveDate,
    /// 为空时按成品保质期推算
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// 完工输入
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteBatchInput {
    pub produced_quantity: Decimal,
}

/// 工序输入
#[derive(Debug, Clone, Deserialize)]
pub struct StageInput {
    pub name: String,
    pub sequence: i32,
    pub operator_id: Option<UserId>,
    pub temperature_c: Option<Decimal>,
    pub notes: Option<String>,
}

/// 投料输入
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialUsageInput {
    pub raw_material_id: RawMaterialId,
    pub quantity_used: Decimal,
    pub lot_number: Option<String>,
}

/// X 光检测输入
#[derive(Debug, Clone, Deserialize)]
pub struct XRayCheckInput {
    pub inspector_id: Option<UserId>,
    /// 为空时取当前时间
    pub checked_at: Option<DateTime<Utc>>,
    pub sample_size: i32,
    #[serde(default)]
    pub rejected_count: i32,
    #[serde(default)]
    pub foreign_body_detected: bool,
    pub contaminant_type: Option<String>,
    #[serde(default)]
    pub calibration_verified: bool,
    pub notes: Option<String>,
}
