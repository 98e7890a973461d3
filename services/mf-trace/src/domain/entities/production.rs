//! 生产实体：批次、工序、投料

use chrono::{DateTime, NaiveDate, Utc};
use foodtrace_common::{AuditInfo, UserId};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rules;
use crate::domain::enums::{BatchStatus, StageStatus};
use crate::domain::value_objects::{
    BatchId, ProductId, ProductionMaterialId, RawMaterialId, StageId,
};

/// 生产批次
///
/// 状态流转：planned → in_progress → completed，planned/in_progress 可取消。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionBatch {
    pub id: BatchId,
    pub batch_number: String,
    pub product_id: ProductId,
    pub supervisor_id: Option<UserId>,
    pub planned_quantity: Quantity,
    pub produced_quantity: Option<Quantity>,
    pub status: BatchStatus,
    pub production_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub audit_info: AuditInfo,
}

impl ProductionBatch {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Batch number", &self.batch_number, 30)?;
        if self.planned_quantity.is_zero() {
            return Err(AppError::validation("Planned quantity must be greater than zero"));
        }
        if let Some(expiry) = self.expiry_date {
            if expiry < self.production_date {
                return Err(AppError::validation(
                    "Expiry date must not be before production date",
                ));
            }
        }
        rules::optional_text("Notes", self.notes.as_deref(), 1000)
    }

    /// 批次未结束时才允许修改投料、工序和基本信息
    pub fn ensure_open(&self) -> AppResult<()> {
        if !self.status.is_open() {
            return Err(AppError::failed_precondition(format!(
                "Batch {} is {}",
                self.batch_number, self.status
            )));
        }
        Ok(())
    }

    pub fn start(&mut self) -> AppResult<()> {
        if self.status != BatchStatus::Planned {
            return Err(self.transition_error("start"));
        }
        self.status = BatchStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self, produced_quantity: Quantity) -> AppResult<()> {
        if self.status != BatchStatus::InProgress {
            return Err(self.transition_error("complete"));
        }
        if produced_quantity.is_zero() {
            return Err(AppError::validation("Produced quantity must be greater than zero"));
        }
        self.status = BatchStatus::Completed;
        self.produced_quantity = Some(produced_quantity);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        if !self.status.is_open() {
            return Err(self.transition_error("cancel"));
        }
        self.status = BatchStatus::Cancelled;
        Ok(())
    }

    fn transition_error(&self, action: &str) -> AppError {
        AppError::failed_precondition(format!(
            "Cannot {} batch {} in status {}",
            action, self.batch_number, self.status
        ))
    }
}

/// 生产工序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionStage {
    pub id: StageId,
    pub batch_id: BatchId,
    pub name: String,
    /// 工序顺序，批次内唯一，从 1 开始
    pub sequence: i32,
    pub status: StageStatus,
    pub operator_id: Option<UserId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub temperature_c: Option<Decimal>,
    pub notes: Option<String>,
    pub audit_info: AuditInfo,
}

impl ProductionStage {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Stage name", &self.name, 100)?;
        if self.sequence < 1 {
            return Err(AppError::validation("Stage sequence must be at least 1"));
        }
        rules::temperature(self.temperature_c)?;
        rules::optional_text("Notes", self.notes.as_deref(), 1000)
    }

    pub fn start(&mut self) -> AppResult<()> {
        if self.status != StageStatus::Pending {
            return Err(AppError::failed_precondition(format!(
                "Cannot start stage {} in status {}",
                self.name, self.status
            )));
        }
        self.status = StageStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self) -> AppResult<()> {
        if self.status != StageStatus::InProgress {
            return Err(AppError::failed_precondition(format!(
                "Cannot complete stage {} in status {}",
                self.name, self.status
            )));
        }
        self.status = StageStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// 批次投料记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionMaterial {
    pub id: ProductionMaterialId,
    pub batch_id: BatchId,
    pub raw_material_id: RawMaterialId,
    pub quantity_used: Quantity,
    /// 原材料批号，用于追溯到收货单
    pub lot_number: Option<String>,
    pub audit_info: AuditInfo,
}

impl ProductionMaterial {
    pub fn validate(&self) -> AppResult<()> {
        if self.quantity_used.is_zero() {
            return Err(AppError::validation("Quantity used must be greater than zero"));
        }
        rules::optional_text("Lot number", self.lot_number.as_deref(), 50)
    }
}
