//! 质量检测实体

use chrono::{DateTime, Utc};
use foodtrace_common::{AuditInfo, UserId};
use foodtrace_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use super::rules;
use crate::domain::enums::XRayResult;
use crate::domain::value_objects::{BatchId, XRayCheckId};

/// X 光异物检测记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XRayCheck {
    pub id: XRayCheckId,
    pub batch_id: BatchId,
    pub inspector_id: Option<UserId>,
    pub checked_at: DateTime<Utc>,
    pub sample_size: i32,
    pub rejected_count: i32,
    pub foreign_body_detected: bool,
    /// 异物类型（金属、玻璃、骨头等）
    pub contaminant_type: Option<String>,
    pub calibration_verified: bool,
    /// 由检测数据推导，不接受外部输入
    pub result: XRayResult,
    pub notes: Option<String>,
    pub audit_info: AuditInfo,
}

impl XRayCheck {
    pub fn validate(&self) -> AppResult<()> {
        if self.sample_size < 1 {
            return Err(AppError::validation("Sample size must be at least 1"));
        }
        if self.rejected_count < 0 || self.rejected_count > self.sample_size {
            return Err(AppError::validation(
                "Rejected count must be between 0 and the sample size",
            ));
        }
        rules::optional_text("Contaminant type", self.contaminant_type.as_deref(), 100)?;
        rules::optional_text("Notes", self.notes.as_deref(), 1000)
    }

    /// 重新计算检测结果
    pub fn refresh_result(&mut self) {
        self.result = XRayResult::derive(self.foreign_body_detected, self.rejected_count);
    }

    pub fn is_failed(&self) -> bool {
        self.result == XRayResult::Fail
    }
}
