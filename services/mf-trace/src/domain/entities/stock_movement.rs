//! 库存流水

use chrono::{DateTime, Utc};
use foodtrace_common::UserId;
use foodtrace_domain_core::Quantity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::enums::{MovementReason, StockItemKind};
use crate::domain::value_objects::StockMovementId;

/// 库存流水（只追加）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub item_kind: StockItemKind,
    pub item_id: Uuid,
    /// 有符号变动量
    pub delta: Decimal,
    pub balance_after: Quantity,
    pub reason: MovementReason,
    /// 引起变动的单据 ID（收货单、投料、批次、发货单）
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
}
