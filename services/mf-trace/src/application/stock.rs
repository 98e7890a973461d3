//! 库存变更
//!
//! 所有库存增减都经过 [`apply_stock_change`]：条件更新、写流水、记指标，
//! 必须在调用方的事务工作单元内执行。

use chrono::Utc;
use foodtrace_domain_core::{MAX_QUANTITY, Quantity};
use foodtrace_errors::{AppError, AppResult};
use foodtrace_telemetry::{record_stock_movement, record_stock_rejection};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::commands::Actor;
use crate::domain::UnitOfWork;
use crate::domain::entities::StockMovement;
use crate::domain::enums::{MovementReason, StockItemKind};
use crate::domain::value_objects::StockMovementId;

/// 一次库存变更
#[derive(Debug, Clone, PartialEq)]
pub struct StockChange {
    pub kind: StockItemKind,
    pub item_id: Uuid,
    pub delta: Decimal,
    pub reason: MovementReason,
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
}

impl StockChange {
    pub fn new(kind: StockItemKind, item_id: Uuid, delta: Decimal, reason: MovementReason) -> Self {
        Self {
            kind,
            item_id,
            delta,
            reason,
            reference_id: None,
            note: None,
        }
    }

    pub fn reference(mut self, reference_id: impl Into<Uuid>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// 应用库存变更，返回变更后的库存；变动量为零时不做任何事
///
/// 库存不足返回 Conflict，对象不存在返回 NotFound。
pub(crate) async fn apply_stock_change(
    uow: &dyn UnitOfWork,
    change: StockChange,
    actor: &Actor,
) -> AppResult<Option<Quantity>> {
    if change.delta.is_zero() {
        return Ok(None);
    }
    if change.delta.abs() > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "Stock change {} exceeds the maximum quantity {}",
            change.delta, MAX_QUANTITY
        )));
    }
    if !change.reason.applies_to(change.kind) {
        return Err(AppError::internal(format!(
            "Movement reason {} does not apply to {}",
            change.reason, change.kind
        )));
    }

    let stock = uow.stock();
    match stock
        .apply_delta(change.kind, change.item_id, change.delta)
        .await?
    {
        Some(balance) => {
            let movement = StockMovement {
                id: StockMovementId::new(),
                item_kind: change.kind,
                item_id: change.item_id,
                delta: change.delta,
                balance_after: balance,
                reason: change.reason,
                reference_id: change.reference_id,
                note: change.note,
                created_at: Utc::now(),
                created_by: actor.user_id.clone(),
            };
            stock.record_movement(&movement).await?;
            record_stock_movement(change.kind.as_str(), change.reason.as_str());

            info!(
                item_kind = %change.kind,
                item_id = %change.item_id,
                delta = %change.delta,
                balance = %balance,
                reason = %change.reason,
                "Stock updated"
            );
            Ok(Some(balance))
        }
        None => {
            let Some(available) = stock.current_level(change.kind, change.item_id).await? else {
                return Err(AppError::not_found(format!(
                    "{} {} not found",
                    change.kind, change.item_id
                )));
            };

            record_stock_rejection(change.kind.as_str());
            warn!(
                item_kind = %change.kind,
                item_id = %change.item_id,
                delta = %change.delta,
                available = %available,
                reason = %change.reason,
                "Stock change rejected"
            );

            let message = match available.apply_delta(change.delta) {
                Err(e) => e.to_string(),
                // 并发变更后余额已足够，由调用方重试
                Ok(_) => "stock changed concurrently, please retry".to_string(),
            };
            Err(AppError::conflict(message))
        }
    }
}
