//! 库存仓储接口

use async_trait::async_trait;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::AppResult;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::entities::StockMovement;
use crate::domain::enums::StockItemKind;

/// 库存仓储接口
///
/// 库存数量的唯一写入口。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// 原子地将库存加上 `delta`（可为负）
    ///
    /// 结果会小于零或对象不存在时不做任何修改并返回 `None`，否则返回变更后的库存。
    async fn apply_delta(
        &self,
        kind: StockItemKind,
        item_id: Uuid,
        delta: Decimal,
    ) -> AppResult<Option<Quantity>>;

    /// 当前库存，对象不存在时返回 `None`
    async fn current_level(&self, kind: StockItemKind, item_id: Uuid)
    -> AppResult<Option<Quantity>>;

    async fn record_movement(&self, movement: &StockMovement) -> AppResult<()>;

    /// 按时间倒序列出流水
    async fn list_movements(
        &self,
        kind: StockItemKind,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<StockMovement>>;
}
