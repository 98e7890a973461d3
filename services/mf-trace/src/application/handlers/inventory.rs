//! 库存处理：手工调整、流水、低库存

use foodtrace_common::{PagedResult, Pagination};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::{AppError, AppResult};
use tracing::info;
use uuid::Uuid;

use super::{ServiceHandler, clean, found};
use crate::application::commands::{Actor, StockAdjustmentInput};
use crate::application::queries::LowStockItem;
use crate::application::stock::{StockChange, apply_stock_change};
use crate::domain::UnitOfWork;
use crate::domain::entities::StockMovement;
use crate::domain::enums::{MovementReason, StockItemKind};
use crate::domain::value_objects::{ProductId, RawMaterialId};

impl ServiceHandler {
    /// 手工调整库存，结果不能为负
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        kind: StockItemKind,
        item_id: Uuid,
        input: StockAdjustmentInput,
    ) -> AppResult<Quantity> {
        if input.delta.is_zero() {
            return Err(AppError::validation("Adjustment must not be zero"));
        }
        let note = clean(input.note);
        if note.as_ref().is_some_and(|n| n.chars().count() > 255) {
            return Err(AppError::validation("Note must not exceed 255 characters"));
        }

        let uow = self.uow_factory.begin().await?;
        ensure_item_exists(uow.as_ref(), kind, item_id).await?;

        let change = StockChange::new(kind, item_id, input.delta, MovementReason::Adjustment).note(note);
        let balance = apply_stock_change(uow.as_ref(), change, actor)
            .await?
            .ok_or_else(|| AppError::internal("Adjustment produced no movement"))?;
        uow.commit().await?;

        info!(item_kind = %kind, item_id = %item_id, delta = %input.delta, "Stock adjusted");
        Ok(balance)
    }

    /// 库存流水，最新在前
    pub async fn list_movements(
        &self,
        kind: StockItemKind,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<StockMovement>> {
        let uow = self.uow_factory.read().await?;
        ensure_item_exists(uow.as_ref(), kind, item_id).await?;
        uow.stock().list_movements(kind, item_id, pagination).await
    }

    /// 低库存清单：原材料按各自再订货点，成品按配置的统一再订货点
    pub async fn low_stock(&self) -> AppResult<Vec<LowStockItem>> {
        let uow = self.uow_factory.read().await?;

        let mut items: Vec<LowStockItem> = uow
            .raw_materials()
            .list_low_stock()
            .await?
            .iter()
            .map(LowStockItem::from_raw_material)
            .collect();

        let threshold = self.product_reorder_level;
        items.extend(
            uow.products()
                .list_low_stock(threshold)
                .await?
                .iter()
                .map(|p| LowStockItem::from_product(p, threshold)),
        );
        Ok(items)
    }
}

async fn ensure_item_exists(uow: &dyn UnitOfWork, kind: StockItemKind, item_id: Uuid) -> AppResult<()> {
    match kind {
        StockItemKind::RawMaterial => {
            let id = RawMaterialId::from_uuid(item_id);
            found(uow.raw_materials().find_by_id(&id).await?, "Raw material", id)?;
        }
        StockItemKind::FinishedProduct => {
            let id = ProductId::from_uuid(item_id);
            found(uow.products().find_by_id(&id).await?, "Product", id)?;
        }
    }
    Ok(())
}
