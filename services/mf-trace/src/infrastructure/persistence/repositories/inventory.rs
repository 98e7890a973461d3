//! 库存仓储
//!
//! 库存列的唯一写入口。增减通过单条条件 UPDATE 完成，结果不可能为负。

use async_trait::async_trait;
use foodtrace_adapter_postgres::run_in_session;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::AppResult;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{define_pg_repo, paged, window};
use crate::domain::entities::StockMovement;
use crate::domain::enums::StockItemKind;
use crate::domain::repositories::StockRepository;
use crate::infrastructure::persistence::converters::{convert_all, movement_from_row, quantity};
use crate::infrastructure::persistence::rows::StockMovementRow;

fn apply_delta_sql(kind: StockItemKind) -> &'static str {
    match kind {
        StockItemKind::RawMaterial => {
            "UPDATE raw_materials SET quantity_in_stock = quantity_in_stock + $2 \
             WHERE id = $1 AND quantity_in_stock + $2 >= 0 RETURNING quantity_in_stock"
        }
        StockItemKind::FinishedProduct => {
            "UPDATE finished_products SET quantity_in_stock = quantity_in_stock + $2 \
             WHERE id = $1 AND quantity_in_stock + $2 >= 0 RETURNING quantity_in_stock"
        }
    }
}

fn current_level_sql(kind: StockItemKind) -> &'static str {
    match kind {
        StockItemKind::RawMaterial => "SELECT quantity_in_stock FROM raw_materials WHERE id = $1",
        StockItemKind::FinishedProduct => {
            "SELECT quantity_in_stock FROM finished_products WHERE id = $1"
        }
    }
}

define_pg_repo!(PgStockRepository);

#[async_trait]
impl StockRepository for PgStockRepository {
    async fn apply_delta(
        &self,
        kind: StockItemKind,
        item_id: Uuid,
        delta: Decimal,
    ) -> AppResult<Option<Quantity>> {
        let row: Option<(Decimal,)> = run_in_session!(&self.session, |conn| {
            sqlx::query_as(apply_delta_sql(kind))
                .bind(item_id)
                .bind(delta)
                .fetch_optional(conn)
        })?;

        row.map(|(level,)| quantity("quantity_in_stock", level))
            .transpose()
    }

    async fn current_level(
        &self,
        kind: StockItemKind,
        item_id: Uuid,
    ) -> AppResult<Option<Quantity>> {
        let row: Option<(Decimal,)> = run_in_session!(&self.session, |conn| {
            sqlx::query_as(current_level_sql(kind))
                .bind(item_id)
                .fetch_optional(conn)
        })?;

        row.map(|(level,)| quantity("quantity_in_stock", level))
            .transpose()
    }

    async fn record_movement(&self, movement: &StockMovement) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                INSERT INTO stock_movements (id, item_kind, item_id, delta, balance_after, reason,
                                             reference_id, note, created_at, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(movement.id.0)
            .bind(i16::from(movement.item_kind))
            .bind(movement.item_id)
            .bind(movement.delta)
            .bind(movement.balance_after.value())
            .bind(i16::from(movement.reason))
            .bind(movement.reference_id)
            .bind(&movement.note)
            .bind(movement.created_at)
            .bind(movement.created_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn list_movements(
        &self,
        kind: StockItemKind,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<StockMovement>> {
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as("SELECT COUNT(*) FROM stock_movements WHERE item_kind = $1 AND item_id = $2")
                .bind(i16::from(kind))
                .bind(item_id)
                .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, StockMovementRow>(
                r#"
                SELECT id, item_kind, item_id, delta, balance_after, reason, reference_id, note,
                       created_at, created_by
                FROM stock_movements
                WHERE item_kind = $1 AND item_id = $2
                ORDER BY created_at DESC, id DESC
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(i16::from(kind))
            .bind(item_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, movement_from_row)?, total, pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_delta_sql_targets_kind_table() {
        assert!(apply_delta_sql(StockItemKind::RawMaterial).contains("raw_materials"));
        assert!(apply_delta_sql(StockItemKind::FinishedProduct).contains("finished_products"));
        assert!(apply_delta_sql(StockItemKind::FinishedProduct).contains("+ $2 >= 0"));
    }
}
