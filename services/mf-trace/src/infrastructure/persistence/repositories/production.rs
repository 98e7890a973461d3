//! 生产与质检仓储

use async_trait::async_trait;
use foodtrace_adapter_postgres::run_in_session;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_errors::AppResult;
use uuid::Uuid;

use super::{define_pg_repo, locking, paged, window};
use crate::domain::entities::{ProductionBatch, ProductionMaterial, ProductionStage, XRayCheck};
use crate::domain::repositories::{
    BatchFilter, ProductionBatchRepository, ProductionMaterialRepository,
    ProductionStageRepository, XRayCheckRepository,
};
use crate::domain::value_objects::{
    BatchId, ProductionMaterialId, RawMaterialId, StageId, XRayCheckId,
};
use crate::infrastructure::persistence::converters::{
    batch_from_row, convert_all, material_from_row, stage_from_row, xray_from_row,
};
use crate::infrastructure::persistence::rows::{
    BatchRow, ProductionMaterialRow, StageRow, XRayCheckRow,
};

macro_rules! batch_columns {
    () => {
        "id, batch_number, product_id, supervisor_id, planned_quantity, produced_quantity, \
         status, production_date, expiry_date, started_at, completed_at, notes, \
         created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! stage_columns {
    () => {
        "id, batch_id, name, sequence, status, operator_id, started_at, completed_at, \
         temperature_c, notes, created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! material_columns {
    () => {
        "id, batch_id, raw_material_id, quantity_used, lot_number, \
         created_at, created_by, updated_at, updated_by"
    };
}

macro_rules! xray_columns {
    () => {
        "id, batch_id, inspector_id, checked_at, sample_size, rejected_count, \
         foreign_body_detected, contaminant_type, calibration_verified, result, notes, \
         created_at, created_by, updated_at, updated_by"
    };
}

const FIND_BATCH: &str = concat!("SELECT ", batch_columns!(), " FROM production_batches WHERE id = $1");
const FIND_BATCH_FOR_UPDATE: &str = concat!(
    "SELECT ",
    batch_columns!(),
    " FROM production_batches WHERE id = $1 FOR UPDATE"
);

const FIND_MATERIAL: &str = concat!(
    "SELECT ",
    material_columns!(),
    " FROM production_materials WHERE id = $1"
);
const FIND_MATERIAL_FOR_UPDATE: &str = concat!(
    "SELECT ",
    material_columns!(),
    " FROM production_materials WHERE id = $1 FOR UPDATE"
);

// ============================================================================
// ProductionBatchRepository 实现
// ============================================================================

define_pg_repo!(PgProductionBatchRepository);

#[async_trait]
impl ProductionBatchRepository for PgProductionBatchRepository {
    async fn find_by_id(&self, id: &BatchId) -> AppResult<Option<ProductionBatch>> {
        let sql = locking(&self.session, FIND_BATCH, FIND_BATCH_FOR_UPDATE);
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, BatchRow>(sql)
                .bind(id.0)
                .fetch_optional(conn)
        })?;

        row.map(batch_from_row).transpose()
    }

    async fn find_by_number(&self, batch_number: &str) -> AppResult<Option<ProductionBatch>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, BatchRow>(concat!(
                "SELECT ",
                batch_columns!(),
                " FROM production_batches WHERE batch_number = $1"
            ))
            .bind(batch_number)
            .fetch_optional(conn)
        })?;

        row.map(batch_from_row).transpose()
    }

    async fn find_by_ids(&self, ids: &[BatchId]) -> AppResult<Vec<ProductionBatch>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, BatchRow>(concat!(
                "SELECT ",
                batch_columns!(),
                " FROM production_batches WHERE id = ANY($1) ORDER BY production_date, batch_number"
            ))
            .bind(&ids)
            .fetch_all(conn)
        })?;

        convert_all(rows, batch_from_row)
    }

    async fn save(&self, batch: &ProductionBatch) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO production_batches (",
                batch_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
            ))
            .bind(batch.id.0)
            .bind(&batch.batch_number)
            .bind(batch.product_id.0)
            .bind(batch.supervisor_id.as_ref().map(|u| u.0))
            .bind(batch.planned_quantity.value())
            .bind(batch.produced_quantity.map(|q| q.value()))
            .bind(i16::from(batch.status))
            .bind(batch.production_date)
            .bind(batch.expiry_date)
            .bind(batch.started_at)
            .bind(batch.completed_at)
            .bind(&batch.notes)
            .bind(batch.audit_info.created_at)
            .bind(batch.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(batch.audit_info.updated_at)
            .bind(batch.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, batch: &ProductionBatch) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE production_batches
                SET batch_number = $2, product_id = $3, supervisor_id = $4, planned_quantity = $5,
                    produced_quantity = $6, status = $7, production_date = $8, expiry_date = $9,
                    started_at = $10, completed_at = $11, notes = $12,
                    updated_at = $13, updated_by = $14
                WHERE id = $1
                "#,
            )
            .bind(batch.id.0)
            .bind(&batch.batch_number)
            .bind(batch.product_id.0)
            .bind(batch.supervisor_id.as_ref().map(|u| u.0))
            .bind(batch.planned_quantity.value())
            .bind(batch.produced_quantity.map(|q| q.value()))
            .bind(i16::from(batch.status))
            .bind(batch.production_date)
            .bind(batch.expiry_date)
            .bind(batch.started_at)
            .bind(batch.completed_at)
            .bind(&batch.notes)
            .bind(batch.audit_info.updated_at)
            .bind(batch.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &BatchId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM production_batches WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &BatchFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ProductionBatch>> {
        let status = filter.status.map(i16::from);
        let product_id = filter.product_id.map(|p| p.0);
        let (limit, offset) = window(pagination);

        let (total,): (i64,) = run_in_session!(&self.session, |conn| {
            sqlx::query_as(
                "SELECT COUNT(*) FROM production_batches \
                 WHERE ($1::smallint IS NULL OR status = $1) \
                   AND ($2::uuid IS NULL OR product_id = $2)",
            )
            .bind(status)
            .bind(product_id)
            .fetch_one(conn)
        })?;

        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, BatchRow>(concat!(
                "SELECT ",
                batch_columns!(),
                " FROM production_batches \
                 WHERE ($1::smallint IS NULL OR status = $1) \
                   AND ($2::uuid IS NULL OR product_id = $2) \
                 ORDER BY production_date DESC, batch_number DESC LIMIT $3 OFFSET $4"
            ))
            .bind(status)
            .bind(product_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(conn)
        })?;

        Ok(paged(convert_all(rows, batch_from_row)?, total, pagination))
    }
}

// ============================================================================
// ProductionStageRepository 实现
// ============================================================================

define_pg_repo!(PgProductionStageRepository);

#[async_trait]
impl ProductionStageRepository for PgProductionStageRepository {
    async fn find_by_id(&self, id: &StageId) -> AppResult<Option<ProductionStage>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, StageRow>(concat!(
                "SELECT ",
                stage_columns!(),
                " FROM production_stages WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(stage_from_row).transpose()
    }

    async fn find_by_sequence(
        &self,
        batch_id: &BatchId,
        sequence: i32,
    ) -> AppResult<Option<ProductionStage>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, StageRow>(concat!(
                "SELECT ",
                stage_columns!(),
                " FROM production_stages WHERE batch_id = $1 AND sequence = $2"
            ))
            .bind(batch_id.0)
            .bind(sequence)
            .fetch_optional(conn)
        })?;

        row.map(stage_from_row).transpose()
    }

    async fn save(&self, stage: &ProductionStage) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO production_stages (",
                stage_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
            ))
            .bind(stage.id.0)
            .bind(stage.batch_id.0)
            .bind(&stage.name)
            .bind(stage.sequence)
            .bind(i16::from(stage.status))
            .bind(stage.operator_id.as_ref().map(|u| u.0))
            .bind(stage.started_at)
            .bind(stage.completed_at)
            .bind(stage.temperature_c)
            .bind(&stage.notes)
            .bind(stage.audit_info.created_at)
            .bind(stage.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(stage.audit_info.updated_at)
            .bind(stage.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, stage: &ProductionStage) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE production_stages
                SET name = $2, sequence = $3, status = $4, operator_id = $5, started_at = $6,
                    completed_at = $7, temperature_c = $8, notes = $9,
                    updated_at = $10, updated_by = $11
                WHERE id = $1
                "#,
            )
            .bind(stage.id.0)
            .bind(&stage.name)
            .bind(stage.sequence)
            .bind(i16::from(stage.status))
            .bind(stage.operator_id.as_ref().map(|u| u.0))
            .bind(stage.started_at)
            .bind(stage.completed_at)
            .bind(stage.temperature_c)
            .bind(&stage.notes)
            .bind(stage.audit_info.updated_at)
            .bind(stage.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &StageId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM production_stages WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<ProductionStage>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, StageRow>(concat!(
                "SELECT ",
                stage_columns!(),
                " FROM production_stages WHERE batch_id = $1 ORDER BY sequence"
            ))
            .bind(batch_id.0)
            .fetch_all(conn)
        })?;

        convert_all(rows, stage_from_row)
    }
}

// ============================================================================
// ProductionMaterialRepository 实现
// ============================================================================

define_pg_repo!(PgProductionMaterialRepository);

#[async_trait]
impl ProductionMaterialRepository for PgProductionMaterialRepository {
    async fn find_by_id(
        &self,
        id: &ProductionMaterialId,
    ) -> AppResult<Option<ProductionMaterial>> {
        let sql = locking(&self.session, FIND_MATERIAL, FIND_MATERIAL_FOR_UPDATE);
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ProductionMaterialRow>(sql)
                .bind(id.0)
                .fetch_optional(conn)
        })?;

        row.map(material_from_row).transpose()
    }

    async fn save(&self, material: &ProductionMaterial) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO production_materials (",
                material_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ))
            .bind(material.id.0)
            .bind(material.batch_id.0)
            .bind(material.raw_material_id.0)
            .bind(material.quantity_used.value())
            .bind(&material.lot_number)
            .bind(material.audit_info.created_at)
            .bind(material.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(material.audit_info.updated_at)
            .bind(material.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, material: &ProductionMaterial) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE production_materials
                SET raw_material_id = $2, quantity_used = $3, lot_number = $4,
                    updated_at = $5, updated_by = $6
                WHERE id = $1
                "#,
            )
            .bind(material.id.0)
            .bind(material.raw_material_id.0)
            .bind(material.quantity_used.value())
            .bind(&material.lot_number)
            .bind(material.audit_info.updated_at)
            .bind(material.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &ProductionMaterialId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM production_materials WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<ProductionMaterial>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ProductionMaterialRow>(concat!(
                "SELECT ",
                material_columns!(),
                " FROM production_materials WHERE batch_id = $1 ORDER BY created_at, id"
            ))
            .bind(batch_id.0)
            .fetch_all(conn)
        })?;

        convert_all(rows, material_from_row)
    }

    async fn list_by_lot(
        &self,
        raw_material_id: &RawMaterialId,
        lot_number: &str,
    ) -> AppResult<Vec<ProductionMaterial>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, ProductionMaterialRow>(concat!(
                "SELECT ",
                material_columns!(),
                " FROM production_materials WHERE raw_material_id = $1 AND lot_number = $2 \
                 ORDER BY created_at, id"
            ))
            .bind(raw_material_id.0)
            .bind(lot_number)
            .fetch_all(conn)
        })?;

        convert_all(rows, material_from_row)
    }
}

// ============================================================================
// XRayCheckRepository 实现
// ============================================================================

define_pg_repo!(PgXRayCheckRepository);

#[async_trait]
impl XRayCheckRepository for PgXRayCheckRepository {
    async fn find_by_id(&self, id: &XRayCheckId) -> AppResult<Option<XRayCheck>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, XRayCheckRow>(concat!(
                "SELECT ",
                xray_columns!(),
                " FROM xray_checks WHERE id = $1"
            ))
            .bind(id.0)
            .fetch_optional(conn)
        })?;

        row.map(xray_from_row).transpose()
    }

    async fn save(&self, check: &XRayCheck) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(concat!(
                "INSERT INTO xray_checks (",
                xray_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
            ))
            .bind(check.id.0)
            .bind(check.batch_id.0)
            .bind(check.inspector_id.as_ref().map(|u| u.0))
            .bind(check.checked_at)
            .bind(check.sample_size)
            .bind(check.rejected_count)
            .bind(check.foreign_body_detected)
            .bind(&check.contaminant_type)
            .bind(check.calibration_verified)
            .bind(i16::from(check.result))
            .bind(&check.notes)
            .bind(check.audit_info.created_at)
            .bind(check.audit_info.created_by.as_ref().map(|u| u.0))
            .bind(check.audit_info.updated_at)
            .bind(check.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn update(&self, check: &XRayCheck) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query(
                r#"
                UPDATE xray_checks
                SET inspector_id = $2, checked_at = $3, sample_size = $4, rejected_count = $5,
                    foreign_body_detected = $6, contaminant_type = $7, calibration_verified = $8,
                    result = $9, notes = $10, updated_at = $11, updated_by = $12
                WHERE id = $1
                "#,
            )
            .bind(check.id.0)
            .bind(check.inspector_id.as_ref().map(|u| u.0))
            .bind(check.checked_at)
            .bind(check.sample_size)
            .bind(check.rejected_count)
            .bind(check.foreign_body_detected)
            .bind(&check.contaminant_type)
            .bind(check.calibration_verified)
            .bind(i16::from(check.result))
            .bind(&check.notes)
            .bind(check.audit_info.updated_at)
            .bind(check.audit_info.updated_by.as_ref().map(|u| u.0))
            .execute(conn)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &XRayCheckId) -> AppResult<()> {
        run_in_session!(&self.session, |conn| {
            sqlx::query("DELETE FROM xray_checks WHERE id = $1")
                .bind(id.0)
                .execute(conn)
        })?;

        Ok(())
    }

    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<XRayCheck>> {
        let rows = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, XRayCheckRow>(concat!(
                "SELECT ",
                xray_columns!(),
                " FROM xray_checks WHERE batch_id = $1 ORDER BY checked_at DESC, id DESC"
            ))
            .bind(batch_id.0)
            .fetch_all(conn)
        })?;

        convert_all(rows, xray_from_row)
    }

    async fn latest_for_batch(&self, batch_id: &BatchId) -> AppResult<Option<XRayCheck>> {
        let row = run_in_session!(&self.session, |conn| {
            sqlx::query_as::<_, XRayCheckRow>(concat!(
                "SELECT ",
                xray_columns!(),
                " FROM xray_checks WHERE batch_id = $1 ORDER BY checked_at DESC, id DESC LIMIT 1"
            ))
            .bind(batch_id.0)
            .fetch_optional(conn)
        })?;

        row.map(xray_from_row).transpose()
    }
}
