//! 生产处理：批次、工序、投料

use foodtrace_common::{AuditInfo, PagedResult, Pagination, UserId};
use foodtrace_errors::{AppError, AppResult};
use foodtrace_telemetry::record_batch_completed;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{ServiceHandler, clean, found, positive_quantity, referenced, touch};
use crate::application::commands::*;
use crate::application::stock::{StockChange, apply_stock_change};
use crate::domain::UnitOfWork;
use crate::domain::entities::{FinishedProduct, ProductionBatch, ProductionMaterial, ProductionStage};
use crate::domain::enums::{BatchStatus, MovementReason, StageStatus, StockItemKind};
use crate::domain::repositories::BatchFilter;
use crate::domain::value_objects::{BatchId, ProductId, ProductionMaterialId, StageId};

pub(crate) async fn load_batch(uow: &dyn UnitOfWork, id: &BatchId) -> AppResult<ProductionBatch> {
    found(uow.batches().find_by_id(id).await?, "Batch", id)
}

async fn load_product(uow: &dyn UnitOfWork, id: &ProductId) -> AppResult<FinishedProduct> {
    referenced(uow.products().find_by_id(id).await?, "Product", id)
}

/// 校验引用的用户存在（操作员、检验员、收货人）
pub(crate) async fn ensure_user_exists(uow: &dyn UnitOfWork, id: Option<&UserId>) -> AppResult<()> {
    if let Some(id) = id {
        referenced(uow.users().find_by_id(id).await?, "User", id)?;
    }
    Ok(())
}

impl ServiceHandler {
    // ========== 生产批次 ==========

    pub async fn create_batch(&self, actor: &Actor, input: BatchInput) -> AppResult<BatchId> {
        let planned = positive_quantity("Planned quantity", input.planned_quantity)?;

        let uow = self.uow_factory.begin().await?;
        let product = load_product(uow.as_ref(), &input.product_id).await?;
        if let Some(supervisor_id) = &input.supervisor_id {
            let supervisor = referenced(
                uow.users().find_by_id(supervisor_id).await?,
                "User",
                supervisor_id,
            )?;
            supervisor.ensure_can_supervise()?;
        }

        let batch = ProductionBatch {
            id: BatchId::new(),
            batch_number: input.batch_number.trim().to_string(),
            product_id: product.id,
            supervisor_id: input.supervisor_id,
            planned_quantity: planned,
            produced_quantity: None,
            status: BatchStatus::Planned,
            production_date: input.production_date,
            expiry_date: input
                .expiry_date
                .or_else(|| product.expiry_for(input.production_date)),
            started_at: None,
            completed_at: None,
            notes: clean(input.notes),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        batch.validate()?;

        if uow.batches().find_by_number(&batch.batch_number).await?.is_some() {
            return Err(super::duplicate("Batch", "number", &batch.batch_number));
        }
        uow.batches().save(&batch).await?;
        uow.commit().await?;

        info!(batch_id = %batch.id, batch_number = %batch.batch_number, product_id = %batch.product_id, "Batch created");
        Ok(batch.id)
    }

    pub async fn get_batch(&self, id: &BatchId) -> AppResult<ProductionBatch> {
        let uow = self.uow_factory.read().await?;
        load_batch(uow.as_ref(), id).await
    }

    pub async fn list_batches(
        &self,
        filter: &BatchFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ProductionBatch>> {
        let uow = self.uow_factory.read().await?;
        uow.batches().list(filter, pagination).await
    }

    /// 更新批次基本信息，仅限 planned/in_progress；开工后不能更换成品
    pub async fn update_batch(&self, actor: &Actor, id: &BatchId, input: BatchInput) -> AppResult<()> {
        let planned = positive_quantity("Planned quantity", input.planned_quantity)?;

        let uow = self.uow_factory.begin().await?;
        let mut batch = load_batch(uow.as_ref(), id).await?;
        batch.ensure_open()?;

        if input.product_id != batch.product_id && batch.status != BatchStatus::Planned {
            return Err(AppError::failed_precondition(format!(
                "Batch {} has started, its product cannot be changed",
                batch.batch_number
            )));
        }
        let product = load_product(uow.as_ref(), &input.product_id).await?;

        if input.supervisor_id != batch.supervisor_id {
            if let Some(supervisor_id) = &input.supervisor_id {
                let supervisor = referenced(
                    uow.users().find_by_id(supervisor_id).await?,
                    "User",
                    supervisor_id,
                )?;
                supervisor.ensure_can_supervise()?;
            }
        }

        batch.batch_number = input.batch_number.trim().to_string();
        batch.product_id = product.id;
        batch.supervisor_id = input.supervisor_id;
        batch.planned_quantity = planned;
        batch.production_date = input.production_date;
        batch.expiry_date = input
            .expiry_date
            .or_else(|| product.expiry_for(input.production_date));
        batch.notes = clean(input.notes);
        batch.validate()?;

        if let Some(other) = uow.batches().find_by_number(&batch.batch_number).await? {
            if other.id != batch.id {
                return Err(super::duplicate("Batch", "number", &batch.batch_number));
            }
        }

        touch(&mut batch, actor);
        uow.batches().update(&batch).await?;
        uow.commit().await?;

        info!(batch_id = %id, "Batch updated");
        Ok(())
    }

    pub async fn start_batch(&self, actor: &Actor, id: &BatchId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut batch = load_batch(uow.as_ref(), id).await?;
        batch.start()?;
        touch(&mut batch, actor);
        uow.batches().update(&batch).await?;
        uow.commit().await?;

        info!(batch_id = %id, "Batch started");
        Ok(())
    }

    /// 完工：成品入库；最近一次 X 光检测不合格时拒绝
    pub async fn complete_batch(
        &self,
        actor: &Actor,
        id: &BatchId,
        input: CompleteBatchInput,
    ) -> AppResult<()> {
        let produced = positive_quantity("Produced quantity", input.produced_quantity)?;

        let uow = self.uow_factory.begin().await?;
        let mut batch = load_batch(uow.as_ref(), id).await?;

        if let Some(check) = uow.xray_checks().latest_for_batch(id).await? {
            if check.is_failed() {
                warn!(batch_id = %id, xray_check_id = %check.id, "Batch completion blocked by failed X-ray check");
                return Err(AppError::failed_precondition(format!(
                    "Batch {} failed its latest X-ray check",
                    batch.batch_number
                )));
            }
        }

        batch.complete(produced)?;
        touch(&mut batch, actor);
        uow.batches().update(&batch).await?;

        let change = StockChange::new(
            StockItemKind::FinishedProduct,
            batch.product_id.into(),
            produced.value(),
            MovementReason::ProductionOutput,
        )
        .reference(batch.id);
        apply_stock_change(uow.as_ref(), change, actor).await?;
        uow.commit().await?;

        record_batch_completed();
        info!(batch_id = %id, produced = %produced, "Batch completed");
        Ok(())
    }

    /// 取消批次；已投料不退回库存
    pub async fn cancel_batch(&self, actor: &Actor, id: &BatchId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut batch = load_batch(uow.as_ref(), id).await?;
        batch.cancel()?;
        touch(&mut batch, actor);
        uow.batches().update(&batch).await?;
        uow.commit().await?;

        info!(batch_id = %id, "Batch cancelled");
        Ok(())
    }

    /// 删除批次：退回全部投料，冲销完工入库，然后级联删除
    pub async fn delete_batch(&self, actor: &Actor, id: &BatchId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let batch = load_batch(uow.as_ref(), id).await?;

        let shipments = uow.shipments().list_by_batch(id).await?;
        if !shipments.is_empty() {
            return Err(AppError::conflict(format!(
                "Batch {} is referenced by {} shipment(s)",
                batch.batch_number,
                shipments.len()
            )));
        }

        for material in uow.production_materials().list_by_batch(id).await? {
            let change = StockChange::new(
                StockItemKind::RawMaterial,
                material.raw_material_id.into(),
                material.quantity_used.value(),
                MovementReason::ConsumptionReversal,
            )
            .reference(material.id);
            apply_stock_change(uow.as_ref(), change, actor).await?;
        }

        if batch.status == BatchStatus::Completed {
            if let Some(produced) = batch.produced_quantity {
                let change = StockChange::new(
                    StockItemKind::FinishedProduct,
                    batch.product_id.into(),
                    -produced.value(),
                    MovementReason::ProductionReversal,
                )
                .reference(batch.id);
                apply_stock_change(uow.as_ref(), change, actor).await?;
            }
        }

        uow.batches().delete(id).await?;
        uow.commit().await?;

        info!(batch_id = %id, batch_number = %batch.batch_number, "Batch deleted");
        Ok(())
    }

    // ========== 工序 ==========

    pub async fn create_stage(
        &self,
        actor: &Actor,
        batch_id: &BatchId,
        input: StageInput,
    ) -> AppResult<StageId> {
        let uow = self.uow_factory.begin().await?;
        let batch = load_batch(uow.as_ref(), batch_id).await?;
        batch.ensure_open()?;
        ensure_user_exists(uow.as_ref(), input.operator_id.as_ref()).await?;

        let stage = ProductionStage {
            id: StageId::new(),
            batch_id: batch.id,
            name: input.name.trim().to_string(),
            sequence: input.sequence,
            status: StageStatus::Pending,
            operator_id: input.operator_id,
            started_at: None,
            completed_at: None,
            temperature_c: input.temperature_c,
            notes: clean(input.notes),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        stage.validate()?;

        if uow
            .stages()
            .find_by_sequence(batch_id, stage.sequence)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Batch {} already has a stage with sequence {}",
                batch.batch_number, stage.sequence
            )));
        }
        uow.stages().save(&stage).await?;
        uow.commit().await?;

        info!(stage_id = %stage.id, batch_id = %batch_id, sequence = stage.sequence, "Stage created");
        Ok(stage.id)
    }

    pub async fn get_stage(&self, id: &StageId) -> AppResult<ProductionStage> {
        let uow = self.uow_factory.read().await?;
        found(uow.stages().find_by_id(id).await?, "Stage", id)
    }

    pub async fn list_stages(&self, batch_id: &BatchId) -> AppResult<Vec<ProductionStage>> {
        let uow = self.uow_factory.read().await?;
        load_batch(uow.as_ref(), batch_id).await?;
        uow.stages().list_by_batch(batch_id).await
    }

    pub async fn update_stage(&self, actor: &Actor, id: &StageId, input: StageInput) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut stage = found(uow.stages().find_by_id(id).await?, "Stage", id)?;
        let batch = load_batch(uow.as_ref(), &stage.batch_id).await?;
        batch.ensure_open()?;
        ensure_user_exists(uow.as_ref(), input.operator_id.as_ref()).await?;

        stage.name = input.name.trim().to_string();
        stage.sequence = input.sequence;
        stage.operator_id = input.operator_id;
        stage.temperature_c = input.temperature_c;
        stage.notes = clean(input.notes);
        stage.validate()?;

        if let Some(other) = uow
            .stages()
            .find_by_sequence(&stage.batch_id, stage.sequence)
            .await?
        {
            if other.id != stage.id {
                return Err(AppError::conflict(format!(
                    "Batch {} already has a stage with sequence {}",
                    batch.batch_number, stage.sequence
                )));
            }
        }

        touch(&mut stage, actor);
        uow.stages().update(&stage).await?;
        uow.commit().await?;

        info!(stage_id = %id, "Stage updated");
        Ok(())
    }

    pub async fn start_stage(&self, actor: &Actor, id: &StageId) -> AppResult<()> {
        self.transition_stage(actor, id, ProductionStage::start, "started")
            .await
    }

    pub async fn complete_stage(&self, actor: &Actor, id: &StageId) -> AppResult<()> {
        self.transition_stage(actor, id, ProductionStage::complete, "completed")
            .await
    }

    async fn transition_stage(
        &self,
        actor: &Actor,
        id: &StageId,
        transition: fn(&mut ProductionStage) -> AppResult<()>,
        label: &str,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let mut stage = found(uow.stages().find_by_id(id).await?, "Stage", id)?;
        load_batch(uow.as_ref(), &stage.batch_id).await?.ensure_open()?;

        transition(&mut stage)?;
        touch(&mut stage, actor);
        uow.stages().update(&stage).await?;
        uow.commit().await?;

        info!(stage_id = %id, "Stage {}", label);
        Ok(())
    }

    pub async fn delete_stage(&self, id: &StageId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let stage = found(uow.stages().find_by_id(id).await?, "Stage", id)?;
        load_batch(uow.as_ref(), &stage.batch_id).await?.ensure_open()?;
        uow.stages().delete(id).await?;
        uow.commit().await?;

        info!(stage_id = %id, "Stage deleted");
        Ok(())
    }

    // ========== 投料 ==========

    /// 投料：扣减原材料库存，不足时返回 Conflict
    pub async fn add_material(
        &self,
        actor: &Actor,
        batch_id: &BatchId,
        input: MaterialUsageInput,
    ) -> AppResult<ProductionMaterialId> {
        let quantity_used = positive_quantity("Quantity used", input.quantity_used)?;

        let uow = self.uow_factory.begin().await?;
        let batch = load_batch(uow.as_ref(), batch_id).await?;
        batch.ensure_open()?;
        referenced(
            uow.raw_materials().find_by_id(&input.raw_material_id).await?,
            "Raw material",
            input.raw_material_id,
        )?;

        let material = ProductionMaterial {
            id: ProductionMaterialId::new(),
            batch_id: batch.id,
            raw_material_id: input.raw_material_id,
            quantity_used,
            lot_number: clean(input.lot_number),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        material.validate()?;
        uow.production_materials().save(&material).await?;

        let change = StockChange::new(
            StockItemKind::RawMaterial,
            material.raw_material_id.into(),
            -quantity_used.value(),
            MovementReason::Consumption,
        )
        .reference(material.id);
        apply_stock_change(uow.as_ref(), change, actor).await?;
        uow.commit().await?;

        info!(
            material_id = %material.id,
            batch_id = %batch_id,
            raw_material_id = %material.raw_material_id,
            quantity = %quantity_used,
            "Material consumed"
        );
        Ok(material.id)
    }

    pub async fn get_material(&self, id: &ProductionMaterialId) -> AppResult<ProductionMaterial> {
        let uow = self.uow_factory.read().await?;
        found(uow.production_materials().find_by_id(id).await?, "Production material", id)
    }

    pub async fn list_materials(&self, batch_id: &BatchId) -> AppResult<Vec<ProductionMaterial>> {
        let uow = self.uow_factory.read().await?;
        load_batch(uow.as_ref(), batch_id).await?;
        uow.production_materials().list_by_batch(batch_id).await
    }

    /// 修改投料：数量差额或更换原材料在同一事务内反映到库存
    pub async fn update_material(
        &self,
        actor: &Actor,
        id: &ProductionMaterialId,
        input: MaterialUsageInput,
    ) -> AppResult<()> {
        let quantity_used = positive_quantity("Quantity used", input.quantity_used)?;

        let uow = self.uow_factory.begin().await?;
        let mut material = found(
            uow.production_materials().find_by_id(id).await?,
            "Production material",
            id,
        )?;
        load_batch(uow.as_ref(), &material.batch_id).await?.ensure_open()?;

        let old_raw = material.raw_material_id;
        let old_qty = material.quantity_used;

        if input.raw_material_id != old_raw {
            referenced(
                uow.raw_materials().find_by_id(&input.raw_material_id).await?,
                "Raw material",
                input.raw_material_id,
            )?;
            let give_back = StockChange::new(
                StockItemKind::RawMaterial,
                old_raw.into(),
                old_qty.value(),
                MovementReason::ConsumptionReversal,
            )
            .reference(material.id);
            apply_stock_change(uow.as_ref(), give_back, actor).await?;

            let take = StockChange::new(
                StockItemKind::RawMaterial,
                input.raw_material_id.into(),
                -quantity_used.value(),
                MovementReason::Consumption,
            )
            .reference(material.id);
            apply_stock_change(uow.as_ref(), take, actor).await?;
        } else {
            let delta = old_qty.value() - quantity_used.value();
            let reason = if delta > Decimal::ZERO {
                MovementReason::ConsumptionReversal
            } else {
                MovementReason::Consumption
            };
            let change = StockChange::new(StockItemKind::RawMaterial, old_raw.into(), delta, reason)
                .reference(material.id);
            apply_stock_change(uow.as_ref(), change, actor).await?;
        }

        material.raw_material_id = input.raw_material_id;
        material.quantity_used = quantity_used;
        material.lot_number = clean(input.lot_number);
        material.validate()?;
        touch(&mut material, actor);
        uow.production_materials().update(&material).await?;
        uow.commit().await?;

        info!(material_id = %id, "Material usage updated");
        Ok(())
    }

    /// 删除投料并退回库存
    pub async fn delete_material(&self, actor: &Actor, id: &ProductionMaterialId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let material = found(
            uow.production_materials().find_by_id(id).await?,
            "Production material",
            id,
        )?;
        load_batch(uow.as_ref(), &material.batch_id).await?.ensure_open()?;

        let change = StockChange::new(
            StockItemKind::RawMaterial,
            material.raw_material_id.into(),
            material.quantity_used.value(),
            MovementReason::ConsumptionReversal,
        )
        .reference(material.id);
        apply_stock_change(uow.as_ref(), change, actor).await?;
        uow.production_materials().delete(id).await?;
        uow.commit().await?;

        info!(material_id = %id, "Material usage deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{TestUow, handler_with};
    use crate::domain::entities::{RawMaterial, Shipment, User, XRayCheck};
    use crate::domain::enums::{ShipmentStatus, UserRole, XRayResult};
    use crate::domain::value_objects::{CustomerId, RawMaterialId, ShipmentId, XRayCheckId};
    use chrono::{NaiveDate, Utc};
    use foodtrace_domain_core::Quantity;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn product(shelf_life_days: Option<i32>) -> FinishedProduct {
        FinishedProduct {
            id: ProductId::new(),
            sku: "BRD-WHT".to_string(),
            name: "White bread".to_string(),
            description: None,
            unit: "loaf".to_string(),
            unit_price: dec!(2.50),
            quantity_in_stock: Quantity::new(dec!(100)).unwrap(),
            shelf_life_days,
            audit_info: AuditInfo::default(),
        }
    }

    fn batch(status: BatchStatus) -> ProductionBatch {
        ProductionBatch {
            id: BatchId::new(),
            batch_number: "B-001".to_string(),
            product_id: ProductId::new(),
            supervisor_id: None,
            planned_quantity: Quantity::new(dec!(500)).unwrap(),
            produced_quantity: None,
            status,
            production_date: date(1),
            expiry_date: None,
            started_at: None,
            completed_at: None,
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    fn batch_input(product_id: ProductId) -> BatchInput {
        BatchInput {
            batch_number: "B-001".to_string(),
            product_id,
            supervisor_id: None,
            planned_quantity: dec!(500),
            production_date: date(1),
            expiry_date: None,
            notes: None,
        }
    }

    fn raw_material() -> RawMaterial {
        RawMaterial {
            id: RawMaterialId::new(),
            code: "FLR".to_string(),
            name: "Flour".to_string(),
            description: None,
            supplier_id: None,
            unit: "kg".to_string(),
            quantity_in_stock: Quantity::new(dec!(100)).unwrap(),
            reorder_level: Quantity::new(dec!(10)).unwrap(),
            unit_cost: dec!(0.8),
            allergens: Some("gluten".to_string()),
            storage_conditions: None,
            audit_info: AuditInfo::default(),
        }
    }

    fn usage(batch_id: BatchId, raw_material_id: RawMaterialId, qty: Decimal) -> ProductionMaterial {
        ProductionMaterial {
            id: ProductionMaterialId::new(),
            batch_id,
            raw_material_id,
            quantity_used: Quantity::new(qty).unwrap(),
            lot_number: Some("LOT-1".to_string()),
            audit_info: AuditInfo::default(),
        }
    }

    fn xray(batch_id: BatchId, result: XRayResult) -> XRayCheck {
        XRayCheck {
            id: XRayCheckId::new(),
            batch_id,
            inspector_id: None,
            checked_at: Utc::now(),
            sample_size: 50,
            rejected_count: if result == XRayResult::Fail { 1 } else { 0 },
            foreign_body_detected: result == XRayResult::Fail,
            contaminant_type: None,
            calibration_verified: true,
            result,
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_create_batch_defaults_expiry_from_shelf_life() {
        let p = product(Some(5));
        let product_id = p.id;
        let mut uow = TestUow::default();
        uow.products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(p.clone())));
        uow.batches
            .expect_find_by_number()
            .with(eq("B-001"))
            .returning(|_| Ok(None));
        uow.batches
            .expect_save()
            .withf(|b| b.status == BatchStatus::Planned && b.expiry_date == Some(date(6)))
            .times(1)
            .returning(|_| Ok(()));
        let committed = uow.commit_flag();

        let handler = handler_with(uow);
        handler
            .create_batch(&Actor::anonymous(), batch_input(product_id))
            .await
            .unwrap();
        assert!(committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_batch_rejects_operator_as_supervisor() {
        let p = product(None);
        let product_id = p.id;
        let operator = User {
            id: UserId::new(),
            username: "op".to_string(),
            full_name: "Line Operator".to_string(),
            email: None,
            role: UserRole::Operator,
            is_active: true,
            audit_info: AuditInfo::default(),
        };
        let supervisor_id = operator.id.clone();

        let mut uow = TestUow::default();
        uow.products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(p.clone())));
        uow.users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(operator.clone())));
        uow.batches.expect_save().never();

        let mut input = batch_input(product_id);
        input.supervisor_id = Some(supervisor_id);
        let err = handler_with(uow)
            .create_batch(&Actor::anonymous(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_batch_unknown_product() {
        let mut uow = TestUow::default();
        uow.products.expect_find_by_id().returning(|_| Ok(None));

        let err = handler_with(uow)
            .create_batch(&Actor::anonymous(), batch_input(ProductId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_complete_batch_adds_finished_stock() {
        let b = batch(BatchStatus::InProgress);
        let (batch_id, product_id) = (b.id, b.product_id);
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.xray_checks
            .expect_latest_for_batch()
            .returning(move |_| Ok(Some(xray(batch_id, XRayResult::Pass))));
        uow.batches
            .expect_update()
            .withf(|b| b.status == BatchStatus::Completed)
            .times(1)
            .returning(|_| Ok(()));
        uow.stock
            .expect_apply_delta()
            .withf(move |kind, id, delta| {
                *kind == StockItemKind::FinishedProduct
                    && *id == uuid::Uuid::from(product_id)
                    && *delta == dec!(480)
            })
            .times(1)
            .returning(|_, _, _| Ok(Some(Quantity::new(dec!(580)).unwrap())));
        uow.stock
            .expect_record_movement()
            .withf(|m| m.reason == MovementReason::ProductionOutput)
            .times(1)
            .returning(|_| Ok(()));
        let committed = uow.commit_flag();

        handler_with(uow)
            .complete_batch(
                &Actor::anonymous(),
                &batch_id,
                CompleteBatchInput {
                    produced_quantity: dec!(480),
                },
            )
            .await
            .unwrap();
        assert!(committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_complete_batch_blocked_by_failed_xray() {
        let b = batch(BatchStatus::InProgress);
        let batch_id = b.id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.xray_checks
            .expect_latest_for_batch()
            .returning(move |_| Ok(Some(xray(batch_id, XRayResult::Fail))));
        uow.batches.expect_update().never();
        uow.stock.expect_apply_delta().never();

        let err = handler_with(uow)
            .complete_batch(
                &Actor::anonymous(),
                &batch_id,
                CompleteBatchInput {
                    produced_quantity: dec!(480),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_delete_batch_with_shipments_conflicts() {
        let b = batch(BatchStatus::Completed);
        let batch_id = b.id;
        let product_id = b.product_id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.shipments.expect_list_by_batch().returning(move |_| {
            Ok(vec![Shipment {
                id: ShipmentId::new(),
                shipment_number: "SH-1".to_string(),
                customer_id: CustomerId::new(),
                product_id,
                batch_id: Some(batch_id),
                quantity: Quantity::new(dec!(10)).unwrap(),
                shipment_date: date(2),
                status: ShipmentStatus::Pending,
                carrier: None,
                tracking_number: None,
                notes: None,
                audit_info: AuditInfo::default(),
            }])
        });
        uow.batches.expect_delete().never();

        let err = handler_with(uow)
            .delete_batch(&Actor::anonymous(), &batch_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_completed_batch_reverses_stock() {
        let mut b = batch(BatchStatus::Completed);
        b.produced_quantity = Some(Quantity::new(dec!(40)).unwrap());
        let batch_id = b.id;
        let flour = RawMaterialId::new();
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.shipments.expect_list_by_batch().returning(|_| Ok(vec![]));
        uow.production_materials
            .expect_list_by_batch()
            .returning(move |_| Ok(vec![usage(batch_id, flour, dec!(25))]));
        uow.stock
            .expect_apply_delta()
            .withf(|kind, _, delta| *kind == StockItemKind::RawMaterial && *delta == dec!(25))
            .times(1)
            .returning(|_, _, _| Ok(Some(Quantity::new(dec!(125)).unwrap())));
        uow.stock
            .expect_apply_delta()
            .withf(|kind, _, delta| *kind == StockItemKind::FinishedProduct && *delta == dec!(-40))
            .times(1)
            .returning(|_, _, _| Ok(Some(Quantity::new(dec!(0)).unwrap())));
        uow.stock.expect_record_movement().times(2).returning(|_| Ok(()));
        uow.batches
            .expect_delete()
            .with(eq(batch_id))
            .times(1)
            .returning(|_| Ok(()));
        let committed = uow.commit_flag();

        handler_with(uow)
            .delete_batch(&Actor::anonymous(), &batch_id)
            .await
            .unwrap();
        assert!(committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_stage_duplicate_sequence() {
        let b = batch(BatchStatus::InProgress);
        let batch_id = b.id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.stages.expect_find_by_sequence().returning(move |_, seq| {
            Ok(Some(ProductionStage {
                id: StageId::new(),
                batch_id,
                name: "Mixing".to_string(),
                sequence: seq,
                status: StageStatus::Pending,
                operator_id: None,
                started_at: None,
                completed_at: None,
                temperature_c: None,
                notes: None,
                audit_info: AuditInfo::default(),
            }))
        });
        uow.stages.expect_save().never();

        let err = handler_with(uow)
            .create_stage(
                &Actor::anonymous(),
                &batch_id,
                StageInput {
                    name: "Proofing".to_string(),
                    sequence: 1,
                    operator_id: None,
                    temperature_c: Some(dec!(32)),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_add_material_insufficient_stock() {
        let b = batch(BatchStatus::InProgress);
        let batch_id = b.id;
        let flour = raw_material();
        let flour_id = flour.id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.raw_materials
            .expect_find_by_id()
            .returning(move |_| Ok(Some(flour.clone())));
        uow.production_materials.expect_save().returning(|_| Ok(()));
        uow.stock.expect_apply_delta().returning(|_, _, _| Ok(None));
        uow.stock
            .expect_current_level()
            .returning(|_, _| Ok(Some(Quantity::new(dec!(5)).unwrap())));
        uow.stock.expect_record_movement().never();
        let committed = uow.commit_flag();

        let err = handler_with(uow)
            .add_material(
                &Actor::anonymous(),
                &batch_id,
                MaterialUsageInput {
                    raw_material_id: flour_id,
                    quantity_used: dec!(25),
                    lot_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(!committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_add_material_to_completed_batch() {
        let b = batch(BatchStatus::Completed);
        let batch_id = b.id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));

        let err = handler_with(uow)
            .add_material(
                &Actor::anonymous(),
                &batch_id,
                MaterialUsageInput {
                    raw_material_id: RawMaterialId::new(),
                    quantity_used: dec!(1),
                    lot_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_update_material_applies_difference() {
        let b = batch(BatchStatus::InProgress);
        let batch_id = b.id;
        let flour = RawMaterialId::new();
        let existing = usage(batch_id, flour, dec!(25));
        let id = existing.id;
        let mut uow = TestUow::default();
        uow.production_materials
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.stock
            .expect_apply_delta()
            .withf(|_, _, delta| *delta == dec!(-5))
            .times(1)
            .returning(|_, _, _| Ok(Some(Quantity::new(dec!(70)).unwrap())));
        uow.stock
            .expect_record_movement()
            .withf(|m| m.reason == MovementReason::Consumption)
            .times(1)
            .returning(|_| Ok(()));
        uow.production_materials
            .expect_update()
            .withf(|m| m.quantity_used.value() == dec!(30))
            .times(1)
            .returning(|_| Ok(()));

        handler_with(uow)
            .update_material(
                &Actor::anonymous(),
                &id,
                MaterialUsageInput {
                    raw_material_id: flour,
                    quantity_used: dec!(30),
                    lot_number: Some("LOT-1".to_string()),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_material_returns_stock() {
        let b = batch(BatchStatus::InProgress);
        let existing = usage(b.id, RawMaterialId::new(), dec!(12.5));
        let id = existing.id;
        let mut uow = TestUow::default();
        uow.production_materials
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.stock
            .expect_apply_delta()
            .withf(|_, _, delta| *delta == dec!(12.5))
            .times(1)
            .returning(|_, _, _| Ok(Some(Quantity::new(dec!(50)).unwrap())));
        uow.stock
            .expect_record_movement()
            .withf(|m| m.reason == MovementReason::ConsumptionReversal)
            .returning(|_| Ok(()));
        uow.production_materials
            .expect_delete()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(()));

        handler_with(uow)
            .delete_material(&Actor::anonymous(), &id)
            .await
            .unwrap();
    }
}
