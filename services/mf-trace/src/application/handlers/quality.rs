//! 质检处理：X 光异物检测

use chrono::Utc;
use foodtrace_common::AuditInfo;
use foodtrace_errors::{AppError, AppResult};
use foodtrace_telemetry::record_xray_check;
use tracing::{info, warn};

use super::production::{ensure_user_exists, load_batch};
use super::{ServiceHandler, clean, found, touch};
use crate::application::commands::{Actor, XRayCheckInput};
use crate::domain::entities::{ProductionBatch, XRayCheck};
use crate::domain::enums::{BatchStatus, XRayResult};
use crate::domain::value_objects::{BatchId, XRayCheckId};

/// 已取消的批次不再接受检测
fn ensure_inspectable(batch: &ProductionBatch) -> AppResult<()> {
    if batch.status == BatchStatus::Cancelled {
        return Err(AppError::failed_precondition(format!(
            "Batch {} is cancelled",
            batch.batch_number
        )));
    }
    Ok(())
}

impl ServiceHandler {
    pub async fn create_xray_check(
        &self,
        actor: &Actor,
        batch_id: &BatchId,
        input: XRayCheckInput,
    ) -> AppResult<XRayCheckId> {
        let uow = self.uow_factory.begin().await?;
        let batch = load_batch(uow.as_ref(), batch_id).await?;
        ensure_inspectable(&batch)?;
        ensure_user_exists(uow.as_ref(), input.inspector_id.as_ref()).await?;

        let mut check = XRayCheck {
            id: XRayCheckId::new(),
            batch_id: batch.id,
            inspector_id: input.inspector_id,
            checked_at: input.checked_at.unwrap_or_else(Utc::now),
            sample_size: input.sample_size,
            rejected_count: input.rejected_count,
            foreign_body_detected: input.foreign_body_detected,
            contaminant_type: clean(input.contaminant_type),
            calibration_verified: input.calibration_verified,
            result: XRayResult::Pass,
            notes: clean(input.notes),
            audit_info: AuditInfo::new(actor.user_id.clone()),
        };
        check.refresh_result();
        check.validate()?;

        uow.xray_checks().save(&check).await?;
        uow.commit().await?;

        record_xray_check(check.result.as_str());
        if check.is_failed() {
            warn!(
                xray_check_id = %check.id,
                batch_id = %batch_id,
                rejected = check.rejected_count,
                "X-ray check failed"
            );
        } else {
            info!(xray_check_id = %check.id, batch_id = %batch_id, "X-ray check passed");
        }
        Ok(check.id)
    }

    pub async fn get_xray_check(&self, id: &XRayCheckId) -> AppResult<XRayCheck> {
        let uow = self.uow_factory.read().await?;
        found(uow.xray_checks().find_by_id(id).await?, "X-ray check", id)
    }

    pub async fn list_xray_checks(&self, batch_id: &BatchId) -> AppResult<Vec<XRayCheck>> {
        let uow = self.uow_factory.read().await?;
        load_batch(uow.as_ref(), batch_id).await?;
        uow.xray_checks().list_by_batch(batch_id).await
    }

    /// 更新检测数据，结果随之重新推导
    pub async fn update_xray_check(
        &self,
        actor: &Actor,
        id: &XRayCheckId,
        input: XRayCheckInput,
    ) -> AppResult<XRayResult> {
        let uow = self.uow_factory.begin().await?;
        let mut check = found(uow.xray_checks().find_by_id(id).await?, "X-ray check", id)?;
        let batch = load_batch(uow.as_ref(), &check.batch_id).await?;
        ensure_inspectable(&batch)?;
        ensure_user_exists(uow.as_ref(), input.inspector_id.as_ref()).await?;

        check.inspector_id = input.inspector_id;
        if let Some(checked_at) = input.checked_at {
            check.checked_at = checked_at;
        }
        check.sample_size = input.sample_size;
        check.rejected_count = input.rejected_count;
        check.foreign_body_detected = input.foreign_body_detected;
        check.contaminant_type = clean(input.contaminant_type);
        check.calibration_verified = input.calibration_verified;
        check.notes = clean(input.notes);
        check.refresh_result();
        check.validate()?;

        touch(&mut check, actor);
        uow.xray_checks().update(&check).await?;
        uow.commit().await?;

        info!(xray_check_id = %id, result = %check.result, "X-ray check updated");
        Ok(check.result)
    }

    pub async fn delete_xray_check(&self, id: &XRayCheckId) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        found(uow.xray_checks().find_by_id(id).await?, "X-ray check", id)?;
        uow.xray_checks().delete(id).await?;
        uow.commit().await?;

        info!(xray_check_id = %id, "X-ray check deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{TestUow, handler_with};
    use crate::domain::value_objects::ProductId;
    use chrono::NaiveDate;
    use foodtrace_domain_core::Quantity;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn batch(status: BatchStatus) -> ProductionBatch {
        ProductionBatch {
            id: BatchId::new(),
            batch_number: "B-009".to_string(),
            product_id: ProductId::new(),
            supervisor_id: None,
            planned_quantity: Quantity::new(dec!(100)).unwrap(),
            produced_quantity: None,
            status,
            production_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            expiry_date: None,
            started_at: None,
            completed_at: None,
            notes: None,
            audit_info: AuditInfo::default(),
        }
    }

    fn input(rejected_count: i32, foreign_body_detected: bool) -> XRayCheckInput {
        XRayCheckInput {
            inspector_id: None,
            checked_at: None,
            sample_size: 20,
            rejected_count,
            foreign_body_detected,
            contaminant_type: foreign_body_detected.then(|| "metal".to_string()),
            calibration_verified: true,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_xray_check_derives_fail() {
        let b = batch(BatchStatus::InProgress);
        let batch_id = b.id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.xray_checks
            .expect_save()
            .withf(|c| c.result == XRayResult::Fail && c.contaminant_type.as_deref() == Some("metal"))
            .times(1)
            .returning(|_| Ok(()));
        let committed = uow.commit_flag();

        handler_with(uow)
            .create_xray_check(&Actor::anonymous(), &batch_id, input(0, true))
            .await
            .unwrap();
        assert!(committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_xray_check_on_cancelled_batch() {
        let b = batch(BatchStatus::Cancelled);
        let batch_id = b.id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.xray_checks.expect_save().never();

        let err = handler_with(uow)
            .create_xray_check(&Actor::anonymous(), &batch_id, input(0, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_create_xray_check_rejects_bad_counts() {
        let b = batch(BatchStatus::Completed);
        let batch_id = b.id;
        let mut uow = TestUow::default();
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.xray_checks.expect_save().never();

        let err = handler_with(uow)
            .create_xray_check(&Actor::anonymous(), &batch_id, input(21, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_xray_check_recomputes_result() {
        let b = batch(BatchStatus::InProgress);
        let mut existing = XRayCheck {
            id: XRayCheckId::new(),
            batch_id: b.id,
            inspector_id: None,
            checked_at: Utc::now(),
            sample_size: 20,
            rejected_count: 2,
            foreign_body_detected: false,
            contaminant_type: None,
            calibration_verified: true,
            result: XRayResult::Pass,
            notes: None,
            audit_info: AuditInfo::default(),
        };
        existing.refresh_result();
        let id = existing.id;

        let mut uow = TestUow::default();
        uow.xray_checks
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        uow.batches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(b.clone())));
        uow.xray_checks
            .expect_update()
            .withf(|c| c.result == XRayResult::Pass)
            .times(1)
            .returning(|_| Ok(()));

        let result = handler_with(uow)
            .update_xray_check(&Actor::anonymous(), &id, input(0, false))
            .await
            .unwrap();
        assert_eq!(result, XRayResult::Pass);
    }
}
