//! 生产与质检仓储接口

use async_trait::async_trait;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_errors::AppResult;

use crate::domain::entities::{ProductionBatch, ProductionMaterial, ProductionStage, XRayCheck};
use crate::domain::enums::BatchStatus;
use crate::domain::value_objects::{
    BatchId, ProductId, ProductionMaterialId, RawMaterialId, StageId, XRayCheckId,
};

/// 批次查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchFilter {
    pub status: Option<BatchStatus>,
    pub product_id: Option<ProductId>,
}

/// 生产批次仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductionBatchRepository: Send + Sync {
    /// 在事务中调用时锁定该行
    async fn find_by_id(&self, id: &BatchId) -> AppResult<Option<ProductionBatch>>;

    async fn find_by_number(&self, batch_number: &str) -> AppResult<Option<ProductionBatch>>;

    async fn find_by_ids(&self, ids: &[BatchId]) -> AppResult<Vec<ProductionBatch>>;

    async fn save(&self, batch: &ProductionBatch) -> AppResult<()>;

    async fn update(&self, batch: &ProductionBatch) -> AppResult<()>;

    /// 级联删除工序、投料、X 光记录
    async fn delete(&self, id: &BatchId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &BatchFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ProductionBatch>>;
}

/// 工序仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductionStageRepository: Send + Sync {
    async fn find_by_id(&self, id: &StageId) -> AppResult<Option<ProductionStage>>;

    async fn find_by_sequence(
        &self,
        batch_id: &BatchId,
        sequence: i32,
    ) -> AppResult<Option<ProductionStage>>;

    async fn save(&self, stage: &ProductionStage) -> AppResult<()>;

    async fn update(&self, stage: &ProductionStage) -> AppResult<()>;

    async fn delete(&self, id: &StageId) -> AppResult<()>;

    /// 按工序顺序排列
    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<ProductionStage>>;
}

/// 投料仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductionMaterialRepository: Send + Sync {
    /// 在事务中调用时锁定该行
    async fn find_by_id(&self, id: &ProductionMaterialId)
    -> AppResult<Option<ProductionMaterial>>;

    async fn save(&self, material: &ProductionMaterial) -> AppResult<()>;

    async fn update(&self, material: &ProductionMaterial) -> AppResult<()>;

    async fn delete(&self, id: &ProductionMaterialId) -> AppResult<()>;

    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<ProductionMaterial>>;

    /// 使用了指定原材料批号的投料
    async fn list_by_lot(
        &self,
        raw_material_id: &RawMaterialId,
        lot_number: &str,
    ) -> AppResult<Vec<ProductionMaterial>>;
}

/// X 光检测仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait XRayCheckRepository: Send + Sync {
    async fn find_by_id(&self, id: &XRayCheckId) -> AppResult<Option<XRayCheck>>;

    async fn save(&self, check: &XRayCheck) -> AppResult<()>;

    async fn update(&self, check: &XRayCheck) -> AppResult<()>;

    async fn delete(&self, id: &XRayCheckId) -> AppResult<()>;

    /// 按检测时间倒序
    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<XRayCheck>>;

    async fn latest_for_batch(&self, batch_id: &BatchId) -> AppResult<Option<XRayCheck>>;
}
