//! 物流仓储接口

use async_trait::async_trait;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_errors::AppResult;

use crate::domain::entities::{DeliveryForm, ReceivingForm, Shipment};
use crate::domain::enums::ShipmentStatus;
use crate::domain::value_objects::{
    BatchId, CustomerId, DeliveryFormId, RawMaterialId, ReceivingFormId, ShipmentId, SupplierId,
};

/// 收货单查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceivingFormFilter {
    pub supplier_id: Option<SupplierId>,
    pub raw_material_id: Option<RawMaterialId>,
    pub lot_number: Option<String>,
}

/// 发货单查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub customer_id: Option<CustomerId>,
    pub batch_id: Option<BatchId>,
}

/// 收货单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceivingFormRepository: Send + Sync {
    /// 在事务中调用时锁定该行
    async fn find_by_id(&self, id: &ReceivingFormId) -> AppResult<Option<ReceivingForm>>;

    async fn find_by_number(&self, form_number: &str) -> AppResult<Option<ReceivingForm>>;

    async fn save(&self, form: &ReceivingForm) -> AppResult<()>;

    async fn update(&self, form: &ReceivingForm) -> AppResult<()>;

    async fn delete(&self, id: &ReceivingFormId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &ReceivingFormFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ReceivingForm>>;

    async fn list_by_lot(
        &self,
        raw_material_id: &RawMaterialId,
        lot_number: &str,
    ) -> AppResult<Vec<ReceivingForm>>;
}

/// 发货单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// 在事务中调用时锁定该行
    async fn find_by_id(&self, id: &ShipmentId) -> AppResult<Option<Shipment>>;

    async fn find_by_number(&self, shipment_number: &str) -> AppResult<Option<Shipment>>;

    async fn save(&self, shipment: &Shipment) -> AppResult<()>;

    async fn update(&self, shipment: &Shipment) -> AppResult<()>;

    async fn delete(&self, id: &ShipmentId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &ShipmentFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Shipment>>;

    async fn list_by_batch(&self, batch_id: &BatchId) -> AppResult<Vec<Shipment>>;
}

/// 签收单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryFormRepository: Send + Sync {
    async fn find_by_id(&self, id: &DeliveryFormId) -> AppResult<Option<DeliveryForm>>;

    async fn find_by_shipment(&self, shipment_id: &ShipmentId)
    -> AppResult<Option<DeliveryForm>>;

    async fn save(&self, form: &DeliveryForm) -> AppResult<()>;

    async fn update(&self, form: &DeliveryForm) -> AppResult<()>;

    async fn delete(&self, id: &DeliveryFormId) -> AppResult<()>;
}
