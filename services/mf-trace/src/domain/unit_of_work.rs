//! Unit of Work 模式
//!
//! 提供跨多个 Repository 的事务协调能力，确保单据与库存变更的原子性。

use async_trait::async_trait;
use foodtrace_errors::AppResult;

use crate::domain::repositories::{
    CustomerRepository, DeliveryFormRepository, FinishedProductRepository, InvoiceRepository,
    ProductionBatchRepository, ProductionMaterialRepository, ProductionStageRepository,
    RawMaterialRepository, ReceivingFormRepository, ShipmentRepository, StockRepository,
    SupplierRepository, UserRepository, XRayCheckRepository,
};

/// Unit of Work trait
///
/// 协调多个 Repository 在同一事务中的操作。
///
/// # 使用示例
///
/// ```ignore
/// let uow = uow_factory.begin().await?;
///
/// uow.shipments().save(&shipment).await?;
/// uow.stock().apply_delta(kind, id, -qty).await?;
///
/// uow.commit().await?;
/// ```
///
/// 未提交即被丢弃的工作单元会自动回滚。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn suppliers(&self) -> &dyn SupplierRepository;

    fn raw_materials(&self) -> &dyn RawMaterialRepository;

    fn products(&self) -> &dyn FinishedProductRepository;

    fn customers(&self) -> &dyn CustomerRepository;

    fn users(&self) -> &dyn UserRepository;

    fn batches(&self) -> &dyn ProductionBatchRepository;

    fn stages(&self) -> &dyn ProductionStageRepository;

    fn production_materials(&self) -> &dyn ProductionMaterialRepository;

    fn xray_checks(&self) -> &dyn XRayCheckRepository;

    fn receiving_forms(&self) -> &dyn ReceivingFormRepository;

    fn shipments(&self) -> &dyn ShipmentRepository;

    fn delivery_forms(&self) -> &dyn DeliveryFormRepository;

    fn invoices(&self) -> &dyn InvoiceRepository;

    fn stock(&self) -> &dyn StockRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂 trait
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// 开始新的事务
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// 非事务的只读工作单元，语句直接走连接池
    async fn read(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
