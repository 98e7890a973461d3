//! 处理器测试用的 Unit of Work

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use foodtrace_domain_core::Quantity;
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;

use crate::application::ServiceHandler;
use crate::domain::repositories::*;
use crate::domain::{UnitOfWork, UnitOfWorkFactory};

/// 由 mock 仓储组成的工作单元
#[derive(Default)]
pub(crate) struct TestUow {
    pub suppliers: MockSupplierRepository,
    pub raw_materials: MockRawMaterialRepository,
    pub products: MockFinishedProductRepository,
    pub customers: MockCustomerRepository,
    pub users: MockUserRepository,
    pub batches: MockProductionBatchRepository,
    pub stages: MockProductionStageRepository,
    pub production_materials: MockProductionMaterialRepository,
    pub xray_checks: MockXRayCheckRepository,
    pub receiving_forms: MockReceivingFormRepository,
    pub shipments: MockShipmentRepository,
    pub delivery_forms: MockDeliveryFormRepository,
    pub invoices: MockInvoiceRepository,
    pub stock: MockStockRepository,
    /// commit 被调用后置为 true
    pub committed: Arc<AtomicBool>,
}

impl TestUow {
    pub fn commit_flag(&self) -> Arc<AtomicBool> {
        self.committed.clone()
    }

    /// 任意库存变更都成功，余额固定
    pub fn allow_stock_changes(&mut self, balance: Decimal) {
        self.stock
            .expect_apply_delta()
            .returning(move |_, _, _| Ok(Some(Quantity::new(balance).unwrap())));
        self.stock.expect_record_movement().returning(|_| Ok(()));
    }
}

#[async_trait]
impl UnitOfWork for TestUow {
    fn suppliers(&self) -> &dyn SupplierRepository {
        &self.suppliers
    }

    fn raw_materials(&self) -> &dyn RawMaterialRepository {
        &self.raw_materials
    }

    fn products(&self) -> &dyn FinishedProductRepository {
        &self.products
    }

    fn customers(&self) -> &dyn CustomerRepository {
        &self.customers
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn batches(&self) -> &dyn ProductionBatchRepository {
        &self.batches
    }

    fn stages(&self) -> &dyn ProductionStageRepository {
        &self.stages
    }

    fn production_materials(&self) -> &dyn ProductionMaterialRepository {
        &self.production_materials
    }

    fn xray_checks(&self) -> &dyn XRayCheckRepository {
        &self.xray_checks
    }

    fn receiving_forms(&self) -> &dyn ReceivingFormRepository {
        &self.receiving_forms
    }

    fn shipments(&self) -> &dyn ShipmentRepository {
        &self.shipments
    }

    fn delivery_forms(&self) -> &dyn DeliveryFormRepository {
        &self.delivery_forms
    }

    fn invoices(&self) -> &dyn InvoiceRepository {
        &self.invoices
    }

    fn stock(&self) -> &dyn StockRepository {
        &self.stock
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.committed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

/// 只交出一次预先准备好的工作单元
pub(crate) struct TestUowFactory {
    uow: Mutex<Option<TestUow>>,
}

impl TestUowFactory {
    pub fn new(uow: TestUow) -> Self {
        Self {
            uow: Mutex::new(Some(uow)),
        }
    }

    fn take(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let uow = self
            .uow
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| AppError::internal("TestUow already taken"))?;
        Ok(Box::new(uow))
    }
}

#[async_trait]
impl UnitOfWorkFactory for TestUowFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.take()
    }

    async fn read(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.take()
    }
}

/// 用给定工作单元构造处理器，默认成品再订货点为 10
pub(crate) fn handler_with(uow: TestUow) -> ServiceHandler {
    ServiceHandler::new(
        Arc::new(TestUowFactory::new(uow)),
        Quantity::new(Decimal::TEN).unwrap(),
    )
}
