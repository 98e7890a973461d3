//! PostgreSQL Unit of Work 实现

use async_trait::async_trait;
use foodtrace_adapter_postgres::{PgSession, SharedTx, TransactionManager, TransactionOptions};
use foodtrace_errors::AppResult;
use sqlx::PgPool;
use tracing::debug;

use super::repositories::{
    PgCustomerRepository, PgDeliveryFormRepository, PgFinishedProductRepository,
    PgInvoiceRepository, PgProductionBatchRepository, PgProductionMaterialRepository,
    PgProductionStageRepository, PgRawMaterialRepository, PgReceivingFormRepository,
    PgShipmentRepository, PgStockRepository, PgSupplierRepository, PgUserRepository,
    PgXRayCheckRepository,
};
use crate::domain::repositories::{
    CustomerRepository, DeliveryFormRepository, FinishedProductRepository, InvoiceRepository,
    ProductionBatchRepository, ProductionMaterialRepository, ProductionStageRepository,
    RawMaterialRepository, ReceivingFormRepository, ShipmentRepository, StockRepository,
    SupplierRepository, UserRepository, XRayCheckRepository,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Postgres Unit of Work 工厂
#[derive(Clone)]
pub struct PgUnitOfWorkFactory {
    manager: TransactionManager,
    options: TransactionOptions,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            manager: TransactionManager::new(pool),
            options: TransactionOptions::new(),
        }
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.manager.begin_shared(&self.options).await?;
        Ok(Box::new(PgUnitOfWork::transactional(tx)))
    }

    async fn read(&self) -> AppResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(PgUnitOfWork::new(PgSession::pool(
            self.manager.pool().clone(),
        ))))
    }
}

/// Postgres Unit of Work 实现
///
/// 所有仓储共享同一个会话；事务会话在丢弃时由 sqlx 自动回滚。
pub struct PgUnitOfWork {
    tx: Option<SharedTx>,
    suppliers: PgSupplierRepository,
    raw_materials: PgRawMaterialRepository,
    products: PgFinishedProductRepository,
    customers: PgCustomerRepository,
    users: PgUserRepository,
    batches: PgProductionBatchRepository,
    stages: PgProductionStageRepository,
    production_materials: PgProductionMaterialRepository,
    xray_checks: PgXRayCheckRepository,
    receiving_forms: PgReceivingFormRepository,
    shipments: PgShipmentRepository,
    delivery_forms: PgDeliveryFormRepository,
    invoices: PgInvoiceRepository,
    stock: PgStockRepository,
}

impl PgUnitOfWork {
    pub fn new(session: PgSession) -> Self {
        let tx = match &session {
            PgSession::Tx(tx) => Some(tx.clone()),
            PgSession::Pool(_) => None,
        };

        Self {
            tx,
            suppliers: PgSupplierRepository::new(session.clone()),
            raw_materials: PgRawMaterialRepository::new(session.clone()),
            products: PgFinishedProductRepository::new(session.clone()),
            customers: PgCustomerRepository::new(session.clone()),
            users: PgUserRepository::new(session.clone()),
            batches: PgProductionBatchRepository::new(session.clone()),
            stages: PgProductionStageRepository::new(session.clone()),
            production_materials: PgProductionMaterialRepository::new(session.clone()),
            xray_checks: PgXRayCheckRepository::new(session.clone()),
            receiving_forms: PgReceivingFormRepository::new(session.clone()),
            shipments: PgShipmentRepository::new(session.clone()),
            delivery_forms: PgDeliveryFormRepository::new(session.clone()),
            invoices: PgInvoiceRepository::new(session.clone()),
            stock: PgStockRepository::new(session),
        }
    }

    pub fn transactional(tx: SharedTx) -> Self {
        Self::new(PgSession::tx(tx))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
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
        match &self.tx {
            Some(tx) => {
                TransactionManager::commit_shared(tx).await?;
                debug!("Unit of work committed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        match &self.tx {
            Some(tx) => {
                TransactionManager::rollback_shared(tx).await?;
                debug!("Unit of work rolled back");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
