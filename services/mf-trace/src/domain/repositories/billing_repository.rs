//! 发票仓储接口

use async_trait::async_trait;
use foodtrace_common::{PagedResult, Pagination};
use foodtrace_errors::AppResult;

use crate::domain::entities::{Invoice, InvoiceItem};
use crate::domain::enums::InvoiceStatus;
use crate::domain::value_objects::{CustomerId, InvoiceId, InvoiceItemId};

/// 发票查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<CustomerId>,
}

/// 发票仓储接口
///
/// 读取发票时一并加载发票行；`save`/`update` 只写发票头。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// 在事务中调用时锁定发票头
    async fn find_by_id(&self, id: &InvoiceId) -> AppResult<Option<Invoice>>;

    async fn find_by_number(&self, invoice_number: &str) -> AppResult<Option<Invoice>>;

    async fn save(&self, invoice: &Invoice) -> AppResult<()>;

    async fn update(&self, invoice: &Invoice) -> AppResult<()>;

    async fn delete(&self, id: &InvoiceId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &InvoiceFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Invoice>>;

    async fn find_item(&self, id: &InvoiceItemId) -> AppResult<Option<InvoiceItem>>;

    async fn save_item(&self, item: &InvoiceItem) -> AppResult<()>;

    async fn update_item(&self, item: &InvoiceItem) -> AppResult<()>;

    async fn delete_item(&self, id: &InvoiceItemId) -> AppResult<()>;
}
