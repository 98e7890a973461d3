//! 主数据仓储接口

use async_trait::async_trait;
use foodtrace_common::{PagedResult, Pagination, UserId};
use foodtrace_domain_core::Quantity;
use foodtrace_errors::AppResult;

use crate::domain::entities::{Customer, FinishedProduct, RawMaterial, Supplier, User};
use crate::domain::enums::UserRole;
use crate::domain::value_objects::{CustomerId, ProductId, RawMaterialId, SupplierId};

/// 关键字过滤（名称或编码，不区分大小写）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFilter {
    pub q: Option<String>,
}

/// 原材料查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMaterialFilter {
    pub q: Option<String>,
    pub supplier_id: Option<SupplierId>,
}

/// 用户查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub q: Option<String>,
    pub role: Option<UserRole>,
    pub active_only: bool,
}

/// 供应商仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn find_by_id(&self, id: &SupplierId) -> AppResult<Option<Supplier>>;

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Supplier>>;

    async fn save(&self, supplier: &Supplier) -> AppResult<()>;

    async fn update(&self, supplier: &Supplier) -> AppResult<()>;

    /// 仍被原材料或收货单引用时返回 Conflict
    async fn delete(&self, id: &SupplierId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Supplier>>;
}

/// 原材料仓储接口
///
/// 不负责库存数量的变更，库存只通过 [`super::StockRepository`] 修改。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RawMaterialRepository: Send + Sync {
    async fn find_by_id(&self, id: &RawMaterialId) -> AppResult<Option<RawMaterial>>;

    async fn find_by_code(&self, code: &str) -> AppResult<Option<RawMaterial>>;

    async fn save(&self, material: &RawMaterial) -> AppResult<()>;

    async fn update(&self, material: &RawMaterial) -> AppResult<()>;

    async fn delete(&self, id: &RawMaterialId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &RawMaterialFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RawMaterial>>;

    /// 库存不高于再订货点的原材料
    async fn list_low_stock(&self) -> AppResult<Vec<RawMaterial>>;
}

/// 成品仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FinishedProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> AppResult<Option<FinishedProduct>>;

    async fn find_by_sku(&self, sku: &str) -> AppResult<Option<FinishedProduct>>;

    async fn save(&self, product: &FinishedProduct) -> AppResult<()>;

    async fn update(&self, product: &FinishedProduct) -> AppResult<()>;

    async fn delete(&self, id: &ProductId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<FinishedProduct>>;

    /// 库存不高于 `threshold` 的成品
    async fn list_low_stock(&self, threshold: Quantity) -> AppResult<Vec<FinishedProduct>>;
}

/// 客户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> AppResult<Option<Customer>>;

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Customer>>;

    async fn save(&self, customer: &Customer) -> AppResult<()>;

    async fn update(&self, customer: &Customer) -> AppResult<()>;

    async fn delete(&self, id: &CustomerId) -> AppResult<()>;

    async fn list(
        &self,
        filter: &TextFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<Customer>>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn save(&self, user: &User) -> AppResult<()>;

    async fn update(&self, user: &User) -> AppResult<()>;

    async fn delete(&self, id: &UserId) -> AppResult<()>;

    async fn list(&self, filter: &UserFilter, pagination: &Pagination)
    -> AppResult<PagedResult<User>>;
}
