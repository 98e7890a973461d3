//! 仓储接口
//!
//! 所有仓储通过 [`crate::domain::UnitOfWork`] 获取，同一工作单元内共享一个事务。

mod billing_repository;
mod inventory_repository;
mod logistics_repository;
mod master_data_repository;
mod production_repository;

pub use billing_repository::*;
pub use inventory_repository::*;
pub use logistics_repository::*;
pub use master_data_repository::*;
pub use production_repository::*;
