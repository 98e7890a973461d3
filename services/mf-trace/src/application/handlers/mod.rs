//! 业务处理器
//!
//! 每个写操作遵循：开启工作单元 → 读取 → 校验 → 保存（含库存变更）→ 提交。
//! 出错时工作单元被丢弃，事务自动回滚。

mod billing;
mod inventory;
mod logistics;
mod master_data;
mod production;
mod quality;
mod traceability;

use std::fmt::Display;
use std::sync::Arc;

use foodtrace_domain_core::{AggregateRoot, Quantity};
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;

use crate::application::commands::Actor;
use crate::domain::UnitOfWorkFactory;

pub struct ServiceHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    /// 成品没有单独的再订货点，统一使用配置值
    product_reorder_level: Quantity,
}

impl ServiceHandler {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, product_reorder_level: Quantity) -> Self {
        Self {
            uow_factory,
            product_reorder_level,
        }
    }
}

/// 记录不存在
pub(crate) fn not_found(entity: &str, id: impl Display) -> AppError {
    AppError::not_found(format!("{} {} not found", entity, id))
}

/// 取出查询结果，不存在时返回 NotFound
pub(crate) fn found<T>(value: Option<T>, entity: &str, id: impl Display) -> AppResult<T> {
    value.ok_or_else(|| not_found(entity, id))
}

/// 被引用的记录不存在视为输入错误
pub(crate) fn referenced<T>(value: Option<T>, entity: &str, id: impl Display) -> AppResult<T> {
    value.ok_or_else(|| AppError::validation(format!("{} {} does not exist", entity, id)))
}

/// 唯一编码冲突
pub(crate) fn duplicate(entity: &str, field: &str, value: &str) -> AppError {
    AppError::conflict(format!("{} with {} {} already exists", entity, field, value))
}

/// 更新审计信息
pub(crate) fn touch<T: AggregateRoot>(entity: &mut T, actor: &Actor) {
    entity.audit_info_mut().update(actor.user_id.clone());
}

/// 非负数量
pub(crate) fn quantity(field: &str, value: Decimal) -> AppResult<Quantity> {
    Quantity::new(value).map_err(|e| AppError::validation(format!("{}: {}", field, e)))
}

/// 正数数量
pub(crate) fn positive_quantity(field: &str, value: Decimal) -> AppResult<Quantity> {
    Quantity::positive(value).map_err(|e| AppError::validation(format!("{}: {}", field, e)))
}

/// 去掉首尾空白，空串视为未填写
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    foodtrace_common::normalize_optional(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantity_helpers() {
        assert!(quantity("Reorder level", dec!(0)).is_ok());
        assert!(quantity("Reorder level", dec!(-1)).is_err());
        assert!(positive_quantity("Quantity", dec!(0)).is_err());
        assert!(matches!(
            positive_quantity("Quantity", dec!(1.2345)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_found_and_referenced() {
        assert!(matches!(
            found::<i32>(None, "Supplier", "x"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            referenced::<i32>(None, "Supplier", "x"),
            Err(AppError::Validation(_))
        ));
        assert_eq!(found(Some(1), "Supplier", "x").unwrap(), 1);
    }
}
