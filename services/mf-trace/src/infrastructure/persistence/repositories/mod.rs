//! PostgreSQL 仓储实现
//!
//! 每个仓储持有一个 [`PgSession`]：工作单元内挂在共享事务上，只读场景直接走连接池。

mod billing;
mod inventory;
mod logistics;
mod master_data;
mod production;

pub use billing::PgInvoiceRepository;
pub use inventory::PgStockRepository;
pub use logistics::{PgDeliveryFormRepository, PgReceivingFormRepository, PgShipmentRepository};
pub use master_data::{
    PgCustomerRepository, PgFinishedProductRepository, PgRawMaterialRepository,
    PgSupplierRepository, PgUserRepository,
};
pub use production::{
    PgProductionBatchRepository, PgProductionMaterialRepository, PgProductionStageRepository,
    PgXRayCheckRepository,
};

use foodtrace_adapter_postgres::PgSession;
use foodtrace_common::{PagedResult, Pagination};

/// 定义挂在会话上的仓储结构
macro_rules! define_pg_repo {
    ($name:ident) => {
        pub struct $name {
            session: foodtrace_adapter_postgres::PgSession,
        }

        impl $name {
            pub fn new(session: impl Into<foodtrace_adapter_postgres::PgSession>) -> Self {
                Self {
                    session: session.into(),
                }
            }
        }
    };
}

pub(crate) use define_pg_repo;

/// 事务内读取待修改的行时加行锁
pub(crate) fn locking<'a>(session: &PgSession, plain: &'a str, for_update: &'a str) -> &'a str {
    if session.is_transactional() {
        for_update
    } else {
        plain
    }
}

/// LIMIT / OFFSET 参数
pub(crate) fn window(pagination: &Pagination) -> (i64, i64) {
    (pagination.limit() as i64, pagination.offset() as i64)
}

pub(crate) fn paged<T>(items: Vec<T>, total: i64, pagination: &Pagination) -> PagedResult<T> {
    PagedResult::new(items, total.max(0) as u64, pagination)
}

/// 模糊查询参数；空白视为不过滤
pub(crate) fn search_term(q: &Option<String>) -> Option<String> {
    q.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn test_search_term_escapes_wildcards() {
        assert_eq!(search_term(&None), None);
        assert_eq!(search_term(&Some("   ".to_string())), None);
        assert_eq!(search_term(&Some(" salt ".to_string())), Some("%salt%".to_string()));
        assert_eq!(search_term(&Some("50%_a".to_string())), Some("%50\\%\\_a%".to_string()));
    }

    #[test]
    fn test_window() {
        assert_eq!(window(&Pagination::new(3, 20)), (20, 40));
    }

    #[tokio::test]
    async fn test_locking_only_inside_transaction() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let session = PgSession::pool(pool);
        assert_eq!(locking(&session, "plain", "locked"), "plain");
    }
}
