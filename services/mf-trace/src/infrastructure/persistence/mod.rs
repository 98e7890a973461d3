//! 持久化实现

mod converters;
mod repositories;
mod rows;
mod unit_of_work;

pub use repositories::*;
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkFactory};

use foodtrace_adapter_postgres::{Migration, MigrationManager};
use foodtrace_errors::AppResult;
use sqlx::PgPool;
use tracing::info;

/// 内嵌的数据库迁移
pub fn migrations() -> Vec<Migration> {
    vec![Migration::new(
        1,
        "init",
        include_str!("../../../migrations/0001_init.sql"),
    )]
}

/// 应用待执行的迁移
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let result = MigrationManager::new(pool.clone())
        .migrate(&migrations())
        .await?;

    info!(
        applied = result.applied_count(),
        skipped = result.skipped.len(),
        "Database migrations finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_unique() {
        let migrations = migrations();
        let versions: Vec<i64> = migrations.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(versions, sorted);
        assert!(migrations[0].up_sql.contains("CREATE TABLE stock_movements"));
    }
}
