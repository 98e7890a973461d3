//! PostgreSQL 迁移管理模块
//!
//! 每个服务以 `Migration` 列表形式内嵌自己的 schema，启动时按版本顺序应用。

use foodtrace_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::{info, warn};

/// 迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub checksum: String,
}

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_sql: String,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = checksum(&up_sql);
        Self {
            version,
            name: name.into(),
            up_sql,
            checksum,
        }
    }
}

/// FNV-1a 64 位校验和，跨编译器版本稳定
fn checksum(sql: &str) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = sql
        .as_bytes()
        .iter()
        .fold(OFFSET, |acc, b| (acc ^ u64::from(*b)).wrapping_mul(PRIME));
    format!("{:016x}", hash)
}

/// 迁移结果
#[derive(Debug, Clone, Default)]
pub struct MigrationResult {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

impl MigrationResult {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
    table_name: String,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "_migrations".to_string(),
        }
    }

    /// 设置迁移表名
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// 初始化迁移表
    pub async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                checksum VARCHAR(64) NOT NULL
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        Ok(())
    }

    /// 获取已应用的迁移
    pub async fn applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {} ORDER BY version ASC",
            self.table_name
        );

        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))
    }

    /// 在单个事务中应用一个迁移
    async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        // 迁移脚本可能包含多条语句，使用简单查询协议执行
        sqlx::raw_sql(&migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {}: {}",
                    migration.version, e
                ))
            })?;

        let insert_sql = format!(
            "INSERT INTO {} (version, name, checksum) VALUES ($1, $2, $3)",
            self.table_name
        );
        sqlx::query(&insert_sql)
            .bind(migration.version)
            .bind(&migration.name)
            .bind(&migration.checksum)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            name = %migration.name,
            "Migration applied successfully"
        );
        Ok(())
    }

    /// 应用所有待处理的迁移
    ///
    /// 已应用迁移的校验和不一致时立即失败，不会继续后续版本。
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationResult> {
        self.init().await?;

        let applied = self.applied_migrations().await?;
        let mut sorted: Vec<&Migration> = migrations.iter().collect();
        sorted.sort_by_key(|m| m.version);

        let mut result = MigrationResult::default();
        for migration in sorted {
            if let Some(record) = applied.iter().find(|r| r.version == migration.version) {
                if record.checksum != migration.checksum {
                    warn!(version = migration.version, "Migration checksum mismatch");
                    return Err(AppError::internal(format!(
                        "Migration {} ({}) has been modified after it was applied",
                        migration.version, migration.name
                    )));
                }
                result.skipped.push(migration.version);
                continue;
            }

            self.apply(migration).await?;
            result.applied.push(migration.version);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "create_suppliers", "CREATE TABLE suppliers (id UUID)");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.name, "create_suppliers");
        assert_eq!(migration.checksum.len(), 16);
    }

    #[test]
    fn test_checksum_consistency() {
        let sql = "CREATE TABLE test (id INT)";
        assert_eq!(Migration::new(1, "a", sql).checksum, Migration::new(2, "b", sql).checksum);
    }

    #[test]
    fn test_checksum_difference() {
        let m1 = Migration::new(1, "test", "CREATE TABLE test1 (id INT)");
        let m2 = Migration::new(1, "test", "CREATE TABLE test2 (id INT)");
        assert_ne!(m1.checksum, m2.checksum);
    }

    #[test]
    fn test_checksum_known_value() {
        // FNV-1a 空输入即为偏移基
        assert_eq!(checksum(""), "cbf29ce484222325");
    }
}
