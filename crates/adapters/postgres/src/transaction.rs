//! PostgreSQL 事务管理模块

use foodtrace_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::session::SharedTx;

/// 事务隔离级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    /// 读已提交（PostgreSQL 默认）
    #[default]
    ReadCommitted,
    /// 可重复读
    RepeatableRead,
    /// 可串行化
    Serializable,
}

impl IsolationLevel {
    /// 转换为 SQL 字符串
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// 事务选项
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub isolation_level: IsolationLevel,
    pub read_only: bool,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// 生成 SET TRANSACTION 语句
    pub fn to_sql(&self) -> String {
        let access = if self.read_only { "READ ONLY" } else { "READ WRITE" };
        format!(
            "SET TRANSACTION ISOLATION LEVEL {}, {}",
            self.isolation_level.as_sql(),
            access
        )
    }
}

/// 事务管理器
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 开始事务
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))
    }

    /// 开始带选项的事务
    pub async fn begin_with_options(
        &self,
        options: &TransactionOptions,
    ) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.begin().await?;

        sqlx::query(&options.to_sql())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to set transaction options: {}", e)))?;

        Ok(tx)
    }

    /// 开始一个可在多个仓储间共享的事务
    pub async fn begin_shared(&self, options: &TransactionOptions) -> AppResult<SharedTx> {
        let tx = self.begin_with_options(options).await?;
        debug!(isolation = options.isolation_level.as_sql(), "Shared transaction started");
        Ok(Arc::new(Mutex::new(Some(tx))))
    }

    /// 提交共享事务
    pub async fn commit_shared(tx: &SharedTx) -> AppResult<()> {
        let mut guard = tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(crate::transaction_consumed)?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
    }

    /// 回滚共享事务
    pub async fn rollback_shared(tx: &SharedTx) -> AppResult<()> {
        let mut guard = tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(crate::transaction_consumed)?;

        tx.rollback()
            .await
            .map_err(|e| AppError::database(format!("Failed to rollback transaction: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level() {
        assert_eq!(IsolationLevel::ReadCommitted.as_sql(), "READ COMMITTED");
        assert_eq!(IsolationLevel::RepeatableRead.as_sql(), "REPEATABLE READ");
        assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
    }

    #[test]
    fn test_transaction_options_sql() {
        let sql = TransactionOptions::new().to_sql();
        assert_eq!(sql, "SET TRANSACTION ISOLATION LEVEL READ COMMITTED, READ WRITE");

        let sql = TransactionOptions::new()
            .with_isolation_level(IsolationLevel::Serializable)
            .read_only()
            .to_sql();
        assert!(sql.contains("SERIALIZABLE"));
        assert!(sql.contains("READ ONLY"));
    }
}
