//! 基础设施资源管理

use std::time::Duration;

use foodtrace_adapter_postgres::{PostgresConfig, create_pool};
use foodtrace_config::AppConfig;
use foodtrace_errors::AppResult;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use crate::retry::{RetryConfig, with_retry};

/// 基础设施资源容器，由 bootstrap 统一初始化
#[derive(Clone)]
pub struct Infrastructure {
    config: AppConfig,
    postgres_pool: PgPool,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_config = RetryConfig::default();

        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections)
            .with_min_connections(config.database.min_connections)
            .with_connect_timeout(Duration::from_secs(config.database.connect_timeout_secs));

        let postgres_pool = with_retry(&retry_config, "PostgreSQL connection", || {
            let cfg = pg_config.clone();
            async move { create_pool(&cfg).await }
        })
        .await?;
        info!(
            max_connections = config.database.max_connections,
            "PostgreSQL connection pool created"
        );

        Ok(Self {
            config,
            postgres_pool,
        })
    }

    /// 直接使用已有连接池（测试用）
    pub fn from_pool(config: AppConfig, postgres_pool: PgPool) -> Self {
        Self {
            config,
            postgres_pool,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }
}
