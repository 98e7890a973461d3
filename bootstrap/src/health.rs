//! 健康检查模块
//!
//! 提供 /health、/ready 和 /metrics 端点

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use sqlx::PgPool;

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub checks: Vec<ComponentHealth>,
}

/// 组件健康状态
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            checks: vec![],
        }
    }

    pub fn add_check(&mut self, check: ComponentHealth) {
        if check.status != "healthy" {
            self.status = "unhealthy".to_string();
        }
        self.checks.push(check);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "healthy".to_string(),
            message: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "unhealthy".to_string(),
            message: Some(message.into()),
        }
    }
}

/// 健康检查器
///
/// pool 为 None 时 readiness 始终失败
#[derive(Clone, Default)]
pub struct HealthChecker {
    pool: Option<PgPool>,
    metrics: Option<PrometheusHandle>,
}

impl HealthChecker {
    pub fn new(pool: Option<PgPool>, metrics: Option<PrometheusHandle>) -> Self {
        Self { pool, metrics }
    }

    /// 存活检查，只说明进程在运行
    pub async fn liveness(&self) -> HealthStatus {
        HealthStatus::healthy()
    }

    /// 就绪检查，检查数据库是否可用
    pub async fn readiness(&self) -> HealthStatus {
        let mut status = HealthStatus::healthy();
        let check = match &self.pool {
            Some(pool) => match foodtrace_adapter_postgres::check_connection(pool).await {
                Ok(()) => ComponentHealth::healthy("postgres"),
                Err(e) => ComponentHealth::unhealthy("postgres", e.to_string()),
            },
            None => ComponentHealth::unhealthy("postgres", "Not initialized"),
        };
        status.add_check(check);
        status
    }

    /// Prometheus 文本格式的 metrics
    pub fn render_metrics(&self) -> String {
        self.metrics
            .as_ref()
            .map(|handle| handle.render())
            .unwrap_or_default()
    }
}

/// 构建健康检查路由
pub fn health_routes(checker: HealthChecker) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(checker))
}

async fn health_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let status = checker.liveness().await;
    (StatusCode::OK, Json(status))
}

async fn ready_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let status = checker.readiness().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

async fn metrics_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        checker.render_metrics(),
    )
}
