//! HTTP 与连接池 metrics

use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use foodtrace_adapter_postgres::pool_status;
use foodtrace_telemetry::record_http_request;
use metrics::gauge;
use sqlx::PgPool;
use tracing::debug;

/// 记录每个请求的计数和耗时
///
/// 使用匹配到的路由模板作为标签，避免 ID 造成标签爆炸
pub async fn track_http_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    record_http_request(&method, &route, response.status().as_u16(), duration_ms);
    response
}

/// 设置连接池 gauge
pub fn record_pool_status(pool_name: &str, pool: &PgPool) {
    let status = pool_status(pool);
    let labels = [("pool", pool_name.to_string())];
    gauge!("connection_pool_size", &labels).set(status.size as f64);
    gauge!("connection_pool_idle", &labels).set(status.idle as f64);
    gauge!("connection_pool_active", &labels).set(status.active() as f64);
}

/// 后台定期采集连接池状态
pub fn spawn_pool_metrics(pool: PgPool, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                debug!("Pool closed, stopping pool metrics collector");
                break;
            }
            record_pool_status("postgres", &pool);
        }
    })
}
