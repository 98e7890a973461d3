//! telemetry - 可观测性库

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to install Prometheus recorder: {0}")]
    Metrics(String),
}

/// 初始化 tracing
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}

/// 初始化 Prometheus metrics
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))
}

/// 记录一次库存变动
pub fn record_stock_movement(item_kind: &str, reason: &str) {
    let labels = [
        ("item_kind", item_kind.to_string()),
        ("reason", reason.to_string()),
    ];
    metrics::counter!("stock_movements_total", &labels).increment(1);
}

/// 记录一次因库存不足被拒绝的操作
pub fn record_stock_rejection(item_kind: &str) {
    let labels = [("item_kind", item_kind.to_string())];
    metrics::counter!("stock_rejections_total", &labels).increment(1);
}

/// 记录 HTTP 请求
pub fn record_http_request(method: &str, route: &str, status: u16, duration_ms: f64) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_ms", &labels).record(duration_ms);
}

/// 记录批次完工
pub fn record_batch_completed() {
    metrics::counter!("batches_completed_total").increment(1);
}

/// 记录 X 光检测结果
pub fn record_xray_check(result: &str) {
    let labels = [("result", result.to_string())];
    metrics::counter!("xray_checks_total", &labels).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_without_installed_exporter() {
        // 未安装 recorder 时 metrics 调用为空操作
        record_stock_movement("raw_material", "receiving");
        record_stock_rejection("finished_product");
        record_http_request("GET", "/suppliers", 200, 1.5);
        record_batch_completed();
        record_xray_check("pass");
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug");
        init_tracing("info");
    }
}
