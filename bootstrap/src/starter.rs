//! HTTP 服务启动器

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{Router, middleware};
use foodtrace_config::AppConfig;
use foodtrace_errors::{AppError, AppResult};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{info, warn};

use crate::health::{HealthChecker, health_routes};
use crate::infrastructure::Infrastructure;
use crate::metrics::{spawn_pool_metrics, track_http_metrics};
use crate::runtime::{init_runtime, shutdown_signal};

const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(15);

/// 启动 HTTP 服务
///
/// `build` 拿到初始化好的基础设施，负责执行迁移并返回业务路由
pub async fn run_http<F, Fut>(config_dir: &str, build: F) -> AppResult<()>
where
    F: FnOnce(Infrastructure) -> Fut,
    Fut: Future<Output = AppResult<Router>>,
{
    let config = AppConfig::load(config_dir)
        .map_err(|e| AppError::internal(format!("Failed to load config: {}", e)))?;

    init_runtime(&config);

    let metrics_handle = match foodtrace_telemetry::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Metrics recorder not installed");
            None
        }
    };

    let infra = Infrastructure::from_config(config.clone()).await?;
    let pool = infra.postgres_pool();
    let _collector = spawn_pool_metrics(pool.clone(), POOL_METRICS_INTERVAL);

    let routes = build(infra).await?;
    let checker = HealthChecker::new(Some(pool.clone()), metrics_handle);
    let app = with_http_layers(routes, &config).merge(health_routes(checker));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| AppError::internal(format!("Invalid server address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    info!(%addr, app_name = %config.app_name, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// 给业务路由加上通用中间件
pub fn with_http_layers(routes: Router, config: &AppConfig) -> Router {
    routes
        .layer(middleware::from_fn(track_http_metrics))
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use foodtrace_config::{DatabaseConfig, InventoryConfig, ServerConfig, TelemetryConfig};
    use secrecy::Secret;
    use tower::ServiceExt;

    fn config(max_body_bytes: usize) -> AppConfig {
        AppConfig {
            app_name: "mf-trace".to_string(),
            app_env: "test".to_string(),
            database: DatabaseConfig {
                url: Secret::new("postgres://localhost/foodtrace".to_string()),
                max_connections: 1,
                min_connections: 1,
                connect_timeout_secs: 1,
                run_migrations: false,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                request_timeout_secs: 5,
                max_body_bytes,
            },
            telemetry: TelemetryConfig::default(),
            inventory: InventoryConfig::default(),
        }
    }

    async fn post_bytes(len: usize) -> StatusCode {
        let routes = Router::new().route("/echo", post(|body: String| async move { body }));
        let app = with_http_layers(routes, &config(16));
        let request = Request::post("/echo")
            .header("content-length", len)
            .body(Body::from(vec![b'a'; len]))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_body_within_limit_is_accepted() {
        assert_eq!(post_bytes(16).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        assert_eq!(post_bytes(17).await, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
