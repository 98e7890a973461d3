//! mf-trace Service - Food Production Traceability

use foodtrace_bootstrap::{Infrastructure, run_http};
use tracing::info;

use mf_trace::api::{AppState, build_router};
use mf_trace::infrastructure::persistence::run_migrations;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 不存在时忽略
    let _ = dotenvy::dotenv();

    run_http("config", |infra: Infrastructure| async move {
        info!("Initializing mf-trace Service...");

        let pool = infra.postgres_pool();
        if infra.config().database.run_migrations {
            run_migrations(&pool).await?;
        }

        let state = AppState::from_pool(pool, infra.config())?;
        Ok(build_router(state))
    })
    .await?;

    Ok(())
}
