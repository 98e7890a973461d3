//! 追溯路由

use axum::Json;
use axum::extract::State;
use foodtrace_errors::AppResult;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiPath, ApiQuery, AppState};
use crate::application::queries::{BatchTrace, LotTrace};
use crate::domain::value_objects::{BatchId, RawMaterialId};

#[derive(Debug, Deserialize)]
pub struct LotQuery {
    pub raw_material_id: Uuid,
    pub lot_number: String,
}

pub async fn trace_batch(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<BatchTrace>> {
    Ok(Json(state.handler.trace_batch(&BatchId::from(id)).await?))
}

/// 按原材料批号查受影响的批次、发货和客户
pub async fn trace_lot(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LotQuery>,
) -> AppResult<Json<LotTrace>> {
    let raw_material_id = RawMaterialId::from(query.raw_material_id);
    Ok(Json(
        state
            .handler
            .trace_lot(&raw_material_id, &query.lot_number)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{router, send};
    use crate::application::test_support::TestUow;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_lot_query_requires_raw_material() {
        let (status, _) = send(router(TestUow::default()), Method::GET, "/trace/lots?lot_number=L1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_blank_lot_is_400() {
        let mut uow = TestUow::default();
        uow.raw_materials.expect_find_by_id().never();

        let (status, body) = send(
            router(uow),
            Method::GET,
            "/trace/lots?raw_material_id=0191d8a4-7c1e-7000-8000-000000000001&lot_number=%20%20",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_trace_missing_batch_is_404() {
        let mut uow = TestUow::default();
        uow.batches.expect_find_by_id().returning(|_| Ok(None));

        let (status, _) = send(
            router(uow),
            Method::GET,
            "/trace/batches/0191d8a4-7c1e-7000-8000-000000000005",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
