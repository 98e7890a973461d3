//! 库存路由

use axum::Json;
use axum::extract::State;
use foodtrace_common::PagedResult;
use foodtrace_errors::{AppError, AppResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery, AppState, MessageResponse, done, pagination};
use crate::application::commands::{Actor, StockAdjustmentInput};
use crate::application::queries::LowStockItem;
use crate::domain::entities::StockMovement;
use crate::domain::enums::StockItemKind;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// 路径中的库存对象类型，同时接受路由名与枚举名
fn parse_kind(raw: &str) -> AppResult<StockItemKind> {
    match raw {
        "raw-materials" => Ok(StockItemKind::RawMaterial),
        "products" => Ok(StockItemKind::FinishedProduct),
        other => other
            .parse()
            .map_err(|_| AppError::validation(format!("Unknown stock item kind: {}", other))),
    }
}

pub async fn low_stock(State(state): State<AppState>) -> AppResult<Json<Vec<LowStockItem>>> {
    Ok(Json(state.handler.low_stock().await?))
}

pub async fn list_movements(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(String, Uuid)>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<Json<PagedResult<StockMovement>>> {
    let kind = parse_kind(&kind)?;
    let page = pagination(query.page, query.page_size);
    Ok(Json(state.handler.list_movements(kind, id, &page).await?))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((kind, id)): ApiPath<(String, Uuid)>,
    ApiJson(input): ApiJson<StockAdjustmentInput>,
) -> AppResult<Json<MessageResponse>> {
    let kind = parse_kind(&kind)?;
    let balance = state.handler.adjust_stock(&actor, kind, id, input).await?;
    Ok(done(
        id,
        format!("Stock adjusted successfully, new balance {}", balance.value()),
    ))
}
