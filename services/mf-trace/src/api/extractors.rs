//! 请求提取器
//!
//! 包装 axum 自带的提取器，把拒绝统一转换成 [`AppError`]，
//! 保证所有错误响应都是 Problem Details。

use axum::extract::{FromRequest, FromRequestParts, Json, Path, Query, Request};
use axum::http::request::Parts;
use foodtrace_common::UserId;
use foodtrace_errors::AppError;
use serde::de::DeserializeOwned;

use crate::application::commands::Actor;

/// 操作人请求头
pub const USER_ID_HEADER: &str = "x-user-id";

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Actor::anonymous());
        };

        let raw = value
            .to_str()
            .map_err(|_| AppError::validation(format!("Invalid {} header", USER_ID_HEADER)))?
            .trim();
        if raw.is_empty() {
            return Ok(Actor::anonymous());
        }

        let user_id = UserId::from_string(raw).map_err(|e| {
            AppError::validation(format!("Invalid {} header: {}", USER_ID_HEADER, e))
        })?;
        Ok(Actor::new(Some(user_id)))
    }
}

/// 路径参数
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(|e| AppError::validation(e.body_text()))
    }
}

/// 查询参数
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|e| AppError::validation(e.body_text()))
    }
}

/// JSON 请求体
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(|e| AppError::validation(e.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    async fn actor_from(header: Option<&str>) -> Result<Actor, AppError> {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        assert_eq!(actor_from(None).await.unwrap(), Actor::anonymous());
        assert_eq!(actor_from(Some("  ")).await.unwrap(), Actor::anonymous());
    }

    #[tokio::test]
    async fn test_valid_header() {
        let id = UserId::new();
        let actor = actor_from(Some(&id.0.to_string())).await.unwrap();
        assert_eq!(actor.user_id, Some(id));
    }

    #[tokio::test]
    async fn test_invalid_header_is_validation_error() {
        assert!(matches!(
            actor_from(Some("not-a-uuid")).await,
            Err(AppError::Validation(_))
        ));
    }
}
