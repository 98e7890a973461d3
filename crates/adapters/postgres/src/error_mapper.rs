//! 数据库错误映射工具
//!
//! 提供统一的 SQLx 错误到 AppError 的转换

use foodtrace_errors::AppError;

/// PostgreSQL 约束违规代码
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";
const STRING_TOO_LONG: &str = "22001";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const SERIALIZATION_FAILURE: &str = "40001";

/// 将 SQLx 错误转换为 AppError，区分不同错误类型
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
        sqlx::Error::Database(db_err) => {
            let Some(code) = db_err.code() else {
                return AppError::database(db_err.to_string());
            };
            let constraint = db_err.constraint().unwrap_or("unknown");
            map_database_code(code.as_ref(), constraint, db_err.message()).unwrap_or_else(|| {
                AppError::database(format!("Database error ({}): {}", code, db_err))
            })
        }
        sqlx::Error::PoolTimedOut => AppError::internal("Database connection pool timeout"),
        sqlx::Error::PoolClosed => AppError::internal("Database connection pool is closed"),
        sqlx::Error::Protocol(msg) => AppError::internal(format!("Database protocol error: {}", msg)),
        _ => AppError::database(e.to_string()),
    }
}

/// 按 SQLSTATE 映射可归因于请求的数据库错误，其余返回 None
fn map_database_code(code: &str, constraint: &str, message: &str) -> Option<AppError> {
    let err = match code {
        UNIQUE_VIOLATION => AppError::conflict(format!(
            "Duplicate entry violates unique constraint {}",
            constraint
        )),
        FOREIGN_KEY_VIOLATION => {
            // 删除/更新被引用的记录与插入悬空引用需要区分
            if message.starts_with("update or delete") {
                AppError::conflict(format!("Record is still referenced ({})", constraint))
            } else {
                AppError::validation(format!(
                    "Referenced record does not exist ({})",
                    constraint
                ))
            }
        }
        CHECK_VIOLATION => {
            AppError::validation(format!("Check constraint violation ({})", constraint))
        }
        NOT_NULL_VIOLATION => AppError::validation("Not null constraint violation"),
        STRING_TOO_LONG => AppError::validation("String data too long"),
        NUMERIC_VALUE_OUT_OF_RANGE => AppError::validation("Numeric value out of range"),
        INVALID_TEXT_REPRESENTATION => AppError::validation("Invalid input syntax"),
        SERIALIZATION_FAILURE => AppError::conflict("Concurrent update detected, please retry"),
        _ => return None,
    };
    Some(err)
}

/// 事务已被提交或回滚后继续使用时的错误
pub fn transaction_consumed() -> AppError {
    AppError::internal("Transaction already consumed")
}
