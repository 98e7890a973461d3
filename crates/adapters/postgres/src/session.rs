//! 会话抽象
//!
//! 仓储既可以直接使用连接池，也可以挂在 Unit of Work 的共享事务上。
//! 两种模式共用同一份 SQL，由 [`run_in_session!`] 在调用处分派执行器。

use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 共享事务类型
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// 仓储执行上下文
#[derive(Clone)]
pub enum PgSession {
    /// 每条语句从连接池获取连接
    Pool(PgPool),
    /// 所有语句在同一事务中执行
    Tx(SharedTx),
}

impl PgSession {
    pub fn pool(pool: PgPool) -> Self {
        Self::Pool(pool)
    }

    pub fn tx(tx: SharedTx) -> Self {
        Self::Tx(tx)
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self, Self::Tx(_))
    }
}

impl From<PgPool> for PgSession {
    fn from(pool: PgPool) -> Self {
        Self::Pool(pool)
    }
}

/// 在会话上执行 sqlx 查询，返回 `AppResult<T>`
///
/// ```ignore
/// let row = run_in_session!(&self.session, |conn| {
///     sqlx::query_as::<_, SupplierRow>(SQL).bind(id).fetch_optional(conn)
/// })?;
/// ```
#[macro_export]
macro_rules! run_in_session {
    ($session:expr, |$conn:ident| $body:expr) => {{
        match $session {
            $crate::PgSession::Pool(pool) => {
                let $conn = pool;
                $body.await.map_err($crate::map_sqlx_error)
            }
            $crate::PgSession::Tx(tx) => {
                let mut guard = tx.lock().await;
                let result = match guard.as_mut() {
                    Some(t) => {
                        let $conn = &mut **t;
                        $body.await.map_err($crate::map_sqlx_error)
                    }
                    None => Err($crate::transaction_consumed()),
                };
                result
            }
        }
    }};
}
