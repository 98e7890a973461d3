//! domain-core - 跨模块共享的领域核心类型
//!
//! 实体 trait、库存数量和金额值对象

mod entity;
mod money;
mod quantity;

pub use entity::*;
pub use money::*;
pub use quantity::*;

// Re-export common types
pub use foodtrace_common::{AuditInfo, UserId};
