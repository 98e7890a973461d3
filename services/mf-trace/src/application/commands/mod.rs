//! 命令定义
//!
//! 新建与更新共用同一输入结构（整体替换语义），库存数量不在其中。

mod billing_commands;
mod inventory_commands;
mod logistics_commands;
mod master_data_commands;
mod production_commands;

pub use billing_commands::*;
pub use inventory_commands::*;
pub use logistics_commands::*;
pub use master_data_commands::*;
pub use production_commands::*;

use foodtrace_common::UserId;

/// 操作人，来自请求头，可为空
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Option<UserId>,
}

impl Actor {
    pub fn new(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}
