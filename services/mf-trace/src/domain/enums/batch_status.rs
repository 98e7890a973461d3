//! 批次与工序状态

use super::coded_enum;

coded_enum! {
    /// 生产批次状态
    pub enum BatchStatus {
        /// 已计划
        Planned = 1 => "planned",
        /// 生产中
        InProgress = 2 => "in_progress",
        /// 已完工
        Completed = 3 => "completed",
        /// 已取消
        Cancelled = 4 => "cancelled",
    }
}

impl BatchStatus {
    /// 是否仍可修改（投料、工序、基本信息）
    pub fn is_open(&self) -> bool {
        matches!(self, BatchStatus::Planned | BatchStatus::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Cancelled)
    }
}

coded_enum! {
    /// 工序状态
    pub enum StageStatus {
        Pending = 1 => "pending",
        InProgress = 2 => "in_progress",
        Completed = 3 => "completed",
    }
}
