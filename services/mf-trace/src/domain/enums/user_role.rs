//! 用户角色

use super::coded_enum;

coded_enum! {
    /// 用户角色
    pub enum UserRole {
        Admin = 1 => "admin",
        Supervisor = 2 => "supervisor",
        Operator = 3 => "operator",
        QualityInspector = 4 => "quality_inspector",
        WarehouseClerk = 5 => "warehouse_clerk",
    }
}

impl UserRole {
    /// 是否可以担任批次主管
    pub fn can_supervise(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Supervisor)
    }
}
