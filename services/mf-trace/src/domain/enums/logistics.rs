//! 发货与签收枚举

use super::coded_enum;

coded_enum! {
    /// 发货单状态
    pub enum ShipmentStatus {
        /// 待发货（已扣减库存）
        Pending = 1 => "pending",
        /// 已发出
        Shipped = 2 => "shipped",
        /// 已签收
        Delivered = 3 => "delivered",
        /// 已取消（库存已退回）
        Cancelled = 4 => "cancelled",
    }
}

impl ShipmentStatus {
    /// 该状态下发货数量是否仍占用库存
    pub fn holds_stock(&self) -> bool {
        !matches!(self, ShipmentStatus::Cancelled)
    }
}

coded_enum! {
    /// 签收时货物状况
    pub enum DeliveryCondition {
        Good = 1 => "good",
        Damaged = 2 => "damaged",
        PartiallyRejected = 3 => "partially_rejected",
    }
}
