//! 发票状态

use super::coded_enum;

coded_enum! {
    /// 发票状态
    pub enum InvoiceStatus {
        Draft = 1 => "draft",
        Issued = 2 => "issued",
        Paid = 3 => "paid",
        Cancelled = 4 => "cancelled",
    }
}

impl InvoiceStatus {
    pub fn is_deletable(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
    }
}
