//! 开票命令

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::value_objects::{CustomerId, ProductId, ShipmentId};

/// 发票头输入
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceInput {
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub shipment_id: Option<ShipmentId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    /// 默认 USD
    pub currency: Option<String>,
    #[serde(default)]
    pub tax_rate: Decimal,
    pub notes: Option<String>,
}

/// 发票行输入
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceItemInput {
    pub product_id: ProductId,
    pub description: Option<String>,
    pub quantity: Decimal,
    /// 为空时取成品单价
    pub unit_price: Option<Decimal>,
}
