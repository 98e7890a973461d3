//! 库存命令

use rust_decimal::Decimal;
use serde::Deserialize;

/// 手工库存调整
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustmentInput {
    /// 有符号调整量，不能为零
    pub delta: Decimal,
    pub note: Option<String>,
}
