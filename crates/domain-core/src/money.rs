//! 货币值对象

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use thiserror::Error;

/// 金额精度（小数位）
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount overflows: {unit_price} x {quantity}")]
    Overflow {
        unit_price: Decimal,
        quantity: Decimal,
    },
}

/// 货币代码
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    pub fn new(code: &str) -> Self {
        Self(code.to_uppercase())
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }
}

/// 金额值对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    /// 金额（两位小数）
    pub amount: Decimal,
    /// 货币代码
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: round_money(amount),
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// 单价 × 数量，按金额精度四舍五入；溢出时返回错误
    pub fn line_total(
        unit_price: Decimal,
        quantity: Decimal,
        currency: Currency,
    ) -> Result<Self, MoneyError> {
        unit_price
            .checked_mul(quantity)
            .map(|amount| Self::new(amount, currency))
            .ok_or(MoneyError::Overflow {
                unit_price,
                quantity,
            })
    }

    /// 按百分比税率计算税额
    pub fn percentage(&self, rate_percent: Decimal) -> Self {
        Self::new(self.amount * rate_percent / Decimal::ONE_HUNDRED, self.currency.clone())
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        assert_eq!(
            self.currency, other.currency,
            "Cannot add money with different currencies"
        );
        Self::new(self.amount + other.amount, self.currency)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        assert_eq!(
            self.currency, other.currency,
            "Cannot subtract money with different currencies"
        );
        Self::new(self.amount - other.amount, self.currency)
    }
}

/// 四舍五入到金额精度
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
