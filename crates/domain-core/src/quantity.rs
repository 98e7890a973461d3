//! 数量值对象
//!
//! 库存数量统一使用三位小数的 Decimal，且不允许为负。

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 数量精度（小数位）
pub const QUANTITY_SCALE: u32 = 3;

/// 数量上限，对应 NUMERIC(14, 3)
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 3);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity must not be negative: {0}")]
    Negative(Decimal),

    #[error("quantity must be greater than zero: {0}")]
    NotPositive(Decimal),

    #[error("quantity has more than 3 decimal places: {0}")]
    TooPrecise(Decimal),

    #[error("quantity exceeds the maximum: {0}")]
    TooLarge(Decimal),

    #[error("insufficient stock: available {available}, requested {requested}")]
    Insufficient {
        available: Decimal,
        requested: Decimal,
    },
}

/// 非负库存数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// 创建非负数量
    pub fn new(value: Decimal) -> Result<Self, QuantityError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(QuantityError::Negative(value));
        }
        if value.normalize().scale() > QUANTITY_SCALE {
            return Err(QuantityError::TooPrecise(value));
        }
        if value > MAX_QUANTITY {
            return Err(QuantityError::TooLarge(value));
        }
        Ok(Self(value.normalize()))
    }

    /// 创建正数数量（用于出入库的单次变动量）
    pub fn positive(value: Decimal) -> Result<Self, QuantityError> {
        if value <= Decimal::ZERO {
            return Err(QuantityError::NotPositive(value));
        }
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0
            .checked_add(other.0)
            .filter(|sum| *sum <= MAX_QUANTITY)
            .map(Self)
    }

    /// 扣减，结果为负时返回 `Insufficient`
    pub fn checked_sub(self, other: Quantity) -> Result<Quantity, QuantityError> {
        if other.0 > self.0 {
            return Err(QuantityError::Insufficient {
                available: self.0,
                requested: other.0,
            });
        }
        Ok(Self(self.0 - other.0))
    }

    /// 应用有符号的变动量
    pub fn apply_delta(self, delta: Decimal) -> Result<Quantity, QuantityError> {
        let next = self
            .0
            .checked_add(delta)
            .ok_or(QuantityError::TooLarge(delta))?;
        if next.is_sign_negative() && !next.is_zero() {
            return Err(QuantityError::Insufficient {
                available: self.0,
                requested: -delta,
            });
        }
        if next > MAX_QUANTITY {
            return Err(QuantityError::TooLarge(next));
        }
        Ok(Self(next))
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = QuantityError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 四舍五入到库存精度
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(
            Quantity::new(dec!(-1)),
            Err(QuantityError::Negative(dec!(-1)))
        );
        assert!(Quantity::new(dec!(0)).is_ok());
    }

    #[test]
    fn test_positive_requires_non_zero() {
        assert!(matches!(
            Quantity::positive(dec!(0)),
            Err(QuantityError::NotPositive(_))
        ));
        assert_eq!(Quantity::positive(dec!(2.5)).unwrap().value(), dec!(2.5));
    }

    #[test]
    fn test_precision_limit() {
        assert!(Quantity::new(dec!(1.125)).is_ok());
        assert!(matches!(
            Quantity::new(dec!(1.1255)),
            Err(QuantityError::TooPrecise(_))
        ));
        // 尾随零不计入精度
        assert!(Quantity::new(dec!(1.12500)).is_ok());
    }

    #[test]
    fn test_checked_sub_never_goes_negative() {
        let stock = Quantity::new(dec!(10)).unwrap();
        let take = Quantity::new(dec!(4)).unwrap();
        assert_eq!(stock.checked_sub(take).unwrap().value(), dec!(6));

        let too_much = Quantity::new(dec!(10.001)).unwrap();
        assert_eq!(
            stock.checked_sub(too_much),
            Err(QuantityError::Insufficient {
                available: dec!(10),
                requested: dec!(10.001)
            })
        );
    }

    #[test]
    fn test_apply_delta() {
        let stock = Quantity::new(dec!(5)).unwrap();
        assert_eq!(stock.apply_delta(dec!(2)).unwrap().value(), dec!(7));
        assert_eq!(stock.apply_delta(dec!(-5)).unwrap().value(), dec!(0));
        assert!(stock.apply_delta(dec!(-5.5)).is_err());
    }

    #[test]
    fn test_upper_bound() {
        assert_eq!(MAX_QUANTITY, dec!(99999999999.999));
        assert!(Quantity::new(dec!(99999999999.999)).is_ok());
        assert!(matches!(
            Quantity::new(dec!(1000000000000)),
            Err(QuantityError::TooLarge(_))
        ));
        assert!(matches!(
            Quantity::positive(dec!(100000000000)),
            Err(QuantityError::TooLarge(_))
        ));

        let stock = Quantity::new(dec!(99999999999)).unwrap();
        assert!(matches!(stock.apply_delta(dec!(1)), Err(QuantityError::TooLarge(_))));
        assert!(matches!(
            stock.apply_delta(Decimal::MAX),
            Err(QuantityError::TooLarge(_))
        ));
    }

    #[test]
    fn test_round_quantity() {
        assert_eq!(round_quantity(dec!(1.2345)), dec!(1.235));
    }
}
