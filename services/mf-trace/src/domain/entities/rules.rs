//! 字段校验规则

use email_address::EmailAddress;
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;

/// 必填文本，去除首尾空白后不能为空且不超过 `max` 个字符
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> AppResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    max_len(field, trimmed, max)
}

pub(crate) fn optional_text(field: &str, value: Option<&str>, max: usize) -> AppResult<()> {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

fn max_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{} must not exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

pub(crate) fn optional_email(value: Option<&str>) -> AppResult<()> {
    if let Some(email) = value {
        if !EmailAddress::is_valid(email) {
            return Err(AppError::validation(format!("Invalid email address: {}", email)));
        }
    }
    Ok(())
}

/// 单价/单位成本上限，对应 NUMERIC(14, 4)
pub(crate) const MAX_PRICE: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 4);
const PRICE_SCALE: u32 = 4;

/// 单价：非负，最多 4 位小数，不超过 [`MAX_PRICE`]
pub(crate) fn price(field: &str, value: Decimal) -> AppResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::validation(format!("{} must not be negative", field)));
    }
    if value.normalize().scale() > PRICE_SCALE {
        return Err(AppError::validation(format!(
            "{} must have at most {} decimal places",
            field, PRICE_SCALE
        )));
    }
    if value > MAX_PRICE {
        return Err(AppError::validation(format!(
            "{} must not exceed {}",
            field, MAX_PRICE
        )));
    }
    Ok(())
}

/// 温度记录的合理范围（摄氏度）
pub(crate) fn temperature(value: Option<Decimal>) -> AppResult<()> {
    if let Some(t) = value {
        if t < Decimal::from(-80) || t > Decimal::from(300) {
            return Err(AppError::validation(format!(
                "Temperature {} is out of range",
                t
            )));
        }
    }
    Ok(())
}
