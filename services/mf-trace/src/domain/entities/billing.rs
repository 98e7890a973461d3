//! 开票实体

use chrono::NaiveDate;
use foodtrace_common::AuditInfo;
use foodtrace_domain_core::{Currency, Money, Quantity};
use foodtrace_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rules;
use crate::domain::enums::InvoiceStatus;
use crate::domain::value_objects::{CustomerId, InvoiceId, InvoiceItemId, ProductId, ShipmentId};

/// 行金额上限，对应 NUMERIC(14, 2)
const MAX_LINE_TOTAL: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// 发票汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// 发票
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub shipment_id: Option<ShipmentId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub currency: Currency,
    /// 税率（百分比，0..=100）
    pub tax_rate: Decimal,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub audit_info: AuditInfo,
}

impl Invoice {
    pub fn validate(&self) -> AppResult<()> {
        rules::require_text("Invoice number", &self.invoice_number, 30)?;
        if self.due_date < self.issue_date {
            return Err(AppError::validation("Due date must not be before issue date"));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(AppError::validation("Tax rate must be between 0 and 100"));
        }
        if self.currency.0.len() != 3 {
            return Err(AppError::validation("Currency must be a 3-letter code"));
        }
        rules::optional_text("Notes", self.notes.as_deref(), 1000)
    }

    pub fn totals(&self) -> InvoiceTotals {
        let subtotal = self
            .items
            .iter()
            .fold(Money::zero(self.currency.clone()), |acc, item| {
                acc + Money::new(item.line_total, self.currency.clone())
            });
        let tax = subtotal.percentage(self.tax_rate);
        let total = subtotal.clone() + tax.clone();
        InvoiceTotals {
            subtotal: subtotal.amount,
            tax_amount: tax.amount,
            total: total.amount,
        }
    }

    pub fn ensure_draft(&self) -> AppResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(AppError::failed_precondition(format!(
                "Invoice {} is {}, only draft invoices can be modified",
                self.invoice_number, self.status
            )));
        }
        Ok(())
    }

    pub fn issue(&mut self) -> AppResult<()> {
        self.ensure_draft()?;
        if self.items.is_empty() {
            return Err(AppError::failed_precondition(format!(
                "Invoice {} has no items",
                self.invoice_number
            )));
        }
        self.status = InvoiceStatus::Issued;
        Ok(())
    }

    pub fn pay(&mut self) -> AppResult<()> {
        if self.status != InvoiceStatus::Issued {
            return Err(self.transition_error("pay"));
        }
        self.status = InvoiceStatus::Paid;
        Ok(())
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        if !matches!(self.status, InvoiceStatus::Draft | InvoiceStatus::Issued) {
            return Err(self.transition_error("cancel"));
        }
        self.status = InvoiceStatus::Cancelled;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> AppResult<()> {
        if !self.status.is_deletable() {
            return Err(self.transition_error("delete"));
        }
        Ok(())
    }

    fn transition_error(&self, action: &str) -> AppError {
        AppError::failed_precondition(format!(
            "Cannot {} invoice {} in status {}",
            action, self.invoice_number, self.status
        ))
    }
}

/// 发票行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceId,
    pub product_id: ProductId,
    pub description: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Decimal,
    /// round2(quantity × unit_price)
    pub line_total: Decimal,
    pub audit_info: AuditInfo,
}

impl InvoiceItem {
    pub fn validate(&self) -> AppResult<()> {
        if self.quantity.is_zero() {
            return Err(AppError::validation("Item quantity must be greater than zero"));
        }
        rules::price("Unit price", self.unit_price)?;
        rules::optional_text("Description", self.description.as_deref(), 255)
    }

    /// 重算行金额；超出 NUMERIC(14, 2) 的结果按校验错误拒绝
    pub fn recalculate(&mut self, currency: &Currency) -> AppResult<()> {
        let total = Money::line_total(self.unit_price, self.quantity.value(), currency.clone())
            .map_err(|e| AppError::validation(format!("Invalid line total: {}", e)))?;
        if total.amount.abs() > MAX_LINE_TOTAL {
            return Err(AppError::validation(format!(
                "Line total {} exceeds the maximum of {}",
                total.amount, MAX_LINE_TOTAL
            )));
        }
        self.line_total = total.amount;
        Ok(())
    }
}
